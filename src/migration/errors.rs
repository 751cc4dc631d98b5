use anyhow::Result;
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::Path;

use crate::model::resource::ResourceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Delete,
    RewriteCondition,
    RewriteAction,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::RewriteCondition => "rewrite_condition",
            Operation::RewriteAction => "rewrite_action",
        }
    }
}

/// One failed item operation, or one reference that could not be translated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: String,
    pub resource: ResourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<u64>,
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub detail: Value,
}

impl ErrorRecord {
    pub fn new(resource: ResourceType, item_id: Option<u64>, operation: Operation, detail: Value) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            resource,
            item_id,
            operation,
            status: None,
            detail,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Dropped references degrade the item but do not stop it from being created.
    pub fn is_dropped_reference(&self) -> bool {
        matches!(self.operation, Operation::RewriteCondition | Operation::RewriteAction)
    }
}

/// Ordered failures of a single pass. Recording never interrupts the pass.
#[derive(Debug, Default, Clone)]
pub struct ErrorLog {
    records: Vec<ErrorRecord>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: ErrorRecord) {
        self.records.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn item_failures(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter().filter(|r| !r.is_dropped_reference())
    }

    pub fn dropped_references(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter().filter(|r| r.is_dropped_reference())
    }

    /// Log the whole batch once the pass is over.
    pub fn surface(&self, label: &str) {
        if self.is_empty() {
            return;
        }
        error!("{label}: {} errors", self.len());
        for record in &self.records {
            let id = record.item_id.map(|id| id.to_string()).unwrap_or_else(|| "-".into());
            let status = record.status.map(|s| format!(" HTTP {s}")).unwrap_or_default();
            error!(
                "  {} {} {id}{status}: {}",
                record.resource.as_str(),
                record.operation.as_str(),
                record.detail
            );
        }
    }
}

/// Append records as JSON lines so an operator can reconcile after the run.
pub fn append_records<'a>(path: &Path, records: impl IntoIterator<Item = &'a ErrorRecord>) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let mut written = 0;
    for record in records {
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
        written += 1;
    }
    Ok(written)
}
