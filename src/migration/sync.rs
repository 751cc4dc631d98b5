use log::{debug, error, info};
use serde_json::{json, Map, Value};

use super::errors::{ErrorLog, ErrorRecord, Operation};
use super::fetch::fetch_all;
use super::remap::IdRemapper;
use crate::client::{EnvironmentClient, MutableEnvironment};
use crate::error::MigrationError;
use crate::model::item::{id_of, Item};
use crate::model::resource::ResourceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Reset,
    Copy,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Reset => "reset",
            Phase::Copy => "copy",
        }
    }
}

/// Outcome of one reset or copy over a single resource type.
#[derive(Debug)]
pub struct PassReport {
    pub phase: Phase,
    pub resource: ResourceType,
    pub fetched: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub errors: ErrorLog,
}

impl PassReport {
    fn new(phase: Phase, resource: ResourceType, fetched: usize) -> Self {
        Self {
            phase,
            resource,
            fetched,
            skipped: 0,
            succeeded: 0,
            errors: ErrorLog::new(),
        }
    }

    pub fn failed(&self) -> usize {
        self.errors.item_failures().count()
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.phase.as_str(), self.resource)
    }
}

/// Moves one resource type at a time from the read-only source into the target.
pub struct Synchronizer<'a, S: ?Sized, T: ?Sized> {
    source: &'a S,
    target: &'a T,
}

impl<'a, S, T> Synchronizer<'a, S, T>
where
    S: EnvironmentClient + ?Sized,
    T: MutableEnvironment + ?Sized,
{
    pub fn new(source: &'a S, target: &'a T) -> Self {
        Self { source, target }
    }

    /// Delete every target item of `resource` accepted by `filter`.
    ///
    /// A failed delete is recorded and the loop moves on to the next item.
    pub async fn reset<F>(&self, resource: ResourceType, filter: F) -> Result<PassReport, MigrationError>
    where
        F: Fn(&Item) -> bool,
    {
        info!("Deleting all {resource} items");
        let items = fetch_all(self.target, resource.list_path(), resource.collection()).await?;
        let mut report = PassReport::new(Phase::Reset, resource, items.len());

        for item in items {
            if !filter(&item) {
                report.skipped += 1;
                continue;
            }
            let Some(id) = id_of(&item) else {
                report.errors.record(ErrorRecord::new(
                    resource,
                    None,
                    Operation::Delete,
                    json!("target item has no id"),
                ));
                continue;
            };

            debug!("Deleting {} {id}", resource.as_str());
            match self.target.delete(&resource.item_path(id)).await {
                Ok(resp) if resp.is_success() => report.succeeded += 1,
                Ok(resp) => {
                    error!("Failed to delete {} {id}: HTTP {} {}", resource.as_str(), resp.status, resp.body);
                    report.errors.record(
                        ErrorRecord::new(resource, Some(id), Operation::Delete, resp.body).with_status(resp.status),
                    );
                }
                Err(e) => {
                    error!("Failed to delete {} {id}: {e}", resource.as_str());
                    report
                        .errors
                        .record(ErrorRecord::new(resource, Some(id), Operation::Delete, json!(e.to_string())));
                }
            }
        }

        report.errors.surface(&report.label());
        Ok(report)
    }

    /// Recreate every source item of `resource` in the target.
    ///
    /// `transform` may rewrite an item or return `None` to skip it; `on_created`
    /// receives the (transformed) source item and the item the target created.
    pub async fn copy<F, C>(
        &self,
        resource: ResourceType,
        remapper: &mut IdRemapper,
        mut transform: F,
        mut on_created: C,
    ) -> Result<PassReport, MigrationError>
    where
        F: FnMut(Item, &IdRemapper, &mut ErrorLog) -> Option<Item>,
        C: FnMut(&Item, &Item, &mut IdRemapper),
    {
        info!("Copying {resource}");
        let items = fetch_all(self.source, resource.list_path(), resource.collection()).await?;
        let mut report = PassReport::new(Phase::Copy, resource, items.len());

        for item in items {
            let Some(item) = transform(item, &*remapper, &mut report.errors) else {
                report.skipped += 1;
                continue;
            };
            let old_id = id_of(&item);
            debug!("Copying {} {old_id:?}", resource.as_str());

            match self.target.create(resource.collection(), wrap(resource, &item)).await {
                Ok(resp) if resp.is_success() => match unwrap_created(resource, resp.body) {
                    Some(created) => {
                        on_created(&item, &created, &mut *remapper);
                        report.succeeded += 1;
                    }
                    None => {
                        error!("Created {} {old_id:?} but the response has no {}", resource.as_str(), resource.singular());
                        report.errors.record(
                            ErrorRecord::new(resource, old_id, Operation::Create, json!("response missing created item"))
                                .with_status(resp.status),
                        );
                    }
                },
                Ok(resp) => {
                    error!("Failed to copy {} {old_id:?}: HTTP {} {}", resource.as_str(), resp.status, resp.body);
                    report.errors.record(
                        ErrorRecord::new(resource, old_id, Operation::Create, resp.body).with_status(resp.status),
                    );
                }
                Err(e) => {
                    error!("Failed to copy {} {old_id:?}: {e}", resource.as_str());
                    report
                        .errors
                        .record(ErrorRecord::new(resource, old_id, Operation::Create, json!(e.to_string())));
                }
            }
        }

        report.errors.surface(&report.label());
        Ok(report)
    }
}

/// `{ "<singular>": item }`, the envelope create requests expect.
fn wrap(resource: ResourceType, item: &Item) -> Value {
    let mut body = Map::new();
    body.insert(resource.singular().to_string(), Value::Object(item.clone()));
    Value::Object(body)
}

fn unwrap_created(resource: ResourceType, mut body: Value) -> Option<Item> {
    match body.get_mut(resource.singular()).map(Value::take) {
        Some(Value::Object(item)) => Some(item),
        _ => None,
    }
}
