use std::fmt::Write;

use super::errors::ErrorRecord;
use super::sync::PassReport;

/// Every pass of a run, in execution order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub passes: Vec<PassReport>,
}

impl RunReport {
    pub fn records(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.passes.iter().flat_map(|p| p.errors.records())
    }

    pub fn failed(&self) -> usize {
        self.passes.iter().map(PassReport::failed).sum()
    }

    pub fn dropped_references(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records().filter(|r| r.is_dropped_reference())
    }

    /// One line per pass, for the operator at the end of a run.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<22} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "PASS", "FETCHED", "DONE", "SKIPPED", "FAILED", "DROPPED"
        );
        for pass in &self.passes {
            let _ = writeln!(
                out,
                "{:<22} {:>8} {:>8} {:>8} {:>8} {:>8}",
                pass.label(),
                pass.fetched,
                pass.succeeded,
                pass.skipped,
                pass.failed(),
                pass.errors.dropped_references().count()
            );
        }
        out
    }
}
