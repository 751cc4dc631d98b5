pub mod errors;
pub mod fetch;
pub mod orchestrator;
pub mod remap;
pub mod report;
pub mod sync;

pub use orchestrator::Migrator;
pub use report::RunReport;
