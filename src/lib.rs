pub mod dashboard;
pub mod data;
pub mod driver;
pub mod error;
pub mod report;
pub mod runner;
pub mod suites;
pub mod utils;

pub use runner::{Orchestrator, RunOutcome};
pub use utils::HarnessConfig;
