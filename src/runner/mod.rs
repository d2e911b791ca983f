pub mod events;
pub mod exit_codes;
pub mod orchestrator;
pub mod registry;
pub mod state;
pub mod suite;

pub use events::*;
pub use orchestrator::{Orchestrator, ReportEntry, RunHandle, RunOutcome, TaggedData};
pub use state::*;
pub use suite::{Check, CheckContext, CheckError, SuiteDefinition, SuiteReport, SuiteRunner, Verdict};
