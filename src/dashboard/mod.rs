//! Dashboard service
//!
//! Exposes the run orchestrator over HTTP: start and stop runs, poll status,
//! browse results, export and download reports.

pub mod api;
pub mod server;

pub use server::{DashboardConfig, DashboardServer};
