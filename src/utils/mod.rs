pub mod config;
pub mod url;

pub use config::HarnessConfig;
