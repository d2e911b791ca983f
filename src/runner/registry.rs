//! Static suite registry and run presets.

use serde::Serialize;
use std::str::FromStr;

use super::suite::{AdapterKind, SuiteDefinition};
use crate::suites;

/// Every suite known to the harness, in default execution order.
pub fn all() -> [SuiteDefinition; 5] {
    [
        suites::signup::SUITE,
        suites::login::SUITE,
        suites::navigation::SUITE,
        suites::forms::SUITE,
        suites::api::SUITE,
    ]
}

pub fn ids() -> Vec<&'static str> {
    all().iter().map(|s| s.id).collect()
}

pub fn lookup(id: &str) -> Option<SuiteDefinition> {
    all().into_iter().find(|s| s.id == id)
}

/// Ids in `requested` that are not registered, in request order.
pub fn unknown(requested: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|id| lookup(id).is_none())
        .cloned()
        .collect()
}

/// Registry listing served to the CLI and dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteInfo {
    pub id: &'static str,
    pub title: &'static str,
    pub adapter: &'static str,
    pub checks: Vec<&'static str>,
}

pub fn describe() -> Vec<SuiteInfo> {
    all()
        .iter()
        .map(|s| SuiteInfo {
            id: s.id,
            title: s.title,
            adapter: match s.adapter {
                AdapterKind::Browser => "browser",
                AdapterKind::Http => "http",
            },
            checks: (s.checks)().iter().map(|c| c.name).collect(),
        })
        .collect()
}

/// Named suite selections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Full user journey
    E2e,
    Smoke,
    Integration,
}

impl Preset {
    pub fn suites(&self, include_api: bool) -> Vec<String> {
        let mut ids: Vec<&str> = match self {
            Preset::E2e => vec!["signup", "login", "navigation", "forms"],
            Preset::Smoke => vec!["navigation", "forms"],
            Preset::Integration => vec!["api"],
        };
        if include_api && !ids.contains(&"api") {
            ids.push("api");
        }
        ids.into_iter().map(String::from).collect()
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "e2e" => Ok(Preset::E2e),
            "smoke" => Ok(Preset::Smoke),
            "integration" => Ok(Preset::Integration),
            other => Err(format!("unknown preset: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_enumerable() {
        assert_eq!(ids(), vec!["signup", "login", "navigation", "forms", "api"]);
        for info in describe() {
            assert!(!info.checks.is_empty(), "{} has no checks", info.id);
        }
        assert_eq!(lookup("api").map(|s| s.adapter), Some(AdapterKind::Http));
    }

    #[test]
    fn test_unknown_ids_are_reported_in_order() {
        let requested = vec!["login".to_string(), "checkout".to_string(), "cart".to_string()];
        assert_eq!(unknown(&requested), vec!["checkout", "cart"]);
    }

    #[test]
    fn test_presets() {
        assert_eq!(Preset::E2e.suites(true).len(), 5);
        assert_eq!(Preset::Smoke.suites(false), vec!["navigation", "forms"]);
        assert_eq!(Preset::Integration.suites(true), vec!["api"]);
        assert!("nightly".parse::<Preset>().is_err());
    }

    #[test]
    fn test_check_names_unique_within_suite() {
        for suite in all() {
            let mut names: Vec<_> = (suite.checks)().iter().map(|c| c.name).collect();
            let before = names.len();
            names.sort();
            names.dedup();
            assert_eq!(before, names.len(), "duplicate check names in {}", suite.id);
        }
    }
}
