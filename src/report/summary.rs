use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::types::{Outcome, Severity, TestResult, TestType};

/// Per test type counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeBreakdown {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub bugs: usize,
}

/// Statistics derived from a result sequence. Never stored on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub bugs: usize,
    pub pass_rate: f64,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_test_type: BTreeMap<TestType, TypeBreakdown>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

impl RunSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let mut summary = RunSummary {
            total: results.len(),
            ..Default::default()
        };

        for result in results {
            let entry = summary.by_test_type.entry(result.test_type).or_default();
            entry.total += 1;
            match result.outcome {
                Outcome::Pass => {
                    summary.passed += 1;
                    entry.passed += 1;
                }
                Outcome::Fail => {
                    summary.failed += 1;
                    entry.failed += 1;
                }
                Outcome::Bug => {
                    summary.bugs += 1;
                    entry.bugs += 1;
                }
            }
            *summary.by_severity.entry(result.severity).or_default() += 1;
        }

        summary.pass_rate = pass_rate(summary.passed, summary.total);
        summary
    }

    pub fn with_window(
        mut self,
        started_at: DateTime<Utc>,
        finished_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.started_at = Some(started_at);
        self.finished_at = finished_at;
        self.duration_ms = Some(
            (finished_at.unwrap_or_else(Utc::now) - started_at)
                .num_milliseconds()
                .max(0),
        );
        self
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Pass => self.passed,
            Outcome::Fail => self.failed,
            Outcome::Bug => self.bugs,
        }
    }

    pub fn weaknesses(&self) -> usize {
        self.failed + self.bugs
    }

    pub fn severity_count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}

fn pass_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (passed as f64 / total as f64 * 1000.0).round() / 10.0
    }
}

/// Follow-up advice derived from a result sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub priority: Severity,
    pub category: String,
    pub message: String,
}

impl Recommendation {
    fn new(priority: Severity, category: &str, message: String) -> Self {
        Self {
            priority,
            category: category.to_string(),
            message,
        }
    }
}

/// Pass rate below this percentage triggers a quality recommendation.
const PASS_RATE_THRESHOLD: f64 = 80.0;

pub fn recommendations(results: &[TestResult]) -> Vec<Recommendation> {
    if results.is_empty() {
        return vec![Recommendation::new(
            Severity::Low,
            "General",
            "No test results to analyze".to_string(),
        )];
    }

    let summary = RunSummary::from_results(results);
    let mut out = Vec::new();

    if summary.pass_rate < PASS_RATE_THRESHOLD {
        out.push(Recommendation::new(
            Severity::High,
            "Quality",
            format!(
                "Pass rate is {:.1}%, below {:.0}%; review failing flows before release",
                summary.pass_rate, PASS_RATE_THRESHOLD
            ),
        ));
    }

    if summary.bugs > 0 {
        out.push(Recommendation::new(
            Severity::High,
            "Bugs",
            format!(
                "{} bug(s) found; fix Critical and High severity items first",
                summary.bugs
            ),
        ));
    }

    for result in results
        .iter()
        .filter(|r| r.test_type == TestType::Security && r.outcome.is_weakness())
    {
        out.push(Recommendation::new(
            Severity::Critical,
            "Security",
            format!("Address security finding '{}': {}", result.case_name, result.details),
        ));
    }

    let slow: Vec<&str> = results
        .iter()
        .filter(|r| r.outcome.is_weakness() && r.details.to_lowercase().contains("timeout"))
        .map(|r| r.case_name.as_str())
        .collect();
    if !slow.is_empty() {
        out.push(Recommendation::new(
            Severity::Medium,
            "Performance",
            format!("Investigate timeouts in: {}", slow.join(", ")),
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_result() -> impl Strategy<Value = TestResult> {
        (
            prop::sample::select(Outcome::ALL.to_vec()),
            prop::sample::select(TestType::ALL.to_vec()),
            prop::sample::select(Severity::ALL.to_vec()),
            "[a-z ]{0,12}",
        )
            .prop_map(|(outcome, test_type, severity, name)| {
                TestResult::new(name, outcome, "generated", test_type, severity)
            })
    }

    proptest! {
        #[test]
        fn test_summary_matches_direct_scan(results in prop::collection::vec(arb_result(), 0..64)) {
            let summary = RunSummary::from_results(&results);

            prop_assert_eq!(summary.total, results.len());
            for outcome in Outcome::ALL {
                let scanned = results.iter().filter(|r| r.outcome == outcome).count();
                prop_assert_eq!(summary.count(outcome), scanned);
            }
            for severity in Severity::ALL {
                let scanned = results.iter().filter(|r| r.severity == severity).count();
                prop_assert_eq!(summary.severity_count(severity), scanned);
            }
            for test_type in TestType::ALL {
                let scanned = results.iter().filter(|r| r.test_type == test_type).count();
                let counted = summary.by_test_type.get(&test_type).map(|b| b.total).unwrap_or(0);
                prop_assert_eq!(counted, scanned);
            }
        }
    }

    #[test]
    fn test_recommendations_follow_findings() {
        let results = vec![
            TestResult::pass("Homepage Navigation", "ok", TestType::Navigation),
            TestResult::bug("API HTTPS", "served over http", TestType::Security, Severity::High),
            TestResult::fail(
                "Login Page Loads",
                "TIMEOUT: navigation timeout of 10000 ms exceeded",
                TestType::Ui,
                Severity::High,
            ),
        ];
        let recs = recommendations(&results);
        let categories: Vec<&str> = recs.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["Quality", "Bugs", "Security", "Performance"]);
        assert_eq!(recs[2].priority, Severity::Critical);
    }

    #[test]
    fn test_empty_results_have_single_recommendation() {
        let recs = recommendations(&[]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].message, "No test results to analyze");
    }
}
