use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Verdict of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Pass,
    Fail,
    Bug,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Pass, Outcome::Fail, Outcome::Bug];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pass => "PASS",
            Outcome::Fail => "FAIL",
            Outcome::Bug => "BUG",
        }
    }

    /// FAIL and BUG both count as weaknesses.
    pub fn is_weakness(&self) -> bool {
        !matches!(self, Outcome::Pass)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

/// Functional area a result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TestType {
    #[serde(rename = "UI")]
    Ui,
    #[serde(rename = "API")]
    Api,
    Form,
    Navigation,
    #[serde(rename = "User Flow")]
    UserFlow,
    Security,
    Performance,
    Accessibility,
    System,
}

impl TestType {
    pub const ALL: [TestType; 9] = [
        TestType::Ui,
        TestType::Api,
        TestType::Form,
        TestType::Navigation,
        TestType::UserFlow,
        TestType::Security,
        TestType::Performance,
        TestType::Accessibility,
        TestType::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Ui => "UI",
            TestType::Api => "API",
            TestType::Form => "Form",
            TestType::Navigation => "Navigation",
            TestType::UserFlow => "User Flow",
            TestType::Security => "Security",
            TestType::Performance => "Performance",
            TestType::Accessibility => "Accessibility",
            TestType::System => "System",
        }
    }
}

macro_rules! display_from_str {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| format!("unknown {}: {}", $what, s))
            }
        }
    };
}

display_from_str!(Outcome, "outcome");
display_from_str!(Severity, "severity");
display_from_str!(TestType, "test type");

/// One recorded check outcome. Immutable once handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub case_name: String,
    pub outcome: Outcome,
    pub details: String,
    pub test_type: TestType,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl TestResult {
    pub fn new(
        case_name: impl Into<String>,
        outcome: Outcome,
        details: impl Into<String>,
        test_type: TestType,
        severity: Severity,
    ) -> Self {
        Self {
            case_name: case_name.into(),
            outcome,
            details: details.into(),
            test_type,
            severity,
            // Millisecond precision keeps the row format lossless.
            timestamp: Utc::now().trunc_subsecs(3),
        }
    }

    pub fn pass(case_name: impl Into<String>, details: impl Into<String>, test_type: TestType) -> Self {
        Self::new(case_name, Outcome::Pass, details, test_type, Severity::Low)
    }

    pub fn fail(
        case_name: impl Into<String>,
        details: impl Into<String>,
        test_type: TestType,
        severity: Severity,
    ) -> Self {
        Self::new(case_name, Outcome::Fail, details, test_type, severity)
    }

    pub fn bug(
        case_name: impl Into<String>,
        details: impl Into<String>,
        test_type: TestType,
        severity: Severity,
    ) -> Self {
        Self::new(case_name, Outcome::Bug, details, test_type, severity)
    }

    pub fn to_row(&self) -> ReportRow {
        ReportRow {
            case_name: self.case_name.clone(),
            outcome: self.outcome.to_string(),
            details: self.details.clone(),
            test_type: self.test_type.to_string(),
            severity: self.severity.to_string(),
            timestamp: format_timestamp(&self.timestamp),
        }
    }

    pub fn from_row(row: &ReportRow) -> Result<Self, String> {
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| format!("bad timestamp {:?}: {}", row.timestamp, e))?
            .with_timezone(&Utc);
        Ok(Self {
            case_name: row.case_name.clone(),
            outcome: row.outcome.parse()?,
            details: row.details.clone(),
            test_type: row.test_type.parse()?,
            severity: row.severity.parse()?,
            timestamp,
        })
    }
}

/// Tabular rendering of a [`TestResult`], shared by every row-based format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub case_name: String,
    pub outcome: String,
    pub details: String,
    pub test_type: String,
    pub severity: String,
    pub timestamp: String,
}

impl ReportRow {
    pub const COLUMNS: [&'static str; 6] = [
        "caseName",
        "outcome",
        "details",
        "testType",
        "severity",
        "timestamp",
    ];

    pub fn cells(&self) -> [&str; 6] {
        [
            &self.case_name,
            &self.outcome,
            &self.details,
            &self.test_type,
            &self.severity,
            &self.timestamp,
        ]
    }

    pub fn from_cells(cells: &[String]) -> Option<Self> {
        if cells.len() < Self::COLUMNS.len() {
            return None;
        }
        Some(Self {
            case_name: cells[0].clone(),
            outcome: cells[1].clone(),
            details: cells[2].clone(),
            test_type: cells[3].clone(),
            severity: cells[4].clone(),
            timestamp: cells[5].clone(),
        })
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Results with arbitrary names and details, control characters included.
#[cfg(test)]
pub(crate) mod strategies {
    use super::*;
    use proptest::prelude::*;

    pub fn arb_result() -> impl Strategy<Value = TestResult> {
        (
            any::<String>(),
            prop::sample::select(Outcome::ALL.to_vec()),
            any::<String>(),
            prop::sample::select(TestType::ALL.to_vec()),
            prop::sample::select(Severity::ALL.to_vec()),
        )
            .prop_map(|(name, outcome, details, test_type, severity)| {
                TestResult::new(name, outcome, details, test_type, severity)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_text_forms() {
        assert_eq!("bug".parse::<Outcome>().unwrap(), Outcome::Bug);
        assert_eq!("User Flow".parse::<TestType>().unwrap(), TestType::UserFlow);
        assert_eq!(TestType::Api.to_string(), "API");
        assert!("Blocker".parse::<Severity>().is_err());
        assert_eq!(
            serde_json::to_string(&TestType::Ui).unwrap(),
            "\"UI\"".to_string()
        );
    }

    #[test]
    fn test_row_conversion_preserves_result() {
        let result = TestResult::bug(
            "Broken Links",
            "2 broken: /a, /b",
            TestType::Navigation,
            Severity::High,
        );
        let back = TestResult::from_row(&result.to_row()).unwrap();
        assert_eq!(back, result);
    }
}
