use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use super::types::{Outcome, TestResult, TestType};
use crate::error::ExportError;

/// Generate JUnit XML with one `<testsuite>` per test type
pub fn generate_junit_xml(results: &[TestResult]) -> quick_xml::Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let failures = results.iter().filter(|r| r.outcome.is_weakness()).count();

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "strict-qa-run"));
    suites_start.push_attribute(("tests", results.len().to_string().as_str()));
    suites_start.push_attribute(("failures", failures.to_string().as_str()));
    writer.write_event(Event::Start(suites_start))?;

    let mut grouped: BTreeMap<TestType, Vec<&TestResult>> = BTreeMap::new();
    for result in results {
        grouped.entry(result.test_type).or_default().push(result);
    }

    for (test_type, cases) in grouped {
        let failed = cases.iter().filter(|r| r.outcome.is_weakness()).count();
        let mut suite_start = BytesStart::new("testsuite");
        suite_start.push_attribute(("name", test_type.as_str()));
        suite_start.push_attribute(("tests", cases.len().to_string().as_str()));
        suite_start.push_attribute(("failures", failed.to_string().as_str()));
        if let Some(first) = cases.first() {
            suite_start.push_attribute(("timestamp", first.timestamp.to_rfc3339().as_str()));
        }
        writer.write_event(Event::Start(suite_start))?;

        for case in cases {
            write_test_case(&mut writer, case)?;
        }

        writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    result: &TestResult,
) -> quick_xml::Result<()> {
    let classname = format!("strict-qa.{}", result.test_type.as_str().replace(' ', "_"));
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", result.case_name.as_str()));
    case_start.push_attribute(("classname", classname.as_str()));
    writer.write_event(Event::Start(case_start))?;

    if result.outcome != Outcome::Pass {
        let mut fail_start = BytesStart::new("failure");
        fail_start.push_attribute(("message", result.details.as_str()));
        fail_start.push_attribute(("type", result.outcome.as_str()));
        writer.write_event(Event::Start(fail_start))?;
        writer.write_event(Event::Text(BytesText::new(&format!(
            "severity: {}",
            result.severity
        ))))?;
        writer.write_event(Event::End(BytesEnd::new("failure")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

pub fn write(results: &[TestResult], path: &Path) -> Result<(), ExportError> {
    let xml = generate_junit_xml(results).map_err(|e| ExportError::encode("junit", e))?;
    std::fs::write(path, xml).map_err(|e| ExportError::unwritable(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::Severity;

    #[test]
    fn test_generate_junit_xml() {
        let results = vec![
            TestResult::pass("Login Page Loads", "ok", TestType::Ui),
            TestResult::bug(
                "Invalid Credentials Test",
                "No error message shown",
                TestType::Security,
                Severity::High,
            ),
            TestResult::fail("Responsive Navigation", "TIMEOUT", TestType::Ui, Severity::Medium),
        ];

        let xml = generate_junit_xml(&results).expect("Failed to generate XML");

        assert!(xml.contains(r#"<testsuites name="strict-qa-run""#));
        assert!(xml.contains(r#"tests="3""#));
        assert!(xml.contains(r#"failures="2""#));
        assert!(xml.contains(r#"<testsuite name="UI" tests="2" failures="1""#));
        assert!(xml.contains(r#"<testcase name="Login Page Loads""#));
        assert!(xml.contains(r#"message="No error message shown" type="BUG""#));
    }
}
