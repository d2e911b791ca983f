//! Account creation page.

use super::{
    any_css, email_field, error_count, fill_present, open, password_field, submit_button,
    submit_if_present, submitted_successfully, type_and_blur, username_field, SQL_ERROR_MARKERS,
};
use crate::data::payloads::{max_len, PayloadClass};
use crate::data::DataKind;
use crate::driver::{FormSubmission, Locator};
use crate::report::{Severity, TestType};
use crate::runner::suite::{
    default_policy, AdapterKind, Check, CheckContext, CheckFuture, SuiteDefinition, Verdict,
};

pub const SUITE: SuiteDefinition = SuiteDefinition {
    id: "signup",
    title: "Signup",
    adapter: AdapterKind::Browser,
    checks,
    policy: default_policy,
};

const PATH: &str = "/signup";
const SUBMIT_LABELS: [&str; 2] = ["Sign Up", "Register"];
const TITLE_KEYWORDS: [&str; 4] = ["signup", "sign up", "register", "registration"];
const INVALID_EMAILS: [&str; 5] = [
    "invalid-email",
    "test@",
    "@example.com",
    "test..test@example.com",
    "test@.com",
];
const WEAK_PASSWORDS: [&str; 4] = ["123", "abc", "password", "12345678"];

pub fn checks() -> Vec<Check> {
    vec![
        Check::new("Signup Page Loads", TestType::Ui, page_loads).primary(),
        Check::new("Required Fields Validation", TestType::Form, required_fields),
        Check::new("Email Format Validation", TestType::Form, email_format),
        Check::new("Password Validation", TestType::Form, password_strength),
        Check::new("Successful Signup", TestType::UserFlow, successful_signup).primary(),
        Check::new("Long Input Handling", TestType::Form, long_input),
        Check::new("Special Characters Handling", TestType::Form, special_characters),
        Check::new("SQL Injection Handling", TestType::Security, sql_injection),
        Check::new("XSS Handling", TestType::Security, xss),
        Check::new("Form Submission Validation", TestType::Form, empty_submission),
    ]
}

fn signup_fields() -> Locator {
    any_css(&[
        "input[name='email']",
        "input[name='username']",
        "input[name='password']",
        "input[name='first_name']",
        "input[name='last_name']",
        "input[type='email']",
        "input[type='password']",
        "#email",
        "#username",
        "#password",
        "#first_name",
        "#last_name",
    ])
}

fn page_loads(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let title = browser.title().await?;
        let lower = title.to_lowercase();
        if TITLE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            Ok(Verdict::pass(format!(
                "Signup page loaded successfully. Title: {}",
                title
            )))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!("Page title doesn't indicate signup page: {}", title),
            ))
        }
    })
}

fn required_fields(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        if !browser.is_present(&signup_fields()).await? {
            return Ok(Verdict::bug(
                Severity::High,
                "No common signup form fields found on the page",
            )
            .with_type(TestType::Ui));
        }
        let Some(submit) = submit_if_present(browser, &SUBMIT_LABELS).await? else {
            return Ok(Verdict::bug(
                Severity::Medium,
                "No submit button found to test form validation",
            )
            .with_type(TestType::Ui));
        };

        browser.click(&submit).await?;
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        let errors = error_count(browser).await?;
        if errors > 0 {
            Ok(Verdict::pass(format!(
                "Form shows validation messages for empty required fields. Found {} error messages.",
                errors
            )))
        } else {
            Ok(Verdict::bug(
                Severity::High,
                "Form submitted without validation messages for empty required fields",
            ))
        }
    })
}

fn email_format(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let field = email_field();
        if !browser.is_present(&field).await? {
            return Ok(Verdict::bug(Severity::High, "No email field found on signup form")
                .with_type(TestType::Ui));
        }

        let generated = ctx.data.generate(DataKind::InvalidUser, None);
        let mut candidates: Vec<&str> = INVALID_EMAILS.to_vec();
        candidates.push(generated.get("email"));

        let mut flagged = Vec::new();
        for email in candidates {
            type_and_blur(browser, &field, email).await?;
            if error_count(browser).await? > 0 {
                flagged.push(email.to_string());
            }
        }

        if flagged.is_empty() {
            Ok(Verdict::bug(
                Severity::High,
                "Email validation not working. Invalid email formats are accepted.",
            ))
        } else {
            Ok(Verdict::pass(format!(
                "Email validation working. Rejected formats: {}",
                flagged.join(", ")
            )))
        }
    })
}

fn password_strength(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let field = password_field();
        if !browser.is_present(&field).await? {
            return Ok(Verdict::bug(Severity::High, "No password field found on signup form")
                .with_type(TestType::Ui));
        }

        let mut flagged = 0;
        for password in WEAK_PASSWORDS {
            type_and_blur(browser, &field, password).await?;
            if error_count(browser).await? > 0 {
                flagged += 1;
            }
        }

        if flagged > 0 {
            Ok(Verdict::pass(format!(
                "Password validation working. {} of {} weak passwords rejected.",
                flagged,
                WEAK_PASSWORDS.len()
            )))
        } else {
            Ok(Verdict::bug(
                Severity::High,
                "Password validation not working. Weak passwords are accepted.",
            ))
        }
    })
}

fn successful_signup(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let user = ctx.data.generate(DataKind::ValidUser, None);

        let wanted: Vec<(&str, Locator, String)> = [
            "first_name",
            "last_name",
            "email",
            "username",
            "password",
            "phone",
        ]
        .into_iter()
        .map(|name| {
            let locator = match name {
                "email" => email_field(),
                "password" => password_field(),
                other => Locator::field(other),
            };
            (name, locator, user.get(name).to_string())
        })
        .collect();

        let mut form = fill_present(browser, &wanted).await?;
        if form.fields.is_empty() {
            return Ok(Verdict::bug(
                Severity::High,
                "No form fields found to complete signup",
            ));
        }

        // Confirmation fields mirror the password.
        let confirm = any_css(&[
            "input[name='confirm_password']",
            "input[name='password_confirmation']",
            "#confirm_password",
        ]);
        if browser.is_present(&confirm).await? {
            form = form.field_at(confirm, "confirm_password", user.get("password"));
        }
        if let Some(submit) = submit_if_present(browser, &SUBMIT_LABELS).await? {
            form = form.submit_with(submit);
        }

        let filled = form.fields.len();
        let (ok, detail) = submitted_successfully(browser, &form).await?;
        if ok {
            Ok(Verdict::pass(format!(
                "Signup completed with {} fields: {}",
                filled, detail
            )))
        } else {
            Ok(Verdict::bug(
                Severity::High,
                format!("Signup with valid data did not succeed: {}", detail),
            ))
        }
    })
}

fn long_input(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let field = email_field();
        if !browser.is_present(&field).await? {
            return Ok(Verdict::pass("No email field to test long input"));
        }

        let limit = max_len("email").unwrap_or(254);
        let oversized = format!("{}@example.com", "a".repeat(limit));
        browser.type_text(&field, &oversized).await?;
        let kept = browser.locate(&field).await?.text.chars().count();

        if kept > limit {
            Ok(Verdict::bug(
                Severity::Medium,
                format!(
                    "Form accepts {} characters in the email field, above the {} character limit",
                    kept, limit
                ),
            ))
        } else {
            Ok(Verdict::pass("Form properly limits or handles long input"))
        }
    })
}

fn special_characters(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let field = any_css(&["input[name='last_name']", "#last_name", "input[name='username']", "#username"]);
        if !browser.is_present(&field).await? {
            return Ok(Verdict::pass("No name field to test special characters"));
        }

        let edge = ctx.data.generate(DataKind::EdgeCase, None);
        let sample = edge.get("last_name");
        browser.type_text(&field, sample).await?;
        let kept = browser.locate(&field).await?.text;

        if kept.is_empty() || kept == sample {
            Ok(Verdict::pass("Form accepts special characters in name fields"))
        } else {
            Ok(Verdict::bug(
                Severity::Low,
                format!("Special characters were altered: typed '{}', field holds '{}'", sample, kept),
            ))
        }
    })
}

fn sql_injection(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let field = username_field();
        if !browser.is_present(&field).await? {
            return Ok(Verdict::pass("No input field to test SQL injection"));
        }

        let payloads = ctx.data.adversarial(PayloadClass::SqlInjection);
        let payload = payloads.first().copied().unwrap_or("' OR '1'='1");
        let mut form = FormSubmission::new().field_at(field, "email", payload);
        if let Some(submit) = submit_if_present(browser, &SUBMIT_LABELS).await? {
            form = form.submit_with(submit);
        }
        browser.submit_form(&form).await?;

        let source = browser.page_source().await?.to_lowercase();
        match SQL_ERROR_MARKERS.iter().find(|m| source.contains(*m)) {
            Some(marker) => Ok(Verdict::bug(
                Severity::Critical,
                format!("Database error leaked after SQL injection payload ({})", marker),
            )),
            None => Ok(Verdict::pass("Form handles SQL injection attempts safely")),
        }
    })
}

fn xss(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let field = any_css(&[
            "input[name='first_name']",
            "input[name='username']",
            "input[name='name']",
            "input[type='text']",
        ]);
        if !browser.is_present(&field).await? {
            return Ok(Verdict::pass("No text field to test XSS"));
        }

        let payload = ctx
            .data
            .adversarial(PayloadClass::Xss)
            .first()
            .copied()
            .unwrap_or("<script>alert('XSS')</script>");
        let mut form = FormSubmission::new().field_at(field, "first_name", payload);
        if let Some(submit) = submit_if_present(browser, &SUBMIT_LABELS).await? {
            form = form.submit_with(submit);
        }
        browser.submit_form(&form).await?;

        if browser.page_source().await?.contains(payload) {
            Ok(Verdict::bug(
                Severity::High,
                "Script payload is reflected into the page without encoding",
            ))
        } else {
            Ok(Verdict::pass("Script payload is not reflected unencoded"))
        }
    })
}

fn empty_submission(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let submit = submit_button(&SUBMIT_LABELS);
        if !browser.is_present(&submit).await? {
            return Ok(Verdict::bug(
                Severity::Medium,
                "No submit button found to test form validation",
            )
            .with_type(TestType::Ui));
        }

        browser.click(&submit).await?;
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        let url = browser.current_url().await?;
        if url.contains(PATH) {
            Ok(Verdict::pass("Form prevents submission without required data"))
        } else {
            Ok(Verdict::bug(
                Severity::High,
                format!("Form allows submission without required data (now at {})", url),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{browser_ctx, run_named, visible, with_text};
    use super::super::{ERROR_MARKERS, SUCCESS_MARKERS};
    use super::*;
    use crate::driver::traits::scripted::ScriptedAdapter;
    use crate::error::AdapterError;
    use crate::report::Outcome;

    async fn run(name: &str, adapter: ScriptedAdapter) -> crate::report::TestResult {
        run_named(checks(), SUITE.policy, name, &browser_ctx(adapter)).await
    }

    #[tokio::test]
    async fn test_title_decides_page_load() {
        let ok = run(
            "Signup Page Loads",
            ScriptedAdapter::new().with_page("<html></html>", "Create account | Register"),
        )
        .await;
        assert_eq!(ok.outcome, Outcome::Pass);

        let wrong = run(
            "Signup Page Loads",
            ScriptedAdapter::new().with_page("<html></html>", "Home"),
        )
        .await;
        assert_eq!(wrong.outcome, Outcome::Bug);
        assert_eq!(wrong.severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_unreachable_signup_page_is_critical() {
        let result = run(
            "Signup Page Loads",
            ScriptedAdapter::new()
                .failing_navigation(AdapterError::connection_refused("net::ERR_CONNECTION_REFUSED")),
        )
        .await;
        assert_eq!(result.outcome, Outcome::Fail);
        assert_eq!(result.severity, Severity::Critical);
        assert!(result.details.contains("CONNECTION_REFUSED"));
    }

    #[tokio::test]
    async fn test_required_fields_with_visible_errors_pass() {
        let adapter = ScriptedAdapter::new()
            .element(&Locator::css("input[name='email']"), visible(1))
            .element(&Locator::css("button[type='submit']"), visible(1))
            .element(&Locator::css(ERROR_MARKERS), visible(2));
        let result = run("Required Fields Validation", adapter).await;
        assert_eq!(result.outcome, Outcome::Pass);
        assert!(result.details.contains("Found 2 error messages"));
    }

    #[tokio::test]
    async fn test_missing_submit_button_is_ui_bug() {
        let adapter =
            ScriptedAdapter::new().element(&Locator::css("input[name='email']"), visible(1));
        let result = run("Required Fields Validation", adapter).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.test_type, TestType::Ui);
        assert_eq!(result.severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_email_without_feedback_is_high_bug() {
        let adapter =
            ScriptedAdapter::new().element(&Locator::css("input[name='email']"), visible(1));
        let result = run("Email Format Validation", adapter).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.severity, Severity::High);
    }

    #[tokio::test]
    async fn test_successful_signup_detects_success_marker() {
        let adapter = ScriptedAdapter::new()
            .element(&Locator::css("input[name='email']"), visible(1))
            .element(&Locator::css("input[name='password']"), visible(1))
            .element(&Locator::css(SUCCESS_MARKERS), visible(1));
        let result = run("Successful Signup", adapter).await;
        assert_eq!(result.outcome, Outcome::Pass);
        assert!(result.details.contains("2 fields"));
    }

    #[tokio::test]
    async fn test_oversized_email_value_is_flagged() {
        let limit = max_len("email").unwrap();
        let adapter = ScriptedAdapter::new().element(
            &Locator::css("input[name='email']"),
            with_text(&"a".repeat(limit + 12)),
        );
        let result = run("Long Input Handling", adapter).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_leaked_sql_error_is_critical() {
        let adapter = ScriptedAdapter::new()
            .element(&Locator::css("input[name='username']"), visible(1))
            .with_page(
                "<p>You have an error in your SQL syntax near ''1'='1'</p>",
                "Register",
            );
        let result = run("SQL Injection Handling", adapter).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.test_type, TestType::Security);
    }

    #[tokio::test]
    async fn test_reflected_script_is_xss_bug() {
        let adapter = ScriptedAdapter::new()
            .element(&Locator::css("input[name='first_name']"), visible(1))
            .with_page("<p>Hello <script>alert('XSS')</script></p>", "Register");
        let result = run("XSS Handling", adapter).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.severity, Severity::High);
    }

    #[tokio::test]
    async fn test_missing_page_elements_still_yield_one_result_each() {
        let ctx = browser_ctx(ScriptedAdapter::new());
        for check in checks() {
            let result =
                crate::runner::suite::run_check(&check, &ctx, SUITE.policy).await;
            assert_eq!(result.case_name, check.name);
        }
    }
}
