//! Contact, search and feedback forms plus generic form hygiene.

use super::{
    any_css, await_feedback, error_count, fill_present, open, submit_if_present, type_and_blur,
    ERROR_MARKERS, SUCCESS_MARKERS,
};
use crate::data::{DataKind, DataRecord};
use crate::driver::{BrowserSession, FormSubmission, Locator};
use crate::error::AdapterErrorKind;
use crate::report::{Outcome, Severity, TestType};
use crate::runner::suite::{
    default_policy, AdapterKind, Check, CheckContext, CheckError, CheckFuture, SuiteDefinition,
    Verdict,
};
use crate::utils::url::resolve_link;

pub const SUITE: SuiteDefinition = SuiteDefinition {
    id: "forms",
    title: "Forms",
    adapter: AdapterKind::Browser,
    checks,
    policy: forms_policy,
};

const CONTACT_PAGES: [&str; 4] = ["/contact", "/contact-us", "/contactus", "/contact.html"];
const FEEDBACK_PAGES: [&str; 3] = ["/feedback", "/support", "/help"];
const SUBMIT_LABELS: [&str; 2] = ["Send", "Submit"];
const FILLABLE: &str = "form input:not([type='hidden']):not([type='submit']):not([type='button']), form textarea, form select";

pub fn checks() -> Vec<Check> {
    vec![
        Check::new("Contact Form Test", TestType::Form, contact_form),
        Check::new("Search Form Functionality", TestType::Form, search_form),
        Check::new("Feedback Form Test", TestType::Form, feedback_form),
        Check::new("Input Field Validation", TestType::Form, input_validation),
        Check::new("Form Submission Handling", TestType::Form, submission_handling),
        Check::new("Form Accessibility", TestType::Accessibility, accessibility),
        Check::new("Form Security", TestType::Security, security),
        Check::new("Form Error Handling", TestType::Form, error_handling),
    ]
}

/// Forms are optional on most sites, so a missing element is a minor finding.
fn forms_policy(err: &CheckError, primary: bool) -> (Outcome, Severity) {
    match err {
        CheckError::Adapter(e) if e.kind == AdapterErrorKind::NotFound && !primary => {
            (Outcome::Bug, Severity::Low)
        }
        _ => default_policy(err, primary),
    }
}

fn any_form() -> Locator {
    Locator::css("form")
}

/// First of `pages` that renders a form. Navigation failures skip the page;
/// when every page fails the first failure is returned.
async fn find_form_page<'a>(
    ctx: &'a CheckContext,
    pages: &[&'static str],
    form: &Locator,
) -> Result<(&'a dyn BrowserSession, Option<&'static str>), CheckError> {
    let browser = ctx.browser()?;
    let mut reached = false;
    let mut first_error = None;
    for page in pages {
        match browser.navigate(&ctx.url(page)).await {
            Ok(_) => {
                reached = true;
                if browser.is_present(form).await? {
                    return Ok((browser, Some(*page)));
                }
            }
            Err(e) => {
                log::debug!("{} not reachable: {}", page, e);
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) if !reached => Err(e.into()),
        _ => Ok((browser, None)),
    }
}

/// Fill the named fields of `record` that exist, submit, and judge the feedback.
async fn submit_record(
    browser: &dyn BrowserSession,
    record: &DataRecord,
    names: &[&str],
) -> Result<(usize, bool, bool), CheckError> {
    let wanted: Vec<(&str, Locator, String)> = names
        .iter()
        .map(|name| (*name, Locator::field(name), record.get(name).to_string()))
        .collect();
    let mut form = fill_present(browser, &wanted).await?;
    if let Some(submit) = submit_if_present(browser, &SUBMIT_LABELS).await? {
        form = form.submit_with(submit);
    }
    let filled = form.fields.len();
    browser.submit_form(&form).await?;
    await_feedback(browser, &any_css(&[SUCCESS_MARKERS, ERROR_MARKERS])).await?;
    let success = browser.is_present(&Locator::css(SUCCESS_MARKERS)).await?;
    let errors = error_count(browser).await? > 0;
    Ok((filled, success, errors))
}

fn feedback_verdict(page: &str, filled: usize, success: bool, errors: bool) -> Verdict {
    if success {
        Verdict::pass(format!(
            "Form on {} submitted successfully with {} fields",
            page, filled
        ))
    } else if errors {
        Verdict::pass(format!("Form on {} shows appropriate error messages", page))
    } else {
        Verdict::bug(
            Severity::Medium,
            format!("Form on {} doesn't provide clear feedback after submission", page),
        )
    }
}

fn contact_form(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let form = any_css(&[
            ".contact-form",
            "#contact-form",
            "form[action*='contact']",
            "form[name='contact']",
            "form",
        ]);
        let (browser, page) = find_form_page(ctx, &CONTACT_PAGES, &form).await?;
        let Some(page) = page else {
            return Ok(Verdict::pass("No contact form found (this is acceptable)"));
        };

        let record = ctx.data.generate(DataKind::ContactForm, None);
        let (filled, success, errors) =
            submit_record(browser, &record, &["name", "email", "subject", "message"]).await?;
        Ok(feedback_verdict(page, filled, success, errors))
    })
}

fn feedback_form(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let form = any_css(&[".feedback-form", "#feedback-form", "form[action*='feedback']", "form"]);
        let (browser, page) = find_form_page(ctx, &FEEDBACK_PAGES, &form).await?;
        let Some(page) = page else {
            return Ok(Verdict::pass("No feedback form found (this is acceptable)"));
        };

        let record = ctx.data.generate(DataKind::FeedbackForm, None);
        let (filled, success, errors) = submit_record(
            browser,
            &record,
            &["name", "email", "rating", "category", "comments"],
        )
        .await?;
        Ok(feedback_verdict(page, filled, success, errors))
    })
}

fn search_form(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        let field = any_css(&[
            "input[name='search']",
            "input[name='q']",
            "input[type='search']",
            "#search",
            ".search-input",
            "input[placeholder*='search' i]",
        ]);
        if !browser.is_present(&field).await? {
            return Ok(Verdict::pass("No search form found (this is acceptable)")
                .with_type(TestType::Ui));
        }

        let mut form = FormSubmission::new().field_at(field, "q", "test search query");
        let button = Locator::AnyOf(vec![
            Locator::css(".search-button"),
            Locator::css("#search-button"),
            Locator::text("Search"),
            Locator::css("button[type='submit']"),
        ]);
        if browser.is_present(&button).await? {
            form = form.submit_with(button);
        }
        let nav = browser.submit_form(&form).await?;

        let url = nav.final_url.to_lowercase();
        if ["search", "query", "q="].iter().any(|hint| url.contains(hint)) {
            Ok(Verdict::pass(format!(
                "Search form works. Redirected to: {}",
                nav.final_url
            )))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!(
                    "Search form doesn't redirect properly. Current URL: {}",
                    nav.final_url
                ),
            ))
        }
    })
}

fn input_validation(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        let attempts = [
            (Locator::css("input[type='email']"), "invalid-email"),
            (Locator::css("input[type='password']"), "123"),
            (Locator::css("input[required][type='text'], textarea[required]"), ""),
        ];

        let mut validated = 0;
        let mut silent = 0;
        for (field, value) in &attempts {
            if !browser.is_present(field).await? {
                continue;
            }
            type_and_blur(browser, field, value).await?;
            if error_count(browser).await? > 0 {
                validated += 1;
            } else {
                silent += 1;
            }
        }

        if validated + silent == 0 {
            return Ok(Verdict::pass("No input fields found to test (this is acceptable)"));
        }
        if validated >= silent {
            Ok(Verdict::pass(format!(
                "Input field validation works. {} fields validated, {} failed",
                validated, silent
            )))
        } else {
            Ok(Verdict::bug(
                Severity::High,
                format!(
                    "Input field validation not working. {} fields failed validation",
                    silent
                ),
            ))
        }
    })
}

fn submission_handling(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        if !browser.is_present(&any_form()).await? {
            return Ok(Verdict::pass("No forms found to test (this is acceptable)"));
        }

        let mut form = FormSubmission::new();
        if let Some(submit) = submit_if_present(browser, &SUBMIT_LABELS).await? {
            form = form.submit_with(submit);
        }
        browser.submit_form(&form).await?;

        let feedback = any_css(&[SUCCESS_MARKERS, ERROR_MARKERS, ".message", ".alert"]);
        if browser.is_present(&feedback).await? {
            Ok(Verdict::pass("Form submission provides user feedback"))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                "Form submission doesn't provide user feedback",
            ))
        }
    })
}

fn accessibility(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        if !browser.is_present(&any_form()).await? {
            return Ok(Verdict::pass("No forms found to test (this is acceptable)"));
        }

        let total = browser.locate(&Locator::css(FILLABLE)).await?.count;
        let aria = browser
            .locate(&Locator::css(
                "form [aria-label], form [aria-labelledby], label input, label textarea, label select",
            ))
            .await?
            .count;

        let mut issues = Vec::new();
        let ids = browser.attribute_values(&Locator::css(FILLABLE), "id").await?;
        let mut labelled = aria;
        for id in ids.iter().filter(|id| !id.is_empty()) {
            if browser
                .is_present(&Locator::css(format!("label[for='{}']", id)))
                .await?
            {
                labelled += 1;
            } else {
                issues.push(format!("Input field {} has no associated label", id));
            }
        }
        let anonymous = total.saturating_sub(labelled + issues.len());
        if anonymous > 0 {
            issues.push(format!("{} input fields have no id, label or aria-label", anonymous));
        }

        if issues.is_empty() {
            Ok(Verdict::pass("Forms have good accessibility features"))
        } else {
            let shown: Vec<&str> = issues.iter().take(3).map(String::as_str).collect();
            Ok(Verdict::bug(
                Severity::Medium,
                format!("Form accessibility issues found: {}", shown.join(", ")),
            ))
        }
    })
}

fn security(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        if !browser.is_present(&any_form()).await? {
            return Ok(Verdict::pass("No forms found to test (this is acceptable)"));
        }

        let mut issues = Vec::new();
        let csrf = Locator::css("form input[name*='csrf' i], form input[name*='token' i]");
        if !browser.is_present(&csrf).await? {
            issues.push("Form missing CSRF protection token".to_string());
        }
        for action in browser.attribute_values(&any_form(), "action").await? {
            if let Some(target) = resolve_link(&ctx.base_url, &action) {
                if target.starts_with("http://") {
                    issues.push(format!("Form action not using HTTPS: {}", target));
                }
            }
        }
        let exposed = Locator::css("input[type='password'][autocomplete='on']");
        if browser.is_present(&exposed).await? {
            issues.push("Password field allows autocomplete".to_string());
        }

        if issues.is_empty() {
            Ok(Verdict::pass("Forms have good security features"))
        } else {
            let shown: Vec<&str> = issues.iter().take(3).map(String::as_str).collect();
            Ok(Verdict::bug(
                Severity::High,
                format!("Form security issues found: {}", shown.join(", ")),
            ))
        }
    })
}

fn error_handling(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        if !browser.is_present(&any_form()).await? {
            return Ok(Verdict::pass("No forms found to test (this is acceptable)"));
        }

        let record = ctx.data.generate(DataKind::InvalidUser, None);
        let (filled, _success, errors) =
            submit_record(browser, &record, &["email", "password", "phone", "zip_code"]).await?;
        if filled == 0 {
            return Ok(Verdict::pass(
                "No forms could be tested for error handling (this is acceptable)",
            ));
        }
        if errors {
            Ok(Verdict::pass("Form error handling works. Invalid data shows error messages"))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!(
                    "Form error handling not working. {} invalid fields submitted without error messages",
                    filled
                ),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::traits::scripted::ScriptedAdapter;
    use crate::error::AdapterError;
    use crate::suites::testing::{browser_ctx, run_named, visible};

    async fn run(name: &str, adapter: ScriptedAdapter) -> crate::report::TestResult {
        run_named(checks(), SUITE.policy, name, &browser_ctx(adapter)).await
    }

    #[tokio::test]
    async fn test_absent_forms_are_acceptable() {
        for name in [
            "Contact Form Test",
            "Search Form Functionality",
            "Feedback Form Test",
            "Form Submission Handling",
            "Form Accessibility",
            "Form Security",
        ] {
            let result = run(name, ScriptedAdapter::new()).await;
            assert_eq!(result.outcome, Outcome::Pass, "{}", name);
            assert!(result.details.contains("acceptable"), "{}", name);
        }
    }

    #[tokio::test]
    async fn test_contact_form_with_success_message_passes() {
        let adapter = ScriptedAdapter::new()
            .element(&Locator::css("form"), visible(1))
            .element(&Locator::field("email"), visible(1))
            .element(&Locator::field("message"), visible(1))
            .element(&Locator::css(SUCCESS_MARKERS), visible(1));
        let result = run("Contact Form Test", adapter).await;
        assert_eq!(result.outcome, Outcome::Pass);
        assert!(result.details.contains("/contact"));
        assert!(result.details.contains("2 fields"));
    }

    #[tokio::test]
    async fn test_silent_contact_form_is_bug() {
        let adapter = ScriptedAdapter::new().element(&Locator::css("form"), visible(1));
        let result = run("Contact Form Test", adapter).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_unreachable_contact_pages_fail() {
        let adapter = ScriptedAdapter::new()
            .failing_navigation(AdapterError::connection_refused("net::ERR_CONNECTION_REFUSED"));
        let result = run("Contact Form Test", adapter).await;
        assert_eq!(result.outcome, Outcome::Fail);
        assert_eq!(result.severity, Severity::High);
    }

    #[tokio::test]
    async fn test_form_without_csrf_over_http_is_security_bug() {
        let adapter = ScriptedAdapter::new().element(&Locator::css("form"), visible(1));
        *adapter.attributes.lock().unwrap() = vec!["/subscribe".to_string()];
        let result = run("Form Security", adapter).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.severity, Severity::High);
        assert!(result.details.contains("CSRF"));
        assert!(result.details.contains("http://shop.test/subscribe"));
    }

    #[tokio::test]
    async fn test_unlabelled_inputs_are_accessibility_bug() {
        let adapter = ScriptedAdapter::new()
            .element(&Locator::css("form"), visible(1))
            .element(&Locator::css(FILLABLE), visible(2));
        let result = run("Form Accessibility", adapter).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.test_type, TestType::Accessibility);
        assert!(result.details.contains("2 input fields have no id"));
    }

    #[test]
    fn test_missing_element_is_minor_for_forms() {
        let missing = CheckError::from(AdapterError::not_found("css=form"));
        assert_eq!(forms_policy(&missing, false), (Outcome::Bug, Severity::Low));
        assert_eq!(forms_policy(&missing, true), (Outcome::Bug, Severity::High));
        let timeout = CheckError::from(AdapterError::timeout("slow"));
        assert_eq!(forms_policy(&timeout, false), default_policy(&timeout, false));
    }
}
