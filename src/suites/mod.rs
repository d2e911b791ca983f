//! Registered suites and the page helpers they share.

pub mod api;
pub mod forms;
pub mod login;
pub mod navigation;
pub mod signup;

use std::time::Duration;

use crate::driver::{BrowserSession, FormSubmission, HttpRequest, HttpResponse, Locator};
use crate::error::{AdapterError, AdapterErrorKind};
use crate::runner::suite::{CheckContext, CheckError};

/// Elements that indicate a validation or error message.
pub(crate) const ERROR_MARKERS: &str =
    ".error, .validation-error, .field-error, [class*='error'], [class*='invalid'], :invalid";

/// Elements that indicate a successful submission.
pub(crate) const SUCCESS_MARKERS: &str =
    ".success, .alert-success, [class*='success'], [class*='welcome'], [class*='thank']";

/// URL fragments seen after a successful signup or login.
pub(crate) const SUCCESS_URL_HINTS: [&str; 5] = ["success", "welcome", "dashboard", "profile", "home"];

pub(crate) fn any_css(selectors: &[&str]) -> Locator {
    Locator::AnyOf(selectors.iter().map(|s| Locator::css(*s)).collect())
}

pub(crate) fn email_field() -> Locator {
    any_css(&[
        "input[name='email']",
        "input[type='email']",
        "#email",
        "input[placeholder*='email' i]",
    ])
}

pub(crate) fn username_field() -> Locator {
    any_css(&[
        "input[name='username']",
        "input[name='email']",
        "input[type='email']",
        "#username",
        "#email",
        "input[placeholder*='username' i]",
    ])
}

pub(crate) fn password_field() -> Locator {
    any_css(&[
        "input[name='password']",
        "input[type='password']",
        "#password",
        "input[placeholder*='password' i]",
    ])
}

pub(crate) fn submit_button(labels: &[&str]) -> Locator {
    let mut all = vec![
        Locator::css("button[type='submit']"),
        Locator::css("input[type='submit']"),
    ];
    all.extend(labels.iter().map(|l| Locator::text(*l)));
    all.push(Locator::css("#submit"));
    all.push(Locator::css(".submit-btn"));
    Locator::AnyOf(all)
}

/// Navigate the suite's browser to `path` and hand it back.
pub(crate) async fn open<'a>(
    ctx: &'a CheckContext,
    path: &str,
) -> Result<&'a dyn BrowserSession, CheckError> {
    let browser = ctx.browser()?;
    browser.navigate(&ctx.url(path)).await?;
    Ok(browser)
}

/// Number of visible error markers on the current page.
pub(crate) async fn error_count(browser: &dyn BrowserSession) -> Result<usize, CheckError> {
    Ok(browser.locate(&Locator::css(ERROR_MARKERS)).await?.count)
}

/// Type into `field` and move focus away so blur validation fires.
pub(crate) async fn type_and_blur(
    browser: &dyn BrowserSession,
    field: &Locator,
    value: &str,
) -> Result<(), CheckError> {
    browser.type_text(field, value).await?;
    // Clicking the body blurs the field without submitting.
    if let Err(e) = browser.click(&Locator::css("body")).await {
        log::debug!("blur after typing failed: {}", e);
    }
    tokio::time::sleep(Duration::from_millis(300)).await;
    Ok(())
}

/// How long a submitted form gets to show a success marker.
pub(crate) const SUBMIT_SETTLE: Duration = Duration::from_secs(2);

pub(crate) fn has_success_hint(url: &str) -> bool {
    let url = url.to_lowercase();
    SUCCESS_URL_HINTS.iter().any(|hint| url.contains(hint))
}

/// Wait up to [`SUBMIT_SETTLE`] for `feedback`; false when it never shows.
pub(crate) async fn await_feedback(
    browser: &dyn BrowserSession,
    feedback: &Locator,
) -> Result<bool, CheckError> {
    match browser.wait_for(feedback, SUBMIT_SETTLE).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind == AdapterErrorKind::Timeout => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Submit the form on the current page and report whether the page now looks
/// like a success.
///
/// An immediate redirect to a success URL wins. Otherwise the page gets
/// [`SUBMIT_SETTLE`] to show a success marker before the settled URL is
/// checked once more.
pub(crate) async fn submitted_successfully(
    browser: &dyn BrowserSession,
    form: &FormSubmission,
) -> Result<(bool, String), CheckError> {
    let nav = browser.submit_form(form).await?;
    if has_success_hint(&nav.final_url) {
        return Ok((true, format!("redirected to {}", nav.final_url)));
    }

    if await_feedback(browser, &Locator::css(SUCCESS_MARKERS)).await? {
        return Ok((true, "success message displayed".to_string()));
    }

    let settled = browser.current_url().await?;
    if has_success_hint(&settled) {
        return Ok((true, format!("redirected to {}", settled)));
    }
    let shown = if settled.is_empty() { &nav.final_url } else { &settled };
    Ok((false, format!("no success indication, current URL {}", shown)))
}

/// Fill the first matching input for each `(name, value)`; returns the fields
/// that were found.
pub(crate) async fn fill_present(
    browser: &dyn BrowserSession,
    fields: &[(&str, Locator, String)],
) -> Result<FormSubmission, CheckError> {
    let mut form = FormSubmission::new();
    for (name, locator, value) in fields {
        if browser.is_present(locator).await? {
            form = form.field_at(locator.clone(), name, value.clone());
        }
    }
    Ok(form)
}

/// First response among `paths` that satisfies `accept`.
///
/// Transport failures on individual paths are skipped. When no path answered
/// at all, the first failure is returned so the check is classified by it.
pub(crate) async fn first_response<F, P>(
    ctx: &CheckContext,
    paths: &[&'static str],
    build: F,
    accept: P,
) -> Result<Option<(&'static str, HttpResponse)>, CheckError>
where
    F: Fn(String) -> HttpRequest,
    P: Fn(&HttpResponse) -> bool,
{
    let http = ctx.http()?;
    let mut answered = false;
    let mut first_error: Option<AdapterError> = None;

    for &path in paths {
        match http.request(&build(ctx.url(path))).await {
            Ok(resp) => {
                answered = true;
                if accept(&resp) {
                    return Ok(Some((path, resp)));
                }
            }
            Err(e) => {
                log::debug!("{} unreachable: {}", path, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if !answered => Err(e.into()),
        _ => Ok(None),
    }
}

/// The submit locator, if the page has a matching button.
pub(crate) async fn submit_if_present(
    browser: &dyn BrowserSession,
    labels: &[&str],
) -> Result<Option<Locator>, CheckError> {
    let submit = submit_button(labels);
    Ok(browser.is_present(&submit).await?.then_some(submit))
}

/// Text fragments databases leak into pages when a query breaks.
pub(crate) const SQL_ERROR_MARKERS: [&str; 8] = [
    "sql syntax",
    "mysql_",
    "sqlite",
    "postgresql",
    "ora-0",
    "unclosed quotation",
    "odbc",
    "syntax error at or near",
];

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::data::DataProvider;
    use crate::driver::traits::scripted::ScriptedAdapter;
    use crate::driver::ElementInfo;
    use crate::report::TestResult;
    use crate::runner::suite::{run_check, Check, SeverityPolicy};
    use crate::utils::HarnessConfig;
    use std::sync::Arc;

    pub fn browser_ctx(adapter: ScriptedAdapter) -> CheckContext {
        let adapter = Arc::new(adapter);
        CheckContext {
            base_url: "http://shop.test".to_string(),
            data: Arc::new(DataProvider::new(Some(11))),
            config: Arc::new(HarnessConfig::default()),
            browser: Some(adapter.clone()),
            http: Some(adapter),
        }
    }

    pub fn visible(count: usize) -> ElementInfo {
        ElementInfo {
            visible: true,
            text: String::new(),
            count,
        }
    }

    pub fn with_text(text: &str) -> ElementInfo {
        ElementInfo {
            visible: true,
            text: text.to_string(),
            count: 1,
        }
    }

    pub async fn run_named(
        checks: Vec<Check>,
        policy: SeverityPolicy,
        name: &str,
        ctx: &CheckContext,
    ) -> TestResult {
        let check = checks
            .into_iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("no check named {}", name));
        run_check(&check, ctx, policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::testing::visible;
    use super::*;
    use crate::driver::traits::scripted::ScriptedAdapter;

    #[tokio::test]
    async fn test_submit_redirect_counts_as_success() {
        let browser = ScriptedAdapter::new();
        let form = FormSubmission::new().action("http://shop.test/welcome");
        let (ok, detail) = submitted_successfully(&browser, &form).await.unwrap();
        assert!(ok);
        assert_eq!(detail, "redirected to http://shop.test/welcome");
    }

    #[tokio::test]
    async fn test_submit_waits_for_success_marker() {
        let browser = ScriptedAdapter::new().element(&Locator::css(SUCCESS_MARKERS), visible(1));
        let form = FormSubmission::new().action("http://shop.test/register");
        let (ok, detail) = submitted_successfully(&browser, &form).await.unwrap();
        assert!(ok);
        assert_eq!(detail, "success message displayed");
    }

    #[tokio::test]
    async fn test_submit_without_marker_is_not_success() {
        let browser = ScriptedAdapter::new();
        let form = FormSubmission::new().action("http://shop.test/register");
        let (ok, detail) = submitted_successfully(&browser, &form).await.unwrap();
        assert!(!ok);
        assert_eq!(detail, "no success indication, current URL http://shop.test/register");
    }

    #[tokio::test]
    async fn test_lookup_failures_propagate() {
        let browser = ScriptedAdapter::new()
            .failing_lookup(AdapterError::protocol("text read: element detached"));
        let form = FormSubmission::new().action("http://shop.test/register");

        match submitted_successfully(&browser, &form).await {
            Err(CheckError::Adapter(e)) => assert_eq!(e.kind, AdapterErrorKind::ProtocolError),
            other => panic!("unexpected {:?}", other),
        }
        match error_count(&browser).await {
            Err(CheckError::Adapter(e)) => assert!(e.message.contains("detached")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
