//! Sign-in page and session controls.

use std::time::Duration;

use super::{
    any_css, await_feedback, has_success_hint, open, password_field, submit_if_present,
    username_field, ERROR_MARKERS,
};
use crate::data::DataKind;
use crate::driver::{BrowserSession, FormSubmission, Locator};
use crate::report::{Severity, TestType};
use crate::runner::suite::{
    default_policy, AdapterKind, Check, CheckContext, CheckError, CheckFuture, SuiteDefinition,
    Verdict,
};

pub const SUITE: SuiteDefinition = SuiteDefinition {
    id: "login",
    title: "Login",
    adapter: AdapterKind::Browser,
    checks,
    policy: default_policy,
};

const PATH: &str = "/login";
const SUBMIT_LABELS: [&str; 3] = ["Login", "Log In", "Sign In"];
const TITLE_KEYWORDS: [&str; 4] = ["login", "sign in", "signin", "authentication"];

pub fn checks() -> Vec<Check> {
    vec![
        Check::new("Login Page Loads", TestType::Ui, page_loads).primary(),
        Check::new("Login Form Validation", TestType::Form, form_validation),
        Check::new("Invalid Credentials Test", TestType::Security, invalid_credentials),
        Check::new("Empty Credentials Test", TestType::Form, empty_credentials),
        Check::new("Successful Login Test", TestType::UserFlow, successful_login).primary(),
        Check::new("Password Visibility Toggle", TestType::Ui, visibility_toggle),
        Check::new("Remember Me Functionality", TestType::Ui, remember_me),
        Check::new("Logout Functionality", TestType::UserFlow, logout),
    ]
}

fn login_errors() -> Locator {
    Locator::css(format!("{}, .alert-error, .alert-danger", ERROR_MARKERS))
}

/// Both credential fields, or a verdict describing which one is missing.
async fn credential_fields(browser: &dyn BrowserSession) -> Result<Result<(Locator, Locator), Verdict>, CheckError> {
    let user = username_field();
    let pass = password_field();
    let has_user = browser.is_present(&user).await?;
    let has_pass = browser.is_present(&pass).await?;
    if has_user && has_pass {
        return Ok(Ok((user, pass)));
    }
    Ok(Err(Verdict::bug(
        Severity::High,
        format!(
            "Login form fields not found. Username: {}, Password: {}",
            has_user, has_pass
        ),
    )
    .with_type(TestType::Ui)))
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(500)).await;
}

fn page_loads(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let title = browser.title().await?;
        let lower = title.to_lowercase();
        if TITLE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            Ok(Verdict::pass(format!("Login page loaded successfully. Title: {}", title)))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!("Page title doesn't indicate login page: {}", title),
            ))
        }
    })
}

fn form_validation(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        if let Err(verdict) = credential_fields(browser).await? {
            return Ok(verdict);
        }
        let Some(submit) = submit_if_present(browser, &SUBMIT_LABELS).await? else {
            return Ok(Verdict::bug(Severity::Medium, "Login submit button not found")
                .with_type(TestType::Ui));
        };

        browser.click(&submit).await?;
        settle().await;
        let errors = browser.locate(&login_errors()).await?.count;
        if errors > 0 {
            Ok(Verdict::pass("Login form shows validation for empty fields"))
        } else {
            Ok(Verdict::bug(
                Severity::High,
                "Login form submitted without validation for empty fields",
            ))
        }
    })
}

fn invalid_credentials(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let (user, pass) = match credential_fields(browser).await? {
            Ok(fields) => fields,
            Err(verdict) => return Ok(verdict),
        };
        let Some(submit) = submit_if_present(browser, &SUBMIT_LABELS).await? else {
            return Ok(Verdict::bug(
                Severity::Medium,
                "Submit button not found for invalid credentials test",
            )
            .with_type(TestType::Ui));
        };

        let creds = ctx.data.generate(DataKind::InvalidLogin, None);
        let form = FormSubmission::new()
            .field_at(user, "email", creds.get("email"))
            .field_at(pass, "password", creds.get("password"))
            .submit_with(submit);
        browser.submit_form(&form).await?;

        let errors = browser.locate(&login_errors()).await?;
        if errors.count > 0 {
            let excerpt: String = errors.text.chars().take(100).collect();
            Ok(Verdict::pass(format!(
                "Login form shows error message for invalid credentials: {}",
                excerpt
            )))
        } else {
            Ok(Verdict::bug(
                Severity::High,
                "No error message shown for invalid credentials",
            ))
        }
    })
}

fn empty_credentials(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let Some(submit) = submit_if_present(browser, &SUBMIT_LABELS).await? else {
            return Ok(Verdict::bug(
                Severity::Medium,
                "Submit button not found for empty credentials test",
            )
            .with_type(TestType::Ui));
        };

        browser.click(&submit).await?;
        settle().await;
        if browser.is_present(&login_errors()).await? {
            Ok(Verdict::pass("Login form prevents submission with empty credentials"))
        } else {
            Ok(Verdict::bug(
                Severity::High,
                "Login form allows submission with empty credentials",
            ))
        }
    })
}

fn successful_login(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let (user, pass) = match credential_fields(browser).await? {
            Ok(fields) => fields,
            Err(verdict) => return Ok(verdict),
        };
        let Some(submit) = submit_if_present(browser, &SUBMIT_LABELS).await? else {
            return Ok(Verdict::bug(Severity::Medium, "Submit button not found for login")
                .with_type(TestType::Ui));
        };

        let creds = ctx.data.generate(DataKind::ValidLogin, None);
        let form = FormSubmission::new()
            .field_at(user, "email", creds.get("email"))
            .field_at(pass, "password", creds.get("password"))
            .submit_with(submit);
        let nav = browser.submit_form(&form).await?;

        if has_success_hint(&nav.final_url) {
            return Ok(Verdict::pass(format!(
                "Login successful. Redirected to: {}",
                nav.final_url
            )));
        }
        // Generated credentials are rarely registered; a clear rejection still
        // shows the flow works end to end.
        if await_feedback(browser, &login_errors()).await? {
            Ok(Verdict::pass(
                "Login flow responded with an error message for unregistered credentials",
            ))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!("No success redirect or error message after login (at {})", nav.final_url),
            ))
        }
    })
}

fn visibility_toggle(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let pass = password_field();
        if !browser.is_present(&pass).await? {
            return Ok(Verdict::bug(
                Severity::Medium,
                "Password field not found to test visibility toggle",
            ));
        }

        let toggle = any_css(&[
            ".password-toggle",
            ".show-password",
            ".toggle-password",
            "[aria-label*='password' i][type='button']",
        ]);
        if !browser.is_present(&toggle).await? {
            return Ok(Verdict::pass(
                "No password visibility toggle found (optional feature)",
            ));
        }

        browser.type_text(&pass, "testpassword").await?;
        let before = browser.attribute_values(&pass, "type").await?;
        browser.click(&toggle).await?;
        settle().await;
        // The field may no longer match type=password once revealed.
        let after = browser
            .attribute_values(&any_css(&["input[name='password']", "#password"]), "type")
            .await?;

        let before = before.first().cloned().unwrap_or_default();
        let after = after.first().cloned().unwrap_or_default();
        if before != after {
            Ok(Verdict::pass(format!(
                "Password visibility toggle works. Type changed from {} to {}",
                before, after
            )))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                "Password visibility toggle doesn't change field type",
            ))
        }
    })
}

fn remember_me(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, PATH).await?;
        let checkbox = any_css(&[
            "input[name='remember']",
            "input[name='remember_me']",
            "#remember",
            "#remember_me",
            "input[type='checkbox']",
        ]);
        if !browser.is_present(&checkbox).await? {
            return Ok(Verdict::pass("No remember me option found (optional feature)"));
        }

        let checked = Locator::css("input[type='checkbox']:checked");
        let before = browser.locate(&checked).await?.count;
        browser.click(&checkbox).await?;
        let after = browser.locate(&checked).await?.count;
        if before != after {
            Ok(Verdict::pass("Remember me checkbox toggles correctly"))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                "Remember me checkbox doesn't toggle when clicked",
            ))
        }
    })
}

fn logout(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        let control = Locator::AnyOf(vec![
            Locator::css("a[href*='logout']"),
            Locator::css("#logout"),
            Locator::css(".logout"),
            Locator::text("Logout"),
            Locator::text("Sign Out"),
        ]);
        if !browser.is_present(&control).await? {
            return Ok(Verdict::pass(
                "No logout control found (user is likely not logged in)",
            ));
        }

        browser.click(&control).await?;
        settle().await;
        let url = browser.current_url().await?;
        let lower = url.to_lowercase();
        if lower.contains("login") || lower.contains("home") {
            Ok(Verdict::pass(format!("Logout successful. Redirected to: {}", url)))
        } else {
            Ok(Verdict::bug(
                Severity::High,
                format!("Logout did not return to login or home page: {}", url),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::traits::scripted::ScriptedAdapter;
    use crate::report::Outcome;
    use crate::suites::testing::{browser_ctx, run_named, visible, with_text};

    async fn run(name: &str, adapter: ScriptedAdapter) -> crate::report::TestResult {
        run_named(checks(), SUITE.policy, name, &browser_ctx(adapter)).await
    }

    fn login_form() -> ScriptedAdapter {
        ScriptedAdapter::new()
            .element(&Locator::css("input[name='email']"), visible(1))
            .element(&Locator::css("input[name='password']"), visible(1))
            .element(&Locator::css("button[type='submit']"), visible(1))
    }

    #[tokio::test]
    async fn test_missing_password_field_is_reported() {
        let adapter =
            ScriptedAdapter::new().element(&Locator::css("input[name='email']"), visible(1));
        let result = run("Login Form Validation", adapter).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.severity, Severity::High);
        assert!(result.details.contains("Username: true, Password: false"));
    }

    #[tokio::test]
    async fn test_invalid_credentials_error_is_quoted() {
        let adapter = login_form().element(&login_errors(), with_text("Invalid email or password"));
        let result = run("Invalid Credentials Test", adapter).await;
        assert_eq!(result.outcome, Outcome::Pass);
        assert_eq!(result.test_type, TestType::Security);
        assert!(result.details.contains("Invalid email or password"));
    }

    #[tokio::test]
    async fn test_silent_rejection_is_high_bug() {
        let result = run("Invalid Credentials Test", login_form()).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.severity, Severity::High);
    }

    #[tokio::test]
    async fn test_rejected_generated_login_still_passes() {
        let adapter = login_form().element(&login_errors(), visible(1));
        let result = run("Successful Login Test", adapter).await;
        assert_eq!(result.outcome, Outcome::Pass);
        assert_eq!(result.test_type, TestType::UserFlow);
    }

    #[tokio::test]
    async fn test_optional_controls_absent_pass() {
        assert_eq!(
            run("Remember Me Functionality", login_form()).await.outcome,
            Outcome::Pass
        );
        assert_eq!(
            run("Logout Functionality", login_form()).await.outcome,
            Outcome::Pass
        );
        assert_eq!(
            run("Password Visibility Toggle", login_form()).await.outcome,
            Outcome::Pass
        );
    }

    #[tokio::test]
    async fn test_title_without_keywords_is_bug() {
        let result = run(
            "Login Page Loads",
            ScriptedAdapter::new().with_page("<html></html>", "Welcome"),
        )
        .await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert!(result.details.contains("Welcome"));
    }
}
