//! Backend API checks over plain HTTP.

use std::time::Duration;

use super::first_response;
use crate::data::DataKind;
use crate::driver::HttpRequest;
use crate::report::{Severity, TestType};
use crate::runner::suite::{
    default_policy, AdapterKind, Check, CheckContext, CheckFuture, SuiteDefinition, Verdict,
};

pub const SUITE: SuiteDefinition = SuiteDefinition {
    id: "api",
    title: "API",
    adapter: AdapterKind::Http,
    checks,
    policy: default_policy,
};

const DISCOVERY_PATHS: [&str; 11] = [
    "/api",
    "/api/v1",
    "/api/v2",
    "/api/docs",
    "/api/swagger",
    "/api/health",
    "/api/status",
    "/api/users",
    "/api/auth",
    "/api/login",
    "/api/register",
];

const HEALTH_PATHS: [&str; 4] = ["/api/health", "/api/status", "/health", "/status"];
const USER_PATHS: [&str; 4] = ["/api/users", "/api/user", "/users", "/user"];
const RESPONSE_PATHS: [&str; 4] = ["/api", "/api/v1", "/api/users", "/api/health"];
const PERFORMANCE_PATHS: [&str; 4] = ["/api", "/api/v1", "/api/health", "/api/status"];
const PROTECTED_PATHS: [&str; 3] = ["/api/users", "/api/profile", "/api/admin"];
const LOGIN_PATHS: [&str; 3] = ["/api/login", "/api/auth/login", "/api/authenticate"];
const POST_PATHS: [&str; 4] = ["/api/users", "/api/register", "/api/contact", "/api/feedback"];

pub fn checks() -> Vec<Check> {
    vec![
        Check::new("API Discovery", TestType::Api, discovery).primary(),
        Check::new("API Health Check", TestType::Api, health),
        Check::new("API User Endpoints", TestType::Api, user_endpoints),
        Check::new("API Response Validation", TestType::Api, response_validation),
        Check::new("API Error Handling", TestType::Api, error_handling),
        Check::new("API Method Validation", TestType::Api, method_validation),
        Check::new("API CORS Headers", TestType::Security, cors_headers),
        Check::new("API Security Headers", TestType::Security, security_headers),
        Check::new("API HTTPS", TestType::Security, https),
        Check::new("API Performance", TestType::Performance, performance),
        Check::new("API Authentication", TestType::Security, authentication),
        Check::new("API Login Validation", TestType::Security, login_validation),
        Check::new("API Data Validation", TestType::Api, data_validation),
        Check::new("API JSON Validation", TestType::Api, json_validation),
    ]
}

fn discovery(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let http = ctx.http()?;
        let mut found = Vec::new();
        let mut first_error = None;
        for path in DISCOVERY_PATHS {
            match http.request(&HttpRequest::get(ctx.url(path))).await {
                Ok(resp) if resp.status == 200 => found.push(path.to_string()),
                Ok(resp) if matches!(resp.status, 401 | 403 | 405) => {
                    found.push(format!("{} (requires auth/method)", path))
                }
                Ok(_) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if found.is_empty() {
            if let Some(err) = first_error {
                return Err(err.into());
            }
            return Ok(Verdict::bug(
                Severity::Medium,
                "No API endpoints discovered. This might indicate missing API documentation or endpoints.",
            ));
        }
        let shown: Vec<_> = found.iter().take(5).cloned().collect();
        Ok(Verdict::pass(format!(
            "Discovered {} API endpoints: {}",
            found.len(),
            shown.join(", ")
        )))
    })
}

fn health(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        match first_response(ctx, &HEALTH_PATHS, HttpRequest::get, |r| r.status == 200).await? {
            Some((path, _)) => Ok(Verdict::pass(format!("Health endpoint {} returns 200 OK", path))),
            None => Ok(Verdict::bug(Severity::Low, "No health endpoint returns 200 OK")),
        }
    })
}

fn user_endpoints(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let hit = first_response(ctx, &USER_PATHS, HttpRequest::get, |r| {
            matches!(r.status, 200 | 401 | 403)
        })
        .await?;
        match hit {
            Some((path, resp)) => Ok(Verdict::pass(format!(
                "User endpoint {} responds with status {}",
                path, resp.status
            ))),
            None => Ok(Verdict::bug(
                Severity::Medium,
                "No user-related API endpoints found or accessible",
            )),
        }
    })
}

fn response_validation(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let hit = first_response(ctx, &RESPONSE_PATHS, HttpRequest::get, |r| r.status == 200).await?;
        let Some((path, resp)) = hit else {
            return Ok(Verdict::pass("No API endpoints found to test response validation"));
        };

        match serde_json::from_str::<serde_json::Value>(&resp.body) {
            Ok(value) if value.is_object() || value.is_array() => Ok(Verdict::pass(format!(
                "API endpoint {} returns valid JSON",
                path
            ))),
            Ok(_) => Ok(Verdict::bug(
                Severity::Medium,
                format!("API endpoint {} returns invalid JSON structure", path),
            )),
            Err(_) if resp.header("content-type").is_some_and(|ct| ct.contains("text/html")) => {
                Ok(Verdict::pass(format!(
                    "API endpoint {} returns HTML (likely documentation)",
                    path
                )))
            }
            Err(_) => Ok(Verdict::bug(
                Severity::Medium,
                format!("API endpoint {} returns invalid JSON", path),
            )),
        }
    })
}

fn error_handling(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let resp = ctx
            .http()?
            .request(&HttpRequest::get(ctx.url("/api/nonexistent")))
            .await?;
        Ok(match resp.status {
            404 => Verdict::pass("API returns 404 for non-existent endpoint"),
            405 => Verdict::pass("API returns 405 for non-existent endpoint (method not allowed)"),
            other => Verdict::bug(
                Severity::Medium,
                format!(
                    "API returns unexpected status code {} for non-existent endpoint",
                    other
                ),
            ),
        })
    })
}

fn method_validation(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let resp = ctx.http()?.request(&HttpRequest::post(ctx.url("/api"))).await?;
        if matches!(resp.status, 400 | 405 | 422) {
            Ok(Verdict::pass(format!(
                "API returns appropriate status code {} for invalid method",
                resp.status
            )))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!("API returns unexpected status code {} for invalid method", resp.status),
            ))
        }
    })
}

fn cors_headers(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let resp = ctx.http()?.request(&HttpRequest::get(ctx.url("/api"))).await?;
        let present = [
            "access-control-allow-origin",
            "access-control-allow-methods",
            "access-control-allow-headers",
        ]
        .iter()
        .any(|h| resp.header(h).is_some());
        if present {
            Ok(Verdict::pass("API includes CORS headers"))
        } else {
            Ok(Verdict::bug(Severity::Medium, "API missing CORS headers"))
        }
    })
}

fn security_headers(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let resp = ctx.http()?.request(&HttpRequest::get(ctx.url("/api"))).await?;
        let present: Vec<&str> = [
            "x-content-type-options",
            "x-frame-options",
            "x-xss-protection",
            "strict-transport-security",
            "content-security-policy",
        ]
        .into_iter()
        .filter(|h| resp.header(h).is_some())
        .collect();
        if present.is_empty() {
            Ok(Verdict::bug(Severity::Medium, "API missing security headers"))
        } else {
            Ok(Verdict::pass(format!(
                "API includes security headers: {}",
                present.join(", ")
            )))
        }
    })
}

fn https(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        if ctx.base_url.starts_with("https://") {
            Ok(Verdict::pass("API uses HTTPS"))
        } else {
            Ok(Verdict::bug(Severity::High, "API doesn't use HTTPS"))
        }
    })
}

fn performance(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let http = ctx.http()?;
        let mut timings: Vec<Duration> = Vec::new();
        let mut first_error = None;
        for path in PERFORMANCE_PATHS {
            match http.request(&HttpRequest::get(ctx.url(path))).await {
                Ok(resp) => {
                    timings.push(resp.elapsed);
                    if resp.status == 200 {
                        break;
                    }
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if timings.is_empty() {
            return match first_error {
                Some(err) => Err(err.into()),
                None => Ok(Verdict::pass("No API endpoints found to test performance")),
            };
        }

        let total: Duration = timings.iter().sum();
        let average = total / timings.len() as u32;
        let max = timings.iter().max().copied().unwrap_or_default();
        let stats = format!(
            "Average: {:.2}s, Max: {:.2}s",
            average.as_secs_f64(),
            max.as_secs_f64()
        );

        let fast = Duration::from_millis(ctx.config.api_fast_ms);
        let acceptable = Duration::from_millis(ctx.config.api_acceptable_ms);
        if average < fast {
            Ok(Verdict::pass(format!("API response time is good. {}", stats)))
        } else if average < acceptable {
            Ok(Verdict::pass(format!("API response time is acceptable. {}", stats)))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!("API response time is slow. {}", stats),
            ))
        }
    })
}

fn authentication(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let hit = first_response(ctx, &PROTECTED_PATHS, HttpRequest::get, |r| {
            matches!(r.status, 200 | 401 | 403)
        })
        .await?;
        Ok(match hit {
            Some((path, resp)) if resp.status == 401 => Verdict::pass(format!(
                "Protected endpoint {} requires authentication (401)",
                path
            )),
            Some((path, resp)) if resp.status == 403 => Verdict::pass(format!(
                "Protected endpoint {} requires authorization (403)",
                path
            )),
            Some((path, _)) => Verdict::bug(
                Severity::High,
                format!("Protected endpoint {} allows access without authentication", path),
            ),
            None => Verdict::pass("No protected endpoints found to test authentication"),
        })
    })
}

fn login_validation(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let record = ctx.data.generate(DataKind::InvalidLogin, None);
        let body = serde_json::to_string(&record.fields).unwrap_or_else(|_| "{}".into());

        let hit = first_response(
            ctx,
            &LOGIN_PATHS,
            |url| HttpRequest::post(url).json_body(body.clone()),
            |r| matches!(r.status, 400 | 401),
        )
        .await?;
        Ok(match hit {
            Some((path, resp)) if resp.status == 401 => Verdict::pass(format!(
                "Login endpoint {} rejects invalid credentials (401)",
                path
            )),
            Some((path, _)) => Verdict::pass(format!("Login endpoint {} validates input (400)", path)),
            None => Verdict::pass("No login endpoints found to test authentication"),
        })
    })
}

fn data_validation(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let record = ctx.data.generate(DataKind::ApiPayload, None);
        let invalid = record.get("invalid_json").to_string();

        let hit = first_response(
            ctx,
            &POST_PATHS,
            |url| HttpRequest::post(url).json_body(invalid.clone()),
            |r| matches!(r.status, 200 | 400 | 405 | 422),
        )
        .await?;
        Ok(match hit {
            Some((path, resp)) if matches!(resp.status, 400 | 422) => Verdict::pass(format!(
                "API endpoint {} validates input data (status {})",
                path, resp.status
            )),
            Some((path, resp)) if resp.status == 405 => {
                Verdict::pass(format!("API endpoint {} doesn't accept POST (405)", path))
            }
            Some((path, _)) => Verdict::bug(
                Severity::High,
                format!("API endpoint {} accepts invalid data without validation", path),
            ),
            None => Verdict::pass("No POST endpoints found to test data validation"),
        })
    })
}

fn json_validation(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let record = ctx.data.generate(DataKind::ApiPayload, None);
        let resp = ctx
            .http()?
            .request(&HttpRequest::post(ctx.url("/api")).json_body(record.get("malformed_json")))
            .await?;
        if matches!(resp.status, 400 | 422) {
            Ok(Verdict::pass(format!(
                "API validates malformed JSON (status {})",
                resp.status
            )))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!(
                    "API doesn't properly validate malformed JSON (status {})",
                    resp.status
                ),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataProvider;
    use crate::driver::traits::scripted::{response, ScriptedAdapter};
    use crate::error::AdapterError;
    use crate::report::Outcome;
    use crate::runner::suite::run_check;
    use crate::utils::HarnessConfig;
    use std::sync::Arc;

    fn ctx(base_url: &str, adapter: ScriptedAdapter) -> CheckContext {
        CheckContext {
            base_url: base_url.to_string(),
            data: Arc::new(DataProvider::new(Some(3))),
            config: Arc::new(HarnessConfig::default()),
            browser: None,
            http: Some(Arc::new(adapter)),
        }
    }

    async fn run(name: &str, ctx: &CheckContext) -> crate::report::TestResult {
        let check = checks().into_iter().find(|c| c.name == name).unwrap();
        run_check(&check, ctx, SUITE.policy).await
    }

    #[tokio::test]
    async fn test_discovery_counts_auth_protected_endpoints() {
        let ctx = ctx(
            "https://shop.test",
            ScriptedAdapter::new()
                .respond("/api", Ok(response(200)))
                .respond("/api/users", Ok(response(401))),
        );
        let result = run("API Discovery", &ctx).await;
        assert_eq!(result.outcome, Outcome::Pass);
        assert!(result.details.contains("Discovered 2 API endpoints"));
        assert!(result.details.contains("/api/users (requires auth/method)"));
    }

    #[tokio::test]
    async fn test_unreachable_target_is_critical_for_discovery() {
        let adapter = DISCOVERY_PATHS.iter().fold(ScriptedAdapter::new(), |a, p| {
            a.respond(p, Err(AdapterError::connection_refused("refused")))
        });
        let ctx = ctx("http://down.test", adapter);
        let result = run("API Discovery", &ctx).await;
        assert_eq!(result.outcome, Outcome::Fail);
        assert_eq!(result.severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_open_protected_endpoint_is_a_security_bug() {
        let ctx = ctx(
            "https://shop.test",
            ScriptedAdapter::new().respond("/api/users", Ok(response(200))),
        );
        let result = run("API Authentication", &ctx).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.severity, Severity::High);
        assert_eq!(result.test_type, TestType::Security);
    }

    #[tokio::test]
    async fn test_plain_http_target_flags_https() {
        let ctx = ctx("http://shop.test", ScriptedAdapter::new());
        let result = run("API HTTPS", &ctx).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.severity, Severity::High);
    }

    #[tokio::test]
    async fn test_data_validation_accepts_422() {
        let ctx = ctx(
            "https://shop.test",
            ScriptedAdapter::new().respond("/api/register", Ok(response(422))),
        );
        let result = run("API Data Validation", &ctx).await;
        assert_eq!(result.outcome, Outcome::Pass);
        assert!(result.details.contains("/api/register"));
    }

    #[tokio::test]
    async fn test_json_validation_reports_lenient_parser() {
        let ctx = ctx(
            "https://shop.test",
            ScriptedAdapter::new().respond("/api", Ok(response(200))),
        );
        let result = run("API JSON Validation", &ctx).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert!(result.details.contains("status 200"));
    }

    #[tokio::test]
    async fn test_every_check_yields_one_result_against_empty_target() {
        let ctx = ctx("https://shop.test", ScriptedAdapter::new());
        for check in checks() {
            let result = run_check(&check, &ctx, SUITE.policy).await;
            assert_eq!(result.case_name, check.name);
        }
    }
}
