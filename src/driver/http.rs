//! Plain HTTP adapter for API checks.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::traits::{
    ElementInfo, FormSubmission, HttpRequest, HttpResponse, Locator, Navigation, TargetAdapter,
};
use crate::error::{AdapterError, AdapterResult};

pub struct HttpAdapter {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpAdapter {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .user_agent(concat!("strict-qa/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> AdapterError {
        if err.is_timeout() {
            AdapterError::timeout(format!(
                "{} did not answer within {}ms",
                url,
                self.timeout.as_millis()
            ))
        } else if err.is_connect() {
            AdapterError::connection_refused(format!("{}: {}", url, err))
        } else {
            AdapterError::protocol(format!("{}: {}", url, err))
        }
    }

    async fn send(&self, url: &str, builder: reqwest::RequestBuilder) -> AdapterResult<HttpResponse> {
        let start = Instant::now();
        let resp = builder.send().await.map_err(|e| self.classify(url, e))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let headers: BTreeMap<String, String> = resp
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_lowercase(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = resp.text().await.map_err(|e| self.classify(url, e))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
            elapsed: start.elapsed(),
            final_url,
        })
    }
}

#[async_trait]
impl TargetAdapter for HttpAdapter {
    fn name(&self) -> &str {
        "http"
    }

    async fn navigate(&self, url: &str) -> AdapterResult<Navigation> {
        let resp = self.request(&HttpRequest::get(url)).await?;
        Ok(Navigation {
            final_url: resp.final_url,
            status: Some(resp.status),
            elapsed: resp.elapsed,
        })
    }

    async fn submit_form(&self, form: &FormSubmission) -> AdapterResult<Navigation> {
        let action = form
            .action
            .as_deref()
            .ok_or_else(|| AdapterError::protocol("form submission without an action url"))?;
        let pairs: Vec<(&str, &str)> = form
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.value.as_str()))
            .collect();

        let resp = self
            .send(action, self.client.post(action).form(&pairs))
            .await?;
        Ok(Navigation {
            final_url: resp.final_url,
            status: Some(resp.status),
            elapsed: resp.elapsed,
        })
    }

    async fn locate(&self, locator: &Locator) -> AdapterResult<ElementInfo> {
        Err(AdapterError::protocol(format!(
            "cannot locate {} without a browser session",
            locator
        )))
    }

    async fn request(&self, request: &HttpRequest) -> AdapterResult<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        self.send(&request.url, builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterErrorKind;
    use axum::routing::{get, post};
    use axum::Router;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_request_reports_status_and_headers() {
        let app = Router::new()
            .route(
                "/api/health",
                get(|| async { ([("X-Frame-Options", "DENY")], "ok") }),
            )
            .route("/api/users", post(|| async { axum::http::StatusCode::UNPROCESSABLE_ENTITY }));
        let base = serve(app).await;
        let adapter = HttpAdapter::new(Duration::from_secs(5)).unwrap();

        let resp = adapter
            .request(&HttpRequest::get(format!("{}/api/health", base)))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("x-frame-options"), Some("DENY"));
        assert_eq!(resp.body, "ok");

        let resp = adapter
            .request(&HttpRequest::post(format!("{}/api/users", base)).json_body("{}"))
            .await
            .unwrap();
        assert_eq!(resp.status, 422);
    }

    #[tokio::test]
    async fn test_closed_port_is_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let adapter = HttpAdapter::new(Duration::from_secs(2)).unwrap();
        let err = adapter
            .navigate(&format!("http://{}/", addr))
            .await
            .unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::ConnectionRefused);
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let app = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        );
        let base = serve(app).await;
        let adapter = HttpAdapter::new(Duration::from_millis(200)).unwrap();
        let err = adapter
            .request(&HttpRequest::get(format!("{}/slow", base)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_locate_needs_browser() {
        let adapter = HttpAdapter::new(Duration::from_secs(1)).unwrap();
        let err = adapter.locate(&Locator::css("form")).await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::ProtocolError);
    }
}
