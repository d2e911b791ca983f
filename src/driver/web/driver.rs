//! Browser session backed by Playwright.

use anyhow::{Context, Result};
use async_trait::async_trait;
use playwright::api::{Browser, BrowserContext, Page, Viewport};
use playwright::Playwright;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::driver::traits::{
    BrowserSession, ElementInfo, FormSubmission, HttpRequest, HttpResponse, Locator, Navigation,
    TargetAdapter,
};
use crate::error::{AdapterError, AdapterResult};
use crate::utils::HarnessConfig;

/// Web Driver configuration
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub executable: Option<PathBuf>,
    /// Bound on every page operation
    pub timeout: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self::from(&HarnessConfig::default())
    }
}

impl From<&HarnessConfig> for WebDriverConfig {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            executable: config.browser_executable.clone(),
            timeout: config.adapter_timeout(),
        }
    }
}

/// Web Driver using Playwright
pub struct WebDriver {
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    browser: Arc<Browser>,
    #[allow(dead_code)]
    context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
    config: WebDriverConfig,
}

#[derive(Serialize)]
struct FetchArgs<'a> {
    url: &'a str,
    method: &'a str,
    headers: BTreeMap<&'a str, &'a str>,
    body: Option<&'a str>,
}

#[derive(Deserialize)]
struct FetchReply {
    status: u16,
    headers: BTreeMap<String, String>,
    body: String,
    url: String,
}

const FETCH_JS: &str = r#"async (req) => {
    const init = { method: req.method, headers: req.headers, redirect: 'follow' };
    if (req.body !== null && req.method !== 'GET' && req.method !== 'HEAD') {
        init.body = req.body;
    }
    const resp = await fetch(req.url, init);
    const headers = {};
    resp.headers.forEach((v, k) => { headers[k.toLowerCase()] = v; });
    return { status: resp.status, headers, body: await resp.text(), url: resp.url };
}"#;

impl WebDriver {
    /// Launch a browser and open a single page.
    pub async fn new(config: WebDriverConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;

        let chromium = playwright.chromium();
        let browser = launch_chromium_browser(&chromium, &config).await?;
        let context = browser
            .context_builder()
            .build()
            .await
            .context("Failed to create browser context")?;
        let page = context.new_page().await.context("Failed to open page")?;

        page.set_viewport_size(Viewport {
            width: config.viewport_width as i32,
            height: config.viewport_height as i32,
        })
        .await
        .context("Failed to set viewport")?;

        log::info!(
            "browser session ready ({}x{}, headless: {})",
            config.viewport_width,
            config.viewport_height,
            config.headless
        );

        Ok(Self {
            playwright: Arc::new(playwright),
            browser: Arc::new(browser),
            context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
            config,
        })
    }

    /// Bound `fut` by the session timeout and classify its failure.
    async fn guarded<T, E, F>(&self, what: &str, fut: F) -> AdapterResult<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.config.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(classify(what, &e.to_string())),
            Err(_) => Err(AdapterError::timeout(format!(
                "{} exceeded {}ms",
                what,
                self.config.timeout.as_millis()
            ))),
        }
    }

    async fn evaluate<A, R>(&self, js: &str, arg: A) -> AdapterResult<R>
    where
        A: Serialize + Send,
        R: serde::de::DeserializeOwned,
    {
        let page = self.page.lock().await;
        self.guarded("script evaluation", page.evaluate::<A, R>(js, arg))
            .await
    }

    /// First alternative of `locator` with at least one match.
    async fn resolve(&self, locator: &Locator) -> AdapterResult<Option<String>> {
        for sel in selector_alternatives(locator) {
            let page = self.page.lock().await;
            let found = self
                .guarded("element lookup", page.query_selector_all(&sel))
                .await?;
            if !found.is_empty() {
                return Ok(Some(sel));
            }
        }
        Ok(None)
    }

    async fn require(&self, locator: &Locator) -> AdapterResult<String> {
        self.resolve(locator)
            .await?
            .ok_or_else(|| AdapterError::not_found(format!("no element matches {}", locator)))
    }
}

#[async_trait]
impl TargetAdapter for WebDriver {
    fn name(&self) -> &str {
        "browser"
    }

    async fn navigate(&self, url: &str) -> AdapterResult<Navigation> {
        let start = Instant::now();
        let response = {
            let page = self.page.lock().await;
            self.guarded(
                "page load",
                page.goto_builder(url).goto(),
            )
            .await?
        };
        let elapsed = start.elapsed();
        let status = response
            .and_then(|r| r.status().ok())
            .map(|s| s as u16);
        let final_url = self.current_url().await.unwrap_or_else(|_| url.to_string());

        log::debug!("loaded {} in {}ms", final_url, elapsed.as_millis());
        Ok(Navigation {
            final_url,
            status,
            elapsed,
        })
    }

    async fn submit_form(&self, form: &FormSubmission) -> AdapterResult<Navigation> {
        for field in &form.fields {
            self.type_text(&field.locator, &field.value).await?;
        }

        let start = Instant::now();
        match &form.submit {
            Some(submit) => self.click(submit).await?,
            None => {
                self.evaluate::<(), ()>(
                    "(() => { const f = document.querySelector('form'); if (f) f.requestSubmit ? f.requestSubmit() : f.submit(); })()",
                    (),
                )
                .await?
            }
        }

        Ok(Navigation {
            final_url: self.current_url().await?,
            status: None,
            elapsed: start.elapsed(),
        })
    }

    async fn locate(&self, locator: &Locator) -> AdapterResult<ElementInfo> {
        let Some(sel) = self.resolve(locator).await? else {
            return Ok(ElementInfo::default());
        };
        let page = self.page.lock().await;
        let handles = self
            .guarded("element lookup", page.query_selector_all(&sel))
            .await?;
        let mut info = ElementInfo {
            count: handles.len(),
            ..Default::default()
        };
        for handle in &handles {
            let visible = self.guarded("visibility check", handle.is_visible()).await?;
            if visible {
                info.visible = true;
                break;
            }
        }
        if !handles.is_empty() {
            // Inputs report their current value, other elements their text.
            info.text = self
                .guarded(
                    "text read",
                    page.evaluate_on_selector::<String, String>(
                        &sel,
                        "el => el.value || el.innerText || el.textContent || ''",
                        None::<String>,
                    ),
                )
                .await?;
        }
        Ok(info)
    }

    async fn request(&self, request: &HttpRequest) -> AdapterResult<HttpResponse> {
        let args = FetchArgs {
            url: &request.url,
            method: request.method.as_str(),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            body: request.body.as_deref(),
        };
        let start = Instant::now();
        let reply: FetchReply = self.evaluate(FETCH_JS, args).await?;
        Ok(HttpResponse {
            status: reply.status,
            headers: reply.headers,
            body: reply.body,
            elapsed: start.elapsed(),
            final_url: reply.url,
        })
    }
}

#[async_trait]
impl BrowserSession for WebDriver {
    async fn click(&self, locator: &Locator) -> AdapterResult<()> {
        let sel = self.require(locator).await?;
        let page = self.page.lock().await;
        self.guarded(
            "click",
            page.click_builder(&sel).click(),
        )
        .await
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> AdapterResult<()> {
        let sel = self.require(locator).await?;
        let page = self.page.lock().await;
        let element = self
            .guarded("element lookup", page.query_selector(&sel))
            .await?
            .ok_or_else(|| AdapterError::not_found(format!("no element matches {}", locator)))?;
        self.guarded("fill", element.fill_builder(text).fill()).await
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> AdapterResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.resolve(locator).await?.is_some() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AdapterError::timeout(format!(
                    "{} did not appear within {}ms",
                    locator,
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    async fn title(&self) -> AdapterResult<String> {
        self.evaluate::<(), String>("document.title", ()).await
    }

    async fn page_source(&self) -> AdapterResult<String> {
        let page = self.page.lock().await;
        self.guarded("page source", page.content()).await
    }

    async fn current_url(&self) -> AdapterResult<String> {
        self.evaluate::<(), String>("window.location.href", ()).await
    }

    async fn back(&self) -> AdapterResult<()> {
        self.evaluate::<(), ()>("window.history.back()", ()).await?;
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    }

    async fn forward(&self) -> AdapterResult<()> {
        self.evaluate::<(), ()>("window.history.forward()", ()).await?;
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> AdapterResult<()> {
        let page = self.page.lock().await;
        self.guarded(
            "viewport change",
            page.set_viewport_size(Viewport {
                width: width as i32,
                height: height as i32,
            }),
        )
        .await
    }

    async fn attribute_values(
        &self,
        locator: &Locator,
        attribute: &str,
    ) -> AdapterResult<Vec<String>> {
        let Some(sel) = self.resolve(locator).await? else {
            return Ok(Vec::new());
        };
        let page = self.page.lock().await;
        let handles = self
            .guarded("element lookup", page.query_selector_all(&sel))
            .await?;
        let mut values = Vec::new();
        for handle in handles {
            if let Some(value) = self
                .guarded("attribute read", handle.get_attribute(attribute))
                .await?
            {
                values.push(value);
            }
        }
        Ok(values)
    }

    async fn close(&self) -> AdapterResult<()> {
        self.guarded("browser close", self.browser.close()).await
    }
}

/// Map a driver error message onto a stable adapter reason.
fn classify(what: &str, message: &str) -> AdapterError {
    let lower = message.to_lowercase();
    let detail = format!("{} failed: {}", what, message);
    if lower.contains("timeout") || lower.contains("timed out") {
        AdapterError::timeout(detail)
    } else if lower.contains("err_connection_refused")
        || lower.contains("err_name_not_resolved")
        || lower.contains("err_connection_reset")
        || lower.contains("err_address_unreachable")
    {
        AdapterError::connection_refused(detail)
    } else if lower.contains("no node found")
        || lower.contains("not found")
        || lower.contains("failed to find element")
    {
        AdapterError::not_found(detail)
    } else {
        AdapterError::protocol(detail)
    }
}

/// Playwright selectors for a locator, in preference order.
fn selector_alternatives(locator: &Locator) -> Vec<String> {
    match locator {
        Locator::Css(css) => vec![css.clone()],
        Locator::Text(text) => vec![format!("text=\"{}\"", text.replace('"', "\\\""))],
        Locator::Id(id) => vec![format!("#{}", id)],
        Locator::Name(name) => vec![format!("[name=\"{}\"]", name)],
        Locator::Type(t) => vec![map_web_type(t)],
        Locator::Placeholder(p) => vec![format!("[placeholder=\"{}\"]", p)],
        Locator::XPath(xpath) => vec![format!("xpath={}", xpath)],
        Locator::AnyOf(all) => all.iter().flat_map(selector_alternatives).collect(),
    }
}

/// Map common element type aliases to HTML tags
fn map_web_type(t: &str) -> String {
    match t.to_lowercase().as_str() {
        "textfield" | "input" => "input".to_string(),
        "button" | "btn" => "button".to_string(),
        "submit" => "*[type='submit']".to_string(),
        "image" | "icon" => "img".to_string(),
        "link" => "a".to_string(),
        "checkbox" => "input[type='checkbox']".to_string(),
        "radio" => "input[type='radio']".to_string(),
        _ => t.to_string(),
    }
}

async fn launch_chromium_browser(
    chromium: &playwright::api::BrowserType,
    config: &WebDriverConfig,
) -> Result<playwright::api::Browser> {
    let mut launcher = chromium.launcher();
    launcher = launcher.headless(config.headless);

    let executable = config
        .executable
        .clone()
        .or_else(|| {
            std::env::var("PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH")
                .ok()
                .map(PathBuf::from)
        })
        .or_else(find_system_browser);

    if let Some(ref path) = executable {
        log::info!("using browser {}", path.display());
        launcher = launcher.executable(path);
    } else {
        log::info!("no browser executable found, using the Playwright bundled chromium");
    }

    let args: Vec<String> = [
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--ignore-certificate-errors",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    launcher = launcher.args(&args);

    launcher
        .launch()
        .await
        .context("Failed to launch chromium")
}

fn find_system_browser() -> Option<PathBuf> {
    const CANDIDATES: [&str; 5] = [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "microsoft-edge",
    ];
    const MAC_APPS: [&str; 2] = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
        .or_else(|| {
            MAC_APPS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterErrorKind;

    #[test]
    fn test_classify_driver_errors() {
        assert_eq!(
            classify("page load", "Timeout 10000ms exceeded").kind,
            AdapterErrorKind::Timeout
        );
        assert_eq!(
            classify("page load", "net::ERR_CONNECTION_REFUSED at http://127.0.0.1:9").kind,
            AdapterErrorKind::ConnectionRefused
        );
        assert_eq!(
            classify("click", "No node found for selector").kind,
            AdapterErrorKind::NotFound
        );
        assert_eq!(
            classify("eval", "Target closed").kind,
            AdapterErrorKind::ProtocolError
        );
    }

    #[test]
    fn test_selector_alternatives() {
        assert_eq!(selector_alternatives(&Locator::Id("email".into())), vec!["#email"]);
        assert_eq!(
            selector_alternatives(&Locator::Type("submit".into())),
            vec!["*[type='submit']"]
        );
        let any = Locator::AnyOf(vec![
            Locator::text("Sign Up"),
            Locator::XPath("//form".into()),
        ]);
        assert_eq!(
            selector_alternatives(&any),
            vec!["text=\"Sign Up\"".to_string(), "xpath=//form".to_string()]
        );
    }

    #[test]
    fn test_config_from_harness() {
        let harness = HarnessConfig {
            headless: false,
            adapter_timeout_ms: 2500,
            ..Default::default()
        };
        let config = WebDriverConfig::from(&harness);
        assert!(!config.headless);
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.viewport_width, 1920);
    }
}
