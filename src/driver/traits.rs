use crate::error::{AdapterResult, OrchestrationFault};
use crate::utils::HarnessConfig;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Element locator for browser pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Raw CSS selector
    Css(String),
    /// Exact visible text
    Text(String),
    /// Element id attribute
    Id(String),
    /// Element name attribute
    Name(String),
    /// Element type alias (textfield, button, submit, link, checkbox, radio)
    Type(String),
    /// Placeholder text
    Placeholder(String),
    XPath(String),
    /// First alternative that matches anything
    AnyOf(Vec<Locator>),
}

impl Locator {
    pub fn css(s: impl Into<String>) -> Self {
        Locator::Css(s.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Locator::Text(s.into())
    }

    pub fn name(s: impl Into<String>) -> Self {
        Locator::Name(s.into())
    }

    /// Input matched by `name`, `id`, or `type` equal to `field`.
    pub fn field(field: &str) -> Self {
        Locator::Css(format!(
            "input[name='{f}'], input[id='{f}'], input[type='{f}'], textarea[name='{f}'], select[name='{f}']",
            f = field
        ))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::Text(s) => write!(f, "text=\"{}\"", s),
            Locator::Id(s) => write!(f, "#{}", s),
            Locator::Name(s) => write!(f, "[name=\"{}\"]", s),
            Locator::Type(s) => write!(f, "type={}", s),
            Locator::Placeholder(s) => write!(f, "[placeholder=\"{}\"]", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
            Locator::AnyOf(all) => {
                let parts: Vec<String> = all.iter().map(|l| l.to_string()).collect();
                write!(f, "any({})", parts.join(" | "))
            }
        }
    }
}

/// Plain HTTP request issued through an adapter
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: reqwest::Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(reqwest::Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(reqwest::Method::POST, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json_body(self, body: impl Into<String>) -> Self {
        let mut req = self.header("Content-Type", "application/json");
        req.body = Some(body.into());
        req
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercased
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub elapsed: Duration,
    pub final_url: String,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .is_some_and(|ct| ct.contains("application/json"))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Result of loading a page
#[derive(Debug, Clone)]
pub struct Navigation {
    pub final_url: String,
    pub status: Option<u16>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub locator: Locator,
    /// Key used when the form is posted without a browser
    pub name: String,
    pub value: String,
}

/// Field values to fill and how to submit them
#[derive(Debug, Clone, Default)]
pub struct FormSubmission {
    pub fields: Vec<FormField>,
    pub submit: Option<Locator>,
    /// Endpoint for adapters that post the form directly
    pub action: Option<String>,
}

impl FormSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the input located by [`Locator::field`] for `name`.
    pub fn field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            locator: Locator::field(name),
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn field_at(mut self, locator: Locator, name: &str, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            locator,
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn submit_with(mut self, locator: Locator) -> Self {
        self.submit = Some(locator);
        self
    }

    pub fn action(mut self, url: impl Into<String>) -> Self {
        self.action = Some(url.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementInfo {
    pub visible: bool,
    pub text: String,
    /// Number of matching elements
    pub count: usize,
}

/// Uniform access to the system under test.
///
/// Every operation either returns a typed outcome or an [`crate::error::AdapterError`]
/// carrying a stable reason. Implementations never panic on target failures.
#[async_trait]
pub trait TargetAdapter: Send + Sync {
    /// Adapter name ("browser", "http")
    fn name(&self) -> &str;

    async fn navigate(&self, url: &str) -> AdapterResult<Navigation>;

    async fn submit_form(&self, form: &FormSubmission) -> AdapterResult<Navigation>;

    async fn locate(&self, locator: &Locator) -> AdapterResult<ElementInfo>;

    async fn request(&self, request: &HttpRequest) -> AdapterResult<HttpResponse>;
}

/// Browser-backed adapter with page interaction primitives
#[async_trait]
pub trait BrowserSession: TargetAdapter {
    async fn is_present(&self, locator: &Locator) -> AdapterResult<bool> {
        Ok(self.locate(locator).await?.count > 0)
    }

    async fn is_visible(&self, locator: &Locator) -> AdapterResult<bool> {
        Ok(self.locate(locator).await?.visible)
    }

    async fn click(&self, locator: &Locator) -> AdapterResult<()>;

    async fn type_text(&self, locator: &Locator, text: &str) -> AdapterResult<()>;

    /// Wait until the locator matches, failing with TIMEOUT.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> AdapterResult<()>;

    async fn title(&self) -> AdapterResult<String>;

    async fn page_source(&self) -> AdapterResult<String>;

    async fn current_url(&self) -> AdapterResult<String>;

    async fn back(&self) -> AdapterResult<()>;

    async fn forward(&self) -> AdapterResult<()>;

    async fn set_viewport(&self, width: u32, height: u32) -> AdapterResult<()>;

    /// Values of `attribute` on every element matching the locator.
    async fn attribute_values(&self, locator: &Locator, attribute: &str)
        -> AdapterResult<Vec<String>>;

    async fn close(&self) -> AdapterResult<()>;
}

/// Opens adapter sessions for suites
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn open_browser(&self) -> Result<Arc<dyn BrowserSession>, OrchestrationFault>;

    async fn http_client(&self) -> Result<Arc<dyn TargetAdapter>, OrchestrationFault>;
}

/// Playwright browser sessions and reqwest HTTP clients
pub struct DefaultAdapterFactory {
    config: HarnessConfig,
}

impl DefaultAdapterFactory {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AdapterFactory for DefaultAdapterFactory {
    async fn open_browser(&self) -> Result<Arc<dyn BrowserSession>, OrchestrationFault> {
        let driver = super::web::WebDriver::new(super::web::WebDriverConfig::from(&self.config))
            .await
            .map_err(|e| OrchestrationFault::AdapterUnavailable {
                adapter: "browser",
                message: format!("{:#}", e),
            })?;
        Ok(Arc::new(driver))
    }

    async fn http_client(&self) -> Result<Arc<dyn TargetAdapter>, OrchestrationFault> {
        let client = super::http::HttpAdapter::new(self.config.adapter_timeout()).map_err(|e| {
            OrchestrationFault::AdapterUnavailable {
                adapter: "http",
                message: e.to_string(),
            }
        })?;
        Ok(Arc::new(client))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_locator_covers_name_id_and_type() {
        let Locator::Css(css) = Locator::field("email") else {
            panic!("expected css locator");
        };
        assert!(css.contains("input[name='email']"));
        assert!(css.contains("input[id='email']"));
        assert!(css.contains("input[type='email']"));
    }

    #[test]
    fn test_response_header_lookup_is_case_insensitive() {
        let mut resp = scripted::response(200);
        resp.headers
            .insert("content-type".into(), "application/json; charset=utf-8".into());
        assert_eq!(
            resp.header("Content-Type"),
            Some("application/json; charset=utf-8")
        );
        assert!(resp.is_json());
    }

    #[tokio::test]
    async fn test_default_presence_builds_on_locate() {
        let adapter = scripted::ScriptedAdapter::new().element(
            &Locator::css("form"),
            ElementInfo {
                visible: true,
                text: String::new(),
                count: 1,
            },
        );
        assert!(adapter.is_present(&Locator::css("form")).await.unwrap());
        assert!(!adapter.is_visible(&Locator::css("nav")).await.unwrap());
    }
}
