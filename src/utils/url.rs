use regex::Regex;
use reqwest::Url;
use std::sync::OnceLock;

/// Base URL used when the input is empty or has no host.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Normalize a user supplied base URL.
///
/// Trims whitespace and surrounding quotes, drops a leading `@` left over from
/// copy/paste, adds `https://` when no scheme is given and falls back to
/// [`DEFAULT_BASE_URL`] when no host can be found. Trailing slashes are removed so
/// paths can be appended with [`join_url`].
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    let trimmed = trimmed.strip_prefix('@').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    match Url::parse(&candidate) {
        Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => {
            candidate.trim_end_matches('/').to_string()
        }
        _ => DEFAULT_BASE_URL.to_string(),
    }
}

/// Append `path` to `base`, tolerating slashes on either side.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Host part of a URL including a non-default port, e.g. `example.com:8080`.
pub fn host_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => String::new(),
        },
        Err(_) => String::new(),
    }
}

/// Host reduced to characters safe for a file name.
pub fn sanitize_host(host: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9.\-]+").expect("valid regex"));
    let cleaned = re.replace_all(host, "_");
    let cleaned = cleaned.trim_matches(|c| c == '_' || c == '.');
    if cleaned.is_empty() {
        "target".to_string()
    } else {
        cleaned.to_string()
    }
}

/// True when `link` points at the same host as `base` or is relative.
pub fn is_internal_link(base: &str, link: &str) -> bool {
    let Ok(base_url) = Url::parse(base) else {
        return false;
    };
    match base_url.join(link) {
        Ok(resolved) => {
            matches!(resolved.scheme(), "http" | "https")
                && resolved.host_str() == base_url.host_str()
        }
        Err(_) => false,
    }
}

/// Absolute http(s) form of `link` as seen from `page`; `None` for
/// `javascript:`, `mailto:`, fragments and unparsable hrefs.
pub fn resolve_link(page: &str, link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() || link.starts_with('#') {
        return None;
    }
    let resolved = Url::parse(page).ok()?.join(link).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("  'example.com/' "), "https://example.com");
        assert_eq!(normalize_base_url("@http://localhost:3000"), "http://localhost:3000");
        assert_eq!(normalize_base_url("\"https://shop.test/app/\""), "https://shop.test/app");
        assert_eq!(normalize_base_url(""), DEFAULT_BASE_URL);
        assert_eq!(normalize_base_url("http://"), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://a.test/", "/login"), "http://a.test/login");
        assert_eq!(join_url("http://a.test", "api/v1"), "http://a.test/api/v1");
        assert_eq!(join_url("http://a.test", "https://b.test/x"), "https://b.test/x");
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(
            resolve_link("http://a.test/shop/", "cart").as_deref(),
            Some("http://a.test/shop/cart")
        );
        assert_eq!(
            resolve_link("http://a.test", "/about").as_deref(),
            Some("http://a.test/about")
        );
        assert_eq!(resolve_link("http://a.test", "javascript:void(0)"), None);
        assert_eq!(resolve_link("http://a.test", "mailto:x@a.test"), None);
        assert_eq!(resolve_link("http://a.test", "#top"), None);
    }

    #[test]
    fn test_sanitize_host() {
        assert_eq!(sanitize_host("127.0.0.1:8000"), "127.0.0.1_8000");
        assert_eq!(sanitize_host("../../etc"), "etc");
        assert_eq!(sanitize_host(""), "target");
        assert_eq!(host_of("http://shop.test:8080/a"), "shop.test:8080");
    }

    #[test]
    fn test_internal_links() {
        assert!(is_internal_link("http://a.test", "/about"));
        assert!(is_internal_link("http://a.test", "http://a.test/contact"));
        assert!(!is_internal_link("http://a.test", "https://other.test/"));
        assert!(!is_internal_link("http://a.test", "mailto:x@a.test"));
    }
}
