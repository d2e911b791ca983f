//! Homepage structure, menus and link health.

use std::time::Duration;

use super::{any_css, open};
use crate::driver::{BrowserSession, HttpRequest, Locator};
use crate::report::{Severity, TestType};
use crate::runner::suite::{
    default_policy, AdapterKind, Check, CheckContext, CheckError, CheckFuture, SuiteDefinition,
    Verdict,
};
use crate::utils::url::{is_internal_link, resolve_link};

pub const SUITE: SuiteDefinition = SuiteDefinition {
    id: "navigation",
    title: "Navigation",
    adapter: AdapterKind::Browser,
    checks,
    policy: default_policy,
};

const HOMEPAGE_TAGS: [&str; 10] = [
    "header", "nav", "main", "footer", "h1", "h2", "h3", "p", "a", "img",
];
const MENU_SELECTORS: [&str; 9] = [
    "nav",
    ".navbar",
    ".navigation",
    ".menu",
    ".nav-menu",
    "header nav",
    ".main-nav",
    "#navigation",
    "#nav",
];
const MOBILE_WIDTH: u32 = 375;
const MOBILE_HEIGHT: u32 = 667;
const MENU_LINKS_CHECKED: usize = 5;

pub fn checks() -> Vec<Check> {
    vec![
        Check::new("Homepage Navigation", TestType::Navigation, homepage).primary(),
        Check::new("Homepage Content", TestType::Ui, homepage_content),
        Check::new("Main Navigation Menu", TestType::Navigation, main_menu),
        Check::new("Footer Links", TestType::Navigation, footer_links),
        Check::new("Internal Links", TestType::Navigation, internal_links),
        Check::new("Broken Links", TestType::Navigation, broken_links),
        Check::new("Browser Back Navigation", TestType::Navigation, back_navigation),
        Check::new("Browser Forward Navigation", TestType::Navigation, forward_navigation),
        Check::new("Responsive Navigation", TestType::Ui, responsive),
        Check::new("Breadcrumb Navigation", TestType::Navigation, breadcrumbs),
        Check::new("Page Load Performance", TestType::Performance, load_performance),
    ]
}

/// Link check tally
#[derive(Debug, Default)]
struct LinkHealth {
    working: usize,
    broken: Vec<String>,
}

impl LinkHealth {
    fn tested(&self) -> usize {
        self.working + self.broken.len()
    }
}

/// Absolute hrefs of every element matching `locator`, deduplicated in page order.
async fn hrefs(
    ctx: &CheckContext,
    browser: &dyn BrowserSession,
    locator: &Locator,
) -> Result<Vec<String>, CheckError> {
    let mut out: Vec<String> = Vec::new();
    for raw in browser.attribute_values(locator, "href").await? {
        if let Some(link) = resolve_link(&ctx.base_url, &raw) {
            if !out.contains(&link) {
                out.push(link);
            }
        }
    }
    Ok(out)
}

/// Request up to `limit` links; status 400 and above or no answer counts as broken.
async fn check_links(browser: &dyn BrowserSession, links: &[String], limit: usize) -> LinkHealth {
    let mut health = LinkHealth::default();
    for link in links.iter().take(limit) {
        match browser.request(&HttpRequest::get(link.as_str())).await {
            Ok(resp) if resp.status < 400 => health.working += 1,
            Ok(resp) => health.broken.push(format!("{} ({})", link, resp.status)),
            Err(e) => health.broken.push(format!("{} ({})", link, e.kind)),
        }
    }
    health
}

fn homepage(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        let title = browser.title().await?;
        if title.trim().is_empty() {
            Ok(Verdict::bug(Severity::Medium, "Homepage loaded but has no title"))
        } else {
            Ok(Verdict::pass(format!(
                "Homepage loaded successfully. Title: {}",
                title
            )))
        }
    })
}

fn homepage_content(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        let mut found = Vec::new();
        for tag in HOMEPAGE_TAGS {
            if browser.is_present(&Locator::css(tag)).await? {
                found.push(tag);
            }
        }
        if found.len() >= 3 {
            Ok(Verdict::pass(format!(
                "Homepage contains essential elements: {}",
                found.join(", ")
            )))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!(
                    "Homepage missing essential elements. Found only: {}",
                    found.join(", ")
                ),
            ))
        }
    })
}

fn main_menu(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        if !browser.is_present(&any_css(&MENU_SELECTORS)).await? {
            return Ok(Verdict::bug(
                Severity::High,
                "No main navigation menu found on the page",
            )
            .with_type(TestType::Ui));
        }

        let links_css: Vec<String> = MENU_SELECTORS.iter().map(|s| format!("{} a", s)).collect();
        let links = hrefs(ctx, browser, &Locator::css(links_css.join(", "))).await?;
        if links.is_empty() {
            return Ok(Verdict::bug(
                Severity::High,
                "Navigation menu found but contains no links",
            )
            .with_type(TestType::Ui));
        }

        let health = check_links(browser, &links, MENU_LINKS_CHECKED).await;
        if health.working > 0 {
            Ok(Verdict::pass(format!(
                "Navigation menu works. {} working links, {} broken links",
                health.working,
                health.broken.len()
            )))
        } else {
            Ok(Verdict::bug(
                Severity::High,
                format!("All navigation links are broken ({} tested)", health.tested()),
            ))
        }
    })
}

fn footer_links(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        if !browser.is_present(&any_css(&["footer", ".footer", "#footer"])).await? {
            return Ok(Verdict::pass("No footer found on the page (optional element)"));
        }

        let links = hrefs(ctx, browser, &Locator::css("footer a, .footer a, #footer a")).await?;
        if links.is_empty() {
            return Ok(Verdict::pass("Footer found but contains no links"));
        }

        let health = check_links(browser, &links, ctx.config.max_links_checked).await;
        if health.broken.is_empty() {
            Ok(Verdict::pass(format!(
                "Footer links work. {} working links, 0 broken links",
                health.working
            )))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!(
                    "Footer links have issues. {} working, {} broken",
                    health.working,
                    health.broken.len()
                ),
            ))
        }
    })
}

fn internal_links(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        let links: Vec<String> = hrefs(ctx, browser, &Locator::css("a[href]"))
            .await?
            .into_iter()
            .filter(|link| is_internal_link(&ctx.base_url, link))
            .collect();
        if links.is_empty() {
            return Ok(Verdict::bug(Severity::Medium, "No internal links found on the page"));
        }

        let health = check_links(browser, &links, ctx.config.max_links_checked).await;
        if health.working > 0 {
            Ok(Verdict::pass(format!(
                "Internal links work. {} working links, {} broken links",
                health.working,
                health.broken.len()
            )))
        } else {
            Ok(Verdict::bug(
                Severity::High,
                format!("All internal links are broken ({} tested)", health.tested()),
            ))
        }
    })
}

fn broken_links(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        let links = hrefs(ctx, browser, &Locator::css("a[href]")).await?;
        let health = check_links(browser, &links, ctx.config.max_links_checked).await;

        if health.broken.is_empty() {
            Ok(Verdict::pass(format!(
                "No broken links found among {} tested",
                health.tested()
            )))
        } else {
            let sample: Vec<&str> = health.broken.iter().take(3).map(String::as_str).collect();
            Ok(Verdict::bug(
                Severity::High,
                format!(
                    "Found {} broken links: {}",
                    health.broken.len(),
                    sample.join(", ")
                ),
            ))
        }
    })
}

/// Home URL and the first internal link, when the homepage has one.
async fn first_hop<'a>(
    ctx: &'a CheckContext,
) -> Result<(&'a dyn BrowserSession, String, Option<String>), CheckError> {
    let browser = open(ctx, "/").await?;
    let home = browser.current_url().await?;
    let next = hrefs(ctx, browser, &Locator::css("a[href]"))
        .await?
        .into_iter()
        .find(|link| is_internal_link(&ctx.base_url, link) && *link != home);
    Ok((browser, home, next))
}

fn back_navigation(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let (browser, home, next) = first_hop(ctx).await?;
        let Some(next) = next else {
            return Ok(Verdict::pass("No internal links to test browser back navigation"));
        };

        browser.navigate(&next).await?;
        browser.back().await?;
        let back_url = browser.current_url().await?;
        if back_url == home {
            Ok(Verdict::pass("Browser back navigation returns to the homepage"))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!(
                    "Browser back navigation failed. Expected: {}, Got: {}",
                    home, back_url
                ),
            ))
        }
    })
}

fn forward_navigation(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let (browser, _home, next) = first_hop(ctx).await?;
        let Some(next) = next else {
            return Ok(Verdict::pass("No internal links to test browser forward navigation"));
        };

        browser.navigate(&next).await?;
        let second = browser.current_url().await?;
        browser.back().await?;
        browser.forward().await?;
        let forward_url = browser.current_url().await?;
        if forward_url == second {
            Ok(Verdict::pass("Browser forward navigation returns to the visited page"))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!(
                    "Browser forward navigation failed. Expected: {}, Got: {}",
                    second, forward_url
                ),
            ))
        }
    })
}

async fn mobile_menu(ctx: &CheckContext) -> Result<Verdict, CheckError> {
    let browser = open(ctx, "/").await?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    let mobile_nav = any_css(&[
        "nav",
        ".navbar",
        ".navigation",
        ".mobile-nav",
        ".hamburger",
        ".menu-toggle",
    ]);
    if browser.is_present(&mobile_nav).await? {
        Ok(Verdict::pass(format!(
            "Navigation is available at {}x{}",
            MOBILE_WIDTH, MOBILE_HEIGHT
        )))
    } else {
        Ok(Verdict::bug(
            Severity::Medium,
            format!(
                "No navigation or menu toggle at {}x{}",
                MOBILE_WIDTH, MOBILE_HEIGHT
            ),
        ))
    }
}

fn responsive(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = ctx.browser()?;
        browser.set_viewport(MOBILE_WIDTH, MOBILE_HEIGHT).await?;
        let verdict = mobile_menu(ctx).await;

        // Later checks share this page.
        if let Err(e) = browser
            .set_viewport(ctx.config.viewport_width, ctx.config.viewport_height)
            .await
        {
            log::warn!("failed to restore viewport: {}", e);
        }
        verdict
    })
}

fn breadcrumbs(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = open(ctx, "/").await?;
        let trail = any_css(&[".breadcrumb", ".breadcrumbs", "nav[aria-label*='breadcrumb' i]"]);
        if !browser.is_present(&trail).await? {
            return Ok(Verdict::pass("No breadcrumb navigation found (optional element)"));
        }

        let links = hrefs(
            ctx,
            browser,
            &Locator::css(".breadcrumb a, .breadcrumbs a, nav[aria-label*='breadcrumb' i] a"),
        )
        .await?;
        if links.is_empty() {
            return Ok(Verdict::pass("Breadcrumb trail has no links"));
        }

        let health = check_links(browser, &links, ctx.config.max_links_checked).await;
        if health.broken.is_empty() {
            Ok(Verdict::pass(format!(
                "Breadcrumb navigation works. {} working links",
                health.working
            )))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!("Breadcrumb links broken: {}", health.broken.join(", ")),
            ))
        }
    })
}

fn load_performance(ctx: &CheckContext) -> CheckFuture<'_> {
    Box::pin(async move {
        let browser = ctx.browser()?;
        let nav = browser.navigate(&ctx.url("/")).await?;
        let budget = Duration::from_millis(ctx.config.page_load_budget_ms);
        let secs = nav.elapsed.as_secs_f64();
        if nav.elapsed <= budget {
            Ok(Verdict::pass(format!("Homepage loaded in {:.2}s", secs)))
        } else {
            Ok(Verdict::bug(
                Severity::Medium,
                format!(
                    "Homepage took {:.2}s to load, budget is {:.2}s",
                    secs,
                    budget.as_secs_f64()
                ),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::traits::scripted::{response, ScriptedAdapter};
    use crate::report::Outcome;
    use crate::suites::testing::{browser_ctx, run_named, visible};

    async fn run(name: &str, adapter: ScriptedAdapter) -> crate::report::TestResult {
        run_named(checks(), SUITE.policy, name, &browser_ctx(adapter)).await
    }

    fn with_links(adapter: ScriptedAdapter, links: &[&str]) -> ScriptedAdapter {
        *adapter.attributes.lock().unwrap() = links.iter().map(|l| l.to_string()).collect();
        adapter
    }

    #[tokio::test]
    async fn test_blank_title_is_bug() {
        let result = run("Homepage Navigation", ScriptedAdapter::new().with_page("", "  ")).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_homepage_content_lists_found_tags() {
        let adapter = ScriptedAdapter::new()
            .element(&Locator::css("header"), visible(1))
            .element(&Locator::css("h1"), visible(1))
            .element(&Locator::css("a"), visible(4));
        let result = run("Homepage Content", adapter).await;
        assert_eq!(result.outcome, Outcome::Pass);
        assert!(result.details.contains("header, h1, a"));
    }

    #[tokio::test]
    async fn test_broken_links_are_sampled() {
        let adapter = with_links(
            ScriptedAdapter::new()
                .respond("/about", Ok(response(200)))
                .respond("/pricing", Ok(response(500))),
            &["/about", "/pricing", "/gone", "mailto:hi@shop.test", "#top"],
        );
        let result = run("Broken Links", adapter).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.severity, Severity::High);
        assert!(result.details.starts_with("Found 2 broken links"));
        assert!(result.details.contains("http://shop.test/pricing (500)"));
        assert!(result.details.contains("http://shop.test/gone (404)"));
    }

    #[tokio::test]
    async fn test_external_links_are_not_internal() {
        let adapter = with_links(ScriptedAdapter::new(), &["https://elsewhere.test/x"]);
        let result = run("Internal Links", adapter).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert!(result.details.contains("No internal links"));
    }

    #[tokio::test]
    async fn test_menu_missing_is_ui_bug() {
        let result = run("Main Navigation Menu", ScriptedAdapter::new()).await;
        assert_eq!(result.outcome, Outcome::Bug);
        assert_eq!(result.test_type, TestType::Ui);
        assert_eq!(result.severity, Severity::High);
    }

    #[tokio::test]
    async fn test_menu_with_one_working_link_passes() {
        let adapter = with_links(
            ScriptedAdapter::new()
                .element(&Locator::css("nav"), visible(1))
                .respond("/docs", Ok(response(200))),
            &["/docs", "/missing"],
        );
        let result = run("Main Navigation Menu", adapter).await;
        assert_eq!(result.outcome, Outcome::Pass);
        assert!(result.details.contains("1 working links, 1 broken links"));
    }

    #[tokio::test]
    async fn test_page_load_within_budget_passes() {
        let result = run("Page Load Performance", ScriptedAdapter::new()).await;
        assert_eq!(result.outcome, Outcome::Pass);
        assert_eq!(result.test_type, TestType::Performance);
    }

    #[tokio::test]
    async fn test_responsive_restores_viewport_and_reports() {
        let adapter = ScriptedAdapter::new().element(&Locator::css(".hamburger"), visible(1));
        let result = run("Responsive Navigation", adapter).await;
        assert_eq!(result.outcome, Outcome::Pass);
        assert!(result.details.contains("375x667"));
    }
}
