//! DuckDuckGo search backend
//!
//! Scrapes the no-auth HTML results endpoint. Result links are wrapped in
//! a redirect (`/l/?uddg=...`) that must be unwrapped before use.

use super::{SearchBackend, WebSearchResult};
use crate::error::{Result, VetDxError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Free-tier search backend, no API key required
pub struct DuckDuckGoBackend {
    client: reqwest::Client,
}

impl DuckDuckGoBackend {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vetdx/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(VetDxError::Http)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchResult>> {
        let response = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[("q", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VetDxError::Provider(format!(
                "duckduckgo error (HTTP {})",
                response.status()
            )));
        }

        let body = response.text().await?;
        Ok(parse_results(&body, max_results))
    }
}

/// Extract results from the HTML results page
fn parse_results(html: &str, max_results: usize) -> Vec<WebSearchResult> {
    let document = Html::parse_document(html);
    let result_selector = Selector::parse("div.result").expect("static selector");
    let title_selector = Selector::parse("a.result__a").expect("static selector");
    let snippet_selector = Selector::parse(".result__snippet").expect("static selector");

    let mut results = Vec::new();
    for element in document.select(&result_selector) {
        if results.len() >= max_results {
            break;
        }

        let Some(anchor) = element.select(&title_selector).next() else {
            continue;
        };

        let title = anchor.text().collect::<String>().trim().to_string();
        let href = anchor.value().attr("href").unwrap_or_default();
        let url = unwrap_redirect(href);

        if title.is_empty() || url.is_empty() {
            continue;
        }

        let snippet = element
            .select(&snippet_selector)
            .next()
            .map(|s| s.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        results.push(WebSearchResult {
            title,
            url,
            snippet,
            provider: "duckduckgo".to_string(),
        });
    }

    results
}

/// Unwrap the `uddg` redirect parameter, returning the target URL
fn unwrap_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    if let Ok(parsed) = url::Url::parse(&absolute) {
        if parsed.path().starts_with("/l/") {
            if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
                return target.to_string();
            }
        }
        return absolute;
    }

    absolute
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <html><body>
        <div class="result">
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.avma.org%2Fparvo&amp;rut=abc">Canine parvovirus overview</a>
            <a class="result__snippet">Parvovirus causes acute enteritis in puppies.</a>
        </div>
        <div class="result">
            <a class="result__a" href="https://vin.com/giardia">Giardia in dogs</a>
            <div class="result__snippet">Giardiasis presents with chronic diarrhea.</div>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_results_extracts_fields() {
        let results = parse_results(FIXTURE, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Canine parvovirus overview");
        assert_eq!(results[0].url, "https://www.avma.org/parvo");
        assert!(results[0].snippet.contains("enteritis"));
        assert_eq!(results[1].url, "https://vin.com/giardia");
        assert_eq!(results[0].provider, "duckduckgo");
    }

    #[test]
    fn test_parse_results_respects_limit() {
        let results = parse_results(FIXTURE, 1);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_results("<html></html>", 5).is_empty());
    }

    #[test]
    fn test_unwrap_redirect_plain_url() {
        assert_eq!(
            unwrap_redirect("https://example.org/page"),
            "https://example.org/page"
        );
    }
}
