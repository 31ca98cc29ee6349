use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};

const DUCKDUCKGO_HTML: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub description: String,
}

#[async_trait]
pub trait WebSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

/// DuckDuckGo's JavaScript-free results page.
pub struct DuckDuckGo {
    client: reqwest::Client,
    max_results: usize,
}

impl DuckDuckGo {
    pub fn new(max_results: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(DuckDuckGo { client, max_results })
    }
}

#[async_trait]
impl WebSearch for DuckDuckGo {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let html = self
            .client
            .get(DUCKDUCKGO_HTML)
            .query(&[("q", query)])
            .send()
            .await
            .context("DuckDuckGo request failed")?
            .error_for_status()?
            .text()
            .await?;

        let results = parse_results(&html, self.max_results)?;
        if results.is_empty() {
            warn!("No search results found for {query:?}");
        }
        debug!("DuckDuckGo returned {} results", results.len());
        Ok(results)
    }
}

/// Extracts up to `max_results` results from a DuckDuckGo HTML page.
pub fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchResult>> {
    let document = Html::parse_document(html);
    let result_sel = selector(".result")?;
    let title_sel = selector(".result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let results = document
        .select(&result_sel)
        .filter(|result| !result.value().classes().any(|class| class == "result--ad"))
        .filter_map(|result| {
            let link = result.select(&title_sel).next()?;
            let title = element_text(link);
            let url = link
                .value()
                .attr("href")
                .map(resolve_redirect)
                .filter(|url| !url.is_empty());
            let description = result
                .select(&snippet_sel)
                .next()
                .map(element_text)
                .filter(|text| !text.is_empty());

            Some(SearchResult {
                title: if title.is_empty() { "No Title Available".to_string() } else { title },
                url: url.unwrap_or_else(|| "No URL Available".to_string()),
                description: description.unwrap_or_else(|| "No Description Available".to_string()),
            })
        })
        .take(max_results)
        .collect();

    Ok(results)
}

/// One `title (url): description` line per result.
pub fn flatten_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|res| format!("{} ({}): {}", res.title, res.url, res.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {css}: {e}"))
}

fn element_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result links point at `//duckduckgo.com/l/?uddg=<target>`; unwrap them.
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    match url::Url::parse(&absolute) {
        Ok(parsed) if parsed.path() == "/l/" => parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned())
            .unwrap_or(absolute),
        _ => absolute,
    }
}
