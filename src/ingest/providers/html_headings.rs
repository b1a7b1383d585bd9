// src/ingest/providers/html_headings.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::ingest::sources::TrustedSource;
use crate::ingest::types::HeadlineFetcher;
use crate::text::normalize_text;

/// Heading selectors tried in order; later ones catch sites that style headlines with classes.
const HEADLINE_SELECTORS: [&str; 8] = [
    "h1",
    "h2",
    "h3",
    ".headline",
    ".title",
    "[data-testid*=\"headline\"]",
    "article h1",
    "article h2",
];

static SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    HEADLINE_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});

/// Heading texts from an HTML page: at most `max` per selector and `max` overall,
/// each with at least `min_words` words, whitespace-normalized and deduplicated.
pub fn extract_headings(html: &str, max: usize, min_words: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for selector in SELECTORS.iter() {
        for element in document.select(selector).take(max) {
            let text = normalize_text(&element.text().collect::<Vec<_>>().join(" "));
            if text.split_whitespace().count() < min_words {
                continue;
            }
            if seen.insert(text.clone()) {
                out.push(text);
            }
            if out.len() >= max {
                return out;
            }
        }
    }
    out
}

pub struct HtmlHeadingFetcher {
    mode: Mode,
    min_words: usize,
}

enum Mode {
    /// Pages keyed by source URL; a missing URL behaves like an unreachable source.
    Fixture(HashMap<String, String>),
    Http(reqwest::Client),
}

impl HtmlHeadingFetcher {
    pub fn http(timeout: Duration, min_words: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; fake-news-analyzer/0.1)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building headline http client")?;
        Ok(Self {
            mode: Mode::Http(client),
            min_words,
        })
    }

    pub fn from_fixtures(pages: HashMap<String, String>, min_words: usize) -> Self {
        Self {
            mode: Mode::Fixture(pages),
            min_words,
        }
    }

    async fn page(&self, url: &str) -> Result<String> {
        match &self.mode {
            Mode::Fixture(pages) => pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("no fixture page for {url}")),
            Mode::Http(client) => {
                let resp = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("GET {url}"))?
                    .error_for_status()
                    .with_context(|| format!("GET {url}"))?;
                resp.text().await.with_context(|| format!("reading body of {url}"))
            }
        }
    }
}

#[async_trait]
impl HeadlineFetcher for HtmlHeadingFetcher {
    async fn fetch_headlines(&self, source: &TrustedSource, max: usize) -> Result<Vec<String>> {
        let html = self.page(&source.url).await?;
        let t0 = std::time::Instant::now();
        let out = extract_headings(&html, max, self.min_words);
        histogram!("headline_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        match self.mode {
            Mode::Fixture(_) => "html-fixture",
            Mode::Http(_) => "html-http",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <h1>Senate passes   the budget bill</h1>
          <h2>Short one</h2>
          <article><h2>Storm &amp; flooding hit the coast overnight</h2></article>
          <div class="headline">Markets rally as inflation cools down</div>
          <span data-testid="card-headline">Scientists map a new deep sea trench</span>
        </body></html>
    "#;

    #[test]
    fn extracts_long_enough_unique_headings() {
        let got = extract_headings(PAGE, 50, 4);
        assert_eq!(
            got,
            vec![
                "Senate passes the budget bill",
                "Storm & flooding hit the coast overnight",
                "Markets rally as inflation cools down",
                "Scientists map a new deep sea trench",
            ]
        );
    }

    #[test]
    fn respects_cap() {
        assert_eq!(extract_headings(PAGE, 2, 4).len(), 2);
        assert!(extract_headings("<p>no headings</p>", 10, 4).is_empty());
    }

    #[tokio::test]
    async fn fixture_mode_missing_page_is_error() {
        let f = HtmlHeadingFetcher::from_fixtures(HashMap::new(), 4);
        let src = TrustedSource::new("https://nowhere.example", 0.5, "global");
        assert!(f.fetch_headlines(&src, 5).await.is_err());
    }
}
