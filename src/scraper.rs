use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::parser::{self, ExtractError};
use crate::table::RawRecord;

pub const BASE_URL: &str =
    "https://police.byu.edu/police-beat-list?00000182-aebd-d773-a387-ffff44970000-page=";
pub const FIRST_PAGE: u32 = 1;
pub const LAST_PAGE: u32 = 64;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
pub const PAGE_DELAY_MS: u64 = 2000;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for page {page} failed: {source}")]
    Transport {
        page: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("page {page} returned HTTP {status}")]
    Status { page: u32, status: u16 },
}

#[derive(Debug, Error)]
enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Source of listing-page markup by page index.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, page: u32) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpFetcher {
            client,
            base_url: base_url.into(),
        })
    }

    fn page_url(&self, page: u32) -> String {
        format!("{}{}", self.base_url, page)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, page: u32) -> Result<String, FetchError> {
        let url = self.page_url(page);
        let start = Instant::now();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Transport { page, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                page,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Transport { page, source })?;
        debug!(
            "Fetched {} ({} bytes) in {}ms",
            url,
            body.len(),
            start.elapsed().as_millis()
        );
        Ok(body)
    }
}

/// Page counts after a scrape.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub empty: usize,
    pub errors: usize,
    pub records: usize,
}

pub struct ScrapeOutcome {
    pub records: Vec<RawRecord>,
    pub stats: ScrapeStats,
}

/// Fetch and extract every page in `pages`, one at a time.
///
/// Sleeps `delay` before each request after the first. A page that fails to
/// fetch or parse is logged and skipped; it is never retried.
pub async fn scrape_pages(
    fetcher: &dyn PageFetcher,
    pages: RangeInclusive<u32>,
    delay: Duration,
) -> Result<ScrapeOutcome> {
    let total = pages.clone().count();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} pages ({msg})")?
            .progress_chars("=> "),
    );

    let mut records = Vec::new();
    let mut stats = ScrapeStats {
        total,
        ..Default::default()
    };

    for (i, page) in pages.enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        info!("Scraping page {}...", page);

        match scrape_page(fetcher, page).await {
            Ok(found) if found.is_empty() => {
                info!("No incidents found on page {}", page);
                stats.ok += 1;
                stats.empty += 1;
            }
            Ok(found) => {
                for r in &found {
                    debug!(date = %r.date, description = ?r.description, "incident");
                }
                stats.ok += 1;
                stats.records += found.len();
                records.extend(found);
            }
            Err(e) => {
                warn!("Error scraping page {}: {}", page, e);
                stats.errors += 1;
            }
        }

        pb.set_message(format!("{} incidents", records.len()));
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Scraped {} pages ({} ok, {} empty, {} errors), {} incidents",
        stats.total, stats.ok, stats.empty, stats.errors, stats.records
    );

    Ok(ScrapeOutcome { records, stats })
}

async fn scrape_page(fetcher: &dyn PageFetcher, page: u32) -> Result<Vec<RawRecord>, PageError> {
    let html = fetcher.fetch_page(page).await?;
    Ok(parser::extract_records(&html)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves a fixed page body for every index except the failing ones.
    struct StubFetcher {
        failing: Vec<u32>,
    }

    fn page_html(page: u32) -> String {
        let items: String = (0..page % 3 + 1)
            .map(|i| format!("<li>Theft Item {i} on page {page}</li>"))
            .collect();
        format!(
            r#"<div class="PromoImageSmall"><span class="date">Page {page}</span>
            <div class="PromoImageSmall-description"><ul>{items}</ul></div></div>"#
        )
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch_page(&self, page: u32) -> Result<String, FetchError> {
            if self.failing.contains(&page) {
                return Err(FetchError::Status { page, status: 503 });
            }
            Ok(page_html(page))
        }
    }

    #[tokio::test]
    async fn failed_page_does_not_stop_the_batch() {
        let fetcher = StubFetcher { failing: vec![5] };
        let outcome = scrape_pages(&fetcher, 1..=8, Duration::ZERO).await.unwrap();

        let expected: usize = (1..=8u32).filter(|p| *p != 5).map(|p| (p % 3 + 1) as usize).sum();
        assert_eq!(outcome.records.len(), expected);
        assert_eq!(
            outcome.stats,
            ScrapeStats {
                total: 8,
                ok: 7,
                empty: 0,
                errors: 1,
                records: expected,
            }
        );
        assert!(outcome.records.iter().all(|r| r.date != "Page 5"));
        assert!(outcome.records.iter().any(|r| r.date == "Page 6"));
        assert!(outcome.records.iter().any(|r| r.date == "Page 8"));
    }

    #[tokio::test]
    async fn records_keep_page_order() {
        let fetcher = StubFetcher { failing: vec![] };
        let outcome = scrape_pages(&fetcher, 2..=3, Duration::ZERO).await.unwrap();
        let descriptions: Vec<_> = outcome
            .records
            .iter()
            .map(|r| r.description.as_deref().unwrap())
            .collect();
        assert_eq!(
            descriptions,
            vec![
                "Theft Item 0 on page 2",
                "Theft Item 1 on page 2",
                "Theft Item 2 on page 2",
                "Theft Item 0 on page 3",
            ]
        );
    }

    struct EmptyFetcher;

    #[async_trait]
    impl PageFetcher for EmptyFetcher {
        async fn fetch_page(&self, _page: u32) -> Result<String, FetchError> {
            Ok("<html><body><p>There are no more results.</p></body></html>".to_string())
        }
    }

    #[tokio::test]
    async fn empty_pages_are_counted() {
        let outcome = scrape_pages(&EmptyFetcher, 1..=2, Duration::ZERO).await.unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.stats.ok, 2);
        assert_eq!(outcome.stats.empty, 2);
    }

    #[test]
    fn page_url_appends_index() {
        let fetcher = HttpFetcher::new(BASE_URL, Duration::from_secs(1)).unwrap();
        assert_eq!(
            fetcher.page_url(7),
            "https://police.byu.edu/police-beat-list?00000182-aebd-d773-a387-ffff44970000-page=7"
        );
    }
}
