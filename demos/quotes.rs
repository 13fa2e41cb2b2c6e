//! Crawl quotes.toscrape.com and print every quote as a JSON line
//!
//! ```text
//! cargo run --example quotes -- [START_URL]
//! RUST_LOG=quotely=debug cargo run --example quotes
//! ```
//!
//! Press Ctrl-C to stop early; pages already in flight still print.

use anyhow::Result;
use futures_util::StreamExt;
use quotely::{CrawlObserver, CrawlStats, Crawler, FetchError, QuoteSpider, VisitResult};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Logs page-level progress
struct ProgressObserver;

#[async_trait::async_trait]
impl CrawlObserver for ProgressObserver {
    async fn on_url_visited(&self, result: &VisitResult) {
        tracing::info!(url = %result.visited_url, fetched = result.is_fetched(), "visited");
    }

    async fn on_fetch_error(&self, url: &Url, error: &FetchError) {
        tracing::warn!(%url, %error, "page skipped");
    }

    async fn on_crawl_complete(&self, stats: &CrawlStats) {
        tracing::info!(
            urls = stats.urls_visited,
            quotes = stats.items_extracted,
            errors = stats.errors_encountered,
            elapsed = ?stats.elapsed(),
            "crawl complete"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,quotely=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let spider = match std::env::args().nth(1) {
        Some(start_url) => QuoteSpider::new([start_url]),
        None => QuoteSpider::default(),
    };

    let crawler = Crawler::builder()
        .crawling_concurrency(4)
        .request_timeout(Duration::from_secs(15))
        .observe_with(Arc::new(ProgressObserver))
        .build()?;

    let mut crawl = crawler.crawl(Arc::new(spider)).await?;

    let token = crawl.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, finishing in-flight pages");
            token.cancel();
        }
    });

    while let Some(quote) = crawl.next().await {
        println!("{}", serde_json::to_string(&quote)?);
    }

    let stats = crawl.finish().await;
    tracing::info!(
        urls_per_second = %format!("{:.2}", stats.urls_per_second()),
        "done"
    );

    Ok(())
}
