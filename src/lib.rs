// Core modules
mod backend;
pub mod crawler;
mod error;
mod fetch;
mod item;
mod page;
pub mod quotes;
mod spider;
mod state;

// Public exports
pub use backend::ElementRef;
pub use crawler::{
    Crawl, CrawlObserver, CrawlPhase, CrawlStats, Crawler, CrawlerBuilder, CrawlerConfig,
    ObserverRegistry, StatsTracker, VisitOutcome, VisitResult,
};
pub use error::{ConfigError, CrawlError, FetchError, LinkError};
pub use fetch::{Fetcher, HttpFetcher};
pub use item::Item as ItemTrait;
pub use page::{Page, resolve_link};
pub use quotes::{DEFAULT_START_URL, Quote, QuoteSpider, extract};
pub use spider::{Extraction, Spider};
pub use state::{CrawlState, UrlNormalizer};
