//! Concurrent crawl driver
//!
//! This module runs a [`Spider`] against the web:
//! - **Bounded concurrency**: up to `crawling_concurrency` fetches in flight
//! - **At-most-once fetching**: every normalized URL is scheduled once per crawl
//! - **Lazy output**: records stream out of [`Crawl`] as pages are parsed
//! - **Graceful cancellation**: stop dispatching, finish in-flight pages, reach `Done`
//! - **Observability**: observer hooks, `tracing` events and live statistics
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use quotely::{Crawler, QuoteSpider};
//! use std::sync::Arc;
//!
//! let crawler = Crawler::builder().crawling_concurrency(4).build()?;
//! let mut crawl = crawler.crawl(Arc::new(QuoteSpider::default())).await?;
//!
//! while let Some(quote) = crawl.next().await {
//!     println!("{:?}", quote);
//! }
//! ```
//!
//! ## With Cancellation
//!
//! ```ignore
//! let crawl = crawler.crawl(spider).await?;
//! let token = crawl.cancel_token();
//!
//! tokio::spawn(async move {
//!     tokio::time::sleep(Duration::from_secs(10)).await;
//!     token.cancel();
//! });
//!
//! let (quotes, stats) = crawl.collect_all().await;
//! ```

use std::{
    pin::Pin,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll},
    time::{Duration, Instant},
};

use futures_util::{Stream, StreamExt};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::timeout,
};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    ConfigError, CrawlError, CrawlState, Extraction, FetchError, Fetcher, HttpFetcher, LinkError,
    Spider,
};

/// What happened when a URL was visited
#[derive(Debug)]
pub enum VisitOutcome {
    /// The page was fetched and parsed
    Fetched {
        /// URL the content was served from, after redirects
        final_url: Url,
        /// Number of items extracted from the page
        items: usize,
        /// Links found on the page, before deduplication
        discovered_urls: Vec<Url>,
        /// Anchors that could not be followed
        dropped_links: Vec<LinkError>,
    },
    /// The request redirected to a page that is already scheduled or
    /// fetched; its items were discarded
    Duplicate {
        /// URL the content was served from
        final_url: Url,
    },
    /// The fetch failed and the page was skipped
    Skipped(FetchError),
}

/// Result of visiting a URL during crawling
#[derive(Debug)]
pub struct VisitResult {
    /// The URL that was requested
    pub visited_url: Url,
    pub outcome: VisitOutcome,
}

impl VisitResult {
    fn fetched(
        visited_url: Url,
        final_url: Url,
        items: usize,
        discovered_urls: Vec<Url>,
        dropped_links: Vec<LinkError>,
    ) -> Self {
        Self {
            visited_url,
            outcome: VisitOutcome::Fetched {
                final_url,
                items,
                discovered_urls,
                dropped_links,
            },
        }
    }

    fn duplicate(visited_url: Url, final_url: Url) -> Self {
        Self {
            visited_url,
            outcome: VisitOutcome::Duplicate { final_url },
        }
    }

    fn skipped(visited_url: Url, error: FetchError) -> Self {
        Self {
            visited_url,
            outcome: VisitOutcome::Skipped(error),
        }
    }

    /// Whether the page was fetched successfully
    pub fn is_fetched(&self) -> bool {
        matches!(self.outcome, VisitOutcome::Fetched { .. })
    }
}

/// Lifecycle of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    /// Seeds not yet validated
    Idle,
    /// Pages are being fetched
    Running,
    /// Queue drained, nothing in flight
    Done,
}

/// Observer trait for receiving crawl events
///
/// Implement this trait to monitor crawl progress, collect custom metrics,
/// or implement custom logging strategies.
///
/// # Example
///
/// ```ignore
/// use quotely::{CrawlObserver, VisitResult};
///
/// struct PrintingObserver;
///
/// #[async_trait::async_trait]
/// impl CrawlObserver for PrintingObserver {
///     async fn on_url_visited(&self, result: &VisitResult) {
///         println!("Visited: {}", result.visited_url);
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait CrawlObserver: Send + Sync {
    /// Called when a URL is admitted to the queue
    async fn on_url_queued(&self, _url: &Url) {}

    /// Called when a URL visit finished, successfully or not
    async fn on_url_visited(&self, _result: &VisitResult) {}

    /// Called when an item is emitted from a page
    async fn on_item_extracted(&self, _url: &Url) {}

    /// Called when a page could not be fetched
    async fn on_fetch_error(&self, _url: &Url, _error: &FetchError) {}

    /// Called when an anchor on a page could not be followed
    async fn on_link_dropped(&self, _page: &Url, _error: &LinkError) {}

    /// Called when the crawl completes
    async fn on_crawl_complete(&self, _stats: &CrawlStats) {}
}

/// Registry for managing multiple crawl observers
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn CrawlObserver>>,
}

impl ObserverRegistry {
    /// Create a new empty ObserverRegistry
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Register an observer to receive crawl events
    pub fn register(&mut self, observer: Arc<dyn CrawlObserver>) {
        self.observers.push(observer);
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub async fn notify_url_queued(&self, url: &Url) {
        for observer in &self.observers {
            observer.on_url_queued(url).await;
        }
    }

    pub async fn notify_url_visited(&self, result: &VisitResult) {
        for observer in &self.observers {
            observer.on_url_visited(result).await;
        }
    }

    pub async fn notify_item_extracted(&self, url: &Url) {
        for observer in &self.observers {
            observer.on_item_extracted(url).await;
        }
    }

    pub async fn notify_fetch_error(&self, url: &Url, error: &FetchError) {
        for observer in &self.observers {
            observer.on_fetch_error(url, error).await;
        }
    }

    pub async fn notify_link_dropped(&self, page: &Url, error: &LinkError) {
        for observer in &self.observers {
            observer.on_link_dropped(page, error).await;
        }
    }

    pub async fn notify_crawl_complete(&self, stats: &CrawlStats) {
        for observer in &self.observers {
            observer.on_crawl_complete(stats).await;
        }
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics collected during crawling with timestamps
#[derive(Debug, Clone)]
pub struct CrawlStats {
    /// Number of URLs whose visit finished, including skipped and duplicate pages
    pub urls_visited: usize,
    /// Number of items emitted
    pub items_extracted: usize,
    /// Number of pages skipped because the fetch failed
    pub errors_encountered: usize,
    /// Number of anchors that could not be followed
    pub links_dropped: usize,
    /// When the crawl started
    pub start_time: Instant,
    /// When these stats were last updated
    pub last_update: Instant,
}

impl CrawlStats {
    /// Create new CrawlStats with current timestamp
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            urls_visited: 0,
            items_extracted: 0,
            errors_encountered: 0,
            links_dropped: 0,
            start_time: now,
            last_update: now,
        }
    }

    /// Get elapsed time since crawl started
    pub fn elapsed(&self) -> Duration {
        self.last_update.duration_since(self.start_time)
    }

    /// Calculate URLs visited per second
    pub fn urls_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.urls_visited as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe statistics tracker with real-time broadcasting
pub struct StatsTracker {
    urls_visited: AtomicUsize,
    items_extracted: AtomicUsize,
    errors_encountered: AtomicUsize,
    links_dropped: AtomicUsize,
    start_time: Instant,
    tx: Mutex<Option<watch::Sender<CrawlStats>>>,
    rx: watch::Receiver<CrawlStats>,
}

impl StatsTracker {
    /// Create a new StatsTracker
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(CrawlStats::new());
        Self {
            urls_visited: AtomicUsize::new(0),
            items_extracted: AtomicUsize::new(0),
            errors_encountered: AtomicUsize::new(0),
            links_dropped: AtomicUsize::new(0),
            start_time: Instant::now(),
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Subscribe to statistics updates
    pub fn subscribe(&self) -> watch::Receiver<CrawlStats> {
        self.rx.clone()
    }

    pub fn url_visited(&self) {
        // Counters are informational only
        self.urls_visited.fetch_add(1, Ordering::Relaxed);
        self.broadcast();
    }

    pub fn item_extracted(&self) {
        self.items_extracted.fetch_add(1, Ordering::Relaxed);
        self.broadcast();
    }

    pub fn error_encountered(&self) {
        self.errors_encountered.fetch_add(1, Ordering::Relaxed);
        self.broadcast();
    }

    pub fn link_dropped(&self) {
        self.links_dropped.fetch_add(1, Ordering::Relaxed);
        self.broadcast();
    }

    /// Broadcast current statistics to all subscribers
    fn broadcast(&self) {
        let stats = self.snapshot();
        if let Ok(guard) = self.tx.lock()
            && let Some(tx) = guard.as_ref()
        {
            // No subscribers is fine
            let _ = tx.send(stats);
        }
    }

    /// Get a snapshot of current statistics
    pub fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            urls_visited: self.urls_visited.load(Ordering::Relaxed),
            items_extracted: self.items_extracted.load(Ordering::Relaxed),
            errors_encountered: self.errors_encountered.load(Ordering::Relaxed),
            links_dropped: self.links_dropped.load(Ordering::Relaxed),
            start_time: self.start_time,
            last_update: Instant::now(),
        }
    }

    /// Close the statistics sender to signal completion to subscribers
    pub fn close(&self) {
        if let Ok(mut guard) = self.tx.lock() {
            *guard = None;
        }
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

// Configuration defaults
const DEFAULT_CRAWLING_CONCURRENCY: usize = 2;
const DEFAULT_ITEM_QUEUE_CAPACITY: usize = 64;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("quotely/", env!("CARGO_PKG_VERSION"));

/// Validated configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub(crate) crawling_concurrency: usize,
    pub(crate) item_queue_capacity: usize,
    pub(crate) request_timeout: Duration,
    pub(crate) user_agent: String,
    pub(crate) max_pages: Option<usize>,
}

impl CrawlerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crawling_concurrency == 0 {
            return Err(ConfigError::InvalidCrawlingConcurrency(0));
        }
        if self.item_queue_capacity == 0 {
            return Err(ConfigError::InvalidItemQueueCapacity(0));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidRequestTimeout(self.request_timeout));
        }
        if self.max_pages == Some(0) {
            return Err(ConfigError::InvalidMaxPages(0));
        }
        Ok(())
    }

    pub fn crawling_concurrency(&self) -> usize {
        self.crawling_concurrency
    }

    pub fn item_queue_capacity(&self) -> usize {
        self.item_queue_capacity
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            crawling_concurrency: DEFAULT_CRAWLING_CONCURRENCY,
            item_queue_capacity: DEFAULT_ITEM_QUEUE_CAPACITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_pages: None,
        }
    }
}

/// Shared handles every task of one crawl needs
struct CrawlContext<T> {
    spider: Arc<dyn Spider<Item = T>>,
    fetcher: Arc<dyn Fetcher>,
    config: CrawlerConfig,
    observers: Arc<ObserverRegistry>,
    stats: Arc<StatsTracker>,
}

impl<T> Clone for CrawlContext<T> {
    fn clone(&self) -> Self {
        Self {
            spider: self.spider.clone(),
            fetcher: self.fetcher.clone(),
            config: self.config.clone(),
            observers: self.observers.clone(),
            stats: self.stats.clone(),
        }
    }
}

impl<T: Send + 'static> CrawlContext<T> {
    /// Fetch one URL under the request timeout and run the spider on it
    async fn fetch_and_parse(&self, url: &Url) -> Result<(Url, Extraction<T>), FetchError> {
        let page = match timeout(self.config.request_timeout, self.fetcher.fetch(url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                });
            }
        };
        let extraction = self.spider.parse(&page);
        Ok((page.url().clone(), extraction))
    }

    /// Account for a failed fetch
    async fn report_fetch_error(&self, url: &Url, error: &FetchError) {
        warn!(%url, %error, "skipping page");
        self.stats.error_encountered();
        self.observers.notify_fetch_error(url, error).await;
    }
}

/// Web crawler that drives a spider over a link graph
///
/// The crawler coordinates:
/// - Workers that fetch pages and run the spider on them
/// - A coordinator that owns the [`CrawlState`] and decides what to fetch next
/// - A bounded item channel the caller drains through [`Crawl`]
pub struct Crawler {
    config: CrawlerConfig,
    fetcher: Arc<dyn Fetcher>,
    observers: Arc<ObserverRegistry>,
}

impl Crawler {
    /// Create a crawler builder for custom configuration
    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::default()
    }

    /// The validated configuration
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    fn new_with_config(
        config: CrawlerConfig,
        fetcher: Arc<dyn Fetcher>,
        observers: Vec<Arc<dyn CrawlObserver>>,
    ) -> Self {
        let mut registry = ObserverRegistry::new();
        for observer in observers {
            registry.register(observer);
        }

        Self {
            config,
            fetcher,
            observers: Arc::new(registry),
        }
    }

    /// Start crawling with the given spider
    ///
    /// Seeds are validated and fetched before this returns, so a bad or
    /// unreachable seed fails here without producing any records. The rest
    /// of the crawl runs in the background and its items stream out of the
    /// returned [`Crawl`].
    pub async fn crawl<S>(&self, spider: Arc<S>) -> Result<Crawl<S::Item>, CrawlError>
    where
        S: Spider + 'static,
    {
        self.crawl_with_cancellation(spider, CancellationToken::new())
            .await
    }

    /// Start crawling with an externally owned cancellation token
    ///
    /// When the token is cancelled, the crawler will:
    /// - Stop dispatching queued URLs
    /// - Let in-flight pages finish and emit their items
    /// - Reach [`CrawlPhase::Done`]
    ///
    /// A token that is already cancelled still has its seeds validated, but
    /// nothing is fetched and the returned crawl is `Done` and empty.
    pub async fn crawl_with_cancellation<S>(
        &self,
        spider: Arc<S>,
        cancel_token: CancellationToken,
    ) -> Result<Crawl<S::Item>, CrawlError>
    where
        S: Spider + 'static,
    {
        let (phase_tx, phase_rx) = watch::channel(CrawlPhase::Idle);
        let seeds = parse_seeds(spider.start_urls())?;

        let ctx = CrawlContext {
            spider: spider as Arc<dyn Spider<Item = S::Item>>,
            fetcher: self.fetcher.clone(),
            config: self.config.clone(),
            observers: self.observers.clone(),
            stats: Arc::new(StatsTracker::new()),
        };

        if cancel_token.is_cancelled() {
            info!(spider = ctx.spider.name(), "crawl cancelled before start");
            return Ok(Crawl::cancelled_before_start(ctx, cancel_token, phase_tx).await);
        }

        phase_tx.send_replace(CrawlPhase::Running);
        info!(
            spider = ctx.spider.name(),
            seeds = seeds.len(),
            concurrency = ctx.config.crawling_concurrency,
            "starting crawl"
        );

        let mut state = CrawlState::new();
        for seed in seeds {
            if state.enqueue(seed.clone()) {
                ctx.observers.notify_url_queued(&seed).await;
            }
        }

        let seed_pages = fetch_seeds(&ctx, &mut state).await?;

        let (items_tx, items_rx) = mpsc::channel(ctx.config.item_queue_capacity);
        let stats = ctx.stats.clone();
        let driver = tokio::spawn(drive(
            ctx,
            state,
            seed_pages,
            items_tx,
            cancel_token.clone(),
            phase_tx,
        ));

        Ok(Crawl {
            items: ReceiverStream::new(items_rx),
            cancel_token,
            phase: phase_rx,
            stats,
            driver,
        })
    }
}

/// Builder for configuring a Crawler
pub struct CrawlerBuilder {
    config: CrawlerConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
    observers: Vec<Arc<dyn CrawlObserver>>,
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlerBuilder {
    /// Create a new CrawlerBuilder with default settings
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
            fetcher: None,
            observers: Vec::new(),
        }
    }

    /// Set the number of concurrent fetches (default: 2)
    pub fn crawling_concurrency(mut self, concurrency: usize) -> Self {
        self.config.crawling_concurrency = concurrency;
        self
    }

    /// Set how many extracted items may wait for the consumer (default: 64)
    ///
    /// Workers pause when the buffer is full.
    pub fn item_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.item_queue_capacity = capacity;
        self
    }

    /// Set the per-request timeout (default: 30s)
    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.config.request_timeout = request_timeout;
        self
    }

    /// Set the User-Agent header of the default HTTP fetcher
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Stop scheduling once this many fetch attempts have been made
    ///
    /// Seeds count towards the limit but are always fetched.
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = Some(max_pages);
        self
    }

    /// Replace the default HTTP fetcher
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Register an observer to receive crawl events
    pub fn observe_with(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Build the Crawler with the configured settings
    pub fn build(self) -> Result<Crawler, ConfigError> {
        self.config.validate()?;
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(
                self.config.request_timeout,
                &self.config.user_agent,
            )?),
        };
        Ok(Crawler::new_with_config(self.config, fetcher, self.observers))
    }
}

/// A running crawl
///
/// Implements [`Stream`] over the extracted items. Items from one page
/// arrive in document order; pages may interleave when more than one fetch
/// is in flight. Dropping the stream stops new fetches.
pub struct Crawl<T> {
    items: ReceiverStream<T>,
    cancel_token: CancellationToken,
    phase: watch::Receiver<CrawlPhase>,
    stats: Arc<StatsTracker>,
    driver: JoinHandle<CrawlStats>,
}

impl<T: Send + 'static> Crawl<T> {
    /// A crawl that reached `Done` without fetching anything
    async fn cancelled_before_start(
        ctx: CrawlContext<T>,
        cancel_token: CancellationToken,
        phase_tx: watch::Sender<CrawlPhase>,
    ) -> Self {
        let (_, items_rx) = mpsc::channel(1);
        phase_tx.send_replace(CrawlPhase::Done);
        ctx.stats.close();

        let final_stats = ctx.stats.snapshot();
        ctx.observers.notify_crawl_complete(&final_stats).await;

        Self {
            items: ReceiverStream::new(items_rx),
            cancel_token,
            phase: phase_tx.subscribe(),
            stats: ctx.stats.clone(),
            driver: tokio::spawn(async move { final_stats }),
        }
    }
}

impl<T> Crawl<T> {
    /// Stop dispatching new fetches; in-flight pages still complete
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Token that cancels this crawl
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> CrawlPhase {
        *self.phase.borrow()
    }

    /// Watch phase transitions
    pub fn subscribe_phase(&self) -> watch::Receiver<CrawlPhase> {
        self.phase.clone()
    }

    /// Get a snapshot of current crawl statistics
    pub fn stats(&self) -> CrawlStats {
        self.stats.snapshot()
    }

    /// Subscribe to real-time statistics updates
    pub fn subscribe_stats(&self) -> watch::Receiver<CrawlStats> {
        self.stats.subscribe()
    }

    /// Abandon remaining items and wait for the crawl to reach `Done`
    pub async fn finish(self) -> CrawlStats {
        let Crawl {
            items,
            stats,
            driver,
            ..
        } = self;
        drop(items);
        join_driver(driver, &stats).await
    }

    /// Drain every item, then return them with the final statistics
    pub async fn collect_all(mut self) -> (Vec<T>, CrawlStats) {
        let mut collected = Vec::new();
        while let Some(item) = self.items.next().await {
            collected.push(item);
        }
        let stats = join_driver(self.driver, &self.stats).await;
        (collected, stats)
    }
}

impl<T> Stream for Crawl<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        Pin::new(&mut self.items).poll_next(cx)
    }
}

async fn join_driver(driver: JoinHandle<CrawlStats>, stats: &StatsTracker) -> CrawlStats {
    match driver.await {
        Ok(final_stats) => final_stats,
        Err(error) => {
            warn!(%error, "crawl driver task failed");
            stats.snapshot()
        }
    }
}

fn parse_seeds(start_urls: Vec<String>) -> Result<Vec<Url>, CrawlError> {
    if start_urls.is_empty() {
        return Err(CrawlError::NoSeeds);
    }

    start_urls
        .into_iter()
        .map(|raw| {
            let url = Url::parse(raw.trim()).map_err(|source| CrawlError::InvalidSeed {
                url: raw.clone(),
                source,
            })?;
            match url.scheme() {
                "http" | "https" => Ok(url),
                _ => Err(CrawlError::UnsupportedSeedScheme { url: raw }),
            }
        })
        .collect()
}

/// Items of a seed page, held until the driver task can emit them
struct SeedPage<T> {
    url: Url,
    items: Vec<T>,
}

/// Fetch every queued seed; fails only if none of them could be fetched
async fn fetch_seeds<T: Send + 'static>(
    ctx: &CrawlContext<T>,
    state: &mut CrawlState,
) -> Result<Vec<SeedPage<T>>, CrawlError> {
    let mut seeds = Vec::new();
    while let Some(seed) = state.next() {
        seeds.push(seed);
    }

    let mut pages = Vec::new();
    let mut visits = Vec::new();
    let mut failures = Vec::new();

    for seed in seeds {
        match ctx.fetch_and_parse(&seed).await {
            Ok((final_url, extraction)) => {
                if !state.claim_served_url(&seed, &final_url) {
                    debug!(url = %seed, %final_url, "seed redirected to another seed");
                    visits.push(VisitResult::duplicate(seed, final_url));
                    continue;
                }
                let Extraction {
                    items,
                    links,
                    dropped_links,
                } = extraction;
                visits.push(VisitResult::fetched(
                    seed.clone(),
                    final_url,
                    items.len(),
                    links,
                    dropped_links,
                ));
                pages.push(SeedPage { url: seed, items });
            }
            Err(error) => {
                ctx.report_fetch_error(&seed, &error).await;
                failures.push((seed, error));
            }
        }
    }

    if pages.is_empty() {
        if let Some((url, source)) = failures.into_iter().next() {
            return Err(CrawlError::SeedUnreachable {
                url: url.to_string(),
                source,
            });
        }
        return Err(CrawlError::NoSeeds);
    }

    for result in visits {
        record_visit(ctx, state, result).await;
    }
    for (url, error) in failures {
        record_visit(ctx, state, VisitResult::skipped(url, error)).await;
    }

    Ok(pages)
}

/// Fold one finished visit into the crawl state
async fn record_visit<T: Send + 'static>(
    ctx: &CrawlContext<T>,
    state: &mut CrawlState,
    result: VisitResult,
) {
    ctx.stats.url_visited();
    ctx.observers.notify_url_visited(&result).await;

    if let VisitOutcome::Fetched {
        discovered_urls,
        dropped_links,
        ..
    } = &result.outcome
    {
        for error in dropped_links {
            debug!(page = %result.visited_url, %error, "dropping link");
            ctx.stats.link_dropped();
            ctx.observers
                .notify_link_dropped(&result.visited_url, error)
                .await;
        }

        for link in discovered_urls {
            if state.enqueue(link.clone()) {
                debug!(url = %link, "queued link");
                ctx.observers.notify_url_queued(link).await;
            }
        }
    }
}

/// Run the crawl to completion
async fn drive<T: Send + 'static>(
    ctx: CrawlContext<T>,
    mut state: CrawlState,
    seed_pages: Vec<SeedPage<T>>,
    items_tx: mpsc::Sender<T>,
    cancel_token: CancellationToken,
    phase_tx: watch::Sender<CrawlPhase>,
) -> CrawlStats {
    let concurrency = ctx.config.crawling_concurrency;
    let mut attempts = ctx.stats.snapshot().urls_visited;

    // Seed items go out before anything else
    'seeds: for page in seed_pages {
        for item in page.items {
            if items_tx.send(item).await.is_err() {
                break 'seeds;
            }
            ctx.stats.item_extracted();
            ctx.observers.notify_item_extracted(&page.url).await;
        }
    }

    let (urls_tx, urls_rx) = mpsc::channel::<Url>(concurrency);
    let (results_tx, mut results_rx) = mpsc::channel::<WorkerMessage>(concurrency);
    let workers = launch_scrapers(ctx.clone(), urls_rx, results_tx, items_tx.clone());

    let mut in_flight = 0usize;
    let mut stopping = false;

    loop {
        if !stopping && (cancel_token.is_cancelled() || items_tx.is_closed()) {
            info!(pending = state.pending(), "stopping crawl");
            stopping = true;
        }

        while !stopping && in_flight < concurrency {
            if ctx.config.max_pages.is_some_and(|max| attempts >= max) {
                let abandoned = state.clear_pending();
                if abandoned > 0 {
                    info!(max_pages = attempts, abandoned, "page limit reached");
                }
                break;
            }
            let Some(url) = state.next() else {
                break;
            };
            // Never blocks: the channel holds as many URLs as there are workers
            if urls_tx.send(url).await.is_err() {
                stopping = true;
                break;
            }
            in_flight += 1;
            attempts += 1;
        }

        if in_flight == 0 {
            break;
        }

        tokio::select! {
            message = results_rx.recv() => match message {
                Some(WorkerMessage::Redirected { requested, final_url, reply }) => {
                    let claimed = state.claim_served_url(&requested, &final_url);
                    if !claimed {
                        debug!(url = %requested, %final_url, "redirected to a known page");
                    }
                    // The worker may be gone if the crawl is shutting down
                    let _ = reply.send(claimed);
                }
                Some(WorkerMessage::Visited(result)) => {
                    in_flight -= 1;
                    record_visit(&ctx, &mut state, result).await;
                }
                None => break,
            },
            _ = cancel_token.cancelled(), if !stopping => {}
        }
    }

    drop(urls_tx);
    drop(items_tx);
    let _ = workers.await;

    phase_tx.send_replace(CrawlPhase::Done);
    ctx.stats.close();

    let final_stats = ctx.stats.snapshot();
    info!(
        spider = ctx.spider.name(),
        urls_visited = final_stats.urls_visited,
        items = final_stats.items_extracted,
        errors = final_stats.errors_encountered,
        unique_urls = state.visited_count(),
        "crawl finished"
    );
    ctx.observers.notify_crawl_complete(&final_stats).await;

    final_stats
}

/// What a worker reports to the coordinator
enum WorkerMessage {
    /// A fetch was served from another URL; the coordinator answers whether
    /// the page is new before any of its items are sent
    Redirected {
        requested: Url,
        final_url: Url,
        reply: oneshot::Sender<bool>,
    },
    /// A visit finished
    Visited(VisitResult),
}

/// Ask the coordinator whether a redirected page may be emitted
async fn claim_redirect(
    results_tx: &mpsc::Sender<WorkerMessage>,
    requested: &Url,
    final_url: &Url,
) -> bool {
    if requested == final_url {
        return true;
    }

    let (reply, answer) = oneshot::channel();
    let message = WorkerMessage::Redirected {
        requested: requested.clone(),
        final_url: final_url.clone(),
        reply,
    };
    if results_tx.send(message).await.is_err() {
        return false;
    }
    answer.await.unwrap_or(false)
}

/// Fetch one URL and forward its items, unless it redirected to a known page
async fn scrape<T: Send + 'static>(
    ctx: &CrawlContext<T>,
    results_tx: &mpsc::Sender<WorkerMessage>,
    items_tx: &mpsc::Sender<T>,
    url: Url,
) -> VisitResult {
    let (final_url, extraction) = match ctx.fetch_and_parse(&url).await {
        Ok(fetched) => fetched,
        Err(error) => {
            ctx.report_fetch_error(&url, &error).await;
            return VisitResult::skipped(url, error);
        }
    };

    if !claim_redirect(results_tx, &url, &final_url).await {
        return VisitResult::duplicate(url, final_url);
    }

    let Extraction {
        items,
        links,
        dropped_links,
    } = extraction;
    let count = items.len();
    for item in items {
        if items_tx.send(item).await.is_err() {
            debug!(%url, "item consumer gone, discarding items");
            break;
        }
        ctx.stats.item_extracted();
        ctx.observers.notify_item_extracted(&url).await;
    }
    VisitResult::fetched(url, final_url, count, links, dropped_links)
}

/// Launch worker tasks and return a handle to wait for completion
fn launch_scrapers<T: Send + 'static>(
    ctx: CrawlContext<T>,
    urls_to_visit: mpsc::Receiver<Url>,
    results_tx: mpsc::Sender<WorkerMessage>,
    items_tx: mpsc::Sender<T>,
) -> JoinHandle<()> {
    let concurrency = ctx.config.crawling_concurrency;

    tokio::spawn(async move {
        ReceiverStream::new(urls_to_visit)
            .for_each_concurrent(concurrency, |url| {
                let ctx = ctx.clone();
                let results_tx = results_tx.clone();
                let items_tx = items_tx.clone();

                async move {
                    let result = scrape(&ctx, &results_tx, &items_tx, url).await;
                    if results_tx.send(WorkerMessage::Visited(result)).await.is_err() {
                        warn!("coordinator gone, dropping visit result");
                    }
                }
            })
            .await;
    })
}
