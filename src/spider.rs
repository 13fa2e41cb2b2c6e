use url::Url;

use crate::{LinkError, Page};

/// Everything one page yields: items, links to follow, and links that were dropped
#[derive(Debug)]
pub struct Extraction<T> {
    /// Items in document order
    pub items: Vec<T>,
    /// Absolute links to follow, in document order
    pub links: Vec<Url>,
    /// Anchors that could not be turned into links
    pub dropped_links: Vec<LinkError>,
}

impl<T> Extraction<T> {
    /// Create an extraction with no dropped links
    pub fn new(items: Vec<T>, links: Vec<Url>) -> Self {
        Self {
            items,
            links,
            dropped_links: Vec::new(),
        }
    }
}

impl<T> Default for Extraction<T> {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

/// Trait for implementing web spiders
///
/// A spider names its start URLs and turns one fetched [`Page`] into items
/// and follow-up links. Fetching, deduplication and scheduling belong to the
/// [`Crawler`](crate::Crawler); `parse` is a pure function of the page and
/// must not fail: markup that doesn't match degrades to fewer items or
/// links.
///
/// # Example
///
/// ```ignore
/// struct TitleSpider;
///
/// impl Spider for TitleSpider {
///     type Item = String;
///
///     fn name(&self) -> &str {
///         "titles"
///     }
///
///     fn start_urls(&self) -> Vec<String> {
///         vec!["https://example.com".to_string()]
///     }
///
///     fn parse(&self, page: &Page) -> Extraction<String> {
///         let document = page.document();
///         let titles = document.root_element().select_text("title");
///         Extraction::new(titles, vec![])
///     }
/// }
/// ```
pub trait Spider: Send + Sync {
    /// The type of items extracted from pages
    type Item: Send + 'static;

    /// Spider name, used in log events
    fn name(&self) -> &str;

    /// Return the list of URLs to start crawling from
    fn start_urls(&self) -> Vec<String>;

    /// Extract items and links to follow from a fetched page
    fn parse(&self, page: &Page) -> Extraction<Self::Item>;
}
