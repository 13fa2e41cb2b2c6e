//! Quote records and the spider that crawls paginated quote listings

use serde::Serialize;

use crate::{ElementRef, Extraction, ItemTrait, Page, Spider};

/// Start page of the public demo site
pub const DEFAULT_START_URL: &str = "http://quotes.toscrape.com/page/1/";

const QUOTE_BLOCK: &str = "div.quote";
const QUOTE_TEXT: &str = "span.text";
const QUOTE_AUTHOR: &str = "small.author";
const QUOTE_TAGS: &str = "div.tags a.tag";
const PAGER_LINKS: &str = "ul.pager a";

/// One quotation with its author and tags
///
/// Serializes as a mapping with exactly the keys `text`, `author` and
/// `tags`; missing values become `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub text: Option<String>,
    pub author: Option<String>,
    pub tags: Vec<String>,
}

impl ItemTrait for Quote {
    const SELECTOR: &'static str = QUOTE_BLOCK;

    fn extract<E>(element: &E) -> Self
    where
        E: ElementRef,
    {
        Self {
            text: element.select_first_text(QUOTE_TEXT),
            author: element.select_first_text(QUOTE_AUTHOR),
            tags: element.select_text(QUOTE_TAGS),
        }
    }
}

/// Extract every quote and every pager link from a page
///
/// Pure and infallible: a page without quote blocks or pager anchors yields
/// empty sequences.
pub fn extract(page: &Page) -> Extraction<Quote> {
    let document = page.document();
    let root = document.root_element();

    let items = Quote::extract_all(&root);
    let anchors = root.select_all(PAGER_LINKS);
    let (links, dropped_links) = page.follow_all(&document, &anchors);

    Extraction {
        items,
        links,
        dropped_links,
    }
}

/// Spider for quotes.toscrape.com-shaped listings
///
/// Every followed page is parsed the same way as the seed.
#[derive(Debug, Clone)]
pub struct QuoteSpider {
    start_urls: Vec<String>,
}

impl QuoteSpider {
    pub fn new<I, S>(start_urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            start_urls: start_urls.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for QuoteSpider {
    fn default() -> Self {
        Self::new([DEFAULT_START_URL])
    }
}

impl Spider for QuoteSpider {
    type Item = Quote;

    fn name(&self) -> &str {
        "quotes"
    }

    fn start_urls(&self) -> Vec<String> {
        self.start_urls.clone()
    }

    fn parse(&self, page: &Page) -> Extraction<Quote> {
        extract(page)
    }
}
