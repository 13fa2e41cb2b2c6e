#![allow(dead_code)]

use quotely::{FetchError, Fetcher, Page};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

pub const HOST: &str = "http://quotes.test";

pub fn page_url(n: usize) -> String {
    format!("{}/page/{}/", HOST, n)
}

pub fn quote_block(text: &str, author: &str, tags: &[&str]) -> String {
    let tags: String = tags
        .iter()
        .map(|tag| format!(r#"<a class="tag" href="/tag/{tag}/page/1/">{tag}</a>"#))
        .collect();
    format!(
        r#"<div class="quote" itemscope itemtype="http://schema.org/CreativeWork">
            <span class="text" itemprop="text">{text}</span>
            <span>by <small class="author" itemprop="author">{author}</small>
            <a href="/author/{author}">(about)</a></span>
            <div class="tags">Tags: <meta class="keywords" itemprop="keywords" content="">{tags}</div>
        </div>"#
    )
}

/// A listing page shaped like quotes.toscrape.com
pub fn listing(blocks: &[String], previous: Option<&str>, next: Option<&str>) -> String {
    let mut pager = String::new();
    if let Some(href) = previous {
        pager.push_str(&format!(
            r#"<li class="previous"><a href="{href}"><span aria-hidden="true">&larr;</span> Previous</a></li>"#
        ));
    }
    if let Some(href) = next {
        pager.push_str(&format!(
            r#"<li class="next"><a href="{href}">Next <span aria-hidden="true">&rarr;</span></a></li>"#
        ));
    }
    format!(
        r#"<!DOCTYPE html>
        <html lang="en">
        <head><meta charset="UTF-8"><title>Quotes to Scrape</title></head>
        <body>
            <div class="container">
                <div class="row"><div class="col-md-8">{blocks}</div></div>
                <nav><ul class="pager">{pager}</ul></nav>
            </div>
        </body>
        </html>"#,
        blocks = blocks.concat()
    )
}

/// Page `n` with `count` quotes titled "Quote n.i"
pub fn quotes_page(n: usize, count: usize, previous: Option<&str>, next: Option<&str>) -> String {
    let blocks: Vec<String> = (0..count)
        .map(|i| {
            quote_block(
                &format!("Quote {}.{}", n, i),
                &format!("Author {}", i),
                &["life", "love"],
            )
        })
        .collect();
    listing(&blocks, previous, next)
}

/// In-memory fetcher; unknown URLs answer 404
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    fetched: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    pub fn with_redirect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.redirects.insert(from.into(), to.into());
        self
    }

    pub fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }

    /// A chain of `pages` listing pages, each with ten quotes and a next link
    pub fn chain(pages: usize) -> Self {
        (1..=pages).fold(Self::new(), |fetcher, n| {
            let next = (n < pages).then(|| format!("/page/{}/", n + 1));
            fetcher.with_page(page_url(n), quotes_page(n, 10, None, next.as_deref()))
        })
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }

    pub fn times_fetched(&self, url: &str) -> usize {
        self.fetched
            .lock()
            .unwrap()
            .iter()
            .filter(|fetched| fetched.as_str() == url)
            .count()
    }
}

#[async_trait::async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        self.fetched.lock().unwrap().push(url.to_string());

        if let Some(delay) = self.delays.get(url.as_str()) {
            tokio::time::sleep(*delay).await;
        }

        let served_from = self
            .redirects
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| url.to_string());

        match self.pages.get(&served_from) {
            Some(body) => Ok(Page::new(Url::parse(&served_from).unwrap(), body.clone())),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
