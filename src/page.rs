//! Fetched pages and link resolution

use scraper::Html;
use url::Url;

use crate::{ElementRef, LinkError};

/// The fetched content of one URL
///
/// `url` is the address the content was actually served from, which differs
/// from the requested one after a redirect. Relative links are resolved
/// against it.
#[derive(Debug, Clone)]
pub struct Page {
    url: Url,
    body: String,
}

impl Page {
    /// Create a page from its source URL and raw markup
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }

    /// URL the content was served from
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Raw markup
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parse the markup into a document tree
    ///
    /// Parsing is lenient; broken markup still yields a tree.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// Base URL for relative links
    ///
    /// Honors the first `<base href>` in the document when it resolves to a
    /// valid URL, and falls back to the page URL otherwise.
    pub fn base_url(&self, document: &Html) -> Url {
        document
            .root_element()
            .select_one("base[href]")
            .and_then(|base| base.attr("href").map(str::to_owned))
            .and_then(|href| self.url.join(href.trim()).ok())
            .unwrap_or_else(|| self.url.clone())
    }

    /// Resolve the `href` of every anchor against the document's base URL
    ///
    /// Order is preserved. Anchors that cannot be followed are returned in
    /// the second vector instead of aborting.
    pub fn follow_all<E>(&self, document: &Html, anchors: &[E]) -> (Vec<Url>, Vec<LinkError>)
    where
        E: ElementRef,
    {
        let base = self.base_url(document);
        let mut links = Vec::with_capacity(anchors.len());
        let mut dropped = Vec::new();

        for anchor in anchors {
            let resolved = match anchor.attr("href") {
                Some(href) => resolve_link(&base, href),
                None => Err(LinkError::MissingHref),
            };
            match resolved {
                Ok(link) => links.push(link),
                Err(error) => dropped.push(error),
            }
        }

        (links, dropped)
    }
}

/// Resolve an href against `base` into an absolute http(s) link
pub fn resolve_link(base: &Url, href: &str) -> Result<Url, LinkError> {
    let href = href.trim_matches(|c: char| c.is_ascii_whitespace());
    let link = base.join(href).map_err(|source| LinkError::Unparseable {
        href: href.to_string(),
        source,
    })?;

    match link.scheme() {
        "http" | "https" => Ok(link),
        _ => Err(LinkError::UnsupportedScheme {
            url: link.to_string(),
        }),
    }
}
