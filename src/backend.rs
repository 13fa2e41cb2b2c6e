//! HTML backend abstraction for querying parsed documents with CSS selectors

/// Trait representing an HTML element that can be queried with CSS selectors
///
/// This trait abstracts over the HTML parsing backend so that [`Item`](crate::ItemTrait)
/// implementations only depend on a small query surface.
pub trait ElementRef {
    /// Select the first descendant element matching the CSS selector
    ///
    /// Returns `None` if no element matches or if the selector is invalid.
    fn select_one(&self, selector: &str) -> Option<Self>
    where
        Self: Sized;

    /// Select all descendant elements matching the CSS selector, in document order
    ///
    /// Returns an empty vector if no elements match or if the selector is invalid.
    fn select_all(&self, selector: &str) -> Vec<Self>
    where
        Self: Sized;

    /// Get the text nodes that are direct children of this element
    ///
    /// Text inside nested elements is not included. Whitespace is preserved.
    fn own_text(&self) -> Vec<String>;

    /// Get the value of an HTML attribute
    ///
    /// Returns `None` if the attribute doesn't exist.
    fn attr(&self, name: &str) -> Option<&str>;

    /// Direct text nodes of every element matching `selector`, in document order
    fn select_text(&self, selector: &str) -> Vec<String>
    where
        Self: Sized,
    {
        self.select_all(selector)
            .iter()
            .flat_map(|element| element.own_text())
            .collect()
    }

    /// First direct text node among the elements matching `selector`
    fn select_first_text(&self, selector: &str) -> Option<String>
    where
        Self: Sized,
    {
        self.select_all(selector)
            .iter()
            .find_map(|element| element.own_text().into_iter().next())
    }
}

/// Implementation of ElementRef for scraper::ElementRef
impl<'a> ElementRef for scraper::ElementRef<'a> {
    fn select_one(&self, selector: &str) -> Option<Self> {
        let selector = scraper::Selector::parse(selector).ok()?;
        self.select(&selector).next()
    }

    fn select_all(&self, selector: &str) -> Vec<Self> {
        let selector = match scraper::Selector::parse(selector) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        self.select(&selector).collect()
    }

    fn own_text(&self) -> Vec<String> {
        self.children()
            .filter_map(|child| child.value().as_text().map(|text| String::from(&**text)))
            .collect()
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }
}
