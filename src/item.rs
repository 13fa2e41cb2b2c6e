use crate::ElementRef;

/// Trait for records that can be extracted from HTML elements
///
/// An item names the CSS selector of its repeating container and knows how
/// to read one instance out of a matched container. Extraction never fails:
/// sub-elements that are missing degrade to `None` or empty collections, so
/// partial or malformed markup still yields one item per container.
///
/// # Implementing Item
///
/// ```ignore
/// use quotely::{ElementRef, ItemTrait};
///
/// struct Headline {
///     title: Option<String>,
/// }
///
/// impl ItemTrait for Headline {
///     const SELECTOR: &'static str = "article";
///
///     fn extract<E: ElementRef>(element: &E) -> Self {
///         Headline {
///             title: element.select_first_text("h2"),
///         }
///     }
/// }
/// ```
///
/// # Usage
///
/// ```ignore
/// use scraper::Html;
/// use quotely::{ItemTrait, Quote};
///
/// let html = Html::parse_document(r#"
///     <div class="quote">
///         <span class="text">Hello, world!</span>
///         <small class="author">John Doe</small>
///     </div>
/// "#);
///
/// let quotes = Quote::extract_all(&html.root_element());
/// assert_eq!(quotes.len(), 1);
/// ```
pub trait Item: Sized {
    /// CSS selector matching one container per item
    const SELECTOR: &'static str;

    /// Extract an instance of this type from a matched container element
    fn extract<E>(element: &E) -> Self
    where
        E: ElementRef;

    /// Extract one instance per container below `root`, in document order
    fn extract_all<E>(root: &E) -> Vec<Self>
    where
        E: ElementRef,
    {
        root.select_all(Self::SELECTOR)
            .iter()
            .map(|element| Self::extract(element))
            .collect()
    }
}
