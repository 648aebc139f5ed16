//! Ports over the rendered history page.
//!
//! The scraper never touches a concrete DOM: it sees a [`HistoryPage`] that can
//! count and enumerate rendered items and scroll to load more, and each item is
//! an [`ItemNode`] answering best-effort lookups by CSS selector.

use anyhow::Result;
use async_trait::async_trait;

/// One rendered history item
///
/// Every lookup is optional: a missing sub-element, attribute or style
/// property is `None`, never an error.
pub trait ItemNode {
    /// Text content of the first element matching `selector`, trimmed
    fn text(&self, selector: &str) -> Option<String>;

    /// Attribute of the first element matching `selector`
    ///
    /// URL-valued attributes (`href`, `src`) are returned resolved against the
    /// page location, as a browser DOM would.
    fn attr(&self, selector: &str, name: &str) -> Option<String>;

    /// Inline style property of the first element matching `selector`
    fn style(&self, selector: &str, property: &str) -> Option<String>;
}

/// A history page that lazily renders more items as it is scrolled
#[async_trait(?Send)]
pub trait HistoryPage {
    /// Number of history items currently rendered
    fn item_count(&self) -> usize;

    /// The currently rendered history items, in page order
    fn items(&self) -> Vec<Box<dyn ItemNode + '_>>;

    /// Scroll the view to the bottom, asking the page to render more items
    async fn scroll_to_bottom(&mut self) -> Result<()>;
}
