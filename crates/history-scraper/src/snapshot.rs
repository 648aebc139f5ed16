//! History page backed by saved HTML captures.
//!
//! A capture is the rendered history page saved at one scroll position. The
//! captures of a session are replayed in order: scrolling advances to the next
//! capture, and once the last one is showing the page stops growing.

use crate::extract::selectors;
use crate::page::{HistoryPage, ItemNode};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use tracing::debug;
use url::Url;

/// Location the captured pages were served from
pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com/feed/history";

/// A [`HistoryPage`] replaying a sequence of HTML captures
pub struct SnapshotPage {
    captures: Vec<Html>,
    current: usize,
    item_selector: Selector,
    base_url: Url,
}

impl SnapshotPage {
    /// Build a page from capture documents, in scroll order
    pub fn new<S: AsRef<str>>(captures: &[S], base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid page base URL: {}", base_url))?;
        let item_selector = Selector::parse(selectors::ITEM)
            .map_err(|e| anyhow!("Invalid item selector {}: {:?}", selectors::ITEM, e))?;

        Ok(Self {
            captures: captures
                .iter()
                .map(|html| Html::parse_document(html.as_ref()))
                .collect(),
            current: 0,
            item_selector,
            base_url,
        })
    }

    /// Read captures from disk, in the given order
    pub fn from_files<P: AsRef<Path>>(paths: &[P], base_url: &str) -> Result<Self> {
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read capture: {}", path.display()))?;
            documents.push(html);
        }

        debug!(captures = documents.len(), "Loaded page captures");
        Self::new(&documents, base_url)
    }

    /// Index of the capture currently showing
    pub fn position(&self) -> usize {
        self.current
    }

    fn document(&self) -> Option<&Html> {
        self.captures.get(self.current)
    }
}

#[async_trait(?Send)]
impl HistoryPage for SnapshotPage {
    fn item_count(&self) -> usize {
        self.document()
            .map(|doc| doc.select(&self.item_selector).count())
            .unwrap_or(0)
    }

    fn items(&self) -> Vec<Box<dyn ItemNode + '_>> {
        let Some(doc) = self.document() else {
            return Vec::new();
        };

        doc.select(&self.item_selector)
            .map(|element| {
                Box::new(HtmlItem {
                    element,
                    base_url: &self.base_url,
                }) as Box<dyn ItemNode + '_>
            })
            .collect()
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        if self.current + 1 < self.captures.len() {
            self.current += 1;
            debug!(capture = self.current, "Advanced to next capture");
        } else {
            debug!(capture = self.current, "Already at last capture");
        }
        Ok(())
    }
}

/// One history item element inside a parsed capture
struct HtmlItem<'a> {
    element: ElementRef<'a>,
    base_url: &'a Url,
}

impl<'a> HtmlItem<'a> {
    fn find(&self, selector: &str) -> Option<ElementRef<'a>> {
        // An unparsable selector behaves like an absent element
        let selector = Selector::parse(selector).ok()?;
        self.element.select(&selector).next()
    }
}

impl ItemNode for HtmlItem<'_> {
    fn text(&self, selector: &str) -> Option<String> {
        let element = self.find(selector)?;
        Some(element.text().collect::<String>().trim().to_string())
    }

    fn attr(&self, selector: &str, name: &str) -> Option<String> {
        let raw = self.find(selector)?.value().attr(name)?;

        match name {
            "href" | "src" => Some(
                self.base_url
                    .join(raw)
                    .map(String::from)
                    .unwrap_or_else(|_| raw.to_string()),
            ),
            _ => Some(raw.to_string()),
        }
    }

    fn style(&self, selector: &str, property: &str) -> Option<String> {
        let style = self.find(selector)?.value().attr("style")?;
        inline_style_value(style, property)
    }
}

/// Look up one property in an inline `style` attribute
fn inline_style_value(style: &str, property: &str) -> Option<String> {
    style.split(';').find_map(|declaration| {
        let (name, value) = declaration.split_once(':')?;
        if name.trim().eq_ignore_ascii_case(property) {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}
