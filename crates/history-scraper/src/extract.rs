//! Per-item field extraction.
//!
//! All knowledge of the history page's structure lives here. When the page
//! layout changes, the selectors below are the only thing to update; fields
//! whose element disappears degrade to empty values.

use crate::page::ItemNode;
use shared::HistoryEntry;

/// Selectors for the history page layout
pub mod selectors {
    /// A rendered history item
    pub const ITEM: &str = "ytd-video-renderer, ytd-rich-item-renderer";
    /// Title link (text is the title, `href` is the video URL)
    pub const TITLE: &str = "#video-title";
    pub const CHANNEL: &str = "ytd-channel-name, #channel-name";
    pub const THUMBNAIL: &str = "img#img";
    /// First span of the metadata line (relative watch time)
    pub const TIMESTAMP: &str = "div#metadata-line span";
    pub const DESCRIPTION: &str = "#description-text";
    /// Resume-playback overlay, its inline width is the watched share
    pub const PROGRESS: &str = ".ytd-thumbnail-overlay-resume-playback-renderer";
}

/// Build a [`HistoryEntry`] from one rendered item
pub fn extract_entry(item: &dyn ItemNode) -> HistoryEntry {
    HistoryEntry {
        title: item.text(selectors::TITLE).unwrap_or_default(),
        channel: item.text(selectors::CHANNEL).unwrap_or_default(),
        url: item.attr(selectors::TITLE, "href").unwrap_or_default(),
        thumbnail: item.attr(selectors::THUMBNAIL, "src").unwrap_or_default(),
        timestamp: item.text(selectors::TIMESTAMP).unwrap_or_default(),
        description: item.text(selectors::DESCRIPTION).unwrap_or_default(),
        watched_percentage: item
            .style(selectors::PROGRESS, "width")
            .filter(|width| !width.is_empty()),
    }
}
