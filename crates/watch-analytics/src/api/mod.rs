//! Catalog API client implementation.
//!
//! This module provides the client that looks up duration, tags and category
//! for a watched video from the public video catalog API.

pub mod client;
pub mod types;

pub use client::{extract_video_id, CatalogClient};
pub use types::*;
