//! The article record shared by every article source.
//!
//! `Article` is the single normalized shape the rest of the application
//! sees.  Every source converts whatever its upstream returns into this
//! struct, filling in defaults for anything missing, so the feed state
//! machine and the UI never deal with optional upstream shapes.
//!
//! ## For contributors
//!
//! If you are adding a new source you do **not** need to modify this file
//! unless the card needs a field that does not exist yet.  Build `Article`
//! values with [`Article::new`] and the `with_*` helpers.

use chrono::{DateTime, Utc};

/// Extract used when upstream has no summary for a page.
pub const MISSING_EXTRACT: &str = "No summary available.";

/// A single geographic position attached to an article.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// One card in the feed, normalised from any article source.
///
/// ## Identity
///
/// `id` is the upstream page id.  It is **not** unique within a feed:
/// random sampling and overlapping pages can return the same page twice.
/// Anything that needs a per-row key must use [`Article::render_key`].
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Upstream page id.
    pub id: u64,

    /// Display name of the page.
    pub title: String,

    /// Plain-text summary.  Never empty; see [`MISSING_EXTRACT`].
    pub extract: String,

    /// One-line subtitle, when upstream has one.
    pub description: Option<String>,

    /// Thumbnail (or original image) URL.
    pub image_url: Option<String>,

    /// Canonical link to the full page.
    pub url: String,

    /// Category labels without the `Category:` prefix, in upstream order.
    pub categories: Vec<String>,

    /// Primary coordinates of the page subject.
    pub coordinates: Option<Coordinates>,

    /// Last time upstream saw the page modified.
    pub touched: Option<DateTime<Utc>>,
}

impl Article {
    /// Create an article with every optional field at its default.
    ///
    /// A blank `extract` is replaced with [`MISSING_EXTRACT`].
    pub fn new(
        id: u64,
        title: impl Into<String>,
        extract: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let extract = extract.into();
        let extract = if extract.trim().is_empty() {
            MISSING_EXTRACT.to_string()
        } else {
            extract
        };

        Self {
            id,
            title: title.into(),
            extract,
            description: None,
            image_url: None,
            url: url.into(),
            categories: Vec::new(),
            coordinates: None,
            touched: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Key for the article at `index` in a rendered list.
    ///
    /// Combines the page id with the position so repeated pages never
    /// collide.
    pub fn render_key(&self, index: usize) -> String {
        format!("{}-{}", self.id, index)
    }

    /// Case-insensitive substring match against title and extract.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.extract.to_lowercase().contains(&needle)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
