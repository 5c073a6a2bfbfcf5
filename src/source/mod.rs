//! Article source abstraction layer.
//!
//! This module defines the [`ArticleSource`] trait and the common
//! [`Article`] type.  Concrete sources live in sub-modules: [`wikipedia`]
//! talks to the live APIs, [`sample`] serves the fixed fallback set.
//!
//! ## For contributors: adding a new source
//!
//! 1. Create a new file in this directory (e.g. `mirror.rs`).
//! 2. Define a struct and implement [`ArticleSource`] for it.  Both methods
//!    must return a list, never an error: recover from upstream failures
//!    inside the source.
//! 3. Add `mod mirror;` below and re-export your struct.
//! 4. Construct it in `main.rs` and pass it to the fetch dispatcher.
//!
//! The feed state machine, scroll triggers and UI are all source-agnostic.

mod article;
pub mod categories;
pub mod sample;
pub mod wikipedia;

// Re-export the public API of this module so callers can write
// `use crate::source::{Article, ArticleSource, WikipediaSource};`
pub use article::{Article, Coordinates, MISSING_EXTRACT};
pub use categories::CategoryTable;
pub use sample::SampleSource;
pub use wikipedia::WikipediaSource;

use std::future::Future;

/// Trait that every article source must implement.
///
/// Requests run as spawned tokio tasks, so sources must be `Send + Sync`
/// and their futures `Send`.  Implementations may use `async fn`.
///
/// ## Contract
///
/// * `page` is 1-based and `page_size` is positive; results are offset by
///   `(page - 1) * page_size` where the upstream supports paging.
/// * Zero matches is an empty list.  Upstream failures are recovered
///   inside the source (typically with [`sample`] data) and never reach
///   the caller as errors.
pub trait ArticleSource: Send + Sync + 'static {
    /// Human-readable label for logs.
    fn name(&self) -> &str;

    /// Articles for a named category; `"all"` samples random pages.
    fn fetch_by_category(
        &self,
        category: &str,
        page: u32,
        page_size: usize,
    ) -> impl Future<Output = Vec<Article>> + Send;

    /// Articles matching free text.  Blank text yields an empty list.
    fn search_by_text(
        &self,
        query: &str,
        page: u32,
        page_size: usize,
    ) -> impl Future<Output = Vec<Article>> + Send;
}

/// Clamp a page number and size to the contract, asserting in debug
/// builds.
pub(crate) fn checked_paging(page: u32, page_size: usize) -> (u32, usize) {
    debug_assert!(page >= 1, "page numbers are 1-based, got {page}");
    debug_assert!(page_size > 0, "page size must be positive");
    (page.max(1), page_size.max(1))
}
