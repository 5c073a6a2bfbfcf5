//! The feed state machine.
//!
//! [`Feed`] owns everything about the article list: the active query, the
//! page cursor, the accumulated items and the in-flight flags.  It never
//! performs I/O.  Each operation returns the [`FetchRequest`] (if any) that
//! the caller must dispatch, and the result comes back later through
//! [`Feed::apply`] as a [`FetchOutcome`].  The UI loop is the only caller,
//! which makes it the single writer of feed state.
//!
//! ## Stale responses
//!
//! Every request carries a [`Ticket`].  The generation in the ticket is
//! bumped by every [`Feed::set_filter`], so an outcome that arrives after
//! the filter changed no longer matches and is dropped instead of leaking
//! into the new list.  Within a generation only the ticket currently
//! recorded as in flight is accepted.
//!
//! ## Prefetch promotion
//!
//! A preload fetches `cursor + 1` without moving the cursor.  The page is
//! held back and handed over by the next [`Feed::load_more`] without a
//! second request.  If `load_more` runs while that preload is still in
//! flight, the foreground load adopts it and the preload outcome is applied
//! as the foreground result.

use std::fmt;

use thiserror::Error;

use crate::source::categories::ALL;
use crate::source::Article;

/// What the feed is showing: one category or one text search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedQuery {
    /// A named category; [`ALL`] samples random pages.
    Category(String),
    /// Free-text search.
    Search(String),
}

impl FeedQuery {
    pub fn category(name: impl Into<String>) -> Self {
        Self::Category(name.into())
    }

    pub fn search(text: impl Into<String>) -> Self {
        Self::Search(text.into())
    }

    pub fn home() -> Self {
        Self::Category(ALL.to_string())
    }

    pub fn is_search(&self) -> bool {
        matches!(self, Self::Search(_))
    }
}

impl fmt::Display for FeedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category(c) => write!(f, "category {c}"),
            Self::Search(q) => write!(f, "search \"{q}\""),
        }
    }
}

/// Which flag a request runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Foreground,
    Preload,
}

/// Tag attached to every request and echoed back in its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub page: u32,
    pub kind: LoadKind,
    seq: u64,
}

/// A page the caller must fetch from the article source.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub ticket: Ticket,
    pub query: FeedQuery,
    pub page_size: usize,
}

impl FetchRequest {
    pub fn page(&self) -> u32 {
        self.ticket.page
    }
}

/// The fetch task itself died (panicked or was aborted).
///
/// Sources recover from upstream errors on their own, so this is the only
/// failure the state machine sees.
#[derive(Debug, Clone, Error)]
#[error("fetch task failed: {0}")]
pub struct FetchFailed(pub String);

/// Result of a [`FetchRequest`], tagged with the request's ticket.
#[derive(Debug)]
pub struct FetchOutcome {
    pub ticket: Ticket,
    pub result: Result<Vec<Article>, FetchFailed>,
}

/// What [`Feed::apply`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Outcome belonged to a superseded request and was dropped.
    Stale,
    /// Page 1 replaced the list with this many items.
    Replaced(usize),
    /// A later page appended this many items.
    Appended(usize),
    /// A preload finished and is held for the next `load_more`.
    Prefetched(usize),
    /// A foreground fetch failed; items are unchanged and the cursor is
    /// back on the last loaded page.
    Failed,
    /// A background preload failed.  Nothing visible changed.
    PrefetchFailed,
}

/// Read-only view of the feed for rendering and trigger guards.
#[derive(Debug, Clone)]
pub struct FeedState {
    pub items: Vec<Article>,
    /// 1-based number of the last page in `items`.
    pub cursor: u32,
    pub loading: bool,
    pub preloading: bool,
    pub has_more: bool,
    pub is_searching: bool,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: 1,
            loading: false,
            preloading: false,
            has_more: true,
            is_searching: false,
        }
    }
}

/// Internal decision for a page load.
enum Plan {
    Suppressed,
    Satisfied,
    Issue(FetchRequest),
}

pub struct Feed {
    state: FeedState,
    query: FeedQuery,
    /// Category a blank search falls back to.
    selected_category: String,
    page_size: usize,
    generation: u64,
    next_seq: u64,
    foreground: Option<Ticket>,
    preload: Option<Ticket>,
    /// A foreground load is waiting on the in-flight preload.
    adopted: bool,
    prefetched: Option<(u32, Vec<Article>)>,
}

impl Feed {
    /// An empty feed on `initial_category`.  Nothing is loaded until the
    /// first [`set_filter`](Self::set_filter).
    pub fn new(page_size: usize, initial_category: impl Into<String>) -> Self {
        debug_assert!(page_size > 0, "page size must be positive");
        let category = initial_category.into();
        Self {
            state: FeedState::default(),
            query: FeedQuery::Category(category.clone()),
            selected_category: category,
            page_size: page_size.max(1),
            generation: 0,
            next_seq: 0,
            foreground: None,
            preload: None,
            adopted: false,
            prefetched: None,
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn query(&self) -> &FeedQuery {
        &self.query
    }

    pub fn selected_category(&self) -> &str {
        &self.selected_category
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Whether a finished preload is waiting for `load_more`.
    pub fn has_prefetched(&self) -> bool {
        self.prefetched.is_some()
    }

    // -- operations ----------------------------------------------------------

    /// Switch to `query` and request its first page.
    ///
    /// A search with blank text means "no search": the feed falls back to
    /// the selected category.
    pub fn set_filter(&mut self, query: FeedQuery) -> Option<FetchRequest> {
        let query = match query {
            FeedQuery::Search(text) if text.trim().is_empty() => {
                FeedQuery::Category(self.selected_category.clone())
            }
            FeedQuery::Search(text) => FeedQuery::Search(text.trim().to_string()),
            FeedQuery::Category(category) => {
                self.selected_category = category.clone();
                FeedQuery::Category(category)
            }
        };

        self.generation += 1;
        self.state = FeedState {
            is_searching: query.is_search(),
            ..FeedState::default()
        };
        self.foreground = None;
        self.preload = None;
        self.adopted = false;
        self.prefetched = None;

        tracing::info!(generation = self.generation, query = %query, "Feed filter changed");
        self.query = query;
        self.load_page(1, false)
    }

    /// Back to the unfiltered feed.
    pub fn reset_to_home(&mut self) -> Option<FetchRequest> {
        let request = self.set_filter(FeedQuery::home());
        self.state.is_searching = false;
        request
    }

    /// Request `page` for the active query.
    ///
    /// Foreground loads are suppressed while one is in flight; preloads
    /// while a preload is in flight.  Returns `None` when nothing needs to
    /// be fetched, including when the page was already prefetched.
    pub fn load_page(&mut self, page: u32, is_preload: bool) -> Option<FetchRequest> {
        match self.plan(page, is_preload) {
            Plan::Issue(request) => Some(request),
            Plan::Suppressed | Plan::Satisfied => None,
        }
    }

    /// Advance the cursor by one page and load it.
    ///
    /// No-op while loading or once the feed has ended.
    pub fn load_more(&mut self) -> Option<FetchRequest> {
        if self.state.loading || !self.state.has_more {
            return None;
        }
        let next = self.state.cursor + 1;
        match self.plan(next, false) {
            Plan::Suppressed => None,
            Plan::Satisfied => {
                self.state.cursor = next;
                None
            }
            Plan::Issue(request) => {
                self.state.cursor = next;
                Some(request)
            }
        }
    }

    /// Fetch the page after the cursor in the background without moving
    /// the cursor.
    ///
    /// No-op while a preload is in flight, once the feed has ended, or
    /// while the list is empty.
    pub fn preload_more(&mut self) -> Option<FetchRequest> {
        if self.state.preloading || !self.state.has_more || self.state.items.is_empty() {
            return None;
        }
        self.load_page(self.state.cursor + 1, true)
    }

    /// Fold a finished fetch into the feed.
    pub fn apply(&mut self, outcome: FetchOutcome) -> Applied {
        let ticket = outcome.ticket;
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket_generation = ticket.generation,
                generation = self.generation,
                page = ticket.page,
                "Discarding response for superseded filter"
            );
            return Applied::Stale;
        }

        match ticket.kind {
            LoadKind::Foreground => {
                if self.foreground != Some(ticket) {
                    tracing::debug!(page = ticket.page, "Discarding unexpected foreground response");
                    return Applied::Stale;
                }
                self.foreground = None;
                self.state.loading = false;
                self.settle(ticket.page, outcome.result)
            }
            LoadKind::Preload => {
                if self.preload != Some(ticket) {
                    tracing::debug!(page = ticket.page, "Discarding unexpected preload response");
                    return Applied::Stale;
                }
                self.preload = None;
                self.state.preloading = false;

                if self.adopted {
                    self.adopted = false;
                    self.state.loading = false;
                    return self.settle(ticket.page, outcome.result);
                }

                match outcome.result {
                    Ok(articles) => {
                        let count = articles.len();
                        tracing::debug!(page = ticket.page, count, "Prefetched page held");
                        self.prefetched = Some((ticket.page, articles));
                        Applied::Prefetched(count)
                    }
                    Err(e) => {
                        tracing::warn!(page = ticket.page, error = %e, "Preload failed");
                        Applied::PrefetchFailed
                    }
                }
            }
        }
    }

    // -- internals -----------------------------------------------------------

    fn plan(&mut self, page: u32, is_preload: bool) -> Plan {
        debug_assert!(page >= 1, "page numbers are 1-based");
        let page = page.max(1);

        if is_preload {
            if self.state.preloading || self.prefetched_page() == Some(page) {
                return Plan::Suppressed;
            }
            self.state.preloading = true;
            let ticket = self.issue_ticket(page, LoadKind::Preload);
            self.preload = Some(ticket);
            return Plan::Issue(self.request(ticket));
        }

        if self.state.loading {
            return Plan::Suppressed;
        }

        if self.prefetched_page() == Some(page) {
            if let Some((_, articles)) = self.prefetched.take() {
                tracing::debug!(page, "Promoting prefetched page");
                self.accept(page, articles);
                return Plan::Satisfied;
            }
        }

        if self.preload.is_some_and(|t| t.page == page) {
            tracing::debug!(page, "Adopting in-flight preload");
            self.state.loading = true;
            self.adopted = true;
            return Plan::Satisfied;
        }

        self.state.loading = true;
        let ticket = self.issue_ticket(page, LoadKind::Foreground);
        self.foreground = Some(ticket);
        Plan::Issue(self.request(ticket))
    }

    fn prefetched_page(&self) -> Option<u32> {
        self.prefetched.as_ref().map(|(page, _)| *page)
    }

    fn issue_ticket(&mut self, page: u32, kind: LoadKind) -> Ticket {
        self.next_seq += 1;
        Ticket {
            generation: self.generation,
            page,
            kind,
            seq: self.next_seq,
        }
    }

    fn request(&self, ticket: Ticket) -> FetchRequest {
        tracing::debug!(page = ticket.page, kind = ?ticket.kind, query = %self.query, "Requesting page");
        FetchRequest {
            ticket,
            query: self.query.clone(),
            page_size: self.page_size,
        }
    }

    fn settle(&mut self, page: u32, result: Result<Vec<Article>, FetchFailed>) -> Applied {
        match result {
            Ok(articles) => self.accept(page, articles),
            Err(e) => {
                tracing::warn!(page, error = %e, "Page load failed");
                if page > 1 {
                    self.state.cursor = self.state.cursor.min(page - 1);
                }
                Applied::Failed
            }
        }
    }

    fn accept(&mut self, page: u32, articles: Vec<Article>) -> Applied {
        let count = articles.len();
        self.state.has_more = count > 0;
        tracing::info!(page, count, has_more = self.state.has_more, "Page loaded");

        if page == 1 {
            self.state.items = articles;
            Applied::Replaced(count)
        } else {
            self.state.items.extend(articles);
            Applied::Appended(count)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
