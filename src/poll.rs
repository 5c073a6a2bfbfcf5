//! Background page fetching.
//!
//! The feed state machine only *describes* the pages it wants.  The
//! [`Dispatcher`] runs each [`FetchRequest`] against the article source on
//! its own tokio task and sends the tagged [`FetchOutcome`] back to the UI
//! loop over an [`mpsc`] channel.  The loop applies outcomes on its own
//! turn, so feed state has exactly one writer.
//!
//! ## For contributors
//!
//! Requests are never cancelled.  A request that outlives its filter still
//! runs to completion; the state machine recognises its stale ticket and
//! drops the result.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::feed::{FeedQuery, FetchFailed, FetchOutcome, FetchRequest};
use crate::source::{Article, ArticleSource};

/// Outcomes that can queue up before the UI loop drains them.
const CHANNEL_CAPACITY: usize = 32;

/// Runs fetch requests against one article source.
pub struct Dispatcher<S> {
    source: Arc<S>,
    tx: mpsc::Sender<FetchOutcome>,
}

/// Create a dispatcher for `source` and the receiver its outcomes arrive
/// on.
///
/// The main loop should drain the receiver on every turn.
pub fn channel<S: ArticleSource>(source: S) -> (Dispatcher<S>, mpsc::Receiver<FetchOutcome>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let dispatcher = Dispatcher {
        source: Arc::new(source),
        tx,
    };
    (dispatcher, rx)
}

impl<S: ArticleSource> Dispatcher<S> {
    /// Start fetching `request` in the background.
    ///
    /// Exactly one outcome is sent per request, also when the fetch task
    /// panics, so the feed's in-flight flag is always cleared.
    pub fn dispatch(&self, request: FetchRequest) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let ticket = request.ticket;

        tracing::debug!(
            source = self.source.name(),
            page = ticket.page,
            kind = ?ticket.kind,
            query = %request.query,
            "Dispatching fetch"
        );

        tokio::spawn(async move {
            let task = tokio::spawn(async move { fetch(source.as_ref(), &request).await });
            let result = task.await.map_err(|e| FetchFailed(e.to_string()));

            // If the receiver is gone the UI loop has exited.
            if tx.send(FetchOutcome { ticket, result }).await.is_err() {
                tracing::debug!(page = ticket.page, "Outcome receiver closed, dropping result");
            }
        });
    }
}

/// Run one request against `source`.
pub async fn fetch<S: ArticleSource>(source: &S, request: &FetchRequest) -> Vec<Article> {
    let page = request.page();
    match &request.query {
        FeedQuery::Category(category) => {
            source
                .fetch_by_category(category, page, request.page_size)
                .await
        }
        FeedQuery::Search(text) => source.search_by_text(text, page, request.page_size).await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
