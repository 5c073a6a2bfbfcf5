//! Application state.
//!
//! `App` glues the feed state machine and the scroll triggers to the
//! terminal: it owns the list selection, the search box, the category
//! picker and the status line.  Every feed operation goes through `App`,
//! and every request the feed emits is queued in an outbox that the main
//! loop hands to the dispatcher.

use ratatui::widgets::ListState;

use crate::feed::{Applied, Feed, FeedQuery, FetchOutcome, FetchRequest};
use crate::scroll::{ScrollTriggers, Trigger, Viewport};
use crate::source::{Article, CategoryTable};

/// What the keyboard currently drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Scrolling the card list.
    Browse,
    /// Typing into the search box.
    Search,
    /// Choosing from the category picker.
    Categories,
    /// Help overlay shown.
    Help,
    /// Full view of the selected article.
    Detail,
}

pub struct App {
    pub feed: Feed,
    pub triggers: ScrollTriggers,
    pub categories: CategoryTable,
    /// Selection and scroll offset of the card list.
    pub list_state: ListState,
    /// Selection inside the category picker.
    pub category_state: ListState,
    pub mode: Mode,
    /// Contents of the search box.
    pub search_input: String,
    /// First visible line of the detail view.
    pub detail_scroll: u16,
    /// Visible window of the card list, recorded by the last frame.
    pub viewport: Option<Viewport>,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// One-line message for the status bar.
    pub status: String,
    outbox: Vec<FetchRequest>,
}

impl App {
    pub fn new(feed: Feed, triggers: ScrollTriggers, categories: CategoryTable) -> Self {
        Self {
            feed,
            triggers,
            categories,
            list_state: ListState::default(),
            category_state: ListState::default(),
            mode: Mode::Browse,
            search_input: String::new(),
            detail_scroll: 0,
            viewport: None,
            quit: false,
            status: "Starting…".into(),
            outbox: Vec::new(),
        }
    }

    /// Requests waiting to be dispatched.
    pub fn take_requests(&mut self) -> Vec<FetchRequest> {
        std::mem::take(&mut self.outbox)
    }

    // -- feed operations -----------------------------------------------------

    /// Switch the feed to `query`.
    pub fn set_filter(&mut self, query: FeedQuery) {
        let request = self.feed.set_filter(query);
        self.outbox.extend(request);
        self.list_state = ListState::default();
        self.status = "Loading articles...".into();
        self.sync_triggers();
    }

    /// Submit the search box.  Blank text returns to the selected category.
    pub fn submit_search(&mut self) {
        self.mode = Mode::Browse;
        self.set_filter(FeedQuery::search(self.search_input.clone()));
    }

    pub fn select_category(&mut self, id: &str) {
        self.search_input.clear();
        self.set_filter(FeedQuery::category(id));
    }

    /// Back to the unfiltered feed, search box cleared.
    pub fn go_home(&mut self) {
        self.search_input.clear();
        let request = self.feed.reset_to_home();
        self.outbox.extend(request);
        self.list_state = ListState::default();
        self.status = "Loading articles...".into();
        self.sync_triggers();
    }

    /// Load the current filter again from page 1.
    pub fn reload(&mut self) {
        self.set_filter(self.feed.query().clone());
    }

    /// Fold a finished fetch into the feed.
    pub fn handle_outcome(&mut self, outcome: FetchOutcome) {
        match self.feed.apply(outcome) {
            Applied::Stale => return,
            Applied::Replaced(count) => {
                self.status = format!("Loaded {count} articles");
                if count > 0 {
                    self.list_state.select(Some(0));
                }
            }
            Applied::Appended(count) => {
                self.status = format!("Loaded {count} more articles");
            }
            Applied::Prefetched(count) => {
                self.status = format!("Prefetched {count} articles");
            }
            Applied::Failed => {
                self.status = "Could not load articles".into();
                // The list did not grow; let the end trigger retry in place.
                self.triggers.rearm_end();
            }
            Applied::PrefetchFailed => {}
        }
        self.sync_triggers();
    }

    /// Run the scroll triggers against the last recorded viewport.
    pub fn check_triggers(&mut self) {
        let Some(viewport) = self.viewport else {
            return;
        };

        for trigger in self.triggers.evaluate(viewport, self.feed.state()) {
            let request = match trigger {
                Trigger::End => self.feed.load_more(),
                Trigger::Prefetch => self.feed.preload_more(),
            };
            tracing::debug!(
                ?trigger,
                issued = request.is_some(),
                end = ?self.triggers.end_sentinel(),
                prefetch = ?self.triggers.prefetch_sentinel(),
                "Scroll trigger fired"
            );
            self.outbox.extend(request);
        }
        // A promoted prefetch grows the list without an outcome.
        self.sync_triggers();
    }

    /// Tear down: sentinels are detached and never fire again.
    pub fn shutdown(&mut self) {
        self.triggers.disconnect();
        self.quit = true;
    }

    fn sync_triggers(&mut self) {
        let state = self.feed.state();
        self.triggers.attach(self.feed.generation(), state.items.len());
    }

    // -- queries -------------------------------------------------------------

    pub fn items(&self) -> &[Article] {
        &self.feed.state().items
    }

    pub fn selected_article(&self) -> Option<&Article> {
        self.list_state.selected().and_then(|i| self.items().get(i))
    }

    /// Title of the active filter for the header.
    pub fn filter_label(&self) -> String {
        match self.feed.query() {
            FeedQuery::Search(text) => format!("Search: {text}"),
            FeedQuery::Category(id) => self.categories.name_of(id).to_string(),
        }
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        self.move_selection(1);
    }

    pub fn select_previous(&mut self) {
        self.move_selection(-1);
    }

    pub fn page_down(&mut self) {
        let step = self.cards_per_page();
        self.move_selection(step as isize);
    }

    pub fn page_up(&mut self) {
        let step = self.cards_per_page();
        self.move_selection(-(step as isize));
    }

    pub fn select_first(&mut self) {
        if !self.items().is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.items().is_empty() {
            self.list_state.select(Some(self.items().len() - 1));
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.items().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_add_signed(delta).min(len - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    fn cards_per_page(&self) -> usize {
        self.viewport
            .map(|v| v.height_rows / crate::scroll::CARD_HEIGHT)
            .unwrap_or(1)
            .max(1)
    }

    // -- category picker -----------------------------------------------------

    pub fn open_categories(&mut self) {
        let current = self.categories.position(self.feed.selected_category());
        self.category_state.select(Some(current.unwrap_or(0)));
        self.mode = Mode::Categories;
    }

    pub fn picker_next(&mut self) {
        let len = self.categories.entries().len();
        let i = self.category_state.selected().map_or(0, |i| (i + 1) % len);
        self.category_state.select(Some(i));
    }

    pub fn picker_previous(&mut self) {
        let len = self.categories.entries().len();
        let i = self
            .category_state
            .selected()
            .map_or(0, |i| (i + len - 1) % len);
        self.category_state.select(Some(i));
    }

    pub fn picker_confirm(&mut self) {
        self.mode = Mode::Browse;
        let id = self
            .category_state
            .selected()
            .and_then(|i| self.categories.entries().get(i))
            .map(|c| c.id.clone());
        if let Some(id) = id {
            self.select_category(&id);
        }
    }

    // -- detail view ---------------------------------------------------------

    /// Show the whole selected article.  No-op without a selection.
    pub fn open_detail(&mut self) {
        if self.selected_article().is_some() {
            self.detail_scroll = 0;
            self.mode = Mode::Detail;
        }
    }

    pub fn close_detail(&mut self) {
        self.mode = Mode::Browse;
    }

    pub fn scroll_detail(&mut self, delta: i16) {
        self.detail_scroll = self.detail_scroll.saturating_add_signed(delta);
    }

    // -- external ------------------------------------------------------------

    /// Open the selected article in the system browser.
    pub fn open_selected(&mut self) {
        let Some(index) = self.list_state.selected() else {
            return;
        };
        let Some(article) = self.selected_article() else {
            return;
        };
        let url = article.url.clone();
        tracing::info!(key = %article.render_key(index), url = %url, "Opening article");
        match open::that_detached(&url) {
            Ok(()) => self.status = format!("Opened {url}"),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to open browser");
                self.status = format!("Could not open browser: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FetchFailed, FetchOutcome};
    use crate::scroll::{TriggerSettings, CARD_HEIGHT};
    use crate::source::categories::ALL;

    fn make_articles(prefix: &str, count: usize) -> Vec<Article> {
        (0..count)
            .map(|i| {
                Article::new(
                    i as u64,
                    format!("{prefix} {i}"),
                    "extract",
                    format!("https://en.wikipedia.org/wiki/{prefix}_{i}"),
                )
            })
            .collect()
    }

    fn new_app() -> App {
        App::new(
            Feed::new(15, ALL),
            ScrollTriggers::new(TriggerSettings::default()),
            CategoryTable::default(),
        )
    }

    /// App on the home feed with page 1 (15 items) applied.
    fn loaded_app() -> App {
        let mut app = new_app();
        app.set_filter(FeedQuery::home());
        let request = app.take_requests().pop().unwrap();
        app.handle_outcome(FetchOutcome {
            ticket: request.ticket,
            result: Ok(make_articles("Page1", 15)),
        });
        app
    }

    fn viewport_at_end(app: &App) -> Viewport {
        let rows = app.items().len() * CARD_HEIGHT;
        Viewport {
            offset_rows: rows - 20,
            height_rows: 20,
        }
    }

    // -- construction --------------------------------------------------------

    #[test]
    fn new_app_starts_empty() {
        let app = new_app();
        assert!(app.items().is_empty());
        assert!(!app.quit);
        assert!(app.list_state.selected().is_none());
        assert_eq!(app.mode, Mode::Browse);
    }

    // -- feed wiring ---------------------------------------------------------

    #[test]
    fn set_filter_queues_one_request() {
        let mut app = new_app();
        app.set_filter(FeedQuery::category("art"));
        let requests = app.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query, FeedQuery::category("art"));
        assert!(app.take_requests().is_empty());
    }

    #[test]
    fn first_page_selects_first_card() {
        let app = loaded_app();
        assert_eq!(app.items().len(), 15);
        assert_eq!(app.list_state.selected(), Some(0));
        assert_eq!(app.status, "Loaded 15 articles");
    }

    #[test]
    fn reaching_the_end_requests_next_and_prefetch() {
        let mut app = loaded_app();
        app.viewport = Some(viewport_at_end(&app));
        app.check_triggers();

        let requests = app.take_requests();
        let pages: Vec<u32> = requests.iter().map(|r| r.page()).collect();
        assert_eq!(pages, vec![2, 3]);
        assert_eq!(app.feed.state().cursor, 2);

        // Same frame again: nothing new.
        app.check_triggers();
        assert!(app.take_requests().is_empty());
    }

    #[test]
    fn no_triggers_before_first_frame() {
        let mut app = loaded_app();
        app.check_triggers();
        assert!(app.take_requests().is_empty());
    }

    #[test]
    fn blank_search_returns_to_category() {
        let mut app = new_app();
        app.select_category("history");
        app.take_requests();

        app.search_input = "   ".into();
        app.submit_search();
        let request = app.take_requests().pop().unwrap();
        assert_eq!(request.query, FeedQuery::category("history"));
    }

    #[test]
    fn go_home_clears_search_box() {
        let mut app = new_app();
        app.search_input = "rust".into();
        app.submit_search();
        assert!(app.feed.state().is_searching);

        app.go_home();
        assert!(app.search_input.is_empty());
        assert!(!app.feed.state().is_searching);
        assert_eq!(app.filter_label(), "All");
    }

    #[test]
    fn stale_outcome_does_not_touch_status() {
        let mut app = new_app();
        app.set_filter(FeedQuery::category("art"));
        let old = app.take_requests().pop().unwrap();
        app.set_filter(FeedQuery::category("music"));

        app.handle_outcome(FetchOutcome {
            ticket: old.ticket,
            result: Ok(make_articles("Art", 5)),
        });
        assert!(app.items().is_empty());
        assert_eq!(app.status, "Loading articles...");
    }

    #[test]
    fn shutdown_disconnects_triggers() {
        let mut app = loaded_app();
        app.shutdown();
        app.viewport = Some(viewport_at_end(&app));
        app.check_triggers();
        assert!(app.take_requests().is_empty());
        assert!(app.quit);
    }

    // -- category picker -----------------------------------------------------

    #[test]
    fn picker_opens_on_current_category_and_wraps() {
        let mut app = new_app();
        app.open_categories();
        assert_eq!(app.mode, Mode::Categories);
        assert_eq!(app.category_state.selected(), Some(0));

        app.picker_previous();
        let last = app.categories.entries().len() - 1;
        assert_eq!(app.category_state.selected(), Some(last));
        app.picker_next();
        assert_eq!(app.category_state.selected(), Some(0));
    }

    #[test]
    fn picker_confirm_switches_filter() {
        let mut app = new_app();
        app.open_categories();
        app.picker_next(); // philosophy
        app.picker_confirm();

        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.feed.selected_category(), "philosophy");
        assert_eq!(app.take_requests().len(), 1);
    }

    #[test]
    fn failed_load_retries_when_list_fits_on_screen() {
        let mut app = new_app();
        app.set_filter(FeedQuery::home());
        let first = app.take_requests().pop().unwrap();
        app.handle_outcome(FetchOutcome {
            ticket: first.ticket,
            result: Ok(make_articles("Short", 3)),
        });
        app.viewport = Some(Viewport {
            offset_rows: 0,
            height_rows: 20,
        });

        app.check_triggers();
        let second = app.take_requests().pop().unwrap();
        assert_eq!(second.page(), 2);

        app.handle_outcome(FetchOutcome {
            ticket: second.ticket,
            result: Err(FetchFailed("timed out".into())),
        });
        assert_eq!(app.status, "Could not load articles");

        // Same viewport, nothing scrolled: the retry still goes out.
        app.check_triggers();
        let retry = app.take_requests();
        assert_eq!(retry.len(), 1);
        assert_eq!(retry[0].page(), 2);
    }

    #[test]
    fn failed_prefetch_leaves_status_alone() {
        let mut app = loaded_app();
        let preload = app.feed.preload_more().unwrap();
        app.handle_outcome(FetchOutcome {
            ticket: preload.ticket,
            result: Err(FetchFailed("timed out".into())),
        });
        assert_eq!(app.status, "Loaded 15 articles");
    }

    // -- detail view ---------------------------------------------------------

    #[test]
    fn detail_needs_a_selection() {
        let mut app = new_app();
        app.open_detail();
        assert_eq!(app.mode, Mode::Browse);

        let mut app = loaded_app();
        app.scroll_detail(4);
        app.open_detail();
        assert_eq!(app.mode, Mode::Detail);
        assert_eq!(app.detail_scroll, 0);

        app.scroll_detail(-2);
        assert_eq!(app.detail_scroll, 0);
        app.close_detail();
        assert_eq!(app.mode, Mode::Browse);
    }

    // -- navigation ----------------------------------------------------------

    #[test]
    fn select_next_on_empty_is_noop() {
        let mut app = new_app();
        app.select_next();
        assert!(app.list_state.selected().is_none());
    }

    #[test]
    fn select_previous_clamps_at_zero() {
        let mut app = loaded_app();
        app.select_first();
        app.select_previous();
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn select_next_clamps_at_last_item() {
        let mut app = loaded_app();
        app.select_last();
        app.select_next();
        assert_eq!(app.list_state.selected(), Some(14));
    }

    #[test]
    fn page_down_moves_by_visible_cards() {
        let mut app = loaded_app();
        app.viewport = Some(Viewport {
            offset_rows: 0,
            height_rows: 20,
        });
        app.page_down();
        assert_eq!(app.list_state.selected(), Some(4));
        app.page_up();
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn selected_article_follows_selection() {
        let mut app = loaded_app();
        app.select_last();
        assert_eq!(app.selected_article().map(|a| a.title.as_str()), Some("Page1 14"));
    }
}
