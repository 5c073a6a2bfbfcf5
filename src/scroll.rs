//! Scroll triggers: when to load the next page.
//!
//! The UI reports one [`Viewport`] per frame.  Two named subscriptions
//! watch it, each pinned to a sentinel item:
//!
//! | Trigger              | Sentinel                        | Fires when                                   |
//! |----------------------|---------------------------------|----------------------------------------------|
//! | [`Trigger::End`]     | last item                       | `has_more && !loading`                       |
//! | [`Trigger::Prefetch`]| `prefetch_distance` before end  | `has_more && !preloading && len > min_items` |
//!
//! A subscription fires when its sentinel comes within `margin` rows of the
//! visible window, once per entry.  While the guard is closed the entry is
//! not consumed, so the trigger fires as soon as the guard opens.  Moving a
//! sentinel to a different item (new page, new filter) re-attaches it and
//! re-arms it.
//!
//! Triggers never fetch.  They only report which feed operation to call.

use serde::Deserialize;

use crate::feed::FeedState;

/// Rows one article card takes in the list.
pub const CARD_HEIGHT: usize = 5;

/// Trigger margins and thresholds, from the `[scroll]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TriggerSettings {
    /// Look-ahead below the window for the end trigger.
    pub end_margin_rows: usize,
    /// Look-ahead below the window for the prefetch trigger.
    pub prefetch_margin_rows: usize,
    /// How many items before the last one the prefetch sentinel sits.
    pub prefetch_distance: usize,
    /// Prefetch only once the list holds more than this many items.
    pub prefetch_min_items: usize,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            end_margin_rows: 8,
            prefetch_margin_rows: 16,
            prefetch_distance: 3,
            prefetch_min_items: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Call `Feed::load_more`.
    End,
    /// Call `Feed::preload_more`.
    Prefetch,
}

/// The visible window of the card list, in rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub offset_rows: usize,
    pub height_rows: usize,
}

/// Identity of the item a subscription watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinel {
    pub generation: u64,
    pub index: usize,
}

impl Sentinel {
    fn in_range(&self, viewport: Viewport, margin: usize) -> bool {
        let top = self.index * CARD_HEIGHT;
        let bottom = top + CARD_HEIGHT;
        let window_top = viewport.offset_rows.saturating_sub(margin);
        let window_bottom = viewport.offset_rows + viewport.height_rows + margin;
        top < window_bottom && bottom > window_top
    }
}

#[derive(Debug)]
struct Subscription {
    margin: usize,
    sentinel: Option<Sentinel>,
    intersecting: bool,
}

impl Subscription {
    fn new(margin: usize) -> Self {
        Self {
            margin,
            sentinel: None,
            intersecting: false,
        }
    }

    fn attach(&mut self, sentinel: Option<Sentinel>) {
        if self.sentinel != sentinel {
            self.sentinel = sentinel;
            self.intersecting = false;
        }
    }

    /// `true` on the first frame the sentinel is in range with the guard
    /// open.
    fn poll(&mut self, viewport: Viewport, guard: bool) -> bool {
        let in_range = self
            .sentinel
            .is_some_and(|s| s.in_range(viewport, self.margin));
        if !in_range {
            self.intersecting = false;
            return false;
        }
        if self.intersecting || !guard {
            return false;
        }
        self.intersecting = true;
        true
    }
}

/// The end and prefetch subscriptions over one viewport.
#[derive(Debug)]
pub struct ScrollTriggers {
    settings: TriggerSettings,
    end: Subscription,
    prefetch: Subscription,
    connected: bool,
}

impl ScrollTriggers {
    pub fn new(settings: TriggerSettings) -> Self {
        Self {
            end: Subscription::new(settings.end_margin_rows),
            prefetch: Subscription::new(settings.prefetch_margin_rows),
            settings,
            connected: true,
        }
    }

    /// Point the sentinels at the current list.
    ///
    /// Call after every change to the item list; unchanged sentinels keep
    /// their state.
    pub fn attach(&mut self, generation: u64, item_count: usize) {
        if !self.connected {
            return;
        }
        let last = item_count.checked_sub(1);
        self.end.attach(last.map(|index| Sentinel { generation, index }));
        self.prefetch.attach(last.map(|last| Sentinel {
            generation,
            index: last.saturating_sub(self.settings.prefetch_distance),
        }));
    }

    /// Triggers that fire for this frame, end trigger first.
    pub fn evaluate(&mut self, viewport: Viewport, state: &FeedState) -> Vec<Trigger> {
        if !self.connected {
            return Vec::new();
        }

        let end_guard = state.has_more && !state.loading;
        let prefetch_guard = state.has_more
            && !state.preloading
            && state.items.len() > self.settings.prefetch_min_items;

        let mut fired = Vec::new();
        if self.end.poll(viewport, end_guard) {
            fired.push(Trigger::End);
        }
        if self.prefetch.poll(viewport, prefetch_guard) {
            fired.push(Trigger::Prefetch);
        }
        fired
    }

    /// Let the end trigger fire again for the sentinel it already watches.
    ///
    /// Used after a failed page load: the list did not grow, so the sentinel
    /// keeps its identity and would otherwise stay consumed.
    pub fn rearm_end(&mut self) {
        self.end.intersecting = false;
    }

    /// Detach both sentinels for good.  Used on teardown.
    pub fn disconnect(&mut self) {
        self.end.attach(None);
        self.prefetch.attach(None);
        self.connected = false;
    }

    pub fn end_sentinel(&self) -> Option<Sentinel> {
        self.end.sentinel
    }

    pub fn prefetch_sentinel(&self) -> Option<Sentinel> {
        self.prefetch.sentinel
    }
}
