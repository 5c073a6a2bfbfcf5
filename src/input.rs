//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions.  What a key does depends on
//! the current [`Mode`]: while the search box or a popup has focus, keys go
//! there instead of the card list.
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a `KeyCode` match arm in the handler for the right mode.
//! 3. Update the help overlay in [`crate::ui`] and the table in `README.md`.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{App, Mode};

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.shutdown();
        return;
    }

    match app.mode {
        Mode::Browse => browse(app, key),
        Mode::Search => search(app, key),
        Mode::Categories => categories(app, key),
        Mode::Help => app.mode = Mode::Browse,
        Mode::Detail => detail(app, key),
    }
}

fn browse(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.shutdown(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::PageDown => app.page_down(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('/') => app.mode = Mode::Search,
        KeyCode::Char('c') => app.open_categories(),
        KeyCode::Char('h') => app.go_home(),
        KeyCode::Enter => app.open_detail(),
        KeyCode::Char('o') => app.open_selected(),
        KeyCode::Char('r') => app.reload(),
        KeyCode::Char('?') => app.mode = Mode::Help,
        _ => {}
    }
}

fn search(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_search(),
        KeyCode::Esc => app.mode = Mode::Browse,
        KeyCode::Backspace => {
            app.search_input.pop();
        }
        KeyCode::Char(c) => app.search_input.push(c),
        _ => {}
    }
}

fn detail(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => app.scroll_detail(1),
        KeyCode::Up | KeyCode::Char('k') => app.scroll_detail(-1),
        KeyCode::PageDown => app.scroll_detail(10),
        KeyCode::PageUp => app.scroll_detail(-10),
        KeyCode::Char('o') => app.open_selected(),
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => app.close_detail(),
        _ => {}
    }
}

fn categories(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => app.picker_next(),
        KeyCode::Up | KeyCode::Char('k') => app.picker_previous(),
        KeyCode::Enter => app.picker_confirm(),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('c') => app.mode = Mode::Browse,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Feed, FeedQuery};
    use crate::scroll::{ScrollTriggers, TriggerSettings};
    use crate::source::categories::ALL;
    use crate::source::CategoryTable;
    use crossterm::event::KeyEventState;

    fn new_app() -> App {
        App::new(
            Feed::new(15, ALL),
            ScrollTriggers::new(TriggerSettings::default()),
            CategoryTable::default(),
        )
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key_event(app, press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn q_quits_in_browse_mode() {
        let mut app = new_app();
        handle_key_event(&mut app, press(KeyCode::Char('q')));
        assert!(app.quit);
    }

    #[test]
    fn release_events_are_ignored() {
        let mut app = new_app();
        let key = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        handle_key_event(&mut app, key);
        assert!(!app.quit);
    }

    #[test]
    fn typed_search_is_submitted_on_enter() {
        let mut app = new_app();
        handle_key_event(&mut app, press(KeyCode::Char('/')));
        assert_eq!(app.mode, Mode::Search);

        // `q` is text while the search box has focus.
        type_text(&mut app, "quarkx");
        handle_key_event(&mut app, press(KeyCode::Backspace));
        assert!(!app.quit);

        handle_key_event(&mut app, press(KeyCode::Enter));
        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.feed.query(), &FeedQuery::search("quark"));
        assert_eq!(app.take_requests().len(), 1);
    }

    #[test]
    fn esc_cancels_search_without_request() {
        let mut app = new_app();
        handle_key_event(&mut app, press(KeyCode::Char('/')));
        type_text(&mut app, "tea");
        handle_key_event(&mut app, press(KeyCode::Esc));

        assert_eq!(app.mode, Mode::Browse);
        assert!(!app.quit);
        assert!(app.take_requests().is_empty());
    }

    #[test]
    fn category_picker_round_trip() {
        let mut app = new_app();
        handle_key_event(&mut app, press(KeyCode::Char('c')));
        assert_eq!(app.mode, Mode::Categories);

        handle_key_event(&mut app, press(KeyCode::Char('j')));
        handle_key_event(&mut app, press(KeyCode::Char('j')));
        handle_key_event(&mut app, press(KeyCode::Enter));

        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.feed.selected_category(), "physics");
    }

    #[test]
    fn any_key_closes_help() {
        let mut app = new_app();
        handle_key_event(&mut app, press(KeyCode::Char('?')));
        assert_eq!(app.mode, Mode::Help);
        handle_key_event(&mut app, press(KeyCode::Char('q')));
        assert_eq!(app.mode, Mode::Browse);
        assert!(!app.quit);
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        let mut app = new_app();
        handle_key_event(&mut app, press(KeyCode::Char('/')));
        handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.quit);
    }

    #[test]
    fn enter_opens_detail_and_q_closes_it() {
        let mut app = new_app();
        app.set_filter(FeedQuery::home());
        let request = app.take_requests().pop().unwrap();
        app.handle_outcome(crate::feed::FetchOutcome {
            ticket: request.ticket,
            result: Ok(crate::source::sample::sample_articles()),
        });

        handle_key_event(&mut app, press(KeyCode::Enter));
        assert_eq!(app.mode, Mode::Detail);

        handle_key_event(&mut app, press(KeyCode::Char('j')));
        handle_key_event(&mut app, press(KeyCode::Char('j')));
        assert_eq!(app.detail_scroll, 2);

        // `q` leaves the detail view, not the app.
        handle_key_event(&mut app, press(KeyCode::Char('q')));
        assert_eq!(app.mode, Mode::Browse);
        assert!(!app.quit);
    }

    #[test]
    fn h_goes_home() {
        let mut app = new_app();
        app.select_category("art");
        app.take_requests();

        handle_key_event(&mut app, press(KeyCode::Char('h')));
        assert_eq!(app.feed.query(), &FeedQuery::home());
        assert_eq!(app.take_requests().len(), 1);
    }
}
