//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).  The one thing rendering writes
//! back is [`App::viewport`]: the visible window of the card list, which
//! the scroll triggers read on the next turn of the main loop.
//!
//! ## For contributors
//!
//! * The layout is three rows: a header (search box and active filter), the
//!   card list, and a one-line status bar.  Popups (category picker, help,
//!   article detail) are drawn last, over everything else.
//! * Every card is exactly [`CARD_HEIGHT`] rows.  The scroll triggers turn
//!   item indices into rows with that constant, so a card that grows or
//!   shrinks breaks prefetch timing.
//! * Text is measured in terminal columns with `unicode-width`, never in
//!   chars: a CJK character takes two columns.
//! * [`ratatui`] is the TUI framework; see its docs for widget details.

use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, Mode};
use crate::feed::{FeedQuery, FeedState};
use crate::scroll::{Viewport, CARD_HEIGHT};
use crate::source::Article;

/// Columns taken by the list border and the highlight symbol.
const CARD_CHROME: usize = 4;

const ELLIPSIS: &str = "...";

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [header_area, list_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(CARD_HEIGHT as u16),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(app, frame, header_area);
    draw_card_list(app, frame, list_area);
    draw_status_bar(app, frame, status_area);

    match app.mode {
        Mode::Categories => draw_category_picker(app, frame),
        Mode::Help => draw_help(frame),
        Mode::Detail => draw_detail(app, frame),
        Mode::Browse | Mode::Search => {}
    }
}

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

fn draw_header(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.mode == Mode::Search;
    let border = if editing { Color::Yellow } else { Color::DarkGray };

    let mut spans = vec![Span::styled(" / ", Style::default().fg(Color::DarkGray))];
    if app.search_input.is_empty() && !editing {
        spans.push(Span::styled(
            "Search Wikipedia...",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        spans.push(Span::styled(&app.search_input, Style::default().fg(Color::White)));
    }
    if editing {
        spans.push(Span::styled("█", Style::default().fg(Color::Yellow)));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(" WikiScroll ")
            .title_bottom(Line::from(format!(" {} ", app.filter_label())).right_aligned())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(header, area);
}

/// Render the card list and record the visible window.
fn draw_card_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let width = (area.width as usize).saturating_sub(CARD_CHROME);
    let state = app.feed.state();

    let cards: Vec<ListItem> = state
        .items
        .iter()
        .map(|article| ListItem::new(card_lines(article, width)))
        .collect();

    let title = match app.feed.query() {
        FeedQuery::Search(text) => format!(
            " Search results for \"{text}\" · {} articles found ",
            state.items.len()
        ),
        FeedQuery::Category(_) => format!(" {} ", app.filter_label()),
    };

    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);

    if state.items.is_empty() {
        let message = empty_message(state);
        frame.render_widget(
            Paragraph::new(Line::styled(message, Style::default().fg(Color::DarkGray)))
                .block(block),
            area,
        );
        app.viewport = Some(Viewport {
            offset_rows: 0,
            height_rows: inner.height as usize,
        });
        return;
    }

    let list = List::new(cards)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);

    app.viewport = Some(Viewport {
        offset_rows: app.list_state.offset() * CARD_HEIGHT,
        height_rows: inner.height as usize,
    });
}

fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let state = app.feed.state();
    let message = feed_message(state).unwrap_or(app.status.as_str());

    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(message, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!(
                "{} articles · page {}{}",
                state.items.len(),
                state.cursor,
                if app.feed.has_prefetched() { " (+1 ready)" } else { "" }
            ),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  q: quit  /: search  c: categories  ?: help"),
    ]));
    frame.render_widget(status, area);
}

fn draw_category_picker(app: &mut App, frame: &mut Frame) {
    let entries = app.categories.entries();
    let height = (entries.len() as u16 + 2).min(frame.area().height);
    let area = centered(frame.area(), 30, height);

    let selected = app.feed.selected_category();
    let items: Vec<ListItem> = entries
        .iter()
        .map(|c| {
            let style = if c.id == selected {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            ListItem::new(Line::styled(c.name.clone(), style))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().title(" Categories ").borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol("▸ ");

    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut app.category_state);
}

fn draw_help(frame: &mut Frame) {
    const KEYS: &[(&str, &str)] = &[
        ("q / Esc", "quit"),
        ("j k / ↑ ↓", "move"),
        ("PgUp PgDn", "page"),
        ("g / G", "first / last"),
        ("/", "search (Enter submits, Esc cancels)"),
        ("c", "choose category"),
        ("h", "home feed"),
        ("Enter", "article details"),
        ("o", "open in browser"),
        ("r", "reload"),
        ("?", "toggle help"),
    ];

    let lines: Vec<Line> = KEYS
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!(" {key:<11}"), Style::default().fg(Color::Cyan)),
                Span::raw(*action),
            ])
        })
        .collect();

    let area = centered(frame.area(), 50, KEYS.len() as u16 + 2);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title(" Keys ").borders(Borders::ALL)),
        area,
    );
}

/// The selected article in full: whole extract, every category, position.
fn draw_detail(app: &App, frame: &mut Frame) {
    let Some(article) = app.selected_article() else {
        return;
    };

    let muted = Style::default().fg(Color::DarkGray);
    let mut lines = vec![Line::styled(
        article.title.clone(),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )];
    if let Some(description) = &article.description {
        lines.push(Line::styled(description.clone(), Style::default().fg(Color::Cyan)));
    }
    lines.push(Line::raw(""));
    lines.extend(
        article
            .extract
            .lines()
            .map(|paragraph| Line::styled(paragraph.to_string(), Style::default().fg(Color::Gray))),
    );
    lines.push(Line::raw(""));

    if !article.categories.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Categories  ", muted),
            Span::raw(article.categories.join(", ")),
        ]));
    }
    if let Some(c) = article.coordinates {
        lines.push(Line::from(vec![
            Span::styled("Coordinates ", muted),
            Span::raw(format!("{:.4}, {:.4}", c.lat, c.lon)),
        ]));
    }
    if let Some(touched) = article.touched {
        lines.push(Line::from(vec![
            Span::styled("Last edited ", muted),
            Span::raw(touched.format("%Y-%m-%d %H:%M UTC").to_string()),
        ]));
    }
    lines.push(Line::styled(article.url.clone(), muted));

    let screen = frame.area();
    let area = centered(
        screen,
        screen.width.saturating_sub(8).max(20),
        screen.height.saturating_sub(4).max(6),
    );

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0))
        .block(
            Block::default()
                .title(" Article ")
                .title_bottom(Line::from(" j/k: scroll  o: open in browser  Esc: back ").right_aligned())
                .borders(Borders::ALL),
        );
    frame.render_widget(Clear, area);
    frame.render_widget(detail, area);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Status text implied by the feed itself, if any.
pub fn feed_message(state: &FeedState) -> Option<&'static str> {
    if state.loading && !state.items.is_empty() {
        Some("Loading more articles...")
    } else if state.loading {
        Some("Loading articles...")
    } else if !state.has_more && !state.items.is_empty() {
        Some(if state.is_searching {
            "No more search results"
        } else {
            "You've reached the end!"
        })
    } else {
        None
    }
}

fn empty_message(state: &FeedState) -> &'static str {
    if state.loading || state.has_more {
        "Loading articles..."
    } else if state.is_searching {
        "No articles found"
    } else {
        "No articles available"
    }
}

/// The rows of one card.  Always [`CARD_HEIGHT`] lines.
fn card_lines(article: &Article, width: usize) -> Vec<Line<'static>> {
    let title_text = truncate(&article.title, width);
    let room = width.saturating_sub(title_text.width() + 3);
    let mut title = vec![Span::styled(
        title_text,
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )];
    if let Some(description) = &article.description {
        if room > 3 {
            title.push(Span::styled(
                format!(" · {}", truncate(description, room)),
                Style::default().fg(Color::Cyan),
            ));
        }
    }

    let (first, second) = wrap_two(&article.extract, width);

    let mut meta = Vec::new();
    if let Some(touched) = article.touched {
        meta.push(touched.format("%Y-%m-%d").to_string());
    }
    if let Some(c) = article.coordinates {
        meta.push(format!("{:.2}, {:.2}", c.lat, c.lon));
    }
    if !article.categories.is_empty() {
        let shown: Vec<&str> = article.categories.iter().take(3).map(String::as_str).collect();
        meta.push(shown.join(", "));
    }
    if article.image_url.is_some() {
        meta.push("[img]".to_string());
    }
    meta.push(article.url.clone());

    vec![
        Line::from(title),
        Line::styled(first, Style::default().fg(Color::Gray)),
        Line::styled(second, Style::default().fg(Color::Gray)),
        Line::styled(
            truncate(&meta.join("  "), width),
            Style::default().fg(Color::DarkGray),
        ),
        Line::raw(""),
    ]
}

/// Longest prefix of `text` that fits in `width` columns.
fn prefix_within(text: &str, width: usize) -> &str {
    let mut used = 0;
    for (idx, c) in text.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            return &text[..idx];
        }
        used += w;
    }
    text
}

/// Cut `text` to `width` columns, ending in "..." when shortened.
///
/// Widths too narrow for the ellipsis get as many characters as fit.
fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width <= ELLIPSIS.len() {
        return prefix_within(text, width).to_string();
    }
    let head = prefix_within(text, width - ELLIPSIS.len()).trim_end();
    format!("{head}{ELLIPSIS}")
}

/// Split `text` over two lines of `width` columns, breaking on a space
/// where possible.
fn wrap_two(text: &str, width: usize) -> (String, String) {
    let text = text.trim();
    if text.width() <= width {
        return (text.to_string(), String::new());
    }

    let head = prefix_within(text, width);
    let split = head.rfind(' ').filter(|&i| i > 0).unwrap_or(head.len());
    let first = head[..split].trim_end().to_string();
    let rest = text[split..].trim_start();
    (first, truncate(rest, width))
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    cell
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Feed, FetchOutcome};
    use crate::scroll::{ScrollTriggers, TriggerSettings};
    use crate::source::categories::ALL;
    use crate::source::{CategoryTable, SampleSource};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn new_app() -> App {
        App::new(
            Feed::new(15, ALL),
            ScrollTriggers::new(TriggerSettings::default()),
            CategoryTable::default(),
        )
    }

    fn deliver(app: &mut App, articles: Vec<Article>) {
        let request = app.take_requests().pop().expect("pending request");
        app.handle_outcome(FetchOutcome {
            ticket: request.ticket,
            result: Ok(articles),
        });
    }

    fn render(app: &mut App) -> String {
        let backend = TestBackend::new(80, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn draw_empty_app_does_not_panic() {
        let mut app = new_app();
        render(&mut app);
    }

    #[test]
    fn draw_with_cards_records_viewport() {
        let mut app = new_app();
        app.set_filter(FeedQuery::home());
        deliver(&mut app, crate::source::sample::sample_articles());

        let screen = render(&mut app);
        assert!(screen.contains("Economics"));
        assert!(screen.contains("Loaded 3 articles"));

        // 30 rows minus header, status bar and list border.
        let viewport = app.viewport.expect("viewport recorded");
        assert_eq!(viewport.offset_rows, 0);
        assert_eq!(viewport.height_rows, 24);
    }

    #[test]
    fn empty_search_shows_no_articles_found() {
        let mut app = new_app();
        app.search_input = "philosophy".into();
        app.submit_search();
        deliver(&mut app, Vec::new());

        let screen = render(&mut app);
        assert!(screen.contains("No articles found"));
        assert!(screen.contains("Search results for \"philosophy\""));
    }

    #[test]
    fn popups_draw_over_the_list() {
        let mut app = new_app();
        app.open_categories();
        let screen = render(&mut app);
        assert!(screen.contains("Categories"));
        assert!(screen.contains("Philosophy"));

        app.mode = Mode::Help;
        let screen = render(&mut app);
        assert!(screen.contains("open in browser"));
    }

    #[tokio::test]
    async fn sample_cards_are_card_height() {
        use crate::source::ArticleSource;
        for article in SampleSource.fetch_by_category(ALL, 1, 15).await {
            assert_eq!(card_lines(&article, 40).len(), CARD_HEIGHT);
        }
    }

    #[test]
    fn feed_message_follows_state() {
        let mut state = FeedState::default();
        assert_eq!(feed_message(&state), None);

        state.loading = true;
        assert_eq!(feed_message(&state), Some("Loading articles..."));

        state.items = crate::source::sample::sample_articles();
        assert_eq!(feed_message(&state), Some("Loading more articles..."));

        state.loading = false;
        state.has_more = false;
        assert_eq!(feed_message(&state), Some("You've reached the end!"));
        state.is_searching = true;
        assert_eq!(feed_message(&state), Some("No more search results"));
    }

    #[test]
    fn empty_message_distinguishes_search() {
        let mut state = FeedState {
            has_more: false,
            ..FeedState::default()
        };
        assert_eq!(empty_message(&state), "No articles available");
        state.is_searching = true;
        assert_eq!(empty_message(&state), "No articles found");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long title here", 10), "a long...");
    }

    #[test]
    fn truncate_counts_wide_characters_twice() {
        assert_eq!(truncate("你好世界", 8), "你好世界");
        assert_eq!(truncate("你好世界", 7), "你好...");
        assert_eq!(truncate("你好世界", 3), "你");
    }

    #[test]
    fn wide_card_stays_inside_its_width() {
        let article = Article::new(
            9,
            "東京都の歴史と文化についての概要",
            "東京都は日本の首都であり、政治、経済、文化の中心地として発展してきた大都市である。",
            "https://ja.wikipedia.org/wiki/東京都",
        )
        .with_description("日本の首都");

        let lines = card_lines(&article, 20);
        assert_eq!(lines.len(), CARD_HEIGHT);
        for (i, line) in lines.iter().enumerate() {
            assert!(line.width() <= 20, "line {i} is {} columns", line.width());
        }
        assert!(lines[0].to_string().ends_with("..."));
    }

    #[test]
    fn wrap_two_splits_text_without_spaces() {
        let (first, second) = wrap_two("一二三四五六七八九十", 8);
        assert_eq!(first, "一二三四");
        assert_eq!(second, "五六...");
    }

    #[test]
    fn detail_shows_what_the_card_cuts() {
        let extract = format!("{} Zanzibar", "lorem ipsum dolor sit amet".repeat(8));
        let mut article = Article::new(5, "Longform", extract, "https://en.wikipedia.org/wiki/Longform")
            .with_categories(["Alpha", "Beta", "Gamma", "Omega"]);
        article.coordinates = Some(crate::source::Coordinates {
            lat: 51.5074,
            lon: -0.1278,
        });

        let mut app = new_app();
        app.set_filter(FeedQuery::home());
        deliver(&mut app, vec![article]);

        let card_view = render(&mut app);
        assert!(!card_view.contains("Zanzibar"));
        assert!(!card_view.contains("Omega"));

        app.open_detail();
        let detail_view = render(&mut app);
        assert!(detail_view.contains("Zanzibar"));
        assert!(detail_view.contains("Alpha, Beta, Gamma, Omega"));
        assert!(detail_view.contains("51.5074, -0.1278"));
        assert!(detail_view.contains("Article"));
    }

    #[test]
    fn wrap_two_breaks_on_space() {
        let (first, second) = wrap_two("alpha beta gamma delta", 12);
        assert_eq!(first, "alpha beta");
        assert_eq!(second, "gamma delta");
    }
}
