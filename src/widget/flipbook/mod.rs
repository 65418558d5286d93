pub mod dimensions;
pub mod page_flip;

pub use dimensions::{Breakpoint, Dimensions};
pub use page_flip::{FlipError, FlipEvent, Page, PageFlip};

use crate::chapter::Chapter;
use crate::paginator::{PageStyle, Paginator, TerminalLayout};
use crate::store::UiState;
use crate::theme::Palette;
use log::{debug, error, info, warn};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_RESIZE_DEBOUNCE: Duration = Duration::from_millis(150);
/// Index of the first content page, right after the cover.
const FIRST_CONTENT_PAGE: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerState {
    Unmounted,
    /// Mounted, waiting for the page widget to report it has been laid out.
    NotReady,
    Ready,
    Error(String),
}

/// What the current fragments were computed for.
#[derive(Debug, Clone)]
struct PaginationKey {
    chapter_id: i64,
    content: Arc<Chapter>,
    width: u16,
    budget: u32,
    style: PageStyle,
}

impl PaginationKey {
    fn matches(&self, chapter: &Arc<Chapter>, dims: &Dimensions, style: &PageStyle) -> bool {
        self.chapter_id == chapter.id
            && Arc::ptr_eq(&self.content, chapter)
            && self.width == dims.content_width()
            && self.budget == dims.content_budget()
            && self.style == *style
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingResize {
    viewport: Rect,
    at: Instant,
}

/// The book view: keeps the page widget in step with the selected chapter
/// and the space it is given.
pub struct FlipbookViewer {
    state: ViewerState,
    paginator: Paginator,
    style: PageStyle,
    debounce: Duration,
    viewport: Rect,
    dimensions: Dimensions,
    tracking_resize: bool,
    pending_resize: Option<PendingResize>,
    collapsed: bool,
    banner: bool,
    chapter: Option<Arc<Chapter>>,
    fragments: Vec<String>,
    key: Option<PaginationKey>,
    widget: Option<PageFlip>,
    remount_token: u64,
    open_first_page: bool,
}

impl FlipbookViewer {
    pub fn new(paginator: Paginator, style: PageStyle, debounce: Duration) -> Self {
        Self {
            state: ViewerState::Unmounted,
            paginator,
            style,
            debounce,
            viewport: Rect::default(),
            dimensions: Dimensions::compute(Rect::default()),
            tracking_resize: false,
            pending_resize: None,
            collapsed: false,
            banner: false,
            chapter: None,
            fragments: Vec::new(),
            key: None,
            widget: None,
            remount_token: 0,
            open_first_page: false,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ViewerState::Ready
    }

    pub fn remount_token(&self) -> u64 {
        self.remount_token
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn is_tracking_resize(&self) -> bool {
        self.tracking_resize
    }

    pub fn has_pending_resize(&self) -> bool {
        self.pending_resize.is_some()
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn chapter(&self) -> Option<&Arc<Chapter>> {
        self.chapter.as_ref()
    }

    pub fn widget(&self) -> Option<&PageFlip> {
        self.widget.as_ref()
    }

    /// Zero-based left page of the widget, if one exists.
    pub fn current_page(&self) -> Option<usize> {
        self.widget.as_ref().map(PageFlip::current_page)
    }

    pub fn mount(&mut self, viewport: Rect, state: &UiState) {
        if self.state != ViewerState::Unmounted {
            return;
        }
        info!("Mounting flipbook in {}x{}", viewport.width, viewport.height);
        self.tracking_resize = true;
        self.viewport = viewport;
        self.collapsed = state.collapsed;
        self.banner = state.error.is_some();
        self.dimensions = Dimensions::compute_with_banner(viewport, self.banner);
        self.chapter = state.selected_chapter.clone();
        self.state = ViewerState::NotReady;
        self.remount();
    }

    pub fn unmount(&mut self) {
        if let Some(widget) = self.widget.as_mut() {
            widget.destroy();
        }
        self.widget = None;
        self.tracking_resize = false;
        self.pending_resize = None;
        self.state = ViewerState::Unmounted;
        debug!("Flipbook unmounted");
    }

    /// Destroy the current widget and build a fresh one for the current
    /// pages. The new widget reports back through [`Self::on_widget_init`].
    fn remount(&mut self) {
        if let Some(old) = self.widget.as_mut() {
            old.destroy();
        }
        self.remount_token += 1;
        let pages = Page::compose(self.chapter.as_deref(), &self.fragments);
        self.widget = Some(PageFlip::new(
            pages,
            self.dimensions.spread,
            self.remount_token,
        ));
        if self.state == ViewerState::Ready {
            self.state = ViewerState::NotReady;
        }
    }

    /// A status screen covers the book, so nothing will lay the widget out.
    fn settle_hidden_widget(&mut self) {
        if self.state == ViewerState::NotReady {
            self.on_widget_init();
        }
    }

    /// The page widget finished its first layout.
    pub fn on_widget_init(&mut self) {
        if self.state != ViewerState::NotReady {
            return;
        }
        self.state = ViewerState::Ready;
        debug!("Page widget #{} ready", self.remount_token);
        if self.repaginate_if_stale() {
            return;
        }
        self.apply_first_page();
    }

    fn apply_first_page(&mut self) {
        if !self.open_first_page || self.chapter.is_none() {
            return;
        }
        let Some(widget) = self.widget.as_mut() else {
            return;
        };
        if widget.page_count() <= FIRST_CONTENT_PAGE {
            return;
        }
        self.open_first_page = false;
        if let Err(e) = widget.flip(FIRST_CONTENT_PAGE) {
            self.fail(format!("Unable to open the chapter: {e}"));
        }
    }

    /// New selection from the store.
    pub fn set_chapter(&mut self, chapter: Option<Arc<Chapter>>) {
        let unchanged = match (&self.chapter, &chapter) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }
        self.chapter = chapter;
        self.open_first_page = self.chapter.is_some();
        let paginated = match (&self.key, &self.chapter) {
            (Some(key), Some(chapter)) => key.matches(chapter, &self.dimensions, &self.style),
            _ => false,
        };
        if !paginated {
            self.fragments.clear();
            self.key = None;
        }
        match self.state {
            ViewerState::Ready => {
                self.repaginate_if_stale();
            }
            // The widget still holds the previous chapter's pages.
            ViewerState::NotReady if !paginated => self.remount(),
            _ => {}
        }
    }

    /// Recompute fragments when the chapter, size or style changed since
    /// the last run. Returns true when the widget was rebuilt.
    fn repaginate_if_stale(&mut self) -> bool {
        let Some(chapter) = self.chapter.clone() else {
            return false;
        };
        let fresh = self
            .key
            .as_ref()
            .is_some_and(|key| key.matches(&chapter, &self.dimensions, &self.style));
        if fresh {
            return false;
        }

        let width = self.dimensions.content_width();
        let budget = self.dimensions.content_budget();
        match self
            .paginator
            .paginate(&TerminalLayout, &chapter.content, budget, width, &self.style)
        {
            Ok(fragments) => {
                info!(
                    "Chapter {} split into {} pages ({width}x{budget})",
                    chapter.id,
                    fragments.len()
                );
                self.fragments = fragments;
                self.key = Some(PaginationKey {
                    chapter_id: chapter.id,
                    content: chapter,
                    width,
                    budget,
                    style: self.style,
                });
                self.remount();
                true
            }
            Err(e) => {
                self.fail(format!("Unable to lay out the chapter: {e}"));
                true
            }
        }
    }

    fn fail(&mut self, message: String) {
        error!("Flipbook error: {message}");
        if let Some(widget) = self.widget.as_mut() {
            widget.destroy();
        }
        self.widget = None;
        self.state = ViewerState::Error(message);
    }

    pub fn retry(&mut self) {
        if !matches!(self.state, ViewerState::Error(_)) {
            return;
        }
        info!("Retrying flipbook render");
        self.key = None;
        self.fragments.clear();
        self.open_first_page = self.chapter.is_some();
        self.state = ViewerState::NotReady;
        self.remount();
    }

    /// Terminal resize. Applied after the debounce delay.
    pub fn handle_resize(&mut self, viewport: Rect, now: Instant) {
        if !self.tracking_resize {
            return;
        }
        self.pending_resize = Some(PendingResize { viewport, at: now });
    }

    /// Sidebar collapse or expand: apply the new viewport immediately.
    pub fn set_collapsed(&mut self, collapsed: bool, viewport: Rect) {
        if self.collapsed == collapsed {
            return;
        }
        self.collapsed = collapsed;
        self.pending_resize = None;
        self.apply_viewport(viewport, true);
    }

    /// Apply a debounced resize whose delay has elapsed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(pending) = self.pending_resize else {
            return false;
        };
        if now.duration_since(pending.at) < self.debounce {
            return false;
        }
        self.pending_resize = None;
        self.apply_viewport(pending.viewport, false);
        true
    }

    fn apply_viewport(&mut self, viewport: Rect, force_remount: bool) {
        if self.state == ViewerState::Unmounted {
            return;
        }
        self.viewport = viewport;
        let dimensions = Dimensions::compute_with_banner(viewport, self.banner);
        if dimensions == self.dimensions && !force_remount {
            return;
        }
        debug!(
            "Book dimensions {:?} -> {:?}",
            self.dimensions, dimensions
        );
        self.dimensions = dimensions;
        if matches!(self.state, ViewerState::Error(_)) {
            return;
        }
        // Keep the reader on the page they were on, rounded into the new layout.
        let previous_page = self.current_page();
        if !(self.state == ViewerState::Ready && self.repaginate_if_stale()) {
            self.remount();
        }
        self.restore_page(previous_page);
    }

    fn restore_page(&mut self, page: Option<usize>) {
        if let (Some(page), Some(widget)) = (page, self.widget.as_mut()) {
            let target = page.min(widget.page_count().saturating_sub(1));
            if widget.flip(target).is_err() {
                warn!("Could not restore page {target} after relayout");
            }
        }
    }

    /// Show or hide the warning row above the book. The pages give up
    /// that row, so a ready book is repaginated in place.
    pub fn set_banner(&mut self, shown: bool) {
        if self.banner == shown {
            return;
        }
        self.banner = shown;
        self.dimensions = Dimensions::compute_with_banner(self.viewport, shown);
        if self.state != ViewerState::Ready {
            return;
        }
        let previous_page = self.current_page();
        if self.repaginate_if_stale() {
            self.restore_page(previous_page);
        }
    }

    pub fn next_page(&mut self) -> bool {
        self.is_ready() && self.widget.as_mut().is_some_and(PageFlip::flip_next)
    }

    pub fn prev_page(&mut self) -> bool {
        self.is_ready() && self.widget.as_mut().is_some_and(PageFlip::flip_prev)
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, state: &UiState, palette: &Palette) {
        if self.state == ViewerState::Unmounted {
            return;
        }
        if let ViewerState::Error(message) = &self.state {
            render_render_error(f, area, message, palette);
            return;
        }
        if state.is_loading {
            render_loading(f, area, palette);
            self.settle_hidden_widget();
            return;
        }
        let Some(chapter) = self.chapter.clone() else {
            match &state.error {
                Some(error) => render_fetch_error(f, area, error, palette),
                None => render_welcome(f, area, palette),
            }
            self.settle_hidden_widget();
            return;
        };

        self.set_banner(state.error.is_some());
        let book_area = self.dimensions.book_area(area);
        if let Some(error) = &state.error {
            let banner = Rect { height: 1, ..area };
            f.render_widget(
                Paragraph::new(Span::styled(
                    format!("⚠ {error} (r to retry)"),
                    Style::default().fg(palette.danger),
                ))
                .alignment(Alignment::Center),
                banner,
            );
        }

        let page_width = self.dimensions.page_width;
        let event = self.widget.as_mut().and_then(|widget| {
            widget.render(f, book_area, page_width, Some(chapter.as_ref()), &self.style, palette)
        });

        if let Some(widget) = &self.widget {
            let footer = Rect {
                y: area.bottom().saturating_sub(1),
                height: 1,
                ..area
            };
            let visible = widget.visible();
            let pages = visible
                .iter()
                .map(|i| (i + 1).to_string())
                .collect::<Vec<_>>()
                .join("-");
            f.render_widget(
                Paragraph::new(Span::styled(
                    format!("← h  Page {pages} / {}  l →", widget.page_count()),
                    Style::default().fg(palette.text_dim),
                ))
                .alignment(Alignment::Center),
                footer,
            );
        }

        if event == Some(FlipEvent::Initialized) {
            self.on_widget_init();
        }
    }
}

fn centered_card(f: &mut Frame, area: Rect, lines: Vec<Line<'static>>, border: ratatui::style::Color) {
    let height = (lines.len() as u16 + 4).min(area.height);
    let width = area.width.min(64);
    let card = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        card,
    );
}

fn render_loading(f: &mut Frame, area: Rect, palette: &Palette) {
    let lines = vec![
        Line::from("⏳"),
        Line::from(Span::styled(
            "Loading content...",
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Please wait a moment",
            Style::default().fg(palette.text_dim),
        )),
    ];
    centered_card(f, area, lines, palette.border_dim);
}

fn render_fetch_error(f: &mut Frame, area: Rect, error: &str, palette: &Palette) {
    let lines = vec![
        Line::from("⚠️"),
        Line::from(Span::styled(
            "Something went wrong",
            Style::default().fg(palette.danger).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(error.to_string(), Style::default().fg(palette.text))),
        Line::from(Span::styled(
            "Press r to try again",
            Style::default().fg(palette.text_dim),
        )),
    ];
    centered_card(f, area, lines, palette.danger);
}

fn render_render_error(f: &mut Frame, area: Rect, message: &str, palette: &Palette) {
    let lines = vec![
        Line::from(Span::styled(
            "Something went wrong",
            Style::default().fg(palette.danger).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(message.to_string(), Style::default().fg(palette.text))),
        Line::from(Span::styled(
            "Press r to retry",
            Style::default().fg(palette.text_dim),
        )),
    ];
    centered_card(f, area, lines, palette.danger);
}

fn render_welcome(f: &mut Frame, area: Rect, palette: &Palette) {
    let lines = vec![
        Line::from("👋"),
        Line::from(Span::styled(
            "Welcome to the handbook!",
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Pick an entry in the Contents panel to start reading.",
            Style::default().fg(palette.text),
        )),
    ];
    centered_card(f, area, lines, palette.border_dim);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapter::SectionPage;
    use crate::menu::MenuNode;
    use crate::test_utils::fake_api::long_article;

    fn viewer() -> FlipbookViewer {
        FlipbookViewer::new(Paginator::default(), PageStyle::default(), DEFAULT_RESIZE_DEBOUNCE)
    }

    fn chapter(id: i64, content: &str) -> Arc<Chapter> {
        Arc::new(Chapter::from_section(
            &MenuNode::leaf(id, format!("Chapter {id}")),
            &SectionPage {
                index: 1,
                content: content.to_string(),
                media: vec![],
            },
        ))
    }

    fn mounted(width: u16, height: u16) -> FlipbookViewer {
        let mut viewer = viewer();
        viewer.mount(Rect::new(0, 0, width, height), &UiState::default());
        viewer
    }

    #[test]
    fn test_mount_starts_not_ready_with_first_token() {
        let mut viewer = mounted(100, 30);
        assert_eq!(viewer.state(), &ViewerState::NotReady);
        assert_eq!(viewer.remount_token(), 1);
        assert!(viewer.is_tracking_resize());
        viewer.on_widget_init();
        assert!(viewer.is_ready());
    }

    #[test]
    fn test_chapter_while_ready_paginates_and_opens_first_page() {
        let mut viewer = mounted(60, 20);
        viewer.on_widget_init();
        viewer.set_chapter(Some(chapter(1, &long_article(12))));
        assert!(viewer.fragments().len() > 1);
        assert_eq!(viewer.remount_token(), 2);
        assert_eq!(viewer.state(), &ViewerState::NotReady);

        viewer.on_widget_init();
        assert!(viewer.is_ready());
        assert_eq!(viewer.current_page(), Some(1));
        let widget = viewer.widget().unwrap();
        assert_eq!(widget.page_count(), viewer.fragments().len() + 1);
    }

    #[test]
    fn test_chapter_while_not_ready_is_paginated_on_init() {
        let mut viewer = mounted(60, 20);
        viewer.set_chapter(Some(chapter(1, "<p>short</p>")));
        assert!(viewer.fragments().is_empty());

        viewer.on_widget_init();
        assert_eq!(viewer.fragments(), &["<p>short</p>".to_string()]);
        viewer.on_widget_init();
        assert_eq!(viewer.current_page(), Some(1));
    }

    #[test]
    fn test_same_chapter_twice_does_not_remount() {
        let mut viewer = mounted(60, 20);
        viewer.on_widget_init();
        let current = chapter(1, "<p>a</p>");
        viewer.set_chapter(Some(current.clone()));
        let token = viewer.remount_token();
        viewer.set_chapter(Some(current));
        assert_eq!(viewer.remount_token(), token);
    }

    #[test]
    fn test_resize_is_debounced() {
        let mut viewer = mounted(100, 30);
        viewer.on_widget_init();
        viewer.set_chapter(Some(chapter(1, &long_article(12))));
        viewer.on_widget_init();
        let before = viewer.fragments().len();
        let token = viewer.remount_token();

        let start = Instant::now();
        viewer.handle_resize(Rect::new(0, 0, 50, 30), start);
        viewer.handle_resize(Rect::new(0, 0, 40, 30), start + Duration::from_millis(100));
        assert!(!viewer.tick(start + Duration::from_millis(200)));
        assert_eq!(viewer.remount_token(), token);

        assert!(viewer.tick(start + Duration::from_millis(260)));
        assert_eq!(viewer.dimensions().page_width, 40);
        assert!(viewer.fragments().len() > before);
        assert_eq!(viewer.remount_token(), token + 1);
    }

    #[test]
    fn test_collapse_applies_immediately() {
        let mut viewer = mounted(100, 30);
        viewer.on_widget_init();
        let token = viewer.remount_token();
        viewer.set_collapsed(true, Rect::new(0, 0, 130, 30));
        assert_eq!(viewer.remount_token(), token + 1);
        assert!(viewer.dimensions().spread);
        viewer.set_collapsed(true, Rect::new(0, 0, 130, 30));
        assert_eq!(viewer.remount_token(), token + 1);
    }

    #[test]
    fn test_pagination_failure_enters_error_and_retry_recovers() {
        let mut viewer = mounted(2, 20);
        viewer.on_widget_init();
        viewer.set_chapter(Some(chapter(1, "<p>text</p>")));
        assert!(matches!(viewer.state(), ViewerState::Error(_)));
        assert!(viewer.widget().is_none());

        viewer.set_collapsed(true, Rect::new(0, 0, 60, 20));
        viewer.retry();
        assert_eq!(viewer.state(), &ViewerState::NotReady);
        viewer.on_widget_init();
        viewer.on_widget_init();
        assert!(viewer.is_ready());
        assert_eq!(viewer.fragments().len(), 1);
        assert_eq!(viewer.current_page(), Some(1));
    }

    #[test]
    fn test_empty_content_uses_fallback_page() {
        let mut viewer = mounted(60, 20);
        viewer.on_widget_init();
        viewer.set_chapter(Some(chapter(1, "")));
        viewer.on_widget_init();
        let widget = viewer.widget().unwrap();
        assert_eq!(widget.pages(), &[Page::Cover, Page::Fallback(String::new())]);
        assert_eq!(viewer.current_page(), Some(1));
    }

    #[test]
    fn test_unmount_destroys_widget_and_stops_tracking() {
        let mut viewer = mounted(60, 20);
        viewer.unmount();
        assert_eq!(viewer.state(), &ViewerState::Unmounted);
        assert!(viewer.widget().is_none());
        assert!(!viewer.is_tracking_resize());
        viewer.handle_resize(Rect::new(0, 0, 10, 10), Instant::now());
        assert!(!viewer.has_pending_resize());
    }

    #[test]
    fn test_status_screens_bring_widget_up() {
        use crate::theme::HANDBOOK;
        use ratatui::{Terminal, backend::TestBackend};

        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        let mut viewer = mounted(60, 20);
        let state = UiState::default();
        terminal
            .draw(|f| viewer.render(f, f.area(), &state, &HANDBOOK))
            .unwrap();
        assert!(viewer.is_ready());

        let current = chapter(1, &long_article(12));
        viewer.set_chapter(Some(current.clone()));
        assert_eq!(viewer.state(), &ViewerState::NotReady);
        let state = UiState {
            selected_chapter: Some(current),
            ..UiState::default()
        };
        terminal
            .draw(|f| viewer.render(f, f.area(), &state, &HANDBOOK))
            .unwrap();
        assert!(viewer.is_ready());
        assert_eq!(viewer.current_page(), Some(1));
    }

    #[test]
    fn test_chapter_arriving_during_relayout_replaces_old_pages() {
        use crate::test_utils::test_helpers::{capture_terminal_state, create_test_terminal};
        use crate::theme::HANDBOOK;

        let mut viewer = mounted(60, 20);
        viewer.on_widget_init();
        viewer.set_chapter(Some(chapter(1, "<p>ALPHA CONTENT</p>")));
        viewer.on_widget_init();
        assert_eq!(viewer.current_page(), Some(1));

        let start = Instant::now();
        let narrow = Rect::new(0, 0, 50, 20);
        viewer.handle_resize(narrow, start);
        assert!(viewer.tick(start + Duration::from_millis(200)));
        assert_eq!(viewer.state(), &ViewerState::NotReady);

        let next = chapter(2, "<p>BRAVO CONTENT</p>");
        viewer.set_chapter(Some(next.clone()));
        assert!(viewer.fragments().is_empty());
        assert_eq!(viewer.current_page(), Some(0));

        let state = UiState {
            selected_chapter: Some(next),
            ..UiState::default()
        };
        let mut terminal = create_test_terminal(60, 20);
        let mut screen = String::new();
        for _ in 0..3 {
            terminal
                .draw(|f| viewer.render(f, narrow, &state, &HANDBOOK))
                .unwrap();
            screen = capture_terminal_state(&terminal);
            assert!(!screen.contains("ALPHA CONTENT"), "{screen}");
        }
        assert!(viewer.is_ready());
        assert!(screen.contains("BRAVO CONTENT"), "{screen}");
    }

    #[test]
    fn test_error_banner_keeps_every_line_on_some_page() {
        use crate::test_utils::test_helpers::{capture_terminal_state, create_test_terminal};
        use crate::theme::HANDBOOK;

        let mut viewer =
            FlipbookViewer::new(Paginator::new(0), PageStyle::default(), DEFAULT_RESIZE_DEBOUNCE);
        let area = Rect::new(0, 0, 60, 20);
        viewer.mount(area, &UiState::default());
        viewer.on_widget_init();
        let content: String = (1..=20)
            .map(|i| format!("<p>L{i:02}<br>M{i:02}</p>"))
            .collect();
        let current = chapter(1, &content);
        viewer.set_chapter(Some(current.clone()));
        let plain_budget = viewer.dimensions().content_budget();

        let state = UiState {
            selected_chapter: Some(current),
            error: Some("Offline".to_string()),
            ..UiState::default()
        };
        let mut terminal = create_test_terminal(60, 20);
        for _ in 0..2 {
            terminal.draw(|f| viewer.render(f, area, &state, &HANDBOOK)).unwrap();
        }
        assert!(viewer.dimensions().banner);
        assert_eq!(viewer.dimensions().content_budget(), plain_budget - 1);
        assert_eq!(viewer.current_page(), Some(1));

        let mut seen = String::new();
        for _ in 0..40 {
            terminal.draw(|f| viewer.render(f, area, &state, &HANDBOOK)).unwrap();
            let screen = capture_terminal_state(&terminal);
            assert!(screen.lines().next().unwrap_or("").contains("Offline"));
            seen.push_str(&screen);
            if !viewer.next_page() {
                break;
            }
        }
        for i in 1..=20 {
            assert!(seen.contains(&format!("L{i:02}")), "L{i:02} missing");
            assert!(seen.contains(&format!("M{i:02}")), "M{i:02} missing");
        }
    }

    #[test]
    fn test_banner_toggle_repaginates_ready_book() {
        let mut viewer = mounted(60, 20);
        viewer.on_widget_init();
        viewer.set_chapter(Some(chapter(1, &long_article(12))));
        viewer.on_widget_init();
        assert!(viewer.next_page());
        let token = viewer.remount_token();

        viewer.set_banner(true);
        assert_eq!(viewer.remount_token(), token + 1);
        assert_eq!(viewer.current_page(), Some(2));
        viewer.set_banner(true);
        assert_eq!(viewer.remount_token(), token + 1);
    }

    #[test]
    fn test_navigation_only_when_ready() {
        let mut viewer = mounted(60, 20);
        viewer.set_chapter(Some(chapter(1, &long_article(12))));
        assert!(!viewer.next_page());
        viewer.on_widget_init();
        viewer.on_widget_init();
        assert!(viewer.next_page());
        assert_eq!(viewer.current_page(), Some(2));
        assert!(viewer.prev_page());
        assert!(viewer.prev_page());
        assert_eq!(viewer.current_page(), Some(0));
    }
}
