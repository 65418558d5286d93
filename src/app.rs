use crate::api::{ApiError, HandbookApi};
use crate::config::Config;
use crate::inputs::EventSource;
use crate::loader::{Completed, ContentLoader, Request, Response, Ticket};
use crate::notification::NotificationManager;
use crate::store::{Store, StoreEvent};
use crate::theme::{HANDBOOK, Palette};
use crate::widget::admin::{AdminEvent, AdminPanel};
use crate::widget::flipbook::{FlipbookViewer, ViewerState};
use crate::widget::sidebar::{COLLAPSED_WIDTH, EXPANDED_WIDTH, SelectionOutcome, Sidebar};
use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use log::{debug, info, warn};
use ratatui::{
    Frame, Terminal,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub const MENU_ERROR_MESSAGE: &str = "Unable to load the table of contents. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Reader,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPanel {
    Sidebar,
    Reader,
}

/// Split of the reader screen: sidebar, book, help line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderLayout {
    pub sidebar: Rect,
    pub book: Rect,
    pub help: Rect,
}

impl ReaderLayout {
    pub fn compute(area: Rect, collapsed: bool) -> Self {
        let body_height = area.height.saturating_sub(1);
        let wanted = if collapsed { COLLAPSED_WIDTH } else { EXPANDED_WIDTH };
        let sidebar_width = wanted.min(area.width / 2);
        Self {
            sidebar: Rect {
                width: sidebar_width,
                height: body_height,
                ..area
            },
            book: Rect {
                x: area.x + sidebar_width,
                width: area.width - sidebar_width,
                height: body_height,
                ..area
            },
            help: Rect {
                y: area.y + body_height,
                height: area.height.min(1),
                ..area
            },
        }
    }
}

pub struct App<A: HandbookApi> {
    pub store: Store,
    pub sidebar: Sidebar,
    pub viewer: FlipbookViewer,
    pub admin: AdminPanel,
    pub notifications: NotificationManager,
    loader: ContentLoader<A>,
    mode: Mode,
    focus: FocusedPanel,
    menu_ticket: Option<Ticket>,
    menu_failed: bool,
    store_events: Rc<RefCell<VecDeque<StoreEvent>>>,
    screen: Rect,
    palette: &'static Palette,
}

impl<A: HandbookApi> App<A> {
    /// Build the app and start fetching the menu.
    pub fn new(api: A, config: &Config) -> Result<Self, ApiError> {
        let mut store = Store::new();
        let store_events = Rc::new(RefCell::new(VecDeque::new()));
        let queue = store_events.clone();
        store.subscribe(move |event, _| queue.borrow_mut().push_back(event));

        let mut app = Self {
            store,
            sidebar: Sidebar::new(),
            viewer: FlipbookViewer::new(
                config.paginator(),
                config.pagination.style,
                config.resize_debounce(),
            ),
            admin: AdminPanel::new(),
            notifications: NotificationManager::new(),
            loader: ContentLoader::new(api)?,
            mode: Mode::Reader,
            focus: FocusedPanel::Sidebar,
            menu_ticket: None,
            menu_failed: false,
            store_events,
            screen: Rect::default(),
            palette: &*HANDBOOK,
        };
        app.fetch_menu();
        Ok(app)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn focus(&self) -> FocusedPanel {
        self.focus
    }

    pub fn api(&self) -> &A {
        self.loader.api()
    }

    pub fn is_busy(&self) -> bool {
        self.loader.in_flight() > 0
    }

    fn fetch_menu(&mut self) {
        self.menu_failed = false;
        self.menu_ticket = Some(self.loader.submit(Request::Menu));
    }

    fn layout(&self) -> ReaderLayout {
        ReaderLayout::compute(self.screen, self.store.state().collapsed)
    }

    /// Apply every background result that has arrived.
    pub fn poll_background(&mut self) -> bool {
        let completed = self.loader.poll();
        let any = !completed.is_empty();
        for done in completed {
            self.apply_completed(done);
        }
        any
    }

    /// Block until no request is outstanding or `timeout` runs out.
    pub fn settle(&mut self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while self.loader.in_flight() > 0 {
            let now = Instant::now();
            if now >= deadline {
                warn!("{} requests still running after {timeout:?}", self.loader.in_flight());
                break;
            }
            if let Some(done) = self.loader.wait(deadline - now) {
                self.apply_completed(done);
            }
        }
    }

    fn apply_completed(&mut self, done: Completed) {
        let Completed {
            ticket,
            request,
            result,
        } = done;

        if self.admin.owns(ticket) {
            match self.admin.complete(ticket, result, &mut self.loader) {
                AdminEvent::MenuLoaded => {
                    self.sidebar.set_menu(self.admin.menu().to_vec(), &self.store);
                }
                AdminEvent::Failed => {
                    if let Some(error) = self.admin.error() {
                        self.notifications.show_error(error);
                    }
                }
                _ => {}
            }
        } else {
            match request {
                Request::Menu if self.menu_ticket == Some(ticket) => {
                    self.menu_ticket = None;
                    self.apply_menu(result);
                }
                Request::SectionPages { .. } => {
                    let outcome = self.sidebar.complete_selection(
                        ticket,
                        result.map(Response::into_pages),
                        &mut self.store,
                    );
                    if let SelectionOutcome::FellBack(id) = outcome {
                        self.notifications
                            .show_warning(format!("Showing saved content for entry {id}"));
                    }
                }
                other => debug!("Unclaimed result for {other:?} (ticket {})", ticket.0),
            }
        }
        self.sync_store_events();
    }

    fn apply_menu(&mut self, result: Result<Response, ApiError>) {
        match result {
            Ok(response) => {
                let menu = response.into_menu();
                if self.store.state().error.as_deref() == Some(MENU_ERROR_MESSAGE) {
                    self.store.clear_error();
                }
                self.menu_failed = false;
                self.admin.set_menu(menu.clone());
                self.sidebar.set_menu(menu, &self.store);
            }
            Err(e) => {
                warn!("Menu fetch failed: {e}");
                self.menu_failed = true;
                self.store.set_error(Some(MENU_ERROR_MESSAGE.to_string()));
            }
        }
    }

    /// Feed store changes to the viewer.
    fn sync_store_events(&mut self) {
        loop {
            let event = self.store_events.borrow_mut().pop_front();
            let Some(event) = event else {
                break;
            };
            match event {
                StoreEvent::ChapterSelected => {
                    self.viewer.set_chapter(self.store.state().selected_chapter.clone());
                    self.focus = FocusedPanel::Reader;
                }
                StoreEvent::SidebarToggled => {
                    let collapsed = self.store.state().collapsed;
                    self.viewer.set_collapsed(collapsed, self.layout().book);
                }
                StoreEvent::ErrorChanged => {
                    self.viewer.set_banner(self.store.state().error.is_some());
                }
                StoreEvent::LoadingChanged | StoreEvent::SearchChanged => {}
            }
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.viewer.tick(now);
        self.notifications.update(now);
    }

    pub fn handle_resize(&mut self, columns: u16, rows: u16, now: Instant) {
        self.screen = Rect::new(0, 0, columns, rows);
        self.viewer.handle_resize(self.layout().book, now);
    }

    /// Returns true when the app should quit.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        if self.mode == Mode::Admin {
            if self.admin.handle_key(key, &mut self.loader) == AdminEvent::Close {
                info!("Leaving menu management");
                self.mode = Mode::Reader;
            }
            return false;
        }

        if self.focus == FocusedPanel::Sidebar && self.sidebar.is_searching() {
            self.sidebar.handle_search_key(key, &mut self.store);
            self.sync_store_events();
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    FocusedPanel::Sidebar => FocusedPanel::Reader,
                    FocusedPanel::Reader => FocusedPanel::Sidebar,
                };
            }
            KeyCode::Char('b') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.store.toggle_sidebar();
            }
            KeyCode::Char('A') => {
                info!("Entering menu management");
                self.mode = Mode::Admin;
                self.admin.refresh(&mut self.loader);
            }
            KeyCode::Char('r') => self.retry(),
            KeyCode::Right | KeyCode::PageDown => {
                self.viewer.next_page();
            }
            KeyCode::Left | KeyCode::PageUp => {
                self.viewer.prev_page();
            }
            _ => match self.focus {
                FocusedPanel::Sidebar => self.handle_sidebar_key(key),
                FocusedPanel::Reader => self.handle_reader_key(key),
            },
        }
        self.sync_store_events();
        false
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.sidebar.move_selection_down(&self.store),
            KeyCode::Char('k') | KeyCode::Up => self.sidebar.move_selection_up(),
            KeyCode::Enter | KeyCode::Char('l') => {
                self.sidebar.activate_selected(&mut self.store, &mut self.loader);
            }
            KeyCode::Char('/') => self.sidebar.start_search(),
            KeyCode::Esc => self.store.set_search_query(""),
            _ => {}
        }
    }

    fn handle_reader_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('l') | KeyCode::Char(' ') | KeyCode::Char('j') => {
                self.viewer.next_page();
            }
            KeyCode::Char('h') | KeyCode::Char('k') => {
                self.viewer.prev_page();
            }
            KeyCode::Esc => self.focus = FocusedPanel::Sidebar,
            _ => {}
        }
    }

    /// `r`: the viewer first, then the menu, then the last failed entry.
    fn retry(&mut self) {
        if matches!(self.viewer.state(), ViewerState::Error(_)) {
            self.viewer.retry();
        } else if self.menu_failed {
            info!("Retrying menu fetch");
            self.store.clear_error();
            self.fetch_menu();
        } else {
            self.sidebar.retry(&mut self.store, &mut self.loader);
        }
    }

    pub fn handle_mouse_event(&mut self, mouse: MouseEvent) {
        if self.mode != Mode::Reader {
            return;
        }
        let layout = self.layout();
        let in_sidebar = mouse.column >= layout.sidebar.x && mouse.column < layout.sidebar.right();
        match mouse.kind {
            MouseEventKind::Down(_) if in_sidebar => {
                self.focus = FocusedPanel::Sidebar;
                if let Some(row) = self.sidebar.row_at(mouse.row, layout.sidebar, &self.store) {
                    self.sidebar.select_row(row, &self.store);
                    self.sidebar.activate_selected(&mut self.store, &mut self.loader);
                }
            }
            MouseEventKind::Down(_) => {
                self.focus = FocusedPanel::Reader;
                let book = layout.book;
                if mouse.column >= book.x + book.width / 2 {
                    self.viewer.next_page();
                } else {
                    self.viewer.prev_page();
                }
            }
            MouseEventKind::ScrollDown if !in_sidebar => {
                self.viewer.next_page();
            }
            MouseEventKind::ScrollUp if !in_sidebar => {
                self.viewer.prev_page();
            }
            MouseEventKind::ScrollDown => self.sidebar.move_selection_down(&self.store),
            MouseEventKind::ScrollUp => self.sidebar.move_selection_up(),
            _ => {}
        }
        self.sync_store_events();
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let area = f.area();
        self.screen = area;
        if self.mode == Mode::Admin {
            self.admin.render(f, area, self.palette);
            self.notifications.render(f, area, self.palette);
            return;
        }

        let layout = self.layout();
        if self.viewer.state() == &ViewerState::Unmounted {
            self.viewer.mount(layout.book, self.store.state());
        }

        self.sidebar.render(
            f,
            layout.sidebar,
            &self.store,
            self.focus == FocusedPanel::Sidebar,
            self.palette,
        );
        self.viewer.render(f, layout.book, self.store.state(), self.palette);

        let help = match self.focus {
            FocusedPanel::Sidebar => "j/k: move  Enter: open  /: search  Ctrl+B: sidebar  A: manage  q: quit",
            FocusedPanel::Reader => "h/l: turn page  Esc: contents  r: retry  Ctrl+B: sidebar  q: quit",
        };
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                help,
                Style::default().fg(self.palette.text_dim),
            ))),
            layout.help,
        );
        self.notifications.render(f, layout.book, self.palette);
    }

    pub fn unmount(&mut self) {
        self.viewer.unmount();
    }
}

pub fn run_app_with_event_source<A: HandbookApi, B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App<A>,
    event_source: &mut dyn EventSource,
) -> Result<()> {
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();
    let size = terminal.size()?;
    app.screen = Rect::new(0, 0, size.width, size.height);

    loop {
        let mut events_processed = 0;
        let mut should_quit = false;

        let mut background = app.poll_background();

        while event_source.poll(Duration::from_millis(0))? && events_processed < 50 {
            if event_source.settle_before_read() {
                app.settle(Duration::from_secs(5));
                terminal.draw(|f| app.draw(f))?;
            }
            let event = event_source.read()?;
            events_processed += 1;
            match event {
                Event::Key(key) => should_quit = app.handle_key_event(key),
                Event::Mouse(mouse) => app.handle_mouse_event(mouse),
                Event::Resize(columns, rows) => app.handle_resize(columns, rows, Instant::now()),
                _ => {}
            }
            if should_quit {
                break;
            }
        }
        background |= app.poll_background();

        if events_processed > 0 || background || last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| app.draw(f))?;
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick(Instant::now());
            last_tick = Instant::now();
        }

        if should_quit {
            app.unmount();
            return Ok(());
        }

        if events_processed == 0 {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or(Duration::ZERO);
            let _ = event_source.poll(timeout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_layout_follows_collapse() {
        let area = Rect::new(0, 0, 140, 40);
        let open = ReaderLayout::compute(area, false);
        assert_eq!(open.sidebar.width, EXPANDED_WIDTH);
        assert_eq!(open.book.x, EXPANDED_WIDTH);
        assert_eq!(open.book.width, 140 - EXPANDED_WIDTH);
        assert_eq!(open.help.y, 39);

        let closed = ReaderLayout::compute(area, true);
        assert_eq!(closed.sidebar.width, COLLAPSED_WIDTH);
        assert_eq!(closed.book.width, 140 - COLLAPSED_WIDTH);
    }

    #[test]
    fn test_narrow_screen_caps_sidebar() {
        let layout = ReaderLayout::compute(Rect::new(0, 0, 40, 10), false);
        assert_eq!(layout.sidebar.width, 20);
        assert_eq!(layout.book.width, 20);
    }
}
