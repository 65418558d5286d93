use crate::api::ApiError;
use crate::chapter::{Chapter, SectionPage};
use crate::loader::{Request, RequestSink, Ticket};
use crate::menu::{MenuIndex, MenuNode, filter_tree, find_path_to_node};
use crate::store::Store;
use crate::theme::Palette;
use crossterm::event::{KeyCode, KeyEvent};
use log::{debug, info, warn};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const FETCH_ERROR_MESSAGE: &str = "Unable to load content. Please try again later.";
pub const COLLAPSED_WIDTH: u16 = 6;
pub const EXPANDED_WIDTH: u16 = 36;

/// One visible line of the table of contents.
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarRow {
    pub id: i64,
    pub name: String,
    pub depth: usize,
    pub has_children: bool,
    pub is_expanded: bool,
}

#[derive(Debug, Clone)]
struct PendingSelection {
    ticket: Ticket,
    node: MenuNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    Selected(i64),
    FellBack(i64),
    Failed(i64),
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarAction {
    None,
    Toggled(i64),
    Requested(Ticket),
    SearchChanged,
}

/// The table of contents panel.
pub struct Sidebar {
    menu: Vec<MenuNode>,
    index: MenuIndex,
    expanded: HashSet<i64>,
    pub list_state: ListState,
    selected_row: usize,
    searching: bool,
    pending: Option<PendingSelection>,
    last_failed: Option<MenuNode>,
    fetched: HashMap<i64, Arc<Chapter>>,
}

impl Default for Sidebar {
    fn default() -> Self {
        Self::new()
    }
}

impl Sidebar {
    pub fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            menu: Vec::new(),
            index: MenuIndex::default(),
            expanded: HashSet::new(),
            list_state,
            selected_row: 0,
            searching: false,
            pending: None,
            last_failed: None,
            fetched: HashMap::new(),
        }
    }

    pub fn menu(&self) -> &[MenuNode] {
        &self.menu
    }

    /// Replace the menu, keeping expansion and revealing the current chapter.
    pub fn set_menu(&mut self, menu: Vec<MenuNode>, store: &Store) {
        self.index = MenuIndex::build(&menu);
        self.menu = menu;
        self.expanded.retain(|id| self.index.get(*id).is_some());
        info!("Menu loaded with {} entries", self.index.len());
        if let Some(chapter) = &store.state().selected_chapter {
            self.expand_path_to(chapter.id);
        }
        self.clamp_selection(store);
    }

    pub fn is_expanded(&self, id: i64) -> bool {
        self.expanded.contains(&id)
    }

    pub fn expanded_ids(&self) -> &HashSet<i64> {
        &self.expanded
    }

    pub fn toggle(&mut self, id: i64) {
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
    }

    /// Expand every ancestor of `id` without collapsing anything else.
    pub fn expand_path_to(&mut self, id: i64) {
        if let Some(path) = find_path_to_node(&self.menu, id) {
            self.expanded.extend(path);
        }
    }

    pub fn is_pending(&self, id: i64) -> bool {
        self.pending.as_ref().is_some_and(|p| p.node.id == id)
    }

    pub fn pending_ticket(&self) -> Option<Ticket> {
        self.pending.as_ref().map(|p| p.ticket)
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    /// Rows in display order. With a query every surviving node is shown.
    pub fn visible_rows(&self, query: &str) -> Vec<SidebarRow> {
        let mut rows = Vec::new();
        if query.trim().is_empty() {
            self.collect_rows(&self.menu, 0, false, &mut rows);
        } else {
            let filtered = filter_tree(&self.menu, query);
            self.collect_rows(&filtered, 0, true, &mut rows);
        }
        rows
    }

    fn collect_rows(&self, items: &[MenuNode], depth: usize, expand_all: bool, rows: &mut Vec<SidebarRow>) {
        for item in items {
            let is_expanded = item.has_children() && (expand_all || self.expanded.contains(&item.id));
            rows.push(SidebarRow {
                id: item.id,
                name: item.name.clone(),
                depth,
                has_children: item.has_children(),
                is_expanded,
            });
            if is_expanded {
                self.collect_rows(&item.children, depth + 1, expand_all, rows);
            }
        }
    }

    pub fn selected_row_id(&self, store: &Store) -> Option<i64> {
        self.visible_rows(&store.state().search_query)
            .get(self.selected_row)
            .map(|row| row.id)
    }

    pub fn move_selection_down(&mut self, store: &Store) {
        let total = self.visible_rows(&store.state().search_query).len();
        if self.selected_row + 1 < total {
            self.selected_row += 1;
            self.list_state.select(Some(self.selected_row));
        }
    }

    pub fn move_selection_up(&mut self) {
        if self.selected_row > 0 {
            self.selected_row -= 1;
            self.list_state.select(Some(self.selected_row));
        }
    }

    pub fn select_row(&mut self, row: usize, store: &Store) {
        self.selected_row = row;
        self.clamp_selection(store);
    }

    fn clamp_selection(&mut self, store: &Store) {
        let total = self.visible_rows(&store.state().search_query).len();
        self.selected_row = self.selected_row.min(total.saturating_sub(1));
        self.list_state.select(Some(self.selected_row));
    }

    fn find_node(&self, id: i64) -> Option<MenuNode> {
        self.index.locate(&self.menu, id).cloned()
    }

    /// Toggle a branch, or start loading a leaf.
    pub fn activate(&mut self, id: i64, store: &mut Store, sink: &mut dyn RequestSink) -> SidebarAction {
        let Some(node) = self.find_node(id) else {
            warn!("Activated unknown menu id {id}");
            return SidebarAction::None;
        };
        if node.has_children() {
            self.toggle(id);
            return SidebarAction::Toggled(id);
        }

        store.set_loading(true);
        store.clear_error();
        let ticket = sink.submit(Request::SectionPages { section_id: id });
        if let Some(previous) = self.pending.replace(PendingSelection { ticket, node }) {
            debug!(
                "Selection of {} superseded by {id} before it finished",
                previous.node.id
            );
        }
        SidebarAction::Requested(ticket)
    }

    pub fn activate_selected(&mut self, store: &mut Store, sink: &mut dyn RequestSink) -> SidebarAction {
        match self.selected_row_id(store) {
            Some(id) => self.activate(id, store, sink),
            None => SidebarAction::None,
        }
    }

    /// Apply the result of a section fetch. Results for anything but the
    /// latest selection are dropped without touching the store.
    pub fn complete_selection(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<SectionPage>, ApiError>,
        store: &mut Store,
    ) -> SelectionOutcome {
        if self.pending_ticket() != Some(ticket) {
            debug!("Discarding stale section result for ticket {}", ticket.0);
            return SelectionOutcome::Stale;
        }
        let Some(PendingSelection { node, .. }) = self.pending.take() else {
            return SelectionOutcome::Stale;
        };

        let outcome = match result {
            Ok(pages) => {
                let first = pages.into_iter().next().unwrap_or_default();
                let chapter = Arc::new(Chapter::from_section(&node, &first));
                self.fetched.insert(node.id, chapter.clone());
                self.last_failed = None;
                store.set_selected_chapter(chapter);
                self.expand_path_to(node.id);
                SelectionOutcome::Selected(node.id)
            }
            Err(e) => {
                warn!("Failed to fetch section {}: {e}", node.id);
                store.set_error(Some(FETCH_ERROR_MESSAGE.to_string()));
                let fallback = Chapter::from_cached_node(&node)
                    .map(Arc::new)
                    .or_else(|| self.fetched.get(&node.id).cloned());
                let id = node.id;
                self.last_failed = Some(node);
                match fallback {
                    Some(chapter) => {
                        store.set_selected_chapter(chapter);
                        self.expand_path_to(id);
                        SelectionOutcome::FellBack(id)
                    }
                    None => SelectionOutcome::Failed(id),
                }
            }
        };
        store.set_loading(false);
        outcome
    }

    /// Re-request the leaf whose last fetch failed.
    pub fn retry(&mut self, store: &mut Store, sink: &mut dyn RequestSink) -> SidebarAction {
        match self.last_failed.take() {
            Some(node) => {
                info!("Retrying section {}", node.id);
                self.activate(node.id, store, sink)
            }
            None => SidebarAction::None,
        }
    }

    pub fn has_failed_selection(&self) -> bool {
        self.last_failed.is_some()
    }

    pub fn start_search(&mut self) {
        self.searching = true;
    }

    /// Keys while the search prompt is open.
    pub fn handle_search_key(&mut self, key: KeyEvent, store: &mut Store) -> SidebarAction {
        let mut query = store.state().search_query.clone();
        match key.code {
            KeyCode::Char(c) => query.push(c),
            KeyCode::Backspace => {
                query.pop();
            }
            KeyCode::Enter => {
                self.searching = false;
                return SidebarAction::None;
            }
            KeyCode::Esc => {
                self.searching = false;
                query.clear();
            }
            _ => return SidebarAction::None,
        }
        if query == store.state().search_query {
            return SidebarAction::None;
        }
        store.set_search_query(query);
        self.selected_row = 0;
        self.list_state.select(Some(0));
        SidebarAction::SearchChanged
    }

    /// Row index under a click, if any.
    pub fn row_at(&self, y: u16, area: Rect, store: &Store) -> Option<usize> {
        let header_rows = if store.state().search_query.is_empty() && !self.searching {
            1
        } else {
            2
        };
        let first_row = area.y + 1 + header_rows;
        if y < first_row || y >= area.y + area.height.saturating_sub(1) {
            return None;
        }
        let row = (y - first_row) as usize + self.list_state.offset();
        let total = self.visible_rows(&store.state().search_query).len();
        (row < total).then_some(row)
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, store: &Store, is_focused: bool, palette: &Palette) {
        let state = store.state();
        let (text_color, border_color) = palette.get_panel_colors(is_focused);

        if state.collapsed {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color));
            f.render_widget(
                Paragraph::new(Line::from(Span::raw("📚"))).block(block),
                area,
            );
            return;
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" 📚 Contents ")
            .border_style(Style::default().fg(border_color))
            .style(Style::default().bg(palette.background));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let mut header = vec![Line::from(Span::styled(
            "Tab: reader  /: search  r: retry",
            Style::default().fg(palette.text_dim),
        ))];
        if self.searching || !state.search_query.is_empty() {
            let cursor = if self.searching { "▏" } else { "" };
            header.push(Line::from(vec![
                Span::styled("Search: ", Style::default().fg(palette.accent)),
                Span::styled(
                    format!("\"{}\"{cursor}", state.search_query),
                    Style::default().fg(text_color),
                ),
            ]));
        }
        let header_height = header.len() as u16;
        f.render_widget(
            Paragraph::new(header),
            Rect {
                height: header_height.min(inner.height),
                ..inner
            },
        );

        let list_area = Rect {
            y: inner.y + header_height,
            height: inner.height.saturating_sub(header_height),
            ..inner
        };

        let rows = self.visible_rows(&state.search_query);
        if self.menu.is_empty() {
            f.render_widget(
                Paragraph::new(Span::styled(
                    "No menu available.",
                    Style::default().fg(palette.text_dim),
                )),
                list_area,
            );
            return;
        }
        if rows.is_empty() {
            f.render_widget(
                Paragraph::new(Span::styled(
                    "No matching entries.",
                    Style::default().fg(palette.text_dim),
                )),
                list_area,
            );
            return;
        }

        let selected_chapter = state.selected_chapter.as_ref().map(|c| c.id);
        let items: Vec<ListItem> = rows
            .iter()
            .map(|row| {
                let indent = "  ".repeat(row.depth + 1);
                let is_selected = selected_chapter == Some(row.id);
                let dimmed = state.is_loading && !row.has_children && !self.is_pending(row.id);
                let mut style = Style::default().fg(if is_selected {
                    palette.accent
                } else if dimmed {
                    palette.text_dim
                } else {
                    text_color
                });
                if is_selected {
                    style = style.add_modifier(Modifier::BOLD);
                }
                let mut spans = vec![Span::styled(format!("{indent}{}", row.name), style)];
                if row.has_children {
                    let marker = if row.is_expanded { " ▼" } else { " ▶" };
                    spans.push(Span::styled(marker, Style::default().fg(palette.text_dim)));
                } else if state.is_loading && self.is_pending(row.id) {
                    spans.push(Span::styled(" ⏳", Style::default().fg(palette.accent)));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let (selection_bg, selection_fg) = palette.get_selection_colors(is_focused);
        let list = List::new(items).highlight_style(Style::default().bg(selection_bg).fg(selection_fg));
        f.render_stateful_widget(list, list_area, &mut self.list_state);
    }
}
