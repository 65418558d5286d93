pub mod form;

pub use form::{CategoryForm, FormAction, FormField, FormMode, ValidationError};

use crate::api::ApiError;
use crate::loader::{Request, RequestSink, Response, Ticket};
use crate::menu::{MenuIndex, MenuNode, flatten_with_depth};
use crate::theme::Palette;
use crossterm::event::{KeyCode, KeyEvent};
use log::{debug, info, warn};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use std::collections::HashSet;

pub const LOAD_ERROR: &str = "Unable to load categories";
pub const CREATE_ERROR: &str = "Unable to add category";
pub const UPDATE_ERROR: &str = "Unable to update category";
pub const DELETE_ERROR: &str = "Unable to delete category";
pub const EDIT_LOAD_ERROR: &str = "Unable to load content for editing";

#[derive(Debug, Clone, PartialEq)]
enum Operation {
    LoadForEdit(MenuNode),
    Create,
    Update,
    Delete,
}

impl Operation {
    fn failure_message(&self) -> &'static str {
        match self {
            Operation::LoadForEdit(_) => EDIT_LOAD_ERROR,
            Operation::Create => CREATE_ERROR,
            Operation::Update => UPDATE_ERROR,
            Operation::Delete => DELETE_ERROR,
        }
    }
}

enum Overlay {
    None,
    Form(Box<CategoryForm>),
    ConfirmDelete { id: i64, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminEvent {
    None,
    /// A fresh menu arrived; the reader should pick it up too.
    MenuLoaded,
    Failed,
    Discarded,
    /// Leave the admin screen.
    Close,
}

/// Categories is the collapsible tree. Articles lists every section flat
/// with its parent beside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminView {
    #[default]
    Categories,
    Articles,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminRow {
    pub id: i64,
    pub name: String,
    pub index: i64,
    pub depth: usize,
    pub has_children: bool,
    pub is_expanded: bool,
    /// Name of the parent category, `None` at the top level.
    pub parent: Option<String>,
}

/// Category manager: the menu tree with add, edit and delete.
pub struct AdminPanel {
    menu: Vec<MenuNode>,
    index: MenuIndex,
    expanded: HashSet<i64>,
    view: AdminView,
    list_state: ListState,
    selected_row: usize,
    overlay: Overlay,
    menu_ticket: Option<Ticket>,
    operation: Option<(Ticket, Operation)>,
    error: Option<String>,
}

impl Default for AdminPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminPanel {
    pub fn new() -> Self {
        Self {
            menu: Vec::new(),
            index: MenuIndex::default(),
            expanded: HashSet::new(),
            view: AdminView::default(),
            list_state: ListState::default(),
            selected_row: 0,
            overlay: Overlay::None,
            menu_ticket: None,
            operation: None,
            error: None,
        }
    }

    pub fn menu(&self) -> &[MenuNode] {
        &self.menu
    }

    pub fn view(&self) -> AdminView {
        self.view
    }

    /// Switch between the tree and the flat list, keeping the selected
    /// section when the other view shows it.
    pub fn toggle_view(&mut self) {
        let selected = self.selected_id();
        self.view = match self.view {
            AdminView::Categories => AdminView::Articles,
            AdminView::Articles => AdminView::Categories,
        };
        if !selected.is_some_and(|id| self.select(id)) {
            self.selected_row = 0;
            let total = self.visible_rows().len();
            self.list_state.select((total > 0).then_some(0));
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.menu_ticket.is_some() || self.operation.is_some()
    }

    pub fn form(&self) -> Option<&CategoryForm> {
        match &self.overlay {
            Overlay::Form(form) => Some(form.as_ref()),
            _ => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut CategoryForm> {
        match &mut self.overlay {
            Overlay::Form(form) => Some(form.as_mut()),
            _ => None,
        }
    }

    pub fn pending_delete(&self) -> Option<i64> {
        match &self.overlay {
            Overlay::ConfirmDelete { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Whether `ticket` belongs to a request this panel issued.
    pub fn owns(&self, ticket: Ticket) -> bool {
        self.menu_ticket == Some(ticket) || self.operation.as_ref().is_some_and(|(t, _)| *t == ticket)
    }

    /// Use a menu fetched elsewhere without issuing a request.
    pub fn set_menu(&mut self, menu: Vec<MenuNode>) {
        self.index = MenuIndex::build(&menu);
        self.menu = menu;
        self.expanded.retain(|id| self.index.get(*id).is_some());
        let total = self.visible_rows().len();
        self.selected_row = self.selected_row.min(total.saturating_sub(1));
        self.list_state.select((total > 0).then_some(self.selected_row));
    }

    pub fn refresh(&mut self, sink: &mut dyn RequestSink) {
        self.error = None;
        self.menu_ticket = Some(sink.submit(Request::Menu));
    }

    pub fn toggle(&mut self, id: i64) {
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
    }

    pub fn is_expanded(&self, id: i64) -> bool {
        self.expanded.contains(&id)
    }

    pub fn visible_rows(&self) -> Vec<AdminRow> {
        match self.view {
            AdminView::Categories => {
                let mut rows = Vec::new();
                self.collect_rows(&self.menu, 0, &mut rows);
                rows
            }
            AdminView::Articles => flatten_with_depth(&self.menu)
                .iter()
                .map(|flat| AdminRow {
                    id: flat.node.id,
                    name: flat.node.name.clone(),
                    index: flat.node.index,
                    depth: 0,
                    has_children: flat.node.has_children(),
                    is_expanded: false,
                    parent: self.parent_name(flat.node.id),
                })
                .collect(),
        }
    }

    fn parent_id(&self, id: i64) -> Option<i64> {
        self.index.get(id).and_then(|node| node.parent_id)
    }

    fn parent_name(&self, id: i64) -> Option<String> {
        let parent = self.parent_id(id)?;
        self.index.get(parent).map(|node| node.name.clone())
    }

    fn collect_rows(&self, items: &[MenuNode], depth: usize, rows: &mut Vec<AdminRow>) {
        for item in items {
            let is_expanded = item.has_children() && self.expanded.contains(&item.id);
            rows.push(AdminRow {
                id: item.id,
                name: item.name.clone(),
                index: item.index,
                depth,
                has_children: item.has_children(),
                is_expanded,
                parent: self.parent_name(item.id),
            });
            if is_expanded {
                self.collect_rows(&item.children, depth + 1, rows);
            }
        }
    }

    pub fn selected_id(&self) -> Option<i64> {
        self.visible_rows().get(self.selected_row).map(|row| row.id)
    }

    pub fn select(&mut self, id: i64) -> bool {
        match self.visible_rows().iter().position(|row| row.id == id) {
            Some(row) => {
                self.selected_row = row;
                self.list_state.select(Some(row));
                true
            }
            None => false,
        }
    }

    fn move_selection(&mut self, down: bool) {
        let total = self.visible_rows().len();
        if total == 0 {
            return;
        }
        self.selected_row = if down {
            (self.selected_row + 1).min(total - 1)
        } else {
            self.selected_row.saturating_sub(1)
        };
        self.list_state.select(Some(self.selected_row));
    }

    fn find_node(&self, id: i64) -> Option<MenuNode> {
        self.index.locate(&self.menu, id).cloned()
    }

    pub fn begin_add(&mut self, parent_id: Option<i64>) {
        self.overlay = Overlay::Form(Box::new(CategoryForm::create(&self.menu, parent_id)));
    }

    /// Fetch the section's pages; the form opens when they arrive.
    pub fn begin_edit(&mut self, id: i64, sink: &mut dyn RequestSink) {
        let Some(node) = self.find_node(id) else {
            warn!("Edit requested for unknown category {id}");
            return;
        };
        self.error = None;
        let ticket = sink.submit(Request::SectionPages { section_id: id });
        self.operation = Some((ticket, Operation::LoadForEdit(node)));
    }

    pub fn begin_delete(&mut self, id: i64) {
        if let Some(node) = self.find_node(id) {
            self.overlay = Overlay::ConfirmDelete {
                id,
                name: node.name,
            };
        }
    }

    pub fn confirm_delete(&mut self, sink: &mut dyn RequestSink) {
        let Overlay::ConfirmDelete { id, name } = std::mem::replace(&mut self.overlay, Overlay::None) else {
            return;
        };
        info!("Deleting category {id} ({name})");
        self.error = None;
        let ticket = sink.submit(Request::Delete { section_id: id });
        self.operation = Some((ticket, Operation::Delete));
    }

    pub fn cancel_overlay(&mut self) {
        self.overlay = Overlay::None;
    }

    /// Validate the open form and send it. Invalid input keeps the form
    /// open with the problem shown and sends nothing.
    pub fn submit_form(&mut self, sink: &mut dyn RequestSink) -> Result<Ticket, ValidationError> {
        let Overlay::Form(form) = &mut self.overlay else {
            return Err(ValidationError::EmptyName);
        };
        let payload = form.validate()?;
        self.error = None;
        let (request, operation) = match form.mode() {
            FormMode::Create => (Request::Create(payload), Operation::Create),
            FormMode::Edit { section_id } => (
                Request::Update {
                    section_id,
                    payload,
                },
                Operation::Update,
            ),
        };
        let ticket = sink.submit(request);
        self.operation = Some((ticket, operation));
        Ok(ticket)
    }

    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<Response, ApiError>,
        sink: &mut dyn RequestSink,
    ) -> AdminEvent {
        if self.menu_ticket == Some(ticket) {
            self.menu_ticket = None;
            return match result {
                Ok(response) => {
                    self.set_menu(response.into_menu());
                    AdminEvent::MenuLoaded
                }
                Err(e) => {
                    warn!("Category list failed to load: {e}");
                    self.error = Some(LOAD_ERROR.to_string());
                    AdminEvent::Failed
                }
            };
        }

        let operation = match self.operation.take() {
            Some((pending, operation)) if pending == ticket => operation,
            other => {
                self.operation = other;
                debug!("Admin ignoring ticket {}", ticket.0);
                return AdminEvent::Discarded;
            }
        };

        match (operation, result) {
            (Operation::LoadForEdit(node), Ok(response)) => {
                let pages = response.into_pages();
                let parent_id = self.parent_id(node.id);
                self.overlay = Overlay::Form(Box::new(CategoryForm::edit(
                    &self.menu,
                    &node,
                    parent_id,
                    pages.first(),
                )));
                AdminEvent::None
            }
            (operation, Ok(_)) => {
                info!("Category {operation:?} succeeded, reloading menu");
                if matches!(operation, Operation::Create | Operation::Update) {
                    self.overlay = Overlay::None;
                }
                self.refresh(sink);
                AdminEvent::None
            }
            (operation, Err(e)) => {
                warn!("Category {operation:?} failed: {e}");
                self.error = Some(operation.failure_message().to_string());
                AdminEvent::Failed
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, sink: &mut dyn RequestSink) -> AdminEvent {
        match &mut self.overlay {
            Overlay::Form(form) => {
                match form.handle_key(key) {
                    FormAction::Cancel => self.overlay = Overlay::None,
                    FormAction::Submit => {
                        if let Err(e) = self.submit_form(sink) {
                            debug!("Form rejected: {e}");
                        }
                    }
                    FormAction::None => {}
                }
                return AdminEvent::None;
            }
            Overlay::ConfirmDelete { .. } => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Enter => self.confirm_delete(sink),
                    _ => self.overlay = Overlay::None,
                }
                return AdminEvent::None;
            }
            Overlay::None => {}
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return AdminEvent::Close,
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(true),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(false),
            KeyCode::Char('v') => self.toggle_view(),
            KeyCode::Enter if self.view == AdminView::Articles => {
                if let Some(id) = self.selected_id() {
                    self.begin_edit(id, sink);
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(id) = self.selected_id() {
                    self.toggle(id);
                }
            }
            KeyCode::Char('a') => self.begin_add(None),
            KeyCode::Char('c') => {
                if let Some(id) = self.selected_id() {
                    self.begin_add(Some(id));
                }
            }
            KeyCode::Char('e') => {
                if let Some(id) = self.selected_id() {
                    self.begin_edit(id, sink);
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_id() {
                    self.begin_delete(id);
                }
            }
            KeyCode::Char('R') => self.refresh(sink),
            _ => {}
        }
        AdminEvent::None
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, palette: &Palette) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        let status = if let Some(error) = &self.error {
            Span::styled(error.clone(), Style::default().fg(palette.danger))
        } else if self.is_loading() {
            Span::styled("Loading...", Style::default().fg(palette.text_dim))
        } else {
            Span::raw("")
        };
        f.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(
                    "Menu management",
                    Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
                )),
                Line::from(status),
            ]),
            chunks[0],
        );

        let title = match self.view {
            AdminView::Categories => " Categories ",
            AdminView::Articles => " Articles ",
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(palette.border));
        let view = self.view;
        let rows = self.visible_rows();
        if rows.is_empty() {
            f.render_widget(
                Paragraph::new(Span::styled(
                    "No categories yet.",
                    Style::default().fg(palette.text_dim),
                ))
                .block(block),
                chunks[1],
            );
        } else {
            let items: Vec<ListItem> = rows
                .iter()
                .map(|row| {
                    let marker = match (view, row.has_children, row.is_expanded) {
                        (AdminView::Articles, ..) => "  ",
                        (_, true, true) => "▼ ",
                        (_, true, false) => "▶ ",
                        _ => "  ",
                    };
                    let name_style = if row.depth == 0 {
                        Style::default().fg(palette.text).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(palette.text)
                    };
                    let mut spans = vec![
                        Span::raw("  ".repeat(row.depth)),
                        Span::styled(marker, Style::default().fg(palette.text_dim)),
                        Span::styled(row.name.clone(), name_style),
                    ];
                    if view == AdminView::Articles {
                        let parent = row.parent.as_deref().unwrap_or("(top level)");
                        spans.push(Span::styled(
                            format!("  in: {parent}"),
                            Style::default().fg(palette.accent_soft),
                        ));
                    }
                    spans.push(Span::styled(format!("  ID:{}", row.id), Style::default().fg(palette.text_dim)));
                    spans.push(Span::styled(format!(" [{}]", row.index), Style::default().fg(palette.border_dim)));
                    ListItem::new(Line::from(spans))
                })
                .collect();
            let (bg, fg) = palette.get_selection_colors(true);
            let list = List::new(items)
                .block(block)
                .highlight_style(Style::default().bg(bg).fg(fg));
            f.render_stateful_widget(list, chunks[1], &mut self.list_state);
        }

        f.render_widget(
            Paragraph::new(Span::styled(
                "a: add top-level  c: add child  e: edit  d: delete  v: switch view  R: reload  Esc: reader",
                Style::default().fg(palette.text_dim),
            )),
            chunks[2],
        );

        match &mut self.overlay {
            Overlay::Form(form) => form.render(f, area, palette),
            Overlay::ConfirmDelete { name, .. } => {
                let width = area.width.min(50);
                let popup = Rect {
                    x: area.x + (area.width - width) / 2,
                    y: area.y + area.height.saturating_sub(5) / 2,
                    width,
                    height: 5.min(area.height),
                };
                f.render_widget(Clear, popup);
                f.render_widget(
                    Paragraph::new(vec![
                        Line::from(format!("Delete \"{name}\"?")),
                        Line::from(Span::styled(
                            "y: delete  any other key: cancel",
                            Style::default().fg(palette.text_dim),
                        )),
                    ])
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .title(" Confirm ")
                            .border_style(Style::default().fg(palette.danger)),
                    ),
                    popup,
                );
            }
            Overlay::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapter::SectionPage;
    use crate::test_utils::fake_api::sample_menu;

    #[derive(Default)]
    struct RecordingSink {
        submitted: Vec<(Ticket, Request)>,
    }

    impl RecordingSink {
        fn last(&self) -> (Ticket, Request) {
            self.submitted.last().cloned().unwrap()
        }
    }

    impl RequestSink for RecordingSink {
        fn submit(&mut self, request: Request) -> Ticket {
            let ticket = Ticket(self.submitted.len() as u64 + 1);
            self.submitted.push((ticket, request));
            ticket
        }
    }

    fn failure() -> ApiError {
        ApiError::Http {
            status: 500,
            body: String::new(),
        }
    }

    fn loaded() -> (AdminPanel, RecordingSink) {
        let mut panel = AdminPanel::new();
        let mut sink = RecordingSink::default();
        panel.refresh(&mut sink);
        let (ticket, _) = sink.last();
        assert_eq!(
            panel.complete(ticket, Ok(Response::Menu(sample_menu())), &mut sink),
            AdminEvent::MenuLoaded
        );
        (panel, sink)
    }

    #[test]
    fn test_menu_load_failure_sets_message() {
        let mut panel = AdminPanel::new();
        let mut sink = RecordingSink::default();
        panel.refresh(&mut sink);
        assert!(panel.is_loading());
        let (ticket, _) = sink.last();
        assert_eq!(panel.complete(ticket, Err(failure()), &mut sink), AdminEvent::Failed);
        assert_eq!(panel.error(), Some(LOAD_ERROR));
        assert!(!panel.is_loading());
    }

    #[test]
    fn test_expansion_is_independent_per_node() {
        let (mut panel, _) = loaded();
        assert_eq!(panel.visible_rows().len(), 3);
        panel.toggle(2);
        panel.toggle(21);
        let ids: Vec<i64> = panel.visible_rows().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 21, 211, 212, 3]);
        assert!(!panel.is_expanded(1));
    }

    #[test]
    fn test_create_flow_refetches_menu() {
        let (mut panel, mut sink) = loaded();
        panel.select(1);
        panel.handle_key(KeyEvent::from(KeyCode::Char('c')), &mut sink);
        let form = panel.form_mut().unwrap();
        assert_eq!(form.selected_parent(), Some(1));
        form.set_text(FormField::Name, "Điều 2a");

        let ticket = panel.submit_form(&mut sink).unwrap();
        let Request::Create(payload) = sink.last().1 else {
            panic!("expected create");
        };
        assert_eq!(payload.parent_id, Some(Some(1)));

        panel.complete(ticket, Ok(Response::Mutated), &mut sink);
        assert!(panel.form().is_none());
        assert_eq!(sink.last().1, Request::Menu);
        assert!(panel.owns(sink.last().0));
    }

    #[test]
    fn test_invalid_form_sends_nothing() {
        let (mut panel, mut sink) = loaded();
        let before = sink.submitted.len();
        panel.begin_add(None);
        assert_eq!(panel.submit_form(&mut sink), Err(ValidationError::EmptyName));
        assert_eq!(sink.submitted.len(), before);
        assert_eq!(panel.form().unwrap().error(), Some(&ValidationError::EmptyName));
    }

    #[test]
    fn test_edit_prefetches_then_updates_with_current_parent() {
        let (mut panel, mut sink) = loaded();
        panel.begin_edit(3, &mut sink);
        let (ticket, request) = sink.last();
        assert_eq!(request, Request::SectionPages { section_id: 3 });
        assert!(panel.form().is_none());

        let pages = vec![SectionPage {
            index: 1,
            content: "<p>appendix</p>".into(),
            media: vec![],
        }];
        panel.complete(
            ticket,
            Ok(Response::SectionPages {
                section_id: 3,
                pages,
            }),
            &mut sink,
        );
        let form = panel.form().unwrap();
        assert_eq!(form.mode(), FormMode::Edit { section_id: 3 });
        assert_eq!(form.text(FormField::Content), "<p>appendix</p>");

        panel.submit_form(&mut sink).unwrap();
        let Request::Update { section_id, payload } = sink.last().1 else {
            panic!("expected update");
        };
        assert_eq!(section_id, 3);
        assert_eq!(payload.parent_id, Some(None));
        assert_eq!(payload.name, "Phụ lục");
    }

    #[test]
    fn test_articles_view_lists_every_section_with_parent() {
        let (mut panel, mut sink) = loaded();
        panel.toggle(2);
        assert!(panel.select(2));
        panel.handle_key(KeyEvent::from(KeyCode::Char('v')), &mut sink);
        assert_eq!(panel.view(), AdminView::Articles);
        assert_eq!(panel.selected_id(), Some(2));

        let rows = panel.visible_rows();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 11, 12, 2, 21, 211, 212, 3]);
        assert!(rows.iter().all(|r| r.depth == 0));
        let article = rows.iter().find(|r| r.id == 212).unwrap();
        assert_eq!(article.parent.as_deref(), Some("Chương 1. Tội phạm công nghệ cao"));
        assert_eq!(rows.last().unwrap().parent, None);

        assert!(panel.select(212));
        let before = sink.submitted.len();
        panel.handle_key(KeyEvent::from(KeyCode::Enter), &mut sink);
        assert_eq!(sink.submitted.len(), before + 1);
        let (ticket, request) = sink.last();
        assert_eq!(request, Request::SectionPages { section_id: 212 });
        panel.complete(
            ticket,
            Ok(Response::SectionPages {
                section_id: 212,
                pages: vec![],
            }),
            &mut sink,
        );
        let form = panel.form().unwrap();
        assert_eq!(form.selected_parent(), Some(21));

        panel.cancel_overlay();
        panel.handle_key(KeyEvent::from(KeyCode::Char('v')), &mut sink);
        assert_eq!(panel.view(), AdminView::Categories);
        // 212 is folded away in the tree.
        assert_eq!(panel.selected_id(), Some(1));
    }

    #[test]
    fn test_edit_load_failure() {
        let (mut panel, mut sink) = loaded();
        panel.begin_edit(11, &mut sink);
        let (ticket, _) = sink.last();
        assert_eq!(panel.complete(ticket, Err(failure()), &mut sink), AdminEvent::Failed);
        assert_eq!(panel.error(), Some(EDIT_LOAD_ERROR));
        assert!(panel.form().is_none());
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let (mut panel, mut sink) = loaded();
        let before = sink.submitted.len();
        panel.select(3);
        panel.handle_key(KeyEvent::from(KeyCode::Char('d')), &mut sink);
        assert_eq!(panel.pending_delete(), Some(3));
        panel.handle_key(KeyEvent::from(KeyCode::Char('n')), &mut sink);
        assert_eq!(panel.pending_delete(), None);
        assert_eq!(sink.submitted.len(), before);

        panel.handle_key(KeyEvent::from(KeyCode::Char('d')), &mut sink);
        panel.handle_key(KeyEvent::from(KeyCode::Char('y')), &mut sink);
        let (ticket, request) = sink.last();
        assert_eq!(request, Request::Delete { section_id: 3 });
        assert_eq!(panel.complete(ticket, Err(failure()), &mut sink), AdminEvent::Failed);
        assert_eq!(panel.error(), Some(DELETE_ERROR));
    }

    #[test]
    fn test_failed_update_keeps_form_open() {
        let (mut panel, mut sink) = loaded();
        panel.begin_edit(12, &mut sink);
        let (ticket, _) = sink.last();
        panel.complete(ticket, Ok(Response::SectionPages { section_id: 12, pages: vec![] }), &mut sink);
        let ticket = panel.submit_form(&mut sink).unwrap();
        assert_eq!(panel.complete(ticket, Err(failure()), &mut sink), AdminEvent::Failed);
        assert_eq!(panel.error(), Some(UPDATE_ERROR));
        assert!(panel.form().is_some());
    }

    #[test]
    fn test_foreign_tickets_are_ignored() {
        let (mut panel, mut sink) = loaded();
        assert!(!panel.owns(Ticket(99)));
        assert_eq!(
            panel.complete(Ticket(99), Ok(Response::Mutated), &mut sink),
            AdminEvent::Discarded
        );
    }
}
