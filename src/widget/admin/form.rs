use crate::api::SectionPayload;
use crate::chapter::SectionPage;
use crate::inputs::map_keys_to_input;
use crate::menu::{MenuNode, flatten_with_depth, indented_label};
use std::collections::HashSet;
use crate::theme::Palette;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use thiserror::Error;
use tui_textarea::TextArea;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name must not be empty")]
    EmptyName,
    #[error("Index must be a whole number, got '{0}'")]
    InvalidIndex(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { section_id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Index,
    Name,
    Parent,
    Content,
    Media,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentOption {
    pub id: Option<i64>,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    None,
    Submit,
    Cancel,
}

/// Create/edit popup for one category and its first page.
pub struct CategoryForm {
    mode: FormMode,
    index: TextArea<'static>,
    name: TextArea<'static>,
    content: TextArea<'static>,
    media: TextArea<'static>,
    parents: Vec<ParentOption>,
    parent_choice: usize,
    page_index: i64,
    focus: FormField,
    error: Option<ValidationError>,
}

const FIELDS: &[FormField] = &[
    FormField::Index,
    FormField::Name,
    FormField::Parent,
    FormField::Content,
    FormField::Media,
];

fn text_area(text: &str) -> TextArea<'static> {
    let lines: Vec<String> = if text.is_empty() {
        vec![String::new()]
    } else {
        text.lines().map(str::to_string).collect()
    };
    let mut area = TextArea::new(lines);
    area.set_cursor_line_style(Style::default());
    area.move_cursor(tui_textarea::CursorMove::Bottom);
    area.move_cursor(tui_textarea::CursorMove::End);
    area
}

/// Top level first, then every node of `menu` in tree order. `moving` and
/// everything under it are left out, since a node cannot go under itself.
fn parent_options(menu: &[MenuNode], moving: Option<&MenuNode>) -> Vec<ParentOption> {
    let excluded: HashSet<i64> = moving
        .map(|node| {
            flatten_with_depth(std::slice::from_ref(node))
                .iter()
                .map(|flat| flat.node.id)
                .collect()
        })
        .unwrap_or_default();
    let mut parents = vec![ParentOption {
        id: None,
        label: "(top level)".to_string(),
    }];
    parents.extend(
        flatten_with_depth(menu)
            .iter()
            .filter(|flat| !excluded.contains(&flat.node.id))
            .map(|flat| ParentOption {
                id: Some(flat.node.id),
                label: indented_label(flat),
            }),
    );
    parents
}

fn position_of(parents: &[ParentOption], parent_id: Option<i64>) -> usize {
    parents
        .iter()
        .position(|option| option.id == parent_id)
        .unwrap_or(0)
}

impl CategoryForm {
    /// Empty form for a new category under `parent_id` (root when `None`).
    pub fn create(menu: &[MenuNode], parent_id: Option<i64>) -> Self {
        let parents = parent_options(menu, None);
        let parent_choice = position_of(&parents, parent_id);
        Self {
            mode: FormMode::Create,
            index: text_area(""),
            name: text_area(""),
            content: text_area(""),
            media: text_area(""),
            parents,
            parent_choice,
            page_index: 1,
            focus: FormField::Index,
            error: None,
        }
    }

    /// Form pre-filled from `node` and its first fetched page, with
    /// `parent_id` picked as its current parent.
    pub fn edit(
        menu: &[MenuNode],
        node: &MenuNode,
        parent_id: Option<i64>,
        page: Option<&SectionPage>,
    ) -> Self {
        let (content, media, page_index) = match page {
            Some(page) => (page.content.as_str(), page.media.join(","), page.index),
            None => ("", String::new(), 1),
        };
        let parents = parent_options(menu, Some(node));
        let parent_choice = position_of(&parents, parent_id);
        Self {
            mode: FormMode::Edit {
                section_id: node.id,
            },
            index: text_area(&node.index.to_string()),
            name: text_area(&node.name),
            content: text_area(content),
            media: text_area(&media),
            parents,
            parent_choice,
            page_index,
            focus: FormField::Name,
            error: None,
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn focus(&self) -> FormField {
        self.focus
    }

    pub fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    pub fn parents(&self) -> &[ParentOption] {
        &self.parents
    }

    pub fn selected_parent(&self) -> Option<i64> {
        self.parents.get(self.parent_choice).and_then(|option| option.id)
    }

    fn cycle_focus(&mut self, forward: bool) {
        let at = FIELDS.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (at + 1) % FIELDS.len()
        } else {
            (at + FIELDS.len() - 1) % FIELDS.len()
        };
        self.focus = FIELDS[next];
    }

    fn focused_area(&mut self) -> Option<&mut TextArea<'static>> {
        match self.focus {
            FormField::Index => Some(&mut self.index),
            FormField::Name => Some(&mut self.name),
            FormField::Content => Some(&mut self.content),
            FormField::Media => Some(&mut self.media),
            FormField::Parent => None,
        }
    }

    /// Replace the text of `field`.
    pub fn set_text(&mut self, field: FormField, text: &str) {
        let area = text_area(text);
        match field {
            FormField::Index => self.index = area,
            FormField::Name => self.name = area,
            FormField::Content => self.content = area,
            FormField::Media => self.media = area,
            FormField::Parent => {}
        }
    }

    pub fn text(&self, field: FormField) -> String {
        let area = match field {
            FormField::Index => &self.index,
            FormField::Name => &self.name,
            FormField::Content => &self.content,
            FormField::Media => &self.media,
            FormField::Parent => return String::new(),
        };
        area.lines().join("\n")
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        match key.code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return FormAction::Submit;
            }
            KeyCode::Tab => {
                self.cycle_focus(true);
                return FormAction::None;
            }
            KeyCode::BackTab => {
                self.cycle_focus(false);
                return FormAction::None;
            }
            _ => {}
        }

        match self.focus {
            FormField::Parent => match key.code {
                KeyCode::Up | KeyCode::Left | KeyCode::Char('k') => {
                    self.parent_choice = self.parent_choice.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Right | KeyCode::Char('j') => {
                    if self.parent_choice + 1 < self.parents.len() {
                        self.parent_choice += 1;
                    }
                }
                KeyCode::Enter => self.cycle_focus(true),
                _ => {}
            },
            FormField::Content => {
                if let Some(input) = map_keys_to_input(key) {
                    self.content.input(input);
                }
            }
            FormField::Media if key.code == KeyCode::Enter => return FormAction::Submit,
            _ if key.code == KeyCode::Enter => self.cycle_focus(true),
            _ => {
                if let Some(input) = map_keys_to_input(key) {
                    if let Some(area) = self.focused_area() {
                        area.input(input);
                    }
                }
            }
        }
        FormAction::None
    }

    /// Check the fields and build the request body. The failure is kept
    /// for display until the next attempt.
    pub fn validate(&mut self) -> Result<SectionPayload, ValidationError> {
        let result = self.build_payload();
        self.error = result.as_ref().err().cloned();
        result
    }

    fn build_payload(&self) -> Result<SectionPayload, ValidationError> {
        let name = self.text(FormField::Name).trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let raw_index = self.text(FormField::Index);
        let index = match raw_index.trim() {
            "" => 0,
            value => value
                .parse::<i64>()
                .map_err(|_| ValidationError::InvalidIndex(value.to_string()))?,
        };
        let media = self
            .text(FormField::Media)
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();
        Ok(SectionPayload {
            index,
            name,
            parent_id: Some(self.selected_parent()),
            section_pages: vec![SectionPage {
                index: if self.page_index > 0 { self.page_index } else { 1 },
                content: self.text(FormField::Content),
                media,
            }],
        })
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Edit { .. } => " Edit category ",
            FormMode::Create if self.selected_parent().is_some() => " Add sub-category ",
            FormMode::Create => " Add top-level category ",
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, palette: &Palette) {
        let width = area.width.saturating_sub(4).min(80);
        let height = area.height.saturating_sub(2).min(26);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        };
        f.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title())
            .border_style(Style::default().fg(palette.accent))
            .style(Style::default().bg(palette.surface));
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(4),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(inner);

        let focus = self.focus;
        let field_block = |label: &'static str, field: FormField| {
            let color = if focus == field {
                palette.accent
            } else {
                palette.border_dim
            };
            Block::default()
                .borders(Borders::ALL)
                .title(label)
                .border_style(Style::default().fg(color))
        };

        self.index.set_block(field_block(" Index ", FormField::Index));
        f.render_widget(&self.index, rows[0]);
        self.name.set_block(field_block(" Name ", FormField::Name));
        f.render_widget(&self.name, rows[1]);

        let label = self
            .parents
            .get(self.parent_choice)
            .map(|option| option.label.clone())
            .unwrap_or_default();
        f.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("◀ ", Style::default().fg(palette.text_dim)),
                Span::styled(label, Style::default().fg(palette.text)),
                Span::styled(" ▶", Style::default().fg(palette.text_dim)),
            ]))
            .block(field_block(" Parent ", FormField::Parent)),
            rows[2],
        );

        self.content
            .set_block(field_block(" First page content (HTML) ", FormField::Content));
        f.render_widget(&self.content, rows[3]);
        self.media
            .set_block(field_block(" Media (comma-separated URLs) ", FormField::Media));
        f.render_widget(&self.media, rows[4]);

        let footer = match &self.error {
            Some(error) => Line::from(Span::styled(
                error.to_string(),
                Style::default().fg(palette.danger).add_modifier(Modifier::BOLD),
            )),
            None => Line::from(Span::styled(
                "Tab: next field  Ctrl+S: save  Esc: cancel",
                Style::default().fg(palette.text_dim),
            )),
        };
        f.render_widget(Paragraph::new(footer), rows[5]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fake_api::sample_menu;

    fn type_text(form: &mut CategoryForm, text: &str) {
        for c in text.chars() {
            form.handle_key(KeyEvent::from(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let mut form = CategoryForm::create(&sample_menu(), None);
        form.set_text(FormField::Name, "   ");
        assert_eq!(form.validate(), Err(ValidationError::EmptyName));
        assert_eq!(form.error(), Some(&ValidationError::EmptyName));

        form.set_text(FormField::Name, "Mục mới");
        assert!(form.validate().is_ok());
        assert_eq!(form.error(), None);
    }

    #[test]
    fn test_index_parsing() {
        let mut form = CategoryForm::create(&[], None);
        form.set_text(FormField::Name, "x");
        assert_eq!(form.validate().unwrap().index, 0);
        form.set_text(FormField::Index, " 7 ");
        assert_eq!(form.validate().unwrap().index, 7);
        form.set_text(FormField::Index, "seven");
        assert_eq!(
            form.validate(),
            Err(ValidationError::InvalidIndex("seven".into()))
        );
    }

    #[test]
    fn test_create_payload_carries_parent_and_media() {
        let mut form = CategoryForm::create(&sample_menu(), Some(21));
        assert_eq!(form.selected_parent(), Some(21));
        assert_eq!(form.title(), " Add sub-category ");
        form.set_text(FormField::Name, "Điều 5");
        form.set_text(FormField::Content, "<p>new</p>");
        form.set_text(FormField::Media, "a.png, , b.png");

        let payload = form.validate().unwrap();
        assert_eq!(payload.parent_id, Some(Some(21)));
        assert_eq!(payload.section_pages[0].media, vec!["a.png", "b.png"]);
        assert_eq!(payload.section_pages[0].content, "<p>new</p>");
        assert_eq!(payload.section_pages[0].index, 1);
    }

    #[test]
    fn test_root_create_sends_null_parent() {
        let mut form = CategoryForm::create(&sample_menu(), None);
        form.set_text(FormField::Name, "Phần III");
        let payload = form.validate().unwrap();
        assert_eq!(payload.parent_id, Some(None));
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("parentId").unwrap().is_null());
    }

    #[test]
    fn test_edit_prefills_and_keeps_current_parent() {
        let menu = sample_menu();
        let node = MenuNode {
            index: 3,
            ..MenuNode::leaf(12, "Điều 2")
        };
        let page = SectionPage {
            index: 4,
            content: "<p>old</p>".into(),
            media: vec!["x.png".into()],
        };
        let mut form = CategoryForm::edit(&menu, &node, Some(1), Some(&page));
        assert_eq!(form.text(FormField::Index), "3");
        assert_eq!(form.text(FormField::Media), "x.png");
        assert_eq!(form.selected_parent(), Some(1));
        assert_eq!(form.title(), " Edit category ");

        let payload = form.validate().unwrap();
        assert_eq!(payload.parent_id, Some(Some(1)));
        assert_eq!(payload.section_pages[0].index, 4);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["parentId"], 1);
    }

    #[test]
    fn test_edit_moves_section_to_another_parent() {
        let menu = sample_menu();
        let part_two = menu.iter().find(|n| n.id == 2).unwrap();
        let mut form = CategoryForm::edit(&menu, part_two, None, None);
        assert_eq!(form.selected_parent(), None);

        let offered: Vec<Option<i64>> = form.parents().iter().map(|p| p.id).collect();
        assert_eq!(offered, vec![None, Some(1), Some(11), Some(12), Some(3)]);

        form.handle_key(KeyEvent::from(KeyCode::Tab));
        assert_eq!(form.focus(), FormField::Parent);
        form.handle_key(KeyEvent::from(KeyCode::Down));
        assert_eq!(form.selected_parent(), Some(1));
        assert_eq!(form.validate().unwrap().parent_id, Some(Some(1)));

        form.handle_key(KeyEvent::from(KeyCode::Up));
        let json = serde_json::to_value(form.validate().unwrap()).unwrap();
        assert!(json.get("parentId").unwrap().is_null());
    }

    #[test]
    fn test_parent_picker_lists_tree_with_indentation() {
        let form = CategoryForm::create(&sample_menu(), None);
        let labels: Vec<&str> = form.parents().iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels[0], "(top level)");
        assert_eq!(labels[1], "Phần I. Quy định chung");
        assert_eq!(labels[2], "— Điều 1. Phạm vi điều chỉnh");
        assert!(labels.contains(&"— — Điều 3. Lừa đảo qua mạng"));
    }

    #[test]
    fn test_keyboard_editing() {
        let mut form = CategoryForm::create(&sample_menu(), None);
        type_text(&mut form, "5");
        form.handle_key(KeyEvent::from(KeyCode::Tab));
        type_text(&mut form, "Mới");
        form.handle_key(KeyEvent::from(KeyCode::Enter));
        assert_eq!(form.focus(), FormField::Parent);
        form.handle_key(KeyEvent::from(KeyCode::Down));
        assert_eq!(form.selected_parent(), Some(1));
        form.handle_key(KeyEvent::from(KeyCode::Tab));
        type_text(&mut form, "<p>a</p>");
        form.handle_key(KeyEvent::from(KeyCode::Enter));
        type_text(&mut form, "<p>b</p>");

        assert_eq!(form.text(FormField::Index), "5");
        assert_eq!(form.text(FormField::Name), "Mới");
        assert_eq!(form.text(FormField::Content), "<p>a</p>\n<p>b</p>");
        assert_eq!(
            form.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)),
            FormAction::Submit
        );
        assert_eq!(form.handle_key(KeyEvent::from(KeyCode::Esc)), FormAction::Cancel);
    }
}
