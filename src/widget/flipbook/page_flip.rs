use crate::chapter::Chapter;
use crate::paginator::PageStyle;
use crate::parsing::html_lines::layout_html;
use crate::theme::Palette;
use log::debug;
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};
use thiserror::Error;

pub const COVER_TITLE: [&str; 3] = [
    "CẨM NANG PHÒNG CHỐNG",
    "TỘI PHẠM VÀ VI PHẠM",
    "PHÁP LUẬT",
];
pub const COVER_SUBTITLE: &str = "ĐOÀN THANH NIÊN";
pub const COVER_EMBLEM: &str = "★";
pub const BLANK_PAGE_LABEL: &str = "Blank page";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlipError {
    #[error("page {target} does not exist, the book has {len} pages")]
    OutOfRange { target: usize, len: usize },
    #[error("the page widget has been destroyed")]
    Destroyed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Cover,
    /// One paginated fragment of the chapter.
    Content(String),
    /// The whole chapter content, used when pagination yielded nothing.
    Fallback(String),
}

impl Page {
    /// Cover first, then fragments, or one fallback page when there are none.
    pub fn compose(chapter: Option<&Chapter>, fragments: &[String]) -> Vec<Page> {
        let mut pages = vec![Page::Cover];
        if fragments.is_empty() {
            pages.push(Page::Fallback(
                chapter.map(|c| c.content.clone()).unwrap_or_default(),
            ));
        } else {
            pages.extend(fragments.iter().cloned().map(Page::Content));
        }
        pages
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipEvent {
    /// First time the widget has been laid out.
    Initialized,
}

/// Page-turning widget showing one page, or two facing pages in a spread.
///
/// The cover always stands alone; after it pages pair up as 2-3, 4-5 and
/// so on, like a bound book.
#[derive(Debug)]
pub struct PageFlip {
    pages: Vec<Page>,
    current: usize,
    spread: bool,
    initialized: bool,
    destroyed: bool,
    token: u64,
}

impl PageFlip {
    pub fn new(pages: Vec<Page>, spread: bool, token: u64) -> Self {
        debug!("Built page widget #{token} with {} pages", pages.len());
        Self {
            pages,
            current: 0,
            spread,
            initialized: false,
            destroyed: false,
            token,
        }
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Zero-based index of the left (or only) visible page.
    pub fn current_page(&self) -> usize {
        self.current
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn spread_start(&self, index: usize) -> usize {
        if !self.spread || index == 0 {
            index
        } else if index % 2 == 0 {
            index - 1
        } else {
            index
        }
    }

    /// Pages visible after flipping to `index`.
    pub fn visible(&self) -> Vec<usize> {
        let mut shown = vec![self.current];
        if self.spread && self.current != 0 && self.current + 1 < self.pages.len() {
            shown.push(self.current + 1);
        }
        shown
    }

    pub fn flip(&mut self, index: usize) -> Result<(), FlipError> {
        if self.destroyed {
            return Err(FlipError::Destroyed);
        }
        if index >= self.pages.len() {
            return Err(FlipError::OutOfRange {
                target: index,
                len: self.pages.len(),
            });
        }
        self.current = self.spread_start(index);
        Ok(())
    }

    pub fn flip_next(&mut self) -> bool {
        let step = if self.spread && self.current != 0 { 2 } else { 1 };
        let target = self.current + step;
        target < self.pages.len() && self.flip(target).is_ok()
    }

    pub fn flip_prev(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        let target = if self.spread && self.current > 1 {
            self.current - 2
        } else {
            self.current - 1
        };
        self.flip(target).is_ok()
    }

    pub fn destroy(&mut self) {
        if !self.destroyed {
            debug!("Destroyed page widget #{}", self.token);
            self.destroyed = true;
            self.pages.clear();
            self.current = 0;
        }
    }

    pub fn render(
        &mut self,
        f: &mut Frame,
        book: Rect,
        page_width: u16,
        chapter: Option<&Chapter>,
        style: &PageStyle,
        palette: &Palette,
    ) -> Option<FlipEvent> {
        if self.destroyed {
            return None;
        }
        let shown = self.visible();
        let slots = if self.spread { 2 } else { 1 };
        for slot in 0..slots {
            let area = Rect {
                x: book.x + slot * (page_width + 1),
                width: page_width.min(book.width),
                ..book
            };
            if area.right() > book.right() {
                break;
            }
            match shown.get(slot as usize) {
                Some(&index) => self.render_page(f, area, index, chapter, style, palette),
                None if self.current != 0 => render_blank(f, area, None, palette),
                None => {}
            }
        }

        if self.initialized {
            None
        } else {
            self.initialized = true;
            Some(FlipEvent::Initialized)
        }
    }

    fn render_page(
        &self,
        f: &mut Frame,
        area: Rect,
        index: usize,
        chapter: Option<&Chapter>,
        style: &PageStyle,
        palette: &Palette,
    ) {
        let number = index + 1;
        match &self.pages[index] {
            Page::Cover => render_cover(f, area, palette),
            Page::Content(html) | Page::Fallback(html) => match chapter {
                Some(chapter) if !html.trim().is_empty() => {
                    render_content(f, area, number, chapter, html, style, palette)
                }
                _ => render_blank(f, area, Some(number), palette),
            },
        }
    }
}

fn render_cover(f: &mut Frame, area: Rect, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(palette.emblem))
        .style(Style::default().bg(palette.cover_bg).fg(palette.cover_fg));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let title_style = Style::default()
        .fg(palette.cover_fg)
        .add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line> = COVER_TITLE
        .iter()
        .map(|line| Line::from(Span::styled(*line, title_style)))
        .collect();
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        COVER_SUBTITLE,
        Style::default().fg(palette.cover_fg),
    )));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        COVER_EMBLEM,
        Style::default().fg(palette.emblem).add_modifier(Modifier::BOLD),
    )));

    let top = inner.height.saturating_sub(lines.len() as u16) / 2;
    let body = Rect {
        y: inner.y + top,
        height: inner.height - top,
        ..inner
    };
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), body);
}

fn render_content(
    f: &mut Frame,
    area: Rect,
    number: usize,
    chapter: &Chapter,
    html: &str,
    style: &PageStyle,
    palette: &Palette,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.border))
        .style(Style::default().bg(palette.background));
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height < 3 {
        return;
    }

    let header = Line::from(vec![
        Span::raw(format!("{} ", chapter.section_icon)),
        Span::styled(
            chapter.title.clone(),
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        ),
    ]);
    let rule = Line::from(Span::styled(
        "─".repeat(inner.width as usize),
        Style::default().fg(palette.accent_soft),
    ));
    f.render_widget(Paragraph::new(vec![header, rule]), Rect { height: 2, ..inner });

    let content = Rect {
        y: inner.y + 2 + style.padding_y.min(inner.height - 3),
        height: inner.height - 3 - style.padding_y.min(inner.height - 3),
        ..inner
    };
    let lines = layout_html(html, inner.width, style);
    f.render_widget(
        Paragraph::new(lines).style(Style::default().fg(palette.text)),
        content,
    );

    let footer = Rect {
        y: inner.bottom() - 1,
        height: 1,
        ..inner
    };
    f.render_widget(
        Paragraph::new(Span::styled(
            format!("Page {number}"),
            Style::default().fg(palette.text_dim),
        ))
        .alignment(Alignment::Center),
        footer,
    );
}

fn render_blank(f: &mut Frame, area: Rect, number: Option<usize>, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.border_dim));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = Vec::new();
    if let Some(number) = number {
        lines.push(Line::from(Span::styled(
            format!("Page {number}"),
            Style::default().fg(palette.text_dim),
        )));
        lines.push(Line::default());
    }
    lines.push(Line::from("📄"));
    lines.push(Line::from(Span::styled(
        BLANK_PAGE_LABEL,
        Style::default().fg(palette.text_dim),
    )));
    let top = inner.height.saturating_sub(lines.len() as u16) / 2;
    f.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        Rect {
            y: inner.y + top,
            height: inner.height - top,
            ..inner
        },
    );
}
