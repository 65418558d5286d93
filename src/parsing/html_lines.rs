//! Lays an HTML fragment out as terminal rows.
//!
//! The same layout drives both drawing a flipbook page and measuring a
//! candidate page during pagination, so the measured height is exactly the
//! number of rows that will later be drawn.

use super::html_fragments::{find_element, parse_fragment_root};
use crate::paginator::PageStyle;
use markup5ever_rcdom::{Handle, NodeData};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use textwrap::core::{Fragment, display_width};
use textwrap::wrap_algorithms::wrap_first_fit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct RunStyle {
    bold: bool,
    italic: bool,
    underline: bool,
}

impl RunStyle {
    fn to_style(self) -> Style {
        let mut style = Style::default();
        if self.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.underline {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        style
    }
}

#[derive(Debug, Clone)]
enum Item {
    Word {
        text: String,
        style: RunStyle,
        space_after: bool,
    },
    Break,
}

#[derive(Debug, Clone, PartialEq)]
enum BlockKind {
    Paragraph,
    Heading(u8),
    ListItem,
    Quote,
    Preformatted,
    Rule,
}

#[derive(Debug, Clone)]
struct TextBlock {
    kind: BlockKind,
    marker: Option<String>,
    indent: usize,
    items: Vec<Item>,
    raw: String,
}

impl TextBlock {
    fn new(kind: BlockKind, indent: usize) -> Self {
        Self {
            kind,
            marker: None,
            indent,
            items: Vec::new(),
            raw: String::new(),
        }
    }

    fn is_empty(&self) -> bool {
        match self.kind {
            BlockKind::Rule => false,
            BlockKind::Preformatted => self.raw.trim().is_empty(),
            _ => self.items.is_empty() && self.marker.is_none(),
        }
    }

    fn push_text(&mut self, text: &str, style: RunStyle) {
        if text.starts_with(char::is_whitespace) {
            self.mark_space_after_last();
        }
        let mut words = text.split_whitespace().peekable();
        while let Some(word) = words.next() {
            let space_after = words.peek().is_some() || text.ends_with(char::is_whitespace);
            self.items.push(Item::Word {
                text: word.to_string(),
                style,
                space_after,
            });
        }
    }

    fn mark_space_after_last(&mut self) {
        if let Some(Item::Word { space_after, .. }) = self.items.last_mut() {
            *space_after = true;
        }
    }
}

#[derive(Debug, Clone)]
struct ListFrame {
    ordered: bool,
    counter: usize,
}

struct BlockCollector {
    blocks: Vec<TextBlock>,
    current: Option<TextBlock>,
    kinds: Vec<BlockKind>,
    lists: Vec<ListFrame>,
    pending_marker: Option<String>,
}

impl BlockCollector {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            current: None,
            kinds: Vec::new(),
            lists: Vec::new(),
            pending_marker: None,
        }
    }

    fn indent(&self) -> usize {
        self.lists.len().saturating_sub(1) * 2
    }

    fn current_block(&mut self) -> &mut TextBlock {
        let kind = self.kinds.last().cloned().unwrap_or(BlockKind::Paragraph);
        let indent = self.indent();
        let marker = self.pending_marker.take();
        self.current.get_or_insert_with(|| {
            let mut block = TextBlock::new(kind, indent);
            block.marker = marker;
            block
        })
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            if !block.is_empty() {
                self.blocks.push(block);
            }
        }
    }

    fn with_block(&mut self, kind: BlockKind, node: &Handle, style: RunStyle) {
        self.flush();
        self.kinds.push(kind);
        self.walk_children(node, style);
        self.flush();
        self.kinds.pop();
    }

    fn walk_children(&mut self, node: &Handle, style: RunStyle) {
        for child in node.children.borrow().iter() {
            self.walk(child, style);
        }
    }

    fn walk(&mut self, node: &Handle, style: RunStyle) {
        match node.data {
            NodeData::Text { ref contents } => {
                let text = contents.borrow();
                let in_pre = self.kinds.last() == Some(&BlockKind::Preformatted);
                if in_pre {
                    self.current_block().raw.push_str(&text);
                } else if !text.trim().is_empty() {
                    self.current_block().push_text(&text, style);
                } else if !text.is_empty() {
                    if let Some(block) = self.current.as_mut() {
                        block.mark_space_after_last();
                    }
                }
            }
            NodeData::Element {
                ref name,
                ref attrs,
                ..
            } => {
                let tag = name.local.as_ref();
                match tag {
                    "script" | "style" | "head" | "title" | "template" | "noscript" => {}
                    "p" | "div" | "section" | "article" | "header" | "footer" | "figure"
                    | "figcaption" | "tr" | "dt" | "dd" | "caption" => {
                        self.with_block(BlockKind::Paragraph, node, style)
                    }
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        let level = tag[1..].parse().unwrap_or(1);
                        let style = RunStyle {
                            bold: true,
                            underline: level == 1,
                            ..style
                        };
                        self.with_block(BlockKind::Heading(level), node, style)
                    }
                    "blockquote" => {
                        let style = RunStyle {
                            italic: true,
                            ..style
                        };
                        self.with_block(BlockKind::Quote, node, style)
                    }
                    "pre" => self.with_block(BlockKind::Preformatted, node, style),
                    "ul" | "ol" => {
                        self.flush();
                        self.lists.push(ListFrame {
                            ordered: tag == "ol",
                            counter: 0,
                        });
                        self.walk_children(node, style);
                        self.flush();
                        self.lists.pop();
                    }
                    "li" => {
                        self.flush();
                        let marker = match self.lists.last_mut() {
                            Some(frame) if frame.ordered => {
                                frame.counter += 1;
                                format!("{}.", frame.counter)
                            }
                            _ => "•".to_string(),
                        };
                        self.pending_marker = Some(marker);
                        self.with_block(BlockKind::ListItem, node, style);
                        self.pending_marker = None;
                    }
                    "hr" => {
                        self.flush();
                        self.blocks.push(TextBlock::new(BlockKind::Rule, 0));
                    }
                    "br" => self.current_block().items.push(Item::Break),
                    "img" => {
                        let alt = attrs
                            .borrow()
                            .iter()
                            .find(|attr| attr.name.local.as_ref() == "alt")
                            .map(|attr| attr.value.to_string())
                            .filter(|alt| !alt.trim().is_empty());
                        let label = match alt {
                            Some(alt) => format!("[image: {alt}]"),
                            None => "[image]".to_string(),
                        };
                        let style = RunStyle {
                            italic: true,
                            ..style
                        };
                        self.current_block().push_text(&label, style);
                    }
                    "td" | "th" => {
                        let style = RunStyle {
                            bold: style.bold || tag == "th",
                            ..style
                        };
                        self.walk_children(node, style);
                        if let Some(block) = self.current.as_mut() {
                            block.push_text(" | ", style);
                        }
                    }
                    "b" | "strong" => self.walk_children(
                        node,
                        RunStyle {
                            bold: true,
                            ..style
                        },
                    ),
                    "i" | "em" | "cite" => self.walk_children(
                        node,
                        RunStyle {
                            italic: true,
                            ..style
                        },
                    ),
                    "u" | "a" | "ins" => self.walk_children(
                        node,
                        RunStyle {
                            underline: true,
                            ..style
                        },
                    ),
                    _ => self.walk_children(node, style),
                }
            }
            _ => self.walk_children(node, style),
        }
    }
}

fn collect_blocks(html: &str) -> Vec<TextBlock> {
    let dom = parse_fragment_root(html);
    let mut collector = BlockCollector::new();
    if let Some(body) = find_element(&dom.document, "body") {
        collector.walk_children(&body, RunStyle::default());
    }
    collector.flush();
    collector.blocks
}

/// A word prepared for `wrap_first_fit`.
#[derive(Debug, Clone)]
struct StyledWord {
    text: String,
    style: RunStyle,
    width: usize,
    space_after: bool,
}

impl Fragment for StyledWord {
    fn width(&self) -> f64 {
        self.width as f64
    }

    fn whitespace_width(&self) -> f64 {
        if self.space_after { 1.0 } else { 0.0 }
    }

    fn penalty_width(&self) -> f64 {
        0.0
    }
}

/// Split words wider than `width` into chunks that fit.
fn chunk_word(text: &str, style: RunStyle, space_after: bool, width: usize) -> Vec<StyledWord> {
    let total = display_width(text);
    if total <= width || width == 0 {
        return vec![StyledWord {
            text: text.to_string(),
            style,
            width: total,
            space_after,
        }];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;
    for ch in text.chars() {
        let ch_width = display_width(ch.encode_utf8(&mut [0; 4]));
        if current_width + ch_width > width && !current.is_empty() {
            chunks.push(StyledWord {
                text: std::mem::take(&mut current),
                style,
                width: current_width,
                space_after: false,
            });
            current_width = 0;
        }
        current.push(ch);
        current_width += ch_width;
    }
    chunks.push(StyledWord {
        text: current,
        style,
        width: current_width,
        space_after,
    });
    chunks
}

fn wrap_segment(
    words: &[StyledWord],
    first_prefix: Option<&str>,
    indent: usize,
    width: usize,
) -> Vec<Line<'static>> {
    let prefix_width = first_prefix.map(|p| display_width(p) + 1).unwrap_or(0);
    let hanging = indent + prefix_width;
    let available = width.saturating_sub(hanging).max(1);

    let mut fitted = Vec::new();
    for word in words {
        fitted.extend(chunk_word(&word.text, word.style, word.space_after, available));
    }

    if fitted.is_empty() {
        let mut spans = Vec::new();
        if let Some(prefix) = first_prefix {
            spans.push(Span::raw(format!("{}{} ", " ".repeat(indent), prefix)));
        }
        return vec![Line::from(spans)];
    }

    let wrapped = wrap_first_fit(&fitted, &[available as f64]);
    wrapped
        .iter()
        .enumerate()
        .map(|(line_no, line_words)| {
            let mut spans = Vec::with_capacity(line_words.len() + 1);
            let lead = match (line_no, first_prefix) {
                (0, Some(prefix)) => format!("{}{} ", " ".repeat(indent), prefix),
                _ => " ".repeat(hanging),
            };
            if !lead.is_empty() {
                spans.push(Span::raw(lead));
            }
            for (i, word) in line_words.iter().enumerate() {
                let mut text = word.text.clone();
                if word.space_after && i + 1 < line_words.len() {
                    text.push(' ');
                }
                spans.push(Span::styled(text, word.style.to_style()));
            }
            Line::from(spans)
        })
        .collect()
}

fn block_lines(block: &TextBlock, width: usize) -> Vec<Line<'static>> {
    match block.kind {
        BlockKind::Rule => vec![Line::from("─".repeat(width))],
        BlockKind::Preformatted => block
            .raw
            .trim_matches('\n')
            .lines()
            .map(|line| Line::from(line.to_string()))
            .collect(),
        _ => {
            let quote_indent = if block.kind == BlockKind::Quote { 2 } else { 0 };
            let mut segments: Vec<Vec<StyledWord>> = vec![Vec::new()];
            for item in &block.items {
                match item {
                    Item::Word {
                        text,
                        style,
                        space_after,
                    } => {
                        if let Some(segment) = segments.last_mut() {
                            segment.push(StyledWord {
                                text: text.clone(),
                                style: *style,
                                width: display_width(text),
                                space_after: *space_after,
                            });
                        }
                    }
                    Item::Break => segments.push(Vec::new()),
                }
            }
            if segments.len() > 1 && segments.last().is_some_and(|s| s.is_empty()) {
                segments.pop();
            }

            let mut lines = Vec::new();
            for (i, segment) in segments.iter().enumerate() {
                let prefix = if i == 0 { block.marker.as_deref() } else { None };
                let indent = block.indent + quote_indent;
                let hanging_prefix_indent = if i > 0 {
                    block.marker.as_deref().map(|m| display_width(m) + 1).unwrap_or(0)
                } else {
                    0
                };
                lines.extend(wrap_segment(
                    segment,
                    prefix,
                    indent + hanging_prefix_indent,
                    width,
                ));
            }
            lines
        }
    }
}

/// Lay out `html` at `width` columns (before horizontal padding).
pub fn layout_html(html: &str, width: u16, style: &PageStyle) -> Vec<Line<'static>> {
    let content_width = (width as usize)
        .saturating_sub(style.padding_x as usize * 2)
        .max(1);
    let pad = " ".repeat(style.padding_x as usize);
    let line_height = style.line_height.max(1) as usize;

    let mut rows = Vec::new();
    for (i, block) in collect_blocks(html).iter().enumerate() {
        if i > 0 {
            rows.extend((0..style.block_spacing).map(|_| Line::default()));
        }
        for mut line in block_lines(block, content_width) {
            if !pad.is_empty() {
                line.spans.insert(0, Span::raw(pad.clone()));
            }
            rows.push(line);
            rows.extend((1..line_height).map(|_| Line::default()));
        }
    }
    rows
}

/// Rows needed to draw `html`, including vertical padding.
pub fn measure_rows(html: &str, width: u16, style: &PageStyle) -> usize {
    let body = layout_html(html, width, style).len();
    if body == 0 {
        0
    } else {
        body + style.padding_y as usize * 2
    }
}
