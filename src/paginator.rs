use crate::parsing::html_fragments::split_top_level;
use crate::parsing::html_lines::measure_rows;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Styling that affects how tall a fragment renders.
///
/// Units are terminal cells. Glyph size is fixed by the terminal, so the
/// style context is padding, line height and the gap between blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PageStyle {
    pub padding_x: u16,
    pub padding_y: u16,
    pub line_height: u16,
    pub block_spacing: u16,
}

impl Default for PageStyle {
    fn default() -> Self {
        Self {
            padding_x: 1,
            padding_y: 0,
            line_height: 1,
            block_spacing: 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("failed to parse page content: {0}")]
    Parse(#[from] std::io::Error),
    #[error("measurement surface unavailable: {0}")]
    Surface(String),
    #[error("failed to measure fragment: {0}")]
    Measure(String),
}

/// An off-screen surface sized to one page. Dropping it releases it.
pub trait MeasureSurface {
    fn measure(&mut self, html: &str) -> Result<u32, PaginationError>;
}

/// Something that can render HTML off-screen and report its height.
pub trait LayoutEngine {
    type Surface: MeasureSurface;

    fn open_surface(&self, width: u16, style: &PageStyle) -> Result<Self::Surface, PaginationError>;
}

/// Greedy splitter of HTML content into page-sized fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    safety_margin: u32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Paginator {
    pub fn new(safety_margin: u32) -> Self {
        Self { safety_margin }
    }

    pub fn safety_margin(&self) -> u32 {
        self.safety_margin
    }

    /// Split `html` into fragments no taller than `max_height - safety_margin`.
    ///
    /// Top-level nodes are never split. A node that is too tall by itself
    /// becomes its own fragment and overflows the page.
    pub fn paginate<E: LayoutEngine>(
        &self,
        engine: &E,
        html: &str,
        max_height: u32,
        width: u16,
        style: &PageStyle,
    ) -> Result<Vec<String>, PaginationError> {
        let nodes = split_top_level(html)?;
        if nodes.iter().all(|node| node.is_blank) {
            return Ok(Vec::new());
        }

        let threshold = max_height.saturating_sub(self.safety_margin);
        let mut surface = engine.open_surface(width, style)?;

        let mut pages = Vec::new();
        let mut current = String::new();
        let mut current_has_content = false;

        for node in nodes {
            if node.is_blank {
                current.push_str(&node.html);
                continue;
            }
            if !current_has_content {
                current.push_str(&node.html);
                current_has_content = true;
                continue;
            }

            let candidate = format!("{current}{}", node.html);
            let height = surface.measure(&candidate)?;
            if height > threshold {
                trace!(
                    "Fragment {} closed: candidate height {height} > {threshold}",
                    pages.len() + 1
                );
                pages.push(std::mem::replace(&mut current, node.html));
            } else {
                current = candidate;
            }
        }

        if current_has_content {
            pages.push(current);
        }

        debug!(
            "Paginated {} bytes into {} fragments (height {max_height}, width {width})",
            html.len(),
            pages.len()
        );
        Ok(pages)
    }
}

/// Measures fragments with the same row layout used to draw pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalLayout;

pub struct TerminalSurface {
    width: u16,
    style: PageStyle,
    measurements: usize,
}

impl LayoutEngine for TerminalLayout {
    type Surface = TerminalSurface;

    fn open_surface(&self, width: u16, style: &PageStyle) -> Result<TerminalSurface, PaginationError> {
        let min_width = style.padding_x.saturating_mul(2).saturating_add(1);
        if width < min_width {
            return Err(PaginationError::Surface(format!(
                "page width {width} is narrower than the minimum {min_width}"
            )));
        }
        Ok(TerminalSurface {
            width,
            style: *style,
            measurements: 0,
        })
    }
}

impl MeasureSurface for TerminalSurface {
    fn measure(&mut self, html: &str) -> Result<u32, PaginationError> {
        self.measurements += 1;
        u32::try_from(measure_rows(html, self.width, &self.style))
            .map_err(|e| PaginationError::Measure(e.to_string()))
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        trace!(
            "Released {}-column measurement surface after {} measurements",
            self.width, self.measurements
        );
        if self.measurements > 10_000 {
            warn!("Pagination needed {} measurements", self.measurements);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::html_fragments::extract_text;
    use regex::Regex;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Every `data-h="N"` attribute contributes N units of height.
    struct FakeEngine {
        opened: Rc<Cell<usize>>,
        released: Rc<Cell<usize>>,
        fail_after: Option<usize>,
    }

    struct FakeSurface {
        released: Rc<Cell<usize>>,
        calls: usize,
        fail_after: Option<usize>,
        heights: Regex,
    }

    impl FakeEngine {
        fn new() -> Self {
            Self {
                opened: Rc::new(Cell::new(0)),
                released: Rc::new(Cell::new(0)),
                fail_after: None,
            }
        }

        fn failing_after(calls: usize) -> Self {
            Self {
                fail_after: Some(calls),
                ..Self::new()
            }
        }
    }

    impl LayoutEngine for FakeEngine {
        type Surface = FakeSurface;

        fn open_surface(&self, _width: u16, _style: &PageStyle) -> Result<FakeSurface, PaginationError> {
            self.opened.set(self.opened.get() + 1);
            Ok(FakeSurface {
                released: self.released.clone(),
                calls: 0,
                fail_after: self.fail_after,
                heights: Regex::new(r#"data-h="(\d+)""#).unwrap(),
            })
        }
    }

    impl MeasureSurface for FakeSurface {
        fn measure(&mut self, html: &str) -> Result<u32, PaginationError> {
            self.calls += 1;
            if self.fail_after.is_some_and(|limit| self.calls > limit) {
                return Err(PaginationError::Measure("font metrics unavailable".into()));
            }
            Ok(self
                .heights
                .captures_iter(html)
                .filter_map(|c| c[1].parse::<u32>().ok())
                .sum())
        }
    }

    impl Drop for FakeSurface {
        fn drop(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    fn para(height: u32, text: &str) -> String {
        format!(r#"<p data-h="{height}">{text}</p>"#)
    }

    #[test]
    fn test_three_paragraphs_make_two_pages() {
        let html = [para(200, "a"), para(200, "b"), para(200, "c")].concat();
        let pages = Paginator::new(10)
            .paginate(&FakeEngine::new(), &html, 500, 40, &PageStyle::default())
            .unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], [para(200, "a"), para(200, "b")].concat());
        assert_eq!(pages[1], para(200, "c"));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let html = [para(245, "a"), para(245, "b")].concat();
        let pages = Paginator::new(10)
            .paginate(&FakeEngine::new(), &html, 500, 40, &PageStyle::default())
            .unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_oversized_node_gets_its_own_page() {
        let html = [para(100, "small"), para(900, "huge"), para(100, "tail")].concat();
        let pages = Paginator::new(10)
            .paginate(&FakeEngine::new(), &html, 500, 40, &PageStyle::default())
            .unwrap();
        assert_eq!(pages, vec![para(100, "small"), para(900, "huge"), para(100, "tail")]);
    }

    #[test]
    fn test_leading_oversized_node_does_not_emit_empty_page() {
        let html = [para(900, "huge"), para(100, "tail")].concat();
        let pages = Paginator::new(10)
            .paginate(&FakeEngine::new(), &html, 500, 40, &PageStyle::default())
            .unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| !p.is_empty()));
    }

    #[test]
    fn test_empty_and_blank_input() {
        let engine = FakeEngine::new();
        let paginator = Paginator::default();
        assert!(paginator.paginate(&engine, "", 500, 40, &PageStyle::default()).unwrap().is_empty());
        assert!(paginator.paginate(&engine, " \n ", 500, 40, &PageStyle::default()).unwrap().is_empty());
        assert_eq!(engine.opened.get(), 0);
    }

    #[test]
    fn test_surface_released_once_per_call() {
        let engine = FakeEngine::new();
        let html = [para(200, "a"), para(200, "b"), para(200, "c")].concat();
        for _ in 0..3 {
            Paginator::new(10)
                .paginate(&engine, &html, 500, 40, &PageStyle::default())
                .unwrap();
        }
        assert_eq!(engine.opened.get(), 3);
        assert_eq!(engine.released.get(), 3);
    }

    #[test]
    fn test_surface_released_when_measurement_fails() {
        let engine = FakeEngine::failing_after(1);
        let html = [para(10, "a"), para(10, "b"), para(10, "c")].concat();
        let result = Paginator::new(0).paginate(&engine, &html, 500, 40, &PageStyle::default());
        assert!(matches!(result, Err(PaginationError::Measure(_))));
        assert_eq!(engine.opened.get(), 1);
        assert_eq!(engine.released.get(), 1);
    }

    #[test]
    fn test_repagination_is_idempotent() {
        let html = (0..40)
            .map(|i| format!("<p>Điều {i}. Nội dung quy định chi tiết về trách nhiệm thi hành.</p>\n"))
            .collect::<String>();
        let style = PageStyle::default();
        let paginator = Paginator::new(1);
        let first = paginator.paginate(&TerminalLayout, &html, 12, 30, &style).unwrap();
        let second = paginator.paginate(&TerminalLayout, &html, 12, 30, &style).unwrap();
        assert!(first.len() > 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_text_preserved_in_order_without_duplication() {
        let html = "<h2>Chương I</h2><p>Quy định chung về phòng chống tội phạm.</p>\
                    <ul><li>một</li><li>hai</li></ul><p>Trách <b>nhiệm</b> của công dân.</p>\
                    tail text<br><div><p>nested</p><p>block</p></div>";
        let pages = Paginator::new(0)
            .paginate(&TerminalLayout, html, 4, 20, &PageStyle::default())
            .unwrap();
        assert!(pages.len() > 2);
        let joined = pages
            .iter()
            .map(|p| extract_text(p))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined, extract_text(html));
        // The nested div stays whole on one page
        assert!(pages.iter().any(|p| p.contains("<div><p>nested</p><p>block</p></div>")));
    }

    #[test]
    fn test_terminal_pages_fit_budget() {
        let html = (0..30)
            .map(|i| format!("<p>Paragraph {i} has a handful of ordinary words.</p>"))
            .collect::<String>();
        let style = PageStyle::default();
        let pages = Paginator::new(1).paginate(&TerminalLayout, &html, 10, 24, &style).unwrap();
        for page in &pages {
            assert!(measure_rows(page, 24, &style) <= 9, "page too tall: {page}");
        }
    }

    #[test]
    fn test_width_change_changes_boundaries() {
        let html = (0..20)
            .map(|i| format!("<p>Line {i} with some extra words to wrap around.</p>"))
            .collect::<String>();
        let style = PageStyle::default();
        let paginator = Paginator::new(0);
        let narrow = paginator.paginate(&TerminalLayout, &html, 10, 20, &style).unwrap();
        let wide = paginator.paginate(&TerminalLayout, &html, 10, 80, &style).unwrap();
        assert!(narrow.len() > wide.len());
    }

    #[test]
    fn test_terminal_surface_rejects_tiny_width() {
        let style = PageStyle {
            padding_x: 4,
            ..PageStyle::default()
        };
        let result = Paginator::new(0).paginate(&TerminalLayout, "<p>x</p>", 10, 5, &style);
        assert!(matches!(result, Err(PaginationError::Surface(_))));
    }
}
