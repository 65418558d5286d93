use ratatui::layout::Rect;

/// Rows on every page that are not content: two borders, the chapter title,
/// the rule under it and the page number line.
pub const CHROME_ROWS: u16 = 5;
/// Columns taken by the left and right page borders.
pub const CHROME_COLUMNS: u16 = 2;
/// Row under the book reserved for the navigation hint.
pub const FOOTER_ROWS: u16 = 1;
/// Row above the book taken by the warning banner.
pub const BANNER_ROWS: u16 = 1;

pub const LARGE_MIN_COLUMNS: u16 = 120;
pub const MEDIUM_MIN_COLUMNS: u16 = 80;
const MEDIUM_MAX_PAGE_COLUMNS: u16 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Breakpoint {
    Large,
    Medium,
    Small,
}

impl Breakpoint {
    pub fn for_width(columns: u16) -> Self {
        if columns >= LARGE_MIN_COLUMNS {
            Breakpoint::Large
        } else if columns >= MEDIUM_MIN_COLUMNS {
            Breakpoint::Medium
        } else {
            Breakpoint::Small
        }
    }
}

/// Size of one page of the book for a given viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub breakpoint: Breakpoint,
    pub page_width: u16,
    pub page_height: u16,
    /// Two facing pages side by side.
    pub spread: bool,
    pub banner: bool,
}

impl Dimensions {
    pub fn compute(viewport: Rect) -> Self {
        Self::compute_with_banner(viewport, false)
    }

    /// Like [`Self::compute`], with `banner` rows kept free above the book.
    pub fn compute_with_banner(viewport: Rect, banner: bool) -> Self {
        let breakpoint = Breakpoint::for_width(viewport.width);
        let page_height = viewport
            .height
            .saturating_sub(FOOTER_ROWS)
            .saturating_sub(banner_rows(banner));
        let (page_width, spread) = match breakpoint {
            Breakpoint::Large => (viewport.width.saturating_sub(1) / 2, true),
            Breakpoint::Medium => (viewport.width.min(MEDIUM_MAX_PAGE_COLUMNS), false),
            Breakpoint::Small => (viewport.width, false),
        };
        Self {
            breakpoint,
            page_width,
            page_height,
            spread,
            banner,
        }
    }

    /// Rows available to page content.
    pub fn content_budget(&self) -> u32 {
        u32::from(self.page_height.saturating_sub(CHROME_ROWS))
    }

    /// Columns available to page content, horizontal padding included.
    pub fn content_width(&self) -> u16 {
        self.page_width.saturating_sub(CHROME_COLUMNS)
    }

    /// Area of the book inside `viewport`, centered horizontally.
    pub fn book_area(&self, viewport: Rect) -> Rect {
        let width = if self.spread {
            self.page_width * 2 + 1
        } else {
            self.page_width
        }
        .min(viewport.width);
        let top = banner_rows(self.banner).min(viewport.height);
        Rect {
            x: viewport.x + (viewport.width - width) / 2,
            y: viewport.y + top,
            width,
            height: self.page_height.min(viewport.height - top),
        }
    }
}

fn banner_rows(banner: bool) -> u16 {
    if banner { BANNER_ROWS } else { 0 }
}
