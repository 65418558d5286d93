use once_cell::sync::Lazy;
use ratatui::style::Color;
use std::env;

/// Colors of the reader. The cover and header use the handbook's red, the
/// table of contents highlights with amber.
#[derive(Clone, Debug)]
pub struct Palette {
    pub background: Color,
    pub surface: Color,
    pub border: Color,
    pub border_dim: Color,
    pub text: Color,
    pub text_dim: Color,
    pub accent: Color,
    pub accent_soft: Color,
    pub danger: Color,
    pub success: Color,
    pub cover_bg: Color,
    pub cover_fg: Color,
    pub emblem: Color,
}

pub static HANDBOOK: Lazy<Palette> = Lazy::new(|| {
    if supports_true_color() {
        Palette::true_color()
    } else {
        Palette::indexed()
    }
});

/// `COLORTERM=truecolor|24bit` or a `TERM` that advertises it.
pub fn supports_true_color() -> bool {
    let advertises = |value: String| {
        let value = value.to_lowercase();
        value.contains("truecolor") || value.contains("24bit")
    };
    env::var("COLORTERM").map(advertises).unwrap_or(false)
        || env::var("TERM").map(advertises).unwrap_or(false)
}

impl Palette {
    fn true_color() -> Self {
        Self {
            background: Color::Reset,
            surface: Color::Rgb(0x26, 0x26, 0x2b),
            border: Color::Rgb(0xd4, 0xd4, 0xd8),
            border_dim: Color::Rgb(0x6b, 0x72, 0x80),
            text: Color::Rgb(0xf4, 0xf4, 0xf5),
            text_dim: Color::Rgb(0x9c, 0xa3, 0xaf),
            accent: Color::Rgb(0xfb, 0xbf, 0x24),
            accent_soft: Color::Rgb(0x78, 0x5a, 0x12),
            danger: Color::Rgb(0xdc, 0x26, 0x26),
            success: Color::Rgb(0x4a, 0xde, 0x80),
            cover_bg: Color::Rgb(0xb9, 0x1c, 0x1c),
            cover_fg: Color::Rgb(0xff, 0xff, 0xff),
            emblem: Color::Rgb(0xfa, 0xcc, 0x15),
        }
    }

    fn indexed() -> Self {
        Self {
            background: Color::Reset,
            surface: Color::Indexed(235),
            border: Color::Indexed(252),
            border_dim: Color::Indexed(244),
            text: Color::Indexed(255),
            text_dim: Color::Indexed(248),
            accent: Color::Indexed(214),
            accent_soft: Color::Indexed(94),
            danger: Color::Indexed(160),
            success: Color::Indexed(78),
            cover_bg: Color::Indexed(124),
            cover_fg: Color::Indexed(231),
            emblem: Color::Indexed(220),
        }
    }

    // (text, border) for focused/unfocused panels
    pub fn get_panel_colors(&self, is_focused: bool) -> (Color, Color) {
        if is_focused {
            (self.text, self.border)
        } else {
            (self.text_dim, self.border_dim)
        }
    }

    // (selection_bg, selection_fg)
    pub fn get_selection_colors(&self, is_focused: bool) -> (Color, Color) {
        if is_focused {
            (self.accent_soft, self.text)
        } else {
            (self.surface, self.text_dim)
        }
    }
}
