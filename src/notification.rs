use crate::theme::Palette;
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::Span,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub created_at: Instant,
    pub timeout: Duration,
}

impl Notification {
    pub fn new(message: impl Into<String>, level: NotificationLevel) -> Self {
        Self {
            message: message.into(),
            level,
            created_at: Instant::now(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) > self.timeout
    }
}

/// One toast at a time; a newer message replaces the older one.
#[derive(Debug, Default)]
pub struct NotificationManager {
    current: Option<Notification>,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, notification: Notification) {
        log::debug!("Notification: {}", notification.message);
        self.current = Some(notification);
    }

    pub fn show_info(&mut self, message: impl Into<String>) {
        self.show(Notification::new(message, NotificationLevel::Info));
    }

    pub fn show_warning(&mut self, message: impl Into<String>) {
        self.show(Notification::new(message, NotificationLevel::Warning));
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.show(Notification::new(message, NotificationLevel::Error));
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// Drop an expired toast. Returns true when something was removed.
    pub fn update(&mut self, now: Instant) -> bool {
        if self.current.as_ref().is_some_and(|n| n.is_expired_at(now)) {
            self.current = None;
            return true;
        }
        false
    }

    pub fn render(&self, f: &mut Frame, area: Rect, palette: &Palette) {
        let Some(notification) = &self.current else {
            return;
        };
        let color = match notification.level {
            NotificationLevel::Info => palette.success,
            NotificationLevel::Warning => palette.accent,
            NotificationLevel::Error => palette.danger,
        };
        let width = (notification.message.chars().count() as u16 + 4)
            .min(area.width.saturating_sub(2))
            .max(10)
            .min(area.width);
        let height = 3.min(area.height);
        let toast = Rect {
            x: area.right().saturating_sub(width + 1).max(area.x),
            y: area.bottom().saturating_sub(height + 1).max(area.y),
            width,
            height,
        };
        f.render_widget(Clear, toast);
        f.render_widget(
            Paragraph::new(Span::styled(
                notification.message.clone(),
                Style::default().fg(palette.text),
            ))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            ),
            toast,
        );
    }
}
