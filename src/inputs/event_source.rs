use anyhow::Result;
pub use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use std::time::Duration;

/// Where terminal events come from. Lets tests replay a scripted session.
pub trait EventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool>;

    fn read(&mut self) -> Result<Event>;

    /// Whether the app should let background requests finish before the
    /// next event is read.
    fn settle_before_read(&self) -> bool {
        false
    }
}

/// Live terminal input via crossterm.
pub struct KeyboardEventSource;

impl EventSource for KeyboardEventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool> {
        Ok(crossterm::event::poll(timeout)?)
    }

    fn read(&mut self) -> Result<Event> {
        Ok(crossterm::event::read()?)
    }
}

/// Scripted events for tests. Once the script runs out it answers `q`.
pub struct SimulatedEventSource {
    pub(crate) events: Vec<Event>,
    current_index: usize,
}

impl SimulatedEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            current_index: 0,
        }
    }

    pub fn key_event(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        })
    }

    pub fn key(code: KeyCode) -> Event {
        Self::key_event(code, KeyModifiers::empty())
    }

    pub fn char_key(c: char) -> Event {
        Self::key(KeyCode::Char(c))
    }

    pub fn ctrl_char_key(c: char) -> Event {
        Self::key_event(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    pub fn resize(columns: u16, rows: u16) -> Event {
        Event::Resize(columns, rows)
    }

    pub fn mouse_down(column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::empty(),
        })
    }

    pub fn mouse_scroll_down(column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::ScrollDown,
            column,
            row,
            modifiers: KeyModifiers::empty(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.events.len() - self.current_index
    }
}

impl EventSource for SimulatedEventSource {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(true)
    }

    fn read(&mut self) -> Result<Event> {
        match self.events.get(self.current_index) {
            Some(event) => {
                self.current_index += 1;
                Ok(event.clone())
            }
            None => Ok(Self::char_key('q')),
        }
    }

    fn settle_before_read(&self) -> bool {
        true
    }
}
