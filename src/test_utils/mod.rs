pub mod fake_api;

pub mod test_helpers {
    use super::fake_api::FakeApi;
    use crate::app::App;
    use crate::config::Config;
    use crate::event_source::{Event, KeyCode, SimulatedEventSource};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::time::Duration;

    /// Builder for scripted sessions
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl Default for TestScenarioBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self { events: Vec::new() }
        }

        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        pub fn press_ctrl_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::ctrl_char_key(c));
            self
        }

        pub fn press(mut self, code: KeyCode) -> Self {
            self.events.push(SimulatedEventSource::key(code));
            self
        }

        pub fn press_enter(self) -> Self {
            self.press(KeyCode::Enter)
        }

        pub fn press_tab(self) -> Self {
            self.press(KeyCode::Tab)
        }

        pub fn type_text(mut self, text: &str) -> Self {
            for c in text.chars() {
                self.events.push(SimulatedEventSource::char_key(c));
            }
            self
        }

        /// Press 'j' n times
        pub fn navigate_down(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('j'));
            }
            self
        }

        /// Press 'k' n times
        pub fn navigate_up(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('k'));
            }
            self
        }

        pub fn next_page(self) -> Self {
            self.press_char('l')
        }

        pub fn prev_page(self) -> Self {
            self.press_char('h')
        }

        pub fn resize(mut self, columns: u16, rows: u16) -> Self {
            self.events.push(SimulatedEventSource::resize(columns, rows));
            self
        }

        pub fn click(mut self, column: u16, row: u16) -> Self {
            self.events.push(SimulatedEventSource::mouse_down(column, row));
            self
        }

        pub fn scroll_down(mut self, column: u16, row: u16) -> Self {
            self.events
                .push(SimulatedEventSource::mouse_scroll_down(column, row));
            self
        }

        pub fn quit(self) -> Self {
            self.press_char('q')
        }

        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    /// Test terminal with the cursor hidden
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.hide_cursor().unwrap();
        terminal
    }

    /// Current terminal buffer as text, trailing blanks trimmed
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                let cell = buffer.cell((x, y)).unwrap();
                line.push_str(cell.symbol());
            }
            lines.push(line.trim_end().to_string());
        }

        while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }

        lines.join("\n")
    }

    /// Config with no resize debounce so tests need not sleep.
    pub fn test_config() -> Config {
        Config {
            resize_debounce_ms: 0,
            ..Config::default()
        }
    }

    /// App over `api` with the menu already loaded.
    pub fn create_test_app(api: FakeApi) -> App<FakeApi> {
        let mut app = App::new(api, &test_config()).unwrap();
        app.settle(Duration::from_secs(5));
        app
    }

    pub fn create_test_app_with_sample_handbook() -> (App<FakeApi>, FakeApi) {
        let api = FakeApi::with_sample_handbook();
        (create_test_app(api.clone()), api)
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;

    #[test]
    fn test_scenario_builder() {
        let scenario = TestScenarioBuilder::new()
            .navigate_down(2)
            .press_enter()
            .press_tab()
            .navigate_up(1)
            .resize(100, 30)
            .quit()
            .build();

        assert_eq!(scenario.events.len(), 7);
    }

    #[test]
    fn test_created_app_has_menu() {
        let (app, api) = create_test_app_with_sample_handbook();
        assert_eq!(api.menu_fetches(), 1);
        assert_eq!(app.sidebar.menu().len(), 3);
        assert!(!app.is_busy());
    }
}
