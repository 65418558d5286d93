pub mod api;
pub mod app;
pub mod chapter;
pub mod config;
pub mod inputs;
pub mod loader;
pub mod menu;
pub mod notification;
pub mod panic_handler;
pub mod paginator;
pub mod parsing;
pub mod store;
pub mod theme;
pub mod widget;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app::{App, run_app_with_event_source};
pub use inputs::event_source;
