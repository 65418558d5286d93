pub mod event_source;
pub mod text_area_utils;

pub use event_source::{EventSource, KeyboardEventSource, SimulatedEventSource};
pub use text_area_utils::map_keys_to_input;
