pub mod admin;
pub mod flipbook;
pub mod sidebar;

pub use admin::AdminPanel;
pub use flipbook::FlipbookViewer;
pub use sidebar::Sidebar;
