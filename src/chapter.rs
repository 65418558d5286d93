use crate::menu::MenuNode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SECTION_ICON: &str = "📄";

/// One page of a section as returned by `GET /section-page`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionPage {
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub media: Vec<String>,
}

/// The chapter currently shown in the flipbook.
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub section_icon: String,
    pub page_number: i64,
    pub media: Vec<String>,
}

impl Chapter {
    /// The node keeps its own id and name so the sidebar highlights the right row.
    pub fn from_section(node: &MenuNode, page: &SectionPage) -> Self {
        Self {
            id: node.id,
            title: node.name.clone(),
            content: page.content.clone(),
            section_icon: DEFAULT_SECTION_ICON.to_string(),
            page_number: if page.index > 0 { page.index } else { 1 },
            media: page.media.iter().filter(|m| !m.is_empty()).cloned().collect(),
        }
    }

    /// Chapter built from content cached on the menu node itself.
    pub fn from_cached_node(node: &MenuNode) -> Option<Self> {
        let (content, page_number) = node.cached_content()?;
        Some(Self {
            id: node.id,
            title: node.name.clone(),
            content: content.to_string(),
            section_icon: DEFAULT_SECTION_ICON.to_string(),
            page_number,
            media: Vec::new(),
        })
    }
}
