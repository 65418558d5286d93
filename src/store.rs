use crate::chapter::Chapter;
use std::sync::Arc;

/// Reader state shared by the sidebar and the flipbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub selected_chapter: Option<Arc<Chapter>>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub collapsed: bool,
    pub search_query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    ChapterSelected,
    LoadingChanged,
    ErrorChanged,
    SidebarToggled,
    SearchChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(StoreEvent, &UiState)>;

/// Owner of [`UiState`]. Mutation goes through the setters, and every
/// effective change is delivered to all subscribers before the setter returns.
pub struct Store {
    state: UiState,
    revision: u64,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("revision", &self.revision)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            state: UiState::default(),
            revision: 0,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn snapshot(&self) -> UiState {
        self.state.clone()
    }

    /// Incremented once per effective change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(StoreEvent, &UiState) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    pub fn set_selected_chapter(&mut self, chapter: impl Into<Arc<Chapter>>) {
        let chapter = chapter.into();
        let unchanged = self
            .state
            .selected_chapter
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &chapter));
        if unchanged {
            return;
        }
        log::debug!("Selected chapter {} ({})", chapter.id, chapter.title);
        self.state.selected_chapter = Some(chapter);
        self.notify(StoreEvent::ChapterSelected);
    }

    pub fn set_loading(&mut self, loading: bool) {
        if self.state.is_loading != loading {
            self.state.is_loading = loading;
            self.notify(StoreEvent::LoadingChanged);
        }
    }

    pub fn set_error(&mut self, error: Option<String>) {
        if self.state.error != error {
            if let Some(message) = &error {
                log::warn!("UI error: {message}");
            }
            self.state.error = error;
            self.notify(StoreEvent::ErrorChanged);
        }
    }

    pub fn clear_error(&mut self) {
        self.set_error(None);
    }

    pub fn toggle_sidebar(&mut self) {
        self.state.collapsed = !self.state.collapsed;
        self.notify(StoreEvent::SidebarToggled);
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if self.state.search_query != query {
            self.state.search_query = query;
            self.notify(StoreEvent::SearchChanged);
        }
    }

    fn notify(&mut self, event: StoreEvent) {
        self.revision += 1;
        let state = &self.state;
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(event, state);
        }
    }
}
