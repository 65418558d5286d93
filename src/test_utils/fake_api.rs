/// In-memory stand-in for the handbook REST API
use crate::api::{ApiError, HandbookApi, SectionPayload};
use crate::chapter::SectionPage;
use crate::menu::MenuNode;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Create(SectionPayload),
    Update(i64, SectionPayload),
    Delete(i64),
}

#[derive(Debug, Default)]
struct FakeState {
    menu: Vec<MenuNode>,
    sections: HashMap<i64, Vec<SectionPage>>,
    failing_sections: HashSet<i64>,
    held_sections: HashSet<i64>,
    fail_menu: bool,
    fail_mutations: bool,
    calls: Vec<RecordedCall>,
    menu_fetches: usize,
}

/// Cloning shares the same state, so a test can keep a handle after moving
/// the API into a loader.
#[derive(Debug, Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    pub fn new(menu: Vec<MenuNode>) -> Self {
        let api = Self::default();
        api.lock().menu = menu;
        api
    }

    pub fn with_sample_handbook() -> Self {
        let api = Self::new(sample_menu());
        for (id, content) in sample_sections() {
            api.set_section(id, content);
        }
        api
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_section(&self, id: i64, content: impl Into<String>) {
        self.lock().sections.insert(
            id,
            vec![SectionPage {
                index: 1,
                content: content.into(),
                media: vec![],
            }],
        );
    }

    pub fn fail_section(&self, id: i64) {
        self.lock().failing_sections.insert(id);
    }

    pub fn recover_section(&self, id: i64) {
        self.lock().failing_sections.remove(&id);
    }

    pub fn fail_menu(&self, fail: bool) {
        self.lock().fail_menu = fail;
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.lock().fail_mutations = fail;
    }

    /// Hold fetches of `id` until [`FakeApi::release_section`] is called.
    pub fn hold_section(&self, id: i64) {
        self.lock().held_sections.insert(id);
    }

    pub fn release_section(&self, id: i64) {
        self.lock().held_sections.remove(&id);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn menu_fetches(&self) -> usize {
        self.lock().menu_fetches
    }

    fn server_error() -> ApiError {
        ApiError::Http {
            status: 500,
            body: "Internal Server Error".to_string(),
        }
    }

    fn record(&self, call: RecordedCall) -> Result<(), ApiError> {
        let mut state = self.lock();
        if state.fail_mutations {
            return Err(Self::server_error());
        }
        match &call {
            RecordedCall::Create(payload) => {
                let id = 1000 + state.calls.len() as i64;
                let mut node = MenuNode::leaf(id, payload.name.clone());
                node.index = payload.index;
                node.parent_id = payload.parent_id.flatten();
                match node.parent_id {
                    Some(parent) => {
                        if let Some(parent) = find_mut(&mut state.menu, parent) {
                            parent.children.push(node);
                        }
                    }
                    None => state.menu.push(node),
                }
                state.sections.insert(id, payload.section_pages.clone());
            }
            RecordedCall::Update(id, payload) => {
                if let Some(node) = find_mut(&mut state.menu, *id) {
                    node.name = payload.name.clone();
                    node.index = payload.index;
                }
                if let Some(parent_id) = payload.parent_id {
                    move_node(&mut state.menu, *id, parent_id);
                }
                state.sections.insert(*id, payload.section_pages.clone());
            }
            RecordedCall::Delete(id) => remove(&mut state.menu, *id),
        }
        state.calls.push(call);
        Ok(())
    }
}

fn find_mut(items: &mut [MenuNode], id: i64) -> Option<&mut MenuNode> {
    for item in items.iter_mut() {
        if item.id == id {
            return Some(item);
        }
        if let Some(found) = find_mut(&mut item.children, id) {
            return Some(found);
        }
    }
    None
}

fn take(items: &mut Vec<MenuNode>, id: i64) -> Option<MenuNode> {
    if let Some(at) = items.iter().position(|item| item.id == id) {
        return Some(items.remove(at));
    }
    items.iter_mut().find_map(|item| take(&mut item.children, id))
}

fn move_node(menu: &mut Vec<MenuNode>, id: i64, parent_id: Option<i64>) {
    let unchanged = find_mut(menu, id).is_none_or(|node| node.parent_id == parent_id);
    if unchanged {
        return;
    }
    let Some(mut node) = take(menu, id) else {
        return;
    };
    node.parent_id = parent_id;
    match parent_id.and_then(|parent| find_mut(menu, parent)) {
        Some(parent) => parent.children.push(node),
        None => menu.push(node),
    }
}

fn remove(items: &mut Vec<MenuNode>, id: i64) {
    items.retain(|item| item.id != id);
    for item in items.iter_mut() {
        remove(&mut item.children, id);
    }
}

impl HandbookApi for FakeApi {
    fn fetch_menu(&self) -> impl Future<Output = Result<Vec<MenuNode>, ApiError>> + Send {
        let result = {
            let mut state = self.lock();
            state.menu_fetches += 1;
            if state.fail_menu {
                Err(Self::server_error())
            } else {
                Ok(state.menu.clone())
            }
        };
        std::future::ready(result)
    }

    fn fetch_section_pages(
        &self,
        section_id: i64,
    ) -> impl Future<Output = Result<Vec<SectionPage>, ApiError>> + Send {
        let api = self.clone();
        async move {
            loop {
                let held = api.lock().held_sections.contains(&section_id);
                if !held {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            let state = api.lock();
            if state.failing_sections.contains(&section_id) {
                return Err(Self::server_error());
            }
            Ok(state.sections.get(&section_id).cloned().unwrap_or_default())
        }
    }

    fn create_section(
        &self,
        payload: &SectionPayload,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        std::future::ready(self.record(RecordedCall::Create(payload.clone())))
    }

    fn update_section(
        &self,
        section_id: i64,
        payload: &SectionPayload,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        std::future::ready(self.record(RecordedCall::Update(section_id, payload.clone())))
    }

    fn delete_section(&self, section_id: i64) -> impl Future<Output = Result<(), ApiError>> + Send {
        std::future::ready(self.record(RecordedCall::Delete(section_id)))
    }
}

/// A small two-part handbook with one nested chapter.
pub fn sample_menu() -> Vec<MenuNode> {
    vec![
        MenuNode::branch(
            1,
            "Phần I. Quy định chung",
            vec![
                MenuNode::leaf(11, "Điều 1. Phạm vi điều chỉnh"),
                MenuNode::leaf(12, "Điều 2. Đối tượng áp dụng"),
            ],
        ),
        MenuNode::branch(
            2,
            "Phần II. Phòng chống tội phạm",
            vec![MenuNode::branch(
                21,
                "Chương 1. Tội phạm công nghệ cao",
                vec![
                    MenuNode::leaf(211, "Điều 3. Lừa đảo qua mạng"),
                    MenuNode::leaf(212, "Điều 4. Đánh bạc trực tuyến")
                        .with_cached_content("<p>Cached article four.</p>", 4),
                ],
            )],
        ),
        MenuNode::leaf(3, "Phụ lục"),
    ]
}

pub fn long_article(paragraphs: usize) -> String {
    (1..=paragraphs)
        .map(|i| {
            format!(
                "<p>Khoản {i}. Người dân cần cảnh giác với các cuộc gọi mạo danh cơ quan chức năng \
                 và tuyệt đối không cung cấp mã OTP cho bất kỳ ai.</p>\n"
            )
        })
        .collect()
}

fn sample_sections() -> Vec<(i64, String)> {
    vec![
        (11, "<p>Article one covers the scope of the handbook.</p>".to_string()),
        (12, "<p>Article two lists who the handbook applies to.</p>".to_string()),
        (211, long_article(12)),
        (212, "<p>Article four, fresh from the server.</p>".to_string()),
        (3, "<h2>Appendix</h2><p>Hotline numbers.</p>".to_string()),
    ]
}
