pub mod http;

pub use http::HttpHandbookApi;

use crate::chapter::SectionPage;
use crate::menu::MenuNode;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("server returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid API address '{0}'")]
    InvalidUrl(String),
    #[error("request could not be scheduled: {0}")]
    Runtime(String),
}

/// Create/update body for `/section`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPayload {
    pub index: i64,
    pub name: String,
    /// `None` omits the field. `Some(None)` sends `null`, which places the
    /// section at the top level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<i64>>,
    pub section_pages: Vec<SectionPage>,
}

/// The remote content API.
///
/// Futures must be `Send` so the loader can drive them on its runtime.
pub trait HandbookApi: Send + Sync + 'static {
    fn fetch_menu(&self) -> impl Future<Output = Result<Vec<MenuNode>, ApiError>> + Send;

    fn fetch_section_pages(
        &self,
        section_id: i64,
    ) -> impl Future<Output = Result<Vec<SectionPage>, ApiError>> + Send;

    fn create_section(
        &self,
        payload: &SectionPayload,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn update_section(
        &self,
        section_id: i64,
        payload: &SectionPayload,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn delete_section(&self, section_id: i64) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Responses come wrapped as `{ "data": ... }`; bare bodies are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: Option<T> },
    Bare(T),
}

impl<T: Default> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data.unwrap_or_default(),
            Envelope::Bare(value) => value,
        }
    }
}
