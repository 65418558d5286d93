use super::{ApiError, Envelope, HandbookApi, SectionPayload};
use crate::chapter::SectionPage;
use crate::menu::MenuNode;
use log::{debug, error};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

/// `HandbookApi` over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpHandbookApi {
    base_url: Url,
    client: Client,
}

impl HttpHandbookApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(trimmed)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| ApiError::InvalidUrl(base_url.to_string()))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

async fn read_data<T>(request: RequestBuilder) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default + Send,
{
    let response = request.send().await?;
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await?;
    if !status.is_success() {
        error!("GET {url} failed with {status}");
        return Err(ApiError::Http {
            status: status.as_u16(),
            body,
        });
    }
    debug!("GET {url} -> {} bytes", body.len());
    let envelope: Envelope<T> = serde_json::from_str(&body)?;
    Ok(envelope.into_inner())
}

async fn expect_success(request: RequestBuilder) -> Result<(), ApiError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        debug!("{} -> {status}", response.url());
        return Ok(());
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    error!("Section mutation failed with {status}: {body}");
    Err(ApiError::Http {
        status: status.as_u16(),
        body,
    })
}

impl HandbookApi for HttpHandbookApi {
    fn fetch_menu(&self) -> impl Future<Output = Result<Vec<MenuNode>, ApiError>> + Send {
        read_data(self.client.get(self.endpoint("menu")))
    }

    fn fetch_section_pages(
        &self,
        section_id: i64,
    ) -> impl Future<Output = Result<Vec<SectionPage>, ApiError>> + Send {
        read_data(
            self.client
                .get(self.endpoint("section-page"))
                .query(&[("idSection", section_id)]),
        )
    }

    fn create_section(
        &self,
        payload: &SectionPayload,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        expect_success(self.client.post(self.endpoint("section")).json(payload))
    }

    fn update_section(
        &self,
        section_id: i64,
        payload: &SectionPayload,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        expect_success(
            self.client
                .put(self.endpoint(&format!("section/{section_id}")))
                .json(payload),
        )
    }

    fn delete_section(&self, section_id: i64) -> impl Future<Output = Result<(), ApiError>> + Send {
        expect_success(
            self.client
                .delete(self.endpoint(&format!("section/{section_id}"))),
        )
    }
}
