//! Gateway to the back-office REST API.

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use tracing::{debug, instrument, warn};

use super::EntityRepository;
use crate::config::AppConfig;
use crate::errors::{ServiceError, ServiceResult};
use crate::models::{ApiEnvelope, EntityStatus, Page, PageRequest, Pagination, Record, UpdateStatusInput};

/// Shared HTTP client for every gateway.
pub fn build_client(config: &AppConfig) -> ServiceResult<Client> {
    let mut builder = Client::builder()
        .user_agent(concat!("freight-desk/", env!("CARGO_PKG_VERSION")))
        .gzip(true);
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| ServiceError::ConfigError(format!("HTTP client: {}", e)))
}

pub struct RestRepository<E> {
    client: Client,
    base_url: Url,
    _record: PhantomData<fn() -> E>,
}

impl<E> Clone for RestRepository<E> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            _record: PhantomData,
        }
    }
}

impl<E: Record> RestRepository<E> {
    pub fn new(client: Client, base_url: &str) -> ServiceResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ServiceError::ConfigError(format!("api_base_url {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::ConfigError(format!(
                "api_base_url {} cannot carry a path",
                base_url
            )));
        }
        Ok(Self {
            client,
            base_url,
            _record: PhantomData,
        })
    }

    pub fn from_config(client: Client, config: &AppConfig) -> ServiceResult<Self> {
        Self::new(client, &config.api_base_url)
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(E::KIND.resource()).extend(segments);
        }
        url
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> ServiceResult<Response> {
        debug!(%method, %url, "backend request");
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        check_status(response).await
    }

    async fn record(&self, method: Method, url: Url, body: Option<&impl Serialize>) -> ServiceResult<E> {
        let response = self.send(method, url, body).await?;
        let envelope: ApiEnvelope<E> = decode(response).await?;
        Ok(envelope.data)
    }
}

async fn check_status(response: Response) -> ServiceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = server_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    });
    warn!(status = status.as_u16(), %message, "backend rejected request");
    if status == StatusCode::NOT_FOUND {
        return Err(ServiceError::NotFound(message));
    }
    Err(ServiceError::ServerError {
        status: status.as_u16(),
        message,
    })
}

/// Pulls a readable message out of an error body (`message`, then `error`).
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"].iter().find_map(|field| match value.get(field)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Object(inner) => inner
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_owned),
        _ => None,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> ServiceResult<ApiEnvelope<T>> {
    let bytes = response.bytes().await?;
    let envelope: ApiEnvelope<T> = serde_json::from_slice(&bytes)?;
    if let Some(code) = envelope.code.filter(|c| *c >= 400) {
        let message = envelope
            .error
            .as_ref()
            .and_then(|e| e.as_str().map(str::to_owned))
            .unwrap_or_else(|| format!("request failed with code {}", code));
        return Err(if code == 404 {
            ServiceError::NotFound(message)
        } else {
            ServiceError::ServerError {
                status: code,
                message,
            }
        });
    }
    Ok(envelope)
}

#[async_trait]
impl<E: Record> EntityRepository<E> for RestRepository<E> {
    #[instrument(skip(self), fields(kind = %E::KIND))]
    async fn list(&self, page: PageRequest) -> ServiceResult<Page<E>> {
        let mut url = self.url(&[]);
        url.query_pairs_mut()
            .append_pair("page", &page.page.to_string())
            .append_pair("limit", &page.limit.to_string());
        let response = self.send::<()>(Method::GET, url, None).await?;
        let envelope: ApiEnvelope<Vec<E>> = decode(response).await?;
        let pagination = envelope
            .pagination
            .unwrap_or_else(|| Pagination::for_total(envelope.data.len() as u64, page));
        Ok(Page {
            data: envelope.data,
            pagination,
        })
    }

    #[instrument(skip(self), fields(kind = %E::KIND))]
    async fn get(&self, key: &str) -> ServiceResult<E> {
        self.record(Method::GET, self.url(&[key]), None::<&()>).await
    }

    #[instrument(skip(self, input), fields(kind = %E::KIND))]
    async fn create(&self, input: &E::Input) -> ServiceResult<E> {
        self.record(Method::POST, self.url(&[]), Some(input)).await
    }

    #[instrument(skip(self, input), fields(kind = %E::KIND))]
    async fn update(&self, key: &str, input: &E::Input) -> ServiceResult<E> {
        self.record(Method::PUT, self.url(&[key]), Some(input)).await
    }

    #[instrument(skip(self), fields(kind = %E::KIND))]
    async fn delete(&self, key: &str) -> ServiceResult<()> {
        self.send::<()>(Method::DELETE, self.url(&[key]), None).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(kind = %E::KIND))]
    async fn update_status(&self, key: &str, status: EntityStatus) -> ServiceResult<E> {
        if !E::HAS_LIFECYCLE {
            return Err(ServiceError::InvalidOperation(format!(
                "{} {} has no status",
                E::KIND.label(),
                key
            )));
        }
        let body = UpdateStatusInput { status };
        self.record(Method::PUT, self.url(&["status", key]), Some(&body))
            .await
    }

    #[instrument(skip(self), fields(kind = %E::KIND))]
    async fn duplicate(&self, key: &str) -> ServiceResult<E> {
        self.record(Method::POST, self.url(&["copy", key]), None::<&()>)
            .await
    }
}
