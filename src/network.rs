use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::DashboardError;
use crate::model::{ChartPoint, EventRecord, ViewMode};

/// The capture server's read-only JSON API.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn progress(&self) -> Result<f64, DashboardError>;
    async fn ips(&self) -> Result<Vec<String>, DashboardError>;
    async fn protocols(&self, ip: &str) -> Result<Vec<String>, DashboardError>;
    async fn timeline(
        &self,
        ip: &str,
        view: ViewMode,
        protocol: Option<&str>,
    ) -> Result<Vec<ChartPoint>, DashboardError>;
    async fn events(
        &self,
        ip: &str,
        protocol: Option<&str>,
    ) -> Result<Vec<EventRecord>, DashboardError>;
}

#[derive(Debug, Deserialize)]
struct ProgressBody {
    progress: f64,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct TimelineBucket {
    minute: Option<String>,
    timestamp: Option<String>,
    count: u64,
}

impl TimelineBucket {
    fn into_point(self, view: ViewMode) -> ChartPoint {
        let label = match view {
            ViewMode::Summarized => self.minute,
            ViewMode::Complete => self.timestamp,
        };
        ChartPoint {
            label: label.unwrap_or_default(),
            count: self.count,
        }
    }
}

/// Message of a non-2xx answer: the server's `{"error": ...}` text, or the raw body.
fn status_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned())
}

fn decode<T: DeserializeOwned>(endpoint: &'static str, body: &[u8]) -> Result<T, DashboardError> {
    serde_json::from_slice(body).map_err(|source| DashboardError::Decode { endpoint, source })
}

/// The server encodes an empty result set as `null`.
fn decode_list<T: DeserializeOwned>(
    endpoint: &'static str,
    body: &[u8],
) -> Result<Vec<T>, DashboardError> {
    decode::<Option<Vec<T>>>(endpoint, body).map(Option::unwrap_or_default)
}

pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, DashboardError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(DashboardError::BaseUrl(base_url));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| DashboardError::Request {
            endpoint: "client",
            source,
        })?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(
        &self,
        endpoint: &'static str,
        query: &[(&str, &str)],
    ) -> Result<Vec<u8>, DashboardError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GET {} {:?}", url, query);

        let request_err = |source: reqwest::Error| DashboardError::Request { endpoint, source };
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(request_err)?;
        let status = response.status();
        let body = response.bytes().await.map_err(request_err)?;

        if !status.is_success() {
            return Err(DashboardError::Status {
                endpoint,
                status,
                message: status_message(&body),
            });
        }
        Ok(body.to_vec())
    }
}

#[async_trait]
impl DashboardApi for ApiClient {
    async fn progress(&self) -> Result<f64, DashboardError> {
        let body = self.get("/api/progress", &[]).await?;
        decode::<ProgressBody>("/api/progress", &body).map(|b| b.progress)
    }

    async fn ips(&self) -> Result<Vec<String>, DashboardError> {
        let body = self.get("/api/ips", &[]).await?;
        decode_list("/api/ips", &body)
    }

    async fn protocols(&self, ip: &str) -> Result<Vec<String>, DashboardError> {
        let body = self.get("/api/protocols", &[("ip", ip)]).await?;
        decode_list("/api/protocols", &body)
    }

    async fn timeline(
        &self,
        ip: &str,
        view: ViewMode,
        protocol: Option<&str>,
    ) -> Result<Vec<ChartPoint>, DashboardError> {
        let mut query = vec![("ip", ip), ("view", view.as_str())];
        if let Some(protocol) = protocol {
            query.push(("protocol", protocol));
        }
        let body = self.get("/api/timeline", &query).await?;
        let buckets: Vec<TimelineBucket> = decode_list("/api/timeline", &body)?;
        Ok(buckets.into_iter().map(|b| b.into_point(view)).collect())
    }

    async fn events(
        &self,
        ip: &str,
        protocol: Option<&str>,
    ) -> Result<Vec<EventRecord>, DashboardError> {
        let mut query = vec![("ip", ip)];
        if let Some(protocol) = protocol {
            query.push(("protocol", protocol));
        }
        let body = self.get("/api/events", &query).await?;
        decode_list("/api/events", &body)
    }
}
