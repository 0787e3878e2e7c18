//! HTTP adapter for a raster sampling service.
//!
//! Endpoints (all under `base_url`, bearer-token authenticated):
//! - `GET  /v1/session` - 200 when the token is accepted
//! - `GET  /v1/collections/count?collection=&band=&start=&end=` -> `{"count": n}`
//! - `POST /v1/collections/sample` -> `{"samples": [{"index": i, "value": v|null}]}`
//!
//! `start`/`end` are `YYYY-MM-DD`, end exclusive.

use crate::{
    adapter::{SampleRequest, SourceAdapter},
    date_range::DateWindow,
    error::{AdapterError, ConfigError},
    observation::RawSamples,
    point::SamplePoint,
};
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::{env, time::Duration};
use wfr_utils::dates::format_date;

pub const ENV_API_URL: &str = "WFR_API_URL";
pub const ENV_API_TOKEN: &str = "WFR_API_TOKEN";
pub const ENV_HTTP_TIMEOUT: &str = "WFR_HTTP_TIMEOUT_SECS";

/// Connection settings for [`HttpAdapter`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpAdapterConfig {
    pub base_url: String,
    /// Missing token is reported by `authenticate`, not at construction
    pub token: Option<String>,
    pub request_timeout: Duration,
    /// Points sent per sample request
    pub batch_size: usize,
}

impl HttpAdapterConfig {
    pub const DEFAULT_BATCH_SIZE: usize = 500;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Load from `WFR_API_URL`, `WFR_API_TOKEN` and `WFR_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<HttpAdapterConfig, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`HttpAdapterConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<HttpAdapterConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_API_URL)
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_API_URL))?;
        let token = lookup(ENV_API_TOKEN).filter(|t| !t.trim().is_empty());
        let timeout_secs = match lookup(ENV_HTTP_TIMEOUT) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::Invalid {
                    name: ENV_HTTP_TIMEOUT,
                    reason: e.to_string(),
                })?,
            None => Self::DEFAULT_TIMEOUT_SECS,
        };
        Ok(HttpAdapterConfig {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token,
            request_timeout: Duration::from_secs(timeout_secs),
            batch_size: Self::DEFAULT_BATCH_SIZE,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: usize,
}

#[derive(Debug, Serialize)]
struct SamplePointBody {
    index: usize,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Serialize)]
struct SampleBody<'a> {
    collection: &'a str,
    band: &'a str,
    start: String,
    end: String,
    reducer: &'static str,
    scale: u32,
    tile_scale: u32,
    points: Vec<SamplePointBody>,
}

#[derive(Debug, Deserialize)]
struct SampleValue {
    index: usize,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SampleResponse {
    samples: Vec<SampleValue>,
}

pub struct HttpAdapter {
    client: Client,
    config: HttpAdapterConfig,
}

impl HttpAdapter {
    pub fn new(config: HttpAdapterConfig) -> Result<HttpAdapter, AdapterError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AdapterError::Transient(e.to_string()))?;
        Ok(HttpAdapter { client, config })
    }

    fn token(&self) -> Result<&str, AdapterError> {
        self.config.token.as_deref().ok_or_else(|| {
            AdapterError::Authentication(format!("{ENV_API_TOKEN} is not set"))
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }
}

/// Map transport failures and status codes onto the adapter taxonomy.
fn checked(result: reqwest::Result<Response>) -> Result<Response, AdapterError> {
    let response = result.map_err(|e| AdapterError::Transient(e.to_string()))?;
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AdapterError::Authentication(
            format!("sampling service rejected credentials ({})", response.status()),
        )),
        status if status.is_success() => Ok(response),
        status => Err(AdapterError::Transient(format!(
            "unexpected status {status}"
        ))),
    }
}

impl SourceAdapter for HttpAdapter {
    async fn authenticate(&self) -> Result<(), AdapterError> {
        let token = self.token()?;
        checked(
            self.client
                .get(self.url("/v1/session"))
                .bearer_auth(token)
                .send()
                .await,
        )?;
        Ok(())
    }

    async fn count(
        &self,
        collection: &str,
        band: &str,
        window: &DateWindow,
    ) -> Result<usize, AdapterError> {
        let token = self.token()?;
        let start = format_date(&window.start);
        let end = format_date(&window.end);
        let response = checked(
            self.client
                .get(self.url("/v1/collections/count"))
                .bearer_auth(token)
                .query(&[
                    ("collection", collection),
                    ("band", band),
                    ("start", start.as_str()),
                    ("end", end.as_str()),
                ])
                .send()
                .await,
        )?;
        let body: CountResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(e.to_string()))?;
        Ok(body.count)
    }

    async fn query(
        &self,
        request: &SampleRequest<'_>,
        points: &[SamplePoint],
    ) -> Result<RawSamples, AdapterError> {
        let token = self.token()?;
        let mut samples = RawSamples::new();
        for batch in points.chunks(self.config.batch_size.max(1)) {
            let body = SampleBody {
                collection: request.collection,
                band: request.band,
                start: format_date(&request.window.start),
                end: format_date(&request.window.end),
                reducer: request.aggregation.as_str(),
                scale: request.scale_m,
                tile_scale: request.tile_scale,
                points: batch
                    .iter()
                    .map(|point| SamplePointBody {
                        index: point.index,
                        lat: point.latitude,
                        lon: point.longitude,
                    })
                    .collect(),
            };
            let response = checked(
                self.client
                    .post(self.url("/v1/collections/sample"))
                    .bearer_auth(token)
                    .json(&body)
                    .send()
                    .await,
            )?;
            let parsed: SampleResponse = response
                .json()
                .await
                .map_err(|e| AdapterError::Malformed(e.to_string()))?;
            debug!(
                "{}: {} samples returned for a batch of {}",
                request.collection,
                parsed.samples.len(),
                batch.len()
            );
            for sample in parsed.samples {
                samples.insert(sample.index, sample.value);
            }
            // points the service silently dropped count as masked
            for point in batch {
                samples.entry(point.index).or_insert(None);
            }
        }
        Ok(samples)
    }
}
