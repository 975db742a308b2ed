//! Pluggable transport the authenticated client sends requests through.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Url};

use super::error::TransportError;
use super::request::{ApiRequest, RawResponse};
use crate::config::ClientConfig;

/// Sends one request and returns the raw 2xx response.
///
/// Non-2xx statuses, timeouts and connection failures come back as
/// [`TransportError`]; interpreting the body is the caller's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest, url: &Url) -> Result<RawResponse, TransportError>;
}

/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client with the configured user agent and timeout and a JSON content type.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self::new(client))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, request), fields(method = %request.method))]
    async fn send(&self, request: &ApiRequest, url: &Url) -> Result<RawResponse, TransportError> {
        debug!("{} {}...", request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .headers(request.headers.clone());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            debug!("{} {} failed with HTTP {}", request.method, url, status);
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}
