// API client module: a small blocking HTTP client that talks to the ESDoc
// hosting API. It only knows how to POST JSON and GET raw bodies; what the
// bodies mean is decided by the uploader.

use crate::error::GatewayError;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::debug;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Status code and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Transport used by the uploader. Paths are relative to the API host.
///
/// Implementations never panic on network problems: anything that goes wrong,
/// including a status code of 400 or more, comes back as a `GatewayError`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ApiGateway: Send + Sync {
    /// POST `body` serialized as JSON to `path`.
    fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<RawResponse, GatewayError>;

    /// GET `path` and return the body untouched.
    fn get_raw(&self, path: &str) -> Result<RawResponse, GatewayError>;
}

/// Gateway backed by a reqwest blocking client.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    /// Create a gateway for the API reachable at `base_url`
    /// (for example `https://doc.esdoc.org`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(base_url, client))
    }

    /// Same as `new` with a preconfigured client (timeouts, proxies...).
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        HttpGateway {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Reads the whole body and turns error statuses into `GatewayError::Status`.
    fn complete(res: reqwest::blocking::Response) -> Result<RawResponse, GatewayError> {
        let status = res.status().as_u16();
        let body = res.text()?;
        debug!(status, bytes = body.len(), "API response received");
        if status >= 400 {
            return Err(GatewayError::Status { status, body });
        }
        Ok(RawResponse { status, body })
    }
}

impl ApiGateway for HttpGateway {
    fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<RawResponse, GatewayError> {
        let url = self.url(path);
        let data = body.to_string();
        debug!(%url, "POST");
        let res = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, data.len())
            .body(data)
            .send()?;
        Self::complete(res)
    }

    fn get_raw(&self, path: &str) -> Result<RawResponse, GatewayError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let res = self.client.get(&url).send()?;
        Self::complete(res)
    }
}
