//! HTTP client for the kernel's `/worker` endpoint.

use async_trait::async_trait;
use netsmog_contracts::{
    Assignment, AuthToken, ProtocolError, ResultBatch, ResultSink, SubmitError,
    AUTHORISATION_HEADER, WORKER_HEADER, WORKER_PATH,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("kernel unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("kernel answered HTTP {0}")]
    Status(u16),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("invalid header value for {0}")]
    Header(&'static str),
}

pub fn user_agent() -> String {
    format!("NetSmog Worker version {}", env!("CARGO_PKG_VERSION"))
}

/// Talks to the kernel on behalf of one worker identity.
///
/// The token is computed once and sent with every request.
#[derive(Clone)]
pub struct CoordinatorClient {
    url: String,
    http: reqwest::Client,
}

impl CoordinatorClient {
    /// `server` is the kernel base URL; a trailing `/worker` is accepted.
    pub fn new(server: &str, worker: &str, token: &AuthToken) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header_name(WORKER_HEADER)?,
            HeaderValue::from_str(worker).map_err(|_| FetchError::Header(WORKER_HEADER))?,
        );
        let mut auth = HeaderValue::from_str(token.as_str())
            .map_err(|_| FetchError::Header(AUTHORISATION_HEADER))?;
        auth.set_sensitive(true);
        headers.insert(header_name(AUTHORISATION_HEADER)?, auth);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent()).map_err(|_| FetchError::Header("User-Agent"))?,
        );

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            url: worker_url(server),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Anything but `200` is a refusal, even another 2xx.
    pub async fn fetch_assignment(&self) -> Result<Assignment, FetchError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ProtocolError::new("assignment", e).into())
    }
}

fn header_name(name: &'static str) -> Result<HeaderName, FetchError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| FetchError::Header(name))
}

fn worker_url(server: &str) -> String {
    let base = server.trim_end_matches('/');
    let base = base.strip_suffix(WORKER_PATH).unwrap_or(base);
    format!("{base}{WORKER_PATH}")
}

#[async_trait]
impl ResultSink for CoordinatorClient {
    async fn submit(&self, batch: &ResultBatch) -> Result<(), SubmitError> {
        let body = serde_json::to_vec(batch).map_err(|e| ProtocolError::new("result batch", e))?;
        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SubmitError::Status(status.as_u16()))
        }
    }
}
