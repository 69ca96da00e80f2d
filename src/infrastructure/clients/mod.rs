use serde_json::Value;
use std::future::Future;
use thiserror::Error;

pub(crate) mod http;

/// One request for a page of source data.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub url: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl PageRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            body: Some(body),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn fingerprint(&self) -> String {
        match &self.body {
            Some(body) => format!("{} {}", self.url, body),
            None => self.url.clone(),
        }
    }
}

/// Failure of a single fetch attempt. All variants are retryable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("rate limited (HTTP {0})")]
    RateLimited(u16),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
}

/// A single attempt at retrieving a page's body text.
pub trait Fetch {
    fn fetch(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = std::result::Result<String, FetchError>>;
}
