//! In-memory metadata fetcher.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use tms_resolver::{MetadataFetcher, ResolverError};

#[derive(Debug, Clone)]
enum Response {
    Body(Bytes),
    Status(u16),
}

/// Serves canned responses by URL and records every request.
///
/// Unknown URLs answer with a 404 transport error.
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: HashMap<String, Response>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` serialized as JSON.
    pub fn with_json(self, url: impl Into<String>, body: &serde_json::Value) -> Self {
        self.with_body(url, body.to_string())
    }

    /// Serve a raw body.
    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.responses.insert(url.into(), Response::Body(body.into()));
        self
    }

    /// Answer with a non-success status.
    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.responses.insert(url.into(), Response::Status(status));
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl MetadataFetcher for MockFetcher {
    async fn get(&self, url: &str, _accept: &str) -> tms_resolver::Result<Bytes> {
        self.requests.lock().unwrap().push(url.to_string());

        match self.responses.get(url) {
            Some(Response::Body(body)) => Ok(body.clone()),
            Some(Response::Status(status)) => Err(ResolverError::Transport {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(ResolverError::Transport {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_requests() {
        let fetcher = MockFetcher::new().with_body("http://a/", "{}");

        tokio_test::block_on(async {
            assert_eq!(fetcher.get("http://a/", "application/json").await.unwrap(), "{}");
            assert!(fetcher.get("http://b/", "application/json").await.is_err());
        });
        assert_eq!(fetcher.requests(), vec!["http://a/", "http://b/"]);
    }
}
