//! Metadata transport.
//!
//! The resolver only needs request/response semantics, so the transport sits
//! behind [`MetadataFetcher`]. [`HttpFetcher`] is the reqwest implementation;
//! tests substitute an in-memory fetcher.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client};
use tracing::{debug, instrument, warn};

use crate::error::{ResolverError, Result};

/// `Accept` header value for metadata documents.
pub const ACCEPT_JSON: &str = "application/json";

/// Trait for anything that can GET a URL and hand back the body.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch `url` with the given `Accept` header.
    ///
    /// Non-success statuses must be reported as [`ResolverError::Transport`].
    async fn get(&self, url: &str, accept: &str) -> Result<Bytes>;
}

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Total request timeout
    pub request_timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("maptile-pipeline/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchConfig {
    /// Build a reqwest client carrying these timeouts and the user agent.
    pub fn build_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone())
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| ResolverError::Http {
                url: String::new(),
                message: format!("failed to create HTTP client: {}", e),
            })
    }
}

/// reqwest-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: config.build_client()?,
        })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataFetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &str, accept: &str) -> Result<Bytes> {
        debug!(accept = accept, "Fetching");

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| ResolverError::Http {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Request returned non-success status");
            return Err(ResolverError::Transport {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|e| ResolverError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("maptile-pipeline/"));
    }

    #[test]
    fn test_build_client_from_config() {
        let config = FetchConfig {
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(1),
            user_agent: "maptile-test".to_string(),
        };
        assert!(config.build_client().is_ok());
        assert!(HttpFetcher::new(&config).is_ok());
    }

    #[test]
    fn test_invalid_user_agent_is_http_error() {
        let config = FetchConfig {
            user_agent: "bad\nagent".to_string(),
            ..FetchConfig::default()
        };
        let err = config.build_client().unwrap_err();
        assert!(matches!(err, ResolverError::Http { .. }));
    }
}
