//! HTTP transport layer.
//!
//! Executes requests produced by the request builder. The default
//! implementation wraps a pooled `reqwest` client.

use crate::config::WireConfig;
use crate::errors::{NetworkError, WireError, WireResult};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Request, Response};
use std::time::Duration;
use tracing::{debug, instrument};

/// HTTP transport trait for executing built requests
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute a request and return the raw response, whatever its status
    async fn execute(&self, request: Request) -> WireResult<Response>;
}

/// Default HTTP transport implementation using reqwest
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport from the client configuration
    pub fn new(config: &WireConfig) -> WireResult<Self> {
        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder
            .build()
            .map_err(|e| WireError::Network(NetworkError::Http(e.to_string())))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.url().path()))]
    async fn execute(&self, request: Request) -> WireResult<Response> {
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| WireError::Network(NetworkError::from(e)))?;

        debug!(status = %response.status(), "Received response");
        Ok(response)
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_from_config() {
        let config = WireConfig::builder()
            .endpoint("https://api.example.com")
            .unwrap()
            .timeout(Duration::from_secs(5))
            .user_agent("api-wire-test")
            .build()
            .unwrap();

        let transport = ReqwestTransport::new(&config).unwrap();
        assert!(format!("{:?}", transport).contains("5s"));
    }

    #[tokio::test]
    async fn test_refused_connection_maps_to_connection_failed() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = WireConfig::builder()
            .endpoint(&format!("http://127.0.0.1:{}", port))
            .unwrap()
            .build()
            .unwrap();

        let transport = ReqwestTransport::new(&config).unwrap();
        let url = reqwest::Url::parse(&format!("http://127.0.0.1:{}/system", port)).unwrap();
        let err = transport
            .execute(Request::new(http::Method::GET, url))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WireError::Network(NetworkError::ConnectionFailed { .. })
        ));
        assert!(err.is_retryable());
    }
}
