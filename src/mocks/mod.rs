//! Mock implementations for testing.
//!
//! [`MockHttpTransport`] records every request it receives and answers with
//! queued responses, so bindings built on the client can be tested without a
//! network.

use crate::errors::WireResult;
use crate::transport::HttpTransport;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};
use parking_lot::Mutex;
use reqwest::{Request, Response};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

/// Mock response configuration
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Bytes,
}

impl MockResponse {
    /// Create a successful JSON response
    pub fn json<T: Serialize>(data: &T) -> Self {
        Self {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Bytes::from(serde_json::to_vec(data).unwrap_or_default()),
        }
    }

    /// Create a response with a status and raw body
    pub fn with_status(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    fn into_response(self) -> Response {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match builder.body(self.body.clone()) {
            Ok(response) => Response::from(response),
            Err(_) => Response::from(http::Response::new(self.body)),
        }
    }
}

/// A request captured by the mock transport
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: Method,
    /// Full URL
    pub url: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Body bytes, when the body was held in memory
    pub body: Option<Bytes>,
}

/// Mock HTTP transport
#[derive(Debug, Clone, Default)]
pub struct MockHttpTransport {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response; responses are returned in order
    pub fn push_response(&self, response: MockResponse) -> &Self {
        self.responses.lock().push_back(response);
        self
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// The most recent request
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn execute(&self, request: Request) -> WireResult<Response> {
        self.requests.lock().push(RecordedRequest {
            method: request.method().clone(),
            url: request.url().to_string(),
            headers: request.headers().clone(),
            body: request
                .body()
                .and_then(|b| b.as_bytes())
                .map(Bytes::copy_from_slice),
        });

        let response = self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| MockResponse::with_status(200, Bytes::new()));

        Ok(response.into_response())
    }
}
