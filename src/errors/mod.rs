//! Error types for the API client.
//!
//! Provides an error hierarchy separating local encoding failures from
//! transport, response and stream failures, plus the conversion of HTTP
//! error responses into a single descriptive error.

use serde::Deserialize;
use thiserror::Error;

/// Result type for client operations
pub type WireResult<T> = Result<T, WireError>;

/// Root error type for the client
#[derive(Error, Debug)]
pub enum WireError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Request options could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Request could not be built
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Response parsing error
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    /// WebSocket stream error
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// The server answered with an error status
    #[error("{message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },
}

impl WireError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "WIRE_CONFIG",
            Self::Encoding(_) => "WIRE_ENCODING",
            Self::Request(_) => "WIRE_REQUEST",
            Self::Network(_) => "WIRE_NETWORK",
            Self::Response(_) => "WIRE_RESPONSE",
            Self::Stream(_) => "WIRE_STREAM",
            Self::Api { .. } => "WIRE_API",
        }
    }

    /// Check if this error is worth retrying.
    ///
    /// The client never retries on its own; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(NetworkError::Timeout)
            | Self::Network(NetworkError::ConnectionFailed { .. }) => true,
            Self::Api { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Get HTTP status code if the server answered with an error status
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Convert an error response into an [`WireError::Api`].
    ///
    /// The message is, in order of preference: the `Error` string of a JSON
    /// body, the trimmed body text, or `response status N`.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            #[serde(rename = "Error", alias = "error", default)]
            error: String,
        }

        if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
            if !parsed.error.is_empty() {
                return Self::Api {
                    status,
                    message: parsed.error,
                };
            }
        }

        let text = String::from_utf8_lossy(body);
        let message = text.trim();

        if !message.is_empty() {
            return Self::Api {
                status,
                message: message.to_string(),
            };
        }

        Self::Api {
            status,
            message: format!("response status {}", status),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// No endpoint configured
    #[error("Endpoint is missing")]
    MissingEndpoint,

    /// Endpoint could not be parsed or is unsupported
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(String),
}

/// Errors raised while turning request options into wire form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Both a raw body and form params were supplied
    #[error("cannot specify both Body and Params")]
    ConflictingBody,

    /// A value cannot be represented in the bucket it was placed in
    #[error("unencodable type {kind} for {name}")]
    UnencodableType {
        /// Kind of the offending value
        kind: &'static str,
        /// Field name the value was declared under
        name: String,
    },
}

/// Request construction errors
#[derive(Error, Debug)]
pub enum RequestError {
    /// The composed URL is invalid
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl {
        /// The URL that failed to parse
        url: String,
        /// Error message
        message: String,
    },

    /// A header name is invalid
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),

    /// A header value is invalid
    #[error("Invalid value for header {0}")]
    InvalidHeaderValue(String),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Connection failed
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message
        message: String,
    },

    /// Request timeout
    #[error("Request timed out")]
    Timeout,

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else if err.is_connect() {
            NetworkError::ConnectionFailed {
                message: err.to_string(),
            }
        } else {
            NetworkError::Http(err.to_string())
        }
    }
}

/// Response parsing errors
#[derive(Error, Debug)]
pub enum ResponseError {
    /// JSON deserialization error
    #[error("Deserialization error: {message}")]
    DeserializationError {
        /// Error message
        message: String,
    },

    /// The body could not be read
    #[error("Failed to read body: {message}")]
    BodyRead {
        /// Error message
        message: String,
    },
}

impl From<serde_json::Error> for ResponseError {
    fn from(err: serde_json::Error) -> Self {
        ResponseError::DeserializationError {
            message: err.to_string(),
        }
    }
}

/// WebSocket stream errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The handshake failed
    #[error("Failed to connect: {message}")]
    HandshakeFailed {
        /// Error message
        message: String,
    },

    /// The peer closed the connection with an abnormal code
    #[error("close {code}: {reason}")]
    AbnormalClose {
        /// Close code
        code: u16,
        /// Close reason
        reason: String,
    },

    /// WebSocket protocol or transport error
    #[error("{message}")]
    WebSocket {
        /// Error message
        message: String,
    },
}
