//! Request options: the encoding-agnostic description of a call.
//!
//! A [`RequestOptions`] carries headers, form params, query values and an
//! optional raw body. The request builder turns it into a URL query string,
//! a content type and a body source.

mod body;
mod marshal;
mod value;

pub use body::{Body, BoxReader};
pub use marshal::{marshal_options, MarshalOptions, Marshaler};
pub use value::{format_duration, ToValue, Value};

use crate::errors::{EncodingError, WireResult};
use bytes::Bytes;
use std::collections::BTreeMap;

/// Header bucket: name to string value
pub type Headers = BTreeMap<String, String>;

/// Form param bucket: name to typed value
pub type Params = BTreeMap<String, Value>;

/// Query bucket: name to typed value
pub type Query = BTreeMap<String, Value>;

/// Content type used for raw bodies
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Content type used for form-encoded params
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Everything a single call needs besides method and path.
///
/// `body` and a non-empty `params` are mutually exclusive. The
/// [`RequestOptionsBuilder`] rejects the combination up front;
/// [`RequestOptions::take_reader`] checks it again for values assembled by hand.
#[derive(Debug, Default)]
pub struct RequestOptions {
    /// Raw payload, sent verbatim
    pub body: Option<Body>,
    /// Request headers
    pub headers: Headers,
    /// Form params, sent as the body when `body` is absent
    pub params: Params,
    /// Query values, always sent
    pub query: Query,
}

impl RequestOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new options builder
    pub fn builder() -> RequestOptionsBuilder {
        RequestOptionsBuilder::default()
    }

    /// Percent-encoded query string with keys in sorted order.
    pub fn querystring(&self) -> String {
        value::encode_values(&self.query)
    }

    /// Content type matching the body that [`take_reader`](Self::take_reader) produces.
    pub fn content_type(&self) -> &'static str {
        if self.body.is_some() {
            CONTENT_TYPE_OCTET_STREAM
        } else {
            CONTENT_TYPE_FORM
        }
    }

    /// Take the request body out of the options.
    ///
    /// Returns the raw body when set, the encoded params when present, and an
    /// empty body otherwise. Params are left in place.
    pub fn take_reader(&mut self) -> WireResult<Body> {
        if self.body.is_some() && !self.params.is_empty() {
            return Err(EncodingError::ConflictingBody.into());
        }

        if let Some(body) = self.body.take() {
            return Ok(body);
        }

        if self.params.is_empty() {
            return Ok(Body::empty());
        }

        Ok(Body::Bytes(Bytes::from(value::encode_values(&self.params))))
    }
}

/// Builder for [`RequestOptions`]
#[derive(Debug, Default)]
pub struct RequestOptionsBuilder {
    options: RequestOptions,
}

impl RequestOptionsBuilder {
    /// Set a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.insert(name.into(), value.into());
        self
    }

    /// Set a form param
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.params.insert(name.into(), value.into());
        self
    }

    /// Set a query value
    pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.query.insert(name.into(), value.into());
        self
    }

    /// Set the raw body
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.options.body = Some(body.into());
        self
    }

    /// Build the options, rejecting a body combined with params
    pub fn build(self) -> WireResult<RequestOptions> {
        if self.options.body.is_some() && !self.options.params.is_empty() {
            return Err(EncodingError::ConflictingBody.into());
        }
        Ok(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WireError;
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncReadExt;

    async fn read_body(body: Body) -> Vec<u8> {
        let mut out = Vec::new();
        body.into_async_read().read_to_end(&mut out).await.unwrap();
        out
    }

    #[test]
    fn test_querystring_sorted_and_repeated() {
        let options = RequestOptions::builder()
            .query("b", vec!["x", "y"])
            .query("a", "1")
            .build()
            .unwrap();

        assert_eq!(options.querystring(), "a=1&b=x&b=y");
    }

    #[test]
    fn test_querystring_percent_encodes() {
        let options = RequestOptions::builder()
            .query("filter", "name eq 'a&b'")
            .build()
            .unwrap();

        assert_eq!(options.querystring(), "filter=name+eq+%27a%26b%27");
    }

    #[test]
    fn test_empty_querystring() {
        assert_eq!(RequestOptions::new().querystring(), "");
    }

    #[test]
    fn test_content_type() {
        let raw = RequestOptions::builder().body("data").build().unwrap();
        assert_eq!(raw.content_type(), "application/octet-stream");

        let form = RequestOptions::builder().param("a", 1).build().unwrap();
        assert_eq!(form.content_type(), "application/x-www-form-urlencoded");

        assert_eq!(
            RequestOptions::new().content_type(),
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn test_builder_rejects_body_with_params() {
        let result = RequestOptions::builder()
            .body("data")
            .param("a", 1)
            .build();

        assert!(matches!(
            result,
            Err(WireError::Encoding(EncodingError::ConflictingBody))
        ));
    }

    #[test]
    fn test_reader_rejects_body_with_params() {
        let mut options = RequestOptions::new();
        options.body = Some(Body::from("data"));
        options.params.insert("a".to_string(), Value::Int(1));

        let err = options.take_reader().unwrap_err();
        assert!(matches!(err, WireError::Encoding(EncodingError::ConflictingBody)));
    }

    #[tokio::test]
    async fn test_reader_raw_body() {
        let mut options = RequestOptions::builder()
            .body(b"\x00raw"[..].to_vec())
            .build()
            .unwrap();

        let body = options.take_reader().unwrap();
        assert_eq!(read_body(body).await, b"\x00raw");
        assert!(options.body.is_none());
    }

    #[tokio::test]
    async fn test_reader_encodes_params() {
        let mut options = RequestOptions::builder()
            .param("name", "web app")
            .param("count", 2)
            .build()
            .unwrap();

        let body = options.take_reader().unwrap();
        assert_eq!(read_body(body).await, b"count=2&name=web+app");
    }

    #[tokio::test]
    async fn test_reader_empty() {
        let body = RequestOptions::new().take_reader().unwrap();
        assert!(read_body(body).await.is_empty());
    }
}
