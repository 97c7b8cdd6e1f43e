//! Raw request payloads.

use bytes::Bytes;
use std::fmt;
use std::io::Cursor;
use std::pin::Pin;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

/// Boxed asynchronous byte source
pub type BoxReader = Pin<Box<dyn AsyncRead + Send + Sync + 'static>>;

/// A raw request payload: either bytes in memory or a streaming reader.
pub enum Body {
    /// In-memory bytes
    Bytes(Bytes),
    /// Streaming source, read to end of input
    Reader(BoxReader),
}

impl Body {
    /// An empty payload
    pub fn empty() -> Self {
        Body::Bytes(Bytes::new())
    }

    /// Wrap an asynchronous reader
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        Body::Reader(Box::pin(reader))
    }

    /// The payload bytes when held in memory
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Bytes(bytes) => Some(bytes),
            Body::Reader(_) => None,
        }
    }

    /// Read side of the payload, used by the stream adapter
    pub fn into_async_read(self) -> BoxReader {
        match self {
            Body::Bytes(bytes) => Box::pin(Cursor::new(bytes)),
            Body::Reader(reader) => reader,
        }
    }
}

impl From<Body> for reqwest::Body {
    fn from(body: Body) -> Self {
        match body {
            Body::Bytes(bytes) => reqwest::Body::from(bytes),
            Body::Reader(reader) => reqwest::Body::wrap_stream(ReaderStream::new(reader)),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Bytes(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Body::Bytes(Bytes::from_static(bytes))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Body::Reader(_) => f.write_str("Reader"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_bytes_read_back() {
        let mut reader = Body::from("payload").into_async_read();
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "payload");
    }

    #[tokio::test]
    async fn test_reader_passthrough() {
        let body = Body::from_reader(&b"streamed"[..]);
        assert!(body.as_bytes().is_none());

        let mut out = Vec::new();
        body.into_async_read().read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"streamed");
    }
}
