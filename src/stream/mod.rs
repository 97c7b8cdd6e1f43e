//! WebSocket connections exposed as byte streams.
//!
//! After the handshake two tasks run over the split socket: the outbound
//! pump sends the caller's input as frames, the inbound pump writes received
//! frames into an in-memory pipe whose read side is the returned
//! [`WebsocketStream`].
//!
//! Both pumps stop when the stream handle is closed or dropped, when the
//! input ends and the server closes, or when the socket fails. There is no
//! intrinsic read timeout.

mod pump;

use crate::config::StreamConfig;
use crate::errors::{StreamError, WireError, WireResult};
use crate::options::BoxReader;
use futures::StreamExt;
use http::{HeaderName, HeaderValue};
use pump::ErrorSlot;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, DuplexStream, ReadBuf};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Connect to `url` and start both pumps.
pub(crate) async fn open(
    url: &str,
    headers: Vec<(HeaderName, HeaderValue)>,
    input: BoxReader,
    config: &StreamConfig,
) -> WireResult<WebsocketStream> {
    let mut request = url
        .into_client_request()
        .map_err(handshake_error)?;
    for (name, value) in headers {
        request.headers_mut().insert(name, value);
    }

    let (socket, _) = connect_async(request).await.map_err(handshake_error)?;
    info!("WebSocket connected");

    let (sink, frames) = socket.split();
    let (writer, reader) = tokio::io::duplex(config.buffer_size);
    let cancel = CancellationToken::new();
    let errors = ErrorSlot::default();

    let outbound = tokio::spawn(pump::outbound(
        input,
        sink,
        config.chunk_size,
        cancel.clone(),
    ));
    let inbound = tokio::spawn(pump::inbound(
        frames,
        writer,
        errors.clone(),
        config.inline_errors,
        cancel.clone(),
    ));

    Ok(WebsocketStream {
        reader: Some(reader),
        cancel,
        errors,
        outbound: Some(outbound),
        inbound: Some(inbound),
    })
}

fn handshake_error(err: WsError) -> WireError {
    match err {
        WsError::Http(response) => {
            let status = response.status().as_u16();
            let body = response.body().as_deref().unwrap_or_default();
            WireError::from_response(status, body)
        }
        other => WireError::Stream(StreamError::HandshakeFailed {
            message: other.to_string(),
        }),
    }
}

/// Read side of a WebSocket connection.
///
/// Implements [`AsyncRead`]; reading returns the payloads of received frames
/// in order and end-of-file once the connection is closed. Dropping the
/// handle stops both pumps.
pub struct WebsocketStream {
    reader: Option<DuplexStream>,
    cancel: CancellationToken,
    errors: ErrorSlot,
    outbound: Option<JoinHandle<()>>,
    inbound: Option<JoinHandle<()>>,
}

impl WebsocketStream {
    /// The error that ended the connection, if it ended abnormally
    pub fn error(&self) -> Option<StreamError> {
        self.errors.lock().clone()
    }

    /// Whether the pumps have been told to stop
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop both pumps and wait for them to exit.
    ///
    /// Unread output is discarded.
    pub async fn close(mut self) -> Option<StreamError> {
        self.cancel.cancel();
        // An inbound pump blocked on a full pipe fails its write once the read side is gone.
        drop(self.reader.take());
        for handle in [self.outbound.take(), self.inbound.take()].into_iter().flatten() {
            if let Err(e) = handle.await {
                debug!(error = %e, "Pump task ended abnormally");
            }
        }
        self.error()
    }
}

impl AsyncRead for WebsocketStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.reader.as_mut() {
            Some(reader) => Pin::new(reader).poll_read(cx, buf),
            None => Poll::Ready(Ok(())),
        }
    }
}

impl Drop for WebsocketStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for WebsocketStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebsocketStream")
            .field("closed", &self.is_closed())
            .field("error", &self.error())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::http::Response;

    #[test]
    fn test_handshake_rejection_uses_response_body() {
        let response = Response::builder()
            .status(401)
            .body(Some(br#"{"Error":"invalid password"}"#.to_vec()))
            .unwrap();

        let err = handshake_error(WsError::Http(response));
        assert_eq!(err.to_string(), "invalid password");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_handshake_failure() {
        let err = handshake_error(WsError::ConnectionClosed);
        assert!(matches!(
            err,
            WireError::Stream(StreamError::HandshakeFailed { .. })
        ));
    }
}
