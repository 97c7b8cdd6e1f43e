//! The two pump loops moving data between a byte stream and a WebSocket.

use crate::errors::StreamError;
use futures::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Longest close reason that fits a control frame
const MAX_CLOSE_REASON: usize = 123;

/// How long a cancelled outbound pump waits to hand over its close frame
const CLOSE_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Where the inbound pump records the error that ended the stream
pub(crate) type ErrorSlot = Arc<Mutex<Option<StreamError>>>;

/// Read `input` in chunks and send each chunk as a frame.
///
/// End of input sends a `going away` close, a read error sends an
/// `internal error` close carrying the error text. Cancellation sends a
/// normal close, waiting at most `CLOSE_SEND_TIMEOUT` for the socket to
/// accept it.
pub(crate) async fn outbound<R, S>(
    mut input: R,
    mut sink: S,
    chunk_size: usize,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    let mut buf = vec![0u8; chunk_size];
    let mut frames = FrameEncoder::default();

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Outbound pump cancelled");
                let close = sink.send(close_message(CloseCode::Normal, ""));
                let _ = tokio::time::timeout(CLOSE_SEND_TIMEOUT, close).await;
                return;
            }
            read = input.read(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                if let Some(frame) = frames.finish() {
                    if !send_frame(&mut sink, frame, &cancel).await {
                        return;
                    }
                }
                debug!("Outbound input finished");
                send_frame(&mut sink, close_message(CloseCode::Away, ""), &cancel).await;
                return;
            }
            Ok(n) => {
                if let Some(frame) = frames.push(&buf[..n]) {
                    if !send_frame(&mut sink, frame, &cancel).await {
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Outbound input failed");
                let close = close_message(CloseCode::Error, &e.to_string());
                send_frame(&mut sink, close, &cancel).await;
                return;
            }
        }
    }
}

/// Send one frame unless cancelled first. Returns whether it was sent.
async fn send_frame<S>(sink: &mut S, frame: Message, cancel: &CancellationToken) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Outbound send abandoned on cancel");
            false
        }
        sent = sink.send(frame) => match sent {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to send frame");
                false
            }
        },
    }
}

/// Write every data frame from `frames` to `output`, in arrival order.
///
/// Stops on a close frame, end of stream, error or cancellation; the output
/// is shut down on exit and the shared token cancelled so the outbound pump
/// stops with it. A write blocked on a full output gives way to
/// cancellation.
pub(crate) async fn inbound<St, W>(
    mut frames: St,
    mut output: W,
    errors: ErrorSlot,
    inline_errors: bool,
    cancel: CancellationToken,
) where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Inbound pump cancelled");
                break;
            }
            frame = frames.next() => frame,
        };

        let failure = match frame {
            Some(Ok(Message::Text(text))) => {
                if !write_output(&mut output, text.as_bytes(), &cancel).await {
                    break;
                }
                continue;
            }
            Some(Ok(Message::Binary(data))) => {
                if !write_output(&mut output, &data, &cancel).await {
                    break;
                }
                continue;
            }
            Some(Ok(Message::Close(frame))) => match frame {
                Some(frame) if !matches!(frame.code, CloseCode::Normal | CloseCode::Away) => {
                    StreamError::AbnormalClose {
                        code: u16::from(frame.code),
                        reason: frame.reason.into_owned(),
                    }
                }
                _ => break,
            },
            Some(Ok(_)) => continue,
            Some(Err(WsError::ConnectionClosed)) | Some(Err(WsError::AlreadyClosed)) | None => {
                break
            }
            Some(Err(e)) => StreamError::WebSocket {
                message: e.to_string(),
            },
        };

        warn!(error = %failure, "Stream terminated abnormally");
        let line = format!("ERROR: {}\n", failure);
        *errors.lock() = Some(failure);
        if inline_errors {
            write_output(&mut output, line.as_bytes(), &cancel).await;
        }
        break;
    }

    let _ = output.shutdown().await;
    cancel.cancel();
}

/// Write `bytes` unless cancelled first. Returns whether the write succeeded.
async fn write_output<W>(output: &mut W, bytes: &[u8], cancel: &CancellationToken) -> bool
where
    W: AsyncWrite + Unpin,
{
    tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Inbound write abandoned on cancel");
            false
        }
        written = output.write_all(bytes) => written.is_ok(),
    }
}

fn close_message(code: CloseCode, reason: &str) -> Message {
    let mut end = reason.len().min(MAX_CLOSE_REASON);
    while !reason.is_char_boundary(end) {
        end -= 1;
    }

    Message::Close(Some(CloseFrame {
        code,
        reason: Cow::Owned(reason[..end].to_string()),
    }))
}

/// Turns read chunks into frames.
///
/// Chunks go out as text frames. A UTF-8 sequence cut at a chunk boundary is
/// held back for the next chunk; bytes that are not UTF-8 go out as a binary
/// frame.
#[derive(Debug, Default)]
struct FrameEncoder {
    pending: Vec<u8>,
}

impl FrameEncoder {
    fn push(&mut self, chunk: &[u8]) -> Option<Message> {
        self.pending.extend_from_slice(chunk);
        let bytes = std::mem::take(&mut self.pending);

        match String::from_utf8(bytes) {
            Ok(text) => Some(Message::Text(text)),
            Err(e) => {
                let utf8 = e.utf8_error();
                let mut bytes = e.into_bytes();

                if utf8.error_len().is_some() {
                    return Some(Message::Binary(bytes));
                }

                // Incomplete sequence at the end: keep it for the next chunk.
                self.pending = bytes.split_off(utf8.valid_up_to());
                if bytes.is_empty() {
                    return None;
                }
                match String::from_utf8(bytes) {
                    Ok(text) => Some(Message::Text(text)),
                    Err(e) => Some(Message::Binary(e.into_bytes())),
                }
            }
        }
    }

    fn finish(&mut self) -> Option<Message> {
        if self.pending.is_empty() {
            None
        } else {
            Some(Message::Binary(std::mem::take(&mut self.pending)))
        }
    }
}
