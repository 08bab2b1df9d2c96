//! WebSocket implementation of the transport traits.
//!
//! Outbound messages are written as JSON text frames. Inbound text and
//! binary frames become [`Frame`]s; ping/pong are answered by tungstenite.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, trace};

use crate::error::Result;
use crate::protocol::{Frame, Message, encode};

use super::{FrameSink, FrameSource, Transport};

// ============================================================================
// WebSocketSink
// ============================================================================

/// Write half of a WebSocket connection.
pub struct WebSocketSink<S> {
    inner: SplitSink<WebSocketStream<S>, WsMessage>,
}

#[async_trait]
impl<S> FrameSink for WebSocketSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, message: &Message) -> Result<()> {
        let json = encode(message)?;
        self.inner.send(WsMessage::Text(json.into())).await?;
        trace!(kind = %message.kind(), "WebSocket frame written");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await?;
        Ok(())
    }
}

// ============================================================================
// WebSocketSource
// ============================================================================

/// Read half of a WebSocket connection.
pub struct WebSocketSource<S> {
    inner: SplitStream<WebSocketStream<S>>,
}

#[async_trait]
impl<S> FrameSource for WebSocketSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn recv(&mut self) -> Option<Result<Frame>> {
        loop {
            let message = match self.inner.next().await? {
                Ok(message) => message,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,
                Err(e) => return Some(Err(e.into())),
            };

            match message {
                WsMessage::Text(text) => return Some(Ok(Frame::text(text.as_str()))),
                WsMessage::Binary(data) => return Some(Ok(Frame::binary(data.to_vec()))),
                WsMessage::Close(frame) => {
                    debug!(?frame, "WebSocket closed by remote");
                    return None;
                }
                // Ignore Ping, Pong, raw frames
                _ => {}
            }
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

impl<S> Transport for WebSocketStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn split(self) -> (Box<dyn FrameSink>, Box<dyn FrameSource>) {
        let (write, read) = StreamExt::split(self);
        (
            Box::new(WebSocketSink { inner: write }),
            Box::new(WebSocketSource { inner: read }),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
