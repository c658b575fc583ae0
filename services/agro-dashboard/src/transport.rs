//! Real-time transport abstraction
//!
//! The subscriber only needs to exchange text frames, so the WebSocket
//! stream is hidden behind a small trait pair that tests can replace with an
//! in-memory channel.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{DashboardError, Result};

/// An open, bidirectional text-frame connection
#[async_trait]
pub trait RealtimeConnection: Send {
    /// Next text frame; `None` once the peer closed the connection
    async fn recv(&mut self) -> Option<Result<String>>;

    /// Send a text frame
    async fn send(&mut self, frame: String) -> Result<()>;

    /// Close the connection
    async fn close(&mut self) -> Result<()>;
}

/// Opens real-time connections
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn RealtimeConnection>>;
}

/// Production connector using tokio-tungstenite
#[derive(Debug, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl RealtimeConnector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn RealtimeConnection>> {
        tracing::debug!("Opening WebSocket to {}", url);
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| DashboardError::Realtime(format!("connect to {} failed: {}", url, e)))?;
        tracing::debug!("WebSocket to {} established", url);
        Ok(Box::new(WebSocketConnection { stream }))
    }
}

struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl RealtimeConnection for WebSocketConnection {
    async fn recv(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    tracing::debug!("WebSocket closed by peer: {:?}", frame);
                    return None;
                }
                // tungstenite answers WebSocket-level pings itself
                Ok(_) => continue,
                Err(e) => {
                    return Some(Err(DashboardError::Realtime(format!(
                        "read failed: {}",
                        e
                    ))))
                }
            }
        }
    }

    async fn send(&mut self, frame: String) -> Result<()> {
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| DashboardError::Realtime(format!("write failed: {}", e)))
    }

    async fn close(&mut self) -> Result<()> {
        self.stream
            .close(None)
            .await
            .map_err(|e| DashboardError::Realtime(format!("close failed: {}", e)))
    }
}
