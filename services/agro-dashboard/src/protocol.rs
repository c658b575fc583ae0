//! Socket.IO v4 framing over an Engine.IO v4 WebSocket transport
//!
//! Each WebSocket text frame is one Engine.IO packet: a single type digit
//! followed by its data. Engine.IO `message` packets carry Socket.IO packets,
//! which have the layout
//!
//! ```text
//! <type>[<attachments>-][<namespace>,][<ack id>][<json>]
//! ```
//!
//! Only the text subset is supported; binary events are rejected.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{DashboardError, Result};

/// Path the Socket.IO server is mounted on
pub const SOCKET_IO_PATH: &str = "/socket.io/";

/// Default namespace
pub const DEFAULT_NAMESPACE: &str = "/";

/// Handshake data sent by the server in the Engine.IO `open` packet
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// Engine.IO packets
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenInfo),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    /// Decode a WebSocket text frame
    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| DashboardError::Protocol("empty Engine.IO frame".to_string()))?;
        let data = chars.as_str();

        match kind {
            '0' => {
                let info: OpenInfo = serde_json::from_str(data).map_err(|e| {
                    DashboardError::Protocol(format!("invalid open packet '{}': {}", data, e))
                })?;
                Ok(EnginePacket::Open(info))
            }
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(data.to_string())),
            '3' => Ok(EnginePacket::Pong(data.to_string())),
            '4' => Ok(EnginePacket::Message(data.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(DashboardError::Protocol(format!(
                "unknown Engine.IO packet type '{}'",
                other
            ))),
        }
    }

    /// Pong frame echoing the ping's data
    pub fn pong(data: &str) -> String {
        format!("3{}", data)
    }
}

/// Socket.IO packets (text subset)
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        message: String,
    },
}

impl SocketPacket {
    /// Namespace connect request, wrapped in an Engine.IO message frame
    pub fn connect_frame(namespace: &str) -> String {
        format!("40{}", namespace_prefix(namespace))
    }

    /// Decode the payload of an Engine.IO `message` packet
    pub fn decode(payload: &str) -> Result<Self> {
        let mut chars = payload.chars();
        let kind = chars
            .next()
            .ok_or_else(|| DashboardError::Protocol("empty Socket.IO packet".to_string()))?;
        let mut rest = chars.as_str();

        if kind == '5' || kind == '6' {
            return Err(DashboardError::Protocol(
                "binary Socket.IO packets are not supported".to_string(),
            ));
        }

        let namespace = if rest.starts_with('/') {
            let (namespace, tail) = match rest.find(',') {
                Some(idx) => (&rest[..idx], &rest[idx + 1..]),
                None => (rest, ""),
            };
            rest = tail;
            namespace.to_string()
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        let ack_id = if digits > 0 {
            let id = rest[..digits].parse::<u64>().map_err(|e| {
                DashboardError::Protocol(format!("invalid ack id '{}': {}", &rest[..digits], e))
            })?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data: Option<Value> = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest).map_err(|e| {
                DashboardError::Protocol(format!("invalid packet data '{}': {}", rest, e))
            })?)
        };

        match kind {
            '0' => Ok(SocketPacket::Connect { namespace, data }),
            '1' => Ok(SocketPacket::Disconnect { namespace }),
            '2' => {
                let mut args = match data {
                    Some(Value::Array(items)) => items,
                    other => {
                        return Err(DashboardError::Protocol(format!(
                            "event data must be an array, got {:?}",
                            other
                        )))
                    }
                };
                if args.is_empty() {
                    return Err(DashboardError::Protocol(
                        "event without a name".to_string(),
                    ));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(DashboardError::Protocol(format!(
                            "event name must be a string, got {}",
                            other
                        )))
                    }
                };
                Ok(SocketPacket::Event {
                    namespace,
                    ack_id,
                    name,
                    args,
                })
            }
            '3' => {
                let ack_id = ack_id.ok_or_else(|| {
                    DashboardError::Protocol("ack packet without an id".to_string())
                })?;
                let args = match data {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                Ok(SocketPacket::Ack {
                    namespace,
                    ack_id,
                    args,
                })
            }
            '4' => {
                let message = match data {
                    Some(Value::Object(map)) => map
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("connection refused")
                        .to_string(),
                    Some(Value::String(message)) => message,
                    _ => "connection refused".to_string(),
                };
                Ok(SocketPacket::ConnectError { namespace, message })
            }
            other => Err(DashboardError::Protocol(format!(
                "unknown Socket.IO packet type '{}'",
                other
            ))),
        }
    }
}

fn namespace_prefix(namespace: &str) -> String {
    if namespace == DEFAULT_NAMESPACE || namespace.is_empty() {
        String::new()
    } else {
        format!("{},", namespace)
    }
}

/// Build the WebSocket endpoint for a backend base address
///
/// `http://host:5000` becomes
/// `ws://host:5000/socket.io/?EIO=4&transport=websocket`.
pub fn websocket_url(base_url: &str) -> Result<String> {
    let base = base_url.trim().trim_end_matches('/');
    let rest = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        return Err(DashboardError::Config(format!(
            "unsupported backend address '{}': expected http(s):// or ws(s)://",
            base_url
        )));
    };
    Ok(format!("{}{}?EIO=4&transport=websocket", rest, SOCKET_IO_PATH))
}
