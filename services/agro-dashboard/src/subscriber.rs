//! Live status subscriber
//!
//! Holds one Socket.IO connection to the backend for as long as the
//! dashboard runs and republishes every `sensorData` snapshot through a
//! `watch` channel. There is no reconnect and no staleness detection: a
//! snapshot stays current until a newer one arrives or the subscription is
//! torn down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::protocol::{websocket_url, EnginePacket, SocketPacket, DEFAULT_NAMESPACE};
use crate::snapshot::SensorSnapshot;
use crate::transport::{RealtimeConnection, RealtimeConnector};

/// Upper bound on the close handshake with the backend
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// What to do after processing one inbound frame
#[derive(Debug, PartialEq)]
enum FrameAction {
    Ignore,
    Reply(String),
    Publish(Box<SensorSnapshot>),
    Close,
}

/// Subscribes to the backend's sensor status event
pub struct LiveStatusSubscriber {
    connector: Arc<dyn RealtimeConnector>,
    base_url: String,
    event_name: String,
}

impl LiveStatusSubscriber {
    pub fn new(
        connector: Arc<dyn RealtimeConnector>,
        base_url: impl Into<String>,
        event_name: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            base_url: base_url.into(),
            event_name: event_name.into(),
        }
    }

    /// Start the subscription task
    ///
    /// The task stops when `cancel` (or the handle's own token) is cancelled.
    pub fn spawn(self, cancel: CancellationToken) -> SubscriptionHandle {
        let (tx, rx) = watch::channel(None);
        let cancel = cancel.child_token();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            self.run(tx, task_cancel).await;
        });

        SubscriptionHandle {
            snapshots: rx,
            cancel,
            task,
        }
    }

    async fn run(self, tx: watch::Sender<Option<SensorSnapshot>>, cancel: CancellationToken) {
        let url = match websocket_url(&self.base_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Live status subscription not started: {}", e);
                return;
            }
        };

        let mut connection = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Subscription cancelled before connecting");
                return;
            }
            result = self.connector.connect(&url) => match result {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::warn!("Live status connection failed: {}", e);
                    return;
                }
            },
        };

        tracing::info!(
            "Listening for '{}' events on {}",
            self.event_name,
            self.base_url
        );

        self.receive_loop(connection.as_mut(), &tx, &cancel).await;

        match tokio::time::timeout(CLOSE_TIMEOUT, connection.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Closing live status connection: {}", e),
            Err(_) => tracing::warn!("Backend did not acknowledge close, dropping connection"),
        }
        tracing::debug!("Live status subscription stopped");
    }

    async fn receive_loop(
        &self,
        connection: &mut dyn RealtimeConnection,
        tx: &watch::Sender<Option<SensorSnapshot>>,
        cancel: &CancellationToken,
    ) {
        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                frame = connection.recv() => frame,
            };

            let frame = match frame {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    tracing::warn!("Live status channel failed: {}", e);
                    break;
                }
                None => {
                    tracing::warn!("Live status channel closed by the backend");
                    break;
                }
            };

            match self.handle_frame(&frame) {
                Ok(FrameAction::Ignore) => {}
                Ok(FrameAction::Reply(reply)) => {
                    let sent = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        sent = connection.send(reply) => sent,
                    };
                    if let Err(e) = sent {
                        tracing::warn!("Live status channel write failed: {}", e);
                        break;
                    }
                }
                Ok(FrameAction::Publish(snapshot)) => {
                    // a frame that raced with teardown is dropped
                    if cancel.is_cancelled() {
                        break;
                    }
                    publish(tx, *snapshot);
                }
                Ok(FrameAction::Close) => break,
                Err(e) => tracing::warn!("Dropping frame: {}", e),
            }
        }
    }

    fn handle_frame(&self, frame: &str) -> Result<FrameAction> {
        match EnginePacket::decode(frame)? {
            EnginePacket::Open(info) => {
                tracing::debug!(
                    "Engine.IO session {} (ping interval {} ms)",
                    info.sid,
                    info.ping_interval
                );
                Ok(FrameAction::Reply(SocketPacket::connect_frame(
                    DEFAULT_NAMESPACE,
                )))
            }
            EnginePacket::Ping(data) => Ok(FrameAction::Reply(EnginePacket::pong(&data))),
            EnginePacket::Close => {
                tracing::info!("Backend closed the Engine.IO session");
                Ok(FrameAction::Close)
            }
            EnginePacket::Message(payload) => self.handle_packet(SocketPacket::decode(&payload)?),
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {
                Ok(FrameAction::Ignore)
            }
        }
    }

    fn handle_packet(&self, packet: SocketPacket) -> Result<FrameAction> {
        // only the default namespace is ever joined
        match packet {
            SocketPacket::Connect { namespace, .. } => {
                tracing::debug!("Joined namespace {}", namespace);
                Ok(FrameAction::Ignore)
            }
            SocketPacket::ConnectError { namespace, message }
                if namespace == DEFAULT_NAMESPACE =>
            {
                tracing::warn!("Backend refused namespace {}: {}", namespace, message);
                Ok(FrameAction::Close)
            }
            SocketPacket::Disconnect { namespace } if namespace == DEFAULT_NAMESPACE => {
                tracing::info!("Backend disconnected namespace {}", namespace);
                Ok(FrameAction::Close)
            }
            SocketPacket::Event {
                namespace,
                name,
                args,
                ..
            } if namespace == DEFAULT_NAMESPACE && name == self.event_name => {
                let payload = args.into_iter().next().unwrap_or(serde_json::Value::Null);
                let snapshot = SensorSnapshot::from_value(payload)?;
                Ok(FrameAction::Publish(Box::new(snapshot)))
            }
            SocketPacket::Event { namespace, name, .. } => {
                tracing::debug!("Ignoring event '{}' on namespace {}", name, namespace);
                Ok(FrameAction::Ignore)
            }
            SocketPacket::ConnectError { namespace, .. }
            | SocketPacket::Disconnect { namespace } => {
                tracing::debug!("Ignoring control packet for namespace {}", namespace);
                Ok(FrameAction::Ignore)
            }
            SocketPacket::Ack { .. } => Ok(FrameAction::Ignore),
        }
    }
}

/// Replace the held snapshot, notifying receivers only on change
fn publish(tx: &watch::Sender<Option<SensorSnapshot>>, snapshot: SensorSnapshot) {
    let changed = tx.send_if_modified(|current| {
        if current.as_ref() == Some(&snapshot) {
            false
        } else {
            *current = Some(snapshot);
            true
        }
    });
    tracing::debug!("Sensor snapshot received (changed={})", changed);
}

/// Handle to a running subscription
pub struct SubscriptionHandle {
    snapshots: watch::Receiver<Option<SensorSnapshot>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Latest snapshot, `None` until the first event arrived
    pub fn latest(&self) -> Option<SensorSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified whenever the snapshot changes
    pub fn watch(&self) -> watch::Receiver<Option<SensorSnapshot>> {
        self.snapshots.clone()
    }

    /// Stop the subscription and wait for its task to finish
    pub async fn teardown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("Live status task ended abnormally: {}", e);
        }
    }
}
