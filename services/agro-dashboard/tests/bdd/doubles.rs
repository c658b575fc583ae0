//! Test doubles shared by the BDD steps

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use agro_dashboard::io::{HttpClient, HttpResponse};
use agro_dashboard::transport::{RealtimeConnection, RealtimeConnector};
use agro_dashboard::DashboardError;

/// A recorded outbound command
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub body: serde_json::Value,
}

/// An HTTP client that records every POST and answers with a fixed status
#[derive(Debug)]
pub struct RecordingHttpClient {
    pub requests: RwLock<Vec<RecordedRequest>>,
    pub status: u16,
}

impl RecordingHttpClient {
    pub fn answering(status: u16) -> Self {
        Self {
            requests: RwLock::new(Vec::new()),
            status,
        }
    }
}

#[async_trait]
impl HttpClient for RecordingHttpClient {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> agro_dashboard::Result<HttpResponse> {
        self.requests.write().await.push(RecordedRequest {
            url: url.to_string(),
            body: body.clone(),
        });
        Ok(HttpResponse {
            status: self.status,
            body: String::new(),
        })
    }
}

/// Connection whose inbound frames are pushed by the scenario
#[derive(Debug)]
pub struct ScriptedConnection {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl RealtimeConnection for ScriptedConnection {
    async fn recv(&mut self) -> Option<agro_dashboard::Result<String>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn send(&mut self, frame: String) -> agro_dashboard::Result<()> {
        let _ = self.outbound.send(frame);
        Ok(())
    }

    async fn close(&mut self) -> agro_dashboard::Result<()> {
        self.inbound.close();
        Ok(())
    }
}

/// Hands out a single scripted connection and records the URLs it was asked for
#[derive(Debug)]
pub struct ScriptedConnector {
    connection: Mutex<Option<ScriptedConnection>>,
    pub urls: Mutex<Vec<String>>,
}

#[async_trait]
impl RealtimeConnector for ScriptedConnector {
    async fn connect(&self, url: &str) -> agro_dashboard::Result<Box<dyn RealtimeConnection>> {
        self.urls.lock().unwrap().push(url.to_string());
        let connection = self
            .connection
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| DashboardError::Realtime("scripted backend already used".to_string()))?;
        Ok(Box::new(connection))
    }
}

/// The scenario's side of a scripted real-time backend
#[derive(Debug)]
pub struct ScriptedBackend {
    pub connector: Arc<ScriptedConnector>,
    pub server: mpsc::UnboundedSender<String>,
    pub sent: mpsc::UnboundedReceiver<String>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        let (server, inbound) = mpsc::unbounded_channel();
        let (outbound, sent) = mpsc::unbounded_channel();
        Self {
            connector: Arc::new(ScriptedConnector {
                connection: Mutex::new(Some(ScriptedConnection { inbound, outbound })),
                urls: Mutex::new(Vec::new()),
            }),
            server,
            sent,
        }
    }

    /// Push a frame; returns false once the client has gone away
    pub fn push(&self, frame: impl Into<String>) -> bool {
        self.server.send(frame.into()).is_ok()
    }
}

/// A complete `sensorData` payload with the given overrides applied
pub fn sensor_payload(overrides: &[(&str, serde_json::Value)]) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "humedadSuelo": 300,
        "humedad": 55,
        "temperatura": 21,
        "nivelAgua": "Con agua",
        "modoBomba": "manual",
        "Bomba": "apagado"
    });
    for (field, value) in overrides {
        payload[*field] = value.clone();
    }
    payload
}

/// Engine.IO frame carrying a `sensorData` event
pub fn sensor_frame(payload: &serde_json::Value) -> String {
    format!(r#"42["sensorData",{}]"#, payload)
}
