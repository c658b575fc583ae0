//! Command dispatcher
//!
//! Relays control commands to the backend REST API. Commands are fire and
//! forget for the caller: the outcome only lands in the dispatcher's
//! transient request state, and the authoritative device status arrives
//! later through the live status channel.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::io::HttpClient;

const CONTROL_PATH: &str = "/api/sensors/control";
const PUMP_MODE_PATH: &str = "/api/sensors/water-pump";

/// Controllable device topics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorTopic {
    HumiditySoil,
    HumidityTemperature,
    WaterPump,
}

impl SensorTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorTopic::HumiditySoil => "humidity-soil",
            SensorTopic::HumidityTemperature => "humidity-temperature",
            SensorTopic::WaterPump => "water-pump",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpModeRequest {
    Auto,
    Manual,
}

/// Transient state of the most recent command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandRequestState {
    pub loading: bool,
    pub error: Option<String>,
}

/// Issues control commands against one backend
pub struct CommandDispatcher {
    base_url: String,
    http: Arc<dyn HttpClient>,
    state: RwLock<CommandRequestState>,
}

impl fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CommandDispatcher {
    pub fn new(base_url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!("Created CommandDispatcher for {}", base_url);
        Self {
            base_url,
            http,
            state: RwLock::new(CommandRequestState::default()),
        }
    }

    /// Switch a sensor or the pump on or off
    pub async fn control_sensor(&self, topic: SensorTopic, state: SwitchState) {
        let body = serde_json::json!({
            "topic": format!("control/{}", topic.as_str()),
            "state": state,
        });
        self.dispatch(CONTROL_PATH, body).await;
    }

    /// Change the pump operating mode
    pub async fn set_pump_mode(&self, mode: PumpModeRequest) {
        let body = serde_json::json!({ "mode": mode });
        self.dispatch(PUMP_MODE_PATH, body).await;
    }

    /// Current request state
    pub async fn request_state(&self) -> CommandRequestState {
        self.state.read().await.clone()
    }

    async fn dispatch(&self, path: &str, body: serde_json::Value) {
        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
        }

        let url = format!("{}{}", self.base_url, path);
        let outcome = match self.http.post_json(&url, &body).await {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => Err(crate::DashboardError::Command(format!(
                "{} returned status {}",
                path, response.status
            ))),
            Err(e) => Err(e),
        };

        let mut state = self.state.write().await;
        state.loading = false;
        match outcome {
            Ok(()) => tracing::debug!("Command {} accepted", body),
            Err(e) => {
                tracing::warn!("Command {} failed: {}", body, e);
                state.error = Some(e.to_string());
            }
        }
    }
}
