//! Card view models
//!
//! Each card is a pure function of a snapshot slice and, for cards with
//! controls, the request state of the dispatcher that serves them. The
//! enabled flags computed here are the only gate between a browser action
//! and an outbound command.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::dispatcher::CommandRequestState;
use crate::snapshot::{PumpMode, PumpStatus, Reading, SensorSnapshot, WaterLevel};

pub const CONNECTING_PLACEHOLDER: &str = "Conectando con los sensores...";
pub const SENSOR_UNAVAILABLE: &str = "Sensor no disponible";
pub const MODE_ADVISORY: &str = "Cambie a modo manual para controlar la bomba";
pub const WATER_ADVISORY: &str = "No hay agua disponible para operar la bomba";
pub const AUTOMATIC_NOTICE: &str =
    "La bomba se ha activado automáticamente según las condiciones programadas";

/// Full scale of the soil moisture ADC
const SOIL_ADC_MAX: f64 = 1024.0;

/// Soil moisture percentage from the raw ADC reading, one decimal
pub fn moisture_percentage(raw: f64) -> String {
    format!("{:.1}", 100.0 - raw / SOIL_ADC_MAX * 100.0)
}

/// A user action bound to a card control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardAction {
    SoilOn,
    SoilOff,
    ClimateOn,
    ClimateOff,
    PumpOn,
    PumpOff,
    ModeAuto,
    ModeManual,
}

impl CardAction {
    pub const ALL: [CardAction; 8] = [
        CardAction::SoilOn,
        CardAction::SoilOff,
        CardAction::ClimateOn,
        CardAction::ClimateOff,
        CardAction::PumpOn,
        CardAction::PumpOff,
        CardAction::ModeAuto,
        CardAction::ModeManual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardAction::SoilOn => "soil-on",
            CardAction::SoilOff => "soil-off",
            CardAction::ClimateOn => "climate-on",
            CardAction::ClimateOff => "climate-off",
            CardAction::PumpOn => "pump-on",
            CardAction::PumpOff => "pump-off",
            CardAction::ModeAuto => "mode-auto",
            CardAction::ModeManual => "mode-manual",
        }
    }
}

impl fmt::Display for CardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardAction {
    type Err = crate::DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CardAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| crate::DashboardError::Command(format!("unknown action '{}'", s)))
    }
}

/// One clickable control on a card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlButton {
    pub action: CardAction,
    pub label: &'static str,
    pub enabled: bool,
    /// Highlighted as the current selection
    pub active: bool,
}

impl ControlButton {
    fn new(action: CardAction, label: &'static str, enabled: bool) -> Self {
        Self {
            action,
            label,
            enabled,
            active: false,
        }
    }
}

/// On/off pair for a sensor: "on" only while disconnected, "off" only while connected
fn sensor_controls(
    on: (CardAction, &'static str),
    off: (CardAction, &'static str),
    connected: bool,
    loading: bool,
) -> Vec<ControlButton> {
    vec![
        ControlButton::new(on.0, on.1, !connected && !loading),
        ControlButton::new(off.0, off.1, connected && !loading),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilMoistureCard {
    pub connected: bool,
    /// Raw reading or sentinel label
    pub reading: String,
    pub percentage: Option<String>,
    pub unavailable: Option<&'static str>,
    pub controls: Vec<ControlButton>,
    pub error: Option<String>,
}

pub fn soil_moisture_card(reading: Reading, request: &CommandRequestState) -> SoilMoistureCard {
    let connected = reading.is_connected();
    SoilMoistureCard {
        connected,
        reading: reading.to_string(),
        percentage: reading.value().map(moisture_percentage),
        unavailable: (!connected).then_some(SENSOR_UNAVAILABLE),
        controls: sensor_controls(
            (CardAction::SoilOn, "Encender"),
            (CardAction::SoilOff, "Apagar"),
            connected,
            request.loading,
        ),
        error: request.error.clone(),
    }
}

/// DHT11 air humidity and temperature sensor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HumidityTemperatureCard {
    pub connected: bool,
    pub humidity: String,
    pub temperature: String,
    pub controls: Vec<ControlButton>,
    pub error: Option<String>,
}

pub fn humidity_temperature_card(
    humidity: Reading,
    temperature: Reading,
    request: &CommandRequestState,
) -> HumidityTemperatureCard {
    let connected = humidity.is_connected() && temperature.is_connected();
    let humidity = match humidity {
        Reading::Value(v) => format!("{}%", v),
        other => other.to_string(),
    };
    let temperature = match temperature {
        Reading::Value(v) => format!("{}°C", v),
        other => other.to_string(),
    };

    HumidityTemperatureCard {
        connected,
        humidity,
        temperature,
        controls: sensor_controls(
            (CardAction::ClimateOn, "Encender DHT11"),
            (CardAction::ClimateOff, "Apagar DHT11"),
            connected,
            request.loading,
        ),
        error: request.error.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterLevelCard {
    pub has_water: bool,
    pub level: String,
    pub message: &'static str,
}

pub fn water_level_card(level: WaterLevel) -> WaterLevelCard {
    let has_water = level == WaterLevel::HasWater;
    WaterLevelCard {
        has_water,
        level: level.to_string(),
        message: if has_water {
            "Nivel de agua adecuado para operación"
        } else {
            "Se requiere rellenar el tanque de agua"
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PumpControlCard {
    pub mode: PumpMode,
    pub controllable: bool,
    pub mode_controls: Vec<ControlButton>,
    pub pump_controls: Vec<ControlButton>,
    /// Why the pump controls are disabled
    pub advisory: Option<&'static str>,
    pub status_line: Option<String>,
    pub error: Option<String>,
}

pub fn pump_control_card(
    mode: PumpMode,
    water: WaterLevel,
    status: PumpStatus,
    request: &CommandRequestState,
) -> PumpControlCard {
    let manual = mode == PumpMode::Manual;
    let controllable = manual && water == WaterLevel::HasWater;
    let pump_on = status == PumpStatus::On;
    let loading = request.loading;

    let mut auto = ControlButton::new(CardAction::ModeAuto, "Automático", !loading);
    auto.active = !manual;
    let mut manual_button = ControlButton::new(CardAction::ModeManual, "Manual", !loading);
    manual_button.active = manual;

    let advisory = if controllable {
        None
    } else if !manual {
        Some(MODE_ADVISORY)
    } else {
        Some(WATER_ADVISORY)
    };

    PumpControlCard {
        mode,
        controllable,
        mode_controls: vec![auto, manual_button],
        pump_controls: vec![
            ControlButton::new(
                CardAction::PumpOn,
                "Encender Bomba",
                controllable && !pump_on && !loading,
            ),
            ControlButton::new(
                CardAction::PumpOff,
                "Apagar Bomba",
                controllable && pump_on && !loading,
            ),
        ],
        advisory,
        status_line: controllable.then(|| {
            format!(
                "La bomba está {}",
                if pump_on { "encendida" } else { "apagada" }
            )
        }),
        error: request.error.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PumpStatusCard {
    pub on: bool,
    pub label: &'static str,
    pub mode_line: String,
    pub notice: Option<&'static str>,
}

pub fn pump_status_card(mode: PumpMode, status: PumpStatus) -> PumpStatusCard {
    let on = status == PumpStatus::On;
    PumpStatusCard {
        on,
        label: if on { "Encendida" } else { "Apagada" },
        mode_line: format!("Operando en modo {}", mode),
        notice: (on && mode == PumpMode::Automatic).then_some(AUTOMATIC_NOTICE),
    }
}

/// Request state of each card's dispatcher
#[derive(Debug, Clone, Default)]
pub struct RequestStates {
    pub soil: CommandRequestState,
    pub climate: CommandRequestState,
    pub pump: CommandRequestState,
}

/// Every card for one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub soil: SoilMoistureCard,
    pub climate: HumidityTemperatureCard,
    pub water: WaterLevelCard,
    pub pump_control: PumpControlCard,
    pub pump_status: PumpStatusCard,
}

impl DashboardView {
    pub fn build(snapshot: &SensorSnapshot, requests: &RequestStates) -> Self {
        Self {
            soil: soil_moisture_card(snapshot.soil_moisture, &requests.soil),
            climate: humidity_temperature_card(
                snapshot.air_humidity,
                snapshot.temperature,
                &requests.climate,
            ),
            water: water_level_card(snapshot.water_level),
            pump_control: pump_control_card(
                snapshot.pump_mode,
                snapshot.water_level,
                snapshot.pump_status,
                &requests.pump,
            ),
            pump_status: pump_status_card(snapshot.pump_mode, snapshot.pump_status),
        }
    }

    fn controls(&self) -> impl Iterator<Item = &ControlButton> {
        self.soil
            .controls
            .iter()
            .chain(self.climate.controls.iter())
            .chain(self.pump_control.mode_controls.iter())
            .chain(self.pump_control.pump_controls.iter())
    }

    /// Whether the control bound to `action` is currently enabled
    pub fn action_enabled(&self, action: CardAction) -> bool {
        self.controls()
            .find(|control| control.action == action)
            .is_some_and(|control| control.enabled)
    }
}
