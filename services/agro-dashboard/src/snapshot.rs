//! Sensor status snapshot pushed by the backend
//!
//! Every `sensorData` event carries the complete state of the installation.
//! Numeric sensors either report a value or one of two sentinel states, so a
//! reading is modelled as a single enum rather than a number plus a flag.
//!
//! Serialization always emits the canonical spelling; deserialization also
//! accepts the capitalization and abbreviation variants older firmware sends.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

const OFF_LABEL: &str = "apagado";
const NOT_CONNECTED_LABEL: &str = "no conectado";

/// A numeric sensor reading or the reason it is missing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Value(f64),
    Off,
    NotConnected,
}

impl Reading {
    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(*v),
            Reading::Off | Reading::NotConnected => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Reading::Value(_))
    }

    fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            OFF_LABEL => Some(Reading::Off),
            NOT_CONNECTED_LABEL => Some(Reading::NotConnected),
            _ => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Value(v) => write!(f, "{}", v),
            Reading::Off => write!(f, "{}", OFF_LABEL),
            Reading::NotConnected => write!(f, "{}", NOT_CONNECTED_LABEL),
        }
    }
}

impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reading::Value(v) => serializer.serialize_f64(*v),
            Reading::Off => serializer.serialize_str(OFF_LABEL),
            Reading::NotConnected => serializer.serialize_str(NOT_CONNECTED_LABEL),
        }
    }
}

impl<'de> Deserialize<'de> for Reading {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Number(f64),
            Text(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Number(v) => Ok(Reading::Value(v)),
            Wire::Text(label) => Reading::from_label(&label).ok_or_else(|| {
                de::Error::custom(format!("unexpected sensor state '{}'", label))
            }),
        }
    }
}

/// Water tank level switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterLevel {
    #[serde(rename = "Sin agua", alias = "sin agua")]
    NoWater,
    #[serde(rename = "Con agua", alias = "con agua")]
    HasWater,
}

impl fmt::Display for WaterLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaterLevel::NoWater => write!(f, "Sin agua"),
            WaterLevel::HasWater => write!(f, "Con agua"),
        }
    }
}

/// Pump operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PumpMode {
    #[serde(rename = "automatico", alias = "automático", alias = "auto")]
    Automatic,
    #[serde(rename = "manual")]
    Manual,
}

impl fmt::Display for PumpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PumpMode::Automatic => write!(f, "automático"),
            PumpMode::Manual => write!(f, "manual"),
        }
    }
}

/// Pump relay state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PumpStatus {
    #[serde(rename = "apagado", alias = "Apagado")]
    Off,
    #[serde(rename = "encendido", alias = "Encendido")]
    On,
}

/// Full sensor and pump status as published on the real-time channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Raw soil moisture ADC reading (0 = wet, 1024 = dry)
    #[serde(rename = "humedadSuelo")]
    pub soil_moisture: Reading,
    /// Relative air humidity in percent
    #[serde(rename = "humedad")]
    pub air_humidity: Reading,
    /// Air temperature in degrees Celsius
    #[serde(rename = "temperatura")]
    pub temperature: Reading,
    #[serde(rename = "nivelAgua")]
    pub water_level: WaterLevel,
    #[serde(rename = "modoBomba")]
    pub pump_mode: PumpMode,
    #[serde(rename = "Bomba")]
    pub pump_status: PumpStatus,
}

impl SensorSnapshot {
    /// Decode a snapshot from an event payload
    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
