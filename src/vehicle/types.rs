//! Owner API payloads

use crate::geo::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Charging status reported by the car
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargingState {
    Disconnected,
    Stopped,
    Charging,
    Complete,
    Starting,
    NoPower,
    Other(String),
}

impl ChargingState {
    /// Case-insensitive parse, unknown values kept verbatim
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "disconnected" => Self::Disconnected,
            "stopped" => Self::Stopped,
            "charging" => Self::Charging,
            "complete" => Self::Complete,
            "starting" => Self::Starting,
            "nopower" => Self::NoPower,
            _ => Self::Other(label.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Stopped => "Stopped",
            Self::Charging => "Charging",
            Self::Complete => "Complete",
            Self::Starting => "Starting",
            Self::NoPower => "NoPower",
            Self::Other(label) => label,
        }
    }
}

impl Default for ChargingState {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl fmt::Display for ChargingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChargingState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.map_or_else(Self::default, |l| Self::from_label(&l)))
    }
}

impl Serialize for ChargingState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Charge telemetry snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeState {
    pub charging_state: ChargingState,
    #[serde(deserialize_with = "null_as_default")]
    pub charger_actual_current: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub charger_voltage: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub charger_phases: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub charge_port_door_open: bool,
    pub battery_level: Option<i32>,
    pub charge_limit_soc: Option<i32>,
    pub charge_current_request: Option<i32>,
    pub charge_current_request_max: Option<i32>,
    pub charge_port_latch: Option<String>,
}

/// Position and motion snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveState {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<i32>,
    /// Milliseconds since the epoch
    pub timestamp: Option<i64>,
}

impl DriveState {
    /// Reported position, `None` unless both coordinates are present
    pub fn position(&self) -> Option<GeoPoint> {
        Some(GeoPoint::new(self.latitude?, self.longitude?))
    }

    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp?)
    }
}

/// `/vehicle_data` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleData {
    pub id_s: Option<String>,
    pub vin: Option<String>,
    pub display_name: Option<String>,
    pub state: Option<String>,
    pub drive_state: Option<DriveState>,
}

/// Entry of the `/api/1/vehicles` listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSummary {
    pub id_s: Option<String>,
    pub vin: Option<String>,
    pub display_name: Option<String>,
    pub state: Option<String>,
}

/// `{"response": ...}` wrapper used by every owner API endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub response: Option<T>,
}

/// Body of a command response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommandReply {
    pub result: bool,
    pub reason: Option<String>,
}

/// Outcome of a vehicle command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Success,
    Failed(String),
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Failure reason, `None` on success
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failed(reason) => Some(reason),
        }
    }

    /// Interpret a command envelope; a missing body counts as an unknown failure
    pub fn from_envelope(envelope: Option<Envelope<CommandReply>>) -> Self {
        match envelope.and_then(|e| e.response) {
            Some(reply) if reply.result => Self::Success,
            Some(reply) => Self::Failed(
                reply
                    .reason
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
            None => Self::Failed("unknown".to_string()),
        }
    }
}
