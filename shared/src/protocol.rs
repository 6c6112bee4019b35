//! Wire types for the biosignal link
//!
//! Every message is a JSON object tagged by `type`:
//! ```text
//! {"type":"signal_data","payload":{"timestamp":100,"ppg_value":0.5,"sample_rate":250,"quality":0.9}}
//! {"type":"control","command":"start_acquisition","parameters":{"gain":2}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Top-level message exchanged with the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Inbound sensor frame
    SignalData { payload: SignalPayload },
    /// Outbound control command
    Control(ControlCommand),
}

/// Raw inbound frame payload, one per `signal_data` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPayload {
    /// Device clock timestamp
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ppg_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecg_value: Option<f64>,
    /// Device sample rate in Hz
    pub sample_rate: f64,
    /// Signal quality in [0, 1]
    pub quality: f64,
}

/// Biosignal channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Ppg,
    Ecg,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Ppg => write!(f, "PPG"),
            SignalKind::Ecg => write!(f, "ECG"),
        }
    }
}

/// One decoded reading of a single channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSample {
    pub timestamp: u64,
    pub kind: SignalKind,
    pub value: f64,
    pub quality: f64,
}

/// Acquisition commands understood by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    StartAcquisition,
    StopAcquisition,
    Calibrate,
}

/// Outbound control command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub command: CommandKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
}

/// Builder helpers for creating commands
impl ControlCommand {
    /// Create a command without parameters
    pub fn new(command: CommandKind) -> Self {
        Self {
            command,
            parameters: None,
        }
    }

    pub fn start_acquisition() -> Self {
        Self::new(CommandKind::StartAcquisition)
    }

    pub fn stop_acquisition() -> Self {
        Self::new(CommandKind::StopAcquisition)
    }

    pub fn calibrate() -> Self {
        Self::new(CommandKind::Calibrate)
    }

    /// Attach a parameter, replacing any previous value under `key`
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}
