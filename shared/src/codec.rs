//! JSON message codec
//!
//! Each transport frame carries exactly one JSON [`Envelope`]. Inbound
//! `signal_data` frames decode into zero, one or two [`SignalSample`]s:
//!
//! | `ppg_value` | `ecg_value` | samples        |
//! |-------------|-------------|----------------|
//! | present     | present     | `[PPG, ECG]`   |
//! | present     | absent      | `[PPG]`        |
//! | absent      | present     | `[ECG]`        |
//! | absent      | absent      | `[]`           |

use thiserror::Error;

use crate::framing::MAX_FRAME_SIZE;
use crate::{ControlCommand, Envelope, SignalKind, SignalPayload, SignalSample};

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Unexpected inbound message type: {0}")]
    UnexpectedMessage(&'static str),

    #[error("Quality out of range [0, 1]: {0}")]
    InvalidQuality(f64),

    #[error("Frame too large: {0} bytes (max: {MAX_FRAME_SIZE})")]
    FrameTooLarge(usize),
}

/// Decode one raw inbound frame into signal samples
pub fn decode_frame(frame: &[u8]) -> Result<Vec<SignalSample>, CodecError> {
    decode(std::str::from_utf8(frame)?)
}

/// Decode one inbound text frame into signal samples
pub fn decode(text: &str) -> Result<Vec<SignalSample>, CodecError> {
    match serde_json::from_str::<Envelope>(text)? {
        Envelope::SignalData { payload } => samples(&payload),
        Envelope::Control(_) => Err(CodecError::UnexpectedMessage("control")),
    }
}

/// Split a payload into one sample per present channel
pub fn samples(payload: &SignalPayload) -> Result<Vec<SignalSample>, CodecError> {
    if !(0.0..=1.0).contains(&payload.quality) {
        return Err(CodecError::InvalidQuality(payload.quality));
    }

    let channels = [
        (SignalKind::Ppg, payload.ppg_value),
        (SignalKind::Ecg, payload.ecg_value),
    ];

    Ok(channels
        .into_iter()
        .filter_map(|(kind, value)| {
            value.map(|value| SignalSample {
                timestamp: payload.timestamp,
                kind,
                value,
                quality: payload.quality,
            })
        })
        .collect())
}

/// Encode an envelope as a JSON text frame
pub fn encode(envelope: &Envelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Encode a control command as a JSON text frame
pub fn encode_command(command: &ControlCommand) -> Result<String, CodecError> {
    encode(&Envelope::Control(command.clone()))
}
