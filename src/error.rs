use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionError {
    #[error("MIDI backend unavailable: {0}")]
    Backend(String),

    #[error("Unknown MIDI device: {0}")]
    UnknownDevice(String),

    #[error("Failed to connect MIDI port {0}")]
    Connect(String),

    #[error("No output port connected")]
    NotConnected,

    #[error("Failed to send MIDI frame: {0}")]
    Send(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineError {
    #[error("Please select a MIDI device")]
    NoDeviceSelected,

    #[error("Please select an instrument")]
    NoInstrumentSelected,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
