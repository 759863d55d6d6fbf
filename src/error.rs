//! Error types for the bridge.

use thiserror::Error;

use crate::surface::Side;

/// Port direction, as seen from the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortDirection::Input => write!(f, "input"),
            PortDirection::Output => write!(f, "output"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("{side} {direction} port '{pattern}' not found")]
    PortNotFound {
        side: Side,
        direction: PortDirection,
        pattern: String,
    },

    #[error("MIDI error: {0}")]
    Midi(String),

    #[error("failed to send to {destination}: {reason}")]
    SendFailure { destination: Side, reason: String },

    #[error("{0} output is not connected")]
    NotConnected(Side),
}

impl From<midir::InitError> for BridgeError {
    fn from(e: midir::InitError) -> Self {
        BridgeError::Midi(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiOutput>> for BridgeError {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        BridgeError::Midi(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiInput>> for BridgeError {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        BridgeError::Midi(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
