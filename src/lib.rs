//! MIDI Mix bridge
//!
//! Sits between an Akai MIDI Mix style controller and a virtual MIDI
//! endpoint. Adds 16 banks on top of the controller's single 3x8 button
//! grid, keeps the grid LEDs in sync with the software, and shifts knob CCs
//! while the solo button is held.

pub mod addressing;
pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod midi;
pub mod state;
pub mod surface;
pub mod transport;

pub use addressing::{GridCell, Layout, Row};
pub use bridge::Bridge;
pub use config::{AppConfig, ConfigWatcher};
pub use error::{BridgeError, Result};
pub use midi::{EventKind, MidiEvent};
pub use state::{BankStateStore, SharedState};
pub use surface::{Outbox, Side};
