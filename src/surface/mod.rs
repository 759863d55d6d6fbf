//! Surface adapters
//!
//! One adapter per port pair. Each adapter reacts to decoded events, mutates
//! the shared state under its lock and returns the events it wants sent as an
//! [`Outbox`]. The bridge does the sending once the lock is released.

pub mod physical;
pub mod virtual_surface;

pub use physical::PhysicalSurface;
pub use virtual_surface::VirtualSurface;

use std::fmt;

use crate::addressing::{GridCell, Layout};
use crate::midi::MidiEvent;

/// Which end of the bridge a port belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The hardware controller
    Physical,
    /// The software-facing endpoint
    Virtual,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Physical => write!(f, "physical"),
            Side::Virtual => write!(f, "virtual"),
        }
    }
}

/// Event addressed to one side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routed {
    pub to: Side,
    pub event: MidiEvent,
}

/// Ordered list of events produced while handling one inbound event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbox {
    items: Vec<Routed>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, to: Side, event: MidiEvent) {
        self.items.push(Routed { to, event });
    }

    /// LED update for one grid cell. Lit and unlit both use Note On; only the
    /// velocity differs.
    pub fn push_led(&mut self, layout: &Layout, cell: GridCell, on: bool) {
        let velocity = if on { 127 } else { 0 };
        self.push(
            Side::Physical,
            MidiEvent::note_on(layout.feedback_channel, cell.button(), velocity),
        );
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Routed> {
        self.items.iter()
    }

    /// Events for one side, in order
    pub fn to_side(&self, side: Side) -> Vec<MidiEvent> {
        self.items
            .iter()
            .filter(|routed| routed.to == side)
            .map(|routed| routed.event)
            .collect()
    }
}

impl IntoIterator for Outbox {
    type Item = Routed;
    type IntoIter = std::vec::IntoIter<Routed>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
