//! Virtual endpoint adapter
//!
//! The software addresses banks through MIDI channels. Only the channel that
//! matches the selected bank is live; everything else is discarded before it
//! touches the store.

use tracing::{debug, trace};

use super::Outbox;
use crate::addressing::{GridCell, Layout};
use crate::dispatch::SurfaceHandler;
use crate::state::SharedState;

/// Values at or above this count as "on"
const ON_THRESHOLD: u8 = 64;

/// Adapter bound to the virtual input port
#[derive(Debug, Clone)]
pub struct VirtualSurface {
    state: SharedState,
}

impl VirtualSurface {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Mirror `on` into the store for the cell `resolve` picks, and light
    /// the matching LED
    fn mirror(
        &self,
        channel: u8,
        resolve: impl FnOnce(&Layout) -> Option<GridCell>,
        on: bool,
    ) -> Outbox {
        let mut state = self.state.lock();
        let mut out = Outbox::new();

        if channel != state.bank {
            trace!("Channel {} is not the live bank {}; ignored", channel, state.bank);
            return out;
        }

        let Some(cell) = resolve(&state.layout) else {
            return out;
        };

        let bank = state.bank;
        state.store.set(bank, cell.row, cell.column, on);
        debug!("Bank {} {} col {} <- {}", bank, cell.row, cell.column, on);
        out.push_led(&state.layout, cell, on);
        out
    }
}

impl SurfaceHandler for VirtualSurface {
    fn on_press(&self, channel: u8, note: u8, velocity: u8) -> Outbox {
        self.mirror(channel, |_| GridCell::from_button(note), velocity >= ON_THRESHOLD)
    }

    fn on_release(&self, channel: u8, note: u8, _velocity: u8) -> Outbox {
        self.mirror(channel, |_| GridCell::from_button(note), false)
    }

    fn on_control_change(&self, channel: u8, cc: u8, value: u8) -> Outbox {
        let classify = |layout: &Layout| {
            let cell = layout.classify_cc(cc);
            if cell.is_none() {
                trace!("CC {} is outside the button bands; not forwarded", cc);
            }
            cell
        };
        self.mirror(channel, classify, value >= ON_THRESHOLD)
    }
}
