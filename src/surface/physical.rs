//! Physical controller adapter
//!
//! Handles presses, releases and knob/fader moves coming from the hardware.
//!
//! The bank buttons reuse the grid LEDs as a bank indicator: pressing one
//! lights a single cell for the new bank, and releasing it repaints the mute
//! and record rows from the store. Grid buttons are momentary: press stores
//! `true` and sends 127, release stores `false` and sends 0 in the bank the
//! press went to, even if the bank changed while the button was held.

use tracing::{debug, info};

use super::{Outbox, Side};
use crate::addressing::{GridCell, Row, COLUMNS};
use crate::dispatch::SurfaceHandler;
use crate::midi::MidiEvent;
use crate::state::{SharedState, SurfaceState};

/// Adapter bound to the physical input port
#[derive(Debug, Clone)]
pub struct PhysicalSurface {
    state: SharedState,
}

impl PhysicalSurface {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    fn grid_button(state: &mut SurfaceState, note: u8, pressed: bool) -> Outbox {
        let mut out = Outbox::new();

        let Some(cell) = GridCell::from_button(note) else {
            debug!("Ignoring note {} (not a grid button)", note);
            return out;
        };

        // Release goes to the bank the press went to, even after a bank switch
        let bank = if pressed {
            state.hold(cell)
        } else {
            state.release(cell)
        };
        state.store.set(bank, cell.row, cell.column, pressed);

        match state.layout.band_cc(cell) {
            Some(cc) => {
                let value = if pressed { 127 } else { 0 };
                debug!(
                    "Button {} -> {} col {} bank {} (cc {} = {})",
                    note, cell.row, cell.column, bank, cc, value
                );
                out.push(Side::Virtual, MidiEvent::control_change(bank, cc, value));
            }
            None => debug!("No CC fits {} col {}; not forwarded", cell.row, cell.column),
        }

        out
    }

    /// Repaint mute and record rows of the current bank over the indicator
    fn restore_indicator_rows(state: &SurfaceState) -> Outbox {
        let mut out = Outbox::new();
        for row in [Row::Mute, Row::Record] {
            let values = state.store.get(state.bank, row);
            for (column, on) in values.into_iter().enumerate() {
                let cell = GridCell {
                    row,
                    column: column as u8,
                };
                out.push_led(&state.layout, cell, on);
            }
        }
        debug_assert_eq!(out.len(), 2 * COLUMNS);
        out
    }
}

impl SurfaceHandler for PhysicalSurface {
    fn on_press(&self, _channel: u8, note: u8, _velocity: u8) -> Outbox {
        let mut state = self.state.lock();
        let layout = state.layout;

        if note == layout.bank_left_note || note == layout.bank_right_note {
            if note == layout.bank_left_note {
                state.bank_left();
            } else {
                state.bank_right();
            }
            info!("Bank {}", state.bank);

            let mut out = Outbox::new();
            out.push_led(&layout, layout.bank_indicator(state.bank), true);
            return out;
        }

        if note == layout.solo_note {
            state.solo_latch = true;
            return Outbox::new();
        }

        Self::grid_button(&mut state, note, true)
    }

    fn on_release(&self, _channel: u8, note: u8, _velocity: u8) -> Outbox {
        let mut state = self.state.lock();
        let layout = state.layout;

        if note == layout.solo_note {
            state.solo_latch = false;
            return Outbox::new();
        }

        if note == layout.bank_left_note || note == layout.bank_right_note {
            return Self::restore_indicator_rows(&state);
        }

        Self::grid_button(&mut state, note, false)
    }

    fn on_control_change(&self, _channel: u8, cc: u8, value: u8) -> Outbox {
        let state = self.state.lock();
        let mut out = Outbox::new();

        let target = if state.solo_latch {
            cc.checked_add(state.layout.solo_cc_offset)
                .filter(|shifted| *shifted <= 0x7F)
        } else {
            Some(cc)
        };

        match target {
            Some(target) => {
                out.push(
                    Side::Virtual,
                    MidiEvent::control_change(state.bank, target, value),
                );
            }
            None => debug!(
                "CC {} + solo offset {} leaves the 7-bit range; dropped",
                cc, state.layout.solo_cc_offset
            ),
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::{Layout, MAX_BANK};
    use proptest::prelude::*;

    fn surface() -> (PhysicalSurface, SharedState) {
        let state = SharedState::new(Layout::default());
        (PhysicalSurface::new(state.clone()), state)
    }

    #[test]
    fn test_grid_press_and_release_forward_cc() {
        let (surface, state) = surface();
        state.lock().bank = 5;

        let out = surface.on_press(0, 1, 127);
        assert_eq!(out.to_side(Side::Virtual), vec![MidiEvent::new(0xB5, 64, 127)]);
        assert!(out.to_side(Side::Physical).is_empty());
        assert!(state.lock().store.get(5, Row::Mute)[0]);

        let out = surface.on_release(0, 1, 0);
        assert_eq!(out.to_side(Side::Virtual), vec![MidiEvent::new(0xB5, 64, 0)]);
        assert!(!state.lock().store.get(5, Row::Mute)[0]);
    }

    #[test]
    fn test_release_after_bank_switch_uses_press_bank() {
        let (surface, state) = surface();

        surface.on_press(0, 1, 127);
        surface.on_press(0, 26, 127);
        surface.on_release(0, 26, 0);

        let out = surface.on_release(0, 1, 0);
        assert_eq!(out.to_side(Side::Virtual), vec![MidiEvent::new(0xB0, 64, 0)]);
        assert!(!state.lock().store.get(0, Row::Mute)[0]);
        assert!(!state.lock().store.get(1, Row::Mute)[0]);
    }

    #[test]
    fn test_grid_rows_use_their_bands() {
        let (surface, _state) = surface();

        // Button 2 = solo col 0, button 24 = record col 7
        let out = surface.on_press(0, 2, 127);
        assert_eq!(out.to_side(Side::Virtual), vec![MidiEvent::new(0xB0, 96, 127)]);

        let out = surface.on_press(0, 24, 127);
        assert_eq!(out.to_side(Side::Virtual), vec![MidiEvent::new(0xB0, 79, 127)]);
    }

    #[test]
    fn test_unknown_note_is_dropped() {
        let (surface, state) = surface();
        assert!(surface.on_press(0, 0, 127).is_empty());
        assert!(surface.on_press(0, 60, 127).is_empty());
        assert!(surface.on_release(0, 60, 0).is_empty());
        assert_eq!(state.lock().store, crate::state::BankStateStore::new());
    }

    #[test]
    fn test_bank_right_lights_indicator() {
        let (surface, state) = surface();

        let out = surface.on_press(0, 26, 127);
        assert_eq!(state.current_bank(), 1);
        assert_eq!(out.to_side(Side::Physical), vec![MidiEvent::new(0x90, 4, 127)]);
        assert!(out.to_side(Side::Virtual).is_empty());
    }

    #[test]
    fn test_bank_right_at_top_stays() {
        let (surface, state) = surface();
        state.lock().bank = MAX_BANK;

        let out = surface.on_press(0, 26, 127);
        assert_eq!(state.current_bank(), MAX_BANK);

        let leds = out.to_side(Side::Physical);
        assert_eq!(leds.len(), 1);
        assert!((1..=24).contains(&leds[0].data1));
    }

    #[test]
    fn test_bank_release_restores_rows() {
        let (surface, state) = surface();
        {
            let mut s = state.lock();
            s.bank = 2;
            s.store.set(2, Row::Mute, 3, true);
            s.store.set(2, Row::Record, 7, true);
            s.store.set(1, Row::Mute, 0, true);
        }

        let out = surface.on_release(0, 25, 0);
        let leds = out.to_side(Side::Physical);
        assert_eq!(leds.len(), 16);
        assert!(leds.iter().all(|e| e.status == 0x90));

        let lit: Vec<u8> = leds.iter().filter(|e| e.data2 == 127).map(|e| e.data1).collect();
        assert_eq!(lit, vec![10, 24]);
    }

    #[test]
    fn test_solo_latch_shifts_cc() {
        let (surface, state) = surface();
        state.lock().bank = 3;

        let out = surface.on_control_change(0, 19, 80);
        assert_eq!(out.to_side(Side::Virtual), vec![MidiEvent::new(0xB3, 19, 80)]);

        assert!(surface.on_press(0, 27, 127).is_empty());
        let out = surface.on_control_change(0, 19, 80);
        assert_eq!(out.to_side(Side::Virtual), vec![MidiEvent::new(0xB3, 83, 80)]);

        // Out of range once shifted
        assert!(surface.on_control_change(0, 70, 80).is_empty());

        assert!(surface.on_release(0, 27, 0).is_empty());
        let out = surface.on_control_change(0, 70, 80);
        assert_eq!(out.to_side(Side::Virtual), vec![MidiEvent::new(0xB3, 70, 80)]);
    }

    proptest! {
        #[test]
        fn bank_never_leaves_range(presses in proptest::collection::vec(any::<bool>(), 0..64)) {
            let (surface, state) = surface();
            for right in presses {
                let note = if right { 26 } else { 25 };
                let out = surface.on_press(0, note, 127);
                surface.on_release(0, note, 0);
                prop_assert!(state.current_bank() <= MAX_BANK);
                for event in out.to_side(Side::Physical) {
                    prop_assert!((1..=24).contains(&event.data1));
                }
            }
        }

        #[test]
        fn bank_left_at_zero_is_idempotent(count in 1usize..50) {
            let (surface, state) = surface();
            for _ in 0..count {
                surface.on_press(0, 25, 127);
            }
            prop_assert_eq!(state.current_bank(), 0);
        }

        #[test]
        fn press_and_release_hit_same_cell(button in 1u8..=24, bank in 0u8..16) {
            let (surface, state) = surface();
            state.lock().bank = bank;
            let pressed = surface.on_press(0, button, 127).to_side(Side::Virtual);
            let released = surface.on_release(0, button, 0).to_side(Side::Virtual);
            prop_assert_eq!(pressed.len(), 1);
            prop_assert_eq!(released.len(), 1);
            prop_assert_eq!(pressed[0].status, released[0].status);
            prop_assert_eq!(pressed[0].data1, released[0].data1);
        }
    }
}
