//! Decode-and-route
//!
//! A [`Dispatcher`] is created once per inbound port. It turns raw bytes into
//! a [`MidiEvent`], classifies it and calls the matching handler of the
//! adapter bound to that port. Unknown kinds are dropped.

use tracing::{debug, trace};

use crate::midi::{format_hex, EventKind, MidiEvent};
use crate::surface::{Outbox, Side};

/// Handlers an adapter exposes to its dispatcher
pub trait SurfaceHandler {
    fn on_press(&self, channel: u8, note: u8, velocity: u8) -> Outbox;

    fn on_release(&self, channel: u8, note: u8, velocity: u8) -> Outbox;

    fn on_control_change(&self, channel: u8, cc: u8, value: u8) -> Outbox;
}

/// Stateless router for one inbound port
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    source: Side,
}

impl Dispatcher {
    pub fn new(source: Side) -> Self {
        Self { source }
    }

    pub fn source(&self) -> Side {
        self.source
    }

    /// Decode `raw` and hand it to `handler`
    pub fn dispatch(&self, raw: &[u8], handler: &dyn SurfaceHandler) -> Outbox {
        let Some(event) = MidiEvent::from_bytes(raw) else {
            trace!("{}: empty message ignored", self.source);
            return Outbox::new();
        };

        debug!("{} RX {} | {}", self.source, format_hex(raw), event);

        match event.kind() {
            EventKind::Press {
                channel,
                note,
                velocity,
            } => handler.on_press(channel, note, velocity),
            EventKind::Release {
                channel,
                note,
                velocity,
            } => handler.on_release(channel, note, velocity),
            EventKind::ControlChange { channel, cc, value } => {
                handler.on_control_change(channel, cc, value)
            }
            EventKind::Unknown { status } => {
                trace!("{}: dropping unhandled status {:02X}", self.source, status);
                Outbox::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(&'static str, u8, u8, u8)>>,
    }

    impl SurfaceHandler for Recorder {
        fn on_press(&self, channel: u8, note: u8, velocity: u8) -> Outbox {
            self.calls.borrow_mut().push(("press", channel, note, velocity));
            Outbox::new()
        }

        fn on_release(&self, channel: u8, note: u8, velocity: u8) -> Outbox {
            self.calls.borrow_mut().push(("release", channel, note, velocity));
            Outbox::new()
        }

        fn on_control_change(&self, channel: u8, cc: u8, value: u8) -> Outbox {
            self.calls.borrow_mut().push(("cc", channel, cc, value));
            Outbox::new()
        }
    }

    #[test]
    fn test_routes_by_kind() {
        let dispatcher = Dispatcher::new(Side::Physical);
        let recorder = Recorder::default();

        dispatcher.dispatch(&[0x90, 1, 127], &recorder);
        dispatcher.dispatch(&[0x80, 1, 127], &recorder);
        dispatcher.dispatch(&[0x90, 2, 0], &recorder);
        dispatcher.dispatch(&[0xB3, 16, 90], &recorder);

        assert_eq!(
            *recorder.calls.borrow(),
            vec![
                ("press", 0, 1, 127),
                ("release", 0, 1, 127),
                ("release", 0, 2, 0),
                ("cc", 3, 16, 90),
            ]
        );
    }

    #[test]
    fn test_drops_unknown_and_empty() {
        let dispatcher = Dispatcher::new(Side::Virtual);
        let recorder = Recorder::default();

        for raw in [&[][..], &[0xF8], &[0xA0, 1, 2], &[0xE5, 0, 64], &[0xF0, 0x47, 0xF7]] {
            assert!(dispatcher.dispatch(raw, &recorder).is_empty());
        }
        assert!(recorder.calls.borrow().is_empty());
        assert_eq!(dispatcher.source(), Side::Virtual);
    }
}
