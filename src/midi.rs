//! MIDI event triple and kind decoding
//!
//! Everything the bridge routes is a three-byte channel message. The kind is
//! decoded once, at the dispatcher boundary, into [`EventKind`].

use std::fmt;

/// Note On status (high nibble)
pub const NOTE_ON: u8 = 0x90;
/// Note Off status (high nibble)
pub const NOTE_OFF: u8 = 0x80;
/// Control Change status (high nibble)
pub const CONTROL_CHANGE: u8 = 0xB0;

/// Raw channel message: (status, data1, data2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiEvent {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

/// Decoded event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Note On with non-zero velocity
    Press { channel: u8, note: u8, velocity: u8 },

    /// Note Off, or Note On with velocity 0
    Release { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Anything else (clock, aftertouch, pitch bend, sysex...)
    Unknown { status: u8 },
}

impl MidiEvent {
    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self { status, data1, data2 }
    }

    /// Note On on `channel`. Also used for "light off" feedback with velocity 0.
    pub const fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(NOTE_ON | (channel & 0x0F), note & 0x7F, velocity & 0x7F)
    }

    pub const fn control_change(channel: u8, cc: u8, value: u8) -> Self {
        Self::new(CONTROL_CHANGE | (channel & 0x0F), cc & 0x7F, value & 0x7F)
    }

    /// Build an event from raw bytes as delivered by the transport.
    ///
    /// Missing data bytes are read as zero; an empty slice yields `None`.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;
        Some(Self {
            status,
            data1: data.get(1).copied().unwrap_or(0),
            data2: data.get(2).copied().unwrap_or(0),
        })
    }

    /// Low nibble of the status byte
    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    /// Classify by `status & 0xF0`
    pub fn kind(&self) -> EventKind {
        // Running status and system messages never classify as channel events
        if self.status < 0x80 || self.status >= 0xF0 {
            return EventKind::Unknown {
                status: self.status,
            };
        }

        let channel = self.channel();
        let data1 = self.data1 & 0x7F;
        let data2 = self.data2 & 0x7F;

        match self.status & 0xF0 {
            NOTE_ON if data2 > 0 => EventKind::Press {
                channel,
                note: data1,
                velocity: data2,
            },
            NOTE_ON | NOTE_OFF => EventKind::Release {
                channel,
                note: data1,
                velocity: data2,
            },
            CONTROL_CHANGE => EventKind::ControlChange {
                channel,
                cc: data1,
                value: data2,
            },
            _ => EventKind::Unknown {
                status: self.status,
            },
        }
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            EventKind::Press {
                channel,
                note,
                velocity,
            } => write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity),
            EventKind::Release {
                channel,
                note,
                velocity,
            } => write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity),
            EventKind::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            EventKind::Unknown { status } => write!(f, "Unknown status:{:02X}", status),
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_parsing() {
        let event = MidiEvent::from_bytes(&[0x90, 1, 127]).unwrap();

        assert_eq!(
            event.kind(),
            EventKind::Press {
                channel: 0,
                note: 1,
                velocity: 127,
            }
        );
    }

    #[test]
    fn test_note_on_velocity_zero_is_release() {
        let event = MidiEvent::from_bytes(&[0x90, 60, 0]).unwrap();

        assert_eq!(
            event.kind(),
            EventKind::Release {
                channel: 0,
                note: 60,
                velocity: 0,
            }
        );
    }

    #[test]
    fn test_note_off_parsing() {
        let event = MidiEvent::from_bytes(&[0x83, 4, 64]).unwrap();

        assert_eq!(
            event.kind(),
            EventKind::Release {
                channel: 3,
                note: 4,
                velocity: 64,
            }
        );
    }

    #[test]
    fn test_control_change() {
        let event = MidiEvent::from_bytes(&[0xB2, 7, 100]).unwrap();

        assert_eq!(
            event.kind(),
            EventKind::ControlChange {
                channel: 2,
                cc: 7,
                value: 100,
            }
        );
    }

    #[test]
    fn test_unknown_kinds() {
        // Timing clock, channel pressure, pitch bend, running status
        for bytes in [&[0xF8][..], &[0xD0, 12], &[0xE0, 0, 64], &[0x40, 1, 2]] {
            let event = MidiEvent::from_bytes(bytes).unwrap();
            assert!(matches!(event.kind(), EventKind::Unknown { .. }), "{:?}", bytes);
        }
    }

    #[test]
    fn test_short_and_empty_input() {
        assert!(MidiEvent::from_bytes(&[]).is_none());

        let event = MidiEvent::from_bytes(&[0xC0, 5]).unwrap();
        assert_eq!(event, MidiEvent::new(0xC0, 5, 0));
    }

    #[test]
    fn test_builders_mask_channel_and_data() {
        assert_eq!(MidiEvent::note_on(0x12, 10, 127).to_bytes(), [0x92, 10, 127]);
        assert_eq!(MidiEvent::control_change(5, 64, 0).to_bytes(), [0xB5, 64, 0]);
        assert_eq!(MidiEvent::control_change(0, 0xFF, 0xFF).to_bytes(), [0xB0, 0x7F, 0x7F]);
    }

    #[test]
    fn test_display() {
        assert_eq!(MidiEvent::note_on(0, 10, 127).to_string(), "NoteOn ch:1 n:10 v:127");
        assert_eq!(format_hex(&[0xB5, 0x40, 0x7F]), "B5 40 7F");
    }
}
