//! Grid and band addressing
//!
//! The physical controller exposes 24 buttons laid out as 8 columns of 3
//! (mute, solo, record). Button `b` (1-24) sits at `column = (b - 1) / 3`,
//! `row = (b - 1) % 3`. The virtual side addresses the same cells through
//! three 8-wide CC bands. Every component goes through this module; nothing
//! else does row/column arithmetic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of columns (channel strips) on the controller
pub const COLUMNS: usize = 8;

/// Number of logical banks
pub const BANKS: usize = 16;

/// Highest bank index
pub const MAX_BANK: u8 = (BANKS - 1) as u8;

/// Number of grid buttons
pub const GRID_BUTTONS: u8 = (COLUMNS * Row::ALL.len()) as u8;

/// Button row. Discriminants match the hardware order within a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Row {
    Mute = 0,
    Solo = 1,
    Record = 2,
}

impl Row {
    pub const ALL: [Row; 3] = [Row::Mute, Row::Solo, Row::Record];

    pub fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Row::Mute => write!(f, "mute"),
            Row::Solo => write!(f, "solo"),
            Row::Record => write!(f, "record"),
        }
    }
}

/// One cell of the 3x8 button grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub row: Row,
    pub column: u8,
}

impl GridCell {
    /// Decode a physical button index (1-24). Anything else is `None`.
    pub fn from_button(button: u8) -> Option<Self> {
        if !(1..=GRID_BUTTONS).contains(&button) {
            return None;
        }
        let offset = button - 1;
        Some(Self {
            row: Row::from_index(offset % 3)?,
            column: offset / 3,
        })
    }

    /// Physical button index (1-24) for this cell
    pub fn button(&self) -> u8 {
        self.column * 3 + self.row as u8 + 1
    }
}

/// Numeric layout of the controller and of the virtual CC bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Layout {
    #[serde(default = "default_bank_left_note")]
    pub bank_left_note: u8,
    #[serde(default = "default_bank_right_note")]
    pub bank_right_note: u8,
    #[serde(default = "default_solo_note")]
    pub solo_note: u8,
    /// First CC of the mute band
    #[serde(default = "default_mute_base")]
    pub mute_base: u8,
    /// Start of the record band, relative to `mute_base`
    #[serde(default = "default_record_offset")]
    pub record_offset: u8,
    /// Start of the solo band, relative to `mute_base`
    #[serde(default = "default_solo_offset")]
    pub solo_offset: u8,
    /// Added to knob/fader CC numbers while the solo modifier is held
    #[serde(default = "default_solo_cc_offset")]
    pub solo_cc_offset: u8,
    /// Channel used for LED feedback to the controller
    #[serde(default)]
    pub feedback_channel: u8,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            bank_left_note: default_bank_left_note(),
            bank_right_note: default_bank_right_note(),
            solo_note: default_solo_note(),
            mute_base: default_mute_base(),
            record_offset: default_record_offset(),
            solo_offset: default_solo_offset(),
            solo_cc_offset: default_solo_cc_offset(),
            feedback_channel: 0,
        }
    }
}

impl Layout {
    /// First CC of a row's band. Computed in u16 so a bad config cannot wrap.
    pub fn band_start(&self, row: Row) -> u16 {
        let base = self.mute_base as u16;
        match row {
            Row::Mute => base,
            Row::Record => base + self.record_offset as u16,
            Row::Solo => base + self.solo_offset as u16,
        }
    }

    /// CC number addressing `cell` on the virtual side, if it fits in 7 bits
    pub fn band_cc(&self, cell: GridCell) -> Option<u8> {
        let cc = self.band_start(cell.row) + cell.column as u16;
        u8::try_from(cc).ok().filter(|cc| *cc <= 0x7F)
    }

    /// Classify a CC number into a band cell
    pub fn classify_cc(&self, cc: u8) -> Option<GridCell> {
        Row::ALL.into_iter().find_map(|row| {
            let start = self.band_start(row);
            let cc = cc as u16;
            (start..start + COLUMNS as u16).contains(&cc).then(|| GridCell {
                row,
                column: (cc - start) as u8,
            })
        })
    }

    /// Button lit to indicate `bank`: banks 0-7 on the mute row, 8-15 on the record row
    pub fn bank_indicator(&self, bank: u8) -> GridCell {
        let bank = bank.min(MAX_BANK);
        if (bank as usize) < COLUMNS {
            GridCell {
                row: Row::Mute,
                column: bank,
            }
        } else {
            GridCell {
                row: Row::Record,
                column: bank - COLUMNS as u8,
            }
        }
    }
}

fn default_bank_left_note() -> u8 { 25 }
fn default_bank_right_note() -> u8 { 26 }
fn default_solo_note() -> u8 { 27 }
fn default_mute_base() -> u8 { 64 }
fn default_record_offset() -> u8 { 8 }
fn default_solo_offset() -> u8 { 32 }
fn default_solo_cc_offset() -> u8 { 64 }

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_button_decoding() {
        assert_eq!(
            GridCell::from_button(1),
            Some(GridCell { row: Row::Mute, column: 0 })
        );
        assert_eq!(
            GridCell::from_button(2),
            Some(GridCell { row: Row::Solo, column: 0 })
        );
        assert_eq!(
            GridCell::from_button(3),
            Some(GridCell { row: Row::Record, column: 0 })
        );
        assert_eq!(
            GridCell::from_button(10),
            Some(GridCell { row: Row::Mute, column: 3 })
        );
        assert_eq!(
            GridCell::from_button(24),
            Some(GridCell { row: Row::Record, column: 7 })
        );
    }

    #[test]
    fn test_button_out_of_range() {
        assert_eq!(GridCell::from_button(0), None);
        assert_eq!(GridCell::from_button(25), None);
        assert_eq!(GridCell::from_button(127), None);
    }

    #[test]
    fn test_default_bands() {
        let layout = Layout::default();

        assert_eq!(layout.band_start(Row::Mute), 64);
        assert_eq!(layout.band_start(Row::Record), 72);
        assert_eq!(layout.band_start(Row::Solo), 96);

        assert_eq!(
            layout.classify_cc(67),
            Some(GridCell { row: Row::Mute, column: 3 })
        );
        assert_eq!(
            layout.classify_cc(79),
            Some(GridCell { row: Row::Record, column: 7 })
        );
        assert_eq!(
            layout.classify_cc(96),
            Some(GridCell { row: Row::Solo, column: 0 })
        );
        assert_eq!(layout.classify_cc(63), None);
        assert_eq!(layout.classify_cc(80), None);
        assert_eq!(layout.classify_cc(104), None);
    }

    #[test]
    fn test_band_cc_rejects_overflow() {
        let layout = Layout {
            mute_base: 120,
            ..Layout::default()
        };

        assert_eq!(layout.band_cc(GridCell { row: Row::Mute, column: 7 }), Some(127));
        assert_eq!(layout.band_cc(GridCell { row: Row::Record, column: 0 }), None);
    }

    #[test]
    fn test_bank_indicator() {
        let layout = Layout::default();

        assert_eq!(layout.bank_indicator(0).button(), 1);
        assert_eq!(layout.bank_indicator(7).button(), 22);
        assert_eq!(layout.bank_indicator(8).button(), 3);
        assert_eq!(layout.bank_indicator(15).button(), 24);
    }

    proptest! {
        #[test]
        fn decode_is_pure_and_inverts(button in 1u8..=24) {
            let first = GridCell::from_button(button).unwrap();
            let second = GridCell::from_button(button).unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.button(), button);
            prop_assert!(first.column < 8);
        }

        #[test]
        fn band_roundtrip(row_index in 0usize..3, column in 0u8..8) {
            let layout = Layout::default();
            let cell = GridCell { row: Row::ALL[row_index], column };
            let cc = layout.band_cc(cell).unwrap();
            prop_assert_eq!(layout.classify_cc(cc), Some(cell));
        }

        #[test]
        fn bank_indicator_stays_on_grid(bank in any::<u8>()) {
            let button = Layout::default().bank_indicator(bank).button();
            prop_assert!((1..=24).contains(&button));
        }
    }
}
