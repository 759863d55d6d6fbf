//! Bank state store and the shared surface state
//!
//! [`BankStateStore`] keeps one boolean per (bank, row, column): 16 banks of
//! mute/solo/record rows, 8 columns each. It is created all-off and lives for
//! the whole process. [`SurfaceState`] adds the selected bank, the solo latch
//! and the active layout, and [`SharedState`] is the one lock both adapters go
//! through.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

use crate::addressing::{GridCell, Layout, Row, BANKS, COLUMNS, GRID_BUTTONS, MAX_BANK};

type RowState = [bool; COLUMNS];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct BankRows {
    mute: RowState,
    solo: RowState,
    record: RowState,
}

impl BankRows {
    fn row(&self, row: Row) -> &RowState {
        match row {
            Row::Mute => &self.mute,
            Row::Solo => &self.solo,
            Row::Record => &self.record,
        }
    }

    fn row_mut(&mut self, row: Row) -> &mut RowState {
        match row {
            Row::Mute => &mut self.mute,
            Row::Solo => &mut self.solo,
            Row::Record => &mut self.record,
        }
    }
}

/// Per-bank button state
///
/// Out-of-range bank or column indices panic: adapters filter malformed
/// input before it gets here, so reaching the check is a bug.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankStateStore {
    banks: [BankRows; BANKS],
}

impl BankStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of one row of `bank`
    pub fn get(&self, bank: u8, row: Row) -> RowState {
        *self.bank(bank).row(row)
    }

    /// Set one cell. Setting the value it already has is a no-op.
    pub fn set(&mut self, bank: u8, row: Row, column: u8, value: bool) {
        assert!(
            (column as usize) < COLUMNS,
            "column {} out of range (0-{})",
            column,
            COLUMNS - 1
        );
        self.bank_mut(bank).row_mut(row)[column as usize] = value;
    }

    fn bank(&self, bank: u8) -> &BankRows {
        assert!(bank <= MAX_BANK, "bank {} out of range (0-{})", bank, MAX_BANK);
        &self.banks[bank as usize]
    }

    fn bank_mut(&mut self, bank: u8) -> &mut BankRows {
        assert!(bank <= MAX_BANK, "bank {} out of range (0-{})", bank, MAX_BANK);
        &mut self.banks[bank as usize]
    }
}

/// Everything the adapters read and mutate
#[derive(Debug, Clone, Default)]
pub struct SurfaceState {
    /// Selected bank (0-15), only moved by the physical bank buttons
    pub bank: u8,
    /// Held while the physical solo modifier is down
    pub solo_latch: bool,
    pub store: BankStateStore,
    pub layout: Layout,
    /// Bank each grid button was pressed in, while it is held
    held: [Option<u8>; GRID_BUTTONS as usize],
}

impl SurfaceState {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    /// Step the bank left, clamped at 0. Returns true if it moved.
    pub fn bank_left(&mut self) -> bool {
        let previous = self.bank;
        self.bank = self.bank.saturating_sub(1);
        self.bank != previous
    }

    /// Step the bank right, clamped at 15. Returns true if it moved.
    pub fn bank_right(&mut self) -> bool {
        let previous = self.bank;
        self.bank = (self.bank + 1).min(MAX_BANK);
        self.bank != previous
    }

    /// Remember that `cell` went down in the current bank
    pub fn hold(&mut self, cell: GridCell) -> u8 {
        self.held[cell.button() as usize - 1] = Some(self.bank);
        self.bank
    }

    /// Bank `cell` was pressed in, or the current bank if it was not held
    pub fn release(&mut self, cell: GridCell) -> u8 {
        self.held[cell.button() as usize - 1]
            .take()
            .unwrap_or(self.bank)
    }
}

/// Cloneable handle to the state shared by both adapters
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<SurfaceState>>,
}

impl SharedState {
    pub fn new(layout: Layout) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SurfaceState::new(layout))),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.inner.lock()
    }

    pub fn current_bank(&self) -> u8 {
        self.inner.lock().bank
    }

    pub fn layout(&self) -> Layout {
        self.inner.lock().layout
    }

    /// Swap in a new layout, keeping bank, latch and store
    pub fn set_layout(&self, layout: Layout) {
        self.inner.lock().layout = layout;
    }
}
