//! Mismatch bookkeeping for one verification pass.

use crate::port::DataWord;

/// Running record of data-integrity mismatches within a pass.
///
/// The record keeps a monotonically widening address window
/// `[first, last]`, not an exact list of every bad address: the first
/// mismatch seeds both bounds, later mismatches only push `last`. The
/// `first_chosen` flag distinguishes "no error yet" from "error at
/// address 0".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ErrorRecord {
    count: u32,
    first_address: u32,
    last_address: u32,
    first_chosen: bool,
    captured: DataWord,
    display_count: u32,
}

impl ErrorRecord {
    /// Empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a mismatch observed at `address`, widening the window and
    /// bumping the saturating counter.
    pub fn record_mismatch(&mut self, address: u32) {
        self.count = self.count.saturating_add(1);
        if !self.first_chosen {
            self.first_address = address;
            self.first_chosen = true;
        }
        self.last_address = address;
    }

    /// Stores the mismatching word captured during error replay.
    pub fn capture(&mut self, data: DataWord) {
        self.captured = data;
    }

    /// Counts one host-acknowledged error-display step (saturating).
    pub fn count_displayed(&mut self) {
        self.display_count = self.display_count.saturating_add(1);
    }

    /// Clears display progress when the replay loop finishes.
    pub fn reset_display(&mut self) {
        self.display_count = 0;
    }

    /// Clears the per-pass counter and window seed while keeping the last
    /// published window addresses readable by the host.
    pub fn reset_for_pass(&mut self) {
        self.count = 0;
        self.first_chosen = false;
    }

    /// Saturating mismatch count for the pass.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// True once at least one mismatch was recorded this pass.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.first_chosen
    }

    /// First mismatching address of the window.
    #[must_use]
    pub const fn first_address(&self) -> u32 {
        self.first_address
    }

    /// Last mismatching address of the window.
    #[must_use]
    pub const fn last_address(&self) -> u32 {
        self.last_address
    }

    /// Word captured by the most recent replay read.
    #[must_use]
    pub const fn captured(&self) -> &DataWord {
        &self.captured
    }

    /// Host-acknowledged display steps so far in this replay loop.
    #[must_use]
    pub const fn display_count(&self) -> u32 {
        self.display_count
    }
}
