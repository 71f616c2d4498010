//! Beat payload types carried over the three port streams.

use crate::geometry::MAX_DATA_LANES;

/// One data word as carried on the port, split into 32-bit lanes.
///
/// Lanes beyond the configured port width are always zero, so whole-word
/// comparison is valid between words built for the same geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DataWord {
    lanes: [u32; MAX_DATA_LANES],
}

impl Default for DataWord {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl DataWord {
    /// All-zero word.
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            lanes: [0; MAX_DATA_LANES],
        }
    }

    /// Replicates a 32-bit pattern across the first `width` lanes.
    #[must_use]
    pub fn replicate(pattern: u32, width: usize) -> Self {
        let mut lanes = [0; MAX_DATA_LANES];
        for lane in lanes.iter_mut().take(width.min(MAX_DATA_LANES)) {
            *lane = pattern;
        }
        Self { lanes }
    }

    /// Builds a word from explicit lane values, zero-filling the rest.
    #[must_use]
    pub fn from_lanes(values: &[u32]) -> Self {
        let mut lanes = [0; MAX_DATA_LANES];
        for (lane, value) in lanes.iter_mut().zip(values) {
            *lane = *value;
        }
        Self { lanes }
    }

    /// Value of one 32-bit lane; lanes past the window read zero.
    #[must_use]
    pub fn lane(&self, index: usize) -> u32 {
        self.lanes.get(index).copied().unwrap_or(0)
    }

    /// Overwrites one lane. No effect on out-of-window lanes.
    pub fn set_lane(&mut self, index: usize, value: u32) {
        if let Some(lane) = self.lanes.get_mut(index) {
            *lane = value;
        }
    }

    /// Flips bits in one lane. No effect on out-of-window lanes.
    pub fn xor_lane(&mut self, index: usize, mask: u32) {
        if let Some(lane) = self.lanes.get_mut(index) {
            *lane ^= mask;
        }
    }

    /// All lanes in window order.
    #[must_use]
    pub const fn lanes(&self) -> &[u32; MAX_DATA_LANES] {
        &self.lanes
    }
}

/// Per-lane byte-enable mask: the low four bits of each entry select the
/// bytes of the corresponding 32-bit lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ByteEnable {
    lanes: [u8; MAX_DATA_LANES],
}

/// All four byte lanes of a 32-bit lane enabled.
const FULL_LANE: u8 = 0x0F;

impl ByteEnable {
    /// Enables every byte of the first `width` lanes.
    #[must_use]
    pub fn full(width: usize) -> Self {
        let mut lanes = [0; MAX_DATA_LANES];
        for lane in lanes.iter_mut().take(width.min(MAX_DATA_LANES)) {
            *lane = FULL_LANE;
        }
        Self { lanes }
    }

    /// Disables every byte.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            lanes: [0; MAX_DATA_LANES],
        }
    }

    /// Byte mask for one lane.
    #[must_use]
    pub fn lane(&self, index: usize) -> u8 {
        self.lanes.get(index).copied().unwrap_or(0)
    }

    /// Sets the byte mask for one lane.
    pub fn set_lane(&mut self, index: usize, mask: u8) {
        if let Some(lane) = self.lanes.get_mut(index) {
            *lane = mask & FULL_LANE;
        }
    }

    /// True when the lane has every byte enabled.
    #[must_use]
    pub fn lane_is_full(&self, index: usize) -> bool {
        self.lane(index) == FULL_LANE
    }

    /// True when the lane has some but not all bytes enabled.
    #[must_use]
    pub fn lane_is_partial(&self, index: usize) -> bool {
        let mask = self.lane(index);
        mask != 0 && mask != FULL_LANE
    }
}

/// One command-stream beat: a word address plus the write-enable flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CommandBeat {
    /// Word address the operation targets.
    pub address: u32,
    /// True for a write command, false for a read command.
    pub write_enable: bool,
}

impl CommandBeat {
    /// Write command at `address`.
    #[must_use]
    pub const fn write(address: u32) -> Self {
        Self {
            address,
            write_enable: true,
        }
    }

    /// Read command at `address`.
    #[must_use]
    pub const fn read(address: u32) -> Self {
        Self {
            address,
            write_enable: false,
        }
    }
}

/// One write-data-stream beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct WriteBeat {
    /// Data word to store.
    pub data: DataWord,
    /// Byte lanes of `data` that take effect.
    pub byte_enable: ByteEnable,
}

/// One read-data-stream beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ReadBeat {
    /// Data word returned by the memory.
    pub data: DataWord,
}

#[cfg(test)]
mod tests {
    use super::{ByteEnable, CommandBeat, DataWord};

    #[test]
    fn replicate_fills_only_the_window() {
        let word = DataWord::replicate(0xCAFE_BABE, 3);
        assert_eq!(word.lane(0), 0xCAFE_BABE);
        assert_eq!(word.lane(2), 0xCAFE_BABE);
        assert_eq!(word.lane(3), 0);
        assert_eq!(word.lane(17), 0);
        assert_eq!(word.lane(99), 0);
    }

    #[test]
    fn words_for_the_same_width_compare_by_value() {
        let a = DataWord::replicate(0x5555_5555, 2);
        let mut b = DataWord::replicate(0x5555_5555, 2);
        assert_eq!(a, b);
        b.xor_lane(1, 0x0000_0001);
        assert_ne!(a, b);
    }

    #[test]
    fn xor_out_of_window_is_a_no_op() {
        let mut word = DataWord::replicate(0x1, 1);
        word.xor_lane(99, u32::MAX);
        assert_eq!(word, DataWord::replicate(0x1, 1));
    }

    #[test]
    fn byte_enable_classifies_lane_masks() {
        let mut enable = ByteEnable::full(2);
        assert!(enable.lane_is_full(0));
        assert!(enable.lane_is_full(1));
        assert!(!enable.lane_is_full(2));
        assert!(!enable.lane_is_partial(2));

        enable.set_lane(1, 0b0011);
        assert!(enable.lane_is_partial(1));
        assert!(!enable.lane_is_full(1));

        assert_eq!(ByteEnable::none().lane(0), 0);
    }

    #[test]
    fn command_constructors_set_write_enable() {
        assert!(CommandBeat::write(0x10).write_enable);
        assert!(!CommandBeat::read(0x10).write_enable);
        assert_eq!(CommandBeat::read(0x10).address, 0x10);
    }
}
