//! Register-mediated host interface.
//!
//! All host/engine communication goes through these fields, polled by both
//! sides every time step. The host owns [`ControlRegisters`] and may rewrite
//! them at any step; the engine treats them as plain asynchronous inputs and
//! never assumes atomicity across fields. [`StatusRegisters`] are read-only
//! snapshots republished by the engine every step.

use crate::port::DataWord;

/// Addressing behavior across passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddressMode {
    /// The pass range never changes.
    #[default]
    Fixed,
    /// Each pass advances the range by `range_length + 1`, wrapping at the
    /// address-width boundary.
    Incrementing,
}

impl AddressMode {
    /// Decodes the two-bit register encoding.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Self::Fixed),
            1 => Some(Self::Incrementing),
            _ => None,
        }
    }

    /// Two-bit register encoding.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Fixed => 0,
            Self::Incrementing => 1,
        }
    }
}

/// Write/read cadence for the continuous role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Cadence {
    /// Never write; read the range indefinitely.
    #[default]
    ReadAlways,
    /// Write each range once, then read indefinitely after full coverage.
    WriteOnceReadAlways,
    /// Alternate a write pass and a read pass over each range.
    WriteReadAlways,
}

impl Cadence {
    /// Decodes the two-bit register encoding.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Self::ReadAlways),
            1 => Some(Self::WriteOnceReadAlways),
            2 => Some(Self::WriteReadAlways),
            _ => None,
        }
    }

    /// Two-bit register encoding.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::ReadAlways => 0,
            Self::WriteOnceReadAlways => 1,
            Self::WriteReadAlways => 2,
        }
    }
}

/// Operating role for a session, set atomically by the host.
///
/// One tagged value instead of separate write-only and read-only mode bits,
/// so the ambiguous simultaneous assertion cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Role {
    /// Alternating write/read passes across advancing ranges.
    #[default]
    Continuous,
    /// One write burst, then block in the finished state.
    WriteOnly,
    /// One read burst with error localization, then block finished.
    ReadOnly,
}

/// Host-written storage fields. Values persist until rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct ControlRegisters {
    /// Level-triggered run enable; deasserting returns the engine to idle
    /// at the next blocking or boundary state.
    pub start: bool,
    /// First word address of the initial pass range.
    pub base_address: u32,
    /// Pass range length: a pass covers `range_length + 1` addresses.
    pub range_length: u32,
    /// Fixed or incrementing addressing.
    pub address_mode: AddressMode,
    /// Write/read cadence (continuous role only).
    pub cadence: Cadence,
    /// Session role.
    pub role: Role,
    /// 32-bit pattern replicated across the port data width.
    pub expected_pattern: u32,
    /// Delay between the write and read bursts of a pass, in host time
    /// units (converted to ticks by the engine).
    pub inter_pass_delay: u32,
    /// Cap on host-acknowledged error displays per replay loop; zero means
    /// display every erroring address in the window.
    pub max_error_display_count: u32,
    /// When set, a mismatching read pass forces a scrubbing rewrite of the
    /// same range instead of advancing.
    pub error_flag_enable: bool,
    /// Acknowledge for the writer-finished status.
    pub writer_finished_ack: bool,
    /// Acknowledge for the reader-finished status.
    pub reader_finished_ack: bool,
    /// Acknowledge for the error-found status (advances error replay).
    pub error_ack: bool,
    /// Acknowledge for the data-paused status.
    pub data_ack: bool,
}

impl Default for ControlRegisters {
    fn default() -> Self {
        Self {
            start: false,
            base_address: 0,
            range_length: 0,
            address_mode: AddressMode::default(),
            cadence: Cadence::default(),
            role: Role::default(),
            expected_pattern: 0,
            inter_pass_delay: 0,
            max_error_display_count: 0,
            // Scrubbing on error is the hardware reset default.
            error_flag_enable: true,
            writer_finished_ack: false,
            reader_finished_ack: false,
            error_ack: false,
            data_ack: false,
        }
    }
}

/// Engine-written status snapshots, republished every time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct StatusRegisters {
    /// Engine is not running.
    pub idle: bool,
    /// Write-only burst drained; blocking on `writer_finished_ack`.
    pub writer_finished: bool,
    /// Read-only pass (including replay) done; blocking on
    /// `reader_finished_ack`.
    pub reader_finished: bool,
    /// Error replay is holding a mismatching beat for inspection.
    pub error_found: bool,
    /// Continuous pass done; counters stable until `data_ack`.
    pub data_paused: bool,
    /// Time steps spent in write-burst states this pass (saturating).
    pub write_ticks: u32,
    /// Time steps spent in read-burst states this pass (saturating).
    pub read_ticks: u32,
    /// Write-data beats accepted this pass (saturating).
    pub total_writes: u32,
    /// Read-data beats accepted this pass (saturating).
    pub total_reads: u32,
    /// Mismatches recorded this pass (saturating).
    pub error_counter: u32,
    /// Address of the beat currently being driven.
    pub current_address: u32,
    /// First address of the active pass range.
    pub pass_begin_address: u32,
    /// Last address of the active pass range.
    pub pass_end_address: u32,
    /// First mismatching address of the recorded error window.
    pub error_begin_address: u32,
    /// Last mismatching address of the recorded error window.
    pub error_end_address: u32,
    /// Word captured by the most recent error-replay read, windowed across
    /// up to 18 32-bit lanes; lanes past the port width read zero.
    pub captured_error_data: DataWord,
    /// Passes completed since the session started.
    pub pass_count: u32,
    /// Debug code identifying the current engine state.
    pub state_code: u32,
    /// Port address width in bits.
    pub port_address_bits: u32,
    /// Port data width in bits.
    pub port_data_bits: u32,
}

impl StatusRegisters {
    /// One 32-bit lane of the captured mismatching word.
    #[must_use]
    pub fn captured_error_lane(&self, index: usize) -> u32 {
        self.captured_error_data.lane(index)
    }
}

/// The full register file shared between host and engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    /// Host-written storage fields.
    pub control: ControlRegisters,
    /// Engine-written status snapshots.
    pub status: StatusRegisters,
}

#[cfg(test)]
mod tests {
    use super::{AddressMode, Cadence, ControlRegisters, Role, StatusRegisters};
    use crate::port::DataWord;

    #[test]
    fn mode_encodings_round_trip() {
        for mode in [AddressMode::Fixed, AddressMode::Incrementing] {
            assert_eq!(AddressMode::from_bits(mode.bits()), Some(mode));
        }
        assert_eq!(AddressMode::from_bits(2), None);

        for cadence in [
            Cadence::ReadAlways,
            Cadence::WriteOnceReadAlways,
            Cadence::WriteReadAlways,
        ] {
            assert_eq!(Cadence::from_bits(cadence.bits()), Some(cadence));
        }
        assert_eq!(Cadence::from_bits(3), None);
    }

    #[test]
    fn control_defaults_match_reset_values() {
        let control = ControlRegisters::default();
        assert!(!control.start);
        assert!(control.error_flag_enable);
        assert_eq!(control.role, Role::Continuous);
        assert_eq!(control.address_mode, AddressMode::Fixed);
        assert_eq!(control.cadence, Cadence::ReadAlways);
        assert_eq!(control.max_error_display_count, 0);
    }

    #[test]
    fn captured_error_lanes_window_reads_zero_past_width() {
        let status = StatusRegisters {
            captured_error_data: DataWord::replicate(0xDEAD_BEEF, 2),
            ..StatusRegisters::default()
        };
        assert_eq!(status.captured_error_lane(0), 0xDEAD_BEEF);
        assert_eq!(status.captured_error_lane(1), 0xDEAD_BEEF);
        assert_eq!(status.captured_error_lane(2), 0);
        assert_eq!(status.captured_error_lane(17), 0);
    }
}
