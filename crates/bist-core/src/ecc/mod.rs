//! SEC-DED protection layered over a memory port.
//!
//! [`EccPort`] wraps an inner port that is twice as wide as the port it
//! presents: each logical 32-bit lane is stored as a data lane plus a
//! check-word lane. Writes are encoded on the way in, reads are decoded
//! and corrected on the way out, and the engine on top sees an ordinary
//! [`MemoryPort`]. Command beats pass through untouched.
//!
//! Corrections and detections are counted in saturating registers with
//! sticky flags so the host can poll long after the event. A deliberate
//! fault can be injected into the next accepted write beat to verify the
//! pipeline end to end.

pub mod hamming;

use thiserror::Error;

use crate::geometry::{GeometryError, PortGeometry, MAX_DATA_LANES};
use crate::port::{ByteEnable, CommandBeat, DataWord, MemoryPort, ReadBeat, WriteBeat};

use self::hamming::DecodeStatus;

/// Low eight bits of the first data lane, flipped by fault injection.
const INJECT_MASK: u32 = 0xFF;

/// Construction failures for the protection layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum EccError {
    /// The logical width is invalid, or doubling it for check words
    /// exceeds the lane window.
    #[error("invalid protected geometry: {0}")]
    Geometry(#[from] GeometryError),
    /// The inner port is narrower than two lanes per logical lane.
    #[error("inner port carries {inner} lanes, protection needs {needed}")]
    InnerTooNarrow {
        /// Lanes the inner port actually carries.
        inner: usize,
        /// Lanes required for data plus check words.
        needed: usize,
    },
}

/// Counters and sticky flags accumulated by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EccStats {
    /// Single-bit errors corrected. Saturates.
    pub corrected: u32,
    /// Double-bit errors detected. Saturates.
    pub detected: u32,
    /// At least one correction happened since the last clear.
    pub corrected_seen: bool,
    /// At least one detection happened since the last clear.
    pub detected_seen: bool,
    /// Write beats that arrived with sub-word byte enables. Saturates.
    pub granularity_violations: u32,
}

/// Memory port decorator adding Hamming SEC-DED per 32-bit lane.
#[derive(Debug, Clone)]
pub struct EccPort<P> {
    inner: P,
    geometry: PortGeometry,
    enabled: bool,
    inject_pending: bool,
    stats: EccStats,
}

impl<P: MemoryPort> EccPort<P> {
    /// Wraps `inner` to present a protected port of `logical_lanes` lanes.
    ///
    /// # Errors
    ///
    /// Returns [`EccError`] when twice the logical width does not fit the
    /// lane window, or when `inner_lanes` is too narrow to carry the data
    /// and check lanes.
    pub fn new(inner: P, logical_lanes: usize, inner_lanes: usize) -> Result<Self, EccError> {
        let geometry = PortGeometry::new(32, logical_lanes)?;
        let needed = logical_lanes * 2;
        if needed > MAX_DATA_LANES {
            return Err(GeometryError::DataLanes(needed).into());
        }
        if inner_lanes < needed {
            return Err(EccError::InnerTooNarrow {
                inner: inner_lanes,
                needed,
            });
        }
        Ok(Self {
            inner,
            geometry,
            enabled: true,
            inject_pending: false,
            stats: EccStats::default(),
        })
    }

    /// Width presented to the layer above, in 32-bit lanes.
    #[must_use]
    pub const fn logical_lanes(&self) -> usize {
        self.geometry.data_lanes()
    }

    /// Enables or disables decoding. While disabled, reads pass the raw
    /// data lanes through and writes still store valid check words.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// True while read-path decoding is active.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flips bits in the next accepted write beat, after encoding, so the
    /// stored word no longer matches its check word.
    pub fn inject_error(&mut self) {
        self.inject_pending = true;
    }

    /// Current decoder counters and flags.
    #[must_use]
    pub const fn stats(&self) -> &EccStats {
        &self.stats
    }

    /// Clears every counter and sticky flag.
    pub fn clear_stats(&mut self) {
        self.stats = EccStats::default();
    }

    /// Shared access to the inner port.
    #[must_use]
    pub const fn inner(&self) -> &P {
        &self.inner
    }

    /// Exclusive access to the inner port.
    pub fn inner_mut(&mut self) -> &mut P {
        &mut self.inner
    }

    /// Consumes the decorator, returning the inner port.
    pub fn into_inner(self) -> P {
        self.inner
    }

    /// Encodes the logical data lanes into interleaved data/check lanes.
    fn encode_beat(&self, beat: &WriteBeat) -> WriteBeat {
        let mut data = DataWord::zeroed();
        for lane in 0..self.logical_lanes() {
            data.set_lane(lane * 2, beat.data.lane(lane));
            data.set_lane(lane * 2 + 1, hamming::encode(beat.data.lane(lane)));
        }
        if self.inject_pending {
            data.xor_lane(0, INJECT_MASK);
        }
        WriteBeat {
            data,
            byte_enable: ByteEnable::full(self.logical_lanes() * 2),
        }
    }

    /// Decodes interleaved data/check lanes back to logical data lanes.
    fn decode_beat(&mut self, beat: &ReadBeat) -> ReadBeat {
        let mut data = DataWord::zeroed();
        for lane in 0..self.logical_lanes() {
            let decoded =
                hamming::decode(beat.data.lane(lane * 2), beat.data.lane(lane * 2 + 1));
            data.set_lane(lane, decoded.data);
            match decoded.status {
                DecodeStatus::Clean => {}
                DecodeStatus::Corrected => {
                    self.stats.corrected = self.stats.corrected.saturating_add(1);
                    self.stats.corrected_seen = true;
                }
                DecodeStatus::Uncorrectable => {
                    self.stats.detected = self.stats.detected.saturating_add(1);
                    self.stats.detected_seen = true;
                }
            }
        }
        ReadBeat { data }
    }

    /// Strips the check lanes without decoding.
    fn passthrough_beat(&self, beat: &ReadBeat) -> ReadBeat {
        let mut data = DataWord::zeroed();
        for lane in 0..self.logical_lanes() {
            data.set_lane(lane, beat.data.lane(lane * 2));
        }
        ReadBeat { data }
    }
}

impl<P: MemoryPort> MemoryPort for EccPort<P> {
    fn offer_command(&mut self, command: CommandBeat) -> bool {
        self.inner.offer_command(command)
    }

    fn offer_write_data(&mut self, beat: WriteBeat) -> bool {
        // A check word covers its whole lane, so sub-word byte enables
        // cannot be honored. The write is widened to the full word and the
        // violation is counted for the host.
        let partial = (0..self.logical_lanes()).any(|lane| beat.byte_enable.lane_is_partial(lane));
        let encoded = self.encode_beat(&beat);
        if !self.inner.offer_write_data(encoded) {
            // The injection stays pending for the retried beat.
            return false;
        }
        self.inject_pending = false;
        if partial {
            self.stats.granularity_violations =
                self.stats.granularity_violations.saturating_add(1);
        }
        true
    }

    fn take_read_data(&mut self) -> Option<ReadBeat> {
        let beat = self.inner.take_read_data()?;
        Some(if self.enabled {
            self.decode_beat(&beat)
        } else {
            self.passthrough_beat(&beat)
        })
    }
}
