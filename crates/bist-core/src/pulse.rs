//! One-tick acknowledge pulse stretching.
//!
//! Host acknowledge bits are level registers the host may hold high for
//! many steps. Every consumer of an acknowledge must see exactly one pulse
//! per low-to-high transition, or a held bit would advance the engine once
//! per step instead of once per acknowledgement.

use crate::registers::ControlRegisters;

/// Rising-edge detector: emits true for exactly one sample per
/// low-to-high transition of its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AckEdge {
    seen_high: bool,
}

impl AckEdge {
    /// New detector with no history (a high first sample pulses).
    #[must_use]
    pub const fn new() -> Self {
        Self { seen_high: false }
    }

    /// Samples the level once per time step, returning the stretched pulse.
    pub fn sample(&mut self, level: bool) -> bool {
        let pulse = level && !self.seen_high;
        self.seen_high = level;
        pulse
    }

    /// Clears edge history, as on session reset.
    pub fn reset(&mut self) {
        self.seen_high = false;
    }
}

/// One-tick pulses derived from the four host acknowledge registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct AckPulses {
    /// Writer-finished acknowledge fired this step.
    pub writer_finished: bool,
    /// Reader-finished acknowledge fired this step.
    pub reader_finished: bool,
    /// Error-display acknowledge fired this step.
    pub error: bool,
    /// Data-paused acknowledge fired this step.
    pub data: bool,
}

/// Edge detectors for all four acknowledge inputs, sampled together once
/// per time step regardless of engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AckEdges {
    writer_finished: AckEdge,
    reader_finished: AckEdge,
    error: AckEdge,
    data: AckEdge,
}

impl AckEdges {
    /// New detector bank with no history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            writer_finished: AckEdge::new(),
            reader_finished: AckEdge::new(),
            error: AckEdge::new(),
            data: AckEdge::new(),
        }
    }

    /// Samples every acknowledge register once for this time step.
    pub fn sample(&mut self, control: &ControlRegisters) -> AckPulses {
        AckPulses {
            writer_finished: self.writer_finished.sample(control.writer_finished_ack),
            reader_finished: self.reader_finished.sample(control.reader_finished_ack),
            error: self.error.sample(control.error_ack),
            data: self.data.sample(control.data_ack),
        }
    }

    /// Clears all edge history.
    pub fn reset(&mut self) {
        self.writer_finished.reset();
        self.reader_finished.reset();
        self.error.reset();
        self.data.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::AckEdge;

    #[test]
    fn held_level_pulses_exactly_once() {
        let mut edge = AckEdge::new();
        assert!(edge.sample(true));
        for _ in 0..10 {
            assert!(!edge.sample(true));
        }
    }

    #[test]
    fn pulse_rearms_after_observed_low() {
        let mut edge = AckEdge::new();
        assert!(edge.sample(true));
        assert!(!edge.sample(true));
        assert!(!edge.sample(false));
        assert!(edge.sample(true));
    }

    #[test]
    fn low_input_never_pulses() {
        let mut edge = AckEdge::new();
        for _ in 0..4 {
            assert!(!edge.sample(false));
        }
    }

    #[test]
    fn reset_rearms_the_detector() {
        let mut edge = AckEdge::new();
        assert!(edge.sample(true));
        edge.reset();
        assert!(edge.sample(true));
    }
}
