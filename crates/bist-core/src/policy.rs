//! Next-pass planning: fixed vs. incrementing addressing, cadence, and
//! scrubbing decisions taken at every pass boundary.

use crate::geometry::PortGeometry;
use crate::registers::{AddressMode, Cadence};

/// What kind of burst a pass drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PassKind {
    /// A write burst over the pass range.
    Write,
    /// A read-and-verify burst over the pass range.
    Read,
}

/// Pass boundary inputs sampled when the chooser runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolicyInputs {
    /// Active write/read cadence.
    pub cadence: Cadence,
    /// Active addressing mode.
    pub address_mode: AddressMode,
    /// First address of the pass that just completed.
    pub begin: u32,
    /// Last address of the pass that just completed.
    pub end: u32,
    /// Configured range length (`end - begin`, modulo address width).
    pub range_length: u32,
    /// A mismatch was recorded since the last write pass.
    pub mismatch_pending: bool,
    /// Host enabled scrubbing rewrites on mismatch.
    pub scrub_enabled: bool,
    /// The address space has been fully written once (write-once cadences).
    pub read_always: bool,
}

/// The chooser's decision for the next pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassPlan {
    /// Burst kind to drive next.
    pub kind: PassKind,
    /// First address of the next range.
    pub begin: u32,
    /// Last address of the next range.
    pub end: u32,
    /// The next pass rewrites the same range because of a mismatch; the
    /// pending mismatch flag is consumed.
    pub scrubbing: bool,
}

/// Plans the pass following a completed continuous-flow pass.
///
/// Incrementing ranges advance by `range_length + 1` and wrap at the
/// address-width boundary through plain unsigned overflow. A pending
/// mismatch with scrubbing enabled always repeats the same range as a
/// write, regardless of cadence or addressing mode.
#[must_use]
pub fn plan_next_pass(geometry: PortGeometry, inputs: &PolicyInputs) -> PassPlan {
    let same_range = |kind: PassKind, scrubbing: bool| PassPlan {
        kind,
        begin: inputs.begin,
        end: inputs.end,
        scrubbing,
    };

    match inputs.cadence {
        Cadence::WriteReadAlways => match inputs.address_mode {
            AddressMode::Fixed => same_range(PassKind::Write, false),
            AddressMode::Incrementing => advanced_range(geometry, inputs, PassKind::Write),
        },
        Cadence::ReadAlways | Cadence::WriteOnceReadAlways => {
            if inputs.mismatch_pending && inputs.scrub_enabled {
                return same_range(PassKind::Write, true);
            }
            match inputs.address_mode {
                AddressMode::Fixed => same_range(PassKind::Read, false),
                AddressMode::Incrementing => {
                    let kind = if inputs.read_always {
                        PassKind::Read
                    } else {
                        PassKind::Write
                    };
                    advanced_range(geometry, inputs, kind)
                }
            }
        }
    }
}

fn advanced_range(geometry: PortGeometry, inputs: &PolicyInputs, kind: PassKind) -> PassPlan {
    let stride = inputs.range_length.wrapping_add(1);
    PassPlan {
        kind,
        begin: geometry.wrap_add(inputs.begin, stride),
        end: geometry.wrap_add(inputs.end, stride),
        scrubbing: false,
    }
}
