//! Built-in self-test engine for block-oriented memory over a
//! flow-controlled command/data port.

/// Port geometry: address width and lane-based data width.
pub mod geometry;
pub use geometry::{GeometryError, PortGeometry, LANE_BITS, MAX_DATA_LANES};

/// Port trait, beat payload types, and the in-memory simulation port.
pub mod port;
pub use port::{
    ByteEnable, CommandBeat, DataWord, MemoryPort, ReadBeat, SimMemoryPort, StallPeriods,
    WriteBeat,
};

/// Host-facing control and status register surface.
pub mod registers;
pub use registers::{
    AddressMode, Cadence, ControlRegisters, RegisterFile, Role, StatusRegisters,
};

/// Level-to-pulse conversion for the host acknowledge bits.
pub mod pulse;
pub use pulse::{AckEdge, AckEdges, AckPulses};

/// Mismatch bookkeeping: counter, address window, captured word.
pub mod errors;
pub use errors::ErrorRecord;

/// Next-pass planning: cadence, scrubbing, and range advancement.
pub mod policy;
pub use policy::{plan_next_pass, PassKind, PassPlan, PolicyInputs};

/// The session state machine.
pub mod engine;
pub use engine::{BistEngine, EngineState};

/// SEC-DED protection layer over a memory port.
pub mod ecc;
pub use ecc::{EccError, EccPort, EccStats};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
