//! Flow-controlled memory port abstraction.
//!
//! A port carries three streams: commands (address + write enable), write
//! data, and read data. Each stream moves at most one beat per time step,
//! and a beat transfers exactly when it is offered and accepted in the same
//! step. Backpressure is expressed by the port declining an offer (or
//! returning no read beat); the caller re-offers on later steps.

/// Beat payload types for the three streams.
pub mod beat;
/// In-memory reference port used for testing and host simulation.
pub mod sim;

pub use beat::{ByteEnable, CommandBeat, DataWord, ReadBeat, WriteBeat};
pub use sim::{SimMemoryPort, StallPeriods};

/// A flow-controlled, word-addressed memory port polled once per time step.
///
/// Implementations must be deterministic: given the same sequence of calls,
/// the same beats transfer on the same steps. Callers must not offer more
/// than one beat per stream per step.
pub trait MemoryPort {
    /// Offers one command beat. Returns true when the port accepts it this
    /// step; a declined beat must be re-offered.
    fn offer_command(&mut self, command: CommandBeat) -> bool;

    /// Offers one write-data beat for the oldest outstanding write command.
    /// Returns true when the port accepts it this step.
    fn offer_write_data(&mut self, beat: WriteBeat) -> bool;

    /// Signals readiness for one read-data beat. Returns the beat when the
    /// port has one valid this step.
    fn take_read_data(&mut self) -> Option<ReadBeat>;
}
