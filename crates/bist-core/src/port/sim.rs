//! In-memory reference implementation of [`MemoryPort`].
//!
//! Backs the port with a word-addressed sparse store, pairs write data to
//! write commands in order, and supports deterministic per-stream
//! backpressure plus out-of-band word corruption for fault injection.

use std::collections::{HashMap, VecDeque};

use crate::geometry::PortGeometry;
use crate::port::beat::{CommandBeat, DataWord, ReadBeat, WriteBeat};
use crate::port::MemoryPort;

/// Per-stream backpressure: a stream with period `n > 1` accepts only every
/// n-th offer. Periods of 0 and 1 mean always ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StallPeriods {
    /// Command-stream accept period.
    pub command: u32,
    /// Write-data-stream accept period.
    pub write_data: u32,
    /// Read-data-stream valid period.
    pub read_data: u32,
}

/// Simulated flow-controlled memory behind a native port.
///
/// Unwritten words read back as zero. Commands are queued in accept order;
/// write data pairs with the oldest outstanding write command, read data is
/// delivered in command order.
#[derive(Debug, Clone)]
pub struct SimMemoryPort {
    geometry: PortGeometry,
    store: HashMap<u32, DataWord>,
    pending_writes: VecDeque<u32>,
    pending_reads: VecDeque<u32>,
    stalls: StallPeriods,
    command_offers: u32,
    write_offers: u32,
    read_takes: u32,
    commands_accepted: u64,
    writes_committed: u64,
    reads_delivered: u64,
}

impl SimMemoryPort {
    /// Creates an empty simulated memory with no backpressure.
    #[must_use]
    pub fn new(geometry: PortGeometry) -> Self {
        Self::with_stalls(geometry, StallPeriods::default())
    }

    /// Creates an empty simulated memory with the given stall periods.
    #[must_use]
    pub fn with_stalls(geometry: PortGeometry, stalls: StallPeriods) -> Self {
        Self {
            geometry,
            store: HashMap::new(),
            pending_writes: VecDeque::new(),
            pending_reads: VecDeque::new(),
            stalls,
            command_offers: 0,
            write_offers: 0,
            read_takes: 0,
            commands_accepted: 0,
            writes_committed: 0,
            reads_delivered: 0,
        }
    }

    /// Port geometry this memory was built for.
    #[must_use]
    pub const fn geometry(&self) -> &PortGeometry {
        &self.geometry
    }

    /// Word currently stored at `address` (zero if never written).
    #[must_use]
    pub fn word(&self, address: u32) -> DataWord {
        let masked = address & self.geometry.address_mask();
        self.store.get(&masked).copied().unwrap_or_default()
    }

    /// Stores a word directly, bypassing the port streams.
    pub fn set_word(&mut self, address: u32, word: DataWord) {
        let masked = address & self.geometry.address_mask();
        self.store.insert(masked, word);
    }

    /// Flips bits of one lane of the stored word at `address`.
    ///
    /// Models external corruption between passes; the port streams are not
    /// involved and no handshake is consumed.
    pub fn corrupt_word(&mut self, address: u32, lane: usize, mask: u32) {
        let masked = address & self.geometry.address_mask();
        let mut word = self.word(masked);
        word.xor_lane(lane, mask);
        self.store.insert(masked, word);
    }

    /// Total command beats accepted.
    #[must_use]
    pub const fn commands_accepted(&self) -> u64 {
        self.commands_accepted
    }

    /// Total write-data beats committed to the store.
    #[must_use]
    pub const fn writes_committed(&self) -> u64 {
        self.writes_committed
    }

    /// Total read-data beats delivered.
    #[must_use]
    pub const fn reads_delivered(&self) -> u64 {
        self.reads_delivered
    }

    fn stream_ready(counter: &mut u32, period: u32) -> bool {
        *counter = counter.wrapping_add(1);
        period <= 1 || counter.is_multiple_of(period)
    }

    fn merge_write(&mut self, address: u32, beat: &WriteBeat) {
        let mut word = self.word(address);
        for lane in 0..self.geometry.data_lanes() {
            let enable = beat.byte_enable.lane(lane);
            if enable == 0 {
                continue;
            }
            let mut merged = word.lane(lane);
            let incoming = beat.data.lane(lane);
            for byte in 0..4u32 {
                if enable & (1u8 << byte) != 0 {
                    let mask = 0xFFu32 << (byte * 8);
                    merged = (merged & !mask) | (incoming & mask);
                }
            }
            word.set_lane(lane, merged);
        }
        self.store.insert(address, word);
    }
}

impl MemoryPort for SimMemoryPort {
    fn offer_command(&mut self, command: CommandBeat) -> bool {
        if !Self::stream_ready(&mut self.command_offers, self.stalls.command) {
            return false;
        }
        let address = command.address & self.geometry.address_mask();
        if command.write_enable {
            self.pending_writes.push_back(address);
        } else {
            self.pending_reads.push_back(address);
        }
        self.commands_accepted += 1;
        true
    }

    fn offer_write_data(&mut self, beat: WriteBeat) -> bool {
        if self.pending_writes.is_empty() {
            return false;
        }
        if !Self::stream_ready(&mut self.write_offers, self.stalls.write_data) {
            return false;
        }
        let address = self
            .pending_writes
            .pop_front()
            .unwrap_or_default();
        self.merge_write(address, &beat);
        self.writes_committed += 1;
        true
    }

    fn take_read_data(&mut self) -> Option<ReadBeat> {
        if self.pending_reads.is_empty() {
            return None;
        }
        if !Self::stream_ready(&mut self.read_takes, self.stalls.read_data) {
            return None;
        }
        let address = self.pending_reads.pop_front()?;
        self.reads_delivered += 1;
        Some(ReadBeat {
            data: self.word(address),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{SimMemoryPort, StallPeriods};
    use crate::geometry::PortGeometry;
    use crate::port::beat::{ByteEnable, CommandBeat, DataWord, WriteBeat};
    use crate::port::MemoryPort;

    fn geometry() -> PortGeometry {
        PortGeometry::new(24, 2).expect("valid geometry")
    }

    fn full_write(pattern: u32) -> WriteBeat {
        WriteBeat {
            data: DataWord::replicate(pattern, 2),
            byte_enable: ByteEnable::full(2),
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut port = SimMemoryPort::new(geometry());

        assert!(port.offer_command(CommandBeat::write(0x100)));
        assert!(port.offer_write_data(full_write(0xCAFE_BABE)));

        assert!(port.offer_command(CommandBeat::read(0x100)));
        let beat = port.take_read_data().expect("read beat pending");
        assert_eq!(beat.data, DataWord::replicate(0xCAFE_BABE, 2));
    }

    #[test]
    fn write_data_without_command_is_declined() {
        let mut port = SimMemoryPort::new(geometry());
        assert!(!port.offer_write_data(full_write(0x1)));
    }

    #[test]
    fn read_data_without_command_is_not_valid() {
        let mut port = SimMemoryPort::new(geometry());
        assert!(port.take_read_data().is_none());
    }

    #[test]
    fn partial_byte_enable_merges_bytes() {
        let mut port = SimMemoryPort::new(geometry());
        port.set_word(0x10, DataWord::replicate(0xAAAA_AAAA, 2));

        let mut enable = ByteEnable::none();
        enable.set_lane(0, 0b0001);
        assert!(port.offer_command(CommandBeat::write(0x10)));
        assert!(port.offer_write_data(WriteBeat {
            data: DataWord::replicate(0x1122_3344, 2),
            byte_enable: enable,
        }));

        let word = port.word(0x10);
        assert_eq!(word.lane(0), 0xAAAA_AA44);
        assert_eq!(word.lane(1), 0xAAAA_AAAA);
    }

    #[test]
    fn command_stall_period_declines_until_nth_offer() {
        let stalls = StallPeriods {
            command: 3,
            ..StallPeriods::default()
        };
        let mut port = SimMemoryPort::with_stalls(geometry(), stalls);

        assert!(!port.offer_command(CommandBeat::write(0x0)));
        assert!(!port.offer_command(CommandBeat::write(0x0)));
        assert!(port.offer_command(CommandBeat::write(0x0)));
        assert_eq!(port.commands_accepted(), 1);
    }

    #[test]
    fn corruption_changes_the_stored_word_only() {
        let mut port = SimMemoryPort::new(geometry());
        port.set_word(0x102, DataWord::replicate(0xCAFE_BABE, 2));
        port.corrupt_word(0x102, 0, 0x0000_0001);

        assert_eq!(port.word(0x102).lane(0), 0xCAFE_BABF);
        assert_eq!(port.word(0x102).lane(1), 0xCAFE_BABE);
        assert_eq!(port.reads_delivered(), 0);
    }

    #[test]
    fn addresses_are_masked_to_the_port_width() {
        let mut port = SimMemoryPort::new(geometry());
        port.set_word(0x0100_0010, DataWord::replicate(0x1, 2));
        // 24-bit port: the top byte is ignored.
        assert_eq!(port.word(0x10).lane(0), 0x1);
    }
}
