//! The BIST session state machine.
//!
//! One call to [`BistEngine::step`] performs exactly one state transition:
//! the engine samples the host control registers and the port handshakes,
//! updates its run state, and republishes every status register. Suspension
//! is implicit: a state that offered a beat and was declined, or that is
//! blocking on a host acknowledge, simply stays put until a later step.
//!
//! There is no fatal error path. A verification mismatch is data: it is
//! counted, localized, and replayed for the host; the engine always drains
//! to a deterministic blocking state and waits for an explicit acknowledge.

use crate::errors::ErrorRecord;
use crate::geometry::PortGeometry;
use crate::policy::{plan_next_pass, PassKind, PolicyInputs};
use crate::port::{ByteEnable, CommandBeat, DataWord, MemoryPort, ReadBeat, WriteBeat};
use crate::pulse::{AckEdges, AckPulses};
use crate::registers::{AddressMode, Cadence, RegisterFile, Role};

/// Closed enumeration of every engine state across the three flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum EngineState {
    /// Not running; waiting for `start`.
    #[default]
    Idle,

    /// Write-only flow: first command beat.
    WriteOnlyRequest,
    /// Write-only flow: streaming commands and write data.
    WriteOnlyStream,
    /// Write-only flow: all commands issued, draining write data.
    WriteOnlyDrain,
    /// Write-only flow: blocking on the writer-finished acknowledge.
    WriteOnlyFinished,

    /// Read-only flow: first command beat.
    ReadOnlyRequest,
    /// Read-only flow: streaming commands and consuming read data.
    ReadOnlyStream,
    /// Read-only flow: all commands issued, draining read data.
    ReadOnlyDrain,
    /// Read-only flow: error replay, issuing one single-beat read.
    ReadOnlyErrorRequest,
    /// Read-only flow: error replay, waiting for the read beat.
    ReadOnlyErrorReceive,
    /// Read-only flow: error replay, holding a beat for the host.
    ReadOnlyErrorDisplay,
    /// Read-only flow: blocking on the reader-finished acknowledge.
    ReadOnlyFinished,

    /// Continuous flow: first write command of a pass.
    WriteRequest,
    /// Continuous flow: streaming write commands and data.
    WriteStream,
    /// Continuous flow: draining write data.
    WriteDrain,
    /// Continuous flow: inter-pass delay, then first read command.
    ReadRequest,
    /// Continuous flow: streaming read commands and consuming data.
    ReadStream,
    /// Continuous flow: draining read data.
    ReadDrain,
    /// Continuous flow: error replay, issuing one single-beat read.
    ErrorRequest,
    /// Continuous flow: error replay, waiting for the read beat.
    ErrorReceive,
    /// Continuous flow: error replay, holding a beat for the host.
    ErrorDisplay,
    /// Continuous flow: pass counters stable, blocking on the data
    /// acknowledge.
    DisplayPause,
    /// Continuous flow: plan the next pass and reset per-pass counters.
    Choose,
}

impl EngineState {
    /// Debug code published in the `state_code` status register.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Idle => 0x00,
            Self::WriteRequest => 0x01,
            Self::WriteStream => 0x02,
            Self::WriteDrain => 0x03,
            Self::ReadRequest => 0x04,
            Self::ReadStream => 0x05,
            Self::ReadDrain => 0x06,
            Self::ErrorRequest => 0x07,
            Self::ErrorReceive => 0x08,
            Self::ErrorDisplay => 0x09,
            Self::DisplayPause => 0x0A,
            Self::Choose => 0x0B,
            Self::WriteOnlyRequest => 0x11,
            Self::WriteOnlyStream => 0x12,
            Self::WriteOnlyDrain => 0x13,
            Self::WriteOnlyFinished => 0x14,
            Self::ReadOnlyRequest => 0x20,
            Self::ReadOnlyStream => 0x21,
            Self::ReadOnlyDrain => 0x22,
            Self::ReadOnlyErrorRequest => 0x23,
            Self::ReadOnlyErrorReceive => 0x24,
            Self::ReadOnlyErrorDisplay => 0x25,
            Self::ReadOnlyFinished => 0x26,
        }
    }
}

/// Which flow a shared burst helper is driving. Only the continuous flow
/// applies the full-coverage wrap truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    WriteOnly,
    ReadOnly,
    Continuous,
}

/// The BIST engine: burst driver, error localizer, chooser, and host
/// handshake, stepped once per discrete time step.
#[derive(Debug, Clone)]
pub struct BistEngine {
    geometry: PortGeometry,
    ticks_per_unit: u32,
    state: EngineState,

    current: u32,
    begin: u32,
    end: u32,
    burst_count: u32,

    read_always: bool,
    scrubbing: bool,
    mismatch_pending: bool,

    delay_ticks: u64,
    delay_target: u64,
    display_cap: u32,

    errors: ErrorRecord,
    acks: AckEdges,

    write_ticks: u32,
    read_ticks: u32,
    total_writes: u32,
    total_reads: u32,
    pass_count: u32,
}

impl BistEngine {
    /// Creates an idle engine for the given port geometry. The inter-pass
    /// delay register is interpreted directly in ticks.
    #[must_use]
    pub fn new(geometry: PortGeometry) -> Self {
        Self::with_ticks_per_unit(geometry, 1)
    }

    /// Creates an idle engine converting the host delay register to ticks
    /// with the given multiplier (e.g. the system clock frequency when the
    /// register is in seconds).
    #[must_use]
    pub fn with_ticks_per_unit(geometry: PortGeometry, ticks_per_unit: u32) -> Self {
        Self {
            geometry,
            ticks_per_unit,
            state: EngineState::Idle,
            current: 0,
            begin: 0,
            end: 0,
            burst_count: 0,
            read_always: false,
            scrubbing: false,
            mismatch_pending: false,
            delay_ticks: 0,
            delay_target: 0,
            display_cap: 0,
            errors: ErrorRecord::new(),
            acks: AckEdges::new(),
            write_ticks: 0,
            read_ticks: 0,
            total_writes: 0,
            total_reads: 0,
            pass_count: 0,
        }
    }

    /// Current state of the session state machine.
    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Port geometry the engine was built for.
    #[must_use]
    pub const fn geometry(&self) -> &PortGeometry {
        &self.geometry
    }

    /// True while the engine is not running a session.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == EngineState::Idle
    }

    /// Advances the engine by exactly one time step.
    ///
    /// Control registers are re-sampled on every call; status registers are
    /// fully republished before returning.
    #[allow(clippy::too_many_lines)]
    pub fn step(&mut self, regs: &mut RegisterFile, port: &mut dyn MemoryPort) {
        // Acknowledge edges are sampled every step regardless of state, so
        // a held bit cannot pulse again until it is observed low.
        let pulses = self.acks.sample(&regs.control);

        // Level-exposed status flags are recomputed from scratch each step.
        regs.status.idle = false;
        regs.status.writer_finished = false;
        regs.status.reader_finished = false;
        regs.status.error_found = false;
        regs.status.data_paused = false;

        match self.state {
            EngineState::Idle => self.idle(regs),

            EngineState::WriteOnlyRequest => self.write_request(port, Flow::WriteOnly),
            EngineState::WriteOnlyStream => self.write_stream(regs, port, Flow::WriteOnly),
            EngineState::WriteOnlyDrain => self.write_drain(regs, port, Flow::WriteOnly),
            EngineState::WriteOnlyFinished => {
                regs.status.writer_finished = true;
                if pulses.writer_finished || !regs.control.start {
                    self.state = EngineState::Idle;
                }
            }

            EngineState::ReadOnlyRequest => self.read_request(port, Flow::ReadOnly),
            EngineState::ReadOnlyStream => self.read_stream(regs, port, Flow::ReadOnly),
            EngineState::ReadOnlyDrain => self.read_drain(regs, port, Flow::ReadOnly),
            EngineState::ReadOnlyErrorRequest => self.error_request(port, Flow::ReadOnly),
            EngineState::ReadOnlyErrorReceive => self.error_receive(port, Flow::ReadOnly),
            EngineState::ReadOnlyErrorDisplay => {
                self.error_display(regs, pulses, Flow::ReadOnly);
            }
            EngineState::ReadOnlyFinished => {
                regs.status.reader_finished = true;
                if pulses.reader_finished || !regs.control.start {
                    self.state = EngineState::Idle;
                }
            }

            EngineState::WriteRequest => self.write_request(port, Flow::Continuous),
            EngineState::WriteStream => self.write_stream(regs, port, Flow::Continuous),
            EngineState::WriteDrain => self.write_drain(regs, port, Flow::Continuous),
            EngineState::ReadRequest => self.read_request(port, Flow::Continuous),
            EngineState::ReadStream => self.read_stream(regs, port, Flow::Continuous),
            EngineState::ReadDrain => self.read_drain(regs, port, Flow::Continuous),
            EngineState::ErrorRequest => self.error_request(port, Flow::Continuous),
            EngineState::ErrorReceive => self.error_receive(port, Flow::Continuous),
            EngineState::ErrorDisplay => self.error_display(regs, pulses, Flow::Continuous),
            EngineState::DisplayPause => {
                regs.status.data_paused = true;
                if !regs.control.start {
                    self.state = EngineState::Idle;
                } else if pulses.data {
                    self.state = EngineState::Choose;
                }
            }
            EngineState::Choose => self.choose(regs),
        }

        self.publish(regs);
    }

    /// Snapshot of the expected word for the current control settings.
    fn expected(&self, regs: &RegisterFile) -> DataWord {
        DataWord::replicate(regs.control.expected_pattern, self.geometry.data_lanes())
    }

    fn pattern_beat(&self, regs: &RegisterFile) -> WriteBeat {
        WriteBeat {
            data: self.expected(regs),
            byte_enable: ByteEnable::full(self.geometry.data_lanes()),
        }
    }

    /// Total beats in a full burst over the configured range.
    fn full_burst(&self, regs: &RegisterFile) -> u64 {
        u64::from(regs.control.range_length) + 1
    }

    fn idle(&mut self, regs: &mut RegisterFile) {
        regs.status.idle = true;
        if !regs.control.start {
            return;
        }

        let control = &regs.control;
        self.write_ticks = 0;
        self.read_ticks = 0;
        self.total_writes = 0;
        self.total_reads = 0;
        self.burst_count = 0;
        self.pass_count = 0;
        self.mismatch_pending = false;
        self.read_always = false;
        self.scrubbing = false;
        self.delay_ticks = 0;
        self.errors = ErrorRecord::new();

        self.delay_target =
            u64::from(control.inter_pass_delay) * u64::from(self.ticks_per_unit);
        self.display_cap = if control.max_error_display_count == 0 {
            // Zero means "display everything", bounded by the address space.
            self.geometry.max_address()
        } else {
            control.max_error_display_count
        };

        self.begin = control.base_address & self.geometry.address_mask();
        self.current = self.begin;
        self.end = self.geometry.wrap_add(self.begin, control.range_length);

        self.state = match control.role {
            Role::WriteOnly => EngineState::WriteOnlyRequest,
            Role::ReadOnly => EngineState::ReadOnlyRequest,
            Role::Continuous => {
                if control.cadence == Cadence::ReadAlways {
                    self.read_always = true;
                    EngineState::ReadRequest
                } else {
                    EngineState::WriteRequest
                }
            }
        };
    }

    fn write_request(&mut self, port: &mut dyn MemoryPort, flow: Flow) {
        self.write_ticks = self.write_ticks.saturating_add(1);
        if !port.offer_command(CommandBeat::write(self.current)) {
            return;
        }
        if self.current == self.end {
            self.state = drain_state(flow, PassKind::Write);
        } else {
            self.current = self.geometry.wrap_add(self.current, 1);
            self.state = stream_state(flow, PassKind::Write);
        }
    }

    fn write_stream(&mut self, regs: &RegisterFile, port: &mut dyn MemoryPort, flow: Flow) {
        self.write_ticks = self.write_ticks.saturating_add(1);
        if port.offer_write_data(self.pattern_beat(regs)) {
            self.total_writes = self.total_writes.saturating_add(1);
            self.burst_count = self.burst_count.wrapping_add(1);
        }
        if !port.offer_command(CommandBeat::write(self.current)) {
            return;
        }
        let wrap_stop = self.coverage_wrap_stop(regs, flow);
        if self.current == self.end || wrap_stop {
            if wrap_stop {
                // The whole address space has now been written once.
                self.read_always = true;
            }
            self.state = drain_state(flow, PassKind::Write);
        } else {
            self.current = self.geometry.wrap_add(self.current, 1);
        }
    }

    /// True when an incrementing write-once burst has reached the wrap
    /// point of full address-space coverage and must stop issuing commands.
    fn coverage_wrap_stop(&self, regs: &RegisterFile, flow: Flow) -> bool {
        flow == Flow::Continuous
            && matches!(
                regs.control.cadence,
                Cadence::ReadAlways | Cadence::WriteOnceReadAlways
            )
            && regs.control.address_mode == AddressMode::Incrementing
            && !self.scrubbing
            && self.current == self.geometry.wrap_sub(regs.control.base_address, 1)
    }

    fn write_drain(&mut self, regs: &RegisterFile, port: &mut dyn MemoryPort, flow: Flow) {
        self.write_ticks = self.write_ticks.saturating_add(1);
        if !port.offer_write_data(self.pattern_beat(regs)) {
            return;
        }
        let prior = self.burst_count;
        self.total_writes = self.total_writes.saturating_add(1);
        self.burst_count = self.burst_count.wrapping_add(1);

        let full = u64::from(self.burst_count) >= self.full_burst(regs);
        // A coverage-truncated burst drains on the truncated beat count.
        let truncated = flow == Flow::Continuous
            && self.read_always
            && !self.scrubbing
            && self.geometry.wrap_add(self.begin, prior) == self.current;
        if !(full || truncated) {
            return;
        }

        match flow {
            Flow::WriteOnly => self.state = EngineState::WriteOnlyFinished,
            Flow::Continuous => {
                if regs.control.start {
                    self.burst_count = 0;
                    self.current = self.begin;
                    self.scrubbing = false;
                    self.state = EngineState::ReadRequest;
                } else {
                    self.state = EngineState::Idle;
                }
            }
            Flow::ReadOnly => unreachable!("read-only flow never drives write bursts"),
        }
    }

    fn read_request(&mut self, port: &mut dyn MemoryPort, flow: Flow) {
        if flow == Flow::Continuous && self.delay_ticks < self.delay_target {
            self.delay_ticks += 1;
            return;
        }
        self.read_ticks = self.read_ticks.saturating_add(1);
        if !port.offer_command(CommandBeat::read(self.current)) {
            return;
        }
        self.delay_ticks = 0;
        if self.current == self.end {
            self.state = drain_state(flow, PassKind::Read);
        } else {
            self.current = self.geometry.wrap_add(self.current, 1);
            self.state = stream_state(flow, PassKind::Read);
        }
    }

    fn read_stream(&mut self, regs: &RegisterFile, port: &mut dyn MemoryPort, flow: Flow) {
        self.read_ticks = self.read_ticks.saturating_add(1);
        if let Some(beat) = port.take_read_data() {
            self.verify_read_beat(regs, &beat);
        }
        if !port.offer_command(CommandBeat::read(self.current)) {
            return;
        }
        if self.current == self.end {
            self.state = drain_state(flow, PassKind::Read);
        } else {
            self.current = self.geometry.wrap_add(self.current, 1);
        }
    }

    fn read_drain(&mut self, regs: &RegisterFile, port: &mut dyn MemoryPort, flow: Flow) {
        self.read_ticks = self.read_ticks.saturating_add(1);
        let Some(beat) = port.take_read_data() else {
            return;
        };
        let mismatched = self.verify_read_beat(regs, &beat);
        if u64::from(self.burst_count) < self.full_burst(regs) {
            return;
        }

        // Burst complete: localize if this pass (or the last beat itself)
        // recorded a mismatch, otherwise head for the blocking state.
        let replay = match flow {
            Flow::Continuous => mismatched || self.mismatch_pending,
            Flow::ReadOnly => mismatched || self.errors.count() > 0,
            Flow::WriteOnly => unreachable!("write-only flow never drives read bursts"),
        };
        if replay {
            self.current = self.errors.first_address();
            self.state = match flow {
                Flow::Continuous => EngineState::ErrorRequest,
                Flow::ReadOnly => EngineState::ReadOnlyErrorRequest,
                Flow::WriteOnly => unreachable!(),
            };
        } else {
            self.state = match flow {
                Flow::Continuous => EngineState::DisplayPause,
                Flow::ReadOnly => EngineState::ReadOnlyFinished,
                Flow::WriteOnly => unreachable!(),
            };
        }
    }

    /// Counts one accepted read beat and records a mismatch against the
    /// expected pattern. The beat's address is derived from its position in
    /// the burst, not from the command address register.
    fn verify_read_beat(&mut self, regs: &RegisterFile, beat: &ReadBeat) -> bool {
        let position = self.burst_count;
        self.total_reads = self.total_reads.saturating_add(1);
        self.burst_count = self.burst_count.wrapping_add(1);

        if beat.data == self.expected(regs) {
            return false;
        }
        let address = self.geometry.wrap_add(self.begin, position);
        self.errors.record_mismatch(address);
        self.mismatch_pending = true;
        true
    }

    fn error_request(&mut self, port: &mut dyn MemoryPort, flow: Flow) {
        if port.offer_command(CommandBeat::read(self.current)) {
            self.state = match flow {
                Flow::Continuous => EngineState::ErrorReceive,
                Flow::ReadOnly => EngineState::ReadOnlyErrorReceive,
                Flow::WriteOnly => unreachable!("write-only flow has no error replay"),
            };
        }
    }

    fn error_receive(&mut self, port: &mut dyn MemoryPort, flow: Flow) {
        if let Some(beat) = port.take_read_data() {
            self.errors.capture(beat.data);
            self.state = match flow {
                Flow::Continuous => EngineState::ErrorDisplay,
                Flow::ReadOnly => EngineState::ReadOnlyErrorDisplay,
                Flow::WriteOnly => unreachable!("write-only flow has no error replay"),
            };
        }
    }

    fn error_display(&mut self, regs: &mut RegisterFile, pulses: AckPulses, flow: Flow) {
        if !regs.control.start {
            self.state = EngineState::Idle;
            return;
        }

        let clean = *self.errors.captured() == self.expected(regs);
        let cap_hit = self.errors.display_count() >= self.display_cap;

        if !(clean || pulses.error || cap_hit) {
            // Hold the mismatching beat until the host acknowledges it.
            regs.status.error_found = true;
            return;
        }

        if self.current == self.errors.last_address() || cap_hit {
            self.errors.reset_display();
            self.state = match flow {
                Flow::Continuous => EngineState::DisplayPause,
                Flow::ReadOnly => EngineState::ReadOnlyFinished,
                Flow::WriteOnly => unreachable!("write-only flow has no error replay"),
            };
        } else {
            if pulses.error {
                self.errors.count_displayed();
            }
            self.current = self.geometry.wrap_add(self.current, 1);
            self.state = match flow {
                Flow::Continuous => EngineState::ErrorRequest,
                Flow::ReadOnly => EngineState::ReadOnlyErrorRequest,
                Flow::WriteOnly => unreachable!("write-only flow has no error replay"),
            };
        }
    }

    fn choose(&mut self, regs: &RegisterFile) {
        if !regs.control.start {
            self.state = EngineState::Idle;
            return;
        }

        self.write_ticks = 0;
        self.read_ticks = 0;
        self.total_writes = 0;
        self.total_reads = 0;
        self.burst_count = 0;
        self.delay_ticks = 0;
        self.errors.reset_for_pass();
        self.pass_count = self.pass_count.saturating_add(1);

        let plan = plan_next_pass(
            self.geometry,
            &PolicyInputs {
                cadence: regs.control.cadence,
                address_mode: regs.control.address_mode,
                begin: self.begin,
                end: self.end,
                range_length: regs.control.range_length,
                mismatch_pending: self.mismatch_pending,
                scrub_enabled: regs.control.error_flag_enable,
                read_always: self.read_always,
            },
        );
        if plan.scrubbing {
            self.mismatch_pending = false;
            self.scrubbing = true;
        }
        self.begin = plan.begin;
        self.end = plan.end;
        self.current = plan.begin;
        self.state = match plan.kind {
            PassKind::Write => EngineState::WriteRequest,
            PassKind::Read => EngineState::ReadRequest,
        };
    }

    fn publish(&self, regs: &mut RegisterFile) {
        let status = &mut regs.status;
        status.write_ticks = self.write_ticks;
        status.read_ticks = self.read_ticks;
        status.total_writes = self.total_writes;
        status.total_reads = self.total_reads;
        status.error_counter = self.errors.count();
        status.current_address = self.current;
        status.pass_begin_address = self.begin;
        status.pass_end_address = self.end;
        status.error_begin_address = self.errors.first_address();
        status.error_end_address = self.errors.last_address();
        status.captured_error_data = *self.errors.captured();
        status.pass_count = self.pass_count;
        status.state_code = self.state.code();
        status.port_address_bits = self.geometry.address_bits();
        status.port_data_bits = self.geometry.data_bits();
    }
}

/// Streaming state for a burst kind within a flow.
const fn stream_state(flow: Flow, kind: PassKind) -> EngineState {
    match (flow, kind) {
        (Flow::WriteOnly, _) => EngineState::WriteOnlyStream,
        (Flow::ReadOnly, _) => EngineState::ReadOnlyStream,
        (Flow::Continuous, PassKind::Write) => EngineState::WriteStream,
        (Flow::Continuous, PassKind::Read) => EngineState::ReadStream,
    }
}

/// Draining state for a burst kind within a flow.
const fn drain_state(flow: Flow, kind: PassKind) -> EngineState {
    match (flow, kind) {
        (Flow::WriteOnly, _) => EngineState::WriteOnlyDrain,
        (Flow::ReadOnly, _) => EngineState::ReadOnlyDrain,
        (Flow::Continuous, PassKind::Write) => EngineState::WriteDrain,
        (Flow::Continuous, PassKind::Read) => EngineState::ReadDrain,
    }
}
