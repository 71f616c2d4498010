//! Protection-layer suite: the engine running over a SEC-DED protected
//! port, with faults planted in the backing store between sessions.

#![allow(clippy::pedantic, clippy::nursery, clippy::too_many_lines)]

use bist_core::{
    BistEngine, Cadence, EccPort, PortGeometry, RegisterFile, Role, SimMemoryPort,
    StatusRegisters,
};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const STEP_LIMIT: u32 = 100_000;
const PATTERN: u32 = 0xCAFE_BABE;
const BASE: u32 = 0x40;
const RANGE: u32 = 3;

fn logical_geometry() -> PortGeometry {
    PortGeometry::new(16, 1).expect("valid geometry")
}

struct Bench {
    engine: BistEngine,
    regs: RegisterFile,
    port: EccPort<SimMemoryPort>,
}

impl Bench {
    fn new() -> Self {
        let inner_geometry = PortGeometry::new(16, 2).expect("valid inner geometry");
        let inner = SimMemoryPort::new(inner_geometry);
        let port = EccPort::new(inner, 1, 2).expect("valid protection layer");
        let mut regs = RegisterFile::default();
        regs.control.base_address = BASE;
        regs.control.range_length = RANGE;
        regs.control.expected_pattern = PATTERN;
        Self {
            engine: BistEngine::new(logical_geometry()),
            regs,
            port,
        }
    }

    fn step(&mut self) {
        self.engine.step(&mut self.regs, &mut self.port);
    }

    fn run_until(&mut self, what: &str, predicate: impl Fn(&StatusRegisters) -> bool) {
        for _ in 0..STEP_LIMIT {
            self.step();
            if predicate(&self.regs.status) {
                return;
            }
        }
        panic!(
            "step limit exceeded waiting for {what} (state {:#x})",
            self.regs.status.state_code
        );
    }

    /// Runs a whole write-only session and returns the engine to idle.
    fn fill_session(&mut self) {
        self.regs.control.role = Role::WriteOnly;
        self.regs.control.start = true;
        self.run_until("writer finished", |status| status.writer_finished);
        self.regs.control.start = false;
        self.step();
    }

    /// Starts a read-only verification session over the same range.
    fn start_verification(&mut self) {
        self.regs.control.role = Role::ReadOnly;
        self.regs.control.start = true;
    }
}

#[test]
fn protected_round_trip_is_transparent() {
    let mut bench = Bench::new();
    bench.regs.control.role = Role::Continuous;
    bench.regs.control.cadence = Cadence::WriteReadAlways;
    bench.regs.control.start = true;

    bench.run_until("pause", |status| status.data_paused);
    assert_eq!(bench.regs.status.error_counter, 0);
    assert_eq!(bench.regs.status.total_writes, RANGE + 1);
    assert_eq!(bench.regs.status.total_reads, RANGE + 1);

    let stats = bench.port.stats();
    assert_eq!(stats.corrected, 0);
    assert_eq!(stats.detected, 0);
}

#[test]
fn single_bit_fault_is_invisible_to_the_verifier() {
    let mut bench = Bench::new();
    bench.fill_session();
    bench.port.inner_mut().corrupt_word(BASE + 1, 0, 1 << 13);

    bench.start_verification();
    bench.run_until("reader finished", |status| status.reader_finished);

    assert_eq!(bench.regs.status.error_counter, 0);
    assert_eq!(bench.port.stats().corrected, 1);
    assert!(bench.port.stats().corrected_seen);
    assert!(!bench.port.stats().detected_seen);
}

#[test]
fn check_lane_fault_is_also_corrected() {
    let mut bench = Bench::new();
    bench.fill_session();
    // Lane 1 holds the check word for logical lane 0.
    bench.port.inner_mut().corrupt_word(BASE + 2, 1, 1 << 2);

    bench.start_verification();
    bench.run_until("reader finished", |status| status.reader_finished);

    assert_eq!(bench.regs.status.error_counter, 0);
    assert_eq!(bench.port.stats().corrected, 1);
}

#[test]
fn double_bit_fault_reaches_the_verifier_and_is_localized() {
    let mut bench = Bench::new();
    bench.fill_session();
    bench.port.inner_mut().corrupt_word(BASE + 2, 0, 0b101);

    bench.start_verification();
    bench.run_until("held error", |status| status.error_found);

    let status = &bench.regs.status;
    assert_eq!(status.error_counter, 1);
    assert_eq!(status.error_begin_address, BASE + 2);
    assert_eq!(status.error_end_address, BASE + 2);
    assert_eq!(status.captured_error_data.lane(0), PATTERN ^ 0b101);
    assert_eq!(bench.port.stats().detected, 2);
    assert!(bench.port.stats().detected_seen);
}

#[test]
fn injected_fault_round_trips_through_the_pipeline() {
    let mut bench = Bench::new();
    // The injection lands on the first accepted write beat, which targets
    // the base address.
    bench.port.inject_error();
    bench.fill_session();

    bench.start_verification();
    bench.run_until("held error", |status| status.error_found);

    let status = &bench.regs.status;
    assert_eq!(status.error_counter, 1);
    assert_eq!(status.error_begin_address, BASE);
    assert_eq!(status.captured_error_data.lane(0), PATTERN ^ 0xFF);
    assert!(bench.port.stats().detected_seen);
}

#[test]
fn disabling_the_decoder_exposes_raw_faults() {
    let mut bench = Bench::new();
    bench.fill_session();
    bench.port.inner_mut().corrupt_word(BASE, 0, 1);
    bench.port.set_enabled(false);

    bench.start_verification();
    bench.run_until("held error", |status| status.error_found);

    assert_eq!(bench.regs.status.error_begin_address, BASE);
    assert_eq!(bench.regs.status.captured_error_data.lane(0), PATTERN ^ 1);
    assert_eq!(bench.port.stats().corrected, 0);
}

#[test]
fn stats_clear_between_verification_runs() {
    let mut bench = Bench::new();
    bench.fill_session();
    bench.port.inner_mut().corrupt_word(BASE + 3, 0, 1 << 30);

    bench.start_verification();
    bench.run_until("reader finished", |status| status.reader_finished);
    assert_eq!(bench.port.stats().corrected, 1);

    bench.regs.control.start = false;
    bench.step();
    bench.port.clear_stats();

    // The corrected word was never written back, so the same fault is
    // corrected again on the next run.
    bench.regs.control.start = true;
    bench.run_until("second finish", |status| status.reader_finished);
    assert_eq!(bench.port.stats().corrected, 1);
    assert!(bench.port.stats().corrected_seen);
}
