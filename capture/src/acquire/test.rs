use core::future::Future;
use core::pin::pin;
use core::task::{Context, Poll, Waker};
use std::collections::VecDeque;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::format::{PCM24_MAX, PCM24_MIN};
use crate::pool::FIFO_SPACE;
use crate::sampler::{DEFAULT_SPIN_BUDGET, RIGHT_CHANNEL_TAG};
use crate::status::StatusFields;

fn poll_once<F: Future>(fut: F) -> Poll<F::Output> {
    let mut cx = Context::from_waker(Waker::noop());
    pin!(fut).poll(&mut cx)
}

fn arena() -> [FrameBuffer; FIFO_SPACE] {
    [FrameBuffer::ZEROED; FIFO_SPACE]
}

/// Replays a fixed script of fifo reads, then stays empty.
struct ScriptedSource {
    words: VecDeque<Option<u32>>,
    probes: [bool; 3],
}

impl ScriptedSource {
    fn new(words: Vec<Option<u32>>) -> Self {
        ScriptedSource {
            words: words.into(),
            probes: [true; 3],
        }
    }
}

impl AdcSource for ScriptedSource {
    fn try_pull_word(&mut self) -> Option<u32> {
        self.words.pop_front().flatten()
    }

    fn probe_activity(&mut self, line: AdcLine) -> bool {
        match line {
            AdcLine::WordClock => self.probes[0],
            AdcLine::BitClock => self.probes[1],
            AdcLine::Data => self.probes[2],
        }
    }
}

/// Endless stream of well-formed left/right pairs.
struct InfiniteSource {
    next_right: bool,
    value: u32,
}

impl InfiniteSource {
    fn new() -> Self {
        InfiniteSource {
            next_right: false,
            value: 0,
        }
    }
}

impl AdcSource for InfiniteSource {
    fn try_pull_word(&mut self) -> Option<u32> {
        let word = if self.next_right {
            RIGHT_CHANNEL_TAG | (self.value & 0x00ff_ffff)
        } else {
            self.value = self.value.wrapping_add(1);
            self.value & 0x00ff_ffff
        };
        self.next_right = !self.next_right;
        Some(word)
    }

    fn probe_activity(&mut self, _line: AdcLine) -> bool {
        true
    }
}

struct FixedSwitch(bool);

impl SwitchInput for FixedSwitch {
    fn level(&mut self) -> bool {
        self.0
    }
}

/// Mode and status shared between the acquirer and the test body.
struct Shared {
    mode: ModeHandle<NoopRawMutex>,
    status: StatusHandle<NoopRawMutex>,
}

impl Shared {
    fn new() -> Self {
        Shared {
            mode: ModeHandle::new(),
            status: StatusHandle::new(),
        }
    }
}

fn acquirer<'p, 'b, S: AdcSource>(
    shared: &'p Shared,
    pool: &'p BufferPool<'b, NoopRawMutex>,
    source: S,
    switch_level: bool,
    rx_spin_budget: u32,
) -> SampleAcquirer<'p, 'b, NoopRawMutex, S, FixedSwitch> {
    SampleAcquirer::new(
        pool,
        &shared.mode,
        &shared.status,
        StereoReceiver::new(source, DEFAULT_SPIN_BUDGET),
        FixedSwitch(switch_level),
        rx_spin_budget,
    )
}

fn good_pairs(count: usize, base: u32) -> Vec<Option<u32>> {
    let mut words = Vec::new();
    for i in 0..count as u32 {
        words.push(Some(base + i));
        words.push(Some(RIGHT_CHANNEL_TAG | (0x1000 + base + i)));
    }
    words
}

fn slot(buffer: &FrameBuffer, index: usize) -> &[u8] {
    &buffer.data[index * SLOT_SIZE..(index + 1) * SLOT_SIZE]
}

#[test]
fn normal_fill_encodes_all_slots_and_switch_channel() {
    let shared = Shared::new();
    let mut buffers = arena();
    let pool = BufferPool::new(&mut buffers);
    let source = ScriptedSource::new(good_pairs(SAMPLES_PER_BUFFER, 0x20));
    let mut acq = acquirer(&shared, &pool, source, true, DEFAULT_SPIN_BUDGET);

    let mut buffer = pool.try_take_empty().unwrap();
    assert!(acq.fill_once(&mut buffer));

    let first = slot(&buffer, 0);
    assert_eq!(&first[0..3], &[0x20, 0, 0]); // left
    assert_eq!(&first[3..6], &[0x20, 0x10, 0]); // right
    assert_eq!(&first[6..9], &PCM24_MAX.to_le_bytes()[..3]); // switch high

    let last = slot(&buffer, SAMPLES_PER_BUFFER - 1);
    assert_eq!(&last[0..3], &[0x20 + 63, 0, 0]);
}

#[test]
fn switch_low_encodes_negative_full_scale() {
    let shared = Shared::new();
    let mut buffers = arena();
    let pool = BufferPool::new(&mut buffers);
    let source = ScriptedSource::new(good_pairs(SAMPLES_PER_BUFFER, 1));
    let mut acq = acquirer(&shared, &pool, source, false, DEFAULT_SPIN_BUDGET);

    let mut buffer = pool.try_take_empty().unwrap();
    assert!(acq.fill_once(&mut buffer));

    assert_eq!(&slot(&buffer, 0)[6..9], &PCM24_MIN.to_le_bytes()[..3]);
}

#[test]
fn successful_buffer_marks_lines_active_and_copies_counters() {
    let shared = Shared::new();
    let mut buffers = arena();
    let pool = BufferPool::new(&mut buffers);
    // one desync word first, then a full buffer of good pairs
    let mut words = vec![Some(RIGHT_CHANNEL_TAG | 0x42)];
    words.extend(good_pairs(SAMPLES_PER_BUFFER, 1));
    let source = ScriptedSource::new(words);
    let mut acq = acquirer(&shared, &pool, source, true, DEFAULT_SPIN_BUDGET);

    let mut buffer = pool.try_take_empty().unwrap();
    assert!(!acq.fill_once(&mut buffer));
    // counters are not published until a buffer completes
    assert_eq!(shared.status.snapshot().out_of_sync_drops, 0);

    assert!(acq.fill_once(&mut buffer));
    let snapshot = shared.status.snapshot();
    assert_eq!(snapshot.out_of_sync_drops, 1);
    assert_eq!(snapshot.activity_wordclk, 1);
    assert_eq!(snapshot.activity_bitclk, 1);
    assert_eq!(snapshot.activity_data, 1);
}

#[test]
fn failed_attempt_restarts_from_sample_zero() {
    let shared = Shared::new();
    let mut buffers = arena();
    let pool = BufferPool::new(&mut buffers);
    // two good slots, then a desync, then a clean full buffer
    let mut words = good_pairs(2, 0x11);
    words.push(Some(RIGHT_CHANNEL_TAG | 0x42));
    words.extend(good_pairs(SAMPLES_PER_BUFFER, 0x33));
    let source = ScriptedSource::new(words);
    let mut acq = acquirer(&shared, &pool, source, true, DEFAULT_SPIN_BUDGET);

    let mut buffer = pool.try_take_empty().unwrap();
    assert!(!acq.fill_once(&mut buffer));
    // partial content from the failed attempt is still there ...
    assert_eq!(slot(&buffer, 0)[0], 0x11);

    assert!(acq.fill_once(&mut buffer));
    // ... and fully overwritten from sample 0 by the retry
    assert_eq!(slot(&buffer, 0)[0], 0x33);
    assert_eq!(slot(&buffer, 1)[0], 0x34);
}

#[test]
fn spin_budget_exhaustion_fails_the_attempt_and_counts_it() {
    let shared = Shared::new();
    let mut buffers = arena();
    let pool = BufferPool::new(&mut buffers);
    // empty fifo forever: the default budget allows 65536 spins, the 65537th
    // failed pull gives up
    let source = ScriptedSource::new(Vec::new());
    let mut acq = acquirer(&shared, &pool, source, true, DEFAULT_SPIN_BUDGET);

    let mut buffer = pool.try_take_empty().unwrap();
    assert!(!acq.fill_once(&mut buffer));
    assert_eq!(shared.status.snapshot().rx_sample_timeouts, 1);

    assert!(!acq.fill_once(&mut buffer));
    assert_eq!(shared.status.snapshot().rx_sample_timeouts, 2);
}

#[test]
fn debug_fill_writes_magic_and_truncated_snapshot() {
    let shared = Shared::new();
    shared.mode.set(StreamMode::Debug);
    let mut buffers = arena();
    let pool = BufferPool::new(&mut buffers);
    let mut source = ScriptedSource::new(Vec::new());
    source.probes = [true, false, true];
    let mut acq = acquirer(&shared, &pool, source, true, DEFAULT_SPIN_BUDGET);

    let mut buffer = pool.try_take_empty().unwrap();
    buffer.data.fill(0xaa);
    assert!(acq.fill_once(&mut buffer));

    assert_eq!(&buffer.data[..4], &SNAPSHOT_MAGIC.to_le_bytes());

    let snapshot = shared.status.snapshot();
    assert_eq!(snapshot.activity_wordclk, 1);
    assert_eq!(snapshot.activity_bitclk, 0);
    assert_eq!(snapshot.activity_data, 1);

    let size = core::mem::size_of::<StatusFields>();
    assert!(size <= PAYLOAD_SIZE - SNAPSHOT_HEADER_SIZE);
    assert_eq!(&buffer.data[4..4 + size], bytemuck::bytes_of(&snapshot));

    // the rest of the payload is zeroed, not stale audio
    assert!(buffer.data[4 + size..].iter().all(|&b| b == 0));
}

#[test]
fn mode_change_takes_effect_at_the_next_attempt() {
    let shared = Shared::new();
    let mut buffers = arena();
    let pool = BufferPool::new(&mut buffers);
    // normal mode has nothing to receive and would keep failing
    let source = ScriptedSource::new(Vec::new());
    let mut acq = acquirer(&shared, &pool, source, true, 8);

    let mut buffer = pool.try_take_empty().unwrap();
    assert!(!acq.fill_once(&mut buffer));

    shared.mode.set(StreamMode::Debug);
    assert!(acq.fill_once(&mut buffer));
    assert_eq!(&buffer.data[..4], &SNAPSHOT_MAGIC.to_le_bytes());
}

#[test]
fn acquirer_is_dropped_before_the_pool_it_borrows() {
    let shared = Shared::new();
    let mut buffers = arena();
    let pool = BufferPool::new(&mut buffers);

    {
        let source = ScriptedSource::new(good_pairs(SAMPLES_PER_BUFFER, 5));
        let mut acq = acquirer(&shared, &pool, source, true, DEFAULT_SPIN_BUDGET);
        let mut buffer = pool.try_take_empty().unwrap();
        assert!(acq.fill_once(&mut buffer));
        assert!(pool.try_put_filled(buffer).is_ok());
    }

    // the producer's borrow ends with it, the pool stays usable
    assert!(pool.try_take_filled().is_some());
    assert_eq!(pool.queued(), FIFO_SPACE - 1);
}

#[test]
fn run_fills_every_buffer_then_waits_for_an_empty() {
    let shared = Shared::new();
    let mut buffers = arena();
    let pool = BufferPool::new(&mut buffers);
    let mut acq = acquirer(&shared, &pool, InfiniteSource::new(), true, DEFAULT_SPIN_BUDGET);

    // with endless input the loop fills all 8 buffers in one go, then pends
    // on take_empty
    assert!(matches!(poll_once(acq.run()), Poll::Pending));

    for _ in 0..FIFO_SPACE {
        let buffer = pool.try_take_filled().unwrap();
        assert_ne!(&buffer.data[0..3], &[0, 0, 0]);
    }
    assert!(pool.try_take_filled().is_none());
}
