//! A recording mock bus and a scripted transfer, shared by the integration
//! tests

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use i2c_queue::{Commands, Scheduler, Status, Step, Transfer, Twi};

/// Something the mock bus was asked to put on the wire
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    Byte(u8),
    Stop,
}

/// Everything the mock bus has seen
#[derive(Default)]
pub struct BusState {
    /// Wire events, in order
    pub events: Vec<BusEvent>,
    /// A start or byte is being clocked out and will raise an event
    pub in_flight: bool,
    /// Completion interrupt enabled at the peripheral
    pub irq_enabled: bool,
    /// Times `disable_interrupt` was called
    pub sleeps: usize,
    /// Production windows opened
    pub windows: usize,
    /// A production window is open right now
    pub in_window: bool,
    /// Status to report for the next completion, instead of an ACK
    pub fail_with: Option<Status>,
    /// Times `init` was called
    pub inits: usize,
}

/// Mock bus peripheral that records commands instead of sending them
///
/// Clones share state, so a test can keep a handle while the scheduler owns
/// the other.
#[derive(Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<BusState>>,
}

impl MockBus {
    pub fn new() -> MockBus {
        MockBus::default()
    }

    /// Look at the recorded state
    pub fn state<R>(&self, f: impl FnOnce(&mut BusState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// All wire events so far
    pub fn events(&self) -> Vec<BusEvent> {
        self.state(|s| s.events.clone())
    }

    /// If the operation in flight has finished and would interrupt, clear it
    /// and say so
    pub fn take_completion(&self) -> bool {
        self.state(|s| {
            if s.in_flight && s.irq_enabled {
                s.in_flight = false;
                true
            } else {
                false
            }
        })
    }

    /// Report `status` on the next completion
    pub fn fail_next(&self, status: Status) {
        self.state(|s| s.fail_with = Some(status));
    }

    fn issue(&mut self, event: BusEvent) {
        self.state(|s| {
            assert!(!s.in_window, "bus driven from inside a callback");
            assert!(!s.in_flight, "{event:?} issued while the bus was busy");
            s.events.push(event);
            if event != BusEvent::Stop {
                s.in_flight = true;
                s.irq_enabled = true;
            }
        });
    }
}

impl Twi for MockBus {
    fn init(&mut self) {
        self.state(|s| s.inits += 1);
    }

    fn send_start(&mut self) {
        self.issue(BusEvent::Start);
    }

    fn send_byte(&mut self, byte: u8) {
        self.issue(BusEvent::Byte(byte));
    }

    fn send_stop(&mut self) {
        self.issue(BusEvent::Stop);
    }

    fn disable_interrupt(&mut self) {
        self.state(|s| {
            s.irq_enabled = false;
            s.sleeps += 1;
        });
    }

    fn status(&mut self) -> Status {
        self.state(|s| s.fail_with.take().unwrap_or(Status::DataAck))
    }

    fn open_window(&mut self) {
        self.state(|s| {
            assert!(!s.in_window, "window opened twice");
            s.in_window = true;
            s.windows += 1;
        });
    }

    fn close_window(&mut self) {
        self.state(|s| s.in_window = false);
    }
}

/// Counters a [`Job`] keeps about how the scheduler drove it
#[derive(Default)]
pub struct JobStats {
    /// Times `produce` was called
    pub calls: AtomicUsize,
    /// Times `produce` returned `Done`
    pub done: AtomicUsize,
    /// Data bytes appended (not counting the address)
    pub appended: AtomicUsize,
}

impl JobStats {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    pub fn appended(&self) -> usize {
        self.appended.load(Ordering::Relaxed)
    }
}

/// Writes `data` in `chunk`-sized batches inside one transaction
pub struct Job {
    data: Vec<u8>,
    chunk: usize,
    sent: usize,
    started: bool,
    finished: bool,
    stats: Arc<JobStats>,
}

impl Job {
    pub fn new(data: Vec<u8>, chunk: usize) -> (Job, Arc<JobStats>) {
        let stats = Arc::new(JobStats::default());
        let job = Job {
            data,
            chunk,
            sent: 0,
            started: false,
            finished: false,
            stats: stats.clone(),
        };
        (job, stats)
    }
}

impl Transfer for Job {
    fn produce(&mut self, out: &mut Commands<'_>) -> Step {
        assert!(!self.finished, "called again after returning Done");
        self.stats.calls.fetch_add(1, Ordering::Relaxed);

        if !self.started {
            out.append_start();
            self.started = true;
        }

        if self.sent < self.data.len() {
            let end = (self.sent + self.chunk).min(self.data.len());
            out.append_bytes(&self.data[self.sent..end]);
            self.stats
                .appended
                .fetch_add(end - self.sent, Ordering::Relaxed);
            self.sent = end;
            return Step::Continue;
        }

        out.append_stop();
        self.finished = true;
        self.stats.done.fetch_add(1, Ordering::Relaxed);
        Step::Done
    }
}

/// Deliver completion interrupts until the bus has nothing in flight
pub fn drive<T: Transfer, const TASKS: usize, const COMMANDS: usize>(
    scheduler: &mut Scheduler<MockBus, T, TASKS, COMMANDS>,
) {
    for _ in 0..10_000 {
        if !scheduler.hw().take_completion() {
            return;
        }
        scheduler.on_complete();
    }
    panic!("bus never settled");
}

/// Deliver at most `n` completion interrupts
pub fn step<T: Transfer, const TASKS: usize, const COMMANDS: usize>(
    scheduler: &mut Scheduler<MockBus, T, TASKS, COMMANDS>,
    n: usize,
) {
    for _ in 0..n {
        if !scheduler.hw().take_completion() {
            return;
        }
        scheduler.on_complete();
    }
}

/// Split wire events into transactions, each running from a start to the
/// stop that ends it
pub fn transactions(events: &[BusEvent]) -> Vec<Vec<BusEvent>> {
    let mut out = Vec::new();
    let mut current: Vec<BusEvent> = Vec::new();
    for event in events {
        current.push(*event);
        if *event == BusEvent::Stop {
            out.push(std::mem::take(&mut current));
        }
    }
    assert!(current.is_empty(), "unterminated transaction: {current:?}");
    out
}

/// The expected wire events for one write of `data` to `address`
pub fn write_of(address: u8, data: &[u8]) -> Vec<BusEvent> {
    let mut events = vec![BusEvent::Start, BusEvent::Byte(address)];
    events.extend(data.iter().map(|b| BusEvent::Byte(*b)));
    events.push(BusEvent::Stop);
    events
}

// End of File
