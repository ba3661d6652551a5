//! Contains the [`SharedScheduler`] type

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::cell::RefCell;

use critical_section::Mutex;

use crate::{BlockTransfer, Fault, Scheduler, Transfer, Twi, fault};

/// A [`Scheduler`] that can live in a `static`, shared between the
/// foreground and the bus interrupt handler
///
/// Every method runs inside a critical section, so the completion interrupt
/// never sees the scheduler half-updated.
///
/// ```rust,ignore
/// static BUS: SharedScheduler<MyTwi> = SharedScheduler::new();
///
/// #[interrupt]
/// fn TWI0() {
///     BUS.on_interrupt();
/// }
///
/// fn main() -> ! {
///     BUS.init(MyTwi::new(dp.TWI0));
///     BUS.transmit_block(0x78, &SPLASH);
///     // ...
/// }
/// ```
pub struct SharedScheduler<H, T = BlockTransfer, const TASKS: usize = 8, const COMMANDS: usize = 32>
{
    inner: Mutex<RefCell<Option<Scheduler<H, T, TASKS, COMMANDS>>>>,
}

impl<H, T, const TASKS: usize, const COMMANDS: usize> SharedScheduler<H, T, TASKS, COMMANDS>
where
    H: Twi,
    T: Transfer,
{
    /// Create an empty slot for the scheduler. Call [`Self::init`] before use.
    pub const fn new() -> SharedScheduler<H, T, TASKS, COMMANDS> {
        SharedScheduler {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Build the scheduler around the bus peripheral
    ///
    /// You may only call this once.
    pub fn init(&self, hw: H) {
        critical_section::with(|cs| {
            let mut slot = self.inner.borrow_ref_mut(cs);
            if slot.is_some() {
                fault(Fault::AlreadyInitialised);
            }
            *slot = Some(Scheduler::new(hw));
        });
        #[cfg(feature = "defmt")]
        defmt::info!(
            "I2C scheduler up: {=usize} tasks, {=usize} commands per buffer",
            TASKS,
            COMMANDS
        );
    }

    /// Is there nothing queued and nothing on the bus?
    pub fn is_idle(&self) -> bool {
        self.with(|scheduler| scheduler.is_idle())
    }

    /// Spin until [`Self::is_idle`]
    ///
    /// Interrupts get a look in between each check. Only for short waits.
    pub fn wait_until_idle(&self) {
        while !self.is_idle() {
            core::hint::spin_loop();
        }
    }

    /// Queue a task for the device at `address`
    pub fn enqueue(&self, address: u8, transfer: T) {
        self.with(|scheduler| scheduler.enqueue(address, transfer));
    }

    /// Call this from the bus completion interrupt handler
    ///
    /// Faults if the scheduler is already in use, which would mean the
    /// interrupt fired while a task callback was producing.
    pub fn on_interrupt(&self) {
        self.with(|scheduler| scheduler.on_complete());
    }

    /// Send a block of constant data to `address`, and wait until the whole
    /// transaction, stop condition included, is on the bus
    pub fn transmit_block(&self, address: u8, data: &'static [u8])
    where
        T: From<BlockTransfer>,
    {
        const {
            assert!(COMMANDS >= BlockTransfer::CHUNK_LEN + 2);
        }
        self.enqueue(address, BlockTransfer::new(data).into());
        self.wait_until_idle();
    }

    /// Run `f` on the scheduler, inside a critical section
    fn with<R>(&self, f: impl FnOnce(&mut Scheduler<H, T, TASKS, COMMANDS>) -> R) -> R {
        critical_section::with(|cs| {
            let mut slot = self
                .inner
                .borrow(cs)
                .try_borrow_mut()
                .unwrap_or_else(|_| fault(Fault::Reentered));
            let Some(scheduler) = slot.as_mut() else {
                fault(Fault::NotInitialised);
            };
            f(scheduler)
        })
    }
}

impl<H, T, const TASKS: usize, const COMMANDS: usize> Default
    for SharedScheduler<H, T, TASKS, COMMANDS>
where
    H: Twi,
    T: Transfer,
{
    fn default() -> Self {
        SharedScheduler::new()
    }
}

// End of File
