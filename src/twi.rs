//! Holds the [`Twi`] hardware-access trait and the bus [`Status`] codes

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// The register-level half of a byte-oriented two-wire master transmitter
///
/// The scheduler drives the peripheral only through this trait. Operations
/// named `send_*` return straight away; the peripheral raises its completion
/// interrupt later, and the firmware's interrupt handler passes that on to
/// [`Scheduler::on_complete`](crate::Scheduler::on_complete) or
/// [`SharedScheduler::on_interrupt`](crate::SharedScheduler::on_interrupt).
pub trait Twi {
    /// Bring the peripheral up. Called once, when the scheduler is built.
    fn init(&mut self);

    /// Assert a start condition. Raises the completion interrupt when done.
    fn send_start(&mut self);

    /// Clock out one byte. Raises the completion interrupt when done.
    fn send_byte(&mut self, byte: u8);

    /// Assert a stop condition.
    ///
    /// No completion interrupt follows a stop condition.
    fn send_stop(&mut self);

    /// Mask the completion interrupt until the next `send_start` or
    /// `send_byte`
    fn disable_interrupt(&mut self);

    /// The status of the operation that just completed
    fn status(&mut self) -> Status;

    /// Called before a task callback runs
    ///
    /// An implementation should mask the completion interrupt at the
    /// interrupt controller and then force global interrupts on, whatever
    /// their state was, so unrelated interrupts are not held off by a slow
    /// callback. On Arm, `cortex::open_window` does this.
    fn open_window(&mut self);

    /// Called after a task callback returns. Reverses [`Twi::open_window`].
    ///
    /// On Arm, `cortex::close_window` does this.
    fn close_window(&mut self);
}

/// Status codes a master transmitter reports after each bus step
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// A start condition was sent
    Start,
    /// A repeated start condition was sent
    RepeatedStart,
    /// Address sent, ACK received
    AddressAck,
    /// Address sent, NACK received
    AddressNack,
    /// Data byte sent, ACK received
    DataAck,
    /// Data byte sent, NACK received
    DataNack,
    /// Arbitration lost to another master
    ArbitrationLost,
    /// Anything else, including the illegal start/stop bus error (0x00)
    Other(u8),
}

impl Status {
    /// Bits of the status register that carry prescaler settings, not status
    const PRESCALER_MASK: u8 = 0b0000_0111;

    /// Illegal start or stop condition on the bus
    const BUS_ERROR: u8 = 0x00;

    /// Decode a raw status register value
    pub const fn from_code(raw: u8) -> Status {
        match raw & !Self::PRESCALER_MASK {
            0x08 => Status::Start,
            0x10 => Status::RepeatedStart,
            0x18 => Status::AddressAck,
            0x20 => Status::AddressNack,
            0x28 => Status::DataAck,
            0x30 => Status::DataNack,
            0x38 => Status::ArbitrationLost,
            other => Status::Other(other),
        }
    }

    /// The raw status code
    pub const fn code(&self) -> u8 {
        match self {
            Status::Start => 0x08,
            Status::RepeatedStart => 0x10,
            Status::AddressAck => 0x18,
            Status::AddressNack => 0x20,
            Status::DataAck => 0x28,
            Status::DataNack => 0x30,
            Status::ArbitrationLost => 0x38,
            Status::Other(code) => *code,
        }
    }

    /// Does this status mean the transfer failed?
    ///
    /// Anything past a data ACK is an error, as is a NACK of the address
    /// and the illegal start/stop bus error.
    pub const fn is_error(&self) -> bool {
        let code = self.code();
        code > Status::DataAck.code()
            || code == Status::AddressNack.code()
            || code == Self::BUS_ERROR
    }
}

/// Production window helpers for Arm Cortex-M parts
#[cfg(target_arch = "arm")]
pub mod cortex {
    use cortex_m::interrupt::InterruptNumber;
    use cortex_m::peripheral::NVIC;

    /// Mask the bus interrupt, then force global interrupts on
    ///
    /// Global interrupts are enabled unconditionally, even if the caller had
    /// them off. Callbacks must never hold off unrelated interrupts.
    pub fn open_window<I: InterruptNumber>(bus_irq: I) {
        NVIC::mask(bus_irq);
        // SAFETY: the only interrupt that touches scheduler state is masked
        unsafe { cortex_m::interrupt::enable() };
    }

    /// Force global interrupts off, then unmask the bus interrupt
    pub fn close_window<I: InterruptNumber>(bus_irq: I) {
        cortex_m::interrupt::disable();
        // SAFETY: we are inside the scheduler's critical section again, so
        // the bus interrupt cannot preempt it
        unsafe { NVIC::unmask(bus_irq) };
    }
}


// End of File
