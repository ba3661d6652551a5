//! Contains the [`Fault`] type and the [`fault`] function

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::Status;

/// Every defensive check in the scheduler that can fail
///
/// None of these are recoverable. They mean either a client broke the
/// contract (overfilled a buffer, queued too many tasks) or the bus reported
/// something we do not retry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// The task queue has no free slot
    QueueFull,
    /// A head task was required but the queue is empty
    QueueEmpty,
    /// A callback appended more commands than one buffer holds
    BufferOverflow {
        /// Free slots left in the back buffer
        capacity: usize,
        /// Slots the append asked for
        requested: usize,
    },
    /// `append_bytes` was given nothing to append
    EmptyAppend,
    /// A callback returned without appending anything
    EmptyProduction,
    /// The back buffer still held commands when a callback was started
    BackBufferBusy,
    /// A write transaction was started with an odd (read) address
    OddAddress(u8),
    /// A buffer switch was attempted with the front unconsumed or the back empty
    InvalidSwitch,
    /// The transmitter was started while it was already running
    TransmitterBusy,
    /// A completion event arrived while the transmitter was idle
    TransmitterIdle,
    /// Production was started while a buffer switch was still pending
    PendingSwitch,
    /// The executor failed to settle within its iteration bound
    Runaway,
    /// The scheduler was entered while it was already in use
    Reentered,
    /// The shared scheduler was used before `init`
    NotInitialised,
    /// The shared scheduler was initialised twice
    AlreadyInitialised,
    /// A stop condition was followed by more commands in the same buffer
    StopMidBuffer,
    /// The bus reported an error status
    Bus(Status),
}

impl Fault {
    /// A numeric code, for reporting through channels that cannot carry text
    pub const fn code(&self) -> u8 {
        match self {
            Fault::QueueFull => 0x01,
            Fault::QueueEmpty => 0x02,
            Fault::BufferOverflow { .. } => 0x03,
            Fault::EmptyAppend => 0x04,
            Fault::EmptyProduction => 0x05,
            Fault::BackBufferBusy => 0x06,
            Fault::OddAddress(_) => 0x07,
            Fault::InvalidSwitch => 0x08,
            Fault::TransmitterBusy => 0x09,
            Fault::TransmitterIdle => 0x0A,
            Fault::PendingSwitch => 0x0B,
            Fault::Runaway => 0x0C,
            Fault::Reentered => 0x0D,
            Fault::NotInitialised => 0x0E,
            Fault::AlreadyInitialised => 0x0F,
            Fault::StopMidBuffer => 0x10,
            // error statuses are 0x00 or at least 0x20, clear of the codes above
            Fault::Bus(status) => status.code(),
        }
    }

    /// A short description of the fault
    pub const fn message(&self) -> &'static str {
        match self {
            Fault::QueueFull => "task queue full",
            Fault::QueueEmpty => "task queue empty",
            Fault::BufferOverflow { .. } => "command buffer overflow",
            Fault::EmptyAppend => "empty append",
            Fault::EmptyProduction => "callback produced no commands",
            Fault::BackBufferBusy => "back buffer not empty",
            Fault::OddAddress(_) => "odd device address",
            Fault::InvalidSwitch => "invalid buffer switch",
            Fault::TransmitterBusy => "transmitter already active",
            Fault::TransmitterIdle => "completion while transmitter idle",
            Fault::PendingSwitch => "buffer switch already pending",
            Fault::Runaway => "executor did not settle",
            Fault::Reentered => "scheduler re-entered",
            Fault::NotInitialised => "scheduler not initialised",
            Fault::AlreadyInitialised => "scheduler already initialised",
            Fault::StopMidBuffer => "stop before end of buffer",
            Fault::Bus(_) => "bus error status",
        }
    }
}

impl core::fmt::Display for Fault {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(fmt, "I2C fault 0x{:02x}: {}", self.code(), self.message())?;
        match self {
            Fault::BufferOverflow {
                capacity,
                requested,
            } => write!(fmt, " ({requested} requested, {capacity} free)"),
            Fault::OddAddress(address) => write!(fmt, " (0x{address:02x})"),
            Fault::Bus(status) => write!(fmt, " ({status:?})"),
            _ => Ok(()),
        }
    }
}

/// Report an unrecoverable fault
///
/// Logs the fault and panics. The firmware's panic handler decides whether
/// that halts or resets the device; it must not return here.
#[cold]
#[track_caller]
pub fn fault(fault: Fault) -> ! {
    #[cfg(feature = "defmt")]
    defmt::error!("{}", fault);
    panic!("{}", fault);
}


// End of File
