//! Holds the [`Task`] type and the [`Transfer`] trait

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::Commands;

/// What a [`Transfer`] wants after producing a batch of commands
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Keep this task queued; call it again when the buffer frees up
    Continue,
    /// This task is finished; retire it
    Done,
}

/// Something that produces bus commands, a batch at a time
///
/// The scheduler calls [`Transfer::produce`] each time the back buffer is
/// free and this task is at the head of the queue. Each call must append at
/// least one command and no more than fit in one buffer. The first call of a
/// transaction normally begins with [`Commands::append_start`], and the last
/// one ends with [`Commands::append_stop`] and returns [`Step::Done`].
pub trait Transfer {
    /// Append the next batch of commands
    fn produce(&mut self, out: &mut Commands<'_>) -> Step;
}

/// A queued request: a device address and the transfer that talks to it
pub struct Task<T> {
    /// The 8-bit bus address (write direction, so even)
    pub address: u8,
    /// The producer of commands for this task
    pub transfer: T,
}

impl<T: Transfer> Task<T> {
    /// Create a new [`Task`] object
    pub const fn new(address: u8, transfer: T) -> Task<T> {
        Task { address, transfer }
    }

    /// Run the transfer's producer against the given buffer handle
    pub(crate) fn produce(&mut self, out: &mut Commands<'_>) -> Step {
        self.transfer.produce(out)
    }
}

/// Sends a block of constant data as one write transaction
///
/// Each call appends at most [`BlockTransfer::CHUNK_LEN`] data bytes, so a
/// long block never needs more than one buffer's worth at a time.
#[derive(Clone, Debug)]
pub struct BlockTransfer {
    /// The bytes to send
    data: &'static [u8],
    /// How many bytes have been appended so far
    sent: usize,
    /// Has the start condition been appended?
    started: bool,
}

impl BlockTransfer {
    /// Most data bytes appended per call
    pub const CHUNK_LEN: usize = 16;

    /// Prepare to send `data`
    pub const fn new(data: &'static [u8]) -> BlockTransfer {
        BlockTransfer {
            data,
            sent: 0,
            started: false,
        }
    }

    /// How many bytes have been handed to the scheduler
    pub const fn sent(&self) -> usize {
        self.sent
    }
}

impl Transfer for BlockTransfer {
    fn produce(&mut self, out: &mut Commands<'_>) -> Step {
        if !self.started {
            out.append_start();
            self.started = true;
        }

        let rest = &self.data[self.sent..];
        if rest.is_empty() {
            out.append_stop();
            return Step::Done;
        }

        let chunk = &rest[..rest.len().min(Self::CHUNK_LEN)];
        out.append_bytes(chunk);
        self.sent += chunk.len();
        Step::Continue
    }
}


// End of File
