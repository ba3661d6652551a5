//! Holds the [`Commands`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Command, Fault, fault};

/// A helper for appending to the back buffer from inside a task callback
///
/// It only ever writes past the commands already in the buffer, and every
/// append checks capacity first, so a callback that produces too much faults
/// instead of truncating.
pub struct Commands<'a> {
    /// All the slots of the buffer being filled
    slots: &'a mut [Command],
    /// The buffer's fill count, which we bump as we go
    len: &'a mut usize,
    /// The device address of the task being served
    address: u8,
}

impl<'a> Commands<'a> {
    /// Make a new append handle over a buffer's slots and fill count
    pub(crate) fn new(slots: &'a mut [Command], len: &'a mut usize, address: u8) -> Commands<'a> {
        Commands {
            slots,
            len,
            address,
        }
    }

    /// The device address of the task being served
    pub fn address(&self) -> u8 {
        self.address
    }

    /// How many commands are in the buffer
    pub fn len(&self) -> usize {
        *self.len
    }

    /// Is the buffer empty?
    pub fn is_empty(&self) -> bool {
        *self.len == 0
    }

    /// How many more commands fit
    pub fn remaining(&self) -> usize {
        self.slots.len() - *self.len
    }

    /// Begin a write transaction: a start condition, then the address byte
    ///
    /// The address is the task's 8-bit bus address and must be even.
    pub fn append_start(&mut self) {
        if self.address & 1 != 0 {
            fault(Fault::OddAddress(self.address));
        }
        self.reserve(2);
        self.push(Command::Start);
        self.push(Command::SendByte(self.address));
    }

    /// Append one data byte
    pub fn append_byte(&mut self, byte: u8) {
        self.reserve(1);
        self.push(Command::SendByte(byte));
    }

    /// Append a run of data bytes, all or nothing
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            fault(Fault::EmptyAppend);
        }
        self.reserve(bytes.len());
        for byte in bytes {
            self.push(Command::SendByte(*byte));
        }
    }

    /// End the transaction with a stop condition
    pub fn append_stop(&mut self) {
        self.reserve(1);
        self.push(Command::Stop);
    }

    /// Fault unless `n` more commands fit
    fn reserve(&self, n: usize) {
        let capacity = self.remaining();
        if n > capacity {
            fault(Fault::BufferOverflow {
                capacity,
                requested: n,
            });
        }
    }

    /// Write one command into the next free slot
    ///
    /// Callers have already reserved room.
    fn push(&mut self, command: Command) {
        self.slots[*self.len] = command;
        *self.len += 1;
    }
}


// End of File
