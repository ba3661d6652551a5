//! Holds the [`Command`] and [`CommandBuffer`] types

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::Commands;

/// One primitive bus operation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Assert a start condition
    Start,
    /// Clock out a byte
    SendByte(u8),
    /// Assert a stop condition
    Stop,
    /// Nothing is ready to send yet
    AwaitingMore,
}

/// A fixed-size run of commands, holding `LEN` of them at most.
///
/// The scheduler owns exactly two of these and swaps which one is being
/// filled and which one is being sent.
pub struct CommandBuffer<const LEN: usize> {
    /// The command slots. Only the first `len` are meaningful.
    commands: [Command; LEN],
    /// How many slots are filled
    len: usize,
}

impl<const LEN: usize> CommandBuffer<LEN> {
    /// Create a new, empty, buffer
    pub const fn new() -> Self {
        assert!(LEN > 0);
        Self {
            commands: [Command::AwaitingMore; LEN],
            len: 0,
        }
    }

    /// How many commands have been appended
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Has nothing been appended?
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// How many commands this buffer can hold
    pub const fn capacity(&self) -> usize {
        LEN
    }

    /// The command at `index`, or [`Command::AwaitingMore`] past the end
    pub fn get(&self, index: usize) -> Command {
        self.as_slice()
            .get(index)
            .copied()
            .unwrap_or(Command::AwaitingMore)
    }

    /// The filled part of the buffer
    pub fn as_slice(&self) -> &[Command] {
        &self.commands[..self.len]
    }

    /// Forget all appended commands
    ///
    /// The slots are not scrubbed; they are overwritten by the next fill.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Get an append handle for a task talking to `address`
    pub fn writer(&mut self, address: u8) -> Commands<'_> {
        Commands::new(&mut self.commands, &mut self.len, address)
    }
}

impl<const LEN: usize> Default for CommandBuffer<LEN> {
    fn default() -> Self {
        CommandBuffer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_past_the_end_awaits_more() {
        let mut buffer: CommandBuffer<4> = CommandBuffer::new();
        assert_eq!(buffer.get(0), Command::AwaitingMore);

        buffer.writer(0x40).append_byte(0x11);
        assert_eq!(buffer.get(0), Command::SendByte(0x11));
        assert_eq!(buffer.get(1), Command::AwaitingMore);
        assert_eq!(buffer.get(4), Command::AwaitingMore);
    }

    #[test]
    fn clear_resets_the_count_only() {
        let mut buffer: CommandBuffer<4> = CommandBuffer::default();
        buffer.writer(0x40).append_bytes(&[1, 2, 3]);
        assert_eq!(buffer.len(), 3);

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.as_slice().is_empty());
        assert_eq!(buffer.capacity(), 4);
    }
}

// End of File
