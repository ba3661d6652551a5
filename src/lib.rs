//! An interrupt-driven I2C transaction scheduler
//!
//! Client code queues [`Task`]s. Each one wraps a [`Transfer`], which is
//! called repeatedly to append primitive bus [`Command`]s (start, data byte,
//! stop) to a command buffer. Two buffers take turns: while the bus
//! completion interrupt works through one, the head task fills the other.
//! Nothing blocks except [`SharedScheduler::wait_until_idle`] and nothing is
//! allocated after start-up.
//!
//! The bus peripheral itself sits behind the [`Twi`] trait. Contract
//! violations and bus errors are reported through [`fault`], which does not
//! return.
//!
//! Enable the `defmt` feature to get logging.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]

mod command;
mod fault;
mod scheduler;
mod shared;
mod task;
pub mod twi;
mod writer;

pub use command::{Command, CommandBuffer};
pub use fault::{Fault, fault};
pub use scheduler::Scheduler;
pub use shared::SharedScheduler;
pub use task::{BlockTransfer, Step, Task, Transfer};
pub use twi::{Status, Twi};
pub use writer::Commands;

// End of File
