//! Contains the [`Scheduler`] type

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use heapless::Deque;

use crate::{BlockTransfer, Command, CommandBuffer, Fault, Step, Task, Transfer, Twi, fault};

/// Keeps the bus window closed again whatever happens inside a callback
struct Window<'a, H: Twi>(&'a mut H);

impl<'a, H: Twi> Window<'a, H> {
    fn open(hw: &'a mut H) -> Window<'a, H> {
        hw.open_window();
        Window(hw)
    }
}

impl<H: Twi> Drop for Window<'_, H> {
    fn drop(&mut self) {
        self.0.close_window();
    }
}

/// An interrupt-driven bus transaction scheduler
///
/// Tasks queue up in a fixed FIFO. The task at the head fills the *back*
/// command buffer, while the completion interrupt works through the *front*
/// buffer one command at a time. When the front is used up and the back has
/// something in it, the two swap roles.
///
/// Every method takes `&mut self`; whoever owns the scheduler must make sure
/// the completion interrupt cannot run while a method is executing. The
/// [`SharedScheduler`](crate::SharedScheduler) does this with a critical
/// section.
///
/// * `TASKS` is the task queue capacity
/// * `COMMANDS` is the capacity of each command buffer
pub struct Scheduler<H, T = BlockTransfer, const TASKS: usize = 8, const COMMANDS: usize = 32> {
    /// The bus peripheral
    hw: H,
    /// Queued tasks, oldest first
    tasks: Deque<Task<T>, TASKS>,
    /// Both command buffers. `front` says which is which.
    buffers: [CommandBuffer<COMMANDS>; 2],
    /// Index of the front buffer; the back buffer is the other one
    front: usize,
    /// Index of the next front buffer command to consume
    cursor: usize,
    /// The front buffer command the next dispatch will issue
    current: Command,
    /// Is the executor issuing commands to the bus?
    transmitter_active: bool,
    /// Is the back buffer ready to become the front buffer?
    pending_switch: bool,
}

impl<H, T, const TASKS: usize, const COMMANDS: usize> Scheduler<H, T, TASKS, COMMANDS>
where
    H: Twi,
    T: Transfer,
{
    /// The most commands one dispatch can issue, plus a buffer switch on
    /// either side
    const DISPATCH_LIMIT: usize = 2 * COMMANDS + 2;

    /// Build the scheduler, and bring up the bus peripheral
    pub fn new(mut hw: H) -> Scheduler<H, T, TASKS, COMMANDS> {
        hw.init();
        Scheduler {
            hw,
            tasks: Deque::new(),
            buffers: [CommandBuffer::new(), CommandBuffer::new()],
            front: 0,
            cursor: 0,
            current: Command::AwaitingMore,
            transmitter_active: false,
            pending_switch: false,
        }
    }

    /// Is there nothing queued and nothing on the bus?
    pub fn is_idle(&self) -> bool {
        !self.transmitter_active && self.tasks.is_empty()
    }

    /// Queue a task for the device at `address`
    ///
    /// If no other task is producing, the new task fills the back buffer
    /// before this returns, and an idle bus starts sending it. Otherwise it
    /// waits its turn, and is called when the buffers next switch.
    pub fn enqueue(&mut self, address: u8, transfer: T) {
        // nothing queued and nothing waiting in the back buffer means no
        // buffer switch will come along to call the producer for us
        let starved = self.tasks.is_empty() && !self.pending_switch;
        if self.tasks.push_back(Task::new(address, transfer)).is_err() {
            fault(Fault::QueueFull);
        }
        #[cfg(feature = "defmt")]
        defmt::trace!(
            "Enqueued task for 0x{=u8:02x}, {=usize} queued",
            address,
            self.tasks.len()
        );
        if starved {
            self.produce();
        }
    }

    /// Handle the completion interrupt
    ///
    /// Checks the bus status, issues the next command and, if that freed the
    /// back buffer, has the head task refill it.
    pub fn on_complete(&mut self) {
        let status = self.hw.status();
        if status.is_error() {
            fault(Fault::Bus(status));
        }
        if !self.transmitter_active {
            fault(Fault::TransmitterIdle);
        }
        if self.dispatch() && !self.tasks.is_empty() {
            self.produce();
        }
    }

    /// Number of queued tasks, including the one being served
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Is the executor issuing commands to the bus?
    pub fn is_transmitter_active(&self) -> bool {
        self.transmitter_active
    }

    /// Is the back buffer waiting to be swapped in?
    pub fn is_switch_pending(&self) -> bool {
        self.pending_switch
    }

    /// How far through the front buffer the executor is
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The command the executor will issue next
    pub fn current(&self) -> Command {
        self.current
    }

    /// The commands in the front buffer
    pub fn front(&self) -> &[Command] {
        self.buffers[self.front].as_slice()
    }

    /// The commands in the back buffer
    pub fn back(&self) -> &[Command] {
        self.buffers[self.front ^ 1].as_slice()
    }

    /// Access the bus peripheral
    pub fn hw(&self) -> &H {
        &self.hw
    }

    /// Mutably access the bus peripheral
    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Have queued tasks fill the back buffer
    ///
    /// Runs the head task's producer once per free back buffer. While the
    /// bus is idle each fresh batch is swapped straight in and sent, and we
    /// go round again; once the bus is busy we mark the batch for switching
    /// and stop, to be called again when that switch has happened.
    fn produce(&mut self) {
        if self.pending_switch {
            fault(Fault::PendingSwitch);
        }

        while !self.tasks.is_empty() {
            let step = self.produce_one();

            if step == Step::Done {
                self.retire_head();
            }

            if self.transmitter_active {
                self.pending_switch = true;
                #[cfg(feature = "defmt")]
                defmt::trace!("Switch pending, {=usize} queued", self.tasks.len());
                return;
            }

            self.switch_buffers();
            self.start_transmitter();
        }
    }

    /// Call the head task's producer on the back buffer, inside the window
    fn produce_one(&mut self) -> Step {
        let Scheduler {
            hw,
            tasks,
            buffers,
            front,
            ..
        } = self;

        let Some(task) = tasks.front_mut() else {
            fault(Fault::QueueEmpty);
        };
        let back = &mut buffers[*front ^ 1];
        if !back.is_empty() {
            fault(Fault::BackBufferBusy);
        }

        let address = task.address;
        let step = {
            let _window = Window::open(hw);
            task.produce(&mut back.writer(address))
        };

        if back.is_empty() {
            fault(Fault::EmptyProduction);
        }
        step
    }

    /// Remove the finished head task
    fn retire_head(&mut self) {
        let Some(_task) = self.tasks.pop_front() else {
            fault(Fault::QueueEmpty);
        };
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "Retired task for 0x{=u8:02x}, {=usize} left",
            _task.address,
            self.tasks.len()
        );
    }

    /// Swap the front and back buffers
    ///
    /// Only valid when the front buffer is used up and the back buffer has
    /// something in it.
    fn switch_buffers(&mut self) {
        let back = &self.buffers[self.front ^ 1];
        let front = &self.buffers[self.front];
        if back.is_empty() || self.cursor != front.len() {
            fault(Fault::InvalidSwitch);
        }

        self.front ^= 1;
        self.buffers[self.front ^ 1].clear();
        self.cursor = 0;
        self.pending_switch = false;
        self.current = self.buffers[self.front].get(0);

        #[cfg(feature = "defmt")]
        defmt::trace!(
            "Switched to buffer {=usize} with {=usize} commands",
            self.front,
            self.buffers[self.front].len()
        );
    }

    /// Kick an idle bus into sending the front buffer
    fn start_transmitter(&mut self) {
        if self.transmitter_active {
            fault(Fault::TransmitterBusy);
        }
        if self.current == Command::AwaitingMore {
            fault(Fault::InvalidSwitch);
        }
        self.transmitter_active = true;
        // a switch needs a pending flag, and we only get here just after a
        // switch cleared it
        let _ = self.dispatch();
    }

    /// Issue front buffer commands until one is in flight or the bus sleeps
    ///
    /// Returns `true` if the buffers were switched along the way, which
    /// means the back buffer is free for the producer.
    fn dispatch(&mut self) -> bool {
        let mut switched = false;

        for _ in 0..Self::DISPATCH_LIMIT {
            #[cfg(feature = "defmt")]
            defmt::trace!("Dispatch {} at {=usize}", self.current, self.cursor);

            match self.current {
                Command::Start => self.hw.send_start(),
                Command::SendByte(byte) => self.hw.send_byte(byte),
                Command::Stop => {
                    self.hw.send_stop();
                    // the bus raises no event after a stop
                    self.transmitter_active = false;
                }
                Command::AwaitingMore => {
                    if self.pending_switch {
                        self.switch_buffers();
                        switched = true;
                        continue;
                    }
                    #[cfg(feature = "defmt")]
                    defmt::debug!("Nothing left to send, bus sleeping");
                    self.hw.disable_interrupt();
                    self.transmitter_active = false;
                    return switched;
                }
            }

            self.cursor += 1;

            if self.cursor < self.buffers[self.front].len() {
                if !self.transmitter_active {
                    // a stop must be the last command in its buffer
                    fault(Fault::StopMidBuffer);
                }
                self.current = self.buffers[self.front].get(self.cursor);
                return switched;
            }

            if !self.pending_switch {
                self.current = Command::AwaitingMore;
                return switched;
            }

            self.switch_buffers();
            switched = true;
            if self.transmitter_active {
                return switched;
            }
            // the old buffer ended on a stop, so kick off the new one
            self.transmitter_active = true;
        }

        fault(Fault::Runaway);
    }
}


// End of File
