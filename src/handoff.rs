//! Moving a paused computation onto a new thread.
//!
//! [`switch_to_new_thread`] builds a suspension point that always pauses, then hands
//! the frame to a freshly spawned worker which resumes it. The worker's join handle
//! lands in a [`WorkerSlot`]; a slot holds one worker at a time and must be
//! [joined](WorkerSlot::join) before it can be reused.
//!
//! ```rust
//! use std::thread::{self, ThreadId};
//! use coframe::handoff::{switch_to_new_thread, WorkerSlot};
//! use coframe::{body, Config, Handle, State, Suspend};
//!
//! let slot = WorkerSlot::new();
//! let worker = slot.clone();
//! let handle = Handle::start_send(
//!     body::from_fn(move |input: Option<ThreadId>| match input {
//!         None => Suspend::<(), _, _>::Await(switch_to_new_thread(&worker)),
//!         Some(resumed_on) => Suspend::Return(resumed_on),
//!     }),
//!     Config::eager(),
//! );
//! assert_eq!(handle.state(), State::HandedOff);
//!
//! let frame = slot.join().unwrap().unwrap();
//! assert!(frame.is_done());
//! ```

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;

use crate::awaiter::{Awaiter, Suspension, Transfer};
use crate::error::{fatal, Fault};
use crate::frame::FrameId;
use crate::handle::Detached;

enum Worker {
    /// Claimed by a suspension point; the thread is not spawned yet.
    Reserved,
    Running(JoinHandle<Detached>),
}

/// Holds the worker thread a frame was handed to.
#[derive(Clone, Default)]
pub struct WorkerSlot {
    worker: Arc<Mutex<Option<Worker>>>,
}

impl WorkerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a worker was reserved or installed and not joined yet.
    pub fn is_occupied(&self) -> bool {
        self.worker.lock().is_some()
    }

    pub fn thread_id(&self) -> Option<ThreadId> {
        match self.worker.lock().as_ref() {
            Some(Worker::Running(worker)) => Some(worker.thread().id()),
            _ => None,
        }
    }

    /// Claim the slot. Check and claim happen under one lock.
    fn reserve(&self) -> Result<Reservation, Fault> {
        let mut slot = self.worker.lock();
        if slot.is_some() {
            return Err(Fault::SlotOccupied);
        }
        *slot = Some(Worker::Reserved);
        Ok(Reservation {
            slot: self.clone(),
            held: true,
        })
    }

    /// Wait for the worker and take back the frame it resumed. Empties the slot.
    ///
    /// `None` if no worker is running; `Some(Err(_))` carries the worker's panic.
    pub fn join(&self) -> Option<thread::Result<Detached>> {
        let worker = {
            let mut slot = self.worker.lock();
            match slot.take() {
                Some(Worker::Running(worker)) => Some(worker),
                reserved => {
                    *slot = reserved;
                    None
                }
            }
        };
        worker.map(JoinHandle::join)
    }
}

/// A claimed [`WorkerSlot`]. Released on drop unless a worker was installed.
struct Reservation {
    slot: WorkerSlot,
    held: bool,
}

impl Reservation {
    fn install(mut self, worker: JoinHandle<Detached>) {
        *self.slot.worker.lock() = Some(Worker::Running(worker));
        self.held = false;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        let mut slot = self.slot.worker.lock();
        if matches!(*slot, Some(Worker::Reserved)) {
            *slot = None;
        }
    }
}

impl fmt::Debug for WorkerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSlot")
            .field("thread", &self.thread_id())
            .finish()
    }
}

/// Suspension point that resumes the frame on a new thread.
///
/// Resumes with the id of the thread the body continues on.
#[derive(Debug, Clone)]
pub struct Handoff {
    slot: WorkerSlot,
}

pub fn switch_to_new_thread(slot: &WorkerSlot) -> Handoff {
    Handoff { slot: slot.clone() }
}

impl Awaiter for Handoff {
    type Output = ThreadId;

    fn ready(&self) -> bool {
        false
    }

    fn on_suspend(&mut self, cx: &mut Suspension<'_>) -> Result<Transfer<'_>, Fault> {
        let reservation = self.slot.reserve()?;
        let frame = cx.frame();
        cx.hand_off(move |detached| spawn_worker(frame, detached, reservation));
        Ok(Transfer::Continue)
    }

    fn on_resume(self) -> ThreadId {
        thread::current().id()
    }
}

fn spawn_worker(frame: FrameId, mut detached: Detached, reservation: Reservation) -> Result<(), Fault> {
    let worker = thread::Builder::new()
        .name(format!("coframe-handoff-{}", frame.as_u64()))
        .spawn(move || {
            if let Err(fault) = detached.try_resume() {
                fatal(fault)
            }
            detached
        })
        .map_err(|source| Fault::Spawn { frame, source })?;
    tracing::debug!(%frame, thread = ?worker.thread().id(), "frame handed off to worker");
    reservation.install(worker);
    Ok(())
}
