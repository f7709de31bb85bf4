//! Continuation-chained units of work.
//!
//! A [`Task`] starts lazily and keeps its result until it is read. Awaiting a task
//! from another frame links the awaiting frame as the task's parent and runs the
//! task right away; when the task returns, control goes straight back to the parent.
//! Nested awaits therefore run depth first on the calling thread.
//!
//! ```rust
//! use coframe::{task, Suspend, SuspendNever, Task};
//!
//! fn one() -> Task<impl coframe::Body<Yield = (), Return = i32, Awaiter = SuspendNever>> {
//!     task::from_fn(|_: Option<()>| Suspend::Return(1))
//! }
//!
//! let mut sum = 1;
//! let total = task::from_fn(move |input: Option<i32>| match input {
//!     None => Suspend::Await(one().into_awaiter()),
//!     Some(b) if sum == 1 => {
//!         sum += b;
//!         Suspend::Await(one().into_awaiter())
//!     }
//!     Some(c) => Suspend::Return(sum + c),
//! });
//! assert_eq!(total.invoke(), 3);
//! ```

use std::fmt;

use crate::awaiter::{Awaiter, Suspension, Transfer};
use crate::body::{self, Body};
use crate::driver;
use crate::error::{fatal, Fault};
use crate::frame::{Config, FinalSuspend, FrameId, InitialSuspend, Outcome, Resume, State};
use crate::handle::Handle;
use crate::suspend::Suspend;

/// A lazily started computation with a single result.
pub struct Task<B: Body> {
    handle: Handle<B>,
}

impl<B: Body> Task<B> {
    pub fn new(body: B) -> Self {
        Self::with_config(body, Config::lazy())
    }

    /// Use the observer of `config`. Tasks always start lazily and keep their result.
    pub fn with_config(body: B, config: Config) -> Self {
        let config = config
            .with_initial_suspend(InitialSuspend::Lazy)
            .with_final_suspend(FinalSuspend::Always);
        Task {
            handle: Handle::start(body, config),
        }
    }

    pub fn id(&self) -> FrameId {
        self.handle.id()
    }

    pub fn state(&self) -> State {
        self.handle.state()
    }

    pub fn is_done(&self) -> bool {
        self.handle.is_done()
    }

    pub fn result(&self) -> Option<&B::Return> {
        self.handle.result()
    }

    /// Run to the next pause.
    pub fn resume(&mut self) -> Outcome {
        self.handle.resume()
    }

    pub fn try_resume(&mut self) -> Result<Outcome, Fault> {
        self.handle.try_resume()
    }

    /// Drive a top-level task to completion and return its result.
    pub fn invoke(self) -> B::Return {
        self.try_invoke().unwrap_or_else(|fault| fatal(fault))
    }

    pub fn try_invoke(mut self) -> Result<B::Return, Fault> {
        driver::run_to_completion(&mut self.handle)
    }

    /// Turn the task into the awaiter of a suspension point in another frame.
    ///
    /// The awaiter owns the task; it is destroyed once its result has been handed over.
    pub fn into_awaiter(self) -> TaskAwaiter<B::Return>
    where
        B: 'static,
    {
        TaskAwaiter {
            id: self.handle.id(),
            child: Box::new(self.handle),
        }
    }
}

impl<B: Body> fmt::Debug for Task<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("handle", &self.handle).finish()
    }
}

/// A frame another frame can await.
pub trait Awaitable {
    type Output;

    fn as_resume(&mut self) -> &mut dyn Resume;

    fn take_result(&mut self) -> Option<Self::Output>;
}

impl<B: Body> Awaitable for Handle<B> {
    type Output = B::Return;

    fn as_resume(&mut self) -> &mut dyn Resume {
        self
    }

    fn take_result(&mut self) -> Option<B::Return> {
        Handle::take_result(self)
    }
}

/// Suspension point that runs a child task and resumes with its result.
pub struct TaskAwaiter<R> {
    id: FrameId,
    child: Box<dyn Awaitable<Output = R>>,
}

impl<R> TaskAwaiter<R> {
    /// The awaited task.
    pub fn child(&self) -> FrameId {
        self.id
    }
}

impl<R> Awaiter for TaskAwaiter<R> {
    type Output = R;

    fn ready(&self) -> bool {
        false
    }

    fn on_suspend(&mut self, cx: &mut Suspension<'_>) -> Result<Transfer<'_>, Fault> {
        let child = self.child.as_resume();
        child.link_parent(cx.frame())?;
        tracing::trace!(parent = %cx.frame(), child = %self.id, "awaiting task");
        Ok(Transfer::To(child))
    }

    fn on_resume(mut self) -> R {
        let frame = self.id;
        self.child
            .take_result()
            .unwrap_or_else(|| fatal(Fault::MissingResult { frame }))
    }

    fn transfer_target(&mut self) -> Option<&mut dyn Resume> {
        Some(self.child.as_resume())
    }
}

impl<R> fmt::Debug for TaskAwaiter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskAwaiter").field("child", &self.id).finish()
    }
}

/// Create a task from a closure body. The closure sees `None` on entry.
pub fn from_fn<A, R, F>(f: F) -> Task<body::FromFn<F, A>>
where
    A: Awaiter,
    F: FnMut(Option<A::Output>) -> Suspend<(), A, R>,
{
    Task::new(body::from_fn(f))
}
