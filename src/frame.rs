//! The suspend/resume state machine behind every computation.
//!
//! A [`Frame`] owns a [`Body`] and drives it from one suspension point to the next.
//! Drivers never hold a frame directly; they own it through a
//! [`Handle`](crate::Handle), and other frames reach it through [`Resume`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::awaiter::{Awaiter, Suspension, Transfer};
use crate::body::{Body, Point};
use crate::error::Fault;
use crate::handle::Launcher;
use crate::observe::{Event, Observer};
use crate::suspend::Suspend;

/// Identity of a frame, stable for its whole life.
///
/// Used for parent links and diagnostics; it never grants access to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(u64);

impl FrameId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        FrameId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Created; the body has not run.
    NotStarted,
    /// The body is running. Seen from outside only if the body unwound.
    Running,
    /// Paused at a suspension point.
    SuspendedYield,
    /// The body returned; the final transfer is being decided.
    SuspendedFinal,
    /// Finished. The result stays readable until the frame is destroyed.
    Completed,
    /// Released.
    Destroyed,
    /// The frame moved to another thread; the handle no longer reaches it.
    HandedOff,
}

impl State {
    pub fn is_suspended(self) -> bool {
        matches!(self, State::SuspendedYield)
    }

    /// No resume can succeed from this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Completed | State::Destroyed | State::HandedOff)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::NotStarted => "not started",
            State::Running => "running",
            State::SuspendedYield => "suspended",
            State::SuspendedFinal => "final suspended",
            State::Completed => "completed",
            State::Destroyed => "destroyed",
            State::HandedOff => "handed off",
        };
        f.write_str(name)
    }
}

/// Whether construction runs the body up to its first pause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InitialSuspend {
    /// Run to the first suspension point (or completion) on construction.
    #[default]
    Eager,
    /// Pause before the body runs; the first resume enters it.
    Lazy,
}

/// What happens to a frame once its body returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FinalSuspend {
    /// Stay at [`State::Completed`] with the result readable.
    #[default]
    Always,
    /// Destroy the frame as soon as the final transfer is decided.
    Never,
}

/// Construction policy of a frame.
#[derive(Clone, Default)]
pub struct Config {
    pub initial_suspend: InitialSuspend,
    pub final_suspend: FinalSuspend,
    observer: Option<Arc<dyn Observer>>,
}

impl Config {
    pub fn eager() -> Self {
        Self::default()
    }

    pub fn lazy() -> Self {
        Self::default().with_initial_suspend(InitialSuspend::Lazy)
    }

    pub fn with_initial_suspend(mut self, initial_suspend: InitialSuspend) -> Self {
        self.initial_suspend = initial_suspend;
        self
    }

    pub fn with_final_suspend(mut self, final_suspend: FinalSuspend) -> Self {
        self.final_suspend = final_suspend;
        self
    }

    /// Attach an event sink that sees every hook of the frame.
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn observer(&self) -> Option<&Arc<dyn Observer>> {
        self.observer.as_ref()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("initial_suspend", &self.initial_suspend)
            .field("final_suspend", &self.final_suspend)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// How a resume ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Paused at a suspension point; the driver keeps control.
    Suspended,
    /// Finished; control goes back to the awaiting parent frame.
    Transfer(FrameId),
    /// Finished with nobody waiting. There is no further work.
    Finished,
    /// The frame destroyed itself at a suspension point.
    Destroyed,
    /// The frame moved to another thread.
    HandedOff,
}

/// A frame reachable without knowing its body type.
///
/// This is what [`Transfer::To`] runs and what parent links are set through.
pub trait Resume {
    fn frame_id(&self) -> FrameId;

    fn frame_state(&self) -> State;

    /// Run the frame to its next suspension point or completion.
    fn try_resume(&mut self) -> Result<Outcome, Fault>;

    /// Record the frame that awaits this one. Set at most once.
    fn link_parent(&mut self, parent: FrameId) -> Result<(), Fault>;
}

/// What follows a suspension.
enum Next {
    Continue,
    Pause { transferred: bool },
    Destroy,
}

pub(crate) struct Frame<B: Body> {
    id: FrameId,
    state: State,
    body: Option<B>,
    /// Awaiter of the suspension point the frame is paused at.
    pending: Option<B::Awaiter>,
    /// The pending awaiter moved control into a frame that has not handed it back.
    transferred: bool,
    current: Option<B::Yield>,
    result: Option<B::Return>,
    parent: Option<FrameId>,
    config: Config,
}

impl<B: Body> Frame<B> {
    pub(crate) fn new(body: B, config: Config) -> Self {
        Self {
            id: FrameId::next(),
            state: State::NotStarted,
            body: Some(body),
            pending: None,
            transferred: false,
            current: None,
            result: None,
            parent: None,
            config,
        }
    }

    pub(crate) fn id(&self) -> FrameId {
        self.id
    }

    pub(crate) fn state(&self) -> State {
        self.state
    }

    pub(crate) fn parent(&self) -> Option<FrameId> {
        self.parent
    }

    pub(crate) fn peek_value(&self) -> Result<&B::Yield, Fault> {
        match (self.state, &self.current) {
            (State::SuspendedYield, Some(value)) => Ok(value),
            (State::Destroyed, _) => Err(Fault::ResumedDestroyed { frame: self.id }),
            _ => Err(Fault::NoValue { frame: self.id }),
        }
    }

    pub(crate) fn take_value(&mut self) -> Option<B::Yield> {
        if self.state.is_suspended() {
            self.current.take()
        } else {
            None
        }
    }

    pub(crate) fn result(&self) -> Option<&B::Return> {
        self.result.as_ref()
    }

    pub(crate) fn take_result(&mut self) -> Option<B::Return> {
        self.result.take()
    }

    pub(crate) fn link_parent(&mut self, parent: FrameId) -> Result<(), Fault> {
        match self.state {
            State::Completed => return Err(Fault::ResumedCompleted { frame: self.id }),
            State::Destroyed => return Err(Fault::ResumedDestroyed { frame: self.id }),
            _ => {}
        }
        if let Some(existing) = self.parent {
            return Err(Fault::AlreadyAwaited {
                frame: self.id,
                parent: existing,
            });
        }
        self.parent = Some(parent);
        Ok(())
    }

    /// Release the body, the pending awaiter and both value slots. Idempotent.
    pub(crate) fn destroy(&mut self) {
        if self.state == State::Destroyed {
            return;
        }
        self.pending = None;
        self.current = None;
        self.result = None;
        self.body = None;
        self.state = State::Destroyed;
        self.emit(Event::Destroyed);
    }

    pub(crate) fn emit(&self, event: Event) {
        tracing::trace!(frame = %self.id, %event);
        if let Some(observer) = &self.config.observer {
            observer.on_event(self.id, event);
        }
    }

    /// Drive the body to its next pause.
    ///
    /// A handoff requested by the awaiter it pauses at is left in `launcher`.
    pub(crate) fn resume(&mut self, launcher: &mut Option<Launcher>) -> Result<Outcome, Fault> {
        match self.state {
            State::NotStarted => {
                self.state = State::Running;
                self.emit(Event::Started);
                let point = self.body_mut()?.start();
                self.advance(point, launcher)
            }
            State::SuspendedYield => {
                let Some(mut awaiter) = self.pending.take() else {
                    return Err(Fault::Poisoned { frame: self.id });
                };
                self.current = None;
                self.state = State::Running;
                self.emit(Event::Resumed);

                if std::mem::take(&mut self.transferred) {
                    let rerun = match awaiter.transfer_target() {
                        Some(target) => {
                            let target_id = target.frame_id();
                            self.emit(Event::Transferred { to: target_id });
                            Some(self.settle(target_id, target.try_resume()?)?)
                        }
                        None => None,
                    };
                    if let Some(Next::Pause { transferred }) = rerun {
                        return Ok(self.pause(awaiter, transferred));
                    }
                }

                let point = self.body_mut()?.resume(awaiter.on_resume());
                self.advance(point, launcher)
            }
            State::Completed => Err(Fault::ResumedCompleted { frame: self.id }),
            State::Destroyed => Err(Fault::ResumedDestroyed { frame: self.id }),
            State::HandedOff => Err(Fault::HandedOff { frame: self.id }),
            State::Running | State::SuspendedFinal => Err(Fault::Poisoned { frame: self.id }),
        }
    }

    fn advance(
        &mut self,
        mut point: Point<B>,
        launcher: &mut Option<Launcher>,
    ) -> Result<Outcome, Fault> {
        loop {
            let mut awaiter = match point {
                Suspend::Yield(value, awaiter) => {
                    self.current = Some(value);
                    self.emit(Event::Yielded);
                    awaiter
                }
                Suspend::Await(awaiter) => awaiter,
                Suspend::Return(value) => return Ok(self.finish(value)),
            };

            if awaiter.ready() {
                self.emit(Event::Ready);
                self.current = None;
                point = self.body_mut()?.resume(awaiter.on_resume());
                continue;
            }

            self.state = State::SuspendedYield;
            self.emit(Event::Suspended);

            let mut cx = Suspension::new(self.id, launcher);
            let next = match awaiter.on_suspend(&mut cx) {
                Ok(Transfer::Continue) => Next::Pause { transferred: false },
                Ok(Transfer::Destroy) => Next::Destroy,
                Ok(Transfer::To(target)) => {
                    let target_id = target.frame_id();
                    self.emit(Event::Transferred { to: target_id });
                    match target.try_resume().and_then(|ran| self.settle(target_id, ran)) {
                        Ok(next) => next,
                        Err(fault) => {
                            self.state = State::Running;
                            return Err(fault);
                        }
                    }
                }
                Err(fault) => {
                    self.state = State::Running;
                    return Err(fault);
                }
            };

            match next {
                Next::Continue => {
                    self.state = State::Running;
                    self.current = None;
                    self.emit(Event::Resumed);
                    point = self.body_mut()?.resume(awaiter.on_resume());
                }
                Next::Pause { transferred } => return Ok(self.pause(awaiter, transferred)),
                Next::Destroy => {
                    drop(awaiter);
                    self.destroy();
                    return Ok(Outcome::Destroyed);
                }
            }
        }
    }

    /// Decide what follows once a frame we transferred into gives control back.
    fn settle(&self, target: FrameId, ran: Outcome) -> Result<Next, Fault> {
        match ran {
            Outcome::Transfer(to) if to == self.id => Ok(Next::Continue),
            Outcome::Transfer(to) => Err(Fault::MisdirectedTransfer {
                frame: target,
                target: to,
                expected: self.id,
            }),
            Outcome::Suspended | Outcome::HandedOff => Ok(Next::Pause { transferred: true }),
            // Unlinked target; its result is already readable.
            Outcome::Finished => Ok(Next::Continue),
            Outcome::Destroyed => Err(Fault::MissingResult { frame: target }),
        }
    }

    fn pause(&mut self, awaiter: B::Awaiter, transferred: bool) -> Outcome {
        self.state = State::SuspendedYield;
        self.pending = Some(awaiter);
        self.transferred = transferred;
        Outcome::Suspended
    }

    fn finish(&mut self, value: B::Return) -> Outcome {
        self.current = None;
        self.result = Some(value);
        self.emit(Event::Returned);

        self.state = State::SuspendedFinal;
        self.emit(Event::FinalSuspend);
        let outcome = match self.parent {
            Some(parent) => Outcome::Transfer(parent),
            None => Outcome::Finished,
        };

        match self.config.final_suspend {
            FinalSuspend::Always => {
                self.state = State::Completed;
                self.emit(Event::Completed);
            }
            FinalSuspend::Never => self.destroy(),
        }
        outcome
    }

    fn body_mut(&mut self) -> Result<&mut B, Fault> {
        self.body
            .as_mut()
            .ok_or(Fault::ResumedDestroyed { frame: self.id })
    }
}
