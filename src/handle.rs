//! Exclusive ownership of a frame.
//!
//! A [`Handle`] is the only way to drive, inspect or release a frame. Dropping it
//! destroys the frame. Frames started with [`Handle::start_send`] may additionally
//! leave the handle as a [`Detached`] frame, which is how a suspension point moves
//! execution to another thread.

use std::any::Any;
use std::fmt;

use crate::body::Body;
use crate::error::{fatal, Fault};
use crate::frame::{Config, Frame, FrameId, InitialSuspend, Outcome, Resume, State};
use crate::observe::Event;

/// Receives a frame an awaiter asked to hand off, and arranges its next resume.
pub type Launcher = Box<dyn FnOnce(Detached) -> Result<(), Fault> + Send>;

enum Slot<B: Body> {
    Live(Box<Frame<B>>),
    Destroyed,
    HandedOff,
}

/// Owns a frame and drives it.
pub struct Handle<B: Body> {
    id: FrameId,
    slot: Slot<B>,
    detach: Option<fn(Handle<B>) -> Detached>,
}

impl<B: Body> Handle<B> {
    /// Create a frame for `body`. With [`InitialSuspend::Eager`] it runs to its first pause.
    ///
    /// ```rust
    /// use coframe::{body, Config, Handle, State};
    ///
    /// let handle = Handle::start(body::just(3), Config::eager());
    /// assert_eq!(handle.state(), State::Completed);
    /// assert_eq!(handle.result(), Some(&3));
    /// ```
    pub fn start(body: B, config: Config) -> Self {
        Self::try_start(body, config).unwrap_or_else(|fault| fatal(fault))
    }

    pub fn try_start(body: B, config: Config) -> Result<Self, Fault> {
        Self::launch(body, config, None)
    }

    fn launch(body: B, config: Config, detach: Option<fn(Handle<B>) -> Detached>) -> Result<Self, Fault> {
        let eager = config.initial_suspend == InitialSuspend::Eager;
        let frame = Box::new(Frame::new(body, config));
        let mut handle = Handle {
            id: frame.id(),
            slot: Slot::Live(frame),
            detach,
        };
        tracing::debug!(frame = %handle.id, eager, "frame created");
        if eager {
            handle.resume_frame()?;
        }
        Ok(handle)
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn state(&self) -> State {
        match &self.slot {
            Slot::Live(frame) => frame.state(),
            Slot::Destroyed => State::Destroyed,
            Slot::HandedOff => State::HandedOff,
        }
    }

    /// Whether the body ran to completion and the frame is still held.
    pub fn is_done(&self) -> bool {
        self.state() == State::Completed
    }

    pub fn parent(&self) -> Option<FrameId> {
        match &self.slot {
            Slot::Live(frame) => frame.parent(),
            _ => None,
        }
    }

    /// Run the frame to its next pause. Any fault is fatal.
    pub fn resume(&mut self) -> Outcome {
        self.resume_frame().unwrap_or_else(|fault| fatal(fault))
    }

    /// Run the frame to its next pause.
    ///
    /// Fails on a completed, destroyed or handed-off frame, or when an awaiter
    /// breaks the suspension protocol.
    pub fn try_resume(&mut self) -> Result<Outcome, Fault> {
        self.resume_frame()
    }

    fn resume_frame(&mut self) -> Result<Outcome, Fault> {
        let frame = self.frame_mut()?;
        let mut launcher = None;
        let outcome = frame.resume(&mut launcher)?;
        let released = frame.state() == State::Destroyed;

        if released {
            self.slot = Slot::Destroyed;
        }
        match launcher {
            Some(launch) if outcome == Outcome::Suspended => self.hand_off(launch),
            Some(_) => {
                tracing::warn!(frame = %self.id, ?outcome, "handoff dropped; frame did not stay suspended");
                Ok(outcome)
            }
            None => Ok(outcome),
        }
    }

    fn hand_off(&mut self, launch: Launcher) -> Result<Outcome, Fault> {
        let Some(detach) = self.detach else {
            return Err(Fault::NotSendable { frame: self.id });
        };
        if let Slot::Live(frame) = &self.slot {
            frame.emit(Event::HandedOff);
        }
        let moved = Handle {
            id: self.id,
            slot: std::mem::replace(&mut self.slot, Slot::HandedOff),
            detach: self.detach,
        };
        launch(detach(moved))?;
        Ok(Outcome::HandedOff)
    }

    /// The current value, if the frame is paused at a yield.
    pub fn peek_value(&self) -> Result<&B::Yield, Fault> {
        match &self.slot {
            Slot::Live(frame) => frame.peek_value(),
            Slot::Destroyed => Err(Fault::ResumedDestroyed { frame: self.id }),
            Slot::HandedOff => Err(Fault::HandedOff { frame: self.id }),
        }
    }

    /// Move the current value out. Later peeks see no value until the next yield.
    pub fn take_value(&mut self) -> Option<B::Yield> {
        match &mut self.slot {
            Slot::Live(frame) => frame.take_value(),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&B::Return> {
        match &self.slot {
            Slot::Live(frame) => frame.result(),
            _ => None,
        }
    }

    pub fn take_result(&mut self) -> Option<B::Return> {
        match &mut self.slot {
            Slot::Live(frame) => frame.take_result(),
            _ => None,
        }
    }

    /// Record the frame that awaits this one.
    pub fn link_parent(&mut self, parent: FrameId) -> Result<(), Fault> {
        self.frame_mut()?.link_parent(parent)
    }

    /// Release the frame. Idempotent; a handed-off frame is no longer ours to release.
    pub fn destroy(&mut self) {
        if let Slot::Live(frame) = &mut self.slot {
            frame.destroy();
            self.slot = Slot::Destroyed;
        }
    }

    fn frame_mut(&mut self) -> Result<&mut Frame<B>, Fault> {
        match &mut self.slot {
            Slot::Live(frame) => Ok(frame),
            Slot::Destroyed => Err(Fault::ResumedDestroyed { frame: self.id }),
            Slot::HandedOff => Err(Fault::HandedOff { frame: self.id }),
        }
    }
}

impl<B> Handle<B>
where
    B: Body + Send + 'static,
    B::Awaiter: Send,
    B::Yield: Send,
    B::Return: Send,
{
    /// Like [`Handle::start`], for frames that may be handed off to another thread.
    pub fn start_send(body: B, config: Config) -> Self {
        Self::try_start_send(body, config).unwrap_or_else(|fault| fatal(fault))
    }

    pub fn try_start_send(body: B, config: Config) -> Result<Self, Fault> {
        Self::launch(body, config, Some(Self::detach as fn(Handle<B>) -> Detached))
    }

    fn detach(handle: Self) -> Detached {
        Detached {
            frame: Box::new(handle),
        }
    }
}

impl<B: Body> Resume for Handle<B> {
    fn frame_id(&self) -> FrameId {
        self.id
    }

    fn frame_state(&self) -> State {
        self.state()
    }

    fn try_resume(&mut self) -> Result<Outcome, Fault> {
        self.resume_frame()
    }

    fn link_parent(&mut self, parent: FrameId) -> Result<(), Fault> {
        self.frame_mut()?.link_parent(parent)
    }
}

impl<B: Body> Drop for Handle<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<B: Body> fmt::Debug for Handle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

trait SendFrame: Resume + Send {
    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<B> SendFrame for Handle<B>
where
    B: Body + Send + 'static,
    B::Awaiter: Send,
    B::Yield: Send,
    B::Return: Send,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// A frame that left its handle to continue on another thread.
///
/// Dropping it destroys the frame.
pub struct Detached {
    frame: Box<dyn SendFrame>,
}

impl Detached {
    pub fn id(&self) -> FrameId {
        self.frame.frame_id()
    }

    pub fn state(&self) -> State {
        self.frame.frame_state()
    }

    pub fn is_done(&self) -> bool {
        self.state() == State::Completed
    }

    pub fn resume(&mut self) -> Outcome {
        self.frame.try_resume().unwrap_or_else(|fault| fatal(fault))
    }

    pub fn try_resume(&mut self) -> Result<Outcome, Fault> {
        self.frame.try_resume()
    }

    /// Recover the typed handle, to read the result or keep driving it.
    ///
    /// Gives the frame back unchanged if `B` is not its body type.
    pub fn into_handle<B>(self) -> Result<Handle<B>, Detached>
    where
        B: Body + Send + 'static,
        B::Awaiter: Send,
        B::Yield: Send,
        B::Return: Send,
    {
        if !self.frame.as_any().is::<Handle<B>>() {
            return Err(self);
        }
        match self.frame.into_any().downcast::<Handle<B>>() {
            Ok(handle) => Ok(*handle),
            Err(_) => unreachable!("frame type checked above"),
        }
    }
}

impl Resume for Detached {
    fn frame_id(&self) -> FrameId {
        self.id()
    }

    fn frame_state(&self) -> State {
        self.state()
    }

    fn try_resume(&mut self) -> Result<Outcome, Fault> {
        self.frame.try_resume()
    }

    fn link_parent(&mut self, parent: FrameId) -> Result<(), Fault> {
        self.frame.link_parent(parent)
    }
}

impl fmt::Debug for Detached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detached")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awaiter::{Awaiter, Suspension, SuspendAlways, Transfer};
    use crate::body::{self, just};
    use crate::observe::Recorder;
    use crate::suspend::Suspend;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;
    use test_env_log::test;

    type Parked = Arc<Mutex<Option<Detached>>>;

    /// Parks the suspended frame instead of leaving it with its handle.
    struct Relocate(Parked);

    impl Awaiter for Relocate {
        type Output = ();

        fn ready(&self) -> bool {
            false
        }

        fn on_suspend(&mut self, cx: &mut Suspension<'_>) -> Result<Transfer<'_>, Fault> {
            let parked = Arc::clone(&self.0);
            cx.hand_off(move |frame| {
                *parked.lock() = Some(frame);
                Ok(())
            });
            Ok(Transfer::Continue)
        }

        fn on_resume(self) {}
    }

    struct Relocating(Parked);

    impl Body for Relocating {
        type Yield = ();
        type Return = &'static str;
        type Awaiter = Relocate;

        fn start(&mut self) -> Suspend<(), Relocate, &'static str> {
            Suspend::Await(Relocate(Arc::clone(&self.0)))
        }

        fn resume(&mut self, (): ()) -> Suspend<(), Relocate, &'static str> {
            Suspend::Return("moved")
        }
    }

    fn pausing() -> impl Body<Yield = u8, Awaiter = SuspendAlways, Return = ()> {
        body::from_fn(|input: Option<()>| match input {
            None => Suspend::Yield(1, SuspendAlways),
            Some(()) => Suspend::Return(()),
        })
    }

    #[test]
    fn test_initial_suspend_decides_first_run() {
        let eager = Handle::start(pausing(), Config::eager());
        assert_eq!(eager.state(), State::SuspendedYield);
        assert_eq!(eager.peek_value().ok(), Some(&1));

        let mut lazy = Handle::start(pausing(), Config::lazy());
        assert_eq!(lazy.state(), State::NotStarted);
        assert_eq!(lazy.resume(), Outcome::Suspended);
        assert_eq!(lazy.take_value(), Some(1));
        assert!(matches!(lazy.peek_value(), Err(Fault::NoValue { .. })));
        assert_eq!(lazy.resume(), Outcome::Finished);
        assert!(lazy.is_done());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let recorder = Arc::new(Recorder::new());
        let mut handle = Handle::start(pausing(), Config::eager().with_observer(recorder.clone()));

        handle.destroy();
        handle.destroy();
        drop(handle);

        let destroyed = recorder
            .events()
            .into_iter()
            .filter(|(_, event)| *event == Event::Destroyed)
            .count();
        assert_eq!(destroyed, 1);
    }

    #[test]
    fn test_destroy_never_started_frame() {
        struct Tracked(Rc<Cell<bool>>);

        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let dropped = Rc::new(Cell::new(false));
        let tracked = Tracked(Rc::clone(&dropped));
        let recorder = Arc::new(Recorder::new());
        let mut handle = Handle::start(
            body::from_fn(move |_: Option<()>| {
                let _ = &tracked;
                Suspend::<(), SuspendAlways, ()>::Return(())
            }),
            Config::lazy().with_observer(recorder.clone()),
        );
        assert_eq!(handle.state(), State::NotStarted);
        assert!(!dropped.get());

        handle.destroy();
        assert_eq!(handle.state(), State::Destroyed);
        assert!(dropped.get());

        handle.destroy();
        assert_eq!(handle.state(), State::Destroyed);
        assert_eq!(recorder.events_of(handle.id()), vec![Event::Destroyed]);
    }

    #[test]
    fn test_destroyed_handle_rejects_use() {
        let mut handle = Handle::start(pausing(), Config::eager());
        handle.destroy();

        assert_eq!(handle.state(), State::Destroyed);
        assert!(matches!(handle.try_resume(), Err(Fault::ResumedDestroyed { .. })));
        assert!(matches!(handle.peek_value(), Err(Fault::ResumedDestroyed { .. })));
        assert_eq!(handle.result(), None);
    }

    #[test]
    fn test_drop_releases_suspended_frame() {
        let recorder = Arc::new(Recorder::new());
        let handle = Handle::start(pausing(), Config::eager().with_observer(recorder.clone()));
        let id = handle.id();
        drop(handle);

        assert_eq!(recorder.events_of(id).last(), Some(&Event::Destroyed));
    }

    #[test]
    #[should_panic(expected = "resumed after it completed")]
    fn test_resume_after_completion_is_fatal() {
        let mut handle = Handle::start(just(1), Config::eager());
        assert!(handle.is_done());
        handle.resume();
    }

    #[test]
    fn test_hand_off_moves_frame_out_of_handle() {
        let parked = Parked::default();
        let recorder = Arc::new(Recorder::new());
        let mut handle = Handle::start_send(
            Relocating(Arc::clone(&parked)),
            Config::eager().with_observer(recorder.clone()),
        );

        assert_eq!(handle.state(), State::HandedOff);
        assert!(matches!(handle.try_resume(), Err(Fault::HandedOff { .. })));
        assert!(recorder.events_of(handle.id()).contains(&Event::HandedOff));

        let mut frame = parked.lock().take().unwrap();
        assert_eq!(frame.id(), handle.id());
        assert_eq!(frame.resume(), Outcome::Finished);
        assert!(frame.is_done());

        let finished = frame.into_handle::<Relocating>().unwrap();
        assert_eq!(finished.result(), Some(&"moved"));
    }

    #[test]
    #[should_panic(expected = "resumed after it completed")]
    fn test_detached_resume_after_completion_is_fatal() {
        let parked = Parked::default();
        let _handle = Handle::start_send(Relocating(Arc::clone(&parked)), Config::eager());
        let mut frame = parked.lock().take().unwrap();

        assert_eq!(frame.resume(), Outcome::Finished);
        assert!(frame.is_done());
        frame.resume();
    }

    #[test]
    fn test_hand_off_needs_sendable_start() {
        let parked = Parked::default();
        let started = Handle::try_start(Relocating(Arc::clone(&parked)), Config::eager());

        assert!(matches!(started, Err(Fault::NotSendable { .. })));
        assert!(parked.lock().is_none());
    }

    #[test]
    fn test_into_handle_checks_body_type() {
        let parked = Parked::default();
        let _handle = Handle::start_send(Relocating(Arc::clone(&parked)), Config::eager());
        let frame = parked.lock().take().unwrap();
        let id = frame.id();

        let frame = frame.into_handle::<body::Just<u8>>().unwrap_err();
        assert_eq!(frame.id(), id);
        assert_eq!(frame.state(), State::SuspendedYield);
    }
}
