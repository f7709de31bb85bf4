//! The three-hook contract every suspension point implements.
//!
//! When a body stops at a suspension point the frame evaluates its [`Awaiter`]:
//!
//! 1. [`ready`](Awaiter::ready) is asked first. `true` skips suspension entirely and
//!    [`on_resume`](Awaiter::on_resume) runs in line.
//! 2. Otherwise the frame suspends and [`on_suspend`](Awaiter::on_suspend) picks a
//!    [`Transfer`]: keep the frame paused for the driver, run another frame, or
//!    destroy this one.
//! 3. When the frame continues, `on_resume` produces the value the body receives.
//!
//! ```rust
//! use coframe::{Awaiter, SuspendAlways, SuspendNever};
//!
//! assert!(SuspendNever.ready());
//! assert!(!SuspendAlways.ready());
//! ```

use either::Either;

use crate::error::Fault;
use crate::frame::{FrameId, Resume};
use crate::handle::{Detached, Launcher};

/// A suspension point.
pub trait Awaiter {
    /// Value handed back into the body when the frame continues.
    type Output;

    /// Whether suspension can be skipped.
    fn ready(&self) -> bool;

    /// Called once the frame has suspended. The returned [`Transfer`] decides who runs next.
    fn on_suspend(&mut self, cx: &mut Suspension<'_>) -> Result<Transfer<'_>, Fault>;

    /// Produces the result of the suspension point.
    fn on_resume(self) -> Self::Output;

    /// The frame control was transferred to, while that frame is still paused.
    ///
    /// A frame resumed after a [`Transfer::To`] that did not hand control back
    /// re-enters this target instead of its own body.
    fn transfer_target(&mut self) -> Option<&mut dyn Resume> {
        None
    }
}

/// Who runs after a suspension.
pub enum Transfer<'a> {
    /// Stay paused; the driver keeps control until it resumes the frame.
    Continue,
    /// Run another frame now.
    To(&'a mut dyn Resume),
    /// Destroy the suspended frame. `on_resume` never runs.
    Destroy,
}

impl Transfer<'_> {
    pub fn is_continue(&self) -> bool {
        matches!(self, Transfer::Continue)
    }

    pub fn is_destroy(&self) -> bool {
        matches!(self, Transfer::Destroy)
    }
}

impl std::fmt::Debug for Transfer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transfer::Continue => f.write_str("Continue"),
            Transfer::To(target) => f.debug_tuple("To").field(&target.frame_id()).finish(),
            Transfer::Destroy => f.write_str("Destroy"),
        }
    }
}

/// What an awaiter may see of the frame that just suspended.
pub struct Suspension<'a> {
    frame: FrameId,
    launcher: &'a mut Option<Launcher>,
}

impl<'a> Suspension<'a> {
    pub(crate) fn new(frame: FrameId, launcher: &'a mut Option<Launcher>) -> Self {
        Self { frame, launcher }
    }

    /// The suspended frame.
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Moves the suspended frame into `launch` once `on_suspend` returns [`Transfer::Continue`].
    ///
    /// The owning handle gives up the frame and calls `launch` with it, which is
    /// expected to arrange the next resume elsewhere. Only the last request of a
    /// suspension is kept.
    pub fn hand_off<F>(&mut self, launch: F)
    where
        F: FnOnce(Detached) -> Result<(), Fault> + Send + 'static,
    {
        *self.launcher = Some(Box::new(launch));
    }

    /// Whether a handoff was requested during this suspension.
    pub fn is_handing_off(&self) -> bool {
        self.launcher.is_some()
    }
}

/// Always suspends and hands the driver control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SuspendAlways;

impl Awaiter for SuspendAlways {
    type Output = ();

    fn ready(&self) -> bool {
        false
    }

    fn on_suspend(&mut self, _cx: &mut Suspension<'_>) -> Result<Transfer<'_>, Fault> {
        Ok(Transfer::Continue)
    }

    fn on_resume(self) {}
}

/// Never suspends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SuspendNever;

impl Awaiter for SuspendNever {
    type Output = ();

    fn ready(&self) -> bool {
        true
    }

    fn on_suspend(&mut self, _cx: &mut Suspension<'_>) -> Result<Transfer<'_>, Fault> {
        Ok(Transfer::Continue)
    }

    fn on_resume(self) {}
}

impl<L, R> Awaiter for Either<L, R>
where
    L: Awaiter,
    R: Awaiter<Output = L::Output>,
{
    type Output = L::Output;

    fn ready(&self) -> bool {
        match self {
            Either::Left(l) => l.ready(),
            Either::Right(r) => r.ready(),
        }
    }

    fn on_suspend(&mut self, cx: &mut Suspension<'_>) -> Result<Transfer<'_>, Fault> {
        match self {
            Either::Left(l) => l.on_suspend(cx),
            Either::Right(r) => r.on_suspend(cx),
        }
    }

    fn on_resume(self) -> Self::Output {
        match self {
            Either::Left(l) => l.on_resume(),
            Either::Right(r) => r.on_resume(),
        }
    }

    fn transfer_target(&mut self) -> Option<&mut dyn Resume> {
        match self {
            Either::Left(l) => l.transfer_target(),
            Either::Right(r) => r.transfer_target(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_env_log::test;

    #[test]
    fn test_suspend_always_keeps_driver_in_control() {
        let mut launcher = None;
        let mut cx = Suspension::new(FrameId::next(), &mut launcher);
        let mut awaiter = SuspendAlways;

        assert!(!awaiter.ready());
        assert!(awaiter.on_suspend(&mut cx).unwrap().is_continue());
        assert!(!cx.is_handing_off());
    }

    #[test]
    fn test_either_dispatches_to_active_side() {
        let left: Either<SuspendAlways, SuspendNever> = Either::Left(SuspendAlways);
        let right: Either<SuspendAlways, SuspendNever> = Either::Right(SuspendNever);

        assert!(!left.ready());
        assert!(right.ready());
        right.on_resume();
    }

    #[test]
    fn test_hand_off_records_launcher() {
        let mut launcher = None;
        let frame = FrameId::next();
        {
            let mut cx = Suspension::new(frame, &mut launcher);
            assert_eq!(cx.frame(), frame);
            cx.hand_off(|_detached| Ok(()));
            assert!(cx.is_handing_off());
        }
        assert!(launcher.is_some());
    }

    #[test]
    fn test_builtin_awaiters_have_no_transfer_target() {
        assert!(SuspendAlways.transfer_target().is_none());
        let mut either: Either<SuspendAlways, SuspendNever> = Either::Right(SuspendNever);
        assert!(either.transfer_target().is_none());
    }
}
