//! The code a frame runs.
//!
//! A [`Body`] is written as an explicit state machine: [`start`](Body::start) runs it up
//! to its first stop, and every [`resume`](Body::resume) feeds in the output of the
//! awaiter it stopped at and runs it to the next one.
//!
//! # Examples
//!
//! ```rust
//! use coframe::{body, Body, Suspend, SuspendAlways};
//!
//! let mut countdown = 2;
//! let mut body = body::from_fn(move |_: Option<()>| {
//!     countdown -= 1;
//!     if countdown > 0 {
//!         Suspend::Yield(countdown, SuspendAlways)
//!     } else {
//!         Suspend::Return("liftoff")
//!     }
//! });
//!
//! assert_eq!(body.start().yielded_value(), Some(1));
//! assert_eq!(body.resume(()).return_value(), Some("liftoff"));
//! ```

use std::marker::PhantomData;

use either::Either;

use crate::awaiter::{Awaiter, SuspendNever};
use crate::suspend::Suspend;

/// Where a body of type `B` stopped.
pub type Point<B> = Suspend<<B as Body>::Yield, <B as Body>::Awaiter, <B as Body>::Return>;

/// What the awaiter of a body of type `B` hands back on resume.
pub type Input<B> = <<B as Body>::Awaiter as Awaiter>::Output;

/// A resumable computation.
///
/// The frame calls `start` exactly once and `resume` once per suspension point that
/// was not skipped. Neither is called after `Return`.
pub trait Body {
    /// Value published at a yield.
    type Yield;
    /// Final value.
    type Return;
    /// Suspension points of this body.
    type Awaiter: Awaiter;

    /// Run from entry to the first stop.
    fn start(&mut self) -> Suspend<Self::Yield, Self::Awaiter, Self::Return>;

    /// Continue with the output of the awaiter the body stopped at.
    fn resume(
        &mut self,
        input: <Self::Awaiter as Awaiter>::Output,
    ) -> Suspend<Self::Yield, Self::Awaiter, Self::Return>;

    fn boxed(self) -> Box<dyn Body<Yield = Self::Yield, Awaiter = Self::Awaiter, Return = Self::Return>>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

impl<B: Body + ?Sized> Body for Box<B> {
    type Yield = B::Yield;
    type Return = B::Return;
    type Awaiter = B::Awaiter;

    fn start(&mut self) -> Suspend<Self::Yield, Self::Awaiter, Self::Return> {
        (**self).start()
    }

    fn resume(&mut self, input: <Self::Awaiter as Awaiter>::Output) -> Suspend<Self::Yield, Self::Awaiter, Self::Return> {
        (**self).resume(input)
    }
}

impl<L, R> Body for Either<L, R>
where
    L: Body,
    R: Body<Yield = L::Yield, Return = L::Return, Awaiter = L::Awaiter>,
{
    type Yield = L::Yield;
    type Return = L::Return;
    type Awaiter = L::Awaiter;

    fn start(&mut self) -> Suspend<Self::Yield, Self::Awaiter, Self::Return> {
        match self {
            Either::Left(l) => l.start(),
            Either::Right(r) => r.start(),
        }
    }

    fn resume(&mut self, input: <Self::Awaiter as Awaiter>::Output) -> Suspend<Self::Yield, Self::Awaiter, Self::Return> {
        match self {
            Either::Left(l) => l.resume(input),
            Either::Right(r) => r.resume(input),
        }
    }
}

pub struct FromFn<F, A> {
    f: F,
    _awaiter: PhantomData<fn() -> A>,
}

impl<Y, A, R, F> Body for FromFn<F, A>
where
    A: Awaiter,
    F: FnMut(Option<A::Output>) -> Suspend<Y, A, R>,
{
    type Yield = Y;
    type Return = R;
    type Awaiter = A;

    fn start(&mut self) -> Suspend<Y, A, R> {
        (self.f)(None)
    }

    fn resume(&mut self, input: A::Output) -> Suspend<Y, A, R> {
        (self.f)(Some(input))
    }
}

/// Create a body from a closure.
///
/// The closure sees `None` on entry and `Some(output)` of the previous awaiter on
/// every resume after that.
///
/// ```rust
/// use coframe::{body, Body, Suspend, SuspendAlways};
///
/// let mut echo = body::from_fn(|input: Option<()>| match input {
///     None => Suspend::Yield("entered", SuspendAlways),
///     Some(()) => Suspend::Return(()),
/// });
/// assert_eq!(echo.start().yielded_value(), Some("entered"));
/// assert!(echo.resume(()).is_return());
/// ```
pub fn from_fn<Y, A, R, F>(f: F) -> FromFn<F, A>
where
    A: Awaiter,
    F: FnMut(Option<A::Output>) -> Suspend<Y, A, R>,
{
    FromFn {
        f,
        _awaiter: PhantomData,
    }
}

/// A body that returns at once.
pub struct Just<R>(Option<R>);

/// Create a body that returns `value` without suspending.
///
/// ```rust
/// use coframe::{body, Body};
///
/// assert_eq!(body::just(1).start().return_value(), Some(1));
/// ```
pub fn just<R>(value: R) -> Just<R> {
    Just(Some(value))
}

impl<R> Body for Just<R> {
    type Yield = ();
    type Return = R;
    type Awaiter = SuspendNever;

    fn start(&mut self) -> Suspend<(), SuspendNever, R> {
        Suspend::Return(self.0.take().expect("Just::can only be started once"))
    }

    fn resume(&mut self, (): ()) -> Suspend<(), SuspendNever, R> {
        self.start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awaiter::SuspendAlways;
    use pretty_assertions::assert_eq;
    use test_env_log::test;

    fn steps(limit: u32) -> FromFn<impl FnMut(Option<()>) -> Suspend<u32, SuspendAlways, u32>, SuspendAlways> {
        let mut n = 0;
        from_fn(move |_: Option<()>| {
            n += 1;
            if n < limit {
                Suspend::Yield(n, SuspendAlways)
            } else {
                Suspend::Return(n)
            }
        })
    }

    #[test]
    fn test_from_fn_sees_entry_then_inputs() {
        let mut seen = Vec::new();
        let mut body = from_fn(|input: Option<()>| {
            seen.push(input.is_some());
            if seen.len() < 3 {
                Suspend::<(), _, _>::Await(SuspendAlways)
            } else {
                Suspend::Return(seen.len())
            }
        });

        assert!(body.start().is_suspension());
        assert!(body.resume(()).is_suspension());
        assert_eq!(body.resume(()).return_value(), Some(3));
        drop(body);
        assert_eq!(seen, vec![false, true, true]);
    }

    #[test]
    fn test_boxed_body_delegates() {
        let mut body = steps(2).boxed();
        assert_eq!(body.start().yielded_value(), Some(1));
        assert_eq!(body.resume(()).return_value(), Some(2));
    }

    #[test]
    fn test_either_body_runs_chosen_side() {
        let choose = |limit| {
            if limit == 1 {
                Either::Left(steps(1))
            } else {
                Either::Right(steps(limit))
            }
        };
        let mut body = choose(3);
        assert_eq!(body.start().yielded_value(), Some(1));
        assert_eq!(body.resume(()).yielded_value(), Some(2));
        assert_eq!(body.resume(()).return_value(), Some(3));
    }

    #[test]
    #[should_panic(expected = "can only be started once")]
    fn test_just_returns_once() {
        let mut body = just("value");
        assert_eq!(body.start().return_value(), Some("value"));
        body.start();
    }
}
