//! Short-circuiting computations over optional values.
//!
//! Every suspension point of a maybe-computation is a [`Bind`] over an `Option`.
//! A present value is handed straight back into the body without pausing; an
//! absent one destroys the frame on the spot, so nothing after it runs. The result
//! travels through a [`ResultSlot`] that exists before the body starts.
//!
//! The awaiter of a maybe body is a single `Bind<U>`, so every bind in one
//! computation unwraps the same type `U`. Convert intermediate values before
//! binding them when the steps produce different types.
//!
//! ```rust
//! use coframe::maybe::{self, bind, Maybe};
//! use coframe::Suspend;
//!
//! fn halve(n: i32) -> Option<i32> {
//!     (n % 2 == 0).then_some(n / 2)
//! }
//!
//! fn quarter(n: i32) -> Maybe<i32> {
//!     Maybe::evaluate(maybe::from_fn(move |input: Option<i32>| match input {
//!         None => Suspend::Await(bind(halve(n))),
//!         Some(half) if half * 2 == n => Suspend::Await(bind(halve(half))),
//!         Some(quarter) => Suspend::Return(quarter),
//!     }))
//! }
//!
//! assert_eq!(quarter(12).into_option(), Some(3));
//! assert_eq!(quarter(6).into_option(), None);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::awaiter::{Awaiter, Suspension, Transfer};
use crate::body::{self, Body, Input};
use crate::error::{fatal, Fault};
use crate::frame::{Config, FinalSuspend, InitialSuspend};
use crate::handle::Handle;
use crate::suspend::Suspend;

/// Suspension point over an `Option`: continue with the value, or abort the computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind<T>(Option<T>);

pub fn bind<T>(value: Option<T>) -> Bind<T> {
    Bind(value)
}

impl<T> Awaiter for Bind<T> {
    type Output = T;

    fn ready(&self) -> bool {
        self.0.is_some()
    }

    fn on_suspend(&mut self, cx: &mut Suspension<'_>) -> Result<Transfer<'_>, Fault> {
        tracing::debug!(frame = %cx.frame(), "empty value, short-circuiting");
        Ok(Transfer::Destroy)
    }

    fn on_resume(self) -> T {
        self.0.unwrap_or_else(|| fatal(Fault::EmptyBind))
    }
}

/// Write end of a computation's result, shared with whoever reads it.
pub struct ResultSlot<T> {
    cell: Rc<RefCell<Option<T>>>,
}

impl<T> ResultSlot<T> {
    pub fn new() -> Self {
        Self {
            cell: Rc::new(RefCell::new(None)),
        }
    }

    /// Store the result. A slot is filled at most once.
    pub fn fill(&self, value: T) -> Result<(), Fault> {
        let mut cell = self.cell.borrow_mut();
        if cell.is_some() {
            return Err(Fault::ResultAlreadySet);
        }
        *cell = Some(value);
        Ok(())
    }

    pub fn is_filled(&self) -> bool {
        self.cell.borrow().is_some()
    }

    pub fn take(&self) -> Option<T> {
        self.cell.borrow_mut().take()
    }
}

impl<T> Clone for ResultSlot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ResultSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSlot")
            .field("filled", &self.is_filled())
            .finish()
    }
}

/// A body whose return value goes into a [`ResultSlot`].
pub struct Deliver<B: Body> {
    body: B,
    slot: ResultSlot<B::Return>,
}

/// Route the return value of `body` into `slot`.
pub fn deliver_into<B: Body>(body: B, slot: ResultSlot<B::Return>) -> Deliver<B> {
    Deliver { body, slot }
}

impl<B: Body> Deliver<B> {
    fn forward(&self, point: Suspend<B::Yield, B::Awaiter, B::Return>) -> Suspend<B::Yield, B::Awaiter, ()> {
        point.map_return(|value| {
            if let Err(fault) = self.slot.fill(value) {
                fatal(fault)
            }
        })
    }
}

impl<B: Body> Body for Deliver<B> {
    type Yield = B::Yield;
    type Return = ();
    type Awaiter = B::Awaiter;

    fn start(&mut self) -> Suspend<B::Yield, B::Awaiter, ()> {
        let point = self.body.start();
        self.forward(point)
    }

    fn resume(&mut self, input: Input<B>) -> Suspend<B::Yield, B::Awaiter, ()> {
        let point = self.body.resume(input);
        self.forward(point)
    }
}

/// Outcome of a maybe-computation: its result, or nothing if it short-circuited.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Maybe<T> {
    value: Option<T>,
}

impl<T> Maybe<T> {
    /// Run `body` to completion or to its first empty bind.
    pub fn evaluate<B, U>(body: B) -> Self
    where
        B: Body<Return = T, Awaiter = Bind<U>>,
    {
        Self::evaluate_with(body, Config::default())
    }

    /// Like [`Maybe::evaluate`], with the observer of `config`. The frame always starts
    /// eagerly and is destroyed as soon as it finishes.
    pub fn evaluate_with<B, U>(body: B, config: Config) -> Self
    where
        B: Body<Return = T, Awaiter = Bind<U>>,
    {
        let slot = ResultSlot::new();
        let config = config
            .with_initial_suspend(InitialSuspend::Eager)
            .with_final_suspend(FinalSuspend::Never);
        let handle = Handle::start(deliver_into(body, slot.clone()), config);
        tracing::trace!(frame = %handle.id(), state = %handle.state(), "maybe evaluated");
        drop(handle);
        Maybe { value: slot.take() }
    }

    pub fn is_some(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_none(&self) -> bool {
        self.value.is_none()
    }

    pub fn as_option(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_option(self) -> Option<T> {
        self.value
    }
}

impl<T> From<Maybe<T>> for Option<T> {
    fn from(maybe: Maybe<T>) -> Self {
        maybe.value
    }
}

/// Create a maybe-computation body from a closure. The closure sees `None` on entry
/// and the unwrapped value of every bind after that.
pub fn from_fn<U, R, F>(f: F) -> body::FromFn<F, Bind<U>>
where
    F: FnMut(Option<U>) -> Suspend<(), Bind<U>, R>,
{
    body::from_fn(f)
}
