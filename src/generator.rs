//! Pull-based sequences.
//!
//! A [`Generator`] wraps a frame whose every yield suspends, so each
//! [`advance`](Generator::advance) produces exactly one value. Eager generators run
//! to their first value on construction; lazy ones wait for the first `advance`.
//!
//! # Examples
//!
//! ```rust
//! use coframe::{generator, Generator};
//!
//! let (mut a, mut b) = (0, 1);
//! let fib = generator::from_fn(move || {
//!     (a, b) = (b, a + b);
//!     (a < 5).then_some(a)
//! });
//!
//! let mut gen = Generator::eager(fib);
//! let mut seen = Vec::new();
//! while !gen.done() {
//!     seen.push(*gen.value());
//!     gen.advance();
//! }
//! assert_eq!(seen, vec![1, 1, 2, 3]);
//! ```
//!
//! Generators are also iterators:
//!
//! ```rust
//! use coframe::{generator, Generator};
//!
//! let gen = Generator::lazy(generator::from_iter("abc".chars()));
//! assert_eq!(gen.collect::<String>(), "abc");
//! ```

use crate::awaiter::SuspendAlways;
use crate::body::Body;
use crate::error::{fatal, Fault};
use crate::frame::{Config, FrameId, InitialSuspend, State};
use crate::handle::Handle;
use crate::suspend::Suspend;

/// A sequence produced one suspension at a time.
pub struct Generator<B>
where
    B: Body<Return = (), Awaiter = SuspendAlways>,
{
    handle: Handle<B>,
    /// The iterator handed out the current value without advancing past it.
    consumed: bool,
}

impl<B> Generator<B>
where
    B: Body<Return = (), Awaiter = SuspendAlways>,
{
    pub fn eager(body: B) -> Self {
        Self::with_config(body, Config::eager())
    }

    pub fn lazy(body: B) -> Self {
        Self::with_config(body, Config::lazy())
    }

    pub fn new(body: B, initial_suspend: InitialSuspend) -> Self {
        Self::with_config(body, Config::default().with_initial_suspend(initial_suspend))
    }

    pub fn with_config(body: B, config: Config) -> Self {
        Self {
            handle: Handle::start(body, config),
            consumed: false,
        }
    }

    pub fn id(&self) -> FrameId {
        self.handle.id()
    }

    pub fn state(&self) -> State {
        self.handle.state()
    }

    /// Advance to the next value, or to exhaustion. Advancing an exhausted
    /// generator is fatal.
    pub fn advance(&mut self) {
        if let Err(fault) = self.try_advance() {
            fatal(fault)
        }
    }

    pub fn try_advance(&mut self) -> Result<(), Fault> {
        self.consumed = false;
        self.handle.try_resume().map(drop)
    }

    /// Whether the sequence is exhausted.
    pub fn done(&self) -> bool {
        self.handle.is_done()
    }

    /// The current value. Fatal unless the generator sits at a yield.
    pub fn value(&self) -> &B::Yield {
        self.try_value().unwrap_or_else(|fault| fatal(fault))
    }

    pub fn try_value(&self) -> Result<&B::Yield, Fault> {
        self.handle.peek_value()
    }

    pub fn into_handle(self) -> Handle<B> {
        self.handle
    }
}

impl<B> Iterator for Generator<B>
where
    B: Body<Return = (), Awaiter = SuspendAlways>,
{
    type Item = B::Yield;

    fn next(&mut self) -> Option<Self::Item> {
        if std::mem::take(&mut self.consumed) && self.handle.state().is_suspended() {
            self.handle.resume();
        }
        loop {
            match self.handle.state() {
                State::NotStarted => {
                    self.handle.resume();
                }
                State::SuspendedYield => match self.handle.take_value() {
                    Some(value) => {
                        self.consumed = true;
                        return Some(value);
                    }
                    None => {
                        self.handle.resume();
                    }
                },
                _ => return None,
            }
        }
    }
}

impl<B> std::fmt::Debug for Generator<B>
where
    B: Body<Return = (), Awaiter = SuspendAlways>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator").field("handle", &self.handle).finish()
    }
}

pub struct FromFn<F>(F);

impl<T, F> Body for FromFn<F>
where
    F: FnMut() -> Option<T>,
{
    type Yield = T;
    type Return = ();
    type Awaiter = SuspendAlways;

    fn start(&mut self) -> Suspend<T, SuspendAlways, ()> {
        match (self.0)() {
            Some(value) => Suspend::Yield(value, SuspendAlways),
            None => Suspend::Return(()),
        }
    }

    fn resume(&mut self, (): ()) -> Suspend<T, SuspendAlways, ()> {
        self.start()
    }
}

/// Create a generator body from a closure. The sequence ends at the first `None`.
pub fn from_fn<T, F>(f: F) -> FromFn<F>
where
    F: FnMut() -> Option<T>,
{
    FromFn(f)
}

pub struct FromIter<I>(I);

impl<I: Iterator> Body for FromIter<I> {
    type Yield = I::Item;
    type Return = ();
    type Awaiter = SuspendAlways;

    fn start(&mut self) -> Suspend<I::Item, SuspendAlways, ()> {
        match self.0.next() {
            Some(value) => Suspend::Yield(value, SuspendAlways),
            None => Suspend::Return(()),
        }
    }

    fn resume(&mut self, (): ()) -> Suspend<I::Item, SuspendAlways, ()> {
        self.start()
    }
}

/// Create a generator body that yields every item of `iter`.
pub fn from_iter<I: IntoIterator>(iter: I) -> FromIter<I::IntoIter> {
    FromIter(iter.into_iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::{Event, Recorder};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use test_env_log::test;

    fn fib_below(limit: u64) -> FromFn<impl FnMut() -> Option<u64>> {
        let (mut a, mut b) = (0, 1);
        from_fn(move || {
            (a, b) = (b, a + b);
            (a < limit).then_some(a)
        })
    }

    fn pump<B>(gen: &mut Generator<B>) -> Vec<B::Yield>
    where
        B: Body<Return = (), Awaiter = SuspendAlways>,
        B::Yield: Clone,
    {
        let mut seen = Vec::new();
        while !gen.done() {
            seen.push(gen.value().clone());
            gen.advance();
        }
        seen
    }

    #[test]
    fn test_eager_generator_has_first_value_at_construction() {
        let mut gen = Generator::eager(fib_below(5));
        assert_eq!(gen.state(), State::SuspendedYield);
        assert_eq!(*gen.value(), 1);

        assert_eq!(pump(&mut gen), vec![1, 1, 2, 3]);
        assert!(gen.done());
        assert!(matches!(gen.try_value(), Err(Fault::NoValue { .. })));
    }

    #[test]
    fn test_lazy_generator_waits_for_first_advance() {
        let mut gen = Generator::lazy(fib_below(5));
        assert_eq!(gen.state(), State::NotStarted);
        assert!(matches!(gen.try_value(), Err(Fault::NoValue { .. })));

        gen.advance();
        assert_eq!(pump(&mut gen), vec![1, 1, 2, 3]);
        assert!(gen.done());
    }

    #[test]
    fn test_one_value_per_advance() {
        let recorder = Arc::new(Recorder::new());
        let mut gen = Generator::with_config(fib_below(5), Config::eager().with_observer(recorder.clone()));
        let id = gen.id();
        let yields = || recorder.events_of(id).iter().filter(|e| **e == Event::Yielded).count();

        assert_eq!(yields(), 1);
        gen.advance();
        assert_eq!(yields(), 2);
        gen.advance();
        assert_eq!(yields(), 3);
    }

    #[test]
    #[should_panic(expected = "resumed after it completed")]
    fn test_advance_past_exhaustion_is_fatal() {
        let mut gen = Generator::eager(from_iter([1]));
        gen.advance();
        assert!(gen.done());
        gen.advance();
    }

    #[test]
    fn test_try_advance_reports_exhaustion() {
        let mut gen = Generator::eager(from_iter(Vec::<u8>::new()));
        assert!(gen.done());
        assert!(matches!(gen.try_advance(), Err(Fault::ResumedCompleted { .. })));
    }

    #[test]
    fn test_iterator_matches_pump_loop() {
        assert_eq!(Generator::eager(fib_below(5)).collect::<Vec<_>>(), vec![1, 1, 2, 3]);
        assert_eq!(Generator::lazy(fib_below(5)).collect::<Vec<_>>(), vec![1, 1, 2, 3]);
    }

    #[test]
    fn test_iterator_does_not_run_ahead_of_consumer() {
        let produced = std::cell::Cell::new(0);
        let mut gen = Generator::lazy(from_fn(|| {
            produced.set(produced.get() + 1);
            (produced.get() <= 3).then(|| produced.get())
        }));

        assert_eq!(gen.next(), Some(1));
        assert_eq!(produced.get(), 1);
        assert_eq!(gen.next(), Some(2));
        assert_eq!(produced.get(), 2);

        gen.advance();
        assert_eq!(*gen.value(), 3);
        assert_eq!(gen.next(), Some(3));
        assert_eq!(gen.next(), None);
        assert!(gen.done());
    }

    #[test]
    fn test_dropping_unfinished_generator_destroys_frame() {
        let recorder = Arc::new(Recorder::new());
        let gen = Generator::with_config(fib_below(100), Config::eager().with_observer(recorder.clone()));
        let id = gen.id();
        drop(gen);
        assert_eq!(recorder.events_of(id).last(), Some(&Event::Destroyed));
    }
}
