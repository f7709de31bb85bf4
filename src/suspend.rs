/// Where a computation body stopped: at a suspension point, or at its return.
///
/// `Suspend` is the return type of [`Body::start`](crate::Body::start) and
/// [`Body::resume`](crate::Body::resume), similar to how `Option` represents
/// optional values and `Result` represents fallible operations.
///
/// - `Yield(value, awaiter)` publishes `value` as the frame's current value, then
///   evaluates `awaiter`.
/// - `Await(awaiter)` evaluates `awaiter` without publishing anything.
/// - `Return(result)` finishes the body.
///
/// # Examples
///
/// ```rust
/// use coframe::{Suspend, SuspendAlways};
///
/// let yielded: Suspend<i32, SuspendAlways, &str> = Suspend::Yield(42, SuspendAlways);
/// let finished: Suspend<i32, SuspendAlways, &str> = Suspend::Return("finished");
///
/// assert_eq!(yielded.map_yield(|x| x * 2).yielded_value(), Some(84));
/// assert!(finished.is_return());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suspend<Y, A, R> {
    /// Publish a value, then evaluate the awaiter
    Yield(Y, A),
    /// Evaluate the awaiter
    Await(A),
    /// Complete with a final value
    Return(R),
}

impl<Y, A, R> Suspend<Y, A, R> {
    /// Returns `true` if the body reached a suspension point.
    ///
    /// ```rust
    /// use coframe::{Suspend, SuspendAlways};
    ///
    /// let x: Suspend<(), SuspendAlways, u8> = Suspend::Await(SuspendAlways);
    /// assert!(x.is_suspension());
    /// ```
    #[inline]
    pub const fn is_suspension(&self) -> bool {
        !self.is_return()
    }

    /// Returns `true` if the body returned.
    #[inline]
    pub const fn is_return(&self) -> bool {
        matches!(self, Suspend::Return(_))
    }

    /// Returns `true` if a value is published by this point.
    #[inline]
    pub const fn is_yield(&self) -> bool {
        matches!(self, Suspend::Yield(_, _))
    }

    /// Converts into the published value, if any.
    ///
    /// ```rust
    /// use coframe::{Suspend, SuspendAlways};
    ///
    /// let x: Suspend<i32, SuspendAlways, ()> = Suspend::Yield(7, SuspendAlways);
    /// assert_eq!(x.yielded_value(), Some(7));
    ///
    /// let y: Suspend<i32, SuspendAlways, ()> = Suspend::Await(SuspendAlways);
    /// assert_eq!(y.yielded_value(), None);
    /// ```
    #[inline]
    pub fn yielded_value(self) -> Option<Y> {
        match self {
            Suspend::Yield(y, _) => Some(y),
            _ => None,
        }
    }

    /// Converts into the final value, if any.
    #[inline]
    pub fn return_value(self) -> Option<R> {
        match self {
            Suspend::Return(r) => Some(r),
            _ => None,
        }
    }

    /// Converts into the awaiter of the suspension point, if any.
    #[inline]
    pub fn into_awaiter(self) -> Option<A> {
        match self {
            Suspend::Yield(_, a) | Suspend::Await(a) => Some(a),
            Suspend::Return(_) => None,
        }
    }

    /// Borrows the awaiter of the suspension point, if any.
    #[inline]
    pub fn awaiter(&self) -> Option<&A> {
        match self {
            Suspend::Yield(_, a) | Suspend::Await(a) => Some(a),
            Suspend::Return(_) => None,
        }
    }

    /// Maps the published value, leaving other points untouched.
    #[inline]
    pub fn map_yield<Y2, F>(self, f: F) -> Suspend<Y2, A, R>
    where
        F: FnOnce(Y) -> Y2,
    {
        match self {
            Suspend::Yield(y, a) => Suspend::Yield(f(y), a),
            Suspend::Await(a) => Suspend::Await(a),
            Suspend::Return(r) => Suspend::Return(r),
        }
    }

    /// Maps the awaiter of the suspension point.
    ///
    /// ```rust
    /// use coframe::{Suspend, SuspendAlways, SuspendNever};
    /// use either::Either;
    ///
    /// let x: Suspend<(), SuspendAlways, ()> = Suspend::Await(SuspendAlways);
    /// let widened: Suspend<(), Either<SuspendAlways, SuspendNever>, ()> = x.map_awaiter(Either::Left);
    /// assert!(matches!(widened, Suspend::Await(Either::Left(SuspendAlways))));
    /// ```
    #[inline]
    pub fn map_awaiter<A2, F>(self, f: F) -> Suspend<Y, A2, R>
    where
        F: FnOnce(A) -> A2,
    {
        match self {
            Suspend::Yield(y, a) => Suspend::Yield(y, f(a)),
            Suspend::Await(a) => Suspend::Await(f(a)),
            Suspend::Return(r) => Suspend::Return(r),
        }
    }

    /// Maps the final value.
    ///
    /// ```rust
    /// use coframe::{Suspend, SuspendAlways};
    ///
    /// let x: Suspend<(), SuspendAlways, i32> = Suspend::Return(5);
    /// assert_eq!(x.map_return(|v| v * 2).return_value(), Some(10));
    /// ```
    #[inline]
    pub fn map_return<R2, F>(self, f: F) -> Suspend<Y, A, R2>
    where
        F: FnOnce(R) -> R2,
    {
        match self {
            Suspend::Yield(y, a) => Suspend::Yield(y, a),
            Suspend::Await(a) => Suspend::Await(a),
            Suspend::Return(r) => Suspend::Return(f(r)),
        }
    }

    /// Returns the final value.
    ///
    /// # Panics
    ///
    /// Panics with `msg` if the body suspended instead.
    #[inline]
    pub fn expect_return(self, msg: &str) -> R {
        match self {
            Suspend::Return(r) => r,
            _ => panic!("{}", msg),
        }
    }

    /// Returns the published value.
    ///
    /// # Panics
    ///
    /// Panics with `msg` if nothing is published.
    #[inline]
    pub fn expect_yield(self, msg: &str) -> Y {
        match self {
            Suspend::Yield(y, _) => y,
            _ => panic!("{}", msg),
        }
    }
}

impl<Y, A, R> Suspend<Y, A, Option<R>> {
    /// Transposes a `Suspend` of an `Option` return into an `Option` of a `Suspend`.
    ///
    /// A suspension point is always `Some`; `Return(None)` becomes `None`.
    #[inline]
    pub fn transpose(self) -> Option<Suspend<Y, A, R>> {
        match self {
            Suspend::Yield(y, a) => Some(Suspend::Yield(y, a)),
            Suspend::Await(a) => Some(Suspend::Await(a)),
            Suspend::Return(r) => r.map(Suspend::Return),
        }
    }
}
