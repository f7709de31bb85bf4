//! # Coframe: Suspendable Computations
//!
//! Build computations that pause at well-defined points, hand control to whoever
//! drives them, and continue later with a value, on the same thread or another.
//!
//! ## Core Pieces
//!
//! - **[`Body`]**: the computation itself, written as an explicit state machine that
//!   stops at a [`Suspend`] point
//! - **[`Awaiter`]**: the `ready` / `on_suspend` / `on_resume` contract of one suspension point
//! - **[`Handle`]**: exclusive owner of a running frame; dropping it destroys the frame
//!
//! ## Built on Top
//!
//! - [`Generator`] - pull-based sequences, eager or lazy
//! - [`Task`] - lazily started work that can await other tasks
//! - [`maybe`] - computations that stop at the first missing value
//! - [`handoff`] - continuing a paused computation on a new thread
//!
//! ## Example
//!
//! ```
//! use coframe::*;
//!
//! let mut n = 0;
//! let mut handle = Handle::start(
//!     body::from_fn(move |_: Option<()>| {
//!         n += 1;
//!         if n <= 2 { Suspend::Yield(n, SuspendAlways) } else { Suspend::Return("done") }
//!     }),
//!     Config::eager(),
//! );
//!
//! while !handle.is_done() {
//!     println!("value: {}", handle.peek_value().unwrap());
//!     handle.resume();
//! }
//! assert_eq!(handle.result(), Some(&"done"));
//! ```
//!
//! ## Faults
//!
//! Misusing a frame, such as resuming it after completion, is a [`Fault`]. The
//! `try_*` operations return it; the plain operations treat it as fatal and panic.

mod awaiter;
pub mod body;
pub mod driver;
mod error;
mod frame;
pub mod generator;
mod handle;
pub mod handoff;
pub mod maybe;
mod observe;
pub mod prelude;
mod suspend;
pub mod task;

pub use awaiter::*;
pub use body::Body;
pub use error::*;
pub use frame::{Config, FinalSuspend, FrameId, InitialSuspend, Outcome, Resume, State};
pub use generator::Generator;
pub use handle::*;
pub use maybe::Maybe;
pub use observe::*;
pub use suspend::*;
pub use task::{Task, TaskAwaiter};
