//! Commonly used imports
//!
//! Use `use coframe::prelude::*;` for quick access to the most common types and functions.

// Core types
pub use crate::{Awaiter, Body, Handle, Suspend, SuspendAlways, SuspendNever};

// Frame policy
pub use crate::{Config, FinalSuspend, InitialSuspend, Outcome, State};

// Components
pub use crate::{Generator, Maybe, Task};
pub use crate::handoff::{switch_to_new_thread, WorkerSlot};
pub use crate::maybe::bind;

// Errors
pub use crate::{fatal, Fault};
