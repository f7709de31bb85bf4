//! Protocol violations and the fatal-abort policy.
//!
//! Every misuse of a frame is a [`Fault`]. The `try_*` operations hand faults back
//! as `Result`s; the plain operations pass them to [`fatal`], which never returns.
//! Running out of values in a short-circuit computation is not a fault.

use thiserror::Error;

use crate::frame::FrameId;

/// A driver bug or an unrecoverable computation failure.
#[derive(Debug, Error)]
pub enum Fault {
    #[error("frame {frame} resumed after it completed")]
    ResumedCompleted { frame: FrameId },

    #[error("frame {frame} used after it was destroyed")]
    ResumedDestroyed { frame: FrameId },

    #[error("frame {frame} resumed after its body faulted")]
    Poisoned { frame: FrameId },

    #[error("frame {frame} is not suspended at a yield point")]
    NoValue { frame: FrameId },

    #[error("task {frame} is already awaited by {parent}")]
    AlreadyAwaited { frame: FrameId, parent: FrameId },

    #[error("awaited task {frame} has no result to hand back")]
    MissingResult { frame: FrameId },

    #[error("frame {frame} handed control to {target} while {expected} was waiting for it")]
    MisdirectedTransfer {
        frame: FrameId,
        target: FrameId,
        expected: FrameId,
    },

    #[error("worker slot already holds an active thread")]
    SlotOccupied,

    #[error("frame {frame} was handed off to another thread")]
    HandedOff { frame: FrameId },

    #[error("frame {frame} cannot move to another thread; start it with `Handle::start_send`")]
    NotSendable { frame: FrameId },

    #[error("result slot was already filled")]
    ResultAlreadySet,

    #[error("empty value resumed into a bind")]
    EmptyBind,

    #[error("failed to spawn handoff worker for frame {frame}")]
    Spawn {
        frame: FrameId,
        #[source]
        source: std::io::Error,
    },
}

impl Fault {
    /// The frame the fault is about, when there is one.
    pub fn frame(&self) -> Option<FrameId> {
        match self {
            Fault::ResumedCompleted { frame }
            | Fault::ResumedDestroyed { frame }
            | Fault::Poisoned { frame }
            | Fault::NoValue { frame }
            | Fault::AlreadyAwaited { frame, .. }
            | Fault::MissingResult { frame }
            | Fault::MisdirectedTransfer { frame, .. }
            | Fault::HandedOff { frame }
            | Fault::NotSendable { frame }
            | Fault::Spawn { frame, .. } => Some(*frame),
            Fault::SlotOccupied | Fault::ResultAlreadySet | Fault::EmptyBind => None,
        }
    }
}

/// Abort on a protocol violation.
///
/// Logs the fault and panics with its message. Frames are never resumed past a fault.
#[track_caller]
#[cold]
pub fn fatal(fault: Fault) -> ! {
    tracing::error!(%fault, "protocol violation");
    panic!("{fault}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_env_log::test;

    #[test]
    fn test_fault_names_its_frame() {
        let frame = FrameId::next();
        let fault = Fault::AlreadyAwaited {
            frame,
            parent: FrameId::next(),
        };
        assert_eq!(fault.frame(), Some(frame));
        assert_eq!(Fault::SlotOccupied.frame(), None);
    }

    #[test]
    fn test_spawn_fault_keeps_source() {
        use std::error::Error as _;

        let fault = Fault::Spawn {
            frame: FrameId::next(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "no threads left"),
        };
        assert_eq!(fault.source().map(ToString::to_string).as_deref(), Some("no threads left"));
    }

    #[test]
    #[should_panic(expected = "worker slot already holds an active thread")]
    fn test_fatal_panics_with_message() {
        fatal(Fault::SlotOccupied);
    }
}
