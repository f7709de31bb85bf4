//! Optional event sink for watching frames move through their hooks.
//!
//! Frames always emit `tracing` events. An [`Observer`] attached through
//! [`Config::with_observer`](crate::Config::with_observer) additionally receives
//! every [`Event`] synchronously, on the thread that runs the frame.

use std::fmt;

use parking_lot::Mutex;

use crate::frame::FrameId;

/// One observable step of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// The body was entered for the first time.
    Started,
    /// A suspension point was ready; the body continues without pausing.
    Ready,
    /// A value was published as the current value.
    Yielded,
    /// The frame paused at a suspension point.
    Suspended,
    /// The frame continued from a suspension point.
    Resumed,
    /// Control was handed to another frame.
    Transferred { to: FrameId },
    /// The body returned and its result was stored.
    Returned,
    /// The frame reached its final suspension point.
    FinalSuspend,
    /// The frame completed and keeps its result.
    Completed,
    /// The frame and everything it owns were released.
    Destroyed,
    /// Execution of the frame moved to another thread.
    HandedOff,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Started => f.write_str("started"),
            Event::Ready => f.write_str("ready"),
            Event::Yielded => f.write_str("yielded"),
            Event::Suspended => f.write_str("suspended"),
            Event::Resumed => f.write_str("resumed"),
            Event::Transferred { to } => write!(f, "transferred to {to}"),
            Event::Returned => f.write_str("returned"),
            Event::FinalSuspend => f.write_str("final suspend"),
            Event::Completed => f.write_str("completed"),
            Event::Destroyed => f.write_str("destroyed"),
            Event::HandedOff => f.write_str("handed off"),
        }
    }
}

/// Receives frame events.
pub trait Observer: Send + Sync {
    fn on_event(&self, frame: FrameId, event: Event);
}

impl<F> Observer for F
where
    F: Fn(FrameId, Event) + Send + Sync,
{
    fn on_event(&self, frame: FrameId, event: Event) {
        self(frame, event)
    }
}

/// An [`Observer`] that keeps every event it sees.
///
/// ```rust
/// use std::sync::Arc;
/// use coframe::{generator, Config, Event, Generator, Recorder};
///
/// let recorder = Arc::new(Recorder::default());
/// let mut values = vec![1].into_iter();
/// let gen = Generator::with_config(
///     generator::from_fn(move || values.next()),
///     Config::eager().with_observer(recorder.clone()),
/// );
/// assert_eq!(recorder.events_of(gen.id()), vec![Event::Started, Event::Yielded, Event::Suspended]);
/// ```
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<(FrameId, Event)>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event seen so far, in order.
    pub fn events(&self) -> Vec<(FrameId, Event)> {
        self.events.lock().clone()
    }

    /// The events of a single frame, in order.
    pub fn events_of(&self, frame: FrameId) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|(id, _)| *id == frame)
            .map(|(_, event)| *event)
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Observer for Recorder {
    fn on_event(&self, frame: FrameId, event: Event) {
        self.events.lock().push((frame, event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use test_env_log::test;

    #[test]
    fn test_recorder_filters_by_frame() {
        let recorder = Recorder::new();
        let a = FrameId::next();
        let b = FrameId::next();

        recorder.on_event(a, Event::Started);
        recorder.on_event(b, Event::Started);
        recorder.on_event(a, Event::Destroyed);

        assert_eq!(recorder.events_of(a), vec![Event::Started, Event::Destroyed]);
        assert_eq!(recorder.events().len(), 3);

        recorder.clear();
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_closures_are_observers() {
        let seen = Arc::new(AtomicUsize::new(0));
        let observer = {
            let seen = Arc::clone(&seen);
            move |_: FrameId, _: Event| {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        };

        observer.on_event(FrameId::next(), Event::Ready);
        observer.on_event(FrameId::next(), Event::Resumed);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_transfer_event_names_target() {
        let to = FrameId::next();
        assert_eq!(Event::Transferred { to }.to_string(), format!("transferred to {to}"));
    }
}
