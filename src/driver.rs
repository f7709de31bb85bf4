//! Functions for driving frames from the outside.
//!
//! These are the loops a driver would otherwise write by hand around a [`Handle`].

use crate::body::Body;
use crate::error::Fault;
use crate::frame::State;
use crate::handle::Handle;

/// Pump a frame, handing every published value to `consume` before resuming.
///
/// Stops once the frame completes, destroys itself or is handed off. A frame that
/// has not started is entered first.
///
/// ```rust
/// use coframe::{driver, generator, Config, Handle};
///
/// let mut handle = Handle::start(generator::from_iter([1, 2, 3]), Config::lazy());
/// let mut sum = 0;
/// driver::pump(&mut handle, |v| sum += v).unwrap();
/// assert_eq!(sum, 6);
/// assert!(handle.is_done());
/// ```
pub fn pump<B, F>(handle: &mut Handle<B>, mut consume: F) -> Result<(), Fault>
where
    B: Body,
    F: FnMut(&B::Yield),
{
    loop {
        match handle.state() {
            State::Completed | State::Destroyed | State::HandedOff => return Ok(()),
            State::SuspendedYield => {
                if let Ok(value) = handle.peek_value() {
                    consume(value);
                }
            }
            State::NotStarted | State::Running | State::SuspendedFinal => {}
        }
        handle.try_resume()?;
    }
}

/// Resume until the frame completes, then take its result.
pub fn run_to_completion<B: Body>(handle: &mut Handle<B>) -> Result<B::Return, Fault> {
    loop {
        match handle.state() {
            State::Completed => {
                return handle
                    .take_result()
                    .ok_or(Fault::MissingResult { frame: handle.id() });
            }
            State::Destroyed => return Err(Fault::MissingResult { frame: handle.id() }),
            State::HandedOff => return Err(Fault::HandedOff { frame: handle.id() }),
            _ => {
                handle.try_resume()?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awaiter::SuspendAlways;
    use crate::body::{self, just};
    use crate::frame::{Config, FinalSuspend};
    use crate::generator;
    use crate::suspend::Suspend;
    use pretty_assertions::assert_eq;
    use test_env_log::test;

    #[test]
    fn test_pump_sees_every_value_in_order() {
        let mut handle = Handle::start(generator::from_iter(["a", "b", "c"]), Config::eager());
        let mut seen = Vec::new();
        pump(&mut handle, |v| seen.push(*v)).unwrap();
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_pump_skips_pauses_without_value() {
        let mut step = 0;
        let body = body::from_fn(move |_: Option<()>| {
            step += 1;
            match step {
                1 => Suspend::Await(SuspendAlways),
                2 => Suspend::Yield(step, SuspendAlways),
                _ => Suspend::Return(()),
            }
        });
        let mut handle = Handle::start(body, Config::eager());
        let mut seen = Vec::new();
        pump(&mut handle, |v| seen.push(*v)).unwrap();
        assert_eq!(seen, vec![2]);
    }

    #[test]
    fn test_pump_on_destroyed_frame_is_noop() {
        let mut handle = Handle::start(generator::from_iter([1]), Config::eager());
        handle.destroy();
        pump(&mut handle, |_| panic!("no value expected")).unwrap();
    }

    #[test]
    fn test_run_to_completion_moves_result_out() {
        let mut handle = Handle::start(just(vec![1, 2]), Config::lazy());
        assert_eq!(run_to_completion(&mut handle).unwrap(), vec![1, 2]);
        assert!(matches!(
            run_to_completion(&mut handle),
            Err(Fault::MissingResult { .. })
        ));
    }

    #[test]
    fn test_run_to_completion_without_kept_result() {
        let config = Config::lazy().with_final_suspend(FinalSuspend::Never);
        let mut handle = Handle::start(just(1), config);
        assert!(matches!(
            run_to_completion(&mut handle),
            Err(Fault::MissingResult { .. })
        ));
    }
}
