// TiltKey — Sequence Validator Task
//
// Runs the gesture state machine against the shared flag set.  Once a
// terminal state is reached the task parks; only a reset starts a new attempt.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::clock::SystemClock;
use crate::config::PARK_INTERVAL_SECS;
use crate::events::EventFlagSet;
use crate::hal::{DiagnosticSink, Indicators};
use crate::sequence::{SequenceState, SequenceValidator};

pub fn sequence_task<I, D>(flags: Arc<EventFlagSet>, indicators: I, diagnostics: D)
where
    I: Indicators,
    D: DiagnosticSink,
{
    log::info!("Sequence task started");

    run_sequence(flags, indicators, diagnostics);

    log::info!("Sequence finished, reset to try again");
    loop {
        thread::sleep(Duration::from_secs(PARK_INTERVAL_SECS));
    }
}

/// Validate one gesture attempt on the system clock and return the terminal
/// state.
pub fn run_sequence<I, D>(flags: Arc<EventFlagSet>, indicators: I, diagnostics: D) -> SequenceState
where
    I: Indicators,
    D: DiagnosticSink,
{
    let mut validator = SequenceValidator::new(flags, SystemClock, indicators, diagnostics);
    let state = validator.run_until_terminal();

    match validator.failure() {
        Some(err) => log::error!("Gesture rejected in {:?}: {}", err.step(), err),
        None => log::info!("Gesture accepted"),
    }
    state
}
