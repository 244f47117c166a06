// TiltKey — Gesture Sequence Validator
//
// Walks the user through FLAT → RIGHT → UP → FLAT.  Each timed step measures
// how long the previous orientation was held (from step entry to the CHANGE
// event), then gives the user a short grace window to reach the next
// orientation.  Success and both failure kinds are terminal until reset.

use crate::config::*;
use crate::events::{EventFlags, EventSource, Timeout};
use crate::hal::{Clock, DiagnosticSink, Indicators, StatusColor, StepIndicator};

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceState {
    /// Waiting for the device to be laid flat.
    #[default]
    StepOn,
    StepFlat,
    StepRight,
    StepUp,
    /// Gesture completed.
    Trigger,
    TimeError,
    SequenceError,
}

impl SequenceState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Trigger | Self::TimeError | Self::SequenceError)
    }
}

/// A timed step: an orientation that must be held, then left for the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Flat,
    Right,
    Up,
}

impl Step {
    fn min_dwell_ms(self) -> u32 {
        match self {
            Self::Flat => FLAT_MIN_DWELL_MS,
            Self::Right => RIGHT_MIN_DWELL_MS,
            Self::Up => UP_MIN_DWELL_MS,
        }
    }

    /// Upper bound on the hold, which is also the CHANGE wait timeout.
    fn max_dwell_ms(self) -> Option<u32> {
        match self {
            Self::Flat => None,
            Self::Right => Some(RIGHT_MAX_DWELL_MS),
            Self::Up => Some(UP_MAX_DWELL_MS),
        }
    }

    /// Hold duration accepted: `[min, max)`, or `[min, ∞)` for FLAT.
    fn dwell_accepted(self, elapsed_ms: u32) -> bool {
        elapsed_ms >= self.min_dwell_ms() && self.max_dwell_ms().map_or(true, |max| elapsed_ms < max)
    }

    /// Orientation that must follow within the grace window.
    fn next_orientation(self) -> EventFlags {
        match self {
            Self::Flat => EventFlags::RIGHT,
            Self::Right => EventFlags::UP,
            Self::Up => EventFlags::FLAT,
        }
    }

    fn on_success(self) -> SequenceState {
        match self {
            Self::Flat => SequenceState::StepRight,
            Self::Right => SequenceState::StepUp,
            Self::Up => SequenceState::Trigger,
        }
    }

    /// Step indicators lit while this step is in progress.
    fn lit(self) -> &'static [StepIndicator] {
        match self {
            Self::Flat => &StepIndicator::ALL[..1],
            Self::Right => &StepIndicator::ALL[..2],
            Self::Up => &StepIndicator::ALL[..3],
        }
    }

    /// Indicator switched on when this step is confirmed.  `None` for the
    /// last step, whose confirmation clears the progress LEDs instead.
    fn confirms(self) -> Option<StepIndicator> {
        StepIndicator::ALL.get(self.lit().len()).copied()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why the gesture failed.  `Display` is the diagnostic line shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GestureError {
    /// The hold was too short, too long, or never ended.
    #[error("Timing error")]
    Timing { step: Step, elapsed_ms: u32 },
    /// Timing was fine but the expected orientation did not follow in time.
    #[error("Sequence error")]
    Sequence { step: Step, expected: EventFlags },
}

impl GestureError {
    pub fn state(self) -> SequenceState {
        match self {
            Self::Timing { .. } => SequenceState::TimeError,
            Self::Sequence { .. } => SequenceState::SequenceError,
        }
    }

    pub fn step(self) -> Step {
        match self {
            Self::Timing { step, .. } | Self::Sequence { step, .. } => step,
        }
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

pub struct SequenceValidator<E, C, I, D> {
    events: E,
    clock: C,
    indicators: I,
    diagnostics: D,
    state: SequenceState,
    failure: Option<GestureError>,
}

impl<E, C, I, D> SequenceValidator<E, C, I, D>
where
    E: EventSource,
    C: Clock,
    I: Indicators,
    D: DiagnosticSink,
{
    pub fn new(events: E, clock: C, indicators: I, diagnostics: D) -> Self {
        Self {
            events,
            clock,
            indicators,
            diagnostics,
            state: SequenceState::default(),
            failure: None,
        }
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// The error that ended the sequence, if it failed.
    pub fn failure(&self) -> Option<GestureError> {
        self.failure
    }

    pub fn indicators(&self) -> &I {
        &self.indicators
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    /// Run one state handler.  Terminal states return immediately without
    /// touching the event flags.
    pub fn step(&mut self) -> SequenceState {
        let next = match self.state {
            SequenceState::StepOn => self.on_step_on(),
            SequenceState::StepFlat => self.on_timed_step(Step::Flat),
            SequenceState::StepRight => self.on_timed_step(Step::Right),
            SequenceState::StepUp => self.on_timed_step(Step::Up),
            terminal @ (SequenceState::Trigger
            | SequenceState::TimeError
            | SequenceState::SequenceError) => return terminal,
        };

        if next != self.state {
            log::info!("Sequence: {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        next
    }

    /// Step until a terminal state is reached and return it.
    pub fn run_until_terminal(&mut self) -> SequenceState {
        loop {
            let state = self.step();
            if state.is_terminal() {
                return state;
            }
        }
    }

    fn on_step_on(&mut self) -> SequenceState {
        if self.events.wait_any(EventFlags::FLAT, Timeout::Forever).is_err() {
            return SequenceState::StepOn;
        }
        self.indicators.set_step(StepIndicator::One, true);
        SequenceState::StepFlat
    }

    fn on_timed_step(&mut self, step: Step) -> SequenceState {
        match self.check_step(step) {
            Ok(()) => {
                self.confirm(step);
                step.on_success()
            }
            Err(err) => self.fail(err),
        }
    }

    fn check_step(&mut self, step: Step) -> Result<(), GestureError> {
        let started = self.clock.now_ms();
        let timeout = step.max_dwell_ms().map_or(Timeout::Forever, Timeout::Millis);
        let changed = self.events.wait_any(EventFlags::CHANGE, timeout);
        let elapsed_ms = self.clock.now_ms().wrapping_sub(started);

        if changed.is_err() || !step.dwell_accepted(elapsed_ms) {
            return Err(GestureError::Timing { step, elapsed_ms });
        }

        let expected = step.next_orientation();
        self.events
            .wait_any(expected, Timeout::Millis(GRACE_WINDOW_MS))
            .map_err(|_| GestureError::Sequence { step, expected })?;

        log::debug!("{:?} held for {} ms, {:?} confirmed", step, elapsed_ms, expected);
        Ok(())
    }

    fn confirm(&mut self, step: Step) {
        match step.confirms() {
            Some(indicator) => self.indicators.set_step(indicator, true),
            None => {
                for &indicator in step.lit() {
                    self.indicators.set_step(indicator, false);
                }
                self.indicators.set_status(StatusColor::Green, true);
            }
        }
    }

    fn fail(&mut self, err: GestureError) -> SequenceState {
        for &indicator in err.step().lit() {
            self.indicators.set_step(indicator, false);
        }
        self.indicators.set_status(StatusColor::Red, true);
        self.diagnostics.write_line(&err.to_string());
        log::error!("Gesture failed: {:?}", err);

        self.failure = Some(err);
        err.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WaitTimeout;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    // -----------------------------------------------------------------------
    // Virtual time: events are scripted at absolute offsets and a wait jumps
    // straight to the next matching event or to its deadline.
    // -----------------------------------------------------------------------

    struct Script {
        base: u32,
        now: Cell<u64>,
        pending: Cell<EventFlags>,
        upcoming: RefCell<VecDeque<(u64, EventFlags)>>,
        waits: Cell<usize>,
    }

    #[derive(Clone)]
    struct Virtual(Rc<Script>);

    impl Virtual {
        fn starting_at(base: u32) -> Self {
            Self(Rc::new(Script {
                base,
                now: Cell::new(0),
                pending: Cell::new(EventFlags::empty()),
                upcoming: RefCell::new(VecDeque::new()),
                waits: Cell::new(0),
            }))
        }

        fn new() -> Self {
            Self::starting_at(0)
        }

        fn at(&self, ms: u64, flags: EventFlags) -> &Self {
            self.0.upcoming.borrow_mut().push_back((ms, flags));
            self
        }

        fn elapsed(&self) -> u64 {
            self.0.now.get()
        }

        fn waits(&self) -> usize {
            self.0.waits.get()
        }
    }

    impl EventSource for Virtual {
        fn wait_any(&self, mask: EventFlags, timeout: Timeout) -> Result<EventFlags, WaitTimeout> {
            let s = &self.0;
            s.waits.set(s.waits.get() + 1);
            let deadline = match timeout {
                Timeout::Forever => None,
                Timeout::Millis(ms) => Some(s.now.get() + u64::from(ms)),
            };

            loop {
                let pending = s.pending.get();
                let matched = pending & mask;
                if !matched.is_empty() {
                    s.pending.set(pending - matched);
                    return Ok(matched);
                }

                let next = s.upcoming.borrow().front().copied();
                match (next, deadline) {
                    (Some((at, flags)), _) if deadline.map_or(true, |d| at <= d) => {
                        s.upcoming.borrow_mut().pop_front();
                        s.now.set(s.now.get().max(at));
                        s.pending.set(pending | flags);
                    }
                    (_, Some(d)) => {
                        s.now.set(d);
                        return Err(WaitTimeout(mask));
                    }
                    (None, None) => panic!("waiting forever for {:?} with nothing scripted", mask),
                    (Some(_), None) => unreachable!(),
                }
            }
        }
    }

    impl Clock for Virtual {
        fn now_ms(&self) -> u32 {
            self.0.base.wrapping_add(self.0.now.get() as u32)
        }
    }

    #[derive(Debug, Default)]
    struct Leds {
        steps: [bool; 3],
        red: bool,
        green: bool,
    }

    impl Indicators for Leds {
        fn set_step(&mut self, step: StepIndicator, on: bool) {
            let index = match step {
                StepIndicator::One => 0,
                StepIndicator::Two => 1,
                StepIndicator::Three => 2,
            };
            self.steps[index] = on;
        }

        fn set_status(&mut self, color: StatusColor, on: bool) {
            match color {
                StatusColor::Red => self.red = on,
                StatusColor::Green => self.green = on,
            }
        }
    }

    #[derive(Debug, Default)]
    struct Lines(Vec<String>);

    impl DiagnosticSink for Lines {
        fn write_line(&mut self, line: &str) {
            self.0.push(line.to_owned());
        }
    }

    type TestValidator = SequenceValidator<Virtual, Virtual, Leds, Lines>;

    fn validator(script: &Virtual) -> TestValidator {
        SequenceValidator::new(script.clone(), script.clone(), Leds::default(), Lines::default())
    }

    /// Script the successful FLAT step starting at `t`.  Returns when STEP_RIGHT begins.
    fn script_flat_ok(script: &Virtual, t: u64) -> u64 {
        script
            .at(t, EventFlags::FLAT)
            .at(t + 10_000, EventFlags::CHANGE)
            .at(t + 10_100, EventFlags::RIGHT);
        t + 10_100
    }

    // -----------------------------------------------------------------------
    // STEP_ON / STEP_FLAT
    // -----------------------------------------------------------------------

    #[test]
    fn flat_starts_the_sequence() {
        let script = Virtual::new();
        script.at(250, EventFlags::FLAT);
        let mut v = validator(&script);

        assert_eq!(v.step(), SequenceState::StepFlat);
        assert_eq!(v.indicators().steps, [true, false, false]);
    }

    #[test]
    fn step_on_ignores_other_orientations() {
        let script = Virtual::new();
        script
            .at(100, EventFlags::RIGHT)
            .at(200, EventFlags::CHANGE)
            .at(300, EventFlags::FLAT);
        let mut v = validator(&script);

        assert_eq!(v.step(), SequenceState::StepFlat);
        assert_eq!(script.elapsed(), 300);
    }

    #[test]
    fn flat_held_exactly_ten_seconds_advances() {
        let script = Virtual::new();
        script_flat_ok(&script, 0);
        let mut v = validator(&script);

        v.step();
        assert_eq!(v.step(), SequenceState::StepRight);
        assert_eq!(v.indicators().steps, [true, true, false]);
        assert!(v.failure().is_none());
    }

    #[test]
    fn flat_held_9999_ms_is_a_timing_error() {
        let script = Virtual::new();
        script
            .at(0, EventFlags::FLAT)
            .at(9_999, EventFlags::CHANGE)
            .at(10_050, EventFlags::RIGHT);
        let mut v = validator(&script);

        v.step();
        assert_eq!(v.step(), SequenceState::TimeError);
        assert_eq!(
            v.failure(),
            Some(GestureError::Timing { step: Step::Flat, elapsed_ms: 9_999 })
        );
        assert_eq!(v.indicators().steps, [false, false, false]);
        assert!(v.indicators().red);
        assert!(!v.indicators().green);
        assert_eq!(v.diagnostics().0, vec!["Timing error".to_owned()]);
    }

    #[test]
    fn flat_waits_indefinitely_for_the_change() {
        let script = Virtual::new();
        script
            .at(0, EventFlags::FLAT)
            .at(600_000, EventFlags::CHANGE)
            .at(600_010, EventFlags::RIGHT);
        let mut v = validator(&script);

        v.step();
        assert_eq!(v.step(), SequenceState::StepRight);
    }

    #[test]
    fn flat_without_right_in_grace_window_is_a_sequence_error() {
        let script = Virtual::new();
        script
            .at(0, EventFlags::FLAT)
            .at(10_000, EventFlags::CHANGE)
            .at(10_501, EventFlags::RIGHT);
        let mut v = validator(&script);

        v.step();
        assert_eq!(v.step(), SequenceState::SequenceError);
        assert_eq!(script.elapsed(), 10_500);
        assert_eq!(
            v.failure(),
            Some(GestureError::Sequence { step: Step::Flat, expected: EventFlags::RIGHT })
        );
        assert_eq!(v.indicators().steps, [false, false, false]);
        assert!(v.indicators().red);
        assert_eq!(v.diagnostics().0, vec!["Sequence error".to_owned()]);
    }

    #[test]
    fn next_orientation_already_pending_is_accepted() {
        let script = Virtual::new();
        script
            .at(0, EventFlags::FLAT)
            .at(10_000, EventFlags::CHANGE | EventFlags::RIGHT);
        let mut v = validator(&script);

        v.step();
        assert_eq!(v.step(), SequenceState::StepRight);
    }

    // -----------------------------------------------------------------------
    // STEP_RIGHT
    // -----------------------------------------------------------------------

    fn right_scenario(hold_ms: Option<u64>, up_after_ms: Option<u64>) -> TestValidator {
        let script = Virtual::new();
        let t = script_flat_ok(&script, 0);
        if let Some(hold) = hold_ms {
            script.at(t + hold, EventFlags::CHANGE);
            if let Some(up) = up_after_ms {
                script.at(t + hold + up, EventFlags::UP);
            }
        }
        let mut v = validator(&script);
        v.step();
        v.step();
        assert_eq!(v.state(), SequenceState::StepRight);
        v.step();
        v
    }

    #[test]
    fn right_change_at_exactly_two_seconds_is_accepted() {
        let v = right_scenario(Some(2_000), Some(100));
        assert_eq!(v.state(), SequenceState::StepUp);
        assert_eq!(v.indicators().steps, [true, true, true]);
    }

    #[test]
    fn right_change_at_1999_ms_is_a_timing_error() {
        let v = right_scenario(Some(1_999), Some(100));
        assert_eq!(v.state(), SequenceState::TimeError);
        assert_eq!(v.indicators().steps, [false, false, false]);
        assert_eq!(v.diagnostics().0, vec!["Timing error".to_owned()]);
    }

    #[test]
    fn right_held_past_six_seconds_times_out() {
        let v = right_scenario(Some(6_001), Some(100));
        assert_eq!(v.state(), SequenceState::TimeError);
        assert_eq!(
            v.failure(),
            Some(GestureError::Timing { step: Step::Right, elapsed_ms: 6_000 })
        );
    }

    #[test]
    fn right_change_on_the_deadline_is_outside_the_window() {
        let v = right_scenario(Some(6_000), Some(100));
        assert_eq!(v.state(), SequenceState::TimeError);
    }

    #[test]
    fn right_without_up_for_600_ms_is_a_sequence_error() {
        let v = right_scenario(Some(3_000), Some(600));
        assert_eq!(v.state(), SequenceState::SequenceError);
        assert_eq!(v.indicators().steps, [false, false, false]);
        assert!(v.indicators().red);
        assert_eq!(v.diagnostics().0, vec!["Sequence error".to_owned()]);
    }

    // -----------------------------------------------------------------------
    // STEP_UP and the full gesture
    // -----------------------------------------------------------------------

    /// Script everything up to STEP_UP; returns its start offset.
    fn script_until_up(script: &Virtual) -> u64 {
        let t = script_flat_ok(script, 0);
        script
            .at(t + 3_000, EventFlags::CHANGE)
            .at(t + 3_050, EventFlags::UP);
        t + 3_050
    }

    #[test]
    fn up_hold_window_is_four_to_eight_seconds() {
        for (hold, expected) in [
            (3_999, SequenceState::TimeError),
            (4_000, SequenceState::Trigger),
            (7_999, SequenceState::Trigger),
            (8_000, SequenceState::TimeError),
            (9_000, SequenceState::TimeError),
        ] {
            let script = Virtual::new();
            let t = script_until_up(&script);
            script
                .at(t + hold, EventFlags::CHANGE)
                .at(t + hold + 20, EventFlags::FLAT);
            let mut v = validator(&script);

            assert_eq!(v.run_until_terminal(), expected, "hold = {}", hold);
        }
    }

    #[test]
    fn up_without_flat_is_a_sequence_error() {
        let script = Virtual::new();
        let t = script_until_up(&script);
        script
            .at(t + 5_000, EventFlags::CHANGE)
            .at(t + 5_100, EventFlags::RIGHT);
        let mut v = validator(&script);

        assert_eq!(v.run_until_terminal(), SequenceState::SequenceError);
        assert_eq!(
            v.failure(),
            Some(GestureError::Sequence { step: Step::Up, expected: EventFlags::FLAT })
        );
        assert_eq!(v.indicators().steps, [false, false, false]);
    }

    #[test]
    fn full_gesture_triggers_and_stays_terminal() {
        let script = Virtual::new();
        let t = script_until_up(&script);
        script
            .at(t + 5_000, EventFlags::CHANGE)
            .at(t + 5_200, EventFlags::FLAT)
            // Input after success must not matter.
            .at(t + 6_000, EventFlags::CHANGE)
            .at(t + 6_100, EventFlags::RIGHT);
        let mut v = validator(&script);

        assert_eq!(v.run_until_terminal(), SequenceState::Trigger);
        assert!(v.failure().is_none());
        assert_eq!(v.indicators().steps, [false, false, false]);
        assert!(v.indicators().green);
        assert!(!v.indicators().red);
        assert!(v.diagnostics().0.is_empty());

        let waits = script.waits();
        for _ in 0..10 {
            assert_eq!(v.step(), SequenceState::Trigger);
        }
        assert_eq!(script.waits(), waits);
    }

    #[test]
    fn each_confirmation_lights_the_next_step() {
        assert_eq!(Step::Flat.confirms(), Some(StepIndicator::Two));
        assert_eq!(Step::Right.confirms(), Some(StepIndicator::Three));
        assert_eq!(Step::Up.confirms(), None);

        let script = Virtual::new();
        let t = script_until_up(&script);
        script.at(t + 5_000, EventFlags::CHANGE).at(t + 5_200, EventFlags::FLAT);
        let mut v = validator(&script);

        let mut seen = Vec::new();
        while !v.state().is_terminal() {
            let state = v.step();
            seen.push((state, v.indicators().steps, v.indicators().green));
        }
        assert_eq!(
            seen,
            vec![
                (SequenceState::StepFlat, [true, false, false], false),
                (SequenceState::StepRight, [true, true, false], false),
                (SequenceState::StepUp, [true, true, true], false),
                (SequenceState::Trigger, [false, false, false], true),
            ]
        );
    }

    #[test]
    fn failure_states_are_terminal() {
        let mut v = right_scenario(Some(1_000), None);
        assert_eq!(v.state(), SequenceState::TimeError);
        assert_eq!(v.step(), SequenceState::TimeError);
        assert_eq!(v.run_until_terminal(), SequenceState::TimeError);
        assert_eq!(v.diagnostics().0.len(), 1);
    }

    #[test]
    fn durations_survive_tick_wraparound() {
        let script = Virtual::starting_at(u32::MAX - 4_000);
        let t = script_until_up(&script);
        script
            .at(t + 4_500, EventFlags::CHANGE)
            .at(t + 4_600, EventFlags::FLAT);
        let mut v = validator(&script);

        assert_eq!(v.run_until_terminal(), SequenceState::Trigger);
    }

    #[test]
    fn diagnostic_text_names_the_error_class() {
        let timing = GestureError::Timing { step: Step::Up, elapsed_ms: 1 };
        let sequence = GestureError::Sequence { step: Step::Right, expected: EventFlags::UP };
        assert_eq!(timing.to_string(), "Timing error");
        assert_eq!(sequence.to_string(), "Sequence error");
        assert_eq!(timing.state(), SequenceState::TimeError);
        assert_eq!(sequence.state(), SequenceState::SequenceError);
    }
}
