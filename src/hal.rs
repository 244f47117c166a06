// TiltKey — Collaborator Contracts
//
// The state machines only talk to hardware through these traits.  The ESP-IDF
// implementations live in `drivers`, host stand-ins in `sim`.

use crate::orientation::RawAxes;

/// 3-axis accelerometer, raw counts at 4096 LSB/g.
pub trait Accelerometer {
    fn init(&mut self) -> anyhow::Result<()>;
    fn read_axes(&mut self) -> anyhow::Result<RawAxes>;
}

/// One of the three shield LEDs tracking gesture progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepIndicator {
    One,
    Two,
    Three,
}

impl StepIndicator {
    pub const ALL: [StepIndicator; 3] = [Self::One, Self::Two, Self::Three];
}

/// Leg of the bicolor status LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    Red,
    Green,
}

/// Step and status LEDs.  Fire-and-forget.
pub trait Indicators {
    fn set_step(&mut self, step: StepIndicator, on: bool);
    fn set_status(&mut self, color: StatusColor, on: bool);
}

/// LED toggled once per sampling cycle.
pub trait Heartbeat {
    fn toggle(&mut self);
}

/// Line-oriented text output for user-facing status messages.
pub trait DiagnosticSink {
    fn write_line(&mut self, line: &str);
}

/// Monotonic millisecond tick.  Wraps; callers use `wrapping_sub`.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Writes diagnostics through the logger, which is the UART console on the
/// device.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn write_line(&mut self, line: &str) {
        log::info!("{}", line);
    }
}
