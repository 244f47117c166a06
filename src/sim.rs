// TiltKey — Host Simulation
//
// Stand-ins for the board so the firmware logic can run on a workstation: an
// accelerometer that replays a scripted gesture against the system clock and
// LEDs that log their changes.

use std::str::FromStr;

use crate::clock::now_ms;
use crate::hal::{Accelerometer, Heartbeat, Indicators, StatusColor, StepIndicator};
use crate::orientation::RawAxes;

const ONE_G: i16 = 4096;

pub const FLAT: RawAxes = RawAxes { x: 0, y: 0, z: ONE_G };
pub const RIGHT: RawAxes = RawAxes { x: 0, y: -ONE_G, z: 0 };
pub const UP: RawAxes = RawAxes { x: -ONE_G, y: 0, z: 0 };
pub const TILTED: RawAxes = RawAxes { x: 0, y: -2048, z: 2048 };

/// Hold `axes` for `hold_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub hold_ms: u32,
    pub axes: RawAxes,
}

impl Segment {
    pub const fn new(hold_ms: u32, axes: RawAxes) -> Self {
        Self { hold_ms, axes }
    }
}

/// Canned gestures for the host binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureProfile {
    #[default]
    Success,
    /// Leaves FLAT before the ten second dwell.
    Early,
    /// Correct FLAT hold, then tilts UP instead of RIGHT.
    WrongTurn,
}

impl GestureProfile {
    pub fn segments(self) -> Vec<Segment> {
        match self {
            Self::Success => vec![
                Segment::new(10_400, FLAT),
                Segment::new(3_000, RIGHT),
                Segment::new(5_000, UP),
                Segment::new(0, FLAT),
            ],
            Self::Early => vec![Segment::new(4_000, FLAT), Segment::new(0, RIGHT)],
            Self::WrongTurn => vec![Segment::new(10_400, FLAT), Segment::new(0, UP)],
        }
    }
}

impl FromStr for GestureProfile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "early" => Ok(Self::Early),
            "wrong-turn" => Ok(Self::WrongTurn),
            other => anyhow::bail!(
                "unknown gesture profile {:?} (expected success, early or wrong-turn)",
                other
            ),
        }
    }
}

/// Replays segments in order from the moment `init` is called.  The last
/// segment is held forever.
pub struct ScriptedAccelerometer {
    segments: Vec<Segment>,
    started_ms: Option<u32>,
}

impl ScriptedAccelerometer {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            started_ms: None,
        }
    }

    /// Axes at `offset_ms` into the script.
    pub fn axes_at(&self, offset_ms: u32) -> RawAxes {
        let mut end = 0u32;
        for segment in &self.segments {
            end = end.saturating_add(segment.hold_ms);
            if offset_ms < end {
                return segment.axes;
            }
        }
        self.segments.last().map(|s| s.axes).unwrap_or(TILTED)
    }
}

impl Accelerometer for ScriptedAccelerometer {
    fn init(&mut self) -> anyhow::Result<()> {
        if self.segments.is_empty() {
            anyhow::bail!("empty gesture script");
        }
        self.started_ms = Some(now_ms());
        Ok(())
    }

    fn read_axes(&mut self) -> anyhow::Result<RawAxes> {
        let started = self
            .started_ms
            .ok_or_else(|| anyhow::anyhow!("scripted accelerometer not initialised"))?;
        Ok(self.axes_at(now_ms().wrapping_sub(started)))
    }
}

/// Logs LED changes instead of driving pins.
#[derive(Debug, Default)]
pub struct ConsoleIndicators;

impl Indicators for ConsoleIndicators {
    fn set_step(&mut self, step: StepIndicator, on: bool) {
        log::info!("LED {:?} {}", step, if on { "on" } else { "off" });
    }

    fn set_status(&mut self, color: StatusColor, on: bool) {
        log::info!("Status {:?} {}", color, if on { "on" } else { "off" });
    }
}

#[derive(Debug, Default)]
pub struct ConsoleHeartbeat {
    beats: u64,
}

impl Heartbeat for ConsoleHeartbeat {
    fn toggle(&mut self) {
        self.beats += 1;
        log::trace!("heartbeat {}", self.beats);
    }
}
