// TiltKey — Orientation Classification
//
// Turns accelerometer samples into discrete orientation states.  Entry into a
// state needs the governing axis beyond ±90 % g; leaving it needs the axis to
// fall back inside ±80 % g, so readings between 80 and 90 never chatter.

use crate::config::{ACCEL_COUNTS_PER_G, ENTRY_THRESHOLD, EXIT_THRESHOLD};
use crate::events::EventFlags;

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

/// Raw accelerometer counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawAxes {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// One reading scaled to percent of 1 g (nominally ±200).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizedSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl NormalizedSample {
    pub fn from_raw(raw: RawAxes) -> Self {
        Self {
            x: scale(raw.x),
            y: scale(raw.y),
            z: scale(raw.z),
        }
    }
}

fn scale(counts: i16) -> i16 {
    // |counts| ≤ 32768 → |result| ≤ 800, always fits.
    (i32::from(counts) * 100 / ACCEL_COUNTS_PER_G) as i16
}

// ---------------------------------------------------------------------------
// Orientation state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrientationState {
    #[default]
    Intermediate,
    /// +z, face up.
    Flat,
    /// -z, face down.
    Over,
    /// -y.
    Right,
    /// +y.
    Left,
    /// -x.
    Up,
    /// +x.
    Down,
}

impl OrientationState {
    /// First axis beyond the entry threshold, tested z, y, x.
    fn entered(sample: NormalizedSample) -> Option<Self> {
        let NormalizedSample { x, y, z } = sample;
        if z > ENTRY_THRESHOLD {
            Some(Self::Flat)
        } else if z < -ENTRY_THRESHOLD {
            Some(Self::Over)
        } else if y < -ENTRY_THRESHOLD {
            Some(Self::Right)
        } else if y > ENTRY_THRESHOLD {
            Some(Self::Left)
        } else if x < -ENTRY_THRESHOLD {
            Some(Self::Up)
        } else if x > ENTRY_THRESHOLD {
            Some(Self::Down)
        } else {
            None
        }
    }

    /// Whether the governing axis has fallen back inside the exit threshold.
    fn receded(self, sample: NormalizedSample) -> bool {
        let NormalizedSample { x, y, z } = sample;
        match self {
            Self::Intermediate => false,
            Self::Flat => z < EXIT_THRESHOLD,
            Self::Over => z > -EXIT_THRESHOLD,
            Self::Right => y > -EXIT_THRESHOLD,
            Self::Left => y < EXIT_THRESHOLD,
            Self::Up => x > -EXIT_THRESHOLD,
            Self::Down => x < EXIT_THRESHOLD,
        }
    }

    /// Event published on entry.  Only the orientations the gesture uses
    /// are signalled.
    pub fn entry_event(self) -> Option<EventFlags> {
        match self {
            Self::Flat => Some(EventFlags::FLAT),
            Self::Right => Some(EventFlags::RIGHT),
            Self::Up => Some(EventFlags::UP),
            Self::Intermediate | Self::Over | Self::Left | Self::Down => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Hysteresis classifier.  Owns the current orientation; the rest of the
/// system only sees the events it returns.
#[derive(Debug, Default)]
pub struct OrientationMonitor {
    state: OrientationState,
}

impl OrientationMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> OrientationState {
        self.state
    }

    /// Advance the classifier by one sample and return the event to publish,
    /// if any.  At most one event per call.
    pub fn classify(&mut self, sample: NormalizedSample) -> Option<EventFlags> {
        match self.state {
            OrientationState::Intermediate => {
                let next = OrientationState::entered(sample)?;
                log::debug!("Orientation: {:?} ({:?})", next, sample);
                self.state = next;
                next.entry_event()
            }
            current if current.receded(sample) => {
                log::debug!("Orientation: left {:?} ({:?})", current, sample);
                self.state = OrientationState::Intermediate;
                Some(EventFlags::CHANGE)
            }
            _ => None,
        }
    }
}
