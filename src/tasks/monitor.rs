// TiltKey — Orientation Monitor Task
//
// Samples the accelerometer every 20 ms, classifies the reading and publishes
// orientation events to the shared flag set.  Toggles the heartbeat LED on
// every cycle.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::*;
use crate::events::{EventFlagSet, EventFlags};
use crate::hal::{Accelerometer, DiagnosticSink, Heartbeat};
use crate::orientation::{NormalizedSample, OrientationMonitor};

pub fn monitor_task<A, H, D>(
    mut accel: A,
    mut heartbeat: H,
    mut diagnostics: D,
    flags: Arc<EventFlagSet>,
) where
    A: Accelerometer,
    H: Heartbeat,
    D: DiagnosticSink,
{
    log::info!("Monitor task started");

    // A failed init is reported once; sampling continues regardless.
    match accel.init() {
        Ok(()) => diagnostics.write_line("Accel init ok"),
        Err(e) => {
            log::error!("Accelerometer init failed: {:#}", e);
            diagnostics.write_line("Accel init failed");
        }
    }

    let mut monitor = OrientationMonitor::new();
    let mut faults = ReadFaults::default();
    let interval = Duration::from_millis(SAMPLE_PERIOD_MS);

    loop {
        let tick_start = Instant::now();

        sample_once(&mut monitor, &mut accel, &mut faults, &flags);
        heartbeat.toggle();

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}

/// Tracks a run of consecutive failed reads so a dead sensor warns once
/// instead of every cycle.
#[derive(Debug, Default)]
pub struct ReadFaults {
    consecutive: u32,
}

impl ReadFaults {
    /// Failed reads in the current run.
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Returns `true` for the first failure of a run.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.consecutive == 1
    }

    /// Ends the current run, returning its length if there was one.
    pub fn record_success(&mut self) -> Option<u32> {
        match std::mem::take(&mut self.consecutive) {
            0 => None,
            run => Some(run),
        }
    }
}

/// Read, normalise and classify one sample, publishing any resulting event.
pub fn sample_once<A: Accelerometer>(
    monitor: &mut OrientationMonitor,
    accel: &mut A,
    faults: &mut ReadFaults,
    flags: &EventFlagSet,
) -> Option<EventFlags> {
    let raw = match accel.read_axes() {
        Ok(raw) => {
            if let Some(run) = faults.record_success() {
                log::info!("Accelerometer recovered after {} failed reads", run);
            }
            raw
        }
        Err(e) => {
            if faults.record_failure() {
                log::warn!("Accelerometer read error: {}", e);
            } else {
                log::trace!("Accelerometer read error: {}", e);
            }
            return None;
        }
    };

    let event = monitor.classify(NormalizedSample::from_raw(raw))?;
    flags.set(event);
    Some(event)
}
