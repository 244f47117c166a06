// TiltKey — orientation-gesture unlock
//
// Two cooperating tasks share nothing but an event-flag set:
//   - the monitor classifies accelerometer samples into orientations and
//     publishes FLAT / RIGHT / UP / CHANGE events;
//   - the validator consumes those events and times a FLAT → RIGHT → UP → FLAT
//     gesture, ending in success, a timing error or a sequence error.

pub mod clock;
pub mod config;
pub mod events;
pub mod hal;
pub mod orientation;
pub mod sequence;
pub mod tasks;

#[cfg(target_os = "espidf")]
pub mod drivers;

#[cfg(not(target_os = "espidf"))]
pub mod sim;
