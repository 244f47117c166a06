// TiltKey — Firmware Entry Point
//
// Boot sequence:
//   1. Bring up logging, I2C (MPU6050) and the LED GPIOs.
//   2. Create the shared event-flag set.
//   3. Spawn the orientation monitor and sequence validator tasks.
//
// The validator ends in TRIGGER, TIME_ERROR or SEQUENCE_ERROR and stays there
// until the board is reset.
//
// On a workstation the same tasks run against a scripted accelerometer and
// console LEDs; pass `success`, `early` or `wrong-turn` to pick the gesture.

use std::sync::Arc;
use std::thread;

use tiltkey::config::*;
use tiltkey::events::EventFlagSet;
use tiltkey::hal::LogSink;
use tiltkey::tasks;

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use std::time::Duration;

    use esp_idf_hal::gpio::{OutputPin, PinDriver};
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;

    use tiltkey::drivers::imu::Mpu6050;
    use tiltkey::drivers::leds::{GpioHeartbeat, GpioIndicators};

    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("TiltKey firmware starting…");

    // ---- Peripherals ------------------------------------------------------
    let peripherals = Peripherals::take()?;

    // ---- I2C bus (MPU6050 only) -------------------------------------------
    let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio6, // SDA (PIN_I2C_SDA)
        peripherals.pins.gpio7, // SCL (PIN_I2C_SCL)
        &i2c_config,
    )?;
    log::info!("I2C bus on SDA GPIO{} / SCL GPIO{}", PIN_I2C_SDA, PIN_I2C_SCL);
    let imu = Mpu6050::new(i2c);

    // ---- LEDs -------------------------------------------------------------
    let indicators = GpioIndicators::new(
        [
            PinDriver::output(peripherals.pins.gpio2.downgrade_output())?, // PIN_LED_STEP_1
            PinDriver::output(peripherals.pins.gpio3.downgrade_output())?, // PIN_LED_STEP_2
            PinDriver::output(peripherals.pins.gpio4.downgrade_output())?, // PIN_LED_STEP_3
        ],
        PinDriver::output(peripherals.pins.gpio5.downgrade_output())?, // PIN_LED_RED
        PinDriver::output(peripherals.pins.gpio8.downgrade_output())?, // PIN_LED_GREEN
    );
    // PIN_LED_HEARTBEAT
    let heartbeat = GpioHeartbeat::new(PinDriver::output(peripherals.pins.gpio10.downgrade_output())?);
    log::info!(
        "LEDs: steps GPIO{}/{}/{}, status red GPIO{} green GPIO{}, heartbeat GPIO{}",
        PIN_LED_STEP_1,
        PIN_LED_STEP_2,
        PIN_LED_STEP_3,
        PIN_LED_RED,
        PIN_LED_GREEN,
        PIN_LED_HEARTBEAT
    );

    // ---- Shared state -----------------------------------------------------
    let flags = Arc::new(EventFlagSet::new());

    // ---- Spawn tasks (map to FreeRTOS tasks via std::thread) ---------------
    spawn_tasks(imu, heartbeat, indicators, flags)?;
    log::info!("Boot complete, waiting for the gesture");

    // Main thread has nothing left to do; park it forever.
    loop {
        thread::sleep(Duration::from_secs(PARK_INTERVAL_SECS));
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use tiltkey::sim::{ConsoleHeartbeat, ConsoleIndicators, GestureProfile, ScriptedAccelerometer};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let profile = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<GestureProfile>())
        .transpose()?
        .unwrap_or_default();
    log::info!("TiltKey host simulation ({:?} gesture)", profile);

    let flags = Arc::new(EventFlagSet::new());
    let accel = ScriptedAccelerometer::new(profile.segments());

    let monitor_flags = Arc::clone(&flags);
    thread::Builder::new()
        .name("monitor".into())
        .stack_size(STACK_MONITOR)
        .spawn(move || {
            tasks::monitor::monitor_task(accel, ConsoleHeartbeat::default(), LogSink, monitor_flags);
        })?;

    // Run the validator here so the process exits once it settles.
    let state = tasks::sequence::run_sequence(flags, ConsoleIndicators, LogSink);
    log::info!("Final state: {:?}", state);
    Ok(())
}

#[cfg(target_os = "espidf")]
fn spawn_tasks(
    imu: tiltkey::drivers::imu::Mpu6050,
    heartbeat: tiltkey::drivers::leds::GpioHeartbeat,
    indicators: tiltkey::drivers::leds::GpioIndicators,
    flags: Arc<EventFlagSet>,
) -> anyhow::Result<()> {
    // Monitor task: tightest timing, samples every 20 ms.
    let monitor_flags = Arc::clone(&flags);
    thread::Builder::new()
        .name("monitor".into())
        .stack_size(STACK_MONITOR)
        .spawn(move || {
            tasks::monitor::monitor_task(imu, heartbeat, LogSink, monitor_flags);
        })?;

    // Sequence validator task
    thread::Builder::new()
        .name("sequence".into())
        .stack_size(STACK_SEQUENCE)
        .spawn(move || {
            tasks::sequence::sequence_task(flags, indicators, LogSink);
        })?;

    Ok(())
}
