// TiltKey — LED Drivers
//
// Plain GPIO outputs, active HIGH.

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};

use crate::hal::{Heartbeat, Indicators, StatusColor, StepIndicator};

pub type Led = PinDriver<'static, AnyOutputPin, Output>;

fn drive(led: &mut Led, on: bool) {
    let result = if on { led.set_high() } else { led.set_low() };
    if let Err(e) = result {
        log::warn!("LED write failed: {}", e);
    }
}

/// Three step LEDs plus the red/green status LED.
pub struct GpioIndicators {
    steps: [Led; 3],
    red: Led,
    green: Led,
}

impl GpioIndicators {
    /// Takes ownership of the pins and switches everything off.
    pub fn new(steps: [Led; 3], red: Led, green: Led) -> Self {
        let mut indicators = Self { steps, red, green };
        for led in indicators.steps.iter_mut() {
            drive(led, false);
        }
        drive(&mut indicators.red, false);
        drive(&mut indicators.green, false);
        indicators
    }
}

impl Indicators for GpioIndicators {
    fn set_step(&mut self, step: StepIndicator, on: bool) {
        let led = match step {
            StepIndicator::One => &mut self.steps[0],
            StepIndicator::Two => &mut self.steps[1],
            StepIndicator::Three => &mut self.steps[2],
        };
        drive(led, on);
    }

    fn set_status(&mut self, color: StatusColor, on: bool) {
        match color {
            StatusColor::Red => drive(&mut self.red, on),
            StatusColor::Green => drive(&mut self.green, on),
        }
    }
}

pub struct GpioHeartbeat {
    pin: Led,
    lit: bool,
}

impl GpioHeartbeat {
    pub fn new(pin: Led) -> Self {
        Self { pin, lit: false }
    }
}

impl Heartbeat for GpioHeartbeat {
    fn toggle(&mut self) {
        self.lit = !self.lit;
        drive(&mut self.pin, self.lit);
    }
}
