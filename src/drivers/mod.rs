pub mod imu;
pub mod leds;
