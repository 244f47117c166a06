// TiltKey — MPU6050 Accelerometer Driver
//
// Register-level driver over the ESP-IDF I2C master.  Only the accelerometer
// half of the chip is used; the gyro stays in its power-on state.

use esp_idf_hal::i2c::I2cDriver;

use crate::config::*;
use crate::hal::Accelerometer;
use crate::orientation::RawAxes;

// MPU6050 register addresses
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_CONFIG: u8 = 0x1A;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B; // Start of 6-byte accel burst
const REG_WHO_AM_I: u8 = 0x75;
const WHO_AM_I_EXPECTED: u8 = 0x68;

const ACCEL_FS_8G: u8 = 0x10; // 4096 LSB/g
const DLPF_21HZ: u8 = 0x04;

pub struct Mpu6050 {
    i2c: I2cDriver<'static>,
}

impl Mpu6050 {
    pub fn new(i2c: I2cDriver<'static>) -> Self {
        Self { i2c }
    }

    /// Verify the device is reachable on the I2C bus.
    pub fn is_connected(&mut self) -> bool {
        let mut buf = [0u8; 1];
        match self
            .i2c
            .write_read(I2C_ADDR_MPU6050, &[REG_WHO_AM_I], &mut buf, I2C_TIMEOUT_TICKS)
        {
            Ok(()) => buf[0] == WHO_AM_I_EXPECTED,
            Err(_) => false,
        }
    }

    fn write_register(&mut self, reg: u8, value: u8) -> anyhow::Result<()> {
        self.i2c
            .write(I2C_ADDR_MPU6050, &[reg, value], I2C_TIMEOUT_TICKS)?;
        Ok(())
    }
}

impl Accelerometer for Mpu6050 {
    /// Wake the sensor and configure accel ±8 g with the 21 Hz DLPF.
    fn init(&mut self) -> anyhow::Result<()> {
        if !self.is_connected() {
            anyhow::bail!("MPU6050 not answering at 0x{:02X}", I2C_ADDR_MPU6050);
        }

        // Wake up (clear SLEEP bit)
        self.write_register(REG_PWR_MGMT_1, 0x00)?;
        self.write_register(REG_CONFIG, DLPF_21HZ)?;
        self.write_register(REG_ACCEL_CONFIG, ACCEL_FS_8G)?;

        log::info!("MPU6050 initialised (±8g, DLPF 21Hz)");
        Ok(())
    }

    fn read_axes(&mut self) -> anyhow::Result<RawAxes> {
        let mut raw = [0u8; 6];
        self.i2c.write_read(
            I2C_ADDR_MPU6050,
            &[REG_ACCEL_XOUT_H],
            &mut raw,
            I2C_TIMEOUT_TICKS,
        )?;

        Ok(RawAxes {
            x: i16::from_be_bytes([raw[0], raw[1]]),
            y: i16::from_be_bytes([raw[2], raw[3]]),
            z: i16::from_be_bytes([raw[4], raw[5]]),
        })
    }
}
