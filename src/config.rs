// TiltKey — Hardware & System Configuration
// Target: Seeed Studio Xiao ESP32-C3 (RISC-V)

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (Xiao ESP32-C3 pinout)
// ---------------------------------------------------------------------------
pub const PIN_LED_STEP_1: i32 = 2;   // D0 — Step 1 indicator (flat confirmed)
pub const PIN_LED_STEP_2: i32 = 3;   // D1 — Step 2 indicator (right confirmed)
pub const PIN_LED_STEP_3: i32 = 4;   // D2 — Step 3 indicator (up confirmed)
pub const PIN_LED_RED: i32 = 5;      // D3 — Bicolor status LED, red leg
pub const PIN_I2C_SDA: i32 = 6;      // D4 — I2C data line
pub const PIN_I2C_SCL: i32 = 7;      // D5 — I2C clock line
pub const PIN_LED_GREEN: i32 = 8;    // D8 — Bicolor status LED, green leg
pub const PIN_LED_HEARTBEAT: i32 = 10; // D10 — Sampling heartbeat

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_MPU6050: u8 = 0x68;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks
pub const I2C_BAUDRATE_KHZ: u32 = 400;

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_MONITOR: usize = 4096;
pub const STACK_SEQUENCE: usize = 4096;

// ---------------------------------------------------------------------------
// Orientation classification
// ---------------------------------------------------------------------------
pub const SAMPLE_PERIOD_MS: u64 = 20;  // 50 Hz
pub const ACCEL_COUNTS_PER_G: i32 = 4096; // LSB/g at ±8 g (MPU6050) and ±2 g/14-bit
pub const ENTRY_THRESHOLD: i16 = 90;   // % of g, exclusive
pub const EXIT_THRESHOLD: i16 = 80;    // % of g, hysteresis bound

// ---------------------------------------------------------------------------
// Gesture sequence windows (milliseconds)
// ---------------------------------------------------------------------------
pub const FLAT_MIN_DWELL_MS: u32 = 10_000;
pub const RIGHT_MIN_DWELL_MS: u32 = 2_000;
pub const RIGHT_MAX_DWELL_MS: u32 = 6_000;
pub const UP_MIN_DWELL_MS: u32 = 4_000;
pub const UP_MAX_DWELL_MS: u32 = 8_000;
pub const GRACE_WINDOW_MS: u32 = 500;

// ---------------------------------------------------------------------------
// Terminal-state parking
// ---------------------------------------------------------------------------
pub const PARK_INTERVAL_SECS: u64 = 60;
