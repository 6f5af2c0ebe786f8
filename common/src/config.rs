//! Build-time configuration of the sensor hub.

use portable_atomic::{AtomicU32, Ordering};

/// Number of message blocks shared by every task in the system.
pub const MAX_SYSTEM_MESSAGES: usize = 30;

/// Number of timers that may be armed concurrently.
pub const MAX_TIMERS: usize = 16;

/// Upper bound on any single task queue depth.
pub const MAX_QUEUE_DEPTH: usize = 64;

/// Kernel tick rate. Timer durations are given in ticks.
pub const TICKS_PER_SEC: u32 = 1000;
pub const MSEC_PER_TICK: u32 = 1000 / TICKS_PER_SEC;

/// Convert milliseconds to kernel ticks
pub const fn msec_to_ticks(msec: u32) -> u32 {
    msec / MSEC_PER_TICK
}

/// Sensor sampling period when no data-ready interrupt is used
pub const SENSOR_SAMPLE_PERIOD: u32 = msec_to_ticks(20);

/// Resolution of the free running timestamp counter [us]
pub const US_PER_RTC_TICK: u32 = 25;

/// Size of the formatting buffer for diagnostic text lines
pub const DPRINTF_BUFF_SIZE: usize = 200;

/// Longest line accepted by the debug console
pub const COMMAND_LINE_SIZE: usize = 32;

/// Correlation values used with the ASF timers
pub const TIMER_REF_RTC_UPDATE: u16 = 0x55A5;
pub const TIMER_REF_SENSOR_READ: u16 = 0x55B0;

/// Q-format fractional bit counts
pub const Q_PRECISE: u32 = 24;
pub const Q_EXTENDED: u32 = 12;
pub const Q_TIME: u32 = 24;

/// Identity reported through the I2C slave register window
pub const WHO_AM_I: u8 = 0x54;
pub const VERSION0: u8 = 0x01;
pub const VERSION1: u8 = 0x22;

bitflags::bitflags! {
    /// Runtime diagnostic output switches, set from the debug console.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LogFlags: u32 {
        /// LIPS lines for step and motion results
        const RESULT_LIPS = 0x08;
        /// Hex trace of host interface packets
        const HIF_TRACE = 0x10;
        /// LIPS lines for converted sensor samples
        const SENSOR_LIPS = 0x40;
    }
}

pub static LOG_FLAGS: AtomicU32 = AtomicU32::new(0);

impl LogFlags {
    pub fn load() -> Self {
        Self::from_bits_retain(LOG_FLAGS.load(Ordering::Relaxed))
    }

    pub fn store(self) {
        LOG_FLAGS.store(self.bits(), Ordering::Relaxed)
    }

    pub fn enabled(flag: Self) -> bool {
        Self::load().contains(flag)
    }
}
