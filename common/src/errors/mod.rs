use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Non-fatal failures reported by the ASF message layer. The discriminants
/// are the result codes used on the wire and in logs.
#[non_exhaustive]
#[derive(
    Error, Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize,
    num_enum::IntoPrimitive, num_enum::TryFromPrimitive,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AsfError {
    #[error("The destination queue is full.")]
    QueueFull = 1,
    #[error("No free message block in the pool.")]
    MsgBuff = 2,
    #[error("The timer is already in use.")]
    TimerInUse = 3,
    #[error("Timed out while waiting.")]
    Timeout = 4,
}

#[non_exhaustive]
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionError {
    #[error("Axis mapping value {0} is not a known axis.")]
    InvalidAxisMapping(u8),
    #[error("Extended time stamp overflowed the time format.")]
    TimeOverflow,
}

/// Status of a host interface format or parse operation.
#[non_exhaustive]
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HifError {
    #[error("Packet attributes are not supported for this sensor type.")]
    UnsupportedFeature,
    #[error("Unknown packet identifier.")]
    InvalidPacketId,
    #[error("Unknown or invalid parameter.")]
    InvalidParameter,
    #[error("Destination buffer is too small for the packet.")]
    BufferTooSmall,
    #[error("Packet is shorter than its declared layout.")]
    Truncated,
}

impl HifError {
    /// Legacy negative status code
    pub const fn code(self) -> i16 {
        match self {
            HifError::UnsupportedFeature => -15,
            HifError::InvalidPacketId => -16,
            HifError::InvalidParameter => -17,
            HifError::BufferTooSmall => -18,
            HifError::Truncated => -19,
        }
    }
}

#[non_exhaustive]
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpawnError {
    #[error("The scheduler has no room for another task.")]
    NoCapacity,
    #[error("The task is already running.")]
    AlreadyRunning,
}

#[non_exhaustive]
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FusionError {
    #[error("The fusion library rejected the input sensor.")]
    InputRejected,
    #[error("The fusion library does not provide the requested output.")]
    OutputUnavailable,
}

/// Log and halt. Used for conditions that imply the kernel state can no
/// longer be trusted.
macro_rules! asf_fatal {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        error!($s $(, $x)*);
        panic!("ASF fatal error")
    }};
}

/// Halt through [`asf_fatal!`] when the condition does not hold.
macro_rules! asf_assert {
    ($cond:expr $(,)?) => {
        if !$cond {
            asf_fatal!("ASF assert failed: {}", stringify!($cond));
        }
    };
    ($cond:expr, $s:literal $(, $x:expr)* $(,)?) => {
        if !$cond {
            asf_fatal!($s $(, $x)*);
        }
    };
}
