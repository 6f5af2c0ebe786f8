//! Sensor enumeration shared with the host. Android types occupy `0..=20`,
//! vendor private types `21..=37`. Both fit the 6-bit type field.

use serde::{Deserialize, Serialize};

/// First private sensor type value.
pub const PRIVATE_BASE: u8 = 21;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
    num_enum::IntoPrimitive, num_enum::TryFromPrimitive,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SensorType {
    MetaData = 0,
    Accelerometer = 1,
    MagneticField = 2,
    Orientation = 3,
    Gyroscope = 4,
    Light = 5,
    Pressure = 6,
    Temperature = 7,
    Proximity = 8,
    Gravity = 9,
    LinearAcceleration = 10,
    RotationVector = 11,
    RelativeHumidity = 12,
    AmbientTemperature = 13,
    MagneticFieldUncalibrated = 14,
    GameRotationVector = 15,
    GyroscopeUncalibrated = 16,
    SignificantMotion = 17,
    StepDetector = 18,
    StepCounter = 19,
    GeomagneticRotationVector = 20,

    // Private types
    DebugTunnel = 21,
    AccelerometerRaw = 22,
    MagneticFieldRaw = 23,
    GyroscopeRaw = 24,
    LightUv = 25,
    LightRgb = 26,
    Step = 27,
    AccelerometerUncalibrated = 28,
    PrivateOrientation = 29,
    ContextDeviceMotion = 30,
    ContextCarry = 31,
    ContextPosture = 32,
    ContextTransport = 33,
    ContextGestureEvent = 34,
    HeartRate = 35,
    RealTimeClock = 36,
    MagneticFieldAnomaly = 37,
}

/// Wire layout used for a sensor type's data packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketKind {
    Raw,
    Uncalibrated,
    Calibrated,
    Quaternion,
    Orientation,
    ThreeAxis,
    SignificantMotion,
    StepCounter,
    StepDetector,
    Unimplemented,
}

impl SensorType {
    pub const fn is_private(self) -> bool {
        self as u8 >= PRIVATE_BASE
    }

    /// Map a private type onto the Android type it specialises. Types
    /// without an Android counterpart map onto themselves.
    pub const fn to_android_base(self) -> SensorType {
        match self {
            SensorType::AccelerometerRaw | SensorType::AccelerometerUncalibrated => {
                SensorType::Accelerometer
            }
            SensorType::MagneticFieldRaw => SensorType::MagneticField,
            SensorType::GyroscopeRaw => SensorType::Gyroscope,
            SensorType::PrivateOrientation => SensorType::Orientation,
            SensorType::Step => SensorType::StepDetector,
            other => other,
        }
    }

    pub const fn packet_kind(self) -> PacketKind {
        use SensorType::*;
        match self {
            Accelerometer | MagneticField | Gyroscope => PacketKind::Calibrated,
            Orientation => PacketKind::Orientation,
            Gravity | LinearAcceleration => PacketKind::ThreeAxis,
            RotationVector | GameRotationVector | GeomagneticRotationVector => {
                PacketKind::Quaternion
            }
            MagneticFieldUncalibrated | GyroscopeUncalibrated | AccelerometerUncalibrated => {
                PacketKind::Uncalibrated
            }
            SignificantMotion => PacketKind::SignificantMotion,
            StepDetector => PacketKind::StepDetector,
            StepCounter => PacketKind::StepCounter,
            AccelerometerRaw | MagneticFieldRaw | GyroscopeRaw => PacketKind::Raw,
            _ => PacketKind::Unimplemented,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_types() {
        assert!(!SensorType::GeomagneticRotationVector.is_private());
        assert!(SensorType::DebugTunnel.is_private());
        assert_eq!(
            SensorType::AccelerometerRaw.to_android_base(),
            SensorType::Accelerometer
        );
        assert_eq!(SensorType::HeartRate.to_android_base(), SensorType::HeartRate);
    }

    #[test]
    fn test_packet_kinds() {
        assert_eq!(SensorType::GyroscopeRaw.packet_kind(), PacketKind::Raw);
        assert_eq!(SensorType::Gravity.packet_kind(), PacketKind::ThreeAxis);
        assert_eq!(SensorType::Light.packet_kind(), PacketKind::Unimplemented);
        assert_eq!(SensorType::try_from(38u8).ok(), None);
    }
}
