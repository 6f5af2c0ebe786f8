//! Conversion of raw driver samples into fixed-point body frame samples with
//! an extended timestamp.

use serde::{Deserialize, Serialize};

use crate::config::US_PER_RTC_TICK;
use crate::errors::ConversionError;

pub mod scale;
pub mod time;

pub use scale::{AxisMap, DataType};
pub use time::TimestampExtender;

/// Physical sensors sampled by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorKind {
    Accelerometer,
    Magnetometer,
    Gyroscope,
}

impl SensorKind {
    pub const ALL: [SensorKind; 3] = [
        SensorKind::Accelerometer,
        SensorKind::Magnetometer,
        SensorKind::Gyroscope,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A sample as delivered by a sensor driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// Free running counter ticks
    pub timestamp: u32,
    pub axis: [i32; 3],
}

/// A converted sample. The time is in `Q_TIME` seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CookedSample {
    pub time_stamp: i64,
    pub axis: [i32; 3],
}

/// Per sensor conversion settings. Offset and scale are indexed by output
/// axis, after remapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConversionDescriptor {
    /// Raw [`AxisMap`] value for each output axis
    pub axis_map: [u8; 3],
    pub data_type: DataType,
    pub data_width_mask: u32,
    pub offset: [i32; 3],
    /// Scale factors with [`scale::SCALE_SHIFT`] fractional bits of headroom
    pub scale: [i32; 3],
}

impl ConversionDescriptor {
    /// Identity mapping of 16-bit signed data with unity scale.
    pub const fn identity_i16() -> Self {
        Self {
            axis_map: [AxisMap::PlusX as u8, AxisMap::PlusY as u8, AxisMap::PlusZ as u8],
            data_type: DataType::SignedTwoComp,
            data_width_mask: 0x0000_FFFF,
            offset: [0; 3],
            scale: [1 << scale::SCALE_SHIFT; 3],
        }
    }

    /// Remap, offset, mask and scale a raw reading.
    pub fn convert_axes(&self, raw: &[i32; 3]) -> Result<[i32; 3], ConversionError> {
        let mut out = [0i32; 3];
        for (axis, value) in out.iter_mut().enumerate() {
            let map = AxisMap::try_from(self.axis_map[axis])
                .map_err(|_| ConversionError::InvalidAxisMapping(self.axis_map[axis]))?;
            if map == AxisMap::Unused {
                continue;
            }
            *value = scale::scale_sensor_data(
                map.route(raw),
                self.offset[axis],
                self.data_width_mask,
                self.scale[axis],
                self.data_type,
            );
        }
        Ok(out)
    }
}

/// Conversion state for the physical sensors: descriptors and one rollover
/// extender per sensor. The extenders assume a single caller per sensor.
pub struct SensorConverter {
    descriptors: [ConversionDescriptor; 3],
    extenders: [TimestampExtender; 3],
    time_coefficient: u32,
}

impl SensorConverter {
    pub const fn new(descriptors: [ConversionDescriptor; 3]) -> Self {
        Self {
            descriptors,
            extenders: [TimestampExtender::new(); 3],
            time_coefficient: time::tick_coefficient(US_PER_RTC_TICK),
        }
    }

    pub fn descriptor(&self, kind: SensorKind) -> &ConversionDescriptor {
        &self.descriptors[kind.index()]
    }

    /// Extend the timestamp of `kind` without converting any axes.
    pub fn extend_time(&mut self, kind: SensorKind, timestamp: u32) -> i64 {
        let (high, low) = self.extenders[kind.index()].extend(timestamp);
        match time::time_from_counter(self.time_coefficient, high, low) {
            Ok(time) => time,
            Err(_) => {
                warn!("Conversion: Timestamp saturated for {:?}", kind);
                time::MAX_TIME
            }
        }
    }

    pub fn convert(
        &mut self,
        kind: SensorKind,
        raw: &RawSample,
    ) -> Result<CookedSample, ConversionError> {
        let axis = self.descriptors[kind.index()].convert_axes(&raw.axis)?;
        Ok(CookedSample {
            time_stamp: self.extend_time(kind, raw.timestamp),
            axis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end_accel() {
        // 1.5 with 12 bits of headroom
        let scale = 0x1800;
        let descriptor = ConversionDescriptor {
            scale: [scale; 3],
            ..ConversionDescriptor::identity_i16()
        };
        let mut converter = SensorConverter::new([descriptor; 3]);

        let cooked = [100, 200, 300].map(|timestamp| {
            converter
                .convert(
                    SensorKind::Accelerometer,
                    &RawSample {
                        timestamp,
                        axis: [512, 0, 0],
                    },
                )
                .unwrap()
        });

        for sample in &cooked {
            assert_eq!(sample.axis, [768, 0, 0]);
        }
        assert!(cooked[0].time_stamp < cooked[1].time_stamp);
        assert!(cooked[1].time_stamp < cooked[2].time_stamp);
        assert_eq!(converter.extenders[0].extension(), 0);
    }

    #[test]
    fn test_sensors_extend_independently() {
        let mut converter = SensorConverter::new([ConversionDescriptor::identity_i16(); 3]);
        converter.extend_time(SensorKind::Gyroscope, 0xFFFF_0000);
        converter.extend_time(SensorKind::Gyroscope, 0x10);
        converter.extend_time(SensorKind::Magnetometer, 0x20);

        assert_eq!(converter.extenders[SensorKind::Gyroscope.index()].extension(), 1);
        assert_eq!(converter.extenders[SensorKind::Magnetometer.index()].extension(), 0);
    }

    #[test]
    fn test_unused_axis_is_zero() {
        let descriptor = ConversionDescriptor {
            axis_map: [AxisMap::MinusY as u8, AxisMap::Unused as u8, AxisMap::PlusX as u8],
            offset: [0, 100, 0],
            ..ConversionDescriptor::identity_i16()
        };
        assert_eq!(descriptor.convert_axes(&[7, 9, 11]), Ok([-9, 0, 7]));
    }

    #[test]
    fn test_invalid_mapping_is_error() {
        let mut converter = SensorConverter::new([ConversionDescriptor {
            axis_map: [1, 3, 9],
            ..ConversionDescriptor::identity_i16()
        }; 3]);
        assert_eq!(
            converter.convert(SensorKind::Magnetometer, &RawSample::default()),
            Err(ConversionError::InvalidAxisMapping(9))
        );
    }
}
