//! Calibrated tri-axis packet in fixed-point, used for accelerometer,
//! magnetometer and gyroscope results.

use crate::errors::HifError;
use crate::hif::header::{DataHeader, DataSize, TimeSize, HEADER_LEN};
use crate::hif::sensor_type::SensorType;
use crate::utils::func::BytesWriter;

use super::split_header;

/// Calibrated packet length
pub const LEN: usize = 23;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibrated {
    pub sensor: SensorType,
    /// Fixed-point time in seconds
    pub time_stamp: u64,
    pub axis: [i32; 3],
}

pub(super) fn sensor(cal: &Calibrated) -> SensorType {
    cal.sensor
}

pub fn raw_encode(cal: &Calibrated, data: &mut [u8; LEN]) {
    let mut head = [0u8; HEADER_LEN];
    DataHeader::fixpoint(cal.sensor).encode(&mut head);
    BytesWriter::new(data)
        .put(&head)
        .u64(cal.time_stamp)
        .i32(cal.axis[0])
        .i32(cal.axis[1])
        .i32(cal.axis[2]);
}

pub fn raw_decode(data: &[u8; LEN]) -> Result<Calibrated, HifError> {
    let (header, mut reader) = split_header(data)?;
    header.expect(true, true, DataSize::Bits32, TimeSize::Bits64)?;

    let time_stamp = reader.next_be_u64().ok_or(HifError::Truncated)?;
    let mut axis = [0i32; 3];
    for value in axis.iter_mut() {
        *value = reader.next_be_i32().ok_or(HifError::Truncated)?;
    }

    Ok(Calibrated {
        sensor: header.sensor,
        time_stamp,
        axis,
    })
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::hif::packet_definitions::AnyPacket;

    #[test]
    fn test_calibrated_layout() {
        let cal = Calibrated {
            sensor: SensorType::Accelerometer,
            time_stamp: 0x0102030405060708,
            axis: [1000, -2000, 3000],
        };

        let mut buf = [0u8; LEN];
        assert_eq!(cal.encode(&mut buf), Ok(23));
        assert_eq!(
            buf,
            hex!(
                "06 01 05"
                "01 02 03 04 05 06 07 08"
                "00 00 03 E8  FF FF F8 30  00 00 0B B8"
            )
        );
    }

    #[test]
    fn test_wrong_sensor_type_rejected() {
        let cal = Calibrated {
            sensor: SensorType::RotationVector,
            time_stamp: 0,
            axis: [0; 3],
        };
        assert_eq!(cal.encode(&mut [0u8; LEN]), Err(HifError::UnsupportedFeature));
    }

    #[test]
    fn test_raw_time_format_rejected() {
        let mut buf = [0u8; LEN];
        buf[..3].copy_from_slice(&hex!("04 01 05"));
        assert_eq!(Calibrated::decode(&buf), Err(HifError::UnsupportedFeature));
    }
}
