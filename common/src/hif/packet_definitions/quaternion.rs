//! Rotation vector packet carrying a fixed-point quaternion.

use crate::errors::HifError;
use crate::hif::header::{DataHeader, DataSize, TimeSize, HEADER_LEN};
use crate::hif::sensor_type::SensorType;
use crate::utils::func::BytesWriter;

use super::split_header;

/// Quaternion packet length
pub const LEN: usize = 27;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Quaternion {
    pub sensor: SensorType,
    pub time_stamp: u64,
    /// Components in `w, x, y, z` order
    pub quat: [i32; 4],
}

pub(super) fn sensor(quat: &Quaternion) -> SensorType {
    quat.sensor
}

pub fn raw_encode(quat: &Quaternion, data: &mut [u8; LEN]) {
    let mut head = [0u8; HEADER_LEN];
    DataHeader::fixpoint(quat.sensor).encode(&mut head);
    let mut writer = BytesWriter::new(data);
    writer.put(&head).u64(quat.time_stamp);
    for value in quat.quat {
        writer.i32(value);
    }
}

pub fn raw_decode(data: &[u8; LEN]) -> Result<Quaternion, HifError> {
    let (header, mut reader) = split_header(data)?;
    header.expect(true, true, DataSize::Bits32, TimeSize::Bits64)?;

    let time_stamp = reader.next_be_u64().ok_or(HifError::Truncated)?;
    let mut quat = [0i32; 4];
    for value in quat.iter_mut() {
        *value = reader.next_be_i32().ok_or(HifError::Truncated)?;
    }

    Ok(Quaternion {
        sensor: header.sensor,
        time_stamp,
        quat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hif::packet_definitions::AnyPacket;

    #[test]
    fn test_game_rotation_vector() {
        let quat = Quaternion {
            sensor: SensorType::GameRotationVector,
            time_stamp: 12345,
            quat: [1 << 30, 0, -(1 << 29), 7],
        };
        let mut buf = [0u8; LEN];
        assert_eq!(quat.encode(&mut buf), Ok(LEN));
        assert_eq!(&buf[..3], &[0x06, 15, 0x05]);
        assert_eq!(Quaternion::decode(&buf), Ok((quat, LEN)));
    }
}
