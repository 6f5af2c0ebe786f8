//! Three-axis fixed-point packet for derived vectors such as gravity and
//! linear acceleration. Accuracy is not carried on the wire.

use crate::errors::HifError;
use crate::hif::header::{DataHeader, DataSize, TimeSize, HEADER_LEN};
use crate::hif::sensor_type::SensorType;
use crate::utils::func::BytesWriter;

use super::split_header;

/// Three-axis packet length
pub const LEN: usize = 23;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThreeAxis {
    pub sensor: SensorType,
    pub time_stamp: u64,
    pub axis: [i32; 3],
}

pub(super) fn sensor(data: &ThreeAxis) -> SensorType {
    data.sensor
}

pub fn raw_encode(three_axis: &ThreeAxis, data: &mut [u8; LEN]) {
    let mut head = [0u8; HEADER_LEN];
    DataHeader::fixpoint(three_axis.sensor).encode(&mut head);
    let mut writer = BytesWriter::new(data);
    writer.put(&head).u64(three_axis.time_stamp);
    for value in three_axis.axis {
        writer.i32(value);
    }
}

pub fn raw_decode(data: &[u8; LEN]) -> Result<ThreeAxis, HifError> {
    let (header, mut reader) = split_header(data)?;
    header.expect(true, true, DataSize::Bits32, TimeSize::Bits64)?;

    let time_stamp = reader.next_be_u64().ok_or(HifError::Truncated)?;
    let mut axis = [0i32; 3];
    for value in axis.iter_mut() {
        *value = reader.next_be_i32().ok_or(HifError::Truncated)?;
    }

    Ok(ThreeAxis {
        sensor: header.sensor,
        time_stamp,
        axis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hif::packet_definitions::AnyPacket;

    #[test]
    fn test_gravity_round_trip() {
        let gravity = ThreeAxis {
            sensor: SensorType::Gravity,
            time_stamp: 1 << 24,
            axis: [0, 0, 9 << 24],
        };
        let mut buf = [0u8; 40];
        let len = gravity.encode(&mut buf).unwrap();
        assert_eq!(len, LEN);
        assert_eq!(buf[1], 9);
        assert_eq!(ThreeAxis::decode(&buf[..len]), Ok((gravity, LEN)));
    }
}
