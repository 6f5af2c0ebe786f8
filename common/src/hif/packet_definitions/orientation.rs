//! Orientation packet: pitch, roll and yaw in fixed-point degrees.

use crate::errors::HifError;
use crate::hif::header::{DataHeader, DataSize, TimeSize, HEADER_LEN};
use crate::hif::sensor_type::SensorType;
use crate::utils::func::BytesWriter;

use super::split_header;

/// Orientation packet length
pub const LEN: usize = 23;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Orientation {
    pub time_stamp: u64,
    pub pitch: i32,
    pub roll: i32,
    pub yaw: i32,
}

pub(super) fn sensor(_: &Orientation) -> SensorType {
    SensorType::Orientation
}

pub fn raw_encode(orientation: &Orientation, data: &mut [u8; LEN]) {
    let mut head = [0u8; HEADER_LEN];
    DataHeader::fixpoint(SensorType::Orientation).encode(&mut head);
    BytesWriter::new(data)
        .put(&head)
        .u64(orientation.time_stamp)
        .i32(orientation.pitch)
        .i32(orientation.roll)
        .i32(orientation.yaw);
}

pub fn raw_decode(data: &[u8; LEN]) -> Result<Orientation, HifError> {
    let (header, mut reader) = split_header(data)?;
    header.expect(true, true, DataSize::Bits32, TimeSize::Bits64)?;

    Ok(Orientation {
        time_stamp: reader.next_be_u64().ok_or(HifError::Truncated)?,
        pitch: reader.next_be_i32().ok_or(HifError::Truncated)?,
        roll: reader.next_be_i32().ok_or(HifError::Truncated)?,
        yaw: reader.next_be_i32().ok_or(HifError::Truncated)?,
    })
}
