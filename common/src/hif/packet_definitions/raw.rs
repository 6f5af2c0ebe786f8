//! Raw tri-axis packet: 16-bit counts with the raw 32-bit timestamp.

use crate::errors::HifError;
use crate::hif::header::{DataHeader, DataSize, TimeSize, HEADER_LEN};
use crate::hif::sensor_type::SensorType;
use crate::utils::func::BytesWriter;

use super::split_header;

/// Raw packet length
pub const LEN: usize = 13;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Raw {
    pub sensor: SensorType,
    pub metadata: u8,
    pub subtype: u8,
    /// Low 32 bits of the sensor timestamp in counter ticks
    pub time_stamp: u32,
    pub axis: [i16; 3],
}

pub(super) fn sensor(raw: &Raw) -> SensorType {
    raw.sensor
}

fn header(raw: &Raw) -> DataHeader {
    DataHeader {
        sensor: raw.sensor,
        metadata: raw.metadata,
        subtype: raw.subtype,
        flush: false,
        data_fixpoint: false,
        time_fixpoint: false,
        data_size: DataSize::Bits16,
        time_size: TimeSize::Bits32,
    }
}

pub fn raw_encode(raw: &Raw, data: &mut [u8; LEN]) {
    let mut head = [0u8; HEADER_LEN];
    header(raw).encode(&mut head);
    BytesWriter::new(data)
        .put(&head)
        .u32(raw.time_stamp)
        .i16(raw.axis[0])
        .i16(raw.axis[1])
        .i16(raw.axis[2]);
}

pub fn raw_decode(data: &[u8; LEN]) -> Result<Raw, HifError> {
    let (header, mut reader) = split_header(data)?;
    header.expect(false, false, DataSize::Bits16, TimeSize::Bits32)?;

    // Private raw sensors carry no subtype
    if header.sensor.is_private() && header.subtype != 0 {
        return Err(HifError::UnsupportedFeature);
    }

    let time_stamp = reader.next_be_u32().ok_or(HifError::Truncated)?;
    let mut axis = [0i16; 3];
    for value in axis.iter_mut() {
        *value = reader.next_be_i16().ok_or(HifError::Truncated)?;
    }

    Ok(Raw {
        sensor: header.sensor,
        metadata: header.metadata,
        subtype: header.subtype,
        time_stamp,
        axis,
    })
}
