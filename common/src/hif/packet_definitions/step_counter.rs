//! Step counter packet with the 64-bit running total.

use crate::errors::HifError;
use crate::hif::header::{DataHeader, DataSize, TimeSize, HEADER_LEN};
use crate::hif::sensor_type::SensorType;
use crate::utils::func::BytesWriter;

use super::split_header;

/// Step counter packet length
pub const LEN: usize = 19;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepCounter {
    pub time_stamp: u64,
    pub total: u64,
}

pub(super) fn sensor(_: &StepCounter) -> SensorType {
    SensorType::StepCounter
}

pub fn raw_encode(counter: &StepCounter, data: &mut [u8; LEN]) {
    let mut head = [0u8; HEADER_LEN];
    DataHeader {
        data_fixpoint: false,
        data_size: DataSize::Bits64,
        ..DataHeader::fixpoint(SensorType::StepCounter)
    }
    .encode(&mut head);

    BytesWriter::new(data)
        .put(&head)
        .u64(counter.time_stamp)
        .u64(counter.total);
}

pub fn raw_decode(data: &[u8; LEN]) -> Result<StepCounter, HifError> {
    let (header, mut reader) = split_header(data)?;
    header.expect(false, true, DataSize::Bits64, TimeSize::Bits64)?;

    Ok(StepCounter {
        time_stamp: reader.next_be_u64().ok_or(HifError::Truncated)?,
        total: reader.next_be_u64().ok_or(HifError::Truncated)?,
    })
}
