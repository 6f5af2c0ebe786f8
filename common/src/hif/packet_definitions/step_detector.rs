//! Step detector event packet.

use crate::errors::HifError;
use crate::hif::header::{DataSize, TimeSize, HEADER_LEN};
use crate::hif::sensor_type::SensorType;
use crate::utils::func::BytesWriter;

use super::significant_motion::event_header;
use super::split_header;

/// Step detector packet length
pub const LEN: usize = 12;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepDetector {
    pub time_stamp: u64,
    pub detected: bool,
}

pub(super) fn sensor(_: &StepDetector) -> SensorType {
    SensorType::StepDetector
}

pub fn raw_encode(step: &StepDetector, data: &mut [u8; LEN]) {
    let mut head = [0u8; HEADER_LEN];
    event_header(SensorType::StepDetector).encode(&mut head);
    BytesWriter::new(data)
        .put(&head)
        .u64(step.time_stamp)
        .u8(step.detected as u8);
}

pub fn raw_decode(data: &[u8; LEN]) -> Result<StepDetector, HifError> {
    let (header, mut reader) = split_header(data)?;
    header.expect(false, true, DataSize::Bits8, TimeSize::Bits64)?;

    Ok(StepDetector {
        time_stamp: reader.next_be_u64().ok_or(HifError::Truncated)?,
        detected: reader.next().ok_or(HifError::Truncated)? != 0,
    })
}
