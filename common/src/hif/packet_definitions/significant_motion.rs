//! Significant motion event packet.

use crate::errors::HifError;
use crate::hif::header::{DataHeader, DataSize, TimeSize, HEADER_LEN};
use crate::hif::sensor_type::SensorType;
use crate::utils::func::BytesWriter;

use super::split_header;

/// Significant motion packet length
pub const LEN: usize = 12;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignificantMotion {
    pub time_stamp: u64,
    pub detected: bool,
}

pub(super) fn sensor(_: &SignificantMotion) -> SensorType {
    SensorType::SignificantMotion
}

pub(super) fn event_header(sensor: SensorType) -> DataHeader {
    DataHeader {
        data_fixpoint: false,
        data_size: DataSize::Bits8,
        ..DataHeader::fixpoint(sensor)
    }
}

pub fn raw_encode(motion: &SignificantMotion, data: &mut [u8; LEN]) {
    let mut head = [0u8; HEADER_LEN];
    event_header(SensorType::SignificantMotion).encode(&mut head);
    BytesWriter::new(data)
        .put(&head)
        .u64(motion.time_stamp)
        .u8(motion.detected as u8);
}

pub fn raw_decode(data: &[u8; LEN]) -> Result<SignificantMotion, HifError> {
    let (header, mut reader) = split_header(data)?;
    header.expect(false, true, DataSize::Bits8, TimeSize::Bits64)?;

    Ok(SignificantMotion {
        time_stamp: reader.next_be_u64().ok_or(HifError::Truncated)?,
        detected: reader.next().ok_or(HifError::Truncated)? != 0,
    })
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::hif::packet_definitions::AnyPacket;

    #[test]
    fn test_significant_motion() {
        let motion = SignificantMotion {
            time_stamp: 0x0A,
            detected: true,
        };
        let mut buf = [0u8; LEN];
        assert_eq!(motion.encode(&mut buf), Ok(LEN));
        assert_eq!(buf, hex!("02 11 01 00 00 00 00 00 00 00 0A 01"));
        assert_eq!(SignificantMotion::decode(&buf), Ok((motion, LEN)));
    }
}
