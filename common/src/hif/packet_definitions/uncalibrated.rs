//! Uncalibrated tri-axis packet. When the metadata field flags an offset
//! change, the current offset follows the data and the packet grows.

use crate::errors::HifError;
use crate::hif::header::{DataHeader, DataSize, TimeSize, HEADER_LEN, METADATA_OFFSET_CHANGE};
use crate::hif::sensor_type::{PacketKind, SensorType};
use crate::utils::func::BytesWriter;

use super::{check_kind, split_header, AnyPacket};

/// Packet length without the offset block
pub const LEN: usize = 23;

/// Packet length with the offset block
pub const LEN_WITH_OFFSET: usize = LEN + 12;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Uncalibrated {
    pub sensor: SensorType,
    pub time_stamp: u64,
    pub axis: [i32; 3],
    pub offset: Option<[i32; 3]>,
}

impl AnyPacket for Uncalibrated {
    const KIND: PacketKind = PacketKind::Uncalibrated;

    fn len(&self) -> usize {
        match self.offset {
            Some(_) => LEN_WITH_OFFSET,
            None => LEN,
        }
    }

    fn sensor(&self) -> SensorType {
        self.sensor
    }

    fn encode(&self, buf: &mut [u8]) -> Result<usize, HifError> {
        check_kind(self.sensor, Self::KIND)?;
        let len = self.len();
        let data = buf.get_mut(..len).ok_or(HifError::BufferTooSmall)?;

        let mut head = [0u8; HEADER_LEN];
        DataHeader {
            metadata: if self.offset.is_some() {
                METADATA_OFFSET_CHANGE
            } else {
                0
            },
            ..DataHeader::fixpoint(self.sensor)
        }
        .encode(&mut head);

        let mut writer = BytesWriter::new(data);
        writer.put(&head).u64(self.time_stamp);
        for value in self.axis {
            writer.i32(value);
        }
        if let Some(offset) = self.offset {
            for value in offset {
                writer.i32(value);
            }
        }

        Ok(writer.written())
    }

    fn decode(buf: &[u8]) -> Result<(Self, usize), HifError> {
        let (header, mut reader) = split_header(buf)?;
        header.expect(true, true, DataSize::Bits32, TimeSize::Bits64)?;

        let time_stamp = reader.next_be_u64().ok_or(HifError::Truncated)?;
        let mut axis = [0i32; 3];
        for value in axis.iter_mut() {
            *value = reader.next_be_i32().ok_or(HifError::Truncated)?;
        }

        let offset = match header.metadata {
            0 => None,
            METADATA_OFFSET_CHANGE => {
                let mut offset = [0i32; 3];
                for value in offset.iter_mut() {
                    *value = reader.next_be_i32().ok_or(HifError::Truncated)?;
                }
                Some(offset)
            }
            _ => return Err(HifError::UnsupportedFeature),
        };

        let packet = Uncalibrated {
            sensor: header.sensor,
            time_stamp,
            axis,
            offset,
        };
        let len = packet.len();
        Ok((packet, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_offset() {
        let uncal = Uncalibrated {
            sensor: SensorType::GyroscopeUncalibrated,
            time_stamp: 1,
            axis: [1, 2, 3],
            offset: None,
        };
        let mut buf = [0u8; 64];
        assert_eq!(uncal.encode(&mut buf), Ok(LEN));
        assert_eq!(buf[1], 16);
        assert_eq!(Uncalibrated::decode(&buf), Ok((uncal, LEN)));
    }

    #[test]
    fn test_with_offset() {
        let uncal = Uncalibrated {
            sensor: SensorType::AccelerometerUncalibrated,
            time_stamp: 1,
            axis: [1, 2, 3],
            offset: Some([-4, -5, -6]),
        };
        let mut buf = [0u8; 64];
        assert_eq!(uncal.encode(&mut buf), Ok(LEN_WITH_OFFSET));
        // Private domain, metadata flag over the sensor type
        assert_eq!(buf[0], 0x07);
        assert_eq!(buf[1], 0x40 | 28);
        assert_eq!(Uncalibrated::decode(&buf), Ok((uncal, LEN_WITH_OFFSET)));
    }

    #[test]
    fn test_offset_block_missing() {
        let uncal = Uncalibrated {
            sensor: SensorType::MagneticFieldUncalibrated,
            time_stamp: 1,
            axis: [1, 2, 3],
            offset: Some([0; 3]),
        };
        let mut buf = [0u8; LEN_WITH_OFFSET];
        uncal.encode(&mut buf).unwrap();
        assert_eq!(Uncalibrated::decode(&buf[..LEN]), Err(HifError::Truncated));
        assert_eq!(uncal.encode(&mut [0u8; LEN]), Err(HifError::BufferTooSmall));
    }
}
