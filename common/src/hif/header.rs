//! The fixed three byte header that starts every host interface packet, and
//! the four byte variant used by control requests.

use crate::errors::HifError;

use super::sensor_type::SensorType;

/// Sensor data header length
pub const HEADER_LEN: usize = 3;

/// Control request header length, the data header plus the parameter id
pub const CTRL_HEADER_LEN: usize = 4;

// Control byte
pub const CTRL_PRIVATE: u8 = 0x01;
pub const CTRL_TIME_FIXPOINT: u8 = 0x02;
pub const CTRL_DATA_FIXPOINT: u8 = 0x04;
pub const CTRL_CRC: u8 = 0x08;
pub const CTRL_PKID_MASK: u8 = 0x70;
pub const CTRL_PKID_SHIFT: u8 = 4;
pub const CTRL_VERSION1: u8 = 0x80;

// Sensor id byte
pub const SENSOR_METADATA_MASK: u8 = 0xC0;
pub const SENSOR_METADATA_SHIFT: u8 = 6;
pub const SENSOR_TYPE_MASK: u8 = 0x3F;

// Attribute byte
pub const ATTR_SUBTYPE_MASK: u8 = 0xF0;
pub const ATTR_SUBTYPE_SHIFT: u8 = 4;
pub const ATTR_FLUSH: u8 = 0x08;
pub const ATTR_DATA_SIZE_MASK: u8 = 0x06;
pub const ATTR_DATA_SIZE_SHIFT: u8 = 1;
pub const ATTR_TIME_SIZE_64: u8 = 0x01;
pub const ATTR_SEQUENCE_MASK: u8 = 0x0F;

/// Metadata value flagging an offset block after the data
pub const METADATA_OFFSET_CHANGE: u8 = 0x01;

/// Packet kind carried in bits 4..=6 of the control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PacketId {
    SensorData = 0,
    ControlReqRead = 1,
    ControlReqWrite = 2,
    ControlResponse = 3,
    TestData = 4,
}

impl PacketId {
    /// Extract the packet kind from a control byte. Version 1 packets are not
    /// understood and are reported the same way as an unknown kind.
    pub fn from_control_byte(byte: u8) -> Result<Self, HifError> {
        if byte & CTRL_VERSION1 != 0 {
            return Err(HifError::InvalidPacketId);
        }
        PacketId::try_from((byte & CTRL_PKID_MASK) >> CTRL_PKID_SHIFT)
            .map_err(|_| HifError::InvalidPacketId)
    }

    pub const fn control_bits(self) -> u8 {
        ((self as u8) << CTRL_PKID_SHIFT) & CTRL_PKID_MASK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DataSize {
    Bits8 = 0,
    Bits16 = 1,
    Bits32 = 2,
    Bits64 = 3,
}

impl DataSize {
    const fn from_attr(attr: u8) -> Self {
        match (attr & ATTR_DATA_SIZE_MASK) >> ATTR_DATA_SIZE_SHIFT {
            0 => DataSize::Bits8,
            1 => DataSize::Bits16,
            2 => DataSize::Bits32,
            _ => DataSize::Bits64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeSize {
    Bits32,
    Bits64,
}

/// Decoded form of a sensor data packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataHeader {
    pub sensor: SensorType,
    pub metadata: u8,
    pub subtype: u8,
    pub flush: bool,
    pub data_fixpoint: bool,
    pub time_fixpoint: bool,
    pub data_size: DataSize,
    pub time_size: TimeSize,
}

impl DataHeader {
    /// Header as written for fixed-point packets: fixed-point data and time,
    /// 32-bit fields and a 64-bit timestamp.
    pub const fn fixpoint(sensor: SensorType) -> Self {
        Self {
            sensor,
            metadata: 0,
            subtype: 0,
            flush: false,
            data_fixpoint: true,
            time_fixpoint: true,
            data_size: DataSize::Bits32,
            time_size: TimeSize::Bits64,
        }
    }

    pub fn encode(&self, buf: &mut [u8; HEADER_LEN]) {
        let mut control = PacketId::SensorData.control_bits();
        if self.sensor.is_private() {
            control |= CTRL_PRIVATE;
        }
        if self.time_fixpoint {
            control |= CTRL_TIME_FIXPOINT;
        }
        if self.data_fixpoint {
            control |= CTRL_DATA_FIXPOINT;
        }

        let mut attr = (self.subtype << ATTR_SUBTYPE_SHIFT) & ATTR_SUBTYPE_MASK;
        attr |= ((self.data_size as u8) << ATTR_DATA_SIZE_SHIFT) & ATTR_DATA_SIZE_MASK;
        if self.flush {
            attr |= ATTR_FLUSH;
        }
        if self.time_size == TimeSize::Bits64 {
            attr |= ATTR_TIME_SIZE_64;
        }

        buf[0] = control;
        buf[1] = ((self.metadata << SENSOR_METADATA_SHIFT) & SENSOR_METADATA_MASK)
            | (u8::from(self.sensor) & SENSOR_TYPE_MASK);
        buf[2] = attr;
    }

    /// Decode a header. The enumeration domain bit must agree with the sensor
    /// type, otherwise the sensor is not one this codec knows.
    pub fn decode(buf: &[u8; HEADER_LEN]) -> Result<Self, HifError> {
        let sensor = SensorType::try_from(buf[1] & SENSOR_TYPE_MASK)
            .map_err(|_| HifError::UnsupportedFeature)?;
        if sensor.is_private() != (buf[0] & CTRL_PRIVATE != 0) {
            return Err(HifError::UnsupportedFeature);
        }

        Ok(Self {
            sensor,
            metadata: (buf[1] & SENSOR_METADATA_MASK) >> SENSOR_METADATA_SHIFT,
            subtype: (buf[2] & ATTR_SUBTYPE_MASK) >> ATTR_SUBTYPE_SHIFT,
            flush: buf[2] & ATTR_FLUSH != 0,
            data_fixpoint: buf[0] & CTRL_DATA_FIXPOINT != 0,
            time_fixpoint: buf[0] & CTRL_TIME_FIXPOINT != 0,
            data_size: DataSize::from_attr(buf[2]),
            time_size: if buf[2] & ATTR_TIME_SIZE_64 != 0 {
                TimeSize::Bits64
            } else {
                TimeSize::Bits32
            },
        })
    }

    /// Verify that the declared formats and sizes are the ones expected for a
    /// packet layout. Metadata, subtype and flush are checked by the caller.
    pub fn expect(
        &self,
        data_fixpoint: bool,
        time_fixpoint: bool,
        data_size: DataSize,
        time_size: TimeSize,
    ) -> Result<(), HifError> {
        if self.data_fixpoint == data_fixpoint
            && self.time_fixpoint == time_fixpoint
            && self.data_size == data_size
            && self.time_size == time_size
        {
            Ok(())
        } else {
            Err(HifError::UnsupportedFeature)
        }
    }
}

/// Decoded form of a control request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlHeader {
    pub packet_id: PacketId,
    pub sensor: SensorType,
    pub subtype: u8,
    pub sequence: u8,
    pub param_id: u8,
}

impl ControlHeader {
    pub fn encode(&self, buf: &mut [u8; CTRL_HEADER_LEN]) {
        let mut control = self.packet_id.control_bits();
        if self.sensor.is_private() {
            control |= CTRL_PRIVATE;
        }
        buf[0] = control;
        buf[1] = u8::from(self.sensor) & SENSOR_TYPE_MASK;
        buf[2] = ((self.subtype << ATTR_SUBTYPE_SHIFT) & ATTR_SUBTYPE_MASK)
            | (self.sequence & ATTR_SEQUENCE_MASK);
        buf[3] = self.param_id;
    }

    pub fn decode(buf: &[u8; CTRL_HEADER_LEN]) -> Result<Self, HifError> {
        let packet_id = PacketId::from_control_byte(buf[0])?;
        let sensor = SensorType::try_from(buf[1] & SENSOR_TYPE_MASK)
            .map_err(|_| HifError::UnsupportedFeature)?;
        if sensor.is_private() != (buf[0] & CTRL_PRIVATE != 0) {
            return Err(HifError::UnsupportedFeature);
        }

        Ok(Self {
            packet_id,
            sensor,
            subtype: (buf[2] & ATTR_SUBTYPE_MASK) >> ATTR_SUBTYPE_SHIFT,
            sequence: buf[2] & ATTR_SEQUENCE_MASK,
            param_id: buf[3],
        })
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_packet_id_from_control_byte() {
        assert_eq!(PacketId::from_control_byte(0x06), Ok(PacketId::SensorData));
        assert_eq!(PacketId::from_control_byte(0x21), Ok(PacketId::ControlReqWrite));
        assert_eq!(PacketId::from_control_byte(0x50), Err(HifError::InvalidPacketId));
        assert_eq!(PacketId::from_control_byte(0x80), Err(HifError::InvalidPacketId));
    }

    #[test]
    fn test_fixpoint_header_bytes() {
        let mut buf = [0u8; HEADER_LEN];
        DataHeader::fixpoint(SensorType::Gyroscope).encode(&mut buf);
        assert_eq!(buf, hex!("06 04 05"));
        assert_eq!(
            DataHeader::decode(&buf),
            Ok(DataHeader::fixpoint(SensorType::Gyroscope))
        );
    }

    #[test]
    fn test_private_bit_must_match_type() {
        // Private domain bit with an Android type
        assert_eq!(
            DataHeader::decode(&hex!("07 04 05")),
            Err(HifError::UnsupportedFeature)
        );
        // Unknown type value
        assert_eq!(
            DataHeader::decode(&hex!("07 3F 05")),
            Err(HifError::UnsupportedFeature)
        );
    }

    #[test]
    fn test_control_header() {
        let header = ControlHeader {
            packet_id: PacketId::ControlReqWrite,
            sensor: SensorType::AccelerometerRaw,
            subtype: 0,
            sequence: 0x1A,
            param_id: 0x01,
        };
        let mut buf = [0u8; CTRL_HEADER_LEN];
        header.encode(&mut buf);
        assert_eq!(buf, hex!("21 16 0A 01"));

        let decoded = ControlHeader::decode(&buf).unwrap();
        assert_eq!(decoded.sequence, 0x0A);
        assert_eq!(decoded.sensor, SensorType::AccelerometerRaw);
    }
}
