//! Control requests from the host. Every parameter id is recognised, but
//! only enable and disable have an effect on the hub.

use crate::errors::HifError;
use crate::utils::func::{ref_array_start, BytesWriter};

use super::header::{ControlHeader, PacketId, CTRL_HEADER_LEN};
use super::packet_definitions::sensor_enable;
use super::sensor_type::SensorType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::IntoPrimitive, num_enum::TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ParamId {
    ErrorCodeInData = 0x00,
    Enable = 0x01,
    Batch = 0x02,
    Flush = 0x03,
    RangeResolution = 0x04,
    Power = 0x05,
    MinMaxDelay = 0x06,
    FifoEventCount = 0x07,
    AxisMapping = 0x08,
    ConversionOffset = 0x09,
    ConversionScale = 0x0A,
    SensorNoise = 0x0B,
    TimestampOffset = 0x0C,
    OnTimeWakeTime = 0x0D,
    HpfLpfCutoff = 0x0E,
    SensorName = 0x0F,
    XyzOffset = 0x10,
    FactorySkorMatrix = 0x11,
    FactoryCalOffset = 0x12,
    FactoryNonlinearEffects = 0x13,
    BiasStability = 0x14,
    Repeatability = 0x15,
    TempCoeff = 0x16,
    ShakeSusceptibility = 0x17,
    ExpectedNorm = 0x18,
    Version = 0x19,
    DynamicCalScale = 0x1A,
    DynamicCalSkew = 0x1B,
    DynamicCalOffset = 0x1C,
    DynamicCalRotation = 0x1D,
    DynamicCalQuality = 0x1E,
    DynamicCalSource = 0x1F,
    ConfigDone = 0x20,
    ShTimeSet = 0x21,
    TimeSyncStart = 0x22,
    TimeSyncFollowUp = 0x23,
    TimeSyncEnd = 0x24,
}

/// Direction from which the host may access a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl ParamId {
    /// Element size, element count and access of the parameter's value.
    const fn layout(self) -> (usize, usize, Access) {
        use Access::*;
        match self {
            ParamId::ErrorCodeInData => (4, 1, Read),
            ParamId::Enable => (1, 1, Write),
            ParamId::Batch => (8, 2, Write),
            ParamId::Flush => (0, 0, Write),
            ParamId::RangeResolution => (4, 2, Read),
            ParamId::Power => (4, 1, Read),
            ParamId::MinMaxDelay => (4, 2, Read),
            ParamId::FifoEventCount => (4, 2, Read),
            ParamId::AxisMapping => (1, 3, ReadWrite),
            ParamId::ConversionOffset => (4, 3, ReadWrite),
            ParamId::ConversionScale => (4, 3, ReadWrite),
            ParamId::SensorNoise => (4, 3, ReadWrite),
            ParamId::TimestampOffset => (4, 1, ReadWrite),
            ParamId::OnTimeWakeTime => (4, 2, ReadWrite),
            ParamId::HpfLpfCutoff => (2, 2, ReadWrite),
            ParamId::SensorName => (1, 32, Read),
            ParamId::XyzOffset => (4, 3, ReadWrite),
            ParamId::FactorySkorMatrix => (4, 9, ReadWrite),
            ParamId::FactoryCalOffset => (4, 3, ReadWrite),
            ParamId::FactoryNonlinearEffects => (2, 12, ReadWrite),
            ParamId::BiasStability => (4, 3, ReadWrite),
            ParamId::Repeatability => (4, 3, ReadWrite),
            ParamId::TempCoeff => (2, 6, ReadWrite),
            ParamId::ShakeSusceptibility => (2, 3, ReadWrite),
            ParamId::ExpectedNorm => (4, 1, ReadWrite),
            ParamId::Version => (1, 32, Read),
            ParamId::DynamicCalScale => (4, 3, ReadWrite),
            ParamId::DynamicCalSkew => (4, 3, ReadWrite),
            ParamId::DynamicCalOffset => (4, 3, ReadWrite),
            ParamId::DynamicCalRotation => (4, 3, ReadWrite),
            ParamId::DynamicCalQuality => (4, 3, ReadWrite),
            ParamId::DynamicCalSource => (1, 1, ReadWrite),
            ParamId::ConfigDone => (0, 0, Write),
            ParamId::ShTimeSet => (8, 1, Write),
            ParamId::TimeSyncStart => (0, 0, Write),
            ParamId::TimeSyncFollowUp => (8, 1, Write),
            ParamId::TimeSyncEnd => (8, 1, Write),
        }
    }

    pub const fn access(self) -> Access {
        self.layout().2
    }

    /// Size of the parameter's value in bytes
    pub const fn payload_len(self) -> usize {
        let (size, count, _) = self.layout();
        size * count
    }

    /// Payload carried by a read or write request for this parameter. Read
    /// requests carry none. `None` if the parameter cannot be accessed that way.
    pub const fn request_payload_len(self, read: bool) -> Option<usize> {
        match (read, self.access()) {
            (true, Access::Write) | (false, Access::Read) => None,
            (true, _) => Some(0),
            (false, _) => Some(self.payload_len()),
        }
    }
}

/// Addressing shared by every control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlTarget {
    pub sensor: SensorType,
    pub subtype: u8,
    pub sequence: u8,
}

/// A parsed control request. `enable` is only present for enable requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlRequest {
    pub read: bool,
    /// The addressed sensor, with private types mapped to their Android base
    pub sensor: SensorType,
    pub subtype: u8,
    pub sequence: u8,
    pub param: ParamId,
    pub enable: Option<bool>,
}

/// Parse a control read or write request, returning the request and the
/// number of bytes it occupies.
pub fn parse_control_request(buf: &[u8]) -> Result<(ControlRequest, usize), HifError> {
    let head: &[u8; CTRL_HEADER_LEN] = ref_array_start(buf).ok_or(HifError::Truncated)?;
    let header = ControlHeader::decode(head)?;

    let read = match header.packet_id {
        PacketId::ControlReqRead => true,
        PacketId::ControlReqWrite => false,
        _ => return Err(HifError::InvalidPacketId),
    };

    let param = ParamId::try_from(header.param_id).map_err(|_| HifError::InvalidParameter)?;
    let payload = param
        .request_payload_len(read)
        .ok_or(HifError::InvalidParameter)?;
    let len = CTRL_HEADER_LEN + payload;
    if buf.len() < len {
        return Err(HifError::Truncated);
    }

    let mut request = ControlRequest {
        read,
        sensor: header.sensor.to_android_base(),
        subtype: header.subtype,
        sequence: header.sequence,
        param,
        enable: None,
    };

    // Other parameters are recognised but inert, their payload is skipped
    if param == ParamId::Enable {
        let data = buf.get(CTRL_HEADER_LEN).ok_or(HifError::Truncated)?;
        request.enable = Some(*data != 0);
        debug_assert_eq!(len, sensor_enable::LEN);
    }

    Ok((request, len))
}

/// Write a read (`read == true`) or write request for `param`. A write
/// request must carry exactly the parameter's value as big-endian `payload`.
pub fn format_control_request(
    dest: &mut [u8],
    read: bool,
    target: ControlTarget,
    param: ParamId,
    payload: &[u8],
) -> Result<usize, HifError> {
    let expected = param
        .request_payload_len(read)
        .ok_or(HifError::InvalidParameter)?;
    if payload.len() != expected {
        return Err(HifError::InvalidParameter);
    }

    let len = CTRL_HEADER_LEN + expected;
    let out = dest.get_mut(..len).ok_or(HifError::BufferTooSmall)?;

    let mut head = [0u8; CTRL_HEADER_LEN];
    ControlHeader {
        packet_id: if read {
            PacketId::ControlReqRead
        } else {
            PacketId::ControlReqWrite
        },
        sensor: target.sensor,
        subtype: target.subtype,
        sequence: target.sequence,
        param_id: param.into(),
    }
    .encode(&mut head);

    BytesWriter::new(out).put(&head).put(payload);
    Ok(len)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_parse_enable() {
        let (req, len) = parse_control_request(&hex!("21 18 02 01 01")).unwrap();
        assert_eq!(len, 5);
        assert!(!req.read);
        assert_eq!(req.sensor, SensorType::Gyroscope);
        assert_eq!(req.sequence, 2);
        assert_eq!(req.param, ParamId::Enable);
        assert_eq!(req.enable, Some(true));

        let (req, _) = parse_control_request(&hex!("20 01 00 01 00")).unwrap();
        assert_eq!(req.enable, Some(false));
    }

    #[test]
    fn test_enable_needs_data_byte() {
        assert_eq!(
            parse_control_request(&hex!("20 01 00 01")),
            Err(HifError::Truncated)
        );
    }

    #[test]
    fn test_inert_parameters_accepted() {
        let (req, len) = parse_control_request(&hex!("10 02 00 04")).unwrap();
        assert!(req.read);
        assert_eq!(req.param, ParamId::RangeResolution);
        assert_eq!(req.enable, None);
        assert_eq!(len, 4);

        let (req, len) =
            parse_control_request(&hex!("20 02 00 24 00000000 00000BB8 FFFF")).unwrap();
        assert_eq!(req.param, ParamId::TimeSyncEnd);
        assert_eq!(len, 12);

        let (req, len) = parse_control_request(&hex!("20 02 00 03")).unwrap();
        assert_eq!(req.param, ParamId::Flush);
        assert_eq!(len, 4);
    }

    #[test]
    fn test_truncated_inert_parameters() {
        // Batch carries two 64 bit values
        assert_eq!(
            parse_control_request(&hex!("20 01 00 02 00000000 00004E20 00000000")),
            Err(HifError::Truncated)
        );
        // Axis mapping carries three bytes
        assert_eq!(
            parse_control_request(&hex!("20 01 00 08 01 02")),
            Err(HifError::Truncated)
        );
        let (_, len) = parse_control_request(&hex!("20 01 00 08 01 02 FD")).unwrap();
        assert_eq!(len, 7);
    }

    #[test]
    fn test_access_direction() {
        // Enable can only be written, sensor name only read
        assert_eq!(
            parse_control_request(&hex!("10 01 00 01")),
            Err(HifError::InvalidParameter)
        );
        assert_eq!(
            parse_control_request(&hex!("20 01 00 0F")),
            Err(HifError::InvalidParameter)
        );
        let (req, len) = parse_control_request(&hex!("10 01 00 08")).unwrap();
        assert!(req.read);
        assert_eq!(len, 4);
    }

    #[test]
    fn test_payload_sizes() {
        assert_eq!(ParamId::Batch.payload_len(), 16);
        assert_eq!(ParamId::FactorySkorMatrix.payload_len(), 36);
        assert_eq!(ParamId::FactoryNonlinearEffects.payload_len(), 24);
        assert_eq!(ParamId::TimeSyncStart.payload_len(), 0);
        assert_eq!(ParamId::RangeResolution.request_payload_len(true), Some(0));
        assert_eq!(ParamId::RangeResolution.request_payload_len(false), None);
        assert_eq!(ParamId::XyzOffset.request_payload_len(false), Some(12));
    }

    #[test]
    fn test_format_request() {
        let target = ControlTarget {
            sensor: SensorType::Gyroscope,
            subtype: 0,
            sequence: 7,
        };
        let mut buf = [0u8; 8];
        let len = format_control_request(&mut buf, false, target, ParamId::AxisMapping, &hex!("02 FF 03"))
            .unwrap();
        assert_eq!(&buf[..len], &hex!("20 04 07 08 02 FF 03"));

        // Wrong payload size or direction is refused
        assert_eq!(
            format_control_request(&mut buf, false, target, ParamId::AxisMapping, &hex!("02 FF")),
            Err(HifError::InvalidParameter)
        );
        assert_eq!(
            format_control_request(&mut buf, true, target, ParamId::Batch, &[]),
            Err(HifError::InvalidParameter)
        );
        assert_eq!(
            format_control_request(&mut buf[..5], false, target, ParamId::AxisMapping, &hex!("02 FF 03")),
            Err(HifError::BufferTooSmall)
        );
    }

    #[test]
    fn test_unknown_parameter() {
        assert_eq!(
            parse_control_request(&hex!("20 02 00 25")),
            Err(HifError::InvalidParameter)
        );
    }
}
