use crate::errors::HifError;
use crate::utils::bytes_reader::BytesReader;

use super::header::{DataHeader, HEADER_LEN};
use super::sensor_type::{PacketKind, SensorType};

pub mod calibrated;
pub mod orientation;
pub mod quaternion;
pub mod raw;
pub mod sensor_enable;
pub mod significant_motion;
pub mod step_counter;
pub mod step_detector;
pub mod three_axis;
pub mod uncalibrated;

pub use calibrated::Calibrated;
pub use orientation::Orientation;
pub use quaternion::Quaternion;
pub use raw::Raw;
pub use significant_motion::SignificantMotion;
pub use step_counter::StepCounter;
pub use step_detector::StepDetector;
pub use three_axis::ThreeAxis;
pub use uncalibrated::Uncalibrated;

/// A sensor data packet that can be written to and read from the wire. The
/// encoded form always includes the three byte header.
#[allow(clippy::len_without_is_empty)]
pub trait AnyPacket
where
    Self: Sized,
{
    /// The packet layout this payload is carried in.
    const KIND: PacketKind;

    /// Length in bytes of the encoded packet, header included.
    fn len(&self) -> usize;

    /// The sensor type written into the header.
    fn sensor(&self) -> SensorType;

    /// Encode into the start of `buf`, returning the number of bytes written.
    fn encode(&self, buf: &mut [u8]) -> Result<usize, HifError>;

    /// Decode from the start of `buf`, returning the packet and the number of
    /// bytes consumed.
    fn decode(buf: &[u8]) -> Result<(Self, usize), HifError>;
}

/// Split off and decode the header of a fixed size packet, leaving a reader
/// positioned at the timestamp.
pub(crate) fn split_header(data: &[u8]) -> Result<(DataHeader, BytesReader<'_>), HifError> {
    let head: &[u8; HEADER_LEN] =
        crate::utils::func::ref_array_start(data).ok_or(HifError::Truncated)?;
    let header = DataHeader::decode(head)?;
    let body = data.get(HEADER_LEN..).ok_or(HifError::Truncated)?;
    Ok((header, BytesReader::new(body)))
}

/// Refuse to write a packet for a sensor type that uses another layout.
pub(crate) fn check_kind(sensor: SensorType, kind: PacketKind) -> Result<(), HifError> {
    if sensor.packet_kind() == kind {
        Ok(())
    } else {
        Err(HifError::UnsupportedFeature)
    }
}

macro_rules! impl_any_packet {
    ($module:ident, $name:ident, $kind:ident) => {
        impl AnyPacket for $module::$name {
            const KIND: PacketKind = PacketKind::$kind;

            fn len(&self) -> usize {
                $module::LEN
            }

            fn sensor(&self) -> SensorType {
                $module::sensor(self)
            }

            fn encode(&self, buf: &mut [u8]) -> Result<usize, HifError> {
                check_kind(self.sensor(), Self::KIND)?;
                let data: &mut [u8; $module::LEN] =
                    crate::utils::func::mut_array_start(buf).ok_or(HifError::BufferTooSmall)?;
                $module::raw_encode(self, data);
                Ok($module::LEN)
            }

            fn decode(buf: &[u8]) -> Result<(Self, usize), HifError> {
                let data: &[u8; $module::LEN] =
                    crate::utils::func::ref_array_start(buf).ok_or(HifError::Truncated)?;
                Ok(($module::raw_decode(data)?, $module::LEN))
            }
        }
    };
}

impl_any_packet!(raw, Raw, Raw);
impl_any_packet!(calibrated, Calibrated, Calibrated);
impl_any_packet!(three_axis, ThreeAxis, ThreeAxis);
impl_any_packet!(orientation, Orientation, Orientation);
impl_any_packet!(quaternion, Quaternion, Quaternion);
impl_any_packet!(significant_motion, SignificantMotion, SignificantMotion);
impl_any_packet!(step_detector, StepDetector, StepDetector);
impl_any_packet!(step_counter, StepCounter, StepCounter);

/// Any sensor data packet the hub sends to or accepts from the host.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorPacket {
    Raw(Raw),
    Uncalibrated(Uncalibrated),
    Calibrated(Calibrated),
    ThreeAxis(ThreeAxis),
    Orientation(Orientation),
    Quaternion(Quaternion),
    SignificantMotion(SignificantMotion),
    StepDetector(StepDetector),
    StepCounter(StepCounter),
}

impl SensorPacket {
    pub fn sensor(&self) -> SensorType {
        match self {
            SensorPacket::Raw(p) => p.sensor(),
            SensorPacket::Uncalibrated(p) => p.sensor(),
            SensorPacket::Calibrated(p) => p.sensor(),
            SensorPacket::ThreeAxis(p) => p.sensor(),
            SensorPacket::Orientation(p) => p.sensor(),
            SensorPacket::Quaternion(p) => p.sensor(),
            SensorPacket::SignificantMotion(p) => p.sensor(),
            SensorPacket::StepDetector(p) => p.sensor(),
            SensorPacket::StepCounter(p) => p.sensor(),
        }
    }

    /// Encode with the layout matching the packet variant.
    pub fn format(&self, dest: &mut [u8]) -> Result<usize, HifError> {
        match self {
            SensorPacket::Raw(p) => p.encode(dest),
            SensorPacket::Uncalibrated(p) => p.encode(dest),
            SensorPacket::Calibrated(p) => p.encode(dest),
            SensorPacket::ThreeAxis(p) => p.encode(dest),
            SensorPacket::Orientation(p) => p.encode(dest),
            SensorPacket::Quaternion(p) => p.encode(dest),
            SensorPacket::SignificantMotion(p) => p.encode(dest),
            SensorPacket::StepDetector(p) => p.encode(dest),
            SensorPacket::StepCounter(p) => p.encode(dest),
        }
    }

    /// Decode a sensor data packet, choosing the layout from the sensor type
    /// in its header.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), HifError> {
        let (header, _) = split_header(buf)?;
        match header.sensor.packet_kind() {
            PacketKind::Raw => Raw::decode(buf).map(|(p, n)| (SensorPacket::Raw(p), n)),
            PacketKind::Uncalibrated => {
                Uncalibrated::decode(buf).map(|(p, n)| (SensorPacket::Uncalibrated(p), n))
            }
            PacketKind::Calibrated => {
                Calibrated::decode(buf).map(|(p, n)| (SensorPacket::Calibrated(p), n))
            }
            PacketKind::ThreeAxis => {
                ThreeAxis::decode(buf).map(|(p, n)| (SensorPacket::ThreeAxis(p), n))
            }
            PacketKind::Orientation => {
                Orientation::decode(buf).map(|(p, n)| (SensorPacket::Orientation(p), n))
            }
            PacketKind::Quaternion => {
                Quaternion::decode(buf).map(|(p, n)| (SensorPacket::Quaternion(p), n))
            }
            PacketKind::SignificantMotion => SignificantMotion::decode(buf)
                .map(|(p, n)| (SensorPacket::SignificantMotion(p), n)),
            PacketKind::StepDetector => {
                StepDetector::decode(buf).map(|(p, n)| (SensorPacket::StepDetector(p), n))
            }
            PacketKind::StepCounter => {
                StepCounter::decode(buf).map(|(p, n)| (SensorPacket::StepCounter(p), n))
            }
            PacketKind::Unimplemented => Err(HifError::UnsupportedFeature),
        }
    }
}
