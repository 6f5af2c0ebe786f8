//! Host interface packet codec.
//!
//! Packets start with a control byte, a sensor id byte and an attribute byte,
//! followed by a big-endian payload whose layout is fixed by the sensor type.
//! No checksum is appended.

use crate::errors::HifError;
use crate::utils::func::BytesWriter;

pub mod control;
pub mod header;
pub mod packet_definitions;
pub mod sensor_type;

use header::PacketId;
use packet_definitions::sensor_enable::{self, SensorEnable};
use packet_definitions::{
    AnyPacket, Calibrated, Orientation, Quaternion, Raw, SensorPacket, SignificantMotion,
    StepCounter, StepDetector, ThreeAxis, Uncalibrated,
};

pub use control::{format_control_request, Access, ControlRequest, ControlTarget, ParamId};
pub use sensor_type::SensorType;

/// Largest packet the codec produces
pub const MAX_PACKET_LEN: usize = packet_definitions::uncalibrated::LEN_WITH_OFFSET;

/// Result of [`parse_host_interface_pkt`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parsed {
    SensorData(SensorPacket),
    ControlRequest(ControlRequest),
}

/// Parse any packet received from the host. Returns the parsed value and the
/// number of bytes it occupied.
pub fn parse_host_interface_pkt(buf: &[u8]) -> Result<(Parsed, usize), HifError> {
    let control = *buf.first().ok_or(HifError::Truncated)?;

    match PacketId::from_control_byte(control)? {
        PacketId::SensorData => {
            SensorPacket::parse(buf).map(|(packet, len)| (Parsed::SensorData(packet), len))
        }
        PacketId::ControlReqRead | PacketId::ControlReqWrite => control::parse_control_request(buf)
            .map(|(req, len)| (Parsed::ControlRequest(req), len)),
        PacketId::ControlResponse | PacketId::TestData => Err(HifError::UnsupportedFeature),
    }
}

pub fn format_sensor_data_pkt_raw(dest: &mut [u8], data: &Raw) -> Result<usize, HifError> {
    data.encode(dest)
}

pub fn format_quaternion_pkt_fixp(dest: &mut [u8], data: &Quaternion) -> Result<usize, HifError> {
    data.encode(dest)
}

pub fn format_uncalibrated_pkt_fixp(
    dest: &mut [u8],
    data: &Uncalibrated,
) -> Result<usize, HifError> {
    data.encode(dest)
}

pub fn format_calibrated_pkt_fixp(dest: &mut [u8], data: &Calibrated) -> Result<usize, HifError> {
    data.encode(dest)
}

pub fn format_orientation_fixp(dest: &mut [u8], data: &Orientation) -> Result<usize, HifError> {
    data.encode(dest)
}

pub fn format_three_axis_pkt_fixp(dest: &mut [u8], data: &ThreeAxis) -> Result<usize, HifError> {
    data.encode(dest)
}

pub fn format_significant_motion_pkt_fixp(
    dest: &mut [u8],
    data: &SignificantMotion,
) -> Result<usize, HifError> {
    data.encode(dest)
}

pub fn format_step_counter_pkt(dest: &mut [u8], data: &StepCounter) -> Result<usize, HifError> {
    data.encode(dest)
}

pub fn format_step_detector_pkt(dest: &mut [u8], data: &StepDetector) -> Result<usize, HifError> {
    data.encode(dest)
}

/// Write an enable or disable request for `sensor`.
pub fn format_sensor_enable_req(
    dest: &mut [u8],
    enable: bool,
    sensor: SensorType,
    subtype: u8,
    sequence: u8,
) -> Result<usize, HifError> {
    let data: &mut [u8; sensor_enable::LEN] =
        crate::utils::func::mut_array_start(dest).ok_or(HifError::BufferTooSmall)?;
    sensor_enable::raw_encode(
        &SensorEnable {
            sensor,
            subtype,
            sequence,
            enable,
        },
        data,
    );
    Ok(sensor_enable::LEN)
}

/// Ask for the current value of a readable parameter.
pub fn format_control_read_req(
    dest: &mut [u8],
    target: ControlTarget,
    param: ParamId,
) -> Result<usize, HifError> {
    format_control_request(dest, true, target, param, &[])
}

/// Batch request: sample period and maximum report latency, both in ns.
pub fn format_batch_req(
    dest: &mut [u8],
    target: ControlTarget,
    period_ns: u64,
    max_latency_ns: u64,
) -> Result<usize, HifError> {
    let mut payload = [0u8; 16];
    BytesWriter::new(&mut payload).u64(period_ns).u64(max_latency_ns);
    format_control_request(dest, false, target, ParamId::Batch, &payload)
}

pub fn format_flush_req(dest: &mut [u8], target: ControlTarget) -> Result<usize, HifError> {
    format_control_request(dest, false, target, ParamId::Flush, &[])
}

/// Axis mapping as signed axis numbers, e.g. `[1, -2, 3]` for +X, -Y, +Z.
pub fn format_axis_mapping_req(
    dest: &mut [u8],
    target: ControlTarget,
    mapping: [i8; 3],
) -> Result<usize, HifError> {
    let payload = mapping.map(|axis| axis as u8);
    format_control_request(dest, false, target, ParamId::AxisMapping, &payload)
}

fn format_i32x3_req(
    dest: &mut [u8],
    target: ControlTarget,
    param: ParamId,
    values: [i32; 3],
) -> Result<usize, HifError> {
    let mut payload = [0u8; 12];
    BytesWriter::new(&mut payload)
        .i32(values[0])
        .i32(values[1])
        .i32(values[2]);
    format_control_request(dest, false, target, param, &payload)
}

pub fn format_conversion_offset_req(
    dest: &mut [u8],
    target: ControlTarget,
    offset: [i32; 3],
) -> Result<usize, HifError> {
    format_i32x3_req(dest, target, ParamId::ConversionOffset, offset)
}

pub fn format_xyz_offset_req(
    dest: &mut [u8],
    target: ControlTarget,
    offset: [i32; 3],
) -> Result<usize, HifError> {
    format_i32x3_req(dest, target, ParamId::XyzOffset, offset)
}

pub fn format_config_done_req(dest: &mut [u8], target: ControlTarget) -> Result<usize, HifError> {
    format_control_request(dest, false, target, ParamId::ConfigDone, &[])
}

/// The hub answers no control requests, so there is never anything to write.
pub fn format_control_response(_dest: &mut [u8]) -> Result<usize, HifError> {
    Ok(0)
}
