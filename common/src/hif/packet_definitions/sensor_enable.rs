//! Control write request that enables or disables a sensor.

use crate::hif::control::ParamId;
use crate::hif::header::{ControlHeader, PacketId, CTRL_HEADER_LEN};
use crate::hif::sensor_type::SensorType;
use crate::utils::func::BytesWriter;

/// Enable request length
pub const LEN: usize = 5;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorEnable {
    pub sensor: SensorType,
    pub subtype: u8,
    pub sequence: u8,
    pub enable: bool,
}

pub fn raw_encode(req: &SensorEnable, data: &mut [u8; LEN]) {
    let mut head = [0u8; CTRL_HEADER_LEN];
    ControlHeader {
        packet_id: PacketId::ControlReqWrite,
        sensor: req.sensor,
        subtype: req.subtype,
        sequence: req.sequence,
        param_id: ParamId::Enable.into(),
    }
    .encode(&mut head);

    BytesWriter::new(data).put(&head).u8(req.enable as u8);
}
