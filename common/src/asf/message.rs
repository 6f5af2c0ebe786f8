//! The closed set of messages exchanged between tasks.

use super::pool::MessagePool;
use super::task::TaskId;
use crate::conversion::{RawSample, SensorKind};
use crate::hif::packet_definitions::SensorPacket;
use crate::hif::SensorType;
use crate::hw_abstraction::HwTimerId;

/// Largest control packet carried from the console to the host comm task
pub const CTRL_REQ_MAX: usize = 32;

macro_rules! messages {
    ($( $(#[$meta:meta])* $id:ident = $val:literal => $payload:ty ),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::IntoPrimitive, num_enum::TryFromPrimitive)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[repr(u8)]
        pub enum MessageId {
            $( $id = $val ),*
        }

        #[derive(Debug, Clone, PartialEq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub enum Message {
            $( $(#[$meta])* $id($payload) ),*
        }

        impl Message {
            pub const fn id(&self) -> MessageId {
                match self {
                    $( Message::$id(_) => MessageId::$id ),*
                }
            }
        }

        impl MessageId {
            /// Declared payload size of the message
            pub const fn payload_size(self) -> usize {
                match self {
                    $( MessageId::$id => core::mem::size_of::<$payload>() ),*
                }
            }
        }
    };
}

messages! {
    TimerExpiry = 0 => MsgTimerExpiry,
    AccData = 1 => RawSample,
    MagData = 2 => RawSample,
    GyroData = 3 => RawSample,
    /// A sensor's calibration changed and may be persisted
    CalEvtNotify = 4 => MsgGeneric,
    SensorDataRdy = 5 => MsgSensorDataRdy,
    TrigAlgBg = 6 => MsgNoData,
    SensorControl = 7 => MsgSensorControl,
    CtrlReq = 8 => MsgCtrlReq,
    /// A fusion result bound for the host
    SensorResult = 9 => SensorPacket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MsgTimerExpiry {
    pub user_value: u16,
    pub timer_id: Option<HwTimerId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MsgGeneric {
    pub dword: u32,
    pub word: u16,
    pub byte: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MsgSensorDataRdy {
    pub time_stamp: u32,
    pub sensor: SensorKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MsgNoData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MsgSensorControl {
    pub sensor: SensorType,
    pub enable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MsgCtrlReq {
    pub length: u8,
    pub packet: [u8; CTRL_REQ_MAX],
}

impl MsgCtrlReq {
    /// Copy a request packet. Returns `None` if it does not fit.
    pub fn new(bytes: &[u8]) -> Option<Self> {
        let mut packet = [0u8; CTRL_REQ_MAX];
        packet.get_mut(..bytes.len())?.copy_from_slice(bytes);
        Some(Self {
            length: bytes.len() as u8,
            packet,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.packet[..(self.length as usize).min(CTRL_REQ_MAX)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MsgHeader {
    pub id: MessageId,
    /// Set when the message is sent
    pub dest: Option<TaskId>,
    /// Declared payload size in bytes
    pub length: usize,
}

/// A message occupying one block of the message pool. The block goes back
/// to the pool when the buffer is dropped, so a message can only be freed
/// once.
#[derive(Debug)]
pub struct MsgBuffer {
    pub header: MsgHeader,
    pub msg: Message,
    pool: &'static MessagePool,
}

impl MsgBuffer {
    /// Wrap `msg` in a block that has already been acquired from `pool`.
    pub(crate) fn new(msg: Message, pool: &'static MessagePool) -> Self {
        let id = msg.id();
        Self {
            header: MsgHeader {
                id,
                dest: None,
                length: id.payload_size(),
            },
            msg,
            pool,
        }
    }

    pub fn id(&self) -> MessageId {
        self.header.id
    }
}

impl Drop for MsgBuffer {
    fn drop(&mut self) {
        self.pool.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids() {
        let msg = Message::TrigAlgBg(MsgNoData);
        assert_eq!(msg.id(), MessageId::TrigAlgBg);
        assert_eq!(u8::from(MessageId::SensorResult), 9);
        assert_eq!(MessageId::try_from(3u8).ok(), Some(MessageId::GyroData));
    }

    #[test]
    fn test_payload_sizes() {
        assert_eq!(MessageId::TrigAlgBg.payload_size(), 0);
        assert_eq!(
            MessageId::AccData.payload_size(),
            core::mem::size_of::<RawSample>()
        );
    }

    #[test]
    fn test_ctrl_req_bounds() {
        let req = MsgCtrlReq::new(&[1, 2, 3]).unwrap();
        assert_eq!(req.as_bytes(), &[1, 2, 3]);
        assert!(MsgCtrlReq::new(&[0u8; CTRL_REQ_MAX + 1]).is_none());
    }
}
