//! Host communication over the I2C slave register window.
//!
//! Packets are formatted into an outbox as soon as their message arrives, so
//! the message block goes straight back to the pool. The oldest packet in the
//! outbox is posted to the read window, after which the host is interrupted
//! and given [`TRANSFER_TIMEOUT`] to collect it. Messages keep being handled
//! while the host is slow, and a full outbox drops its oldest packet.

use core::pin::pin;

use embassy_futures::select::{select, Either};
use embassy_time::Duration;
use heapless::{Deque, Vec};

use crate::asf::message::{Message, MsgSensorControl};
use crate::asf::task::TaskId;
use crate::asf::Kernel;
use crate::config::LogFlags;
use crate::conversion::{RawSample, SensorKind};
use crate::errors::HifError;
use crate::hif::packet_definitions::Raw;
use crate::hif::{self, ParamId, Parsed, SensorType, MAX_PACKET_LEN};
use crate::hw_abstraction::HostTransport;
use crate::i2c_slave::{reg, RegisterMap};
use crate::logging::Bytes;

const ID: &str = "host_comm";
const TASK: TaskId = TaskId::HostComm;

/// Time the host has to read a posted packet
pub const TRANSFER_TIMEOUT: Duration = Duration::from_millis(500);

/// Formatted packets held for the host
pub const OUTBOX_LEN: usize = 8;

type Packet = Vec<u8, MAX_PACKET_LEN>;

/// Private type used to send raw samples of a sensor
pub const fn raw_sensor_type(kind: SensorKind) -> SensorType {
    match kind {
        SensorKind::Accelerometer => SensorType::AccelerometerRaw,
        SensorKind::Magnetometer => SensorType::MagneticFieldRaw,
        SensorKind::Gyroscope => SensorType::GyroscopeRaw,
    }
}

/// Raw packet of a driver sample. Axis values outside 16 bits saturate.
pub fn raw_packet(kind: SensorKind, sample: &RawSample) -> Raw {
    Raw {
        sensor: raw_sensor_type(kind),
        metadata: 0,
        subtype: 0,
        time_stamp: sample.timestamp,
        axis: sample
            .axis
            .map(|v| v.clamp(i16::MIN as i32, i16::MAX as i32) as i16),
    }
}

/// Host comm state apart from the transport, which is busy while a transfer
/// is outstanding.
struct Outbox {
    kernel: &'static Kernel,
    regs: RegisterMap,
    packets: Deque<Packet, OUTBOX_LEN>,
}

impl Outbox {
    fn queue(&mut self, format: impl FnOnce(&mut [u8]) -> Result<usize, HifError>) {
        let mut buf = [0u8; MAX_PACKET_LEN];
        let packet = match format(&mut buf) {
            Ok(len) => Packet::from_slice(&buf[..len]).map_err(|_| HifError::BufferTooSmall),
            Err(e) => Err(e),
        };

        let packet = match packet {
            Ok(packet) => packet,
            Err(e) => {
                warn!("{}: Packet not formatted: {:?} ({})", ID, e, e.code());
                return;
            }
        };

        if self.packets.is_full() {
            self.packets.pop_front();
            warn!("{}: Host is not reading, oldest packet dropped", ID);
        }
        _ = self.packets.push_back(packet);
    }

    /// Treat `request` as written by the host into the write window.
    fn handle_control_request(&mut self, request: &[u8]) {
        let parsed = match self.regs.write(reg::WR_MEM, request) {
            Ok(Some(written)) => hif::parse_host_interface_pkt(written),
            Ok(None) => return,
            Err(e) => Err(e),
        };

        match parsed {
            Ok((Parsed::ControlRequest(req), _)) => match (req.param, req.enable) {
                (ParamId::Enable, Some(enable)) => {
                    let ctrl = MsgSensorControl {
                        sensor: req.sensor,
                        enable,
                    };
                    if let Err(e) = self.kernel.post(TaskId::SensorAcq, Message::SensorControl(ctrl)) {
                        warn!("{}: Sensor control dropped: {:?}", ID, e);
                    }
                }
                (param, _) => debug!("{}: Ignoring control parameter {:?}", ID, param),
            },
            Ok((Parsed::SensorData(packet), _)) => {
                warn!("{}: Unexpected {:?} data from host", ID, packet.sensor())
            }
            Err(e) => warn!("{}: Malformed host packet: {:?} ({})", ID, e, e.code()),
        }
    }

    fn handle_message(&mut self, msg: &Message) {
        match msg {
            Message::AccData(sample) => self.queue_raw(SensorKind::Accelerometer, sample),
            Message::MagData(sample) => self.queue_raw(SensorKind::Magnetometer, sample),
            Message::GyroData(sample) => self.queue_raw(SensorKind::Gyroscope, sample),
            Message::SensorResult(packet) => self.queue(|buf| packet.format(buf)),
            Message::CtrlReq(req) => self.handle_control_request(req.as_bytes()),
            other => warn!("{}: Unhandled message {:?}", ID, other.id()),
        }
    }

    fn queue_raw(&mut self, kind: SensorKind, sample: &RawSample) {
        let raw = raw_packet(kind, sample);
        self.queue(|buf| hif::format_sensor_data_pkt_raw(buf, &raw));
    }
}

pub struct HostComm<T> {
    transport: T,
    outbox: Outbox,
}

impl<T: HostTransport> HostComm<T> {
    pub fn new(kernel: &'static Kernel, transport: T) -> Self {
        Self {
            transport,
            outbox: Outbox {
                kernel,
                regs: RegisterMap::new(),
                packets: Deque::new(),
            },
        }
    }

    pub fn registers(&self) -> &RegisterMap {
        &self.outbox.regs
    }

    /// Number of packets waiting for the host
    pub fn pending(&self) -> usize {
        self.outbox.packets.len()
    }

    pub fn handle_message(&mut self, msg: &Message) {
        self.outbox.handle_message(msg);
    }

    /// Post the oldest packet and wait for the host to collect it. Returns
    /// false if there was nothing to send.
    pub async fn send_next(&mut self) -> bool {
        let Some(packet) = self.outbox.packets.pop_front() else {
            return false;
        };

        if LogFlags::enabled(LogFlags::HIF_TRACE) {
            info!("{}: HIF {}", ID, Bytes(&packet));
        }

        if let Err(e) = self.outbox.regs.post(&packet) {
            warn!("{}: Packet of {} bytes not posted: {:?}", ID, packet.len(), e);
            return true;
        }

        self.transport.assert_interrupt();

        let kernel = self.outbox.kernel;
        let collected = {
            let mut transfer = pin!(self.transport.wait_transfer_done(TRANSFER_TIMEOUT));
            loop {
                match select(transfer.as_mut(), kernel.receive_message(TASK)).await {
                    Either::First(collected) => break collected,
                    Either::Second(buf) => self.outbox.handle_message(&buf.msg),
                }
            }
        };

        if collected {
            self.outbox.regs.acknowledge();
        } else {
            warn!("{}: Host did not collect packet within {} ms", ID, TRANSFER_TIMEOUT.as_millis());
        }
        self.transport.deassert_interrupt();
        true
    }

    pub async fn run(&mut self) -> ! {
        loop {
            if !self.send_next().await {
                let buf = self.outbox.kernel.receive_message(TASK).await;
                self.outbox.handle_message(&buf.msg);
            }
        }
    }
}

pub async fn main<T: HostTransport>(kernel: &'static Kernel, transport: T) -> ! {
    info!("{}: Task started", ID);

    HostComm::new(kernel, transport).run().await
}
