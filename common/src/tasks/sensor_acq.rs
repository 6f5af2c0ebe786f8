//! Periodic sampling of the physical sensors.

use crate::asf::message::{Message, MsgSensorDataRdy};
use crate::asf::task::TaskId;
use crate::asf::timer::AsfTimer;
use crate::asf::Kernel;
use crate::config::{SENSOR_SAMPLE_PERIOD, TIMER_REF_SENSOR_READ};
use crate::conversion::{RawSample, SensorKind};
use crate::hif::SensorType;
use crate::hw_abstraction::SensorDriver;

const ID: &str = "sensor_acq";
const TASK: TaskId = TaskId::SensorAcq;

static SAMPLE_TIMER: AsfTimer = AsfTimer::new();

/// The physical sensor behind a host sensor type, if any.
pub fn physical_sensor(sensor: SensorType) -> Option<SensorKind> {
    match sensor.to_android_base() {
        SensorType::Accelerometer => Some(SensorKind::Accelerometer),
        SensorType::MagneticField | SensorType::MagneticFieldUncalibrated => {
            Some(SensorKind::Magnetometer)
        }
        SensorType::Gyroscope | SensorType::GyroscopeUncalibrated => Some(SensorKind::Gyroscope),
        _ => None,
    }
}

fn data_message(kind: SensorKind, sample: RawSample) -> Message {
    match kind {
        SensorKind::Accelerometer => Message::AccData(sample),
        SensorKind::Magnetometer => Message::MagData(sample),
        SensorKind::Gyroscope => Message::GyroData(sample),
    }
}

/// Announce new data from a sensor interrupt. Runs in interrupt context.
pub fn send_data_ready_indication(kernel: &'static Kernel, sensor: SensorKind, time_stamp: u32) {
    let msg = Message::SensorDataRdy(MsgSensorDataRdy { time_stamp, sensor });
    match kernel.create_message(msg) {
        Ok(buf) => kernel.send_message_from_isr(TASK, buf),
        Err(e) => asf_fatal!("{}: No message block for data ready: {:?}", ID, e),
    }
}

pub struct SensorAcq<D> {
    kernel: &'static Kernel,
    timer: &'static AsfTimer,
    driver: D,
    enabled: [bool; 3],
}

impl<D: SensorDriver> SensorAcq<D> {
    pub fn new(kernel: &'static Kernel, timer: &'static AsfTimer, mut driver: D) -> Self {
        for kind in SensorKind::ALL {
            driver.set_enabled(kind, true);
        }

        Self {
            kernel,
            timer,
            driver,
            enabled: [true; 3],
        }
    }

    pub fn is_enabled(&self, kind: SensorKind) -> bool {
        self.enabled[kind.index()]
    }

    /// Arm the sample timer. Returns the registry slot, which is the token
    /// the hardware timer hands back on expiry. Expiries are matched on
    /// [`TIMER_REF_SENSOR_READ`], so the slot is only of diagnostic use.
    pub fn start_sample_timer(&self) -> usize {
        self.kernel
            .start_timer(TASK, TIMER_REF_SENSOR_READ, SENSOR_SAMPLE_PERIOD, self.timer)
    }

    fn forward(&self, kind: SensorKind, sample: RawSample) {
        if let Err(e) = self.kernel.post(TaskId::Algorithm, data_message(kind, sample)) {
            warn!("{}: {:?} sample to algorithm dropped: {:?}", ID, kind, e);
        }

        if let Err(e) = self.kernel.post(TaskId::HostComm, data_message(kind, sample)) {
            warn!("{}: {:?} sample to host dropped: {:?}", ID, kind, e);
        }
    }

    fn sample(&mut self, kind: SensorKind, time_stamp: Option<u32>) {
        if !self.is_enabled(kind) {
            return;
        }

        let Some(mut sample) = self.driver.read(kind) else {
            trace!("{}: No {:?} sample ready", ID, kind);
            return;
        };

        if let Some(time_stamp) = time_stamp {
            sample.timestamp = time_stamp;
        }

        self.forward(kind, sample);
    }

    fn set_enabled(&mut self, sensor: SensorType, enable: bool) {
        let Some(kind) = physical_sensor(sensor) else {
            warn!("{}: {:?} has no physical sensor", ID, sensor);
            return;
        };

        debug!("{}: {:?} enabled: {}", ID, kind, enable);
        self.driver.set_enabled(kind, enable);
        self.enabled[kind.index()] = enable;
    }

    pub fn handle_message(&mut self, msg: &Message) {
        match msg {
            Message::TimerExpiry(expiry) if expiry.user_value == TIMER_REF_SENSOR_READ => {
                let slot = self.start_sample_timer();
                trace!("{}: Sample timer re-armed in slot {}", ID, slot);
                for kind in SensorKind::ALL {
                    self.sample(kind, None);
                }
            }
            Message::SensorDataRdy(rdy) => self.sample(rdy.sensor, Some(rdy.time_stamp)),
            Message::SensorControl(ctrl) => self.set_enabled(ctrl.sensor, ctrl.enable),
            Message::CalEvtNotify(cal) => {
                warn!("{}: Calibration of sensor {} not stored, NV storage unsupported", ID, cal.byte);
            }
            other => warn!("{}: Unhandled message {:?}", ID, other.id()),
        }
    }
}

pub async fn main<D: SensorDriver>(kernel: &'static Kernel, driver: D) -> ! {
    info!("{}: Task started", ID);

    let mut acq = SensorAcq::new(kernel, &SAMPLE_TIMER, driver);
    let slot = acq.start_sample_timer();
    debug!("{}: Sample timer in slot {}", ID, slot);

    loop {
        let buf = kernel.receive_message(TASK).await;
        acq.handle_message(&buf.msg);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;
    use crate::asf::message::{MsgGeneric, MsgSensorControl, MsgTimerExpiry};
    use crate::asf::testing::{new_kernel, new_timer};

    /// Returns a fixed sample for every enabled sensor.
    #[derive(Default)]
    struct FixedDriver {
        disabled: Vec<SensorKind>,
    }

    impl SensorDriver for FixedDriver {
        fn read(&mut self, kind: SensorKind) -> Option<RawSample> {
            (!self.disabled.contains(&kind)).then_some(RawSample {
                timestamp: 77,
                axis: [kind.index() as i32, 0, 0],
            })
        }

        fn set_enabled(&mut self, kind: SensorKind, enabled: bool) {
            self.disabled.retain(|k| *k != kind);
            if !enabled {
                self.disabled.push(kind);
            }
        }
    }

    fn drain(kernel: &'static Kernel, task: TaskId) -> Vec<Message> {
        core::iter::from_fn(|| kernel.receive_message_poll(task))
            .map(|buf| buf.msg.clone())
            .collect()
    }

    fn expiry() -> Message {
        Message::TimerExpiry(MsgTimerExpiry {
            user_value: TIMER_REF_SENSOR_READ,
            timer_id: None,
        })
    }

    #[test]
    fn test_physical_sensor_mapping() {
        assert_eq!(physical_sensor(SensorType::AccelerometerRaw), Some(SensorKind::Accelerometer));
        assert_eq!(
            physical_sensor(SensorType::MagneticFieldUncalibrated),
            Some(SensorKind::Magnetometer)
        );
        assert_eq!(physical_sensor(SensorType::StepCounter), None);
    }

    #[test]
    fn test_expiry_samples_all_sensors() {
        let kernel = new_kernel();
        let timer = new_timer();
        let mut acq = SensorAcq::new(kernel, timer, FixedDriver::default());

        let slot = acq.start_sample_timer();
        kernel.timer_expiry(slot as u16);
        let buf = kernel.receive_message_poll(TASK).unwrap();
        acq.handle_message(&buf.msg);
        assert!(timer.is_started());

        let to_alg = drain(kernel, TaskId::Algorithm);
        let ids: Vec<_> = to_alg.iter().map(Message::id).collect();
        assert_eq!(
            ids,
            [
                crate::asf::MessageId::AccData,
                crate::asf::MessageId::MagData,
                crate::asf::MessageId::GyroData
            ]
        );
        assert_eq!(drain(kernel, TaskId::HostComm), to_alg);
    }

    #[test]
    fn test_disabled_sensor_not_read() {
        let kernel = new_kernel();
        let mut acq = SensorAcq::new(kernel, new_timer(), FixedDriver::default());

        acq.handle_message(&Message::SensorControl(MsgSensorControl {
            sensor: SensorType::Gyroscope,
            enable: false,
        }));
        assert!(!acq.is_enabled(SensorKind::Gyroscope));

        acq.handle_message(&expiry());
        let to_alg = drain(kernel, TaskId::Algorithm);
        assert_eq!(to_alg.len(), 2);
        assert!(to_alg.iter().all(|m| !matches!(m, Message::GyroData(_))));
    }

    #[test]
    fn test_data_ready_uses_interrupt_time() {
        let kernel = new_kernel();
        let mut acq = SensorAcq::new(kernel, new_timer(), FixedDriver::default());

        send_data_ready_indication(kernel, SensorKind::Magnetometer, 1234);
        let buf = kernel.receive_message_poll(TASK).unwrap();
        acq.handle_message(&buf.msg);

        assert_eq!(
            drain(kernel, TaskId::Algorithm),
            [Message::MagData(RawSample {
                timestamp: 1234,
                axis: [1, 0, 0]
            })]
        );
    }

    #[test]
    fn test_calibration_notice_is_consumed() {
        let kernel = new_kernel();
        let mut acq = SensorAcq::new(kernel, new_timer(), FixedDriver::default());
        acq.handle_message(&Message::CalEvtNotify(MsgGeneric::default()));
        assert!(drain(kernel, TaskId::Algorithm).is_empty());
    }
}
