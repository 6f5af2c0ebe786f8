//! Foreground sensor fusion. Converts raw samples, feeds them to the fusion
//! library and publishes what it produces.

use crate::asf::message::{Message, MsgGeneric, MsgNoData};
use crate::asf::task::TaskId;
use crate::asf::Kernel;
use crate::config::{LogFlags, Q_EXTENDED, Q_PRECISE};
use crate::conversion::{ConversionDescriptor, RawSample, SensorConverter, SensorKind};
use crate::hif::packet_definitions::SensorPacket;
use crate::hif::SensorType;
use crate::hw_abstraction::{FusionLibrary, FusionOutput, FusionStatus, InputHandle, LipsSink};
use crate::lips::{self, SampleTag};

use super::FusionLock;

const ID: &str = "algorithm";
const TASK: TaskId = TaskId::Algorithm;

/// Fusion outputs requested at start-up
pub const SUBSCRIPTIONS: [SensorType; 4] = [
    SensorType::RotationVector,
    SensorType::SignificantMotion,
    SensorType::StepDetector,
    SensorType::StepCounter,
];

const fn sample_format(kind: SensorKind) -> (SampleTag, u32) {
    match kind {
        SensorKind::Accelerometer => (SampleTag::Accel, Q_PRECISE),
        SensorKind::Magnetometer => (SampleTag::Mag, Q_EXTENDED),
        SensorKind::Gyroscope => (SampleTag::Gyro, Q_PRECISE),
    }
}

/// Route one fusion output. Called from within the processing call.
fn publish(kernel: &'static Kernel, sink: &mut impl LipsSink, output: FusionOutput) {
    match output {
        FusionOutput::Result(packet) => {
            if LogFlags::enabled(LogFlags::RESULT_LIPS) {
                match &packet {
                    SensorPacket::StepCounter(p) => {
                        sink.emit_lips(&lips::step_count(p.time_stamp as i64, p.total))
                    }
                    SensorPacket::SignificantMotion(p) => {
                        sink.emit_lips(&lips::significant_motion(p.time_stamp as i64, p.detected))
                    }
                    _ => {}
                }
            }

            let sensor = packet.sensor();
            if let Err(e) = kernel.post(TaskId::HostComm, Message::SensorResult(packet)) {
                warn!("{}: {:?} result dropped: {:?}", ID, sensor, e);
            }
        }
        FusionOutput::CalibrationUpdated(kind) => {
            let notice = MsgGeneric {
                byte: kind.index() as u8,
                ..MsgGeneric::default()
            };
            if let Err(e) = kernel.post(TaskId::SensorAcq, Message::CalEvtNotify(notice)) {
                warn!("{}: {:?} calibration notice dropped: {:?}", ID, kind, e);
            }
        }
    }
}

pub struct Algorithm<F: 'static, L> {
    kernel: &'static Kernel,
    fusion: &'static FusionLock<F>,
    converter: SensorConverter,
    inputs: [Option<InputHandle>; 3],
    sink: L,
}

impl<F: FusionLibrary, L: LipsSink> Algorithm<F, L> {
    pub fn new(
        kernel: &'static Kernel,
        fusion: &'static FusionLock<F>,
        descriptors: [ConversionDescriptor; 3],
        sink: L,
    ) -> Self {
        Self {
            kernel,
            fusion,
            converter: SensorConverter::new(descriptors),
            inputs: [None; 3],
            sink,
        }
    }

    /// Initialize the fusion library, register the physical sensors as
    /// inputs and subscribe to the default outputs.
    pub async fn init(&mut self) {
        let fusion = self.fusion;
        let mut fusion = fusion.lock().await;
        fusion.initialize();

        for kind in SensorKind::ALL {
            match fusion.register_input(kind, self.converter.descriptor(kind)) {
                Ok(handle) => self.inputs[kind.index()] = Some(handle),
                Err(e) => warn!("{}: {:?} not registered: {:?}", ID, kind, e),
            }
        }

        for sensor in SUBSCRIPTIONS {
            if let Err(e) = fusion.subscribe(sensor) {
                warn!("{}: Subscription to {:?} failed: {:?}", ID, sensor, e);
            }
        }
    }

    async fn process_sample(&mut self, kind: SensorKind, raw: &RawSample) {
        let cooked = match self.converter.convert(kind, raw) {
            Ok(cooked) => cooked,
            Err(e) => {
                warn!("{}: {:?} sample not converted: {:?}", ID, kind, e);
                return;
            }
        };

        if LogFlags::enabled(LogFlags::SENSOR_LIPS) {
            let (tag, axis_q) = sample_format(kind);
            self.sink
                .emit_lips(&lips::raw_sample(tag, cooked.time_stamp, cooked.axis, axis_q));
        }

        let Some(input) = self.inputs[kind.index()] else {
            return;
        };

        let kernel = self.kernel;
        let sink = &mut self.sink;
        let fusion = self.fusion;
        let mut fusion = fusion.lock().await;

        if let FusionStatus::Error(code) = fusion.set_data(input, &cooked) {
            warn!("{}: {:?} sample rejected: {}", ID, kind, code);
        }

        loop {
            match fusion.do_foreground_processing(&mut |output| publish(kernel, sink, output)) {
                FusionStatus::Ok => {}
                FusionStatus::Idle => break,
                FusionStatus::Error(code) => {
                    asf_fatal!("{}: Foreground processing failed: {}", ID, code)
                }
            }
        }
    }

    pub async fn handle_message(&mut self, msg: &Message) {
        let (kind, raw) = match msg {
            Message::AccData(raw) => (SensorKind::Accelerometer, raw),
            Message::MagData(raw) => (SensorKind::Magnetometer, raw),
            Message::GyroData(raw) => (SensorKind::Gyroscope, raw),
            other => {
                warn!("{}: Unhandled message {:?}", ID, other.id());
                return;
            }
        };

        self.process_sample(kind, raw).await;

        if kind == SensorKind::Magnetometer {
            if let Err(e) = self.kernel.post(TaskId::AlgBg, Message::TrigAlgBg(MsgNoData)) {
                warn!("{}: Background trigger dropped: {:?}", ID, e);
            }
        }
    }
}

pub async fn main<F: FusionLibrary, L: LipsSink>(
    kernel: &'static Kernel,
    fusion: &'static FusionLock<F>,
    descriptors: [ConversionDescriptor; 3],
    sink: L,
) -> ! {
    info!("{}: Task started", ID);

    let mut algorithm = Algorithm::new(kernel, fusion, descriptors, sink);
    algorithm.init().await;

    loop {
        let buf = kernel.receive_message(TASK).await;
        algorithm.handle_message(&buf.msg).await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    extern crate std;
    use std::boxed::Box;
    use std::string::String;
    use std::vec::Vec;

    use futures_executor::block_on;

    use super::*;
    use crate::asf::testing::new_kernel;
    use crate::asf::MessageId;
    use crate::conversion::CookedSample;
    use crate::errors::FusionError;
    use crate::hif::packet_definitions::StepCounter;

    /// Fusion library that records its inputs and hands out queued outputs.
    #[derive(Default)]
    pub(crate) struct MockFusion {
        pub samples: Vec<(InputHandle, CookedSample)>,
        pub subscribed: Vec<SensorType>,
        pub pending: Vec<FusionOutput>,
        pub background_runs: usize,
        pub background_budget: usize,
    }

    impl FusionLibrary for MockFusion {
        fn initialize(&mut self) {}

        fn register_input(
            &mut self,
            kind: SensorKind,
            _: &ConversionDescriptor,
        ) -> Result<InputHandle, FusionError> {
            match kind {
                SensorKind::Gyroscope => Err(FusionError::InputRejected),
                _ => Ok(InputHandle(kind.index() as u8)),
            }
        }

        fn subscribe(&mut self, sensor: SensorType) -> Result<(), FusionError> {
            self.subscribed.push(sensor);
            Ok(())
        }

        fn set_data(&mut self, input: InputHandle, sample: &CookedSample) -> FusionStatus {
            self.samples.push((input, *sample));
            FusionStatus::Ok
        }

        fn do_foreground_processing(
            &mut self,
            output: &mut dyn FnMut(FusionOutput),
        ) -> FusionStatus {
            match self.pending.pop() {
                Some(next) => {
                    output(next);
                    FusionStatus::Ok
                }
                None => FusionStatus::Idle,
            }
        }

        fn do_background_processing(&mut self) -> FusionStatus {
            if self.background_runs < self.background_budget {
                self.background_runs += 1;
                FusionStatus::Ok
            } else {
                FusionStatus::Idle
            }
        }
    }

    #[derive(Default)]
    struct LineSink(Vec<String>);

    impl LipsSink for LineSink {
        fn emit_lips(&mut self, line: &str) {
            self.0.push(line.into());
        }
    }

    fn setup() -> (
        &'static Kernel,
        &'static FusionLock<MockFusion>,
        Algorithm<MockFusion, LineSink>,
    ) {
        let kernel = new_kernel();
        let fusion: &'static FusionLock<MockFusion> =
            Box::leak(Box::new(FusionLock::new(MockFusion::default())));
        let mut algorithm = Algorithm::new(
            kernel,
            fusion,
            [ConversionDescriptor::identity_i16(); 3],
            LineSink::default(),
        );
        block_on(algorithm.init());
        (kernel, fusion, algorithm)
    }

    #[test]
    fn test_init_registers_and_subscribes() {
        let (_, fusion, algorithm) = setup();
        assert_eq!(algorithm.inputs, [Some(InputHandle(0)), Some(InputHandle(1)), None]);
        assert_eq!(fusion.try_lock().unwrap().subscribed, SUBSCRIPTIONS);
    }

    #[test]
    fn test_sample_reaches_fusion() {
        let (kernel, fusion, mut algorithm) = setup();
        let raw = RawSample {
            timestamp: 40_000,
            axis: [1, -2, 3],
        };
        block_on(algorithm.handle_message(&Message::AccData(raw)));

        let fusion = fusion.try_lock().unwrap();
        let (input, cooked) = fusion.samples[0];
        assert_eq!(input, InputHandle(0));
        assert_eq!(cooked.axis, [1, -2, 3]);
        // 40000 ticks of 25 us is one second
        assert!((cooked.time_stamp - (1 << 24)).abs() < 64);

        // Accelerometer data does not trigger the background task
        assert!(kernel.receive_message_poll(TaskId::AlgBg).is_none());
    }

    #[test]
    fn test_unregistered_input_is_skipped() {
        let (_, fusion, mut algorithm) = setup();
        block_on(algorithm.handle_message(&Message::GyroData(RawSample::default())));
        assert!(fusion.try_lock().unwrap().samples.is_empty());
    }

    #[test]
    fn test_mag_triggers_background() {
        let (kernel, _, mut algorithm) = setup();
        block_on(algorithm.handle_message(&Message::MagData(RawSample::default())));

        let buf = kernel.receive_message_poll(TaskId::AlgBg).unwrap();
        assert_eq!(buf.id(), MessageId::TrigAlgBg);
    }

    #[test]
    fn test_outputs_are_published() {
        let (kernel, fusion, mut algorithm) = setup();
        let counter = SensorPacket::StepCounter(StepCounter {
            time_stamp: 5,
            total: 12,
        });
        fusion.try_lock().unwrap().pending = [
            FusionOutput::CalibrationUpdated(SensorKind::Magnetometer),
            FusionOutput::Result(counter.clone()),
        ]
        .into();

        block_on(algorithm.handle_message(&Message::AccData(RawSample::default())));

        let result = kernel.receive_message_poll(TaskId::HostComm).unwrap();
        assert_eq!(result.msg, Message::SensorResult(counter));

        let notice = kernel.receive_message_poll(TaskId::SensorAcq).unwrap();
        assert_eq!(
            notice.msg,
            Message::CalEvtNotify(MsgGeneric {
                byte: SensorKind::Magnetometer.index() as u8,
                ..MsgGeneric::default()
            })
        );
        assert!(fusion.try_lock().unwrap().pending.is_empty());
    }

    #[test]
    fn test_sample_lips_lines() {
        let (_, _, mut algorithm) = setup();
        LogFlags::SENSOR_LIPS.store();
        block_on(algorithm.handle_message(&Message::MagData(RawSample {
            timestamp: 0,
            axis: [1 << 12, 0, 0],
        })));
        LogFlags::empty().store();

        assert!(algorithm.sink.0[0].starts_with("{!RM,"));
        assert!(algorithm.sink.0[0].contains(",1.000000,0.000000,0.000000,"));
    }

    #[test]
    fn test_unhandled_message() {
        let (kernel, _, mut algorithm) = setup();
        block_on(algorithm.handle_message(&Message::TrigAlgBg(MsgNoData)));
        assert!(kernel.receive_message_poll(TaskId::HostComm).is_none());
    }
}
