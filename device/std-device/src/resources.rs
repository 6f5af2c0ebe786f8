use std::io::Write as _;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use common::config::{TICKS_PER_SEC, US_PER_RTC_TICK};
use common::conversion::{AxisMap, ConversionDescriptor, CookedSample, RawSample, SensorKind};
use common::embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use common::embassy_sync::pipe::Pipe;
use common::errors::FusionError;
use common::hif::packet_definitions::{SensorPacket, StepCounter, StepDetector};
use common::hif::SensorType;
use common::hw_abstraction::{
    FusionLibrary, FusionOutput, FusionStatus, HostTransport, HwTimerId, InputHandle, LipsSink,
    OneShotTimer, SensorDriver,
};
use common::tasks::FusionLock;
use tokio::io::AsyncReadExt;

// ------------------------- One-shot timer -------------------------

/// One-shot timers backed by sleeping tokio tasks. Expiry is delivered to
/// the kernel from the runtime thread, which plays the role of the timer
/// interrupt.
pub struct ThreadTimer {
    next_id: AtomicU32,
    pending: Mutex<Vec<u32>>,
}

pub static HW_TIMER: ThreadTimer = ThreadTimer {
    next_id: AtomicU32::new(1),
    pending: Mutex::new(Vec::new()),
};

impl ThreadTimer {
    /// Remove `id` from the pending set. Returns false if it already fired
    /// or was cancelled.
    fn take(&self, id: u32) -> bool {
        let Ok(mut pending) = self.pending.lock() else {
            return false;
        };
        match pending.iter().position(|p| *p == id) {
            Some(index) => {
                pending.swap_remove(index);
                true
            }
            None => false,
        }
    }
}

impl OneShotTimer for ThreadTimer {
    fn arm(&self, ticks: u32, token: u16) -> Option<HwTimerId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pending.lock().ok()?.push(id);

        let delay = Duration::from_micros(ticks as u64 * 1_000_000 / TICKS_PER_SEC as u64);
        crate::thread_executor::RUNTIME.spawn(async move {
            tokio::time::sleep(delay).await;
            if HW_TIMER.take(id) {
                crate::KERNEL.timer_expiry(token);
            }
        });

        Some(HwTimerId(id))
    }

    fn cancel(&self, id: HwTimerId) -> bool {
        self.take(id.0)
    }
}

// ------------------------- Sensors -------------------------

/// Free running counter with the resolution of the hub's timestamp clock.
fn rtc_ticks(epoch: Instant) -> u32 {
    (epoch.elapsed().as_micros() / US_PER_RTC_TICK as u128) as u32
}

/// Synthetic IMU and magnetometer. The device sways slowly around its x axis
/// and bounces at walking cadence.
pub struct SimSensorDriver {
    epoch: Instant,
    enabled: [bool; 3],
}

impl SimSensorDriver {
    /// 1 g in driver units
    pub const ACC_1G: f32 = 4096.0;
    /// 1 rad/s in driver units
    pub const GYR_1RAD: f32 = 1024.0;
    /// Earth field in driver units, 16 per uT
    pub const MAG_FIELD: f32 = 480.0;

    /// Conversion to g and rad/s in Q24 and uT in Q12. The board is mounted
    /// with its y axis reversed relative to the body frame.
    pub const fn descriptors() -> [ConversionDescriptor; 3] {
        let base = ConversionDescriptor::identity_i16();
        let axis_map = [
            AxisMap::PlusX as u8,
            AxisMap::MinusY as u8,
            AxisMap::PlusZ as u8,
        ];
        [
            ConversionDescriptor {
                axis_map,
                scale: [1 << 24; 3],
                ..base
            },
            ConversionDescriptor {
                axis_map,
                scale: [1 << 20; 3],
                ..base
            },
            ConversionDescriptor {
                axis_map,
                scale: [1 << 26; 3],
                ..base
            },
        ]
    }

    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            enabled: [false; 3],
        }
    }
}

impl Default for SimSensorDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorDriver for SimSensorDriver {
    fn read(&mut self, kind: SensorKind) -> Option<RawSample> {
        if !self.enabled[kind.index()] {
            return None;
        }

        let t = self.epoch.elapsed().as_secs_f32();
        let sway = 0.3 * (0.5 * t).sin();
        let bounce = 0.25 * (std::f32::consts::TAU * 1.8 * t).sin();

        let axis = match kind {
            SensorKind::Accelerometer => [
                0.0,
                sway.sin() * Self::ACC_1G,
                (sway.cos() + bounce) * Self::ACC_1G,
            ],
            SensorKind::Magnetometer => [
                Self::MAG_FIELD,
                0.0,
                -sway.sin() * Self::MAG_FIELD,
            ],
            SensorKind::Gyroscope => [0.15 * (0.5 * t).cos() * Self::GYR_1RAD, 0.0, 0.0],
        };

        Some(RawSample {
            timestamp: rtc_ticks(self.epoch),
            axis: axis.map(|v| v as i32),
        })
    }

    fn set_enabled(&mut self, kind: SensorKind, enabled: bool) {
        log::debug!("sim: {kind:?} enabled: {enabled}");
        self.enabled[kind.index()] = enabled;
    }
}

// ------------------------- Fusion -------------------------

/// Minimal stand-in for the fusion library: a threshold step detector on the
/// accelerometer and a magnetometer calibration that converges after a
/// fixed number of samples.
#[derive(Default)]
pub struct SimFusion {
    subscribed: Vec<SensorType>,
    pending: Vec<FusionOutput>,
    above_threshold: bool,
    steps: u64,
    mag_samples: u32,
    background_work: u32,
}

pub static FUSION: FusionLock<SimFusion> = FusionLock::new(SimFusion {
    subscribed: Vec::new(),
    pending: Vec::new(),
    above_threshold: false,
    steps: 0,
    mag_samples: 0,
    background_work: 0,
});

impl SimFusion {
    const STEP_THRESHOLD: i64 = 1 << 24;
    const MAG_CAL_SAMPLES: u32 = 50;

    fn wants(&self, sensor: SensorType) -> bool {
        self.subscribed.contains(&sensor)
    }

    fn on_accel(&mut self, sample: &CookedSample) {
        // Squared magnitude in Q24, compared against 1 g plus margin
        let norm = sample.axis.iter().map(|&v| (v as i64 >> 12).pow(2)).sum::<i64>();
        let above = norm > Self::STEP_THRESHOLD + Self::STEP_THRESHOLD / 8;

        if above && !self.above_threshold {
            self.steps += 1;
            let time_stamp = sample.time_stamp.max(0) as u64;
            if self.wants(SensorType::StepDetector) {
                self.pending.push(FusionOutput::Result(SensorPacket::StepDetector(StepDetector {
                    time_stamp,
                    detected: true,
                })));
            }
            if self.wants(SensorType::StepCounter) {
                self.pending.push(FusionOutput::Result(SensorPacket::StepCounter(StepCounter {
                    time_stamp,
                    total: self.steps,
                })));
            }
        }
        self.above_threshold = above;
    }

    fn on_mag(&mut self) {
        self.mag_samples += 1;
        self.background_work += 1;
        if self.mag_samples == Self::MAG_CAL_SAMPLES {
            self.pending
                .push(FusionOutput::CalibrationUpdated(SensorKind::Magnetometer));
        }
    }
}

impl FusionLibrary for SimFusion {
    fn initialize(&mut self) {
        log::info!("sim: Fusion initialized");
    }

    fn register_input(
        &mut self,
        kind: SensorKind,
        _descriptor: &ConversionDescriptor,
    ) -> Result<InputHandle, FusionError> {
        Ok(InputHandle(kind.index() as u8))
    }

    fn subscribe(&mut self, sensor: SensorType) -> Result<(), FusionError> {
        match sensor {
            SensorType::StepDetector | SensorType::StepCounter => {
                self.subscribed.push(sensor);
                Ok(())
            }
            _ => Err(FusionError::OutputUnavailable),
        }
    }

    fn set_data(&mut self, input: InputHandle, sample: &CookedSample) -> FusionStatus {
        match input.0 {
            0 => self.on_accel(sample),
            1 => self.on_mag(),
            2 => {}
            other => return FusionStatus::Error(other as i16),
        }
        FusionStatus::Ok
    }

    fn do_foreground_processing(&mut self, output: &mut dyn FnMut(FusionOutput)) -> FusionStatus {
        if self.pending.is_empty() {
            return FusionStatus::Idle;
        }
        self.pending.drain(..).for_each(|out| output(out));
        FusionStatus::Ok
    }

    fn do_background_processing(&mut self) -> FusionStatus {
        match self.background_work.checked_sub(1) {
            Some(left) => {
                self.background_work = left;
                FusionStatus::Ok
            }
            None => FusionStatus::Idle,
        }
    }
}

// ------------------------- Host side -------------------------

/// LIPS lines go straight to stdout.
#[derive(Default)]
pub struct StdoutLips;

impl LipsSink for StdoutLips {
    fn emit_lips(&mut self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        _ = stdout.write_all(line.as_bytes());
        _ = stdout.flush();
    }
}

/// Host that collects every packet shortly after the interrupt.
#[derive(Default)]
pub struct SimHostTransport {
    lips: StdoutLips,
    interrupt: bool,
}

impl SimHostTransport {
    const HOST_LATENCY: common::embassy_time::Duration =
        common::embassy_time::Duration::from_micros(200);
}

impl LipsSink for SimHostTransport {
    fn emit_lips(&mut self, line: &str) {
        self.lips.emit_lips(line)
    }
}

impl HostTransport for SimHostTransport {
    fn assert_interrupt(&mut self) {
        self.interrupt = true;
    }

    fn deassert_interrupt(&mut self) {
        self.interrupt = false;
    }

    async fn wait_transfer_done(&mut self, timeout: common::embassy_time::Duration) -> bool {
        let latency = Self::HOST_LATENCY;
        common::embassy_time::Timer::after(latency.min(timeout)).await;
        self.interrupt && latency <= timeout
    }
}

// ------------------------- Console -------------------------

pub type ConsolePipe = Pipe<CriticalSectionRawMutex, 64>;

pub static CONSOLE: ConsolePipe = Pipe::new();

/// Forward stdin into the console pipe read by the command handler.
pub fn run_stdin_console() {
    crate::thread_executor::RUNTIME.spawn(async {
        let mut stdin = tokio::io::stdin();
        let mut buf = [0u8; 64];
        loop {
            match stdin.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => CONSOLE.write_all(&buf[..n]).await,
                Err(error) => {
                    log::warn!("Stdin read failed: {error}");
                    break;
                }
            }
        }
    });
}
