//! Capabilities the core consumes from the board support and from the
//! sensor fusion library. Implementations live in the device crates.

use embassy_time::Duration;

use crate::asf::task::{TaskDescriptor, TaskId};
use crate::conversion::{ConversionDescriptor, CookedSample, RawSample, SensorKind};
use crate::errors::{FusionError, SpawnError};
use crate::hif::packet_definitions::SensorPacket;
use crate::hif::SensorType;

/// Identifier handed out by a hardware timer when it is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HwTimerId(pub u32);

/// Handle of a created task, as reported by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThreadHandle(pub u32);

/// A stack carved out of the kernel's stack heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StackRegion {
    /// Byte offset from the start of the heap
    pub offset: usize,
    pub len: usize,
}

/// One-shot hardware timer. `arm` schedules a single call to
/// [`Kernel::timer_expiry`](crate::asf::Kernel::timer_expiry) with `token`
/// after `ticks`, from interrupt context.
pub trait OneShotTimer: Sync {
    /// Returns `None` when no hardware timer is available.
    fn arm(&self, ticks: u32, token: u16) -> Option<HwTimerId>;

    /// Returns whether the timer was still pending.
    fn cancel(&self, id: HwTimerId) -> bool;
}

pub trait TaskSpawner {
    fn create_task(
        &mut self,
        task: &'static TaskDescriptor,
        stack: StackRegion,
    ) -> Result<ThreadHandle, SpawnError>;

    fn set_priority(&mut self, task: TaskId, priority: u8);
}

pub trait Scheduler: TaskSpawner {
    /// Start `bootstrap` and hand the CPU to the scheduler.
    fn start(self, bootstrap: &'static TaskDescriptor, stack: StackRegion) -> !;
}

pub trait SensorDriver {
    /// Latest sample of `kind`, if the sensor has one ready.
    fn read(&mut self, kind: SensorKind) -> Option<RawSample>;

    fn set_enabled(&mut self, kind: SensorKind, enabled: bool);
}

/// Handle returned when registering an input with the fusion library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputHandle(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FusionStatus {
    Ok,
    /// Nothing left to process
    Idle,
    Error(i16),
}

/// Produced from within the fusion processing calls.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FusionOutput {
    Result(SensorPacket),
    CalibrationUpdated(SensorKind),
}

pub trait FusionLibrary {
    fn initialize(&mut self);

    fn register_input(
        &mut self,
        kind: SensorKind,
        descriptor: &ConversionDescriptor,
    ) -> Result<InputHandle, FusionError>;

    fn subscribe(&mut self, sensor: SensorType) -> Result<(), FusionError>;

    fn set_data(&mut self, input: InputHandle, sample: &CookedSample) -> FusionStatus;

    fn do_foreground_processing(&mut self, output: &mut dyn FnMut(FusionOutput)) -> FusionStatus;

    fn do_background_processing(&mut self) -> FusionStatus;
}

/// Sink for LIPS diagnostic lines.
pub trait LipsSink {
    fn emit_lips(&mut self, line: &str);
}

/// Out-of-band signalling towards the host.
#[allow(async_fn_in_trait)]
pub trait HostTransport: LipsSink {
    fn assert_interrupt(&mut self);

    fn deassert_interrupt(&mut self);

    /// Wait for the host to collect the posted packet. Returns false on
    /// timeout.
    async fn wait_transfer_done(&mut self, timeout: Duration) -> bool;
}
