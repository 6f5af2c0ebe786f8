//! Application tasks. Each task is an endless `main` that waits on its
//! kernel queue. The device crate wraps them in executor tasks with its
//! concrete drivers.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

pub mod alg_bg;
pub mod algorithm;
pub mod cmd_handler;
pub mod host_comm;
pub mod instr_manager;
pub mod sensor_acq;

/// Serializes foreground and background calls into the fusion library.
pub type FusionLock<F> = Mutex<CriticalSectionRawMutex, F>;
