extern crate std;
use std::boxed::Box;
use std::sync::Mutex;
use std::vec::Vec;

use super::timer::AsfTimer;
use super::Kernel;
use crate::hw_abstraction::{HwTimerId, OneShotTimer};

/// Records armed tokens and lets the test fire them by hand.
#[derive(Default)]
pub struct ManualTimer {
    pub armed: Mutex<Vec<(u32, u16)>>,
}

impl OneShotTimer for ManualTimer {
    fn arm(&self, ticks: u32, token: u16) -> Option<HwTimerId> {
        let mut armed = self.armed.lock().unwrap();
        armed.push((ticks, token));
        Some(HwTimerId(armed.len() as u32))
    }

    fn cancel(&self, id: HwTimerId) -> bool {
        let mut armed = self.armed.lock().unwrap();
        let index = id.0 as usize - 1;
        if armed.get(index).is_some_and(|(ticks, _)| *ticks != 0) {
            armed[index].0 = 0;
            true
        } else {
            false
        }
    }
}

/// A leaked kernel without tasks, with every queue at its table depth.
pub fn new_kernel() -> &'static Kernel {
    let kernel = new_kernel_uninit();
    kernel.init_messaging();
    kernel
}

pub fn new_kernel_uninit() -> &'static Kernel {
    let timer: &'static ManualTimer = Box::leak(Box::default());
    Box::leak(Box::new(Kernel::new(timer)))
}

pub fn new_timer() -> &'static AsfTimer {
    Box::leak(Box::new(AsfTimer::new()))
}
