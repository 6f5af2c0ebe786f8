//! Timer control blocks and the slot table that maps hardware timer
//! callbacks back to them.

use core::cell::{Cell, RefCell};

use critical_section::CriticalSection;

use super::task::TaskId;
use crate::hw_abstraction::HwTimerId;

/// Guard word of an armed control block
pub const TIMER_SYS_ID: u32 = 0xC0DE_FEED;

/// Guard word of a control block that has fired or been killed
pub const TIMER_NOT_IN_USE: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
pub(crate) struct TimerControl {
    pub owner: TaskId,
    pub user_value: u16,
    pub ticks: u32,
    pub sys_use: u32,
    pub timer_id: Option<HwTimerId>,
}

/// A caller-owned timer control block. It must outlive any arming, so it
/// is normally a `static`.
pub struct AsfTimer {
    control: critical_section::Mutex<Cell<TimerControl>>,
}

impl Default for AsfTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl AsfTimer {
    pub const fn new() -> Self {
        Self {
            control: critical_section::Mutex::new(Cell::new(TimerControl {
                owner: TaskId::InstrManager,
                user_value: 0,
                ticks: 0,
                sys_use: 0,
                timer_id: None,
            })),
        }
    }

    /// Whether the timer is armed and has neither fired nor been killed.
    pub fn is_started(&self) -> bool {
        critical_section::with(|cs| self.control(cs).sys_use == TIMER_SYS_ID)
    }

    pub fn user_value(&self) -> u16 {
        critical_section::with(|cs| self.control(cs).user_value)
    }

    pub(crate) fn control(&self, cs: CriticalSection<'_>) -> TimerControl {
        self.control.borrow(cs).get()
    }

    pub(crate) fn set_control(&self, cs: CriticalSection<'_>, control: TimerControl) {
        self.control.borrow(cs).set(control)
    }

    pub(crate) fn update(&self, cs: CriticalSection<'_>, f: impl FnOnce(&mut TimerControl)) {
        let cell = self.control.borrow(cs);
        let mut control = cell.get();
        f(&mut control);
        cell.set(control);
    }
}

/// Table of armed timers. The slot index is the token given to the
/// hardware timer.
pub struct TimerRegistry<const N: usize> {
    slots: critical_section::Mutex<RefCell<[Option<&'static AsfTimer>; N]>>,
}

impl<const N: usize> Default for TimerRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TimerRegistry<N> {
    pub const fn new() -> Self {
        Self {
            slots: critical_section::Mutex::new(RefCell::new([None; N])),
        }
    }

    /// Put `timer` in the first free slot.
    pub(crate) fn insert(&self, cs: CriticalSection<'_>, timer: &'static AsfTimer) -> Option<usize> {
        let mut slots = self.slots.borrow_ref_mut(cs);
        let (index, slot) = slots.iter_mut().enumerate().find(|(_, s)| s.is_none())?;
        *slot = Some(timer);
        Some(index)
    }

    /// Empty slot `index`, returning the timer it held.
    pub(crate) fn take(&self, cs: CriticalSection<'_>, index: usize) -> Option<&'static AsfTimer> {
        self.slots.borrow_ref_mut(cs).get_mut(index)?.take()
    }

    /// Empty whichever slot holds `timer`. Returns false if none did.
    pub(crate) fn remove(&self, cs: CriticalSection<'_>, timer: &'static AsfTimer) -> bool {
        let mut slots = self.slots.borrow_ref_mut(cs);
        match slots
            .iter_mut()
            .find(|s| s.is_some_and(|t| core::ptr::eq(t, timer)))
        {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    pub fn armed(&self) -> usize {
        critical_section::with(|cs| self.slots.borrow_ref(cs).iter().flatten().count())
    }
}
