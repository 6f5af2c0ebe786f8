//! Bootstrap task. Brings up the other tasks and keeps a coarse wall clock.

use crate::asf::message::Message;
use crate::asf::task::TaskId;
use crate::asf::timer::AsfTimer;
use crate::asf::Kernel;
use crate::config::{msec_to_ticks, TIMER_REF_RTC_UPDATE};
use crate::hw_abstraction::TaskSpawner;

const ID: &str = "instr_manager";
const TASK: TaskId = TaskId::InstrManager;

/// Update interval of the clock [ms]
pub const RTC_PERIOD_MS: u32 = 1000;

static RTC_TIMER: AsfTimer = AsfTimer::new();

/// Time since boot, advanced by the RTC timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtcClock {
    pub hours: u32,
    pub minutes: u8,
    pub seconds: u8,
    pub msec: u16,
}

impl RtcClock {
    pub const fn new() -> Self {
        Self {
            hours: 0,
            minutes: 0,
            seconds: 0,
            msec: 0,
        }
    }

    pub fn advance(&mut self, msec: u32) {
        let total = self.msec as u32 + msec;
        self.msec = (total % 1000) as u16;

        let seconds = self.seconds as u32 + total / 1000;
        self.seconds = (seconds % 60) as u8;

        let minutes = self.minutes as u32 + seconds / 60;
        self.minutes = (minutes % 60) as u8;

        self.hours += minutes / 60;
    }
}

impl core::fmt::Display for RtcClock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}:{:02}:{:02}.{:03}",
            self.hours, self.minutes, self.seconds, self.msec
        )
    }
}

fn start_rtc_timer(kernel: &'static Kernel, timer: &'static AsfTimer) {
    kernel.start_timer(TASK, TIMER_REF_RTC_UPDATE, msec_to_ticks(RTC_PERIOD_MS), timer);
}

/// Handle one message. Returns true when the clock advanced.
fn handle_message(
    kernel: &'static Kernel,
    timer: &'static AsfTimer,
    clock: &mut RtcClock,
    msg: &Message,
) -> bool {
    match msg {
        Message::TimerExpiry(expiry) if expiry.user_value == TIMER_REF_RTC_UPDATE => {
            clock.advance(RTC_PERIOD_MS);
            info!("TIME: {}", clock);
            start_rtc_timer(kernel, timer);
            true
        }
        other => {
            warn!("{}: Unhandled message {:?}", ID, other.id());
            false
        }
    }
}

pub async fn main(kernel: &'static Kernel, mut spawner: impl TaskSpawner) -> ! {
    info!("{}: Task started", ID);

    kernel.initialize_tasks(&mut spawner);
    info!("{}: All tasks created", ID);

    let mut clock = RtcClock::new();
    start_rtc_timer(kernel, &RTC_TIMER);

    loop {
        let buf = kernel.receive_message(TASK).await;
        handle_message(kernel, &RTC_TIMER, &mut clock, &buf.msg);
    }
}
