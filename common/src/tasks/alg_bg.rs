//! Low priority fusion work, triggered by the foreground task.

use crate::asf::message::Message;
use crate::asf::task::TaskId;
use crate::asf::Kernel;
use crate::hw_abstraction::{FusionLibrary, FusionStatus};

use super::FusionLock;

const ID: &str = "alg_bg";
const TASK: TaskId = TaskId::AlgBg;

/// Run background processing until the library reports idle. The lock is
/// released between steps so foreground work can interleave. Returns the
/// number of steps that did work.
pub async fn run_background<F: FusionLibrary>(fusion: &FusionLock<F>) -> usize {
    let mut steps = 0;
    loop {
        let status = fusion.lock().await.do_background_processing();
        match status {
            FusionStatus::Ok => steps += 1,
            FusionStatus::Idle => return steps,
            FusionStatus::Error(code) => {
                asf_fatal!("{}: Background processing failed: {}", ID, code)
            }
        }
        embassy_futures::yield_now().await;
    }
}

pub async fn main<F: FusionLibrary>(kernel: &'static Kernel, fusion: &'static FusionLock<F>) -> ! {
    info!("{}: Task started", ID);

    loop {
        let buf = kernel.receive_message(TASK).await;
        match buf.msg {
            Message::TrigAlgBg(_) => {
                let steps = run_background(fusion).await;
                trace!("{}: {} background steps", ID, steps);
            }
            ref other => warn!("{}: Unhandled message {:?}", ID, other.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_executor::block_on;

    use super::*;
    use crate::tasks::algorithm::tests::MockFusion;

    #[test]
    fn test_runs_until_idle() {
        let fusion = FusionLock::new(MockFusion {
            background_budget: 3,
            ..MockFusion::default()
        });
        assert_eq!(block_on(run_background(&fusion)), 3);
        assert_eq!(block_on(run_background(&fusion)), 0);
        assert_eq!(fusion.try_lock().unwrap().background_runs, 3);
    }
}
