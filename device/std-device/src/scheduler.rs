use common::asf::task::{TaskDescriptor, TaskId};
use common::errors::SpawnError;
use common::hw_abstraction::{Scheduler, StackRegion, TaskSpawner, ThreadHandle};
use embassy_executor::{SendSpawner, SpawnToken};

use crate::resources::{self, SimHostTransport, SimSensorDriver, StdoutLips};
use crate::thread_executor::Band;
use crate::KERNEL;

/// Hardware owned by the tasks. Each piece is handed out once, to the task
/// that drives it.
pub struct Resources {
    pub sensors: Option<SimSensorDriver>,
    pub transport: Option<SimHostTransport>,
}

/// Creates kernel tasks on the executor thread of their priority band.
/// Stacks are reserved by the kernel but unused here, every task runs on its
/// executor thread's stack.
pub struct HostScheduler {
    spawners: [SendSpawner; 3],
    resources: Resources,
    next_handle: u32,
}

impl HostScheduler {
    pub fn new(spawners: [SendSpawner; 3], resources: Resources) -> Self {
        Self {
            spawners,
            resources,
            next_handle: common::asf::BOOTSTRAP_HANDLE.0 + 1,
        }
    }

    fn spawn<S: Send>(&self, priority: u8, token: SpawnToken<S>) -> Result<(), SpawnError> {
        let band = Band::for_priority(priority);
        self.spawners[band.index()]
            .spawn(token)
            .map_err(|_| SpawnError::NoCapacity)?;
        log::debug!("Spawned task on {}", band.name());
        Ok(())
    }
}

impl TaskSpawner for HostScheduler {
    fn create_task(
        &mut self,
        task: &'static TaskDescriptor,
        stack: StackRegion,
    ) -> Result<ThreadHandle, SpawnError> {
        log::trace!("{} gets stack {:#06x}+{:#x}", task.name, stack.offset, stack.len);

        match task.id {
            TaskId::InstrManager => return Err(SpawnError::AlreadyRunning),
            TaskId::CmdHandler => self.spawn(task.priority, cmd_handler()),
            TaskId::SensorAcq => {
                let sensors = self.resources.sensors.take().ok_or(SpawnError::AlreadyRunning)?;
                self.spawn(task.priority, sensor_acq(sensors))
            }
            TaskId::HostComm => {
                let transport = self.resources.transport.take().ok_or(SpawnError::AlreadyRunning)?;
                self.spawn(task.priority, host_comm(transport))
            }
            TaskId::Algorithm => self.spawn(task.priority, algorithm()),
            TaskId::AlgBg => self.spawn(task.priority, alg_bg()),
        }?;

        let handle = ThreadHandle(self.next_handle);
        self.next_handle += 1;
        Ok(handle)
    }

    fn set_priority(&mut self, task: TaskId, priority: u8) {
        // Bands are fixed once spawned
        log::debug!("{:?} priority is now {}", task, priority);
    }
}

impl Scheduler for HostScheduler {
    fn start(self, bootstrap: &'static TaskDescriptor, _stack: StackRegion) -> ! {
        let spawner = self.spawners[Band::for_priority(bootstrap.priority).index()];
        if spawner.spawn(instr_manager(self)).is_err() {
            panic!("Failed to start {}", bootstrap.name);
        }

        loop {
            std::thread::park();
        }
    }
}

#[embassy_executor::task]
async fn instr_manager(scheduler: HostScheduler) {
    common::tasks::instr_manager::main(&KERNEL, scheduler).await
}

#[embassy_executor::task]
async fn cmd_handler() {
    common::tasks::cmd_handler::main(&KERNEL, &resources::CONSOLE).await
}

#[embassy_executor::task]
async fn sensor_acq(sensors: SimSensorDriver) {
    common::tasks::sensor_acq::main(&KERNEL, sensors).await
}

#[embassy_executor::task]
async fn host_comm(transport: SimHostTransport) {
    common::tasks::host_comm::main(&KERNEL, transport).await
}

#[embassy_executor::task]
async fn algorithm() {
    common::tasks::algorithm::main(
        &KERNEL,
        &resources::FUSION,
        SimSensorDriver::descriptors(),
        StdoutLips,
    )
    .await
}

#[embassy_executor::task]
async fn alg_bg() {
    common::tasks::alg_bg::main(&KERNEL, &resources::FUSION).await
}
