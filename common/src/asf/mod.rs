//! Application support framework: task queues, pooled messages, one-shot
//! timers and task bring-up, all owned by a single [`Kernel`] context.

use core::cell::RefCell;

use mutex::raw_impls::cs::CriticalSectionRawMutex as CSM;

use crate::config::{MAX_QUEUE_DEPTH, MAX_SYSTEM_MESSAGES, MAX_TIMERS};
use crate::errors::AsfError;
use crate::hw_abstraction::{OneShotTimer, Scheduler, TaskSpawner, ThreadHandle};

pub mod message;
pub mod pool;
pub mod queue;
pub mod task;
pub mod timer;

#[cfg(test)]
pub(crate) mod testing;

use message::{Message, MsgBuffer, MsgTimerExpiry};
use pool::MessagePool;
use queue::TaskQueue;
use task::{StackHeap, TaskId, BOOTSTRAP_TASK, NUM_TASKS, STACK_ALIGN, TASK_TABLE};
use timer::{AsfTimer, TimerControl, TimerRegistry, TIMER_NOT_IN_USE, TIMER_SYS_ID};

pub use message::MessageId;

/// Handle of the bootstrap task, which is started directly by the scheduler
pub const BOOTSTRAP_HANDLE: ThreadHandle = ThreadHandle(1);

/// All state shared between tasks and interrupts. There is one kernel per
/// system, normally a `static`.
pub struct Kernel {
    pool: MessagePool,
    queues: [TaskQueue<MsgBuffer, MAX_QUEUE_DEPTH, CSM>; NUM_TASKS],
    timers: TimerRegistry<MAX_TIMERS>,
    handles: critical_section::Mutex<RefCell<[Option<ThreadHandle>; NUM_TASKS]>>,
    stacks: StackHeap,
    hw_timer: &'static dyn OneShotTimer,
}

impl Kernel {
    pub const fn new(hw_timer: &'static dyn OneShotTimer) -> Self {
        Self {
            pool: MessagePool::new(MAX_SYSTEM_MESSAGES),
            queues: [const { TaskQueue::new() }; NUM_TASKS],
            timers: TimerRegistry::new(),
            handles: critical_section::Mutex::new(RefCell::new([None; NUM_TASKS])),
            stacks: StackHeap::new(),
            hw_timer,
        }
    }

    pub fn pool(&self) -> &MessagePool {
        &self.pool
    }

    pub fn timers(&self) -> &TimerRegistry<MAX_TIMERS> {
        &self.timers
    }

    pub fn handle(&self, task: TaskId) -> Option<ThreadHandle> {
        critical_section::with(|cs| self.handles.borrow_ref(cs)[task.index()])
    }

    fn init_messaging(&self) {
        for task in TASK_TABLE.iter() {
            self.queues[task.id.index()].init(task.queue_depth);
        }
    }

    // ---- Messages ----

    /// Take a block from the message pool for `msg`.
    pub fn create_message(&'static self, msg: Message) -> Result<MsgBuffer, AsfError> {
        if !self.pool.acquire() {
            return Err(AsfError::MsgBuff);
        }
        Ok(MsgBuffer::new(msg, &self.pool))
    }

    /// Queue `buf` for `dest`. A full queue frees the message.
    pub fn send_message(&self, dest: TaskId, mut buf: MsgBuffer) -> Result<(), AsfError> {
        buf.header.dest = Some(dest);
        self.queues[dest.index()]
            .try_send(buf)
            .map_err(|_| AsfError::QueueFull)
    }

    /// Send from interrupt context, where a full queue cannot be handled.
    pub fn send_message_from_isr(&self, dest: TaskId, buf: MsgBuffer) {
        let id = buf.id();
        if self.send_message(dest, buf).is_err() {
            asf_fatal!("ASF: Queue of {:?} full for {:?} from ISR", dest, id);
        }
    }

    /// Create and send in one step. The message is freed on failure.
    pub fn post(&'static self, dest: TaskId, msg: Message) -> Result<(), AsfError> {
        let buf = self.create_message(msg)?;
        self.send_message(dest, buf)
    }

    /// Wait for the next message queued for `task`.
    pub async fn receive_message(&self, task: TaskId) -> MsgBuffer {
        self.queues[task.index()].receive().await
    }

    pub fn receive_message_poll(&self, task: TaskId) -> Option<MsgBuffer> {
        self.queues[task.index()].try_receive()
    }

    /// Return the block of `buf` to the pool.
    pub fn delete_message(&self, buf: MsgBuffer) {
        drop(buf)
    }

    // ---- Timers ----

    /// Arm `timer` to send a [`MessageId::TimerExpiry`] carrying `user_value`
    /// to `owner` after `ticks`. Returns the slot the timer occupies.
    pub fn start_timer(
        &'static self,
        owner: TaskId,
        user_value: u16,
        ticks: u32,
        timer: &'static AsfTimer,
    ) -> usize {
        let slot = critical_section::with(|cs| {
            asf_assert!(
                timer.control(cs).sys_use != TIMER_SYS_ID,
                "ASF: Timer {} started twice",
                user_value
            );

            timer.set_control(
                cs,
                TimerControl {
                    owner,
                    user_value,
                    ticks,
                    sys_use: TIMER_SYS_ID,
                    timer_id: None,
                },
            );

            match self.timers.insert(cs, timer) {
                Some(slot) => slot,
                None => asf_fatal!("ASF: No free timer slot for {}", user_value),
            }
        });

        let Some(id) = self.hw_timer.arm(ticks, slot as u16) else {
            asf_fatal!("ASF: Hardware timer unavailable for {}", user_value);
        };

        critical_section::with(|cs| timer.update(cs, |control| control.timer_id = Some(id)));

        slot
    }

    /// Hardware timer callback for the timer in slot `token`. Runs in
    /// interrupt context.
    pub fn timer_expiry(&'static self, token: u16) {
        let control = critical_section::with(|cs| {
            let Some(timer) = self.timers.take(cs, token as usize) else {
                asf_fatal!("ASF: Expiry of empty timer slot {}", token);
            };

            let control = timer.control(cs);
            asf_assert!(
                control.sys_use == TIMER_SYS_ID,
                "ASF: Expired timer {} was not armed",
                control.user_value
            );
            timer.update(cs, |c| c.sys_use = TIMER_NOT_IN_USE);
            control
        });

        let msg = Message::TimerExpiry(MsgTimerExpiry {
            user_value: control.user_value,
            timer_id: control.timer_id,
        });

        match self.create_message(msg) {
            Ok(buf) => self.send_message_from_isr(control.owner, buf),
            Err(_) => asf_fatal!("ASF: No message block for timer {}", control.user_value),
        }
    }

    /// Cancel an armed timer. Killing a timer that is not armed is fatal.
    pub fn kill_timer(&'static self, timer: &'static AsfTimer) {
        let control = critical_section::with(|cs| timer.control(cs));

        let cancelled = match control.timer_id {
            Some(id) if control.sys_use == TIMER_SYS_ID => self.hw_timer.cancel(id),
            _ => false,
        };
        asf_assert!(cancelled, "ASF: Failed to cancel timer {}", control.user_value);

        let removed = critical_section::with(|cs| {
            timer.update(cs, |c| c.sys_use = TIMER_NOT_IN_USE);
            self.timers.remove(cs, timer)
        });
        asf_assert!(removed, "ASF: Killed timer {} not in table", control.user_value);
    }

    // ---- Tasks ----

    /// Set up the message queues and create every task but the bootstrap
    /// task. Called by the bootstrap task, which is then lowered to its own
    /// table priority.
    pub fn initialize_tasks(&'static self, spawner: &mut impl TaskSpawner) {
        self.init_messaging();

        for task in TASK_TABLE.iter().filter(|t| t.id != BOOTSTRAP_TASK) {
            let Some(stack) = self.stacks.allocate(task.stack_size) else {
                asf_fatal!("ASF: No stack for task {}", task.name);
            };
            asf_assert!(
                stack.offset % STACK_ALIGN == 0,
                "ASF: Stack of {} misaligned",
                task.name
            );

            let handle = match spawner.create_task(task, stack) {
                Ok(handle) => handle,
                Err(e) => asf_fatal!("ASF: Failed to create {}: {:?}", task.name, e),
            };

            critical_section::with(|cs| {
                self.handles.borrow_ref_mut(cs)[task.id.index()] = Some(handle)
            });
            debug!("ASF: Created task {} at priority {}", task.name, task.priority);
        }

        let bootstrap = BOOTSTRAP_TASK.descriptor();
        spawner.set_priority(bootstrap.id, bootstrap.priority);
    }

    /// Start the bootstrap task and the scheduler. Never returns.
    pub fn asf_initialise_tasks(&'static self, scheduler: impl Scheduler) -> ! {
        let bootstrap = BOOTSTRAP_TASK.descriptor();
        let Some(stack) = self.stacks.allocate(bootstrap.stack_size) else {
            asf_fatal!("ASF: No stack for task {}", bootstrap.name);
        };

        critical_section::with(|cs| {
            self.handles.borrow_ref_mut(cs)[bootstrap.id.index()] = Some(BOOTSTRAP_HANDLE)
        });

        scheduler.start(bootstrap, stack)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use futures_executor::block_on;

    use super::message::MsgNoData;
    use super::task::TaskDescriptor;
    use super::testing::{new_kernel, new_kernel_uninit, new_timer};
    use super::*;
    use crate::errors::SpawnError;
    use crate::hw_abstraction::{HwTimerId, StackRegion};

    #[test]
    fn test_fifo_ordering() {
        let kernel = new_kernel();
        for value in 0..3 {
            let msg = Message::TimerExpiry(MsgTimerExpiry {
                user_value: value,
                timer_id: None,
            });
            kernel.post(TaskId::Algorithm, msg).unwrap();
        }

        for value in 0..3 {
            let buf = block_on(kernel.receive_message(TaskId::Algorithm));
            assert_eq!(buf.header.dest, Some(TaskId::Algorithm));
            match buf.msg {
                Message::TimerExpiry(ref exp) => assert_eq!(exp.user_value, value),
                ref other => panic!("unexpected {:?}", other),
            }
        }
        assert!(kernel.receive_message_poll(TaskId::Algorithm).is_none());
        assert_eq!(kernel.pool().in_use(), 0);
    }

    #[test]
    fn test_full_queue_frees_message() {
        let kernel = new_kernel();
        // Command handler queue depth is 4
        for _ in 0..4 {
            kernel.post(TaskId::CmdHandler, Message::TrigAlgBg(MsgNoData)).unwrap();
        }
        assert_eq!(
            kernel.post(TaskId::CmdHandler, Message::TrigAlgBg(MsgNoData)),
            Err(AsfError::QueueFull)
        );
        assert_eq!(kernel.pool().in_use(), 4);
    }

    #[test]
    fn test_pool_exhaustion() {
        let kernel = new_kernel();
        let mut held: Vec<_> = (0..MAX_SYSTEM_MESSAGES)
            .map(|_| kernel.create_message(Message::TrigAlgBg(MsgNoData)).unwrap())
            .collect();

        let err = kernel.create_message(Message::TrigAlgBg(MsgNoData)).unwrap_err();
        assert_eq!(err, AsfError::MsgBuff);

        kernel.delete_message(held.pop().unwrap());
        assert_eq!(kernel.pool().free(), 1);
    }

    #[test]
    fn test_header_length_is_payload_size() {
        let kernel = new_kernel();
        let buf = kernel.create_message(Message::TrigAlgBg(MsgNoData)).unwrap();
        assert_eq!(buf.header.length, MessageId::TrigAlgBg.payload_size());
        assert_eq!(buf.header.dest, None);
    }

    #[test]
    fn test_timer_expiry_sends_message() {
        let kernel = new_kernel();
        let timer = new_timer();

        let slot = kernel.start_timer(TaskId::SensorAcq, 0x55B0, 20, timer);
        assert!(timer.is_started());
        assert_eq!(kernel.timers().armed(), 1);

        kernel.timer_expiry(slot as u16);
        assert!(!timer.is_started());
        assert_eq!(kernel.timers().armed(), 0);

        let buf = kernel.receive_message_poll(TaskId::SensorAcq).unwrap();
        assert_eq!(
            buf.msg,
            Message::TimerExpiry(MsgTimerExpiry {
                user_value: 0x55B0,
                timer_id: Some(HwTimerId(1)),
            })
        );

        // A fired timer may be started again
        kernel.start_timer(TaskId::SensorAcq, 0x55B0, 20, timer);
        assert!(timer.is_started());
    }

    #[test]
    fn test_timers_get_distinct_slots() {
        let kernel = new_kernel();
        let a = kernel.start_timer(TaskId::SensorAcq, 1, 10, new_timer());
        let b = kernel.start_timer(TaskId::SensorAcq, 2, 10, new_timer());
        assert_ne!(a, b);
    }

    #[test]
    #[should_panic]
    fn test_double_start_is_fatal() {
        let kernel = new_kernel();
        let timer = new_timer();
        kernel.start_timer(TaskId::InstrManager, 1, 10, timer);
        kernel.start_timer(TaskId::InstrManager, 1, 10, timer);
    }

    #[test]
    #[should_panic]
    fn test_expiry_of_empty_slot_is_fatal() {
        new_kernel().timer_expiry(3);
    }

    #[test]
    fn test_kill_timer() {
        let kernel = new_kernel();
        let timer = new_timer();
        let slot = kernel.start_timer(TaskId::InstrManager, 7, 10, timer);

        kernel.kill_timer(timer);
        assert!(!timer.is_started());
        assert_eq!(kernel.timers().armed(), 0);

        // The slot is free for the next timer
        assert_eq!(kernel.start_timer(TaskId::InstrManager, 8, 10, new_timer()), slot);
    }

    #[test]
    #[should_panic]
    fn test_kill_unarmed_timer_is_fatal() {
        new_kernel().kill_timer(new_timer());
    }

    #[test]
    #[should_panic]
    fn test_timer_table_exhaustion_is_fatal() {
        let kernel = new_kernel();
        for i in 0..=MAX_TIMERS {
            kernel.start_timer(TaskId::InstrManager, i as u16, 10, new_timer());
        }
    }

    #[derive(Default)]
    struct RecordingSpawner {
        created: Vec<(TaskId, StackRegion)>,
        priorities: Vec<(TaskId, u8)>,
    }

    impl TaskSpawner for RecordingSpawner {
        fn create_task(
            &mut self,
            task: &'static TaskDescriptor,
            stack: StackRegion,
        ) -> Result<ThreadHandle, SpawnError> {
            self.created.push((task.id, stack));
            Ok(ThreadHandle(self.created.len() as u32 + 1))
        }

        fn set_priority(&mut self, task: TaskId, priority: u8) {
            self.priorities.push((task, priority));
        }
    }

    #[test]
    fn test_initialize_tasks() {
        let kernel = new_kernel_uninit();
        let mut spawner = RecordingSpawner::default();

        kernel.initialize_tasks(&mut spawner);

        let ids: Vec<_> = spawner.created.iter().map(|(id, _)| *id).collect();
        assert_eq!(
            ids,
            [
                TaskId::CmdHandler,
                TaskId::SensorAcq,
                TaskId::HostComm,
                TaskId::Algorithm,
                TaskId::AlgBg
            ]
        );
        assert!(spawner.created.iter().all(|(_, s)| s.offset % STACK_ALIGN == 0));
        assert_eq!(spawner.priorities, [(TaskId::InstrManager, 60)]);
        assert_eq!(kernel.handle(TaskId::HostComm), Some(ThreadHandle(4)));
        assert_eq!(kernel.handle(TaskId::InstrManager), None);

        // Queues exist with their table depths
        assert_eq!(kernel.queues[TaskId::SensorAcq.index()].depth(), 16);
    }

    struct FailingSpawner;

    impl TaskSpawner for FailingSpawner {
        fn create_task(
            &mut self,
            _: &'static TaskDescriptor,
            _: StackRegion,
        ) -> Result<ThreadHandle, SpawnError> {
            Err(SpawnError::NoCapacity)
        }

        fn set_priority(&mut self, _: TaskId, _: u8) {}
    }

    #[test]
    #[should_panic]
    fn test_task_creation_failure_is_fatal() {
        let kernel = new_kernel_uninit();
        kernel.initialize_tasks(&mut FailingSpawner);
    }
}
