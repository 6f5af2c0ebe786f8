//! The fixed task set and the stack heap the tasks are carved from.

use core::cell::Cell;

use static_assertions::const_assert;

use crate::hw_abstraction::StackRegion;

/// Every task in the system. The discriminant indexes the task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskId {
    InstrManager,
    CmdHandler,
    SensorAcq,
    HostComm,
    Algorithm,
    AlgBg,
}

pub const NUM_TASKS: usize = 6;

impl TaskId {
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn descriptor(self) -> &'static TaskDescriptor {
        &TASK_TABLE[self.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskDescriptor {
    pub id: TaskId,
    pub name: &'static str,
    pub priority: u8,
    pub stack_size: usize,
    pub queue_depth: usize,
}

/// The task started by [`Kernel::asf_initialise_tasks`](super::Kernel::asf_initialise_tasks).
/// It brings up every other task.
pub const BOOTSTRAP_TASK: TaskId = TaskId::InstrManager;

/// Priority the bootstrap task runs at until the other tasks exist
pub const BOOTSTRAP_PRIORITY: u8 = 254;

pub const MIN_PRIORITY: u8 = 51;
pub const MAX_PRIORITY: u8 = 254;

const TASKS: [TaskDescriptor; NUM_TASKS] = [
    TaskDescriptor {
        id: TaskId::InstrManager,
        name: "INSTR MANAGER",
        priority: 60,
        stack_size: 0x400,
        queue_depth: 4,
    },
    TaskDescriptor {
        id: TaskId::CmdHandler,
        name: "CMD HANDLER",
        priority: 92,
        stack_size: 0x400,
        queue_depth: 4,
    },
    TaskDescriptor {
        id: TaskId::SensorAcq,
        name: "SENSOR ACQ",
        priority: 102,
        stack_size: 0x400,
        queue_depth: 16,
    },
    TaskDescriptor {
        id: TaskId::HostComm,
        name: "HOST COMM",
        priority: 99,
        stack_size: 0x200,
        queue_depth: 64,
    },
    TaskDescriptor {
        id: TaskId::Algorithm,
        name: "ALGORITHM",
        priority: 90,
        stack_size: 0x980,
        queue_depth: 64,
    },
    TaskDescriptor {
        id: TaskId::AlgBg,
        name: "ALG BG",
        priority: 85,
        stack_size: 0x1080,
        queue_depth: 64,
    },
];

pub static TASK_TABLE: [TaskDescriptor; NUM_TASKS] = TASKS;

const fn sum_stacks() -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < NUM_TASKS {
        total += TASKS[i].stack_size;
        i += 1;
    }
    total
}

const fn table_is_valid() -> bool {
    let mut i = 0;
    while i < NUM_TASKS {
        let task = &TASKS[i];
        if task.id as usize != i
            || task.priority < MIN_PRIORITY
            || task.priority > MAX_PRIORITY
            || task.stack_size % STACK_ALIGN != 0
            || task.queue_depth > crate::config::MAX_QUEUE_DEPTH
        {
            return false;
        }
        i += 1;
    }
    true
}

pub const STACK_ALIGN: usize = 8;

/// Heap size for all task stacks, with room for allocator overhead
pub const TOTAL_STACK_NEEDED: usize = 128 + sum_stacks();

const_assert!(table_is_valid());
const_assert!(TOTAL_STACK_NEEDED % STACK_ALIGN == 0);

/// Bump allocator over the stack heap. Stacks are never freed.
pub struct StackHeap {
    next: critical_section::Mutex<Cell<usize>>,
}

impl Default for StackHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl StackHeap {
    pub const fn new() -> Self {
        Self {
            next: critical_section::Mutex::new(Cell::new(0)),
        }
    }

    /// Allocate an 8-byte aligned region of at least `size` bytes.
    pub fn allocate(&self, size: usize) -> Option<StackRegion> {
        critical_section::with(|cs| {
            let next = self.next.borrow(cs);
            let offset = next.get().next_multiple_of(STACK_ALIGN);
            let len = size.next_multiple_of(STACK_ALIGN);
            let end = offset.checked_add(len)?;
            if end > TOTAL_STACK_NEEDED {
                return None;
            }
            next.set(end);
            Some(StackRegion { offset, len })
        })
    }

    pub fn used(&self) -> usize {
        critical_section::with(|cs| self.next.borrow(cs).get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_ids() {
        for (i, task) in TASK_TABLE.iter().enumerate() {
            assert_eq!(task.id.index(), i);
        }
        assert_eq!(TaskId::HostComm.descriptor().queue_depth, 64);
    }

    #[test]
    fn test_heap_fits_every_stack() {
        let heap = StackHeap::new();
        for task in TASK_TABLE.iter() {
            let region = heap.allocate(task.stack_size).unwrap();
            assert_eq!(region.offset % STACK_ALIGN, 0);
            assert_eq!(region.len, task.stack_size);
        }
        assert_eq!(heap.used(), TOTAL_STACK_NEEDED - 128);
        assert_eq!(heap.allocate(256), None);
    }

    #[test]
    fn test_unaligned_sizes_rounded() {
        let heap = StackHeap::new();
        let first = heap.allocate(13).unwrap();
        let second = heap.allocate(8).unwrap();
        assert_eq!(first.len, 16);
        assert_eq!(second.offset, 16);
    }
}
