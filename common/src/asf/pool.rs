use core::cell::Cell;

/// Accounting for the fixed number of message blocks shared by all tasks.
/// Blocks are handed out by [`Kernel::create_message`](super::Kernel::create_message)
/// and returned when the [`MsgBuffer`](super::message::MsgBuffer) is dropped.
#[derive(Debug)]
pub struct MessagePool {
    capacity: usize,
    in_use: critical_section::Mutex<Cell<usize>>,
}

impl MessagePool {
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            in_use: critical_section::Mutex::new(Cell::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        critical_section::with(|cs| self.in_use.borrow(cs).get())
    }

    pub fn free(&self) -> usize {
        self.capacity - self.in_use()
    }

    /// Reserve one block. Returns false when the pool is exhausted.
    pub(crate) fn acquire(&self) -> bool {
        critical_section::with(|cs| {
            let in_use = self.in_use.borrow(cs);
            if in_use.get() >= self.capacity {
                false
            } else {
                in_use.set(in_use.get() + 1);
                true
            }
        })
    }

    pub(crate) fn release(&self) {
        let released = critical_section::with(|cs| {
            let in_use = self.in_use.borrow(cs);
            match in_use.get().checked_sub(1) {
                Some(n) => {
                    in_use.set(n);
                    true
                }
                None => false,
            }
        });
        asf_assert!(released, "ASF: Message block released twice");
    }
}
