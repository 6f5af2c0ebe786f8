use heapless::Deque;
use maitake_sync::{blocking::DefaultMutex, WaitQueue};
use mutex::{BlockingMutex, ConstInit, ScopedRawMutex};

/// Single consumer mailbox with a fixed backing store of `N` slots, of which
/// only `depth` are usable. The depth is set once at task bring-up. A queue
/// that was never initialised has depth zero and rejects every send.
pub struct TaskQueue<T, const N: usize, M: ScopedRawMutex = DefaultMutex> {
    state: BlockingMutex<M, State<T, N>>,
    recv_queue: WaitQueue<M>,
}

struct State<T, const N: usize> {
    depth: usize,
    deque: Deque<T, N>,
}

impl<T, M: ScopedRawMutex + ConstInit, const N: usize> Default for TaskQueue<T, N, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, M: ScopedRawMutex, const N: usize> TaskQueue<T, N, M> {
    pub const fn new() -> Self
    where
        M: ConstInit,
    {
        Self {
            state: BlockingMutex::new(State {
                depth: 0,
                deque: Deque::new(),
            }),
            recv_queue: WaitQueue::new_with_raw_mutex(M::INIT),
        }
    }

    /// Set the usable depth of the queue, clamped to the backing capacity.
    pub fn init(&self, depth: usize) {
        self.state.with_lock(|state| state.depth = depth.min(N));
    }

    pub fn depth(&self) -> usize {
        self.state.with_lock(|state| state.depth)
    }

    pub fn len(&self) -> usize {
        self.state.with_lock(|state| state.deque.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push to the back of the queue. The value is handed back if the queue
    /// is at its configured depth.
    pub fn try_send(&self, value: T) -> Result<(), T> {
        let res = self.state.with_lock(|state| {
            if state.deque.len() >= state.depth {
                Err(value)
            } else {
                state.deque.push_back(value)
            }
        });

        if res.is_ok() {
            self.recv_queue.wake();
        }

        res
    }

    pub fn try_receive(&self) -> Option<T> {
        self.state.with_lock(|state| state.deque.pop_front())
    }

    pub async fn receive(&self) -> T {
        loop {
            let wake = self.recv_queue.wait();
            match self.try_receive() {
                Some(value) => break value,
                None => {
                    let res = wake.await;
                    debug_assert!(res.is_ok())
                }
            }
        }
    }
}
