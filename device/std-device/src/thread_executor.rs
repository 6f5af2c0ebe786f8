use embassy_executor::Executor;
use embassy_executor::SendSpawner;
use std::sync::mpsc;
use std::sync::LazyLock;
use tokio::runtime::Runtime;

/// Executor threads standing in for the scheduler's priority bands. Host
/// threads have no priorities, so each band gets its own thread and tasks
/// of a band only ever wait on each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    High,
    Medium,
    Low,
}

impl Band {
    pub fn for_priority(priority: u8) -> Self {
        match priority {
            99.. => Band::High,
            90..=98 => Band::Medium,
            _ => Band::Low,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Band::High => "band-high",
            Band::Medium => "band-medium",
            Band::Low => "band-low",
        }
    }
}

pub fn new_spawner(band: Band) -> Result<SendSpawner, Box<dyn std::error::Error>> {
    let (tx, rx) = mpsc::channel();

    _ = std::thread::Builder::new().name(band.name().into()).spawn(move || {
        let mut executor = Executor::new();

        // SAFETY: since executor.run() never returns, and we throw away the
        // thread handle, we can safely extend the lifetime of the executor.
        let static_executor: &'static mut Executor = unsafe { core::mem::transmute(&mut executor) };
        static_executor.run(|spawner| {
            let spawner = spawner.make_send();
            tx.send(spawner).expect("Failed to send spawner");
        });
    })?;

    Ok(rx.recv()?)
}

/// Runtime for the host side IO: stdin and the one-shot timers.
pub static RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    let runtime = Runtime::new().expect("Unable to create tokio Runtime");
    Box::leak(Box::new(runtime.enter()));
    runtime
});

#[cfg(test)]
mod tests {
    use super::Band;

    #[test]
    fn test_priority_bands() {
        assert_eq!(Band::for_priority(102), Band::High);
        assert_eq!(Band::for_priority(99), Band::High);
        assert_eq!(Band::for_priority(92), Band::Medium);
        assert_eq!(Band::for_priority(85), Band::Low);
        assert_eq!(Band::for_priority(60), Band::Low);
    }
}
