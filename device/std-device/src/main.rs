use std::time::Duration;

use clap::Parser;
use common::asf::Kernel;
use common::config::{LogFlags, SENSOR_SAMPLE_PERIOD, TICKS_PER_SEC};

mod resources;
mod scheduler;
mod thread_executor;

/// The one kernel of the system. Its hardware timer calls back into it.
pub static KERNEL: Kernel = Kernel::new(&resources::HW_TIMER);

#[derive(clap::Parser)]
struct Args {
    /// Maximum log level
    #[clap(short, long, default_value = "info")]
    log_level: log::LevelFilter,

    /// Number of sample periods to run for, 0 runs until interrupted
    #[clap(short, long, default_value_t = 0)]
    samples: u64,

    /// Initial diagnostic flags as hex, e.g. 48 for sample and result LIPS
    #[clap(long, default_value = "0", value_parser = parse_hex)]
    lips: u32,
}

fn parse_hex(value: &str) -> Result<u32, std::num::ParseIntError> {
    u32::from_str_radix(value.trim_start_matches("0x"), 16)
}

fn setup_logging(level: log::LevelFilter) {
    env_logger::builder()
        .filter_level(level)
        .filter_module("async_io", log::LevelFilter::Info)
        .format_timestamp_micros()
        .init();

    // Fatal kernel errors panic. Make sure the cause is logged and that no
    // executor thread carries on with a broken kernel.
    std::panic::set_hook(Box::new(|info| {
        log::error!("{info}");
        log::logger().flush();
        std::process::abort();
    }));
}

/// End the process after `samples` sample periods.
fn limit_run_time(samples: u64) {
    if samples == 0 {
        return;
    }

    let period = Duration::from_micros(SENSOR_SAMPLE_PERIOD as u64 * 1_000_000 / TICKS_PER_SEC as u64);
    let run_time = period * samples as u32;

    crate::thread_executor::RUNTIME.spawn(async move {
        tokio::time::sleep(run_time).await;
        log::info!("Ran for {} sample periods, exiting", samples);
        log::logger().flush();
        std::process::exit(0);
    });
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    _ = thread_executor::RUNTIME.enter();

    setup_logging(args.log_level);
    LogFlags::from_bits_retain(args.lips).store();

    // Create spawners for the threads
    let spawners = [
        thread_executor::new_spawner(thread_executor::Band::High)?,
        thread_executor::new_spawner(thread_executor::Band::Medium)?,
        thread_executor::new_spawner(thread_executor::Band::Low)?,
    ];

    resources::run_stdin_console();
    limit_run_time(args.samples);

    let scheduler = scheduler::HostScheduler::new(
        spawners,
        scheduler::Resources {
            sensors: Some(resources::SimSensorDriver::new()),
            transport: Some(resources::SimHostTransport::default()),
        },
    );

    // Never returns, the main thread is parked once the bootstrap task runs
    KERNEL.asf_initialise_tasks(scheduler)
}
