#![no_std]
#![deny(clippy::large_futures)]

// Export the logging macros for either defmt or log
#[macro_use]
#[macro_export]
pub mod logging;

// Fatal assertion macros, used throughout the kernel
#[macro_use]
pub mod errors;

pub mod asf;
pub mod config;
pub mod conversion;
pub mod hif;
pub mod hw_abstraction;
pub mod i2c_slave;
pub mod lips;
pub mod tasks;
pub mod utils;

// Re-exported for implementors
pub use embassy_futures;
pub use embassy_sync;
pub use embassy_time;
pub use embedded_io_async;
pub use heapless;
