pub mod bytes_reader;
pub mod func;
