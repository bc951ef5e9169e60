//! Queue consumption: receive a batch, acknowledge it

pub mod drainer;
pub mod ports;

pub use drainer::{DrainReport, QueueDrainer};
