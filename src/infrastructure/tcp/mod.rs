// TCP module - Socket endpoint
pub mod client;

pub use client::{StreamDevice, TcpDevice};
