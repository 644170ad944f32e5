// src/sink/mod.rs
pub mod client;
pub mod retry;
pub mod sender;

pub use client::{InfluxClient, InfluxTarget, SendError};
pub use retry::{BackoffStrategy, RetryConfig};
pub use sender::{PointSink, SendResult};
