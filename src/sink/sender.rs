// src/sink/sender.rs
use crate::point::MetricPoint;

/// Outcome of handing points to a sink
#[derive(Debug, Default)]
pub struct SendResult {
    pub sent: usize,
    pub failed: Vec<String>,
}

impl SendResult {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Destination for generated points (abstracts the HTTP client)
#[async_trait::async_trait]
pub trait PointSink: Send + Sync {
    async fn send_points(&self, points: Vec<MetricPoint>) -> SendResult;
}
