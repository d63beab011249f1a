pub mod cloudwatch;
pub mod file;

use async_trait::async_trait;
use tracing::info;

use crate::error::PublishError;
use crate::metrics::MetricBatch;

/// Destination for the metric points of successful samples.
///
/// A failed publish is reported to the caller and the batch is dropped;
/// implementations do not retry or buffer.
#[async_trait]
pub trait MetricPublisher: Send + Sync {
    async fn publish(&self, batch: &MetricBatch) -> Result<(), PublishError>;
}

/// Publisher used in dry-run mode: logs each batch instead of sending it.
pub struct LogOnlyPublisher;

#[async_trait]
impl MetricPublisher for LogOnlyPublisher {
    async fn publish(&self, batch: &MetricBatch) -> Result<(), PublishError> {
        for point in &batch.points {
            info!(
                namespace = %batch.namespace,
                gpu = batch.gpu,
                metric = point.name,
                unit = point.unit.as_str(),
                value = point.value,
                "Metric point (dry-run)"
            );
        }
        Ok(())
    }
}
