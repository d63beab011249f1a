use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudwatch::Client;
use aws_sdk_cloudwatch::config::Region;
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::types::{Dimension, MetricDatum, StandardUnit};
use tracing::debug;

use super::MetricPublisher;
use crate::error::PublishError;
use crate::metrics::MetricBatch;

/// Sends each batch to CloudWatch with one `PutMetricData` call.
///
/// Credentials come from the default AWS provider chain.
pub struct CloudWatchPublisher {
    client: Client,
}

impl CloudWatchPublisher {
    pub async fn connect(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: Client::new(&config),
        }
    }
}

#[async_trait]
impl MetricPublisher for CloudWatchPublisher {
    async fn publish(&self, batch: &MetricBatch) -> Result<(), PublishError> {
        let metric_data = metric_data(batch);

        self.client
            .put_metric_data()
            .namespace(&batch.namespace)
            .set_metric_data(Some(metric_data))
            .send()
            .await
            .map_err(|e| PublishError::Backend(DisplayErrorContext(&e).to_string()))?;

        debug!(
            namespace = %batch.namespace,
            gpu = batch.gpu,
            points = batch.points.len(),
            "Published metric batch"
        );
        Ok(())
    }
}

fn metric_data(batch: &MetricBatch) -> Vec<MetricDatum> {
    let dimensions: Vec<Dimension> = batch
        .dimensions
        .iter()
        .map(|d| Dimension::builder().name(d.name).value(&d.value).build())
        .collect();

    batch
        .points
        .iter()
        .map(|point| {
            MetricDatum::builder()
                .metric_name(point.name)
                .set_dimensions(Some(dimensions.clone()))
                .unit(StandardUnit::from(point.unit.as_str()))
                .storage_resolution(batch.storage_resolution)
                .value(point.value)
                .build()
        })
        .collect()
}
