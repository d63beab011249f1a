use chrono::Local;
use std::future::Future;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::collectors::gpu::{DeviceSource, NvmlSource};
use crate::collectors::{MonitorSession, collect_sample};
use crate::config::Config;
use crate::error::StartupError;
use crate::metadata::MetadataClient;
use crate::metrics::{InstanceIdentity, MetricBatch, PublishSettings};
use crate::sinks::cloudwatch::CloudWatchPublisher;
use crate::sinks::file::{FileSink, LogSession};
use crate::sinks::{LogOnlyPublisher, MetricPublisher};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Running,
    ShuttingDown,
    Terminated,
}

/// Outcome counters of one collection pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub devices: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub published: u32,
    pub publish_errors: u32,
    pub file_errors: u32,
}

/// What a finished run leaves behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub last_tick: TickReport,
    pub state: DriverState,
}

pub struct Driver<S: DeviceSource> {
    session: MonitorSession<S>,
    file_sink: FileSink,
    publisher: Box<dyn MetricPublisher>,
    identity: InstanceIdentity,
    settings: PublishSettings,
    interval: Duration,
    state: DriverState,
}

/// Resolves the instance identity, initializes NVML and connects the
/// publisher. Any failure here is fatal.
pub async fn start(config: &Config) -> Result<Driver<NvmlSource>, StartupError> {
    let metadata = MetadataClient::new(&config.metadata_endpoint)?;
    let identity = metadata.resolve_identity().await?;
    info!(
        instance_id = %identity.instance_id,
        image_id = %identity.image_id,
        instance_type = %identity.instance_type,
        region = %identity.region,
        "Resolved instance identity"
    );

    let source = NvmlSource::init().map_err(StartupError::Monitoring)?;

    let publisher: Box<dyn MetricPublisher> = if config.dry_run {
        info!("Dry-run mode, metric batches are only logged");
        Box::new(LogOnlyPublisher)
    } else {
        Box::new(CloudWatchPublisher::connect(&identity.region).await)
    };

    let session = LogSession::starting_at(&config.log_prefix, &Local::now());
    info!(path = %session.path().display(), "Writing samples to log file");
    let file_sink = FileSink::new(session, config.log_format);

    Ok(Driver::new(
        source,
        file_sink,
        publisher,
        identity,
        config.publish_settings(),
        config.interval(),
    ))
}

impl<S: DeviceSource> Driver<S> {
    pub fn new(
        source: S,
        file_sink: FileSink,
        publisher: Box<dyn MetricPublisher>,
        identity: InstanceIdentity,
        settings: PublishSettings,
        interval: Duration,
    ) -> Self {
        let mut driver = Self {
            session: MonitorSession::new(source),
            file_sink,
            publisher,
            identity,
            settings,
            interval,
            state: DriverState::Uninitialized,
        };
        driver.transition(DriverState::Running);
        driver
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// One pass over every device, in index order. Each sample reaches the
    /// file sink, and the publisher when it succeeded, before the next
    /// device is read.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        let source = self.session.source();

        let count = match source.device_count() {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Failed to enumerate GPUs");
                return report;
            }
        };
        report.devices = count;

        for index in 0..count {
            let sample = collect_sample(source, index);

            if let Err(e) = self.file_sink.write_sample(&sample) {
                report.file_errors += 1;
                error!(gpu = index, error = %e, "Error writing to log file");
            }

            let reading = match &sample.outcome {
                Ok(reading) => reading,
                Err(e) => {
                    report.failed += 1;
                    warn!(gpu = index, error = %e, "GPU read failed, sample not published");
                    continue;
                }
            };
            report.succeeded += 1;

            let batch = MetricBatch::from_reading(index, reading, &self.identity, &self.settings);
            match self.publisher.publish(&batch).await {
                Ok(()) => report.published += 1,
                Err(e) => {
                    report.publish_errors += 1;
                    warn!(gpu = index, error = %e, "Failed to publish metrics, batch dropped");
                }
            }
        }

        report
    }

    /// Runs a single pass, then shuts the monitoring interface down.
    pub async fn run_once(mut self) -> RunSummary {
        let report = self.tick().await;
        log_report(&report);
        self.finish();
        RunSummary {
            ticks: 1,
            last_tick: report,
            state: self.state,
        }
    }

    /// Runs passes separated by the configured interval until `shutdown`
    /// completes. Shutdown is only observed between passes; a request that
    /// arrives during a pass ends the run once that pass is done.
    pub async fn run_until<F>(mut self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(interval_secs = self.interval.as_secs(), "Starting GPU monitoring");

        let mut ticks = 0;
        let mut last_tick;
        loop {
            last_tick = self.tick().await;
            ticks += 1;
            log_report(&last_tick);

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = time::sleep(self.interval) => {}
            }
        }

        self.finish();
        RunSummary {
            ticks,
            last_tick,
            state: self.state,
        }
    }

    fn finish(&mut self) {
        self.transition(DriverState::ShuttingDown);
        self.session.finalize();
        self.transition(DriverState::Terminated);
    }

    fn transition(&mut self, next: DriverState) {
        debug!(from = ?self.state, to = ?next, "Driver state change");
        self.state = next;
    }
}

fn log_report(report: &TickReport) {
    debug!(
        devices = report.devices,
        succeeded = report.succeeded,
        failed = report.failed,
        published = report.published,
        publish_errors = report.publish_errors,
        file_errors = report.file_errors,
        "Collection pass complete"
    );
}
