use clap::Parser;
use std::time::Duration;

use crate::format::LogFormat;
use crate::metadata::DEFAULT_METADATA_ENDPOINT;
use crate::metrics::{DEFAULT_NAMESPACE, DEFAULT_STORAGE_RESOLUTION, PublishSettings};
use crate::sinks::file::DEFAULT_LOG_PREFIX;

#[derive(Debug, Clone, Parser)]
#[command(name = "gpumon")]
#[command(about = "Publishes GPU utilization, memory, power and temperature to CloudWatch", long_about = None)]
pub struct Config {
    /// Seconds to wait between collection passes
    #[arg(short, long, env = "GPUMON_INTERVAL", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Metrics log file prefix; the start hour is appended
    #[arg(long, env = "GPUMON_LOG_PREFIX", default_value = DEFAULT_LOG_PREFIX)]
    pub log_prefix: String,

    /// Layout of the metrics log file
    #[arg(long, env = "GPUMON_LOG_FORMAT", value_enum, default_value_t = LogFormat::Csv)]
    pub log_format: LogFormat,

    /// CloudWatch storage resolution in seconds (1 = high resolution)
    #[arg(long, env = "GPUMON_STORAGE_RESOLUTION", default_value_t = DEFAULT_STORAGE_RESOLUTION,
          value_parser = clap::value_parser!(i32).range(1..=60))]
    pub storage_resolution: i32,

    /// CloudWatch namespace
    #[arg(short, long, env = "GPUMON_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Base URL of the instance metadata service
    #[arg(long, env = "GPUMON_METADATA_ENDPOINT", default_value = DEFAULT_METADATA_ENDPOINT)]
    pub metadata_endpoint: String,

    /// Run a single collection pass and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Log metric batches instead of sending them to CloudWatch
    #[arg(long, env = "GPUMON_DRY_RUN", default_value_t = false)]
    pub dry_run: bool,

    /// Output diagnostics as JSON
    #[arg(long, env = "GPUMON_LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn publish_settings(&self) -> PublishSettings {
        PublishSettings {
            namespace: self.namespace.clone(),
            storage_resolution: self.storage_resolution,
        }
    }
}
