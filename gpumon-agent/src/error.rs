use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::metrics::GPUIndex;

/// Errors that stop the agent before the first collection pass.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to resolve instance identity: {0}")]
    Metadata(#[from] MetadataError),

    #[error("failed to initialize NVML: {0}")]
    Monitoring(#[source] InterfaceError),
}

/// Error reported by the hardware monitoring interface.
///
/// `code` is the vendor error kind, `message` its human readable description.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message} ({code})")]
pub struct InterfaceError {
    pub code: String,
    pub message: String,
}

impl InterfaceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Which step of a device read failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadStage {
    Handle,
    Power,
    Temperature,
    Utilization,
}

impl fmt::Display for ReadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadStage::Handle => "handle",
            ReadStage::Power => "power",
            ReadStage::Temperature => "temperature",
            ReadStage::Utilization => "utilization",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("gpu {index}: failed to read {stage}: {source}")]
pub struct DeviceReadError {
    pub index: GPUIndex,
    pub stage: ReadStage,
    #[source]
    pub source: InterfaceError,
}

#[derive(Debug, Error)]
pub enum FileWriteError {
    #[error("failed to append to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode log record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("PutMetricData failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to build metadata client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("metadata request for {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("metadata service returned {status} for {path}")]
    Status {
        path: String,
        status: reqwest::StatusCode,
    },

    #[error("availability zone {0:?} does not name a region")]
    InvalidZone(String),
}
