use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::FileWriteError;
use crate::format::LogFormat;
use crate::metrics::{GPUIndex, Reading, Sample};

pub const DEFAULT_LOG_PREFIX: &str = "/tmp/gpumon_stats";

const SESSION_HOUR_FORMAT: &str = "%Y-%m-%dT%H";

/// Log file of one agent run: `<prefix><start hour>`.
///
/// The path is fixed when the agent starts and is not rotated while it runs,
/// even across an hour boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSession {
    path: PathBuf,
}

impl LogSession {
    pub fn starting_at<Tz: TimeZone>(prefix: &str, started: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        let hour = started.format(SESSION_HOUR_FORMAT);
        Self {
            path: PathBuf::from(format!("{prefix}{hour}")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Serialize)]
struct LogRecord<'a> {
    gpu: GPUIndex,
    #[serde(flatten)]
    reading: Option<&'a Reading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Appends one line per sample to the session log file.
pub struct FileSink {
    session: LogSession,
    format: LogFormat,
}

impl FileSink {
    pub fn new(session: LogSession, format: LogFormat) -> Self {
        Self { session, format }
    }

    pub fn path(&self) -> &Path {
        self.session.path()
    }

    /// The file is opened for this call only, so readers only ever see
    /// complete lines.
    pub fn write_sample(&self, sample: &Sample) -> Result<(), FileWriteError> {
        let line = self.render(sample)?;
        let path = self.session.path();
        let io_error = |source| FileWriteError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_error)?;
        file.write_all(line.as_bytes()).map_err(io_error)?;
        Ok(())
    }

    pub fn render(&self, sample: &Sample) -> Result<String, FileWriteError> {
        match self.format {
            LogFormat::Csv => Ok(render_csv(sample)),
            LogFormat::Json => {
                let record = LogRecord {
                    gpu: sample.index,
                    reading: sample.reading(),
                    error: sample.outcome.as_ref().err().map(|e| e.to_string()),
                };
                let mut line = serde_json::to_string(&record)?;
                line.push('\n');
                Ok(line)
            }
        }
    }
}

fn render_csv(sample: &Sample) -> String {
    match &sample.outcome {
        Ok(r) => format!(
            "{},{},{},{:.2},{}\n",
            sample.index, r.gpu_percent, r.memory_percent, r.power_watts, r.temperature_celsius
        ),
        Err(e) => format!("{},error,{}\n", sample.index, e),
    }
}
