use clap::ValueEnum;

/// Layout of the lines appended to the metrics log file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// `gpu,gpu_util,mem_util,power,temp`
    #[default]
    Csv,
    /// One JSON object per line
    Json,
}
