pub mod collectors;
pub mod config;
pub mod driver;
pub mod error;
pub mod format;
pub mod metadata;
pub mod metrics;
pub mod shutdown;
pub mod sinks;
