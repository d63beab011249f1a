use std::io;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tracing::info;

/// SIGINT/SIGTERM listeners.
///
/// Installing replaces the default "terminate" disposition right away, so a
/// signal delivered before [`ShutdownSignal::recv`] is first polled is kept
/// and reported then instead of killing the process.
pub struct ShutdownSignal {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignal {
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    pub async fn recv(mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => info!("Received SIGINT, shutting down"),
            _ = self.terminate.recv() => info!("Received SIGTERM, shutting down"),
        }
    }
}
