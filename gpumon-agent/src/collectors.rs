pub mod gpu;

use tracing::{info, warn};

use crate::error::{DeviceReadError, InterfaceError, ReadStage};
use crate::metrics::{GPUIndex, Reading, Sample};
use gpu::DeviceSource;

/// Reads every value of one device. Any failing read fails the whole sample,
/// so a partial reading never leaves the collector.
pub fn collect_sample<S: DeviceSource>(source: &S, index: GPUIndex) -> Sample {
    Sample {
        index,
        outcome: read_device(source, index),
    }
}

fn read_device<S: DeviceSource>(source: &S, index: GPUIndex) -> Result<Reading, DeviceReadError> {
    let failed = |stage: ReadStage| {
        move |source: InterfaceError| DeviceReadError {
            index,
            stage,
            source,
        }
    };

    let handle = source.handle(index).map_err(failed(ReadStage::Handle))?;
    let power_watts = source
        .read_power(&handle)
        .map_err(failed(ReadStage::Power))?;
    let temperature_celsius = source
        .read_temperature(&handle)
        .map_err(failed(ReadStage::Temperature))?;
    let utilization = source
        .read_utilization(&handle)
        .map_err(failed(ReadStage::Utilization))?;

    Ok(Reading {
        gpu_percent: utilization.gpu_percent,
        memory_percent: utilization.memory_percent,
        power_watts,
        temperature_celsius,
    })
}

/// Owns an initialized [`DeviceSource`] and shuts it down exactly once,
/// either through [`MonitorSession::finalize`] or when dropped.
pub struct MonitorSession<S: DeviceSource> {
    source: S,
    finalized: bool,
}

impl<S: DeviceSource> MonitorSession<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            finalized: false,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        match self.source.shutdown() {
            Ok(()) => info!("Monitoring interface shut down"),
            Err(e) => warn!(error = %e, "Monitoring interface shutdown failed"),
        }
    }
}

impl<S: DeviceSource> Drop for MonitorSession<S> {
    fn drop(&mut self) {
        self.finalize();
    }
}
