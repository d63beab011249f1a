#![allow(dead_code)]

use async_trait::async_trait;
use gpumon_agent::collectors::gpu::DeviceSource;
use gpumon_agent::error::{InterfaceError, PublishError};
use gpumon_agent::metrics::{GPUIndex, InstanceIdentity, MetricBatch, Utilization};
use gpumon_agent::sinks::MetricPublisher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

#[derive(Clone, Debug)]
pub struct FakeDevice {
    pub power: Result<f64, InterfaceError>,
    pub temperature: Result<u32, InterfaceError>,
    pub utilization: Result<Utilization, InterfaceError>,
}

impl FakeDevice {
    pub fn healthy(gpu: u32, memory: u32, power: f64, temperature: u32) -> Self {
        Self {
            power: Ok(power),
            temperature: Ok(temperature),
            utilization: Ok(Utilization {
                gpu_percent: gpu,
                memory_percent: memory,
            }),
        }
    }

    pub fn without_temperature(mut self) -> Self {
        self.temperature = Err(InterfaceError::new("Unknown", "driver busy"));
        self
    }
}

/// In-memory devices with a shared shutdown counter.
pub struct FakeSource {
    devices: Vec<FakeDevice>,
    pub shutdowns: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn new(devices: Vec<FakeDevice>) -> Self {
        Self {
            devices,
            shutdowns: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl DeviceSource for FakeSource {
    type Handle<'a>
        = &'a FakeDevice
    where
        Self: 'a;

    fn device_count(&self) -> Result<u32, InterfaceError> {
        Ok(self.devices.len() as u32)
    }

    fn handle(&self, index: GPUIndex) -> Result<&FakeDevice, InterfaceError> {
        self.devices
            .get(index as usize)
            .ok_or_else(|| InterfaceError::new("InvalidArg", "no such device"))
    }

    fn read_power<'a>(&'a self, handle: &&'a FakeDevice) -> Result<f64, InterfaceError> {
        handle.power.clone()
    }

    fn read_temperature<'a>(&'a self, handle: &&'a FakeDevice) -> Result<u32, InterfaceError> {
        handle.temperature.clone()
    }

    fn read_utilization<'a>(
        &'a self,
        handle: &&'a FakeDevice,
    ) -> Result<Utilization, InterfaceError> {
        handle.utilization.clone()
    }

    fn shutdown(&mut self) -> Result<(), InterfaceError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Publisher that records every batch together with the time it arrived.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    pub batches: Arc<Mutex<Vec<(Instant, MetricBatch)>>>,
    pub fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn batches(&self) -> Vec<MetricBatch> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|(_, batch)| batch.clone())
            .collect()
    }

    pub fn arrivals(&self) -> Vec<Instant> {
        self.batches.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }
}

#[async_trait]
impl MetricPublisher for RecordingPublisher {
    async fn publish(&self, batch: &MetricBatch) -> Result<(), PublishError> {
        self.batches
            .lock()
            .unwrap()
            .push((Instant::now(), batch.clone()));
        if self.fail {
            return Err(PublishError::Backend("ThrottlingException".to_string()));
        }
        Ok(())
    }
}

pub fn identity() -> InstanceIdentity {
    InstanceIdentity {
        instance_id: "i-0123456789abcdef0".to_string(),
        image_id: "ami-0abcdef1234567890".to_string(),
        instance_type: "p3.8xlarge".to_string(),
        availability_zone: "us-east-1b".to_string(),
        region: "us-east-1".to_string(),
    }
}
