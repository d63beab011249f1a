use serde::Serialize;

use crate::error::DeviceReadError;

pub type GPUIndex = u32;

pub const DEFAULT_NAMESPACE: &str = "DeepLearningTrain";
pub const DEFAULT_STORAGE_RESOLUTION: i32 = 60;

/// Identity of the host the agent runs on, resolved once at startup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InstanceIdentity {
    pub instance_id: String,
    pub image_id: String,
    pub instance_type: String,
    pub availability_zone: String,
    pub region: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Utilization {
    pub gpu_percent: u32,
    pub memory_percent: u32,
}

/// All four values read from one device in one pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Reading {
    pub gpu_percent: u32,
    pub memory_percent: u32,
    pub power_watts: f64,
    pub temperature_celsius: u32,
}

/// One device, one pass. Either every value was read or the sample failed.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub index: GPUIndex,
    pub outcome: Result<Reading, DeviceReadError>,
}

impl Sample {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn reading(&self) -> Option<&Reading> {
        self.outcome.as_ref().ok()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MetricUnit {
    Percent,
    Unitless,
}

impl MetricUnit {
    /// Unit name as understood by CloudWatch.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricUnit::Percent => "Percent",
            MetricUnit::Unitless => "None",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricPoint {
    pub name: &'static str,
    pub unit: MetricUnit,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub name: &'static str,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishSettings {
    pub namespace: String,
    pub storage_resolution: i32,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            storage_resolution: DEFAULT_STORAGE_RESOLUTION,
        }
    }
}

/// The metric points published for one successful sample, in a single call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricBatch {
    pub gpu: GPUIndex,
    pub namespace: String,
    pub storage_resolution: i32,
    pub dimensions: Vec<Dimension>,
    pub points: Vec<MetricPoint>,
}

impl MetricBatch {
    pub fn from_reading(
        gpu: GPUIndex,
        reading: &Reading,
        identity: &InstanceIdentity,
        settings: &PublishSettings,
    ) -> Self {
        let dimensions = vec![
            Dimension {
                name: "InstanceId",
                value: identity.instance_id.clone(),
            },
            Dimension {
                name: "ImageId",
                value: identity.image_id.clone(),
            },
            Dimension {
                name: "InstanceType",
                value: identity.instance_type.clone(),
            },
            Dimension {
                name: "GPUNumber",
                value: gpu.to_string(),
            },
        ];

        let points = vec![
            MetricPoint {
                name: "GPU Usage",
                unit: MetricUnit::Percent,
                value: f64::from(reading.gpu_percent),
            },
            MetricPoint {
                name: "Memory Usage",
                unit: MetricUnit::Percent,
                value: f64::from(reading.memory_percent),
            },
            MetricPoint {
                name: "Power Usage (Watts)",
                unit: MetricUnit::Unitless,
                value: reading.power_watts,
            },
            MetricPoint {
                name: "Temperature (C)",
                unit: MetricUnit::Unitless,
                value: f64::from(reading.temperature_celsius),
            },
        ];

        MetricBatch {
            gpu,
            namespace: settings.namespace.clone(),
            storage_resolution: settings.storage_resolution,
            dimensions,
            points,
        }
    }
}
