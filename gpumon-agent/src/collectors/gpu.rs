use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::error::NvmlError;
use nvml_wrapper::{Device, Nvml};

use crate::error::InterfaceError;
use crate::metrics::{GPUIndex, Utilization};

/// Read access to the accelerators present on the host.
///
/// Implementations are initialized by their constructor and finalized through
/// [`DeviceSource::shutdown`], which callers invoke once. Every read may fail
/// independently; a failure describes that device at that moment only.
pub trait DeviceSource {
    type Handle<'a>
    where
        Self: 'a;

    fn device_count(&self) -> Result<u32, InterfaceError>;

    fn handle(&self, index: GPUIndex) -> Result<Self::Handle<'_>, InterfaceError>;

    /// Power draw in watts.
    fn read_power<'a>(&'a self, handle: &Self::Handle<'a>) -> Result<f64, InterfaceError>;

    /// GPU die temperature in degrees Celsius.
    fn read_temperature<'a>(&'a self, handle: &Self::Handle<'a>) -> Result<u32, InterfaceError>;

    fn read_utilization<'a>(
        &'a self,
        handle: &Self::Handle<'a>,
    ) -> Result<Utilization, InterfaceError>;

    fn shutdown(&mut self) -> Result<(), InterfaceError>;
}

pub struct NvmlSource {
    nvml: Option<Nvml>,
}

impl NvmlSource {
    pub fn init() -> Result<Self, InterfaceError> {
        let nvml = Nvml::init().map_err(interface_error)?;
        Ok(Self { nvml: Some(nvml) })
    }

    fn nvml(&self) -> Result<&Nvml, InterfaceError> {
        self.nvml
            .as_ref()
            .ok_or_else(|| InterfaceError::new("Uninitialized", "NVML has already been shut down"))
    }
}

impl DeviceSource for NvmlSource {
    type Handle<'a>
        = Device<'a>
    where
        Self: 'a;

    fn device_count(&self) -> Result<u32, InterfaceError> {
        self.nvml()?.device_count().map_err(interface_error)
    }

    fn handle(&self, index: GPUIndex) -> Result<Device<'_>, InterfaceError> {
        self.nvml()?.device_by_index(index).map_err(interface_error)
    }

    fn read_power<'a>(&'a self, handle: &Device<'a>) -> Result<f64, InterfaceError> {
        // NVML reports milliwatts
        handle
            .power_usage()
            .map(|milliwatts| f64::from(milliwatts) / 1000.0)
            .map_err(interface_error)
    }

    fn read_temperature<'a>(&'a self, handle: &Device<'a>) -> Result<u32, InterfaceError> {
        handle
            .temperature(TemperatureSensor::Gpu)
            .map_err(interface_error)
    }

    fn read_utilization<'a>(&'a self, handle: &Device<'a>) -> Result<Utilization, InterfaceError> {
        let rates = handle.utilization_rates().map_err(interface_error)?;
        Ok(Utilization {
            gpu_percent: rates.gpu,
            memory_percent: rates.memory,
        })
    }

    fn shutdown(&mut self) -> Result<(), InterfaceError> {
        match self.nvml.take() {
            Some(nvml) => nvml.shutdown().map_err(interface_error),
            None => Ok(()),
        }
    }
}

fn interface_error(err: NvmlError) -> InterfaceError {
    InterfaceError::new(error_code(&err), err.to_string())
}

fn error_code(err: &NvmlError) -> &'static str {
    match err {
        NvmlError::Uninitialized => "Uninitialized",
        NvmlError::InvalidArg => "InvalidArg",
        NvmlError::NotSupported => "NotSupported",
        NvmlError::NoPermission => "NoPermission",
        NvmlError::NotFound => "NotFound",
        NvmlError::DriverNotLoaded => "DriverNotLoaded",
        NvmlError::Timeout => "Timeout",
        NvmlError::GpuLost => "GpuLost",
        NvmlError::Unknown => "Unknown",
        _ => "Other",
    }
}
