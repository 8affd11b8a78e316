//! Default endpoint lookup via the MMDevice API.

use windows::Win32::Devices::FunctionDiscovery::*;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use crate::com::{self, CallContext, WasapiError};

/// Which side of the audio graph an endpoint is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Capture,
    Render,
}

impl Direction {
    fn data_flow(self) -> EDataFlow {
        match self {
            Self::Capture => eCapture,
            Self::Render => eRender,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Render => "render",
        }
    }
}

/// Audio device enumerator using the Windows MMDevice API.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    /// Create a new device enumerator, joining the MTA on this thread if needed.
    pub fn new() -> Result<Self, WasapiError> {
        com::ensure_mta()?;
        let enumerator: IMMDeviceEnumerator =
            unsafe { CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL) }
                .call("CoCreateInstance(MMDeviceEnumerator)")?;
        Ok(Self { enumerator })
    }

    /// The console-role default endpoint for `direction`.
    pub fn default_endpoint(&self, direction: Direction) -> Result<IMMDevice, WasapiError> {
        unsafe { self.enumerator.GetDefaultAudioEndpoint(direction.data_flow(), eConsole) }
            .map_err(|_| WasapiError::NoEndpoint(direction.label()))
    }

    /// Whether at least one active capture endpoint exists.
    pub fn has_capture_device(&self) -> bool {
        unsafe {
            self.enumerator
                .EnumAudioEndpoints(eCapture, DEVICE_STATE_ACTIVE)
                .and_then(|collection| collection.GetCount())
                .map(|count| count > 0)
                .unwrap_or(false)
        }
    }

    /// Read the PKEY_Device_FriendlyName property from a device.
    pub fn friendly_name(device: &IMMDevice) -> Option<String> {
        unsafe {
            let store = device.OpenPropertyStore(STGM_READ).ok()?;
            let value = store.GetValue(&PKEY_Device_FriendlyName).ok()?;
            let name = value.to_string();
            (!name.is_empty()).then_some(name)
        }
    }
}
