//! COM apartment setup and WASAPI error mapping.

use std::cell::RefCell;

use windows::Win32::System::Com::*;

use pcm_recorder_core::CaptureError;

/// Failures from the WASAPI / MMDevice calls.
#[derive(Debug, thiserror::Error)]
pub enum WasapiError {
    #[error("{call} failed: {source}")]
    Call {
        call: &'static str,
        #[source]
        source: windows::core::Error,
    },

    #[error("no default {0} endpoint")]
    NoEndpoint(&'static str),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl From<WasapiError> for CaptureError {
    fn from(e: WasapiError) -> Self {
        match e {
            WasapiError::NoEndpoint(_) => CaptureError::DeviceNotAvailable,
            WasapiError::UnsupportedFormat(msg) => CaptureError::UnsupportedConfiguration(msg),
            other => CaptureError::Unknown(other.to_string()),
        }
    }
}

/// Attach the name of the failing call to a `windows` error.
pub(crate) trait CallContext<T> {
    fn call(self, call: &'static str) -> Result<T, WasapiError>;
}

impl<T> CallContext<T> for windows::core::Result<T> {
    fn call(self, call: &'static str) -> Result<T, WasapiError> {
        self.map_err(|source| WasapiError::Call { call, source })
    }
}

/// RAII guard to call CoUninitialize when dropped.
struct CoUninitializeGuard;

impl Drop for CoUninitializeGuard {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}

thread_local! {
    static APARTMENT: RefCell<Option<CoUninitializeGuard>> = const { RefCell::new(None) };
}

/// Join the multithreaded apartment on this thread, once.
///
/// Capture and render handles are created on the caller's thread and used on
/// the session thread; both must be in the MTA for the interface pointers to
/// be valid on either. The apartment is left when the thread exits.
pub(crate) fn ensure_mta() -> Result<(), WasapiError> {
    APARTMENT.with(|apartment| {
        let mut apartment = apartment.borrow_mut();
        if apartment.is_none() {
            unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) }
                .ok()
                .call("CoInitializeEx")?;
            *apartment = Some(CoUninitializeGuard);
        }
        Ok(())
    })
}
