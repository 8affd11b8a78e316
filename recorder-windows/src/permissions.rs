//! Windows microphone privacy permission check.
//!
//! On Windows 10 1803+, microphone access is controlled by the privacy
//! settings at Settings > Privacy > Microphone. Desktop apps are generally
//! allowed unless the user has disabled the global toggle. There is no
//! prompt to trigger from here; this only probes.

use windows::Win32::Foundation::E_ACCESSDENIED;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use crate::device_enumerator::{DeviceEnumerator, Direction};

/// Check if microphone access is available.
///
/// Attempts to activate an `IAudioClient` on the default capture endpoint.
/// Access denied means the privacy toggle is off; no endpoint at all also
/// counts as "no permission to record".
pub fn check_microphone_permission() -> bool {
    let enumerator = match DeviceEnumerator::new() {
        Ok(e) => e,
        Err(e) => {
            log::warn!("Cannot probe microphone permission: {}", e);
            return false;
        }
    };

    let device = match enumerator.default_endpoint(Direction::Capture) {
        Ok(d) => d,
        Err(_) => return false,
    };

    let result: windows::core::Result<IAudioClient> = unsafe { device.Activate(CLSCTX_ALL, None) };
    match result {
        Ok(_) => true,
        Err(e) if e.code() == E_ACCESSDENIED => false,
        Err(e) => {
            // Other errors surface again when the handle is opened.
            log::warn!("Unexpected error checking mic permission: {}", e);
            true
        }
    }
}
