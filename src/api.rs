//! Client API Functions
//!
//! Async entry points for call control, mirroring the request/response
//! channel pattern: a request goes to the processor task, and the reply
//! arrives once the peer acknowledged the command (or immediately, when the
//! request fails validation or needs no command at all).
//!
//! Device addresses are passed as `AA:BB:CC:DD:EE:FF` strings and validated
//! here, before anything reaches the channels.
//!
//! # Usage
//!
//! ```rust,no_run
//! use handsfree::api::{answer_call, dial, get_status};
//!
//! # async fn example() -> Result<(), handsfree::HfpError> {
//! dial("D0:00:00:00:00:01", "+15551234567").await?;
//! let devices = get_status().await?;
//! # Ok(())
//! # }
//! ```

use crate::{
    BluetoothAddress, HfpError, REQUEST_CHANNEL, RESPONSE_CHANNEL, Request, Response,
    constants::{MAX_ADAPTERS, MAX_DEVICES, MAX_NUMBER_LEN},
    status::DeviceSnapshot,
};
use heapless::{String, Vec};

async fn roundtrip(request: Request) -> Result<(), HfpError> {
    REQUEST_CHANNEL.sender().send(request).await;
    match RESPONSE_CHANNEL.receiver().receive().await {
        Response::Complete => Ok(()),
        Response::Error(e) => Err(e),
        Response::Status(_) => Err(HfpError::Internal),
    }
}

fn parse_address(address: &str) -> Result<BluetoothAddress, HfpError> {
    BluetoothAddress::from_hex(address)
}

/// Answer the ringing call on a device.
///
/// # Errors
///
/// Returns an error if the address is invalid, the device is not connected,
/// or the peer rejects the command.
pub async fn answer_call(address: &str) -> Result<(), HfpError> {
    roundtrip(Request::AnswerCall(parse_address(address)?)).await
}

/// Hang up the current call on a device.
///
/// # Errors
///
/// Returns an error if the address is invalid, the device is not connected,
/// or the peer rejects the command.
pub async fn terminate_call(address: &str) -> Result<(), HfpError> {
    roundtrip(Request::TerminateCall(parse_address(address)?)).await
}

/// Place an outgoing call.
///
/// # Errors
///
/// Returns an error if the address or number is invalid, the device is not
/// connected, or the peer rejects the command.
pub async fn dial(address: &str, number: &str) -> Result<(), HfpError> {
    let number: String<MAX_NUMBER_LEN> =
        String::try_from(number).map_err(|_| HfpError::InvalidParameter)?;
    roundtrip(Request::Dial(parse_address(address)?, number)).await
}

/// Release all held calls (`AT+CHLD=0`).
///
/// # Errors
///
/// Returns an error if the address is invalid, the device is not connected,
/// or the peer rejects the command.
pub async fn release_held_calls(address: &str) -> Result<(), HfpError> {
    roundtrip(Request::ReleaseHeldCalls(parse_address(address)?)).await
}

/// Release all active calls, accepting a waiting one (`AT+CHLD=1`).
///
/// # Errors
///
/// Returns an error if the address is invalid, the device is not connected,
/// or the peer rejects the command.
pub async fn release_active_calls(address: &str) -> Result<(), HfpError> {
    roundtrip(Request::ReleaseActiveCalls(parse_address(address)?)).await
}

/// Put active calls on hold, accepting a waiting one (`AT+CHLD=2`).
///
/// # Errors
///
/// Returns an error if the address is invalid, the device is not connected,
/// or the peer rejects the command.
pub async fn hold_active_calls(address: &str) -> Result<(), HfpError> {
    roundtrip(Request::HoldActiveCalls(parse_address(address)?)).await
}

/// Merge held and active calls (`AT+CHLD=3`).
///
/// # Errors
///
/// Returns an error if the address is invalid, the device is not connected,
/// or the peer rejects the command.
pub async fn merge_calls(address: &str) -> Result<(), HfpError> {
    roundtrip(Request::MergeCalls(parse_address(address)?)).await
}

/// Set the speaker gain (0..15) on a device.
///
/// # Errors
///
/// Returns an error if the address is invalid, the gain is out of range,
/// the device is not connected, or the peer rejects the command.
pub async fn set_volume(address: &str, gain: u8) -> Result<(), HfpError> {
    roundtrip(Request::SetVolume(parse_address(address)?, gain)).await
}

/// Toggle voice recognition on a device.
///
/// Completes immediately when the requested state is already in effect.
///
/// # Errors
///
/// Returns an error if the address is invalid, the device is not connected,
/// or the peer rejects the command.
pub async fn set_voice_recognition(address: &str, enable: bool) -> Result<(), HfpError> {
    roundtrip(Request::SetVoiceRecognition(parse_address(address)?, enable)).await
}

/// Snapshot every connected device.
///
/// # Errors
///
/// Returns an error if the host tasks are not running.
pub async fn get_status()
-> Result<Vec<DeviceSnapshot, { MAX_ADAPTERS * MAX_DEVICES }>, HfpError> {
    REQUEST_CHANNEL.sender().send(Request::GetStatus).await;
    match RESPONSE_CHANNEL.receiver().receive().await {
        Response::Status(devices) => Ok(devices),
        Response::Error(e) => Err(e),
        Response::Complete => Err(HfpError::Internal),
    }
}
