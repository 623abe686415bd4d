#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(dead_code, clippy::unused_async, clippy::too_many_lines)]

mod address;
pub mod ag;
pub mod api;
pub mod constants;
pub mod hf;
pub mod processor;
pub mod status;

use crate::{
    ag::{AgAction, AgEngine, CallLine},
    constants::{MAX_CALL_SLOTS, MAX_CHANNELS, MAX_NUMBER_LEN, MAX_RESULT_LEN},
    hf::{HfAction, HfEngine, HfError},
    status::DeviceSnapshot,
};
use embassy_sync::channel::Channel;
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    mutex::{MappedMutexGuard, Mutex, MutexGuard},
};
use heapless::{String, Vec};

pub use address::BluetoothAddress;

pub(crate) static REQUEST_CHANNEL: Channel<CriticalSectionRawMutex, Request, MAX_CHANNELS> =
    Channel::new();

pub(crate) static RESPONSE_CHANNEL: Channel<CriticalSectionRawMutex, Response, MAX_CHANNELS> =
    Channel::new();

pub(crate) static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, HfpEvent, MAX_CHANNELS> =
    Channel::new();

pub(crate) static ACTION_CHANNEL: Channel<CriticalSectionRawMutex, Action, MAX_CHANNELS> =
    Channel::new();

/// Global `HfpHost`, initialized by client at runtime
pub(crate) static HFP_HOST: Mutex<CriticalSectionRawMutex, Option<HfpHost>> = Mutex::new(None);

/// Initialize the global `HfpHost`.
///
/// Must be called before using any API functions or spawning the processor
/// tasks.
///
/// # Errors
///
/// Returns an error if the `HfpHost` has already been initialized.
pub async fn init_hfp_host() -> Result<(), &'static str> {
    let mut guard = HFP_HOST.lock().await;
    if guard.is_some() {
        return Err("HfpHost already initialized");
    }
    *guard = Some(HfpHost::new());
    Ok(())
}

/// Get a locked reference to the global `HfpHost`.
///
/// Primarily intended for the processor tasks; API users should go through
/// the `api` module instead.
///
/// # Errors
///
/// Returns an error if the `HfpHost` has not been initialized.
///
/// # Panics
///
/// Panics if the mutex guard cannot be mapped (should never happen in
/// practice).
pub async fn hfp_host<'a>()
-> Result<MappedMutexGuard<'a, CriticalSectionRawMutex, HfpHost>, &'static str> {
    let guard = HFP_HOST.lock().await;
    if guard.is_none() {
        return Err("HfpHost not initialized");
    }
    Ok(MutexGuard::map(guard, |opt| opt.as_mut().unwrap()))
}

/// Push one inbound event for the processor task to consume
///
/// This is the entry point for the transport and telephony glue: raw result
/// code lines, telephony notifications, and connection lifecycle changes all
/// arrive here.
pub async fn submit_event(event: HfpEvent) {
    EVENT_CHANNEL.sender().send(event).await;
}

/// Receive the next outbound side effect
///
/// The transport/audio glue drains this: AT traffic to write, SCO paths to
/// open or close, sink volumes to apply, observer notifications to fan out.
pub async fn next_action() -> Action {
    ACTION_CHANNEL.receiver().receive().await
}

/// Both role engines behind the global host lock
#[derive(Debug, Default)]
pub struct HfpHost {
    /// Audio-gateway role engine
    pub ag: AgEngine,
    /// Hands-free role engine
    pub hf: HfEngine,
    /// A client request is awaiting the peer's acknowledgement
    pub(crate) client_waiting: bool,
}

impl HfpHost {
    /// Fresh host with both engines in their initial state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// The type field of an AT command
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum AtType {
    /// Plain execution command (`ATD`, `ATA`)
    Basic,
    /// Parameter set (`AT+VGS=7`)
    Set,
    /// Action command (`AT+CLCC`)
    Action,
    /// Read command (`AT+CIND?`)
    Read,
}

/// Profile-level errors surfaced through the client API
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum HfpError {
    /// A device address string failed to parse
    InvalidAddress,
    /// The addressed device is not connected
    NotConnected,
    /// The addressed adapter is unknown
    AdapterNotFound,
    /// The peer rejected the request
    Rejected,
    /// A value is outside its protocol range
    InvalidParameter,
    /// A line or field failed to parse
    ParseError,
    /// Indicator negotiation has not completed yet
    NegotiationIncomplete,
    /// The host tasks are not running or answered out of protocol
    Internal,
}

impl From<HfError> for HfpError {
    fn from(err: HfError) -> Self {
        match err {
            HfError::ParseError => Self::ParseError,
            HfError::NegotiationIncomplete => Self::NegotiationIncomplete,
            HfError::NotConnected => Self::NotConnected,
            HfError::AdapterNotFound => Self::AdapterNotFound,
            HfError::InvalidValue => Self::InvalidParameter,
        }
    }
}

/// Inbound events consumed by the processor task, one at a time
#[derive(Debug, Clone)]
pub enum HfpEvent {
    /// Telephony call-list snapshot (AG role); empty means no active calls
    CallList(Vec<CallLine, MAX_CALL_SLOTS>),
    /// Battery percentage 0..100 (AG role)
    Battery(u8),
    /// Signal strength as bars out of `max_bars` (AG role)
    Signal {
        /// Reported bars
        bars: u8,
        /// Scale maximum
        max_bars: u8,
    },
    /// Network registration state string, `"service"` means registered
    Registration {
        /// Registration state
        state: String<16>,
        /// Operator name, when the backend reports one
        operator: Option<String<MAX_NUMBER_LEN>>,
    },
    /// Roaming state (AG role)
    Roaming(bool),
    /// Backend call-volume change on the legacy scale (AG role)
    CallVolume(u8),
    /// Subscriber number answer for a pending `AT+CNUM` (AG role)
    SubscriberNumber(Option<String<MAX_NUMBER_LEN>>),
    /// One AT command received from a hands-free peer (AG role)
    AtCommand {
        /// Command type
        at_type: AtType,
        /// Command text including any `=` suffix
        command: String<MAX_RESULT_LEN>,
        /// Argument text
        arguments: String<MAX_NUMBER_LEN>,
    },
    /// A hands-free peer connected to our AG role
    PeerConnected(BluetoothAddress),
    /// A hands-free peer disconnected from our AG role
    PeerDisconnected(BluetoothAddress),
    /// One raw result-code line from an audio gateway (HF role)
    ResultCode {
        /// Local adapter the line arrived on
        adapter: BluetoothAddress,
        /// Originating device
        device: BluetoothAddress,
        /// Upper-cased line text
        line: String<MAX_RESULT_LEN>,
    },
    /// An audio gateway connected (HF role)
    DeviceConnected {
        /// Local adapter
        adapter: BluetoothAddress,
        /// Remote device
        device: BluetoothAddress,
    },
    /// An audio gateway disconnected (HF role)
    DeviceDisconnected {
        /// Local adapter
        adapter: BluetoothAddress,
        /// Remote device
        device: BluetoothAddress,
    },
    /// A local adapter went away, taking its devices with it (HF role)
    AdapterRemoved(BluetoothAddress),
    /// Voice audio path state changed (HF role)
    ScoState {
        /// Local adapter
        adapter: BluetoothAddress,
        /// Remote device
        device: BluetoothAddress,
        /// Path up or down
        connected: bool,
    },
}

/// Outbound side effects for the transport/audio/observer glue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// AG role side effect
    Ag(AgAction),
    /// HF role side effect
    Hf(HfAction),
}

/// API requests sent to the processing tasks
#[derive(Debug, Clone)]
pub(crate) enum Request {
    /// Answer the ringing call on a device
    AnswerCall(BluetoothAddress),
    /// Hang up the current call on a device
    TerminateCall(BluetoothAddress),
    /// Place an outgoing call
    Dial(BluetoothAddress, String<MAX_NUMBER_LEN>),
    /// Release all held calls
    ReleaseHeldCalls(BluetoothAddress),
    /// Release active calls, accepting a waiting one
    ReleaseActiveCalls(BluetoothAddress),
    /// Hold active calls, accepting a waiting one
    HoldActiveCalls(BluetoothAddress),
    /// Merge held and active calls
    MergeCalls(BluetoothAddress),
    /// Set the speaker gain on a device
    SetVolume(BluetoothAddress, u8),
    /// Toggle voice recognition on a device
    SetVoiceRecognition(BluetoothAddress, bool),
    /// Snapshot every connected device for observers
    GetStatus,
}

/// API responses sent back from the processing tasks
#[derive(Debug, Clone)]
pub(crate) enum Response {
    /// Request completed
    Complete,
    /// Observer snapshot of every connected device
    Status(Vec<DeviceSnapshot, { constants::MAX_ADAPTERS * constants::MAX_DEVICES }>),
    /// Request failed
    Error(HfpError),
}
