//! Hands-Free role
//!
//! The HF side of the profile: parses AT result-code lines from connected
//! audio gateways, tracks per-device indicator and call state in a
//! [`CallRegistry`], and correlates bare `OK`/`ERROR` acknowledgements with
//! the in-flight command queue.

pub mod correlator;
pub mod device;
pub mod engine;
pub mod parser;
pub mod registry;

pub use correlator::{CommandKind, Correlator};
pub use device::{CallRecord, DeviceRecord, IndicatorMap};
pub use engine::HfEngine;
pub use registry::CallRegistry;

use crate::{
    BluetoothAddress,
    constants::{MAX_NUMBER_LEN, MAX_RESULT_LEN},
};
use heapless::String;

/// Semantic meaning of one peer-reported indicator position
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum IndicatorKind {
    /// Network registration (0/1)
    Service,
    /// Call in progress (0/1)
    Call,
    /// Call setup phase (0..3)
    CallSetup,
    /// Held-call state (0..2)
    CallHeld,
    /// Signal strength (0..5)
    Signal,
    /// Roaming (0/1)
    Roaming,
    /// Battery charge (0..5)
    Battery,
}

impl IndicatorKind {
    /// Classify one quoted indicator name from a `+CIND:` support response.
    ///
    /// Peers embellish the standard names, so matching is by substring. The
    /// compound names must be tested before the plain `CALL`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if name.contains("CALLSETUP") {
            Some(Self::CallSetup)
        } else if name.contains("CALLHELD") {
            Some(Self::CallHeld)
        } else if name.contains("CALL") {
            Some(Self::Call)
        } else if name.contains("SERVICE") {
            Some(Self::Service)
        } else if name.contains("SIGNAL") {
            Some(Self::Signal)
        } else if name.contains("ROAM") {
            Some(Self::Roaming)
        } else if name.contains("BATT") {
            Some(Self::Battery)
        } else {
            None
        }
    }
}

/// AG feature support negotiated via `+BRSF`
///
/// The bitmask is parsed as the 12-bit superset; peers speaking an older
/// protocol version simply leave the upper bits clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, defmt::Format)]
pub struct AgFeatures {
    /// Three-way calling
    pub three_way_calling: bool,
    /// Echo cancellation / noise reduction
    pub nrec: bool,
    /// Voice recognition activation
    pub voice_recognition: bool,
    /// In-band ring tone
    pub in_band_ring: bool,
    /// Attach a number to a voice tag
    pub voice_tag: bool,
    /// Ability to reject a call
    pub reject_call: bool,
    /// Enhanced call status
    pub enhanced_call_status: bool,
    /// Enhanced call control
    pub enhanced_call_control: bool,
    /// Extended error result codes
    pub extended_error: bool,
    /// Codec negotiation
    pub codec_negotiation: bool,
    /// HF indicators
    pub hf_indicators: bool,
    /// eSCO S4 settings
    pub esco_s4: bool,
}

impl AgFeatures {
    /// Decode a `+BRSF` bitmask
    #[must_use]
    pub fn from_bitmask(bits: u16) -> Self {
        Self {
            three_way_calling: bits & (1 << 0) != 0,
            nrec: bits & (1 << 1) != 0,
            voice_recognition: bits & (1 << 2) != 0,
            in_band_ring: bits & (1 << 3) != 0,
            voice_tag: bits & (1 << 4) != 0,
            reject_call: bits & (1 << 5) != 0,
            enhanced_call_status: bits & (1 << 6) != 0,
            enhanced_call_control: bits & (1 << 7) != 0,
            extended_error: bits & (1 << 8) != 0,
            codec_negotiation: bits & (1 << 9) != 0,
            hf_indicators: bits & (1 << 10) != 0,
            esco_s4: bits & (1 << 11) != 0,
        }
    }
}

/// Map a `+CLCC` direction code to its symbolic name
#[must_use]
pub fn direction_name(code: u8) -> &'static str {
    match code {
        0 => "outgoing",
        _ => "incoming",
    }
}

/// Map a `+CLCC` status code to its symbolic name
#[must_use]
pub fn status_name(code: u8) -> &'static str {
    match code {
        0 => "active",
        1 => "held",
        2 => "dialing",
        3 => "alerting",
        4 => "incoming",
        5 => "waiting",
        _ => "callheldbyresponse",
    }
}

/// HF role error type
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum HfError {
    /// A result-code line or one of its fields failed to parse
    ParseError,
    /// An indicator value arrived before the indicator layout was negotiated
    NegotiationIncomplete,
    /// The addressed device has no registry entry
    NotConnected,
    /// The addressed adapter has no registry entry
    AdapterNotFound,
    /// A requested value is outside its protocol range
    InvalidValue,
}

/// Side effects produced by the HF engine, performed by the processor layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HfAction {
    /// Send one AT command to a peer
    SendAt {
        /// Destination device
        address: BluetoothAddress,
        /// Command type
        at_type: crate::AtType,
        /// Command name, including any `+` prefix
        command: String<MAX_RESULT_LEN>,
        /// Argument string, empty when the command takes none
        arguments: String<MAX_NUMBER_LEN>,
    },
    /// Forward a speaker volume to the audio sink, rescaled to 0..100
    SetSinkVolume {
        /// Device the volume belongs to
        address: BluetoothAddress,
        /// Volume percentage
        percent: u8,
    },
    /// Device status changed in a way observers must see
    NotifyObservers,
    /// Resolve the pending client request for a device
    RespondClient {
        /// Device the request addressed
        address: BluetoothAddress,
        /// Whether the peer accepted the request
        success: bool,
    },
}

/// Rescale a 0..15 speaker gain to the sink's 0..100 range
#[must_use]
pub fn gain_to_percent(gain: u8) -> u8 {
    ((u16::from(gain) * 100) / u16::from(crate::constants::SPEAKER_GAIN_MAX)) as u8
}
