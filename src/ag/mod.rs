//! Audio Gateway (AG) Role Implementation
//!
//! The AG side of HFP owns the call and the seven service indicators. It
//! consumes normalized telephony events (call-list snapshots, battery,
//! signal, network registration, roaming) and emits ordered AT result codes
//! (`+CIEV`, `+CIND`, `+CCWA`, `+CHUP`, `OK`) to connected hands-free peers.
//!
//! ## Architecture
//!
//! - **[`IndicatorSnapshot`]**: the seven scalar indicators plus up to three
//!   call slots, mutated in place by the diff engine
//! - **[`AgEngine`]**: diffs each new call-list snapshot against the previous
//!   one and produces the minimal emission sequence as [`AgAction`] values
//! - The transport and audio collaborators live outside the crate; the
//!   processor layer forwards actions to them

pub mod engine;
pub mod indicators;

pub use engine::{AgEngine, CallLine, RingToken};
pub use indicators::{CallSlot, Indicator, IndicatorSnapshot};

use crate::{
    BluetoothAddress,
    constants::{MAX_NUMBER_LEN, MAX_RESULT_LEN, TYPE_INTERNATIONAL, TYPE_NATIONAL},
};
use heapless::String;

/// Direction of a call as reported by the telephony backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub enum CallDirection {
    /// Mobile-originated call
    #[default]
    Outgoing,
    /// Mobile-terminated call
    Incoming,
}

impl CallDirection {
    /// Map the backend's `origin` string onto a direction
    #[must_use]
    pub fn from_origin(origin: &str) -> Option<Self> {
        match origin {
            "outgoing" => Some(Self::Outgoing),
            "incoming" => Some(Self::Incoming),
            _ => None,
        }
    }
}

/// Per-line call state as reported by the telephony backend
///
/// Anything the backend reports outside the known set collapses to
/// `Disconnected`, matching how a line vanishing from the call list is
/// treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub enum CallState {
    /// Call torn down or state not recognized
    #[default]
    Disconnected,
    /// Call connected and audio flowing
    Active,
    /// Call placed on hold
    Held,
    /// Outgoing call being set up
    Dialing,
    /// Incoming or waiting call ringing
    Incoming,
}

impl CallState {
    /// Map the backend's `state` string onto a call state
    #[must_use]
    pub fn from_name(state: &str) -> Self {
        match state {
            "active" => Self::Active,
            "incoming" | "waiting" => Self::Incoming,
            "dialing" => Self::Dialing,
            "hold" => Self::Held,
            _ => Self::Disconnected,
        }
    }
}

/// GSM number type derived from the number's first character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub enum NumberType {
    /// National numbering plan (type 129)
    #[default]
    National,
    /// International numbering plan, leading `+` (type 145)
    International,
}

impl NumberType {
    /// Derive the number type from the dialled string
    #[must_use]
    pub fn from_number(number: &str) -> Self {
        if number.starts_with('+') {
            Self::International
        } else {
            Self::National
        }
    }

    /// The wire value carried in `+CLCC`/`+CNUM` responses
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        match self {
            Self::National => TYPE_NATIONAL,
            Self::International => TYPE_INTERNATIONAL,
        }
    }
}

pub use crate::AtType;

/// Side effects produced by the AG engine, performed by the processor layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgAction {
    /// Send one AT result-code line to every connected peer
    SendResult(String<MAX_RESULT_LEN>),
    /// Start ring indication toward a peer, carrying the caller id
    IndicateCall {
        /// Peer to ring
        address: BluetoothAddress,
        /// Number of the incoming call for caller-id rendering
        number: String<MAX_NUMBER_LEN>,
        /// Token identifying this indication for later cancellation
        token: RingToken,
    },
    /// Tear down an outstanding ring indication
    CancelRingIndication(RingToken),
    /// Open the voice audio (SCO) path toward a peer
    ScoOpen(BluetoothAddress),
    /// Close the voice audio (SCO) path toward a peer
    ScoClose(BluetoothAddress),
    /// Forward a DTMF tone sequence to the telephony backend
    SendDtmf(String<MAX_NUMBER_LEN>),
    /// Enable or disable noise reduction / echo cancellation in the audio sink
    SetNrec(bool),
    /// Set the call volume on the audio sink (legacy coarse-step scale)
    SetCallVolume(u8),
    /// Ask the telephony backend for the subscriber number (`AT+CNUM`)
    QuerySubscriberNumber,
}
