//! AG Indicator State
//!
//! [`IndicatorSnapshot`] is the single mutable record of what the AG has told
//! its peers: the seven scalar indicators and up to three call slots. The
//! diff engine mutates it in place; the formatting helpers here render the
//! `+CIND`/`+CIEV` result codes from it.

use super::{CallDirection, CallState, NumberType};
use crate::constants::{
    IND_BATTCHG, IND_CALL, IND_CALLHELD, IND_CALLSETUP, IND_ROAM, IND_SERVICE, IND_SIGNAL,
    MAX_CALL_SLOTS, MAX_NUMBER_LEN,
};
use core::fmt::Write;
use heapless::String;

/// One of the seven HFP service indicators
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Indicator {
    /// Network service availability (0/1)
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

impl Indicator {
    /// Fixed `+CIEV` wire position of this indicator
    #[must_use]
    pub const fn wire_position(self) -> u8 {
        match self {
            Self::Call => IND_CALL,
            Self::CallSetup => IND_CALLSETUP,
            Self::Service => IND_SERVICE,
            Self::Signal => IND_SIGNAL,
            Self::Roaming => IND_ROAM,
            Self::Battery => IND_BATTCHG,
            Self::CallHeld => IND_CALLHELD,
        }
    }
}

/// One AG call slot
///
/// `index` is the telephony-assigned call id: `0` means the slot was never
/// used, `-1` that it was explicitly vacated by a later snapshot. Diffing
/// ignores both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSlot {
    /// Telephony call id (0 = empty, -1 = vacated)
    pub index: i32,
    /// Call direction
    pub direction: CallDirection,
    /// Reported call state
    pub status: CallState,
    /// Part of a multiparty (conference) call
    pub multiparty: bool,
    /// Remote party number
    pub number: String<MAX_NUMBER_LEN>,
    /// GSM number type derived from the number
    pub number_type: NumberType,
}

impl CallSlot {
    /// Whether this slot holds a live entry that diffing should consider
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.index > 0
    }
}

/// The AG-side indicator vector plus call slots
///
/// Exactly one snapshot exists per AG role instance. Indicators are only
/// ever overwritten; call slots are cleared on "no active lines" telephony
/// events while the indicators persist.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSnapshot {
    /// Network service availability
    pub service: u8,
    /// Call in progress
    pub call: u8,
    /// Call setup phase (0 none, 1 incoming, 2 outgoing, 3 alerting)
    pub callsetup: u8,
    /// Held-call state (0 none, 1 swap, 2 on hold)
    pub callheld: u8,
    /// Signal strength 0..5
    pub signal: u8,
    /// Roaming flag
    pub roaming: u8,
    /// Battery charge 0..5
    pub battery: u8,
    /// Call slots
    pub slots: [CallSlot; MAX_CALL_SLOTS],
}

impl IndicatorSnapshot {
    /// Create a snapshot with all indicators zeroed and slots empty
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of one indicator
    #[must_use]
    pub const fn value(&self, indicator: Indicator) -> u8 {
        match indicator {
            Indicator::Service => self.service,
            Indicator::Call => self.call,
            Indicator::CallSetup => self.callsetup,
            Indicator::CallHeld => self.callheld,
            Indicator::Signal => self.signal,
            Indicator::Roaming => self.roaming,
            Indicator::Battery => self.battery,
        }
    }

    /// Overwrite one indicator
    pub const fn set(&mut self, indicator: Indicator, value: u8) {
        match indicator {
            Indicator::Service => self.service = value,
            Indicator::Call => self.call = value,
            Indicator::CallSetup => self.callsetup = value,
            Indicator::CallHeld => self.callheld = value,
            Indicator::Signal => self.signal = value,
            Indicator::Roaming => self.roaming = value,
            Indicator::Battery => self.battery = value,
        }
    }

    /// Render the `+CIEV` event line for one indicator's current value
    #[must_use]
    pub fn ciev_result(&self, indicator: Indicator) -> String<16> {
        let mut result = String::new();
        write!(
            result,
            "+CIEV:{},{}",
            indicator.wire_position(),
            self.value(indicator)
        )
        .ok();
        result
    }

    /// Render the `+CIND` read response listing every current value
    ///
    /// Field order is call, callsetup, service, signal, roaming, battery,
    /// callheld.
    #[must_use]
    pub fn cind_read_result(&self) -> String<32> {
        let mut result = String::new();
        write!(
            result,
            "+CIND:{},{},{},{},{},{},{}",
            self.call,
            self.callsetup,
            self.service,
            self.signal,
            self.roaming,
            self.battery,
            self.callheld
        )
        .ok();
        result
    }

    /// Clear every call slot, preserving the scalar indicators
    pub fn clear_call_slots(&mut self) {
        for slot in &mut self.slots {
            *slot = CallSlot::default();
        }
    }
}

/// Map a 0..100 percentage onto the 0..5 indicator range
///
/// Breakpoints follow the HFP battery/signal convention: 0 maps to 0,
/// then one level per 20-point band.
#[must_use]
pub fn percent_to_level(percent: u8) -> u8 {
    match percent {
        0 => 0,
        1..=20 => 1,
        21..=40 => 2,
        41..=60 => 3,
        61..=80 => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_positions() {
        assert_eq!(Indicator::Call.wire_position(), 1);
        assert_eq!(Indicator::CallSetup.wire_position(), 2);
        assert_eq!(Indicator::Service.wire_position(), 3);
        assert_eq!(Indicator::Signal.wire_position(), 4);
        assert_eq!(Indicator::Roaming.wire_position(), 5);
        assert_eq!(Indicator::Battery.wire_position(), 6);
        assert_eq!(Indicator::CallHeld.wire_position(), 7);
    }

    #[test]
    fn test_ciev_result() {
        let mut snapshot = IndicatorSnapshot::new();
        snapshot.set(Indicator::CallSetup, 2);
        assert_eq!(snapshot.ciev_result(Indicator::CallSetup).as_str(), "+CIEV:2,2");

        snapshot.set(Indicator::Battery, 5);
        assert_eq!(snapshot.ciev_result(Indicator::Battery).as_str(), "+CIEV:6,5");
    }

    #[test]
    fn test_cind_read_result() {
        let mut snapshot = IndicatorSnapshot::new();
        snapshot.service = 1;
        snapshot.signal = 4;
        snapshot.battery = 3;
        assert_eq!(snapshot.cind_read_result().as_str(), "+CIND:0,0,1,4,0,3,0");
    }

    #[test]
    fn test_clear_call_slots_preserves_indicators() {
        let mut snapshot = IndicatorSnapshot::new();
        snapshot.service = 1;
        snapshot.battery = 4;
        snapshot.slots[0].index = 3;
        snapshot.slots[0].status = CallState::Active;

        snapshot.clear_call_slots();
        assert_eq!(snapshot.slots[0].index, 0);
        assert_eq!(snapshot.service, 1);
        assert_eq!(snapshot.battery, 4);
    }

    #[test]
    fn test_percent_to_level_boundaries() {
        assert_eq!(percent_to_level(0), 0);
        assert_eq!(percent_to_level(1), 1);
        assert_eq!(percent_to_level(20), 1);
        assert_eq!(percent_to_level(21), 2);
        assert_eq!(percent_to_level(40), 2);
        assert_eq!(percent_to_level(60), 3);
        assert_eq!(percent_to_level(80), 4);
        assert_eq!(percent_to_level(100), 5);
    }

    #[test]
    fn test_slot_occupancy() {
        let mut slot = CallSlot::default();
        assert!(!slot.is_occupied());
        slot.index = 1;
        assert!(slot.is_occupied());
        slot.index = -1;
        assert!(!slot.is_occupied());
    }
}
