//! AG Diff/Emit Engine
//!
//! Consumes telephony call-list snapshots and scalar status events, diffs
//! them against the current [`IndicatorSnapshot`], and produces the ordered
//! AT emission sequence the connected peers must see. All side effects are
//! returned as [`AgAction`] values; nothing here touches a transport.

use super::{
    AgAction, AtType, CallDirection, CallState, NumberType,
    indicators::{CallSlot, Indicator, IndicatorSnapshot, percent_to_level},
};
use crate::{
    BluetoothAddress,
    constants::{MAX_ACTIONS, MAX_CALL_SLOTS, MAX_DEVICES, MAX_NUMBER_LEN, MAX_RESULT_LEN},
};
use core::fmt::Write;
use heapless::{String, Vec};

/// Handle for one outstanding ring indication, used for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct RingToken(pub u32);

/// One line of a telephony call-list snapshot
///
/// A line with `id == 0` is treated as empty and ignored by diffing, which
/// is also how partially populated backend records degrade: missing fields
/// keep their defaults and at worst the line never occupies a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLine {
    /// Telephony-assigned call id (0 = empty line)
    pub id: u16,
    /// Reported call state
    pub state: CallState,
    /// Call origin
    pub direction: CallDirection,
    /// Part of a multiparty call
    pub multiparty: bool,
    /// Remote party number
    pub number: String<MAX_NUMBER_LEN>,
}

/// Facts extracted from one side of a call-list diff
#[derive(Debug, Clone, Copy, Default)]
struct BatchFacts {
    disconnected: u16,
    active: u16,
    held: u16,
    incoming: u16,
}

/// The AG role engine
///
/// Owns the indicator snapshot and the connected-peer list. Every handler
/// runs synchronously and returns the actions the processor layer must
/// perform; with no connected peers all emission is silently dropped.
#[derive(Debug)]
pub struct AgEngine {
    indicators: IndicatorSnapshot,
    peers: Vec<BluetoothAddress, MAX_DEVICES>,
    network_operator: String<MAX_NUMBER_LEN>,
    ring_token: Option<RingToken>,
    next_ring_token: u32,
}

impl AgEngine {
    /// Create a new engine with zeroed indicators and no peers
    #[must_use]
    pub fn new() -> Self {
        Self {
            indicators: IndicatorSnapshot::new(),
            peers: Vec::new(),
            network_operator: String::new(),
            ring_token: None,
            next_ring_token: 0,
        }
    }

    /// Current indicator snapshot
    #[must_use]
    pub fn indicators(&self) -> &IndicatorSnapshot {
        &self.indicators
    }

    /// Name of the currently registered network operator
    #[must_use]
    pub fn network_operator(&self) -> &str {
        &self.network_operator
    }

    /// Register a newly connected hands-free peer
    pub fn device_connected(&mut self, address: BluetoothAddress) {
        if !self.peers.contains(&address) {
            self.peers.push(address).ok();
            defmt::debug!("[AG] peer connected: {}", address);
        }
    }

    /// Drop a disconnected peer
    pub fn device_disconnected(&mut self, address: BluetoothAddress) {
        if let Some(pos) = self.peers.iter().position(|a| *a == address) {
            self.peers.remove(pos);
            defmt::debug!("[AG] peer disconnected: {}", address);
        }
    }

    /// Process a complete call-list snapshot from the telephony backend
    ///
    /// An empty snapshot clears the call slots without any emission. One
    /// reported line takes the single-line branch table, two or more the
    /// multi-line transition table. Afterwards the reported lines are
    /// committed into the snapshot, vacated slots marked with `-1`.
    pub fn handle_call_list(&mut self, lines: &[CallLine]) -> Vec<AgAction, MAX_ACTIONS> {
        let mut actions = Vec::new();

        if lines.is_empty() {
            self.indicators.clear_call_slots();
            return actions;
        }

        let scratch = Self::build_scratch(lines);
        if lines.len() == 1 {
            self.process_single_call(&scratch, &mut actions);
        } else {
            self.process_multi_call(lines.len().min(MAX_CALL_SLOTS), &scratch, &mut actions);
        }

        self.commit_slots(&scratch);
        actions
    }

    /// Battery percentage from the backend, mapped to the 0..5 level
    pub fn handle_battery(&mut self, percent: u8) -> Vec<AgAction, MAX_ACTIONS> {
        let mut actions = Vec::new();
        let level = percent_to_level(percent);
        if self.indicators.battery != level {
            self.indicators.set(Indicator::Battery, level);
            defmt::debug!("[AG] battery level: {}", level);
            self.emit_ciev(Indicator::Battery, &mut actions);
        }
        actions
    }

    /// Signal bars/max-bars pair from the backend, mapped to the 0..5 level
    pub fn handle_signal(&mut self, bars: u8, max_bars: u8) -> Vec<AgAction, MAX_ACTIONS> {
        let mut actions = Vec::new();
        let percent = if bars > 0 && max_bars > 0 {
            ((u16::from(bars) * 100) / u16::from(max_bars)).min(100) as u8
        } else {
            0
        };
        let level = percent_to_level(percent);
        if self.indicators.signal != level {
            self.indicators.set(Indicator::Signal, level);
            defmt::debug!("[AG] signal level: {}", level);
            self.emit_ciev(Indicator::Signal, &mut actions);
        }
        actions
    }

    /// Network registration state; `"service"` means registered
    pub fn handle_registration(
        &mut self,
        state: &str,
        operator_name: Option<&str>,
    ) -> Vec<AgAction, MAX_ACTIONS> {
        let mut actions = Vec::new();
        let registered = u8::from(state == "service");
        if self.indicators.service != registered {
            self.indicators.set(Indicator::Service, registered);
            defmt::debug!("[AG] registration: {}", registered);
            self.emit_ciev(Indicator::Service, &mut actions);
        }
        if let Some(name) = operator_name
            && !name.is_empty()
        {
            self.network_operator.clear();
            self.network_operator.push_str(name).ok();
        }
        actions
    }

    /// Roaming state change
    pub fn handle_roaming(&mut self, roaming: bool) -> Vec<AgAction, MAX_ACTIONS> {
        let mut actions = Vec::new();
        let value = u8::from(roaming);
        if self.indicators.roaming != value {
            self.indicators.set(Indicator::Roaming, value);
            defmt::debug!("[AG] roaming: {}", value);
            self.emit_ciev(Indicator::Roaming, &mut actions);
        }
        actions
    }

    /// Backend call-volume change, reported to peers as `+VGS`
    ///
    /// The backend volume is on the legacy coarse-step scale; anything at or
    /// below the base maps to gain 0.
    pub fn handle_volume_changed(&mut self, volume: u8) -> Vec<AgAction, MAX_ACTIONS> {
        let mut actions = Vec::new();
        let gain = if volume <= crate::constants::LEGACY_VOLUME_BASE {
            0
        } else {
            (volume - crate::constants::LEGACY_VOLUME_BASE) / crate::constants::LEGACY_GAIN_STEP
        };
        let mut result: String<MAX_RESULT_LEN> = String::new();
        write!(result, "+VGS:{gain}").ok();
        self.send_result(result, &mut actions);
        actions
    }

    /// One AT command received from a connected peer
    pub fn handle_at_command(
        &mut self,
        at_type: AtType,
        command: &str,
        arguments: &str,
    ) -> Vec<AgAction, MAX_ACTIONS> {
        let mut actions = Vec::new();
        match at_type {
            AtType::Set => {
                if command.starts_with("+VTS=") {
                    let mut tones: String<MAX_NUMBER_LEN> = String::new();
                    tones.push_str(arguments).ok();
                    actions.push(AgAction::SendDtmf(tones)).ok();
                } else if command.starts_with("+NREC=") {
                    if arguments.trim() == "0" {
                        actions.push(AgAction::SetNrec(false)).ok();
                    }
                } else if command.starts_with("+VGS=") {
                    if let Ok(gain) = arguments.trim().parse::<u8>() {
                        actions.push(AgAction::SetCallVolume(gain)).ok();
                    } else {
                        defmt::warn!("[AG] bad +VGS argument");
                    }
                }
            }
            AtType::Action => {
                if command == "+CNUM" {
                    actions.push(AgAction::QuerySubscriberNumber).ok();
                }
            }
            AtType::Read => {
                if command == "+CIND" {
                    let mut result: String<MAX_RESULT_LEN> = String::new();
                    result.push_str(&self.indicators.cind_read_result()).ok();
                    self.send_result(result, &mut actions);
                }
            }
            AtType::Basic => {
                defmt::debug!("[AG] unhandled basic command");
            }
        }
        actions
    }

    /// Answer a `+CNUM` query with the subscriber number from the backend
    pub fn send_subscriber_number(&mut self, number: Option<&str>) -> Vec<AgAction, MAX_ACTIONS> {
        let mut actions = Vec::new();
        let mut result: String<MAX_RESULT_LEN> = String::new();
        result.push_str("+CNUM:").ok();
        if let Some(number) = number {
            write!(
                result,
                ",\"{}\",{},,4",
                number,
                NumberType::from_number(number).wire_value()
            )
            .ok();
        }
        self.send_result(result, &mut actions);
        actions
    }

    fn build_scratch(lines: &[CallLine]) -> IndicatorSnapshot {
        let mut scratch = IndicatorSnapshot::new();
        for (slot, line) in scratch.slots.iter_mut().zip(lines) {
            *slot = CallSlot {
                index: i32::from(line.id),
                direction: line.direction,
                status: line.state,
                multiparty: line.multiparty,
                number: line.number.clone(),
                number_type: NumberType::from_number(&line.number),
            };
        }
        scratch
    }

    fn process_single_call(
        &mut self,
        scratch: &IndicatorSnapshot,
        actions: &mut Vec<AgAction, MAX_ACTIONS>,
    ) {
        for slot in &scratch.slots {
            if !slot.is_occupied() {
                continue;
            }

            match slot.status {
                CallState::Incoming => {
                    self.indicate_call(&slot.number, actions);
                    self.indicators.set(Indicator::CallSetup, 1);
                }
                CallState::Active => {
                    if self.indicators.callsetup > 0 && self.indicators.call == 0 {
                        // answer of an incoming or outgoing setup
                        self.indicators.set(Indicator::Call, 1);
                        self.indicators.set(Indicator::CallSetup, 0);
                        self.send_ok(actions);
                        self.emit_ciev(Indicator::Call, actions);
                        self.emit_ciev(Indicator::CallSetup, actions);
                    } else if self.indicators.callheld == 2 {
                        self.indicators.set(Indicator::Call, 1);
                        self.indicators.set(Indicator::CallSetup, 0);
                        self.indicators.set(Indicator::CallHeld, 0);
                        self.emit_ciev(Indicator::CallHeld, actions);
                    } else {
                        // already-active call re-reported
                        self.indicators.set(Indicator::Call, 1);
                        self.indicators.set(Indicator::CallSetup, 0);
                    }

                    self.cancel_ring(actions);
                    if let Some(peer) = self.peers.first() {
                        actions.push(AgAction::ScoOpen(*peer)).ok();
                    }
                }
                CallState::Dialing => {
                    self.indicators.set(Indicator::CallSetup, 2);
                    self.send_ok(actions);
                    self.emit_ciev(Indicator::CallSetup, actions);
                }
                CallState::Disconnected => {
                    self.indicators.set(Indicator::Call, 0);
                    self.indicators.set(Indicator::CallSetup, 0);
                    let mut result: String<MAX_RESULT_LEN> = String::new();
                    result.push_str("+CHUP").ok();
                    self.send_result(result, actions);

                    self.cancel_ring(actions);
                    if let Some(peer) = self.peers.first() {
                        actions.push(AgAction::ScoClose(*peer)).ok();
                    }
                }
                CallState::Held => {}
            }
        }
    }

    fn process_multi_call(
        &mut self,
        count: usize,
        scratch: &IndicatorSnapshot,
        actions: &mut Vec<AgAction, MAX_ACTIONS>,
    ) {
        let mut number: String<MAX_NUMBER_LEN> = String::new();
        let mut new = BatchFacts::default();
        for slot in scratch.slots.iter().take(count) {
            if !slot.is_occupied() {
                continue;
            }
            let id = slot.index as u16;
            match slot.status {
                CallState::Disconnected => new.disconnected = id,
                CallState::Active => new.active = id,
                CallState::Held => new.held = id,
                CallState::Incoming => {
                    new.incoming = 1;
                    number = slot.number.clone();
                }
                CallState::Dialing => {}
            }
        }

        let mut old = BatchFacts::default();
        for slot in &self.indicators.slots {
            if !slot.is_occupied() {
                continue;
            }
            let id = slot.index as u16;
            match slot.status {
                CallState::Disconnected => old.disconnected = id,
                CallState::Active => old.active = id,
                CallState::Held => old.held = id,
                CallState::Incoming => old.incoming = id,
                CallState::Dialing => {}
            }
        }

        if new.active > 0 && new.incoming > 0 {
            // call waiting while another call is up
            self.indicators.set(Indicator::CallSetup, 1);
            let mut result: String<MAX_RESULT_LEN> = String::new();
            write!(result, "+CCWA:{number}").ok();
            self.send_result(result, actions);
        } else if new.active > 0 && new.disconnected > 0 {
            // silent cleanup of a finished setup or hold
            if new.disconnected == old.incoming {
                self.indicators.set(Indicator::CallSetup, 0);
            }
            if new.held == 0 {
                self.indicators.set(Indicator::CallHeld, 0);
            }
        } else if new.active > 0 && new.held > 0 {
            self.indicators.set(Indicator::CallSetup, 0);
            self.indicators.set(Indicator::Call, 1);
            self.indicators.set(Indicator::CallHeld, 1);

            if new.active == old.incoming {
                self.emit_ciev(Indicator::CallSetup, actions);
            }
            self.emit_ciev(Indicator::CallHeld, actions);
        } else if new.held > 0 && new.disconnected > 0 && new.disconnected == old.active {
            self.indicators.set(Indicator::Call, 0);
            self.indicators.set(Indicator::CallHeld, 2);
            self.emit_ciev(Indicator::CallHeld, actions);
        } else if new.disconnected > 0 && new.incoming > 0 {
            // one call ends while another becomes active in the same batch
            self.indicators.set(Indicator::Call, 0);
            self.emit_ciev(Indicator::Call, actions);

            self.indicators.set(Indicator::Call, 1);
            self.indicators.set(Indicator::CallSetup, 0);
            self.emit_ciev(Indicator::Call, actions);
            self.emit_ciev(Indicator::CallSetup, actions);
        }
    }

    fn commit_slots(&mut self, scratch: &IndicatorSnapshot) {
        for (current, new) in self.indicators.slots.iter_mut().zip(&scratch.slots) {
            if new.index == 0 {
                // explicitly vacated, distinct from never used
                current.index = -1;
            } else {
                *current = new.clone();
            }
        }
    }

    fn indicate_call(&mut self, number: &str, actions: &mut Vec<AgAction, MAX_ACTIONS>) {
        let Some(peer) = self.peers.first().copied() else {
            return;
        };

        self.cancel_ring(actions);
        let token = RingToken(self.next_ring_token);
        self.next_ring_token = self.next_ring_token.wrapping_add(1);
        self.ring_token = Some(token);

        let mut caller: String<MAX_NUMBER_LEN> = String::new();
        caller.push_str(number).ok();
        actions
            .push(AgAction::IndicateCall {
                address: peer,
                number: caller,
                token,
            })
            .ok();
        defmt::debug!("[AG] ring indication to {} (token {})", peer, token.0);
    }

    fn cancel_ring(&mut self, actions: &mut Vec<AgAction, MAX_ACTIONS>) {
        if let Some(token) = self.ring_token.take() {
            actions.push(AgAction::CancelRingIndication(token)).ok();
        }
    }

    fn send_ok(&self, actions: &mut Vec<AgAction, MAX_ACTIONS>) {
        let mut result: String<MAX_RESULT_LEN> = String::new();
        result.push_str("OK").ok();
        self.send_result(result, actions);
    }

    fn emit_ciev(&self, indicator: Indicator, actions: &mut Vec<AgAction, MAX_ACTIONS>) {
        let mut result: String<MAX_RESULT_LEN> = String::new();
        result.push_str(&self.indicators.ciev_result(indicator)).ok();
        self.send_result(result, actions);
    }

    fn send_result(&self, result: String<MAX_RESULT_LEN>, actions: &mut Vec<AgAction, MAX_ACTIONS>) {
        if self.peers.is_empty() {
            return;
        }
        actions.push(AgAction::SendResult(result)).ok();
    }
}

impl Default for AgEngine {
    fn default() -> Self {
        Self::new()
    }
}
