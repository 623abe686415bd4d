//! Per-device HF state
//!
//! One [`DeviceRecord`] per connected audio gateway: the negotiated
//! indicator layout, the mirrored scalar indicators, audio and feature
//! state, and the call table keyed by phone number.

use super::{AgFeatures, HfError, IndicatorKind};
use crate::constants::{DEFAULT_SPEAKER_GAIN, MAX_CALL_RECORDS, MAX_INDICATORS, MAX_NUMBER_LEN};
use heapless::{FnvIndexMap, String, Vec};

/// Indicator layout learned from the peer's `+CIND:` support response
///
/// Positions are 1-based on the wire. A position holding `None` was
/// negotiated but carries a name this profile does not track; its values
/// are accepted and discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorMap {
    positions: Vec<Option<IndicatorKind>, MAX_INDICATORS>,
}

impl IndicatorMap {
    /// Parse the quoted indicator names of a `+CIND:` support response,
    /// in order. Fails when no quoted name is present at all.
    pub fn from_name_list(args: &str) -> Result<Self, HfError> {
        let mut positions = Vec::new();
        let mut rest = args;
        while let Some(open) = rest.find('"') {
            let tail = &rest[open + 1..];
            let Some(close) = tail.find('"') else {
                return Err(HfError::ParseError);
            };
            positions.push(IndicatorKind::from_name(&tail[..close])).ok();
            rest = &tail[close + 1..];
        }
        if positions.is_empty() {
            return Err(HfError::ParseError);
        }
        Ok(Self { positions })
    }

    /// Number of negotiated positions
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no positions were negotiated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Resolve a 1-based wire position
    ///
    /// `Err` marks a position outside the negotiated range, `Ok(None)` one
    /// that was negotiated under an untracked name.
    pub fn kind_at(&self, position: u8) -> Result<Option<IndicatorKind>, HfError> {
        if position == 0 {
            return Err(HfError::ParseError);
        }
        self.positions
            .get(usize::from(position) - 1)
            .copied()
            .ok_or(HfError::ParseError)
    }
}

/// The seven scalar indicators mirrored from the peer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, defmt::Format)]
pub struct ScalarIndicators {
    /// Network registration
    pub service: u8,
    /// Call in progress
    pub call: u8,
    /// Call setup phase
    pub callsetup: u8,
    /// Held-call state
    pub callheld: u8,
    /// Signal strength
    pub signal: u8,
    /// Roaming
    pub roaming: u8,
    /// Battery charge
    pub battery: u8,
}

impl ScalarIndicators {
    /// Write one indicator by kind
    pub fn set(&mut self, kind: IndicatorKind, value: u8) {
        match kind {
            IndicatorKind::Service => self.service = value,
            IndicatorKind::Call => self.call = value,
            IndicatorKind::CallSetup => self.callsetup = value,
            IndicatorKind::CallHeld => self.callheld = value,
            IndicatorKind::Signal => self.signal = value,
            IndicatorKind::Roaming => self.roaming = value,
            IndicatorKind::Battery => self.battery = value,
        }
    }

    /// Read one indicator by kind
    #[must_use]
    pub fn get(&self, kind: IndicatorKind) -> u8 {
        match kind {
            IndicatorKind::Service => self.service,
            IndicatorKind::Call => self.call,
            IndicatorKind::CallSetup => self.callsetup,
            IndicatorKind::CallHeld => self.callheld,
            IndicatorKind::Signal => self.signal,
            IndicatorKind::Roaming => self.roaming,
            IndicatorKind::Battery => self.battery,
        }
    }
}

/// One `+CLCC`-reported call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallRecord {
    /// Call index on the peer
    pub index: u8,
    /// Symbolic direction name
    pub direction: &'static str,
    /// Symbolic status name
    pub status: &'static str,
    /// Call mode (0 = voice)
    pub mode: u8,
    /// Part of a multiparty call
    pub multiparty: bool,
    /// GSM number type
    pub number_type: u8,
}

/// Full state of one connected audio gateway
#[derive(Debug, Clone, Default)]
pub struct DeviceRecord {
    indicator_map: Option<IndicatorMap>,
    /// Mirrored scalar indicators
    pub indicators: ScalarIndicators,
    /// Negotiated AG feature support
    pub features: AgFeatures,
    /// Voice audio path up
    pub sco_connected: bool,
    /// Speaker gain, 0..15
    pub volume: u8,
    /// Ring indication outstanding
    pub ring: bool,
    /// Voice recognition active
    pub voice_recognition: bool,
    /// Registered network operator name
    pub operator_name: String<MAX_NUMBER_LEN>,
    /// A held call just disconnected (pending call-list confirmation)
    pub held_call_disconnected: bool,
    /// A waiting call was announced via `+CCWA`
    pub waiting_call: bool,
    calls: FnvIndexMap<String<MAX_NUMBER_LEN>, CallRecord, MAX_CALL_RECORDS>,
    active_number: String<MAX_NUMBER_LEN>,
    batch_count: u8,
}

impl DeviceRecord {
    /// Fresh record with the default speaker gain
    #[must_use]
    pub fn new() -> Self {
        Self {
            volume: DEFAULT_SPEAKER_GAIN,
            ..Default::default()
        }
    }

    /// Install the negotiated indicator layout. Replaying the same layout
    /// is a no-op in effect.
    pub fn resolve_indicators(&mut self, map: IndicatorMap) {
        self.indicator_map = Some(map);
    }

    /// Whether indicator negotiation has completed
    #[must_use]
    pub fn indicators_resolved(&self) -> bool {
        self.indicator_map.is_some()
    }

    /// Registered with the network, per the service indicator
    #[must_use]
    pub fn registered(&self) -> bool {
        self.indicators.service != 0
    }

    /// Negotiated layout, for lookups
    pub fn indicator_map(&self) -> Result<&IndicatorMap, HfError> {
        self.indicator_map
            .as_ref()
            .ok_or(HfError::NegotiationIncomplete)
    }

    /// Apply a `+CIND:` value list, one integer per negotiated position
    ///
    /// All values are parsed before any is committed, so a malformed field
    /// leaves the record untouched.
    pub fn apply_cind_values(&mut self, args: &str) -> Result<(), HfError> {
        let map = self.indicator_map()?.clone();

        let mut parsed: Vec<u8, MAX_INDICATORS> = Vec::new();
        for field in args.split(',').take(map.len()) {
            let value = field.trim().parse::<u8>().map_err(|_| HfError::ParseError)?;
            parsed.push(value).ok();
        }
        if parsed.len() < map.len() {
            return Err(HfError::ParseError);
        }

        for (position0, value) in parsed.iter().enumerate() {
            if let Ok(Some(kind)) = map.kind_at(position0 as u8 + 1) {
                self.indicators.set(kind, *value);
            }
        }
        Ok(())
    }

    /// Insert or replace the call record for a number and remember it as
    /// the active number
    pub fn update_call(&mut self, number: &str, record: CallRecord) -> Result<(), HfError> {
        let key: String<MAX_NUMBER_LEN> =
            String::try_from(number).map_err(|_| HfError::ParseError)?;
        self.active_number.clear();
        self.active_number.push_str(&key).ok();
        if self.calls.insert(key, record).is_err() {
            defmt::warn!("[HF] call table full, dropping record");
        }
        self.batch_count = self.batch_count.saturating_add(1);
        Ok(())
    }

    /// Drop every call record and forget the active number
    pub fn clear_calls(&mut self) {
        self.calls.clear();
        self.active_number.clear();
        self.batch_count = 0;
    }

    /// Drop every call record except the active number's
    pub fn retain_active_call(&mut self) {
        let active = self.active_number.clone();
        let stale: Vec<String<MAX_NUMBER_LEN>, MAX_CALL_RECORDS> = self
            .calls
            .keys()
            .filter(|number| **number != active)
            .cloned()
            .collect();
        for number in &stale {
            self.calls.remove(number);
        }
    }

    /// Call records currently known for this device
    pub fn calls(&self) -> impl Iterator<Item = (&String<MAX_NUMBER_LEN>, &CallRecord)> {
        self.calls.iter()
    }

    /// Records seen since the last completed `+CLCC` batch
    #[must_use]
    pub fn batch_count(&self) -> u8 {
        self.batch_count
    }

    /// Reset the per-batch record counter
    pub fn reset_batch_count(&mut self) {
        self.batch_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME_LIST: &str =
        "(\"SERVICE\",(0,1)),(\"CALL\",(0,1)),(\"CALLSETUP\",(0,3)),(\"CALLHELD\",(0,2)),(\"SIGNAL\",(0,5)),(\"ROAM\",(0,1)),(\"BATTCHG\",(0,5))";

    fn resolved_record() -> DeviceRecord {
        let mut record = DeviceRecord::new();
        record.resolve_indicators(IndicatorMap::from_name_list(NAME_LIST).unwrap());
        record
    }

    fn call(index: u8, status: &'static str) -> CallRecord {
        CallRecord {
            index,
            direction: "incoming",
            status,
            mode: 0,
            multiparty: false,
            number_type: 129,
        }
    }

    #[test]
    fn test_name_list_parsing_and_positions() {
        let map = IndicatorMap::from_name_list(NAME_LIST).unwrap();
        assert_eq!(map.len(), 7);
        assert_eq!(map.kind_at(1), Ok(Some(IndicatorKind::Service)));
        assert_eq!(map.kind_at(3), Ok(Some(IndicatorKind::CallSetup)));
        assert_eq!(map.kind_at(7), Ok(Some(IndicatorKind::Battery)));
        assert_eq!(map.kind_at(8), Err(HfError::ParseError));
        assert_eq!(map.kind_at(0), Err(HfError::ParseError));
    }

    #[test]
    fn test_negotiation_is_idempotent() {
        let first = IndicatorMap::from_name_list(NAME_LIST).unwrap();
        let second = IndicatorMap::from_name_list(NAME_LIST).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_name_occupies_position() {
        let map = IndicatorMap::from_name_list("(\"SMSFULL\",(0,1)),(\"CALL\",(0,1))").unwrap();
        assert_eq!(map.kind_at(1), Ok(None));
        assert_eq!(map.kind_at(2), Ok(Some(IndicatorKind::Call)));
    }

    #[test]
    fn test_name_list_without_quotes_is_rejected() {
        assert_eq!(
            IndicatorMap::from_name_list("1,0,0"),
            Err(HfError::ParseError)
        );
    }

    #[test]
    fn test_cind_values_require_negotiation() {
        let mut record = DeviceRecord::new();
        assert_eq!(
            record.apply_cind_values("1,0,0,0,5,0,5"),
            Err(HfError::NegotiationIncomplete)
        );
    }

    #[test]
    fn test_cind_values_apply_by_learned_position() {
        let mut record = resolved_record();
        record.apply_cind_values("1,0,2,0,4,1,3").unwrap();
        assert_eq!(record.indicators.service, 1);
        assert_eq!(record.indicators.callsetup, 2);
        assert_eq!(record.indicators.signal, 4);
        assert_eq!(record.indicators.roaming, 1);
        assert_eq!(record.indicators.battery, 3);
    }

    #[test]
    fn test_malformed_cind_value_leaves_state_untouched() {
        let mut record = resolved_record();
        record.apply_cind_values("1,0,0,0,5,0,5").unwrap();
        assert_eq!(
            record.apply_cind_values("1,0,x,0,5,0,5"),
            Err(HfError::ParseError)
        );
        assert_eq!(record.indicators.service, 1);
        assert_eq!(record.indicators.signal, 5);
    }

    #[test]
    fn test_one_call_record_per_number() {
        let mut record = DeviceRecord::new();
        record.update_call("5551234", call(1, "incoming")).unwrap();
        record.update_call("5551234", call(1, "active")).unwrap();
        assert_eq!(record.calls().count(), 1);
        assert_eq!(record.calls().next().unwrap().1.status, "active");
    }

    #[test]
    fn test_retain_active_call_drops_stale_numbers() {
        let mut record = DeviceRecord::new();
        record.update_call("5551111", call(1, "held")).unwrap();
        record.update_call("5552222", call(2, "active")).unwrap();
        record.retain_active_call();
        assert_eq!(record.calls().count(), 1);
        assert_eq!(record.calls().next().unwrap().0.as_str(), "5552222");
    }

    #[test]
    fn test_default_speaker_gain() {
        assert_eq!(DeviceRecord::new().volume, DEFAULT_SPEAKER_GAIN);
    }
}
