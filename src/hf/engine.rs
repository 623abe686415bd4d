//! HF result-code engine
//!
//! Drives the HF role: one inbound result-code line at a time is
//! classified, dispatched into the [`CallRegistry`], and answered with a
//! bounded list of [`HfAction`] side effects. Client call-control
//! operations enter here too, issuing AT commands and marking them pending
//! in the [`Correlator`].

use super::{
    AgFeatures, HfAction, HfError, IndicatorKind,
    correlator::{CommandKind, Correlator},
    device::{CallRecord, IndicatorMap},
    direction_name, gain_to_percent,
    parser::{self, EventKind, ResultCode},
    registry::CallRegistry,
    status_name,
};
use crate::{
    AtType, BluetoothAddress,
    constants::{MAX_ACTIONS, MAX_DEVICES, MAX_NUMBER_LEN, MAX_RESULT_LEN, SPEAKER_GAIN_MAX},
};
use heapless::{String, Vec};

/// The HF role engine
#[derive(Debug, Default)]
pub struct HfEngine {
    registry: CallRegistry,
    correlator: Correlator,
}

impl HfEngine {
    /// Fresh engine with no known devices
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry view, for observer snapshots
    #[must_use]
    pub fn registry(&self) -> &CallRegistry {
        &self.registry
    }

    /// Process one raw result-code line from a device
    ///
    /// Malformed lines are dropped with a diagnostic and never touch
    /// committed state; everything else follows the classification order of
    /// the result-code grammar.
    pub fn handle_result_code(
        &mut self,
        adapter: BluetoothAddress,
        device: BluetoothAddress,
        line: &str,
    ) -> Vec<HfAction, MAX_ACTIONS> {
        let mut actions = Vec::new();

        match parser::classify(line) {
            ResultCode::ExtendedError => {
                // the bare ERROR following the report pops the pending entry
                actions
                    .push(HfAction::RespondClient { address: device, success: false })
                    .ok();
            }
            ResultCode::Event { kind, args } => {
                if let Err(err) = self.dispatch_event(adapter, device, kind, args, &mut actions) {
                    defmt::warn!("[HF] dropped line from {}: {}", device, err);
                    return actions;
                }
                // a pending CLCC defers notification until its OK lands;
                // BRSF and BVRA are acknowledged by their own event line
                match self.correlator.front(device) {
                    Some(CommandKind::Clcc) => {}
                    Some(CommandKind::Brsf | CommandKind::Bvra) => {
                        self.correlator.pop(device);
                    }
                    _ => {
                        actions.push(HfAction::NotifyObservers).ok();
                    }
                }
            }
            ResultCode::Ring => {
                if let Some(record) = self.registry.get_mut(adapter, device) {
                    record.ring = true;
                } else {
                    defmt::warn!("[HF] RING from unknown device {}", device);
                }
            }
            ResultCode::Ok => self.handle_ok(adapter, device, &mut actions),
            ResultCode::Error => {
                self.correlator.pop(device);
                actions
                    .push(HfAction::RespondClient { address: device, success: false })
                    .ok();
            }
            ResultCode::Unknown => {
                defmt::debug!("[HF] ignoring unrecognized line from {}", device);
            }
        }

        actions
    }

    fn dispatch_event(
        &mut self,
        adapter: BluetoothAddress,
        device: BluetoothAddress,
        kind: EventKind,
        args: &str,
        actions: &mut Vec<HfAction, MAX_ACTIONS>,
    ) -> Result<(), HfError> {
        match kind {
            EventKind::Cind => {
                if args.contains("CALL") {
                    // support response: learn the indicator layout
                    let map = IndicatorMap::from_name_list(args)?;
                    if let Some(record) = self.registry.get_mut(adapter, device) {
                        record.resolve_indicators(map);
                    } else {
                        // peer identity not confirmed yet
                        self.registry.stage_indicator_map(map);
                    }
                } else {
                    let record = self
                        .registry
                        .get_mut(adapter, device)
                        .ok_or(HfError::NotConnected)?;
                    record.apply_cind_values(args)?;
                }
            }
            EventKind::Brsf => {
                let bits = args.trim().parse::<u16>().map_err(|_| HfError::ParseError)?;
                let record = self
                    .registry
                    .get_mut(adapter, device)
                    .ok_or(HfError::NotConnected)?;
                record.features = AgFeatures::from_bitmask(bits & 0x0FFF);
                defmt::debug!("[HF] features for {}: {}", device, record.features);
                if record.features.nrec {
                    // echo cancellation stays with the sink on our side
                    Self::push_send_at(actions, device, AtType::Set, "+NREC", "0");
                    self.correlator.push(device, CommandKind::Generic);
                }
            }
            EventKind::Ciev => {
                self.apply_ciev(adapter, device, args)?;
                Self::push_send_at(actions, device, AtType::Action, "+CLCC", "");
                self.correlator.push(device, CommandKind::Clcc);
            }
            EventKind::Clcc => {
                self.apply_clcc(adapter, device, args)?;
            }
            EventKind::Ccwa => {
                let record = self
                    .registry
                    .get_mut(adapter, device)
                    .ok_or(HfError::NotConnected)?;
                record.waiting_call = true;
            }
            EventKind::Vgs => {
                let gain = args.trim().parse::<u8>().map_err(|_| HfError::ParseError)?;
                if gain > SPEAKER_GAIN_MAX {
                    return Err(HfError::InvalidValue);
                }
                let record = self
                    .registry
                    .get_mut(adapter, device)
                    .ok_or(HfError::NotConnected)?;
                record.volume = gain;
                actions
                    .push(HfAction::SetSinkVolume {
                        address: device,
                        percent: gain_to_percent(gain),
                    })
                    .ok();
            }
            EventKind::Bvra => {
                let enabled = match args.trim() {
                    "0" => false,
                    "1" => true,
                    _ => return Err(HfError::ParseError),
                };
                let record = self
                    .registry
                    .get_mut(adapter, device)
                    .ok_or(HfError::NotConnected)?;
                record.voice_recognition = enabled;
            }
            EventKind::Other => {
                defmt::debug!("[HF] unhandled event line from {}", device);
            }
        }
        Ok(())
    }

    /// Apply one `+CIEV: <index>,<value>` update and queue a call-list
    /// refresh.
    fn apply_ciev(
        &mut self,
        adapter: BluetoothAddress,
        device: BluetoothAddress,
        args: &str,
    ) -> Result<(), HfError> {
        let (index, value) = args.split_once(',').ok_or(HfError::ParseError)?;
        let index = index.trim().parse::<u8>().map_err(|_| HfError::ParseError)?;
        let value = value.trim().parse::<u8>().map_err(|_| HfError::ParseError)?;

        let record = self
            .registry
            .get_mut(adapter, device)
            .ok_or(HfError::NotConnected)?;

        if let Some(kind) = record.indicator_map()?.kind_at(index)? {
            if kind == IndicatorKind::CallHeld {
                if value == 0 {
                    record.held_call_disconnected = true;
                }
                record.waiting_call = false;
            }
            record.indicators.set(kind, value);
        }

        record.ring = false;
        if record.indicators.call == 0 {
            record.clear_calls();
        }
        Ok(())
    }

    /// Parse one `+CLCC:` record into the call table
    fn apply_clcc(
        &mut self,
        adapter: BluetoothAddress,
        device: BluetoothAddress,
        args: &str,
    ) -> Result<(), HfError> {
        let mut fields = args.split(',');
        let mut next = || fields.next().map(str::trim).ok_or(HfError::ParseError);

        let index = next()?.parse::<u8>().map_err(|_| HfError::ParseError)?;
        let direction = next()?.parse::<u8>().map_err(|_| HfError::ParseError)?;
        let status = next()?.parse::<u8>().map_err(|_| HfError::ParseError)?;
        let mode = next()?.parse::<u8>().map_err(|_| HfError::ParseError)?;
        let multiparty = next()?.parse::<u8>().map_err(|_| HfError::ParseError)?;
        let number = next()?.trim_matches('"');
        let number_type = next()?.parse::<u8>().map_err(|_| HfError::ParseError)?;

        let record = self
            .registry
            .get_mut(adapter, device)
            .ok_or(HfError::NotConnected)?;
        record.update_call(
            number,
            CallRecord {
                index,
                direction: direction_name(direction),
                status: status_name(status),
                mode,
                multiparty: multiparty != 0,
                number_type,
            },
        )
    }

    fn handle_ok(
        &mut self,
        adapter: BluetoothAddress,
        device: BluetoothAddress,
        actions: &mut Vec<HfAction, MAX_ACTIONS>,
    ) {
        match self.correlator.pop(device) {
            Some(CommandKind::Clcc) => {
                if let Some(record) = self.registry.get_mut(adapter, device) {
                    if record.held_call_disconnected
                        || (record.waiting_call && record.batch_count() == 1)
                    {
                        record.retain_active_call();
                    }
                    record.held_call_disconnected = false;
                    record.waiting_call = false;
                    record.reset_batch_count();
                }
                actions.push(HfAction::NotifyObservers).ok();
            }
            Some(CommandKind::Vgs) => {
                if let Some(record) = self.registry.get(adapter, device) {
                    actions
                        .push(HfAction::SetSinkVolume {
                            address: device,
                            percent: gain_to_percent(record.volume),
                        })
                        .ok();
                }
                actions.push(HfAction::NotifyObservers).ok();
                actions
                    .push(HfAction::RespondClient { address: device, success: true })
                    .ok();
            }
            _ => {
                // no pending kind behaves like a generic command
                actions
                    .push(HfAction::RespondClient { address: device, success: true })
                    .ok();
            }
        }
    }

    // ---- connection lifecycle ----

    /// Register a newly connected audio gateway
    pub fn device_connected(
        &mut self,
        adapter: BluetoothAddress,
        device: BluetoothAddress,
    ) -> Result<(), HfError> {
        self.registry.create_device(adapter, device)
    }

    /// Tear down a disconnected device, discarding its in-flight commands
    pub fn device_disconnected(
        &mut self,
        adapter: BluetoothAddress,
        device: BluetoothAddress,
    ) -> Result<(), HfError> {
        self.registry.remove_device(adapter, device)?;
        self.correlator.discard(device);
        Ok(())
    }

    /// Purge every device under a removed adapter
    pub fn adapter_removed(&mut self, adapter: BluetoothAddress) -> Result<(), HfError> {
        let orphans: Vec<BluetoothAddress, MAX_DEVICES> = self
            .registry
            .devices()
            .filter(|(a, _, _)| *a == adapter)
            .map(|(_, d, _)| d)
            .collect();
        self.registry.remove_adapter(adapter)?;
        for device in &orphans {
            self.correlator.discard(*device);
        }
        Ok(())
    }

    /// Record a voice audio path state change; returns whether it changed
    pub fn update_sco(
        &mut self,
        adapter: BluetoothAddress,
        device: BluetoothAddress,
        connected: bool,
    ) -> Result<bool, HfError> {
        let record = self
            .registry
            .get_mut(adapter, device)
            .ok_or(HfError::NotConnected)?;
        let changed = record.sco_connected != connected;
        record.sco_connected = connected;
        Ok(changed)
    }

    // ---- client call control ----

    /// Answer the ringing call (`ATA`)
    pub fn answer_call(
        &mut self,
        device: BluetoothAddress,
    ) -> Result<Vec<HfAction, MAX_ACTIONS>, HfError> {
        self.simple_command(device, AtType::Basic, "A", "")
    }

    /// Hang up the current call (`AT+CHUP`)
    pub fn terminate_call(
        &mut self,
        device: BluetoothAddress,
    ) -> Result<Vec<HfAction, MAX_ACTIONS>, HfError> {
        self.simple_command(device, AtType::Action, "+CHUP", "")
    }

    /// Place an outgoing call (`ATD<number>`)
    pub fn dial(
        &mut self,
        device: BluetoothAddress,
        number: &str,
    ) -> Result<Vec<HfAction, MAX_ACTIONS>, HfError> {
        if number.is_empty() || number.len() > MAX_NUMBER_LEN {
            return Err(HfError::InvalidValue);
        }
        self.simple_command(device, AtType::Basic, "D", number)
    }

    /// Release all held calls (`AT+CHLD=0`)
    pub fn release_held_calls(
        &mut self,
        device: BluetoothAddress,
    ) -> Result<Vec<HfAction, MAX_ACTIONS>, HfError> {
        self.simple_command(device, AtType::Set, "+CHLD", "0")
    }

    /// Release all active calls, accepting a waiting one (`AT+CHLD=1`)
    pub fn release_active_calls(
        &mut self,
        device: BluetoothAddress,
    ) -> Result<Vec<HfAction, MAX_ACTIONS>, HfError> {
        self.simple_command(device, AtType::Set, "+CHLD", "1")
    }

    /// Put active calls on hold, accepting a waiting one (`AT+CHLD=2`)
    pub fn hold_active_calls(
        &mut self,
        device: BluetoothAddress,
    ) -> Result<Vec<HfAction, MAX_ACTIONS>, HfError> {
        self.simple_command(device, AtType::Set, "+CHLD", "2")
    }

    /// Merge held and active calls (`AT+CHLD=3`)
    pub fn merge_calls(
        &mut self,
        device: BluetoothAddress,
    ) -> Result<Vec<HfAction, MAX_ACTIONS>, HfError> {
        self.simple_command(device, AtType::Set, "+CHLD", "3")
    }

    /// Set the speaker gain (`AT+VGS=<0..15>`)
    pub fn set_volume(
        &mut self,
        device: BluetoothAddress,
        gain: u8,
    ) -> Result<Vec<HfAction, MAX_ACTIONS>, HfError> {
        if gain > SPEAKER_GAIN_MAX {
            return Err(HfError::InvalidValue);
        }
        let (_, record) = self
            .registry
            .find_device_mut(device)
            .ok_or(HfError::NotConnected)?;
        record.volume = gain;

        let mut gain_text: String<MAX_NUMBER_LEN> = String::new();
        core::fmt::Write::write_fmt(&mut gain_text, format_args!("{gain}")).ok();

        let mut actions = Vec::new();
        Self::push_send_at(&mut actions, device, AtType::Set, "+VGS", &gain_text);
        self.correlator.push(device, CommandKind::Vgs);
        Ok(actions)
    }

    /// Toggle voice recognition (`AT+BVRA`), only when the state changes
    pub fn set_voice_recognition(
        &mut self,
        device: BluetoothAddress,
        enable: bool,
    ) -> Result<Vec<HfAction, MAX_ACTIONS>, HfError> {
        let (_, record) = self
            .registry
            .find_device_mut(device)
            .ok_or(HfError::NotConnected)?;
        if record.voice_recognition == enable {
            return Ok(Vec::new());
        }
        record.voice_recognition = enable;

        let mut actions = Vec::new();
        Self::push_send_at(
            &mut actions,
            device,
            AtType::Set,
            "+BVRA",
            if enable { "1" } else { "0" },
        );
        self.correlator.push(device, CommandKind::Bvra);
        Ok(actions)
    }

    fn simple_command(
        &mut self,
        device: BluetoothAddress,
        at_type: AtType,
        command: &str,
        arguments: &str,
    ) -> Result<Vec<HfAction, MAX_ACTIONS>, HfError> {
        self.registry
            .find_device_mut(device)
            .ok_or(HfError::NotConnected)?;

        let mut actions = Vec::new();
        Self::push_send_at(&mut actions, device, at_type, command, arguments);
        self.correlator.push(device, CommandKind::Generic);
        Ok(actions)
    }

    fn push_send_at(
        actions: &mut Vec<HfAction, MAX_ACTIONS>,
        address: BluetoothAddress,
        at_type: AtType,
        command: &str,
        arguments: &str,
    ) {
        let mut cmd: String<MAX_RESULT_LEN> = String::new();
        cmd.push_str(command).ok();
        let mut args: String<MAX_NUMBER_LEN> = String::new();
        args.push_str(arguments).ok();
        actions
            .push(HfAction::SendAt { address, at_type, command: cmd, arguments: args })
            .ok();
    }

    #[cfg(test)]
    fn record(
        &self,
        adapter: BluetoothAddress,
        device: BluetoothAddress,
    ) -> &super::device::DeviceRecord {
        self.registry.get(adapter, device).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADAPTER: BluetoothAddress = BluetoothAddress::new([0xA0, 0, 0, 0, 0, 1]);
    const PHONE: BluetoothAddress = BluetoothAddress::new([0xD0, 0, 0, 0, 0, 1]);
    const OTHER_PHONE: BluetoothAddress = BluetoothAddress::new([0xD0, 0, 0, 0, 0, 2]);

    const NAME_LIST: &str = "+CIND: (\"SERVICE\",(0,1)),(\"CALL\",(0,1)),(\"CALLSETUP\",(0,3)),(\"CALLHELD\",(0,2)),(\"SIGNAL\",(0,5)),(\"ROAM\",(0,1)),(\"BATTCHG\",(0,5))";

    fn connected_engine() -> HfEngine {
        let mut engine = HfEngine::new();
        let _ = engine.handle_result_code(ADAPTER, PHONE, NAME_LIST);
        engine.device_connected(ADAPTER, PHONE).unwrap();
        engine
    }

    fn sent_commands(actions: &[HfAction]) -> heapless::Vec<&str, 8> {
        actions
            .iter()
            .filter_map(|a| match a {
                HfAction::SendAt { command, .. } => Some(command.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_name_list_staged_then_consumed_on_connect() {
        let mut engine = HfEngine::new();
        let _ = engine.handle_result_code(ADAPTER, PHONE, NAME_LIST);
        engine.device_connected(ADAPTER, PHONE).unwrap();
        assert!(engine.record(ADAPTER, PHONE).indicators_resolved());
    }

    #[test]
    fn test_cind_values_update_scalars() {
        let mut engine = connected_engine();
        let _ = engine.handle_result_code(ADAPTER, PHONE, "+CIND: 1,0,0,0,4,0,3");
        let record = engine.record(ADAPTER, PHONE);
        assert_eq!(record.indicators.service, 1);
        assert_eq!(record.indicators.signal, 4);
        assert_eq!(record.indicators.battery, 3);
        assert!(record.registered());
    }

    #[test]
    fn test_ciev_before_negotiation_is_rejected() {
        let mut engine = HfEngine::new();
        engine.device_connected(ADAPTER, PHONE).unwrap();
        let actions = engine.handle_result_code(ADAPTER, PHONE, "+CIEV: 2,1");
        // dropped line: no call-list refresh, no notification
        assert!(actions.is_empty());
        assert_eq!(engine.record(ADAPTER, PHONE).indicators.call, 0);
    }

    #[test]
    fn test_ciev_updates_and_requests_call_list() {
        let mut engine = connected_engine();
        let actions = engine.handle_result_code(ADAPTER, PHONE, "+CIEV: 2,1");
        let record = engine.record(ADAPTER, PHONE);
        assert_eq!(record.indicators.call, 1);
        assert!(!record.ring);
        assert_eq!(sent_commands(&actions).as_slice(), &["+CLCC"]);
        // the refresh is pending, so no notification until its OK
        assert!(!actions.contains(&HfAction::NotifyObservers));
    }

    #[test]
    fn test_ciev_call_dropped_purges_call_table() {
        let mut engine = connected_engine();
        let _ = engine.handle_result_code(ADAPTER, PHONE, "+CIEV: 2,1");
        let _ = engine.handle_result_code(ADAPTER, PHONE, "+CLCC: 1,0,0,0,0,\"5551234\",129");
        let _ = engine.handle_result_code(ADAPTER, PHONE, "OK");
        assert_eq!(engine.record(ADAPTER, PHONE).calls().count(), 1);

        let _ = engine.handle_result_code(ADAPTER, PHONE, "+CIEV: 2,0");
        assert_eq!(engine.record(ADAPTER, PHONE).calls().count(), 0);
    }

    #[test]
    fn test_ciev_callheld_tracks_held_disconnect_and_clears_waiting() {
        let mut engine = connected_engine();
        let _ = engine.handle_result_code(ADAPTER, PHONE, "+CCWA: \"5557777\",129");
        assert!(engine.record(ADAPTER, PHONE).waiting_call);

        let _ = engine.handle_result_code(ADAPTER, PHONE, "+CIEV: 4,0");
        let record = engine.record(ADAPTER, PHONE);
        assert!(record.held_call_disconnected);
        assert!(!record.waiting_call);
    }

    #[test]
    fn test_clcc_record_parsing() {
        let mut engine = connected_engine();
        let _ = engine.handle_result_code(ADAPTER, PHONE, "+CLCC: 1,0,0,0,0,\"+15551234567\",145");
        let record = engine.record(ADAPTER, PHONE);
        let (number, call) = record.calls().next().unwrap();
        assert_eq!(number.as_str(), "+15551234567");
        assert_eq!(call.direction, "outgoing");
        assert_eq!(call.status, "active");
        assert_eq!(call.number_type, 145);
    }

    #[test]
    fn test_clcc_completion_purges_stale_records_after_held_disconnect() {
        let mut engine = connected_engine();
        // a held call existed, then disconnected
        let _ = engine.handle_result_code(ADAPTER, PHONE, "+CLCC: 1,0,1,0,0,\"5551111\",129");
        let _ = engine.handle_result_code(ADAPTER, PHONE, "+CIEV: 4,0");
        let _ = engine.handle_result_code(ADAPTER, PHONE, "+CLCC: 2,0,0,0,0,\"5552222\",129");
        let actions = engine.handle_result_code(ADAPTER, PHONE, "OK");

        let record = engine.record(ADAPTER, PHONE);
        assert_eq!(record.calls().count(), 1);
        assert_eq!(record.calls().next().unwrap().0.as_str(), "5552222");
        assert!(!record.held_call_disconnected);
        assert!(actions.contains(&HfAction::NotifyObservers));
    }

    #[test]
    fn test_brsf_stores_features_and_disables_nrec() {
        let mut engine = connected_engine();
        // bit 1 set: peer supports echo cancellation / noise reduction
        let actions = engine.handle_result_code(ADAPTER, PHONE, "+BRSF: 871");
        assert!(engine.record(ADAPTER, PHONE).features.nrec);
        assert!(engine.record(ADAPTER, PHONE).features.three_way_calling);
        assert_eq!(sent_commands(&actions).as_slice(), &["+NREC"]);
    }

    #[test]
    fn test_brsf_pending_entry_popped_by_its_own_line() {
        let mut engine = connected_engine();
        engine.correlator.push(PHONE, CommandKind::Brsf);
        let actions = engine.handle_result_code(ADAPTER, PHONE, "+BRSF: 0");
        assert_eq!(engine.correlator.front(PHONE), None);
        assert!(!actions.contains(&HfAction::NotifyObservers));
    }

    #[test]
    fn test_vgs_event_stores_and_forwards_to_sink() {
        let mut engine = connected_engine();
        let actions = engine.handle_result_code(ADAPTER, PHONE, "+VGS: 15");
        assert_eq!(engine.record(ADAPTER, PHONE).volume, 15);
        assert!(actions.contains(&HfAction::SetSinkVolume { address: PHONE, percent: 100 }));
    }

    #[test]
    fn test_bvra_event_updates_flag() {
        let mut engine = connected_engine();
        let _ = engine.handle_result_code(ADAPTER, PHONE, "+BVRA: 1");
        assert!(engine.record(ADAPTER, PHONE).voice_recognition);
        let _ = engine.handle_result_code(ADAPTER, PHONE, "+BVRA: 0");
        assert!(!engine.record(ADAPTER, PHONE).voice_recognition);
    }

    #[test]
    fn test_ring_sets_flag() {
        let mut engine = connected_engine();
        let _ = engine.handle_result_code(ADAPTER, PHONE, "RING");
        assert!(engine.record(ADAPTER, PHONE).ring);
    }

    #[test]
    fn test_ok_resolves_generic_pending_command() {
        let mut engine = connected_engine();
        let _ = engine.answer_call(PHONE).unwrap();
        let actions = engine.handle_result_code(ADAPTER, PHONE, "OK");
        assert!(actions.contains(&HfAction::RespondClient { address: PHONE, success: true }));
    }

    #[test]
    fn test_error_and_cmee_fail_pending_command() {
        let mut engine = connected_engine();
        let _ = engine.terminate_call(PHONE).unwrap();
        let actions = engine.handle_result_code(ADAPTER, PHONE, "ERROR");
        assert!(actions.contains(&HfAction::RespondClient { address: PHONE, success: false }));

        let _ = engine.dial(PHONE, "5551234").unwrap();
        let actions = engine.handle_result_code(ADAPTER, PHONE, "+CMEE: 30");
        assert!(actions.contains(&HfAction::RespondClient { address: PHONE, success: false }));
    }

    #[test]
    fn test_cmee_report_leaves_pending_queue_intact() {
        let mut engine = connected_engine();
        let _ = engine.set_volume(PHONE, 9).unwrap();
        let _ = engine.answer_call(PHONE).unwrap();

        let actions = engine.handle_result_code(ADAPTER, PHONE, "+CMEE: 30");
        assert!(actions.contains(&HfAction::RespondClient { address: PHONE, success: false }));
        assert_eq!(engine.correlator.front(PHONE), Some(CommandKind::Vgs));

        // the volume command still resolves as a volume command
        let actions = engine.handle_result_code(ADAPTER, PHONE, "OK");
        assert!(actions.contains(&HfAction::SetSinkVolume { address: PHONE, percent: 60 }));
    }

    #[test]
    fn test_vgs_completion_forwards_volume() {
        let mut engine = connected_engine();
        let actions = engine.set_volume(PHONE, 9).unwrap();
        assert!(matches!(
            actions.first(),
            Some(HfAction::SendAt { command, arguments, .. })
                if command.as_str() == "+VGS" && arguments.as_str() == "9"
        ));

        let actions = engine.handle_result_code(ADAPTER, PHONE, "OK");
        assert!(actions.contains(&HfAction::SetSinkVolume { address: PHONE, percent: 60 }));
    }

    #[test]
    fn test_set_volume_validates_range() {
        let mut engine = connected_engine();
        assert_eq!(engine.set_volume(PHONE, 16), Err(HfError::InvalidValue));
    }

    #[test]
    fn test_voice_recognition_toggle_only_on_change() {
        let mut engine = connected_engine();
        let actions = engine.set_voice_recognition(PHONE, true).unwrap();
        assert_eq!(sent_commands(&actions).as_slice(), &["+BVRA"]);

        // no change, no command
        let actions = engine.set_voice_recognition(PHONE, true).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_call_control_commands() {
        let mut engine = connected_engine();
        let actions = engine.dial(PHONE, "5551234").unwrap();
        assert!(matches!(
            actions.first(),
            Some(HfAction::SendAt { at_type: AtType::Basic, command, arguments, .. })
                if command.as_str() == "D" && arguments.as_str() == "5551234"
        ));

        let actions = engine.hold_active_calls(PHONE).unwrap();
        assert!(matches!(
            actions.first(),
            Some(HfAction::SendAt { at_type: AtType::Set, command, arguments, .. })
                if command.as_str() == "+CHLD" && arguments.as_str() == "2"
        ));

        assert_eq!(engine.dial(PHONE, ""), Err(HfError::InvalidValue));
    }

    #[test]
    fn test_operations_on_unknown_device_fail() {
        let mut engine = connected_engine();
        assert_eq!(engine.answer_call(OTHER_PHONE), Err(HfError::NotConnected));
        assert_eq!(engine.set_volume(OTHER_PHONE, 5), Err(HfError::NotConnected));
    }

    #[test]
    fn test_disconnect_discards_pending_commands() {
        let mut engine = connected_engine();
        engine.device_connected(ADAPTER, OTHER_PHONE).unwrap();
        let _ = engine.answer_call(PHONE).unwrap();
        let _ = engine.set_volume(OTHER_PHONE, 5).unwrap();

        engine.device_disconnected(ADAPTER, PHONE).unwrap();
        assert_eq!(engine.correlator.front(PHONE), None);
        assert_eq!(engine.correlator.front(OTHER_PHONE), Some(CommandKind::Vgs));
        assert!(engine.registry.get(ADAPTER, OTHER_PHONE).is_some());
    }

    #[test]
    fn test_sco_update_reports_change() {
        let mut engine = connected_engine();
        assert_eq!(engine.update_sco(ADAPTER, PHONE, true), Ok(true));
        assert_eq!(engine.update_sco(ADAPTER, PHONE, true), Ok(false));
        assert_eq!(engine.update_sco(ADAPTER, PHONE, false), Ok(true));
    }
}
