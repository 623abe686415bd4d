//! Observer snapshots
//!
//! Flat value types handed to status observers. Built on demand from the
//! HF registry; a device with no calls still yields one entry.

use crate::{
    BluetoothAddress,
    constants::{MAX_ADAPTERS, MAX_CALL_RECORDS, MAX_DEVICES, MAX_NUMBER_LEN},
    hf::CallRegistry,
};
use heapless::{String, Vec};

/// One call as observers see it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSnapshot {
    /// Remote party number
    pub number: String<MAX_NUMBER_LEN>,
    /// Symbolic status name
    pub status: &'static str,
    /// Symbolic direction name
    pub direction: &'static str,
    /// Call index on the peer
    pub index: u8,
}

/// Full observable state of one connected device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    /// Device address
    pub address: BluetoothAddress,
    /// Owning adapter address
    pub adapter: BluetoothAddress,
    /// Signal strength, 0..5
    pub signal: u8,
    /// Battery charge, 0..5
    pub battery: u8,
    /// Voice audio path up
    pub sco_connected: bool,
    /// Speaker gain, 0..15
    pub volume: u8,
    /// Ring indication outstanding
    pub ring: bool,
    /// Network operator name
    pub operator_name: String<MAX_NUMBER_LEN>,
    /// Registered with the network
    pub registered: bool,
    /// Known calls
    pub calls: Vec<CallSnapshot, MAX_CALL_RECORDS>,
}

/// Snapshot every registered device
#[must_use]
pub fn device_snapshots(
    registry: &CallRegistry,
) -> Vec<DeviceSnapshot, { MAX_ADAPTERS * MAX_DEVICES }> {
    let mut snapshots = Vec::new();
    for (adapter, address, record) in registry.devices() {
        let mut calls = Vec::new();
        for (number, call) in record.calls() {
            calls
                .push(CallSnapshot {
                    number: number.clone(),
                    status: call.status,
                    direction: call.direction,
                    index: call.index,
                })
                .ok();
        }
        snapshots
            .push(DeviceSnapshot {
                address,
                adapter,
                signal: record.indicators.signal,
                battery: record.indicators.battery,
                sco_connected: record.sco_connected,
                volume: record.volume,
                ring: record.ring,
                operator_name: record.operator_name.clone(),
                registered: record.registered(),
                calls,
            })
            .ok();
    }
    snapshots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hf::HfEngine;

    const ADAPTER: BluetoothAddress = BluetoothAddress::new([0xA0, 0, 0, 0, 0, 1]);
    const PHONE: BluetoothAddress = BluetoothAddress::new([0xD0, 0, 0, 0, 0, 1]);

    #[test]
    fn test_device_without_calls_still_snapshots() {
        let mut engine = HfEngine::new();
        engine.device_connected(ADAPTER, PHONE).unwrap();

        let snapshots = device_snapshots(engine.registry());
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].address, PHONE);
        assert_eq!(snapshots[0].adapter, ADAPTER);
        assert!(snapshots[0].calls.is_empty());
        assert_eq!(snapshots[0].volume, crate::constants::DEFAULT_SPEAKER_GAIN);
    }

    #[test]
    fn test_snapshot_carries_call_records() {
        let mut engine = HfEngine::new();
        engine.device_connected(ADAPTER, PHONE).unwrap();
        let _ = engine.handle_result_code(ADAPTER, PHONE, "+CLCC: 1,1,4,0,0,\"5559999\",129");

        let snapshots = device_snapshots(engine.registry());
        assert_eq!(snapshots[0].calls.len(), 1);
        let call = &snapshots[0].calls[0];
        assert_eq!(call.number.as_str(), "5559999");
        assert_eq!(call.status, "incoming");
        assert_eq!(call.direction, "incoming");
        assert_eq!(call.index, 1);
    }
}
