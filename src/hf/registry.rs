//! Device registry
//!
//! Two-level map from local adapter to connected device to
//! [`DeviceRecord`], plus the staging slot for a connection whose indicator
//! negotiation completes before the transport confirms the peer identity.

use super::{HfError, device::DeviceRecord, device::IndicatorMap};
use crate::{
    BluetoothAddress,
    constants::{MAX_ADAPTERS, MAX_DEVICES},
};
use heapless::FnvIndexMap;

type DeviceMap = FnvIndexMap<BluetoothAddress, DeviceRecord, MAX_DEVICES>;

/// Per-adapter registry of connected audio gateways
#[derive(Debug, Default)]
pub struct CallRegistry {
    adapters: FnvIndexMap<BluetoothAddress, DeviceMap, MAX_ADAPTERS>,
    pending: Option<IndicatorMap>,
}

impl CallRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an indicator layout for the connection currently being set up
    ///
    /// A later layout for the same connection attempt replaces the staged
    /// one; it is consumed exactly once by [`Self::create_device`].
    pub fn stage_indicator_map(&mut self, map: IndicatorMap) {
        self.pending = Some(map);
    }

    /// Whether a connection setup is in flight
    #[must_use]
    pub fn is_connecting(&self) -> bool {
        self.pending.is_some()
    }

    /// Create the record for a newly connected device
    ///
    /// Consumes the staged indicator layout if one exists. Reconnecting an
    /// already known device resets its record.
    pub fn create_device(
        &mut self,
        adapter: BluetoothAddress,
        device: BluetoothAddress,
    ) -> Result<(), HfError> {
        if !self.adapters.contains_key(&adapter)
            && self.adapters.insert(adapter, DeviceMap::new()).is_err()
        {
            defmt::error!("[HF] adapter table full, cannot register {}", adapter);
            return Err(HfError::AdapterNotFound);
        }

        let mut record = DeviceRecord::new();
        if let Some(map) = self.pending.take() {
            record.resolve_indicators(map);
        }

        let devices = self.adapters.get_mut(&adapter).ok_or(HfError::AdapterNotFound)?;
        if devices.insert(device, record).is_err() {
            defmt::error!("[HF] device table full, cannot register {}", device);
            return Err(HfError::NotConnected);
        }
        defmt::debug!("[HF] device registered: {} via {}", device, adapter);
        Ok(())
    }

    /// Destroy a device record on disconnect
    pub fn remove_device(
        &mut self,
        adapter: BluetoothAddress,
        device: BluetoothAddress,
    ) -> Result<(), HfError> {
        let devices = self
            .adapters
            .get_mut(&adapter)
            .ok_or(HfError::AdapterNotFound)?;
        devices.remove(&device).ok_or(HfError::NotConnected)?;
        defmt::debug!("[HF] device removed: {}", device);
        Ok(())
    }

    /// Purge every device under an adapter
    pub fn remove_adapter(&mut self, adapter: BluetoothAddress) -> Result<(), HfError> {
        self.adapters
            .remove(&adapter)
            .ok_or(HfError::AdapterNotFound)?;
        defmt::debug!("[HF] adapter removed: {}", adapter);
        Ok(())
    }

    /// Look up a device under a specific adapter
    #[must_use]
    pub fn get(&self, adapter: BluetoothAddress, device: BluetoothAddress) -> Option<&DeviceRecord> {
        self.adapters.get(&adapter)?.get(&device)
    }

    /// Mutable lookup under a specific adapter
    pub fn get_mut(
        &mut self,
        adapter: BluetoothAddress,
        device: BluetoothAddress,
    ) -> Option<&mut DeviceRecord> {
        self.adapters.get_mut(&adapter)?.get_mut(&device)
    }

    /// Search every adapter for a device address
    pub fn find_device_mut(
        &mut self,
        device: BluetoothAddress,
    ) -> Option<(BluetoothAddress, &mut DeviceRecord)> {
        for (adapter, devices) in self.adapters.iter_mut() {
            if let Some(record) = devices.get_mut(&device) {
                return Some((*adapter, record));
            }
        }
        None
    }

    /// Iterate every registered device with its owning adapter
    pub fn devices(
        &self,
    ) -> impl Iterator<Item = (BluetoothAddress, BluetoothAddress, &DeviceRecord)> {
        self.adapters.iter().flat_map(|(adapter, devices)| {
            devices
                .iter()
                .map(move |(device, record)| (*adapter, *device, record))
        })
    }
}
