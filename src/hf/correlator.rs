//! Pending-command correlator
//!
//! AT commands are acknowledged by bare `OK`/`ERROR` lines carrying no
//! echo of what they acknowledge, so each issued command pushes its kind
//! onto a strict per-device FIFO and the acknowledgement pops it.

use crate::{
    BluetoothAddress,
    constants::{MAX_DEVICES, MAX_PENDING_COMMANDS},
};
use heapless::{Deque, FnvIndexMap};

/// Kind of an issued command awaiting acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum CommandKind {
    /// `AT+CLCC` call-list refresh
    Clcc,
    /// `AT+VGS` speaker gain
    Vgs,
    /// `AT+BRSF` feature exchange
    Brsf,
    /// `AT+BVRA` voice recognition
    Bvra,
    /// Any other command, resolved by plain success/failure
    Generic,
}

/// Per-device FIFO of in-flight command kinds
#[derive(Debug, Default)]
pub struct Correlator {
    queues: FnvIndexMap<BluetoothAddress, Deque<CommandKind, MAX_PENDING_COMMANDS>, MAX_DEVICES>,
}

impl Correlator {
    /// Empty correlator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a command issued to a device
    pub fn push(&mut self, device: BluetoothAddress, kind: CommandKind) {
        if !self.queues.contains_key(&device)
            && self.queues.insert(device, Deque::new()).is_err()
        {
            defmt::warn!("[HF] correlator table full for {}", device);
            return;
        }
        if let Some(queue) = self.queues.get_mut(&device)
            && queue.push_back(kind).is_err()
        {
            defmt::warn!("[HF] pending queue full for {}", device);
        }
    }

    /// Kind at the front of a device's queue, if any
    #[must_use]
    pub fn front(&self, device: BluetoothAddress) -> Option<CommandKind> {
        self.queues.get(&device)?.front().copied()
    }

    /// Pop the front entry. An empty queue yields `None` and is a no-op.
    pub fn pop(&mut self, device: BluetoothAddress) -> Option<CommandKind> {
        self.queues.get_mut(&device)?.pop_front()
    }

    /// Discard every in-flight entry for a device, on disconnect
    pub fn discard(&mut self, device: BluetoothAddress) {
        self.queues.remove(&device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHONE_1: BluetoothAddress = BluetoothAddress::new([0xD0, 0, 0, 0, 0, 1]);
    const PHONE_2: BluetoothAddress = BluetoothAddress::new([0xD0, 0, 0, 0, 0, 2]);

    #[test]
    fn test_fifo_order() {
        let mut correlator = Correlator::new();
        correlator.push(PHONE_1, CommandKind::Brsf);
        correlator.push(PHONE_1, CommandKind::Clcc);
        correlator.push(PHONE_1, CommandKind::Generic);

        assert_eq!(correlator.front(PHONE_1), Some(CommandKind::Brsf));
        assert_eq!(correlator.pop(PHONE_1), Some(CommandKind::Brsf));
        assert_eq!(correlator.pop(PHONE_1), Some(CommandKind::Clcc));
        assert_eq!(correlator.pop(PHONE_1), Some(CommandKind::Generic));
        assert_eq!(correlator.pop(PHONE_1), None);
    }

    #[test]
    fn test_queues_are_isolated_per_device() {
        let mut correlator = Correlator::new();
        correlator.push(PHONE_1, CommandKind::Clcc);
        correlator.push(PHONE_2, CommandKind::Vgs);

        assert_eq!(correlator.pop(PHONE_2), Some(CommandKind::Vgs));
        assert_eq!(correlator.front(PHONE_1), Some(CommandKind::Clcc));
        assert_eq!(correlator.pop(PHONE_2), None);
    }

    #[test]
    fn test_discard_drops_only_that_device() {
        let mut correlator = Correlator::new();
        correlator.push(PHONE_1, CommandKind::Clcc);
        correlator.push(PHONE_1, CommandKind::Vgs);
        correlator.push(PHONE_2, CommandKind::Generic);

        correlator.discard(PHONE_1);
        assert_eq!(correlator.pop(PHONE_1), None);
        assert_eq!(correlator.pop(PHONE_2), Some(CommandKind::Generic));
    }

    #[test]
    fn test_empty_pop_is_noop() {
        let mut correlator = Correlator::new();
        assert_eq!(correlator.pop(PHONE_1), None);
        assert_eq!(correlator.front(PHONE_1), None);
    }
}
