//! Crate-wide Constants
//!
//! Limits, wire-level indicator positions, and volume-scaling parameters used
//! by both HFP roles. The indicator positions follow the fixed HFP 1.1/1.5
//! ordering the AG role uses for `+CIEV` reporting; the *negotiated*
//! per-connection ordering lives in [`crate::hf::IndicatorMap`](crate::hf::device::IndicatorMap).

/// Maximum number of call slots tracked by the AG role (HFP three-way calling)
pub const MAX_CALL_SLOTS: usize = 3;

/// Maximum number of simultaneously connected peer devices per role
pub const MAX_DEVICES: usize = 4;

/// Maximum number of local adapters (multi-adapter HF setups)
pub const MAX_ADAPTERS: usize = 2;

/// Maximum number of call records tracked per HF-side device
pub const MAX_CALL_RECORDS: usize = 8;

/// Maximum depth of the per-device pending-command FIFO
pub const MAX_PENDING_COMMANDS: usize = 8;

/// Maximum number of actions a single inbound event may produce
pub const MAX_ACTIONS: usize = 8;

/// Depth of the static event, request and action channels
pub const MAX_CHANNELS: usize = 4;

/// Maximum length of an AT result-code line
pub const MAX_RESULT_LEN: usize = 64;

/// Maximum length of a phone number
pub const MAX_NUMBER_LEN: usize = 32;

/// Number of CIND indicators negotiated per connection
pub const MAX_INDICATORS: usize = 7;

/// `+CIEV` position of the call indicator (HFP 1.1)
pub const IND_CALL: u8 = 1;

/// `+CIEV` position of the callsetup indicator (HFP 1.1)
pub const IND_CALLSETUP: u8 = 2;

/// `+CIEV` position of the service indicator (HFP 1.1)
pub const IND_SERVICE: u8 = 3;

/// `+CIEV` position of the signal strength indicator (HFP 1.5)
pub const IND_SIGNAL: u8 = 4;

/// `+CIEV` position of the roaming indicator (HFP 1.5)
pub const IND_ROAM: u8 = 5;

/// `+CIEV` position of the battery charge indicator (HFP 1.5)
pub const IND_BATTCHG: u8 = 6;

/// `+CIEV` position of the callheld indicator (HFP 1.5)
pub const IND_CALLHELD: u8 = 7;

/// GSM number type for national numbers (TS 24.008)
pub const TYPE_NATIONAL: u8 = 129;

/// GSM number type for international numbers (leading `+`)
pub const TYPE_INTERNATIONAL: u8 = 145;

/// Upper bound of the HFP speaker gain range (`AT+VGS`)
pub const SPEAKER_GAIN_MAX: u8 = 15;

/// Speaker gain assigned to a device record at creation
pub const DEFAULT_SPEAKER_GAIN: u8 = 9;

/// Base volume of the legacy coarse-step audio sink scale
pub const LEGACY_VOLUME_BASE: u8 = 10;

/// Step size of the legacy coarse-step audio sink scale
pub const LEGACY_GAIN_STEP: u8 = 6;
