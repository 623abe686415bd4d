use crate::HfpError;
use core::fmt::Write;

/// A Bluetooth Device Address (`BD_ADDR`) wrapper for type safety
///
/// Both roles key their per-device state by this type. The transport layer
/// reports peers as colon-separated hex strings, so conversions to and from
/// that representation are the primary API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, defmt::Format)]
pub struct BluetoothAddress(pub [u8; 6]);

impl BluetoothAddress {
    /// Create a new Bluetooth address from bytes
    #[must_use]
    pub const fn new(addr: [u8; 6]) -> Self {
        Self(addr)
    }

    /// Get the raw address bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Format the address as a colon-separated hex string
    #[must_use]
    pub fn format_hex(&self) -> heapless::String<17> {
        let mut result = heapless::String::new();
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                result.push(':').ok();
            }
            write!(result, "{byte:02X}").ok();
        }
        result
    }

    /// Parse a Bluetooth address from a colon-separated hex string
    ///
    /// Accepts upper- and lower-case hex digits.
    ///
    /// # Errors
    /// Returns [`HfpError::InvalidAddress`] if the string is not exactly
    /// 17 characters of the form `XX:XX:XX:XX:XX:XX`.
    pub fn from_hex(hex: &str) -> Result<Self, HfpError> {
        if hex.len() != 17 {
            return Err(HfpError::InvalidAddress);
        }

        let mut bytes = [0u8; 6];
        for (i, part) in hex.split(':').enumerate() {
            if i >= 6 || part.len() != 2 {
                return Err(HfpError::InvalidAddress);
            }
            bytes[i] = u8::from_str_radix(part, 16).map_err(|_| HfpError::InvalidAddress)?;
        }
        Ok(Self(bytes))
    }
}

impl From<[u8; 6]> for BluetoothAddress {
    fn from(addr: [u8; 6]) -> Self {
        Self(addr)
    }
}

impl From<BluetoothAddress> for [u8; 6] {
    fn from(addr: BluetoothAddress) -> Self {
        addr.0
    }
}

impl From<BluetoothAddress> for heapless::String<17> {
    fn from(addr: BluetoothAddress) -> Self {
        addr.format_hex()
    }
}

impl TryFrom<&str> for BluetoothAddress {
    type Error = HfpError;

    fn try_from(hex: &str) -> Result<Self, Self::Error> {
        BluetoothAddress::from_hex(hex)
    }
}

impl TryFrom<&[u8]> for BluetoothAddress {
    type Error = HfpError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() == 6 {
            let mut addr = [0u8; 6];
            addr.copy_from_slice(bytes);
            Ok(BluetoothAddress(addr))
        } else {
            Err(HfpError::InvalidAddress)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_creation() {
        let addr = BluetoothAddress::new([0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
        assert_eq!(addr.as_bytes(), &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
    }

    #[test]
    fn test_address_format_hex() {
        let addr = BluetoothAddress::new([0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
        assert_eq!(addr.format_hex().as_str(), "12:34:56:78:9A:BC");

        let addr_zero = BluetoothAddress::new([0x00; 6]);
        assert_eq!(addr_zero.format_hex().as_str(), "00:00:00:00:00:00");
    }

    #[test]
    fn test_address_from_hex() {
        let addr = BluetoothAddress::from_hex("12:34:56:78:9A:BC").unwrap();
        assert_eq!(addr.as_bytes(), &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);

        // lower-case input from transports that do not normalize
        let addr_lower = BluetoothAddress::from_hex("12:34:56:78:9a:bc").unwrap();
        assert_eq!(addr_lower, addr);
    }

    #[test]
    fn test_address_from_hex_invalid() {
        assert!(BluetoothAddress::from_hex("12:34:56").is_err());
        assert!(BluetoothAddress::from_hex("12:34:56:78:9A:ZZ").is_err());
        assert!(BluetoothAddress::from_hex("123456789ABCDEF01").is_err());
    }

    #[test]
    fn test_address_conversions() {
        let bytes = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC];

        let addr: BluetoothAddress = bytes.into();
        assert_eq!(addr.as_bytes(), &bytes);

        let converted: [u8; 6] = addr.into();
        assert_eq!(converted, bytes);

        let addr_from_str: BluetoothAddress = "12:34:56:78:9A:BC".try_into().unwrap();
        assert_eq!(addr_from_str, addr);

        let hex_string: heapless::String<17> = addr.into();
        assert_eq!(hex_string.as_str(), "12:34:56:78:9A:BC");
    }

    #[test]
    fn test_address_try_from_slice() {
        let bytes = &[0x12u8, 0x34, 0x56, 0x78, 0x9A, 0xBC][..];
        let addr = BluetoothAddress::try_from(bytes).unwrap();
        assert_eq!(addr.as_bytes(), &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);

        assert!(BluetoothAddress::try_from(&[0x12u8, 0x34][..]).is_err());
    }
}
