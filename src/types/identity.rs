//! Clock and port identities.

use serde::{Deserialize, Serialize};

/// 8-byte globally unique clock identifier.
///
/// Opaque and immutable once assigned. Typically derived from a MAC
/// address via the EUI-64 mapping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ClockIdentity(pub [u8; 8]);

impl ClockIdentity {
    /// Wire size in bytes.
    pub const WIRE_SIZE: usize = 8;

    /// All-zero identity, used as the "not yet assigned" sentinel.
    pub const UNASSIGNED: Self = Self([0u8; 8]);

    /// Derive an identity from an EUI-48 (MAC) address.
    ///
    /// Inserts `FF:FE` between the OUI and the device portion, the
    /// standard EUI-48 to EUI-64 mapping.
    #[must_use]
    pub fn from_eui48(mac: [u8; 6]) -> Self {
        Self([
            mac[0], mac[1], mac[2], 0xFF, 0xFE, mac[3], mac[4], mac[5],
        ])
    }

    /// Whether this identity has been assigned (is non-zero).
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        *self != Self::UNASSIGNED
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl std::fmt::Display for ClockIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Port identity: 8-byte clock identity + 2-byte port number.
///
/// Keys the foreign-source table and identifies the sender of every
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PortIdentity {
    /// Identity of the owning clock.
    pub clock_identity: ClockIdentity,
    /// Port number (1-based).
    pub port_number: u16,
}

impl PortIdentity {
    /// Wire size in bytes.
    pub const WIRE_SIZE: usize = 10;

    /// Create a new port identity.
    #[must_use]
    pub fn new(clock_identity: ClockIdentity, port_number: u16) -> Self {
        Self {
            clock_identity,
            port_number,
        }
    }

    /// Encode as 10 bytes (8-byte clock identity + 2-byte port number, BE).
    #[must_use]
    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        buf[0..8].copy_from_slice(&self.clock_identity.0);
        buf[8..10].copy_from_slice(&self.port_number.to_be_bytes());
        buf
    }

    /// Decode from 10 bytes.
    #[must_use]
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < Self::WIRE_SIZE {
            return None;
        }
        let mut identity = [0u8; 8];
        identity.copy_from_slice(&data[0..8]);
        Some(Self {
            clock_identity: ClockIdentity(identity),
            port_number: u16::from_be_bytes([data[8], data[9]]),
        })
    }
}

impl std::fmt::Display for PortIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.clock_identity, self.port_number)
    }
}

/// Quality of a clock as advertised in announcements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClockQuality {
    /// Traceability class of the clock (lower is better).
    pub clock_class: u8,
    /// Accuracy enumeration (lower is better).
    pub clock_accuracy: u8,
    /// Scaled log variance of the clock's stability (lower is better).
    pub offset_scaled_log_variance: u16,
}

impl Default for ClockQuality {
    fn default() -> Self {
        // A free-running clock that has never been disciplined.
        Self {
            clock_class: 248,
            clock_accuracy: 0xFE,
            offset_scaled_log_variance: 0xFFFF,
        }
    }
}
