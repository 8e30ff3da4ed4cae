//! Type-length-value extension fields.
//!
//! TLVs trail the fixed body of announce, signaling, and management
//! messages: 2-byte type, 2-byte length, `length` value bytes, all
//! big-endian. Unknown types are skipped by length, never rejected.
//! The region is validated once at decode and then borrowed, so
//! iteration allocates nothing.

use byteorder::{BigEndian, ByteOrder};

use super::message::DecodeError;

/// Well-known TLV type identifiers.
pub mod tlv_type {
    /// Management TLV.
    pub const MANAGEMENT: u16 = 0x0001;
    /// Management error status TLV.
    pub const MANAGEMENT_ERROR_STATUS: u16 = 0x0002;
    /// Organization-specific extension.
    pub const ORGANIZATION_EXTENSION: u16 = 0x0003;
    /// Path trace TLV (list of clock identities the announce crossed).
    pub const PATH_TRACE: u16 = 0x0008;
}

/// A single decoded TLV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    /// TLV type identifier.
    pub tlv_type: u16,
    /// Value bytes (length taken from the wire length field).
    pub value: &'a [u8],
}

impl Tlv<'_> {
    /// Header size: 2-byte type + 2-byte length.
    pub const HEADER_SIZE: usize = 4;

    /// Total wire size of this TLV including its header.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        Self::HEADER_SIZE + self.value.len()
    }
}

/// A validated, borrowed TLV region.
///
/// Construction walks the region once and rejects any TLV whose
/// declared length runs past the end of the buffer; afterwards
/// iteration is infallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TlvList<'a> {
    bytes: &'a [u8],
}

impl<'a> TlvList<'a> {
    /// An empty TLV region.
    pub const EMPTY: TlvList<'static> = TlvList { bytes: &[] };

    /// Validate and wrap a TLV region.
    ///
    /// # Errors
    /// `DecodeError::TlvOverrun` if a TLV header is truncated or a
    /// declared value length exceeds the remaining buffer.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        let mut rest = bytes;
        while !rest.is_empty() {
            if rest.len() < Tlv::HEADER_SIZE {
                return Err(DecodeError::TlvOverrun {
                    declared: Tlv::HEADER_SIZE,
                    remaining: rest.len(),
                });
            }
            let length = usize::from(BigEndian::read_u16(&rest[2..4]));
            if length > rest.len() - Tlv::HEADER_SIZE {
                return Err(DecodeError::TlvOverrun {
                    declared: length,
                    remaining: rest.len() - Tlv::HEADER_SIZE,
                });
            }
            rest = &rest[Tlv::HEADER_SIZE + length..];
        }
        Ok(Self { bytes })
    }

    /// The raw validated bytes of the region.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Total size of the region in bytes.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the region contains no TLVs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Iterate the TLVs in wire order.
    #[must_use]
    pub fn iter(&self) -> TlvIter<'a> {
        TlvIter { rest: self.bytes }
    }

    /// Find the first TLV of a given type, skipping others by length.
    #[must_use]
    pub fn find(&self, tlv_type: u16) -> Option<Tlv<'a>> {
        self.iter().find(|t| t.tlv_type == tlv_type)
    }
}

impl<'a> IntoIterator for &TlvList<'a> {
    type Item = Tlv<'a>;
    type IntoIter = TlvIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a validated TLV region.
#[derive(Debug, Clone)]
pub struct TlvIter<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for TlvIter<'a> {
    type Item = Tlv<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        // The region was validated at construction, so the header and
        // declared length are in bounds.
        let tlv_type = BigEndian::read_u16(&self.rest[0..2]);
        let length = usize::from(BigEndian::read_u16(&self.rest[2..4]));
        let value = &self.rest[Tlv::HEADER_SIZE..Tlv::HEADER_SIZE + length];
        self.rest = &self.rest[Tlv::HEADER_SIZE + length..];
        Some(Tlv { tlv_type, value })
    }
}
