//! Wire format codec.
//!
//! Implements the binary message format: a fixed 34-byte common header
//! followed by a per-type body, optionally extended with TLVs. All
//! multi-byte fields are big-endian. Decode is a single linear pass
//! over untrusted bytes with no heap allocation and no backtracking;
//! TLV regions are borrowed from the input buffer and iterated lazily.

pub mod message;
pub mod tlv;


pub use message::{
    AnnounceBody, Body, DecodeError, EncodeError, FlagField, Header, Message, MessageType,
};
pub use tlv::{Tlv, TlvList, tlv_type};
