//! Message types, parsing, and encoding.
//!
//! Every field of an inbound buffer is bounds- and range-checked
//! before downstream logic may trust it: header length against the
//! actual buffer, version, reserved-field zero checks, TLV lengths
//! against the remaining region. Encoding writes into a caller-owned
//! buffer and is byte-symmetric with decoding: `decode(encode(m))`
//! reproduces `m` bit-for-bit for every message type.

use byteorder::{BigEndian, ByteOrder};

use super::tlv::TlvList;
use crate::types::{ClockIdentity, ClockQuality, PortIdentity, TimeInterval, Timestamp};

/// Message type identifiers (lower nibble of byte 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Sync (master → slave), event message carrying T1.
    Sync = 0x0,
    /// Delay request (slave → master), event message sent at T3.
    DelayReq = 0x1,
    /// Follow-up (master → slave), carries the precise T1.
    FollowUp = 0x8,
    /// Delay response (master → slave), carries T4.
    DelayResp = 0x9,
    /// Announce (master → slave), clock properties for selection.
    Announce = 0xB,
    /// Signaling, TLV carrier between ports.
    Signaling = 0xC,
    /// Management, dataset access sub-protocol (decoded, not acted on).
    Management = 0xD,
}

impl MessageType {
    /// Parse from the lower 4 bits of a byte.
    pub fn from_nibble(value: u8) -> Result<Self, DecodeError> {
        match value & 0x0F {
            0x0 => Ok(Self::Sync),
            0x1 => Ok(Self::DelayReq),
            0x8 => Ok(Self::FollowUp),
            0x9 => Ok(Self::DelayResp),
            0xB => Ok(Self::Announce),
            0xC => Ok(Self::Signaling),
            0xD => Ok(Self::Management),
            _ => Err(DecodeError::InvalidHeader {
                reason: "unknown message type",
            }),
        }
    }

    /// Whether this is an event message (requires a hardware timestamp).
    #[must_use]
    pub fn is_event(&self) -> bool {
        matches!(self, Self::Sync | Self::DelayReq)
    }

    /// Whether this is a general message.
    #[must_use]
    pub fn is_general(&self) -> bool {
        !self.is_event()
    }

    /// Control field value carried for this type (historic, fixed).
    #[must_use]
    pub fn control_field(&self) -> u8 {
        match self {
            Self::Sync => 0x00,
            Self::DelayReq => 0x01,
            Self::FollowUp => 0x02,
            Self::DelayResp => 0x03,
            Self::Management => 0x04,
            Self::Announce | Self::Signaling => 0x05,
        }
    }

    /// Minimum total message length (header + fixed body).
    #[must_use]
    pub fn min_length(&self) -> usize {
        Header::SIZE
            + match self {
                Self::Sync | Self::DelayReq | Self::FollowUp => Timestamp::WIRE_SIZE,
                Self::DelayResp => Timestamp::WIRE_SIZE + PortIdentity::WIRE_SIZE,
                Self::Announce => AnnounceBody::SIZE,
                Self::Signaling => PortIdentity::WIRE_SIZE,
                Self::Management => PortIdentity::WIRE_SIZE + 4,
            }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync => write!(f, "Sync"),
            Self::DelayReq => write!(f, "Delay_Req"),
            Self::FollowUp => write!(f, "Follow_Up"),
            Self::DelayResp => write!(f, "Delay_Resp"),
            Self::Announce => write!(f, "Announce"),
            Self::Signaling => write!(f, "Signaling"),
            Self::Management => write!(f, "Management"),
        }
    }
}

/// Flag field bit assignments.
pub struct FlagField;

impl FlagField {
    /// Two-step clock: the precise origin timestamp follows in Follow_Up.
    pub const TWO_STEP: u16 = 0x0200;
    /// Last minute of the day has 61 seconds.
    pub const LEAP_61: u16 = 0x0001;
    /// Last minute of the day has 59 seconds.
    pub const LEAP_59: u16 = 0x0002;
    /// The announced UTC offset is valid.
    pub const UTC_OFFSET_VALID: u16 = 0x0004;
    /// Timescale is PTP (TAI), not arbitrary.
    pub const PTP_TIMESCALE: u16 = 0x0008;
    /// Time is traceable to a primary reference.
    pub const TIME_TRACEABLE: u16 = 0x0010;
    /// Frequency is traceable to a primary reference.
    pub const FREQUENCY_TRACEABLE: u16 = 0x0020;
}

/// Errors from message decoding. All are non-fatal: the caller
/// discards the buffer and continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Malformed header: unsupported version, nonzero reserved field,
    /// inconsistent length, or unknown message type.
    #[error("invalid header: {reason}")]
    InvalidHeader {
        /// What the header check tripped on.
        reason: &'static str,
    },
    /// Buffer shorter than the message requires.
    #[error("truncated message: need {needed} bytes, have {have}")]
    Truncated {
        /// Minimum bytes needed.
        needed: usize,
        /// Bytes actually available.
        have: usize,
    },
    /// A TLV declared a length past the end of the buffer.
    #[error("TLV overrun: declared {declared} bytes, {remaining} remain")]
    TlvOverrun {
        /// Declared value length.
        declared: usize,
        /// Bytes remaining in the region.
        remaining: usize,
    },
    /// A body field failed its range check.
    #[error("invalid field: {field}")]
    InvalidField {
        /// Which field failed.
        field: &'static str,
    },
}

/// Errors from message encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Destination buffer smaller than the encoded message.
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall {
        /// Bytes the encoded message needs.
        needed: usize,
        /// Bytes the caller provided.
        have: usize,
    },
    /// Message (with TLVs) exceeds the 16-bit length field.
    #[error("message too long: {length} bytes")]
    MessageTooLong {
        /// Computed total length.
        length: usize,
    },
}

/// Common message header (34 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Transport-specific nibble (upper 4 bits of byte 0).
    pub transport_specific: u8,
    /// Message type (lower 4 bits of byte 0).
    pub message_type: MessageType,
    /// Protocol version (must be 2).
    pub version: u8,
    /// Total message length including this header.
    pub message_length: u16,
    /// Domain number.
    pub domain_number: u8,
    /// Flag field (see [`FlagField`]).
    pub flags: u16,
    /// Correction field in 2⁻¹⁶ ns units.
    pub correction_field: TimeInterval,
    /// Identity of the sending port.
    pub source_port_identity: PortIdentity,
    /// Sequence id, per message type.
    pub sequence_id: u16,
    /// Control field (historic, fixed per type).
    pub control_field: u8,
    /// Log2 of the message interval in seconds.
    pub log_message_interval: i8,
}

impl Header {
    /// Header size in bytes.
    pub const SIZE: usize = 34;

    /// Supported protocol version.
    pub const VERSION: u8 = 2;

    /// Create a header with the conventional defaults for a type.
    ///
    /// `message_length` is set for a body without TLVs; the message
    /// constructors adjust it when TLVs are attached.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(message_type: MessageType, source: PortIdentity, sequence_id: u16) -> Self {
        Self {
            transport_specific: 0,
            message_type,
            version: Self::VERSION,
            message_length: message_type.min_length() as u16,
            domain_number: 0,
            flags: 0,
            correction_field: TimeInterval::ZERO,
            source_port_identity: source,
            sequence_id,
            control_field: message_type.control_field(),
            log_message_interval: 0x7F,
        }
    }

    /// Decode and validate a header.
    ///
    /// # Errors
    /// `Truncated` if fewer than 34 bytes are available,
    /// `InvalidHeader` on version, reserved-field, or length
    /// violations.
    #[allow(clippy::cast_possible_wrap)]
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::SIZE {
            return Err(DecodeError::Truncated {
                needed: Self::SIZE,
                have: data.len(),
            });
        }
        let message_type = MessageType::from_nibble(data[0])?;
        if data[1] & 0xF0 != 0 {
            return Err(DecodeError::InvalidHeader {
                reason: "nonzero reserved nibble",
            });
        }
        let version = data[1] & 0x0F;
        if version != Self::VERSION {
            return Err(DecodeError::InvalidHeader {
                reason: "unsupported version",
            });
        }
        if data[5] != 0 || data[16..20] != [0, 0, 0, 0] {
            return Err(DecodeError::InvalidHeader {
                reason: "nonzero reserved field",
            });
        }
        let message_length = BigEndian::read_u16(&data[2..4]);
        if usize::from(message_length) < message_type.min_length() {
            return Err(DecodeError::InvalidHeader {
                reason: "length below type minimum",
            });
        }
        let source_port_identity =
            PortIdentity::decode(&data[20..30]).ok_or(DecodeError::Truncated {
                needed: 30,
                have: data.len(),
            })?;
        Ok(Self {
            transport_specific: data[0] >> 4,
            message_type,
            version,
            message_length,
            domain_number: data[4],
            flags: BigEndian::read_u16(&data[6..8]),
            correction_field: TimeInterval::from_scaled(BigEndian::read_i64(&data[8..16])),
            source_port_identity,
            sequence_id: BigEndian::read_u16(&data[30..32]),
            control_field: data[32],
            log_message_interval: data[33] as i8,
        })
    }

    /// Encode into the first 34 bytes of `buf`.
    fn encode_into(&self, buf: &mut [u8]) {
        buf[0] = (self.transport_specific << 4) | (self.message_type as u8 & 0x0F);
        buf[1] = self.version & 0x0F;
        BigEndian::write_u16(&mut buf[2..4], self.message_length);
        buf[4] = self.domain_number;
        buf[5] = 0;
        BigEndian::write_u16(&mut buf[6..8], self.flags);
        BigEndian::write_i64(&mut buf[8..16], self.correction_field.scaled());
        buf[16..20].fill(0);
        buf[20..30].copy_from_slice(&self.source_port_identity.encode());
        BigEndian::write_u16(&mut buf[30..32], self.sequence_id);
        buf[32] = self.control_field;
        #[allow(clippy::cast_sign_loss)]
        {
            buf[33] = self.log_message_interval as u8;
        }
    }

    /// Whether the two-step flag is set.
    #[must_use]
    pub fn is_two_step(&self) -> bool {
        self.flags & FlagField::TWO_STEP != 0
    }
}

/// Fixed portion of an announce body (30 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnounceBody {
    /// Origin timestamp (approximate, often zero).
    pub origin_timestamp: Timestamp,
    /// Offset between TAI and UTC in seconds.
    pub current_utc_offset: i16,
    /// Grandmaster priority1.
    pub grandmaster_priority1: u8,
    /// Grandmaster clock quality.
    pub grandmaster_clock_quality: ClockQuality,
    /// Grandmaster priority2.
    pub grandmaster_priority2: u8,
    /// Grandmaster clock identity.
    pub grandmaster_identity: ClockIdentity,
    /// Hops between the grandmaster and the sender.
    pub steps_removed: u16,
    /// Source of time enumeration.
    pub time_source: u8,
}

impl AnnounceBody {
    /// Fixed body size in bytes.
    pub const SIZE: usize = 30;

    fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let origin_timestamp =
            Timestamp::decode(&data[0..10]).ok_or(DecodeError::InvalidField {
                field: "originTimestamp",
            })?;
        let mut identity = [0u8; 8];
        identity.copy_from_slice(&data[19..27]);
        Ok(Self {
            origin_timestamp,
            current_utc_offset: BigEndian::read_i16(&data[10..12]),
            grandmaster_priority1: data[13],
            grandmaster_clock_quality: ClockQuality {
                clock_class: data[14],
                clock_accuracy: data[15],
                offset_scaled_log_variance: BigEndian::read_u16(&data[16..18]),
            },
            grandmaster_priority2: data[18],
            grandmaster_identity: ClockIdentity(identity),
            steps_removed: BigEndian::read_u16(&data[27..29]),
            time_source: data[29],
        })
    }

    fn encode_into(&self, buf: &mut [u8]) {
        buf[0..10].copy_from_slice(&self.origin_timestamp.encode());
        BigEndian::write_i16(&mut buf[10..12], self.current_utc_offset);
        buf[12] = 0;
        buf[13] = self.grandmaster_priority1;
        buf[14] = self.grandmaster_clock_quality.clock_class;
        buf[15] = self.grandmaster_clock_quality.clock_accuracy;
        BigEndian::write_u16(
            &mut buf[16..18],
            self.grandmaster_clock_quality.offset_scaled_log_variance,
        );
        buf[18] = self.grandmaster_priority2;
        buf[19..27].copy_from_slice(self.grandmaster_identity.as_bytes());
        BigEndian::write_u16(&mut buf[27..29], self.steps_removed);
        buf[29] = self.time_source;
    }
}

/// Message body variants.
///
/// TLV-bearing bodies borrow their TLV region from the decode buffer;
/// nothing is copied until the caller chooses to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body<'a> {
    /// Sync: origin timestamp (approximate when two-step).
    Sync {
        /// Origin timestamp (T1, or approximate if two-step).
        origin_timestamp: Timestamp,
    },
    /// Delay request: origin timestamp (T3, usually zero on the wire).
    DelayReq {
        /// Origin timestamp.
        origin_timestamp: Timestamp,
    },
    /// Follow-up: precise origin timestamp of the preceding Sync.
    FollowUp {
        /// Precise origin timestamp (T1).
        precise_origin_timestamp: Timestamp,
    },
    /// Delay response: receive timestamp of the Delay_Req (T4).
    DelayResp {
        /// When the master received the Delay_Req.
        receive_timestamp: Timestamp,
        /// Port identity of the requester.
        requesting_port_identity: PortIdentity,
    },
    /// Announce: grandmaster properties plus optional TLVs.
    Announce {
        /// Fixed announce fields.
        body: AnnounceBody,
        /// Trailing TLVs (may be empty).
        tlvs: TlvList<'a>,
    },
    /// Signaling: a TLV carrier addressed to a port.
    Signaling {
        /// Addressed port (all-ones for wildcard).
        target_port_identity: PortIdentity,
        /// Carried TLVs.
        tlvs: TlvList<'a>,
    },
    /// Management: dataset access envelope. Decoded for completeness;
    /// the management semantics live outside the engine.
    Management {
        /// Addressed port (all-ones for wildcard).
        target_port_identity: PortIdentity,
        /// Initial boundary-hop budget.
        starting_boundary_hops: u8,
        /// Remaining boundary-hop budget.
        boundary_hops: u8,
        /// Management action (GET/SET/RESPONSE/...), lower 5 bits.
        action: u8,
        /// Carried management TLVs.
        tlvs: TlvList<'a>,
    },
}

impl Body<'_> {
    /// Size of the body as encoded, including TLVs.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        match self {
            Body::Sync { .. } | Body::DelayReq { .. } | Body::FollowUp { .. } => {
                Timestamp::WIRE_SIZE
            }
            Body::DelayResp { .. } => Timestamp::WIRE_SIZE + PortIdentity::WIRE_SIZE,
            Body::Announce { tlvs, .. } => AnnounceBody::SIZE + tlvs.wire_size(),
            Body::Signaling { tlvs, .. } => PortIdentity::WIRE_SIZE + tlvs.wire_size(),
            Body::Management { tlvs, .. } => PortIdentity::WIRE_SIZE + 4 + tlvs.wire_size(),
        }
    }
}

/// A complete message: validated header plus typed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    /// Message header.
    pub header: Header,
    /// Message body.
    pub body: Body<'a>,
}

impl<'a> Message<'a> {
    /// Parse a complete message from untrusted bytes.
    ///
    /// A buffer longer than the header's declared length is allowed
    /// (link-layer padding); the excess is ignored.
    ///
    /// # Errors
    /// See [`DecodeError`]; every failure leaves the caller free to
    /// drop the buffer and continue.
    pub fn decode(data: &'a [u8]) -> Result<Self, DecodeError> {
        let header = Header::decode(data)?;
        let declared = usize::from(header.message_length);
        if declared > data.len() {
            return Err(DecodeError::Truncated {
                needed: declared,
                have: data.len(),
            });
        }
        let body_data = &data[Header::SIZE..declared];

        let body = match header.message_type {
            MessageType::Sync => Body::Sync {
                origin_timestamp: decode_timestamp(body_data, "originTimestamp")?,
            },
            MessageType::DelayReq => Body::DelayReq {
                origin_timestamp: decode_timestamp(body_data, "originTimestamp")?,
            },
            MessageType::FollowUp => Body::FollowUp {
                precise_origin_timestamp: decode_timestamp(body_data, "preciseOriginTimestamp")?,
            },
            MessageType::DelayResp => Body::DelayResp {
                receive_timestamp: decode_timestamp(body_data, "receiveTimestamp")?,
                requesting_port_identity: PortIdentity::decode(&body_data[10..20]).ok_or(
                    DecodeError::InvalidField {
                        field: "requestingPortIdentity",
                    },
                )?,
            },
            MessageType::Announce => Body::Announce {
                body: AnnounceBody::decode(&body_data[..AnnounceBody::SIZE])?,
                tlvs: TlvList::parse(&body_data[AnnounceBody::SIZE..])?,
            },
            MessageType::Signaling => Body::Signaling {
                target_port_identity: PortIdentity::decode(&body_data[0..10]).ok_or(
                    DecodeError::InvalidField {
                        field: "targetPortIdentity",
                    },
                )?,
                tlvs: TlvList::parse(&body_data[PortIdentity::WIRE_SIZE..])?,
            },
            MessageType::Management => Body::Management {
                target_port_identity: PortIdentity::decode(&body_data[0..10]).ok_or(
                    DecodeError::InvalidField {
                        field: "targetPortIdentity",
                    },
                )?,
                starting_boundary_hops: body_data[10],
                boundary_hops: body_data[11],
                action: body_data[12] & 0x1F,
                tlvs: TlvList::parse(&body_data[14..])?,
            },
        };

        Ok(Self { header, body })
    }

    /// Encode into a caller-owned buffer, returning the written length.
    ///
    /// # Errors
    /// `EncodeError::BufferTooSmall` if `buf` cannot hold the message,
    /// `EncodeError::MessageTooLong` if the total exceeds the 16-bit
    /// length field.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, EncodeError> {
        let total = Header::SIZE + self.body.wire_size();
        if u16::try_from(total).is_err() {
            return Err(EncodeError::MessageTooLong { length: total });
        }
        if buf.len() < total {
            return Err(EncodeError::BufferTooSmall {
                needed: total,
                have: buf.len(),
            });
        }
        self.header.encode_into(&mut buf[..Header::SIZE]);
        // The length field is authoritative from the actual body size,
        // so helper-built messages stay consistent even if a TLV list
        // was attached after construction.
        #[allow(clippy::cast_possible_truncation)]
        BigEndian::write_u16(&mut buf[2..4], total as u16);
        let body = &mut buf[Header::SIZE..total];
        match &self.body {
            Body::Sync { origin_timestamp } | Body::DelayReq { origin_timestamp } => {
                body[0..10].copy_from_slice(&origin_timestamp.encode());
            }
            Body::FollowUp {
                precise_origin_timestamp,
            } => {
                body[0..10].copy_from_slice(&precise_origin_timestamp.encode());
            }
            Body::DelayResp {
                receive_timestamp,
                requesting_port_identity,
            } => {
                body[0..10].copy_from_slice(&receive_timestamp.encode());
                body[10..20].copy_from_slice(&requesting_port_identity.encode());
            }
            Body::Announce {
                body: announce,
                tlvs,
            } => {
                announce.encode_into(&mut body[..AnnounceBody::SIZE]);
                body[AnnounceBody::SIZE..].copy_from_slice(tlvs.as_bytes());
            }
            Body::Signaling {
                target_port_identity,
                tlvs,
            } => {
                body[0..10].copy_from_slice(&target_port_identity.encode());
                body[10..].copy_from_slice(tlvs.as_bytes());
            }
            Body::Management {
                target_port_identity,
                starting_boundary_hops,
                boundary_hops,
                action,
                tlvs,
            } => {
                body[0..10].copy_from_slice(&target_port_identity.encode());
                body[10] = *starting_boundary_hops;
                body[11] = *boundary_hops;
                body[12] = *action & 0x1F;
                body[13] = 0;
                body[14..].copy_from_slice(tlvs.as_bytes());
            }
        }
        Ok(total)
    }

    /// Create a Sync message.
    #[must_use]
    pub fn sync(source: PortIdentity, sequence_id: u16, timestamp: Timestamp) -> Self {
        Self {
            header: Header::new(MessageType::Sync, source, sequence_id),
            body: Body::Sync {
                origin_timestamp: timestamp,
            },
        }
    }

    /// Create a Follow-up message.
    #[must_use]
    pub fn follow_up(source: PortIdentity, sequence_id: u16, precise: Timestamp) -> Self {
        Self {
            header: Header::new(MessageType::FollowUp, source, sequence_id),
            body: Body::FollowUp {
                precise_origin_timestamp: precise,
            },
        }
    }

    /// Create a Delay request message.
    #[must_use]
    pub fn delay_req(source: PortIdentity, sequence_id: u16, timestamp: Timestamp) -> Self {
        Self {
            header: Header::new(MessageType::DelayReq, source, sequence_id),
            body: Body::DelayReq {
                origin_timestamp: timestamp,
            },
        }
    }

    /// Create a Delay response message.
    #[must_use]
    pub fn delay_resp(
        source: PortIdentity,
        sequence_id: u16,
        receive_timestamp: Timestamp,
        requesting_port: PortIdentity,
    ) -> Self {
        Self {
            header: Header::new(MessageType::DelayResp, source, sequence_id),
            body: Body::DelayResp {
                receive_timestamp,
                requesting_port_identity: requesting_port,
            },
        }
    }

    /// Create an Announce message.
    #[must_use]
    pub fn announce(source: PortIdentity, sequence_id: u16, body: AnnounceBody) -> Self {
        Self {
            header: Header::new(MessageType::Announce, source, sequence_id),
            body: Body::Announce {
                body,
                tlvs: TlvList::EMPTY,
            },
        }
    }

    /// Total encoded size of this message.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        Header::SIZE + self.body.wire_size()
    }
}

fn decode_timestamp(data: &[u8], field: &'static str) -> Result<Timestamp, DecodeError> {
    Timestamp::decode(data).ok_or(DecodeError::InvalidField { field })
}
