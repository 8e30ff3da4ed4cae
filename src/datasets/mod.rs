//! Protocol datasets.
//!
//! The persistent state variables of the engine, grouped the way the
//! specification groups them: the default record (this clock's own
//! identity and quality), the current record (offset/delay relative to
//! the active parent), the parent record (the selected source), the
//! time-properties record (grandmaster time metadata), and the port
//! record. The store is owned exclusively by the engine and mutated
//! only by the selector and the state machine.

mod foreign;

#[cfg(test)]
mod tests;

pub use foreign::{ForeignSource, ForeignSourceTable, MAX_FOREIGN_SOURCES};
pub(crate) use foreign::interval_nanos;

use crate::config::PtpConfig;
use crate::port::PortState;
use crate::protocol::{AnnounceBody, FlagField, Header};
use crate::types::{ClockIdentity, ClockQuality, PortIdentity, TimeInterval};

/// This clock's own attributes.
///
/// Created at initialization from configuration and mutated only by an
/// explicit reconfiguration call, never by protocol logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultDataSet {
    /// Identity of this clock.
    pub clock_identity: ClockIdentity,
    /// First-tier selection priority (lower wins).
    pub priority1: u8,
    /// Second-tier selection priority (lower wins).
    pub priority2: u8,
    /// Quality of this clock's oscillator.
    pub clock_quality: ClockQuality,
    /// Protocol domain this clock participates in.
    pub domain_number: u8,
}

impl DefaultDataSet {
    /// Build from validated configuration.
    #[must_use]
    pub fn from_config(config: &PtpConfig) -> Self {
        Self {
            clock_identity: config.clock_identity,
            priority1: config.priority1,
            priority2: config.priority2,
            clock_quality: config.clock_quality,
            domain_number: config.domain_number,
        }
    }

    /// Whether the record is usable for selection.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.clock_identity.is_assigned()
    }
}

/// Offset and delay relative to the active parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CurrentDataSet {
    /// Hops between the grandmaster and this clock.
    pub steps_removed: u16,
    /// Most recent accepted offset from the parent.
    pub offset_from_master: TimeInterval,
    /// Most recent accepted mean path delay to the parent.
    pub mean_path_delay: TimeInterval,
}

/// The currently selected parent (master) clock.
///
/// Replaced wholesale whenever the selector recommends a new parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentDataSet {
    /// Port we receive time from.
    pub parent_port_identity: PortIdentity,
    /// Identity of the grandmaster at the root of the tree.
    pub grandmaster_identity: ClockIdentity,
    /// Grandmaster clock quality.
    pub grandmaster_clock_quality: ClockQuality,
    /// Grandmaster priority1.
    pub grandmaster_priority1: u8,
    /// Grandmaster priority2.
    pub grandmaster_priority2: u8,
}

impl ParentDataSet {
    /// A parent record describing this clock itself (the master case).
    #[must_use]
    pub fn from_self(default_ds: &DefaultDataSet, port: PortIdentity) -> Self {
        Self {
            parent_port_identity: port,
            grandmaster_identity: default_ds.clock_identity,
            grandmaster_clock_quality: default_ds.clock_quality,
            grandmaster_priority1: default_ds.priority1,
            grandmaster_priority2: default_ds.priority2,
        }
    }
}

/// Time metadata of the grandmaster, refreshed from announcements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimePropertiesDataSet {
    /// TAI-UTC offset in seconds.
    pub current_utc_offset: i16,
    /// Whether `current_utc_offset` is valid.
    pub current_utc_offset_valid: bool,
    /// Last minute of the day has 59 seconds.
    pub leap59: bool,
    /// Last minute of the day has 61 seconds.
    pub leap61: bool,
    /// Timescale is PTP (TAI).
    pub ptp_timescale: bool,
    /// Time traceable to a primary reference.
    pub time_traceable: bool,
    /// Frequency traceable to a primary reference.
    pub frequency_traceable: bool,
    /// Time source enumeration of the grandmaster.
    pub time_source: u8,
}

impl TimePropertiesDataSet {
    /// Refresh from a received announce header and body.
    pub fn update_from_announce(&mut self, header: &Header, body: &AnnounceBody) {
        self.current_utc_offset = body.current_utc_offset;
        self.current_utc_offset_valid = header.flags & FlagField::UTC_OFFSET_VALID != 0;
        self.leap59 = header.flags & FlagField::LEAP_59 != 0;
        self.leap61 = header.flags & FlagField::LEAP_61 != 0;
        self.ptp_timescale = header.flags & FlagField::PTP_TIMESCALE != 0;
        self.time_traceable = header.flags & FlagField::TIME_TRACEABLE != 0;
        self.frequency_traceable = header.flags & FlagField::FREQUENCY_TRACEABLE != 0;
        self.time_source = body.time_source;
    }
}

/// Per-port protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortDataSet {
    /// Identity of this port.
    pub port_identity: PortIdentity,
    /// Current state of the port state machine.
    pub port_state: PortState,
    /// Log2 seconds between announce transmissions.
    pub log_announce_interval: i8,
    /// Announce-receipt timeout, in multiples of the announce interval.
    pub announce_receipt_timeout: u8,
    /// Log2 seconds between sync transmissions.
    pub log_sync_interval: i8,
    /// Log2 seconds between delay-request transmissions.
    pub log_min_delay_req_interval: i8,
    /// Protocol version spoken on this port.
    pub version_number: u8,
}

impl PortDataSet {
    /// Build from validated configuration; the port starts in
    /// `Initializing`.
    #[must_use]
    pub fn from_config(config: &PtpConfig) -> Self {
        Self {
            port_identity: PortIdentity::new(config.clock_identity, config.port_number),
            port_state: PortState::Initializing,
            log_announce_interval: config.log_announce_interval,
            announce_receipt_timeout: config.announce_receipt_timeout,
            log_sync_interval: config.log_sync_interval,
            log_min_delay_req_interval: config.log_min_delay_req_interval,
            version_number: Header::VERSION,
        }
    }
}

/// The complete dataset store.
///
/// Single-owner: passed by exclusive reference into every component
/// entry point, never shared or locked.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    /// This clock's own attributes.
    pub default_ds: DefaultDataSet,
    /// Offset/delay relative to the active parent.
    pub current: CurrentDataSet,
    /// The selected parent.
    pub parent: ParentDataSet,
    /// Grandmaster time metadata.
    pub time_properties: TimePropertiesDataSet,
    /// Per-port state.
    pub port: PortDataSet,
}

impl DatasetStore {
    /// Initialize all records from validated configuration.
    ///
    /// The parent record initially names this clock itself, which is
    /// what the selector expects before any foreign source qualifies.
    #[must_use]
    pub fn new(config: &PtpConfig) -> Self {
        let default_ds = DefaultDataSet::from_config(config);
        let port = PortDataSet::from_config(config);
        let parent = ParentDataSet::from_self(&default_ds, port.port_identity);
        Self {
            default_ds,
            current: CurrentDataSet::default(),
            parent,
            time_properties: TimePropertiesDataSet::default(),
            port,
        }
    }

    /// Whether the parent record names a clock other than this one.
    #[must_use]
    pub fn has_foreign_parent(&self) -> bool {
        self.parent.grandmaster_identity != self.default_ds.clock_identity
    }
}
