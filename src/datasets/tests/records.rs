use crate::config::{PtpConfig, ServoConfig};
use crate::datasets::{DatasetStore, ParentDataSet};
use crate::port::PortState;
use crate::protocol::{AnnounceBody, FlagField, Header, MessageType};
use crate::types::{ClockIdentity, ClockQuality, PortIdentity, Timestamp};

fn config() -> PtpConfig {
    PtpConfig::builder()
        .clock_identity(ClockIdentity([0x42; 8]))
        .servo(ServoConfig::new(0.7, 0.3))
        .build()
        .unwrap()
}

// ===== Store initialization =====

#[test]
fn test_store_initializes_from_config() {
    let store = DatasetStore::new(&config());
    assert_eq!(store.default_ds.clock_identity, ClockIdentity([0x42; 8]));
    assert_eq!(store.default_ds.priority1, 128);
    assert_eq!(store.port.port_state, PortState::Initializing);
    assert_eq!(
        store.port.port_identity,
        PortIdentity::new(ClockIdentity([0x42; 8]), 1)
    );
    assert_eq!(store.current.steps_removed, 0);
}

#[test]
fn test_initial_parent_is_self() {
    let store = DatasetStore::new(&config());
    assert_eq!(
        store.parent.grandmaster_identity,
        store.default_ds.clock_identity
    );
    assert!(!store.has_foreign_parent());
}

#[test]
fn test_foreign_parent_detection() {
    let mut store = DatasetStore::new(&config());
    store.parent = ParentDataSet {
        parent_port_identity: PortIdentity::new(ClockIdentity([0x99; 8]), 1),
        grandmaster_identity: ClockIdentity([0x99; 8]),
        grandmaster_clock_quality: ClockQuality::default(),
        grandmaster_priority1: 1,
        grandmaster_priority2: 1,
    };
    assert!(store.has_foreign_parent());
}

// ===== Time properties =====

#[test]
fn test_time_properties_update_from_announce() {
    let mut store = DatasetStore::new(&config());
    let source = PortIdentity::new(ClockIdentity([0x99; 8]), 1);
    let mut header = Header::new(MessageType::Announce, source, 0);
    header.flags = FlagField::UTC_OFFSET_VALID
        | FlagField::PTP_TIMESCALE
        | FlagField::TIME_TRACEABLE
        | FlagField::LEAP_61;
    let body = AnnounceBody {
        origin_timestamp: Timestamp::ZERO,
        current_utc_offset: 37,
        grandmaster_priority1: 1,
        grandmaster_clock_quality: ClockQuality::default(),
        grandmaster_priority2: 1,
        grandmaster_identity: ClockIdentity([0x99; 8]),
        steps_removed: 0,
        time_source: 0x10,
    };

    store.time_properties.update_from_announce(&header, &body);
    assert_eq!(store.time_properties.current_utc_offset, 37);
    assert!(store.time_properties.current_utc_offset_valid);
    assert!(store.time_properties.ptp_timescale);
    assert!(store.time_properties.time_traceable);
    assert!(store.time_properties.leap61);
    assert!(!store.time_properties.leap59);
    assert!(!store.time_properties.frequency_traceable);
    assert_eq!(store.time_properties.time_source, 0x10);
}

// ===== Default record validity =====

#[test]
fn test_unassigned_identity_is_invalid() {
    let mut store = DatasetStore::new(&config());
    assert!(store.default_ds.is_valid());
    store.default_ds.clock_identity = ClockIdentity::UNASSIGNED;
    assert!(!store.default_ds.is_valid());
}
