use crate::datasets::{ForeignSourceTable, MAX_FOREIGN_SOURCES};
use crate::protocol::{AnnounceBody, Header, MessageType};
use crate::types::{ClockIdentity, ClockQuality, PortIdentity, Timestamp};

fn announce(source_byte: u8, log_interval: i8) -> (Header, AnnounceBody) {
    let source = PortIdentity::new(ClockIdentity([source_byte; 8]), 1);
    let mut header = Header::new(MessageType::Announce, source, 0);
    header.log_message_interval = log_interval;
    let body = AnnounceBody {
        origin_timestamp: Timestamp::ZERO,
        current_utc_offset: 37,
        grandmaster_priority1: 128,
        grandmaster_clock_quality: ClockQuality::default(),
        grandmaster_priority2: 128,
        grandmaster_identity: ClockIdentity([source_byte; 8]),
        steps_removed: 0,
        time_source: 0x20,
    };
    (header, body)
}

fn at(seconds: i64) -> Timestamp {
    Timestamp::new(seconds, 0).unwrap()
}

// ===== Tracking =====

#[test]
fn test_first_announce_creates_entry() {
    let mut table = ForeignSourceTable::new(16, 3);
    let (header, body) = announce(1, 1);
    assert!(table.observe(&header, &body, at(0)));
    assert_eq!(table.len(), 1);
    let entry = table.get(&header.source_port_identity).unwrap();
    assert_eq!(entry.announce_count, 1);
    assert!(!entry.is_qualified());
}

#[test]
fn test_second_announce_qualifies_entry() {
    let mut table = ForeignSourceTable::new(16, 3);
    let (header, body) = announce(1, 1);
    table.observe(&header, &body, at(0));
    table.observe(&header, &body, at(1));
    assert_eq!(table.len(), 1);
    assert!(table.get(&header.source_port_identity).unwrap().is_qualified());
    assert_eq!(table.qualified().count(), 1);
}

#[test]
fn test_repeat_announce_updates_in_place() {
    let mut table = ForeignSourceTable::new(16, 3);
    let (header, mut body) = announce(1, 1);
    table.observe(&header, &body, at(0));
    body.grandmaster_priority1 = 5;
    table.observe(&header, &body, at(1));
    assert_eq!(table.len(), 1);
    let entry = table.get(&header.source_port_identity).unwrap();
    assert_eq!(entry.announce.grandmaster_priority1, 5);
    assert_eq!(entry.last_seen, at(1));
}

#[test]
fn test_same_clock_different_port_is_a_distinct_source() {
    let mut table = ForeignSourceTable::new(16, 3);
    let (header, body) = announce(1, 1);
    let mut other = header;
    other.source_port_identity.port_number = 2;
    table.observe(&header, &body, at(0));
    table.observe(&other, &body, at(0));
    assert_eq!(table.len(), 2);
}

// ===== Overflow =====

#[test]
fn test_table_overflow_drops_new_sources() {
    let mut table = ForeignSourceTable::new(4, 3);
    for byte in 1..=4u8 {
        let (header, body) = announce(byte, 1);
        assert!(table.observe(&header, &body, at(0)));
    }
    let (header, body) = announce(5, 1);
    assert!(!table.observe(&header, &body, at(0)));
    assert_eq!(table.len(), 4);

    // Known sources still refresh while the table is full.
    let (known, body) = announce(1, 1);
    assert!(table.observe(&known, &body, at(1)));
}

#[test]
fn test_limit_clamped_to_capacity() {
    let mut table = ForeignSourceTable::new(1000, 3);
    for byte in 0..=255u8 {
        let (header, body) = announce(byte, 1);
        table.observe(&header, &body, at(0));
    }
    assert_eq!(table.len(), MAX_FOREIGN_SOURCES);
}

// ===== Aging =====

#[test]
fn test_entry_expires_after_timeout_multiple() {
    // log interval 1 = 2s announce interval, multiplier 3 = 6s timeout.
    let mut table = ForeignSourceTable::new(16, 3);
    let (header, body) = announce(1, 1);
    table.observe(&header, &body, at(0));

    table.prune(at(6));
    assert_eq!(table.len(), 1, "at the timeout boundary the entry lives");

    table.prune(at(7));
    assert_eq!(table.len(), 0, "past the timeout the entry is evicted");
}

#[test]
fn test_entry_timeout_scales_with_advertised_interval() {
    let mut table = ForeignSourceTable::new(16, 3);
    // log interval 0 = 1s: times out after 3s.
    let (fast, body) = announce(1, 0);
    // log interval 2 = 4s: times out after 12s.
    let (slow, body2) = announce(2, 2);
    table.observe(&fast, &body, at(0));
    table.observe(&slow, &body2, at(0));

    table.prune(at(5));
    assert_eq!(table.len(), 1);
    assert!(table.get(&slow.source_port_identity).is_some());
    assert!(table.get(&fast.source_port_identity).is_none());
}

#[test]
fn test_pruning_is_idempotent() {
    let mut table = ForeignSourceTable::new(16, 3);
    let (a, body) = announce(1, 0);
    let (b, body2) = announce(2, 2);
    table.observe(&a, &body, at(0));
    table.observe(&b, &body2, at(0));

    table.prune(at(5));
    let after_first: Vec<_> = table
        .qualified()
        .map(|e| e.port_identity)
        .collect();
    let len_first = table.len();

    table.prune(at(5));
    let after_second: Vec<_> = table
        .qualified()
        .map(|e| e.port_identity)
        .collect();
    assert_eq!(len_first, table.len());
    assert_eq!(after_first, after_second);
}

#[test]
fn test_fresh_announce_resets_age() {
    let mut table = ForeignSourceTable::new(16, 3);
    let (header, body) = announce(1, 0);
    table.observe(&header, &body, at(0));
    table.observe(&header, &body, at(2));
    table.prune(at(4));
    assert_eq!(table.len(), 1, "age counts from the latest announce");
}

#[test]
fn test_clear_empties_table() {
    let mut table = ForeignSourceTable::new(16, 3);
    let (header, body) = announce(1, 1);
    table.observe(&header, &body, at(0));
    table.clear();
    assert!(table.is_empty());
}
