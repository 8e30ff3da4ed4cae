//! Foreign-source tracking.
//!
//! Every clock heard from via announce is tracked in a bounded table
//! keyed by the sender's port identity. An entry qualifies for
//! selection after a second announce (one packet is not a source) and
//! is evicted when no announce arrives within the configured multiple
//! of its own advertised interval.

use tracing::{debug, warn};

use crate::bmca::PriorityVector;
use crate::protocol::{AnnounceBody, Header};
use crate::types::{PortIdentity, Timestamp};

/// Compile-time capacity of the foreign-source table.
///
/// The runtime limit is configurable up to this bound; the fixed
/// capacity keeps the worst-case selection pass bounded.
pub const MAX_FOREIGN_SOURCES: usize = 16;

/// Announce receipts required before an entry participates in
/// selection.
const QUALIFICATION_RECEIPTS: u8 = 2;

/// A tracked foreign clock.
#[derive(Debug, Clone, Copy)]
pub struct ForeignSource {
    /// Port the announcements arrive from.
    pub port_identity: PortIdentity,
    /// Most recent announce body from this source.
    pub announce: AnnounceBody,
    /// The source's advertised log2 announce interval.
    pub log_announce_interval: i8,
    /// Local time of the most recent announce.
    pub last_seen: Timestamp,
    /// Announce receipts observed (saturating).
    pub announce_count: u8,
}

impl ForeignSource {
    /// Whether enough announcements have arrived for this entry to
    /// participate in selection.
    #[must_use]
    pub fn is_qualified(&self) -> bool {
        self.announce_count >= QUALIFICATION_RECEIPTS
    }

    /// The priority vector this source advertises.
    #[must_use]
    pub fn priority_vector(&self) -> PriorityVector {
        PriorityVector {
            priority1: self.announce.grandmaster_priority1,
            clock_class: self.announce.grandmaster_clock_quality.clock_class,
            clock_accuracy: self.announce.grandmaster_clock_quality.clock_accuracy,
            offset_scaled_log_variance: self
                .announce
                .grandmaster_clock_quality
                .offset_scaled_log_variance,
            priority2: self.announce.grandmaster_priority2,
            clock_identity: self.announce.grandmaster_identity,
            steps_removed: self.announce.steps_removed,
        }
    }

    fn is_expired(&self, now: Timestamp, timeout_multiplier: u8) -> bool {
        let interval_ns = interval_nanos(self.log_announce_interval);
        let timeout_ns = interval_ns.saturating_mul(i128::from(timeout_multiplier));
        now.diff_nanos(&self.last_seen) > timeout_ns
    }
}

/// Duration of a log2 message interval in nanoseconds.
///
/// The exponent is clamped to a sane window; peers advertising absurd
/// intervals get the boundary value rather than an overflow.
#[must_use]
pub(crate) fn interval_nanos(log_interval: i8) -> i128 {
    const NANOS_PER_SEC: i128 = 1_000_000_000;
    let log = log_interval.clamp(-16, 16);
    if log >= 0 {
        NANOS_PER_SEC << u32::from(log.unsigned_abs())
    } else {
        NANOS_PER_SEC >> u32::from(log.unsigned_abs())
    }
}

/// Bounded table of tracked foreign sources.
///
/// Fixed storage, no heap; the configured limit caps how many entries
/// are live at once.
#[derive(Debug, Clone)]
pub struct ForeignSourceTable {
    entries: [Option<ForeignSource>; MAX_FOREIGN_SOURCES],
    limit: usize,
    timeout_multiplier: u8,
}

impl ForeignSourceTable {
    /// Create a table with a runtime entry limit (clamped to the
    /// compile-time capacity) and an announce-receipt timeout
    /// multiplier.
    #[must_use]
    pub fn new(limit: usize, timeout_multiplier: u8) -> Self {
        Self {
            entries: [None; MAX_FOREIGN_SOURCES],
            limit: limit.min(MAX_FOREIGN_SOURCES),
            timeout_multiplier,
        }
    }

    /// Record an announce from a foreign port.
    ///
    /// Creates an entry on first contact, refreshes an existing one
    /// otherwise. Returns `false` when the table is full and the
    /// announce had to be dropped.
    pub fn observe(&mut self, header: &Header, body: &AnnounceBody, now: Timestamp) -> bool {
        let source = header.source_port_identity;
        for entry in self.entries.iter_mut().flatten() {
            if entry.port_identity == source {
                entry.announce = *body;
                entry.log_announce_interval = header.log_message_interval;
                entry.last_seen = now;
                entry.announce_count = entry.announce_count.saturating_add(1);
                return true;
            }
        }

        let occupied = self.len();
        if occupied >= self.limit {
            warn!(%source, occupied, "foreign-source table full, announce dropped");
            return false;
        }
        for slot in &mut self.entries {
            if slot.is_none() {
                *slot = Some(ForeignSource {
                    port_identity: source,
                    announce: *body,
                    log_announce_interval: header.log_message_interval,
                    last_seen: now,
                    announce_count: 1,
                });
                debug!(%source, "tracking new foreign source");
                return true;
            }
        }
        false
    }

    /// Evict entries whose age exceeds `timeout_multiplier` times
    /// their advertised announce interval.
    ///
    /// Idempotent: a second pass with no new announcements removes
    /// nothing further. Runs before every selection pass, never during
    /// one.
    pub fn prune(&mut self, now: Timestamp) {
        for slot in &mut self.entries {
            if let Some(entry) = slot {
                if entry.is_expired(now, self.timeout_multiplier) {
                    debug!(source = %entry.port_identity, "foreign source timed out");
                    *slot = None;
                }
            }
        }
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// Whether no sources are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate entries that have qualified for selection.
    pub fn qualified(&self) -> impl Iterator<Item = &ForeignSource> {
        self.entries
            .iter()
            .flatten()
            .filter(|e| e.is_qualified())
    }

    /// Look up an entry by sender port identity.
    #[must_use]
    pub fn get(&self, source: &PortIdentity) -> Option<&ForeignSource> {
        self.entries
            .iter()
            .flatten()
            .find(|e| e.port_identity == *source)
    }

    /// Drop every entry (port re-initialization).
    pub fn clear(&mut self) {
        self.entries = [None; MAX_FOREIGN_SOURCES];
    }
}
