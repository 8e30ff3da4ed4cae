//! Best master clock algorithm.
//!
//! Compares this clock's own priority vector against every qualified
//! foreign source and recommends a port role. The comparison is a
//! total lexicographic order over the vector fields, lower value
//! winning at each field in turn. A tie across every field including
//! the clock identity can only mean a duplicated configuration and
//! resolves to `Passive`, never to self-superiority.


use tracing::{debug, warn};

use crate::datasets::{DefaultDataSet, ForeignSource, ForeignSourceTable, ParentDataSet};
use crate::types::ClockIdentity;

/// The ordered tuple used to rank candidate time sources.
///
/// `Ord` derives lexicographic comparison in declaration order, which
/// is exactly the protocol's comparison sequence: priority1, clock
/// class, accuracy, variance, priority2, clock identity, steps
/// removed. Lower is better at every position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PriorityVector {
    /// Operator-assigned first-tier priority.
    pub priority1: u8,
    /// Traceability class of the advertised grandmaster.
    pub clock_class: u8,
    /// Accuracy enumeration of the advertised grandmaster.
    pub clock_accuracy: u8,
    /// Stability variance of the advertised grandmaster.
    pub offset_scaled_log_variance: u16,
    /// Operator-assigned second-tier priority.
    pub priority2: u8,
    /// Identity of the advertised grandmaster.
    pub clock_identity: ClockIdentity,
    /// Hops between the grandmaster and the advertiser.
    pub steps_removed: u16,
}

impl PriorityVector {
    /// This clock's own vector, derived live from the default record.
    #[must_use]
    pub fn from_default_ds(default_ds: &DefaultDataSet) -> Self {
        Self {
            priority1: default_ds.priority1,
            clock_class: default_ds.clock_quality.clock_class,
            clock_accuracy: default_ds.clock_quality.clock_accuracy,
            offset_scaled_log_variance: default_ds.clock_quality.offset_scaled_log_variance,
            priority2: default_ds.priority2,
            clock_identity: default_ds.clock_identity,
            steps_removed: 0,
        }
    }
}

/// Outcome of a selection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRecommendation {
    /// This clock is the best source; the port should master.
    Master,
    /// A foreign source won; the port should synchronize to it.
    Slave {
        /// The winning source, ready to replace the parent record.
        parent: ParentDataSet,
        /// Steps removed for the current record (winner's + 1).
        steps_removed: u16,
    },
    /// A foreign vector exactly ties this clock's own (duplicated
    /// configuration); the port must go passive.
    Passive,
    /// The default record is not yet valid; keep listening.
    Listening,
}

/// Run one selection pass over the qualified foreign sources.
///
/// The caller prunes the table before invoking this; pruning never
/// happens mid-comparison. O(N) in the number of tracked sources.
#[must_use]
pub fn select_role(
    default_ds: &DefaultDataSet,
    foreign: &ForeignSourceTable,
) -> RoleRecommendation {
    if !default_ds.is_valid() {
        debug!("default record not yet valid, staying in listening");
        return RoleRecommendation::Listening;
    }

    let own = PriorityVector::from_default_ds(default_ds);

    let mut best: Option<(&ForeignSource, PriorityVector)> = None;
    for source in foreign.qualified() {
        let vector = source.priority_vector();
        match &best {
            Some((_, best_vector)) if *best_vector <= vector => {}
            _ => best = Some((source, vector)),
        }
    }

    let Some((winner, winner_vector)) = best else {
        // No qualified foreign sources: this clock masters by default.
        return RoleRecommendation::Master;
    };

    if winner_vector == own {
        // A foreign vector can only equal our own, identity included,
        // if two clocks share a configuration. Never resolved as
        // self-superiority.
        warn!(
            source = %winner.port_identity,
            "foreign source ties our own priority vector exactly, going passive"
        );
        return RoleRecommendation::Passive;
    }

    if winner_vector < own {
        debug!(
            source = %winner.port_identity,
            grandmaster = %winner_vector.clock_identity,
            "foreign source selected as parent"
        );
        return RoleRecommendation::Slave {
            parent: ParentDataSet {
                parent_port_identity: winner.port_identity,
                grandmaster_identity: winner.announce.grandmaster_identity,
                grandmaster_clock_quality: winner.announce.grandmaster_clock_quality,
                grandmaster_priority1: winner.announce.grandmaster_priority1,
                grandmaster_priority2: winner.announce.grandmaster_priority2,
            },
            steps_removed: winner.announce.steps_removed.saturating_add(1),
        };
    }

    RoleRecommendation::Master
}
