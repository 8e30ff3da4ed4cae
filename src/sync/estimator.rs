//! Offset and path-delay estimation.
//!
//! One synchronization cycle needs four timestamps: the origination
//! and reception of a sync exchange (T1, T2) and the origination and
//! reception of the return delay-request exchange (T3, T4).
//! Correction fields accumulated along the path are subtracted in the
//! scaled domain before the halving, so no floating-point rounding
//! touches the result.

use tracing::{debug, warn};

use crate::types::{TimeInterval, Timestamp};

/// An accepted offset/delay sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetSample {
    /// Offset from the parent: `((T2-T1) - (T4-T3)) / 2`.
    pub offset: TimeInterval,
    /// Mean path delay: `((T2-T1) + (T4-T3)) / 2`.
    pub mean_path_delay: TimeInterval,
}

/// Assembles sync-cycle timestamps into offset samples.
///
/// Timestamps arrive piecewise (sync, follow-up, delay-request
/// transmit, delay-response); the estimator matches them by sequence
/// id and produces a sample once all four are present. A completed or
/// rejected cycle clears the slots so the next sample requires a
/// fresh T1..T4.
#[derive(Debug, Clone)]
pub struct OffsetEstimator {
    outlier_bound: TimeInterval,
    path_delay_warn_ratio: f64,
    t1: Option<Timestamp>,
    t2: Option<Timestamp>,
    t3: Option<Timestamp>,
    t4: Option<Timestamp>,
    /// Sequence id of the sync awaiting its follow-up, if two-step.
    pending_sync_seq: Option<u16>,
    /// Sequence id of the outstanding delay request.
    pending_delay_seq: Option<u16>,
    sync_correction: TimeInterval,
    delay_correction: TimeInterval,
    last_path_delay: Option<TimeInterval>,
}

impl OffsetEstimator {
    /// Create an estimator with the configured outlier bound and
    /// path-delay warning ratio.
    #[must_use]
    pub fn new(outlier_bound: TimeInterval, path_delay_warn_ratio: f64) -> Self {
        Self {
            outlier_bound,
            path_delay_warn_ratio,
            t1: None,
            t2: None,
            t3: None,
            t4: None,
            pending_sync_seq: None,
            pending_delay_seq: None,
            sync_correction: TimeInterval::ZERO,
            delay_correction: TimeInterval::ZERO,
            last_path_delay: None,
        }
    }

    /// Record a one-step sync: T1 from the message, T2 from receipt.
    pub fn record_sync(&mut self, t1: Timestamp, t2: Timestamp, correction: TimeInterval) {
        self.t1 = Some(t1);
        self.t2 = Some(t2);
        self.pending_sync_seq = None;
        self.sync_correction = correction;
    }

    /// Record a two-step sync: T2 now, precise T1 follows in the
    /// follow-up with the given sequence id.
    pub fn record_two_step_sync(&mut self, t2: Timestamp, sequence_id: u16, correction: TimeInterval) {
        self.t1 = None;
        self.t2 = Some(t2);
        self.pending_sync_seq = Some(sequence_id);
        self.sync_correction = correction;
    }

    /// Record a follow-up carrying the precise T1.
    ///
    /// Ignored unless its sequence id matches the pending two-step
    /// sync.
    pub fn record_follow_up(
        &mut self,
        precise_t1: Timestamp,
        sequence_id: u16,
        correction: TimeInterval,
    ) {
        if self.pending_sync_seq != Some(sequence_id) {
            debug!(sequence_id, "follow-up without matching sync, ignored");
            return;
        }
        self.t1 = Some(precise_t1);
        self.pending_sync_seq = None;
        // Sync and follow-up corrections accumulate over the same path.
        self.sync_correction = self
            .sync_correction
            .checked_add(correction)
            .unwrap_or(self.sync_correction);
    }

    /// Record the local transmit time of a delay request (T3).
    pub fn record_delay_req(&mut self, t3: Timestamp, sequence_id: u16) {
        self.t3 = Some(t3);
        self.t4 = None;
        self.pending_delay_seq = Some(sequence_id);
    }

    /// Record a delay response carrying T4.
    ///
    /// Ignored unless its sequence id matches the outstanding delay
    /// request.
    pub fn record_delay_resp(
        &mut self,
        t4: Timestamp,
        sequence_id: u16,
        correction: TimeInterval,
    ) {
        if self.pending_delay_seq != Some(sequence_id) {
            debug!(sequence_id, "delay response without matching request, ignored");
            return;
        }
        self.t4 = Some(t4);
        self.pending_delay_seq = None;
        self.delay_correction = correction;
    }

    /// Produce a sample if all four timestamps are in hand.
    ///
    /// Returns `None` while the cycle is incomplete or when the sample
    /// was rejected (negative path delay, offset beyond the outlier
    /// bound). Either way a completed cycle clears the slots.
    pub fn try_sample(&mut self) -> Option<OffsetSample> {
        let (Some(t1), Some(t2), Some(t3), Some(t4)) = (self.t1, self.t2, self.t3, self.t4)
        else {
            return None;
        };
        let sync_correction = self.sync_correction;
        let delay_correction = self.delay_correction;
        self.clear_cycle();

        if t2 < t1 {
            warn!(%t1, %t2, "sync receive timestamp earlier than origin (T2 < T1)");
        }
        if t4 < t3 {
            warn!(%t3, %t4, "delay response earlier than request transmit (T4 < T3)");
        }

        // Master-to-slave and slave-to-master legs, correction fields
        // subtracted in the scaled domain.
        let ms = t2
            .checked_sub(&t1)
            .ok()?
            .checked_sub(sync_correction)
            .ok()?;
        let sm = t4
            .checked_sub(&t3)
            .ok()?
            .checked_sub(delay_correction)
            .ok()?;

        let offset = ms.checked_sub(sm).ok()?.halved();
        let mean_path_delay = ms.checked_add(sm).ok()?.halved();

        if mean_path_delay.is_negative() {
            warn!(%mean_path_delay, "computed mean path delay negative, sample rejected");
            return None;
        }

        if offset.abs() > self.outlier_bound {
            warn!(%offset, bound = %self.outlier_bound, "offset beyond outlier bound, sample discarded");
            return None;
        }

        if let Some(last) = self.last_path_delay {
            let last_ns = last.as_nanos_f64().abs();
            if last_ns > 0.0 {
                let change = (mean_path_delay.as_nanos_f64() - last.as_nanos_f64()).abs() / last_ns;
                if change > self.path_delay_warn_ratio {
                    warn!(
                        %mean_path_delay,
                        previous = %last,
                        "path delay changed sharply, sample still used"
                    );
                }
            }
        }
        self.last_path_delay = Some(mean_path_delay);

        Some(OffsetSample {
            offset,
            mean_path_delay,
        })
    }

    /// Drop any partially assembled cycle (role change, parent change).
    pub fn reset(&mut self) {
        self.clear_cycle();
        self.last_path_delay = None;
    }

    fn clear_cycle(&mut self) {
        self.t1 = None;
        self.t2 = None;
        self.t3 = None;
        self.t4 = None;
        self.pending_sync_seq = None;
        self.pending_delay_seq = None;
        self.sync_correction = TimeInterval::ZERO;
        self.delay_correction = TimeInterval::ZERO;
    }

    /// Whether a delay request is outstanding.
    #[must_use]
    pub fn awaiting_delay_resp(&self) -> bool {
        self.pending_delay_seq.is_some()
    }

    /// The running path-delay estimate, if any sample has been
    /// accepted.
    #[must_use]
    pub fn path_delay(&self) -> Option<TimeInterval> {
        self.last_path_delay
    }
}
