//! The protocol engine.
//!
//! A single-threaded, event-driven composition of the codec, the
//! selector, the port state machine, and the estimator/servo pair.
//! Three entry points drive it: [`PtpEngine::handle_packet`] for
//! received bytes, [`PtpEngine::handle_timer`] for fired timers, and
//! [`PtpEngine::handle_link`] for link and administrative events.
//! Every entry point runs to completion without blocking, yielding, or
//! allocating.
//!
//! # Calling contract
//!
//! The engine owns its datasets exclusively and performs no internal
//! locking. It must only ever be driven from one logical execution
//! context: applications with multiple threads (network reader, timer
//! thread) must serialize all events into a single inbound queue. The
//! [`crate::net`] adapter implements exactly that discipline.

#[cfg(test)]
mod tests;

use tracing::{debug, info, warn};

use crate::bmca::{self, RoleRecommendation};
use crate::config::PtpConfig;
use crate::datasets::{interval_nanos, DatasetStore, ForeignSourceTable, ParentDataSet};
use crate::error::PtpError;
use crate::hal::{ClockDevice, PacketSink, TimerHandle, TimerKind, TimerQueue};
use crate::port::{transition, PortEvent, PortState};
use crate::protocol::{AnnounceBody, Body, FlagField, Message};
use crate::sync::{OffsetEstimator, PiServo, ServoOutput, ServoState};
use crate::types::{PortIdentity, TimeInterval, Timestamp};

/// Link-layer and administrative events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Port administratively enabled.
    Enabled,
    /// Port administratively disabled.
    Disabled,
    /// Link or hardware fault detected externally.
    Fault,
    /// Administrative or self-diagnostic fault clearance.
    FaultCleared,
}

/// TAI-UTC offset advertised when mastering without upstream time.
const TAI_UTC_OFFSET: i16 = 37;

/// Transmit scratch buffer size; the largest message the engine sends
/// is a 64-byte announce.
const TX_BUF_LEN: usize = 128;

const TIMER_SLOTS: usize = 5;

fn timer_slot(kind: TimerKind) -> usize {
    match kind {
        TimerKind::AnnounceReceipt => 0,
        TimerKind::Qualification => 1,
        TimerKind::AnnounceSend => 2,
        TimerKind::SyncSend => 3,
        TimerKind::DelayReqSend => 4,
    }
}

/// The protocol engine for a single ordinary-clock port.
pub struct PtpEngine {
    config: PtpConfig,
    store: DatasetStore,
    foreign: ForeignSourceTable,
    estimator: OffsetEstimator,
    servo: PiServo,
    clock: Box<dyn ClockDevice>,
    sink: Box<dyn PacketSink>,
    timers: Box<dyn TimerQueue>,
    live_timers: [Option<TimerHandle>; TIMER_SLOTS],
    timer_generation: u64,
    announce_sequence: u16,
    sync_sequence: u16,
    delay_req_sequence: u16,
    /// Consecutive accepted offset samples while uncalibrated.
    stable_samples: u8,
    tx_buf: [u8; TX_BUF_LEN],
}

impl PtpEngine {
    /// Create an engine and bring the port to `Listening`.
    ///
    /// The HAL backends are injected here and never swapped afterwards.
    ///
    /// # Errors
    /// `PtpError::Config` if the configuration fails validation; the
    /// engine never starts with bounds it cannot honor.
    pub fn new(
        config: PtpConfig,
        clock: Box<dyn ClockDevice>,
        sink: Box<dyn PacketSink>,
        timers: Box<dyn TimerQueue>,
    ) -> Result<Self, PtpError> {
        config.validate()?;
        let store = DatasetStore::new(&config);
        let foreign =
            ForeignSourceTable::new(config.max_foreign_sources, config.announce_receipt_timeout);
        let estimator = OffsetEstimator::new(
            TimeInterval::from_nanos(config.offset_outlier_ns)?,
            config.path_delay_warn_ratio,
        );
        let servo = PiServo::new(config.servo, clock.max_frequency_adjustment_ppb());
        let mut engine = Self {
            config,
            store,
            foreign,
            estimator,
            servo,
            clock,
            sink,
            timers,
            live_timers: [None; TIMER_SLOTS],
            timer_generation: 0,
            announce_sequence: 0,
            sync_sequence: 0,
            delay_req_sequence: 0,
            stable_samples: 0,
            tx_buf: [0u8; TX_BUF_LEN],
        };
        engine.apply_event(PortEvent::Initialized);
        Ok(engine)
    }

    // ---- Inbound entry points ----

    /// Process one received frame.
    ///
    /// `rx_timestamp` is the capture time of the frame (hardware if
    /// available). Malformed input is logged and dropped; it never
    /// faults the port and never propagates as an error.
    pub fn handle_packet(&mut self, data: &[u8], rx_timestamp: Timestamp) {
        let message = match Message::decode(data) {
            Ok(message) => message,
            Err(error) => {
                warn!(%error, len = data.len(), "dropping undecodable frame");
                return;
            }
        };

        if message.header.domain_number != self.store.default_ds.domain_number {
            debug!(
                domain = message.header.domain_number,
                "frame for foreign domain ignored"
            );
            return;
        }
        if message.header.source_port_identity == self.port_identity() {
            // Our own multicast transmissions loop back. Only the full
            // port identity is filtered: a different clock duplicating
            // our clock identity must still reach the selector, which
            // resolves the tie as passive.
            return;
        }

        match message.body {
            Body::Announce { body, tlvs: _ } => self.handle_announce(&message, &body),
            Body::Sync { origin_timestamp } => {
                self.handle_sync(&message, origin_timestamp, rx_timestamp);
            }
            Body::FollowUp {
                precise_origin_timestamp,
            } => self.handle_follow_up(&message, precise_origin_timestamp),
            Body::DelayReq { .. } => self.handle_delay_req(&message, rx_timestamp),
            Body::DelayResp {
                receive_timestamp,
                requesting_port_identity,
            } => self.handle_delay_resp(&message, receive_timestamp, requesting_port_identity),
            Body::Signaling { .. } | Body::Management { .. } => {
                debug!(
                    message_type = %message.header.message_type,
                    "management-plane message ignored by the engine"
                );
            }
        }
    }

    /// Process a fired timer.
    ///
    /// A handle whose generation was superseded by a reschedule or
    /// cancellation is stale and ignored.
    pub fn handle_timer(&mut self, fired: TimerHandle) {
        let slot = timer_slot(fired.kind);
        if self.live_timers[slot] != Some(fired) {
            debug!(?fired, "stale timer fire ignored");
            return;
        }
        self.live_timers[slot] = None;

        match fired.kind {
            TimerKind::AnnounceReceipt => self.on_announce_receipt_timeout(),
            TimerKind::Qualification => {
                if self.state() == PortState::PreMaster {
                    self.apply_event(PortEvent::QualificationTimeout);
                }
            }
            TimerKind::AnnounceSend => {
                if self.state() == PortState::Master {
                    self.send_announce();
                }
                if self.state() == PortState::Master {
                    self.arm_timer(TimerKind::AnnounceSend, self.announce_interval_ns());
                }
            }
            TimerKind::SyncSend => {
                if self.state() == PortState::Master {
                    self.send_sync();
                }
                if self.state() == PortState::Master {
                    self.arm_timer(TimerKind::SyncSend, self.sync_interval_ns());
                }
            }
            TimerKind::DelayReqSend => {
                if self.state().is_slave() {
                    self.send_delay_req();
                }
                if self.state().is_slave() {
                    self.arm_timer(TimerKind::DelayReqSend, self.delay_req_interval_ns());
                }
            }
        }
    }

    /// Process a link or administrative event.
    pub fn handle_link(&mut self, event: LinkEvent) {
        let port_event = match event {
            LinkEvent::Enabled => PortEvent::DesignatedEnabled,
            LinkEvent::Disabled => PortEvent::DesignatedDisabled,
            LinkEvent::Fault => PortEvent::FaultDetected,
            LinkEvent::FaultCleared => PortEvent::FaultCleared,
        };
        self.apply_event(port_event);
    }

    /// Replace the configuration.
    ///
    /// The only mutation path for the default record. Selection re-runs
    /// immediately under the new attributes.
    ///
    /// # Errors
    /// `PtpError::Config` if the new configuration fails validation;
    /// the previous configuration stays in effect.
    pub fn reconfigure(&mut self, config: PtpConfig) -> Result<(), PtpError> {
        config.validate()?;
        let state = self.state();
        self.store = DatasetStore::new(&config);
        self.store.port.port_state = state;
        self.foreign =
            ForeignSourceTable::new(config.max_foreign_sources, config.announce_receipt_timeout);
        self.estimator = OffsetEstimator::new(
            TimeInterval::from_nanos(config.offset_outlier_ns)?,
            config.path_delay_warn_ratio,
        );
        self.servo = PiServo::new(config.servo, self.clock.max_frequency_adjustment_ppb());
        self.stable_samples = 0;
        self.config = config;
        info!("engine reconfigured");
        self.reselect();
        Ok(())
    }

    // ---- State queries ----

    /// Current port state.
    #[must_use]
    pub fn state(&self) -> PortState {
        self.store.port.port_state
    }

    /// The dataset store (read-only).
    #[must_use]
    pub fn datasets(&self) -> &DatasetStore {
        &self.store
    }

    /// Identity of this port.
    #[must_use]
    pub fn port_identity(&self) -> PortIdentity {
        self.store.port.port_identity
    }

    /// Number of tracked foreign sources.
    #[must_use]
    pub fn foreign_source_count(&self) -> usize {
        self.foreign.len()
    }

    /// Servo lock state.
    #[must_use]
    pub fn servo_state(&self) -> ServoState {
        self.servo.state()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &PtpConfig {
        &self.config
    }

    // ---- Message handling ----

    fn handle_announce(&mut self, message: &Message<'_>, body: &AnnounceBody) {
        if !self.state().runs_selection() {
            debug!(state = %self.state(), "announce ignored in this state");
            return;
        }
        let now = self.clock.now();
        if !self.foreign.observe(&message.header, body, now) {
            return;
        }

        let source = message.header.source_port_identity;
        let from_parent = source == self.store.parent.parent_port_identity;
        if from_parent && self.state().is_slave() {
            self.store
                .time_properties
                .update_from_announce(&message.header, body);
            self.arm_timer(TimerKind::AnnounceReceipt, self.announce_timeout_ns());
        } else if matches!(self.state(), PortState::Listening | PortState::Passive) {
            self.arm_timer(TimerKind::AnnounceReceipt, self.announce_timeout_ns());
        }

        self.reselect();
    }

    fn handle_sync(&mut self, message: &Message<'_>, origin: Timestamp, rx: Timestamp) {
        if !self.state().is_slave() {
            return;
        }
        if message.header.source_port_identity != self.store.parent.parent_port_identity {
            debug!("sync from a port that is not our parent, ignored");
            return;
        }
        if message.header.is_two_step() {
            self.estimator.record_two_step_sync(
                rx,
                message.header.sequence_id,
                message.header.correction_field,
            );
        } else {
            self.estimator
                .record_sync(origin, rx, message.header.correction_field);
            self.complete_cycle();
        }
    }

    fn handle_follow_up(&mut self, message: &Message<'_>, precise: Timestamp) {
        if !self.state().is_slave()
            || message.header.source_port_identity != self.store.parent.parent_port_identity
        {
            return;
        }
        self.estimator.record_follow_up(
            precise,
            message.header.sequence_id,
            message.header.correction_field,
        );
        self.complete_cycle();
    }

    fn handle_delay_req(&mut self, message: &Message<'_>, rx: Timestamp) {
        if self.state() != PortState::Master {
            return;
        }
        let mut response = Message::delay_resp(
            self.port_identity(),
            message.header.sequence_id,
            rx,
            message.header.source_port_identity,
        );
        response.header.domain_number = self.store.default_ds.domain_number;
        response.header.log_message_interval = self.config.log_min_delay_req_interval;
        match response.encode(&mut self.tx_buf) {
            Ok(len) => {
                if let Err(error) = self.sink.send_general(&self.tx_buf[..len]) {
                    self.fault("delay response transmit failed", &error.to_string());
                }
            }
            Err(error) => warn!(%error, "delay response did not encode"),
        }
    }

    fn handle_delay_resp(
        &mut self,
        message: &Message<'_>,
        receive_timestamp: Timestamp,
        requesting: PortIdentity,
    ) {
        if !self.state().is_slave() || requesting != self.port_identity() {
            return;
        }
        if message.header.source_port_identity != self.store.parent.parent_port_identity {
            return;
        }
        self.estimator.record_delay_resp(
            receive_timestamp,
            message.header.sequence_id,
            message.header.correction_field,
        );
        self.complete_cycle();
    }

    // ---- Selection ----

    fn reselect(&mut self) {
        let now = self.clock.now();
        // Aging runs to completion before the comparison pass begins.
        self.foreign.prune(now);
        let recommendation = bmca::select_role(&self.store.default_ds, &self.foreign);
        self.apply_recommendation(recommendation);
    }

    fn apply_recommendation(&mut self, recommendation: RoleRecommendation) {
        match recommendation {
            RoleRecommendation::Listening => {}
            RoleRecommendation::Master => {
                // A source we have heard once but not qualified yet may
                // still win; defer mastering until it either qualifies
                // or ages out.
                let unqualified = self.foreign.len() > self.foreign.qualified().count();
                if self.state() == PortState::Listening && unqualified {
                    debug!("unqualified foreign sources present, deferring mastery");
                    return;
                }
                self.apply_event(PortEvent::RecommendedMaster);
            }
            RoleRecommendation::Passive => {
                self.apply_event(PortEvent::RecommendedPassive);
            }
            RoleRecommendation::Slave {
                parent,
                steps_removed,
            } => {
                let parent_changed = parent != self.store.parent;
                if parent_changed {
                    info!(
                        parent = %parent.parent_port_identity,
                        grandmaster = %parent.grandmaster_identity,
                        "new parent selected"
                    );
                    // The parent record is replaced wholesale, and a
                    // half-assembled cycle against the old parent is
                    // meaningless.
                    self.store.parent = parent;
                    self.estimator.reset();
                    self.servo.reset();
                    self.stable_samples = 0;
                }
                self.store.current.steps_removed = steps_removed;
                self.apply_event(PortEvent::RecommendedSlave);
            }
        }
    }

    // ---- State machine plumbing ----

    fn apply_event(&mut self, event: PortEvent) {
        let state = self.state();

        // Guard: slave states are never entered speculatively.
        if matches!(event, PortEvent::RecommendedSlave | PortEvent::Calibrated)
            && !self.qualified_parent_present()
        {
            warn!(?event, "no qualified parent record, event ignored");
            return;
        }

        let Some(next) = transition(state, event) else {
            debug!(%state, ?event, "event has no transition from this state");
            return;
        };
        if next != state {
            self.enter_state(state, next);
        }
    }

    fn qualified_parent_present(&self) -> bool {
        self.store.has_foreign_parent()
            && self
                .foreign
                .get(&self.store.parent.parent_port_identity)
                .is_some_and(crate::datasets::ForeignSource::is_qualified)
    }

    fn enter_state(&mut self, old: PortState, new: PortState) {
        info!(%old, %new, "port state transition");

        // Exit actions.
        match old {
            PortState::Master => {
                self.disarm_timer(TimerKind::AnnounceSend);
                self.disarm_timer(TimerKind::SyncSend);
            }
            PortState::PreMaster => self.disarm_timer(TimerKind::Qualification),
            PortState::Uncalibrated | PortState::Slave => {
                if !new.is_slave() {
                    self.disarm_timer(TimerKind::DelayReqSend);
                    self.estimator.reset();
                    self.servo.reset();
                }
            }
            _ => {}
        }

        self.store.port.port_state = new;

        // Entry actions.
        match new {
            PortState::Initializing => {
                self.foreign.clear();
                self.estimator.reset();
                self.servo.reset();
                self.stable_samples = 0;
                self.disarm_all_timers();
                // Dataset initialization is synchronous; proceed
                // straight to listening.
                self.apply_event(PortEvent::Initialized);
            }
            PortState::Listening => {
                self.arm_timer(TimerKind::AnnounceReceipt, self.announce_timeout_ns());
            }
            PortState::PreMaster => {
                self.arm_timer(TimerKind::Qualification, self.qualification_delay_ns());
            }
            PortState::Master => {
                self.store.parent =
                    ParentDataSet::from_self(&self.store.default_ds, self.port_identity());
                self.store.current.steps_removed = 0;
                self.send_announce();
                // The entry announce may have faulted the port.
                if self.state() == PortState::Master {
                    self.arm_timer(TimerKind::AnnounceSend, self.announce_interval_ns());
                    self.arm_timer(TimerKind::SyncSend, self.sync_interval_ns());
                }
            }
            PortState::Passive => {
                self.arm_timer(TimerKind::AnnounceReceipt, self.announce_timeout_ns());
            }
            PortState::Uncalibrated => {
                self.stable_samples = 0;
                self.arm_timer(TimerKind::AnnounceReceipt, self.announce_timeout_ns());
                self.arm_timer(TimerKind::DelayReqSend, self.delay_req_interval_ns());
            }
            PortState::Slave => {}
            PortState::Faulty => {
                self.disarm_all_timers();
                warn!("port latched FAULTY, awaiting clearance");
            }
            PortState::Disabled => {
                self.disarm_all_timers();
            }
        }
    }

    fn on_announce_receipt_timeout(&mut self) {
        match self.state() {
            PortState::Slave | PortState::Uncalibrated => {
                info!("announce receipt timeout, parent lost");
                self.apply_event(PortEvent::AnnounceReceiptTimeout);
                self.reselect();
            }
            PortState::Listening | PortState::Passive => {
                self.reselect();
                if matches!(self.state(), PortState::Listening | PortState::Passive) {
                    self.arm_timer(TimerKind::AnnounceReceipt, self.announce_timeout_ns());
                }
            }
            _ => {}
        }
    }

    // ---- Synchronization cycle ----

    fn complete_cycle(&mut self) {
        let Some(sample) = self.estimator.try_sample() else {
            return;
        };
        self.store.current.offset_from_master = sample.offset;
        self.store.current.mean_path_delay = sample.mean_path_delay;
        debug!(
            offset = %sample.offset,
            path_delay = %sample.mean_path_delay,
            "offset sample accepted"
        );

        if self.state() == PortState::Uncalibrated {
            self.stable_samples = self.stable_samples.saturating_add(1);
            if self.stable_samples >= self.config.qualification_samples {
                self.apply_event(PortEvent::Calibrated);
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let dt_secs = self.sync_interval_ns() as f64 / 1e9;
        match self.servo.update(sample.offset, dt_secs) {
            ServoOutput::Slew { ppb } => {
                if let Err(error) = self.clock.adjust_frequency(ppb) {
                    self.fault("frequency adjustment failed", &error.to_string());
                }
            }
            ServoOutput::Step { offset } => {
                if let Err(error) = self.clock.step(offset) {
                    self.fault("clock step failed", &error.to_string());
                } else {
                    // Timestamps captured before the step describe a
                    // clock that no longer exists.
                    self.estimator.reset();
                }
            }
        }
    }

    // ---- Outbound messages ----

    fn send_announce(&mut self) {
        let body = AnnounceBody {
            origin_timestamp: self.clock.now(),
            current_utc_offset: TAI_UTC_OFFSET,
            grandmaster_priority1: self.store.parent.grandmaster_priority1,
            grandmaster_clock_quality: self.store.parent.grandmaster_clock_quality,
            grandmaster_priority2: self.store.parent.grandmaster_priority2,
            grandmaster_identity: self.store.parent.grandmaster_identity,
            steps_removed: self.store.current.steps_removed,
            time_source: 0xA0, // internal oscillator
        };
        let mut message = Message::announce(self.port_identity(), self.announce_sequence, body);
        message.header.domain_number = self.store.default_ds.domain_number;
        message.header.log_message_interval = self.config.log_announce_interval;
        match message.encode(&mut self.tx_buf) {
            Ok(len) => match self.sink.send_general(&self.tx_buf[..len]) {
                Ok(()) => {
                    self.announce_sequence = self.announce_sequence.wrapping_add(1);
                }
                Err(error) => self.fault("announce transmit failed", &error.to_string()),
            },
            Err(error) => warn!(%error, "announce did not encode"),
        }
    }

    fn send_sync(&mut self) {
        let sequence = self.sync_sequence;
        let source = self.port_identity();

        // Two-step: the sync carries an approximate origin, the
        // follow-up the precise capture.
        let mut sync = Message::sync(source, sequence, Timestamp::ZERO);
        sync.header.flags |= FlagField::TWO_STEP;
        sync.header.domain_number = self.store.default_ds.domain_number;
        sync.header.log_message_interval = self.config.log_sync_interval;
        match sync.encode(&mut self.tx_buf) {
            Ok(len) => {
                if let Err(error) = self.sink.send_event(&self.tx_buf[..len]) {
                    self.fault("sync transmit failed", &error.to_string());
                    return;
                }
            }
            Err(error) => {
                warn!(%error, "sync did not encode");
                return;
            }
        }

        let precise = self.clock.now();
        let mut follow_up = Message::follow_up(source, sequence, precise);
        follow_up.header.domain_number = self.store.default_ds.domain_number;
        follow_up.header.log_message_interval = self.config.log_sync_interval;
        match follow_up.encode(&mut self.tx_buf) {
            Ok(len) => {
                if let Err(error) = self.sink.send_general(&self.tx_buf[..len]) {
                    self.fault("follow-up transmit failed", &error.to_string());
                    return;
                }
            }
            Err(error) => {
                warn!(%error, "follow-up did not encode");
                return;
            }
        }
        self.sync_sequence = self.sync_sequence.wrapping_add(1);
    }

    fn send_delay_req(&mut self) {
        let sequence = self.delay_req_sequence;
        let mut message = Message::delay_req(self.port_identity(), sequence, Timestamp::ZERO);
        message.header.domain_number = self.store.default_ds.domain_number;
        match message.encode(&mut self.tx_buf) {
            Ok(len) => {
                let t3 = self.clock.now();
                if let Err(error) = self.sink.send_event(&self.tx_buf[..len]) {
                    self.fault("delay request transmit failed", &error.to_string());
                    return;
                }
                self.estimator.record_delay_req(t3, sequence);
                self.delay_req_sequence = self.delay_req_sequence.wrapping_add(1);
            }
            Err(error) => warn!(%error, "delay request did not encode"),
        }
    }

    // ---- Faults ----

    fn fault(&mut self, what: &'static str, detail: &str) {
        warn!(what, detail, "hardware access failure, escalating to FAULTY");
        self.apply_event(PortEvent::FaultDetected);
    }

    // ---- Timers ----

    fn arm_timer(&mut self, kind: TimerKind, after_ns: u64) {
        let slot = timer_slot(kind);
        if let Some(old) = self.live_timers[slot].take() {
            self.timers.cancel(old);
        }
        self.timer_generation += 1;
        let handle = TimerHandle {
            kind,
            generation: self.timer_generation,
        };
        self.live_timers[slot] = Some(handle);
        self.timers.schedule(handle, after_ns);
    }

    fn disarm_timer(&mut self, kind: TimerKind) {
        if let Some(handle) = self.live_timers[timer_slot(kind)].take() {
            self.timers.cancel(handle);
        }
    }

    fn disarm_all_timers(&mut self) {
        for kind in [
            TimerKind::AnnounceReceipt,
            TimerKind::Qualification,
            TimerKind::AnnounceSend,
            TimerKind::SyncSend,
            TimerKind::DelayReqSend,
        ] {
            self.disarm_timer(kind);
        }
    }

    fn announce_interval_ns(&self) -> u64 {
        clamp_ns(interval_nanos(self.config.log_announce_interval))
    }

    fn sync_interval_ns(&self) -> u64 {
        clamp_ns(interval_nanos(self.config.log_sync_interval))
    }

    fn delay_req_interval_ns(&self) -> u64 {
        clamp_ns(interval_nanos(self.config.log_min_delay_req_interval))
    }

    fn announce_timeout_ns(&self) -> u64 {
        self.announce_interval_ns()
            .saturating_mul(u64::from(self.store.port.announce_receipt_timeout))
    }

    fn qualification_delay_ns(&self) -> u64 {
        // One announce interval per step removed from the grandmaster,
        // plus one.
        self.announce_interval_ns()
            .saturating_mul(u64::from(self.store.current.steps_removed) + 1)
    }
}

fn clamp_ns(ns: i128) -> u64 {
    u64::try_from(ns).unwrap_or(u64::MAX)
}

impl std::fmt::Debug for PtpEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtpEngine")
            .field("port", &self.port_identity())
            .field("state", &self.state())
            .field("foreign_sources", &self.foreign.len())
            .field("servo", &self.servo.state())
            .finish_non_exhaustive()
    }
}
