//! Reusable test doubles for the HAL contract.
//!
//! `ManualClock`, `RecordingSink`, and `ManualTimerQueue` let the
//! engine run entirely deterministically: the test advances time,
//! inspects transmitted frames, and fires timers by hand. They are
//! public so downstream crates can drive the engine in their own
//! tests.

use std::sync::{Arc, Mutex};

use crate::hal::{ClockDevice, ClockError, IoError, PacketSink, TimerHandle, TimerQueue};
use crate::protocol::{AnnounceBody, Message};
use crate::types::{ClockIdentity, ClockQuality, PortIdentity, TimeInterval, Timestamp};

/// A clock whose time only moves when the test says so.
///
/// Records every adjustment and step for assertions. Cloning shares
/// the underlying state, so a test can keep a handle while the engine
/// owns the boxed device.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualClockState>>,
}

#[derive(Debug, Default)]
struct ManualClockState {
    now: Timestamp,
    adjustments_ppb: Vec<f64>,
    steps: Vec<TimeInterval>,
    fail_next: bool,
}

impl ManualClock {
    /// Create a clock at the epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current time.
    ///
    /// # Panics
    /// Panics if the components are out of range (test input).
    pub fn set_time(&self, seconds: i64, nanoseconds: u32) {
        self.inner.lock().expect("mock state lock").now =
            Timestamp::new(seconds, nanoseconds).expect("valid test timestamp");
    }

    /// Advance the current time by whole nanoseconds.
    pub fn advance_ns(&self, nanos: i64) {
        let mut state = self.inner.lock().expect("mock state lock");
        state.now = Timestamp::from_nanos(state.now.to_nanos() + i128::from(nanos))
            .expect("advanced test timestamp in range");
    }

    /// Frequency adjustments the engine has requested, in order.
    #[must_use]
    pub fn adjustments_ppb(&self) -> Vec<f64> {
        self.inner.lock().expect("mock state lock").adjustments_ppb.clone()
    }

    /// Clock steps the engine has requested, in order.
    #[must_use]
    pub fn steps(&self) -> Vec<TimeInterval> {
        self.inner.lock().expect("mock state lock").steps.clone()
    }

    /// Make the next adjustment or step fail (hardware fault
    /// injection).
    pub fn fail_next(&self) {
        self.inner.lock().expect("mock state lock").fail_next = true;
    }

    fn take_failure(&self) -> bool {
        std::mem::take(&mut self.inner.lock().expect("mock state lock").fail_next)
    }
}

impl ClockDevice for ManualClock {
    fn now(&self) -> Timestamp {
        self.inner.lock().expect("mock state lock").now
    }

    fn adjust_frequency(&mut self, ppb: f64) -> Result<(), ClockError> {
        if self.take_failure() {
            return Err(ClockError::DeviceFault("injected"));
        }
        self.inner.lock().expect("mock state lock").adjustments_ppb.push(ppb);
        Ok(())
    }

    fn step(&mut self, offset: TimeInterval) -> Result<(), ClockError> {
        if self.take_failure() {
            return Err(ClockError::DeviceFault("injected"));
        }
        self.inner.lock().expect("mock state lock").steps.push(offset);
        Ok(())
    }

    fn max_frequency_adjustment_ppb(&self) -> f64 {
        500_000.0
    }

    fn timestamp_precision_ns(&self) -> u32 {
        1
    }
}

/// Records every transmitted frame instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<RecordingSinkState>>,
}

#[derive(Debug, Default)]
struct RecordingSinkState {
    event_frames: Vec<Vec<u8>>,
    general_frames: Vec<Vec<u8>>,
    fail_next: bool,
}

impl RecordingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames sent on the event channel, in order.
    #[must_use]
    pub fn event_frames(&self) -> Vec<Vec<u8>> {
        self.inner.lock().expect("mock state lock").event_frames.clone()
    }

    /// Frames sent on the general channel, in order.
    #[must_use]
    pub fn general_frames(&self) -> Vec<Vec<u8>> {
        self.inner.lock().expect("mock state lock").general_frames.clone()
    }

    /// Make the next send fail (transport fault injection).
    pub fn fail_next(&self) {
        self.inner.lock().expect("mock state lock").fail_next = true;
    }
}

impl PacketSink for RecordingSink {
    fn send_event(&mut self, frame: &[u8]) -> Result<(), IoError> {
        let mut state = self.inner.lock().expect("mock state lock");
        if std::mem::take(&mut state.fail_next) {
            return Err(IoError::Send("injected"));
        }
        state.event_frames.push(frame.to_vec());
        Ok(())
    }

    fn send_general(&mut self, frame: &[u8]) -> Result<(), IoError> {
        let mut state = self.inner.lock().expect("mock state lock");
        if std::mem::take(&mut state.fail_next) {
            return Err(IoError::Send("injected"));
        }
        state.general_frames.push(frame.to_vec());
        Ok(())
    }
}

/// A timer queue the test fires by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualTimerQueue {
    inner: Arc<Mutex<ManualTimerState>>,
}

#[derive(Debug, Default)]
struct ManualTimerState {
    scheduled: Vec<(TimerHandle, u64)>,
    cancelled: Vec<TimerHandle>,
}

impl ManualTimerQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently scheduled (not cancelled) handles with their delays.
    #[must_use]
    pub fn scheduled(&self) -> Vec<(TimerHandle, u64)> {
        self.inner.lock().expect("mock state lock").scheduled.clone()
    }

    /// Pop the most recently scheduled handle of any kind matching
    /// `predicate`, as a test would "fire" it.
    pub fn take_matching(
        &self,
        predicate: impl Fn(&TimerHandle) -> bool,
    ) -> Option<TimerHandle> {
        let mut state = self.inner.lock().expect("mock state lock");
        let index = state.scheduled.iter().rposition(|(h, _)| predicate(h))?;
        Some(state.scheduled.remove(index).0)
    }

    /// Handles the engine has cancelled, in order.
    #[must_use]
    pub fn cancelled(&self) -> Vec<TimerHandle> {
        self.inner.lock().expect("mock state lock").cancelled.clone()
    }
}

impl TimerQueue for ManualTimerQueue {
    fn schedule(&mut self, handle: TimerHandle, after_ns: u64) {
        self.inner.lock().expect("mock state lock").scheduled.push((handle, after_ns));
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let mut state = self.inner.lock().expect("mock state lock");
        state.scheduled.retain(|(h, _)| *h != handle);
        state.cancelled.push(handle);
    }
}

/// Encode an announce frame from a foreign clock, for feeding into
/// the engine.
///
/// # Panics
/// Panics if encoding fails (fixed-size test input).
#[must_use]
pub fn announce_frame(
    source: PortIdentity,
    sequence_id: u16,
    grandmaster: ClockIdentity,
    priority1: u8,
    priority2: u8,
    quality: ClockQuality,
    steps_removed: u16,
) -> Vec<u8> {
    let body = AnnounceBody {
        origin_timestamp: Timestamp::ZERO,
        current_utc_offset: 37,
        grandmaster_priority1: priority1,
        grandmaster_clock_quality: quality,
        grandmaster_priority2: priority2,
        grandmaster_identity: grandmaster,
        steps_removed,
        time_source: 0x20,
    };
    let mut message = Message::announce(source, sequence_id, body);
    message.header.log_message_interval = 1;
    let mut buf = vec![0u8; message.wire_size()];
    let len = message.encode(&mut buf).expect("announce encodes");
    buf.truncate(len);
    buf
}
