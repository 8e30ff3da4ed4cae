//! Hardware abstraction contract.
//!
//! The engine depends on these traits and never on concrete backends;
//! implementations are injected once at initialization. Every
//! operation must be non-blocking or bounded-latency, and every call
//! is fallible — the engine reacts to failure by escalating the port
//! to `Faulty` or by deferring, never by retry-looping in the hot
//! path.

use crate::types::{TimeInterval, Timestamp};

/// Errors from packet transmission or reception.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IoError {
    /// Transmit path failed.
    #[error("send failed: {0}")]
    Send(&'static str),
    /// Receive path failed.
    #[error("receive failed: {0}")]
    Receive(&'static str),
    /// The backing socket or device is gone.
    #[error("transport closed")]
    Closed,
}

/// Errors from the disciplined clock hardware.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClockError {
    /// Requested adjustment outside the hardware range.
    #[error("adjustment out of range: {requested_ppb} ppb")]
    OutOfRange {
        /// Requested frequency adjustment.
        requested_ppb: f64,
    },
    /// The clock device rejected the operation.
    #[error("clock device fault: {0}")]
    DeviceFault(&'static str),
}

/// The local clock being disciplined.
///
/// `Send` so the engine can live inside an async task; the engine
/// itself still only ever calls from one execution context.
pub trait ClockDevice: Send {
    /// Capture the current time with the device's declared precision.
    fn now(&self) -> Timestamp;

    /// Steer clock frequency by `ppb` parts-per-billion.
    ///
    /// # Errors
    /// `ClockError` if the hardware rejects the adjustment.
    fn adjust_frequency(&mut self, ppb: f64) -> Result<(), ClockError>;

    /// Step the clock backwards by `offset` (local minus parent).
    ///
    /// # Errors
    /// `ClockError` if the hardware rejects the step.
    fn step(&mut self, offset: TimeInterval) -> Result<(), ClockError>;

    /// Largest frequency adjustment the hardware accepts, in ppb.
    fn max_frequency_adjustment_ppb(&self) -> f64;

    /// Declared timestamp capture precision in nanoseconds.
    fn timestamp_precision_ns(&self) -> u32;

    /// Whether receive timestamps come from hardware capture.
    fn hardware_timestamping(&self) -> bool {
        false
    }
}

/// Outbound packet path.
///
/// Event messages (sync, delay-request) travel the timestamped
/// channel; general messages the other. Implementations must not
/// block — queueing is acceptable, waiting is not.
pub trait PacketSink: Send {
    /// Send an event message.
    ///
    /// # Errors
    /// `IoError` on transmit failure.
    fn send_event(&mut self, frame: &[u8]) -> Result<(), IoError>;

    /// Send a general message.
    ///
    /// # Errors
    /// `IoError` on transmit failure.
    fn send_general(&mut self, frame: &[u8]) -> Result<(), IoError>;
}

/// What a scheduled timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// No announce heard from the parent within the timeout.
    AnnounceReceipt,
    /// Master qualification delay.
    Qualification,
    /// Periodic announce transmission.
    AnnounceSend,
    /// Periodic sync transmission.
    SyncSend,
    /// Periodic delay-request transmission.
    DelayReqSend,
}

/// Token identifying one scheduled timer.
///
/// The generation disambiguates reschedules: a fired handle whose
/// generation no longer matches the engine's live handle is stale and
/// treated as a no-op, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    /// What the timer is for.
    pub kind: TimerKind,
    /// Schedule generation, bumped on every (re)schedule.
    pub generation: u64,
}

/// Timer scheduling facility.
///
/// Implementations deliver expirations back to the engine as
/// [`TimerHandle`] values through the application's single event
/// queue; no callbacks cross this boundary.
pub trait TimerQueue: Send {
    /// Arm (or re-arm) a timer. A previously scheduled timer of the
    /// same handle kind is superseded.
    fn schedule(&mut self, handle: TimerHandle, after_ns: u64);

    /// Cancel a scheduled timer. Cancelling an already-fired or
    /// unknown handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}
