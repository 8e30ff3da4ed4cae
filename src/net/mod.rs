//! UDP runtime adapter.
//!
//! Everything the sans-IO engine pushed out to the HAL boundary lives
//! here: sockets, timers, and a software clock. The adapter upholds
//! the engine's single-queue calling contract by funnelling socket
//! receives, timer expirations, and outbound traffic through one
//! `tokio::select!` task — the engine is never touched from two
//! execution contexts.
//!
//! ## Standard Ports
//!
//! - **319**: Event messages (Sync, `Delay_Req`) — timestamped on
//!   receipt.
//! - **320**: General messages (`Follow_Up`, `Delay_Resp`, Announce).

mod node;

#[cfg(test)]
mod tests;

pub use node::{NodeConfig, NodeError, PtpNode};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::info;

use crate::hal::{ClockDevice, ClockError, IoError, PacketSink, TimerHandle, TimerQueue};
use crate::types::{TimeInterval, Timestamp};

/// UDP port for event messages.
pub const PTP_EVENT_PORT: u16 = 319;

/// UDP port for general messages.
pub const PTP_GENERAL_PORT: u16 = 320;

/// Which channel an outbound frame belongs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtpChannel {
    /// Timestamped event channel (port 319).
    Event,
    /// General channel (port 320).
    General,
}

/// A frame queued for transmission by the node task.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    /// Destination channel.
    pub channel: PtpChannel,
    /// Encoded message bytes.
    pub frame: Bytes,
}

/// Timer operations queued for the node task's delay wheel.
#[derive(Debug, Clone, Copy)]
pub enum TimerCommand {
    /// Arm `handle` to fire after the given delay.
    Schedule(TimerHandle, u64),
    /// Disarm `handle` if still pending.
    Cancel(TimerHandle),
}

/// Software clock over the system realtime clock.
///
/// A reference implementation for demos and loopback testing: reads
/// are real, but discipline operations only log — steering the OS
/// clock requires privileged, platform-specific calls that belong to
/// the embedding application.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockDevice for SystemClock {
    fn now(&self) -> Timestamp {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Timestamp::from_duration(since_epoch).unwrap_or(Timestamp::ZERO)
    }

    fn adjust_frequency(&mut self, ppb: f64) -> Result<(), ClockError> {
        info!(ppb, "frequency adjustment requested (software clock, not applied)");
        Ok(())
    }

    fn step(&mut self, offset: TimeInterval) -> Result<(), ClockError> {
        info!(%offset, "clock step requested (software clock, not applied)");
        Ok(())
    }

    fn max_frequency_adjustment_ppb(&self) -> f64 {
        500_000.0
    }

    fn timestamp_precision_ns(&self) -> u32 {
        // Scheduling jitter dominates software receive timestamps.
        1_000_000
    }
}

/// Packet sink that queues frames for the node task.
///
/// The engine's send calls must not block; an unbounded channel makes
/// them a plain enqueue. The node task drains the queue and performs
/// the actual socket writes.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutboundFrame>,
}

impl ChannelSink {
    /// Create a sink and the receiving half for the node task.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn push(&self, channel: PtpChannel, frame: &[u8]) -> Result<(), IoError> {
        self.tx
            .send(OutboundFrame {
                channel,
                frame: Bytes::copy_from_slice(frame),
            })
            .map_err(|_| IoError::Closed)
    }
}

impl PacketSink for ChannelSink {
    fn send_event(&mut self, frame: &[u8]) -> Result<(), IoError> {
        self.push(PtpChannel::Event, frame)
    }

    fn send_general(&mut self, frame: &[u8]) -> Result<(), IoError> {
        self.push(PtpChannel::General, frame)
    }
}

/// Timer queue that forwards schedule/cancel to the node task's delay
/// wheel.
#[derive(Debug)]
pub struct ChannelTimerQueue {
    tx: mpsc::UnboundedSender<TimerCommand>,
}

impl ChannelTimerQueue {
    /// Create a queue and the receiving half for the node task.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TimerCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TimerQueue for ChannelTimerQueue {
    fn schedule(&mut self, handle: TimerHandle, after_ns: u64) {
        // A dropped receiver means the node is shutting down; the
        // engine will be torn down with it.
        let _ = self.tx.send(TimerCommand::Schedule(handle, after_ns));
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let _ = self.tx.send(TimerCommand::Cancel(handle));
    }
}
