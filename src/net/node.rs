//! Single-task UDP node.
//!
//! Owns the engine, both sockets, and the timer wheel, and drives all
//! of them from one `tokio::select!` loop. This is the canonical
//! implementation of the engine's calling contract: every packet,
//! timer expiration, and outbound frame passes through this task in
//! arrival order, so the engine is never entered concurrently.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio_util::time::delay_queue::{DelayQueue, Key};
use tracing::{debug, info, warn};

use super::{
    ChannelSink, ChannelTimerQueue, OutboundFrame, PtpChannel, SystemClock, TimerCommand,
    PTP_EVENT_PORT, PTP_GENERAL_PORT,
};
use crate::config::PtpConfig;
use crate::engine::PtpEngine;
use crate::error::PtpError;
use crate::hal::{ClockDevice, TimerHandle};

/// Errors from node startup.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Socket setup failed.
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
    /// The engine rejected its configuration.
    #[error(transparent)]
    Engine(#[from] PtpError),
}

/// Node socket configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Local address for the event socket (port 319 conventionally).
    pub event_bind: SocketAddr,
    /// Local address for the general socket (port 320 conventionally).
    pub general_bind: SocketAddr,
    /// Destination for event messages (peer or multicast group).
    pub event_dest: SocketAddr,
    /// Destination for general messages.
    pub general_dest: SocketAddr,
    /// Receive buffer size per socket.
    pub recv_buf_size: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            event_bind: SocketAddr::from(([0, 0, 0, 0], PTP_EVENT_PORT)),
            general_bind: SocketAddr::from(([0, 0, 0, 0], PTP_GENERAL_PORT)),
            // The conventional IPv4 multicast group.
            event_dest: SocketAddr::from(([224, 0, 1, 129], PTP_EVENT_PORT)),
            general_dest: SocketAddr::from(([224, 0, 1, 129], PTP_GENERAL_PORT)),
            recv_buf_size: 1500,
        }
    }
}

/// A protocol node: engine plus sockets plus timer wheel.
pub struct PtpNode {
    engine: PtpEngine,
    clock: SystemClock,
    event_socket: Arc<UdpSocket>,
    general_socket: Arc<UdpSocket>,
    outbound_rx: mpsc::UnboundedReceiver<OutboundFrame>,
    timer_rx: mpsc::UnboundedReceiver<TimerCommand>,
    wheel: DelayQueue<TimerHandle>,
    wheel_keys: HashMap<TimerHandle, Key>,
    config: NodeConfig,
}

impl PtpNode {
    /// Bind both sockets and bring up an engine on them.
    ///
    /// # Errors
    /// `NodeError::Io` if a socket fails to bind, `NodeError::Engine`
    /// if the protocol configuration is rejected.
    pub async fn bind(config: NodeConfig, ptp: PtpConfig) -> Result<Self, NodeError> {
        let event_socket = Arc::new(UdpSocket::bind(config.event_bind).await?);
        let general_socket = Arc::new(UdpSocket::bind(config.general_bind).await?);
        info!(
            event = %config.event_bind,
            general = %config.general_bind,
            "node sockets bound"
        );

        let (sink, outbound_rx) = ChannelSink::channel();
        let (timers, timer_rx) = ChannelTimerQueue::channel();
        let engine =
            PtpEngine::new(ptp, Box::new(SystemClock), Box::new(sink), Box::new(timers))?;

        Ok(Self {
            engine,
            clock: SystemClock,
            event_socket,
            general_socket,
            outbound_rx,
            timer_rx,
            wheel: DelayQueue::new(),
            wheel_keys: HashMap::new(),
            config,
        })
    }

    /// The engine, for state inspection between events.
    #[must_use]
    pub fn engine(&self) -> &PtpEngine {
        &self.engine
    }

    /// Run the node until `shutdown` flips to `true`.
    ///
    /// # Errors
    /// Returns the underlying `io::Error` on a non-transient socket
    /// failure.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> io::Result<()> {
        let mut event_buf = BytesMut::zeroed(self.config.recv_buf_size);
        let mut general_buf = BytesMut::zeroed(self.config.recv_buf_size);

        loop {
            // Evaluated before the select arms borrow the wheel: an
            // empty wheel's poll would report exhaustion, not pending.
            let wheel_active = !self.wheel.is_empty();
            tokio::select! {
                result = self.event_socket.recv_from(&mut event_buf[..]) => {
                    match result {
                        Ok((len, src)) => {
                            let rx = self.clock.now();
                            debug!(%src, len, "event frame received");
                            self.engine.handle_packet(&event_buf[..len], rx);
                        }
                        Err(e) if is_transient_udp_error(&e) => {
                            debug!("transient event socket error: {e}");
                        }
                        Err(e) => return Err(e),
                    }
                }

                result = self.general_socket.recv_from(&mut general_buf[..]) => {
                    match result {
                        Ok((len, src)) => {
                            let rx = self.clock.now();
                            debug!(%src, len, "general frame received");
                            self.engine.handle_packet(&general_buf[..len], rx);
                        }
                        Err(e) if is_transient_udp_error(&e) => {
                            debug!("transient general socket error: {e}");
                        }
                        Err(e) => return Err(e),
                    }
                }

                Some(outbound) = self.outbound_rx.recv() => {
                    self.transmit(outbound).await?;
                }

                Some(command) = self.timer_rx.recv() => {
                    self.apply_timer_command(command);
                }

                Some(expired) = std::future::poll_fn(|cx| self.wheel.poll_expired(cx)),
                    if wheel_active =>
                {
                    let handle = expired.into_inner();
                    self.wheel_keys.remove(&handle);
                    self.engine.handle_timer(handle);
                }

                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(state = %self.engine.state(), "node shutting down");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    async fn transmit(&self, outbound: OutboundFrame) -> io::Result<()> {
        let (socket, dest) = match outbound.channel {
            PtpChannel::Event => (&self.event_socket, self.config.event_dest),
            PtpChannel::General => (&self.general_socket, self.config.general_dest),
        };
        match socket.send_to(&outbound.frame, dest).await {
            Ok(_) => Ok(()),
            Err(e) if is_transient_udp_error(&e) => {
                warn!(%dest, "transient send error: {e}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn apply_timer_command(&mut self, command: TimerCommand) {
        match command {
            TimerCommand::Schedule(handle, after_ns) => {
                // Re-arming the same kind supersedes: the engine bumps
                // the generation, so the stale handle just never
                // matches when it fires. Still drop it from the wheel
                // if we can, to keep the wheel small.
                let key = self.wheel.insert(handle, Duration::from_nanos(after_ns));
                if let Some(old) = self.wheel_keys.insert(handle, key) {
                    let _ = self.wheel.try_remove(&old);
                }
            }
            TimerCommand::Cancel(handle) => {
                if let Some(key) = self.wheel_keys.remove(&handle) {
                    let _ = self.wheel.try_remove(&key);
                }
            }
        }
    }
}

/// Whether a UDP error is benign enough to keep running.
///
/// `recv_from` can surface a connection reset after a previous
/// `send_to` triggered an ICMP port-unreachable; the peer may simply
/// not be listening yet.
fn is_transient_udp_error(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::ConnectionReset
}
