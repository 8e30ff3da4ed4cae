//! # ptpkit
//!
//! A pure Rust IEEE 1588 precision time protocol engine.
//!
//! The crate implements the protocol core of an ordinary clock: the
//! binary message codec, the best master clock algorithm (BMCA), the
//! port state machine, and the offset estimator with its PI servo.
//! Hardware access (sockets, timers, the disciplined clock itself) sits
//! behind the [`hal`] traits and is injected at initialization.
//!
//! ## Clock Synchronization Flow
//!
//! ```text
//! Master                          Slave
//!   |--- Sync (T1) ----------------->|  (slave records T2)
//!   |--- Follow_Up (precise T1) ---->|
//!   |                                |
//!   |<---- Delay_Req (T3) ---------- |
//!   |---- Delay_Resp (T4) --------->|
//!   |                                |
//!   |  offset = ((T2-T1)-(T4-T3))/2 |
//!   |  delay  = ((T2-T1)+(T4-T3))/2 |
//! ```
//!
//! ## Example
//!
//! ```rust
//! use ptpkit::config::{PtpConfig, ServoConfig};
//! use ptpkit::engine::PtpEngine;
//! use ptpkit::testing::{ManualClock, ManualTimerQueue, RecordingSink};
//! use ptpkit::types::ClockIdentity;
//!
//! # fn example() -> Result<(), ptpkit::PtpError> {
//! let config = PtpConfig::builder()
//!     .clock_identity(ClockIdentity::from_eui48([0x00, 0x1B, 0x21, 0x8E, 0x1F, 0x02]))
//!     .servo(ServoConfig::new(0.7, 0.3))
//!     .build()?;
//!
//! let mut engine = PtpEngine::new(
//!     config,
//!     Box::new(ManualClock::new()),
//!     Box::new(RecordingSink::new()),
//!     Box::new(ManualTimerQueue::new()),
//! )?;
//!
//! // Feed received packets and fired timers into the engine:
//! // engine.handle_packet(&bytes, rx_timestamp);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The core is a single-threaded, event-driven state machine. Every
//! entry point on [`engine::PtpEngine`] runs to completion without
//! blocking or allocating, and the engine must only ever be driven from
//! one logical execution context — applications with multiple threads
//! must serialize all events through a single queue. The optional
//! [`net`] module (feature `tokio-runtime`) provides exactly that: a
//! single-task UDP event loop.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Best master clock algorithm
pub mod bmca;
/// Configuration surface
pub mod config;
/// Protocol datasets
pub mod datasets;
/// Protocol engine
pub mod engine;
/// Error types
pub mod error;
/// Hardware abstraction contract
pub mod hal;
/// Port state machine
pub mod port;
/// Wire format codec
pub mod protocol;
/// Offset estimation and clock servo
pub mod sync;
/// Core types
pub mod types;

/// Testing utilities
pub mod testing;

#[cfg(feature = "tokio-runtime")]
pub mod net;

// Re-exports
pub use bmca::{PriorityVector, RoleRecommendation};
pub use config::{PtpConfig, ServoConfig};
pub use engine::PtpEngine;
pub use error::PtpError;
pub use port::{PortEvent, PortState};
pub use protocol::{DecodeError, EncodeError, Message, MessageType};
pub use types::{ClockIdentity, ClockQuality, PortIdentity, TimeInterval, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
///
/// Convenient re-exports
pub mod prelude {
    pub use crate::{
        ClockIdentity, ClockQuality, Message, MessageType, PortIdentity, PortState, PtpConfig,
        PtpEngine, PtpError, RoleRecommendation, ServoConfig, TimeInterval, Timestamp,
    };
}
