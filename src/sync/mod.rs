//! Offset estimation and clock discipline.
//!
//! The estimator assembles the four timestamps of a synchronization
//! cycle into an offset/delay sample in the fixed-point domain; the
//! servo converts accepted samples into bounded frequency corrections
//! or, for large offsets, a one-time clock step.

mod estimator;
mod servo;


pub use estimator::{OffsetEstimator, OffsetSample};
pub use servo::{PiServo, ServoOutput, ServoState};
