//! Proportional-integral clock servo.
//!
//! Converts accepted offset samples into frequency corrections in
//! parts-per-billion. The integral term carries an anti-windup clamp,
//! the output is clamped to the hardware's declared adjustment range,
//! and offsets beyond the step threshold bypass frequency correction
//! entirely in favor of a one-time clock step.

use tracing::{debug, info};

use crate::config::ServoConfig;
use crate::types::TimeInterval;

/// Lock progression of the servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoState {
    /// Offset large or no samples yet; converging.
    Unlocked,
    /// Offset inside the lock threshold, accumulating samples.
    Locking,
    /// Stable synchronization achieved.
    Locked,
}

/// Correction requested from the clock hardware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServoOutput {
    /// Adjust clock frequency by this many parts-per-billion.
    Slew {
        /// Frequency adjustment, already clamped to the output limit.
        ppb: f64,
    },
    /// Step the clock by the full offset instead of slewing.
    Step {
        /// The offset to step away (local minus parent).
        offset: TimeInterval,
    },
}

/// PI controller over offset samples.
#[derive(Debug, Clone)]
pub struct PiServo {
    config: ServoConfig,
    /// Effective output bound: the smaller of the configured and the
    /// hardware-declared frequency range.
    output_limit_ppb: f64,
    /// Accumulated `offset_ns x dt` integral term input.
    integral: f64,
    state: ServoState,
    samples_in_threshold: u32,
    last_output_ppb: f64,
    lock_losses: u32,
}

impl PiServo {
    /// Create a servo from validated configuration and the hardware's
    /// declared frequency-adjustment range.
    #[must_use]
    pub fn new(config: ServoConfig, hardware_range_ppb: f64) -> Self {
        let output_limit_ppb = config.max_frequency_ppb.min(hardware_range_ppb);
        Self {
            config,
            output_limit_ppb,
            integral: 0.0,
            state: ServoState::Unlocked,
            samples_in_threshold: 0,
            last_output_ppb: 0.0,
            lock_losses: 0,
        }
    }

    /// Feed one accepted offset sample.
    ///
    /// `dt_secs` is the elapsed time since the previous sample (the
    /// sync interval under nominal conditions).
    pub fn update(&mut self, offset: TimeInterval, dt_secs: f64) -> ServoOutput {
        let offset_ns = offset.as_nanos_f64();
        self.update_lock_state(offset_ns);

        // Large offsets converge impossibly slowly through frequency
        // skew; step once instead, unless already locked.
        if offset_ns.abs() > self.config.step_threshold_ns && self.state != ServoState::Locked {
            info!(offset_ns, "offset beyond step threshold, requesting clock step");
            self.integral = 0.0;
            self.last_output_ppb = 0.0;
            self.samples_in_threshold = 0;
            return ServoOutput::Step { offset };
        }

        self.integral += offset_ns * dt_secs;
        // Anti-windup: clamp the accumulator, not just the output.
        self.integral = self
            .integral
            .clamp(-self.config.integral_limit, self.config.integral_limit);

        let mut ppb = self.config.kp * offset_ns + self.config.ki * self.integral;

        if let Some(max_rate) = self.config.max_slew_rate_ppb {
            let delta = ppb - self.last_output_ppb;
            if delta.abs() > max_rate {
                ppb = self.last_output_ppb + max_rate.copysign(delta);
                debug!(ppb, "slew rate limited");
            }
        }

        ppb = ppb.clamp(-self.output_limit_ppb, self.output_limit_ppb);
        self.last_output_ppb = ppb;
        ServoOutput::Slew { ppb }
    }

    fn update_lock_state(&mut self, offset_ns: f64) {
        let abs = offset_ns.abs();
        let old = self.state;
        if abs < self.config.lock_threshold_ns {
            self.samples_in_threshold = self.samples_in_threshold.saturating_add(1);
            if self.samples_in_threshold >= self.config.samples_for_lock {
                self.state = ServoState::Locked;
            } else if self.state != ServoState::Locked {
                self.state = ServoState::Locking;
            }
        } else {
            self.samples_in_threshold = 0;
            if abs > self.config.unlock_threshold_ns {
                if self.state == ServoState::Locked {
                    self.lock_losses += 1;
                }
                self.state = ServoState::Unlocked;
            }
            // Between the thresholds a locked servo stays locked
            // (hysteresis); an unlocked one keeps converging.
        }
        if old != self.state {
            info!(from = ?old, to = ?self.state, "servo lock state changed");
            if self.state == ServoState::Unlocked {
                // Stale integral no longer describes the new regime.
                self.integral = 0.0;
            }
        }
    }

    /// Reset controller state (role or parent change).
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.state = ServoState::Unlocked;
        self.samples_in_threshold = 0;
        self.last_output_ppb = 0.0;
    }

    /// Current lock state.
    #[must_use]
    pub fn state(&self) -> ServoState {
        self.state
    }

    /// Current integral accumulator (for observability and tests).
    #[must_use]
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Most recent frequency output in parts-per-billion.
    #[must_use]
    pub fn last_output_ppb(&self) -> f64 {
        self.last_output_ppb
    }

    /// Times the servo fell out of lock.
    #[must_use]
    pub fn lock_losses(&self) -> u32 {
        self.lock_losses
    }
}
