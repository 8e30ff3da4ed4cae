//! Configuration surface.
//!
//! Everything here is read once at initialization into the dataset
//! store's default record and re-read only through the engine's
//! explicit reconfiguration call — protocol logic never mutates it.
//! Invalid bounds are fatal at startup: the engine refuses to enter
//! `Listening` with a configuration it cannot honor.

use serde::{Deserialize, Serialize};

use crate::datasets::MAX_FOREIGN_SOURCES;
use crate::types::{ClockIdentity, ClockQuality};

/// Errors from configuration validation. Fatal at startup, not
/// recoverable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A field is outside its permitted range.
    #[error("invalid configuration: {field} {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// The servo configuration was never supplied.
    ///
    /// There is no validated default tuning; `kp`/`ki` must come from
    /// the operator.
    #[error("servo configuration is required")]
    MissingServo,
}

/// Servo gains and bounds.
///
/// Deliberately has no `Default`: gain values depend on the sync
/// interval and oscillator and must be supplied (or empirically
/// tuned), not assumed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServoConfig {
    /// Proportional gain (ppb per nanosecond of offset).
    pub kp: f64,
    /// Integral gain (ppb per accumulated nanosecond-second).
    pub ki: f64,
    /// Anti-windup clamp on the integral accumulator.
    pub integral_limit: f64,
    /// Offsets above this magnitude request a clock step instead of a
    /// frequency slew (nanoseconds).
    pub step_threshold_ns: f64,
    /// Upper bound on requested frequency adjustment; further clamped
    /// to the hardware's declared range.
    pub max_frequency_ppb: f64,
    /// Offset magnitude below which the servo counts toward lock
    /// (nanoseconds).
    pub lock_threshold_ns: f64,
    /// Offset magnitude above which a locked servo unlocks
    /// (nanoseconds).
    pub unlock_threshold_ns: f64,
    /// Consecutive in-threshold samples required to declare lock.
    pub samples_for_lock: u32,
    /// Optional limit on output change per update (ppb); `None`
    /// disables rate limiting.
    pub max_slew_rate_ppb: Option<f64>,
}

impl ServoConfig {
    /// Create a servo configuration from the two required gains, with
    /// conservative bounds for everything else.
    #[must_use]
    pub fn new(kp: f64, ki: f64) -> Self {
        Self {
            kp,
            ki,
            integral_limit: 100_000_000.0,
            step_threshold_ns: 1_000_000.0,
            max_frequency_ppb: 100_000.0,
            lock_threshold_ns: 1_000.0,
            unlock_threshold_ns: 10_000.0,
            samples_for_lock: 5,
            max_slew_rate_ppb: None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive_finite = |v: f64| v.is_finite() && v > 0.0;
        if !positive_finite(self.kp) {
            return Err(ConfigError::Invalid {
                field: "servo.kp",
                reason: "must be finite and positive",
            });
        }
        if !self.ki.is_finite() || self.ki < 0.0 {
            return Err(ConfigError::Invalid {
                field: "servo.ki",
                reason: "must be finite and non-negative",
            });
        }
        if !positive_finite(self.integral_limit) {
            return Err(ConfigError::Invalid {
                field: "servo.integral_limit",
                reason: "must be finite and positive",
            });
        }
        if !positive_finite(self.step_threshold_ns) {
            return Err(ConfigError::Invalid {
                field: "servo.step_threshold_ns",
                reason: "must be finite and positive",
            });
        }
        if !positive_finite(self.max_frequency_ppb) {
            return Err(ConfigError::Invalid {
                field: "servo.max_frequency_ppb",
                reason: "must be finite and positive",
            });
        }
        if !positive_finite(self.lock_threshold_ns) {
            return Err(ConfigError::Invalid {
                field: "servo.lock_threshold_ns",
                reason: "must be finite and positive",
            });
        }
        if self.unlock_threshold_ns < self.lock_threshold_ns {
            return Err(ConfigError::Invalid {
                field: "servo.unlock_threshold_ns",
                reason: "must be at least lock_threshold_ns",
            });
        }
        if self.samples_for_lock == 0 {
            return Err(ConfigError::Invalid {
                field: "servo.samples_for_lock",
                reason: "must be at least 1",
            });
        }
        if let Some(rate) = self.max_slew_rate_ppb {
            if !positive_finite(rate) {
                return Err(ConfigError::Invalid {
                    field: "servo.max_slew_rate_ppb",
                    reason: "must be finite and positive",
                });
            }
        }
        Ok(())
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PtpConfig {
    /// Identity of this clock. May start unassigned, in which case the
    /// selector keeps recommending `Listening` until a reconfiguration
    /// supplies one.
    pub clock_identity: ClockIdentity,
    /// Port number of the single engine port (1-based).
    pub port_number: u16,
    /// Protocol domain to participate in.
    pub domain_number: u8,
    /// First-tier selection priority (lower wins).
    pub priority1: u8,
    /// Second-tier selection priority (lower wins).
    pub priority2: u8,
    /// This clock's advertised quality.
    pub clock_quality: ClockQuality,
    /// Log2 seconds between announce transmissions.
    pub log_announce_interval: i8,
    /// Log2 seconds between sync transmissions.
    pub log_sync_interval: i8,
    /// Log2 seconds between delay-request transmissions.
    pub log_min_delay_req_interval: i8,
    /// Announce-receipt timeout in multiples of the announce interval.
    pub announce_receipt_timeout: u8,
    /// Consecutive accepted offset samples before an uncalibrated port
    /// declares itself a slave.
    pub qualification_samples: u8,
    /// Runtime limit on tracked foreign sources.
    pub max_foreign_sources: usize,
    /// Offsets above this magnitude are discarded as outliers
    /// (nanoseconds).
    pub offset_outlier_ns: i64,
    /// Relative path-delay change that triggers a warning.
    pub path_delay_warn_ratio: f64,
    /// Servo gains and bounds. Required.
    pub servo: ServoConfig,
}

impl PtpConfig {
    /// Start building a configuration.
    #[must_use]
    pub fn builder() -> PtpConfigBuilder {
        PtpConfigBuilder::default()
    }

    /// Validate all bounds.
    ///
    /// # Errors
    /// `ConfigError` naming the offending field. Validation failure is
    /// fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port_number == 0 {
            return Err(ConfigError::Invalid {
                field: "port_number",
                reason: "must be at least 1",
            });
        }
        for (field, value) in [
            ("log_announce_interval", self.log_announce_interval),
            ("log_sync_interval", self.log_sync_interval),
            ("log_min_delay_req_interval", self.log_min_delay_req_interval),
        ] {
            if !(-4..=4).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "log interval outside -4..=4",
                });
            }
        }
        if self.announce_receipt_timeout < 2 {
            return Err(ConfigError::Invalid {
                field: "announce_receipt_timeout",
                reason: "must be at least 2 intervals",
            });
        }
        if self.qualification_samples == 0 {
            return Err(ConfigError::Invalid {
                field: "qualification_samples",
                reason: "must be at least 1",
            });
        }
        if self.max_foreign_sources == 0 || self.max_foreign_sources > MAX_FOREIGN_SOURCES {
            return Err(ConfigError::Invalid {
                field: "max_foreign_sources",
                reason: "must be between 1 and the table capacity",
            });
        }
        if self.offset_outlier_ns <= 0 {
            return Err(ConfigError::Invalid {
                field: "offset_outlier_ns",
                reason: "must be positive",
            });
        }
        if !self.path_delay_warn_ratio.is_finite() || self.path_delay_warn_ratio <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "path_delay_warn_ratio",
                reason: "must be finite and positive",
            });
        }
        self.servo.validate()
    }
}

/// Builder for [`PtpConfig`].
///
/// All fields except the servo carry conventional defaults; the servo
/// must be supplied explicitly.
#[derive(Debug, Clone, Default)]
pub struct PtpConfigBuilder {
    clock_identity: ClockIdentity,
    port_number: Option<u16>,
    domain_number: u8,
    priority1: Option<u8>,
    priority2: Option<u8>,
    clock_quality: Option<ClockQuality>,
    log_announce_interval: Option<i8>,
    log_sync_interval: Option<i8>,
    log_min_delay_req_interval: Option<i8>,
    announce_receipt_timeout: Option<u8>,
    qualification_samples: Option<u8>,
    max_foreign_sources: Option<usize>,
    offset_outlier_ns: Option<i64>,
    path_delay_warn_ratio: Option<f64>,
    servo: Option<ServoConfig>,
}

impl PtpConfigBuilder {
    /// Set the clock identity.
    #[must_use]
    pub fn clock_identity(mut self, identity: ClockIdentity) -> Self {
        self.clock_identity = identity;
        self
    }

    /// Set the port number (default 1).
    #[must_use]
    pub fn port_number(mut self, port: u16) -> Self {
        self.port_number = Some(port);
        self
    }

    /// Set the domain number (default 0).
    #[must_use]
    pub fn domain_number(mut self, domain: u8) -> Self {
        self.domain_number = domain;
        self
    }

    /// Set priority1 (default 128).
    #[must_use]
    pub fn priority1(mut self, priority: u8) -> Self {
        self.priority1 = Some(priority);
        self
    }

    /// Set priority2 (default 128).
    #[must_use]
    pub fn priority2(mut self, priority: u8) -> Self {
        self.priority2 = Some(priority);
        self
    }

    /// Set the advertised clock quality.
    #[must_use]
    pub fn clock_quality(mut self, quality: ClockQuality) -> Self {
        self.clock_quality = Some(quality);
        self
    }

    /// Set the log2 announce interval (default 1, i.e. 2 s).
    #[must_use]
    pub fn log_announce_interval(mut self, log: i8) -> Self {
        self.log_announce_interval = Some(log);
        self
    }

    /// Set the log2 sync interval (default 0, i.e. 1 s).
    #[must_use]
    pub fn log_sync_interval(mut self, log: i8) -> Self {
        self.log_sync_interval = Some(log);
        self
    }

    /// Set the log2 delay-request interval (default 0).
    #[must_use]
    pub fn log_min_delay_req_interval(mut self, log: i8) -> Self {
        self.log_min_delay_req_interval = Some(log);
        self
    }

    /// Set the announce-receipt timeout multiplier (default 3).
    #[must_use]
    pub fn announce_receipt_timeout(mut self, multiples: u8) -> Self {
        self.announce_receipt_timeout = Some(multiples);
        self
    }

    /// Set the calibration sample requirement (default 3).
    #[must_use]
    pub fn qualification_samples(mut self, samples: u8) -> Self {
        self.qualification_samples = Some(samples);
        self
    }

    /// Set the foreign-source limit (default: table capacity).
    #[must_use]
    pub fn max_foreign_sources(mut self, limit: usize) -> Self {
        self.max_foreign_sources = Some(limit);
        self
    }

    /// Set the offset outlier bound in nanoseconds (default 1 s).
    #[must_use]
    pub fn offset_outlier_ns(mut self, bound: i64) -> Self {
        self.offset_outlier_ns = Some(bound);
        self
    }

    /// Set the path-delay warning ratio (default 0.1).
    #[must_use]
    pub fn path_delay_warn_ratio(mut self, ratio: f64) -> Self {
        self.path_delay_warn_ratio = Some(ratio);
        self
    }

    /// Supply the servo configuration (required).
    #[must_use]
    pub fn servo(mut self, servo: ServoConfig) -> Self {
        self.servo = Some(servo);
        self
    }

    /// Build and validate.
    ///
    /// # Errors
    /// `ConfigError::MissingServo` if no servo configuration was
    /// supplied, otherwise any bound violation from
    /// [`PtpConfig::validate`].
    pub fn build(self) -> Result<PtpConfig, ConfigError> {
        let built = PtpConfig {
            clock_identity: self.clock_identity,
            port_number: self.port_number.unwrap_or(1),
            domain_number: self.domain_number,
            priority1: self.priority1.unwrap_or(128),
            priority2: self.priority2.unwrap_or(128),
            clock_quality: self.clock_quality.unwrap_or_default(),
            log_announce_interval: self.log_announce_interval.unwrap_or(1),
            log_sync_interval: self.log_sync_interval.unwrap_or(0),
            log_min_delay_req_interval: self.log_min_delay_req_interval.unwrap_or(0),
            announce_receipt_timeout: self.announce_receipt_timeout.unwrap_or(3),
            qualification_samples: self.qualification_samples.unwrap_or(3),
            max_foreign_sources: self.max_foreign_sources.unwrap_or(MAX_FOREIGN_SOURCES),
            offset_outlier_ns: self.offset_outlier_ns.unwrap_or(1_000_000_000),
            path_delay_warn_ratio: self.path_delay_warn_ratio.unwrap_or(0.1),
            servo: self.servo.ok_or(ConfigError::MissingServo)?,
        };
        built.validate()?;
        Ok(built)
    }
}
