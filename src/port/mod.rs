//! Port state machine.
//!
//! The transition table is a pure function over (state, event) with no
//! side effects; the engine layers timer scheduling and role-change
//! notifications on top of it. An event with no defined transition for
//! the current state is a logged no-op, never a fault: malformed
//! events are a calling-contract violation caught earlier in the
//! pipeline.

#[cfg(test)]
mod tests;

use tracing::trace;

/// States of a protocol port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortState {
    /// Datasets are being initialized; no protocol traffic.
    Initializing,
    /// A hardware or internal failure is latched; requires clearance.
    Faulty,
    /// Administratively disabled; only configuration re-enables.
    Disabled,
    /// Listening for announcements, no role yet.
    Listening,
    /// Master-elect, waiting out the qualification delay.
    PreMaster,
    /// Sourcing time: transmitting announce and sync.
    Master,
    /// Neither master nor slave (tied or pre-empted).
    Passive,
    /// Synchronizing to a parent but not yet calibrated.
    Uncalibrated,
    /// Calibrated and tracking the parent.
    Slave,
}

impl PortState {
    /// Whether this port is consuming time from a parent.
    #[must_use]
    pub fn is_slave(&self) -> bool {
        matches!(self, Self::Slave | Self::Uncalibrated)
    }

    /// Whether this port is sourcing time.
    #[must_use]
    pub fn is_master(&self) -> bool {
        matches!(self, Self::Master)
    }

    /// Whether announcements should be evaluated in this state.
    #[must_use]
    pub fn runs_selection(&self) -> bool {
        matches!(
            self,
            Self::Listening
                | Self::PreMaster
                | Self::Master
                | Self::Passive
                | Self::Uncalibrated
                | Self::Slave
        )
    }
}

impl std::fmt::Display for PortState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initializing => "INITIALIZING",
            Self::Faulty => "FAULTY",
            Self::Disabled => "DISABLED",
            Self::Listening => "LISTENING",
            Self::PreMaster => "PRE_MASTER",
            Self::Master => "MASTER",
            Self::Passive => "PASSIVE",
            Self::Uncalibrated => "UNCALIBRATED",
            Self::Slave => "SLAVE",
        };
        write!(f, "{name}")
    }
}

/// Events driving the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortEvent {
    /// Dataset initialization finished.
    Initialized,
    /// An internal invariant or hardware access failed.
    FaultDetected,
    /// Administrative or self-diagnostic fault clearance.
    FaultCleared,
    /// Port administratively enabled.
    DesignatedEnabled,
    /// Port administratively disabled.
    DesignatedDisabled,
    /// Selector recommends mastering.
    RecommendedMaster,
    /// Selector recommends synchronizing to a parent.
    RecommendedSlave,
    /// Selector recommends going passive.
    RecommendedPassive,
    /// No announce arrived from the parent within the timeout.
    AnnounceReceiptTimeout,
    /// Offset samples stopped qualifying.
    SynchronizationFault,
    /// Master qualification delay elapsed.
    QualificationTimeout,
    /// Enough stable offset samples to declare calibration.
    Calibrated,
}

/// The transition table.
///
/// Returns the successor state, or `None` when the event has no
/// defined transition from `state`.
#[must_use]
pub fn transition(state: PortState, event: PortEvent) -> Option<PortState> {
    use PortEvent as E;
    use PortState as S;

    let next = match state {
        S::Initializing => match event {
            E::Initialized => S::Listening,
            E::FaultDetected => S::Faulty,
            E::DesignatedDisabled => S::Disabled,
            _ => return None,
        },
        S::Faulty => match event {
            E::FaultCleared => S::Initializing,
            E::DesignatedDisabled => S::Disabled,
            _ => return None,
        },
        S::Disabled => match event {
            E::DesignatedEnabled => S::Listening,
            _ => return None,
        },
        S::Listening => match event {
            E::RecommendedMaster => S::PreMaster,
            E::RecommendedSlave => S::Uncalibrated,
            E::RecommendedPassive => S::Passive,
            E::FaultDetected => S::Faulty,
            E::DesignatedDisabled => S::Disabled,
            _ => return None,
        },
        S::PreMaster => match event {
            E::QualificationTimeout => S::Master,
            E::RecommendedSlave => S::Uncalibrated,
            E::RecommendedPassive => S::Passive,
            E::FaultDetected => S::Faulty,
            E::DesignatedDisabled => S::Disabled,
            _ => return None,
        },
        S::Master => match event {
            E::RecommendedSlave => S::Uncalibrated,
            E::RecommendedPassive => S::Passive,
            E::FaultDetected => S::Faulty,
            E::DesignatedDisabled => S::Disabled,
            _ => return None,
        },
        S::Passive => match event {
            E::RecommendedMaster => S::PreMaster,
            E::RecommendedSlave => S::Uncalibrated,
            E::FaultDetected => S::Faulty,
            E::DesignatedDisabled => S::Disabled,
            _ => return None,
        },
        S::Uncalibrated => match event {
            E::RecommendedMaster => S::PreMaster,
            E::RecommendedPassive => S::Passive,
            E::Calibrated => S::Slave,
            E::SynchronizationFault | E::AnnounceReceiptTimeout => S::Listening,
            E::FaultDetected => S::Faulty,
            E::DesignatedDisabled => S::Disabled,
            _ => return None,
        },
        S::Slave => match event {
            E::RecommendedMaster => S::PreMaster,
            E::RecommendedPassive => S::Passive,
            E::SynchronizationFault => S::Uncalibrated,
            E::AnnounceReceiptTimeout => S::Listening,
            E::FaultDetected => S::Faulty,
            E::DesignatedDisabled => S::Disabled,
            _ => return None,
        },
    };

    if next == state {
        trace!(%state, ?event, "event re-enters current state");
    }
    Some(next)
}
