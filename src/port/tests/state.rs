use crate::port::{transition, PortEvent, PortState};
use crate::port::{PortEvent as E, PortState as S};

const ALL_STATES: [PortState; 9] = [
    S::Initializing,
    S::Faulty,
    S::Disabled,
    S::Listening,
    S::PreMaster,
    S::Master,
    S::Passive,
    S::Uncalibrated,
    S::Slave,
];

const ALL_EVENTS: [PortEvent; 12] = [
    E::Initialized,
    E::FaultDetected,
    E::FaultCleared,
    E::DesignatedEnabled,
    E::DesignatedDisabled,
    E::RecommendedMaster,
    E::RecommendedSlave,
    E::RecommendedPassive,
    E::AnnounceReceiptTimeout,
    E::SynchronizationFault,
    E::QualificationTimeout,
    E::Calibrated,
];

// ===== Startup path =====

#[test]
fn test_initializing_to_listening() {
    assert_eq!(transition(S::Initializing, E::Initialized), Some(S::Listening));
}

#[test]
fn test_listening_role_recommendations() {
    assert_eq!(
        transition(S::Listening, E::RecommendedMaster),
        Some(S::PreMaster)
    );
    assert_eq!(
        transition(S::Listening, E::RecommendedSlave),
        Some(S::Uncalibrated)
    );
    assert_eq!(
        transition(S::Listening, E::RecommendedPassive),
        Some(S::Passive)
    );
}

// ===== Master qualification =====

#[test]
fn test_pre_master_qualifies_into_master() {
    assert_eq!(
        transition(S::PreMaster, E::QualificationTimeout),
        Some(S::Master)
    );
}

#[test]
fn test_pre_master_preempted_by_better_source() {
    assert_eq!(
        transition(S::PreMaster, E::RecommendedSlave),
        Some(S::Uncalibrated)
    );
}

#[test]
fn test_master_never_enters_slave_directly() {
    // A master demoted by the selector goes through UNCALIBRATED.
    assert_eq!(
        transition(S::Master, E::RecommendedSlave),
        Some(S::Uncalibrated)
    );
    assert_eq!(transition(S::Master, E::Calibrated), None);
}

// ===== Slave path =====

#[test]
fn test_uncalibrated_calibrates_into_slave() {
    assert_eq!(transition(S::Uncalibrated, E::Calibrated), Some(S::Slave));
}

#[test]
fn test_slave_is_never_entered_from_listening_directly() {
    for event in ALL_EVENTS {
        assert_ne!(
            transition(S::Listening, event),
            Some(S::Slave),
            "{event:?} must not jump straight to SLAVE"
        );
    }
}

#[test]
fn test_announce_timeout_returns_slave_to_listening() {
    assert_eq!(
        transition(S::Slave, E::AnnounceReceiptTimeout),
        Some(S::Listening)
    );
    assert_eq!(
        transition(S::Uncalibrated, E::AnnounceReceiptTimeout),
        Some(S::Listening)
    );
}

#[test]
fn test_synchronization_fault_degrades_gracefully() {
    assert_eq!(
        transition(S::Slave, E::SynchronizationFault),
        Some(S::Uncalibrated)
    );
    assert_eq!(
        transition(S::Uncalibrated, E::SynchronizationFault),
        Some(S::Listening)
    );
}

// ===== Faults =====

#[test]
fn test_faulty_is_recoverable_not_terminal() {
    assert_eq!(transition(S::Faulty, E::FaultCleared), Some(S::Initializing));
}

#[test]
fn test_fault_detected_from_operational_states() {
    for state in [S::Listening, S::PreMaster, S::Master, S::Passive, S::Uncalibrated, S::Slave] {
        assert_eq!(transition(state, E::FaultDetected), Some(S::Faulty));
    }
}

#[test]
fn test_faulty_ignores_role_recommendations() {
    assert_eq!(transition(S::Faulty, E::RecommendedMaster), None);
    assert_eq!(transition(S::Faulty, E::RecommendedSlave), None);
    assert_eq!(transition(S::Faulty, E::AnnounceReceiptTimeout), None);
}

// ===== Administrative states =====

#[test]
fn test_disabled_only_reachable_administratively() {
    for state in ALL_STATES {
        for event in ALL_EVENTS {
            if transition(state, event) == Some(S::Disabled) {
                assert_eq!(
                    event,
                    E::DesignatedDisabled,
                    "{state:?} reached DISABLED via {event:?}"
                );
            }
        }
    }
}

#[test]
fn test_disabled_recovers_only_via_enable() {
    for event in ALL_EVENTS {
        let next = transition(S::Disabled, event);
        if event == E::DesignatedEnabled {
            assert_eq!(next, Some(S::Listening));
        } else {
            assert_eq!(next, None, "{event:?} must be a no-op in DISABLED");
        }
    }
}

// ===== Undefined transitions are no-ops =====

#[test]
fn test_undefined_pairs_are_none_never_panic() {
    for state in ALL_STATES {
        for event in ALL_EVENTS {
            // Must not panic; None means logged no-op at the engine.
            let _ = transition(state, event);
        }
    }
}

#[test]
fn test_qualification_timeout_only_matters_in_pre_master() {
    for state in ALL_STATES {
        let next = transition(state, E::QualificationTimeout);
        if state == S::PreMaster {
            assert_eq!(next, Some(S::Master));
        } else {
            assert_eq!(next, None);
        }
    }
}

// ===== State predicates =====

#[test]
fn test_state_predicates() {
    assert!(S::Slave.is_slave());
    assert!(S::Uncalibrated.is_slave());
    assert!(!S::Master.is_slave());
    assert!(S::Master.is_master());
    assert!(!S::PreMaster.is_master());
}

#[test]
fn test_selection_runs_in_operational_states_only() {
    for state in [S::Initializing, S::Faulty, S::Disabled] {
        assert!(!state.runs_selection());
    }
    for state in [S::Listening, S::PreMaster, S::Master, S::Passive, S::Uncalibrated, S::Slave] {
        assert!(state.runs_selection());
    }
}
