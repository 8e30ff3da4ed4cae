use super::*;
use crate::hal::{ClockDevice, PacketSink, TimerHandle, TimerKind, TimerQueue};

// ===== Channel adapters =====

#[tokio::test]
async fn test_channel_sink_routes_by_channel() {
    let (mut sink, mut rx) = ChannelSink::channel();
    sink.send_event(&[1, 2, 3]).unwrap();
    sink.send_general(&[4, 5]).unwrap();

    let first = rx.recv().await.unwrap();
    assert_eq!(first.channel, PtpChannel::Event);
    assert_eq!(&first.frame[..], &[1, 2, 3]);

    let second = rx.recv().await.unwrap();
    assert_eq!(second.channel, PtpChannel::General);
    assert_eq!(&second.frame[..], &[4, 5]);
}

#[tokio::test]
async fn test_channel_sink_reports_closed_receiver() {
    let (mut sink, rx) = ChannelSink::channel();
    drop(rx);
    assert_eq!(sink.send_event(&[0]), Err(IoError::Closed));
}

#[tokio::test]
async fn test_channel_timer_queue_forwards_commands() {
    let (mut queue, mut rx) = ChannelTimerQueue::channel();
    let handle = TimerHandle {
        kind: TimerKind::AnnounceReceipt,
        generation: 1,
    };
    queue.schedule(handle, 42);
    queue.cancel(handle);

    match rx.recv().await.unwrap() {
        TimerCommand::Schedule(scheduled, after_ns) => {
            assert_eq!(scheduled, handle);
            assert_eq!(after_ns, 42);
        }
        TimerCommand::Cancel(_) => panic!("expected schedule first"),
    }
    assert!(matches!(
        rx.recv().await.unwrap(),
        TimerCommand::Cancel(cancelled) if cancelled == handle
    ));
}

// ===== System clock =====

#[test]
fn test_system_clock_is_monotonic_enough() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
    assert!(a.seconds() > 0, "the epoch is long past");
}

#[test]
fn test_system_clock_accepts_discipline_calls() {
    let mut clock = SystemClock;
    clock.adjust_frequency(12.5).unwrap();
    clock
        .step(crate::types::TimeInterval::from_nanos(100).unwrap())
        .unwrap();
}

// ===== Node configuration =====

#[test]
fn test_node_config_default_uses_standard_ports() {
    let config = NodeConfig::default();
    assert_eq!(config.event_bind.port(), PTP_EVENT_PORT);
    assert_eq!(config.general_bind.port(), PTP_GENERAL_PORT);
    assert_eq!(config.event_dest.port(), PTP_EVENT_PORT);
    assert_eq!(config.general_dest.port(), PTP_GENERAL_PORT);
}
