//! Connection lifecycle observed through published events.

mod common;

use std::{sync::Arc, time::Duration};

use common::{TestResult, within};
use peerlink::{
    Address,
    ConnectionState,
    Event,
    ReconnectPolicy,
    Session,
    SessionConfig,
    SimulatedTransport,
    Timings,
    simulated::Call,
};
use peerlink_testing::{EventRecorder, LAMP_ADDRESS, echo_transport, lamp_device, session_config};
use rstest::rstest;
use tokio::time::Instant;

fn is_connect(event: &Event) -> bool { matches!(event, Event::Connected { .. }) }

#[rstest]
#[tokio::test(start_paused = true)]
async fn session_connects_without_being_asked(
    session_config: SessionConfig,
    echo_transport: Arc<SimulatedTransport>,
) -> TestResult {
    let recorder = EventRecorder::new();
    let started = Instant::now();
    let session = Session::start(session_config, echo_transport.clone(), recorder.clone());

    let event = within(recorder.wait_for(is_connect)).await?;

    assert_eq!(
        event,
        Event::Connected {
            peer: Address::from(LAMP_ADDRESS)
        }
    );
    assert_eq!(session.state(), ConnectionState::Connected);
    assert!(started.elapsed() >= Duration::from_millis(2500));
    session.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn custom_timings_shorten_settling(echo_transport: Arc<SimulatedTransport>) -> TestResult {
    let config = SessionConfig::builder()
        .identifier("test.fast")
        .timings(Timings {
            connect_settle: Duration::from_millis(10),
            discover_settle: Duration::from_millis(20),
        })
        .build()?;
    let recorder = EventRecorder::new();
    let started = Instant::now();
    let session = Session::start(config, echo_transport, recorder.clone());

    within(recorder.wait_for(is_connect)).await?;

    assert_eq!(started.elapsed(), Duration::from_millis(30));
    session.shutdown().await;
    Ok(())
}

#[rstest]
#[case::fixed(ReconnectPolicy::default(), 1000 + 4 * 100 + 1500)]
#[case::backoff(
    ReconnectPolicy {
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(400),
    },
    1000 + 100 + 200 + 400 + 400 + 1500
)]
#[tokio::test(start_paused = true)]
async fn reconnect_policy_paces_the_loop(
    #[case] policy: ReconnectPolicy,
    #[case] expected_ms: u64,
) -> TestResult {
    let config = SessionConfig::builder()
        .identifier("test.backoff")
        .reconnect(policy)
        .build()?;
    let transport = Arc::new(SimulatedTransport::new().with_device(lamp_device().refusing(4)));
    let recorder = EventRecorder::new();
    let started = Instant::now();
    let session = Session::start(config, transport.clone(), recorder.clone());

    within(recorder.wait_for(is_connect)).await?;

    let peer = Address::from(LAMP_ADDRESS);
    assert_eq!(started.elapsed(), Duration::from_millis(expected_ms));
    assert_eq!(transport.count_calls(|c| *c == Call::Reconnect(peer.clone())), 4);
    assert_eq!(transport.count_calls(|c| *c == Call::Connect(peer.clone())), 1);
    session.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn dropped_link_publishes_disconnect_then_reconnects(
    session_config: SessionConfig,
    echo_transport: Arc<SimulatedTransport>,
) -> TestResult {
    let recorder = EventRecorder::new();
    let session = Session::start(session_config, echo_transport.clone(), recorder.clone());
    let peer = within(session.when_connected()).await??;

    echo_transport.drop_link(&peer);
    within(recorder.wait_for_count(2, is_connect)).await?;

    assert_eq!(recorder.names(), ["connect", "disconnect", "connect"]);
    assert_eq!(session.peer(), Some(peer));
    session.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn disconnects_from_other_devices_are_ignored(
    session_config: SessionConfig,
    echo_transport: Arc<SimulatedTransport>,
) -> TestResult {
    let recorder = EventRecorder::new();
    let session = Session::start(session_config, echo_transport.clone(), recorder.clone());
    within(session.when_connected()).await??;

    echo_transport.drop_link(&Address::from("sim:stranger"));
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(recorder.names(), ["connect"]);
    assert_eq!(session.state(), ConnectionState::Connected);
    session.shutdown().await;
    Ok(())
}
