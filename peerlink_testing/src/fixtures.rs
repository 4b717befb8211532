//! Ready-made configuration and simulator setups.

use std::sync::Arc;

use peerlink::{
    SessionConfig,
    SimulatedDevice,
    SimulatedTransport,
    config::DEFAULT_SERVICE_ID,
};
use rstest::fixture;

/// Address of the device created by [`lamp_device`].
pub const LAMP_ADDRESS: &str = "sim:lamp";

/// Session configuration with defaults and a test identifier.
#[fixture]
pub fn session_config() -> SessionConfig {
    SessionConfig::builder()
        .identifier("test.peerlink.lamp")
        .build()
        .expect("test identifier is valid")
}

/// A device advertising and exposing the default service.
#[fixture]
pub fn lamp_device() -> SimulatedDevice {
    SimulatedDevice::new(LAMP_ADDRESS, [DEFAULT_SERVICE_ID]).named("Lamp")
}

/// A simulator holding [`lamp_device`] that echoes every written payload.
#[fixture]
pub fn echo_transport() -> Arc<SimulatedTransport> {
    let transport = SimulatedTransport::new().with_device(lamp_device());
    transport.enable_echo(session_config().chunker());
    Arc::new(transport)
}
