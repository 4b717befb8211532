//! Test utilities for exercising a [`Session`](peerlink::Session) against
//! the in-process simulator.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use peerlink::{Event, Session};
//! use peerlink_testing::{EventRecorder, echo_transport, session_config};
//!
//! # async fn example() {
//! let recorder = EventRecorder::new();
//! let transport = echo_transport();
//! let _session = Session::start(session_config(), transport, recorder.clone());
//! recorder
//!     .wait_for(|event| matches!(event, Event::Connected { .. }))
//!     .await;
//! # }
//! ```

pub mod fixtures;
pub mod logging;
pub mod metrics;
pub mod recorder;

pub use fixtures::{LAMP_ADDRESS, echo_transport, lamp_device, session_config};
pub use logging::{LoggerHandle, logger};
pub use metrics::CounterSnapshot;
pub use recorder::EventRecorder;
