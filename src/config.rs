//! Session configuration.
//!
//! [`SessionConfig`] is assembled with [`SessionConfigBuilder`]. Only the
//! identifier is mandatory; everything else defaults to the values the
//! reference peripheral firmware expects.

use std::{num::NonZeroUsize, time::Duration};

use uuid::{Uuid, uuid};

use crate::{
    chunk::Chunker,
    error::ConfigError,
    outbound::Pacing,
    session::ReconnectPolicy,
    transport::CharacteristicRef,
};

/// Service advertised by compatible peripherals.
pub const DEFAULT_SERVICE_ID: Uuid = uuid!("686c3dbf-2f84-4eb8-8e62-0c12fc534f7c");

/// Characteristic carrying command frames in both directions.
pub const DEFAULT_COMMAND_CHARACTERISTIC_ID: Uuid = uuid!("c50dc35b-9a1b-40c2-bc97-96ee7254579c");

/// Settling delays inserted between lifecycle steps.
///
/// These are pacing intervals, not timeouts: no adapter call is abandoned
/// for taking too long.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timings {
    /// Pause between stopping the scan and connecting.
    pub connect_settle: Duration,
    /// Pause between connecting and enumerating services.
    pub discover_settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            connect_settle: Duration::from_millis(1000),
            discover_settle: Duration::from_millis(1500),
        }
    }
}

/// Everything a [`Session`](crate::session::Session) needs besides its
/// adapter and publisher.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    identifier: String,
    service_id: Uuid,
    command_characteristic_id: Uuid,
    verbose: bool,
    chunker: Chunker,
    timings: Timings,
    pacing: Pacing,
    reconnect: ReconnectPolicy,
}

impl SessionConfig {
    /// Start building a configuration.
    #[must_use]
    pub fn builder() -> SessionConfigBuilder { SessionConfigBuilder::default() }

    /// Identifier naming this session in logs.
    #[must_use]
    pub fn identifier(&self) -> &str { &self.identifier }

    /// Dot-separated components of the identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use peerlink::config::SessionConfig;
    /// let config = SessionConfig::builder()
    ///     .identifier("com.example.lamp")
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.identifier_parts().collect::<Vec<_>>(), ["com", "example", "lamp"]);
    /// ```
    pub fn identifier_parts(&self) -> impl Iterator<Item = &str> { self.identifier.split('.') }

    /// Service used to filter scans and checked during discovery.
    #[must_use]
    pub const fn service_id(&self) -> Uuid { self.service_id }

    /// Characteristic used for notifications and writes.
    #[must_use]
    pub const fn command_characteristic_id(&self) -> Uuid { self.command_characteristic_id }

    /// Service/characteristic pair addressed on the peer.
    #[must_use]
    pub const fn command_target(&self) -> CharacteristicRef {
        CharacteristicRef {
            service_id: self.service_id,
            characteristic_id: self.command_characteristic_id,
        }
    }

    /// Whether lifecycle diagnostics are raised to `INFO`.
    #[must_use]
    pub const fn verbose(&self) -> bool { self.verbose }

    /// Chunker applied to outgoing payloads.
    #[must_use]
    pub const fn chunker(&self) -> Chunker { self.chunker }

    /// Lifecycle settling delays.
    #[must_use]
    pub const fn timings(&self) -> Timings { self.timings }

    /// Outbound pacing intervals.
    #[must_use]
    pub const fn pacing(&self) -> Pacing { self.pacing }

    /// Delay policy for the reconnect loop.
    #[must_use]
    pub const fn reconnect(&self) -> ReconnectPolicy { self.reconnect }
}

/// Builder for [`SessionConfig`].
#[derive(Clone, Debug)]
pub struct SessionConfigBuilder {
    identifier: Option<String>,
    service_id: Uuid,
    command_characteristic_id: Uuid,
    verbose: bool,
    chunker: Chunker,
    timings: Timings,
    pacing: Pacing,
    reconnect: ReconnectPolicy,
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self {
            identifier: None,
            service_id: DEFAULT_SERVICE_ID,
            command_characteristic_id: DEFAULT_COMMAND_CHARACTERISTIC_ID,
            verbose: false,
            chunker: Chunker::default(),
            timings: Timings::default(),
            pacing: Pacing::default(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl SessionConfigBuilder {
    /// Set the session identifier. Required.
    #[must_use]
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Override the service identifier.
    #[must_use]
    pub fn service_id(mut self, service_id: Uuid) -> Self {
        self.service_id = service_id;
        self
    }

    /// Override the command characteristic identifier.
    #[must_use]
    pub fn command_characteristic_id(mut self, characteristic_id: Uuid) -> Self {
        self.command_characteristic_id = characteristic_id;
        self
    }

    /// Enable or disable verbose diagnostics.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Override the number of payload bytes per frame.
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: NonZeroUsize) -> Self {
        self.chunker = Chunker::new(chunk_size);
        self
    }

    /// Override the lifecycle settling delays.
    #[must_use]
    pub fn timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Override the outbound pacing intervals.
    #[must_use]
    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Override the reconnect delay policy.
    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy.normalized();
        self
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingIdentifier`] when no non-empty
    /// identifier was supplied.
    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        let identifier = self
            .identifier
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::MissingIdentifier)?;
        Ok(SessionConfig {
            identifier,
            service_id: self.service_id,
            command_characteristic_id: self.command_characteristic_id,
            verbose: self.verbose,
            chunker: self.chunker,
            timings: self.timings,
            pacing: self.pacing,
            reconnect: self.reconnect,
        })
    }
}
