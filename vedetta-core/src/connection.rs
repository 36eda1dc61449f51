// Copyright 2025 Vedetta Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! `MongoDB` connection management with a contained failure boundary.
//!
//! [`Connection`] wraps the driver's pooled client behind a deliberately
//! small contract: [`connect`](Connection::connect) and
//! [`disconnect`](Connection::disconnect) log what happened and answer with
//! a boolean. A refused or unreachable server is an operational outcome, not
//! an error the caller has to plumb through. There is no retry, no backoff,
//! and no reconnection: a failed connect leaves the handle exactly as it
//! was, and the caller decides whether to try again.
//!
//! Settings come from [`ConnectionSettings`]: defaults, a builder, or the
//! `MONGO_DB_URL` / `MONGO_DB_NAME` environment variables via
//! [`ConnectionSettings::from_env`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use vedetta_core::connection::{Connection, ConnectionSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ConnectionSettings::builder()
//!     .uri("mongodb://localhost:27017")
//!     .database("mongodb-change-streams-demo")
//!     .build()?;
//!
//! let mut conn = Connection::new(settings);
//! if conn.connect().await {
//!     // handles are cheap clones of a pooled client
//!     let db = conn.database().ok_or("not connected")?;
//!     println!("connected to {}", db.name());
//! }
//! conn.disconnect().await;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::metrics::{self, ConnectionOutcome};

/// Connection string used when `MONGO_DB_URL` is not set.
pub const DEFAULT_URI: &str = "mongodb://localhost:27017";

/// Database name used when `MONGO_DB_NAME` is not set.
pub const DEFAULT_DATABASE: &str = "mongodb-change-streams-demo";

/// Environment variable holding the connection string.
const ENV_URI: &str = "MONGO_DB_URL";

/// Environment variable holding the database name.
const ENV_DATABASE: &str = "MONGO_DB_NAME";

/// Errors produced while assembling [`ConnectionSettings`].
///
/// Failures while actually connecting never surface here; they are logged
/// and reported through [`Connection::connect`]'s boolean return.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// A settings value failed validation.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Settings for a [`Connection`].
///
/// The defaults target a local single-node deployment and deliberately cap
/// resource usage: a small pool and a short server-selection window so an
/// unreachable server fails fast instead of hanging the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// MongoDB connection string
    pub uri: String,

    /// Database the demo schema lives in
    pub database: String,

    /// Maximum number of pooled connections
    pub max_pool_size: u32,

    /// How long the driver searches for a suitable server before giving up
    pub server_selection_timeout: Duration,

    /// Per-connection socket establishment deadline
    pub socket_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            max_pool_size: 10,
            server_selection_timeout: Duration::from_secs(5),
            socket_timeout: Duration::from_secs(50),
        }
    }
}

impl ConnectionSettings {
    /// Creates a builder initialized with the defaults.
    #[must_use]
    pub fn builder() -> ConnectionSettingsBuilder {
        ConnectionSettingsBuilder::default()
    }

    /// Builds settings from the environment.
    ///
    /// Reads `MONGO_DB_URL` and `MONGO_DB_NAME`, falling back to
    /// [`DEFAULT_URI`] and [`DEFAULT_DATABASE`] when unset. All other
    /// settings keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Configuration`] if an environment variable
    /// is set to an empty string.
    pub fn from_env() -> Result<Self, ConnectionError> {
        let uri = std::env::var(ENV_URI).unwrap_or_else(|_| DEFAULT_URI.to_string());
        let database = std::env::var(ENV_DATABASE).unwrap_or_else(|_| DEFAULT_DATABASE.to_string());

        Self::builder().uri(uri).database(database).build()
    }
}

/// Builder for [`ConnectionSettings`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettingsBuilder {
    uri: Option<String>,
    database: Option<String>,
    max_pool_size: Option<u32>,
    server_selection_timeout: Option<Duration>,
    socket_timeout: Option<Duration>,
}

impl ConnectionSettingsBuilder {
    /// Sets the connection string.
    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Sets the database name.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the maximum pool size.
    #[must_use]
    pub const fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Sets the server selection timeout.
    #[must_use]
    pub const fn server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = Some(timeout);
        self
    }

    /// Sets the socket establishment deadline.
    #[must_use]
    pub const fn socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = Some(timeout);
        self
    }

    /// Builds the settings, validating them.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Configuration`] if the URI or database
    /// name is empty, or if the pool size is zero.
    pub fn build(self) -> Result<ConnectionSettings, ConnectionError> {
        let defaults = ConnectionSettings::default();

        let uri = self.uri.unwrap_or(defaults.uri);
        if uri.is_empty() {
            return Err(ConnectionError::Configuration(
                "connection URI cannot be empty".to_string(),
            ));
        }

        let database = self.database.unwrap_or(defaults.database);
        if database.is_empty() {
            return Err(ConnectionError::Configuration(
                "database name cannot be empty".to_string(),
            ));
        }

        let max_pool_size = self.max_pool_size.unwrap_or(defaults.max_pool_size);
        if max_pool_size == 0 {
            return Err(ConnectionError::Configuration(
                "max_pool_size must be at least 1".to_string(),
            ));
        }

        Ok(ConnectionSettings {
            uri,
            database,
            max_pool_size,
            server_selection_timeout: self
                .server_selection_timeout
                .unwrap_or(defaults.server_selection_timeout),
            socket_timeout: self.socket_timeout.unwrap_or(defaults.socket_timeout),
        })
    }
}

/// A managed `MongoDB` connection.
///
/// # Contract
///
/// - [`connect`](Self::connect) returns `true` once the server answered a
///   ping, `false` on any failure. Calling it while already connected is a
///   no-op that returns `true`.
/// - [`disconnect`](Self::disconnect) shuts the pool down and returns
///   `true`. Calling it while not connected is a no-op that returns `true`.
/// - Neither call panics, and neither returns an error type.
///
/// Database handles obtained from [`database`](Self::database) keep working
/// until `disconnect`; they are cheap clones backed by the shared pool.
#[derive(Debug)]
pub struct Connection {
    settings: ConnectionSettings,
    client: Option<Client>,
}

impl Connection {
    /// Creates an unconnected handle.
    #[must_use]
    pub const fn new(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            client: None,
        }
    }

    /// Returns the settings this connection was built with.
    #[must_use]
    pub const fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Returns true while a client is held.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Returns the underlying client, if connected.
    #[must_use]
    pub const fn client(&self) -> Option<&Client> {
        self.client.as_ref()
    }

    /// Returns a handle to the configured database, if connected.
    #[must_use]
    pub fn database(&self) -> Option<Database> {
        self.client
            .as_ref()
            .map(|client| client.database(&self.settings.database))
    }

    /// Connects and verifies reachability with a ping.
    ///
    /// The driver builds its topology lazily, so a constructed client is not
    /// proof of a reachable server; the ping is what the returned boolean
    /// stands on. On failure the error is logged at error level and the
    /// handle stays unconnected.
    pub async fn connect(&mut self) -> bool {
        if self.client.is_some() {
            debug!("Already connected; connect is a no-op");
            return true;
        }

        match self.try_connect().await {
            Ok(client) => {
                self.client = Some(client);
                metrics::increment_connection_attempts(ConnectionOutcome::Connected);
                info!(
                    database = %self.settings.database,
                    max_pool_size = self.settings.max_pool_size,
                    "Connected to MongoDB"
                );
                true
            }
            Err(e) => {
                metrics::increment_connection_attempts(ConnectionOutcome::Failed);
                error!(
                    error = %e,
                    uri = %self.settings.uri,
                    "Failed to connect to MongoDB"
                );
                false
            }
        }
    }

    async fn try_connect(&self) -> Result<Client, mongodb::error::Error> {
        let mut options = ClientOptions::parse(&self.settings.uri).await?;
        options.max_pool_size = Some(self.settings.max_pool_size);
        options.server_selection_timeout = Some(self.settings.server_selection_timeout);
        // The driver exposes no per-operation socket deadline; connect_timeout
        // is its socket-level knob.
        options.connect_timeout = Some(self.settings.socket_timeout);

        let client = Client::with_options(options)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        Ok(client)
    }

    /// Shuts down the pool and releases the client.
    ///
    /// Always returns `true`: the driver's shutdown cannot fail, and
    /// disconnecting an unconnected handle is a no-op. The boolean is kept
    /// for symmetry with [`connect`](Self::connect).
    pub async fn disconnect(&mut self) -> bool {
        let Some(client) = self.client.take() else {
            debug!("Not connected; disconnect is a no-op");
            return true;
        };

        client.shutdown().await;
        info!(database = %self.settings.database, "Disconnected from MongoDB");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.uri, "mongodb://localhost:27017");
        assert_eq!(settings.database, "mongodb-change-streams-demo");
        assert_eq!(settings.max_pool_size, 10);
        assert_eq!(settings.server_selection_timeout, Duration::from_secs(5));
        assert_eq!(settings.socket_timeout, Duration::from_secs(50));
    }

    #[test]
    fn test_settings_builder() {
        let settings = ConnectionSettings::builder()
            .uri("mongodb://example:27017")
            .database("somewhere")
            .max_pool_size(3)
            .server_selection_timeout(Duration::from_millis(250))
            .socket_timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        assert_eq!(settings.uri, "mongodb://example:27017");
        assert_eq!(settings.database, "somewhere");
        assert_eq!(settings.max_pool_size, 3);
        assert_eq!(settings.server_selection_timeout, Duration::from_millis(250));
        assert_eq!(settings.socket_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_builder_rejects_empty_uri() {
        let result = ConnectionSettings::builder().uri("").build();
        assert!(matches!(result, Err(ConnectionError::Configuration(_))));
    }

    #[test]
    fn test_builder_rejects_empty_database() {
        let result = ConnectionSettings::builder().database("").build();
        assert!(matches!(result, Err(ConnectionError::Configuration(_))));
    }

    #[test]
    fn test_builder_rejects_zero_pool_size() {
        let result = ConnectionSettings::builder().max_pool_size(0).build();
        assert!(matches!(result, Err(ConnectionError::Configuration(_))));
    }

    #[test]
    fn test_from_env_overrides_and_defaults() {
        // Single test for both directions so the env mutation cannot race
        // with itself across parallel tests.
        std::env::set_var(ENV_URI, "mongodb://from-env:27017");
        std::env::set_var(ENV_DATABASE, "env_db");
        let settings = ConnectionSettings::from_env().unwrap();
        assert_eq!(settings.uri, "mongodb://from-env:27017");
        assert_eq!(settings.database, "env_db");

        std::env::remove_var(ENV_URI);
        std::env::remove_var(ENV_DATABASE);
        let settings = ConnectionSettings::from_env().unwrap();
        assert_eq!(settings.uri, DEFAULT_URI);
        assert_eq!(settings.database, DEFAULT_DATABASE);
    }

    #[test]
    fn test_new_connection_is_unconnected() {
        let conn = Connection::new(ConnectionSettings::default());
        assert!(!conn.is_connected());
        assert!(conn.client().is_none());
        assert!(conn.database().is_none());
    }

    #[tokio::test]
    async fn test_disconnect_without_connect_is_noop() {
        let mut conn = Connection::new(ConnectionSettings::default());
        assert!(conn.disconnect().await);
        assert!(!conn.is_connected());
    }
}
