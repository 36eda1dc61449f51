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

//! Event handling seam between a change feed and its consumer.
//!
//! [`EventHandler`] is the one trait a consumer implements. The feed
//! delivers events strictly one at a time and in commit order, waiting for
//! `handle` to return before reading the next event, so implementations
//! never need internal locking.
//!
//! Two implementations ship with the crate:
//!
//! - [`LogHandler`] routes every operation kind to a structured log line
//!   carrying the payload fragment that matters for that kind.
//! - [`RecordingHandler`] stores handled events in memory for test
//!   assertions and can simulate failures.
//!
//! # Examples
//!
//! ```rust
//! use async_trait::async_trait;
//! use vedetta_core::event::ChangeEvent;
//! use vedetta_core::handler::{EventHandler, HandlerError};
//!
//! struct Counter {
//!     inserts: u64,
//! }
//!
//! #[async_trait]
//! impl EventHandler for Counter {
//!     async fn handle(&mut self, event: ChangeEvent) -> Result<(), HandlerError> {
//!         if event.is_insert() {
//!             self.inserts += 1;
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::event::{ChangeEvent, OperationType};

/// Errors a handler can return for a single event.
///
/// A handler error never stops the feed: the consume loop logs it, counts
/// it, and moves on to the next event.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The event was missing a payload field the handler requires.
    #[error("Malformed event: {message}")]
    MalformedEvent {
        /// Human-readable error message
        message: String,
    },

    /// The handler failed while processing the event.
    #[error("Processing error: {message}")]
    Processing {
        /// Human-readable error message
        message: String,
        /// The underlying error, if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl HandlerError {
    /// Creates a malformed-event error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedEvent {
            message: message.into(),
        }
    }

    /// Creates a processing error wrapping a source error.
    #[must_use]
    pub fn processing(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Processing {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a processing error from a message alone.
    #[must_use]
    pub fn processing_msg(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the error category for metrics and logging.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::MalformedEvent { .. } => "malformed",
            Self::Processing { .. } => "processing",
        }
    }
}

/// Handles change events delivered by a feed.
///
/// # Contract
///
/// `handle` is invoked for one event at a time; the feed does not read the
/// next event until it returns. Returning an error does not stop
/// consumption. A handler that needs to stop the feed should arrange for
/// the feed handle to be closed instead of erroring.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Processes one change event.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the event could not be processed.
    /// The error is logged and counted by the feed; consumption continues.
    async fn handle(&mut self, event: ChangeEvent) -> Result<(), HandlerError>;
}

/// Routes each operation kind to one structured log line.
///
/// Inserts and replaces log the full document, updates log the delta,
/// deletes log the document key, and lifecycle operations log at warn
/// level. An operation kind outside the known set logs the whole event so
/// nothing is silently swallowed. This handler never fails.
#[derive(Debug, Default)]
pub struct LogHandler {
    event_count: u64,
}

impl LogHandler {
    /// Creates a new log handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of events handled so far.
    #[must_use]
    pub const fn event_count(&self) -> u64 {
        self.event_count
    }
}

#[async_trait]
impl EventHandler for LogHandler {
    async fn handle(&mut self, event: ChangeEvent) -> Result<(), HandlerError> {
        self.event_count += 1;

        match &event.operation {
            OperationType::Insert => info!(
                count = self.event_count,
                namespace = %event.namespace,
                document = ?event.full_document,
                "Document inserted"
            ),
            OperationType::Update => info!(
                count = self.event_count,
                namespace = %event.namespace,
                key = ?event.document_key,
                delta = ?event.update_description,
                "Document updated"
            ),
            OperationType::Replace => info!(
                count = self.event_count,
                namespace = %event.namespace,
                document = ?event.full_document,
                "Document replaced"
            ),
            OperationType::Delete => info!(
                count = self.event_count,
                namespace = %event.namespace,
                key = ?event.document_key,
                "Document deleted"
            ),
            OperationType::Drop => warn!(
                namespace = %event.namespace,
                "Collection dropped"
            ),
            OperationType::DropDatabase => warn!(
                database = %event.namespace.database,
                "Database dropped"
            ),
            OperationType::Rename => info!(
                namespace = %event.namespace,
                "Collection renamed"
            ),
            OperationType::Invalidate => warn!(
                namespace = %event.namespace,
                "Change stream invalidated"
            ),
            OperationType::Unknown(kind) => warn!(
                kind = %kind,
                event = ?event,
                "Unknown operation type"
            ),
        }

        Ok(())
    }
}

/// A recording handler for tests.
///
/// Stores every successfully handled event in memory and exposes them for
/// assertions. Failure injection covers the two shapes a consume loop has
/// to survive: every dispatch failing, or only the first N.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Vec<ChangeEvent>,
    fail_all: bool,
    failures_remaining: usize,
}

impl RecordingHandler {
    /// Creates a handler that records everything and never fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the handler to fail every dispatch.
    #[must_use]
    pub const fn with_failures(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Configures the handler to fail the next `n` dispatches, then succeed.
    #[must_use]
    pub const fn with_transient_failures(mut self, n: usize) -> Self {
        self.failures_remaining = n;
        self
    }

    /// Returns the events handled so far, in delivery order.
    #[must_use]
    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    /// Returns the number of successfully handled events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Returns the operation kinds handled, in delivery order.
    #[must_use]
    pub fn operations(&self) -> Vec<OperationType> {
        self.events.iter().map(|e| e.operation.clone()).collect()
    }

    /// Clears recorded events and disables failure injection.
    pub fn reset(&mut self) {
        self.events.clear();
        self.fail_all = false;
        self.failures_remaining = 0;
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&mut self, event: ChangeEvent) -> Result<(), HandlerError> {
        if self.fail_all {
            return Err(HandlerError::processing_msg("simulated handler failure"));
        }

        if self.failures_remaining > 0 {
            self.failures_remaining -= 1;
            return Err(HandlerError::processing_msg(
                "simulated transient handler failure",
            ));
        }

        self.events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Namespace;
    use bson::doc;
    use chrono::Utc;

    fn test_event(operation: OperationType) -> ChangeEvent {
        ChangeEvent {
            operation,
            namespace: Namespace::new("testdb", "users"),
            document_key: Some(doc! { "_id": 1 }),
            full_document: Some(doc! { "_id": 1, "email": "ada@example.com" }),
            update_description: None,
            cluster_time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_log_handler_counts_every_kind() {
        let mut handler = LogHandler::new();

        let kinds = vec![
            OperationType::Insert,
            OperationType::Update,
            OperationType::Replace,
            OperationType::Delete,
            OperationType::Drop,
            OperationType::DropDatabase,
            OperationType::Rename,
            OperationType::Invalidate,
            OperationType::Unknown("shardCollection".to_string()),
        ];
        let total = kinds.len() as u64;

        for kind in kinds {
            handler.handle(test_event(kind)).await.unwrap();
        }

        assert_eq!(handler.event_count(), total);
    }

    #[tokio::test]
    async fn test_recording_handler_records_in_order() {
        let mut handler = RecordingHandler::new();

        handler.handle(test_event(OperationType::Insert)).await.unwrap();
        handler.handle(test_event(OperationType::Update)).await.unwrap();
        handler.handle(test_event(OperationType::Delete)).await.unwrap();

        assert_eq!(handler.event_count(), 3);
        assert_eq!(
            handler.operations(),
            vec![
                OperationType::Insert,
                OperationType::Update,
                OperationType::Delete
            ]
        );
        assert_eq!(
            handler.events()[0].full_document,
            Some(doc! { "_id": 1, "email": "ada@example.com" })
        );
    }

    #[tokio::test]
    async fn test_recording_handler_fail_all() {
        let mut handler = RecordingHandler::new().with_failures();

        let result = handler.handle(test_event(OperationType::Insert)).await;
        assert!(matches!(result, Err(HandlerError::Processing { .. })));
        assert_eq!(handler.event_count(), 0);
    }

    #[tokio::test]
    async fn test_recording_handler_transient_failures() {
        let mut handler = RecordingHandler::new().with_transient_failures(2);

        assert!(handler.handle(test_event(OperationType::Insert)).await.is_err());
        assert!(handler.handle(test_event(OperationType::Insert)).await.is_err());
        assert!(handler.handle(test_event(OperationType::Insert)).await.is_ok());

        assert_eq!(handler.event_count(), 1);
    }

    #[tokio::test]
    async fn test_recording_handler_reset() {
        let mut handler = RecordingHandler::new().with_failures();
        assert!(handler.handle(test_event(OperationType::Insert)).await.is_err());

        handler.reset();
        assert!(handler.handle(test_event(OperationType::Insert)).await.is_ok());
        assert_eq!(handler.event_count(), 1);
    }

    #[test]
    fn test_handler_error_category() {
        assert_eq!(HandlerError::malformed("no key").category(), "malformed");
        assert_eq!(HandlerError::processing_msg("boom").category(), "processing");
    }

    #[test]
    fn test_handler_error_display() {
        let err = HandlerError::malformed("missing fullDocument");
        assert_eq!(err.to_string(), "Malformed event: missing fullDocument");

        let err = HandlerError::processing_msg("downstream unavailable");
        assert_eq!(err.to_string(), "Processing error: downstream unavailable");
    }
}
