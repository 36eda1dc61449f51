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

//! Change feed consumption for a single collection.
//!
//! A [`ChangeFeed`] is an owned handle over one collection's change stream.
//! Subscribing is explicit ([`ChangeFeed::watch`]), unsubscribing is
//! explicit ([`ChangeFeed::close`]), and nothing about the subscription is
//! ambient or process-wide: drop the handle and the subscription is gone.
//!
//! Events arrive in the server's commit order, exactly once each, either by
//! polling the feed as a [`futures::Stream`] or by handing it a consumer
//! via [`ChangeFeed::consume`]. The consume loop dispatches one event at a
//! time behind a recovery boundary: a handler error is logged and counted,
//! and delivery continues with the next event.
//!
//! There is no resumption and no reconnection. A stream error, an
//! `invalidate` event, or the stream ending closes the feed for good; the
//! caller decides whether to open a new one.
//!
//! # Examples
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use vedetta_core::feed::ChangeFeed;
//!
//! # async fn example(db: mongodb::Database) -> Result<(), Box<dyn std::error::Error>> {
//! let mut feed = ChangeFeed::watch(&db, "users").await?;
//!
//! while let Some(event) = feed.next().await {
//!     let event = event?;
//!     println!("{} on {}", event.operation, event.namespace);
//! }
//! # Ok(())
//! # }
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use bson::Document;
use futures::{Stream, StreamExt};
use mongodb::change_stream::event::ChangeStreamEvent;
use mongodb::change_stream::ChangeStream;
use mongodb::error::{Error as MongoError, ErrorKind as MongoErrorKind};
use mongodb::Database;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::event::{ChangeEvent, Namespace};
use crate::handler::EventHandler;
use crate::metrics;

/// Errors that can occur while opening or driving a change feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The underlying change stream failed.
    ///
    /// Stream errors are terminal: the feed closes itself before yielding
    /// this.
    #[error("Change stream error: {message}")]
    Stream {
        /// Human-readable error message
        message: String,
        /// The underlying driver error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        /// Server error code, when the server reported one
        code: Option<i32>,
    },

    /// The feed is closed and will never deliver another event.
    #[error("Change feed is closed")]
    Closed,
}

impl From<MongoError> for FeedError {
    fn from(err: MongoError) -> Self {
        Self::from_mongo_error(err)
    }
}

impl FeedError {
    /// Creates a `FeedError` from a driver error, extracting the server
    /// error code when one is present.
    #[must_use]
    pub fn from_mongo_error(err: MongoError) -> Self {
        let code = match err.kind.as_ref() {
            MongoErrorKind::Command(cmd_err) => Some(cmd_err.code),
            _ => None,
        };

        Self::Stream {
            message: err.to_string(),
            source: Some(Box::new(err)),
            code,
        }
    }

    /// Returns the error category for metrics and logging.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Stream { .. } => "stream",
            Self::Closed => "closed",
        }
    }
}

/// Lifecycle state of a [`ChangeFeed`].
///
/// A feed is born watching: [`ChangeFeed::watch`] only returns once the
/// subscription is open, so there is no observable "subscribed but not yet
/// live" state. `Closed` is terminal; re-subscribing means constructing a
/// new feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// The feed holds an open change stream and can deliver events.
    Watching,
    /// The feed released its stream and will never deliver events again.
    Closed,
}

/// An owned handle over one collection's change stream.
///
/// # Lifecycle
///
/// 1. **Watching**: from [`watch`](Self::watch) until the feed closes.
/// 2. **Closed**: after [`close`](Self::close), a stream error, an
///    `invalidate` event, or the stream ending. Terminal.
///
/// Once closed, the [`Stream`] impl yields `None` and
/// [`consume`](Self::consume) returns [`FeedError::Closed`].
///
/// # Delivery
///
/// Events are yielded in the server's commit order, exactly once each.
/// Writes rejected before reaching the oplog (for example a unique-index
/// violation) never produce an event.
///
/// # Thread safety
///
/// The handle is `Send` but owned by whoever holds it; to watch several
/// collections, open one feed per task.
pub struct ChangeFeed {
    /// Namespace being watched
    namespace: Namespace,
    /// The underlying change stream; `None` once closed
    stream: Option<ChangeStream<ChangeStreamEvent<Document>>>,
    /// Current lifecycle state
    state: FeedState,
}

impl ChangeFeed {
    /// Opens a change feed on one collection of `db`.
    ///
    /// This is the only way to subscribe. The returned handle owns the
    /// stream; closing or dropping it is the only way to unsubscribe.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Stream`] if the stream cannot be opened, for
    /// example when the deployment is not a replica set.
    pub async fn watch(db: &Database, collection: &str) -> Result<Self, FeedError> {
        let namespace = Namespace::new(db.name(), collection);
        info!(namespace = %namespace, "Opening change feed");

        let stream = db.collection::<Document>(collection).watch().await?;

        metrics::increment_active_feeds();
        debug!(namespace = %namespace, "Change feed open");

        Ok(Self {
            namespace,
            stream: Some(stream),
            state: FeedState::Watching,
        })
    }

    /// Returns the namespace this feed watches.
    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> FeedState {
        self.state
    }

    /// Returns true while the feed can still deliver events.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.state == FeedState::Watching
    }

    /// Returns true once the feed is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == FeedState::Closed
    }

    /// Closes the feed and releases the underlying stream.
    ///
    /// Idempotent: closing an already-closed feed logs at debug level and
    /// does nothing else.
    #[allow(clippy::unused_async)]
    pub async fn close(&mut self) {
        if self.is_closed() {
            debug!(namespace = %self.namespace, "Change feed already closed");
            return;
        }

        info!(namespace = %self.namespace, "Closing change feed");
        self.release();
    }

    /// Consumes the feed to its end, dispatching every event to `handler`.
    ///
    /// Events are delivered one at a time; the handler must return before
    /// the next event is read. Each dispatch runs behind a recovery
    /// boundary: a handler error is logged and counted, and consumption
    /// continues, so one bad event cannot kill the subscription.
    ///
    /// Returns the number of events dispatched, handler failures included,
    /// once the stream ends. An `invalidate` event is dispatched like any
    /// other and then ends the stream, so consuming a feed whose collection
    /// gets dropped returns `Ok`.
    ///
    /// # Errors
    ///
    /// - [`FeedError::Closed`] if the feed was already closed when called.
    /// - [`FeedError::Stream`] if the stream fails; the feed closes itself
    ///   before the error is returned.
    pub async fn consume<H: EventHandler>(&mut self, handler: &mut H) -> Result<u64, FeedError> {
        if self.is_closed() {
            return Err(FeedError::Closed);
        }

        let namespace = self.namespace.clone();
        deliver(self, &namespace, handler).await
    }

    /// Moves the feed to `Closed` and drops the stream. Safe to call twice.
    fn release(&mut self) {
        if self.state == FeedState::Closed {
            return;
        }

        self.state = FeedState::Closed;
        self.stream = None;
        metrics::decrement_active_feeds();
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        self.release();
    }
}

impl Stream for ChangeFeed {
    type Item = Result<ChangeEvent, FeedError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.state == FeedState::Closed {
            return Poll::Ready(None);
        }

        let Some(ref mut stream) = this.stream else {
            // No stream available
            this.release();
            return Poll::Ready(None);
        };

        match stream.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(raw))) => {
                let event = ChangeEvent::from(raw);

                if event.is_invalidate() {
                    // The server closes the cursor after an invalidate; the
                    // feed mirrors that, but the event is still delivered.
                    warn!(
                        namespace = %this.namespace,
                        "Change stream invalidated; closing feed"
                    );
                    this.release();
                }

                Poll::Ready(Some(Ok(event)))
            }
            Poll::Ready(Some(Err(e))) => {
                let err = FeedError::from_mongo_error(e);
                error!(
                    namespace = %this.namespace,
                    error = %err,
                    "Change stream failed; closing feed"
                );
                this.release();
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                warn!(
                    namespace = %this.namespace,
                    "Change stream ended; closing feed"
                );
                this.release();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Delivery loop behind [`ChangeFeed::consume`].
///
/// Generic over the event source so the recovery boundary is testable
/// without a live server.
async fn deliver<S, H>(
    events: &mut S,
    namespace: &Namespace,
    handler: &mut H,
) -> Result<u64, FeedError>
where
    S: Stream<Item = Result<ChangeEvent, FeedError>> + Unpin,
    H: EventHandler,
{
    let mut dispatched: u64 = 0;

    while let Some(item) = events.next().await {
        let event = item?;
        let operation = event.operation.clone();

        metrics::increment_events_received(&namespace.collection, operation.as_str());

        let start = Instant::now();
        let result = handler.handle(event).await;
        metrics::record_handler_duration(start.elapsed(), operation.as_str());

        dispatched += 1;

        if let Err(e) = result {
            metrics::increment_handler_failures(&namespace.collection, operation.as_str());
            warn!(
                namespace = %namespace,
                operation = %operation,
                category = e.category(),
                error = %e,
                "Event handler failed; continuing"
            );
        }
    }

    debug!(namespace = %namespace, dispatched, "Change feed delivery ended");
    Ok(dispatched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::OperationType;
    use crate::handler::RecordingHandler;
    use bson::doc;
    use chrono::Utc;

    fn test_event(operation: OperationType, value: i32) -> ChangeEvent {
        ChangeEvent {
            operation,
            namespace: Namespace::new("testdb", "users"),
            document_key: Some(doc! { "_id": value }),
            full_document: Some(doc! { "_id": value, "value": value }),
            update_description: None,
            cluster_time: Utc::now(),
        }
    }

    fn stream_error() -> FeedError {
        FeedError::Stream {
            message: "cursor killed".to_string(),
            source: None,
            code: Some(237),
        }
    }

    fn closed_feed() -> ChangeFeed {
        ChangeFeed {
            namespace: Namespace::new("testdb", "users"),
            stream: None,
            state: FeedState::Closed,
        }
    }

    #[tokio::test]
    async fn test_consume_on_closed_feed_is_an_error() {
        let mut feed = closed_feed();
        let mut handler = RecordingHandler::new();

        let result = feed.consume(&mut handler).await;
        assert!(matches!(result, Err(FeedError::Closed)));
        assert_eq!(handler.event_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_feed_yields_none() {
        let mut feed = closed_feed();
        assert!(feed.next().await.is_none());
        assert!(feed.is_closed());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut feed = closed_feed();
        feed.close().await;
        feed.close().await;
        assert_eq!(feed.state(), FeedState::Closed);
    }

    #[tokio::test]
    async fn test_deliver_dispatches_in_order() {
        let mut events = futures::stream::iter(vec![
            Ok(test_event(OperationType::Insert, 1)),
            Ok(test_event(OperationType::Update, 2)),
            Ok(test_event(OperationType::Delete, 3)),
        ]);
        let namespace = Namespace::new("testdb", "users");
        let mut handler = RecordingHandler::new();

        let dispatched = deliver(&mut events, &namespace, &mut handler)
            .await
            .unwrap();

        assert_eq!(dispatched, 3);
        assert_eq!(
            handler.operations(),
            vec![
                OperationType::Insert,
                OperationType::Update,
                OperationType::Delete
            ]
        );
    }

    #[tokio::test]
    async fn test_deliver_empty_stream() {
        let mut events = futures::stream::iter(Vec::new());
        let namespace = Namespace::new("testdb", "users");
        let mut handler = RecordingHandler::new();

        let dispatched = deliver(&mut events, &namespace, &mut handler)
            .await
            .unwrap();

        assert_eq!(dispatched, 0);
        assert_eq!(handler.event_count(), 0);
    }

    #[tokio::test]
    async fn test_deliver_continues_after_handler_failure() {
        let mut events = futures::stream::iter(vec![
            Ok(test_event(OperationType::Insert, 1)),
            Ok(test_event(OperationType::Insert, 2)),
            Ok(test_event(OperationType::Insert, 3)),
        ]);
        let namespace = Namespace::new("testdb", "users");
        let mut handler = RecordingHandler::new().with_transient_failures(1);

        let dispatched = deliver(&mut events, &namespace, &mut handler)
            .await
            .unwrap();

        // The failed dispatch still counts; only the recording skips it.
        assert_eq!(dispatched, 3);
        assert_eq!(handler.event_count(), 2);
        assert_eq!(
            handler.events()[0].document_key,
            Some(doc! { "_id": 2 })
        );
    }

    #[tokio::test]
    async fn test_deliver_counts_every_failure() {
        let mut events = futures::stream::iter(vec![
            Ok(test_event(OperationType::Insert, 1)),
            Ok(test_event(OperationType::Insert, 2)),
        ]);
        let namespace = Namespace::new("testdb", "users");
        let mut handler = RecordingHandler::new().with_failures();

        let dispatched = deliver(&mut events, &namespace, &mut handler)
            .await
            .unwrap();

        assert_eq!(dispatched, 2);
        assert_eq!(handler.event_count(), 0);
    }

    #[tokio::test]
    async fn test_deliver_stops_on_stream_error() {
        let mut events = futures::stream::iter(vec![
            Ok(test_event(OperationType::Insert, 1)),
            Err(stream_error()),
            Ok(test_event(OperationType::Insert, 2)),
        ]);
        let namespace = Namespace::new("testdb", "users");
        let mut handler = RecordingHandler::new();

        let result = deliver(&mut events, &namespace, &mut handler).await;

        assert!(matches!(result, Err(FeedError::Stream { .. })));
        // The event before the error was still dispatched.
        assert_eq!(handler.event_count(), 1);
    }

    #[test]
    fn test_feed_error_category() {
        assert_eq!(stream_error().category(), "stream");
        assert_eq!(FeedError::Closed.category(), "closed");
    }

    #[test]
    fn test_feed_error_from_mongo_error() {
        let err = FeedError::from_mongo_error(MongoError::custom("boom"));
        match err {
            FeedError::Stream { code, source, .. } => {
                assert_eq!(code, None);
                assert!(source.is_some());
            }
            FeedError::Closed => panic!("expected Stream variant"),
        }
    }

    #[test]
    fn test_feed_error_display() {
        assert_eq!(FeedError::Closed.to_string(), "Change feed is closed");
    }
}
