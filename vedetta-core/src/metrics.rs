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

//! Metrics instrumentation for Vedetta observability.
//!
//! This module records metrics through the `metrics` facade; wiring up an
//! exporter (or not) is the application's choice. Without a recorder
//! installed every call is a no-op.
//!
//! # Metric Naming Conventions
//!
//! All metrics follow Prometheus naming conventions:
//! - Prefix: `vedetta_`
//! - Counters end in `_total`
//! - Durations end in `_seconds`
//!
//! # Cardinality
//!
//! Labels are bounded: `outcome` and `operation` come from small fixed sets
//! and `collection` from the deployment's watched collections. Nothing
//! derived from document contents is ever used as a label.
//!
//! # Examples
//!
//! ```rust
//! use vedetta_core::metrics;
//!
//! // Describe metrics once at startup.
//! metrics::init_metrics();
//! ```

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Metric name prefix for all Vedetta metrics.
#[doc(hidden)]
pub const METRIC_PREFIX: &str = "vedetta";

/// Total number of connection attempts, by outcome.
///
/// Type: Counter
/// Labels: outcome
#[doc(hidden)]
pub const CONNECTION_ATTEMPTS_TOTAL: &str = "vedetta_connection_attempts_total";

/// Total number of change events received from feeds.
///
/// Type: Counter
/// Labels: collection, operation
#[doc(hidden)]
pub const EVENTS_RECEIVED_TOTAL: &str = "vedetta_events_received_total";

/// Total number of events a handler failed to process.
///
/// Type: Counter
/// Labels: collection, operation
const HANDLER_FAILURES_TOTAL: &str = "vedetta_handler_failures_total";

/// Number of change feeds currently open.
///
/// Type: Gauge
const ACTIVE_FEEDS: &str = "vedetta_active_feeds";

/// Time spent inside the event handler, per dispatch.
///
/// Type: Histogram
/// Labels: operation
#[doc(hidden)]
pub const HANDLER_DURATION_SECONDS: &str = "vedetta_handler_duration_seconds";

/// Registers metric descriptions with the installed recorder.
///
/// Call once at application startup, after installing a recorder. Safe to
/// call with no recorder installed.
pub fn init_metrics() {
    describe_counter!(
        CONNECTION_ATTEMPTS_TOTAL,
        metrics::Unit::Count,
        "Total number of MongoDB connection attempts, labeled by outcome"
    );

    describe_counter!(
        EVENTS_RECEIVED_TOTAL,
        metrics::Unit::Count,
        "Total number of change events received, labeled by collection and operation"
    );

    describe_counter!(
        HANDLER_FAILURES_TOTAL,
        metrics::Unit::Count,
        "Total number of events the handler failed on, labeled by collection and operation"
    );

    describe_gauge!(
        ACTIVE_FEEDS,
        metrics::Unit::Count,
        "Number of change feeds currently open"
    );

    describe_histogram!(
        HANDLER_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time spent inside the event handler per dispatch, labeled by operation"
    );
}

/// Outcome of a connection attempt, used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// The server answered the verification ping.
    Connected,
    /// Parsing, construction, or the ping failed.
    Failed,
}

impl ConnectionOutcome {
    /// Returns the label value for this outcome.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }
}

/// Records a connection attempt.
pub fn increment_connection_attempts(outcome: ConnectionOutcome) {
    counter!(CONNECTION_ATTEMPTS_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

/// Records one event received from a feed.
pub fn increment_events_received(collection: &str, operation: &str) {
    counter!(
        EVENTS_RECEIVED_TOTAL,
        "collection" => collection.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Records one handler failure.
pub fn increment_handler_failures(collection: &str, operation: &str) {
    counter!(
        HANDLER_FAILURES_TOTAL,
        "collection" => collection.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Records a feed opening.
pub fn increment_active_feeds() {
    gauge!(ACTIVE_FEEDS).increment(1.0);
}

/// Records a feed closing.
pub fn decrement_active_feeds() {
    gauge!(ACTIVE_FEEDS).decrement(1.0);
}

/// Records time spent inside the handler for one dispatch.
pub fn record_handler_duration(duration: Duration, operation: &str) {
    histogram!(
        HANDLER_DURATION_SECONDS,
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}
