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

//! Tests for the connect/disconnect contract.
//!
//! The failure-path tests run against nothing at all: a malformed URI and an
//! unreachable port are enough to exercise the boolean contract. The happy
//! path needs a reachable MongoDB and is ignored by default.

use std::time::Duration;
use vedetta_core::connection::{Connection, ConnectionSettings};

#[tokio::test]
async fn test_connect_returns_false_for_malformed_uri() {
    let settings = ConnectionSettings::builder()
        .uri("not-a-mongodb-uri")
        .build()
        .unwrap();
    let mut conn = Connection::new(settings);

    assert!(!conn.connect().await, "Parse failures must surface as false");
    assert!(!conn.is_connected());
    assert!(conn.database().is_none());
}

#[tokio::test]
async fn test_connect_returns_false_for_unreachable_server() {
    // Port 9 (discard) should refuse quickly; the short selection timeout
    // bounds the test either way.
    let settings = ConnectionSettings::builder()
        .uri("mongodb://localhost:9/?directConnection=true")
        .server_selection_timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let mut conn = Connection::new(settings);

    assert!(!conn.connect().await);
    assert!(!conn.is_connected());

    // A failed connect leaves the handle usable; disconnect is a no-op.
    assert!(conn.disconnect().await);
}

#[tokio::test]
async fn test_disconnect_before_connect_is_true() {
    let mut conn = Connection::new(ConnectionSettings::default());
    assert!(conn.disconnect().await);
    assert!(conn.disconnect().await);
}

#[tokio::test]
#[ignore] // Requires a reachable MongoDB instance
async fn test_connect_lifecycle() {
    let settings = ConnectionSettings::from_env().unwrap();
    let mut conn = Connection::new(settings);

    assert!(conn.connect().await, "MongoDB must be reachable for this test");
    assert!(conn.is_connected());
    assert!(conn.client().is_some());

    let db = conn.database().unwrap();
    assert_eq!(db.name(), conn.settings().database);

    // Connecting while connected is a no-op that reports success.
    assert!(conn.connect().await);

    assert!(conn.disconnect().await);
    assert!(!conn.is_connected());
    assert!(conn.database().is_none());

    // Disconnecting while disconnected is a no-op that reports success.
    assert!(conn.disconnect().await);
}
