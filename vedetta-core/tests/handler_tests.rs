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

//! Tests for the event handler implementations.

use bson::doc;
use chrono::Utc;
use vedetta_core::event::{ChangeEvent, Namespace, OperationType, UpdateDescription};
use vedetta_core::handler::{EventHandler, HandlerError, LogHandler, RecordingHandler};

fn event(operation: OperationType) -> ChangeEvent {
    ChangeEvent {
        operation,
        namespace: Namespace::new("mongodb-change-streams-demo", "users"),
        document_key: Some(doc! { "_id": 7 }),
        full_document: None,
        update_description: None,
        cluster_time: Utc::now(),
    }
}

/// Every operation kind the server can report, in a plausible feed order.
fn routing_matrix() -> Vec<ChangeEvent> {
    let mut insert = event(OperationType::Insert);
    insert.full_document = Some(doc! { "_id": 7, "email": "ada@example.com" });

    let mut update = event(OperationType::Update);
    update.update_description = Some(UpdateDescription {
        updated_fields: doc! { "name": "Ada Lovelace" },
        removed_fields: vec![],
        truncated_arrays: None,
    });

    let mut replace = event(OperationType::Replace);
    replace.full_document = Some(doc! { "_id": 7, "email": "ada@example.org" });

    let mut invalidate = event(OperationType::Invalidate);
    invalidate.document_key = None;

    vec![
        insert,
        update,
        replace,
        event(OperationType::Delete),
        event(OperationType::Rename),
        event(OperationType::Drop),
        event(OperationType::DropDatabase),
        invalidate,
        event(OperationType::Unknown("shardCollection".to_string())),
    ]
}

#[tokio::test]
async fn test_log_handler_routes_every_kind() {
    let mut handler = LogHandler::new();
    let events = routing_matrix();
    let total = events.len() as u64;

    for e in events {
        // Routing must never fail, whatever the kind.
        handler.handle(e).await.unwrap();
    }

    assert_eq!(handler.event_count(), total);
}

#[tokio::test]
async fn test_log_handler_starts_at_zero() {
    let handler = LogHandler::new();
    assert_eq!(handler.event_count(), 0);
}

#[tokio::test]
async fn test_recording_handler_preserves_delivery_order() {
    let mut handler = RecordingHandler::new();

    for e in routing_matrix() {
        handler.handle(e).await.unwrap();
    }

    let operations = handler.operations();
    assert_eq!(operations.len(), 9);
    assert_eq!(operations[0], OperationType::Insert);
    assert_eq!(operations[3], OperationType::Delete);
    assert_eq!(operations[7], OperationType::Invalidate);
    assert_eq!(
        operations[8],
        OperationType::Unknown("shardCollection".to_string())
    );
}

#[tokio::test]
async fn test_recording_handler_keeps_payloads() {
    let mut handler = RecordingHandler::new();

    for e in routing_matrix() {
        handler.handle(e).await.unwrap();
    }

    let recorded = handler.events();
    assert_eq!(
        recorded[0]
            .full_document
            .as_ref()
            .unwrap()
            .get_str("email")
            .unwrap(),
        "ada@example.com"
    );
    assert!(recorded[1].has_update_description());
    assert_eq!(recorded[3].document_key, Some(doc! { "_id": 7 }));
}

#[tokio::test]
async fn test_recording_handler_failure_injection() {
    let mut handler = RecordingHandler::new().with_transient_failures(2);

    assert!(handler.handle(event(OperationType::Insert)).await.is_err());
    assert!(handler.handle(event(OperationType::Insert)).await.is_err());
    assert!(handler.handle(event(OperationType::Insert)).await.is_ok());
    assert_eq!(handler.event_count(), 1);

    handler.reset();
    assert_eq!(handler.event_count(), 0);
    assert!(handler.handle(event(OperationType::Insert)).await.is_ok());
}

#[test]
fn test_handler_error_source_chain() {
    use std::error::Error;

    let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
    let err = HandlerError::processing(io_err);

    assert!(err.source().is_some());
    assert_eq!(err.category(), "processing");

    let err = HandlerError::malformed("update without a delta");
    assert!(err.source().is_none());
    assert_eq!(err.category(), "malformed");
}
