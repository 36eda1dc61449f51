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

//! Store-level error types.

use bson::Bson;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

/// Server error code for a unique-index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Errors produced by the collection stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    ///
    /// The only unique index in this schema is on `users.email`, so in
    /// practice this means a duplicate e-mail address. The server rejects
    /// the write before it reaches the oplog, so no change event is emitted
    /// for it.
    #[error("Duplicate key: {message}")]
    DuplicateKey {
        /// Server-reported error message
        message: String,
    },

    /// An insert succeeded but reported an id of an unexpected BSON type.
    #[error("Unexpected insert id: {id}")]
    UnexpectedInsertId {
        /// The id value the server reported
        id: Bson,
    },

    /// Any other database failure.
    #[error("Database error: {message}")]
    Database {
        /// Human-readable error message
        message: String,
        /// The underlying driver error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl From<MongoError> for StoreError {
    fn from(err: MongoError) -> Self {
        Self::from_mongo_error(err)
    }
}

impl StoreError {
    /// Creates a `StoreError` from a driver error, classifying unique-index
    /// violations distinctly.
    ///
    /// Code 11000 arrives in two shapes depending on the operation: a write
    /// error on ordinary inserts and updates, or a command error on some
    /// server paths. Both are matched here.
    #[must_use]
    pub fn from_mongo_error(err: MongoError) -> Self {
        let code = match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_err)) => Some(write_err.code),
            ErrorKind::Command(cmd_err) => Some(cmd_err.code),
            _ => None,
        };

        if code == Some(DUPLICATE_KEY_CODE) {
            return Self::DuplicateKey {
                message: err.to_string(),
            };
        }

        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Returns true if this error is a unique-constraint violation.
    #[must_use]
    pub const fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Returns the error category for metrics and logging.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::DuplicateKey { .. } => "duplicate_key",
            Self::UnexpectedInsertId { .. } => "unexpected_insert_id",
            Self::Database { .. } => "database",
        }
    }
}
