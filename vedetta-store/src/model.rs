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

//! Document models for the demo schema.
//!
//! Field names follow the stored documents: `_id`, camelCase timestamps,
//! and a `profile` field on users holding a plain [`ObjectId`] reference.
//! Timestamps are stored as native BSON datetimes, not strings.
//!
//! The models are passive data. Uniqueness and reference resolution live in
//! the stores; constructors only fill in the creation timestamps.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A standalone profile document in the `profiles` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Document identity; `None` until the store assigns one on insert
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Free-form biography text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Creation timestamp
    #[serde(
        rename = "createdAt",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub created_at: DateTime<Utc>,

    /// Last-update timestamp, bumped by every store update
    #[serde(
        rename = "updatedAt",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Creates an unsaved profile with both timestamps set to now.
    #[must_use]
    pub fn new(bio: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            bio,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A user document in the `users` collection.
///
/// `email` is the only required application field and is kept unique by the
/// index [`UserStore::ensure_indexes`](crate::users::UserStore::ensure_indexes)
/// creates. `profile` is a reference by id; it is resolved on reads, never
/// embedded in the stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Document identity; `None` until the store assigns one on insert
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Unique e-mail address
    pub email: String,

    /// Reference to a [`Profile`] by id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ObjectId>,

    /// Creation timestamp
    #[serde(
        rename = "createdAt",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub created_at: DateTime<Utc>,

    /// Last-update timestamp, bumped by every store update
    #[serde(
        rename = "updatedAt",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates an unsaved user with both timestamps set to now.
    #[must_use]
    pub fn new(name: Option<String>, email: impl Into<String>, profile: Option<ObjectId>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name,
            email: email.into(),
            profile,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A user read back with its profile reference resolved.
///
/// Resolution happens on every read with a fresh fetch; nothing is cached.
/// `profile` is `None` when the user holds no reference or when the
/// referenced profile no longer exists (references do not cascade, so a
/// dangling one is a legal state, not an error).
#[derive(Debug, Clone, PartialEq)]
pub struct UserWithProfile {
    /// The user document as stored
    pub user: User,
    /// The referenced profile, freshly fetched
    pub profile: Option<Profile>,
}

impl UserWithProfile {
    /// Returns the resolved profile's bio, if any.
    #[must_use]
    pub fn bio(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.bio.as_deref())
    }
}
