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

//! Store for the `profiles` collection.

use bson::oid::ObjectId;
use bson::{doc, Bson, DateTime as BsonDateTime};
use chrono::Utc;
use mongodb::{Collection, Database};
use tracing::{debug, trace};

use crate::error::StoreError;
use crate::model::Profile;

/// CRUD access to the `profiles` collection.
///
/// Profiles are standalone documents: created independently, mutated in
/// place, deleted independently. Deleting a profile does not touch any user
/// referencing it; the reference dangles and resolves to nothing on the
/// next read.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    collection: Collection<Profile>,
}

impl ProfileStore {
    /// Name of the backing collection.
    pub const COLLECTION: &'static str = "profiles";

    /// Creates a store over the `profiles` collection of `db`.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION),
        }
    }

    /// Inserts a profile and returns its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails, or
    /// [`StoreError::UnexpectedInsertId`] if the server assigns a
    /// non-`ObjectId` id.
    pub async fn insert(&self, profile: &Profile) -> Result<ObjectId, StoreError> {
        trace!(bio = ?profile.bio, "Inserting profile");

        let result = self.collection.insert_one(profile).await?;
        let id = match result.inserted_id {
            Bson::ObjectId(id) => id,
            other => return Err(StoreError::UnexpectedInsertId { id: other }),
        };

        debug!(profile_id = %id, "Inserted profile");
        Ok(id)
    }

    /// Fetches a profile by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn find_by_id(&self, id: ObjectId) -> Result<Option<Profile>, StoreError> {
        trace!(profile_id = %id, "Fetching profile");
        let profile = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(profile)
    }

    /// Replaces the bio text and bumps `updatedAt`.
    ///
    /// Returns true if a profile with that id existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the update fails.
    pub async fn update_bio(&self, id: ObjectId, bio: &str) -> Result<bool, StoreError> {
        let update = doc! {
            "$set": {
                "bio": bio,
                "updatedAt": BsonDateTime::from_chrono(Utc::now()),
            }
        };

        let result = self.collection.update_one(doc! { "_id": id }, update).await?;
        debug!(
            profile_id = %id,
            matched = result.matched_count,
            "Updated profile bio"
        );
        Ok(result.matched_count > 0)
    }

    /// Deletes a profile.
    ///
    /// No cascade: users referencing this profile keep their reference and
    /// resolve it to `None` from now on.
    ///
    /// Returns true if a profile was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the delete fails.
    pub async fn delete(&self, id: ObjectId) -> Result<bool, StoreError> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        debug!(
            profile_id = %id,
            deleted = result.deleted_count,
            "Deleted profile"
        );
        Ok(result.deleted_count > 0)
    }
}
