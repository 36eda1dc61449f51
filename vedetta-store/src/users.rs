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

//! Store for the `users` collection, with eager profile resolution.

use bson::oid::ObjectId;
use bson::{doc, Bson, DateTime as BsonDateTime};
use chrono::Utc;
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use tracing::{debug, info, trace};

use crate::error::StoreError;
use crate::model::{User, UserWithProfile};
use crate::profiles::ProfileStore;

/// CRUD access to the `users` collection.
///
/// Every read returns a [`UserWithProfile`]: the stored `profile` reference
/// is resolved with an explicit second fetch at read time, so the embedded
/// profile always reflects the `profiles` collection as it is now. Nothing
/// is cached, and a dangling reference resolves to `None`.
///
/// E-mail uniqueness is enforced by a unique index. Indexes are never
/// created implicitly; call [`ensure_indexes`](Self::ensure_indexes) once
/// before the first insert.
#[derive(Debug, Clone)]
pub struct UserStore {
    collection: Collection<User>,
    profiles: ProfileStore,
}

impl UserStore {
    /// Name of the backing collection.
    pub const COLLECTION: &'static str = "users";

    /// Name of the unique e-mail index.
    const EMAIL_INDEX: &'static str = "email_unique";

    /// Creates a store over the `users` collection of `db`.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(Self::COLLECTION),
            profiles: ProfileStore::new(db),
        }
    }

    /// Creates the unique index on `email`.
    ///
    /// Idempotent: the server treats re-creating an identical index as a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if index creation fails.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .name(Self::EMAIL_INDEX.to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let result = self.collection.create_index(index).await?;
        info!(index = %result.index_name, "Ensured unique email index");
        Ok(())
    }

    /// Inserts a user and returns its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateKey`] if the e-mail address is already
    /// taken; the rejected write emits no change event. Other failures map
    /// to [`StoreError::Database`], and a non-`ObjectId` id to
    /// [`StoreError::UnexpectedInsertId`].
    pub async fn insert(&self, user: &User) -> Result<ObjectId, StoreError> {
        trace!(email = %user.email, "Inserting user");

        let result = self.collection.insert_one(user).await?;
        let id = match result.inserted_id {
            Bson::ObjectId(id) => id,
            other => return Err(StoreError::UnexpectedInsertId { id: other }),
        };

        debug!(user_id = %id, email = %user.email, "Inserted user");
        Ok(id)
    }

    /// Fetches a user by id, with the profile reference resolved.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if either fetch fails.
    pub async fn find_by_id(&self, id: ObjectId) -> Result<Option<UserWithProfile>, StoreError> {
        trace!(user_id = %id, "Fetching user");
        match self.collection.find_one(doc! { "_id": id }).await? {
            Some(user) => Ok(Some(self.resolve(user).await?)),
            None => Ok(None),
        }
    }

    /// Fetches a user by e-mail, with the profile reference resolved.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if either fetch fails.
    pub async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithProfile>, StoreError> {
        trace!(email = %email, "Fetching user by email");
        match self.collection.find_one(doc! { "email": email }).await? {
            Some(user) => Ok(Some(self.resolve(user).await?)),
            None => Ok(None),
        }
    }

    /// Points the user's profile reference at `profile_id` and bumps
    /// `updatedAt`.
    ///
    /// The target profile is not checked for existence; a reference to a
    /// missing profile simply resolves to `None` on reads.
    ///
    /// Returns true if a user with that id existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the update fails.
    pub async fn set_profile(
        &self,
        id: ObjectId,
        profile_id: ObjectId,
    ) -> Result<bool, StoreError> {
        let update = doc! {
            "$set": {
                "profile": profile_id,
                "updatedAt": BsonDateTime::from_chrono(Utc::now()),
            }
        };

        let result = self.collection.update_one(doc! { "_id": id }, update).await?;
        debug!(
            user_id = %id,
            profile_id = %profile_id,
            matched = result.matched_count,
            "Set user profile reference"
        );
        Ok(result.matched_count > 0)
    }

    /// Renames the user and bumps `updatedAt`.
    ///
    /// Returns true if a user with that id existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the update fails.
    pub async fn update_name(&self, id: ObjectId, name: &str) -> Result<bool, StoreError> {
        let update = doc! {
            "$set": {
                "name": name,
                "updatedAt": BsonDateTime::from_chrono(Utc::now()),
            }
        };

        let result = self.collection.update_one(doc! { "_id": id }, update).await?;
        debug!(
            user_id = %id,
            matched = result.matched_count,
            "Updated user name"
        );
        Ok(result.matched_count > 0)
    }

    /// Deletes a user. The referenced profile, if any, is left untouched.
    ///
    /// Returns true if a user was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the delete fails.
    pub async fn delete(&self, id: ObjectId) -> Result<bool, StoreError> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        debug!(
            user_id = %id,
            deleted = result.deleted_count,
            "Deleted user"
        );
        Ok(result.deleted_count > 0)
    }

    /// Resolves the profile reference with a fresh fetch.
    async fn resolve(&self, user: User) -> Result<UserWithProfile, StoreError> {
        let profile = match user.profile {
            Some(profile_id) => {
                trace!(profile_id = %profile_id, "Resolving profile reference");
                self.profiles.find_by_id(profile_id).await?
            }
            None => None,
        };

        Ok(UserWithProfile { user, profile })
    }
}
