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

//! Typed `MongoDB` document stores for the Vedetta demo schema.
//!
//! Two collections make up the schema:
//!
//! - `profiles`: standalone biography documents ([`Profile`]).
//! - `users`: accounts with a unique e-mail and an optional reference to a
//!   profile ([`User`]).
//!
//! The reference is resolved eagerly: every user read performs an explicit
//! second fetch and returns a [`UserWithProfile`], so the embedded profile
//! always reflects the `profiles` collection at read time. A dangling
//! reference resolves to `None`, never to an error.
//!
//! Uniqueness, timestamp bumping, and resolution are store concerns; the
//! models carry no behavior beyond their constructors. Indexes are never
//! created implicitly: call [`UserStore::ensure_indexes`] once at startup.
//!
//! # Examples
//!
//! ```rust,no_run
//! use vedetta_store::{Profile, ProfileStore, User, UserStore};
//!
//! # async fn example(db: mongodb::Database) -> Result<(), Box<dyn std::error::Error>> {
//! let profiles = ProfileStore::new(&db);
//! let users = UserStore::new(&db);
//! users.ensure_indexes().await?;
//!
//! let profile_id = profiles
//!     .insert(&Profile::new(Some("Rust engineer".to_string())))
//!     .await?;
//! let user_id = users
//!     .insert(&User::new(
//!         Some("Ada".to_string()),
//!         "ada@example.com",
//!         Some(profile_id),
//!     ))
//!     .await?;
//!
//! let read = users.find_by_id(user_id).await?.ok_or("user vanished")?;
//! println!("{:?} has bio {:?}", read.user.name, read.bio());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod model;
pub mod profiles;
pub mod users;

pub use error::StoreError;
pub use model::{Profile, User, UserWithProfile};
pub use profiles::ProfileStore;
pub use users::UserStore;
