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

//! Vedetta core: `MongoDB` connection management and change-feed consumption.
//!
//! This crate provides the two building blocks of a Vedetta deployment:
//!
//! - [`connection`]: a pooled `MongoDB` connection with a contained
//!   connect/disconnect contract; failures are logged and surfaced as
//!   booleans, never panics.
//! - [`feed`] + [`handler`]: a [`feed::ChangeFeed`] is an owned handle over a
//!   single collection's change stream; [`feed::ChangeFeed::consume`] drives
//!   it, dispatching every event to an [`handler::EventHandler`] behind a
//!   recovery boundary so one bad event cannot kill the subscription.
//!
//! Events are delivered in the server's commit order and handled one at a
//! time; the handler must return before the next event is read. There is no
//! buffering, no replay, and no reconnection: a broken stream closes the
//! feed.
//!
//! # Examples
//!
//! ```rust,no_run
//! use vedetta_core::connection::{Connection, ConnectionSettings};
//! use vedetta_core::feed::ChangeFeed;
//! use vedetta_core::handler::LogHandler;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ConnectionSettings::from_env()?;
//! let mut conn = Connection::new(settings);
//!
//! if !conn.connect().await {
//!     return Err("MongoDB is not reachable".into());
//! }
//!
//! let db = conn.database().ok_or("not connected")?;
//! let mut feed = ChangeFeed::watch(&db, "users").await?;
//! let mut handler = LogHandler::new();
//!
//! // Runs until the stream ends or errors; Ctrl-C handling is the caller's.
//! let delivered = feed.consume(&mut handler).await?;
//! println!("delivered {delivered} events");
//!
//! feed.close().await;
//! conn.disconnect().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod connection;
pub mod event;
pub mod feed;
pub mod handler;
pub mod metrics;

pub use connection::{Connection, ConnectionError, ConnectionSettings};
pub use event::{ChangeEvent, Namespace, OperationType, UpdateDescription};
pub use feed::{ChangeFeed, FeedError, FeedState};
pub use handler::{EventHandler, HandlerError, LogHandler, RecordingHandler};
