//! Scripted Store Activity
//!
//! Runs a fixed CRUD sequence against the `users` and `profiles`
//! collections so a terminal running `watch-users` shows every routing
//! branch: inserts, updates, a rejected duplicate e-mail (which emits no
//! event), and deletes.
//!
//! # Prerequisites
//!
//! Start MongoDB (replica set required for change streams):
//! ```bash
//! docker run -d --name mongodb -p 27017:27017 \
//!   mongo:7.0 --replSet rs0
//!
//! # Initialize replica set
//! docker exec mongodb mongosh --eval "rs.initiate()"
//! ```
//!
//! # Running
//!
//! ```bash
//! # Terminal 1
//! cargo run --bin watch-users
//!
//! # Terminal 2
//! MONGO_DB_URL="mongodb://localhost:27017/?replicaSet=rs0&directConnection=true" \
//!   cargo run --bin seed-activity
//! ```

use std::error::Error;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use vedetta_core::connection::{Connection, ConnectionSettings};
use vedetta_store::{Profile, ProfileStore, StoreError, User, UserStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    info!("Starting Vedetta activity seeder");

    let settings = ConnectionSettings::from_env()?;
    let mut conn = Connection::new(settings);
    if !conn.connect().await {
        return Err("MongoDB is not reachable; check MONGO_DB_URL".into());
    }

    let db = conn.database().ok_or("not connected")?;
    let profiles = ProfileStore::new(&db);
    let users = UserStore::new(&db);
    users.ensure_indexes().await?;

    // Unique per run so the script can be re-run against a dirty database.
    let suffix: u32 = rand::random();
    let email = format!("ada+{suffix}@example.com");

    // 1. A profile, then a user referencing it.
    let profile_id = profiles
        .insert(&Profile::new(Some(
            "Watches change streams for a living".to_string(),
        )))
        .await?;
    info!(profile_id = %profile_id, "Seeded profile");

    let user_id = users
        .insert(&User::new(
            Some("Ada".to_string()),
            email.clone(),
            Some(profile_id),
        ))
        .await?;
    info!(user_id = %user_id, email = %email, "Seeded user");

    // 2. Read back with the reference resolved.
    let read = users.find_by_id(user_id).await?.ok_or("seeded user vanished")?;
    info!(name = ?read.user.name, bio = ?read.bio(), "Read user with resolved profile");

    // 3. Update the profile, then re-read the user. Resolution is a fresh
    //    fetch, so the new bio shows up immediately.
    profiles
        .update_bio(profile_id, "Now updating documents instead")
        .await?;
    let read = users.find_by_id(user_id).await?.ok_or("seeded user vanished")?;
    info!(bio = ?read.bio(), "Re-read user after profile update");

    // 4. Rename the user; the watcher logs the update delta.
    users.update_name(user_id, "Ada Lovelace").await?;
    info!(user_id = %user_id, "Renamed user");

    // 5. A second user with the same e-mail must be rejected, and the
    //    watcher must stay silent about it: the write never reaches the
    //    oplog.
    match users
        .insert(&User::new(Some("Imposter".to_string()), email.clone(), None))
        .await
    {
        Err(StoreError::DuplicateKey { .. }) => {
            info!(email = %email, "Duplicate e-mail rejected, as expected");
        }
        Ok(id) => {
            warn!(user_id = %id, "Duplicate e-mail was accepted; is the unique index missing?");
        }
        Err(e) => return Err(e.into()),
    }

    // 6. Clean up; this doubles as the delete events.
    users.delete(user_id).await?;
    profiles.delete(profile_id).await?;
    info!("Seed sequence complete");

    conn.disconnect().await;
    Ok(())
}

/// Initialize structured logging
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vedetta_core=info,vedetta_store=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();
}
