//! Live User-Collection Watcher
//!
//! Connects to MongoDB, makes sure the unique e-mail index exists, opens a
//! change feed on the `users` collection, and logs every mutation until
//! Ctrl+C. Run `seed-activity` in a second terminal to see the full routing
//! matrix go by.
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
//! MONGO_DB_URL="mongodb://localhost:27017/?replicaSet=rs0&directConnection=true" \
//!   cargo run --bin watch-users
//! ```
//!
//! `MONGO_DB_NAME` picks the database (defaults to
//! `mongodb-change-streams-demo`).

use std::error::Error;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use vedetta_core::connection::{Connection, ConnectionSettings};
use vedetta_core::feed::ChangeFeed;
use vedetta_core::handler::LogHandler;
use vedetta_core::metrics;
use vedetta_store::UserStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging and metric descriptions
    init_logging();
    metrics::init_metrics();

    info!("Starting Vedetta user watcher");

    let settings = ConnectionSettings::from_env()?;
    info!(uri = %settings.uri, database = %settings.database, "Configuration loaded");

    let mut conn = Connection::new(settings);
    if !conn.connect().await {
        return Err("MongoDB is not reachable; check MONGO_DB_URL".into());
    }

    let db = conn.database().ok_or("not connected")?;

    // The driver never creates indexes on its own; do it explicitly so the
    // duplicate-e-mail part of the demo actually rejects.
    let users = UserStore::new(&db);
    users.ensure_indexes().await?;

    let mut feed = ChangeFeed::watch(&db, UserStore::COLLECTION).await?;
    let mut handler = LogHandler::new();
    info!(namespace = %feed.namespace(), "Change feed open");
    info!("");

    display_usage();

    tokio::select! {
        result = feed.consume(&mut handler) => match result {
            Ok(dispatched) => info!(dispatched, "Change feed ended"),
            Err(e) => error!(error = %e, "Change feed failed"),
        },
        _ = signal::ctrl_c() => {
            info!("");
            info!("Received shutdown signal");
        }
    }

    info!(events = handler.event_count(), "Shutting down");
    feed.close().await;
    conn.disconnect().await;

    info!("Watcher stopped");
    Ok(())
}

fn display_usage() {
    info!("Usage:");
    info!("");
    info!("   1. This terminal is now watching the 'users' collection");
    info!("   2. In another terminal, generate some activity:");
    info!("");
    info!("      cargo run --bin seed-activity");
    info!("");
    info!("      # or by hand:");
    info!("      docker exec mongodb mongosh mongodb-change-streams-demo --eval '");
    info!("        db.users.insertOne({{email: \"alice@example.com\"}})");
    info!("      '");
    info!("");
    info!("   3. Watch every insert, update, and delete appear here");
    info!("   4. Press Ctrl+C to stop gracefully");
    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");
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
