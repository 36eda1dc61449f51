//! `MongoDB` Change Stream Event Representation
//!
//! This module defines the event types that flow from a watched collection to
//! an event handler. Events are transient: they describe one committed
//! mutation, are handed to the consumer once, and are never persisted or
//! replayed by this crate.
//!
//! # Examples
//!
//! ```rust
//! use vedetta_core::event::{ChangeEvent, OperationType, Namespace};
//! use bson::doc;
//! use chrono::Utc;
//!
//! // Create an insert event manually
//! let event = ChangeEvent {
//!     operation: OperationType::Insert,
//!     namespace: Namespace {
//!         database: "mongodb-change-streams-demo".to_string(),
//!         collection: "users".to_string(),
//!     },
//!     document_key: Some(doc! { "_id": 123 }),
//!     full_document: Some(doc! {
//!         "_id": 123,
//!         "name": "Alice",
//!         "email": "alice@example.com"
//!     }),
//!     update_description: None,
//!     cluster_time: Utc::now(),
//! };
//!
//! assert!(event.is_insert());
//! assert_eq!(event.collection_name(), "users");
//!
//! if let Some(doc) = &event.full_document {
//!     println!("Inserted: {:?}", doc);
//! }
//! ```

use bson::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// `MongoDB` change stream operation types.
///
/// Represents all operations a change stream can report. The explicit set
/// matches the server's vocabulary; the `Unknown` variant captures any kind
/// introduced by a newer server version so the consumer's catch-all branch
/// can still route it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum OperationType {
    /// A document was inserted into a collection
    Insert,

    /// A document was updated (modified in place)
    Update,

    /// A document was deleted from a collection
    Delete,

    /// A document was replaced entirely (all fields changed)
    Replace,

    /// The change stream was invalidated (collection dropped, renamed, etc.)
    Invalidate,

    /// A collection was dropped
    Drop,

    /// A database was dropped
    #[serde(rename = "dropDatabase")]
    DropDatabase,

    /// A collection was renamed
    Rename,

    /// An operation type this crate does not know about
    ///
    /// Contains the original operation type string for logging and debugging.
    #[serde(untagged)]
    Unknown(String),
}

impl OperationType {
    /// Returns the wire name of this operation kind.
    ///
    /// For `Unknown`, returns the captured original string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Replace => "replace",
            Self::Invalidate => "invalidate",
            Self::Drop => "drop",
            Self::DropDatabase => "dropDatabase",
            Self::Rename => "rename",
            Self::Unknown(kind) => kind,
        }
    }

    /// Returns true if this operation modifies data (insert, update, replace).
    #[inline]
    #[must_use]
    pub fn is_data_modification(&self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::Replace)
    }

    /// Returns true if this operation removes data (delete, drop, drop database).
    #[inline]
    #[must_use]
    pub fn is_data_removal(&self) -> bool {
        matches!(self, Self::Delete | Self::Drop | Self::DropDatabase)
    }

    /// Returns true if this operation is a DDL operation (drop, rename, drop database).
    #[inline]
    #[must_use]
    pub fn is_ddl(&self) -> bool {
        matches!(self, Self::Drop | Self::DropDatabase | Self::Rename)
    }

    /// Returns true if this is an unknown operation type.
    #[inline]
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `MongoDB` namespace (database + collection).
///
/// Identifies the specific collection where an operation occurred.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    /// Database name
    pub database: String,

    /// Collection name
    pub collection: String,
}

impl Namespace {
    /// Creates a new namespace from database and collection names.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Returns the fully qualified namespace as "database.collection".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Update description for partial document updates.
///
/// When a document is updated (not replaced), this describes what changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDescription {
    /// Fields that were added or modified
    #[serde(rename = "updatedFields")]
    pub updated_fields: Document,

    /// Fields that were removed from the document
    #[serde(rename = "removedFields")]
    pub removed_fields: Vec<String>,

    /// Array modifications (if any)
    #[serde(rename = "truncatedArrays", skip_serializing_if = "Option::is_none")]
    pub truncated_arrays: Option<Vec<TruncatedArray>>,
}

/// Describes modifications to an array field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruncatedArray {
    /// Field path to the array
    pub field: String,

    /// New size of the array after truncation
    #[serde(rename = "newSize")]
    pub new_size: u32,
}

/// A single mutation reported by a collection's change stream.
///
/// The payload fields follow the operation kind: `full_document` is present
/// for inserts and replaces, `update_description` only for updates, and
/// `document_key` for everything that targets a single document. Invalidate
/// and database-level events may carry none of them.
///
/// # Examples
///
/// ```rust
/// use vedetta_core::event::{ChangeEvent, OperationType};
///
/// fn describe(event: &ChangeEvent) {
///     match event.operation {
///         OperationType::Insert => {
///             if let Some(doc) = &event.full_document {
///                 println!("new document in {}: {:?}", event.collection_name(), doc);
///             }
///         }
///         OperationType::Update => {
///             if let Some(delta) = &event.update_description {
///                 let keys: Vec<_> = delta.updated_fields.keys().collect();
///                 println!("changed fields: {keys:?}");
///             }
///         }
///         OperationType::Delete => {
///             println!("deleted key: {:?}", event.document_key);
///         }
///         _ => println!("other operation: {}", event.operation),
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Type of operation that occurred
    #[serde(rename = "operationType")]
    pub operation: OperationType,

    /// Namespace (database + collection) where the operation occurred
    #[serde(rename = "ns")]
    pub namespace: Namespace,

    /// Document key (`_id`, and shard key if sharded)
    ///
    /// Present for all document-level operations; `None` for invalidate and
    /// database-level events.
    #[serde(rename = "documentKey", skip_serializing_if = "Option::is_none")]
    pub document_key: Option<Document>,

    /// Full document after the operation
    ///
    /// Present for insert and replace. Absent for plain updates and deletes.
    #[serde(rename = "fullDocument", skip_serializing_if = "Option::is_none")]
    pub full_document: Option<Document>,

    /// Description of what changed in an update operation
    ///
    /// Present only for update operations.
    #[serde(rename = "updateDescription", skip_serializing_if = "Option::is_none")]
    pub update_description: Option<UpdateDescription>,

    /// Timestamp of the operation in the oplog
    #[serde(rename = "clusterTime")]
    pub cluster_time: DateTime<Utc>,
}

impl ChangeEvent {
    /// Returns true if this is an insert operation.
    #[inline]
    #[must_use]
    pub fn is_insert(&self) -> bool {
        self.operation == OperationType::Insert
    }

    /// Returns true if this is an update operation.
    #[inline]
    #[must_use]
    pub fn is_update(&self) -> bool {
        self.operation == OperationType::Update
    }

    /// Returns true if this is a delete operation.
    #[inline]
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.operation == OperationType::Delete
    }

    /// Returns true if this is a replace operation.
    #[inline]
    #[must_use]
    pub fn is_replace(&self) -> bool {
        self.operation == OperationType::Replace
    }

    /// Returns true if this is an invalidate operation.
    #[inline]
    #[must_use]
    pub fn is_invalidate(&self) -> bool {
        self.operation == OperationType::Invalidate
    }

    /// Returns the collection name.
    #[inline]
    #[must_use]
    pub fn collection_name(&self) -> &str {
        &self.namespace.collection
    }

    /// Returns the database name.
    #[inline]
    #[must_use]
    pub fn database_name(&self) -> &str {
        &self.namespace.database
    }

    /// Returns the fully qualified namespace as "database.collection".
    #[inline]
    #[must_use]
    pub fn full_namespace(&self) -> String {
        self.namespace.full_name()
    }

    /// Returns the document ID if present in the document key.
    ///
    /// Returns `None` if `document_key` is not present (e.g., invalidate
    /// events).
    #[must_use]
    pub fn document_id(&self) -> Option<&bson::Bson> {
        self.document_key.as_ref()?.get("_id")
    }

    /// Returns true if this event carries a full document.
    #[inline]
    #[must_use]
    pub fn has_full_document(&self) -> bool {
        self.full_document.is_some()
    }

    /// Returns true if this event carries an update description.
    #[inline]
    #[must_use]
    pub fn has_update_description(&self) -> bool {
        self.update_description.is_some()
    }
}

/// Conversion from the driver's raw change stream event.
///
/// Infallible: this crate carries no resume token (events are never
/// persisted or replayed), and every other field either maps directly or has
/// a safe fallback.
impl From<mongodb::change_stream::event::ChangeStreamEvent<Document>> for ChangeEvent {
    fn from(event: mongodb::change_stream::event::ChangeStreamEvent<Document>) -> Self {
        use mongodb::change_stream::event::OperationType as MongoOpType;

        let operation = match event.operation_type {
            MongoOpType::Insert => OperationType::Insert,
            MongoOpType::Update => OperationType::Update,
            MongoOpType::Delete => OperationType::Delete,
            MongoOpType::Replace => OperationType::Replace,
            MongoOpType::Invalidate => OperationType::Invalidate,
            MongoOpType::Drop => OperationType::Drop,
            MongoOpType::DropDatabase => OperationType::DropDatabase,
            MongoOpType::Rename => OperationType::Rename,
            _ => {
                // Preserve the original type string so the catch-all branch
                // can log what the server actually sent.
                let kind = format!("{:?}", event.operation_type);
                warn!(kind = %kind, "Unknown MongoDB operation type");
                OperationType::Unknown(kind)
            }
        };

        let namespace = event
            .ns
            .map(|ns| Namespace {
                database: ns.db,
                collection: ns.coll.unwrap_or_default(),
            })
            .unwrap_or_else(|| Namespace {
                database: String::new(),
                collection: String::new(),
            });

        let update_description = event.update_description.map(|ud| UpdateDescription {
            updated_fields: ud.updated_fields,
            removed_fields: ud.removed_fields,
            truncated_arrays: ud.truncated_arrays.map(|arrays| {
                arrays
                    .into_iter()
                    .map(|ta| TruncatedArray {
                        field: ta.field,
                        new_size: ta.new_size as u32,
                    })
                    .collect()
            }),
        });

        // MongoDB timestamps carry seconds plus an ordinal within the second;
        // mapping the ordinal into nanoseconds keeps same-second events ordered.
        let cluster_time = event
            .cluster_time
            .and_then(|ts| {
                let nanos = ts.increment.saturating_mul(1_000_000);
                DateTime::from_timestamp(i64::from(ts.time), nanos)
            })
            .unwrap_or_else(|| {
                warn!("Missing or invalid cluster time in change stream event, using current time");
                Utc::now()
            });

        Self {
            operation,
            namespace,
            document_key: event.document_key,
            full_document: event.full_document,
            update_description,
            cluster_time,
        }
    }
}
