//! MongoDB client and collection wrapper
//!
//! Typed collections apply their schema-declared indexes on open and stamp
//! shared metadata timestamps on insert. Reads filter soft-deleted documents.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::{map_write_error, ForemanError};

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, ForemanError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| ForemanError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        // Verify connection with timeout
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ForemanError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, ForemanError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, ForemanError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        // Apply indexes
        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), ForemanError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| {
                IndexModel::builder()
                    .keys(keys)
                    .options(opts)
                    .build()
            })
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| ForemanError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps.
    ///
    /// A unique index violation comes back as `ForemanError::Duplicate` so
    /// callers can treat it as a conflict rather than a database fault.
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, ForemanError> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| map_write_error("Insert failed", e))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| ForemanError::Database("Failed to get inserted ID".into()))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, ForemanError> {
        // Add is_deleted check
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .find_one(full_filter)
            .await
            .map_err(|e| ForemanError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, ForemanError> {
        use futures_util::StreamExt;

        // Add is_deleted check
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let cursor = self
            .inner
            .find(full_filter)
            .await
            .map_err(|e| ForemanError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, ForemanError> {
        let modifications = update.into();

        self.inner
            .update_one(filter, modifications)
            .await
            .map_err(|e| map_write_error("Update failed", e))
    }

    /// Conditionally update one document and return it post-update.
    ///
    /// The filter carries the state guard (expected status, leader unset),
    /// so `None` means the guard no longer held when the write landed.
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<Option<T>, ForemanError> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.inner
            .find_one_and_update(full_filter, update)
            .with_options(options)
            .await
            .map_err(|e| ForemanError::Database(format!("Conditional update failed: {}", e)))
    }

    /// Soft delete a document
    pub async fn soft_delete(&self, filter: Document) -> Result<UpdateResult, ForemanError> {
        let update = doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.deleted_at": DateTime::now(),
                "metadata.updated_at": DateTime::now(),
            }
        };

        self.update_one(filter, update).await
    }

    /// Hard delete a document (compensation path only)
    pub async fn delete_one(&self, filter: Document) -> Result<u64, ForemanError> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| ForemanError::Database(format!("Delete failed: {}", e)))?;

        Ok(result.deleted_count)
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running MongoDB instance
    // See docker-compose.dev.yml for local testing
}
