//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures_util::StreamExt;
use mongodb::{
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::SurveyError;

/// Collection holding per-entity id sequences
pub const COUNTER_COLLECTION: &str = "counters";

/// Server selection and connect timeouts appended to every URI
const TIMEOUT_PARAMS: &str = "serverSelectionTimeoutMS=3000&connectTimeoutMS=3000";

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
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, SurveyError> {
        info!("Connecting to MongoDB at {}", uri);

        let client = Client::with_uri_str(with_timeouts(uri))
            .await
            .map_err(|e| SurveyError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| SurveyError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, SurveyError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Allocate the next value of a named id sequence (1, 2, 3, ...)
    pub async fn next_sequence(&self, sequence: &str) -> Result<i64, SurveyError> {
        let counters = self
            .client
            .database(&self.db_name)
            .collection::<Document>(COUNTER_COLLECTION);

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let updated = counters
            .find_one_and_update(doc! { "_id": sequence }, doc! { "$inc": { "seq": 1_i64 } })
            .with_options(options)
            .await
            .map_err(|e| SurveyError::Database(format!("Sequence update failed: {}", e)))?
            .ok_or_else(|| SurveyError::Database(format!("Sequence '{}' not returned", sequence)))?;

        updated
            .get_i64("seq")
            .map_err(|e| SurveyError::Database(format!("Sequence '{}' malformed: {}", sequence, e)))
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
    ) -> Result<Self, SurveyError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), SurveyError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| SurveyError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, SurveyError> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| SurveyError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| SurveyError::Database("Failed to get inserted ID".into()))
    }

    /// Find one live document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, SurveyError> {
        let full_filter = live(filter);

        self.inner
            .find_one(full_filter)
            .await
            .map_err(|e| SurveyError::Database(format!("Find failed: {}", e)))
    }

    /// Find live documents by filter, sorted, with optional skip/limit
    pub async fn find_many(
        &self,
        filter: Document,
        sort: Document,
        skip: Option<u64>,
        limit: Option<i64>,
    ) -> Result<Vec<T>, SurveyError> {
        let full_filter = live(filter);

        let options = FindOptions::builder()
            .sort(sort)
            .skip(skip)
            .limit(limit)
            .build();

        let cursor = self
            .inner
            .find(full_filter)
            .with_options(options)
            .await
            .map_err(|e| SurveyError::Database(format!("Find failed: {}", e)))?;

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

    /// Update one live document, bumping `metadata.updated_at`
    pub async fn update_one(
        &self,
        filter: Document,
        set: Document,
    ) -> Result<UpdateResult, SurveyError> {
        let full_filter = live(filter);

        let modifications: UpdateModifications = stamped_set(set, DateTime::now()).into();

        self.inner
            .update_one(full_filter, modifications)
            .await
            .map_err(|e| SurveyError::Database(format!("Update failed: {}", e)))
    }

    /// Soft delete every live document matching the filter
    pub async fn soft_delete_many(&self, filter: Document) -> Result<UpdateResult, SurveyError> {
        let full_filter = live(filter);

        let update = doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.deleted_at": DateTime::now(),
                "metadata.updated_at": DateTime::now(),
            }
        };

        self.inner
            .update_many(full_filter, update)
            .await
            .map_err(|e| SurveyError::Database(format!("Soft delete failed: {}", e)))
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

/// Add the connection timeouts so an unreachable server fails fast
fn with_timeouts(uri: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{}{}{}", uri, separator, TIMEOUT_PARAMS)
}

/// Restrict a filter to documents that are not soft deleted
fn live(mut filter: Document) -> Document {
    filter.insert("metadata.is_deleted", doc! { "$ne": true });
    filter
}

/// `$set` update for `set`, also bumping `metadata.updated_at`
fn stamped_set(mut set: Document, now: DateTime) -> Document {
    set.insert("metadata.updated_at", now);
    doc! { "$set": set }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_appended_to_uri() {
        assert_eq!(
            with_timeouts("mongodb://localhost:27017"),
            format!("mongodb://localhost:27017?{}", TIMEOUT_PARAMS)
        );
        assert_eq!(
            with_timeouts("mongodb://db:27017/?replicaSet=rs0"),
            format!("mongodb://db:27017/?replicaSet=rs0&{}", TIMEOUT_PARAMS)
        );
    }

    #[test]
    fn test_live_filter_keeps_caller_conditions() {
        let filter = live(doc! { "owner_id": 7_i64 });
        assert_eq!(filter.get_i64("owner_id").unwrap(), 7);
        assert_eq!(
            filter.get_document("metadata.is_deleted").unwrap(),
            &doc! { "$ne": true }
        );
    }

    #[test]
    fn test_stamped_set_wraps_fields() {
        let now = DateTime::from_millis(1_700_000_000_000);
        let update = stamped_set(doc! { "additional_info": "checked" }, now);
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("additional_info").unwrap(), "checked");
        assert_eq!(set.get_datetime("metadata.updated_at").unwrap(), &now);
        assert_eq!(update.len(), 1);
    }
}
