//! Favorite records
//!
//! A set of (account, record) pairs. Only records the account owns can be
//! favorited.

use tracing::debug;

use crate::db::SurveyStore;
use crate::services::ownership;
use crate::types::{DataObject, FavoriteKey, RecordId, Result, SurveyError, User};

/// Mark an owned record as favorite. Adding twice is a no-op.
pub async fn add(store: &dyn SurveyStore, user: &User, record_id: RecordId) -> Result<()> {
    if !ownership::owns_record(store, user.id, record_id).await? {
        return Err(SurveyError::NotFound(
            "DataObject not found or not accessible to user".into(),
        ));
    }
    let key = FavoriteKey::new(user.id, record_id);
    if store.is_favorite(key).await? {
        debug!(user_id = user.id, record_id, "Record already a favorite");
        return Ok(());
    }
    store.add_favorite(key).await?;
    Ok(())
}

/// Remove a favorite. `NotFound` if it was not one.
pub async fn remove(store: &dyn SurveyStore, user: &User, record_id: RecordId) -> Result<()> {
    if store
        .remove_favorite(FavoriteKey::new(user.id, record_id))
        .await?
    {
        Ok(())
    } else {
        Err(SurveyError::NotFound(
            "DataObject not found or not in user's favorites".into(),
        ))
    }
}

/// Favorite records of an account, ascending id
pub async fn list(store: &dyn SurveyStore, user: &User) -> Result<Vec<DataObject>> {
    let mut records = Vec::new();
    for id in store.list_favorites(user.id).await? {
        // Favorites whose record has since disappeared are skipped
        if let Some(record) = store.get_record(id).await? {
            records.push(record);
        }
    }
    Ok(records)
}
