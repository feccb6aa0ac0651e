//! Ownership gate
//!
//! A record belongs to whoever owns its questionnaire. Every core operation
//! resolves its inputs through here before reading or writing anything else.

use crate::db::SurveyStore;
use crate::types::{DataObject, Questionnaire, QuestionnaireId, RecordId, Result, SurveyError, UserId};

/// Load a questionnaire owned by `user_id`.
///
/// `NotFound` if it does not exist, `NotOwned` if someone else owns it.
pub async fn owned_questionnaire(
    store: &dyn SurveyStore,
    user_id: UserId,
    questionnaire_id: QuestionnaireId,
) -> Result<Questionnaire> {
    let questionnaire = store
        .get_questionnaire(questionnaire_id)
        .await?
        .ok_or_else(|| {
            SurveyError::NotFound(format!("Questionnaire with id {} not found", questionnaire_id))
        })?;

    if questionnaire.owner_id != user_id {
        return Err(SurveyError::NotOwned(format!(
            "Questionnaire with id {} is not owned by the current user",
            questionnaire_id
        )));
    }
    Ok(questionnaire)
}

/// Load a record whose questionnaire is owned by `user_id`
pub async fn owned_record(
    store: &dyn SurveyStore,
    user_id: UserId,
    record_id: RecordId,
) -> Result<DataObject> {
    let record = store
        .get_record(record_id)
        .await?
        .ok_or_else(|| SurveyError::NotFound(format!("DataObject with id {} not found", record_id)))?;

    let owner = store
        .get_questionnaire(record.questionnaire_id)
        .await?
        .map(|q| q.owner_id);

    match owner {
        Some(owner) if owner == user_id => Ok(record),
        // Orphaned records are unreachable for everyone
        None => Err(SurveyError::NotFound(format!(
            "DataObject with id {} not found",
            record_id
        ))),
        Some(_) => Err(SurveyError::NotOwned(format!(
            "DataObject with id {} is not owned by the current user",
            record_id
        ))),
    }
}

pub async fn owns(
    store: &dyn SurveyStore,
    user_id: UserId,
    questionnaire_id: QuestionnaireId,
) -> Result<bool> {
    Ok(store
        .get_questionnaire(questionnaire_id)
        .await?
        .is_some_and(|q| q.owner_id == user_id))
}

pub async fn owns_record(
    store: &dyn SurveyStore,
    user_id: UserId,
    record_id: RecordId,
) -> Result<bool> {
    match store.get_record(record_id).await? {
        Some(record) => owns(store, user_id, record.questionnaire_id).await,
        None => Ok(false),
    }
}
