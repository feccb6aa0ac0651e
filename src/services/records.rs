//! Record submission and owner-side record access

use tracing::info;

use crate::db::SurveyStore;
use crate::services::ownership;
use crate::services::questionnaires::{check_password, Access};
use crate::types::{
    DataObject, NewDataObject, QuestionnaireId, RecordId, RecordQuery, Result, SurveyError, User,
};

/// Reject coordinates outside the valid latitude/longitude ranges
pub fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<()> {
    if let Some(lat) = latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(SurveyError::BadRequest(format!(
                "Latitude {} is outside [-90, 90]",
                lat
            )));
        }
    }
    if let Some(lon) = longitude {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(SurveyError::BadRequest(format!(
                "Longitude {} is outside [-180, 180]",
                lon
            )));
        }
    }
    Ok(())
}

/// Public submission to a questionnaire. The password gate applies to
/// everyone, owner included.
pub async fn submit(
    store: &dyn SurveyStore,
    questionnaire_id: QuestionnaireId,
    password: Option<&str>,
    new: NewDataObject,
) -> Result<DataObject> {
    let questionnaire = store
        .get_questionnaire(questionnaire_id)
        .await?
        .ok_or_else(|| SurveyError::NotFound("Questionnaire not found".into()))?;

    check_password(&questionnaire, password, Access::Submit)?;
    validate_coordinates(new.latitude, new.longitude)?;

    let record = store.create_record(questionnaire_id, new).await?;
    info!(
        questionnaire_id,
        record_id = record.id,
        located = record.coordinates().is_some(),
        "Submitted DataObject"
    );
    Ok(record)
}

/// Records of every questionnaire the caller owns
pub async fn list(store: &dyn SurveyStore, owner: &User, query: &RecordQuery) -> Result<Vec<DataObject>> {
    store.list_records_by_owner(owner.id, query).await
}

pub async fn get(store: &dyn SurveyStore, owner: &User, id: RecordId) -> Result<DataObject> {
    ownership::owned_record(store, owner.id, id)
        .await
        .map_err(|e| match e {
            SurveyError::NotFound(_) => SurveyError::NotFound("DataObject not found".into()),
            SurveyError::NotOwned(_) => {
                SurveyError::NotOwned("Not authorized to access this DataObject".into())
            }
            other => other,
        })
}

/// Replace the note of an owned record. Not owning it reads as not found.
pub async fn update_note(
    store: &dyn SurveyStore,
    owner: &User,
    id: RecordId,
    note: Option<String>,
) -> Result<DataObject> {
    let not_found = || SurveyError::NotFound("DataObject not found or not authorized to update".into());

    if let Err(e) = ownership::owned_record(store, owner.id, id).await {
        return Err(if e.is_not_found_or_not_owned() { not_found() } else { e });
    }
    store.set_record_note(id, note).await?.ok_or_else(not_found)
}
