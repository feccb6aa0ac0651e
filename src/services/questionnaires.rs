//! Questionnaires and their question elements
//!
//! Owners manage structure; anyone may view a questionnaire, subject to its
//! optional shared password.

use serde::Serialize;
use tracing::info;

use crate::db::SurveyStore;
use crate::services::ownership;
use crate::types::{
    DataObject, ElementId, NewQuestionElement, NewQuestionnaire, Page, QuestionElement,
    QuestionElementUpdate, Questionnaire, QuestionnaireId, QuestionnaireUpdate, Result,
    SurveyError, User,
};

/// Questionnaire with its elements and submitted records
#[derive(Debug, Clone, Serialize)]
pub struct QuestionnaireView {
    #[serde(flatten)]
    pub questionnaire: Questionnaire,
    pub password_protected: bool,
    pub elements: Vec<QuestionElement>,
    pub data_objects: Vec<DataObject>,
}

/// What the password gate protects; only changes the error wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    View,
    Submit,
}

/// Check a caller-supplied questionnaire password.
///
/// Unprotected questionnaires always pass. Missing password is
/// `Unauthorized`, a wrong one is `Forbidden`.
pub fn check_password(
    questionnaire: &Questionnaire,
    supplied: Option<&str>,
    access: Access,
) -> Result<()> {
    if !questionnaire.is_password_protected() {
        return Ok(());
    }
    match supplied {
        None => Err(SurveyError::Unauthorized(match access {
            Access::View => "Password required to view this questionnaire".into(),
            Access::Submit => "Password required for this questionnaire submission".into(),
        })),
        Some(pw) if Some(pw) != questionnaire.password.as_deref() => {
            Err(SurveyError::Forbidden(match access {
                Access::View => "Invalid password for this questionnaire".into(),
                Access::Submit => "Incorrect password for questionnaire submission".into(),
            }))
        }
        Some(_) => Ok(()),
    }
}

pub async fn load_view(
    store: &dyn SurveyStore,
    questionnaire: Questionnaire,
) -> Result<QuestionnaireView> {
    let elements = store.list_elements(questionnaire.id).await?;
    let data_objects = store.list_records_by_questionnaire(questionnaire.id).await?;
    Ok(QuestionnaireView {
        password_protected: questionnaire.is_password_protected(),
        questionnaire,
        elements,
        data_objects,
    })
}

pub async fn create(
    store: &dyn SurveyStore,
    owner: &User,
    new: NewQuestionnaire,
) -> Result<QuestionnaireView> {
    if new.title.trim().is_empty() {
        return Err(SurveyError::BadRequest("Title must not be empty".into()));
    }
    let questionnaire = store.create_questionnaire(owner.id, new).await?;
    info!(
        owner_id = owner.id,
        questionnaire_id = questionnaire.id,
        "Created questionnaire"
    );
    load_view(store, questionnaire).await
}

pub async fn list_owned(
    store: &dyn SurveyStore,
    owner: &User,
    page: Page,
) -> Result<Vec<QuestionnaireView>> {
    let mut views = Vec::new();
    for questionnaire in store.list_questionnaires_by_owner(owner.id, page).await? {
        views.push(load_view(store, questionnaire).await?);
    }
    Ok(views)
}

/// View a questionnaire. The owner bypasses the password gate.
pub async fn view(
    store: &dyn SurveyStore,
    viewer: Option<&User>,
    id: QuestionnaireId,
    password: Option<&str>,
) -> Result<QuestionnaireView> {
    let questionnaire = store
        .get_questionnaire(id)
        .await?
        .ok_or_else(|| SurveyError::NotFound("Questionnaire not found".into()))?;

    let is_owner = viewer.is_some_and(|u| u.id == questionnaire.owner_id);
    if !is_owner {
        check_password(&questionnaire, password, Access::View)?;
    }
    load_view(store, questionnaire).await
}

pub async fn update(
    store: &dyn SurveyStore,
    owner: &User,
    id: QuestionnaireId,
    update: QuestionnaireUpdate,
) -> Result<QuestionnaireView> {
    ownership::owned_questionnaire(store, owner.id, id).await?;
    let questionnaire = store
        .update_questionnaire(id, update)
        .await?
        .ok_or_else(|| SurveyError::NotFound("Questionnaire not found".into()))?;
    load_view(store, questionnaire).await
}

/// Delete a questionnaire with everything it holds
pub async fn delete(store: &dyn SurveyStore, owner: &User, id: QuestionnaireId) -> Result<()> {
    ownership::owned_questionnaire(store, owner.id, id).await?;
    store.delete_questionnaire(id).await?;
    info!(owner_id = owner.id, questionnaire_id = id, "Deleted questionnaire");
    Ok(())
}

pub async fn add_element(
    store: &dyn SurveyStore,
    owner: &User,
    questionnaire_id: QuestionnaireId,
    new: NewQuestionElement,
) -> Result<QuestionElement> {
    ownership::owned_questionnaire(store, owner.id, questionnaire_id).await?;
    store.create_element(questionnaire_id, new).await
}

/// Load an element, requiring it to belong to `questionnaire_id`
async fn element_of(
    store: &dyn SurveyStore,
    questionnaire_id: QuestionnaireId,
    element_id: ElementId,
) -> Result<QuestionElement> {
    store
        .get_element(element_id)
        .await?
        .filter(|e| e.questionnaire_id == questionnaire_id)
        .ok_or_else(|| {
            SurveyError::NotFound(
                "QuestionElement not found or does not belong to this questionnaire".into(),
            )
        })
}

pub async fn update_element(
    store: &dyn SurveyStore,
    owner: &User,
    questionnaire_id: QuestionnaireId,
    element_id: ElementId,
    update: QuestionElementUpdate,
) -> Result<QuestionElement> {
    ownership::owned_questionnaire(store, owner.id, questionnaire_id).await?;
    element_of(store, questionnaire_id, element_id).await?;
    store
        .update_element(element_id, update)
        .await?
        .ok_or_else(|| SurveyError::NotFound("QuestionElement not found".into()))
}

pub async fn delete_element(
    store: &dyn SurveyStore,
    owner: &User,
    questionnaire_id: QuestionnaireId,
    element_id: ElementId,
) -> Result<()> {
    ownership::owned_questionnaire(store, owner.id, questionnaire_id).await?;
    element_of(store, questionnaire_id, element_id).await?;
    store.delete_element(element_id).await?;
    Ok(())
}
