//! Questionnaire, element and submission routes
//!
//! - POST   /questionnaires
//! - GET    /questionnaires
//! - GET    /questionnaires/{id}                      (public, password gated)
//! - PUT    /questionnaires/{id}
//! - DELETE /questionnaires/{id}
//! - POST   /questionnaires/{id}/elements
//! - PUT    /questionnaires/{id}/elements/{element_id}
//! - DELETE /questionnaires/{id}/elements/{element_id}
//! - POST   /questionnaires/{id}/submit               (public, password gated)

use hyper::{Method, Response, StatusCode};
use std::sync::Arc;

use super::helpers::{json_response, no_content, parse_id, ApiRequest, BoxBody, PageQuery};
use crate::server::AppState;
use crate::services::{accounts, questionnaires, records};
use crate::types::{
    NewDataObject, NewQuestionElement, NewQuestionnaire, QuestionElementUpdate,
    QuestionnaireUpdate, Result, SurveyError,
};

pub async fn handle_questionnaire_request(
    req: &ApiRequest,
    state: Arc<AppState>,
) -> Option<Result<Response<BoxBody>>> {
    let segments = req.segments();
    let response = match (&req.method, segments.as_slice()) {
        (&Method::POST, ["questionnaires"]) => handle_create(req, &state).await,
        (&Method::GET, ["questionnaires"]) => handle_list(req, &state).await,
        (&Method::GET, ["questionnaires", id]) => handle_view(req, &state, id).await,
        (&Method::PUT, ["questionnaires", id]) => handle_update(req, &state, id).await,
        (&Method::DELETE, ["questionnaires", id]) => handle_delete(req, &state, id).await,
        (&Method::POST, ["questionnaires", id, "elements"]) => {
            handle_add_element(req, &state, id).await
        }
        (&Method::PUT, ["questionnaires", id, "elements", element_id]) => {
            handle_update_element(req, &state, id, element_id).await
        }
        (&Method::DELETE, ["questionnaires", id, "elements", element_id]) => {
            handle_delete_element(req, &state, id, element_id).await
        }
        (&Method::POST, ["questionnaires", id, "submit"]) => handle_submit(req, &state, id).await,
        _ => return None,
    };
    Some(response)
}

/// Owner endpoints report "someone else's questionnaire" as 403 with this text
fn not_authorized(action: &str) -> impl Fn(SurveyError) -> SurveyError + '_ {
    move |e| match e {
        SurveyError::NotFound(_) => SurveyError::NotFound("Questionnaire not found".into()),
        SurveyError::NotOwned(_) => {
            SurveyError::NotOwned(format!("Not authorized to {} this questionnaire", action))
        }
        other => other,
    }
}

/// POST /questionnaires
async fn handle_create(req: &ApiRequest, state: &AppState) -> Result<Response<BoxBody>> {
    let user = state.current_user(req).await?;
    let body: NewQuestionnaire = req.json()?;
    let view = questionnaires::create(state.store.as_ref(), &user, body).await?;
    Ok(json_response(StatusCode::CREATED, &view))
}

/// GET /questionnaires
async fn handle_list(req: &ApiRequest, state: &AppState) -> Result<Response<BoxBody>> {
    let user = state.current_user(req).await?;
    let page: PageQuery = req.query()?;
    let views = questionnaires::list_owned(
        state.store.as_ref(),
        &user,
        page.to_page(state.args.max_page_size)?,
    )
    .await?;
    Ok(json_response(StatusCode::OK, &views))
}

/// GET /questionnaires/{id}
async fn handle_view(req: &ApiRequest, state: &AppState, id: &str) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let viewer =
        accounts::authenticate_optional(state.store.as_ref(), &state.jwt, req.auth_header())
            .await?;
    let view = questionnaires::view(
        state.store.as_ref(),
        viewer.as_ref(),
        id,
        req.questionnaire_password(),
    )
    .await?;
    Ok(json_response(StatusCode::OK, &view))
}

/// PUT /questionnaires/{id}
async fn handle_update(req: &ApiRequest, state: &AppState, id: &str) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let user = state.current_user(req).await?;
    let body: QuestionnaireUpdate = req.json()?;
    let view = questionnaires::update(state.store.as_ref(), &user, id, body)
        .await
        .map_err(not_authorized("update"))?;
    Ok(json_response(StatusCode::OK, &view))
}

/// DELETE /questionnaires/{id}
async fn handle_delete(req: &ApiRequest, state: &AppState, id: &str) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let user = state.current_user(req).await?;
    questionnaires::delete(state.store.as_ref(), &user, id)
        .await
        .map_err(not_authorized("delete"))?;
    Ok(no_content())
}

/// POST /questionnaires/{id}/elements
async fn handle_add_element(
    req: &ApiRequest,
    state: &AppState,
    id: &str,
) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let user = state.current_user(req).await?;
    let body: NewQuestionElement = req.json()?;
    let element = questionnaires::add_element(state.store.as_ref(), &user, id, body)
        .await
        .map_err(not_authorized("add elements to"))?;
    Ok(json_response(StatusCode::CREATED, &element))
}

/// PUT /questionnaires/{id}/elements/{element_id}
async fn handle_update_element(
    req: &ApiRequest,
    state: &AppState,
    id: &str,
    element_id: &str,
) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let element_id = parse_id(element_id)?;
    let user = state.current_user(req).await?;
    let body: QuestionElementUpdate = req.json()?;
    let element = questionnaires::update_element(state.store.as_ref(), &user, id, element_id, body)
        .await
        .map_err(|e| match e {
            SurveyError::NotOwned(_) => SurveyError::NotOwned(
                "Not authorized to modify elements of this questionnaire".into(),
            ),
            other => other,
        })?;
    Ok(json_response(StatusCode::OK, &element))
}

/// DELETE /questionnaires/{id}/elements/{element_id}
async fn handle_delete_element(
    req: &ApiRequest,
    state: &AppState,
    id: &str,
    element_id: &str,
) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let element_id = parse_id(element_id)?;
    let user = state.current_user(req).await?;
    questionnaires::delete_element(state.store.as_ref(), &user, id, element_id)
        .await
        .map_err(|e| match e {
            SurveyError::NotOwned(_) => SurveyError::NotOwned(
                "Not authorized to delete elements from this questionnaire".into(),
            ),
            other => other,
        })?;
    Ok(no_content())
}

/// POST /questionnaires/{id}/submit
async fn handle_submit(req: &ApiRequest, state: &AppState, id: &str) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let body: NewDataObject = req.json()?;
    let record = records::submit(state.store.as_ref(), id, req.questionnaire_password(), body).await?;
    Ok(json_response(StatusCode::CREATED, &record))
}
