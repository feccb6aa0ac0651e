//! Record routes (owner only)
//!
//! - GET  /data                       list with date/questionnaire filters
//! - GET  /data/{id}
//! - PUT  /data/{id}                  note update
//! - POST /data/merge
//! - GET  /data/nearby_suggestions

use chrono::NaiveDate;
use hyper::{Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::helpers::{json_response, parse_id, ApiRequest, BoxBody, PageQuery};
use crate::server::AppState;
use crate::services::{find_nearby, merge_records, records, MergeOverrides};
use crate::types::{
    DataObject, QuestionnaireId, RecordId, RecordQuery, Result, SurveyError,
};

#[derive(Debug, Deserialize)]
pub struct RecordListQuery {
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub questionnaire_id: Option<QuestionnaireId>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct NoteUpdate {
    #[serde(default)]
    pub additional_info: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub data_object_ids: Vec<RecordId>,
    pub target_questionnaire_id: QuestionnaireId,
    #[serde(default)]
    pub new_submitter_name: Option<String>,
    #[serde(default)]
    pub new_additional_info: Option<String>,
    #[serde(default)]
    pub new_latitude: Option<f64>,
    #[serde(default)]
    pub new_longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub source_data_object_id: RecordId,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Nearby suggestion: the record plus its distance from the source
#[derive(Debug, Serialize)]
pub struct NearbySuggestion {
    #[serde(flatten)]
    pub record: DataObject,
    pub distance_m: f64,
}

const MERGE_FAILED: &str = "Failed to merge DataObjects. Ensure all source IDs are valid, \
owned by user, and target questionnaire is valid and owned by user.";

/// Foreign and missing sources get the same answer
const NEARBY_SOURCE_UNAVAILABLE: &str = "Source DataObject not found or not owned by user.";

pub async fn handle_data_request(
    req: &ApiRequest,
    state: Arc<AppState>,
) -> Option<Result<Response<BoxBody>>> {
    let segments = req.segments();
    let response = match (&req.method, segments.as_slice()) {
        (&Method::GET, ["data"]) => handle_list(req, &state).await,
        (&Method::POST, ["data", "merge"]) => handle_merge(req, &state).await,
        (&Method::GET, ["data", "nearby_suggestions"]) => handle_nearby(req, &state).await,
        (&Method::GET, ["data", id]) => handle_get(req, &state, id).await,
        (&Method::PUT, ["data", id]) => handle_update(req, &state, id).await,
        _ => return None,
    };
    Some(response)
}

/// GET /data
async fn handle_list(req: &ApiRequest, state: &AppState) -> Result<Response<BoxBody>> {
    let user = state.current_user(req).await?;
    let params: RecordListQuery = req.query()?;
    let page = PageQuery {
        skip: params.skip,
        limit: params.limit,
    }
    .to_page(state.args.max_page_size)?;

    let query = RecordQuery {
        questionnaire_id: params.questionnaire_id,
        start_date: params.start_date,
        end_date: params.end_date,
        located_only: false,
        page: Some(page),
    };
    let list = records::list(state.store.as_ref(), &user, &query).await?;
    Ok(json_response(StatusCode::OK, &list))
}

/// GET /data/{id}
async fn handle_get(req: &ApiRequest, state: &AppState, id: &str) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let user = state.current_user(req).await?;
    let record = records::get(state.store.as_ref(), &user, id).await?;
    Ok(json_response(StatusCode::OK, &record))
}

/// PUT /data/{id}
async fn handle_update(req: &ApiRequest, state: &AppState, id: &str) -> Result<Response<BoxBody>> {
    let id = parse_id(id)?;
    let user = state.current_user(req).await?;
    let body: NoteUpdate = req.json()?;
    let record = records::update_note(state.store.as_ref(), &user, id, body.additional_info).await?;
    Ok(json_response(StatusCode::OK, &record))
}

/// POST /data/merge
///
/// Every validation failure collapses into one 400 so the response does not
/// reveal which ids exist.
async fn handle_merge(req: &ApiRequest, state: &AppState) -> Result<Response<BoxBody>> {
    let user = state.current_user(req).await?;
    let body: MergeRequest = req.json()?;

    if body.data_object_ids.len() < 2 {
        return Err(SurveyError::BadRequest(
            "At least two DataObject IDs must be provided for merging.".into(),
        ));
    }
    records::validate_coordinates(body.new_latitude, body.new_longitude)?;

    let overrides = MergeOverrides {
        submitter_name: body.new_submitter_name,
        note: body.new_additional_info,
        latitude: body.new_latitude,
        longitude: body.new_longitude,
    };

    let merged = merge_records(
        state.store.as_ref(),
        &user,
        &body.data_object_ids,
        body.target_questionnaire_id,
        overrides,
    )
    .await
    .map_err(|e| match e {
        SurveyError::NotFound(_)
        | SurveyError::NotOwned(_)
        | SurveyError::InvalidArgument(_)
        | SurveyError::InvalidState(_) => SurveyError::BadRequest(MERGE_FAILED.into()),
        other => other,
    })?;

    Ok(json_response(StatusCode::CREATED, &merged))
}

/// GET /data/nearby_suggestions
async fn handle_nearby(req: &ApiRequest, state: &AppState) -> Result<Response<BoxBody>> {
    let user = state.current_user(req).await?;
    let params: NearbyQuery = req.query()?;

    let radius = params
        .distance_m
        .unwrap_or(state.args.default_nearby_distance_m);
    if radius.is_nan() || radius < 0.0 {
        return Err(SurveyError::BadRequest(
            "distance_m must be a non-negative number".into(),
        ));
    }
    let page = PageQuery {
        skip: params.skip,
        limit: params.limit,
    }
    .to_page(state.args.max_page_size)?;

    let matches = find_nearby(
        state.store.as_ref(),
        &user,
        params.source_data_object_id,
        radius,
        page,
    )
    .await
    .map_err(|e| match e {
        SurveyError::NotFound(_) | SurveyError::NotOwned(_) => {
            SurveyError::BadRequest(NEARBY_SOURCE_UNAVAILABLE.into())
        }
        SurveyError::InvalidState(reason) => SurveyError::BadRequest(reason),
        other => other,
    })?;

    let suggestions: Vec<NearbySuggestion> = matches
        .into_iter()
        .map(|m| NearbySuggestion {
            record: m.record,
            distance_m: m.distance_m,
        })
        .collect();
    Ok(json_response(StatusCode::OK, &suggestions))
}
