//! Multi-record merge
//!
//! Combines two or more owned records into one new record in a target
//! questionnaire. The sources are left untouched so a merge can always be
//! audited or undone by deleting the result.

use std::collections::HashSet;
use tracing::info;

use crate::db::SurveyStore;
use crate::services::{field_merge, ownership};
use crate::types::{
    DataObject, NewDataObject, QuestionnaireId, RecordId, Result, SurveyError, User,
};

/// Placeholder replaced by the source id list in an override note
pub const IDS_PLACEHOLDER: &str = "%IDS%";

/// Optional values that replace the computed defaults
#[derive(Debug, Clone, Default)]
pub struct MergeOverrides {
    pub submitter_name: Option<String>,
    pub note: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Merge `source_ids` (at least two distinct ids, in priority order) into a
/// new record of `target_id`.
///
/// Every input is validated before the single write; on failure nothing
/// is stored.
pub async fn merge_records(
    store: &dyn SurveyStore,
    user: &User,
    source_ids: &[RecordId],
    target_id: QuestionnaireId,
    overrides: MergeOverrides,
) -> Result<DataObject> {
    let distinct: HashSet<RecordId> = source_ids.iter().copied().collect();
    if distinct.len() < 2 {
        return Err(SurveyError::InvalidArgument(
            "At least two distinct DataObjects are required for a merge".into(),
        ));
    }

    ownership::owned_questionnaire(store, user.id, target_id).await?;

    let mut sources = Vec::with_capacity(source_ids.len());
    for &id in source_ids {
        sources.push(ownership::owned_record(store, user.id, id).await?);
    }

    let answer_maps: Vec<_> = sources.iter().map(|r| &r.data_values).collect();
    let data_values = field_merge::merge_fields(&answer_maps);

    let latitude = overrides
        .latitude
        .or_else(|| mean(sources.iter().filter_map(|r| r.latitude)));
    let longitude = overrides
        .longitude
        .or_else(|| mean(sources.iter().filter_map(|r| r.longitude)));

    let id_list = format_ids(source_ids);
    let submitter_name = overrides
        .submitter_name
        .unwrap_or_else(|| format!("Merged by {}", user.name));
    let additional_info = match overrides.note {
        Some(note) => note.replace(IDS_PLACEHOLDER, &id_list),
        None => format!("Merged from DataObjects: [{}]", id_list),
    };

    let merged = store
        .create_record_from_sources(
            target_id,
            NewDataObject {
                submitter_name: Some(submitter_name),
                latitude,
                longitude,
                data_values,
                additional_info: Some(additional_info),
            },
            source_ids,
        )
        .await?;

    info!(
        user_id = user.id,
        merged_id = merged.id,
        target_id,
        sources = %id_list,
        "Merged DataObjects"
    );

    Ok(merged)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn format_ids(ids: &[RecordId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
