//! Record ("data object") document schema

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::{AnswerMap, DataObject, NewDataObject, QuestionnaireId, RecordId};

pub const DATA_OBJECT_COLLECTION: &str = "data_objects";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DataObjectDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub id: RecordId,
    pub questionnaire_id: QuestionnaireId,
    #[serde(default)]
    pub submitter_name: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub submission_date: DateTime<Utc>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub data_values: AnswerMap,
    #[serde(default)]
    pub additional_info: Option<String>,
}

impl DataObjectDoc {
    pub fn new(id: RecordId, questionnaire_id: QuestionnaireId, new: NewDataObject) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id,
            questionnaire_id,
            submitter_name: new.submitter_name,
            submission_date: Utc::now(),
            latitude: new.latitude,
            longitude: new.longitude,
            data_values: new.data_values,
            additional_info: new.additional_info,
        }
    }
}

impl From<DataObjectDoc> for DataObject {
    fn from(doc: DataObjectDoc) -> Self {
        DataObject {
            id: doc.id,
            questionnaire_id: doc.questionnaire_id,
            submitter_name: doc.submitter_name,
            submission_date: doc.submission_date,
            latitude: doc.latitude,
            longitude: doc.longitude,
            data_values: doc.data_values,
            additional_info: doc.additional_info,
        }
    }
}

impl IntoIndexes for DataObjectDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "questionnaire_id": 1, "submission_date": 1 },
                Some(
                    IndexOptions::builder()
                        .name("questionnaire_date_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "latitude": 1, "longitude": 1 },
                Some(
                    IndexOptions::builder()
                        .name("coordinates_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for DataObjectDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
