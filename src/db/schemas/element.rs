//! Question element document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::{ElementId, NewQuestionElement, QuestionElement, QuestionnaireId};

pub const ELEMENT_COLLECTION: &str = "question_elements";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct QuestionElementDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub id: ElementId,
    pub questionnaire_id: QuestionnaireId,
    pub field_type: String,
    pub label: String,
    #[serde(default)]
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
}

impl QuestionElementDoc {
    pub fn new(id: ElementId, questionnaire_id: QuestionnaireId, new: NewQuestionElement) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id,
            questionnaire_id,
            field_type: new.field_type,
            label: new.label,
            options: new.options,
        }
    }
}

impl From<QuestionElementDoc> for QuestionElement {
    fn from(doc: QuestionElementDoc) -> Self {
        QuestionElement {
            id: doc.id,
            questionnaire_id: doc.questionnaire_id,
            field_type: doc.field_type,
            label: doc.label,
            options: doc.options,
        }
    }
}

impl IntoIndexes for QuestionElementDoc {
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
                doc! { "questionnaire_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("questionnaire_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for QuestionElementDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
