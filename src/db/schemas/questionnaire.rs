//! Questionnaire document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::{Questionnaire, QuestionnaireId, UserId};

pub const QUESTIONNAIRE_COLLECTION: &str = "questionnaires";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct QuestionnaireDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub id: QuestionnaireId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Shared secret for non-owner access, stored as given
    #[serde(default)]
    pub password: Option<String>,
    pub owner_id: UserId,
}

impl QuestionnaireDoc {
    pub fn new(
        id: QuestionnaireId,
        owner_id: UserId,
        title: String,
        description: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            id,
            title,
            description,
            password,
            owner_id,
        }
    }
}

impl From<QuestionnaireDoc> for Questionnaire {
    fn from(doc: QuestionnaireDoc) -> Self {
        Questionnaire {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            password: doc.password,
            owner_id: doc.owner_id,
        }
    }
}

impl IntoIndexes for QuestionnaireDoc {
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
            // Ownership scoping starts here for every record query
            (
                doc! { "owner_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for QuestionnaireDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
