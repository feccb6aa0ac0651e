//! Favorite (account, record) pair schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::{RecordId, UserId};

pub const FAVORITE_COLLECTION: &str = "favorites";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct FavoriteDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: UserId,
    pub record_id: RecordId,
}

impl IntoIndexes for FavoriteDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1, "record_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_record_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for FavoriteDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
