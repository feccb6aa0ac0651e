//! MongoDB document schemas for mapsurvey

mod data_object;
mod element;
mod favorite;
mod metadata;
mod questionnaire;
mod user;

pub use data_object::{DataObjectDoc, DATA_OBJECT_COLLECTION};
pub use element::{QuestionElementDoc, ELEMENT_COLLECTION};
pub use favorite::{FavoriteDoc, FAVORITE_COLLECTION};
pub use metadata::Metadata;
pub use questionnaire::{QuestionnaireDoc, QUESTIONNAIRE_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
