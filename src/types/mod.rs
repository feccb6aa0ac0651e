//! Shared types for mapsurvey

pub mod answer;
pub mod entities;
pub mod error;

pub use answer::{AnswerKind, AnswerMap, AnswerValue};
pub use entities::{
    DataObject, ElementId, FavoriteKey, NewDataObject, NewQuestionElement, NewQuestionnaire,
    NewUser, Page, QuestionElement, QuestionElementUpdate, Questionnaire, QuestionnaireId,
    QuestionnaireUpdate, RecordId, RecordQuery, User, UserId,
};
pub use error::{Result, SurveyError};
