//! Storage contract shared by the in-memory and MongoDB backends
//!
//! The domain services only ever see `dyn SurveyStore`. Absence is reported
//! as `Ok(None)` / `Ok(false)`; errors are reserved for backend failures,
//! uniqueness conflicts and writes against a missing parent.

use async_trait::async_trait;

use crate::types::{
    DataObject, ElementId, FavoriteKey, NewDataObject, NewQuestionElement, NewQuestionnaire,
    NewUser, Page, QuestionElement, QuestionElementUpdate, Questionnaire, QuestionnaireId,
    QuestionnaireUpdate, RecordId, RecordQuery, Result, User, UserId,
};

#[async_trait]
pub trait SurveyStore: Send + Sync {
    /// Short backend label for logs and health output
    fn backend_name(&self) -> &'static str;

    /// Liveness check
    async fn ping(&self) -> Result<()>;

    // ---- accounts ----

    /// Create an account. `Conflict` if the name is taken.
    async fn create_user(&self, new: NewUser) -> Result<User>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    async fn get_user_by_name(&self, name: &str) -> Result<Option<User>>;

    // ---- questionnaires ----

    /// Create a questionnaire and its initial elements
    async fn create_questionnaire(
        &self,
        owner_id: UserId,
        new: NewQuestionnaire,
    ) -> Result<Questionnaire>;

    async fn get_questionnaire(&self, id: QuestionnaireId) -> Result<Option<Questionnaire>>;

    /// Questionnaires of one owner, ascending id
    async fn list_questionnaires_by_owner(
        &self,
        owner_id: UserId,
        page: Page,
    ) -> Result<Vec<Questionnaire>>;

    async fn update_questionnaire(
        &self,
        id: QuestionnaireId,
        update: QuestionnaireUpdate,
    ) -> Result<Option<Questionnaire>>;

    /// Delete a questionnaire together with its elements, records and the
    /// favorites pointing at those records
    async fn delete_questionnaire(&self, id: QuestionnaireId) -> Result<bool>;

    // ---- question elements ----

    /// `NotFound` if the questionnaire does not exist
    async fn create_element(
        &self,
        questionnaire_id: QuestionnaireId,
        new: NewQuestionElement,
    ) -> Result<QuestionElement>;

    async fn get_element(&self, id: ElementId) -> Result<Option<QuestionElement>>;

    /// Elements of a questionnaire, ascending id
    async fn list_elements(&self, questionnaire_id: QuestionnaireId)
        -> Result<Vec<QuestionElement>>;

    async fn update_element(
        &self,
        id: ElementId,
        update: QuestionElementUpdate,
    ) -> Result<Option<QuestionElement>>;

    async fn delete_element(&self, id: ElementId) -> Result<bool>;

    // ---- records ----

    /// Insert a record with a fresh id and the current UTC timestamp.
    /// `NotFound` if the questionnaire does not exist.
    async fn create_record(
        &self,
        questionnaire_id: QuestionnaireId,
        new: NewDataObject,
    ) -> Result<DataObject>;

    /// Insert a record derived from `sources`. Fails with `NotFound` if the
    /// questionnaire or any source disappeared before the write.
    async fn create_record_from_sources(
        &self,
        questionnaire_id: QuestionnaireId,
        new: NewDataObject,
        sources: &[RecordId],
    ) -> Result<DataObject>;

    async fn get_record(&self, id: RecordId) -> Result<Option<DataObject>>;

    /// Records whose questionnaire belongs to `owner_id`, ascending id,
    /// filtered and windowed by `query`
    async fn list_records_by_owner(
        &self,
        owner_id: UserId,
        query: &RecordQuery,
    ) -> Result<Vec<DataObject>>;

    async fn list_records_by_questionnaire(
        &self,
        questionnaire_id: QuestionnaireId,
    ) -> Result<Vec<DataObject>>;

    /// Replace the free-text note of a record
    async fn set_record_note(
        &self,
        id: RecordId,
        note: Option<String>,
    ) -> Result<Option<DataObject>>;

    // ---- favorites ----

    /// Returns `true` if the pair was newly added
    async fn add_favorite(&self, key: FavoriteKey) -> Result<bool>;

    /// Returns `true` if the pair existed
    async fn remove_favorite(&self, key: FavoriteKey) -> Result<bool>;

    async fn is_favorite(&self, key: FavoriteKey) -> Result<bool>;

    /// Favorited record ids of an account, ascending
    async fn list_favorites(&self, user_id: UserId) -> Result<Vec<RecordId>>;
}
