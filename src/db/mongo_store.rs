//! MongoDB-backed store
//!
//! Numeric ids come from the `counters` collection so the API exposes the
//! same sequential ids as the in-memory backend. Deletes are soft except for
//! favorites, which are plain pairs.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use tracing::{debug, info};

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    DataObjectDoc, FavoriteDoc, Metadata, QuestionElementDoc, QuestionnaireDoc, UserDoc,
    DATA_OBJECT_COLLECTION, ELEMENT_COLLECTION, FAVORITE_COLLECTION, QUESTIONNAIRE_COLLECTION,
    USER_COLLECTION,
};
use crate::db::SurveyStore;
use crate::types::{
    DataObject, ElementId, FavoriteKey, NewDataObject, NewQuestionElement, NewQuestionnaire,
    NewUser, Page, QuestionElement, QuestionElementUpdate, Questionnaire, QuestionnaireId,
    QuestionnaireUpdate, RecordId, RecordQuery, Result, SurveyError, User, UserId,
};

pub struct MongoStore {
    client: MongoClient,
    users: MongoCollection<UserDoc>,
    questionnaires: MongoCollection<QuestionnaireDoc>,
    elements: MongoCollection<QuestionElementDoc>,
    records: MongoCollection<DataObjectDoc>,
    favorites: MongoCollection<FavoriteDoc>,
}

impl MongoStore {
    /// Connect and make sure every collection has its indexes
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = MongoClient::new(uri, db_name).await?;
        let store = Self {
            users: client.collection(USER_COLLECTION).await?,
            questionnaires: client.collection(QUESTIONNAIRE_COLLECTION).await?,
            elements: client.collection(ELEMENT_COLLECTION).await?,
            records: client.collection(DATA_OBJECT_COLLECTION).await?,
            favorites: client.collection(FAVORITE_COLLECTION).await?,
            client,
        };
        info!(db = store.client.db_name(), "MongoDB store ready");
        Ok(store)
    }

    async fn require_questionnaire(&self, id: QuestionnaireId) -> Result<()> {
        match self.questionnaires.find_one(doc! { "id": id }).await? {
            Some(_) => Ok(()),
            None => Err(SurveyError::NotFound(format!(
                "Questionnaire {} not found",
                id
            ))),
        }
    }

    async fn owned_questionnaire_ids(&self, owner_id: UserId) -> Result<Vec<QuestionnaireId>> {
        let owned = self
            .questionnaires
            .find_many(doc! { "owner_id": owner_id }, doc! { "id": 1 }, None, None)
            .await?;
        Ok(owned.into_iter().map(|q| q.id).collect())
    }

    async fn insert_record(
        &self,
        questionnaire_id: QuestionnaireId,
        new: NewDataObject,
    ) -> Result<DataObject> {
        let id = self.client.next_sequence(DATA_OBJECT_COLLECTION).await?;
        let record = DataObjectDoc::new(id, questionnaire_id, new);
        self.records.insert_one(record.clone()).await?;
        Ok(record.into())
    }
}

/// Translate the non-ownership parts of a record query into a filter
fn record_filter(owned: Vec<QuestionnaireId>, query: &RecordQuery) -> Document {
    let mut filter = match query.questionnaire_id {
        Some(qid) if owned.contains(&qid) => doc! { "questionnaire_id": qid },
        Some(_) => doc! { "questionnaire_id": { "$in": Vec::<i64>::new() } },
        None => doc! { "questionnaire_id": { "$in": owned } },
    };

    let mut date = Document::new();
    if let Some(start) = query.start_bound() {
        date.insert("$gte", bson::DateTime::from_chrono(start));
    }
    if let Some(end) = query.end_bound() {
        date.insert("$lt", bson::DateTime::from_chrono(end));
    }
    if !date.is_empty() {
        filter.insert("submission_date", date);
    }

    if query.located_only {
        filter.insert("latitude", doc! { "$ne": Bson::Null });
        filter.insert("longitude", doc! { "$ne": Bson::Null });
    }

    filter
}

/// Driver skip/limit for a page. `None` when the page cannot hold anything:
/// the driver reads a zero limit as "no limit".
fn window(page: Option<Page>) -> Option<(Option<u64>, Option<i64>)> {
    match page {
        Some(p) if p.limit == 0 => None,
        Some(p) => Some((Some(p.skip as u64), Some(p.limit as i64))),
        None => Some((None, None)),
    }
}

#[async_trait]
impl SurveyStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<()> {
        self.users.find_one(doc! { "id": -1 }).await.map(|_| ())
    }

    async fn create_user(&self, new: NewUser) -> Result<User> {
        if self.get_user_by_name(&new.name).await?.is_some() {
            return Err(SurveyError::Conflict("Username already registered".into()));
        }

        let id = self.client.next_sequence(USER_COLLECTION).await?;
        let user = UserDoc::new(id, new.name, new.password_hash);
        self.users.insert_one(user.clone()).await.map_err(|e| {
            // The unique index catches a concurrent registration
            if e.to_string().contains("E11000") {
                SurveyError::Conflict("Username already registered".into())
            } else {
                e
            }
        })?;
        debug!(user_id = id, "Created user");
        Ok(user.into())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.find_one(doc! { "id": id }).await?.map(Into::into))
    }

    async fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one(doc! { "name": name })
            .await?
            .map(Into::into))
    }

    async fn create_questionnaire(
        &self,
        owner_id: UserId,
        new: NewQuestionnaire,
    ) -> Result<Questionnaire> {
        let id = self.client.next_sequence(QUESTIONNAIRE_COLLECTION).await?;
        let questionnaire =
            QuestionnaireDoc::new(id, owner_id, new.title, new.description, new.password);
        self.questionnaires.insert_one(questionnaire.clone()).await?;

        for element in new.elements {
            let element_id = self.client.next_sequence(ELEMENT_COLLECTION).await?;
            self.elements
                .insert_one(QuestionElementDoc::new(element_id, id, element))
                .await?;
        }

        Ok(questionnaire.into())
    }

    async fn get_questionnaire(&self, id: QuestionnaireId) -> Result<Option<Questionnaire>> {
        Ok(self
            .questionnaires
            .find_one(doc! { "id": id })
            .await?
            .map(Into::into))
    }

    async fn list_questionnaires_by_owner(
        &self,
        owner_id: UserId,
        page: Page,
    ) -> Result<Vec<Questionnaire>> {
        let Some((skip, limit)) = window(Some(page)) else {
            return Ok(Vec::new());
        };
        let docs = self
            .questionnaires
            .find_many(doc! { "owner_id": owner_id }, doc! { "id": 1 }, skip, limit)
            .await?;
        Ok(docs.into_iter().map(Into::into).collect())
    }

    async fn update_questionnaire(
        &self,
        id: QuestionnaireId,
        update: QuestionnaireUpdate,
    ) -> Result<Option<Questionnaire>> {
        let mut set = Document::new();
        if let Some(title) = update.title {
            set.insert("title", title);
        }
        if let Some(description) = update.description {
            set.insert("description", description);
        }
        if let Some(password) = update.password {
            set.insert("password", password);
        }

        let result = self.questionnaires.update_one(doc! { "id": id }, set).await?;
        if result.matched_count == 0 {
            return Ok(None);
        }
        self.get_questionnaire(id).await
    }

    async fn delete_questionnaire(&self, id: QuestionnaireId) -> Result<bool> {
        let result = self
            .questionnaires
            .soft_delete_many(doc! { "id": id })
            .await?;
        if result.modified_count == 0 {
            return Ok(false);
        }

        let record_ids: Vec<RecordId> = self
            .records
            .find_many(doc! { "questionnaire_id": id }, doc! { "id": 1 }, None, None)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        self.elements
            .soft_delete_many(doc! { "questionnaire_id": id })
            .await?;
        self.records
            .soft_delete_many(doc! { "questionnaire_id": id })
            .await?;
        self.favorites
            .inner()
            .delete_many(doc! { "record_id": { "$in": record_ids.clone() } })
            .await?;

        debug!(
            questionnaire_id = id,
            records = record_ids.len(),
            "Deleted questionnaire"
        );
        Ok(true)
    }

    async fn create_element(
        &self,
        questionnaire_id: QuestionnaireId,
        new: NewQuestionElement,
    ) -> Result<QuestionElement> {
        self.require_questionnaire(questionnaire_id).await?;
        let id = self.client.next_sequence(ELEMENT_COLLECTION).await?;
        let element = QuestionElementDoc::new(id, questionnaire_id, new);
        self.elements.insert_one(element.clone()).await?;
        Ok(element.into())
    }

    async fn get_element(&self, id: ElementId) -> Result<Option<QuestionElement>> {
        Ok(self
            .elements
            .find_one(doc! { "id": id })
            .await?
            .map(Into::into))
    }

    async fn list_elements(
        &self,
        questionnaire_id: QuestionnaireId,
    ) -> Result<Vec<QuestionElement>> {
        let docs = self
            .elements
            .find_many(
                doc! { "questionnaire_id": questionnaire_id },
                doc! { "id": 1 },
                None,
                None,
            )
            .await?;
        Ok(docs.into_iter().map(Into::into).collect())
    }

    async fn update_element(
        &self,
        id: ElementId,
        update: QuestionElementUpdate,
    ) -> Result<Option<QuestionElement>> {
        let mut set = Document::new();
        if let Some(field_type) = update.field_type {
            set.insert("field_type", field_type);
        }
        if let Some(label) = update.label {
            set.insert("label", label);
        }
        if let Some(options) = update.options {
            set.insert("options", bson::to_bson(&options)?);
        }

        let result = self.elements.update_one(doc! { "id": id }, set).await?;
        if result.matched_count == 0 {
            return Ok(None);
        }
        self.get_element(id).await
    }

    async fn delete_element(&self, id: ElementId) -> Result<bool> {
        let result = self.elements.soft_delete_many(doc! { "id": id }).await?;
        Ok(result.modified_count > 0)
    }

    async fn create_record(
        &self,
        questionnaire_id: QuestionnaireId,
        new: NewDataObject,
    ) -> Result<DataObject> {
        self.require_questionnaire(questionnaire_id).await?;
        self.insert_record(questionnaire_id, new).await
    }

    async fn create_record_from_sources(
        &self,
        questionnaire_id: QuestionnaireId,
        new: NewDataObject,
        sources: &[RecordId],
    ) -> Result<DataObject> {
        self.require_questionnaire(questionnaire_id).await?;

        // Best effort: without a transaction a source can still vanish between
        // this count and the insert
        let live = self
            .records
            .find_many(doc! { "id": { "$in": sources.to_vec() } }, doc! { "id": 1 }, None, None)
            .await?;
        if let Some(missing) = sources.iter().find(|id| !live.iter().any(|r| r.id == **id)) {
            return Err(SurveyError::NotFound(format!(
                "DataObject with id {} not found",
                missing
            )));
        }

        self.insert_record(questionnaire_id, new).await
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<DataObject>> {
        Ok(self
            .records
            .find_one(doc! { "id": id })
            .await?
            .map(Into::into))
    }

    async fn list_records_by_owner(
        &self,
        owner_id: UserId,
        query: &RecordQuery,
    ) -> Result<Vec<DataObject>> {
        let owned = self.owned_questionnaire_ids(owner_id).await?;
        if owned.is_empty() {
            return Ok(Vec::new());
        }

        let Some((skip, limit)) = window(query.page) else {
            return Ok(Vec::new());
        };
        let docs = self
            .records
            .find_many(record_filter(owned, query), doc! { "id": 1 }, skip, limit)
            .await?;
        Ok(docs.into_iter().map(Into::into).collect())
    }

    async fn list_records_by_questionnaire(
        &self,
        questionnaire_id: QuestionnaireId,
    ) -> Result<Vec<DataObject>> {
        let docs = self
            .records
            .find_many(
                doc! { "questionnaire_id": questionnaire_id },
                doc! { "id": 1 },
                None,
                None,
            )
            .await?;
        Ok(docs.into_iter().map(Into::into).collect())
    }

    async fn set_record_note(
        &self,
        id: RecordId,
        note: Option<String>,
    ) -> Result<Option<DataObject>> {
        let note = match note {
            Some(text) => Bson::String(text),
            None => Bson::Null,
        };
        let result = self
            .records
            .update_one(doc! { "id": id }, doc! { "additional_info": note })
            .await?;
        if result.matched_count == 0 {
            return Ok(None);
        }
        self.get_record(id).await
    }

    async fn add_favorite(&self, key: FavoriteKey) -> Result<bool> {
        let filter = doc! { "user_id": key.user_id, "record_id": key.record_id };
        let on_insert = doc! { "metadata": bson::to_bson(&Metadata::new())? };

        let result = self
            .favorites
            .inner()
            .update_one(filter, doc! { "$setOnInsert": on_insert })
            .upsert(true)
            .await?;
        Ok(result.upserted_id.is_some())
    }

    async fn remove_favorite(&self, key: FavoriteKey) -> Result<bool> {
        let result = self
            .favorites
            .inner()
            .delete_one(doc! { "user_id": key.user_id, "record_id": key.record_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn is_favorite(&self, key: FavoriteKey) -> Result<bool> {
        Ok(self
            .favorites
            .find_one(doc! { "user_id": key.user_id, "record_id": key.record_id })
            .await?
            .is_some())
    }

    async fn list_favorites(&self, user_id: UserId) -> Result<Vec<RecordId>> {
        let docs = self
            .favorites
            .find_many(
                doc! { "user_id": user_id },
                doc! { "record_id": 1 },
                None,
                None,
            )
            .await?;
        Ok(docs.into_iter().map(|f| f.record_id).collect())
    }
}
