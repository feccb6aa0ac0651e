//! In-memory store
//!
//! Used in dev mode and by the test suite. Reads go straight to the
//! concurrent maps; every write that checks a precondition (unique name,
//! parent exists, merge sources exist) runs under a single write gate so the
//! check and the insert cannot interleave with a concurrent delete.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use crate::db::SurveyStore;
use crate::types::{
    DataObject, ElementId, FavoriteKey, NewDataObject, NewQuestionElement, NewQuestionnaire,
    NewUser, Page, QuestionElement, QuestionElementUpdate, Questionnaire, QuestionnaireId,
    QuestionnaireUpdate, RecordId, RecordQuery, Result, SurveyError, User, UserId,
};

/// Monotonic id source starting at 1
#[derive(Debug)]
struct Sequence(AtomicI64);

impl Sequence {
    fn new() -> Self {
        Self(AtomicI64::new(0))
    }

    fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

pub struct MemoryStore {
    users: DashMap<UserId, User>,
    questionnaires: DashMap<QuestionnaireId, Questionnaire>,
    elements: DashMap<ElementId, QuestionElement>,
    records: DashMap<RecordId, DataObject>,
    favorites: DashSet<FavoriteKey>,
    user_ids: Sequence,
    questionnaire_ids: Sequence,
    element_ids: Sequence,
    record_ids: Sequence,
    write_gate: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            questionnaires: DashMap::new(),
            elements: DashMap::new(),
            records: DashMap::new(),
            favorites: DashSet::new(),
            user_ids: Sequence::new(),
            questionnaire_ids: Sequence::new(),
            element_ids: Sequence::new(),
            record_ids: Sequence::new(),
            write_gate: Mutex::new(()),
        }
    }

    /// Number of stored records (all questionnaires)
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    fn insert_element(
        &self,
        questionnaire_id: QuestionnaireId,
        new: NewQuestionElement,
    ) -> QuestionElement {
        let element = QuestionElement {
            id: self.element_ids.next(),
            questionnaire_id,
            field_type: new.field_type,
            label: new.label,
            options: new.options,
        };
        self.elements.insert(element.id, element.clone());
        element
    }

    fn insert_record(&self, questionnaire_id: QuestionnaireId, new: NewDataObject) -> DataObject {
        let record = DataObject {
            id: self.record_ids.next(),
            questionnaire_id,
            submitter_name: new.submitter_name,
            submission_date: Utc::now(),
            latitude: new.latitude,
            longitude: new.longitude,
            data_values: new.data_values,
            additional_info: new.additional_info,
        };
        self.records.insert(record.id, record.clone());
        record
    }

    fn require_questionnaire(&self, id: QuestionnaireId) -> Result<()> {
        if self.questionnaires.contains_key(&id) {
            Ok(())
        } else {
            Err(SurveyError::NotFound(format!("Questionnaire {} not found", id)))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SurveyStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_user(&self, new: NewUser) -> Result<User> {
        let _gate = self.write_gate.lock().await;

        if self.users.iter().any(|u| u.name == new.name) {
            return Err(SurveyError::Conflict("Username already registered".into()));
        }

        let user = User {
            id: self.user_ids.next(),
            name: new.name,
            password_hash: new.password_hash,
            is_active: true,
        };
        self.users.insert(user.id, user.clone());
        debug!(user_id = user.id, "Created user");
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.name == name)
            .map(|u| u.value().clone()))
    }

    async fn create_questionnaire(
        &self,
        owner_id: UserId,
        new: NewQuestionnaire,
    ) -> Result<Questionnaire> {
        let _gate = self.write_gate.lock().await;

        let questionnaire = Questionnaire {
            id: self.questionnaire_ids.next(),
            title: new.title,
            description: new.description,
            password: new.password,
            owner_id,
        };
        self.questionnaires
            .insert(questionnaire.id, questionnaire.clone());

        for element in new.elements {
            self.insert_element(questionnaire.id, element);
        }

        Ok(questionnaire)
    }

    async fn get_questionnaire(&self, id: QuestionnaireId) -> Result<Option<Questionnaire>> {
        Ok(self.questionnaires.get(&id).map(|q| q.value().clone()))
    }

    async fn list_questionnaires_by_owner(
        &self,
        owner_id: UserId,
        page: Page,
    ) -> Result<Vec<Questionnaire>> {
        let mut owned: Vec<Questionnaire> = self
            .questionnaires
            .iter()
            .filter(|q| q.owner_id == owner_id)
            .map(|q| q.value().clone())
            .collect();
        owned.sort_by_key(|q| q.id);
        Ok(page.apply(owned))
    }

    async fn update_questionnaire(
        &self,
        id: QuestionnaireId,
        update: QuestionnaireUpdate,
    ) -> Result<Option<Questionnaire>> {
        let Some(mut entry) = self.questionnaires.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            entry.title = title;
        }
        if update.description.is_some() {
            entry.description = update.description;
        }
        if update.password.is_some() {
            entry.password = update.password;
        }
        Ok(Some(entry.value().clone()))
    }

    async fn delete_questionnaire(&self, id: QuestionnaireId) -> Result<bool> {
        let _gate = self.write_gate.lock().await;

        if self.questionnaires.remove(&id).is_none() {
            return Ok(false);
        }

        self.elements.retain(|_, e| e.questionnaire_id != id);

        let removed: HashSet<RecordId> = self
            .records
            .iter()
            .filter(|r| r.questionnaire_id == id)
            .map(|r| r.id)
            .collect();
        self.records.retain(|rid, _| !removed.contains(rid));
        self.favorites.retain(|k| !removed.contains(&k.record_id));

        debug!(
            questionnaire_id = id,
            records = removed.len(),
            "Deleted questionnaire"
        );
        Ok(true)
    }

    async fn create_element(
        &self,
        questionnaire_id: QuestionnaireId,
        new: NewQuestionElement,
    ) -> Result<QuestionElement> {
        let _gate = self.write_gate.lock().await;
        self.require_questionnaire(questionnaire_id)?;
        Ok(self.insert_element(questionnaire_id, new))
    }

    async fn get_element(&self, id: ElementId) -> Result<Option<QuestionElement>> {
        Ok(self.elements.get(&id).map(|e| e.value().clone()))
    }

    async fn list_elements(
        &self,
        questionnaire_id: QuestionnaireId,
    ) -> Result<Vec<QuestionElement>> {
        let mut elements: Vec<QuestionElement> = self
            .elements
            .iter()
            .filter(|e| e.questionnaire_id == questionnaire_id)
            .map(|e| e.value().clone())
            .collect();
        elements.sort_by_key(|e| e.id);
        Ok(elements)
    }

    async fn update_element(
        &self,
        id: ElementId,
        update: QuestionElementUpdate,
    ) -> Result<Option<QuestionElement>> {
        let Some(mut entry) = self.elements.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(field_type) = update.field_type {
            entry.field_type = field_type;
        }
        if let Some(label) = update.label {
            entry.label = label;
        }
        if update.options.is_some() {
            entry.options = update.options;
        }
        Ok(Some(entry.value().clone()))
    }

    async fn delete_element(&self, id: ElementId) -> Result<bool> {
        Ok(self.elements.remove(&id).is_some())
    }

    async fn create_record(
        &self,
        questionnaire_id: QuestionnaireId,
        new: NewDataObject,
    ) -> Result<DataObject> {
        let _gate = self.write_gate.lock().await;
        self.require_questionnaire(questionnaire_id)?;
        Ok(self.insert_record(questionnaire_id, new))
    }

    async fn create_record_from_sources(
        &self,
        questionnaire_id: QuestionnaireId,
        new: NewDataObject,
        sources: &[RecordId],
    ) -> Result<DataObject> {
        let _gate = self.write_gate.lock().await;
        self.require_questionnaire(questionnaire_id)?;

        if let Some(missing) = sources.iter().find(|id| !self.records.contains_key(*id)) {
            return Err(SurveyError::NotFound(format!(
                "DataObject with id {} not found",
                missing
            )));
        }

        Ok(self.insert_record(questionnaire_id, new))
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<DataObject>> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn list_records_by_owner(
        &self,
        owner_id: UserId,
        query: &RecordQuery,
    ) -> Result<Vec<DataObject>> {
        let owned: HashSet<QuestionnaireId> = self
            .questionnaires
            .iter()
            .filter(|q| q.owner_id == owner_id)
            .map(|q| q.id)
            .collect();

        let mut records: Vec<DataObject> = self
            .records
            .iter()
            .filter(|r| owned.contains(&r.questionnaire_id) && query.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| r.id);

        Ok(match query.page {
            Some(page) => page.apply(records),
            None => records,
        })
    }

    async fn list_records_by_questionnaire(
        &self,
        questionnaire_id: QuestionnaireId,
    ) -> Result<Vec<DataObject>> {
        let mut records: Vec<DataObject> = self
            .records
            .iter()
            .filter(|r| r.questionnaire_id == questionnaire_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    async fn set_record_note(
        &self,
        id: RecordId,
        note: Option<String>,
    ) -> Result<Option<DataObject>> {
        let Some(mut entry) = self.records.get_mut(&id) else {
            return Ok(None);
        };
        entry.additional_info = note;
        Ok(Some(entry.value().clone()))
    }

    async fn add_favorite(&self, key: FavoriteKey) -> Result<bool> {
        Ok(self.favorites.insert(key))
    }

    async fn remove_favorite(&self, key: FavoriteKey) -> Result<bool> {
        Ok(self.favorites.remove(&key).is_some())
    }

    async fn is_favorite(&self, key: FavoriteKey) -> Result<bool> {
        Ok(self.favorites.contains(&key))
    }

    async fn list_favorites(&self, user_id: UserId) -> Result<Vec<RecordId>> {
        let mut ids: Vec<RecordId> = self
            .favorites
            .iter()
            .filter(|k| k.user_id == user_id)
            .map(|k| k.record_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnswerValue;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            name: name.into(),
            password_hash: "hash".into(),
        }
    }

    fn located(lat: f64, lon: f64) -> NewDataObject {
        NewDataObject {
            latitude: Some(lat),
            longitude: Some(lon),
            ..Default::default()
        }
    }

    async fn seeded() -> (MemoryStore, User, Questionnaire) {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("owner")).await.unwrap();
        let q = store
            .create_questionnaire(
                user.id,
                NewQuestionnaire {
                    title: "Trees".into(),
                    elements: vec![NewQuestionElement {
                        field_type: "text".into(),
                        label: "Species".into(),
                        options: None,
                    }],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        (store, user, q)
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user("a")).await.unwrap();
        let b = store.create_user(new_user("b")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(a.is_active);
    }

    #[tokio::test]
    async fn test_duplicate_user_name_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("alice")).await.unwrap();
        let err = store.create_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, SurveyError::Conflict(_)));
        assert_eq!(
            store.get_user_by_name("alice").await.unwrap().map(|u| u.id),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_questionnaire_created_with_elements() {
        let (store, user, q) = seeded().await;
        assert_eq!(q.owner_id, user.id);

        let elements = store.list_elements(q.id).await.unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].label, "Species");
    }

    #[tokio::test]
    async fn test_record_requires_questionnaire() {
        let store = MemoryStore::new();
        let err = store
            .create_record(99, NewDataObject::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SurveyError::NotFound(_)));
        assert_eq!(store.record_count(), 0);
    }

    #[tokio::test]
    async fn test_records_by_owner_are_scoped_and_ordered() {
        let (store, user, q) = seeded().await;
        let other = store.create_user(new_user("other")).await.unwrap();
        let foreign = store
            .create_questionnaire(
                other.id,
                NewQuestionnaire {
                    title: "Other".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let r1 = store.create_record(q.id, located(1.0, 1.0)).await.unwrap();
        store
            .create_record(foreign.id, located(1.0, 1.0))
            .await
            .unwrap();
        let r3 = store
            .create_record(q.id, NewDataObject::default())
            .await
            .unwrap();

        let all = store
            .list_records_by_owner(user.id, &RecordQuery::default())
            .await
            .unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![r1.id, r3.id]);

        let located_only = store
            .list_records_by_owner(user.id, &RecordQuery::located())
            .await
            .unwrap();
        assert_eq!(located_only.len(), 1);
        assert_eq!(located_only[0].id, r1.id);

        let paged = store
            .list_records_by_owner(
                user.id,
                &RecordQuery {
                    page: Some(Page::new(1, 10)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].id, r3.id);
    }

    #[tokio::test]
    async fn test_merge_write_rechecks_sources() {
        let (store, _user, q) = seeded().await;
        let r1 = store.create_record(q.id, located(1.0, 1.0)).await.unwrap();

        let err = store
            .create_record_from_sources(q.id, NewDataObject::default(), &[r1.id, 42])
            .await
            .unwrap_err();
        assert!(matches!(err, SurveyError::NotFound(_)));
        assert_eq!(store.record_count(), 1);

        let merged = store
            .create_record_from_sources(q.id, NewDataObject::default(), &[r1.id])
            .await
            .unwrap();
        assert_eq!(merged.questionnaire_id, q.id);
        assert_eq!(store.record_count(), 2);
    }

    #[tokio::test]
    async fn test_delete_questionnaire_cascades() {
        let (store, user, q) = seeded().await;
        let mut values = crate::types::AnswerMap::new();
        values.insert("Species".into(), Some(AnswerValue::from("oak")));
        let record = store
            .create_record(
                q.id,
                NewDataObject {
                    data_values: values,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let key = FavoriteKey::new(user.id, record.id);
        assert!(store.add_favorite(key).await.unwrap());

        assert!(store.delete_questionnaire(q.id).await.unwrap());
        assert!(!store.delete_questionnaire(q.id).await.unwrap());

        assert!(store.get_record(record.id).await.unwrap().is_none());
        assert!(store.list_elements(q.id).await.unwrap().is_empty());
        assert!(!store.is_favorite(key).await.unwrap());
    }

    #[tokio::test]
    async fn test_favorites_are_a_set() {
        let store = MemoryStore::new();
        let key = FavoriteKey::new(1, 5);

        assert!(store.add_favorite(key).await.unwrap());
        assert!(!store.add_favorite(key).await.unwrap());
        store.add_favorite(FavoriteKey::new(1, 2)).await.unwrap();
        store.add_favorite(FavoriteKey::new(2, 9)).await.unwrap();

        assert_eq!(store.list_favorites(1).await.unwrap(), vec![2, 5]);
        assert!(store.remove_favorite(key).await.unwrap());
        assert!(!store.remove_favorite(key).await.unwrap());
    }

    #[tokio::test]
    async fn test_partial_updates() {
        let (store, _user, q) = seeded().await;
        let updated = store
            .update_questionnaire(
                q.id,
                QuestionnaireUpdate {
                    description: Some("Street trees".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Trees");
        assert_eq!(updated.description.as_deref(), Some("Street trees"));

        assert!(store
            .update_questionnaire(404, QuestionnaireUpdate::default())
            .await
            .unwrap()
            .is_none());

        let record = store.create_record(q.id, located(2.0, 3.0)).await.unwrap();
        let noted = store
            .set_record_note(record.id, Some("checked".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(noted.additional_info.as_deref(), Some("checked"));
        assert_eq!(noted.latitude, Some(2.0));
    }
}
