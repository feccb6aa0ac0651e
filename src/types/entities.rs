//! Domain entities: users, questionnaires, question elements, records
//!
//! Records do not carry an owner. Ownership is always derived through the
//! record's questionnaire.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::answer::AnswerMap;

pub type UserId = i64;
pub type QuestionnaireId = i64;
pub type ElementId = i64;
pub type RecordId = i64;

/// Account that owns questionnaires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_active: bool,
}

/// Questionnaire (record container)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub id: QuestionnaireId,
    pub title: String,
    pub description: Option<String>,
    /// Plaintext shared secret required by non-owners
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    pub owner_id: UserId,
}

impl Questionnaire {
    pub fn is_password_protected(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Typed question belonging to a questionnaire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionElement {
    pub id: ElementId,
    pub questionnaire_id: QuestionnaireId,
    /// e.g. "text", "number", "coordinates_lat", "coordinates_lon", "date", "email"
    pub field_type: String,
    pub label: String,
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Submitted answer set ("data object")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataObject {
    pub id: RecordId,
    pub questionnaire_id: QuestionnaireId,
    pub submitter_name: Option<String>,
    pub submission_date: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub data_values: AnswerMap,
    pub additional_info: Option<String>,
}

impl DataObject {
    /// Both coordinates, or `None` if either is missing
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewQuestionElement {
    pub field_type: String,
    pub label: String,
    #[serde(default)]
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionElementUpdate {
    #[serde(default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewQuestionnaire {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub elements: Vec<NewQuestionElement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionnaireUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Fields of a record to be created; id and timestamp are assigned by the store
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewDataObject {
    #[serde(default)]
    pub submitter_name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub data_values: AnswerMap,
    #[serde(default)]
    pub additional_info: Option<String>,
}

// =============================================================================
// Queries
// =============================================================================

/// Offset/limit window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(skip: usize, limit: usize) -> Self {
        Self { skip, limit }
    }

    /// Apply this window to an already ordered sequence
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.skip).take(self.limit).collect()
    }
}

/// Filters for listing an owner's records
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub questionnaire_id: Option<QuestionnaireId>,
    /// Submitted on or after this date (UTC)
    pub start_date: Option<NaiveDate>,
    /// Submitted on or before this date (UTC, whole day included)
    pub end_date: Option<NaiveDate>,
    /// Only records with both coordinates set
    pub located_only: bool,
    pub page: Option<Page>,
}

impl RecordQuery {
    /// Query for every located record of an owner
    pub fn located() -> Self {
        Self {
            located_only: true,
            ..Default::default()
        }
    }

    /// Inclusive lower bound as a UTC instant
    pub fn start_bound(&self) -> Option<DateTime<Utc>> {
        self.start_date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// Exclusive upper bound as a UTC instant (midnight after `end_date`)
    pub fn end_bound(&self) -> Option<DateTime<Utc>> {
        self.end_date
            .and_then(|d| d.succ_opt())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// In-memory evaluation of the non-ownership filters
    pub fn matches(&self, record: &DataObject) -> bool {
        if let Some(qid) = self.questionnaire_id {
            if record.questionnaire_id != qid {
                return false;
            }
        }
        if let Some(start) = self.start_bound() {
            if record.submission_date < start {
                return false;
            }
        }
        if let Some(end) = self.end_bound() {
            if record.submission_date >= end {
                return false;
            }
        }
        if self.located_only && record.coordinates().is_none() {
            return false;
        }
        true
    }
}

/// Element of the favorites set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FavoriteKey {
    pub user_id: UserId,
    pub record_id: RecordId,
}

impl FavoriteKey {
    pub fn new(user_id: UserId, record_id: RecordId) -> Self {
        Self { user_id, record_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record_at(date: DateTime<Utc>, lat: Option<f64>, lon: Option<f64>) -> DataObject {
        DataObject {
            id: 1,
            questionnaire_id: 7,
            submitter_name: None,
            submission_date: date,
            latitude: lat,
            longitude: lon,
            data_values: AnswerMap::new(),
            additional_info: None,
        }
    }

    #[test]
    fn test_coordinates_require_both_axes() {
        let now = Utc::now();
        assert_eq!(record_at(now, Some(1.0), Some(2.0)).coordinates(), Some((1.0, 2.0)));
        assert_eq!(record_at(now, Some(1.0), None).coordinates(), None);
        assert_eq!(record_at(now, None, Some(2.0)).coordinates(), None);
    }

    #[test]
    fn test_end_date_is_inclusive() {
        let late = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap();
        let query = RecordQuery {
            end_date: NaiveDate::from_ymd_opt(2024, 3, 10),
            ..Default::default()
        };
        assert!(query.matches(&record_at(late, None, None)));
        assert!(!query.matches(&record_at(next_day, None, None)));
    }

    #[test]
    fn test_located_and_questionnaire_filters() {
        let now = Utc::now();
        let query = RecordQuery {
            questionnaire_id: Some(7),
            located_only: true,
            ..Default::default()
        };
        assert!(query.matches(&record_at(now, Some(1.0), Some(1.0))));
        assert!(!query.matches(&record_at(now, Some(1.0), None)));

        let other = RecordQuery {
            questionnaire_id: Some(8),
            ..Default::default()
        };
        assert!(!other.matches(&record_at(now, None, None)));
    }

    #[test]
    fn test_page_apply() {
        let page = Page::new(1, 2);
        assert_eq!(page.apply(vec![1, 2, 3, 4]), vec![2, 3]);
        assert!(Page::new(10, 2).apply(vec![1, 2]).is_empty());
    }

    #[test]
    fn test_password_protection() {
        let mut q = Questionnaire {
            id: 1,
            title: "t".into(),
            description: None,
            password: None,
            owner_id: 1,
        };
        assert!(!q.is_password_protected());
        q.password = Some(String::new());
        assert!(!q.is_password_protected());
        q.password = Some("secret".into());
        assert!(q.is_password_protected());
    }
}
