//! Nearby-match query
//!
//! Exhaustive scan over the owner's located records. There is no spatial
//! index; the scan is linear in the number of records the owner has.

use tracing::debug;

use crate::db::SurveyStore;
use crate::services::{geo, ownership};
use crate::types::{DataObject, Page, RecordId, RecordQuery, Result, SurveyError, User};

/// A record within range of the source, with its distance in meters
#[derive(Debug, Clone)]
pub struct NearbyMatch {
    pub record: DataObject,
    pub distance_m: f64,
}

/// Owned records within `radius_m` meters of `source_id`, closest first
/// (ties broken by ascending id), windowed by `page`.
pub async fn find_nearby(
    store: &dyn SurveyStore,
    user: &User,
    source_id: RecordId,
    radius_m: f64,
    page: Page,
) -> Result<Vec<NearbyMatch>> {
    let source = ownership::owned_record(store, user.id, source_id).await?;

    let (src_lat, src_lon) = source.coordinates().ok_or_else(|| {
        SurveyError::InvalidState("Source DataObject does not have valid coordinates.".into())
    })?;

    let candidates = store
        .list_records_by_owner(user.id, &RecordQuery::located())
        .await?;
    let scanned = candidates.len();

    let mut matches: Vec<NearbyMatch> = candidates
        .into_iter()
        .filter(|r| r.id != source.id)
        .filter_map(|record| {
            let (lat, lon) = record.coordinates()?;
            let distance_m = geo::distance(src_lat, src_lon, lat, lon);
            (distance_m <= radius_m).then_some(NearbyMatch { record, distance_m })
        })
        .collect();

    matches.sort_by(|a, b| {
        a.distance_m
            .total_cmp(&b.distance_m)
            .then(a.record.id.cmp(&b.record.id))
    });

    debug!(
        source_id,
        radius_m,
        scanned,
        matched = matches.len(),
        "Nearby scan complete"
    );

    Ok(page.apply(matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::types::{NewDataObject, NewQuestionnaire, NewUser, QuestionnaireId};

    async fn user(store: &MemoryStore, name: &str) -> User {
        store
            .create_user(NewUser {
                name: name.into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap()
    }

    async fn questionnaire(store: &MemoryStore, owner: &User) -> QuestionnaireId {
        store
            .create_questionnaire(
                owner.id,
                NewQuestionnaire {
                    title: "Sites".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn record_at(
        store: &MemoryStore,
        qid: QuestionnaireId,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> RecordId {
        store
            .create_record(
                qid,
                NewDataObject {
                    latitude: lat,
                    longitude: lon,
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .id
    }

    fn all() -> Page {
        Page::new(0, 100)
    }

    #[tokio::test]
    async fn test_radius_filter() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let qid = questionnaire(&store, &owner).await;

        let source = record_at(&store, qid, Some(45.0), Some(5.0)).await;
        let close = record_at(&store, qid, Some(45.001), Some(5.001)).await;
        record_at(&store, qid, Some(46.0), Some(6.0)).await;

        let found = find_nearby(&store, &owner, source, 200.0, all()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].record.id, close);
        assert!((found[0].distance_m - 136.19).abs() < 1.0);
    }

    #[tokio::test]
    async fn test_source_without_coordinates_is_invalid_state() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let qid = questionnaire(&store, &owner).await;

        let no_coords = record_at(&store, qid, None, None).await;
        let half = record_at(&store, qid, Some(45.0), None).await;
        record_at(&store, qid, Some(45.0), Some(5.0)).await;

        for source in [no_coords, half] {
            let err = find_nearby(&store, &owner, source, 1e9, all()).await.unwrap_err();
            assert!(matches!(err, SurveyError::InvalidState(_)), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn test_ownership_checked_before_coordinates() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let stranger = user(&store, "stranger").await;
        let qid = questionnaire(&store, &owner).await;
        let source = record_at(&store, qid, None, None).await;

        let err = find_nearby(&store, &stranger, source, 500.0, all()).await.unwrap_err();
        assert!(matches!(err, SurveyError::NotOwned(_)));

        let err = find_nearby(&store, &owner, 404, 500.0, all()).await.unwrap_err();
        assert!(matches!(err, SurveyError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_only_owned_records_are_candidates() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let stranger = user(&store, "stranger").await;
        let mine = questionnaire(&store, &owner).await;
        let mine_too = questionnaire(&store, &owner).await;
        let theirs = questionnaire(&store, &stranger).await;

        let source = record_at(&store, mine, Some(45.0), Some(5.0)).await;
        let sibling = record_at(&store, mine_too, Some(45.0), Some(5.0)).await;
        record_at(&store, theirs, Some(45.0), Some(5.0)).await;
        record_at(&store, mine, None, None).await;

        let found = find_nearby(&store, &owner, source, 10.0, all()).await.unwrap();
        let ids: Vec<_> = found.iter().map(|m| m.record.id).collect();
        assert_eq!(ids, vec![sibling]);
    }

    #[tokio::test]
    async fn test_order_and_pagination() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner").await;
        let qid = questionnaire(&store, &owner).await;

        let source = record_at(&store, qid, Some(45.0), Some(5.0)).await;
        let far = record_at(&store, qid, Some(45.002), Some(5.0)).await;
        let tie_a = record_at(&store, qid, Some(45.001), Some(5.0)).await;
        let tie_b = record_at(&store, qid, Some(45.001), Some(5.0)).await;
        let outside = record_at(&store, qid, Some(45.5), Some(5.0)).await;

        let found = find_nearby(&store, &owner, source, 1_000.0, all()).await.unwrap();
        let ids: Vec<_> = found.iter().map(|m| m.record.id).collect();
        assert_eq!(ids, vec![tie_a, tie_b, far]);
        assert!(!ids.contains(&outside));

        // Pagination applies to the filtered, ordered sequence
        let page = find_nearby(&store, &owner, source, 1_000.0, Page::new(1, 1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].record.id, tie_b);
    }
}
