//! Field survey workflow through the library API
//!
//! Surveyors submit overlapping observations; the owner asks for nearby
//! duplicates of one record and merges them into a single record.

use serde_json::json;

use mapsurvey::db::{MemoryStore, SurveyStore};
use mapsurvey::services::{
    accounts, favorites, find_nearby, merge_records, questionnaires, records, MergeOverrides,
};
use mapsurvey::types::{
    AnswerMap, AnswerValue, NewDataObject, NewQuestionnaire, Page, RecordQuery, SurveyError,
};

fn observation(lat: f64, lon: f64, values: serde_json::Value) -> NewDataObject {
    let data_values: AnswerMap = serde_json::from_value(values).unwrap();
    NewDataObject {
        submitter_name: Some("field team".into()),
        latitude: Some(lat),
        longitude: Some(lon),
        data_values,
        additional_info: None,
    }
}

fn questionnaire(title: &str) -> NewQuestionnaire {
    NewQuestionnaire {
        title: title.into(),
        ..Default::default()
    }
}

/// Nearby suggestions feed straight into a merge of the duplicates
#[tokio::test]
async fn test_nearby_duplicates_are_merged() {
    let store = MemoryStore::new();
    let owner = accounts::register(&store, "do_merger", "pw").await.unwrap();
    let survey = questionnaires::create(&store, &owner, questionnaire("Benches"))
        .await
        .unwrap()
        .questionnaire;
    let archive = questionnaires::create(&store, &owner, questionnaire("Benches (clean)"))
        .await
        .unwrap()
        .questionnaire;

    let first = records::submit(
        &store,
        survey.id,
        None,
        observation(45.0, 5.0, json!({"seats": 4, "state": "worn", "painted": true})),
    )
    .await
    .unwrap();
    let second = records::submit(
        &store,
        survey.id,
        None,
        observation(45.0004, 5.0004, json!({"seats": 6, "state": "broken slat", "painted": false})),
    )
    .await
    .unwrap();
    records::submit(
        &store,
        survey.id,
        None,
        observation(45.02, 5.02, json!({"seats": 2})),
    )
    .await
    .unwrap();

    let nearby = find_nearby(&store, &owner, first.id, 100.0, Page::new(0, 10))
        .await
        .unwrap();
    assert_eq!(nearby.len(), 1);
    assert_eq!(nearby[0].record.id, second.id);
    assert!(nearby[0].distance_m < 100.0);

    let ids: Vec<_> = std::iter::once(first.id)
        .chain(nearby.iter().map(|m| m.record.id))
        .collect();
    let merged = merge_records(&store, &owner, &ids, archive.id, MergeOverrides::default())
        .await
        .unwrap();

    assert_eq!(merged.questionnaire_id, archive.id);
    assert_eq!(
        merged.data_values["seats"].as_ref().and_then(AnswerValue::as_f64),
        Some(5.0)
    );
    assert_eq!(
        merged.data_values["state"],
        Some(AnswerValue::Text("worn | broken slat".into()))
    );
    assert_eq!(merged.data_values["painted"], Some(AnswerValue::Boolean(true)));
    assert!((merged.latitude.unwrap() - 45.0002).abs() < 1e-9);
    assert!((merged.longitude.unwrap() - 5.0002).abs() < 1e-9);

    // Sources remain, the merged record is one more
    let all = records::list(&store, &owner, &RecordQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(records::get(&store, &owner, first.id).await.unwrap(), first);

    // The merged record sits next to its sources and is found from them
    let nearby = find_nearby(&store, &owner, first.id, 100.0, Page::new(0, 10))
        .await
        .unwrap();
    let found: Vec<_> = nearby.iter().map(|m| m.record.id).collect();
    assert!(found.contains(&merged.id));
    assert!(nearby.windows(2).all(|w| w[0].distance_m <= w[1].distance_m));
}

/// Another account can neither search around nor merge someone else's records
#[tokio::test]
async fn test_foreign_records_stay_out_of_reach() {
    let store = MemoryStore::new();
    let owner = accounts::register(&store, "owner", "pw").await.unwrap();
    let intruder = accounts::register(&store, "intruder", "pw").await.unwrap();

    let survey = questionnaires::create(&store, &owner, questionnaire("Trees"))
        .await
        .unwrap()
        .questionnaire;
    let own = questionnaires::create(&store, &intruder, questionnaire("Mine"))
        .await
        .unwrap()
        .questionnaire;

    let a = records::submit(&store, survey.id, None, observation(1.0, 1.0, json!({})))
        .await
        .unwrap();
    let b = records::submit(&store, survey.id, None, observation(1.0, 1.0, json!({})))
        .await
        .unwrap();

    let err = find_nearby(&store, &intruder, a.id, 500.0, Page::new(0, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, SurveyError::NotOwned(_)));

    let err = merge_records(&store, &intruder, &[a.id, b.id], own.id, MergeOverrides::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found_or_not_owned());

    assert!(favorites::add(&store, &intruder, a.id).await.is_err());
    assert!(favorites::list(&store, &intruder).await.unwrap().is_empty());

    let total = records::list(&store, &owner, &RecordQuery::default())
        .await
        .unwrap()
        .len();
    assert_eq!(total, 2);
}

/// Deleting a questionnaire takes its records out of nearby results and favorites
#[tokio::test]
async fn test_deleted_questionnaire_leaves_no_candidates() {
    let store = MemoryStore::new();
    let owner = accounts::register(&store, "owner", "pw").await.unwrap();
    let keep = questionnaires::create(&store, &owner, questionnaire("Keep"))
        .await
        .unwrap()
        .questionnaire;
    let drop = questionnaires::create(&store, &owner, questionnaire("Drop"))
        .await
        .unwrap()
        .questionnaire;

    let source = records::submit(&store, keep.id, None, observation(10.0, 10.0, json!({})))
        .await
        .unwrap();
    let doomed = records::submit(&store, drop.id, None, observation(10.0, 10.0, json!({})))
        .await
        .unwrap();
    favorites::add(&store, &owner, doomed.id).await.unwrap();

    let before = find_nearby(&store, &owner, source.id, 10.0, Page::new(0, 10))
        .await
        .unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].distance_m, 0.0);

    questionnaires::delete(&store, &owner, drop.id).await.unwrap();

    let after = find_nearby(&store, &owner, source.id, 10.0, Page::new(0, 10))
        .await
        .unwrap();
    assert!(after.is_empty());
    assert!(favorites::list(&store, &owner).await.unwrap().is_empty());
    assert!(store.get_record(doomed.id).await.unwrap().is_none());
}
