use std::sync::Arc;

use harvestflow_bookkeeping::{BulkEntry, SetHighest, TokenCounterService};
use harvestflow_core::{AppError, telemetry};
use harvestflow_storage::MemoryStore;
use serde_json::json;

fn service() -> TokenCounterService {
    TokenCounterService::new(Arc::new(MemoryStore::new()))
}

#[tokio::test]
async fn unknown_policy_reads_zero() {
    let counters = service();
    assert_eq!(counters.get_highest("nope").await.unwrap(), 0);
    assert_eq!(counters.next_token_id("nope").await.unwrap(), 1);
}

#[tokio::test]
async fn set_highest_keeps_the_maximum_in_either_order() {
    for (first, second) in [(4, 9), (9, 4), (6, 6)] {
        let counters = service();
        counters.set_highest("P", first).await.unwrap();
        counters.set_highest("P", second).await.unwrap();
        assert_eq!(counters.get_highest("P").await.unwrap(), first.max(second));
    }
}

#[tokio::test]
async fn lower_values_are_a_silent_noop() {
    let counters = service();
    assert_eq!(counters.set_highest("P", 10).await.unwrap(), 10);
    assert_eq!(counters.set_highest("P", 2).await.unwrap(), 10);
    assert_eq!(counters.next_token_id("P").await.unwrap(), 11);
}

#[tokio::test]
async fn bulk_initialize_takes_the_batch_maximum() {
    let counters = service();
    let batch = [
        BulkEntry::new("P", 3),
        BulkEntry::new("P", 7),
        BulkEntry::new("P", 2),
    ];

    assert_eq!(counters.bulk_initialize(&batch).await.unwrap(), 1);
    assert_eq!(counters.get_highest("P").await.unwrap(), 7);
}

#[tokio::test]
async fn bulk_initialize_skips_malformed_entries() {
    telemetry::init_for_tests();
    let counters = service();
    counters.set_highest("Q", 50).await.unwrap();

    let batch = [
        BulkEntry::new("P", 4),
        BulkEntry {
            policy_id: Some("P".into()),
            token_id: Some(json!("twelve")),
        },
        BulkEntry {
            policy_id: None,
            token_id: Some(json!(99)),
        },
        BulkEntry {
            policy_id: Some("R".into()),
            token_id: Some(json!("8")),
        },
        BulkEntry {
            policy_id: Some("Q".into()),
            token_id: Some(json!(5)),
        },
        BulkEntry {
            policy_id: Some("S".into()),
            token_id: None,
        },
    ];

    assert_eq!(counters.bulk_initialize(&batch).await.unwrap(), 3);
    assert_eq!(counters.get_highest("P").await.unwrap(), 4);
    assert_eq!(counters.get_highest("R").await.unwrap(), 8);
    assert_eq!(counters.get_highest("Q").await.unwrap(), 50);
    assert_eq!(counters.get_highest("S").await.unwrap(), 0);

    let listed: Vec<_> = counters
        .list_counters()
        .await
        .unwrap()
        .into_iter()
        .map(|c| (c.policy_id, c.highest_token_id))
        .collect();
    assert_eq!(
        listed,
        [("P".to_string(), 4), ("Q".to_string(), 50), ("R".to_string(), 8)]
    );
}

#[tokio::test]
async fn set_from_request_validates_fields() {
    let counters = service();

    let missing_policy = SetHighest {
        policy_id: None,
        token_id: Some(json!(3)),
    };
    assert!(matches!(
        counters.set_from_request(&missing_policy).await,
        Err(AppError::Validation(_))
    ));

    let bad_token = SetHighest {
        policy_id: Some("P".into()),
        token_id: Some(json!("x")),
    };
    assert!(matches!(
        counters.set_from_request(&bad_token).await,
        Err(AppError::Validation(_))
    ));

    let ok = SetHighest {
        policy_id: Some("P".into()),
        token_id: Some(json!("12")),
    };
    assert_eq!(counters.set_from_request(&ok).await.unwrap(), 12);
}

#[tokio::test]
async fn bulk_initialize_skips_ids_beyond_storage_range() {
    let counters = service();
    let batch = [
        BulkEntry::new("P", 1),
        BulkEntry {
            policy_id: Some("Q".into()),
            token_id: Some(json!(u64::MAX)),
        },
        BulkEntry {
            policy_id: Some("R".into()),
            token_id: Some(json!("9223372036854775808")),
        },
    ];

    assert_eq!(counters.bulk_initialize(&batch).await.unwrap(), 1);
    assert_eq!(counters.get_highest("P").await.unwrap(), 1);
    assert_eq!(counters.get_highest("Q").await.unwrap(), 0);
    assert_eq!(counters.get_highest("R").await.unwrap(), 0);

    let too_big = SetHighest {
        policy_id: Some("Q".into()),
        token_id: Some(json!(u64::MAX)),
    };
    assert!(matches!(
        counters.set_from_request(&too_big).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn reserve_next_token_id_advances_the_counter() {
    let counters = service();
    counters.set_highest("P", 4).await.unwrap();

    assert_eq!(counters.reserve_next_token_id("P").await.unwrap(), 5);
    assert_eq!(counters.reserve_next_token_id("P").await.unwrap(), 6);
    assert_eq!(counters.get_highest("P").await.unwrap(), 6);
    assert_eq!(counters.next_token_id("P").await.unwrap(), 7);
}
