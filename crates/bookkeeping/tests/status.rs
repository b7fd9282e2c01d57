use std::{sync::Arc, time::Duration};

use harvestflow_bookkeeping::{StatusService, StatusUpdate};
use harvestflow_core::AppError;
use harvestflow_storage::{MemoryStore, models::NftStatus};

fn service() -> StatusService {
    StatusService::new(Arc::new(MemoryStore::new()))
}

fn new_nft(status: NftStatus) -> StatusUpdate {
    StatusUpdate {
        asset_name: Some("HarvestFlow".into()),
        policy_id: Some("policy1".into()),
        status: Some(status.as_str().into()),
        tx_hash: None,
        owner: Some("addr_owner".into()),
    }
}

#[tokio::test]
async fn insert_defaults_to_pending() {
    let statuses = service();
    let record = statuses
        .upsert(
            "proj1",
            1,
            StatusUpdate {
                status: None,
                ..new_nft(NftStatus::Pending)
            },
        )
        .await
        .unwrap();

    assert_eq!(record.status, NftStatus::Pending);
    assert!(record.minted_at.is_none());
    assert_eq!(statuses.find("proj1", 1).await.unwrap(), record);
}

#[tokio::test]
async fn minted_at_is_stamped_on_the_minting_call() {
    let statuses = service();
    let pending = statuses
        .upsert("proj1", 1, new_nft(NftStatus::Pending))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let minted = statuses
        .upsert(
            "proj1",
            1,
            StatusUpdate {
                tx_hash: Some("0xfeed".into()),
                ..StatusUpdate::with_status(NftStatus::Minted)
            },
        )
        .await
        .unwrap();

    assert_eq!(minted.status, NftStatus::Minted);
    let minted_at = minted.minted_at.expect("minted_at set");
    assert!(minted_at > pending.created_at);
    assert_eq!(minted.tx_hash.as_deref(), Some("0xfeed"));
    assert_eq!(minted.asset_name, "HarvestFlow");
    assert_eq!(minted.owner.as_deref(), Some("addr_owner"));

    // Re-submitting `minted` keeps the original stamp.
    let again = statuses
        .upsert("proj1", 1, StatusUpdate::with_status(NftStatus::Minted))
        .await
        .unwrap();
    assert_eq!(again.minted_at, Some(minted_at));
}

#[tokio::test]
async fn terminal_statuses_do_not_transition() {
    let statuses = service();
    statuses
        .upsert("proj1", 1, new_nft(NftStatus::Pending))
        .await
        .unwrap();
    statuses
        .upsert("proj1", 1, StatusUpdate::with_status(NftStatus::Failed))
        .await
        .unwrap();

    let err = statuses
        .upsert("proj1", 1, StatusUpdate::with_status(NftStatus::Minted))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(
        statuses.find("proj1", 1).await.unwrap().status,
        NftStatus::Failed
    );
}

#[tokio::test]
async fn insert_requires_asset_and_policy() {
    let statuses = service();
    let err = statuses
        .upsert("proj1", 1, StatusUpdate::with_status(NftStatus::Pending))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = statuses
        .upsert(
            "proj1",
            1,
            StatusUpdate {
                status: Some("burnt".into()),
                ..new_nft(NftStatus::Pending)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn missing_record_is_not_found() {
    let statuses = service();
    assert!(matches!(
        statuses.find("proj1", 42).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn project_stats_counts_only_minted() {
    let statuses = service();
    for (token_id, status) in [
        (1, NftStatus::Minted),
        (2, NftStatus::Pending),
        (3, NftStatus::Minted),
    ] {
        statuses
            .upsert("proj1", token_id, new_nft(status))
            .await
            .unwrap();
    }
    statuses
        .upsert("proj2", 9, new_nft(NftStatus::Minted))
        .await
        .unwrap();

    let stats = statuses.project_stats("proj1").await.unwrap();
    assert_eq!(stats.total_minted, 2);
    assert_eq!(stats.last_token_id, 3);
    assert_eq!(stats.next_token_id, 4);
    let recent: Vec<_> = stats.recent_mints.iter().map(|r| r.token_id).collect();
    assert_eq!(recent, [3, 1]);

    let empty = statuses.project_stats("nobody").await.unwrap();
    assert_eq!(empty.total_minted, 0);
    assert_eq!(empty.last_token_id, 0);
    assert_eq!(empty.next_token_id, 1);
    assert!(empty.recent_mints.is_empty());
}

#[tokio::test]
async fn recent_mints_are_capped_at_ten() {
    let statuses = service();
    for token_id in 1..=12 {
        statuses
            .upsert("proj1", token_id, new_nft(NftStatus::Minted))
            .await
            .unwrap();
    }

    let stats = statuses.project_stats("proj1").await.unwrap();
    assert_eq!(stats.total_minted, 12);
    let recent: Vec<_> = stats.recent_mints.iter().map(|r| r.token_id).collect();
    assert_eq!(recent, (3..=12u64).rev().collect::<Vec<_>>());
}

#[tokio::test]
async fn find_by_owner_keeps_insertion_order() {
    let statuses = service();
    for token_id in [5, 2, 8] {
        statuses
            .upsert("proj1", token_id, new_nft(NftStatus::Pending))
            .await
            .unwrap();
    }
    statuses
        .upsert(
            "proj1",
            4,
            StatusUpdate {
                owner: Some("someone_else".into()),
                ..new_nft(NftStatus::Pending)
            },
        )
        .await
        .unwrap();

    let owned: Vec<_> = statuses
        .find_by_owner("addr_owner")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.token_id)
        .collect();
    assert_eq!(owned, [5, 2, 8]);
}
