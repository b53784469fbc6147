//! Concurrent transitions against a file database with a real pool.

mod common;

use std::collections::HashSet;

use common::*;
use tokio::task::JoinSet;

use depot_core::{Amount, DocumentStatus};
use depot_posting::{ErrorCode, PostingConfig};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_competing_outcomes_never_oversell() {
    let (service, _dir) = file_service(PostingConfig::default()).await;
    post_new(&service, income(W1, MILK, 10, 100)).await;

    let mut drafts = Vec::new();
    for _ in 0..2 {
        drafts.push(service.create_document(outcome(W1, MILK, 8)).await.unwrap());
    }

    let mut tasks = JoinSet::new();
    for doc in drafts {
        let service = service.clone();
        tasks.spawn(async move { service.post_document(&doc.id, None).await });
    }

    let mut posted = 0;
    let mut rejected = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(doc) => {
                assert_eq!(doc.status, DocumentStatus::Posted);
                posted += 1;
            }
            Err(err) => {
                assert_eq!(err.code(), ErrorCode::InsufficientStock, "{err}");
                rejected += 1;
            }
        }
    }

    assert_eq!((posted, rejected), (1, 1));
    assert_eq!(balance(&service, W1, MILK).await, qty(2));
    assert_ledger_consistent(&service, W1, MILK, true).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_posts_get_distinct_numbers() {
    let (service, _dir) = file_service(PostingConfig::default()).await;

    let mut ids = Vec::new();
    for i in 0..12 {
        let doc = service.create_document(income(W1, MILK, 1, 10 + i)).await.unwrap();
        ids.push(doc.id);
    }

    let mut tasks = JoinSet::new();
    for id in ids {
        let service = service.clone();
        tasks.spawn(async move { service.post_document(&id, Some("worker")).await });
    }

    let mut numbers = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        let doc = joined.unwrap().unwrap();
        assert!(numbers.insert(doc.number.clone()), "duplicate number {}", doc.number);
    }

    let expected: HashSet<String> = (1..=12).map(|n| format!("ПР-{n:06}")).collect();
    assert_eq!(numbers, expected);
    assert_eq!(balance(&service, W1, MILK).await, qty(12));
    assert_eq!(service.list_lots(W1, MILK).await.unwrap().len(), 12);
    assert_ledger_consistent(&service, W1, MILK, true).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_traffic_keeps_ledger_consistent() {
    let (service, _dir) = file_service(PostingConfig::default()).await;
    post_new(&service, income(W1, MILK, 50, 100)).await;
    post_new(&service, income(W1, BREAD, 50, 20)).await;

    let mut drafts = Vec::new();
    for i in 0..6 {
        drafts.push(service.create_document(outcome(W1, MILK, 3)).await.unwrap());
        drafts.push(service.create_document(transfer(W1, W2, BREAD, 4)).await.unwrap());
        drafts.push(service.create_document(income(W1, MILK, 2, 90 + i)).await.unwrap());
    }

    let mut tasks = JoinSet::new();
    for doc in drafts {
        let service = service.clone();
        tasks.spawn(async move { service.post_document(&doc.id, None).await });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    assert_eq!(balance(&service, W1, MILK).await, qty(50 - 18 + 12));
    assert_eq!(balance(&service, W1, BREAD).await, qty(26));
    assert_eq!(balance(&service, W2, BREAD).await, qty(24));
    assert_eq!(reserved(&service, W1, MILK).await, Amount::ZERO);
    for (warehouse_id, variant_id) in [(W1, MILK), (W1, BREAD), (W2, BREAD)] {
        assert_ledger_consistent(&service, warehouse_id, variant_id, true).await;
    }
}
