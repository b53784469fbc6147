//! Orders, their holds, and outcomes shipped against them.

mod common;

use common::*;

use depot_core::{Amount, DocumentDraft, DocumentStatus, DocumentType, DraftItem};
use depot_posting::{ErrorCode, PostingConfig, PostingError};

fn outcome_for(order_id: &str, warehouse_id: &str, variant_id: &str, quantity: i64) -> DocumentDraft {
    DocumentDraft {
        base_document_id: Some(order_id.to_string()),
        ..outcome(warehouse_id, variant_id, quantity)
    }
}

#[tokio::test]
async fn test_reservation_blocks_free_outcome() {
    let service = memory_service(PostingConfig::default()).await;
    post_new(&service, income(W1, MILK, 20, 100)).await;
    post_new(&service, order(W1, MILK, 15)).await;

    assert_eq!(reserved(&service, W1, MILK).await, qty(15));
    assert_eq!(service.available_quantity(W1, MILK).await.unwrap(), qty(5));

    let sale = service.create_document(outcome(W1, MILK, 10)).await.unwrap();
    let err = service.post_document(&sale.id, None).await.unwrap_err();
    match err {
        PostingError::InsufficientStock { available, requested, .. } => {
            assert_eq!(available, qty(5));
            assert_eq!(requested, qty(10));
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(balance(&service, W1, MILK).await, qty(20));
    assert_eq!(reserved(&service, W1, MILK).await, qty(15));
}

#[tokio::test]
async fn test_outcome_against_order_releases_hold() {
    let service = memory_service(PostingConfig::default()).await;
    post_new(&service, income(W1, MILK, 20, 100)).await;
    let held = post_new(&service, order(W1, MILK, 15)).await;

    post_new(&service, outcome_for(&held.id, W1, MILK, 15)).await;

    assert_eq!(balance(&service, W1, MILK).await, qty(5));
    assert_eq!(reserved(&service, W1, MILK).await, Amount::ZERO);
    assert_eq!(service.available_quantity(W1, MILK).await.unwrap(), qty(5));
    assert_ledger_consistent(&service, W1, MILK, true).await;
}

#[tokio::test]
async fn test_over_shipment_clamps_release() {
    let service = memory_service(PostingConfig::default()).await;
    post_new(&service, income(W1, MILK, 20, 100)).await;
    let held = post_new(&service, order(W1, MILK, 5)).await;

    let sale = post_new(&service, outcome_for(&held.id, W1, MILK, 8)).await;

    assert_eq!(reserved(&service, W1, MILK).await, Amount::ZERO);
    assert_eq!(balance(&service, W1, MILK).await, qty(12));

    // Cancel puts back only what the shipment actually released.
    service.cancel_document(&sale.id, None).await.unwrap();
    assert_eq!(reserved(&service, W1, MILK).await, qty(5));
    assert_eq!(balance(&service, W1, MILK).await, qty(20));
    assert_ledger_consistent(&service, W1, MILK, true).await;
}

#[tokio::test]
async fn test_cancel_order_drops_hold() {
    let service = memory_service(PostingConfig::default()).await;
    post_new(&service, income(W1, MILK, 10, 100)).await;
    let held = post_new(&service, order(W1, MILK, 6)).await;

    let canceled = service.cancel_document(&held.id, None).await.unwrap();
    assert_eq!(canceled.status, DocumentStatus::Canceled);
    assert_eq!(reserved(&service, W1, MILK).await, Amount::ZERO);
    assert_eq!(balance(&service, W1, MILK).await, qty(10));
    assert!(movements(&service, &held.id).await.is_empty());
}

#[tokio::test]
async fn test_cancel_consumed_order_is_clamped() {
    let service = memory_service(PostingConfig::default()).await;
    post_new(&service, income(W1, MILK, 10, 100)).await;
    let held = post_new(&service, order(W1, MILK, 6)).await;
    post_new(&service, outcome_for(&held.id, W1, MILK, 4)).await;
    assert_eq!(reserved(&service, W1, MILK).await, qty(2));

    service.cancel_document(&held.id, None).await.unwrap();

    assert_eq!(reserved(&service, W1, MILK).await, Amount::ZERO);
}

#[tokio::test]
async fn test_over_shipment_keeps_other_orders_hold() {
    let service = memory_service(PostingConfig::default()).await;
    post_new(&service, income(W1, MILK, 25, 100)).await;
    let first = post_new(&service, order(W1, MILK, 15)).await;
    post_new(&service, order(W1, MILK, 5)).await;
    assert_eq!(reserved(&service, W1, MILK).await, qty(20));

    let sale = post_new(&service, outcome_for(&first.id, W1, MILK, 20)).await;

    assert_eq!(reserved(&service, W1, MILK).await, qty(5));
    assert_eq!(balance(&service, W1, MILK).await, qty(5));
    assert_eq!(service.available_quantity(W1, MILK).await.unwrap(), Amount::ZERO);

    // Free stock alone cannot cover the second order's hold any more.
    let extra = service.create_document(outcome(W1, MILK, 1)).await.unwrap();
    let err = service.post_document(&extra.id, None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientStock);

    service.cancel_document(&sale.id, None).await.unwrap();
    assert_eq!(reserved(&service, W1, MILK).await, qty(20));
    assert_eq!(balance(&service, W1, MILK).await, qty(25));
    assert_ledger_consistent(&service, W1, MILK, true).await;
}

#[tokio::test]
async fn test_second_shipment_against_same_order_is_capped() {
    let service = memory_service(PostingConfig::default()).await;
    post_new(&service, income(W1, MILK, 30, 100)).await;
    let first = post_new(&service, order(W1, MILK, 10)).await;
    post_new(&service, order(W1, MILK, 8)).await;

    post_new(&service, outcome_for(&first.id, W1, MILK, 6)).await;
    assert_eq!(reserved(&service, W1, MILK).await, qty(12));

    // Only 4 remain on the first order; the rest ships from free stock.
    post_new(&service, outcome_for(&first.id, W1, MILK, 6)).await;
    assert_eq!(reserved(&service, W1, MILK).await, qty(8));
    assert_eq!(balance(&service, W1, MILK).await, qty(18));
}

#[tokio::test]
async fn test_cancel_partly_shipped_order_keeps_other_orders_hold() {
    let service = memory_service(PostingConfig::default()).await;
    post_new(&service, income(W1, MILK, 25, 100)).await;
    let first = post_new(&service, order(W1, MILK, 15)).await;
    post_new(&service, order(W1, MILK, 5)).await;
    post_new(&service, outcome_for(&first.id, W1, MILK, 10)).await;
    assert_eq!(reserved(&service, W1, MILK).await, qty(10));

    service.cancel_document(&first.id, None).await.unwrap();

    assert_eq!(reserved(&service, W1, MILK).await, qty(5));
    assert_eq!(service.available_quantity(W1, MILK).await.unwrap(), qty(10));
}

#[tokio::test]
async fn test_order_beyond_available_is_rejected() {
    let service = memory_service(PostingConfig::default()).await;
    post_new(&service, income(W1, MILK, 10, 100)).await;
    post_new(&service, order(W1, MILK, 7)).await;

    let second = service.create_document(order(W1, MILK, 4)).await.unwrap();
    let err = service.post_document(&second.id, None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientStock);
    assert_eq!(reserved(&service, W1, MILK).await, qty(7));
}

#[tokio::test]
async fn test_cancel_income_cannot_break_reservation() {
    let service = memory_service(PostingConfig::default()).await;
    let receipt = post_new(&service, income(W1, MILK, 10, 100)).await;
    post_new(&service, order(W1, MILK, 3)).await;

    let err = service.cancel_document(&receipt.id, None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientStock);
    assert_eq!(balance(&service, W1, MILK).await, qty(10));
}

#[tokio::test]
async fn test_base_document_must_be_posted_order_of_same_warehouse() {
    let service = memory_service(PostingConfig::default()).await;
    post_new(&service, income(W1, MILK, 10, 100)).await;
    post_new(&service, income(W2, MILK, 10, 100)).await;

    let draft_order = service.create_document(order(W1, MILK, 2)).await.unwrap();
    let receipt = post_new(&service, income(W1, BREAD, 1, 10)).await;
    let other_wh = post_new(&service, order(W2, MILK, 2)).await;

    for base in [&draft_order.id, &receipt.id, &other_wh.id] {
        let sale = service
            .create_document(outcome_for(base, W1, MILK, 1))
            .await
            .unwrap();
        let err = service.post_document(&sale.id, None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError, "base {base}");
    }
    assert_eq!(balance(&service, W1, MILK).await, qty(10));
}

#[tokio::test]
async fn test_unknown_base_document_is_not_found() {
    let service = memory_service(PostingConfig::default()).await;
    let err = service
        .create_document(outcome_for("missing-order", W1, MILK, 1))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_base_document_only_on_outcome() {
    let service = memory_service(PostingConfig::default()).await;
    let receipt = post_new(&service, income(W1, MILK, 10, 100)).await;
    let anchored = service
        .create_document(DocumentDraft {
            base_document_id: Some(receipt.id.clone()),
            ..draft(DocumentType::Order, W1, vec![DraftItem::new(MILK, 1)])
        })
        .await
        .unwrap();

    let err = service.post_document(&anchored.id, None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
}
