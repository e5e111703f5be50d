//! End-to-end admission pipeline tests over the in-memory mocks.
//!
//! These exercise the oversell and double-buy guarantees under real task
//! concurrency, without requiring Redis or Postgres.

#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use seckill::mocks::{MockAdmissionStore, MockIdSource, MockOrderRepository, MockVoucherSource};
use seckill::{
    order_queue, AdmissionEngine, OrderReceiver, OverflowPolicy, PersistenceWorker, QueueConfig,
    Rejection, SeckillError, UserId, Voucher, VoucherId,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

type MockEngine = AdmissionEngine<MockVoucherSource, MockAdmissionStore, MockIdSource>;

fn voucher(id: i64, stock: i32, now: DateTime<Utc>) -> Voucher {
    Voucher {
        id: VoucherId(id),
        stock,
        begin_time: now - ChronoDuration::hours(1),
        end_time: now + ChronoDuration::hours(1),
    }
}

async fn engine_with_stock(stock: i32, now: DateTime<Utc>) -> (MockEngine, OrderReceiver) {
    let vouchers = MockVoucherSource::new();
    let voucher = voucher(1, stock, now);
    vouchers.put(voucher.clone()).unwrap();
    let (queue, receiver) = order_queue(&QueueConfig {
        capacity: 256,
        overflow: OverflowPolicy::Reject,
        wait_timeout_ms: 100,
    });
    let engine = AdmissionEngine::new(
        vouchers,
        MockAdmissionStore::new(),
        MockIdSource::new(),
        queue,
    );
    engine.open_sale(&voucher).await.unwrap();
    (engine, receiver)
}

#[tokio::test]
async fn concurrent_admissions_never_oversell() {
    let now = Utc::now();
    let (engine, _receiver) = engine_with_stock(5, now).await;
    let engine = Arc::new(engine);

    let mut tasks = Vec::new();
    for user in 0..100_i64 {
        let engine = Arc::clone(&engine);
        tasks.push(tokio::spawn(async move {
            engine.admit(VoucherId(1), UserId(user), now).await
        }));
    }

    let mut admitted = 0;
    let mut sold_out = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(SeckillError::Rejected(Rejection::SoldOut)) => sold_out += 1,
            Err(e) => panic!("unexpected admission error: {e}"),
        }
    }
    assert_eq!(admitted, 5);
    assert_eq!(sold_out, 95);
}

#[tokio::test]
async fn single_unit_goes_to_exactly_one_user() {
    let now = Utc::now();
    let (engine, _receiver) = engine_with_stock(1, now).await;
    let engine = Arc::new(engine);

    let mut tasks = Vec::new();
    for user in 0..50_i64 {
        let engine = Arc::clone(&engine);
        tasks.push(tokio::spawn(async move {
            engine.admit(VoucherId(1), UserId(user), now).await
        }));
    }

    let winners = futures::future::join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn same_user_buys_at_most_once_under_concurrency() {
    let now = Utc::now();
    let (engine, _receiver) = engine_with_stock(10, now).await;
    let engine = Arc::new(engine);

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let engine = Arc::clone(&engine);
        tasks.push(tokio::spawn(async move {
            engine.admit(VoucherId(1), UserId(7), now).await
        }));
    }

    let mut admitted = 0;
    let mut duplicates = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(SeckillError::Rejected(Rejection::AlreadyPurchased)) => duplicates += 1,
            Err(e) => panic!("unexpected admission error: {e}"),
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(duplicates, 19);

    // The 9 remaining units are still available to other users.
    for user in 100..109_i64 {
        engine.admit(VoucherId(1), UserId(user), now).await.unwrap();
    }
    assert!(matches!(
        engine.admit(VoucherId(1), UserId(200), now).await,
        Err(SeckillError::Rejected(Rejection::SoldOut))
    ));
}

#[tokio::test]
async fn pipeline_persists_every_admitted_order() {
    let now = Utc::now();
    let (engine, receiver) = engine_with_stock(5, now).await;

    let repository = MockOrderRepository::new(5);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = PersistenceWorker::new(receiver, repository.clone(), shutdown_rx).spawn();

    let mut issued = HashSet::new();
    for user in 0..20_i64 {
        if let Ok(order_id) = engine.admit(VoucherId(1), UserId(user), now).await {
            issued.insert(order_id);
        }
    }
    assert_eq!(issued.len(), 5);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();

    let persisted = repository.persisted_orders().unwrap();
    assert_eq!(persisted.len(), 5);
    let persisted_ids: HashSet<_> = persisted.iter().map(|o| o.id).collect();
    assert_eq!(persisted_ids, issued);
}

#[tokio::test]
async fn admissions_outside_window_never_reach_the_queue() {
    let now = Utc::now();
    let (engine, mut receiver) = engine_with_stock(5, now).await;

    let early = now - ChronoDuration::hours(2);
    let late = now + ChronoDuration::hours(2);
    assert!(matches!(
        engine.admit(VoucherId(1), UserId(1), early).await,
        Err(SeckillError::Rejected(Rejection::ActivityNotStarted))
    ));
    assert!(matches!(
        engine.admit(VoucherId(1), UserId(1), late).await,
        Err(SeckillError::Rejected(Rejection::ActivityEnded))
    ));

    drop(engine);
    assert!(receiver.recv().await.is_none());
}
