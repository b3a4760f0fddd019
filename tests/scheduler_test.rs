mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use spotbot::error::BotError;
use spotbot::execution::Scheduler;
use spotbot::risk::CircuitBreaker;
use spotbot::TradeSide;
use tempfile::TempDir;
use tokio::sync::watch;

const POLL: Duration = Duration::from_secs(300);

fn breaker(max_failures: u32) -> CircuitBreaker {
    CircuitBreaker::new(max_failures, Duration::from_secs(30), Duration::from_secs(1800))
}

#[tokio::test(start_paused = true)]
async fn test_halts_after_consecutive_failures() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(FakeExchange::with_balance(1000.0));
    let ranking = Arc::new(FakeRanking::failing());

    let cycle = build_cycle(
        test_config(),
        exchange,
        ranking.clone(),
        &dir.path().join("positions.json"),
    );
    let mut scheduler = Scheduler::new(cycle, breaker(3), POLL);
    let (_tx, rx) = watch::channel(false);

    let start = tokio::time::Instant::now();
    let result = scheduler.run(rx).await;

    assert!(matches!(result, Err(BotError::Halted { failures: 3 })));
    assert_eq!(ranking.calls(), 3);

    // Backoff of 30s then 60s before the third failure trips the breaker
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(90));
    assert!(elapsed < Duration::from_secs(91));
}

#[tokio::test(start_paused = true)]
async fn test_stops_on_shutdown_signal() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(FakeExchange::with_balance(1000.0));
    let ranking = Arc::new(FakeRanking::new(&[]));

    let cycle = build_cycle(
        test_config(),
        exchange.clone(),
        ranking,
        &dir.path().join("positions.json"),
    );
    let mut scheduler = Scheduler::new(cycle, breaker(3), POLL);
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(async move { scheduler.run(rx).await });

    // First cycle runs immediately, then the loop sleeps for the poll interval
    tokio::time::sleep(Duration::from_secs(1)).await;
    tx.send(true).unwrap();

    assert!(handle.await.unwrap().is_ok());
    assert_eq!(exchange.balance_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_polls_at_interval() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(FakeExchange::with_balance(1000.0));
    let ranking = Arc::new(FakeRanking::new(&[]));

    let cycle = build_cycle(
        test_config(),
        exchange.clone(),
        ranking,
        &dir.path().join("positions.json"),
    );
    let mut scheduler = Scheduler::new(cycle, breaker(3), POLL);
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(async move { scheduler.run(rx).await });

    // Cycles at t=0, 300 and 600
    tokio::time::sleep(Duration::from_secs(650)).await;
    tx.send(true).unwrap();

    assert!(handle.await.unwrap().is_ok());
    assert_eq!(exchange.balance_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_no_cycle_when_already_stopped() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(FakeExchange::with_balance(1000.0));
    let ranking = Arc::new(FakeRanking::new(&[]));

    let cycle = build_cycle(
        test_config(),
        exchange.clone(),
        ranking,
        &dir.path().join("positions.json"),
    );
    let mut scheduler = Scheduler::new(cycle, breaker(3), POLL);
    let (_tx, rx) = watch::channel(true);

    assert!(scheduler.run(rx).await.is_ok());
    assert_eq!(exchange.balance_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_success_resets_failure_count() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(FakeExchange::default());
    let ranking = Arc::new(FakeRanking::new(&[]));

    let cycle = build_cycle(
        test_config(),
        exchange.clone(),
        ranking,
        &dir.path().join("positions.json"),
    );
    let mut scheduler = Scheduler::new(cycle, breaker(2), POLL);
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(async move { scheduler.run(rx).await });

    // t=0 fails (balance unavailable), retry after 30s succeeds
    tokio::time::sleep(Duration::from_secs(10)).await;
    exchange.set_balance(Some(1000.0));

    // t=30 succeeds, t=330 fails again; without the reset that would trip
    tokio::time::sleep(Duration::from_secs(100)).await;
    exchange.set_balance(None);

    tokio::time::sleep(Duration::from_secs(240)).await;
    tx.send(true).unwrap();

    assert!(handle.await.unwrap().is_ok());
    assert_eq!(exchange.balance_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_unwritable_store_never_rebuys() {
    let dir = TempDir::new().unwrap();
    let exchange = Arc::new(FakeExchange::with_balance(1000.0));
    exchange.list("BTC/USDT", selloff(50000.0, 100));
    let ranking = Arc::new(FakeRanking::new(&["BTC"]));

    let cycle = build_cycle(
        test_config(),
        exchange.clone(),
        ranking,
        &dir.path().join("missing").join("positions.json"),
    );
    let mut scheduler = Scheduler::new(cycle, breaker(5), POLL);
    let (_tx, rx) = watch::channel(false);

    let result = scheduler.run(rx).await;

    assert!(matches!(result, Err(BotError::Halted { failures: 5 })));
    let buys = exchange
        .orders()
        .iter()
        .filter(|o| o.0 == "BTC/USDT" && o.1 == TradeSide::Buy)
        .count();
    assert_eq!(buys, 1);
}
