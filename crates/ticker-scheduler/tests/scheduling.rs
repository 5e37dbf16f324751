mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{local, settle, BrokenClock, MockSink, PausedClock};
use ticker_scheduler::{SchedulerState, TickService, TimerExit};

fn service_at(h: u32, m: u32, s: u32, ms: i64) -> Arc<TickService> {
    Arc::new(TickService::with_clock(Arc::new(PausedClock::starting_at(local(
        h, m, s, ms,
    )))))
}

#[tokio::test(start_paused = true)]
async fn first_tick_waits_for_minute_boundary() {
    let svc = service_at(10, 14, 45, 200);
    let (sink, tap) = MockSink::new();
    svc.subscribe(Some("a"), Box::new(sink));

    assert_eq!(svc.state(), SchedulerState::Idle);
    let mut states = svc.watch_state();
    svc.start();
    assert_eq!(svc.state(), SchedulerState::WaitingForBoundary);

    // 60000 - 45200 = 14800 ms to 10:15:00.000
    tokio::time::sleep(Duration::from_millis(14_799)).await;
    assert_eq!(tap.events().len(), 1);

    tokio::time::sleep(Duration::from_millis(2)).await;
    let events = tap.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].hour, 10);
    assert_eq!(events[1].minute, 15);
    assert_eq!(events[1].message, "Tick at 10:15:00");
    assert!(events[1].timestamp.ends_with(":00.000Z"));
    states
        .wait_for(|s| *s == SchedulerState::Ticking)
        .await
        .expect("state channel open");

    svc.shutdown();
}

#[tokio::test(start_paused = true)]
async fn subsequent_ticks_are_a_minute_apart() {
    let svc = service_at(10, 14, 45, 200);
    let (sink, tap) = MockSink::new();
    svc.subscribe(Some("a"), Box::new(sink));
    svc.start();

    tokio::time::sleep(Duration::from_millis(14_801)).await;
    assert_eq!(tap.events().len(), 2);

    tokio::time::sleep(Duration::from_millis(59_998)).await;
    assert_eq!(tap.events().len(), 2);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(tap.events().len(), 3);

    tokio::time::sleep(Duration::from_millis(60_000)).await;
    let minutes: Vec<u32> = tap.events()[1..].iter().map(|e| e.minute).collect();
    assert_eq!(minutes, vec![15, 16, 17]);

    svc.shutdown();
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_boundary_cancels_timer() {
    let svc = service_at(10, 14, 45, 200);
    let (sink, tap) = MockSink::new();
    svc.subscribe(Some("a"), Box::new(sink));
    svc.start();

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    svc.shutdown();
    assert_eq!(svc.state(), SchedulerState::ShutDown);

    tokio::time::sleep(Duration::from_secs(180)).await;
    assert_eq!(tap.events().len(), 1);
    assert_eq!(svc.state(), SchedulerState::ShutDown);
}

#[tokio::test(start_paused = true)]
async fn start_twice_arms_one_timer() {
    let svc = service_at(8, 0, 30, 0);
    let (sink, tap) = MockSink::new();
    svc.subscribe(Some("a"), Box::new(sink));
    svc.start();
    svc.start();

    tokio::time::sleep(Duration::from_millis(30_001)).await;
    assert_eq!(tap.events().len(), 2);
    assert_eq!(tap.events()[1].minute, 1);

    svc.shutdown();
}

#[tokio::test(start_paused = true)]
async fn end_to_end_subscribe_tick_disconnect() {
    let svc = service_at(10, 14, 45, 200);
    svc.start();

    let (sink, tap) = MockSink::new();
    svc.subscribe(Some("a"), Box::new(sink));
    assert_eq!(svc.stats().subscriber_count, 1);
    assert_eq!(tap.events()[0].message, "Connected to tick server");

    tokio::time::sleep(Duration::from_millis(14_801)).await;
    let events = tap.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].minute, 15);

    tap.disconnect();
    settle().await;
    assert_eq!(svc.stats().subscriber_count, 0);

    // later ticks find nobody and write nothing
    tokio::time::sleep(Duration::from_millis(60_000)).await;
    assert_eq!(tap.events().len(), 2);

    svc.shutdown();
}

#[tokio::test]
async fn timer_panic_is_reported() {
    let svc = Arc::new(TickService::with_clock(Arc::new(BrokenClock)));
    svc.start();

    let exit = tokio::time::timeout(Duration::from_secs(5), svc.timer_exit())
        .await
        .expect("timer task ended");
    assert_eq!(exit, TimerExit::Panicked("clock source unavailable".to_string()));
}

#[tokio::test(start_paused = true)]
async fn timer_exit_after_shutdown_is_stopped() {
    let svc = service_at(10, 14, 45, 200);
    svc.start();
    tokio::time::sleep(Duration::from_millis(20_000)).await;

    svc.shutdown();
    assert_eq!(svc.timer_exit().await, TimerExit::Stopped);
}

#[tokio::test(start_paused = true)]
async fn uptime_follows_service_age() {
    let svc = service_at(10, 14, 45, 200);
    tokio::time::sleep(Duration::from_secs(90)).await;

    let uptime = svc.stats().uptime;
    assert!((90.0..91.0).contains(&uptime), "uptime was {uptime}");
}
