//! Poller backoff, give-up threshold and per-topic isolation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use camunda_bridge::config::WorkerConfig;
use camunda_bridge::messaging::{InMemoryQueuePublisher, QueuePublisher};
use camunda_bridge::routing::RoutingTable;
use camunda_bridge::worker::{
    AggregateStats, FailureHandler, PollerExit, PollerTimings, TaskDispatcher, TopicPoller,
    WorkerSupervisor,
};

use common::{config_with_topics, task, ScriptedEngine};

fn poller(
    topic: &str,
    engine: Arc<ScriptedEngine>,
    publisher: Arc<InMemoryQueuePublisher>,
    cancel: CancellationToken,
) -> TopicPoller {
    let config = config_with_topics(&[(topic, "system")]);
    let stats = Arc::new(AggregateStats::new());
    let failure_handler =
        FailureHandler::new(publisher.clone(), engine.clone(), &WorkerConfig::default());
    let dispatcher = TaskDispatcher::new(
        publisher,
        Arc::new(RoutingTable::from_config(&config.routing)),
        failure_handler,
        stats.clone(),
    );

    TopicPoller::new(
        topic,
        engine,
        dispatcher,
        stats,
        PollerTimings::from_config(&config),
        cancel,
    )
}

#[tokio::test(start_paused = true)]
async fn test_poller_gives_up_after_threshold_with_capped_backoff() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.fail_topic("broken");
    let publisher = Arc::new(InMemoryQueuePublisher::default());

    let started = Instant::now();
    let exit = poller("broken", engine.clone(), publisher, CancellationToken::new())
        .run()
        .await;

    assert_eq!(
        exit,
        PollerExit::TooManyErrors {
            consecutive_errors: 5
        }
    );
    assert_eq!(engine.fetch_count("broken"), 5);

    // Waits of 5 + 10 + 15 + 20 seconds between the five attempts
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(50), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(51), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_successful_fetch_resets_error_streak() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.fail_topic("flaky");
    let publisher = Arc::new(InMemoryQueuePublisher::default());
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(poller("flaky", engine.clone(), publisher, cancel.clone()).run());

    // Errors at t=0, 5, 15, 30; heal before the fifth attempt at t=50
    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(engine.fetch_count("flaky"), 4);
    engine.heal_topic("flaky");

    // t=50 succeeds; fail again and the streak starts from one
    tokio::time::sleep(Duration::from_secs(12)).await;
    engine.fail_topic("flaky");
    let fetched = engine.fetch_count("flaky");

    // Four more errors are tolerated, so the poller is still alive
    tokio::time::sleep(Duration::from_secs(40)).await;
    assert!(!handle.is_finished());
    assert!(engine.fetch_count("flaky") > fetched);

    cancel.cancel();
    assert_eq!(handle.await.unwrap(), PollerExit::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_hung_fetch() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.hang_fetches();
    let publisher = Arc::new(InMemoryQueuePublisher::default());
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(poller("slow", engine.clone(), publisher, cancel.clone()).run());
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(engine.fetch_count("slow"), 1);
    // Still parked in the first fetch
    assert!(!handle.is_finished());

    let before = Instant::now();
    cancel.cancel();
    let exit = handle.await.unwrap();

    assert_eq!(exit, PollerExit::Cancelled);
    assert!(before.elapsed() < Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_broken_topic_does_not_affect_other_topics() {
    let engine = Arc::new(ScriptedEngine::new());
    engine.fail_topic("broken");
    engine.push_batch("healthy", vec![task("h-1", "healthy")]);

    let publisher = Arc::new(InMemoryQueuePublisher::default());
    let supervisor = Arc::new(WorkerSupervisor::new(
        config_with_topics(&[("broken", "legacy"), ("healthy", "billing")]),
        engine.clone(),
        publisher.clone(),
    ));
    supervisor.initialize().await.unwrap();

    let runner = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move { supervisor.start().await })
    };

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(engine.fetch_count("broken"), 5);

    let status = supervisor.status().await;
    // healthy poller + monitor
    assert_eq!(status.active_tasks, 2);
    assert!(status.is_running);

    let healthy_before = engine.fetch_count("healthy");
    engine.push_batch("healthy", vec![task("h-2", "healthy")]);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(engine.fetch_count("broken"), 5);
    assert!(engine.fetch_count("healthy") > healthy_before);

    let ids: Vec<String> = publisher
        .messages("healthy")
        .await
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec!["h-1", "h-2"]);
    assert!(publisher.is_connected());

    let report = supervisor.shutdown().await.unwrap();
    assert_eq!(report.joined, 3);
    assert_eq!(report.abandoned, 0);
    runner.await.unwrap().unwrap();
}
