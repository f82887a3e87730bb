mod common;

use async_trait::async_trait;
use common::*;
use mediator_core::failure::Failure;
use mediator_core::handlers::NotificationHandler;
use mediator_core::notifications::{NotificationHandlerExecutor, SharedNotification};
use mediator_core::{
    HandlerRegistry, Mediator, MediatorConfig, MediatorError, NotificationPublisher,
    PublishStrategy,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Sleeps, records its name, then optionally fails with a [`PingException`]
struct Delayed {
    name: &'static str,
    delay: Duration,
    fails: bool,
    journal: Journal,
}

impl Delayed {
    fn ok(name: &'static str, delay_ms: u64, journal: &Journal) -> Self {
        Self {
            name,
            delay: Duration::from_millis(delay_ms),
            fails: false,
            journal: journal.clone(),
        }
    }

    fn failing(name: &'static str, delay_ms: u64, journal: &Journal) -> Self {
        Self {
            fails: true,
            ..Self::ok(name, delay_ms, journal)
        }
    }
}

#[async_trait]
impl NotificationHandler<Pinged> for Delayed {
    async fn handle(&self, _n: &Pinged, _c: &CancellationToken) -> Result<(), Failure> {
        tokio::time::sleep(self.delay).await;
        self.journal.record(self.name);
        if self.fails {
            return Err(PingException(self.name.to_string()).into());
        }
        Ok(())
    }
}

fn pinged() -> Pinged {
    Pinged {
        message: "Pinged".to_string(),
    }
}

fn mediator_with(handlers: Vec<Delayed>) -> Mediator {
    let registry = HandlerRegistry::new();
    for handler in handlers {
        registry.add_notification_handler::<Pinged, _>(handler);
    }
    Mediator::new(registry.into_provider())
}

fn failure_names(error: &MediatorError) -> Vec<String> {
    match error {
        MediatorError::Aggregate(aggregate) => aggregate
            .failures()
            .iter()
            .map(|failure| failure.to_string())
            .collect(),
        other => vec![other.to_string()],
    }
}

#[tokio::test]
async fn test_sequential_stops_at_first_failure() {
    let journal = Journal::new();
    let mediator = mediator_with(vec![
        Delayed::ok("A", 10, &journal),
        Delayed::failing("B", 10, &journal),
        Delayed::ok("C", 10, &journal),
    ]);

    let error = mediator
        .publish(pinged(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(error.failure().unwrap().is::<PingException>());
    assert_eq!(journal.entries(), vec!["A", "B"]);
}

#[tokio::test]
async fn test_sequential_runs_one_at_a_time() {
    let journal = Journal::new();
    let mediator = mediator_with(vec![
        Delayed::ok("A", 100, &journal),
        Delayed::ok("B", 100, &journal),
        Delayed::ok("C", 100, &journal),
    ]);

    let started = Instant::now();
    mediator
        .publish_with(pinged(), PublishStrategy::Sequential, &CancellationToken::new())
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(journal.entries(), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_sequential_continue_aggregates_every_failure() {
    let journal = Journal::new();
    let mediator = mediator_with(vec![
        Delayed::failing("A", 5, &journal),
        Delayed::ok("B", 5, &journal),
        Delayed::failing("C", 5, &journal),
    ]);

    let error = mediator
        .publish_with(
            pinged(),
            PublishStrategy::SequentialContinueOnError,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        failure_names(&error),
        vec!["ping failed: A", "ping failed: C"]
    );
    assert_eq!(journal.entries(), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_sequential_continue_aggregates_single_failure() {
    let journal = Journal::new();
    let mediator = mediator_with(vec![Delayed::failing("A", 1, &journal)]);

    let error = mediator
        .publish_with(
            pinged(),
            PublishStrategy::SequentialContinueOnError,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, MediatorError::Aggregate(ref aggregate) if aggregate.len() == 1));
}

#[tokio::test]
async fn test_wait_all_runs_concurrently() {
    let journal = Journal::new();
    let mediator = mediator_with(vec![
        Delayed::ok("A", 200, &journal),
        Delayed::ok("B", 200, &journal),
        Delayed::ok("C", 200, &journal),
    ]);

    let started = Instant::now();
    mediator
        .publish_with(
            pinged(),
            PublishStrategy::ConcurrentWaitAll,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(550));
    assert_eq!(journal.len(), 3);
}

#[tokio::test]
async fn test_wait_all_failure_shapes() {
    let journal = Journal::new();
    let single = mediator_with(vec![
        Delayed::ok("A", 5, &journal),
        Delayed::failing("B", 5, &journal),
    ]);
    let error = single
        .publish_with(
            pinged(),
            PublishStrategy::ConcurrentWaitAll,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(error.failure().unwrap().is::<PingException>());

    let several = mediator_with(vec![
        Delayed::failing("A", 5, &journal),
        Delayed::failing("B", 5, &journal),
    ]);
    let error = several
        .publish_with(
            pinged(),
            PublishStrategy::ConcurrentWaitAll,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(error, MediatorError::Aggregate(ref aggregate) if aggregate.len() == 2));
}

#[tokio::test]
async fn test_wait_any_returns_with_first_completion() {
    let journal = Journal::new();
    let mediator = mediator_with(vec![
        Delayed::ok("slow", 1_000, &journal),
        Delayed::ok("fast", 10, &journal),
    ]);

    let started = Instant::now();
    mediator
        .publish_with(
            pinged(),
            PublishStrategy::ConcurrentWaitAny,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(journal.entries(), vec!["fast"]);
}

#[tokio::test]
async fn test_wait_any_reports_first_outcome() {
    let journal = Journal::new();
    let mediator = mediator_with(vec![
        Delayed::ok("slow", 500, &journal),
        Delayed::failing("fast", 5, &journal),
    ]);

    let error = mediator
        .publish_with(
            pinged(),
            PublishStrategy::ConcurrentWaitAny,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "ping failed: fast");
}

/// Reports on a channel once it ran
struct Signal(mpsc::UnboundedSender<&'static str>);

#[async_trait]
impl NotificationHandler<Pinged> for Signal {
    async fn handle(&self, _n: &Pinged, _c: &CancellationToken) -> Result<(), Failure> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = self.0.send("done");
        Err(PingException("ignored".to_string()).into())
    }
}

#[tokio::test]
async fn test_fire_and_forget_returns_before_handlers_finish() {
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let registry = HandlerRegistry::new();
    registry.add_notification_handler::<Pinged, _>(Signal(sender));
    let mediator = Mediator::new(registry.into_provider());

    mediator
        .publish_with(
            pinged(),
            PublishStrategy::ConcurrentFireAndForget,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(receiver.try_recv().is_err());

    let signal = tokio::time::timeout(Duration::from_secs(2), receiver.recv())
        .await
        .unwrap();
    assert_eq!(signal, Some("done"));
}

#[tokio::test]
async fn test_continue_on_error_runs_concurrently_and_aggregates() {
    let journal = Journal::new();
    let mediator = mediator_with(vec![
        Delayed::ok("A", 200, &journal),
        Delayed::failing("B", 200, &journal),
        Delayed::ok("C", 200, &journal),
    ]);

    let started = Instant::now();
    let error = mediator
        .publish_with(
            pinged(),
            PublishStrategy::ConcurrentContinueOnError,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_millis(550));
    assert_eq!(failure_names(&error), vec!["ping failed: B"]);
    assert_eq!(journal.len(), 3);
}

#[tokio::test]
async fn test_every_strategy_accepts_zero_handlers() {
    let mediator = Mediator::new(HandlerRegistry::new().into_provider());
    for strategy in PublishStrategy::ALL {
        mediator
            .publish_with(pinged(), strategy, &CancellationToken::new())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_every_awaiting_strategy_invokes_each_handler_once() {
    for strategy in [
        PublishStrategy::Sequential,
        PublishStrategy::SequentialContinueOnError,
        PublishStrategy::ConcurrentWaitAll,
        PublishStrategy::ConcurrentContinueOnError,
    ] {
        let journal = Journal::new();
        let mediator = mediator_with(vec![
            Delayed::ok("A", 1, &journal),
            Delayed::ok("B", 1, &journal),
        ]);
        mediator
            .publish_with(pinged(), strategy, &CancellationToken::new())
            .await
            .unwrap();

        let mut entries = journal.entries();
        entries.sort();
        assert_eq!(entries, vec!["A", "B"], "strategy {strategy}");
    }
}

#[tokio::test]
async fn test_configured_strategy_is_the_default() {
    let journal = Journal::new();
    let mediator = mediator_with(vec![
        Delayed::failing("A", 1, &journal),
        Delayed::failing("B", 1, &journal),
    ])
    .with_config(
        MediatorConfig::default().with_default_strategy(PublishStrategy::ConcurrentContinueOnError),
    );

    let error = mediator
        .publish(pinged(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, MediatorError::Aggregate(ref aggregate) if aggregate.len() == 2));
}

/// Publisher that only counts the executors it was handed
struct Counting(Arc<AtomicUsize>);

#[async_trait]
impl NotificationPublisher for Counting {
    async fn publish(
        &self,
        executors: Vec<NotificationHandlerExecutor>,
        _notification: SharedNotification,
        _cancellation: &CancellationToken,
    ) -> Result<(), Failure> {
        self.0.fetch_add(executors.len(), Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_custom_publisher_replaces_delivery() {
    let journal = Journal::new();
    let delivered = Arc::new(AtomicUsize::new(0));
    let mediator = mediator_with(vec![
        Delayed::ok("A", 1, &journal),
        Delayed::ok("B", 1, &journal),
    ])
    .with_publisher(Arc::new(Counting(Arc::clone(&delivered))));

    mediator
        .publish(pinged(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(delivered.load(Ordering::SeqCst), 2);
    assert_eq!(journal.len(), 0);
}

#[tokio::test]
async fn test_cancelled_sequential_publish_stops() {
    let journal = Journal::new();
    let mediator = mediator_with(vec![Delayed::ok("A", 1, &journal)]);
    let token = CancellationToken::new();
    token.cancel();

    let error = mediator.publish(pinged(), &token).await.unwrap_err();

    assert!(matches!(error, MediatorError::Cancelled));
    assert_eq!(journal.len(), 0);
}
