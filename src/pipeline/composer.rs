//! # Pipeline Composition
//!
//! Wraps a terminal handler invocation in the ordered chain of [`PipelineBehavior`]s.
//!
//! Behaviors run outermost-first in registration order. For behaviors `B1, B2`
//! around handler `H` the observable order is:
//!
//! ```text
//! B1 enter -> B2 enter -> H -> B2 exit -> B1 exit
//! ```
//!
//! Each stage receives a [`Next`] continuation. `Next` is consumed when run, so a
//! stage can invoke the rest of the chain at most once; a stage that never runs it
//! short-circuits the pipeline with its own result.

use crate::failure::Failure;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

type Continuation<'a, R> =
    Box<dyn FnOnce(CancellationToken) -> BoxFuture<'a, Result<R, Failure>> + Send + 'a>;

/// The remainder of a pipeline, invoked at most once.
pub struct Next<'a, R> {
    cancellation: CancellationToken,
    inner: Continuation<'a, R>,
}

impl<'a, R: Send + 'a> Next<'a, R> {
    pub fn new<F>(cancellation: CancellationToken, inner: F) -> Self
    where
        F: FnOnce(CancellationToken) -> BoxFuture<'a, Result<R, Failure>> + Send + 'a,
    {
        Self {
            cancellation,
            inner: Box::new(inner),
        }
    }

    /// Run the remaining stages with the token the pipeline was started with
    pub fn run(self) -> BoxFuture<'a, Result<R, Failure>> {
        (self.inner)(self.cancellation)
    }

    /// Run the remaining stages with a different token, e.g. a child token with a
    /// tighter deadline imposed by this stage
    pub fn run_with(self, cancellation: CancellationToken) -> BoxFuture<'a, Result<R, Failure>> {
        (self.inner)(cancellation)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Decorator wrapping the next stage of a request pipeline for request `M`
/// producing `R` (`()` for commands).
#[async_trait]
pub trait PipelineBehavior<M, R>: Send + Sync + 'static
where
    M: Send + Sync + 'static,
    R: Send + 'static,
{
    async fn handle(
        &self,
        request: &M,
        next: Next<'_, R>,
        cancellation: &CancellationToken,
    ) -> Result<R, Failure>;
}

/// Right fold of behaviors onto a terminal stage
pub struct PipelineComposer;

impl PipelineComposer {
    /// Build the chain for one invocation. The last behavior wraps the terminal,
    /// the first behavior is the entry point of the returned [`Next`].
    pub fn compose<'a, M, R, T>(
        request: &'a M,
        behaviors: &[Arc<dyn PipelineBehavior<M, R>>],
        cancellation: &CancellationToken,
        terminal: T,
    ) -> Next<'a, R>
    where
        M: Send + Sync + 'static,
        R: Send + 'static,
        T: FnOnce(CancellationToken) -> BoxFuture<'a, Result<R, Failure>> + Send + 'a,
    {
        let innermost = Next::new(cancellation.clone(), terminal);
        behaviors.iter().rev().fold(innermost, |next, behavior| {
            let behavior = Arc::clone(behavior);
            Next::new(
                cancellation.clone(),
                move |token: CancellationToken| -> BoxFuture<'a, Result<R, Failure>> {
                    Box::pin(async move { behavior.handle(request, next, &token).await })
                },
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Ping;

    #[derive(Debug, thiserror::Error)]
    #[error("terminal failed")]
    struct TerminalFailed;
    impl crate::failure::Fault for TerminalFailed {}

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl PipelineBehavior<Ping, String> for Recording {
        async fn handle(
            &self,
            _request: &Ping,
            next: Next<'_, String>,
            _cancellation: &CancellationToken,
        ) -> Result<String, Failure> {
            self.log.lock().push(format!("{} before", self.name));
            let response = next.run().await;
            self.log.lock().push(format!("{} after", self.name));
            response
        }
    }

    struct ShortCircuit;

    #[async_trait]
    impl PipelineBehavior<Ping, String> for ShortCircuit {
        async fn handle(
            &self,
            _request: &Ping,
            _next: Next<'_, String>,
            _cancellation: &CancellationToken,
        ) -> Result<String, Failure> {
            Ok("cached".to_string())
        }
    }

    fn recording(
        name: &'static str,
        log: &Arc<Mutex<Vec<String>>>,
    ) -> Arc<dyn PipelineBehavior<Ping, String>> {
        Arc::new(Recording {
            name,
            log: Arc::clone(log),
        })
    }

    #[tokio::test]
    async fn test_behaviors_wrap_terminal_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let behaviors = vec![recording("B1", &log), recording("B2", &log)];
        let terminal_log = Arc::clone(&log);
        let token = CancellationToken::new();

        let response = PipelineComposer::compose(&Ping, &behaviors, &token, move |_| {
            Box::pin(async move {
                terminal_log.lock().push("H".to_string());
                Ok("Pong".to_string())
            })
        })
        .run()
        .await
        .unwrap();

        assert_eq!(response, "Pong");
        assert_eq!(
            *log.lock(),
            vec!["B1 before", "B2 before", "H", "B2 after", "B1 after"]
        );
    }

    #[tokio::test]
    async fn test_empty_chain_runs_terminal() {
        let token = CancellationToken::new();
        let result = PipelineComposer::compose::<Ping, String, _>(&Ping, &[], &token, |_| {
            Box::pin(async { Err(Failure::new(TerminalFailed)) })
        })
        .run()
        .await;

        assert!(result.unwrap_err().is::<TerminalFailed>());
    }

    #[tokio::test]
    async fn test_short_circuit_skips_terminal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let behaviors: Vec<Arc<dyn PipelineBehavior<Ping, String>>> =
            vec![recording("B1", &log), Arc::new(ShortCircuit)];
        let terminal_log = Arc::clone(&log);
        let token = CancellationToken::new();

        let response = PipelineComposer::compose(&Ping, &behaviors, &token, move |_| {
            Box::pin(async move {
                terminal_log.lock().push("H".to_string());
                Ok("Pong".to_string())
            })
        })
        .run()
        .await
        .unwrap();

        assert_eq!(response, "cached");
        assert_eq!(*log.lock(), vec!["B1 before", "B1 after"]);
    }

    #[tokio::test]
    async fn test_run_with_substitutes_token() {
        let outer = CancellationToken::new();
        let inner = CancellationToken::new();
        inner.cancel();

        let next = Next::<bool>::new(outer.clone(), |token: CancellationToken| {
            Box::pin(async move { Ok::<_, Failure>(token.is_cancelled()) }) as BoxFuture<'static, _>
        });
        assert!(!next.cancellation().is_cancelled());
        assert!(next.run_with(inner).await.unwrap());
    }
}
