//! Pre- and post-processor behaviors: run every registered
//! [`RequestPreProcessor`] before the rest of the chain and every
//! [`RequestPostProcessor`] after it succeeded, in registration order.

use super::composer::{Next, PipelineBehavior};
use crate::error::MediatorError;
use crate::failure::Failure;
use crate::handlers::{RequestPostProcessor, RequestPreProcessor};
use crate::registry::{ContractKey, ServiceProvider};
use async_trait::async_trait;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

pub struct PreProcessorBehavior<M, R> {
    provider: ServiceProvider,
    _contract: PhantomData<fn(&M) -> R>,
}

impl<M, R> PreProcessorBehavior<M, R> {
    pub fn new(provider: ServiceProvider) -> Self {
        Self {
            provider,
            _contract: PhantomData,
        }
    }
}

#[async_trait]
impl<M, R> PipelineBehavior<M, R> for PreProcessorBehavior<M, R>
where
    M: Send + Sync + 'static,
    R: Send + 'static,
{
    async fn handle(
        &self,
        request: &M,
        next: Next<'_, R>,
        cancellation: &CancellationToken,
    ) -> Result<R, Failure> {
        let processors = self
            .provider
            .get_all::<dyn RequestPreProcessor<M>>(&ContractKey::pre_processor::<M>())
            .map_err(MediatorError::into_failure)?;
        for processor in &processors {
            processor.instance().process(request, cancellation).await?;
        }
        next.run().await
    }
}

pub struct PostProcessorBehavior<M, R> {
    provider: ServiceProvider,
    _contract: PhantomData<fn(&M) -> R>,
}

impl<M, R> PostProcessorBehavior<M, R> {
    pub fn new(provider: ServiceProvider) -> Self {
        Self {
            provider,
            _contract: PhantomData,
        }
    }
}

#[async_trait]
impl<M, R> PipelineBehavior<M, R> for PostProcessorBehavior<M, R>
where
    M: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    async fn handle(
        &self,
        request: &M,
        next: Next<'_, R>,
        cancellation: &CancellationToken,
    ) -> Result<R, Failure> {
        let response = next.run().await?;
        let processors = self
            .provider
            .get_all::<dyn RequestPostProcessor<M, R>>(&ContractKey::post_processor::<M, R>())
            .map_err(MediatorError::into_failure)?;
        for processor in &processors {
            processor
                .instance()
                .process(request, &response, cancellation)
                .await?;
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::composer::PipelineComposer;
    use crate::registry::HandlerRegistry;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Ping;

    struct Trace(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl RequestPreProcessor<Ping> for Trace {
        async fn process(&self, _request: &Ping, _c: &CancellationToken) -> Result<(), Failure> {
            self.0.lock().push("pre".to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl RequestPostProcessor<Ping, String> for Trace {
        async fn process(
            &self,
            _request: &Ping,
            response: &String,
            _c: &CancellationToken,
        ) -> Result<(), Failure> {
            self.0.lock().push(format!("post {response}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_processors_run_around_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = HandlerRegistry::new();
        registry
            .add_pre_processor::<Ping, _>(Trace(Arc::clone(&log)))
            .add_post_processor::<Ping, String, _>(Trace(Arc::clone(&log)))
            .add_processor_behaviors::<Ping, String>();
        let provider = registry.into_provider();
        let behaviors: Vec<Arc<dyn PipelineBehavior<Ping, String>>> = provider
            .get_all::<dyn PipelineBehavior<Ping, String>>(
                &ContractKey::pipeline_behavior::<Ping, String>(),
            )
            .unwrap()
            .into_iter()
            .map(|behavior| behavior.into_instance())
            .collect();

        let terminal_log = Arc::clone(&log);
        let token = CancellationToken::new();
        let response = PipelineComposer::compose(&Ping, &behaviors, &token, move |_| {
            Box::pin(async move {
                terminal_log.lock().push("handler".to_string());
                Ok("Pong".to_string())
            })
        })
        .run()
        .await
        .unwrap();

        assert_eq!(response, "Pong");
        assert_eq!(*log.lock(), vec!["pre", "handler", "post Pong"]);
    }
}
