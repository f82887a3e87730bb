mod common;

use async_trait::async_trait;
use common::*;
use mediator_core::failure::Failure;
use mediator_core::handlers::NotificationHandler;
use mediator_core::logging::init_structured_logging;
use mediator_core::{HandlerRegistry, Mediator};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct Refusing;

#[async_trait]
impl NotificationHandler<Pinged> for Refusing {
    async fn handle(&self, _n: &Pinged, _c: &CancellationToken) -> Result<(), Failure> {
        Err(PingException("refused".to_string()).into())
    }
}

#[tokio::test]
async fn test_publish_records_dispatch_operations() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let registry = HandlerRegistry::new();
    registry.add_notification_handler::<Pinged, _>(Refusing);
    let mediator = Mediator::new(registry.into_provider());

    let result = mediator
        .publish(
            Pinged {
                message: "Ping".to_string(),
            },
            &CancellationToken::new(),
        )
        .await;

    assert!(result.is_err());
    let output = captured.text();
    assert!(output.contains("DISPATCH_OPERATION"));
    assert!(output.contains("status=started"));
    assert!(output.contains("status=failed"));
    assert!(output.contains("ping failed: refused"));
}

#[test]
fn test_init_is_idempotent() {
    init_structured_logging();
    init_structured_logging();
    tracing::info!("logging initialized twice");
}
