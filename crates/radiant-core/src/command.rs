//! Command abstractions and the type-routed dispatcher.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::DomainError;
use crate::publisher::EventPublisher;
use crate::store::StoredEvent;

/// Trait that all commands implement.
pub trait Command: Send + Sync + fmt::Debug + 'static {
    /// Error surfaced to the caller. Kernel errors must convert into it.
    type Error: From<DomainError> + std::error::Error + Send + Sync + 'static;

    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;
}

/// What a successfully handled command committed.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    /// The aggregate the command targeted.
    pub aggregate_id: Uuid,
    /// Events appended, in sequence order. May be empty.
    pub events: Vec<StoredEvent>,
}

/// Handles exactly one command type.
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Loads, mutates and persists. Must not publish.
    async fn handle(&self, command: &C) -> Result<CommandOutcome, C::Error>;
}

/// Routes each command to the single handler registered for its concrete
/// type, then publishes the committed events.
pub struct CommandDispatcher {
    handlers: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    publisher: Arc<dyn EventPublisher>,
}

impl fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl CommandDispatcher {
    /// Creates a dispatcher that publishes committed events to `publisher`.
    #[must_use]
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            handlers: HashMap::new(),
            publisher,
        }
    }

    /// Registers the handler for command type `C`, replacing any previous one.
    pub fn register<C, H>(&mut self, handler: H)
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let handler: Arc<dyn CommandHandler<C>> = Arc::new(handler);
        if self
            .handlers
            .insert(TypeId::of::<C>(), Box::new(handler))
            .is_some()
        {
            warn!(
                command_type = std::any::type_name::<C>(),
                "replaced existing command handler"
            );
        }
    }

    /// Returns `true` if a handler is registered for `C`.
    #[must_use]
    pub fn handles<C: Command>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<C>())
    }

    /// Dispatches a command to its handler. Events are published only after
    /// the handler returns successfully.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoHandlerFound` (converted into `C::Error`) if no
    /// handler is registered, or whatever the handler returns.
    #[instrument(skip(self, command), fields(command_type = command.command_type(), correlation_id = %command.correlation_id()))]
    pub async fn dispatch<C: Command>(&self, command: &C) -> Result<CommandOutcome, C::Error> {
        let handler = self
            .handlers
            .get(&TypeId::of::<C>())
            .and_then(|h| h.downcast_ref::<Arc<dyn CommandHandler<C>>>())
            .cloned()
            .ok_or_else(|| DomainError::NoHandlerFound(command.command_type()))?;

        let outcome = handler.handle(command).await?;
        info!(
            aggregate_id = %outcome.aggregate_id,
            events = outcome.events.len(),
            "command committed"
        );
        if !outcome.events.is_empty() {
            self.publisher.publish(&outcome.events);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};

    use super::*;

    #[derive(Default)]
    struct CapturingPublisher {
        published: Mutex<Vec<Uuid>>,
    }

    impl EventPublisher for CapturingPublisher {
        fn publish(&self, events: &[StoredEvent]) {
            self.published
                .lock()
                .unwrap()
                .extend(events.iter().map(|e| e.event_id));
        }
    }

    #[derive(Debug)]
    struct Ping {
        target: Uuid,
        fail: bool,
    }

    impl Command for Ping {
        type Error = DomainError;

        fn command_type(&self) -> &'static str {
            "test.ping"
        }

        fn correlation_id(&self) -> Uuid {
            Uuid::nil()
        }
    }

    #[derive(Debug)]
    struct Unrouted;

    impl Command for Unrouted {
        type Error = DomainError;

        fn command_type(&self) -> &'static str {
            "test.unrouted"
        }

        fn correlation_id(&self) -> Uuid {
            Uuid::nil()
        }
    }

    struct PingHandler;

    #[async_trait]
    impl CommandHandler<Ping> for PingHandler {
        async fn handle(&self, command: &Ping) -> Result<CommandOutcome, DomainError> {
            if command.fail {
                return Err(DomainError::Validation("ping refused".into()));
            }
            Ok(CommandOutcome {
                aggregate_id: command.target,
                events: vec![StoredEvent {
                    event_id: Uuid::new_v4(),
                    aggregate_id: command.target,
                    event_type: "test.pinged".to_owned(),
                    sequence_number: 1,
                    global_position: 1,
                    schema_version: 1,
                    payload: b"{}".to_vec(),
                    metadata: b"{}".to_vec(),
                    occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
                }],
            })
        }
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_handler_and_publishes() {
        // Arrange
        let publisher = Arc::new(CapturingPublisher::default());
        let mut dispatcher = CommandDispatcher::new(publisher.clone());
        dispatcher.register::<Ping, _>(PingHandler);
        let target = Uuid::new_v4();

        // Act
        let outcome = dispatcher
            .dispatch(&Ping {
                target,
                fail: false,
            })
            .await
            .unwrap();

        // Assert
        assert_eq!(outcome.aggregate_id, target);
        let published = publisher.published.lock().unwrap();
        assert_eq!(published.as_slice(), &[outcome.events[0].event_id]);
    }

    #[tokio::test]
    async fn test_dispatch_unregistered_command_is_no_handler_found() {
        let dispatcher = CommandDispatcher::new(Arc::new(crate::publisher::NoopPublisher));

        let result = dispatcher.dispatch(&Unrouted).await;

        assert!(matches!(
            result,
            Err(DomainError::NoHandlerFound("test.unrouted"))
        ));
    }

    #[tokio::test]
    async fn test_failed_command_publishes_nothing() {
        let publisher = Arc::new(CapturingPublisher::default());
        let mut dispatcher = CommandDispatcher::new(publisher.clone());
        dispatcher.register::<Ping, _>(PingHandler);

        let result = dispatcher
            .dispatch(&Ping {
                target: Uuid::new_v4(),
                fail: true,
            })
            .await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(publisher.published.lock().unwrap().is_empty());
        assert!(dispatcher.handles::<Ping>());
        assert!(!dispatcher.handles::<Unrouted>());
    }
}
