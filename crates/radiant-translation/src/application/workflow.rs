//! The translation workflow.
//!
//! A committed `translation.requested` event is picked up by
//! [`TranslationRequestedSubscriber`], which hands it to the bounded worker
//! pool. The job calls the provider and records exactly one terminal event
//! through the dispatcher. Failures end up on the session; nothing is
//! reported back to the original requester.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use radiant_core::command::CommandDispatcher;
use radiant_core::error::DomainError;
use radiant_core::event::DomainEvent;
use radiant_core::store::StoredEvent;
use radiant_eventing::{EventFilter, EventSubscriber, PoolError, WorkerPool};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::commands::{CompleteTranslation, FailTranslation};
use crate::domain::events::{
    TRANSLATION_REQUESTED_EVENT_TYPE, TranslationEvent, TranslationRequested,
};
use crate::domain::model::TranslationStatus;
use crate::error::{TranslationError, TranslationErrorKind};
use crate::provider::{ProviderRequest, TranslationProvider, translate_within};

/// A requested translation waiting to run.
#[derive(Debug, Clone)]
pub struct TranslationJob {
    /// The `translation.requested` event.
    pub cause_event_id: Uuid,
    /// Correlation ID of the request.
    pub correlation_id: Uuid,
    /// The requesting user.
    pub user_id: Option<String>,
    /// The request itself.
    pub requested: TranslationRequested,
}

impl TranslationJob {
    /// Builds a job from a stored `translation.requested` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Codec` if the event cannot be decoded or is not
    /// a request.
    pub fn from_stored(event: &StoredEvent) -> Result<Self, DomainError> {
        let envelope = TranslationEvent::codec().decode(event)?;
        let TranslationEvent::Requested(requested) = envelope.payload else {
            return Err(DomainError::Codec(format!(
                "expected {TRANSLATION_REQUESTED_EVENT_TYPE}, got {}",
                event.event_type
            )));
        };
        Ok(Self {
            cause_event_id: envelope.event_id,
            correlation_id: envelope.metadata.correlation_id.unwrap_or(envelope.event_id),
            user_id: envelope.metadata.user_id,
            requested,
        })
    }

    fn session_id(&self) -> Uuid {
        self.requested.session_id
    }
}

/// Calls the provider and records the terminal outcome.
pub struct TranslationWorkflow {
    provider: Arc<dyn TranslationProvider>,
    dispatcher: Arc<CommandDispatcher>,
    provider_timeout: Duration,
}

impl TranslationWorkflow {
    /// Creates a workflow that records outcomes through `dispatcher`.
    #[must_use]
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        dispatcher: Arc<CommandDispatcher>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            provider_timeout,
        }
    }

    /// Runs one job to a terminal state. Returns the status recorded, or
    /// `None` if no terminal event could be recorded (already logged).
    #[instrument(skip_all, fields(session_id = %job.session_id()))]
    pub async fn process(&self, job: &TranslationJob) -> Option<TranslationStatus> {
        info!("translating session");
        let request = ProviderRequest {
            session_id: job.session_id(),
            source_language: job.requested.source_language.code,
            target_language: job.requested.target_language,
            source_text: job.requested.source_text.clone(),
            preserve_formatting: job.requested.preserve_formatting,
        };

        let translation =
            match translate_within(self.provider.as_ref(), &request, self.provider_timeout).await {
                Ok(translation) => translation,
                Err(e) => {
                    warn!(code = e.code(), error = %e, "translation provider failure");
                    return self.record_failure(job, e.kind(), &e.to_string()).await;
                }
            };

        let command = CompleteTranslation {
            correlation_id: job.correlation_id,
            causation_id: job.cause_event_id,
            user_id: job.user_id.clone(),
            session_id: job.session_id(),
            translated_text: translation.translated_text,
            sentence_pairs: translation.sentence_pairs,
            metadata: translation.metadata,
        };
        match self.dispatcher.dispatch(&command).await {
            Ok(_) => Some(TranslationStatus::Completed),
            Err(e @ TranslationError::InvalidStateTransition { .. }) => {
                error!(error = %e, "translation outcome discarded");
                None
            }
            Err(e) => {
                warn!(code = e.code(), error = %e, "could not record translation result");
                self.record_failure(job, e.kind(), &e.to_string()).await
            }
        }
    }

    /// Records a `FAILED` outcome for `job`.
    pub async fn record_failure(
        &self,
        job: &TranslationJob,
        kind: TranslationErrorKind,
        message: &str,
    ) -> Option<TranslationStatus> {
        let command = FailTranslation {
            correlation_id: job.correlation_id,
            causation_id: job.cause_event_id,
            user_id: job.user_id.clone(),
            session_id: job.session_id(),
            kind,
            message: message.to_owned(),
        };
        match self.dispatcher.dispatch(&command).await {
            Ok(_) => Some(TranslationStatus::Failed),
            Err(e) => {
                error!(
                    session_id = %job.session_id(),
                    code = kind.code(),
                    error = %e,
                    "could not record translation failure"
                );
                None
            }
        }
    }
}

/// Feeds committed translation requests to the worker pool.
pub struct TranslationRequestedSubscriber {
    workflow: Arc<TranslationWorkflow>,
    pool: Arc<WorkerPool>,
}

impl TranslationRequestedSubscriber {
    /// Creates the subscriber.
    #[must_use]
    pub fn new(workflow: Arc<TranslationWorkflow>, pool: Arc<WorkerPool>) -> Self {
        Self { workflow, pool }
    }
}

#[async_trait]
impl EventSubscriber for TranslationRequestedSubscriber {
    fn name(&self) -> &str {
        "translation-workflow"
    }

    fn filter(&self) -> EventFilter {
        EventFilter::One(TRANSLATION_REQUESTED_EVENT_TYPE)
    }

    async fn handle(&self, event: &StoredEvent) -> Result<(), DomainError> {
        let job = TranslationJob::from_stored(event)?;
        info!(session_id = %job.session_id(), "scheduling translation");

        let workflow = Arc::clone(&self.workflow);
        let queued = job.clone();
        let submitted = self
            .pool
            .submit(async move {
                workflow.process(&queued).await;
            })
            .await;

        match submitted {
            Ok(submission) => {
                debug!(session_id = %job.session_id(), ?submission, "translation scheduled");
                Ok(())
            }
            Err(PoolError::Saturated) => {
                self.workflow
                    .record_failure(
                        &job,
                        TranslationErrorKind::ThreadPoolExhausted,
                        TranslationErrorKind::ThreadPoolExhausted.default_message(),
                    )
                    .await;
                Ok(())
            }
            Err(PoolError::ShutDown) => {
                warn!(session_id = %job.session_id(), "translation arrived after pool shutdown");
                self.workflow
                    .record_failure(
                        &job,
                        TranslationErrorKind::ThreadPoolExhausted,
                        "Translation executor is shut down",
                    )
                    .await;
                Ok(())
            }
        }
    }
}
