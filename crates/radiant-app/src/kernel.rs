//! Composition root: wires stores, handlers, delivery, projections and the
//! translation workflow into one running kernel.

use std::sync::Arc;

use radiant_core::clock::Clock;
use radiant_core::command::{Command, CommandDispatcher, CommandOutcome};
use radiant_core::error::DomainError;
use radiant_core::store::EventStore;
use radiant_eventing::{
    CatchUpReport, DeliveryHandle, EventBus, ProjectionEngine, ProjectionSubscriber,
    ShutdownReport, WorkerPool,
};
use radiant_post::application::command_handlers::register_post_handlers;
use radiant_post::application::summary_projection::PostSummaryProjection;
use radiant_translation::application::command_handlers::register_translation_handlers;
use radiant_translation::application::query_handlers::{
    TranslationSessionView, get_translation_session,
};
use radiant_translation::application::session_projection::TranslationSessionProjection;
use radiant_translation::application::workflow::{
    TranslationRequestedSubscriber, TranslationWorkflow,
};
use radiant_translation::domain::commands::RequestTranslation;
use radiant_translation::error::TranslationError;
use radiant_translation::provider::TranslationProvider;
use radiant_trending::{InMemoryTrendingStore, TrendingPost, TrendingProjection, TrendingQuery};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::KernelConfig;
use crate::subscribers::TranslatedPostPublisher;

/// The running kernel.
pub struct Kernel {
    store: Arc<dyn EventStore>,
    dispatcher: Arc<CommandDispatcher>,
    engine: Arc<ProjectionEngine>,
    posts: Arc<PostSummaryProjection>,
    sessions: Arc<TranslationSessionProjection>,
    trending: TrendingQuery,
    pool: Arc<WorkerPool>,
    delivery: DeliveryHandle,
    catch_up: CancellationToken,
    catch_up_task: JoinHandle<()>,
}

impl Kernel {
    /// Wires every component and starts delivery, the translation pool and
    /// the projection catch-up loop. Projections start empty; call
    /// [`rebuild_projections`](Self::rebuild_projections) to load history.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(
        config: &KernelConfig,
        store: Arc<dyn EventStore>,
        provider: Arc<dyn TranslationProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut bus = EventBus::new();

        let mut dispatcher = CommandDispatcher::new(Arc::new(bus.publisher()));
        register_post_handlers(&mut dispatcher, Arc::clone(&clock), Arc::clone(&store));
        register_translation_handlers(&mut dispatcher, Arc::clone(&clock), Arc::clone(&store));
        let dispatcher = Arc::new(dispatcher);

        let posts = Arc::new(PostSummaryProjection::new());
        let sessions = Arc::new(TranslationSessionProjection::new());
        let trending_store = Arc::new(InMemoryTrendingStore::new());
        let trending_projection = Arc::new(TrendingProjection::new(trending_store.clone()));
        let engine = Arc::new(
            ProjectionEngine::new(Arc::clone(&store))
                .with_projection(posts.clone())
                .with_projection(sessions.clone())
                .with_projection(trending_projection.clone()),
        );

        let pool = Arc::new(WorkerPool::new(config.translation_pool.clone()));
        let workflow = Arc::new(TranslationWorkflow::new(
            provider,
            Arc::clone(&dispatcher),
            config.provider_timeout,
        ));

        bus.subscribe(Arc::new(ProjectionSubscriber::new(posts.clone())));
        bus.subscribe(Arc::new(ProjectionSubscriber::new(sessions.clone())));
        bus.subscribe(Arc::new(ProjectionSubscriber::new(trending_projection)));
        bus.subscribe(Arc::new(TranslationRequestedSubscriber::new(
            workflow,
            Arc::clone(&pool),
        )));
        bus.subscribe(Arc::new(TranslatedPostPublisher::new(
            Arc::clone(&dispatcher),
            Arc::clone(&store),
        )));
        let delivery = bus.start();

        let catch_up = CancellationToken::new();
        let catch_up_task =
            Arc::clone(&engine).spawn_catch_up(config.catch_up_interval, catch_up.clone());

        info!("kernel started");
        Self {
            trending: TrendingQuery::new(trending_store, clock, config.trending),
            store,
            dispatcher,
            engine,
            posts,
            sessions,
            pool,
            delivery,
            catch_up,
            catch_up_task,
        }
    }

    /// Opens a translation session and returns its id without waiting for
    /// the translation.
    ///
    /// # Errors
    ///
    /// Returns `TranslationError::InvalidInput` or
    /// `TranslationError::TextTooLong` before anything is stored, or a
    /// `Domain` error from the store.
    pub async fn request_translation(
        &self,
        command: &RequestTranslation,
    ) -> Result<Uuid, TranslationError> {
        let outcome = self.dispatcher.dispatch(command).await?;
        Ok(outcome.aggregate_id)
    }

    /// Current status of a translation session, read from its stream.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` for an unknown session.
    pub async fn get_translation_session(
        &self,
        session_id: Uuid,
    ) -> Result<TranslationSessionView, DomainError> {
        get_translation_session(session_id, self.store.as_ref()).await
    }

    /// Top trending posts, `limit` clamped to `1..=50`.
    ///
    /// # Errors
    ///
    /// Returns a `DomainError` if the trending store fails.
    pub async fn find_trending_posts(
        &self,
        limit: usize,
    ) -> Result<Vec<TrendingPost>, DomainError> {
        self.trending.find_trending_posts(limit).await
    }

    /// Dispatches any registered command.
    ///
    /// # Errors
    ///
    /// Returns whatever the command's handler returns.
    pub async fn dispatch<C: Command>(&self, command: &C) -> Result<CommandOutcome, C::Error> {
        self.dispatcher.dispatch(command).await
    }

    /// The post summary read model.
    #[must_use]
    pub fn posts(&self) -> &PostSummaryProjection {
        &self.posts
    }

    /// The translation session read model.
    #[must_use]
    pub fn translation_sessions(&self) -> &TranslationSessionProjection {
        &self.sessions
    }

    /// Resets every read model and replays the full log.
    ///
    /// # Errors
    ///
    /// Returns a `DomainError` if the log cannot be read.
    pub async fn rebuild_projections(&self) -> Result<CatchUpReport, DomainError> {
        let report = self.engine.rebuild_all().await?;
        self.trending.invalidate();
        Ok(report)
    }

    /// Replays the log tail past the engine's watermark.
    ///
    /// # Errors
    ///
    /// Returns a `DomainError` if the log cannot be read.
    pub async fn catch_up_projections(&self) -> Result<CatchUpReport, DomainError> {
        self.engine.catch_up().await
    }

    /// Waits until every published event has been handled by its
    /// subscribers. Translation jobs already handed to the pool may still
    /// be running.
    pub async fn wait_idle(&self) {
        self.delivery.wait_idle().await;
    }

    /// Delivers every pending request to the translation pool, drains the
    /// pool within its grace period, delivers what it published, then stops
    /// delivery and the catch-up loop.
    #[instrument(skip_all)]
    pub async fn shutdown(self) -> ShutdownReport {
        // Only callers create requests, and `self` is consumed, so after the
        // first idle point nothing new reaches the pool.
        self.delivery.wait_idle().await;
        let report = self.pool.shutdown().await;
        self.delivery.wait_idle().await;
        self.delivery.shutdown();
        self.delivery.join().await;

        self.catch_up.cancel();
        if let Err(e) = self.catch_up_task.await {
            error!(error = %e, "projection catch-up loop ended abnormally");
        }
        info!(
            drained = report.drained,
            aborted = report.aborted,
            "kernel stopped"
        );
        report
    }
}
