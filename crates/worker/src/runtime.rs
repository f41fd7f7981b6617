//! Worker assembly: one store, one cache manager, one reconciler.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use showbell_client::{CacheManager, FetchClient, FetchConfig, Lifecycle, MetadataClient, MetadataConfig, Network};
use showbell_core::notify::{ClickHandler, Dispatcher, NotificationPlatform};
use showbell_core::reconcile::{RecheckSchedule, Reconciler, ShowMetadataProvider};
use showbell_core::{AppConfig, Clock, EpisodeCandidate, Error, Store, SystemClock};

use crate::platform::{AuditNavigator, StoreNotifier};

/// Stands in for the metadata API when no key is configured, so every show
/// fails as a provider failure instead of the worker refusing to start.
struct UnconfiguredMetadata;

#[async_trait]
impl ShowMetadataProvider for UnconfiguredMetadata {
    async fn upcoming_episodes(&self, _show_id: i64) -> Result<Vec<EpisodeCandidate>, Error> {
        Err(Error::Provider("metadata API key not configured".into()))
    }
}

pub struct Worker {
    pub config: AppConfig,
    pub store: Store,
    pub lifecycle: Lifecycle,
    pub cache: CacheManager,
    pub dispatcher: Arc<Dispatcher>,
    pub clicks: ClickHandler,
    pub reconciler: Arc<Reconciler>,
    pub clock: Arc<dyn Clock>,
    schedule: Mutex<RecheckSchedule>,
}

impl Worker {
    pub async fn from_config(config: AppConfig) -> Result<Self, Error> {
        let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
        let metadata: Arc<dyn ShowMetadataProvider> =
            match MetadataConfig::from_app_config(&config).and_then(MetadataClient::new) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    tracing::warn!(error = %e, "show metadata unavailable, episode checks will fail per show");
                    Arc::new(UnconfiguredMetadata)
                }
            };
        let lifecycle = Lifecycle::new(&config);
        Self::assemble(config, lifecycle, network, metadata, Arc::new(SystemClock)).await
    }

    pub async fn assemble(
        config: AppConfig, lifecycle: Lifecycle, network: Arc<dyn Network>, metadata: Arc<dyn ShowMetadataProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, Error> {
        let store = lifecycle.store().await?;
        let cache = CacheManager::from_config(&config, store.clone(), network)?;

        let platform: Arc<dyn NotificationPlatform> = Arc::new(StoreNotifier::new(store.clone()));
        let dispatcher = Arc::new(Dispatcher::new(platform.clone(), config.default_icon.clone(), clock.clone()));
        let clicks = ClickHandler::new(platform, Arc::new(AuditNavigator::new(store.clone())));

        let reconciler = Arc::new(
            Reconciler::new(store.clone(), metadata, dispatcher.clone(), clock.clone())
                .with_provider_timeout(config.provider_timeout()),
        );
        let mut schedule = RecheckSchedule::new(reconciler.clone(), config.recheck_interval());
        if lifecycle.resume(&cache).await {
            schedule.start();
        }
        let schedule = Mutex::new(schedule);

        Ok(Self { config, store, lifecycle, cache, dispatcher, clicks, reconciler, clock, schedule })
    }

    /// Start (or restart) the periodic recheck.
    pub fn start_schedule(&self) {
        self.schedule.lock().unwrap_or_else(|e| e.into_inner()).start();
    }

    pub fn schedule_running(&self) -> bool {
        self.schedule.lock().unwrap_or_else(|e| e.into_inner()).is_running()
    }

    /// Stop the timer and let background refreshes finish.
    pub async fn shutdown(&self) {
        self.schedule.lock().unwrap_or_else(|e| e.into_inner()).stop();
        self.cache.drain_background().await;
        tracing::info!("worker shut down");
    }
}
