//! Worker lifecycle: install, activate, client takeover.
//!
//! The controller owns the store handle. The store is opened on first use
//! and every component gets a clone of that one handle.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use showbell_core::{AppConfig, Error, ResourceClass, Store};
use tokio::sync::{OnceCell, watch};

use crate::cache::{CacheManager, WarmReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallReport {
    pub generations: Vec<String>,
    pub precache: WarmReport,
    pub offline_image_cached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateReport {
    pub removed_generations: Vec<String>,
    pub claimed: bool,
}

pub struct Lifecycle {
    db_path: PathBuf,
    precache_urls: Vec<String>,
    store: OnceCell<Store>,
    phase: watch::Sender<Phase>,
    controlling: AtomicBool,
}

impl Lifecycle {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db_path: config.db_path.clone(),
            precache_urls: config.precache_urls.clone(),
            store: OnceCell::new(),
            phase: watch::Sender::new(Phase::Parsed),
            controlling: AtomicBool::new(false),
        }
    }

    /// Use an already open store instead of opening `db_path`.
    pub fn with_store(mut self, store: Store) -> Self {
        self.store = OnceCell::new_with(Some(store));
        self
    }

    /// The store, opened (and migrated) on first call.
    pub async fn store(&self) -> Result<Store, Error> {
        self.store
            .get_or_try_init(|| async {
                tracing::info!(path = %self.db_path.display(), "opening store");
                Store::open(&self.db_path).await
            })
            .await
            .cloned()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Whether fetches are routed through the cache.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::SeqCst)
    }

    /// Open the store and the current cache generations, then pre-cache the
    /// app shell. Safe to repeat.
    ///
    /// Pre-cache failures are reported, not raised.
    pub async fn install(&self, cache: &CacheManager) -> Result<InstallReport, Error> {
        self.phase.send_replace(Phase::Installing);

        if let Err(e) = self.store().await {
            self.phase.send_replace(Phase::Parsed);
            return Err(e);
        }
        let generations = match cache.open_generations().await {
            Ok(names) => names,
            Err(e) => {
                self.phase.send_replace(Phase::Parsed);
                return Err(e);
            }
        };

        let precache = cache.warm(&self.precache_urls, ResourceClass::Static).await;
        let offline_image_cached = match cache.offline_image() {
            Some(url) => cache.warm(&[url.to_string()], ResourceClass::Image).await.cached == 1,
            None => false,
        };

        self.phase.send_replace(Phase::Installed);
        tracing::info!(
            generations = generations.len(),
            precached = precache.cached,
            precache_failures = precache.failed.len(),
            "installed"
        );
        Ok(InstallReport { generations, precache, offline_image_cached })
    }

    /// Drop every generation that is not current, then take control.
    ///
    /// Cleanup failures are logged and never block activation.
    pub async fn activate(&self, cache: &CacheManager) -> ActivateReport {
        self.phase.send_replace(Phase::Activating);

        let current = cache.generations();
        let mut removed = Vec::new();
        match self.store().await {
            Ok(store) => match store.list_generations().await {
                Ok(open) => {
                    for name in open.into_iter().filter(|n| !current.contains(n)) {
                        match store.delete_generation(&name).await {
                            Ok(responses) => {
                                tracing::info!(generation = %name, responses, "removed stale cache generation");
                                removed.push(name);
                            }
                            Err(e) => tracing::warn!(generation = %name, error = %e, "failed to remove generation"),
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to list cache generations"),
            },
            Err(e) => tracing::warn!(error = %e, "store unavailable during activation"),
        }

        if let Ok(store) = self.store().await
            && let Err(e) = store.set_activated_version(cache.version()).await
        {
            tracing::warn!(error = %e, "failed to persist activation, a restart will wait for activate");
        }

        self.controlling.store(true, Ordering::SeqCst);
        self.phase.send_replace(Phase::Activated);
        tracing::info!(removed = removed.len(), "activated and claimed clients");

        ActivateReport { removed_generations: removed, claimed: true }
    }

    /// Take control again after a restart when this cache version has
    /// already activated. Activate fires once per version, not per process.
    ///
    /// Returns whether the worker is controlling. A store error leaves it
    /// waiting for the next activate.
    pub async fn resume(&self, cache: &CacheManager) -> bool {
        let store = match self.store().await {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(error = %e, "store unavailable, cannot resume control");
                return false;
            }
        };

        match store.activated_version().await {
            Ok(Some(version)) if version == cache.version() => {
                self.controlling.store(true, Ordering::SeqCst);
                self.phase.send_replace(Phase::Activated);
                tracing::info!(version = %version, "resumed control from earlier activation");
                true
            }
            Ok(previous) => {
                tracing::debug!(previous = ?previous, current = cache.version(), "not activated for this version yet");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read activation state");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::{FakeNetwork, POSTER, STYLE};
    use std::sync::Arc;

    async fn setup(config: AppConfig) -> (Lifecycle, CacheManager, Arc<FakeNetwork>, Store) {
        let store = Store::open_in_memory().await.unwrap();
        let network = Arc::new(FakeNetwork::default());
        let cache = CacheManager::from_config(&config, store.clone(), network.clone()).unwrap();
        let lifecycle = Lifecycle::new(&config).with_store(store.clone());
        (lifecycle, cache, network, store)
    }

    #[tokio::test]
    async fn test_install_opens_generations_and_precaches() {
        let config = AppConfig {
            precache_urls: vec!["/_next/static/app.css".into(), "/missing.js".into()],
            offline_image_url: Some("/offline.png".into()),
            ..Default::default()
        };
        let (lifecycle, cache, network, store) = setup(config).await;
        network.serve(STYLE, 200, "text/css", b"css");
        network.serve("http://localhost:3000/offline.png", 200, "image/png", b"art");

        let report = lifecycle.install(&cache).await.unwrap();

        assert_eq!(lifecycle.phase(), Phase::Installed);
        assert!(!lifecycle.is_controlling());
        assert_eq!(report.generations.len(), 3);
        assert_eq!(report.precache.cached, 1);
        assert_eq!(report.precache.failed, vec!["/missing.js".to_string()]);
        assert!(report.offline_image_cached);
        assert_eq!(store.count_responses().await.unwrap(), 2);

        // repeated install is harmless
        lifecycle.install(&cache).await.unwrap();
        assert_eq!(store.list_generations().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_activate_drops_stale_generations() {
        let (lifecycle, cache, network, store) = setup(AppConfig::default()).await;
        network.serve(POSTER, 200, "image/jpeg", b"old");

        let old_config = AppConfig { cache_version: "v0".into(), ..Default::default() };
        let old = CacheManager::from_config(&old_config, store.clone(), network.clone()).unwrap();
        old.open_generations().await.unwrap();
        old.handle(&crate::fetch::ResourceRequest::get(reqwest::Url::parse(POSTER).unwrap())).await;
        assert_eq!(store.count_responses().await.unwrap(), 1);

        lifecycle.install(&cache).await.unwrap();
        let report = lifecycle.activate(&cache).await;

        assert!(report.claimed);
        assert_eq!(report.removed_generations.len(), 3);
        assert!(report.removed_generations.iter().all(|g| g.ends_with("-v0")));
        assert_eq!(store.count_responses().await.unwrap(), 0);
        let mut open = store.list_generations().await.unwrap();
        let mut current = cache.generations();
        open.sort();
        current.sort();
        assert_eq!(open, current);
        assert_eq!(lifecycle.phase(), Phase::Activated);
        assert!(lifecycle.is_controlling());
    }

    #[tokio::test]
    async fn test_phase_changes_are_observable() {
        let (lifecycle, cache, _, _) = setup(AppConfig::default()).await;
        let mut rx = lifecycle.subscribe();

        lifecycle.install(&cache).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Phase::Installed);
    }

    #[tokio::test]
    async fn test_resume_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig { db_path: dir.path().join("store.sqlite"), ..Default::default() };
        let network = Arc::new(FakeNetwork::default());

        {
            let lifecycle = Lifecycle::new(&config);
            let store = lifecycle.store().await.unwrap();
            let cache = CacheManager::from_config(&config, store, network.clone()).unwrap();
            assert!(!lifecycle.resume(&cache).await);
            lifecycle.install(&cache).await.unwrap();
            lifecycle.activate(&cache).await;
        }

        let lifecycle = Lifecycle::new(&config);
        let store = lifecycle.store().await.unwrap();
        let cache = CacheManager::from_config(&config, store.clone(), network.clone()).unwrap();
        assert!(lifecycle.resume(&cache).await);
        assert!(lifecycle.is_controlling());
        assert_eq!(lifecycle.phase(), Phase::Activated);

        let next = AppConfig { cache_version: "v2".into(), ..config.clone() };
        let lifecycle = Lifecycle::new(&next).with_store(store.clone());
        let cache = CacheManager::from_config(&next, store, network).unwrap();
        assert!(!lifecycle.resume(&cache).await);
        assert!(!lifecycle.is_controlling());
    }

    #[tokio::test]
    async fn test_store_opens_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig { db_path: dir.path().join("store.sqlite"), ..Default::default() };
        let lifecycle = Lifecycle::new(&config);

        let a = lifecycle.store().await.unwrap();
        a.put_settings(&Default::default()).await.unwrap();
        let b = lifecycle.store().await.unwrap();
        assert!(b.get_settings().await.unwrap().is_some());
    }
}
