//! Cache manager: serves intercepted requests under per-class policies.
//!
//! ### Policies
//!
//! - **stale-while-revalidate** (images): a hit is returned at once and
//!   refreshed in the background; a miss goes to the network; total failure
//!   serves the cached offline image, else a synthetic 404.
//! - **network-first** (API): the network answers when it can; otherwise the
//!   last cached copy, else a synthetic 503.
//! - **cache-first** (static assets): a hit is returned at once, and scripts
//!   are refreshed in the background; a miss goes to the network, else a
//!   synthetic 404.
//!
//! `handle` never fails. Every path ends in a [`CacheResponse`].

pub mod response;
pub mod route;

pub use response::{CacheResponse, ResponseSource};
pub use route::{Matcher, Policy, Route, RouteTable};

use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;
use showbell_core::store::hash::compute_request_key;
use showbell_core::store::timestamp;
use showbell_core::{AppConfig, CachedResponse, Error, ResourceClass, Store};
use tokio_util::task::TaskTracker;

use crate::fetch::{FetchResponse, Network, ResourceRequest, canonicalize};

/// Outcome of pre-warming a list of URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmReport {
    pub requested: usize,
    pub cached: usize,
    pub failed: Vec<String>,
}

#[derive(Clone)]
pub struct CacheManager {
    store: Store,
    network: Arc<dyn Network>,
    routes: Arc<RouteTable>,
    version: Arc<str>,
    origin: Url,
    offline_image: Option<Url>,
    background: TaskTracker,
}

impl CacheManager {
    pub fn new(
        store: Store, network: Arc<dyn Network>, routes: RouteTable, version: impl Into<String>, origin: Url,
    ) -> Self {
        Self {
            store,
            network,
            routes: Arc::new(routes),
            version: Arc::from(version.into()),
            origin,
            offline_image: None,
            background: TaskTracker::new(),
        }
    }

    pub fn from_config(config: &AppConfig, store: Store, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = Url::parse(&config.app_origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let routes = RouteTable::from_config(config)?;
        let mut manager = Self::new(store, network, routes, config.cache_version.clone(), origin);
        if let Some(raw) = config.offline_image_url.as_deref() {
            let url = canonicalize(raw, Some(&manager.origin))?;
            manager = manager.with_offline_image(url);
        }
        Ok(manager)
    }

    pub fn with_offline_image(mut self, url: Url) -> Self {
        self.offline_image = Some(url);
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn offline_image(&self) -> Option<&Url> {
        self.offline_image.as_ref()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Generation names for the current version, one per class.
    pub fn generations(&self) -> Vec<String> {
        ResourceClass::ALL.iter().map(|c| c.generation(&self.version)).collect()
    }

    /// Open every current generation. Idempotent.
    pub async fn open_generations(&self) -> Result<Vec<String>, Error> {
        let names = self.generations();
        for name in &names {
            if self.store.open_generation(name).await? {
                tracing::info!(generation = %name, "opened cache generation");
            }
        }
        Ok(names)
    }

    /// Serve an intercepted request.
    pub async fn handle(&self, request: &ResourceRequest) -> CacheResponse {
        let route = self.routes.classify(request);
        let policy = route.map_or(Policy::Bypass, |r| r.policy);
        tracing::debug!(request = %request, route = route.map_or("none", |r| r.name), ?policy, "classified");

        let key = compute_request_key(&request.method, request.url.as_str());
        match policy {
            Policy::Bypass => self.passthrough(request).await,
            Policy::StaleWhileRevalidate(class) => self.stale_while_revalidate(request, class, &key).await,
            Policy::NetworkFirst(class) => self.network_first(request, class, &key).await,
            Policy::CacheFirst(class) => self.cache_first(request, class, &key).await,
        }
    }

    /// Send the request to the network without touching the cache.
    pub async fn passthrough(&self, request: &ResourceRequest) -> CacheResponse {
        match self.network.fetch(request).await {
            Ok(response) => CacheResponse::from_network(response),
            Err(e) => {
                tracing::warn!(request = %request, error = %e, "network failed for uncached request");
                CacheResponse::service_unavailable()
            }
        }
    }

    async fn stale_while_revalidate(&self, request: &ResourceRequest, class: ResourceClass, key: &str) -> CacheResponse {
        if let Some(hit) = self.lookup(key, class).await {
            tracing::debug!(request = %request, "cache hit, revalidating");
            self.spawn_refresh(request.clone(), class, key.to_string());
            return CacheResponse::from_cached(hit, ResponseSource::Cache);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_if_ok(request, class, key, &response).await;
                CacheResponse::from_network(response)
            }
            Err(e) => {
                tracing::warn!(request = %request, error = %e, "image unreachable and not cached");
                match self.offline_placeholder().await {
                    Some(placeholder) => placeholder,
                    None => CacheResponse::not_found(),
                }
            }
        }
    }

    async fn network_first(&self, request: &ResourceRequest, class: ResourceClass, key: &str) -> CacheResponse {
        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_if_ok(request, class, key, &response).await;
                CacheResponse::from_network(response)
            }
            Err(e) => match self.lookup(key, class).await {
                Some(hit) => {
                    tracing::info!(request = %request, error = %e, "network failed, serving cached copy");
                    CacheResponse::from_cached(hit, ResponseSource::Cache)
                }
                None => {
                    tracing::warn!(request = %request, error = %e, "network failed and nothing cached");
                    CacheResponse::service_unavailable()
                }
            },
        }
    }

    async fn cache_first(&self, request: &ResourceRequest, class: ResourceClass, key: &str) -> CacheResponse {
        if let Some(hit) = self.lookup(key, class).await {
            tracing::debug!(request = %request, "cache hit");
            if request.is_script() {
                self.spawn_refresh(request.clone(), class, key.to_string());
            }
            return CacheResponse::from_cached(hit, ResponseSource::Cache);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_if_ok(request, class, key, &response).await;
                CacheResponse::from_network(response)
            }
            Err(e) => {
                tracing::warn!(request = %request, error = %e, "static asset unreachable and not cached");
                CacheResponse::not_found()
            }
        }
    }

    /// A cached entry in the current generation of `class`.
    ///
    /// Store errors read as a miss.
    async fn lookup(&self, key: &str, class: ResourceClass) -> Option<CachedResponse> {
        match self.store.get_response(key).await {
            Ok(Some(hit)) if hit.generation == class.generation(&self.version) => Some(hit),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Overwrite the entry for `key` when the response is 2xx.
    async fn store_if_ok(
        &self, request: &ResourceRequest, class: ResourceClass, key: &str, response: &FetchResponse,
    ) -> bool {
        if !response.status.is_success() {
            tracing::debug!(request = %request, status = response.status.as_u16(), "not caching non-2xx response");
            return false;
        }

        let entry = CachedResponse {
            request_key: key.to_string(),
            generation: class.generation(&self.version),
            url: request.url.to_string(),
            method: request.method.clone(),
            resource_class: class,
            status: response.status.as_u16(),
            content_type: response.content_type.clone(),
            body: response.bytes.to_vec(),
            stored_at: timestamp(chrono::Utc::now()),
        };
        match self.store.put_response(&entry).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(request = %request, error = %e, "cache write failed");
                false
            }
        }
    }

    /// Refresh an entry without making anyone wait for it.
    fn spawn_refresh(&self, request: ResourceRequest, class: ResourceClass, key: String) {
        let this = self.clone();
        self.background.spawn(async move {
            match this.network.fetch(&request).await {
                Ok(response) => {
                    if this.store_if_ok(&request, class, &key, &response).await {
                        tracing::debug!(request = %request, "background refresh stored");
                    }
                }
                Err(e) => tracing::debug!(request = %request, error = %e, "background refresh failed"),
            }
        });
    }

    async fn offline_placeholder(&self) -> Option<CacheResponse> {
        let url = self.offline_image.as_ref()?;
        let key = compute_request_key("GET", url.as_str());
        self.lookup(&key, ResourceClass::Image)
            .await
            .map(|hit| CacheResponse::from_cached(hit, ResponseSource::Placeholder))
    }

    /// Fetch each URL now and cache it under `class`.
    ///
    /// Relative URLs resolve against the app origin. Per-URL failures are
    /// reported, never raised.
    pub async fn warm(&self, urls: &[String], class: ResourceClass) -> WarmReport {
        let mut report = WarmReport { requested: urls.len(), ..Default::default() };

        for raw in urls {
            let url = match canonicalize(raw, Some(&self.origin)) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(url = %raw, error = %e, "skipping invalid URL");
                    report.failed.push(raw.clone());
                    continue;
                }
            };
            let request = ResourceRequest::get(url);
            let key = compute_request_key(&request.method, request.url.as_str());

            let stored = match self.network.fetch(&request).await {
                Ok(response) => self.store_if_ok(&request, class, &key, &response).await,
                Err(e) => {
                    tracing::warn!(request = %request, error = %e, "pre-cache fetch failed");
                    false
                }
            };
            if stored {
                report.cached += 1;
            } else {
                report.failed.push(raw.clone());
            }
        }

        tracing::info!(class = %class, requested = report.requested, cached = report.cached, "warmed cache");
        report
    }

    /// Pre-warm image URLs.
    pub async fn cache_urls(&self, urls: &[String]) -> WarmReport {
        self.warm(urls, ResourceClass::Image).await
    }

    /// Delete every cached response. Generations stay open.
    pub async fn clear(&self) -> Result<u64, Error> {
        let deleted = self.store.clear_responses().await?;
        tracing::info!(deleted, "cache cleared");
        Ok(deleted)
    }

    /// Number of cached responses.
    pub async fn size(&self) -> Result<u64, Error> {
        self.store.count_responses().await
    }

    /// Wait for every in-flight background refresh.
    pub async fn drain_background(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }
}
