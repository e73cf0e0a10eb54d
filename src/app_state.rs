use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::api::{JobApi, VizzleClient};
use crate::services::auth::{AuthGateway, RedirectAuthResolver, ResolverSettings};
use crate::services::cache::{AttemptSlot, KeyValueCache, MemoryCache, SessionCache};
use crate::services::history::{HistoryStore, MemoryHistoryStore};
use crate::services::images::ImageFetcher;
use crate::services::profiles::{MemoryProfileStore, ProfileStore};
use crate::services::tryon::{PollSettings, TryOnOrchestrator};

/// Shared service bundle built once per client session.
pub struct AppState {
    pub config: AppConfig,
    pub api: Arc<dyn JobApi>,
    pub profiles: Arc<dyn ProfileStore>,
    pub history: Arc<dyn HistoryStore>,
    pub cache: Arc<dyn KeyValueCache>,
}

impl AppState {
    /// Wire the real API client, with in-memory stores for the seams the
    /// embedding app has not bound to a backend.
    pub fn from_config(config: AppConfig) -> Self {
        let api: Arc<dyn JobApi> = Arc::new(VizzleClient::new(&config.api_base_url, &config.api_token));
        let cache: Arc<dyn KeyValueCache> = match config.cache_capacity_bytes {
            Some(capacity) => Arc::new(MemoryCache::with_capacity(capacity)),
            None => Arc::new(MemoryCache::new()),
        };
        Self {
            api,
            profiles: Arc::new(MemoryProfileStore::new()),
            history: Arc::new(MemoryHistoryStore::new()),
            cache,
            config,
        }
    }

    pub fn new(
        config: AppConfig,
        api: Arc<dyn JobApi>,
        profiles: Arc<dyn ProfileStore>,
        history: Arc<dyn HistoryStore>,
        cache: Arc<dyn KeyValueCache>,
    ) -> Self {
        Self {
            config,
            api,
            profiles,
            history,
            cache,
        }
    }

    /// One orchestrator per hosting surface (modal, page); call `cancel`
    /// on teardown.
    pub fn orchestrator(&self) -> TryOnOrchestrator {
        TryOnOrchestrator::new(
            Arc::clone(&self.api),
            ImageFetcher::new(self.config.image_fetch_timeout()),
            Arc::clone(&self.history),
            PollSettings {
                interval: self.config.poll_interval(),
                timeout: self.config.poll_timeout(),
            },
        )
    }

    pub fn auth_resolver(&self, gateway: Arc<dyn AuthGateway>) -> RedirectAuthResolver {
        RedirectAuthResolver::new(
            gateway,
            Arc::clone(&self.profiles),
            AttemptSlot::new(Arc::clone(&self.cache)),
            ResolverSettings {
                attempt_expiry: self.config.redirect_expiry(),
                recent_window: self.config.redirect_recent_window(),
                recheck_delay: self.config.redirect_recheck_delay(),
            },
        )
    }

    pub fn session_cache(&self) -> SessionCache {
        SessionCache::new(Arc::clone(&self.cache))
    }
}
