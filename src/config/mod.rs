use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base URL of the Vizzle generation API
    pub api_base_url: String,

    /// Bearer token for the generation API
    pub api_token: String,

    /// Delay between job status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Overall ceiling on one job's polling before it is forced to Failed
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Bound on fetching/decoding a single input image
    #[serde(default = "default_image_fetch_timeout_secs")]
    pub image_fetch_timeout_secs: u64,

    /// Age past which a stored redirect attempt is discarded
    #[serde(default = "default_redirect_expiry_secs")]
    pub redirect_expiry_secs: u64,

    /// Window in which a missing redirect result earns one bounded re-check
    #[serde(default = "default_redirect_recent_secs")]
    pub redirect_recent_secs: u64,

    /// Delay before that single re-check
    #[serde(default = "default_redirect_recheck_delay_ms")]
    pub redirect_recheck_delay_ms: u64,

    /// Optional byte budget for the client-local cache
    #[serde(default)]
    pub cache_capacity_bytes: Option<usize>,
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_poll_timeout_secs() -> u64 {
    300
}

fn default_image_fetch_timeout_secs() -> u64 {
    5
}

fn default_redirect_expiry_secs() -> u64 {
    300
}

fn default_redirect_recent_secs() -> u64 {
    10
}

fn default_redirect_recheck_delay_ms() -> u64 {
    1_000
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn image_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.image_fetch_timeout_secs)
    }

    pub fn redirect_expiry(&self) -> Duration {
        Duration::from_secs(self.redirect_expiry_secs)
    }

    pub fn redirect_recent_window(&self) -> Duration {
        Duration::from_secs(self.redirect_recent_secs)
    }

    pub fn redirect_recheck_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_recheck_delay_ms)
    }
}
