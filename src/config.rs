use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_SOFASCORE_API_URL: &str = "https://api.sofascore.com/api/v1";
const MAX_UPDATE_INTERVAL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Root holding `leagues/<league>/<team>.csv`.
    pub data_dir: PathBuf,
    pub update_interval: chrono::Duration,
    pub refresh_delay: Duration,
    pub sofascore_api_url: String,
    pub match_limit: usize,
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            update_interval: chrono::Duration::hours(48),
            refresh_delay: Duration::from_millis(1000),
            sofascore_api_url: DEFAULT_SOFASCORE_API_URL.to_string(),
            match_limit: 20,
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl Settings {
    /// Loads `.env.local` then `.env` (real environment variables win), then reads overrides.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        let defaults = Self::default();
        let data_dir = opt_env("H2H_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let update_hours = env::var("UPDATE_INTERVAL_HOURS")
            .ok()
            .and_then(|val| val.trim().parse::<i64>().ok())
            .unwrap_or(48)
            .clamp(1, MAX_UPDATE_INTERVAL_HOURS);
        let refresh_delay_ms = env::var("REFRESH_DELAY_MS")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(1000);
        let match_limit = env::var("SOFASCORE_MATCH_LIMIT")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(20)
            .clamp(1, 50);
        let http_timeout = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(10)
            .max(1);

        Self {
            data_dir,
            update_interval: chrono::Duration::hours(update_hours),
            refresh_delay: Duration::from_millis(refresh_delay_ms),
            sofascore_api_url: opt_env("SOFASCORE_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.sofascore_api_url),
            match_limit,
            http_timeout: Duration::from_secs(http_timeout),
        }
    }

    pub fn leagues_dir(&self) -> PathBuf {
        self.data_dir.join("leagues")
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|val| {
        if val.trim().is_empty() {
            None
        } else {
            Some(val)
        }
    })
}
