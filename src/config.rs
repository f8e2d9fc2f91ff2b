use std::time::Duration;
use tracing::warn;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
/// Leaderboard/status refresh period.
pub const STATUS_POLL_INTERVAL_SECS: u64 = 5;
/// Recommendation feed refresh period.
pub const RECOMMENDATIONS_POLL_INTERVAL_SECS: u64 = 5;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOG_FILE: &str = "botdesk.log";

/// Characters of a bot's bio shown on its roster card.
pub const BIO_EXCERPT_CHARS: usize = 50;
/// Input poll timeout of the draw loop (~60 fps).
pub const UI_TICK_MILLIS: u64 = 16;

#[derive(Clone, Debug, PartialEq)]
pub struct DeskConfig {
    pub api_url: String,
    pub status_interval: Duration,
    pub recommendations_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            status_interval: Duration::from_secs(STATUS_POLL_INTERVAL_SECS),
            recommendations_interval: Duration::from_secs(RECOMMENDATIONS_POLL_INTERVAL_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl DeskConfig {
    /// Builds the config from CLI values, falling back to `BOTDESK_*`
    /// environment variables and then to the defaults above.
    pub fn resolve(
        api_url: Option<String>,
        status_secs: Option<u64>,
        recommendations_secs: Option<u64>,
        timeout_secs: Option<u64>,
    ) -> Self {
        let defaults = Self::default();
        let api_url = api_url
            .or_else(|| env_string("BOTDESK_API_URL"))
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_url);

        Self {
            api_url,
            status_interval: status_secs
                .or_else(|| env_secs("BOTDESK_STATUS_POLL_SECS"))
                .map(positive_secs)
                .unwrap_or(defaults.status_interval),
            recommendations_interval: recommendations_secs
                .or_else(|| env_secs("BOTDESK_RECS_POLL_SECS"))
                .map(positive_secs)
                .unwrap_or(defaults.recommendations_interval),
            request_timeout: timeout_secs
                .map(positive_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_secs(key: &str) -> Option<u64> {
    let raw = env_string(key)?;
    match raw.parse::<u64>() {
        Ok(secs) => Some(secs),
        Err(_) => {
            warn!("Ignoring {}={} ; expected whole seconds", key, raw);
            None
        }
    }
}

// tokio::time::interval panics on a zero period.
fn positive_secs(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}
