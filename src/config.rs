use std::path::PathBuf;

/// Default page to scrape.
pub const DEFAULT_LISTINGS_URL: &str =
    "https://www.fairfaxcounty.gov/housing/homeownership/FirstTimeHomebuyers";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Immutable runtime configuration, constructed once at process start and
/// passed by reference everywhere else. Core logic never reads the
/// environment itself.
#[derive(Debug, Clone)]
pub struct Config {
    pub listings_url: String,
    pub db_path: PathBuf,
    pub subject_prefix: String,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub max_fetch_attempts: usize,
    pub poll_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listings_url: DEFAULT_LISTINGS_URL.to_string(),
            db_path: PathBuf::from("listings.db"),
            subject_prefix: "Fairfax FTHB".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout_secs: 30,
            max_fetch_attempts: 3,
            // 12 hours between cycles in continuous mode.
            poll_interval_secs: 43_200,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults. `.env` loading happens in `main` before this is called.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listings_url: std::env::var("LISTINGS_URL").unwrap_or(defaults.listings_url),
            db_path: std::env::var("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            subject_prefix: std::env::var("SUBJECT_PREFIX").unwrap_or(defaults.subject_prefix),
            user_agent: std::env::var("USER_AGENT").unwrap_or(defaults.user_agent),
            http_timeout_secs: env_parsed("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs),
            max_fetch_attempts: env_parsed("MAX_FETCH_ATTEMPTS", defaults.max_fetch_attempts),
            poll_interval_secs: env_parsed("POLL_INTERVAL_SECS", defaults.poll_interval_secs),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.max_fetch_attempts, 3);
        assert_eq!(config.poll_interval_secs, 43_200);
        assert_eq!(config.db_path, PathBuf::from("listings.db"));
        assert!(config.listings_url.contains("fairfaxcounty.gov"));
    }
}
