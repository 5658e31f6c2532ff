use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Source dataset
    pub source_data_path: String,

    // Import continuation
    pub self_base_url: Option<String>,
    pub import_shared_secret: Option<String>,
    pub import_batch_size: usize,

    // Scraping
    pub rebrowser_ws_url: String,
    pub valuation_site_url: String,
    pub scrape_lanes: usize,
    pub lane_min_delay_ms: u64,
    pub scrape_max_attempts: u32,
    pub scrape_retry_delay_ms: u64,

    // Web server
    pub api_host: String,
    pub api_port: u16,
}

impl Config {
    /// Load configuration for the API server.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self::with_database_url(required_env("DATABASE_URL"))
    }

    /// Load config for the scraper binary. The remote browser endpoint is
    /// mandatory there; the database and web server settings are not.
    pub fn scraper_from_env() -> Self {
        Self {
            rebrowser_ws_url: required_env("REBROWSER_WS_URL"),
            ..Self::with_database_url(env::var("DATABASE_URL").unwrap_or_default())
        }
    }

    fn with_database_url(database_url: String) -> Self {
        Self {
            database_url,
            source_data_path: env::var("SOURCE_DATA_PATH")
                .unwrap_or_else(|_| "data/search.json".to_string()),
            self_base_url: env::var("SELF_BASE_URL").ok().filter(|s| !s.is_empty()),
            import_shared_secret: env::var("IMPORT_SHARED_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            import_batch_size: parse_env("IMPORT_BATCH_SIZE", 10),
            rebrowser_ws_url: env::var("REBROWSER_WS_URL").unwrap_or_default(),
            valuation_site_url: env::var("VALUATION_SITE_URL")
                .unwrap_or_else(|_| "https://property.example.com".to_string()),
            scrape_lanes: parse_env("SCRAPE_LANES", 3),
            lane_min_delay_ms: parse_env("LANE_MIN_DELAY_MS", 3000),
            scrape_max_attempts: parse_env("SCRAPE_MAX_ATTEMPTS", 25),
            scrape_retry_delay_ms: parse_env("SCRAPE_RETRY_DELAY_MS", 30_000),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: parse_env("API_PORT", 3000),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T
where
    T::Err: std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a number: {e:?}")),
        Err(_) => default,
    }
}
