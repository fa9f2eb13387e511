use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::models::Field;

pub type SharedConfig = Arc<RwLock<Config>>;

#[derive(Debug, Clone)]
pub struct Config {
    // Console transport
    pub user_id: i64,

    // Entry flow
    pub flow: Vec<Field>,
    pub max_input_errors: u32,
    pub idle_threshold_secs: u64,

    // Suggestions
    pub top_n: usize,
    pub schema_ttl_secs: u64,
    pub suggestion_ttl_secs: u64,

    // External schema database (empty URL = built-in static source)
    pub schema_api_url: String,
    pub schema_api_token: String,
    pub schema_database_id: String,

    // Storage & logging
    pub data_dir: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let flow = parse_flow(&env("JOURNAL_FLOW", ""));

        Config {
            user_id: env("JOURNAL_USER_ID", "1").parse().unwrap_or(1),
            flow,
            max_input_errors: env("MAX_INPUT_ERRORS", "5").parse().unwrap_or(5),
            idle_threshold_secs: env("IDLE_THRESHOLD_SECS", "1800").parse().unwrap_or(1800),
            top_n: env("SUGGESTION_TOP_N", "6").parse().unwrap_or(6),
            // Schemas change rarely; suggestions must react to fresh commits
            schema_ttl_secs: env("SCHEMA_TTL_SECS", "1200").parse().unwrap_or(1200),
            suggestion_ttl_secs: env("SUGGESTION_TTL_SECS", "45").parse().unwrap_or(45),
            schema_api_url: env("SCHEMA_API_URL", ""),
            schema_api_token: env("SCHEMA_API_TOKEN", ""),
            schema_database_id: env("SCHEMA_DATABASE_ID", "default"),
            data_dir: env("DATA_DIR", "data"),
            log_level: env("LOG_LEVEL", "INFO"),
        }
    }

    pub fn schema_ttl(&self) -> Duration {
        Duration::from_secs(self.schema_ttl_secs)
    }

    pub fn suggestion_ttl(&self) -> Duration {
        Duration::from_secs(self.suggestion_ttl_secs)
    }

    pub fn idle_threshold(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.idle_threshold_secs as i64)
    }

    pub fn shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }
}

fn parse_flow(raw: &str) -> Vec<Field> {
    let parsed: Vec<Field> = raw.split(',').filter_map(Field::from_str_loose).collect();
    if parsed.is_empty() {
        Field::DEFAULT_FLOW.to_vec()
    } else {
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_flow_env_falls_back_to_default() {
        assert_eq!(parse_flow(""), Field::DEFAULT_FLOW.to_vec());
        assert_eq!(parse_flow("bogus,also_bogus"), Field::DEFAULT_FLOW.to_vec());
    }

    #[test]
    fn flow_env_parses_names_and_skips_unknown() {
        let flow = parse_flow("ticker, direction, bogus, pnl");
        assert_eq!(flow, vec![Field::Ticker, Field::Direction, Field::Pnl]);
    }
}
