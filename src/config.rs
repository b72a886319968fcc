use crate::error::{AdvisoryError, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FEED_URL: &str = "https://filestore.fortinet.com/fortiguard/rss/ir.xml";
pub const DEFAULT_CVRF_URL: &str = "https://www.fortiguard.com/psirt/cvrf";
pub const DEFAULT_DATA_DIR: &str = "cvrf/fortinet";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root of the `<year>/<id>.json` document tree.
    pub data_dir: PathBuf,
    pub feed_url: String,
    pub cvrf_url: String,
    /// Minimum spacing between two CVRF downloads.
    pub request_interval: Duration,
    pub user_agent: String,
    pub log_to_file: bool,
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            feed_url: DEFAULT_FEED_URL.to_string(),
            cvrf_url: DEFAULT_CVRF_URL.to_string(),
            request_interval: Duration::from_millis(1000),
            user_agent: default_user_agent(),
            log_to_file: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}

fn default_user_agent() -> String {
    format!("cvrf-review/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("CVRF_REVIEW__DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let feed_url = lookup("CVRF_REVIEW__FEED_URL").unwrap_or(defaults.feed_url);
        let cvrf_url = lookup("CVRF_REVIEW__CVRF_URL").unwrap_or(defaults.cvrf_url);

        let request_interval = match lookup("CVRF_REVIEW__REQUEST_INTERVAL_MS") {
            Some(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|_| {
                    AdvisoryError::config(format!(
                        "CVRF_REVIEW__REQUEST_INTERVAL_MS must be an integer, got '{}'",
                        raw
                    ))
                })?;
                if millis == 0 {
                    return Err(AdvisoryError::config(
                        "CVRF_REVIEW__REQUEST_INTERVAL_MS must be greater than zero",
                    ));
                }
                Duration::from_millis(millis)
            }
            None => defaults.request_interval,
        };

        let user_agent = lookup("CVRF_REVIEW__USER_AGENT").unwrap_or(defaults.user_agent);

        let log_to_file = match lookup("CVRF_REVIEW__LOG_TO_FILE") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                AdvisoryError::config(format!(
                    "CVRF_REVIEW__LOG_TO_FILE must be true or false, got '{}'",
                    raw
                ))
            })?,
            None => defaults.log_to_file,
        };

        let log_dir = lookup("CVRF_REVIEW__LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.log_dir);

        Ok(Self {
            data_dir,
            feed_url,
            cvrf_url,
            request_interval,
            user_agent,
            log_to_file,
            log_dir,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
