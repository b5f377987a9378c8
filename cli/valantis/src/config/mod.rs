use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config as HierarchicalConfig, Environment};
use serde::{Deserialize, Serialize};
use tracing::debug;
use valantis_catalog::{CatalogClientConfig, DEFAULT_API_URL, DEFAULT_PASSWORD, RetryPolicy};
use valantis_sdk::models::pipeline::PipelineOptions;

/// Name of the valantis config directory
const VALANTIS_DIR_NAME: &str = "valantis";
const VALANTIS_CONFIG_DIR_VAR: &str = "VALANTIS_CONFIG_DIR";
const VALANTIS_ENV_PREFIX: &str = "VALANTIS_";
pub const VALANTIS_CONFIG_FILE: &str = "valantis.toml";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Catalog endpoint all actions are POSTed to
    pub api_url: String,
    /// Shared secret the daily auth token is derived from
    pub password: String,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Send each id only once when fetching items
    #[serde(default)]
    pub dedup_ids_before_fetch: bool,

    /// Overrides the default `valantis/<version>` user agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Retry settings as written in the config file.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per request before giving up, `0` retries forever
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts.unwrap_or(0),
            initial_backoff_ms: duration_millis(policy.initial_backoff),
            max_backoff_ms: duration_millis(policy.max_backoff),
            multiplier: policy.multiplier,
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: (self.max_attempts != 0).then_some(self.max_attempts),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
        }
    }
}

impl Config {
    /// Creates a [Config] from the config file and `VALANTIS_*` environment variables
    pub fn parse() -> Result<Config> {
        let config_dir = match env::var(VALANTIS_CONFIG_DIR_VAR) {
            Ok(dir) => Some(PathBuf::from(dir)),
            Err(_) => {
                let config_dir = dirs::config_dir().map(|dir| dir.join(VALANTIS_DIR_NAME));
                debug!("`${VALANTIS_CONFIG_DIR_VAR}` not set, using {config_dir:?}");
                config_dir
            },
        };

        Self::read(config_dir.as_deref(), env::vars())
    }

    /// Layer built-in defaults, `valantis.toml` in `config_dir` and the
    /// `VALANTIS_`-prefixed variables among `envs`, in that order.
    ///
    /// Nested keys are addressed with `__`, e.g. `VALANTIS_RETRY__MAX_ATTEMPTS`.
    pub fn read(
        config_dir: Option<&Path>,
        envs: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Config> {
        let mut builder = HierarchicalConfig::builder()
            .set_default("api_url", DEFAULT_API_URL)?
            .set_default("password", DEFAULT_PASSWORD)?;

        if let Some(config_dir) = config_dir {
            let config_file = config_dir.join(VALANTIS_CONFIG_FILE);
            debug!(?config_file, "reading config file if present");
            builder = builder.add_source(
                config::File::from(config_file)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        // override via env variables
        let valantis_envs = envs
            .into_iter()
            .filter(|(key, _)| key != VALANTIS_CONFIG_DIR_VAR)
            .filter_map(|(key, value)| {
                key.strip_prefix(VALANTIS_ENV_PREFIX)
                    .map(|key| (key.to_owned(), value))
            })
            .collect::<HashMap<_, _>>();

        let final_config = builder
            .add_source(
                Environment::default()
                    .separator("__")
                    .source(Some(valantis_envs))
                    .try_parsing(true),
            )
            .build()?;

        final_config
            .try_deserialize()
            .context("Could not parse config")
    }

    pub fn catalog_client_config(&self) -> CatalogClientConfig {
        CatalogClientConfig {
            api_url: self.api_url.clone(),
            password: self.password.clone(),
            retry: self.retry.to_policy(),
            user_agent: Some(
                self.user_agent
                    .clone()
                    .unwrap_or_else(|| format!("valantis/{}", env!("CARGO_PKG_VERSION"))),
            ),
            ..Default::default()
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            dedup_ids_before_fetch: self.dedup_ids_before_fetch,
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    fn no_envs() -> Vec<(String, String)> {
        Vec::new()
    }

    fn envs(vars: &[(&str, &str)]) -> Vec<(String, String)> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let tempdir = tempfile::tempdir().unwrap();
        let config = Config::read(Some(tempdir.path()), no_envs()).unwrap();

        assert_eq!(config, Config {
            api_url: DEFAULT_API_URL.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            retry: RetryConfig::default(),
            dedup_ids_before_fetch: false,
            user_agent: None,
        });
        assert_eq!(config.retry.to_policy(), RetryPolicy::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let tempdir = tempfile::tempdir().unwrap();
        std::fs::write(
            tempdir.path().join(VALANTIS_CONFIG_FILE),
            indoc! {r#"
                api_url = "http://localhost:40000/"
                dedup_ids_before_fetch = true

                [retry]
                max_attempts = 3
            "#},
        )
        .unwrap();

        let config = Config::read(Some(tempdir.path()), no_envs()).unwrap();

        assert_eq!(config.api_url, "http://localhost:40000/");
        assert_eq!(config.password, DEFAULT_PASSWORD);
        assert!(config.pipeline_options().dedup_ids_before_fetch);
        assert_eq!(config.retry, RetryConfig {
            max_attempts: 3,
            ..Default::default()
        });
    }

    #[test]
    fn env_overrides_file() {
        let tempdir = tempfile::tempdir().unwrap();
        std::fs::write(
            tempdir.path().join(VALANTIS_CONFIG_FILE),
            indoc! {r#"
                password = "from-file"

                [retry]
                max_attempts = 3
            "#},
        )
        .unwrap();

        let config = Config::read(
            Some(tempdir.path()),
            envs(&[
                ("VALANTIS_PASSWORD", "from-env"),
                ("VALANTIS_RETRY__MAX_ATTEMPTS", "0"),
                ("VALANTIS_RETRY__MAX_BACKOFF_MS", "1000"),
                ("VALANTIS_CONFIG_DIR", "/nonexistent"),
                ("PASSWORD", "unprefixed"),
            ]),
        )
        .unwrap();

        assert_eq!(config.password, "from-env");
        let policy = config.retry.to_policy();
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.max_backoff, Duration::from_millis(1000));
    }

    #[test]
    fn client_config_carries_settings() {
        let config = Config::read(
            None,
            envs(&[
                ("VALANTIS_API_URL", "http://localhost:1234/"),
                ("VALANTIS_USER_AGENT", "tester"),
            ]),
        )
        .unwrap();

        let client_config = config.catalog_client_config();
        assert_eq!(client_config.api_url, "http://localhost:1234/");
        assert_eq!(client_config.user_agent.as_deref(), Some("tester"));
        assert_eq!(client_config.retry, RetryPolicy::default());
    }

    #[test]
    fn default_user_agent_names_the_binary() {
        let config = Config::read(None, no_envs()).unwrap();
        let user_agent = config.catalog_client_config().user_agent.unwrap();
        assert!(user_agent.starts_with("valantis/"));
    }

    #[test]
    fn invalid_value_is_an_error() {
        let result = Config::read(None, envs(&[("VALANTIS_RETRY__MAX_ATTEMPTS", "often")]));
        assert!(result.is_err());
    }

    #[test]
    #[serial_test::serial]
    fn parse_reads_config_dir_from_env() {
        let tempdir = tempfile::tempdir().unwrap();
        std::fs::write(
            tempdir.path().join(VALANTIS_CONFIG_FILE),
            "password = \"from-dir\"\n",
        )
        .unwrap();

        temp_env::with_vars(
            [
                (
                    VALANTIS_CONFIG_DIR_VAR,
                    Some(tempdir.path().to_string_lossy().as_ref()),
                ),
                ("VALANTIS_PASSWORD", None),
            ],
            || {
                let config = Config::parse().unwrap();
                assert_eq!(config.password, "from-dir");
            },
        );
    }
}
