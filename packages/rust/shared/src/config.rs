//! Application configuration for contribscout.
//!
//! User config lives at `~/.contribscout/contribscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContribScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "contribscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".contribscout";

// ---------------------------------------------------------------------------
// Config structs (matching contribscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// GitHub endpoints and authentication.
    #[serde(default)]
    pub github: GitHubConfig,

    /// Contributor filtering thresholds.
    #[serde(default)]
    pub thresholds: ThresholdsConfig,

    /// Delays and backoff applied around API calls.
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// `[github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// GraphQL endpoint URL.
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,

    /// Web origin used for profile-page scraping.
    #[serde(default = "default_web_base")]
    pub web_base: String,

    /// Name of the env var holding the token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            graphql_url: default_graphql_url(),
            web_base: default_web_base(),
            token_env: default_token_env(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}
fn default_graphql_url() -> String {
    "https://api.github.com/graphql".into()
}
fn default_web_base() -> String {
    "https://github.com".into()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}

/// `[thresholds]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    /// Minimum contributions within a single repository.
    #[serde(default = "default_min_repo_contributions")]
    pub min_repo_contributions: u64,

    /// Minimum total contributions over the trailing year.
    #[serde(default = "default_min_yearly_contributions")]
    pub min_yearly_contributions: u64,

    /// Minimum stargazer count for a repository to be processed.
    #[serde(default)]
    pub min_stars: u64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            min_repo_contributions: default_min_repo_contributions(),
            min_yearly_contributions: default_min_yearly_contributions(),
            min_stars: 0,
        }
    }
}

fn default_min_repo_contributions() -> u64 {
    100
}
fn default_min_yearly_contributions() -> u64 {
    400
}

/// `[rate_limits]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Delay between paginated API calls, in ms.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Delay between contributors while enriching, in ms.
    #[serde(default = "default_contributor_delay_ms")]
    pub contributor_delay_ms: u64,

    /// Delay between repositories, in ms.
    #[serde(default = "default_repo_delay_ms")]
    pub repo_delay_ms: u64,

    /// Wait before retrying after the API reports rate-limit exhaustion.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay_ms(),
            contributor_delay_ms: default_contributor_delay_ms(),
            repo_delay_ms: default_repo_delay_ms(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

fn default_request_delay_ms() -> u64 {
    100
}
fn default_contributor_delay_ms() -> u64 {
    1100
}
fn default_repo_delay_ms() -> u64 {
    1000
}
fn default_backoff_secs() -> u64 {
    300
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default export file name.
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Default first sheet row (1-based).
    #[serde(default = "default_start_row")]
    pub start_row: usize,

    /// Default last sheet row (inclusive).
    #[serde(default = "default_end_row")]
    pub end_row: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
            start_row: default_start_row(),
            end_row: default_end_row(),
        }
    }
}

fn default_output_file() -> String {
    "contributors.xlsx".into()
}
fn default_start_row() -> usize {
    1
}
fn default_end_row() -> usize {
    100
}

// ---------------------------------------------------------------------------
// Crawl criteria (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime filtering criteria — merged from config file + CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct CrawlCriteria {
    /// Minimum contributions within a single repository.
    pub min_repo_contributions: u64,
    /// Minimum total contributions over the trailing year.
    pub min_yearly_contributions: u64,
    /// Minimum stargazer count for a repository to be processed (0 = off).
    pub min_stars: u64,
}

impl From<&AppConfig> for CrawlCriteria {
    fn from(config: &AppConfig) -> Self {
        Self {
            min_repo_contributions: config.thresholds.min_repo_contributions,
            min_yearly_contributions: config.thresholds.min_yearly_contributions,
            min_stars: config.thresholds.min_stars,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.contribscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ContribScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.contribscout/contribscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ContribScoutError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ContribScoutError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ContribScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ContribScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ContribScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the GitHub token from the configured env var. A missing token is
/// not an error — unauthenticated calls fall back to the events-based
/// contribution count.
pub fn resolve_token(config: &AppConfig) -> Option<String> {
    match std::env::var(&config.github.token_env) {
        Ok(val) if !val.is_empty() => Some(val),
        _ => {
            tracing::warn!(
                var = %config.github.token_env,
                "no GitHub token found; GraphQL contribution counts unavailable"
            );
            None
        }
    }
}
