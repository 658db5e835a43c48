//! Shared domain types, configuration, and errors for contribscout.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AppConfig, CrawlCriteria, DefaultsConfig, GitHubConfig, RateLimitConfig, ThresholdsConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_token,
};
pub use error::{ContribScoutError, Result};
pub use types::{Contributor, ContributorProfile, RepoRef, clean_blog_url, is_valid_email};
