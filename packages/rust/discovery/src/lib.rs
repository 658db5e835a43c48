//! Repository-list discovery.
//!
//! A crawl starts from one of two sources: a Google Sheet whose first column
//! lists repository URLs, or a "master" repository whose README links the
//! repositories to track. Both paths produce an ordered, deduplicated list
//! of [`RepoRef`]s; invalid rows and links are logged and skipped.

mod parser;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use contribscout_github::GitHubClient;
use contribscout_shared::{ContribScoutError, RepoRef, Result};

pub use parser::{repos_from_readme, sheet_csv_url};

/// User-Agent string for sheet downloads.
const USER_AGENT: &str = concat!("contribscout/", env!("CARGO_PKG_VERSION"));

/// Timeout for the CSV export download.
const SHEET_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// RepoSource
// ---------------------------------------------------------------------------

/// Where the repository list comes from.
#[derive(Debug, Clone)]
pub enum RepoSource {
    /// A Google Sheet; the first column of rows `start_row..=end_row`
    /// (1-based) holds repository URLs.
    Sheet {
        url: String,
        start_row: usize,
        end_row: usize,
    },
    /// A repository whose README links the repositories to track.
    MasterRepo { repo: RepoRef },
}

impl std::fmt::Display for RepoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sheet {
                url,
                start_row,
                end_row,
            } => write!(f, "sheet {url} rows {start_row}..={end_row}"),
            Self::MasterRepo { repo } => write!(f, "master repo {repo}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Discover the repositories to crawl from the configured source.
#[instrument(skip_all, fields(source = %source))]
pub async fn discover_repos(source: &RepoSource, github: &GitHubClient) -> Result<Vec<RepoRef>> {
    let repos = match source {
        RepoSource::Sheet {
            url,
            start_row,
            end_row,
        } => repos_from_sheet(url, *start_row, *end_row).await?,
        RepoSource::MasterRepo { repo } => {
            info!(master = %repo, "reading repository list from README");
            let readme = github.repo_readme(repo).await?;
            repos_from_readme(&readme, repo)
        }
    };

    info!(count = repos.len(), "repositories discovered");
    Ok(repos)
}

// ---------------------------------------------------------------------------
// Sheet path
// ---------------------------------------------------------------------------

/// Download the sheet's CSV export and collect valid repository URLs from
/// the first column within the row range.
async fn repos_from_sheet(sheet_url: &str, start_row: usize, end_row: usize) -> Result<Vec<RepoRef>> {
    if start_row == 0 || end_row < start_row {
        return Err(ContribScoutError::validation(format!(
            "invalid row range {start_row}..={end_row} (rows are 1-based)"
        )));
    }

    let csv_url = sheet_csv_url(sheet_url)?;
    info!(%csv_url, "downloading sheet CSV export");

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(SHEET_TIMEOUT_SECS))
        .build()
        .map_err(|e| ContribScoutError::Network(format!("failed to build HTTP client: {e}")))?;

    let response = client
        .get(&csv_url)
        .send()
        .await
        .map_err(|e| ContribScoutError::Network(format!("{csv_url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ContribScoutError::api(&csv_url, status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ContribScoutError::Network(format!("{csv_url}: {e}")))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut repos: Vec<RepoRef> = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let row = idx + 1;
        if row < start_row {
            continue;
        }
        if row > end_row {
            break;
        }

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(row, error = %e, "unreadable CSV row");
                continue;
            }
        };

        let cell = record.get(0).unwrap_or("").trim();
        match RepoRef::parse_url(cell) {
            Ok(repo) => {
                debug!(row, repo = %repo, "sheet row accepted");
                if !repos.iter().any(|r| r.same_repo(&repo)) {
                    repos.push(repo);
                }
            }
            Err(_) => {
                warn!(row, cell, "invalid or empty repository URL");
            }
        }
    }

    Ok(repos)
}
