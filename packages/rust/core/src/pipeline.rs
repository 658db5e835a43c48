//! End-to-end crawl: source → repo list → per-repo contributor filtering →
//! enrichment → roster merge → export.
//!
//! Repositories are processed sequentially. Failures on one repository or
//! contributor are logged and skipped; only an empty discovery result or an
//! export failure aborts the run.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use contribscout_discovery::{RepoSource, discover_repos};
use contribscout_export::{ExportConfig, ExportSummary, export_contributors};
use contribscout_github::GitHubClient;
use contribscout_shared::{ContribScoutError, CrawlCriteria, RepoRef, Result};

use crate::roster::{ContributorSighting, Roster};

// ---------------------------------------------------------------------------
// Plan & report
// ---------------------------------------------------------------------------

/// Everything a crawl run needs, merged from config and CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    /// Where the repository list comes from.
    pub source: RepoSource,
    /// Filtering thresholds.
    pub criteria: CrawlCriteria,
    /// Target workbook path.
    pub output_path: PathBuf,
    /// Directory checked for workbooks from previous runs.
    pub check_directory: Option<PathBuf>,
}

/// Summary of a completed crawl.
#[derive(Debug)]
pub struct CrawlReport {
    /// Repositories discovered from the source.
    pub repos_discovered: usize,
    /// Repositories fully processed.
    pub repos_processed: usize,
    /// Repositories skipped by the star gate or because they are missing.
    pub repos_skipped: usize,
    /// Repositories that errored out.
    pub repos_failed: usize,
    /// Contributors listed across all processed repositories.
    pub contributors_seen: usize,
    /// Unique contributors that passed both thresholds.
    pub contributors_qualified: usize,
    /// Qualified-contributor count per repository.
    pub qualified_by_repo: BTreeMap<String, usize>,
    /// Export outcome.
    pub export: ExportSummary,
    /// Total elapsed time.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting crawl status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a repository starts processing.
    fn repo_started(&self, repo: &RepoRef, current: usize, total: usize);
    /// Called after a contributor's yearly count has been checked.
    fn contributor_checked(&self, login: &str, repo_contributions: u64, yearly: u64);
    /// Called when the crawl completes.
    fn done(&self, report: &CrawlReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn repo_started(&self, _repo: &RepoRef, _current: usize, _total: usize) {}
    fn contributor_checked(&self, _login: &str, _repo_contributions: u64, _yearly: u64) {}
    fn done(&self, _report: &CrawlReport) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

enum RepoOutcome {
    Processed { seen: usize },
    Skipped { reason: &'static str },
}

/// Run the full crawl.
#[instrument(skip_all, fields(source = %plan.source, out = %plan.output_path.display()))]
pub async fn run_crawl(
    plan: &CrawlPlan,
    github: &GitHubClient,
    progress: &dyn ProgressReporter,
) -> Result<CrawlReport> {
    let start = Instant::now();

    progress.phase("Discovering repositories");
    let repos = discover_repos(&plan.source, github).await?;

    if repos.is_empty() {
        return Err(ContribScoutError::validation(
            "no valid repository URLs found in the source",
        ));
    }

    info!(
        repos = repos.len(),
        min_repo_contributions = plan.criteria.min_repo_contributions,
        min_yearly_contributions = plan.criteria.min_yearly_contributions,
        min_stars = plan.criteria.min_stars,
        "starting crawl"
    );

    let mut roster = Roster::new();
    let mut repos_processed = 0usize;
    let mut repos_skipped = 0usize;
    let mut repos_failed = 0usize;
    let mut contributors_seen = 0usize;

    let repo_delay = github.rate_limits().repo_delay_ms;

    for (i, repo) in repos.iter().enumerate() {
        progress.repo_started(repo, i + 1, repos.len());

        match process_repo(github, repo, &plan.criteria, &mut roster, progress).await {
            Ok(RepoOutcome::Processed { seen }) => {
                repos_processed += 1;
                contributors_seen += seen;
            }
            Ok(RepoOutcome::Skipped { reason }) => {
                info!(repo = %repo, reason, "repository skipped");
                repos_skipped += 1;
            }
            Err(e) => {
                warn!(repo = %repo, error = %e, "error processing repository, continuing");
                repos_failed += 1;
            }
        }

        debug!(current = i + 1, total = repos.len(), "repository processed");
        pause(repo_delay).await;
    }

    progress.phase("Exporting results");
    let export_config = ExportConfig {
        output_path: plan.output_path.clone(),
        check_directory: plan.check_directory.clone(),
    };
    let export = export_contributors(&export_config, &roster.to_vec())?;

    let report = CrawlReport {
        repos_discovered: repos.len(),
        repos_processed,
        repos_skipped,
        repos_failed,
        contributors_seen,
        contributors_qualified: roster.len(),
        qualified_by_repo: roster.qualified_by_repo(&plan.criteria),
        export,
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        repos_processed = report.repos_processed,
        repos_skipped = report.repos_skipped,
        repos_failed = report.repos_failed,
        qualified = report.contributors_qualified,
        exported_rows = report.export.total_rows,
        elapsed_ms = report.elapsed.as_millis(),
        "crawl complete"
    );

    Ok(report)
}

/// Filter and enrich one repository's contributors into the roster.
async fn process_repo(
    github: &GitHubClient,
    repo: &RepoRef,
    criteria: &CrawlCriteria,
    roster: &mut Roster,
    progress: &dyn ProgressReporter,
) -> Result<RepoOutcome> {
    if criteria.min_stars > 0 {
        match github.repo_stars(repo).await? {
            None => return Ok(RepoOutcome::Skipped { reason: "repository not found" }),
            Some(stars) if stars < criteria.min_stars => {
                debug!(repo = %repo, stars, min_stars = criteria.min_stars, "below star threshold");
                return Ok(RepoOutcome::Skipped { reason: "insufficient stars" });
            }
            Some(_) => {}
        }
    }

    let contributors = github.repo_contributors(repo).await?;
    let seen = contributors.len();
    info!(repo = %repo, total = seen, "contributors listed");

    let candidates: Vec<_> = contributors
        .into_iter()
        .filter(|c| c.contributions >= criteria.min_repo_contributions)
        .collect();
    info!(
        repo = %repo,
        candidates = candidates.len(),
        min = criteria.min_repo_contributions,
        "contributors above repo threshold"
    );

    let contributor_delay = github.rate_limits().contributor_delay_ms;

    for candidate in candidates {
        let yearly = match github.yearly_contributions(&candidate.login).await {
            Ok(yearly) => yearly,
            Err(e) => {
                warn!(login = %candidate.login, error = %e, "could not count yearly contributions");
                0
            }
        };

        progress.contributor_checked(&candidate.login, candidate.contributions, yearly);
        info!(
            login = %candidate.login,
            repo_contributions = candidate.contributions,
            yearly_contributions = yearly,
            "contributor checked"
        );

        if yearly >= criteria.min_yearly_contributions {
            let profile = github.user_profile(&candidate.login).await?;
            let commit_email = find_commit_email(github, &candidate.login).await?;

            roster.merge_sighting(ContributorSighting {
                repo: repo.clone(),
                login: candidate.login.clone(),
                profile_url: candidate.profile_url(),
                repo_contributions: candidate.contributions,
                yearly_contributions: yearly,
                commit_email,
                profile,
            });
        }

        pause(contributor_delay).await;
    }

    Ok(RepoOutcome::Processed { seen })
}

/// Commit-email hunt: the user's own repositories first, pinned
/// repositories from the profile page as the fallback.
async fn find_commit_email(github: &GitHubClient, login: &str) -> Result<Option<String>> {
    if let Some(email) = github.commit_email_from_own_repos(login).await? {
        return Ok(Some(email));
    }

    debug!(login, "no email in own repos, scraping pinned repositories");
    for pinned in github.pinned_repos(login).await? {
        if let Some(email) = github.email_from_repo_commits(login, &pinned).await? {
            info!(login, repo = %pinned, "found commit email in pinned repository");
            return Ok(Some(email));
        }
    }

    warn!(login, "no commit email found");
    Ok(None)
}

async fn pause(millis: u64) {
    if millis > 0 {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}
