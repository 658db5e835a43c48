//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use contribscout_core::pipeline::{CrawlPlan, CrawlReport, ProgressReporter, run_crawl};
use contribscout_discovery::{RepoSource, discover_repos};
use contribscout_github::GitHubClient;
use contribscout_shared::{
    AppConfig, CrawlCriteria, RepoRef, init_config, load_config, resolve_token,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// contribscout — collect, filter, and export GitHub contributor data.
#[derive(Parser)]
#[command(
    name = "contribscout",
    version,
    about = "Crawl GitHub contributors across repositories and export an outreach spreadsheet.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Repository-list source flags shared by the crawl/repos/stars commands.
#[derive(Args)]
pub(crate) struct SourceArgs {
    /// Google Sheet URL whose first column lists repository URLs.
    #[arg(long, conflicts_with = "master_repo")]
    pub sheet_url: Option<String>,

    /// Repository whose README links the repositories to track.
    #[arg(long)]
    pub master_repo: Option<String>,

    /// First sheet row to read (1-based).
    #[arg(long)]
    pub start_row: Option<usize>,

    /// Last sheet row to read (inclusive).
    #[arg(long)]
    pub end_row: Option<usize>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full crawl: discover, filter, enrich, and export.
    Crawl {
        #[command(flatten)]
        source: SourceArgs,

        /// Minimum contributions within a repository.
        #[arg(long)]
        min_repo_contributions: Option<u64>,

        /// Minimum total contributions over the trailing year.
        #[arg(long)]
        min_yearly_contributions: Option<u64>,

        /// Minimum stargazer count for a repository to be processed.
        #[arg(long)]
        min_stars: Option<u64>,

        /// Output workbook path.
        #[arg(short, long)]
        out: Option<String>,

        /// Directory checked for workbooks from previous runs.
        #[arg(long)]
        check_dir: Option<String>,
    },

    /// Discover the repository list and print it.
    Repos {
        #[command(flatten)]
        source: SourceArgs,

        /// Also write the URLs to a text file, one per line.
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Discover the repository list and count stars.
    Stars {
        #[command(flatten)]
        source: SourceArgs,

        /// Mark repositories at or above this star count.
        #[arg(long)]
        min_stars: Option<u64>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "contribscout=info",
        1 => "contribscout=debug",
        _ => "contribscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Crawl {
            source,
            min_repo_contributions,
            min_yearly_contributions,
            min_stars,
            out,
            check_dir,
        } => {
            cmd_crawl(
                source,
                min_repo_contributions,
                min_yearly_contributions,
                min_stars,
                out.as_deref(),
                check_dir.as_deref(),
            )
            .await
        }
        Command::Repos { source, out } => cmd_repos(source, out.as_deref()).await,
        Command::Stars { source, min_stars } => cmd_stars(source, min_stars).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Source / client resolution
// ---------------------------------------------------------------------------

/// Build the repository-list source from CLI flags and config defaults.
fn resolve_source(args: &SourceArgs, config: &AppConfig) -> Result<RepoSource> {
    match (&args.sheet_url, &args.master_repo) {
        (Some(sheet), None) => Ok(RepoSource::Sheet {
            url: sheet.clone(),
            start_row: args.start_row.unwrap_or(config.defaults.start_row),
            end_row: args.end_row.unwrap_or(config.defaults.end_row),
        }),
        (None, Some(master)) => {
            let repo = RepoRef::parse_url(master)
                .map_err(|e| eyre!("invalid master repository URL: {e}"))?;
            Ok(RepoSource::MasterRepo { repo })
        }
        (None, None) => Err(eyre!(
            "provide a repository source: --sheet-url <URL> or --master-repo <URL>"
        )),
        (Some(_), Some(_)) => Err(eyre!("--sheet-url and --master-repo are mutually exclusive")),
    }
}

/// Build the GitHub client from config, resolving the token env var.
fn build_client(config: &AppConfig) -> Result<GitHubClient> {
    let token = resolve_token(config);
    let client = GitHubClient::new(&config.github, &config.rate_limits, token)?;
    if client.has_token() {
        info!("GitHub token found");
    }
    Ok(client)
}

// ---------------------------------------------------------------------------
// crawl
// ---------------------------------------------------------------------------

async fn cmd_crawl(
    source: SourceArgs,
    min_repo_contributions: Option<u64>,
    min_yearly_contributions: Option<u64>,
    min_stars: Option<u64>,
    out: Option<&str>,
    check_dir: Option<&str>,
) -> Result<()> {
    let config = load_config()?;
    let repo_source = resolve_source(&source, &config)?;
    let github = build_client(&config)?;

    let mut criteria = CrawlCriteria::from(&config);
    if let Some(v) = min_repo_contributions {
        criteria.min_repo_contributions = v;
    }
    if let Some(v) = min_yearly_contributions {
        criteria.min_yearly_contributions = v;
    }
    if let Some(v) = min_stars {
        criteria.min_stars = v;
    }

    let output_path = PathBuf::from(out.unwrap_or(&config.defaults.output_file));

    let plan = CrawlPlan {
        source: repo_source,
        criteria,
        output_path,
        check_directory: check_dir.map(PathBuf::from),
    };

    info!(
        min_repo_contributions = criteria.min_repo_contributions,
        min_yearly_contributions = criteria.min_yearly_contributions,
        min_stars = criteria.min_stars,
        out = %plan.output_path.display(),
        "starting contributor crawl"
    );

    let reporter = CliProgress::new();
    let report = run_crawl(&plan, &github, &reporter).await?;

    // Print summary
    println!();
    println!("  Crawl complete!");
    println!(
        "  Repos:       {} discovered, {} processed, {} skipped, {} failed",
        report.repos_discovered, report.repos_processed, report.repos_skipped, report.repos_failed
    );
    println!("  Seen:        {} contributors", report.contributors_seen);
    println!("  Qualified:   {} unique contributors", report.contributors_qualified);
    println!("  New rows:    {}", report.export.new_rows);
    println!("  Total rows:  {}", report.export.total_rows);
    if report.export.duplicates_external > 0 {
        println!(
            "  Duplicates:  {} filtered against existing workbooks",
            report.export.duplicates_external
        );
    }
    println!("  Output:      {}", report.export.path.display());
    println!("  Time:        {:.1}s", report.elapsed.as_secs_f64());

    if !report.qualified_by_repo.is_empty() {
        println!();
        println!("  Qualified contributors by repository:");
        let mut by_repo: Vec<_> = report.qualified_by_repo.iter().collect();
        by_repo.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (repo, count) in by_repo {
            println!("    {repo}: {count}");
        }
    }
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// repos
// ---------------------------------------------------------------------------

async fn cmd_repos(source: SourceArgs, out: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let repo_source = resolve_source(&source, &config)?;
    let github = build_client(&config)?;

    let repos = discover_repos(&repo_source, &github).await?;

    if repos.is_empty() {
        println!("No repositories found.");
        return Ok(());
    }

    for repo in &repos {
        println!("{}", repo.html_url());
    }

    if let Some(path) = out {
        let lines: String = repos
            .iter()
            .map(|r| format!("{}\n", r.html_url()))
            .collect();
        std::fs::write(path, lines)?;
        println!();
        println!("Exported {} links to {path}", repos.len());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// stars
// ---------------------------------------------------------------------------

async fn cmd_stars(source: SourceArgs, min_stars: Option<u64>) -> Result<()> {
    let config = load_config()?;
    let repo_source = resolve_source(&source, &config)?;
    let github = build_client(&config)?;
    let min_stars = min_stars.unwrap_or(config.thresholds.min_stars);

    let repos = discover_repos(&repo_source, &github).await?;
    if repos.is_empty() {
        println!("No repositories found.");
        return Ok(());
    }

    let bar = ProgressBar::new(repos.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("progress template"),
    );

    let mut counts: Vec<(RepoRef, u64)> = Vec::new();
    for repo in &repos {
        bar.set_message(repo.full_name());
        if let Some(stars) = github.repo_stars(repo).await? {
            counts.push((repo.clone(), stars));
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let qualifying = counts.iter().filter(|(_, s)| *s >= min_stars).count();
    for (repo, stars) in &counts {
        let marker = if min_stars > 0 && *stars >= min_stars {
            " *"
        } else {
            ""
        };
        println!("{stars:>8}  {}{marker}", repo.full_name());
    }

    println!();
    println!("{} repositories, {qualifying} at or above {min_stars} stars", counts.len());

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("spinner template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn repo_started(&self, repo: &RepoRef, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Processing [{current}/{total}] {repo}"));
    }

    fn contributor_checked(&self, login: &str, repo_contributions: u64, yearly: u64) {
        self.spinner.set_message(format!(
            "Checking {login} ({repo_contributions} repo / {yearly} yearly contributions)"
        ));
    }

    fn done(&self, _report: &CrawlReport) {
        self.spinner.finish_and_clear();
    }
}
