//! Workbook assembly: sheet layout, existing-row preservation, and the
//! cross-workbook duplicate check.
//!
//! An `.xlsx` file cannot be appended in place, so rows already present in
//! the target workbook are read back and rewritten ahead of the new ones.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::Utc;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::{debug, info, instrument, warn};

use contribscout_shared::{ContribScoutError, Contributor, ContributorProfile, Result};

/// Sheet holding one row per unique contributor.
const SHEET_ALL: &str = "All Contributors";
/// Per-repository aggregate sheet.
const SHEET_REPOS: &str = "Repository Summary";
/// Contact-data-only sheet.
const SHEET_CONTACT: &str = "Contact Information";
/// Run bookkeeping sheet.
const SHEET_PROGRESS: &str = "Progress Log";
/// Logins dropped because another workbook already has them.
const SHEET_DUPLICATES: &str = "Duplicates Filtered";

/// Column layout of the `All Contributors` sheet. Reading existing
/// workbooks relies on this exact order.
const HEADERS: &[&str] = &[
    "login",
    "name",
    "email",
    "commit_email",
    "website",
    "location",
    "company",
    "twitter",
    "bio",
    "public_repos",
    "followers",
    "following",
    "account_created",
    "yearly_contributions",
    "repositories",
    "best_repo_contributions",
];

// ---------------------------------------------------------------------------
// Config & summary
// ---------------------------------------------------------------------------

/// Configuration for one export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Target workbook path.
    pub output_path: PathBuf,
    /// Directory scanned for other workbooks whose contributors should not
    /// be exported again.
    pub check_directory: Option<PathBuf>,
}

/// Outcome of a completed export.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Where the workbook (or CSV fallback) was written.
    pub path: PathBuf,
    /// Rows in `All Contributors` after the write.
    pub total_rows: usize,
    /// Rows added by this run.
    pub new_rows: usize,
    /// Incoming records dropped as duplicates of each other.
    pub duplicates_internal: usize,
    /// Incoming records dropped because some workbook already had them.
    pub duplicates_external: usize,
    /// Rows carrying contact data.
    pub contact_rows: usize,
    /// Workbooks inspected in the check directory.
    pub workbooks_checked: usize,
    /// Set when the xlsx write failed and a CSV was written instead.
    pub csv_fallback: bool,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Export contributors to the target workbook, deduplicating against the
/// target's existing rows and any workbooks in the check directory.
#[instrument(skip_all, fields(path = %config.output_path.display(), incoming = incoming.len()))]
pub fn export_contributors(
    config: &ExportConfig,
    incoming: &[Contributor],
) -> Result<ExportSummary> {
    // Dedupe the incoming batch by login, keeping the first record.
    let mut seen: HashSet<String> = HashSet::new();
    let mut fresh: Vec<Contributor> = Vec::new();
    for contributor in incoming {
        if seen.insert(contributor.login.clone()) {
            fresh.push(contributor.clone());
        }
    }
    let duplicates_internal = incoming.len() - fresh.len();
    if duplicates_internal > 0 {
        info!(duplicates_internal, "removed duplicate logins from new data");
    }

    // Rows already in the target workbook are preserved verbatim.
    let existing = if config.output_path.exists() {
        match read_contributors(&config.output_path) {
            Ok(rows) => {
                info!(count = rows.len(), "loaded existing contributors from target workbook");
                rows
            }
            Err(e) => {
                warn!(error = %e, "could not read existing workbook, starting fresh");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    // Logins from other workbooks in the check directory.
    let (mut known_logins, workbooks_checked) = match &config.check_directory {
        Some(dir) => scan_directory_logins(dir, &config.output_path)?,
        None => (HashSet::new(), 0),
    };
    known_logins.extend(existing.iter().map(|c| c.login.clone()));

    // Drop new contributors some workbook already has.
    let mut new_rows: Vec<Contributor> = Vec::new();
    let mut filtered_logins: Vec<String> = Vec::new();
    for contributor in fresh {
        if known_logins.contains(&contributor.login) {
            filtered_logins.push(contributor.login);
        } else {
            new_rows.push(contributor);
        }
    }
    if !filtered_logins.is_empty() {
        info!(
            count = filtered_logins.len(),
            "dropped contributors already present in existing workbooks"
        );
    }

    let mut combined: Vec<Contributor> = existing;
    combined.extend(new_rows.iter().cloned());

    // Safety net: the combine above cannot introduce duplicates, but a
    // hand-edited workbook can.
    let mut final_logins: HashSet<String> = HashSet::new();
    combined.retain(|c| final_logins.insert(c.login.clone()));

    let contact_rows = combined.iter().filter(|c| c.has_contact_info()).count();

    let summary = ExportSummary {
        path: config.output_path.clone(),
        total_rows: combined.len(),
        new_rows: new_rows.len(),
        duplicates_internal,
        duplicates_external: filtered_logins.len(),
        contact_rows,
        workbooks_checked,
        csv_fallback: false,
    };

    match write_workbook(config, &combined, &filtered_logins, &summary) {
        Ok(()) => {
            info!(
                total = summary.total_rows,
                new = summary.new_rows,
                contact = summary.contact_rows,
                "results saved"
            );
            Ok(summary)
        }
        Err(e) => {
            warn!(error = %e, "workbook write failed, falling back to CSV");
            let csv_path = config.output_path.with_extension("backup.csv");
            write_csv_fallback(&csv_path, &combined)?;
            info!(path = %csv_path.display(), "saved CSV backup");
            Ok(ExportSummary {
                path: csv_path,
                csv_fallback: true,
                ..summary
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Workbook writing
// ---------------------------------------------------------------------------

fn write_workbook(
    config: &ExportConfig,
    combined: &[Contributor],
    filtered_logins: &[String],
    summary: &ExportSummary,
) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    write_all_contributors(workbook.add_worksheet(), combined, &header)?;
    write_repo_summary(workbook.add_worksheet(), combined, &header)?;
    write_contact_info(workbook.add_worksheet(), combined, &header)?;
    write_progress_log(workbook.add_worksheet(), config, summary, &header)?;
    if !filtered_logins.is_empty() {
        write_duplicates(workbook.add_worksheet(), filtered_logins, &header)?;
    }

    workbook
        .save(&config.output_path)
        .map_err(|e| ContribScoutError::Export(e.to_string()))?;
    Ok(())
}

fn write_all_contributors(
    sheet: &mut Worksheet,
    combined: &[Contributor],
    header: &Format,
) -> Result<()> {
    sheet
        .set_name(SHEET_ALL)
        .map_err(|e| ContribScoutError::Export(e.to_string()))?;

    write_headers(sheet, HEADERS, header)?;

    for (i, c) in combined.iter().enumerate() {
        let row = (i + 1) as u32;
        let p = &c.profile;
        let opt = |o: &Option<String>| o.clone().unwrap_or_default();

        w_str(sheet, row, 0, &c.login)?;
        w_str(sheet, row, 1, &opt(&p.name))?;
        w_str(sheet, row, 2, &opt(&p.email))?;
        w_str(sheet, row, 3, &opt(&c.commit_email))?;
        w_str(sheet, row, 4, &opt(&p.website))?;
        w_str(sheet, row, 5, &opt(&p.location))?;
        w_str(sheet, row, 6, &opt(&p.company))?;
        w_str(sheet, row, 7, &opt(&p.twitter))?;
        w_str(sheet, row, 8, &opt(&p.bio))?;
        w_num(sheet, row, 9, p.public_repos as f64)?;
        w_num(sheet, row, 10, p.followers as f64)?;
        w_num(sheet, row, 11, p.following as f64)?;
        w_str(
            sheet,
            row,
            12,
            &p.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        )?;
        w_num(sheet, row, 13, c.yearly_contributions as f64)?;
        w_str(sheet, row, 14, &repos_cell(c))?;
        w_num(sheet, row, 15, c.best_repo_contributions() as f64)?;
    }

    Ok(())
}

fn write_repo_summary(
    sheet: &mut Worksheet,
    combined: &[Contributor],
    header: &Format,
) -> Result<()> {
    sheet
        .set_name(SHEET_REPOS)
        .map_err(|e| ContribScoutError::Export(e.to_string()))?;

    write_headers(
        sheet,
        &[
            "repository",
            "contributors",
            "avg_repo_contributions",
            "avg_yearly_contributions",
        ],
        header,
    )?;

    // repo -> (contributor count, sum of repo counts, sum of yearly counts)
    let mut stats: BTreeMap<String, (u64, u64, u64)> = BTreeMap::new();
    for c in combined {
        for (repo, count) in &c.repo_contributions {
            let entry = stats.entry(repo.clone()).or_default();
            entry.0 += 1;
            entry.1 += count;
            entry.2 += c.yearly_contributions;
        }
    }

    for (i, (repo, (count, repo_sum, yearly_sum))) in stats.iter().enumerate() {
        let row = (i + 1) as u32;
        let n = *count as f64;
        w_str(sheet, row, 0, repo)?;
        w_num(sheet, row, 1, n)?;
        w_num(sheet, row, 2, round2(*repo_sum as f64 / n))?;
        w_num(sheet, row, 3, round2(*yearly_sum as f64 / n))?;
    }

    Ok(())
}

fn write_contact_info(
    sheet: &mut Worksheet,
    combined: &[Contributor],
    header: &Format,
) -> Result<()> {
    sheet
        .set_name(SHEET_CONTACT)
        .map_err(|e| ContribScoutError::Export(e.to_string()))?;

    write_headers(
        sheet,
        &[
            "login", "name", "email", "commit_email", "website", "location", "company", "twitter",
        ],
        header,
    )?;

    let mut row: u32 = 1;
    for c in combined.iter().filter(|c| c.has_contact_info()) {
        let p = &c.profile;
        let opt = |o: &Option<String>| o.clone().unwrap_or_default();
        w_str(sheet, row, 0, &c.login)?;
        w_str(sheet, row, 1, &opt(&p.name))?;
        w_str(sheet, row, 2, &opt(&p.email))?;
        w_str(sheet, row, 3, &opt(&c.commit_email))?;
        w_str(sheet, row, 4, &opt(&p.website))?;
        w_str(sheet, row, 5, &opt(&p.location))?;
        w_str(sheet, row, 6, &opt(&p.company))?;
        w_str(sheet, row, 7, &opt(&p.twitter))?;
        row += 1;
    }

    Ok(())
}

fn write_progress_log(
    sheet: &mut Worksheet,
    config: &ExportConfig,
    summary: &ExportSummary,
    header: &Format,
) -> Result<()> {
    sheet
        .set_name(SHEET_PROGRESS)
        .map_err(|e| ContribScoutError::Export(e.to_string()))?;

    write_headers(sheet, &["field", "value"], header)?;

    let directory = config
        .check_directory
        .as_ref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "None".to_string());

    let rows: Vec<(&str, String)> = vec![
        (
            "Last Updated",
            Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        ("Total Contributors", summary.total_rows.to_string()),
        ("New Contributors Added", summary.new_rows.to_string()),
        ("Contributors with Contact Info", summary.contact_rows.to_string()),
        (
            "Duplicates Removed (Internal)",
            summary.duplicates_internal.to_string(),
        ),
        (
            "Duplicates Removed (External)",
            summary.duplicates_external.to_string(),
        ),
        ("Workbooks Checked", summary.workbooks_checked.to_string()),
        ("Directory Scanned", directory),
    ];

    for (i, (field, value)) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        w_str(sheet, row, 0, field)?;
        w_str(sheet, row, 1, value)?;
    }

    Ok(())
}

fn write_duplicates(sheet: &mut Worksheet, logins: &[String], header: &Format) -> Result<()> {
    sheet
        .set_name(SHEET_DUPLICATES)
        .map_err(|e| ContribScoutError::Export(e.to_string()))?;

    write_headers(sheet, &["login", "date_detected"], header)?;

    let detected = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
    for (i, login) in logins.iter().enumerate() {
        let row = (i + 1) as u32;
        w_str(sheet, row, 0, login)?;
        w_str(sheet, row, 1, &detected)?;
    }

    Ok(())
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<()> {
    for (col, title) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *title, format)
            .map_err(|e| ContribScoutError::Export(e.to_string()))?;
    }
    Ok(())
}

fn w_str(sheet: &mut Worksheet, row: u32, col: u16, value: &str) -> Result<()> {
    sheet
        .write_string(row, col, value)
        .map_err(|e| ContribScoutError::Export(e.to_string()))?;
    Ok(())
}

fn w_num(sheet: &mut Worksheet, row: u32, col: u16, value: f64) -> Result<()> {
    sheet
        .write_number(row, col, value)
        .map_err(|e| ContribScoutError::Export(e.to_string()))?;
    Ok(())
}

/// `owner/repo:count` pairs joined with `; `.
fn repos_cell(c: &Contributor) -> String {
    c.repo_contributions
        .iter()
        .map(|(repo, count)| format!("{repo}:{count}"))
        .collect::<Vec<_>>()
        .join("; ")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// CSV fallback
// ---------------------------------------------------------------------------

fn write_csv_fallback(path: &Path, combined: &[Contributor]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).map_err(|e| ContribScoutError::Export(e.to_string()))?;

    writer
        .write_record(HEADERS)
        .map_err(|e| ContribScoutError::Export(e.to_string()))?;

    for c in combined {
        let p = &c.profile;
        let opt = |o: &Option<String>| o.clone().unwrap_or_default();
        writer
            .write_record(&[
                c.login.clone(),
                opt(&p.name),
                opt(&p.email),
                opt(&c.commit_email),
                opt(&p.website),
                opt(&p.location),
                opt(&p.company),
                opt(&p.twitter),
                opt(&p.bio),
                p.public_repos.to_string(),
                p.followers.to_string(),
                p.following.to_string(),
                p.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                c.yearly_contributions.to_string(),
                repos_cell(c),
                c.best_repo_contributions().to_string(),
            ])
            .map_err(|e| ContribScoutError::Export(e.to_string()))?;
    }

    writer
        .flush()
        .map_err(|e| ContribScoutError::io(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reading existing workbooks
// ---------------------------------------------------------------------------

/// Read contributors back from a previously exported workbook's
/// `All Contributors` sheet.
pub fn read_contributors(path: &Path) -> Result<Vec<Contributor>> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| ContribScoutError::Export(format!("{}: {e}", path.display())))?;

    let range = workbook
        .worksheet_range(SHEET_ALL)
        .map_err(|e| ContribScoutError::Export(format!("{}: {e}", path.display())))?;

    let mut contributors = Vec::new();

    for row in range.rows().skip(1) {
        let cell = |i: usize| cell_text(row.get(i));
        let opt = |i: usize| {
            let text = cell_text(row.get(i));
            if text.is_empty() { None } else { Some(text) }
        };

        let login = cell(0);
        if login.is_empty() {
            continue;
        }

        let profile = ContributorProfile {
            name: opt(1),
            email: opt(2),
            website: opt(4),
            location: opt(5),
            company: opt(6),
            twitter: opt(7),
            bio: opt(8),
            public_repos: cell_u64(row.get(9)),
            followers: cell_u64(row.get(10)),
            following: cell_u64(row.get(11)),
            created_at: opt(12).and_then(|s| {
                chrono::DateTime::parse_from_rfc3339(&s)
                    .ok()
                    .map(|t| t.with_timezone(&Utc))
            }),
        };

        contributors.push(Contributor {
            profile_url: format!("https://github.com/{login}"),
            login,
            repo_contributions: parse_repos_cell(&cell(14)),
            yearly_contributions: cell_u64(row.get(13)),
            commit_email: opt(3),
            profile,
        });
    }

    debug!(path = %path.display(), count = contributors.len(), "existing workbook read");
    Ok(contributors)
}

/// Collect logins from every other workbook in a directory.
fn scan_directory_logins(dir: &Path, current: &Path) -> Result<(HashSet<String>, usize)> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "check directory does not exist, skipping external check");
        return Ok((HashSet::new(), 0));
    }

    let current_abs = std::fs::canonicalize(current).unwrap_or_else(|_| current.to_path_buf());
    let mut logins: HashSet<String> = HashSet::new();
    let mut checked = 0usize;

    let entries = std::fs::read_dir(dir).map_err(|e| ContribScoutError::io(dir, e))?;
    let mut paths: BTreeSet<PathBuf> = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| ContribScoutError::io(dir, e))?;
        let path = entry.path();
        let is_workbook = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xls"));
        if !is_workbook {
            continue;
        }
        let abs = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if abs == current_abs {
            continue;
        }
        paths.insert(path);
    }

    for path in paths {
        match read_contributors(&path) {
            Ok(rows) => {
                debug!(path = %path.display(), count = rows.len(), "workbook scanned");
                logins.extend(rows.into_iter().map(|c| c.login));
                checked += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read workbook");
            }
        }
    }

    info!(workbooks = checked, logins = logins.len(), "check directory scanned");
    Ok((logins, checked))
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Empty) | None => String::new(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

fn cell_u64(cell: Option<&Data>) -> u64 {
    match cell {
        Some(Data::Float(f)) => *f as u64,
        Some(Data::Int(i)) => *i as u64,
        Some(Data::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Parse an `owner/repo:count; owner/repo:count` cell.
fn parse_repos_cell(cell: &str) -> BTreeMap<String, u64> {
    let mut repos = BTreeMap::new();
    for part in cell.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((repo, count)) = part.rsplit_once(':') {
            repos.insert(repo.trim().to_string(), count.trim().parse().unwrap_or(0));
        }
    }
    repos
}
