//! URL rewriting and text extraction for repository discovery.
//!
//! Two pure pieces: turning a Google Sheets link into its CSV export form,
//! and pulling GitHub repository URLs out of README text.

use std::sync::LazyLock;

use regex::Regex;

use contribscout_shared::{ContribScoutError, RepoRef, Result};

/// Matches `/edit?gid=` or `/edit#gid=` in a sheet URL.
static EDIT_GID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/edit[?#]gid=").expect("edit-gid regex"));

/// Matches GitHub repository URLs inside README text.
static REPO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://github\.com/[\w\.-]+/[\w\.-]+").expect("repo URL regex")
});

/// Rewrite a Google Sheets URL to its CSV export form.
///
/// - `…/edit?gid=123` or `…/edit#gid=123` → `…/export?format=csv&gid=123`
/// - `…/edit` → `…/export?format=csv`
/// - anything else gets `/export?format=csv` appended
pub fn sheet_csv_url(sheet_url: &str) -> Result<String> {
    let trimmed = sheet_url.trim();
    if trimmed.is_empty() {
        return Err(ContribScoutError::validation("empty sheet URL"));
    }

    if EDIT_GID_RE.is_match(trimmed) {
        return Ok(EDIT_GID_RE
            .replace(trimmed, "/export?format=csv&gid=")
            .into_owned());
    }

    if trimmed.contains("/edit") {
        return Ok(trimmed.replacen("/edit", "/export?format=csv", 1));
    }

    Ok(format!("{}/export?format=csv", trimmed.trim_end_matches('/')))
}

/// Extract repository references from README text, excluding the master
/// repository itself and deduplicating in first-seen order.
pub fn repos_from_readme(readme: &str, master: &RepoRef) -> Vec<RepoRef> {
    let mut repos: Vec<RepoRef> = Vec::new();

    for m in REPO_URL_RE.find_iter(readme) {
        let Ok(repo) = RepoRef::parse_url(m.as_str()) else {
            continue;
        };
        if repo.same_repo(master) {
            continue;
        }
        if !repos.iter().any(|r| r.same_repo(&repo)) {
            repos.push(repo);
        }
    }

    repos
}
