//! Core domain types for the contributor crawl.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ContribScoutError, Result};

/// Substrings that mark an email as machine-generated or placeholder.
const FAKE_EMAIL_PATTERNS: &[&str] = &[
    "noreply",
    "no-reply",
    "donotreply",
    "users.noreply.github.com",
    "localhost",
    "example.com",
    "test.com",
];

// ---------------------------------------------------------------------------
// RepoRef
// ---------------------------------------------------------------------------

/// A reference to a GitHub repository (`owner/name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoRef {
    /// Create a reference from owner and name parts.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse a strict GitHub repository URL: http(s), `github.com` host,
    /// exactly two non-empty path segments.
    pub fn parse_url(input: &str) -> Result<Self> {
        let url = Url::parse(input.trim())
            .map_err(|e| ContribScoutError::validation(format!("invalid URL '{input}': {e}")))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ContribScoutError::validation(format!(
                "not an http(s) URL: {input}"
            )));
        }
        if url.host_str() != Some("github.com") {
            return Err(ContribScoutError::validation(format!(
                "not a github.com URL: {input}"
            )));
        }

        let segments: Vec<&str> = url
            .path()
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            [owner, name] => Ok(Self::new(*owner, *name)),
            _ => Err(ContribScoutError::validation(format!(
                "expected github.com/<owner>/<repo>, got: {input}"
            ))),
        }
    }

    /// `true` if the input parses as a GitHub repository URL.
    pub fn is_valid_url(input: &str) -> bool {
        Self::parse_url(input).is_ok()
    }

    /// The `owner/name` form used by the GitHub API.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// The canonical https URL for this repository.
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }

    /// Case-insensitive equality on the `owner/name` pair.
    pub fn same_repo(&self, other: &RepoRef) -> bool {
        self.owner.eq_ignore_ascii_case(&other.owner) && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl std::str::FromStr for RepoRef {
    type Err = ContribScoutError;

    /// Parse the bare `owner/name` form.
    fn from_str(s: &str) -> Result<Self> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(*owner, *name))
            }
            _ => Err(ContribScoutError::validation(format!(
                "expected owner/name, got: {s}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ContributorProfile
// ---------------------------------------------------------------------------

/// Best-effort contact and profile data from `/users/{login}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributorProfile {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Public profile email (often absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Personal website/blog, normalized to carry a scheme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Free-form location string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Company affiliation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Twitter/X handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    /// Profile bio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Number of public repositories.
    #[serde(default)]
    pub public_repos: u64,
    /// Follower count.
    #[serde(default)]
    pub followers: u64,
    /// Following count.
    #[serde(default)]
    pub following: u64,
    /// Account creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ContributorProfile {
    /// Fill empty fields from `other` without clobbering present data.
    pub fn fill_from(&mut self, other: &ContributorProfile) {
        fn fill(slot: &mut Option<String>, value: &Option<String>) {
            if slot.as_deref().is_none_or(str::is_empty) {
                if let Some(v) = value {
                    if !v.is_empty() {
                        *slot = Some(v.clone());
                    }
                }
            }
        }

        fill(&mut self.name, &other.name);
        fill(&mut self.email, &other.email);
        fill(&mut self.website, &other.website);
        fill(&mut self.location, &other.location);
        fill(&mut self.company, &other.company);
        fill(&mut self.twitter, &other.twitter);
        fill(&mut self.bio, &other.bio);
        if self.public_repos == 0 {
            self.public_repos = other.public_repos;
        }
        if self.followers == 0 {
            self.followers = other.followers;
        }
        if self.following == 0 {
            self.following = other.following;
        }
        if self.created_at.is_none() {
            self.created_at = other.created_at;
        }
    }
}

// ---------------------------------------------------------------------------
// Contributor
// ---------------------------------------------------------------------------

/// An aggregated contributor record, unique by `login`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    /// GitHub login — the unique key.
    pub login: String,
    /// Profile page URL.
    pub profile_url: String,
    /// Contribution count per repository full name. Counts only ever grow
    /// across merges.
    pub repo_contributions: BTreeMap<String, u64>,
    /// Total contributions over the trailing year (latest observation).
    pub yearly_contributions: u64,
    /// Email recovered from commit metadata, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_email: Option<String>,
    /// Profile and contact data.
    #[serde(default)]
    pub profile: ContributorProfile,
}

impl Contributor {
    /// The highest contribution count across tracked repositories.
    pub fn best_repo_contributions(&self) -> u64 {
        self.repo_contributions.values().copied().max().unwrap_or(0)
    }

    /// `true` if the record carries any contact data worth exporting.
    pub fn has_contact_info(&self) -> bool {
        let some = |o: &Option<String>| o.as_deref().is_some_and(|s| !s.is_empty());
        some(&self.profile.email) || some(&self.commit_email) || some(&self.profile.website)
    }
}

// ---------------------------------------------------------------------------
// Email / URL helpers
// ---------------------------------------------------------------------------

/// Basic email validity: has `@`, a dotted domain, and is not a known
/// placeholder address.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() {
        return false;
    }

    let lower = email.to_lowercase();
    if FAKE_EMAIL_PATTERNS.iter().any(|p| lower.contains(p)) {
        return false;
    }

    match email.rsplit_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

/// Normalize a blog/website URL to carry a scheme.
pub fn clean_blog_url(blog: &str) -> Option<String> {
    let trimmed = blog.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("https://{trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_repo_url_strict() {
        let repo = RepoRef::parse_url("https://github.com/rust-lang/rust").unwrap();
        assert_eq!(repo.owner, "rust-lang");
        assert_eq!(repo.name, "rust");
        assert_eq!(repo.full_name(), "rust-lang/rust");

        // Trailing slash is tolerated
        let repo = RepoRef::parse_url("https://github.com/serde-rs/serde/").unwrap();
        assert_eq!(repo.name, "serde");
    }

    #[test]
    fn parse_repo_url_rejects_non_repos() {
        assert!(RepoRef::parse_url("https://gitlab.com/a/b").is_err());
        assert!(RepoRef::parse_url("ftp://github.com/a/b").is_err());
        assert!(RepoRef::parse_url("https://github.com/justowner").is_err());
        assert!(RepoRef::parse_url("https://github.com/a/b/tree/main").is_err());
        assert!(RepoRef::parse_url("nan").is_err());
        assert!(RepoRef::parse_url("").is_err());
    }

    #[test]
    fn repo_ref_from_str() {
        let repo: RepoRef = "tokio-rs/tokio".parse().unwrap();
        assert_eq!(repo.owner, "tokio-rs");
        assert!("tokio-rs".parse::<RepoRef>().is_err());
        assert!("a/b/c".parse::<RepoRef>().is_err());
    }

    #[test]
    fn same_repo_is_case_insensitive() {
        let a = RepoRef::new("Rust-Lang", "Rust");
        let b = RepoRef::new("rust-lang", "rust");
        assert!(a.same_repo(&b));
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("dev@example.org"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("dev@nodot"));
        assert!(!is_valid_email("12345+user@users.noreply.github.com"));
        assert!(!is_valid_email("build@NoReply.ci.org"));
        assert!(!is_valid_email("someone@test.com"));
    }

    #[test]
    fn blog_url_normalization() {
        assert_eq!(
            clean_blog_url("example.dev").as_deref(),
            Some("https://example.dev")
        );
        assert_eq!(
            clean_blog_url("http://blog.example.dev").as_deref(),
            Some("http://blog.example.dev")
        );
        assert_eq!(clean_blog_url("   "), None);
    }

    #[test]
    fn profile_fill_keeps_existing() {
        let mut a = ContributorProfile {
            email: Some("a@example.org".into()),
            followers: 10,
            ..Default::default()
        };
        let b = ContributorProfile {
            email: Some("b@example.org".into()),
            location: Some("Berlin".into()),
            followers: 99,
            ..Default::default()
        };

        a.fill_from(&b);
        assert_eq!(a.email.as_deref(), Some("a@example.org"));
        assert_eq!(a.location.as_deref(), Some("Berlin"));
        assert_eq!(a.followers, 10);
    }

    #[test]
    fn contributor_serialization_roundtrip() {
        let mut repo_contributions = BTreeMap::new();
        repo_contributions.insert("rust-lang/rust".to_string(), 250);

        let contributor = Contributor {
            login: "octocat".into(),
            profile_url: "https://github.com/octocat".into(),
            repo_contributions,
            yearly_contributions: 812,
            commit_email: Some("octo@example.org".into()),
            profile: ContributorProfile::default(),
        };

        let json = serde_json::to_string(&contributor).expect("serialize");
        let parsed: Contributor = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, contributor);
        assert_eq!(parsed.best_repo_contributions(), 250);
        assert!(parsed.has_contact_info());
    }
}
