//! The contributor roster: merge, dedupe, and filter semantics.
//!
//! The roster is the one place where correctness is non-trivial. Records
//! from different repositories and different runs meet here, and the merge
//! rules keep aggregation stable:
//!
//! - one record per login;
//! - per-repo counts only ever grow (max-merge), so reprocessing a
//!   repository never double counts;
//! - yearly contributions take the latest observation (the measurement
//!   window moves between runs);
//! - contact fields fill empty slots without clobbering present data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use contribscout_shared::{Contributor, ContributorProfile, CrawlCriteria, RepoRef, is_valid_email};

// ---------------------------------------------------------------------------
// ContributorSighting
// ---------------------------------------------------------------------------

/// One qualified observation of a contributor within a repository.
#[derive(Debug, Clone)]
pub struct ContributorSighting {
    /// The repository the contributor was seen in.
    pub repo: RepoRef,
    /// Contributor login.
    pub login: String,
    /// Profile page URL.
    pub profile_url: String,
    /// Contribution count within `repo`.
    pub repo_contributions: u64,
    /// Yearly contribution total at observation time.
    pub yearly_contributions: u64,
    /// Commit email recovered during enrichment, if any.
    pub commit_email: Option<String>,
    /// Profile data at observation time.
    pub profile: ContributorProfile,
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Deduplicated contributor set, keyed by login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    contributors: BTreeMap<String, Contributor>,
}

impl Roster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unique contributors.
    pub fn len(&self) -> usize {
        self.contributors.len()
    }

    /// `true` when no contributor has been merged yet.
    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty()
    }

    /// Look up a contributor by login.
    pub fn get(&self, login: &str) -> Option<&Contributor> {
        self.contributors.get(login)
    }

    /// Iterate contributors in login order.
    pub fn contributors(&self) -> impl Iterator<Item = &Contributor> {
        self.contributors.values()
    }

    /// Clone the roster into a flat vector, login-ordered.
    pub fn to_vec(&self) -> Vec<Contributor> {
        self.contributors.values().cloned().collect()
    }

    /// Merge a repository sighting into the roster.
    pub fn merge_sighting(&mut self, sighting: ContributorSighting) {
        let repo_name = sighting.repo.full_name();

        let entry = self
            .contributors
            .entry(sighting.login.clone())
            .or_insert_with(|| Contributor {
                login: sighting.login.clone(),
                profile_url: sighting.profile_url.clone(),
                repo_contributions: BTreeMap::new(),
                yearly_contributions: 0,
                commit_email: None,
                profile: ContributorProfile::default(),
            });

        entry
            .repo_contributions
            .entry(repo_name)
            .and_modify(|count| *count = (*count).max(sighting.repo_contributions))
            .or_insert(sighting.repo_contributions);

        entry.yearly_contributions = sighting.yearly_contributions;

        if entry.commit_email.as_deref().is_none_or(str::is_empty) {
            if let Some(email) = &sighting.commit_email {
                if is_valid_email(email) {
                    entry.commit_email = Some(email.clone());
                }
            }
        }

        entry.profile.fill_from(&sighting.profile);
    }

    /// Union with another roster; `other` is treated as the newer
    /// observation set.
    pub fn merge(&mut self, other: Roster) {
        for (login, incoming) in other.contributors {
            match self.contributors.get_mut(&login) {
                Some(existing) => {
                    for (repo, count) in incoming.repo_contributions {
                        existing
                            .repo_contributions
                            .entry(repo)
                            .and_modify(|c| *c = (*c).max(count))
                            .or_insert(count);
                    }
                    existing.yearly_contributions = incoming.yearly_contributions;
                    if existing.commit_email.as_deref().is_none_or(str::is_empty) {
                        existing.commit_email = incoming.commit_email;
                    }
                    existing.profile.fill_from(&incoming.profile);
                }
                None => {
                    self.contributors.insert(login, incoming);
                }
            }
        }
    }

    /// Contributors meeting both thresholds, in login order.
    pub fn qualified(&self, criteria: &CrawlCriteria) -> Vec<&Contributor> {
        self.contributors
            .values()
            .filter(|c| {
                c.best_repo_contributions() >= criteria.min_repo_contributions
                    && c.yearly_contributions >= criteria.min_yearly_contributions
            })
            .collect()
    }

    /// Qualified-contributor count per repository, for run reporting.
    pub fn qualified_by_repo(&self, criteria: &CrawlCriteria) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for contributor in self.qualified(criteria) {
            for (repo, count) in &contributor.repo_contributions {
                if *count >= criteria.min_repo_contributions {
                    *counts.entry(repo.clone()).or_default() += 1;
                }
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sighting(repo: &str, login: &str, count: u64, yearly: u64) -> ContributorSighting {
        ContributorSighting {
            repo: repo.parse().unwrap(),
            login: login.into(),
            profile_url: format!("https://github.com/{login}"),
            repo_contributions: count,
            yearly_contributions: yearly,
            commit_email: None,
            profile: ContributorProfile::default(),
        }
    }

    fn criteria(min_repo: u64, min_yearly: u64) -> CrawlCriteria {
        CrawlCriteria {
            min_repo_contributions: min_repo,
            min_yearly_contributions: min_yearly,
            min_stars: 0,
        }
    }

    #[test]
    fn reprocessing_same_repo_is_idempotent() {
        let mut roster = Roster::new();

        roster.merge_sighting(sighting("acme/widget", "alice", 150, 600));
        roster.merge_sighting(sighting("acme/widget", "alice", 150, 600));

        assert_eq!(roster.len(), 1);
        let alice = roster.get("alice").unwrap();
        assert_eq!(alice.repo_contributions.len(), 1);
        assert_eq!(alice.repo_contributions["acme/widget"], 150);
    }

    #[test]
    fn per_repo_counts_are_monotonic() {
        let mut roster = Roster::new();

        roster.merge_sighting(sighting("acme/widget", "alice", 150, 600));
        // A later run observes a higher count: it sticks.
        roster.merge_sighting(sighting("acme/widget", "alice", 170, 600));
        // A stale lower count never shrinks the record.
        roster.merge_sighting(sighting("acme/widget", "alice", 90, 600));

        assert_eq!(roster.get("alice").unwrap().repo_contributions["acme/widget"], 170);
    }

    #[test]
    fn sightings_across_repos_accumulate() {
        let mut roster = Roster::new();

        roster.merge_sighting(sighting("acme/widget", "alice", 150, 600));
        roster.merge_sighting(sighting("acme/gadget", "alice", 120, 650));
        roster.merge_sighting(sighting("acme/widget", "bob", 110, 500));

        assert_eq!(roster.len(), 2);
        let alice = roster.get("alice").unwrap();
        assert_eq!(alice.repo_contributions.len(), 2);
        assert_eq!(alice.best_repo_contributions(), 150);
        // Latest yearly observation wins.
        assert_eq!(alice.yearly_contributions, 650);
    }

    #[test]
    fn commit_email_fills_once_and_rejects_fakes() {
        let mut roster = Roster::new();

        let mut s = sighting("acme/widget", "alice", 150, 600);
        s.commit_email = Some("x@users.noreply.github.com".into());
        roster.merge_sighting(s);
        assert!(roster.get("alice").unwrap().commit_email.is_none());

        let mut s = sighting("acme/widget", "alice", 150, 600);
        s.commit_email = Some("alice@example.org".into());
        roster.merge_sighting(s);

        let mut s = sighting("acme/gadget", "alice", 100, 600);
        s.commit_email = Some("other@example.org".into());
        roster.merge_sighting(s);

        assert_eq!(
            roster.get("alice").unwrap().commit_email.as_deref(),
            Some("alice@example.org")
        );
    }

    #[test]
    fn thresholds_filter_contributors() {
        let mut roster = Roster::new();

        roster.merge_sighting(sighting("acme/widget", "alice", 150, 600));
        roster.merge_sighting(sighting("acme/widget", "bob", 150, 200)); // yearly too low
        roster.merge_sighting(sighting("acme/widget", "carol", 50, 900)); // repo too low

        let qualified = roster.qualified(&criteria(100, 400));
        assert_eq!(qualified.len(), 1);
        assert_eq!(qualified[0].login, "alice");
    }

    #[test]
    fn qualification_uses_best_repo_count() {
        let mut roster = Roster::new();

        roster.merge_sighting(sighting("acme/widget", "alice", 40, 600));
        roster.merge_sighting(sighting("acme/gadget", "alice", 120, 600));

        let qualified = roster.qualified(&criteria(100, 400));
        assert_eq!(qualified.len(), 1);
    }

    #[test]
    fn run_level_merge_is_stable() {
        let mut first = Roster::new();
        first.merge_sighting(sighting("acme/widget", "alice", 150, 600));
        first.merge_sighting(sighting("acme/widget", "bob", 120, 450));

        let mut second = Roster::new();
        second.merge_sighting(sighting("acme/widget", "alice", 150, 640));
        second.merge_sighting(sighting("acme/gadget", "carol", 200, 800));

        first.merge(second);

        assert_eq!(first.len(), 3);
        let alice = first.get("alice").unwrap();
        assert_eq!(alice.repo_contributions["acme/widget"], 150);
        assert_eq!(alice.yearly_contributions, 640);
    }

    #[test]
    fn qualified_by_repo_counts() {
        let mut roster = Roster::new();
        roster.merge_sighting(sighting("acme/widget", "alice", 150, 600));
        roster.merge_sighting(sighting("acme/widget", "bob", 110, 500));
        roster.merge_sighting(sighting("acme/gadget", "alice", 30, 600));

        let by_repo = roster.qualified_by_repo(&criteria(100, 400));
        assert_eq!(by_repo["acme/widget"], 2);
        // alice's gadget count is below the repo threshold
        assert!(!by_repo.contains_key("acme/gadget"));
    }
}
