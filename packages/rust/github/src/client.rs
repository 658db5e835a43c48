//! GitHub API client for REST and GraphQL endpoints.
//!
//! Error handling is best-effort throughout: endpoints that enrich a record
//! degrade to empty data on failure, and only rate-limit exhaustion triggers
//! a wait-and-retry.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use contribscout_shared::{
    ContribScoutError, ContributorProfile, GitHubConfig, RateLimitConfig, RepoRef, Result,
    clean_blog_url, is_valid_email,
};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("contribscout/", env!("CARGO_PKG_VERSION"));

/// REST media type.
const ACCEPT_JSON: &str = "application/vnd.github.v3+json";

/// Media type that returns README content as-is, skipping the JSON envelope.
const ACCEPT_RAW: &str = "application/vnd.github.raw";

/// Page size for paginated endpoints.
const PER_PAGE: u32 = 100;

/// How many pages of `/users/{login}/events` the fallback inspects.
const MAX_EVENT_PAGES: u32 = 3;

/// How many of the user's oldest repositories the email hunt checks.
const MAX_OLD_REPOS: usize = 10;

/// How many recently-updated repositories the email hunt checks afterwards.
const MAX_RECENT_REPOS: usize = 5;

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// One entry from `/repos/{owner}/{repo}/contributors`.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoContributor {
    /// Contributor login.
    pub login: String,
    /// Commit count within this repository.
    pub contributions: u64,
    /// Profile page URL.
    #[serde(default)]
    pub html_url: String,
}

impl RepoContributor {
    /// Profile URL, synthesized from the login when the API omits it.
    pub fn profile_url(&self) -> String {
        if self.html_url.is_empty() {
            format!("https://github.com/{}", self.login)
        } else {
            self.html_url.clone()
        }
    }
}

/// `/users/{login}` payload, mapped onto [`ContributorProfile`].
#[derive(Debug, Deserialize)]
struct UserDto {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    blog: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    twitter_username: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    public_repos: u64,
    #[serde(default)]
    followers: u64,
    #[serde(default)]
    following: u64,
    #[serde(default)]
    created_at: Option<chrono::DateTime<Utc>>,
}

impl From<UserDto> for ContributorProfile {
    fn from(dto: UserDto) -> Self {
        Self {
            name: dto.name,
            email: dto.email,
            website: dto.blog.as_deref().and_then(clean_blog_url),
            location: dto.location,
            company: dto.company,
            twitter: dto.twitter_username,
            bio: dto.bio,
            public_repos: dto.public_repos,
            followers: dto.followers,
            following: dto.following,
            created_at: dto.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// GitHubClient
// ---------------------------------------------------------------------------

/// Client for the GitHub REST and GraphQL APIs.
pub struct GitHubClient {
    http: Client,
    api_base: String,
    graphql_url: String,
    web_base: String,
    token: Option<String>,
    rate: RateLimitConfig,
}

impl GitHubClient {
    /// Create a client from endpoint config, rate-limit settings, and an
    /// optional token.
    pub fn new(
        github: &GitHubConfig,
        rate: &RateLimitConfig,
        token: Option<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ContribScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: github.api_base.trim_end_matches('/').to_string(),
            graphql_url: github.graphql_url.clone(),
            web_base: github.web_base.trim_end_matches('/').to_string(),
            token,
            rate: rate.clone(),
        })
    }

    /// `true` when an API token is attached to requests.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// The rate-limit settings this client was built with.
    pub fn rate_limits(&self) -> &RateLimitConfig {
        &self.rate
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn web_base(&self) -> &str {
        &self.web_base
    }

    /// GET a REST endpoint, waiting out rate-limit exhaustion.
    ///
    /// A 403 whose body reports `API rate limit exceeded` sleeps
    /// `backoff_secs` and retries the same request; every other response is
    /// returned to the caller for status handling.
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        loop {
            let mut request = self.http.get(url).header(ACCEPT, ACCEPT_JSON);
            if let Some(token) = &self.token {
                request = request.header(AUTHORIZATION, format!("token {token}"));
            }
            if !query.is_empty() {
                request = request.query(query);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ContribScoutError::Network(format!("{url}: {e}")))?;

            if response.status().as_u16() == 403 {
                let body = response.text().await.unwrap_or_default();
                if is_rate_limit_message(&body) {
                    warn!(
                        url,
                        backoff_secs = self.rate.backoff_secs,
                        "rate limit exceeded, waiting before retry"
                    );
                    tokio::time::sleep(Duration::from_secs(self.rate.backoff_secs)).await;
                    continue;
                }
                return Err(ContribScoutError::api(url, 403));
            }

            return Ok(response);
        }
    }

    /// GET a REST endpoint and decode the JSON body. Non-success statuses
    /// become [`ContribScoutError::Api`].
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let response = self.get(url, query).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ContribScoutError::api(url, status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| ContribScoutError::parse(format!("{url}: {e}")))
    }

    // -----------------------------------------------------------------------
    // Contributors
    // -----------------------------------------------------------------------

    /// All contributors of a repository with their contribution counts,
    /// paginated until an empty page. A failing page ends pagination with
    /// what was collected so far.
    #[instrument(skip(self), fields(repo = %repo))]
    pub async fn repo_contributors(&self, repo: &RepoRef) -> Result<Vec<RepoContributor>> {
        let url = format!("{}/repos/{}/contributors", self.api_base, repo.full_name());
        let mut contributors: Vec<RepoContributor> = Vec::new();
        let mut page: u32 = 1;

        loop {
            let query = [
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            let response = self.get(&url, &query).await?;
            let status = response.status();

            if !status.is_success() {
                warn!(repo = %repo, %status, "error fetching contributors, stopping pagination");
                break;
            }

            let batch: Vec<RepoContributor> = response
                .json()
                .await
                .map_err(|e| ContribScoutError::parse(format!("{url}: {e}")))?;

            if batch.is_empty() {
                break;
            }

            contributors.extend(batch);
            page += 1;

            self.pause(self.rate.request_delay_ms).await;
        }

        debug!(repo = %repo, count = contributors.len(), "contributors fetched");
        Ok(contributors)
    }

    // -----------------------------------------------------------------------
    // Yearly contributions
    // -----------------------------------------------------------------------

    /// Total contributions over the trailing 365 days — the number shown on
    /// the profile page. Uses GraphQL when a token is available, otherwise
    /// (or on any GraphQL failure) falls back to counting push events.
    #[instrument(skip(self))]
    pub async fn yearly_contributions(&self, login: &str) -> Result<u64> {
        if self.token.is_none() {
            warn!(login, "no token, using events fallback for yearly contributions");
            return self.commits_from_events(login).await;
        }

        match self.yearly_contributions_graphql(login).await {
            Ok(total) => Ok(total),
            Err(e) => {
                warn!(login, error = %e, "GraphQL failed, using events fallback");
                self.commits_from_events(login).await
            }
        }
    }

    async fn yearly_contributions_graphql(&self, login: &str) -> Result<u64> {
        let to = Utc::now();
        let from = to - chrono::Duration::days(365);

        let query = r#"
            query($login: String!, $from: DateTime!, $to: DateTime!) {
                user(login: $login) {
                    contributionsCollection(from: $from, to: $to) {
                        contributionCalendar {
                            totalContributions
                        }
                        totalCommitContributions
                        totalIssueContributions
                        totalPullRequestContributions
                        totalPullRequestReviewContributions
                    }
                }
            }
        "#;

        let body = serde_json::json!({
            "query": query,
            "variables": {
                "login": login,
                "from": from.to_rfc3339_opts(SecondsFormat::Secs, true),
                "to": to.to_rfc3339_opts(SecondsFormat::Secs, true),
            }
        });

        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ContribScoutError::config("GraphQL requires a token"))?;

        let response = self
            .http
            .post(&self.graphql_url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ContribScoutError::Network(format!("{}: {e}", self.graphql_url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContribScoutError::api(&self.graphql_url, status.as_u16()));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ContribScoutError::parse(format!("graphql response: {e}")))?;

        if let Some(errors) = data.get("errors") {
            return Err(ContribScoutError::parse(format!(
                "graphql errors for {login}: {errors}"
            )));
        }

        let Some(user) = data.pointer("/data/user").filter(|u| !u.is_null()) else {
            warn!(login, "no user data in GraphQL response");
            return Ok(0);
        };

        let collection = &user["contributionsCollection"];
        let total = collection
            .pointer("/contributionCalendar/totalContributions")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        debug!(
            login,
            total,
            commits = collection["totalCommitContributions"].as_u64().unwrap_or(0),
            issues = collection["totalIssueContributions"].as_u64().unwrap_or(0),
            pull_requests = collection["totalPullRequestContributions"].as_u64().unwrap_or(0),
            reviews = collection["totalPullRequestReviewContributions"].as_u64().unwrap_or(0),
            "contribution breakdown"
        );

        Ok(total)
    }

    /// Fallback contribution count: commits in `PushEvent`s from the user's
    /// recent public events, bounded to the trailing year. Events are
    /// chronological, so counting stops at the first one past the cutoff.
    pub async fn commits_from_events(&self, login: &str) -> Result<u64> {
        let url = format!("{}/users/{login}/events", self.api_base);
        let cutoff = Utc::now() - chrono::Duration::days(365);
        let mut total: u64 = 0;

        for page in 1..=MAX_EVENT_PAGES {
            let query = [
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            let response = self.get(&url, &query).await?;
            if !response.status().is_success() {
                break;
            }

            let events: Vec<Value> = response
                .json()
                .await
                .map_err(|e| ContribScoutError::parse(format!("{url}: {e}")))?;
            if events.is_empty() {
                break;
            }

            for event in &events {
                if event["type"].as_str() != Some("PushEvent") {
                    continue;
                }
                let created_at = event["created_at"]
                    .as_str()
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok());
                match created_at {
                    Some(ts) if ts >= cutoff => {
                        let commits = event
                            .pointer("/payload/commits")
                            .and_then(Value::as_array)
                            .map(Vec::len)
                            .unwrap_or(0);
                        total += commits as u64;
                    }
                    _ => return Ok(total),
                }
            }

            self.pause(self.rate.request_delay_ms).await;
        }

        Ok(total)
    }

    // -----------------------------------------------------------------------
    // Profile
    // -----------------------------------------------------------------------

    /// Profile data from `/users/{login}`. Failures degrade to an empty
    /// profile.
    #[instrument(skip(self))]
    pub async fn user_profile(&self, login: &str) -> Result<ContributorProfile> {
        let url = format!("{}/users/{login}", self.api_base);
        match self.get_json(&url, &[]).await {
            Ok(value) => {
                let dto: UserDto = serde_json::from_value(value)
                    .map_err(|e| ContribScoutError::parse(format!("{url}: {e}")))?;
                Ok(dto.into())
            }
            Err(e) => {
                warn!(login, error = %e, "error fetching profile");
                Ok(ContributorProfile::default())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Commit email
    // -----------------------------------------------------------------------

    /// Hunt for a usable commit email in the user's own repositories:
    /// oldest-created first (early commits are more likely to carry a real
    /// address), then a handful of recently-updated ones.
    #[instrument(skip(self))]
    pub async fn commit_email_from_own_repos(&self, login: &str) -> Result<Option<String>> {
        let url = format!("{}/users/{login}/repos", self.api_base);

        let oldest = [
            ("sort", "created".to_string()),
            ("direction", "asc".to_string()),
            ("per_page", "30".to_string()),
            ("type", "all".to_string()),
        ];
        if let Some(email) = self
            .email_from_repo_listing(login, &url, &oldest, MAX_OLD_REPOS)
            .await?
        {
            return Ok(Some(email));
        }

        debug!(login, "no email in oldest repos, trying recently updated");
        let recent = [
            ("sort", "updated".to_string()),
            ("direction", "desc".to_string()),
            ("per_page", "15".to_string()),
            ("type", "owner".to_string()),
        ];
        self.email_from_repo_listing(login, &url, &recent, MAX_RECENT_REPOS)
            .await
    }

    async fn email_from_repo_listing(
        &self,
        login: &str,
        url: &str,
        query: &[(&str, String)],
        limit: usize,
    ) -> Result<Option<String>> {
        let repos = match self.get_json(url, query).await {
            Ok(Value::Array(repos)) => repos,
            Ok(_) => return Ok(None),
            Err(e) => {
                warn!(login, error = %e, "could not list repositories");
                return Ok(None);
            }
        };

        for repo_value in repos.iter().take(limit) {
            let Some(full_name) = repo_value["full_name"].as_str() else {
                continue;
            };
            let Ok(repo) = full_name.parse::<RepoRef>() else {
                continue;
            };

            if let Some(email) = self.email_from_repo_commits(login, &repo).await? {
                debug!(login, repo = %repo, email, "found commit email");
                return Ok(Some(email));
            }

            self.pause(self.rate.request_delay_ms).await;
        }

        Ok(None)
    }

    /// Extract a valid author email from the user's commits in one
    /// repository, oldest commit first.
    pub async fn email_from_repo_commits(
        &self,
        login: &str,
        repo: &RepoRef,
    ) -> Result<Option<String>> {
        let url = format!("{}/repos/{}/commits", self.api_base, repo.full_name());
        let query = [
            ("author", login.to_string()),
            ("per_page", "10".to_string()),
        ];

        let commits = match self.get_json(&url, &query).await {
            Ok(Value::Array(commits)) => commits,
            _ => return Ok(None),
        };

        // The API returns newest first; old commits are more likely to
        // predate GitHub's noreply rewriting.
        for commit in commits.iter().rev() {
            if let Some(email) = commit.pointer("/commit/author/email").and_then(Value::as_str) {
                if is_valid_email(email) {
                    return Ok(Some(email.to_string()));
                }
            }
        }

        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Repository metadata
    // -----------------------------------------------------------------------

    /// Stargazer count, or `None` when the repository is missing.
    pub async fn repo_stars(&self, repo: &RepoRef) -> Result<Option<u64>> {
        let url = format!("{}/repos/{}", self.api_base, repo.full_name());
        match self.get_json(&url, &[]).await {
            Ok(value) => Ok(value["stargazers_count"].as_u64()),
            Err(e) => {
                debug!(repo = %repo, error = %e, "error fetching repository");
                Ok(None)
            }
        }
    }

    /// README content via the raw media type.
    #[instrument(skip(self), fields(repo = %repo))]
    pub async fn repo_readme(&self, repo: &RepoRef) -> Result<String> {
        let url = format!("{}/repos/{}/readme", self.api_base, repo.full_name());

        loop {
            let mut request = self.http.get(&url).header(ACCEPT, ACCEPT_RAW);
            if let Some(token) = &self.token {
                request = request.header(AUTHORIZATION, format!("token {token}"));
            }

            let response = request
                .send()
                .await
                .map_err(|e| ContribScoutError::Network(format!("{url}: {e}")))?;

            let status = response.status();
            if status.as_u16() == 403 {
                let body = response.text().await.unwrap_or_default();
                if is_rate_limit_message(&body) {
                    warn!(
                        repo = %repo,
                        backoff_secs = self.rate.backoff_secs,
                        "rate limit exceeded while reading README, waiting"
                    );
                    tokio::time::sleep(Duration::from_secs(self.rate.backoff_secs)).await;
                    continue;
                }
                return Err(ContribScoutError::api(&url, 403));
            }
            if !status.is_success() {
                return Err(ContribScoutError::api(&url, status.as_u16()));
            }

            return response
                .text()
                .await
                .map_err(|e| ContribScoutError::Network(format!("{url}: {e}")));
        }
    }

    async fn pause(&self, millis: u64) {
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}

/// `true` when a 403 body carries GitHub's rate-limit message.
fn is_rate_limit_message(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(|m| m.contains("API rate limit exceeded")))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer, token: Option<&str>) -> GitHubClient {
        let github = GitHubConfig {
            api_base: server.uri(),
            graphql_url: format!("{}/graphql", server.uri()),
            web_base: server.uri(),
            token_env: "UNUSED".into(),
        };
        let rate = RateLimitConfig {
            request_delay_ms: 0,
            contributor_delay_ms: 0,
            repo_delay_ms: 0,
            backoff_secs: 0,
        };
        GitHubClient::new(&github, &rate, token.map(String::from)).unwrap()
    }

    #[test]
    fn rate_limit_message_detection() {
        assert!(is_rate_limit_message(
            r#"{"message": "API rate limit exceeded for 1.2.3.4."}"#
        ));
        assert!(!is_rate_limit_message(r#"{"message": "Forbidden"}"#));
        assert!(!is_rate_limit_message("not json"));
    }

    #[tokio::test]
    async fn contributors_paginate_until_empty() {
        let server = MockServer::start().await;

        let page1: Vec<Value> = (0..100)
            .map(|i| {
                serde_json::json!({
                    "login": format!("user{i}"),
                    "contributions": 500 - i,
                    "html_url": format!("https://github.com/user{i}"),
                })
            })
            .collect();
        let page2 = serde_json::json!([
            {"login": "tail", "contributions": 3, "html_url": "https://github.com/tail"}
        ]);

        Mock::given(method("GET"))
            .and(path("/repos/acme/widget/contributors"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&page1))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widget/contributors"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&page2))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widget/contributors"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = test_client(&server, None);
        let repo = RepoRef::new("acme", "widget");
        let contributors = client.repo_contributors(&repo).await.unwrap();

        assert_eq!(contributors.len(), 101);
        assert_eq!(contributors[0].login, "user0");
        assert_eq!(contributors[100].login, "tail");
    }

    #[tokio::test]
    async fn contributors_error_page_keeps_partial_results() {
        let server = MockServer::start().await;

        let page1 = serde_json::json!(
            (0..100)
                .map(|i| serde_json::json!({"login": format!("u{i}"), "contributions": 10}))
                .collect::<Vec<_>>()
        );

        Mock::given(method("GET"))
            .and(path("/repos/acme/widget/contributors"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&page1))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widget/contributors"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = test_client(&server, None);
        let contributors = client
            .repo_contributors(&RepoRef::new("acme", "widget"))
            .await
            .unwrap();
        assert_eq!(contributors.len(), 100);
    }

    #[tokio::test]
    async fn rate_limited_request_retries_after_backoff() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/widget"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "message": "API rate limit exceeded for 1.2.3.4."
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widget"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "stargazers_count": 42
            })))
            .mount(&server)
            .await;

        let client = test_client(&server, None);
        let stars = client.repo_stars(&RepoRef::new("acme", "widget")).await.unwrap();
        assert_eq!(stars, Some(42));
    }

    #[tokio::test]
    async fn yearly_contributions_via_graphql() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(serde_json::json!({
                "variables": {"login": "octocat"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "user": {
                        "contributionsCollection": {
                            "contributionCalendar": {"totalContributions": 1234},
                            "totalCommitContributions": 900,
                            "totalIssueContributions": 100,
                            "totalPullRequestContributions": 200,
                            "totalPullRequestReviewContributions": 34
                        }
                    }
                }
            })))
            .mount(&server)
            .await;

        let client = test_client(&server, Some("test-token"));
        let total = client.yearly_contributions("octocat").await.unwrap();
        assert_eq!(total, 1234);
    }

    #[tokio::test]
    async fn graphql_errors_fall_back_to_events() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "errors": [{"message": "Something went wrong"}]
            })))
            .mount(&server)
            .await;

        let recent = Utc::now() - chrono::Duration::days(2);
        let events = serde_json::json!([
            {
                "type": "PushEvent",
                "created_at": recent.to_rfc3339(),
                "payload": {"commits": [{"sha": "a"}, {"sha": "b"}, {"sha": "c"}]}
            }
        ]);
        Mock::given(method("GET"))
            .and(path("/users/octocat/events"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&events))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/octocat/events"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = test_client(&server, Some("test-token"));
        let total = client.yearly_contributions("octocat").await.unwrap();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn events_fallback_stops_at_cutoff() {
        let server = MockServer::start().await;

        let recent = Utc::now() - chrono::Duration::days(10);
        let ancient = Utc::now() - chrono::Duration::days(400);
        let events = serde_json::json!([
            {
                "type": "PushEvent",
                "created_at": recent.to_rfc3339(),
                "payload": {"commits": [{"sha": "a"}, {"sha": "b"}]}
            },
            {
                "type": "WatchEvent",
                "created_at": recent.to_rfc3339(),
                "payload": {}
            },
            {
                "type": "PushEvent",
                "created_at": ancient.to_rfc3339(),
                "payload": {"commits": [{"sha": "c"}]}
            }
        ]);

        Mock::given(method("GET"))
            .and(path("/users/nobody/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&events))
            .mount(&server)
            .await;

        let client = test_client(&server, None);
        // No token → straight to the fallback; the ancient push ends counting.
        let total = client.yearly_contributions("nobody").await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn profile_maps_and_cleans_blog() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/octocat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "login": "octocat",
                "name": "The Octocat",
                "email": null,
                "blog": "octo.example.dev",
                "location": "San Francisco",
                "company": "@github",
                "twitter_username": "octo",
                "bio": "Mascot",
                "public_repos": 8,
                "followers": 4000,
                "following": 9,
                "created_at": "2011-01-25T18:44:36Z"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server, None);
        let profile = client.user_profile("octocat").await.unwrap();

        assert_eq!(profile.name.as_deref(), Some("The Octocat"));
        assert_eq!(profile.website.as_deref(), Some("https://octo.example.dev"));
        assert_eq!(profile.followers, 4000);
        assert!(profile.email.is_none());
    }

    #[tokio::test]
    async fn profile_fetch_error_degrades_to_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_client(&server, None);
        let profile = client.user_profile("ghost").await.unwrap();
        assert_eq!(profile, ContributorProfile::default());
    }

    #[tokio::test]
    async fn commit_email_prefers_oldest_valid() {
        let server = MockServer::start().await;

        // Newest first, as the API returns them. The newest carries a
        // noreply address; the oldest has the real one.
        let commits = serde_json::json!([
            {"sha": "new", "commit": {"author": {"email": "1+dev@users.noreply.github.com"}}},
            {"sha": "mid", "commit": {"author": {"email": "dev@real.example.org"}}},
            {"sha": "old", "commit": {"author": {"email": "dev@oldest.example.org"}}}
        ]);

        Mock::given(method("GET"))
            .and(path("/repos/dev/project/commits"))
            .and(query_param("author", "dev"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&commits))
            .mount(&server)
            .await;

        let client = test_client(&server, None);
        let email = client
            .email_from_repo_commits("dev", &RepoRef::new("dev", "project"))
            .await
            .unwrap();
        assert_eq!(email.as_deref(), Some("dev@oldest.example.org"));
    }

    #[tokio::test]
    async fn commit_email_hunt_walks_own_repos() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/dev/repos"))
            .and(query_param("sort", "created"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"full_name": "dev/first"},
                {"full_name": "dev/second"}
            ])))
            .mount(&server)
            .await;

        // First repo has only noreply commits
        Mock::given(method("GET"))
            .and(path("/repos/dev/first/commits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"commit": {"author": {"email": "x@users.noreply.github.com"}}}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/dev/second/commits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"commit": {"author": {"email": "dev@example.org"}}}
            ])))
            .mount(&server)
            .await;

        let client = test_client(&server, None);
        let email = client.commit_email_from_own_repos("dev").await.unwrap();
        assert_eq!(email.as_deref(), Some("dev@example.org"));
    }

    #[tokio::test]
    async fn readme_uses_raw_media_type() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/awesome/readme"))
            .and(header("accept", ACCEPT_RAW))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("# Awesome\n\n- https://github.com/rust-lang/rust\n"),
            )
            .mount(&server)
            .await;

        let client = test_client(&server, None);
        let readme = client.repo_readme(&RepoRef::new("acme", "awesome")).await.unwrap();
        assert!(readme.starts_with("# Awesome"));
    }

    #[tokio::test]
    async fn missing_repo_has_no_stars() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_client(&server, None);
        let stars = client.repo_stars(&RepoRef::new("acme", "gone")).await.unwrap();
        assert_eq!(stars, None);
    }
}
