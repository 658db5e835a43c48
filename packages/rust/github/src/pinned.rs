//! Pinned-repository scraping from GitHub profile pages.
//!
//! There is no API endpoint for pinned repositories, so this fetches the
//! profile HTML and pulls repository links out of the pinned-items section.
//! Used only as a fallback source for the commit-email hunt.

use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

use contribscout_shared::{ContribScoutError, RepoRef, Result};

use crate::client::GitHubClient;

/// GitHub shows at most six pinned repositories.
const MAX_PINNED: usize = 6;

/// A browser-like User-Agent; the profile page serves a stripped layout to
/// unknown agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

impl GitHubClient {
    /// Scrape the user's pinned repositories from their profile page.
    #[instrument(skip(self))]
    pub async fn pinned_repos(&self, login: &str) -> Result<Vec<RepoRef>> {
        let url = format!("{}/{login}", self.web_base());

        let response = self
            .http()
            .get(&url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(|e| ContribScoutError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(login, %status, "could not fetch profile page");
            return Ok(Vec::new());
        }

        let body = response
            .text()
            .await
            .map_err(|e| ContribScoutError::Network(format!("{url}: {e}")))?;

        let repos = extract_pinned(&body);
        debug!(login, count = repos.len(), "pinned repositories scraped");
        Ok(repos)
    }
}

/// Pull `owner/name` pairs out of the pinned-items markup.
fn extract_pinned(html: &str) -> Vec<RepoRef> {
    let doc = Html::parse_document(html);

    let item_sel = Selector::parse(".pinned-item-list-item").unwrap();
    let fallback_sel = Selector::parse("article.Box-row").unwrap();
    let link_sel = Selector::parse("a[href]").unwrap();

    let mut items: Vec<_> = doc.select(&item_sel).collect();
    if items.is_empty() {
        items = doc.select(&fallback_sel).collect();
    }

    let mut repos: Vec<RepoRef> = Vec::new();

    for item in items {
        for link in item.select(&link_sel) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if href.contains("/tree/") || href.contains("/blob/") {
                continue;
            }

            let segments: Vec<&str> = href
                .trim_start_matches('/')
                .split('/')
                .filter(|s| !s.is_empty())
                .collect();

            if let [owner, name] = segments.as_slice() {
                let repo = RepoRef::new(*owner, *name);
                if !repos.contains(&repo) {
                    repos.push(repo);
                }
                break;
            }
        }

        if repos.len() >= MAX_PINNED {
            break;
        }
    }

    repos
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use contribscout_shared::{GitHubConfig, RateLimitConfig};

    const PROFILE_HTML: &str = r#"
        <html><body>
          <div class="js-pinned-items-reorder-container">
            <div class="pinned-item-list-item">
              <a href="/octocat/hello-world" class="text-bold">hello-world</a>
            </div>
            <div class="pinned-item-list-item">
              <a href="/octocat/hello-world/tree/main">ignored</a>
              <a href="/partner/shared-lib" class="text-bold">shared-lib</a>
            </div>
            <div class="pinned-item-list-item">
              <a href="/octocat/hello-world">duplicate</a>
            </div>
          </div>
        </body></html>
    "#;

    #[test]
    fn extracts_deduplicated_pins() {
        let repos = extract_pinned(PROFILE_HTML);
        assert_eq!(
            repos,
            vec![
                RepoRef::new("octocat", "hello-world"),
                RepoRef::new("partner", "shared-lib"),
            ]
        );
    }

    #[test]
    fn falls_back_to_box_rows() {
        let html = r#"
            <html><body>
              <article class="Box-row">
                <a href="/someone/project">project</a>
              </article>
            </body></html>
        "#;
        let repos = extract_pinned(html);
        assert_eq!(repos, vec![RepoRef::new("someone", "project")]);
    }

    #[test]
    fn empty_profile_has_no_pins() {
        assert!(extract_pinned("<html><body><p>hi</p></body></html>").is_empty());
    }

    #[tokio::test]
    async fn scrapes_profile_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/octocat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PROFILE_HTML))
            .mount(&server)
            .await;

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
        let client = GitHubClient::new(&github, &rate, None).unwrap();

        let repos = client.pinned_repos("octocat").await.unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].full_name(), "octocat/hello-world");
    }

    #[tokio::test]
    async fn missing_profile_yields_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

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
        let client = GitHubClient::new(&github, &rate, None).unwrap();

        assert!(client.pinned_repos("ghost").await.unwrap().is_empty());
    }
}
