//! GitHub REST/GraphQL client and profile-page scraping.
//!
//! All network access in the workspace funnels through [`GitHubClient`].
//! Endpoints are configurable so tests can point at a mock server.

mod client;
mod pinned;

pub use client::{GitHubClient, RepoContributor};
