//! Crawl orchestration and the contributor roster.
//!
//! This crate ties discovery, the GitHub client, and export into the
//! end-to-end crawl, and owns the merge/dedupe/filter semantics that make
//! repeated runs stable.

pub mod pipeline;
pub mod roster;
