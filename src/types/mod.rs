//! Wire types for the tool surface.
//!
//! These are the self-describing objects returned by the `docs`, `search`
//! and `status` tools (and their legacy aliases).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::resolver::DocKind;

/// Result of a `docs` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsResponse {
    /// The identifier as given by the caller
    pub identifier: String,
    /// Resolved identifier kind
    pub kind: DocKind,
    /// Absolute URL the document was fetched from
    pub source_url: String,
    /// "live" or "cache"
    pub source: String,
    /// Canonical Markdown content (possibly topic-filtered and truncated)
    pub content: String,
    /// Token count of `content`, measured on the exact returned string
    pub token_count: usize,
    /// Whether the content was truncated to fit the token budget
    pub truncated: bool,
    /// Token count before truncation (only present when truncated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_tokens: Option<usize>,
    /// Milliseconds until the cached row expires
    pub ttl_remaining_ms: i64,
}

/// A single search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Canonical identifier, usable as a `docs` input
    pub id: String,
    /// Identifier kind
    pub kind: DocKind,
    /// Display title
    pub title: String,
    /// One-line description
    pub description: String,
    /// Relevance score in [0, 1]
    pub relevance: f64,
    /// Expected size of the full document
    pub doc_size: DocSize,
}

/// Rough size class of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocSize {
    Small,
    Medium,
    Large,
}

/// Result of a `search` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The query as given
    pub query: String,
    /// Ranked, de-duplicated hits
    pub results: Vec<SearchHit>,
    /// True when at least one source failed or timed out
    pub partial: bool,
    /// Names of sources that failed (only present when partial)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_sources: Option<Vec<String>>,
    /// Total hits found before the limit was applied
    pub total_found: usize,
    /// Query tips, present when results are sparse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Health of a single upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamHealth {
    Operational,
    Degraded,
    Down,
}

/// Overall service health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Cache statistics reported by `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub entries: usize,
    pub size_bytes: u64,
    /// Hit rate over the current process lifetime, in [0, 1]
    pub hit_rate: f64,
}

/// Per-upstream health reported by `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamsStatus {
    pub flutter_docs: UpstreamHealth,
    pub dart_docs: UpstreamHealth,
    pub pub_dev: UpstreamHealth,
}

/// Result of a `status` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: ServiceHealth,
    pub cache: CacheStatus,
    pub upstreams: UpstreamsStatus,
    pub uptime_ms: u64,
}

/// Result of `process_flutter_mentions`.
///
/// `results` holds one entry per canonical id, even when the same mention
/// appears multiple times in the input text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionsResponse {
    pub mentions_found: usize,
    pub unique_mentions: usize,
    pub results: BTreeMap<String, serde_json::Value>,
}
