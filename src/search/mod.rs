//! Unified search across documentation sources.
//!
//! Four sources are fanned out concurrently: the curated Flutter and Dart
//! indexes, the live pub.dev search endpoint and the local concept map.
//! Hits are scored lexically, weighted per source, de-duplicated by
//! canonical id and ranked. A failing or slow source degrades the
//! response to `partial` instead of failing it.

use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{CacheStore, CachedDocument, TTL_SEARCH_MS};
use crate::error::{Error, Result};
use crate::resolver::catalog::{concept_entries, DART_CLASSES, FLUTTER_WIDGETS, POPULAR_PACKAGES};
use crate::resolver::{DocKind, Endpoints};
use crate::types::{DocSize, SearchHit, SearchResponse};
use crate::upstream::{FetchClient, Upstream};

/// Per-source deadline.
pub const SOURCE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default and maximum result counts.
pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 30;

/// Source weights applied to lexical scores.
const WEIGHT_FLUTTER: f64 = 1.0;
const WEIGHT_PUB: f64 = 0.9;
const WEIGHT_DART: f64 = 0.8;
const WEIGHT_CONCEPTS: f64 = 0.7;

/// Minimum score for a hit to be listed at all.
const SCORE_FLOOR: f64 = 0.2;

/// Parallel fan-out search over all sources.
pub struct SearchOrchestrator {
    client: Arc<FetchClient>,
    cache: Arc<CacheStore>,
    endpoints: Endpoints,
}

impl SearchOrchestrator {
    pub fn new(client: Arc<FetchClient>, cache: Arc<CacheStore>, endpoints: Endpoints) -> Self {
        Self {
            client,
            cache,
            endpoints,
        }
    }

    /// Run the fan-out and merge the hits.
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("empty search query".to_string()));
        }
        let limit = limit.clamp(1, MAX_LIMIT);
        let normalized = query.to_lowercase();

        // Search responses are cached for an hour
        let cache_key = format!("search:{normalized}");
        if let Ok(Some(row)) = self.cache.get(&cache_key).await {
            if let Ok(mut cached) = serde_json::from_str::<SearchResponse>(&row.content) {
                debug!(query, "search cache hit");
                cached.results.truncate(limit);
                return Ok(cached);
            }
        }

        // Local sources cannot time out; the live pub.dev call gets the
        // per-source deadline.
        let pub_hits = tokio::time::timeout(SOURCE_TIMEOUT, self.pub_dev_hits(&normalized)).await;
        let flutter_hits = flutter_index_hits(&normalized);
        let dart_hits = dart_index_hits(&normalized);
        let concept_hits = concept_map_hits(&normalized);

        let mut failed_sources = Vec::new();
        let pub_hits = match pub_hits {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!(query, error = %e, "pub.dev search failed");
                failed_sources.push(Upstream::PubDev.wire_name().to_string());
                Vec::new()
            }
            Err(_) => {
                warn!(query, "pub.dev search timed out");
                failed_sources.push(Upstream::PubDev.wire_name().to_string());
                Vec::new()
            }
        };

        // With the curated sources always available, the whole request only
        // fails when every source failed; kept for the day these become
        // remote indexes.
        if failed_sources.len() >= 4 {
            return Err(Error::Network("all search sources failed".to_string()));
        }

        let mut merged: HashMap<String, SearchHit> = HashMap::new();
        for hit in flutter_hits
            .into_iter()
            .chain(dart_hits)
            .chain(pub_hits)
            .chain(concept_hits)
        {
            match merged.get(&hit.id) {
                Some(existing) if existing.relevance >= hit.relevance => {}
                _ => {
                    merged.insert(hit.id.clone(), hit);
                }
            }
        }

        let mut results: Vec<SearchHit> = merged.into_values().collect();
        // Descending score, stable tie-break on canonical id
        results.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        let total_found = results.len();
        results.truncate(limit);

        let partial = !failed_sources.is_empty();
        let suggestions = search_suggestions(&results);
        let response = SearchResponse {
            query: query.to_string(),
            results,
            partial,
            failed_sources: if partial { Some(failed_sources) } else { None },
            total_found,
            suggestions,
        };

        // Only complete responses are worth caching
        if !partial {
            if let Ok(content) = serde_json::to_string(&response) {
                let row = CachedDocument {
                    key: cache_key,
                    content,
                    tokens: 0,
                    url: String::new(),
                    fetched_at: crate::cache::now_ms(),
                    ttl_ms: TTL_SEARCH_MS,
                    version: None,
                };
                if let Err(e) = self.cache.put(&row).await {
                    warn!(error = %e, "failed to cache search response");
                }
            }
        }

        Ok(response)
    }

    /// Live package search against pub.dev.
    async fn pub_dev_hits(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = Url::parse_with_params(
            &format!("{}/api/search", self.endpoints.pub_base),
            &[("q", query)],
        )
        .map_err(|e| Error::Internal(format!("building search url: {e}")))?;

        let body = self
            .client
            .get(Upstream::PubDev, url.as_str(), "search")
            .await?;
        let parsed: serde_json::Value = serde_json::from_str(&body)?;

        let names: Vec<String> = parsed["packages"]
            .as_array()
            .map(|packages| {
                packages
                    .iter()
                    .filter_map(|p| p["package"].as_str())
                    .take(DEFAULT_LIMIT)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(names
            .iter()
            .map(|name| {
                // The endpoint already matched; score for ranking but keep
                // anything it returned above the floor
                let score = lexical_score(query, name).max(0.35) * WEIGHT_PUB;
                let description = POPULAR_PACKAGES
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, d)| (*d).to_string())
                    .unwrap_or_else(|| "Package on pub.dev".to_string());
                SearchHit {
                    id: format!("pub_package:{name}"),
                    kind: DocKind::PubPackage,
                    title: format!("{name} (pub.dev)"),
                    description,
                    relevance: clamp_score(score),
                    doc_size: DocSize::Large,
                }
            })
            .collect())
    }
}

/// Curated Flutter widget index.
fn flutter_index_hits(query: &str) -> Vec<SearchHit> {
    FLUTTER_WIDGETS
        .iter()
        .filter_map(|(name, library, description)| {
            let score = entry_score(query, name, description) * WEIGHT_FLUTTER;
            if score < SCORE_FLOOR {
                return None;
            }
            Some(SearchHit {
                id: format!("flutter_class:{library}.{name}"),
                kind: DocKind::FlutterClass,
                title: format!("{name} ({library})"),
                description: (*description).to_string(),
                relevance: clamp_score(score),
                doc_size: DocSize::Medium,
            })
        })
        .collect()
}

/// Curated Dart core index.
fn dart_index_hits(query: &str) -> Vec<SearchHit> {
    DART_CLASSES
        .iter()
        .filter_map(|(name, library, description)| {
            let score = entry_score(query, name, description) * WEIGHT_DART;
            if score < SCORE_FLOOR {
                return None;
            }
            Some(SearchHit {
                id: format!("dart_class:{library}.{name}"),
                kind: DocKind::DartClass,
                title: format!("{name} ({library})"),
                description: (*description).to_string(),
                relevance: clamp_score(score),
                doc_size: DocSize::Medium,
            })
        })
        .collect()
}

/// Local concept map.
fn concept_map_hits(query: &str) -> Vec<SearchHit> {
    let Some((concept, items)) = concept_entries(query) else {
        return Vec::new();
    };
    items
        .iter()
        .map(|(name, description)| SearchHit {
            id: format!("concept:{}", name.to_lowercase().replace(' ', "-")),
            kind: DocKind::Concept,
            title: (*name).to_string(),
            description: (*description).to_string(),
            relevance: clamp_score(0.8 * WEIGHT_CONCEPTS + concept_bonus(query, concept)),
            doc_size: DocSize::Small,
        })
        .collect()
}

/// Query tips for sparse result sets.
fn search_suggestions(results: &[SearchHit]) -> Option<Vec<String>> {
    let mut suggestions = Vec::new();
    if results.is_empty() {
        suggestions.push("Try specific widget names like 'Container' or 'Scaffold'".to_string());
        suggestions.push("Use package names from pub.dev like 'provider' or 'dio'".to_string());
        suggestions
            .push("Search for concepts like 'state management' or 'navigation'".to_string());
    } else if results.len() < 3 {
        suggestions.push("For more results, try broader terms or related concepts".to_string());
        if results.iter().any(|h| h.kind == DocKind::FlutterClass) {
            suggestions.push(
                "You can also search for specific libraries like 'material.AppBar'".to_string(),
            );
        }
    }
    (!suggestions.is_empty()).then_some(suggestions)
}

fn concept_bonus(query: &str, concept: &str) -> f64 {
    if query == concept {
        0.1
    } else {
        0.0
    }
}

/// Lexical score of a query against an identifier plus its description.
fn entry_score(query: &str, name: &str, description: &str) -> f64 {
    let identifier = lexical_score(query, &name.to_lowercase());
    let in_description = if description.to_lowercase().contains(query) {
        0.2
    } else {
        0.0
    };
    (identifier + in_description).min(1.0)
}

/// Exact 1.0, prefix 0.7, substring 0.4, close edit distance 0.3.
fn lexical_score(query: &str, identifier: &str) -> f64 {
    let identifier = identifier.to_lowercase();
    if query == identifier {
        1.0
    } else if identifier.starts_with(query) || query.starts_with(&identifier) {
        0.7
    } else if identifier.contains(query) || query.contains(&identifier) {
        0.4
    } else if edit_distance(query, &identifier) <= 2 {
        0.3
    } else {
        // Multi-word queries: best token match, discounted
        query
            .split_whitespace()
            .map(|token| {
                if token == identifier {
                    0.8
                } else if identifier.starts_with(token) {
                    0.5
                } else if identifier.contains(token) {
                    0.3
                } else {
                    0.0
                }
            })
            .fold(0.0, f64::max)
    }
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

/// Levenshtein distance, early-exiting on length gaps beyond the cutoff.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > 2 {
        return usize::MAX;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}
