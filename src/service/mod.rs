//! Service layer: the fetch-process-cache pipeline behind the tools.
//!
//! A docs request flows Resolving -> (version resolution) -> single-flight
//! -> cache -> rate limiter -> circuit breaker -> HTTP -> parser -> token
//! counter -> cache write -> truncation. Failures surface as typed errors
//! and are never cached.

pub mod singleflight;

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{
    now_ms, CacheStore, CachedDocument, TTL_API_DOCS_MS, TTL_PACKAGE_MS, TTL_SEARCH_MS,
};
use crate::config::Config;
use crate::document::tokens::TokenManager;
use crate::document::truncate::truncate;
use crate::document::{filter_topic, parser, DocSource, Topic};
use crate::error::{Error, Result};
use crate::resolver::catalog::CONCEPTS;
use crate::resolver::{DocKind, Endpoints, ResolvedIdentifier};
use crate::search::SearchOrchestrator;
use crate::types::{
    CacheStatus, DocsResponse, SearchResponse, ServiceHealth, StatusResponse, UpstreamHealth,
    UpstreamsStatus,
};
use crate::upstream::breaker::CircuitState;
use crate::upstream::{FetchClient, Upstream};
use crate::{DEFAULT_MAX_TOKENS, MIN_MAX_TOKENS};
use singleflight::SingleFlight;

/// Shared outcome of one upstream fetch.
type FetchOutcome = Arc<std::result::Result<CachedDocument, Error>>;

/// The documentation service.
#[derive(Clone)]
pub struct DocsService {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    endpoints: Endpoints,
    client: Arc<FetchClient>,
    cache: Arc<CacheStore>,
    tokens: TokenManager,
    search: SearchOrchestrator,
    flights: SingleFlight<FetchOutcome>,
    started_at: Instant,
}

impl DocsService {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_endpoints(config, Endpoints::default())
    }

    /// Construct with overridden upstream base URLs (used by tests).
    pub fn with_endpoints(config: Config, endpoints: Endpoints) -> Result<Self> {
        let cache = match config.cache_db_path().and_then(|p| CacheStore::open(&p)) {
            Ok(store) => store,
            Err(e) => {
                // A broken cache degrades to memory-only, never a dead server
                warn!(error = %e, "cache store unavailable, using in-memory fallback");
                CacheStore::open_in_memory()?
            }
        };
        let cache = Arc::new(cache);
        let client = Arc::new(FetchClient::new(&config)?);
        let search =
            SearchOrchestrator::new(Arc::clone(&client), Arc::clone(&cache), endpoints.clone());

        info!(cache = %cache.path().display(), "documentation service ready");
        Ok(Self {
            inner: Arc::new(Inner {
                tokens: TokenManager::new(config.accurate_tokens),
                config,
                endpoints,
                client,
                cache,
                search,
                flights: SingleFlight::new(),
                started_at: Instant::now(),
            }),
        })
    }

    /// The `docs` operation.
    pub async fn docs(
        &self,
        identifier: &str,
        topic: Option<Topic>,
        max_tokens: Option<usize>,
    ) -> Result<DocsResponse> {
        let deadline = self.inner.config.request_deadline();
        match tokio::time::timeout(deadline, self.docs_inner(identifier, topic, max_tokens)).await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                seconds: self.inner.config.request_timeout,
            }),
        }
    }

    async fn docs_inner(
        &self,
        identifier: &str,
        topic: Option<Topic>,
        max_tokens: Option<usize>,
    ) -> Result<DocsResponse> {
        let budget = max_tokens.unwrap_or(DEFAULT_MAX_TOKENS).max(MIN_MAX_TOKENS);

        let mut resolved = ResolvedIdentifier::resolve(identifier)?;
        if resolved.kind == DocKind::PubPackage && resolved.version_spec.is_some() {
            resolved = self.resolve_pub_version(resolved).await?;
        }

        let (row, source) = self.fetch_document(&resolved).await?;

        let content = match topic {
            Some(topic) => filter_topic(&row.content, topic),
            None => row.content.clone(),
        };
        let outcome = truncate(&content, budget, &self.inner.tokens);

        Ok(DocsResponse {
            identifier: identifier.to_string(),
            kind: resolved.kind,
            source_url: row.url.clone(),
            source: source.as_str().to_string(),
            content: outcome.content,
            token_count: outcome.token_count,
            truncated: outcome.truncated,
            original_tokens: outcome.truncated.then_some(outcome.original_tokens),
            ttl_remaining_ms: row.ttl_remaining_ms(now_ms()),
        })
    }

    /// The `search` operation.
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchResponse> {
        self.inner.search.search(query, limit).await
    }

    /// The `status` operation.
    pub async fn status(&self) -> StatusResponse {
        // Lazy maintenance: sweep expired rows so the reported entry count
        // only covers servable documents
        if let Ok(purged) = self.inner.cache.purge_expired().await {
            if purged > 0 {
                debug!(purged, "swept expired cache rows");
            }
        }

        let (cache, cache_healthy) = match self.inner.cache.stats().await {
            Ok(stats) => (stats, true),
            Err(e) => {
                warn!(error = %e, "cache stats unavailable");
                (
                    CacheStatus {
                        entries: 0,
                        size_bytes: 0,
                        hit_rate: 0.0,
                    },
                    false,
                )
            }
        };

        let health = |upstream| match self.inner.client.breaker_state(upstream) {
            CircuitState::Closed => UpstreamHealth::Operational,
            CircuitState::HalfOpen => UpstreamHealth::Degraded,
            CircuitState::Open => UpstreamHealth::Down,
        };
        let upstreams = UpstreamsStatus {
            flutter_docs: health(Upstream::FlutterDocs),
            dart_docs: health(Upstream::DartDocs),
            pub_dev: health(Upstream::PubDev),
        };

        let states = [
            upstreams.flutter_docs,
            upstreams.dart_docs,
            upstreams.pub_dev,
        ];
        let status = if states.iter().all(|s| *s == UpstreamHealth::Down) {
            ServiceHealth::Unhealthy
        } else if !cache_healthy || states.iter().any(|s| *s != UpstreamHealth::Operational) {
            ServiceHealth::Degraded
        } else {
            ServiceHealth::Healthy
        };

        StatusResponse {
            status,
            cache,
            upstreams,
            uptime_ms: self.inner.started_at.elapsed().as_millis() as u64,
        }
    }

    /// Cache store handle (for maintenance tooling and tests).
    pub fn cache(&self) -> &CacheStore {
        &self.inner.cache
    }

    /// Resolve a version constraint against the published versions list.
    async fn resolve_pub_version(
        &self,
        resolved: ResolvedIdentifier,
    ) -> Result<ResolvedIdentifier> {
        let Some(spec) = resolved.version_spec.clone() else {
            return Ok(resolved);
        };
        let meta = self.package_meta(&resolved).await?;
        let versions = parser::published_versions(&meta);
        if versions.is_empty() {
            return Err(Error::VersionNotSatisfiable {
                constraint: spec.canonical(),
                available: Vec::new(),
            });
        }
        let version = spec.resolve(&versions)?;
        debug!(package = %resolved.name, version = %version, "version resolved");
        Ok(resolved.with_exact_version(version))
    }

    /// Package metadata JSON, read through the cache (1 h TTL).
    async fn package_meta(&self, resolved: &ResolvedIdentifier) -> Result<serde_json::Value> {
        let key = format!("pub_meta:{}", resolved.name);
        if let Ok(Some(row)) = self.inner.cache.get(&key).await {
            if let Ok(meta) = serde_json::from_str(&row.content) {
                return Ok(meta);
            }
        }

        let url = resolved.doc_url(&self.inner.endpoints);
        let body = self.inner.client.get(Upstream::PubDev, &url, &key).await?;
        let meta: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| Error::Internal(format!("pub.dev returned invalid JSON: {e}")))?;

        let row = CachedDocument {
            key,
            content: body,
            tokens: 0,
            url,
            fetched_at: now_ms(),
            ttl_ms: TTL_SEARCH_MS,
            version: None,
        };
        if let Err(e) = self.inner.cache.put(&row).await {
            warn!(error = %e, "failed to cache package metadata");
        }
        Ok(meta)
    }

    /// Cache-or-fetch with single-flight admission.
    ///
    /// At most one upstream fetch runs per canonical id; concurrent
    /// requesters share the leader's outcome.
    async fn fetch_document(
        &self,
        resolved: &ResolvedIdentifier,
    ) -> Result<(CachedDocument, DocSource)> {
        let key = resolved.canonical_id();

        match self.inner.cache.get(&key).await {
            Ok(Some(row)) => {
                debug!(key, "cache hit");
                return Ok((row, DocSource::Cache));
            }
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "cache read failed, fetching live"),
        }

        let inner = Arc::clone(&self.inner);
        let flight_resolved = resolved.clone();
        let shared = self
            .inner
            .flights
            .run(&key, move || async move {
                Arc::new(Inner::fetch_live(inner, flight_resolved).await)
            })
            .await
            .ok_or_else(|| Error::Internal("in-flight fetch died unexpectedly".to_string()))?;

        match shared.as_ref() {
            Ok(row) => Ok((row.clone(), DocSource::Live)),
            Err(e) => Err(e.duplicate()),
        }
    }
}

impl Inner {
    /// One live fetch: rate limit, breaker, HTTP, parse, count, write.
    async fn fetch_live(
        inner: Arc<Inner>,
        resolved: ResolvedIdentifier,
    ) -> std::result::Result<CachedDocument, Error> {
        let key = resolved.canonical_id();
        debug!(key, "fetching live");

        let (content, url, ttl_ms, version) = match resolved.kind {
            DocKind::FlutterClass | DocKind::DartClass => {
                let url = resolved.doc_url(&inner.endpoints);
                let html = inner.client.get(resolved.upstream(), &url, &key).await?;
                let content = parser::parse_class_page(&html, &resolved.name, &url);
                (content, url, TTL_API_DOCS_MS, None)
            }
            DocKind::PubPackage => {
                let meta_url = resolved.doc_url(&inner.endpoints);
                let body = inner.client.get(Upstream::PubDev, &meta_url, &key).await?;
                let meta: serde_json::Value = serde_json::from_str(&body)
                    .map_err(|e| Error::Internal(format!("pub.dev returned invalid JSON: {e}")))?;

                // README degradation: a missing or broken page still yields
                // a metadata-only document
                let page_url = resolved.pub_page_url(&inner.endpoints);
                let readme_html = match inner.client.get(Upstream::PubDev, &page_url, &key).await {
                    Ok(html) => Some(html),
                    Err(e) => {
                        warn!(key, error = %e, "README fetch failed, metadata only");
                        None
                    }
                };

                let version = resolved
                    .version_spec
                    .as_ref()
                    .map(|s| s.canonical())
                    .or_else(|| meta["latest"]["version"].as_str().map(str::to_string));
                let content = parser::parse_package(
                    &resolved.name,
                    &meta,
                    readme_html.as_deref(),
                    &page_url,
                    version.as_deref(),
                );
                (content, meta_url, TTL_PACKAGE_MS, version)
            }
            DocKind::Concept => {
                let content = concept_document(&resolved.name).ok_or_else(|| {
                    Error::NotFound(format!("no concept entry for '{}'", resolved.name))
                })?;
                (
                    content,
                    resolved.doc_url(&inner.endpoints),
                    TTL_API_DOCS_MS,
                    None,
                )
            }
        };

        let tokens = inner.tokens.count(&content);
        let row = CachedDocument {
            key: key.clone(),
            content,
            tokens,
            url,
            fetched_at: now_ms(),
            ttl_ms,
            version,
        };

        // Cache errors degrade: the caller still gets the live document
        if let Err(e) = inner.cache.put(&row).await {
            warn!(key, error = %e, "cache write failed");
        }

        Ok(row)
    }
}

/// Synthesize a document for a curated concept entry.
fn concept_document(slug: &str) -> Option<String> {
    for (concept, items) in CONCEPTS {
        for (name, description) in *items {
            if name.to_lowercase().replace(' ', "-") == slug {
                let related: Vec<String> = items
                    .iter()
                    .filter(|(other, _)| other != name)
                    .map(|(other, desc)| format!("- **{other}**: {desc}"))
                    .collect();
                return Some(format!(
                    "# {name}\n\n\
                     ## Description\n{description}\n\n\
                     This entry belongs to the '{concept}' concept group.\n\n\
                     ## API\n{}\n",
                    related.join("\n")
                ));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CONTAINER_HTML: &str = r#"<html><body>
      <section class="desc"><p>A convenience widget.</p></section>
      <section class="constructor"><h3>Container</h3><pre>Container({Key? key})</pre><p>Creates a container.</p></section>
      <dl class="properties"><dt>child</dt><dd>The contained widget.</dd></dl>
      <section class="method"><h3>build</h3><pre>Widget build(BuildContext context)</pre><p>Builds it.</p></section>
    </body></html>"#;

    fn test_config(dir: &std::path::Path) -> Config {
        Config {
            cache_dir: Some(dir.to_path_buf()),
            max_retries: 0,
            base_retry_delay: 0.0,
            requests_per_second: 10_000,
            ..Config::default()
        }
    }

    fn service(dir: &std::path::Path, base: &str) -> DocsService {
        DocsService::with_endpoints(
            test_config(dir),
            Endpoints {
                flutter_base: base.to_string(),
                dart_base: base.to_string(),
                pub_base: base.to_string(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_flutter_class_happy_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flutter/widgets/Container-class.html")
            .with_status(200)
            .with_body(CONTAINER_HTML)
            .expect(1)
            .create_async()
            .await;

        let svc = service(dir.path(), &server.url());

        let first = svc.docs("Container", None, None).await.unwrap();
        assert_eq!(first.source, "live");
        assert!(first.content.starts_with("# Container"));
        assert!(first.content.contains("## Constructors"));
        assert!(first.content.contains("## Properties"));
        assert!(first
            .source_url
            .ends_with("/flutter/widgets/Container-class.html"));
        assert!(first.ttl_remaining_ms > 0);

        // Second call within TTL is served from the cache, byte-identical
        let second = svc.docs("Container", None, None).await.unwrap();
        mock.assert_async().await;
        assert_eq!(second.source, "cache");
        assert_eq!(second.content, first.content);
        assert_eq!(second.token_count, first.token_count);
    }

    #[tokio::test]
    async fn test_token_count_matches_recount() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/flutter/widgets/Container-class.html")
            .with_status(200)
            .with_body(CONTAINER_HTML)
            .create_async()
            .await;

        let svc = service(dir.path(), &server.url());
        let response = svc.docs("Container", None, None).await.unwrap();

        let tm = TokenManager::default();
        assert_eq!(tm.count(&response.content), response.token_count);
    }

    #[tokio::test]
    async fn test_single_flight_collapses_concurrent_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flutter/material/Scaffold-class.html")
            .with_status(200)
            .with_body(CONTAINER_HTML)
            .expect(1)
            .create_async()
            .await;

        let svc = service(dir.path(), &server.url());

        let mut handles = Vec::new();
        for _ in 0..50 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.docs("Scaffold", None, None).await
            }));
        }

        let mut bodies = Vec::new();
        for handle in handles {
            let response = handle.await.unwrap().unwrap();
            bodies.push((response.content, response.token_count));
        }

        mock.assert_async().await;
        assert!(bodies.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_caret_version_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let meta = json!({
            "name": "provider",
            "latest": {"version": "7.0.0-beta", "pubspec": {"description": "State management."}},
            "versions": [
                {"version": "5.0.0"}, {"version": "6.0.0"}, {"version": "6.0.5"},
                {"version": "6.1.2"}, {"version": "7.0.0-beta"}
            ]
        });
        let _meta_mock = server
            .mock("GET", "/api/packages/provider")
            .with_status(200)
            .with_body(meta.to_string())
            .expect_at_least(1)
            .create_async()
            .await;
        let _page_mock = server
            .mock("GET", "/packages/provider")
            .with_status(404)
            .create_async()
            .await;

        let svc = service(dir.path(), &server.url());
        let response = svc.docs("pub:provider:^6.0.0", None, None).await.unwrap();

        assert_eq!(response.kind, DocKind::PubPackage);
        // ^6.0.0 resolves to 6.1.2, not the 7.0.0-beta prerelease
        assert!(response.content.starts_with("# provider 6.1.2"));
        assert!(
            svc.cache()
                .get("pub_package:provider@6.1.2")
                .await
                .unwrap()
                .is_some(),
            "document cached under the resolved canonical id"
        );
    }

    #[tokio::test]
    async fn test_version_not_satisfiable() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let meta = json!({
            "name": "dio",
            "latest": {"version": "5.4.0", "pubspec": {}},
            "versions": [
                {"version": "4.0.0"}, {"version": "5.0.0"}, {"version": "5.4.0"}
            ]
        });
        let _mock = server
            .mock("GET", "/api/packages/dio")
            .with_status(200)
            .with_body(meta.to_string())
            .create_async()
            .await;

        let svc = service(dir.path(), &server.url());
        let err = svc.docs("pub:dio:>=99.0.0", None, None).await.unwrap_err();

        match err {
            Error::VersionNotSatisfiable {
                constraint,
                available,
            } => {
                assert_eq!(constraint, ">=99.0.0");
                assert!(available.len() <= 10);
                assert_eq!(available[0], "5.4.0");
            }
            other => panic!("expected VersionNotSatisfiable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_package_without_readme_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let meta = json!({
            "name": "tiny",
            "latest": {"version": "1.0.0", "pubspec": {"description": "Tiny package."}},
            "versions": [{"version": "1.0.0"}]
        });
        let _meta_mock = server
            .mock("GET", "/api/packages/tiny")
            .with_status(200)
            .with_body(meta.to_string())
            .create_async()
            .await;
        let _page_mock = server
            .mock("GET", "/packages/tiny")
            .with_status(404)
            .create_async()
            .await;

        let svc = service(dir.path(), &server.url());
        let response = svc.docs("pub:tiny", None, None).await.unwrap();

        assert_eq!(response.kind, DocKind::PubPackage);
        assert!(response.content.contains("# tiny 1.0.0"));
        assert!(response.content.contains("No README available"));
    }

    #[tokio::test]
    async fn test_truncation_applied_on_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;

        // Pad the page so the canonical document far exceeds the budget
        let mut html = String::from(
            r#"<html><body><section class="desc"><p>A scrollable list.</p></section>
               <section class="method"><h3>build</h3><pre>Widget build(BuildContext context)</pre><p>Builds.</p></section>"#,
        );
        for i in 0..400 {
            html.push_str(&format!(
                "<section class=\"method\"><h3>helper{i}</h3><pre>void helper{i}()</pre><p>Long prose for helper number {i} repeated repeatedly across the page.</p></section>"
            ));
        }
        html.push_str("</body></html>");

        let _mock = server
            .mock("GET", "/flutter/widgets/ListView-class.html")
            .with_status(200)
            .with_body(html)
            .create_async()
            .await;

        let svc = service(dir.path(), &server.url());
        let response = svc.docs("ListView", None, Some(800)).await.unwrap();

        assert!(response.truncated);
        assert!(response.token_count <= 800);
        assert!(response.original_tokens.unwrap() > 800);
        assert!(response.content.contains("# ListView"));
        assert!(response.content.contains("## Description"));
        assert!(response
            .content
            .contains("Widget build(BuildContext context)"));
        assert!(response.content.contains("*Truncated from"));

        // The stored document is untruncated; the budget applies per request
        let cached = svc
            .cache()
            .get("flutter_class:widgets.ListView")
            .await
            .unwrap()
            .unwrap();
        assert!(cached.tokens > 800);
    }

    #[tokio::test]
    async fn test_topic_filter() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/flutter/widgets/Container-class.html")
            .with_status(200)
            .with_body(CONTAINER_HTML)
            .create_async()
            .await;

        let svc = service(dir.path(), &server.url());
        let response = svc
            .docs("Container", Some(Topic::Constructors), None)
            .await
            .unwrap();

        assert!(response.content.starts_with("# Container"));
        assert!(response.content.contains("## Constructors"));
        assert!(!response.content.contains("## Methods"));
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/flutter/widgets/Container-class.html")
            .with_status(404)
            .expect_at_least(2)
            .create_async()
            .await;

        let svc = service(dir.path(), &server.url());
        assert!(svc.docs("Container", None, None).await.is_err());
        // Errors are never cached: the next call fetches again
        assert!(svc.docs("Container", None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), "http://127.0.0.1:1");
        let err = svc.docs("pub:Not A Name", None, None).await.unwrap_err();
        assert_eq!(err.error_type(), "invalid_input");
    }

    #[tokio::test]
    async fn test_status_reports_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), "http://127.0.0.1:1");
        let status = svc.status().await;

        assert_eq!(status.status, ServiceHealth::Healthy);
        assert_eq!(status.upstreams.flutter_docs, UpstreamHealth::Operational);
        assert_eq!(status.cache.entries, 0);
    }

    #[tokio::test]
    async fn test_concept_document() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), "http://127.0.0.1:1");

        let response = svc.docs("concept:setstate", None, None).await.unwrap();
        assert!(response.content.contains("# setState"));
        assert!(response.content.contains("## Description"));
    }

    #[test]
    fn test_concept_document_lookup() {
        assert!(concept_document("setstate").is_some());
        assert!(concept_document("go_router").is_some());
        assert!(concept_document("definitely-not-a-concept").is_none());
    }
}
