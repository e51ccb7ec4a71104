//! Identifier resolution.
//!
//! Classifies a free-form identifier (`"Container"`, `"material.AppBar"`,
//! `"dart:async.Future"`, `"pub:provider:^6.0.0"`) into a
//! [`ResolvedIdentifier`] carrying the kind, the canonical cache key and
//! the authoritative upstream URL.

pub mod catalog;
pub mod version;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::upstream::Upstream;
use version::VersionSpec;

/// Flutter libraries recognized in `library.Class` identifiers.
pub const FLUTTER_LIBRARIES: &[&str] = &[
    "widgets",
    "material",
    "cupertino",
    "painting",
    "rendering",
    "animation",
    "services",
    "foundation",
    "gestures",
];

/// Dart core libraries recognized in `dart:library.Class` identifiers.
pub const DART_LIBRARIES: &[&str] = &[
    "dart:core",
    "dart:async",
    "dart:collection",
    "dart:convert",
    "dart:io",
    "dart:math",
    "dart:typed_data",
    "dart:ui",
];

/// Kind of a resolved identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocKind {
    FlutterClass,
    DartClass,
    PubPackage,
    Concept,
}

impl DocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlutterClass => "flutter_class",
            Self::DartClass => "dart_class",
            Self::PubPackage => "pub_package",
            Self::Concept => "concept",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "flutter_class" => Some(Self::FlutterClass),
            "dart_class" => Some(Self::DartClass),
            "pub_package" => Some(Self::PubPackage),
            "concept" => Some(Self::Concept),
            _ => None,
        }
    }
}

/// A classified identifier with its upstream derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentifier {
    pub kind: DocKind,
    /// Library the element lives in (`widgets`, `dart:async`, ...)
    pub library: Option<String>,
    /// Canonical element name
    pub name: String,
    /// Version constraint; only valid for pub packages
    pub version_spec: Option<VersionSpec>,
}

impl ResolvedIdentifier {
    /// Classify a raw identifier string.
    ///
    /// Rules, in order: `pub:` prefix, `dart:` prefix, `library.Class`
    /// with a known Flutter library, a curated widget name, and finally a
    /// pub package fall-through.
    pub fn resolve(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::InvalidInput("empty identifier".to_string()));
        }

        // Canonical ids (as returned by search hits) resolve to themselves
        if let Some((kind, _)) = raw.split_once(':') {
            if DocKind::from_str(kind).is_some() {
                return Self::from_canonical(raw);
            }
        }

        // Rule 1: explicit pub package, optionally versioned
        if let Some(rest) = raw.strip_prefix("pub:") {
            let (name, spec) = match rest.split_once(':') {
                Some((name, spec_text)) => (name, Some(VersionSpec::parse(spec_text)?)),
                None => (rest, None),
            };
            return Self::pub_package(name, spec);
        }

        // Rules 2 and 3: Dart core library classes
        if raw.starts_with("dart:") {
            let (library, name) = raw.rsplit_once('.').ok_or_else(|| {
                Error::InvalidInput(format!(
                    "expected 'dart:<library>.<Class>', got '{raw}'"
                ))
            })?;
            validate_element_name(name)?;
            return Ok(Self {
                kind: DocKind::DartClass,
                library: Some(library.to_string()),
                name: name.to_string(),
                version_spec: None,
            });
        }

        // Rule 4: library.Class with a known Flutter library
        if let Some((library, name)) = raw.split_once('.') {
            if FLUTTER_LIBRARIES.contains(&library) {
                validate_element_name(name)?;
                return Ok(Self {
                    kind: DocKind::FlutterClass,
                    library: Some(library.to_string()),
                    name: name.to_string(),
                    version_spec: None,
                });
            }
        }

        // Rule 5: bare name matching the curated widget list. The curated
        // home library is used (Scaffold lives in material, not widgets).
        if let Some((name, library, _)) = catalog::flutter_widget(raw) {
            return Ok(Self {
                kind: DocKind::FlutterClass,
                library: Some((*library).to_string()),
                name: (*name).to_string(),
                version_spec: None,
            });
        }

        // Rule 6: fall through to a pub package
        Self::pub_package(raw, None)
    }

    fn pub_package(name: &str, version_spec: Option<VersionSpec>) -> Result<Self> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(Error::InvalidInput(format!(
                "'{name}' is not a valid pub package name"
            )));
        }
        Ok(Self {
            kind: DocKind::PubPackage,
            library: None,
            name: name.to_string(),
            version_spec,
        })
    }

    /// Stable cache-key form: `kind:[library.]name[@version_spec]`.
    pub fn canonical_id(&self) -> String {
        let mut id = String::from(self.kind.as_str());
        id.push(':');
        if let Some(library) = &self.library {
            id.push_str(library);
            id.push('.');
        }
        id.push_str(&self.name);
        if let Some(spec) = &self.version_spec {
            id.push('@');
            id.push_str(&spec.canonical());
        }
        id
    }

    /// Parse a canonical id back into its parts. Inverse of
    /// [`canonical_id`](Self::canonical_id).
    pub fn from_canonical(id: &str) -> Result<Self> {
        let (kind_str, rest) = id
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("invalid canonical id: '{id}'")))?;
        let kind = DocKind::from_str(kind_str)
            .ok_or_else(|| Error::InvalidInput(format!("unknown kind: '{kind_str}'")))?;

        let (path, version_spec) = match rest.rsplit_once('@') {
            Some((path, spec_text)) => (path, Some(VersionSpec::parse(spec_text)?)),
            None => (rest, None),
        };

        let (library, name) = match kind {
            DocKind::FlutterClass | DocKind::DartClass => {
                let (library, name) = path.rsplit_once('.').ok_or_else(|| {
                    Error::InvalidInput(format!("canonical id missing library: '{id}'"))
                })?;
                (Some(library.to_string()), name.to_string())
            }
            DocKind::PubPackage | DocKind::Concept => (None, path.to_string()),
        };

        Ok(Self {
            kind,
            library,
            name,
            version_spec,
        })
    }

    /// A copy of this identifier pinned to an exact version.
    pub fn with_exact_version(&self, version: semver::Version) -> Self {
        Self {
            version_spec: Some(VersionSpec::Exact(version)),
            ..self.clone()
        }
    }

    /// Upstream host serving this identifier.
    pub fn upstream(&self) -> Upstream {
        match self.kind {
            DocKind::FlutterClass | DocKind::Concept => Upstream::FlutterDocs,
            DocKind::DartClass => Upstream::DartDocs,
            DocKind::PubPackage => Upstream::PubDev,
        }
    }

    /// Authoritative documentation URL for this identifier.
    pub fn doc_url(&self, endpoints: &Endpoints) -> String {
        match self.kind {
            DocKind::FlutterClass => {
                let library = self.library.as_deref().unwrap_or("widgets");
                format!(
                    "{}/flutter/{library}/{}-class.html",
                    endpoints.flutter_base, self.name
                )
            }
            DocKind::DartClass => {
                let library = self.library.as_deref().unwrap_or("dart:core");
                let dashed = library.replace(':', "-");
                format!(
                    "{}/stable/{dashed}/{}-class.html",
                    endpoints.dart_base, self.name
                )
            }
            DocKind::PubPackage => format!("{}/api/packages/{}", endpoints.pub_base, self.name),
            // Concept documents are synthesized locally; the URL points at
            // the human-facing docs hub.
            DocKind::Concept => "https://docs.flutter.dev/".to_string(),
        }
    }

    /// HTML page carrying the README of a pub package.
    pub fn pub_page_url(&self, endpoints: &Endpoints) -> String {
        format!("{}/packages/{}", endpoints.pub_base, self.name)
    }
}

/// Base URLs of the three upstreams. Overridable for tests.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub flutter_base: String,
    pub dart_base: String,
    pub pub_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            flutter_base: "https://api.flutter.dev".to_string(),
            dart_base: "https://api.dart.dev".to_string(),
            pub_base: "https://pub.dev".to_string(),
        }
    }
}

fn validate_element_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "'{name}' is not a valid class name"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(raw: &str) -> ResolvedIdentifier {
        ResolvedIdentifier::resolve(raw).unwrap()
    }

    #[test]
    fn test_resolve_pub_prefix() {
        let r = resolve("pub:provider");
        assert_eq!(r.kind, DocKind::PubPackage);
        assert_eq!(r.name, "provider");
        assert!(r.version_spec.is_none());
    }

    #[test]
    fn test_resolve_pub_with_version() {
        let r = resolve("pub:provider:^6.0.0");
        assert_eq!(r.kind, DocKind::PubPackage);
        assert_eq!(r.version_spec, Some(VersionSpec::parse("^6.0.0").unwrap()));
        assert_eq!(r.canonical_id(), "pub_package:provider@^6.0.0");
    }

    #[test]
    fn test_resolve_dart_class() {
        let r = resolve("dart:async.Future");
        assert_eq!(r.kind, DocKind::DartClass);
        assert_eq!(r.library.as_deref(), Some("dart:async"));
        assert_eq!(r.name, "Future");
    }

    #[test]
    fn test_resolve_flutter_library_dot_class() {
        let r = resolve("material.AppBar");
        assert_eq!(r.kind, DocKind::FlutterClass);
        assert_eq!(r.library.as_deref(), Some("material"));
        assert_eq!(r.name, "AppBar");
    }

    #[test]
    fn test_resolve_curated_widget_name() {
        let r = resolve("Container");
        assert_eq!(r.kind, DocKind::FlutterClass);
        assert_eq!(r.library.as_deref(), Some("widgets"));

        // Scaffold's curated home library is material
        let r = resolve("Scaffold");
        assert_eq!(r.library.as_deref(), Some("material"));
    }

    #[test]
    fn test_resolve_fall_through_to_pub() {
        let r = resolve("riverpod");
        assert_eq!(r.kind, DocKind::PubPackage);
        assert_eq!(r.name, "riverpod");
    }

    #[test]
    fn test_resolve_rejects_invalid() {
        assert!(ResolvedIdentifier::resolve("").is_err());
        assert!(ResolvedIdentifier::resolve("pub:Not A Package").is_err());
        assert!(ResolvedIdentifier::resolve("dart:async").is_err());
    }

    #[test]
    fn test_canonical_round_trip() {
        for raw in [
            "Container",
            "material.AppBar",
            "dart:async.Future",
            "pub:provider",
            "pub:provider:^6.0.0",
            "pub:dio:>=1.0.0 <2.0.0",
            "pub:bloc:latest",
        ] {
            let resolved = resolve(raw);
            let id = resolved.canonical_id();
            assert_eq!(ResolvedIdentifier::from_canonical(&id).unwrap(), resolved);
        }
    }

    #[test]
    fn test_doc_urls() {
        let endpoints = Endpoints::default();

        assert_eq!(
            resolve("Container").doc_url(&endpoints),
            "https://api.flutter.dev/flutter/widgets/Container-class.html"
        );
        assert_eq!(
            resolve("dart:async.Future").doc_url(&endpoints),
            "https://api.dart.dev/stable/dart-async/Future-class.html"
        );
        assert_eq!(
            resolve("pub:provider").doc_url(&endpoints),
            "https://pub.dev/api/packages/provider"
        );
        assert_eq!(
            resolve("pub:provider").pub_page_url(&endpoints),
            "https://pub.dev/packages/provider"
        );
    }

    #[test]
    fn test_upstream_mapping() {
        assert_eq!(resolve("Container").upstream(), Upstream::FlutterDocs);
        assert_eq!(resolve("dart:core.List").upstream(), Upstream::DartDocs);
        assert_eq!(resolve("pub:dio").upstream(), Upstream::PubDev);
    }

    #[test]
    fn test_with_exact_version() {
        let pinned = resolve("pub:provider:^6.0.0")
            .with_exact_version(semver::Version::new(6, 1, 2));
        assert_eq!(pinned.canonical_id(), "pub_package:provider@6.1.2");
    }
}
