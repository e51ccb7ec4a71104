//! Semantic version constraint parsing and resolution.
//!
//! Constraints come in four shapes: an exact version (`6.0.5`), a caret
//! range (`^6.0.0`, pub/Cargo semantics), an explicit range
//! (`>=1.0.0 <2.0.0`) and the keywords `latest`, `stable`, `dev`, `beta`
//! and `alpha`. Resolution picks the highest published version that
//! satisfies the constraint.

use semver::Version;

use crate::error::{Error, Result};

/// How many available versions to surface when resolution fails.
const SUGGESTION_LIMIT: usize = 10;

/// A parsed version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    Exact(Version),
    Caret(Version),
    Range {
        lower: Option<Version>,
        lower_inclusive: bool,
        upper: Option<Version>,
        upper_inclusive: bool,
    },
    Keyword(VersionKeyword),
}

/// Version selection keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionKeyword {
    Latest,
    Stable,
    Dev,
    Beta,
    Alpha,
}

impl VersionKeyword {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Stable => "stable",
            Self::Dev => "dev",
            Self::Beta => "beta",
            Self::Alpha => "alpha",
        }
    }
}

impl VersionSpec {
    /// Parse a constraint string.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidInput("empty version spec".to_string()));
        }

        match input {
            "latest" => return Ok(Self::Keyword(VersionKeyword::Latest)),
            "stable" => return Ok(Self::Keyword(VersionKeyword::Stable)),
            "dev" => return Ok(Self::Keyword(VersionKeyword::Dev)),
            "beta" => return Ok(Self::Keyword(VersionKeyword::Beta)),
            "alpha" => return Ok(Self::Keyword(VersionKeyword::Alpha)),
            _ => {}
        }

        if let Some(rest) = input.strip_prefix('^') {
            let version = parse_version(rest)?;
            return Ok(Self::Caret(version));
        }

        if input.starts_with('>') || input.starts_with('<') {
            return Self::parse_range(input);
        }

        Ok(Self::Exact(parse_version(input)?))
    }

    /// Parse one or two space-separated comparators into a range.
    fn parse_range(input: &str) -> Result<Self> {
        let mut lower = None;
        let mut lower_inclusive = false;
        let mut upper = None;
        let mut upper_inclusive = false;

        for token in input.split_whitespace() {
            let (op, rest) = if let Some(rest) = token.strip_prefix(">=") {
                (">=", rest)
            } else if let Some(rest) = token.strip_prefix("<=") {
                ("<=", rest)
            } else if let Some(rest) = token.strip_prefix('>') {
                (">", rest)
            } else if let Some(rest) = token.strip_prefix('<') {
                ("<", rest)
            } else {
                return Err(Error::InvalidInput(format!(
                    "invalid range comparator: '{token}'"
                )));
            };

            let version = parse_version(rest)?;
            match op {
                ">=" | ">" => {
                    if lower.is_some() {
                        return Err(Error::InvalidInput(
                            "range has two lower bounds".to_string(),
                        ));
                    }
                    lower = Some(version);
                    lower_inclusive = op == ">=";
                }
                _ => {
                    if upper.is_some() {
                        return Err(Error::InvalidInput(
                            "range has two upper bounds".to_string(),
                        ));
                    }
                    upper = Some(version);
                    upper_inclusive = op == "<=";
                }
            }
        }

        Ok(Self::Range {
            lower,
            lower_inclusive,
            upper,
            upper_inclusive,
        })
    }

    /// Canonical text of the constraint, stable under re-parsing.
    pub fn canonical(&self) -> String {
        match self {
            Self::Exact(v) => v.to_string(),
            Self::Caret(v) => format!("^{v}"),
            Self::Range {
                lower,
                lower_inclusive,
                upper,
                upper_inclusive,
            } => {
                let mut parts = Vec::new();
                if let Some(v) = lower {
                    parts.push(format!("{}{v}", if *lower_inclusive { ">=" } else { ">" }));
                }
                if let Some(v) = upper {
                    parts.push(format!("{}{v}", if *upper_inclusive { "<=" } else { "<" }));
                }
                parts.join(" ")
            }
            Self::Keyword(k) => k.as_str().to_string(),
        }
    }

    /// Check whether a published version satisfies this constraint.
    pub fn matches(&self, v: &Version) -> bool {
        match self {
            Self::Exact(target) => v == target,
            Self::Caret(target) => {
                // Pre-releases only match when explicitly requested
                if !v.pre.is_empty() && target.pre.is_empty() {
                    return false;
                }
                v >= target && *v < caret_upper_bound(target)
            }
            Self::Range {
                lower,
                lower_inclusive,
                upper,
                upper_inclusive,
            } => {
                let bounds_want_pre = lower.as_ref().is_some_and(|b| !b.pre.is_empty())
                    || upper.as_ref().is_some_and(|b| !b.pre.is_empty());
                if !v.pre.is_empty() && !bounds_want_pre {
                    return false;
                }
                if let Some(b) = lower {
                    let ok = if *lower_inclusive { v >= b } else { v > b };
                    if !ok {
                        return false;
                    }
                }
                if let Some(b) = upper {
                    let ok = if *upper_inclusive { v <= b } else { v < b };
                    if !ok {
                        return false;
                    }
                }
                true
            }
            Self::Keyword(keyword) => match keyword {
                VersionKeyword::Latest => true,
                VersionKeyword::Stable => v.pre.is_empty(),
                VersionKeyword::Dev | VersionKeyword::Beta | VersionKeyword::Alpha => v
                    .pre
                    .split('.')
                    .next()
                    .is_some_and(|tag| tag.starts_with(keyword.as_str())),
            },
        }
    }

    /// Resolve against a list of published versions.
    ///
    /// Returns the maximum satisfying version under semver ordering, or
    /// [`Error::VersionNotSatisfiable`] listing the closest available
    /// versions.
    pub fn resolve(&self, available: &[Version]) -> Result<Version> {
        match available.iter().filter(|v| self.matches(v)).max() {
            Some(v) => Ok(v.clone()),
            None => {
                let mut sorted: Vec<&Version> = available.iter().collect();
                sorted.sort_unstable_by(|a, b| b.cmp(a));
                Err(Error::VersionNotSatisfiable {
                    constraint: self.canonical(),
                    available: sorted
                        .into_iter()
                        .take(SUGGESTION_LIMIT)
                        .map(|v| v.to_string())
                        .collect(),
                })
            }
        }
    }
}

/// Exclusive upper bound implied by a caret constraint.
fn caret_upper_bound(v: &Version) -> Version {
    if v.major > 0 {
        Version::new(v.major + 1, 0, 0)
    } else if v.minor > 0 {
        Version::new(0, v.minor + 1, 0)
    } else {
        Version::new(0, 0, v.patch + 1)
    }
}

fn parse_version(input: &str) -> Result<Version> {
    Version::parse(input.trim())
        .map_err(|e| Error::InvalidInput(format!("invalid version '{input}': {e}")))
}
