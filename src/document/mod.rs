//! Canonical document model.
//!
//! Every upstream page is normalized into one Markdown shape: a `# title`
//! line followed by a fixed order of `##` sections. Classes get
//! Description / Constructors / Properties / Methods / Examples; packages
//! get Description / Installation / Getting Started / API / Examples /
//! Changelog.

pub mod parser;
pub mod tokens;
pub mod truncate;

use serde::{Deserialize, Serialize};

/// Closed set of section filters accepted by the `docs` tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    Summary,
    Constructors,
    Properties,
    Methods,
    Examples,
    GettingStarted,
    Changelog,
    Api,
    Installation,
}

impl Topic {
    pub const ALL: [Topic; 9] = [
        Topic::Summary,
        Topic::Constructors,
        Topic::Properties,
        Topic::Methods,
        Topic::Examples,
        Topic::GettingStarted,
        Topic::Changelog,
        Topic::Api,
        Topic::Installation,
    ];

    /// Parse the wire form (`"getting-started"` etc).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "summary" => Some(Self::Summary),
            "constructors" => Some(Self::Constructors),
            "properties" => Some(Self::Properties),
            "methods" => Some(Self::Methods),
            "examples" => Some(Self::Examples),
            "getting-started" => Some(Self::GettingStarted),
            "changelog" => Some(Self::Changelog),
            "api" => Some(Self::Api),
            "installation" => Some(Self::Installation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Constructors => "constructors",
            Self::Properties => "properties",
            Self::Methods => "methods",
            Self::Examples => "examples",
            Self::GettingStarted => "getting-started",
            Self::Changelog => "changelog",
            Self::Api => "api",
            Self::Installation => "installation",
        }
    }

    /// Heading of the canonical section this topic selects.
    pub fn section_heading(&self) -> &'static str {
        match self {
            Self::Summary => "Description",
            Self::Constructors => "Constructors",
            Self::Properties => "Properties",
            Self::Methods => "Methods",
            Self::Examples => "Examples",
            Self::GettingStarted => "Getting Started",
            Self::Changelog => "Changelog",
            Self::Api => "API",
            Self::Installation => "Installation",
        }
    }
}

/// Where a served document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocSource {
    Live,
    Cache,
}

impl DocSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Cache => "cache",
        }
    }
}

/// Extract `# title` plus one `## section` from a canonical document.
///
/// When the section is missing the title line is returned with a one-line
/// note, never an error.
pub fn filter_topic(content: &str, topic: Topic) -> String {
    let title_line = content
        .lines()
        .find(|l| l.starts_with("# "))
        .unwrap_or("")
        .to_string();

    let heading = format!("## {}", topic.section_heading());
    let mut section = Vec::new();
    let mut in_section = false;

    for line in content.lines() {
        if line.starts_with("## ") {
            if in_section {
                break;
            }
            in_section = line.trim_end().eq_ignore_ascii_case(&heading);
            if in_section {
                section.push(line);
            }
            continue;
        }
        if in_section {
            section.push(line);
        }
    }

    if section.is_empty() {
        format!(
            "{title_line}\n\n*No '{}' section in this document.*\n",
            topic.as_str()
        )
    } else {
        format!("{title_line}\n\n{}\n", section.join("\n").trim_end())
    }
}
