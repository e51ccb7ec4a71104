//! HTML/JSON to canonical Markdown.
//!
//! Flutter and Dart class pages share one rustdoc-like shape
//! (`section.desc`, `section.constructor`, `dl.properties`,
//! `section.method`); pub.dev contributes a JSON metadata record plus a
//! scraped README. Both are flattened into the fixed canonical section
//! order so the truncator and topic filter can rely on it.

use regex::Regex;
use reqwest::Url;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

/// Elements that never contribute content.
const SKIPPED_TAGS: &[&str] = &["script", "style", "nav", "header", "footer"];
/// Class fragments that mark page chrome.
const SKIPPED_CLASSES: &[&str] = &["sidebar", "breadcrumbs", "footer"];

/// Most examples anyone needs from one page.
const MAX_EXAMPLES: usize = 5;
/// Changelog entries are bounded to the last three versions.
const CHANGELOG_VERSIONS: usize = 3;

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

/// Parse a Flutter or Dart API class page into the canonical document.
pub fn parse_class_page(html: &str, name: &str, base_url: &str) -> String {
    let doc = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let description = doc
        .select(&sel("section.desc"))
        .next()
        .map(|el| element_markdown(el, base.as_ref()))
        .map(|text| collapse_whitespace(&text))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "No description available".to_string());

    let constructors = format_member_sections(&doc, "section.constructor", base.as_ref());
    let constructors = if constructors.is_empty() {
        "No constructors found".to_string()
    } else {
        constructors
    };

    let properties = format_properties(&doc);
    let methods = format_member_sections(&doc, "section.method", base.as_ref());
    let methods = if methods.is_empty() {
        "No methods found".to_string()
    } else {
        methods
    };

    let examples = format_examples(&doc);

    format!(
        "# {name}\n\n\
         ## Description\n{description}\n\n\
         ## Constructors\n{constructors}\n\n\
         ## Properties\n{properties}\n\n\
         ## Methods\n{methods}\n\n\
         ## Examples\n{examples}\n"
    )
}

/// Constructor and method sections: `### name`, fenced signature, prose.
fn format_member_sections(doc: &Html, selector: &str, base: Option<&Url>) -> String {
    let mut out = Vec::new();
    for section in doc.select(&sel(selector)) {
        if let Some(h) = section.select(&sel("h3")).next() {
            out.push(format!("### {}", clean_text(h)));
        }
        if let Some(pre) = section.select(&sel("pre")).next() {
            out.push(format!("```dart\n{}\n```", clean_text(pre)));
        }
        if let Some(p) = section.select(&sel("p")).next() {
            let prose = collapse_whitespace(&element_markdown(p, base));
            if !prose.is_empty() {
                out.push(prose);
            }
        }
        out.push(String::new());
    }
    out.join("\n").trim_end().to_string()
}

/// Property lists: `- **name**: description` bullets.
fn format_properties(doc: &Html) -> String {
    let mut out = Vec::new();
    for list in doc.select(&sel("dl.properties")) {
        let mut pending: Option<String> = None;
        for child in list.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "dt" => {
                    // A dt without a dd still gets listed
                    if let Some(name) = pending.take() {
                        out.push(format!("- **{name}**: No description"));
                    }
                    pending = Some(clean_text(child));
                }
                "dd" => {
                    if let Some(name) = pending.take() {
                        let desc = clean_text(child);
                        if desc.is_empty() {
                            out.push(format!("- **{name}**: No description"));
                        } else {
                            out.push(format!("- **{name}**: {desc}"));
                        }
                    }
                }
                _ => {}
            }
        }
        if let Some(name) = pending.take() {
            out.push(format!("- **{name}**: No description"));
        }
    }
    if out.is_empty() {
        "No properties found".to_string()
    } else {
        out.join("\n")
    }
}

/// Code examples: dart-tagged blocks first, any `pre` as fallback.
fn format_examples(doc: &Html) -> String {
    let dart = sel("pre.language-dart");
    let mut blocks: Vec<String> = doc.select(&dart).map(|el| clean_text(el)).collect();
    if blocks.is_empty() {
        blocks = doc.select(&sel("pre")).map(|el| clean_text(el)).collect();
    }
    blocks.retain(|code| !code.is_empty());

    if blocks.is_empty() {
        return "No code examples found".to_string();
    }

    blocks
        .iter()
        .take(MAX_EXAMPLES)
        .enumerate()
        .map(|(i, code)| format!("#### Example {}:\n```dart\n{code}\n```\n", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the canonical package document from pub.dev JSON metadata and an
/// optionally scraped README page.
///
/// `version_override` carries a resolved version constraint; without it the
/// latest published version is shown. A missing README degrades to a
/// metadata-only document; it never fails.
pub fn parse_package(
    name: &str,
    meta: &Value,
    readme_html: Option<&str>,
    page_url: &str,
    version_override: Option<&str>,
) -> String {
    let latest = &meta["latest"];
    let pubspec = &latest["pubspec"];
    let version = version_override
        .or_else(|| latest["version"].as_str())
        .unwrap_or("unknown");

    let description = pubspec["description"]
        .as_str()
        .unwrap_or("No description available")
        .trim()
        .to_string();

    let installation = format!(
        "```yaml\ndependencies:\n  {name}: ^{version}\n```"
    );

    let readme = readme_html.and_then(|html| readme_markdown(html, page_url));
    let (getting_started, examples) = match &readme {
        Some(md) => (md.clone(), readme_examples(md)),
        None => (
            "No README available for this package.".to_string(),
            "No code examples found".to_string(),
        ),
    };

    let api = format_package_api(pubspec, meta, page_url);
    let changelog = format_changelog(meta);

    format!(
        "# {name} {version}\n\n\
         ## Description\n{description}\n\n\
         ## Installation\n{installation}\n\n\
         ## Getting Started\n{getting_started}\n\n\
         ## API\n{api}\n\n\
         ## Examples\n{examples}\n\n\
         ## Changelog\n{changelog}\n"
    )
}

fn format_package_api(pubspec: &Value, meta: &Value, page_url: &str) -> String {
    let mut lines = Vec::new();

    let docs_url = pubspec["documentation"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| page_url.to_string());
    lines.push(format!("- Documentation: [{docs_url}]({docs_url})"));

    if let Some(homepage) = pubspec["homepage"].as_str().filter(|s| !s.is_empty()) {
        lines.push(format!("- Homepage: [{homepage}]({homepage})"));
    }
    if let Some(repo) = pubspec["repository"].as_str().filter(|s| !s.is_empty()) {
        lines.push(format!("- Repository: [{repo}]({repo})"));
    }
    if let Some(publisher) = meta["publisher"].as_str().filter(|s| !s.is_empty()) {
        lines.push(format!("- Publisher: {publisher}"));
    }
    if let Some(likes) = meta["likeCount"].as_u64() {
        lines.push(format!("- Likes: {likes}"));
    }
    if let Some(points) = meta["pubPoints"].as_u64() {
        lines.push(format!("- Pub points: {points}"));
    }

    let deps: Vec<&str> = pubspec["dependencies"]
        .as_object()
        .map(|m| m.keys().map(String::as_str).collect())
        .unwrap_or_default();
    if !deps.is_empty() {
        lines.push(format!("- Dependencies: {}", deps.join(", ")));
    }

    lines.join("\n")
}

/// Last three published versions, newest first.
fn format_changelog(meta: &Value) -> String {
    let Some(versions) = meta["versions"].as_array() else {
        return "No version history available".to_string();
    };

    let mut entries: Vec<String> = versions
        .iter()
        .rev()
        .take(CHANGELOG_VERSIONS)
        .map(|v| {
            let number = v["version"].as_str().unwrap_or("unknown");
            match v["published"].as_str() {
                Some(published) => format!("- **{number}** — published {published}"),
                None => format!("- **{number}**"),
            }
        })
        .collect();

    if entries.is_empty() {
        return "No version history available".to_string();
    }
    entries.dedup();
    entries.join("\n")
}

/// All published version numbers from the package metadata.
pub fn published_versions(meta: &Value) -> Vec<semver::Version> {
    meta["versions"]
        .as_array()
        .map(|versions| {
            versions
                .iter()
                .filter_map(|v| v["version"].as_str())
                .filter_map(|s| semver::Version::parse(s).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Extract the README section of a pub.dev package page as Markdown.
pub fn readme_markdown(html: &str, base_url: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let readme = doc
        .select(&sel("section.detail-tab-readme-content"))
        .next()
        .or_else(|| doc.select(&sel("section.markdown-body")).next())
        .or_else(|| doc.select(&sel("div.markdown-body")).next())?;

    let markdown = element_markdown(readme, base.as_ref());
    let cleaned = clean_readme(&markdown);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// First few fenced code blocks of a README, re-fenced as examples.
fn readme_examples(markdown: &str) -> String {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<String>> = None;

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            match current.take() {
                Some(lines) => {
                    let code = lines.join("\n");
                    if !code.trim().is_empty() {
                        blocks.push(code);
                    }
                }
                None => current = Some(Vec::new()),
            }
            continue;
        }
        if let Some(lines) = current.as_mut() {
            lines.push(line.to_string());
        }
    }

    if blocks.is_empty() {
        return "No code examples found".to_string();
    }

    blocks
        .iter()
        .take(3)
        .enumerate()
        .map(|(i, code)| format!("#### Example {}:\n```dart\n{code}\n```\n", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip badges and excess blank lines from README markdown.
fn clean_readme(markdown: &str) -> String {
    static BADGE: OnceLock<Regex> = OnceLock::new();
    let badge = BADGE.get_or_init(|| {
        Regex::new(r"!\[[^\]]*\]\([^)]*(?:shields\.io|badge)[^)]*\)").expect("static regex")
    });

    let without_badges = badge.replace_all(markdown, "");
    collapse_whitespace(&without_badges)
}

/// Flatten an element subtree into Markdown.
///
/// Skips chrome (script/style/nav/header/footer and sidebar-like
/// classes), fences `pre` blocks with their language hint, backticks
/// inline code, keeps list structure and turns anchors into absolute
/// `[text](href)` links.
fn element_markdown(el: ElementRef, base: Option<&Url>) -> String {
    let mut out = String::new();
    render_children(el, base, &mut out);
    out
}

fn render_children(el: ElementRef, base: Option<&Url>, out: &mut String) {
    for node in el.children() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                let Some(child) = ElementRef::wrap(node) else {
                    continue;
                };
                let tag = element.name();
                if SKIPPED_TAGS.contains(&tag) || has_skipped_class(child) {
                    continue;
                }
                match tag {
                    "a" => {
                        let text = clean_text(child);
                        let href = child
                            .value()
                            .attr("href")
                            .map(|h| absolutize(h, base))
                            .unwrap_or_default();
                        if text.is_empty() {
                            // Anchor targets with no text vanish
                        } else if href.is_empty() {
                            out.push_str(&text);
                        } else {
                            out.push_str(&format!("[{text}]({href})"));
                        }
                    }
                    "pre" => {
                        let lang = code_language(child).unwrap_or_default();
                        out.push_str(&format!("\n```{lang}\n{}\n```\n", clean_text(child)));
                    }
                    "code" => {
                        out.push('`');
                        out.push_str(&clean_text(child));
                        out.push('`');
                    }
                    "br" => out.push('\n'),
                    "p" => {
                        render_children(child, base, out);
                        out.push_str("\n\n");
                    }
                    "li" => {
                        out.push_str("- ");
                        render_children(child, base, out);
                        out.push('\n');
                    }
                    "ul" | "ol" => {
                        out.push('\n');
                        render_children(child, base, out);
                        out.push('\n');
                    }
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        let level = tag.as_bytes()[1] - b'0';
                        out.push_str("\n\n");
                        // README headings are demoted below the canonical ##
                        // sections so they never terminate one
                        for _ in 0..(level + 2).min(6) {
                            out.push('#');
                        }
                        out.push(' ');
                        out.push_str(&clean_text(child));
                        out.push_str("\n\n");
                    }
                    "img" => {
                        // Images carry no value for an AI consumer
                    }
                    _ => render_children(child, base, out),
                }
            }
            _ => {}
        }
    }
}

/// Language hint from `class="language-xxx"` on a `pre` or nested `code`.
fn code_language(el: ElementRef) -> Option<String> {
    let from_classes = |e: ElementRef| {
        e.value()
            .classes()
            .find_map(|c| c.strip_prefix("language-").map(str::to_string))
    };
    from_classes(el).or_else(|| el.select(&sel("code")).next().and_then(from_classes))
}

fn has_skipped_class(el: ElementRef) -> bool {
    el.value()
        .classes()
        .any(|c| SKIPPED_CLASSES.iter().any(|skip| c.contains(skip)))
}

/// Join text descendants and collapse runs of whitespace.
fn clean_text(el: ElementRef) -> String {
    let mut text = String::new();
    for piece in el.text() {
        text.push_str(piece);
    }
    // Inside pre blocks line structure matters; collapse per line
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Collapse horizontal whitespace outside code fences and squeeze runs of
/// blank lines.
fn collapse_whitespace(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut blank_run = 0usize;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            out.push(line.trim_end().to_string());
            blank_run = 0;
            continue;
        }
        if in_fence {
            out.push(line.to_string());
            continue;
        }
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            if blank_run < 2 {
                out.push(String::new());
            }
        } else {
            blank_run = 0;
            out.push(collapsed);
        }
    }

    out.join("\n").trim().to_string()
}

/// Make a link target absolute against the page it came from.
fn absolutize(href: &str, base: Option<&Url>) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match base.and_then(|b| b.join(href).ok()) {
        Some(url) => url.to_string(),
        None => href.to_string(),
    }
}
