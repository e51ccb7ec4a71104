//! Priority-based, section-aware truncation.
//!
//! The canonical document is split into prioritized chunks, then reduced
//! tier by tier until it fits the token budget: Minimal goes first, then
//! Low, then Medium items from the back, then High descriptions are cut to
//! one line. Critical content (title, description, primary constructor) is
//! never removed; a final line-level trim guarantees even a 500-token
//! budget, closing dangling braces and code fences on the way.

use serde::Serialize;

use crate::document::tokens::TokenManager;

/// Truncation priority, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Minimal,
}

/// Members whose signatures survive longest.
pub const CANONICAL_MEMBERS: &[&str] = &[
    "build",
    "createState",
    "setState",
    "initState",
    "dispose",
    "didUpdateWidget",
    "didChangeDependencies",
    "child",
    "children",
    "onPressed",
    "onChanged",
    "onTap",
    "controller",
];

/// Result of a truncation pass.
#[derive(Debug, Clone, Serialize)]
pub struct TruncationOutcome {
    pub content: String,
    pub truncated: bool,
    pub original_tokens: usize,
    pub token_count: usize,
    pub sections_kept: Vec<String>,
    pub sections_dropped: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    Full,
    Condensed,
    Dropped,
}

#[derive(Debug, Clone)]
struct Chunk {
    priority: Priority,
    text: String,
    /// One-line replacement used when High descriptions are trimmed
    condensed: Option<String>,
    state: ChunkState,
}

#[derive(Debug, Clone)]
struct Section {
    name: String,
    /// `## Heading` line; absent for the title block
    header: Option<String>,
    chunks: Vec<Chunk>,
}

/// Fit `content` into `max_tokens`, preserving structure.
pub fn truncate(content: &str, max_tokens: usize, tm: &TokenManager) -> TruncationOutcome {
    let original_tokens = tm.count(content);
    if original_tokens <= max_tokens {
        let all_sections = section_names(content);
        return TruncationOutcome {
            content: content.to_string(),
            truncated: false,
            original_tokens,
            token_count: original_tokens,
            sections_kept: all_sections,
            sections_dropped: Vec::new(),
        };
    }

    let mut sections = parse_sections(content);

    // Reduction ladder: drop Minimal, then Low, then Medium from the back,
    // then condense High to one-liners.
    drop_tier(&mut sections, Priority::Minimal);
    if over_budget(&sections, max_tokens, tm) {
        drop_tier(&mut sections, Priority::Low);
    }
    while over_budget(&sections, max_tokens, tm) && drop_last_medium(&mut sections) {}
    if over_budget(&sections, max_tokens, tm) {
        condense_high(&mut sections);
    }

    let dropped = dropped_section_names(&sections);
    let shortened = shortened_section_names(&sections);
    let footer = footer_line(original_tokens, max_tokens, &dropped, &shortened);
    let footer_tokens = tm.count(&footer);
    let body_budget = max_tokens.saturating_sub(footer_tokens + 1);

    let mut body = assemble(&sections);
    if tm.count(&body) > body_budget {
        body = hard_trim(&body, body_budget, tm);
    }

    let content = format!("{}\n{}", body.trim_end(), footer);
    let token_count = tm.count(&content);

    TruncationOutcome {
        content,
        truncated: true,
        original_tokens,
        token_count,
        sections_kept: kept_section_names(&sections),
        sections_dropped: dropped,
    }
}

// ===== Parsing =====

fn parse_sections(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current_name: Option<String> = None;
    let mut current_lines: Vec<&str> = Vec::new();

    for line in content.lines() {
        if let Some(name) = line.strip_prefix("## ") {
            flush_section(&mut sections, current_name.take(), &current_lines);
            current_lines.clear();
            current_name = Some(name.trim().to_string());
        } else {
            current_lines.push(line);
        }
    }
    flush_section(&mut sections, current_name.take(), &current_lines);
    sections
}

fn flush_section(sections: &mut Vec<Section>, name: Option<String>, lines: &[&str]) {
    let body = lines.join("\n").trim().to_string();
    match name {
        None => {
            // Title block before the first ## heading
            if !body.is_empty() {
                sections.push(Section {
                    name: "title".to_string(),
                    header: None,
                    chunks: vec![Chunk {
                        priority: Priority::Critical,
                        text: body,
                        condensed: None,
                        state: ChunkState::Full,
                    }],
                });
            }
        }
        Some(name) => {
            let chunks = classify_section(&name, &body);
            sections.push(Section {
                header: Some(format!("## {name}")),
                name,
                chunks,
            });
        }
    }
}

fn classify_section(name: &str, body: &str) -> Vec<Chunk> {
    let lower = name.to_lowercase();

    if lower.contains("see also") || lower.contains("inherited") || lower.contains("related") {
        return vec![chunk(Priority::Minimal, body)];
    }

    match lower.as_str() {
        "description" | "summary" => vec![chunk(Priority::Critical, body)],
        "constructors" => constructor_chunks(body),
        "properties" => bullet_chunks(body),
        "methods" => member_chunks(body),
        "examples" => example_chunks(body),
        "installation" => vec![chunk(Priority::High, body)],
        "getting started" | "api" => vec![chunk(Priority::Medium, body)],
        "changelog" => vec![chunk(Priority::Low, body)],
        _ => vec![chunk(Priority::Low, body)],
    }
}

fn chunk(priority: Priority, text: &str) -> Chunk {
    Chunk {
        priority,
        text: text.to_string(),
        condensed: None,
        state: ChunkState::Full,
    }
}

/// First constructor signature is Critical, the rest are Medium.
fn constructor_chunks(body: &str) -> Vec<Chunk> {
    let (prelude, items) = split_items(body, "### ");
    let mut chunks = Vec::new();
    if !prelude.is_empty() {
        chunks.push(chunk(Priority::Medium, &prelude));
    }
    for (i, item) in items.iter().enumerate() {
        let priority = if i == 0 { Priority::Critical } else { Priority::Medium };
        chunks.push(chunk(priority, item));
    }
    chunks
}

/// Property bullets: canonical members High, the rest Medium.
fn bullet_chunks(body: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for line in body.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("- **") {
            let name = rest.split("**").next().unwrap_or_default();
            let priority = if CANONICAL_MEMBERS.contains(&name) {
                Priority::High
            } else {
                Priority::Medium
            };
            chunks.push(chunk(priority, line));
        } else {
            chunks.push(chunk(Priority::Medium, line));
        }
    }
    chunks
}

/// Method items: canonical members condense to signature + one line
/// (High), other signatures are Medium with their prose split off as Low.
fn member_chunks(body: &str) -> Vec<Chunk> {
    let (prelude, items) = split_items(body, "### ");
    let mut chunks = Vec::new();
    if !prelude.is_empty() {
        chunks.push(chunk(Priority::Medium, &prelude));
    }
    for item in &items {
        let member = item
            .strip_prefix("### ")
            .and_then(|rest| rest.lines().next())
            .map(|l| l.split_whitespace().next().unwrap_or_default())
            .unwrap_or_default();
        let (head, prose) = split_member_prose(item);

        if CANONICAL_MEMBERS.contains(&member) {
            let one_line = condensed_member(item);
            chunks.push(Chunk {
                priority: Priority::High,
                text: head.clone(),
                condensed: Some(one_line),
                state: ChunkState::Full,
            });
            if !prose.is_empty() {
                chunks.push(chunk(Priority::Low, &prose));
            }
        } else {
            chunks.push(chunk(Priority::Medium, &head));
            if !prose.is_empty() {
                chunks.push(chunk(Priority::Low, &prose));
            }
        }
    }
    chunks
}

/// First two examples Medium, the rest Low.
fn example_chunks(body: &str) -> Vec<Chunk> {
    let (prelude, items) = split_items(body, "#### ");
    let mut chunks = Vec::new();
    if !prelude.is_empty() {
        chunks.push(chunk(Priority::Medium, &prelude));
    }
    for (i, item) in items.iter().enumerate() {
        let priority = if i < 2 { Priority::Medium } else { Priority::Low };
        chunks.push(chunk(priority, item));
    }
    chunks
}

/// Split a section body into the text before the first `marker` heading
/// and the marker-delimited items.
fn split_items(body: &str, marker: &str) -> (String, Vec<String>) {
    let mut prelude = Vec::new();
    let mut items: Vec<Vec<&str>> = Vec::new();

    for line in body.lines() {
        if line.starts_with(marker) {
            items.push(vec![line]);
        } else if let Some(last) = items.last_mut() {
            last.push(line);
        } else {
            prelude.push(line);
        }
    }

    (
        prelude.join("\n").trim().to_string(),
        items
            .into_iter()
            .map(|lines| lines.join("\n").trim().to_string())
            .collect(),
    )
}

/// Header plus fenced signature plus first prose line; the rest is prose.
fn split_member_prose(item: &str) -> (String, String) {
    let mut head = Vec::new();
    let mut prose = Vec::new();
    let mut in_fence = false;
    let mut fence_done = false;
    let mut prose_lines = 0usize;

    for line in item.lines() {
        let is_fence = line.trim_start().starts_with("```");
        if !fence_done {
            head.push(line);
            if is_fence {
                if in_fence {
                    fence_done = true;
                }
                in_fence = !in_fence;
            }
            continue;
        }
        if prose_lines == 0 && !line.trim().is_empty() {
            head.push(line);
            prose_lines += 1;
            continue;
        }
        prose.push(line);
    }

    (
        head.join("\n").trim().to_string(),
        prose.join("\n").trim().to_string(),
    )
}

/// One-line form of a canonical member: heading, signature, first doc line.
fn condensed_member(item: &str) -> String {
    let (head, _) = split_member_prose(item);
    head
}

// ===== Reduction =====

fn over_budget(sections: &[Section], max_tokens: usize, tm: &TokenManager) -> bool {
    tm.count(&assemble(sections)) > max_tokens
}

fn drop_tier(sections: &mut [Section], tier: Priority) {
    for section in sections.iter_mut() {
        for chunk in &mut section.chunks {
            if chunk.priority == tier {
                chunk.state = ChunkState::Dropped;
            }
        }
    }
}

/// Drop the last surviving Medium chunk; returns false when none remain.
fn drop_last_medium(sections: &mut [Section]) -> bool {
    for section in sections.iter_mut().rev() {
        for chunk in section.chunks.iter_mut().rev() {
            if chunk.priority == Priority::Medium && chunk.state == ChunkState::Full {
                chunk.state = ChunkState::Dropped;
                return true;
            }
        }
    }
    false
}

fn condense_high(sections: &mut [Section]) {
    for section in sections.iter_mut() {
        for chunk in &mut section.chunks {
            if chunk.priority == Priority::High
                && chunk.state == ChunkState::Full
                && chunk.condensed.is_some()
            {
                chunk.state = ChunkState::Condensed;
            }
        }
    }
}

// ===== Assembly =====

fn assemble(sections: &[Section]) -> String {
    let mut parts: Vec<String> = Vec::new();

    for section in sections {
        let kept: Vec<&str> = section
            .chunks
            .iter()
            .filter_map(|c| match c.state {
                ChunkState::Dropped => None,
                ChunkState::Condensed => c.condensed.as_deref().or(Some(c.text.as_str())),
                ChunkState::Full => Some(c.text.as_str()),
            })
            .collect();
        if kept.is_empty() {
            continue;
        }

        let mut block = String::new();
        if let Some(header) = &section.header {
            block.push_str(header);
            block.push('\n');
        }
        for (i, text) in kept.iter().enumerate() {
            if i > 0 {
                // Bullets stay adjacent; prose blocks get a blank line
                if text.starts_with("- ") {
                    block.push('\n');
                } else {
                    block.push_str("\n\n");
                }
            }
            block.push_str(text);
        }
        parts.push(block);
    }

    parts.join("\n\n")
}

/// Cut whole lines from the end until the body fits, then repair any open
/// code fence: close dangling braces, mark the cut, close the fence.
fn hard_trim(body: &str, budget: usize, tm: &TokenManager) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let mut keep = lines.len();

    while keep > 1 {
        let candidate = repair_fences(&lines[..keep]);
        if tm.count(&candidate) <= budget {
            return candidate;
        }
        // Walk back proportionally so huge documents converge quickly
        let step = (keep / 10).max(1);
        keep -= step;
    }
    repair_fences(&lines[..1])
}

fn repair_fences(lines: &[&str]) -> String {
    let mut in_fence = false;
    let mut fence_content: Vec<&str> = Vec::new();

    for line in lines {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            fence_content.clear();
        } else if in_fence {
            fence_content.push(line);
        }
    }

    let mut out = lines.join("\n");
    if in_fence {
        let closers = unclosed_delimiters(&fence_content);
        out.push_str("\n// …");
        if !closers.is_empty() {
            out.push('\n');
            out.push_str(&closers);
        }
        out.push_str("\n```");
    }
    out.trim_end().to_string()
}

/// Closing braces/brackets/parens for whatever the cut left open.
fn unclosed_delimiters(code_lines: &[&str]) -> String {
    let mut stack = Vec::new();
    for line in code_lines {
        for c in line.chars() {
            match c {
                '{' | '[' | '(' => stack.push(c),
                '}' => {
                    if stack.last() == Some(&'{') {
                        stack.pop();
                    }
                }
                ']' => {
                    if stack.last() == Some(&'[') {
                        stack.pop();
                    }
                }
                ')' => {
                    if stack.last() == Some(&'(') {
                        stack.pop();
                    }
                }
                _ => {}
            }
        }
    }
    stack
        .into_iter()
        .rev()
        .map(|c| match c {
            '{' => '}',
            '[' => ']',
            _ => ')',
        })
        .collect()
}

// ===== Reporting =====

fn footer_line(
    original: usize,
    budget: usize,
    dropped: &[String],
    shortened: &[String],
) -> String {
    let mut affected: Vec<&str> = dropped.iter().map(String::as_str).collect();
    affected.extend(shortened.iter().map(String::as_str));
    let detail = if affected.is_empty() {
        String::new()
    } else {
        format!(" Omitted or shortened: {}.", affected.join(", "))
    };
    format!(
        "---\n*Truncated from {original} tokens to fit a {budget}-token budget.{detail}*"
    )
}

fn section_names(content: &str) -> Vec<String> {
    let mut names = vec!["title".to_string()];
    names.extend(
        content
            .lines()
            .filter_map(|l| l.strip_prefix("## "))
            .map(|n| n.trim().to_string()),
    );
    names
}

fn kept_section_names(sections: &[Section]) -> Vec<String> {
    sections
        .iter()
        .filter(|s| s.chunks.iter().any(|c| c.state != ChunkState::Dropped))
        .map(|s| s.name.clone())
        .collect()
}

fn dropped_section_names(sections: &[Section]) -> Vec<String> {
    sections
        .iter()
        .filter(|s| !s.chunks.is_empty() && s.chunks.iter().all(|c| c.state == ChunkState::Dropped))
        .map(|s| s.name.clone())
        .collect()
}

fn shortened_section_names(sections: &[Section]) -> Vec<String> {
    sections
        .iter()
        .filter(|s| {
            let any_kept = s.chunks.iter().any(|c| c.state != ChunkState::Dropped);
            let any_reduced = s
                .chunks
                .iter()
                .any(|c| c.state != ChunkState::Full);
            any_kept && any_reduced
        })
        .map(|s| s.name.clone())
        .collect()
}
