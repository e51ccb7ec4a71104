//! The `process_flutter_mentions` legacy tool.
//!
//! Scans free text for `@flutter_mcp <identifier>` mentions and returns
//! documentation for each. Duplicate mentions collapse to a single map
//! entry per canonical id.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::Result;
use crate::mcp::handler::{get_string_arg, json_result, reject_unknown_keys, ToolHandler};
use crate::mcp::protocol::{Tool, ToolAnnotations, ToolResult};
use crate::resolver::ResolvedIdentifier;
use crate::service::DocsService;
use crate::types::MentionsResponse;

/// Token budget for each mentioned document; mentions are meant to be
/// injected as context, so they stay small.
const MENTION_MAX_TOKENS: usize = 4_000;

fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"@flutter_mcp\s+([A-Za-z0-9_.:^><=\-]+)").expect("static regex")
    })
}

/// Extract documentation for `@flutter_mcp` mentions in text.
pub struct ProcessFlutterMentionsTool {
    service: DocsService,
}

impl ProcessFlutterMentionsTool {
    pub fn new(service: DocsService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for ProcessFlutterMentionsTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "process_flutter_mentions",
            "Parse text for @flutter_mcp mentions (e.g. '@flutter_mcp provider', \
             '@flutter_mcp material.AppBar') and return documentation for each mention.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Text containing @flutter_mcp mentions"
                    }
                },
                "required": ["text"]
            }),
        )
        .with_annotations(ToolAnnotations::read_only_open_world())
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        reject_unknown_keys(&args, &["text"])?;
        let text = get_string_arg(&args, "text")?;

        // Trailing sentence punctuation is not part of the identifier
        let mentions: Vec<String> = mention_pattern()
            .captures_iter(&text)
            .map(|c| c[1].trim_end_matches('.').to_string())
            .collect();
        let mentions_found = mentions.len();

        // One entry per canonical id, regardless of how often a mention
        // repeats or how many spellings map to the same identifier
        let mut results: BTreeMap<String, Value> = BTreeMap::new();
        for mention in &mentions {
            let canonical = match ResolvedIdentifier::resolve(mention) {
                Ok(resolved) => resolved.canonical_id(),
                Err(e) => {
                    results
                        .entry(format!("invalid:{mention}"))
                        .or_insert_with(|| serde_json::to_value(e.envelope(None)).unwrap_or_default());
                    continue;
                }
            };
            if results.contains_key(&canonical) {
                continue;
            }

            let value = match self
                .service
                .docs(mention, None, Some(MENTION_MAX_TOKENS))
                .await
            {
                Ok(response) => serde_json::to_value(response)?,
                Err(e) => serde_json::to_value(
                    e.envelope(Some(serde_json::json!({ "mention": mention }))),
                )?,
            };
            results.insert(canonical, value);
        }

        json_result(&MentionsResponse {
            mentions_found,
            unique_mentions: results.len(),
            results,
        })
    }
}
