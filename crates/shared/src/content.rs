//! Structured message content.
//!
//! Message bodies carry a small markdown subset. Instead of producing markup
//! strings, [`parse`] turns a body into typed nodes that a view layer renders
//! itself, so user text is never injected as markup.

use serde::{Deserialize, Serialize};

const FENCE: &str = "```";
const BULLET: &str = "• ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContentNode {
    Text(String),
    CodeBlock {
        language: Option<String>,
        body: String,
    },
    InlineCode(String),
    Bold(String),
    ListItem(Vec<ContentNode>),
}

pub fn parse(input: &str) -> Vec<ContentNode> {
    let mut nodes = Vec::new();
    let mut rest = input;

    while let Some(start) = rest.find(FENCE) {
        let after = &rest[start + FENCE.len()..];
        match split_code_block(after) {
            Some((language, body, remainder)) => {
                parse_lines(&rest[..start], &mut nodes);
                nodes.push(ContentNode::CodeBlock {
                    language,
                    body: body.trim().to_string(),
                });
                rest = remainder;
            }
            None => {
                parse_lines(&rest[..start], &mut nodes);
                push_text(&mut nodes, FENCE);
                rest = after;
            }
        }
    }

    parse_lines(rest, &mut nodes);
    nodes
}

/// Concatenates the visible text of `nodes`, dropping all formatting.
pub fn plain_text(nodes: &[ContentNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            ContentNode::Text(text) | ContentNode::InlineCode(text) | ContentNode::Bold(text) => {
                out.push_str(text)
            }
            ContentNode::CodeBlock { body, .. } => {
                out.push_str(body);
                out.push('\n');
            }
            ContentNode::ListItem(children) => {
                out.push_str(BULLET);
                out.push_str(&plain_text(children));
                out.push('\n');
            }
        }
    }
    out
}

/// `after` starts right behind an opening fence. Returns the language tag,
/// the raw body and the text following the closing fence.
fn split_code_block(after: &str) -> Option<(Option<String>, &str, &str)> {
    let newline = after.find('\n')?;
    let tag = &after[..newline];
    if !tag.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }

    let body_start = newline + 1;
    let close = after[body_start..].find(FENCE)?;
    let body = &after[body_start..body_start + close];
    let remainder = &after[body_start + close + FENCE.len()..];
    let language = (!tag.is_empty()).then(|| tag.to_string());
    Some((language, body, remainder))
}

fn parse_lines(segment: &str, out: &mut Vec<ContentNode>) {
    for line in segment.split_inclusive('\n') {
        if let Some(item) = line.strip_prefix(BULLET) {
            let mut children = Vec::new();
            parse_inline(item.trim_end_matches('\n'), &mut children);
            out.push(ContentNode::ListItem(children));
        } else {
            parse_inline(line, out);
        }
    }
}

fn parse_inline(text: &str, out: &mut Vec<ContentNode>) {
    let mut rest = text;
    while !rest.is_empty() {
        let Some(pos) = rest.find(['`', '*']) else {
            push_text(out, rest);
            return;
        };

        match inline_span(&rest[pos..]) {
            Some((node, remainder)) => {
                push_text(out, &rest[..pos]);
                out.push(node);
                rest = remainder;
            }
            None => {
                // Markers are ASCII, so one byte forward is a char boundary.
                push_text(out, &rest[..=pos]);
                rest = &rest[pos + 1..];
            }
        }
    }
}

fn inline_span(s: &str) -> Option<(ContentNode, &str)> {
    if let Some(inner) = s.strip_prefix("**") {
        let end = inner.find("**")?;
        let body = &inner[..end];
        if body.is_empty() || body.contains('\n') {
            return None;
        }
        return Some((ContentNode::Bold(body.to_string()), &inner[end + 2..]));
    }

    let inner = s.strip_prefix('`')?;
    let end = inner.find('`')?;
    let body = &inner[..end];
    if body.is_empty() {
        return None;
    }
    Some((ContentNode::InlineCode(body.to_string()), &inner[end + 1..]))
}

fn push_text(out: &mut Vec<ContentNode>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(ContentNode::Text(last)) = out.last_mut() {
        last.push_str(text);
    } else {
        out.push(ContentNode::Text(text.to_string()));
    }
}

#[cfg(test)]
#[path = "tests/content_tests.rs"]
mod tests;
