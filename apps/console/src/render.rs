use std::fmt::Write as _;

use shared::{
    content::{self, ContentNode},
    domain::{Message, Product, Role, Template},
};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub fn message(message: &Message) -> String {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    format!(
        "[{}] {speaker}:\n{}",
        message.timestamp.format("%H:%M"),
        body(&message.content)
    )
}

/// Renders a message body for the terminal; markup in the text is only
/// ever interpreted through the content parser.
pub fn body(raw: &str) -> String {
    let mut out = String::new();
    for node in content::parse(raw) {
        push_node(&mut out, &node);
    }
    out
}

fn push_node(out: &mut String, node: &ContentNode) {
    match node {
        ContentNode::Text(text) => out.push_str(text),
        ContentNode::InlineCode(code) => {
            let _ = write!(out, "`{code}`");
        }
        ContentNode::Bold(text) => {
            let _ = write!(out, "{BOLD}{text}{RESET}");
        }
        ContentNode::CodeBlock { language, body } => {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            let _ = writeln!(out, "  ┌─ {}", language.as_deref().unwrap_or("code"));
            for line in body.lines() {
                let _ = writeln!(out, "  │ {line}");
            }
            out.push_str("  └─");
        }
        ContentNode::ListItem(children) => {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("  • ");
            for child in children {
                push_node(out, child);
            }
            out.push('\n');
        }
    }
}

pub fn product(product: &Product) -> String {
    let rating = product
        .rating
        .map(|r| format!("★ {r:.1}"))
        .unwrap_or_else(|| "unrated".into());
    let mut line = format!(
        "#{:<3} {} ({}) {} {rating}",
        product.id,
        product.name,
        product.category,
        product.display_price()
    );
    if let Some(supplier) = &product.supplier {
        let _ = write!(line, " by {supplier}");
    }
    if let Some(location) = &product.location {
        let _ = write!(line, ", {location}");
    }
    line
}

pub fn template(template: &Template) -> String {
    format!(
        "#{} [{}] {}\n    {}",
        template.id, template.category, template.title, template.content
    )
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
