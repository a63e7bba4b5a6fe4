use super::*;

fn text(value: &str) -> ContentNode {
    ContentNode::Text(value.to_string())
}

#[test]
fn plain_text_is_a_single_node() {
    assert_eq!(parse("just words"), vec![text("just words")]);
}

#[test]
fn extracts_fenced_code_block_with_language() {
    let nodes = parse("Intro\n```python\nprint('hi')\n```\nDone");
    assert_eq!(
        nodes,
        vec![
            text("Intro\n"),
            ContentNode::CodeBlock {
                language: Some("python".into()),
                body: "print('hi')".into(),
            },
            text("\nDone"),
        ]
    );
}

#[test]
fn code_block_without_language_tag() {
    let nodes = parse("```\nlet x = 1;\n```");
    assert_eq!(
        nodes,
        vec![ContentNode::CodeBlock {
            language: None,
            body: "let x = 1;".into(),
        }]
    );
}

#[test]
fn inline_code_and_bold_spans() {
    let nodes = parse("Use `cargo` and **care**");
    assert_eq!(
        nodes,
        vec![
            text("Use "),
            ContentNode::InlineCode("cargo".into()),
            text(" and "),
            ContentNode::Bold("care".into()),
        ]
    );
}

#[test]
fn bullet_lines_become_list_items() {
    let nodes = parse("Points:\n• one\n• **two**");
    assert_eq!(
        nodes,
        vec![
            text("Points:\n"),
            ContentNode::ListItem(vec![text("one")]),
            ContentNode::ListItem(vec![ContentNode::Bold("two".into())]),
        ]
    );
}

#[test]
fn unterminated_markers_stay_literal() {
    assert_eq!(parse("a ** b ` c"), vec![text("a ** b ` c")]);
    assert_eq!(
        parse("```rust\nfn main() {}"),
        vec![text("```rust\nfn main() {}")]
    );
}

#[test]
fn markup_in_user_text_is_kept_as_text() {
    let body = "<script>alert(1)</script> <b>hi</b>";
    assert_eq!(parse(body), vec![text(body)]);
}

#[test]
fn plain_text_drops_formatting() {
    let nodes = parse("**Summary:**\n• Growth\n```\ncode\n```");
    assert_eq!(plain_text(&nodes), "Summary:\n• Growth\ncode\n");
}
