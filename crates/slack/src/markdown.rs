//! Markdown → Slack mrkdwn conversion.
//!
//! Slack's mrkdwn dialect is close to markdown but not identical: bold is
//! `*text*`, italic `_text_`, strikethrough `~text~`, links `<url|text>`,
//! and there are no headings. This renders the markdown event stream into
//! that dialect, downgrading headings to bold lines.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Convert markdown text to Slack mrkdwn.
pub fn markdown_to_mrkdwn(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(text, options);

    let mut out = String::with_capacity(text.len());
    let mut list_stack: Vec<Option<u64>> = Vec::new();

    for event in parser {
        match event {
            Event::Start(tag) => match tag {
                Tag::Strong => out.push('*'),
                Tag::Emphasis => out.push('_'),
                Tag::Strikethrough => out.push('~'),
                Tag::Heading { .. } => out.push('*'),
                Tag::Link { dest_url, .. } => {
                    out.push('<');
                    out.push_str(&dest_url);
                    out.push('|');
                },
                Tag::CodeBlock(kind) => {
                    out.push_str("```");
                    if let CodeBlockKind::Fenced(info) = kind
                        && !info.is_empty()
                    {
                        out.push_str(&info);
                    }
                    out.push('\n');
                },
                Tag::List(start) => list_stack.push(start),
                Tag::Item => {
                    let marker = match list_stack.last_mut() {
                        Some(Some(n)) => {
                            let marker = format!("{n}. ");
                            *n += 1;
                            marker
                        },
                        _ => "• ".to_string(),
                    };
                    out.push_str(&marker);
                },
                _ => {},
            },
            Event::End(tag) => match tag {
                TagEnd::Strong => out.push('*'),
                TagEnd::Emphasis => out.push('_'),
                TagEnd::Strikethrough => out.push('~'),
                TagEnd::Heading(_) => out.push_str("*\n\n"),
                TagEnd::Link => out.push('>'),
                TagEnd::CodeBlock => out.push_str("```\n\n"),
                TagEnd::List(_) => {
                    list_stack.pop();
                    if list_stack.is_empty() {
                        out.push('\n');
                    }
                },
                TagEnd::Item => out.push('\n'),
                TagEnd::Paragraph => out.push_str("\n\n"),
                _ => {},
            },
            Event::Text(text) => out.push_str(&escape_text(&text)),
            Event::Code(code) => {
                out.push('`');
                out.push_str(&escape_text(&code));
                out.push('`');
            },
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("---\n\n"),
            _ => {},
        }
    }

    out.trim_end().to_string()
}

/// Escape the characters Slack treats as control sequences.
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_and_italic() {
        assert_eq!(markdown_to_mrkdwn("**bold** and *italic*"), "*bold* and _italic_");
    }

    #[test]
    fn strikethrough() {
        assert_eq!(markdown_to_mrkdwn("~~gone~~"), "~gone~");
    }

    #[test]
    fn heading_becomes_bold_line() {
        assert_eq!(markdown_to_mrkdwn("## Release notes"), "*Release notes*");
    }

    #[test]
    fn links_use_slack_syntax() {
        assert_eq!(
            markdown_to_mrkdwn("see [docs](https://example.com)"),
            "see <https://example.com|docs>"
        );
    }

    #[test]
    fn inline_and_fenced_code() {
        assert_eq!(markdown_to_mrkdwn("run `ls -la`"), "run `ls -la`");
        let fenced = markdown_to_mrkdwn("```\nlet x = 1;\n```");
        assert_eq!(fenced, "```\nlet x = 1;\n```");
    }

    #[test]
    fn bullet_and_ordered_lists() {
        assert_eq!(markdown_to_mrkdwn("- one\n- two"), "• one\n• two");
        assert_eq!(markdown_to_mrkdwn("1. one\n2. two"), "1. one\n2. two");
    }

    #[test]
    fn control_characters_are_escaped() {
        assert_eq!(markdown_to_mrkdwn("a < b && b > c"), "a &lt; b &amp;&amp; b &gt; c");
    }

    #[test]
    fn plain_text_is_preserved() {
        assert_eq!(markdown_to_mrkdwn("just words"), "just words");
        assert_eq!(markdown_to_mrkdwn(""), "");
    }
}
