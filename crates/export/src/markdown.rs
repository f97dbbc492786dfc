//! Markdown handling for exports.
//!
//! Two independent renderings are produced from the same source text: plain text
//! (syntax removed, used for TXT) and inline-styled HTML (used for the Word shell).
//! The PDF renderer consumes the [`Block`] model parsed here.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

/// Removes Markdown syntax, keeping the readable text.
///
/// Passes are repeated until the text stops changing, so stripping an already
/// stripped string is a no-op.
pub fn strip_markdown(input: &str) -> String {
    let mut current = strip_once(input);
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(input: &str) -> String {
    let lines: Vec<String> = input
        .lines()
        .filter(|line| !is_fence(line))
        .map(|line| strip_inline(&strip_line_prefix(line)))
        .collect();
    lines.join("\n").trim().to_string()
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

fn is_rule(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && (compact.chars().all(|c| c == '-')
            || compact.chars().all(|c| c == '*')
            || compact.chars().all(|c| c == '_'))
}

fn strip_line_prefix(line: &str) -> String {
    if is_rule(line) {
        return String::new();
    }

    let indent_len = line.len() - line.trim_start().len();
    let (indent, mut rest) = line.split_at(indent_len);

    // Heading and quote markers nest ("> > ## x"); peel them all in one go.
    loop {
        let hashes = rest.chars().take_while(|c| *c == '#').count();
        if (1..=6).contains(&hashes) {
            if let Some(text) = rest[hashes..].strip_prefix(' ') {
                rest = text.trim_start();
                continue;
            }
            if rest.len() == hashes {
                return indent.to_string();
            }
        }
        if let Some(text) = rest.strip_prefix('>') {
            rest = text.trim_start();
            continue;
        }
        break;
    }

    // "* item" and "+ item" bullets would otherwise lose their marker to emphasis removal.
    if let Some(text) = rest.strip_prefix("* ").or_else(|| rest.strip_prefix("+ ")) {
        return format!("{indent}- {text}");
    }

    format!("{indent}{rest}")
}

fn strip_inline(line: &str) -> String {
    let without_links = strip_links(line);
    let chars: Vec<char> = without_links.chars().collect();
    let mut output = String::with_capacity(without_links.len());

    for (index, ch) in chars.iter().enumerate() {
        match ch {
            // A free-standing `*` (as in `a * b`) is an operator, not emphasis.
            '*' if is_spaced(&chars, index) => output.push('*'),
            '*' | '`' => {}
            '~' if is_doubled(&chars, index) => {}
            '_' => {
                let before = index.checked_sub(1).and_then(|i| chars.get(i));
                let after = chars.get(index + 1);
                let inside_word = before.is_some_and(|c| c.is_alphanumeric())
                    && after.is_some_and(|c| c.is_alphanumeric());
                if inside_word {
                    output.push('_');
                }
            }
            other => output.push(*other),
        }
    }

    output
}

fn is_spaced(chars: &[char], index: usize) -> bool {
    let before = index.checked_sub(1).and_then(|i| chars.get(i));
    let after = chars.get(index + 1);
    before.is_some_and(|c| c.is_whitespace()) && after.is_some_and(|c| c.is_whitespace())
}

fn is_doubled(chars: &[char], index: usize) -> bool {
    let current = chars[index];
    chars.get(index + 1) == Some(&current)
        || index.checked_sub(1).and_then(|i| chars.get(i)) == Some(&current)
}

/// Rewrites `[label](target)` to `label` and `![alt](src)` to `alt`.
fn strip_links(line: &str) -> String {
    let mut output = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(open) = rest.find('[') {
        let Some(close_rel) = rest[open..].find("](") else {
            break;
        };
        let close = open + close_rel;
        let Some(end_rel) = rest[close + 2..].find(')') else {
            break;
        };
        let end = close + 2 + end_rel;

        let prefix = &rest[..open];
        output.push_str(prefix.strip_suffix('!').unwrap_or(prefix));
        output.push_str(&rest[open + 1..close]);
        rest = &rest[end + 1..];
    }

    output.push_str(rest);
    output
}

/// Block-level view of a Markdown document, used for page layout.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    ListItem { marker: ListMarker, depth: usize, text: String },
    Code(Vec<String>),
    Rule,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListMarker {
    Bullet,
    Number(u64),
}

pub fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn flush_text(text: &mut String, blocks: &mut Vec<Block>, item: Option<ListMarker>, depth: usize) {
    let collected = text.trim().to_string();
    text.clear();
    if collected.is_empty() {
        return;
    }
    blocks.push(match item {
        Some(marker) => Block::ListItem { marker, depth, text: collected },
        None => Block::Paragraph(collected),
    });
}

pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut text = String::new();
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut item_markers: Vec<ListMarker> = Vec::new();
    let mut code: Option<String> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { .. }) | Event::Start(Tag::Paragraph) => {
                if item_markers.is_empty() {
                    text.clear();
                }
            }
            Event::End(TagEnd::Heading(level)) => {
                blocks.push(Block::Heading {
                    level: heading_level(level),
                    text: text.trim().to_string(),
                });
                text.clear();
            }
            Event::End(TagEnd::Paragraph) => {
                if item_markers.is_empty() {
                    flush_text(&mut text, &mut blocks, None, 0);
                } else {
                    text.push(' ');
                }
            }
            Event::Start(Tag::List(start)) => {
                if !item_markers.is_empty() {
                    flush_text(
                        &mut text,
                        &mut blocks,
                        item_markers.last().copied(),
                        lists.len().saturating_sub(1),
                    );
                }
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
            }
            Event::Start(Tag::Item) => {
                let marker = match lists.last_mut() {
                    Some(Some(next)) => {
                        let marker = ListMarker::Number(*next);
                        *next += 1;
                        marker
                    }
                    _ => ListMarker::Bullet,
                };
                item_markers.push(marker);
                text.clear();
            }
            Event::End(TagEnd::Item) => {
                let depth = lists.len().saturating_sub(1);
                flush_text(&mut text, &mut blocks, item_markers.last().copied(), depth);
                item_markers.pop();
            }
            Event::Start(Tag::CodeBlock(_)) => code = Some(String::new()),
            Event::End(TagEnd::CodeBlock) => {
                if let Some(body) = code.take() {
                    let lines = body.trim_end_matches('\n').lines().map(str::to_string).collect();
                    blocks.push(Block::Code(lines));
                }
            }
            Event::Text(value) => match code.as_mut() {
                Some(body) => body.push_str(&value),
                None => text.push_str(&value),
            },
            Event::Code(value) => text.push_str(&value),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::Rule => blocks.push(Block::Rule),
            _ => {}
        }
    }

    blocks
}

const HEADING_STYLES: [(&str, &str); 6] = [
    ("24pt", "#1a365d"),
    ("20pt", "#1e40af"),
    ("16pt", "#1e3a8a"),
    ("14pt", "#334155"),
    ("12pt", "#334155"),
    ("11pt", "#475569"),
];

const RULE_HTML: &str = "<hr style=\"border: 0; border-top: 1px solid #cbd5e1;\"/>\n";

const INLINE_CODE_STYLE: &str =
    "font-family: 'Courier New', monospace; background-color: #f1f5f9; padding: 1px 3px;";

/// Converts Markdown to HTML with inline styles, for the Word-compatible shell.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut html = String::with_capacity(markdown.len() * 2);

    for event in Parser::new(markdown) {
        match event {
            Event::Start(tag) => open_tag(&mut html, &tag),
            Event::End(tag) => close_tag(&mut html, tag),
            Event::Text(value) => push_escaped(&mut html, &value),
            Event::Code(value) => {
                html.push_str(&format!("<span style=\"{INLINE_CODE_STYLE}\">"));
                push_escaped(&mut html, &value);
                html.push_str("</span>");
            }
            Event::SoftBreak => html.push('\n'),
            Event::HardBreak => html.push_str("<br/>\n"),
            Event::Rule => html.push_str(RULE_HTML),
            Event::Html(raw) | Event::InlineHtml(raw) => push_escaped(&mut html, &raw),
            _ => {}
        }
    }

    html
}

fn open_tag(html: &mut String, tag: &Tag<'_>) {
    match tag {
        Tag::Heading { level, .. } => {
            let level = heading_level(*level);
            let (size, color) = HEADING_STYLES[usize::from(level - 1)];
            html.push_str(&format!(
                "<h{level} style=\"font-size: {size}; color: {color}; margin: 12pt 0 6pt 0;\">"
            ));
        }
        Tag::Paragraph => html.push_str("<p style=\"margin: 0 0 8pt 0;\">"),
        Tag::List(Some(start)) => {
            html.push_str(&format!("<ol start=\"{start}\" style=\"margin: 0 0 8pt 18pt;\">\n"))
        }
        Tag::List(None) => html.push_str("<ul style=\"margin: 0 0 8pt 18pt;\">\n"),
        Tag::Item => html.push_str("<li>"),
        Tag::CodeBlock(_) => html.push_str(
            "<pre style=\"font-family: 'Courier New', monospace; font-size: 9pt; \
             background-color: #f1f5f9; padding: 6pt;\">",
        ),
        Tag::Emphasis => html.push_str("<span style=\"font-style: italic;\">"),
        Tag::Strong => html.push_str("<span style=\"font-weight: bold;\">"),
        Tag::Strikethrough => html.push_str("<span style=\"text-decoration: line-through;\">"),
        Tag::Link { dest_url, .. } => {
            html.push_str("<a href=\"");
            push_escaped(html, dest_url);
            html.push_str("\">");
        }
        _ => {}
    }
}

fn close_tag(html: &mut String, tag: TagEnd) {
    match tag {
        TagEnd::Heading(level) => html.push_str(&format!("</h{}>\n", heading_level(level))),
        TagEnd::Paragraph => html.push_str("</p>\n"),
        TagEnd::List(true) => html.push_str("</ol>\n"),
        TagEnd::List(false) => html.push_str("</ul>\n"),
        TagEnd::Item => html.push_str("</li>\n"),
        TagEnd::CodeBlock => html.push_str("</pre>\n"),
        TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => html.push_str("</span>"),
        TagEnd::Link => html.push_str("</a>"),
        _ => {}
    }
}

fn push_escaped(html: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => html.push_str("&amp;"),
            '<' => html.push_str("&lt;"),
            '>' => html.push_str("&gt;"),
            '"' => html.push_str("&quot;"),
            other => html.push(other),
        }
    }
}

/// First heading in the document, used as a title when none was supplied.
pub fn first_heading(markdown: &str) -> Option<String> {
    parse_blocks(markdown).into_iter().find_map(|block| match block {
        Block::Heading { text, .. } if !text.is_empty() => Some(text),
        _ => None,
    })
}
