use crate::config::RenderConfig;
use crate::node::{Align, Node};

/// Convert a tree to markdown text.
///
/// Blocks are separated by a blank line and the output ends with a newline,
/// unless there is nothing to write.
pub fn render(node: &Node, config: &RenderConfig) -> String {
    let mut out = block_to_markdown(node, config);
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn blocks_to_markdown(nodes: &[Node], config: &RenderConfig, separator: &str) -> String {
    nodes
        .iter()
        .map(|node| block_to_markdown(node, config))
        .collect::<Vec<_>>()
        .join(separator)
}

fn block_to_markdown(node: &Node, config: &RenderConfig) -> String {
    match node {
        Node::Root { children } => blocks_to_markdown(children, config, "\n\n"),
        Node::Heading { depth, children } => {
            let mut out = "#".repeat(usize::from(*depth));
            let content = heading_content(children, config);
            if !content.is_empty() {
                out.push(' ');
                out.push_str(&content);
            }
            out
        }
        Node::Paragraph { children } => inlines_to_markdown(children, config, true),
        Node::TableCell { children } => inlines_to_markdown(children, config, false),
        Node::Blockquote { children } => {
            let body = blocks_to_markdown(children, config, "\n\n");
            prefix_lines(&body, "> ", ">")
        }
        Node::List {
            ordered,
            start,
            spread,
            children,
        } => list_to_markdown(*ordered, *start, *spread, children, config),
        Node::ListItem { .. } => item_to_markdown(node, &config.bullet, false, config),
        Node::Code { lang, value } => code_block(lang.as_deref(), value, config),
        Node::Html { value } => value.clone(),
        Node::Yaml { value } if value.is_empty() => "---\n---".to_string(),
        Node::Yaml { value } => format!("---\n{value}\n---"),
        Node::ThematicBreak => config.rule.clone(),
        Node::Definition {
            label, url, title, ..
        } => format!("[{label}]: {}", destination(url, title.as_deref())),
        Node::FootnoteDefinition {
            label, children, ..
        } => {
            let body = blocks_to_markdown(children, config, "\n\n");
            format!("[^{label}]: {}", indent_rest(&body, "    "))
        }
        Node::Table { align, children } => table_to_markdown(align, children, config),
        Node::TableRow { children } => row_to_markdown(children, config),
        Node::Text { .. }
        | Node::InlineCode { .. }
        | Node::Emphasis { .. }
        | Node::Strong { .. }
        | Node::Delete { .. }
        | Node::Break
        | Node::Link { .. }
        | Node::Image { .. }
        | Node::FootnoteReference { .. } => inline_to_markdown(node, config, false),
    }
}

/// Render inline content. With `at_line_start`, the first node opens a line,
/// as does every node after a hard break.
fn inlines_to_markdown(nodes: &[Node], config: &RenderConfig, at_line_start: bool) -> String {
    let mut out = String::new();
    let mut line_start = at_line_start;
    for node in nodes {
        out.push_str(&inline_to_markdown(node, config, line_start));
        line_start = matches!(node, Node::Break);
    }
    out
}

/// Heading content, with a trailing `#` run escaped so it is not read as a
/// closing sequence.
fn heading_content(children: &[Node], config: &RenderConfig) -> String {
    let mut content = inlines_to_markdown(children, config, false);
    let body = content.trim_end_matches('#');
    let closing = body.len() < content.len() && (body.is_empty() || body.ends_with([' ', '\t']));
    let split = body.len();
    if closing {
        content.insert(split, '\\');
    }
    content
}

fn inline_to_markdown(node: &Node, config: &RenderConfig, at_line_start: bool) -> String {
    match node {
        Node::Text { value } => escape(value, at_line_start),
        Node::InlineCode { value } => code_span(value),
        Node::Emphasis { children } => {
            let content = inlines_to_markdown(children, config, false);
            format!("{0}{content}{0}", config.emphasis)
        }
        Node::Strong { children } => {
            let content = inlines_to_markdown(children, config, false);
            format!("{0}{content}{0}", config.strong)
        }
        Node::Delete { children } => {
            format!("~~{}~~", inlines_to_markdown(children, config, false))
        }
        Node::Break => "\\\n".to_string(),
        Node::Link {
            url,
            title,
            children,
        } => format!(
            "[{}]({})",
            inlines_to_markdown(children, config, false),
            destination(url, title.as_deref())
        ),
        Node::Image { url, title, alt } => {
            format!("![{}]({})", escape(alt, false), destination(url, title.as_deref()))
        }
        Node::FootnoteReference { label, .. } => format!("[^{label}]"),
        Node::Html { value } => value.clone(),
        // Block content in an inline position (a handler can put it there)
        _ => block_to_markdown(node, config),
    }
}

fn list_to_markdown(
    ordered: bool,
    start: Option<u64>,
    spread: bool,
    items: &[Node],
    config: &RenderConfig,
) -> String {
    let first = start.unwrap_or(1);
    let separator = if spread { "\n\n" } else { "\n" };
    items
        .iter()
        .zip(first..)
        .map(|(item, number)| {
            let marker = if ordered {
                format!("{number}.")
            } else {
                config.bullet.clone()
            };
            item_to_markdown(item, &marker, spread, config)
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn item_to_markdown(item: &Node, marker: &str, list_spread: bool, config: &RenderConfig) -> String {
    let (checked, spread, children) = match item {
        Node::ListItem {
            checked,
            spread,
            children,
        } => (*checked, *spread, children.as_slice()),
        other => (None, false, std::slice::from_ref(other)),
    };

    let separator = if spread || list_spread { "\n\n" } else { "\n" };
    let mut body = blocks_to_markdown(children, config, separator);
    if let Some(checked) = checked {
        let mark = if checked { 'x' } else { ' ' };
        body = format!("[{mark}] {body}");
    }

    if body.is_empty() {
        return marker.to_string();
    }
    let indent = " ".repeat(marker.len() + 1);
    format!("{marker} {}", indent_rest(&body, &indent))
}

fn code_block(lang: Option<&str>, value: &str, config: &RenderConfig) -> String {
    let mut fence = if config.fence.is_empty() {
        "```".to_string()
    } else {
        config.fence.clone()
    };
    let mark = fence.chars().next().unwrap_or('`');
    while value.contains(fence.as_str()) {
        fence.push(mark);
    }

    let mut out = fence.clone();
    out.push_str(lang.unwrap_or_default());
    out.push('\n');
    if !value.is_empty() {
        out.push_str(value);
        out.push('\n');
    }
    out.push_str(&fence);
    out
}

fn code_span(value: &str) -> String {
    let longest_run = value
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let ticks = "`".repeat(longest_run + 1);
    if value.starts_with('`') || value.ends_with('`') {
        format!("{ticks} {value} {ticks}")
    } else {
        format!("{ticks}{value}{ticks}")
    }
}

fn table_to_markdown(align: &[Option<Align>], rows: &[Node], config: &RenderConfig) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);

    for (index, row) in rows.iter().enumerate() {
        let cells = row.children().unwrap_or_default();
        lines.push(row_to_markdown(cells, config));

        // Delimiter row after the header
        if index == 0 {
            let columns = cells.len().max(align.len());
            let delimiters: Vec<&str> = (0..columns)
                .map(|column| match align.get(column).copied().flatten() {
                    Some(Align::Left) => ":--",
                    Some(Align::Center) => ":-:",
                    Some(Align::Right) => "--:",
                    None => "---",
                })
                .collect();
            lines.push(format!("| {} |", delimiters.join(" | ")));
        }
    }

    lines.join("\n")
}

fn row_to_markdown(cells: &[Node], config: &RenderConfig) -> String {
    let cells: Vec<String> = cells
        .iter()
        .map(|cell| block_to_markdown(cell, config).replace('|', "\\|"))
        .collect();
    format!("| {} |", cells.join(" | "))
}

fn destination(url: &str, title: Option<&str>) -> String {
    let mut out = if url.is_empty() || url.contains(char::is_whitespace) {
        format!("<{url}>")
    } else {
        url.to_string()
    };
    if let Some(title) = title {
        out.push_str(&format!(" \"{}\"", title.replace('"', "\\\"")));
    }
    out
}

/// Backslash-escape text so it reads back as the same text.
///
/// Inline syntax is escaped anywhere. Block markers (`#`, `>`, list bullets
/// and numbers, setext underlines, fences) only at the start of a line:
/// after every newline, and at the first character when `at_line_start`.
fn escape(text: &str, at_line_start: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let marker = if index > 0 || at_line_start {
            block_marker(line)
        } else {
            None
        };
        for (offset, ch) in line.char_indices() {
            if Some(offset) == marker || is_unsafe(ch, &line[offset + ch.len_utf8()..]) {
                out.push('\\');
            }
            out.push(ch);
        }
    }
    out
}

/// Characters that start inline syntax. `rest` is the text after `ch`.
fn is_unsafe(ch: char, rest: &str) -> bool {
    match ch {
        '\\' | '*' | '_' | '`' | '[' | ']' => true,
        '&' => is_entity_name(rest),
        '<' => rest.starts_with(|c: char| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?')),
        _ => false,
    }
}

/// `name;` or `#123;` after an `&`, which would be decoded as a character
/// reference.
fn is_entity_name(rest: &str) -> bool {
    let Some((name, _)) = rest.split_once(';') else {
        return false;
    };
    !name.is_empty() && name.len() <= 32 && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '#')
}

/// Byte offset of the character that would open a block construct if `line`
/// started a line of markdown.
fn block_marker(line: &str) -> Option<usize> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let ends_marker = |after: &str| after.is_empty() || after.starts_with([' ', '\t']);

    match rest.chars().next()? {
        '>' => Some(indent),
        '#' => {
            let hashes = rest.len() - rest.trim_start_matches('#').len();
            (hashes <= 6 && ends_marker(&rest[hashes..])).then_some(indent)
        }
        '+' => ends_marker(&rest[1..]).then_some(indent),
        '-' => (ends_marker(&rest[1..]) || rest.trim_end().chars().all(|c| c == '-' || c == ' '))
            .then_some(indent),
        '=' => rest.trim_end().chars().all(|c| c == '=').then_some(indent),
        '~' => rest.starts_with("~~~").then_some(indent),
        '0'..='9' => {
            let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            let after = &rest[digits..];
            (digits <= 9 && after.starts_with(['.', ')']) && ends_marker(&after[1..]))
                .then_some(indent + digits)
        }
        _ => None,
    }
}

/// Indent every line after the first, leaving blank lines empty.
fn indent_rest(text: &str, indent: &str) -> String {
    let mut lines = text.split('\n');
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
    }
    out
}

fn prefix_lines(text: &str, prefix: &str, blank: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                blank.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::node::Node;
    use crate::{parse, render};

    fn roundtrip(markdown: &str) -> String {
        let config = Config::default();
        render(&parse(markdown, &config.parse), &config.render)
    }

    #[test]
    fn headings() {
        assert_eq!(roundtrip("# Fo\n\n## Fooooo\n"), "# Fo\n\n## Fooooo\n");
    }

    #[test]
    fn empty_heading() {
        assert_eq!(roundtrip("# \n\n## Foo\n"), "#\n\n## Foo\n");
    }

    #[test]
    fn empty_root() {
        let config = Config::default();
        assert_eq!(render(&Node::root(vec![]), &config.render), "");
    }

    #[test]
    fn bold_and_italic() {
        assert_eq!(
            roundtrip("**bold** and *italic*\n"),
            "**bold** and *italic*\n"
        );
    }

    #[test]
    fn inline_code() {
        assert_eq!(roundtrip("Use `code` here\n"), "Use `code` here\n");
        assert_eq!(roundtrip("``a`b``\n"), "``a`b``\n");
    }

    #[test]
    fn code_block() {
        assert_eq!(
            roundtrip("```rust\nlet x = 1;\n```\n"),
            "```rust\nlet x = 1;\n```\n"
        );
    }

    #[test]
    fn unordered_list() {
        assert_eq!(roundtrip("- one\n- two\n"), "- one\n- two\n");
    }

    #[test]
    fn ordered_list() {
        assert_eq!(roundtrip("1. one\n2. two\n"), "1. one\n2. two\n");
    }

    #[test]
    fn nested_list() {
        assert_eq!(roundtrip("- a\n  - b\n"), "- a\n  - b\n");
    }

    #[test]
    fn loose_list() {
        assert_eq!(roundtrip("- one\n\n- two\n"), "- one\n\n- two\n");
    }

    #[test]
    fn task_list() {
        assert_eq!(
            roundtrip("- [ ] todo\n- [x] done\n"),
            "- [ ] todo\n- [x] done\n"
        );
    }

    #[test]
    fn blockquote() {
        assert_eq!(roundtrip("> one\n>\n> two\n"), "> one\n>\n> two\n");
    }

    #[test]
    fn links_and_images() {
        assert_eq!(
            roundtrip("## [![Foo](bar.png)](bar.com)\n"),
            "## [![Foo](bar.png)](bar.com)\n"
        );
        assert_eq!(
            roundtrip("[Foo](bar.com \"Bar\")\n"),
            "[Foo](bar.com \"Bar\")\n"
        );
    }

    #[test]
    fn definitions() {
        assert_eq!(
            roundtrip("[one]: example.com\n\n[two]: example.com\n"),
            "[one]: example.com\n\n[two]: example.com\n"
        );
    }

    #[test]
    fn footnotes() {
        assert_eq!(
            roundtrip("Text[^a].\n\n[^a]: Note.\n"),
            "Text[^a].\n\n[^a]: Note.\n"
        );
    }

    #[test]
    fn table() {
        assert_eq!(
            roundtrip("| A | B |\n|:--|--:|\n| 1 | 2 |\n"),
            "| A | B |\n| :-- | --: |\n| 1 | 2 |\n"
        );
    }

    #[test]
    fn horizontal_rule() {
        assert_eq!(roundtrip("***\n"), "***\n");
    }

    #[test]
    fn escapes_special_chars() {
        assert_eq!(roundtrip("a \\* b\n"), "a \\* b\n");
        assert_eq!(roundtrip("a\\_b\n"), "a\\_b\n");
    }

    #[test]
    fn escapes_block_markers_at_line_start() {
        for markdown in [
            "\\# not a heading\n",
            "1\\. not a list\n",
            "2\\) not a list\n",
            "\\- not a list\n",
            "\\+ not a list\n",
            "\\> not a quote\n",
            "Foo\n\\===\n",
            "Foo\n\\- bar\n",
        ] {
            assert_eq!(roundtrip(markdown), markdown);
        }
    }

    #[test]
    fn block_markers_mid_line_are_left_alone() {
        assert_eq!(roundtrip("a # b - c 1. d > e\n"), "a # b - c 1. d > e\n");
        assert_eq!(roundtrip("## C#\n"), "## C#\n");
    }

    #[test]
    fn escapes_character_references_and_html() {
        assert_eq!(
            roundtrip("\\&copy; and \\<div>\n"),
            "\\&copy; and \\<div>\n"
        );
        assert_eq!(roundtrip("&amp;copy;\n"), "\\&copy;\n");
        assert_eq!(roundtrip("a & b < c\n"), "a & b < c\n");
    }

    #[test]
    fn escapes_closing_hashes_in_headings() {
        assert_eq!(roundtrip("# \\#\n"), "# \\#\n");
        assert_eq!(roundtrip("## Foo \\##\n"), "## Foo \\##\n");
    }

    #[test]
    fn frontmatter() {
        assert_eq!(
            roundtrip("---\ntitle: x\n---\n\n# Fo\n"),
            "---\ntitle: x\n---\n\n# Fo\n"
        );
    }

    #[test]
    fn duplicate_definitions() {
        assert_eq!(roundtrip("[a]: x\n\n[a]: y\n"), "[a]: x\n\n[a]: y\n");
    }

    #[test]
    fn hard_break() {
        assert_eq!(roundtrip("line one\\\nline two\n"), "line one\\\nline two\n");
    }

    #[test]
    fn custom_markers() {
        let mut config = Config::default();
        config.render.bullet = "*".to_string();
        config.render.rule = "---".to_string();
        let tree = Node::root(vec![
            Node::List {
                ordered: false,
                start: None,
                spread: false,
                children: vec![Node::ListItem {
                    checked: None,
                    spread: false,
                    children: vec![Node::paragraph("one")],
                }],
            },
            Node::ThematicBreak,
        ]);
        assert_eq!(render(&tree, &config.render), "* one\n\n---\n");
    }
}
