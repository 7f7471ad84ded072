use std::collections::VecDeque;
use std::ops::Range;

use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

use crate::config::ParseConfig;
use crate::node::{Align, Node};
use crate::plain_text::to_string;

/// Split YAML front matter off the start of the document.
///
/// Front matter opens with a `---` line, has a non-blank first line and
/// closes with a `---` or `...` line. Returns the YAML between the fences and
/// the markdown after them.
fn split_frontmatter(markdown: &str) -> Option<(&str, &str)> {
    let mut lines = markdown.split_inclusive('\n');
    let opening = lines.next()?;
    if opening.trim_end() != "---" {
        return None;
    }

    let body_start = opening.len();
    let mut offset = body_start;
    for (index, line) in lines.enumerate() {
        let trimmed = line.trim_end();
        let closing = trimmed == "---" || trimmed == "...";
        if index == 0 && (closing || trimmed.is_empty()) {
            return None;
        }
        if closing {
            let yaml = markdown[body_start..offset].trim_end_matches(['\n', '\r']);
            let rest = markdown[offset + line.len()..].trim_start_matches(['\n', '\r']);
            return Some((yaml, rest));
        }
        offset += line.len();
    }
    None
}

fn parser_options(config: &ParseConfig) -> Options {
    let mut options = Options::empty();
    if config.tables {
        options.insert(Options::ENABLE_TABLES);
    }
    if config.footnotes {
        options.insert(Options::ENABLE_FOOTNOTES);
    }
    if config.strikethrough {
        options.insert(Options::ENABLE_STRIKETHROUGH);
    }
    if config.tasklists {
        options.insert(Options::ENABLE_TASKLISTS);
    }
    options
}

/// Parse markdown text into an mdast `root` node.
///
/// pulldown-cmark resolves link reference definitions instead of emitting
/// them; they are put back as `definition` nodes at their source position.
pub fn parse(markdown: &str, config: &ParseConfig) -> Node {
    let (frontmatter, markdown) = match split_frontmatter(markdown) {
        Some((yaml, rest)) if config.frontmatter => (Some(yaml), rest),
        _ => (None, markdown),
    };
    let options = parser_options(config);
    let parser = Parser::new_ext(markdown, options);

    let mut definitions = reference_definitions(&parser, 0);
    let events: Vec<(Event<'_>, Range<usize>)> = parser.into_offset_iter().collect();

    let mut covered = covered_ranges(&events);
    covered.extend(definitions.iter().map(|(span, _)| span.clone()));
    for gap in uncovered(0..markdown.len(), covered) {
        recover_shadowed(markdown, gap, options, &mut definitions);
    }
    definitions.sort_by_key(|(span, _)| span.start);

    let mut state = ParseState::new(
        definitions
            .into_iter()
            .map(|(span, node)| (span.start, node))
            .collect(),
    );
    if let Some(yaml) = frontmatter {
        state.push(Node::Yaml {
            value: yaml.to_string(),
        });
    }
    for (event, range) in events {
        process_event(event, range, &mut state);
    }

    state.finish()
}

/// Definitions pulldown-cmark resolved, with source spans offset by `base`.
fn reference_definitions(parser: &Parser<'_>, base: usize) -> Vec<(Range<usize>, Node)> {
    parser
        .reference_definitions()
        .iter()
        .map(|(label, def)| {
            let node = Node::Definition {
                identifier: label.to_lowercase(),
                label: label.to_string(),
                url: def.dest.to_string(),
                title: def.title.as_ref().map(|title| title.to_string()),
            };
            (base + def.span.start..base + def.span.end, node)
        })
        .collect()
}

/// Source ranges claimed by an event. Containers are skipped so that text
/// between their blocks stays visible.
fn covered_ranges(events: &[(Event<'_>, Range<usize>)]) -> Vec<Range<usize>> {
    events
        .iter()
        .filter_map(|(event, range)| match event {
            Event::Start(
                Tag::BlockQuote(_) | Tag::List(_) | Tag::Item | Tag::FootnoteDefinition(_),
            )
            | Event::End(_) => None,
            _ => Some(range.clone()),
        })
        .collect()
}

/// The parts of `within` not overlapped by any of `covered`.
fn uncovered(within: Range<usize>, mut covered: Vec<Range<usize>>) -> Vec<Range<usize>> {
    covered.sort_by_key(|range| range.start);
    let mut gaps = Vec::new();
    let mut cursor = within.start;
    for range in covered {
        if range.start > cursor {
            gaps.push(cursor..range.start.min(within.end));
        }
        cursor = cursor.max(range.end);
    }
    if cursor < within.end {
        gaps.push(cursor..within.end);
    }
    gaps
}

/// Find definitions in `gap` that lost to an earlier one with the same label.
///
/// pulldown-cmark consumes such duplicates without an event or an entry in
/// its definition map. Source no event covers holds only container markers,
/// blank lines and definitions, so parsing it alone lists them. Duplicates
/// of each other in one gap surface one per pass.
fn recover_shadowed(
    markdown: &str,
    gap: Range<usize>,
    options: Options,
    found: &mut Vec<(Range<usize>, Node)>,
) {
    let text = &markdown[gap.clone()];
    if !text.contains("]:") {
        return;
    }

    let parser = Parser::new_ext(text, options);
    let recovered = reference_definitions(&parser, gap.start);
    if recovered.is_empty() {
        return;
    }

    let spans = recovered.iter().map(|(span, _)| span.clone()).collect();
    found.extend(recovered);
    for rest in uncovered(gap, spans) {
        recover_shadowed(markdown, rest, options, found);
    }
}

/// An element under construction.
enum Frame {
    Root,
    Heading(u8),
    /// `implicit` paragraphs wrap the inline content of tight list items.
    Paragraph { implicit: bool },
    Blockquote,
    List { ordered: bool, start: Option<u64> },
    Item { checked: Option<bool>, spread: bool },
    Code { lang: Option<String> },
    Html,
    FootnoteDefinition(String),
    Table(Vec<Option<Align>>),
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Delete,
    Link { url: String, title: Option<String> },
    Image { url: String, title: Option<String> },
    /// Elements without a node of their own; children go to the parent.
    Transparent,
}

struct Open {
    frame: Frame,
    children: Vec<Node>,
}

struct ParseState {
    stack: Vec<Open>,
    // Reference definitions not yet placed, by source offset
    definitions: VecDeque<(usize, Node)>,
}

impl ParseState {
    fn new(definitions: VecDeque<(usize, Node)>) -> Self {
        Self {
            stack: vec![Open {
                frame: Frame::Root,
                children: Vec::new(),
            }],
            definitions,
        }
    }

    fn open(&mut self, frame: Frame) {
        self.stack.push(Open {
            frame,
            children: Vec::new(),
        });
    }

    /// Close the innermost element and hand its node(s) to the parent.
    fn close(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        if let Some(open) = self.stack.pop() {
            for node in build(open) {
                self.push(node);
            }
        }
    }

    fn push(&mut self, node: Node) {
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        // Adjacent text merges, so soft breaks and split runs read as one value
        if let (Node::Text { value }, Some(Node::Text { value: previous })) =
            (&node, top.children.last_mut())
        {
            previous.push_str(value);
            return;
        }
        top.children.push(node);
    }

    fn top(&self) -> Option<&Frame> {
        self.stack.last().map(|open| &open.frame)
    }

    fn in_item(&self) -> bool {
        matches!(self.top(), Some(Frame::Item { .. }))
    }

    /// Block containers that can hold definitions.
    fn in_container(&self) -> bool {
        matches!(
            self.top(),
            Some(Frame::Blockquote | Frame::Item { .. } | Frame::FootnoteDefinition(_))
        )
    }

    fn close_implicit_paragraph(&mut self) {
        if matches!(self.top(), Some(Frame::Paragraph { implicit: true })) {
            self.close();
        }
    }

    /// Inline content directly inside a list item belongs to a paragraph.
    fn prepare_inline(&mut self) {
        if self.in_item() {
            self.open(Frame::Paragraph { implicit: true });
        }
    }

    /// Place definitions that start before `offset` in the current container.
    fn flush_definitions(&mut self, offset: usize) {
        while self
            .definitions
            .front()
            .is_some_and(|(start, _)| *start < offset)
        {
            if let Some((_, node)) = self.definitions.pop_front() {
                self.push(node);
            }
        }
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.close();
        }
        self.flush_definitions(usize::MAX);
        let children = self
            .stack
            .pop()
            .map(|open| open.children)
            .unwrap_or_default();
        Node::Root { children }
    }
}

fn process_event(event: Event, range: Range<usize>, state: &mut ParseState) {
    match event {
        Event::Start(tag) => {
            if is_inline_tag(&tag) {
                state.prepare_inline();
            } else {
                state.close_implicit_paragraph();
                state.flush_definitions(range.start);
            }
            start_tag(tag, state);
        }
        Event::End(_) => {
            state.close_implicit_paragraph();
            if state.in_container() {
                state.flush_definitions(range.end);
            }
            state.close();
        }

        // Text content
        Event::Text(text) => {
            state.prepare_inline();
            state.push(Node::text(text.into_string()));
        }

        // Inline code
        Event::Code(code) => {
            state.prepare_inline();
            state.push(Node::InlineCode {
                value: code.into_string(),
            });
        }

        Event::Html(html) => {
            state.push(Node::Html {
                value: html.into_string(),
            });
        }
        Event::InlineHtml(html) => {
            state.prepare_inline();
            state.push(Node::Html {
                value: html.into_string(),
            });
        }

        Event::FootnoteReference(label) => {
            state.prepare_inline();
            state.push(Node::FootnoteReference {
                identifier: label.to_lowercase(),
                label: label.into_string(),
            });
        }

        // Task list checkboxes
        Event::TaskListMarker(checked) => {
            let slot = state.stack.iter_mut().rev().find_map(|open| match &mut open.frame {
                Frame::Item { checked: slot, .. } => Some(slot),
                _ => None,
            });
            if let Some(slot) = slot {
                *slot = Some(checked);
            }
        }

        // Horizontal rule
        Event::Rule => {
            state.close_implicit_paragraph();
            state.flush_definitions(range.start);
            state.push(Node::ThematicBreak);
        }

        // Soft/hard breaks
        Event::SoftBreak => {
            state.prepare_inline();
            state.push(Node::text("\n"));
        }
        Event::HardBreak => {
            state.prepare_inline();
            state.push(Node::Break);
        }

        // Ignore other events
        _ => {}
    }
}

fn is_inline_tag(tag: &Tag) -> bool {
    matches!(
        tag,
        Tag::Emphasis
            | Tag::Strong
            | Tag::Strikethrough
            | Tag::Link { .. }
            | Tag::Image { .. }
    )
}

fn start_tag(tag: Tag, state: &mut ParseState) {
    let frame = match tag {
        Tag::Heading { level, .. } => Frame::Heading(heading_level_to_u8(level)),
        Tag::Paragraph => {
            if let Some(Frame::Item { spread, .. }) =
                state.stack.last_mut().map(|open| &mut open.frame)
            {
                *spread = true;
            }
            Frame::Paragraph { implicit: false }
        }
        Tag::BlockQuote(..) => Frame::Blockquote,
        Tag::CodeBlock(kind) => {
            let lang = match kind {
                CodeBlockKind::Fenced(lang) => {
                    let lang = lang.into_string();
                    if lang.is_empty() { None } else { Some(lang) }
                }
                CodeBlockKind::Indented => None,
            };
            Frame::Code { lang }
        }
        Tag::HtmlBlock => Frame::Html,
        Tag::List(first_item) => Frame::List {
            ordered: first_item.is_some(),
            start: first_item,
        },
        Tag::Item => Frame::Item {
            checked: None,
            spread: false,
        },
        Tag::FootnoteDefinition(label) => Frame::FootnoteDefinition(label.into_string()),
        Tag::Table(alignments) => Frame::Table(alignments.iter().map(alignment).collect()),
        Tag::TableHead | Tag::TableRow => Frame::TableRow,
        Tag::TableCell => Frame::TableCell,
        Tag::Emphasis => Frame::Emphasis,
        Tag::Strong => Frame::Strong,
        Tag::Strikethrough => Frame::Delete,
        Tag::Link {
            dest_url, title, ..
        } => Frame::Link {
            url: dest_url.into_string(),
            title: non_empty(title.into_string()),
        },
        Tag::Image {
            dest_url, title, ..
        } => Frame::Image {
            url: dest_url.into_string(),
            title: non_empty(title.into_string()),
        },
        _ => Frame::Transparent,
    };
    state.open(frame);
}

/// Turn a finished element into the node(s) it contributes to its parent.
fn build(open: Open) -> Vec<Node> {
    let Open { frame, children } = open;
    let node = match frame {
        Frame::Root => Node::Root { children },
        Frame::Heading(depth) => Node::Heading { depth, children },
        Frame::Paragraph { .. } => Node::Paragraph { children },
        Frame::Blockquote => Node::Blockquote { children },
        Frame::List { ordered, start } => {
            let spread = children
                .iter()
                .any(|item| matches!(item, Node::ListItem { spread: true, .. }));
            Node::List {
                ordered,
                start,
                spread,
                children,
            }
        }
        Frame::Item { checked, spread } => Node::ListItem {
            checked,
            spread,
            children,
        },
        Frame::Code { lang } => {
            let mut value = concat(&children);
            if value.ends_with('\n') {
                value.pop();
            }
            Node::Code { lang, value }
        }
        Frame::Html => {
            let value = concat(&children);
            Node::Html {
                value: value.trim_end_matches('\n').to_string(),
            }
        }
        Frame::FootnoteDefinition(label) => Node::FootnoteDefinition {
            identifier: label.to_lowercase(),
            label,
            children,
        },
        Frame::Table(align) => Node::Table { align, children },
        Frame::TableRow => Node::TableRow { children },
        Frame::TableCell => Node::TableCell { children },
        Frame::Emphasis => Node::Emphasis { children },
        Frame::Strong => Node::Strong { children },
        Frame::Delete => Node::Delete { children },
        Frame::Link { url, title } => Node::Link {
            url,
            title,
            children,
        },
        Frame::Image { url, title } => Node::Image {
            url,
            title,
            alt: concat(&children),
        },
        Frame::Transparent => return children,
    };
    vec![node]
}

fn concat(children: &[Node]) -> String {
    children.iter().map(to_string).collect()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn alignment(alignment: &Alignment) -> Option<Align> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some(Align::Left),
        Alignment::Center => Some(Align::Center),
        Alignment::Right => Some(Align::Right),
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
