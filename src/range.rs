//! Locating a heading section among siblings and splicing a replacement in.
//!
//! A section starts at the first heading whose plain text passes the test and
//! runs up to, not including, the next heading of the same or a lower depth.
//! Without such a heading it runs to the end of the parent's children.

use tracing::{debug, trace};

use crate::error::Result;
use crate::node::Node;
use crate::plain_text::to_string;
use crate::predicate::{Options, Predicate};

/// Where a located section lives in its parent.
///
/// Indices refer to the parent's children as they were before the handler's
/// result is spliced in.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub parent: &'a Node,
    /// Index of the opening heading.
    pub start: usize,
    /// Index of the closing node, `None` when the section runs to the end.
    pub end: Option<usize>,
}

/// A located section: `start` is the heading, `end` the closing node, which may
/// be one past the last child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Search the children of `tree` for a section opened by a heading passing
/// `options`, and replace it with what `handler` returns.
///
/// The handler gets the opening heading, the nodes between it and the closing
/// node, the closing node if there is one, and the [`Scope`]. Returning `None`
/// leaves the tree untouched. Returning `Some(nodes)` replaces the heading,
/// the nodes between, and the closing node with `nodes`, skipping `None`
/// slots. An empty list deletes the section along with its closing node.
///
/// A tree without children, or without a matching heading, is left alone.
///
/// # Errors
///
/// [`crate::Error::Pattern`] when a text test is not valid regex syntax. Tests
/// from untyped input are validated earlier, by [`Options::from_value`].
pub fn heading_range<O, F>(tree: &mut Node, options: O, handler: F) -> Result<()>
where
    O: Into<Options>,
    F: FnOnce(&Node, &[Node], Option<&Node>, Scope<'_>) -> Option<Vec<Option<Node>>>,
{
    let (predicate, ignore_final_definitions) = options.into().compile()?;
    search(tree, &predicate, ignore_final_definitions, handler);
    Ok(())
}

/// [`heading_range`] with an already normalized predicate.
pub fn search<F>(tree: &mut Node, predicate: &Predicate, ignore_final_definitions: bool, handler: F)
where
    F: FnOnce(&Node, &[Node], Option<&Node>, Scope<'_>) -> Option<Vec<Option<Node>>>,
{
    let (span, nodes) = {
        let parent = &*tree;
        let Some(children) = parent.children() else {
            trace!(node = parent.type_name(), "node has no children, nothing to search");
            return;
        };
        let Some(span) = locate(children, predicate, ignore_final_definitions) else {
            debug!(children = children.len(), "no heading matched");
            return;
        };

        let Span { start, end } = span;
        let scope = Scope {
            parent,
            start,
            end: (end < children.len()).then_some(end),
        };
        let nodes = handler(
            &children[start],
            &children[start + 1..end],
            children.get(end),
            scope,
        );
        (span, nodes)
    };

    let Some(nodes) = nodes else {
        trace!(start = span.start, "handler left the section unchanged");
        return;
    };

    if let Some(children) = tree.children_mut() {
        let removed = splice_span(children, span.start, span.end, nodes);
        debug!(
            start = span.start,
            removed = removed.len(),
            children = children.len(),
            "replaced section"
        );
    }
}

/// Find the section opened by the first heading passing `predicate`.
///
/// With `ignore_final_definitions`, definitions directly before the end are
/// moved out of the section: `end` then points at the first of them.
pub fn locate(children: &[Node], predicate: &Predicate, ignore_final_definitions: bool) -> Option<Span> {
    let mut open: Option<(usize, u8)> = None;
    let mut end = children.len();

    for (index, child) in children.iter().enumerate() {
        let Some(depth) = child.depth() else {
            continue;
        };

        match open {
            Some((_, open_depth)) if depth <= open_depth => {
                end = index;
                break;
            }
            None if predicate.matches(&to_string(child), child) => {
                open = Some((index, depth));
            }
            _ => {}
        }
    }

    let (start, depth) = open?;

    if ignore_final_definitions {
        while end > start && children[end - 1].is_definition() {
            end -= 1;
        }
        trace!(end, "trimmed final definitions");
    }

    debug!(start, end, depth, "located section");
    Some(Span { start, end })
}

/// Drop empty slots, keeping the order of the remaining nodes.
pub fn compact(nodes: Vec<Option<Node>>) -> Vec<Node> {
    nodes.into_iter().flatten().collect()
}

/// Replace `children[start..=end]` with the present nodes of `replacement`.
///
/// `end` may be one past the last child, in which case the span runs to the
/// end. Returns the removed nodes.
pub fn splice_span(
    children: &mut Vec<Node>,
    start: usize,
    end: usize,
    replacement: Vec<Option<Node>>,
) -> Vec<Node> {
    let stop = end.saturating_add(1).min(children.len());
    let start = start.min(stop);
    children.splice(start..stop, compact(replacement)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Test;
    use std::cell::RefCell;

    fn predicate(test: &str) -> Predicate {
        Predicate::new(Test::from(test)).unwrap()
    }

    /// `[H1 Fo, H2 Foo, P Bar, H1 Fo]`
    fn closed() -> Vec<Node> {
        vec![
            Node::heading(1, "Fo"),
            Node::heading(2, "Foo"),
            Node::paragraph("Bar"),
            Node::heading(1, "Fo"),
        ]
    }

    #[test]
    fn locate_closes_at_same_or_lower_depth() {
        let span = locate(&closed(), &predicate("foo+"), false);
        assert_eq!(span, Some(Span { start: 1, end: 3 }));
    }

    #[test]
    fn locate_skips_deeper_headings() {
        let children = vec![
            Node::heading(2, "Foo"),
            Node::heading(3, "Inner"),
            Node::paragraph("Bar"),
            Node::heading(2, "Next"),
        ];
        let span = locate(&children, &predicate("foo"), false);
        assert_eq!(span, Some(Span { start: 0, end: 3 }));
    }

    #[test]
    fn locate_closes_on_depth_even_if_heading_matches() {
        let children = vec![
            Node::heading(2, "Foo"),
            Node::paragraph("Bar"),
            Node::heading(2, "Foo"),
        ];
        let span = locate(&children, &predicate("foo"), false);
        assert_eq!(span, Some(Span { start: 0, end: 2 }));
    }

    #[test]
    fn locate_runs_to_end_without_closing_heading() {
        let mut children = closed();
        children.pop();
        let span = locate(&children, &predicate("foo+"), false);
        assert_eq!(span, Some(Span { start: 1, end: 3 }));
    }

    #[test]
    fn locate_nothing() {
        assert_eq!(locate(&closed(), &predicate("bar"), false), None);
        assert_eq!(locate(&[], &predicate("bar"), false), None);
    }

    #[test]
    fn locate_matches_empty_heading() {
        let children = vec![
            Node::Heading {
                depth: 1,
                children: vec![],
            },
            Node::paragraph("Bar"),
        ];
        assert_eq!(
            locate(&children, &predicate("x?"), false),
            Some(Span { start: 0, end: 2 })
        );
    }

    #[test]
    fn locate_trims_final_definitions() {
        let children = vec![
            Node::heading(1, "Fo"),
            Node::heading(2, "Foo"),
            Node::paragraph("Bar"),
            Node::definition("one", "example.com"),
            Node::FootnoteDefinition {
                identifier: "two".to_string(),
                label: "two".to_string(),
                children: vec![Node::paragraph("Note")],
            },
            Node::heading(1, "Fo"),
        ];
        assert_eq!(
            locate(&children, &predicate("foo"), true),
            Some(Span { start: 1, end: 3 })
        );
        assert_eq!(
            locate(&children, &predicate("foo"), false),
            Some(Span { start: 1, end: 5 })
        );
    }

    #[test]
    fn trimming_stops_at_the_heading() {
        let children = vec![
            Node::heading(2, "Foo"),
            Node::definition("one", "example.com"),
            Node::definition("two", "example.com"),
        ];
        assert_eq!(
            locate(&children, &predicate("foo"), true),
            Some(Span { start: 0, end: 1 })
        );
    }

    #[test]
    fn handler_receives_section() {
        let mut tree = Node::root(closed());
        let seen = RefCell::new(None);
        heading_range(&mut tree, "foo+", |start, between, end, scope| {
            *seen.borrow_mut() = Some((
                start.clone(),
                between.to_vec(),
                end.cloned(),
                scope.start,
                scope.end,
                scope.parent.type_name(),
            ));
            None
        })
        .unwrap();

        let (start, between, end, scope_start, scope_end, parent) = seen.into_inner().unwrap();
        assert_eq!(start, Node::heading(2, "Foo"));
        assert_eq!(between, vec![Node::paragraph("Bar")]);
        assert_eq!(end, Some(Node::heading(1, "Fo")));
        assert_eq!((scope_start, scope_end), (1, Some(3)));
        assert_eq!(parent, "root");
        assert_eq!(tree, Node::root(closed()));
    }

    #[test]
    fn missing_end_is_reported_as_none() {
        let mut children = closed();
        children.pop();
        let mut tree = Node::root(children);
        let mut seen = None;
        heading_range(&mut tree, "foo+", |_, between, end, scope| {
            seen = Some((between.to_vec(), end.is_none(), scope.end));
            None
        })
        .unwrap();
        assert_eq!(seen, Some((vec![Node::paragraph("Bar")], true, None)));
    }

    #[test]
    fn empty_result_deletes_section_and_closing_node() {
        let mut tree = Node::root(closed());
        heading_range(&mut tree, "foo+", |_, _, _, _| Some(vec![])).unwrap();
        assert_eq!(tree, Node::root(vec![Node::heading(1, "Fo")]));
    }

    #[test]
    fn result_replaces_inclusive_span() {
        let mut tree = Node::root(closed());
        heading_range(&mut tree, "foo+", |start, _, end, _| {
            Some(vec![Some(start.clone()), Some(Node::ThematicBreak), end.cloned()])
        })
        .unwrap();
        assert_eq!(
            tree,
            Node::root(vec![
                Node::heading(1, "Fo"),
                Node::heading(2, "Foo"),
                Node::ThematicBreak,
                Node::heading(1, "Fo"),
            ])
        );
    }

    #[test]
    fn absent_end_slot_is_not_inserted() {
        let children = vec![
            Node::heading(1, "Alpha"),
            Node::heading(2, "Foo"),
            Node::paragraph("one"),
            Node::paragraph("two"),
        ];
        let mut tree = Node::root(children.clone());
        heading_range(&mut tree, "foo", |start, between, end, _| {
            let mut nodes = vec![Some(start.clone())];
            nodes.extend(between.iter().cloned().map(Some));
            nodes.push(end.cloned());
            Some(nodes)
        })
        .unwrap();
        assert_eq!(tree, Node::root(children));
    }

    #[test]
    fn childless_tree_is_left_alone() {
        let mut tree = Node::text("Foo");
        let mut called = false;
        heading_range(&mut tree, "foo", |_, _, _, _| {
            called = true;
            Some(vec![])
        })
        .unwrap();
        assert!(!called);
        assert_eq!(tree, Node::text("Foo"));
    }

    #[test]
    fn invalid_text_errors_before_scanning() {
        let mut tree = Node::root(closed());
        let result = heading_range(&mut tree, "Fo (draft", |_, _, _, _| Some(vec![]));
        assert!(result.is_err());
        assert_eq!(tree, Node::root(closed()));
    }

    #[test]
    fn compact_keeps_order() {
        let nodes = vec![
            None,
            Some(Node::paragraph("a")),
            None,
            Some(Node::paragraph("b")),
        ];
        assert_eq!(
            compact(nodes),
            vec![Node::paragraph("a"), Node::paragraph("b")]
        );
    }

    #[test]
    fn splice_span_clamps_end() {
        let mut children = vec![Node::paragraph("a"), Node::paragraph("b")];
        let removed = splice_span(&mut children, 1, 2, vec![Some(Node::ThematicBreak), None]);
        assert_eq!(removed, vec![Node::paragraph("b")]);
        assert_eq!(children, vec![Node::paragraph("a"), Node::ThematicBreak]);
    }
}
