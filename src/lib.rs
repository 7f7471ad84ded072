//! Find a markdown section by its heading and replace it.
//!
//! A section is a heading plus everything after it up to the next heading of
//! the same or a lower depth. [`heading_range`] finds the first section whose
//! heading passes a test and lets a handler decide what replaces it.
//!
//! ```
//! use heading_range::{Config, Node, process_with_config};
//!
//! let config = Config::default();
//! let out = process_with_config(
//!     "# Fo\n\n## Fooooo\n\nBar\n\n# Fo\n",
//!     "foo+",
//!     |start, _between, end, _scope| Some(vec![Some(start.clone()), end.cloned()]),
//!     &config,
//! )?;
//! assert_eq!(out, "# Fo\n\n## Fooooo\n\n# Fo\n");
//! # Ok::<(), heading_range::Error>(())
//! ```

mod config;
mod error;
mod node;
mod parser;
mod plain_text;
mod predicate;
mod range;
mod render;

pub use config::{Config, ParseConfig, RenderConfig, SectionConfig};
pub use error::{Error, Result};
pub use node::{Align, Node};
pub use plain_text::to_string;
pub use predicate::{Options, Predicate, Test, TestFn};
pub use range::{Scope, Span, compact, heading_range, locate, search, splice_span};

/// Parse markdown text into an mdast `root` node.
pub fn parse(markdown: &str, config: &ParseConfig) -> Node {
    parser::parse(markdown, config)
}

/// Convert a tree back to markdown text.
pub fn render(node: &Node, config: &RenderConfig) -> String {
    render::render(node, config)
}

/// Parse markdown, run [`heading_range`] on the root, and render the result
/// using the compiled-in config.
///
/// # Errors
///
/// Returns an error if the test is not valid regex syntax.
pub fn process<O, F>(markdown: &str, options: O, handler: F) -> Result<String>
where
    O: Into<Options>,
    F: FnOnce(&Node, &[Node], Option<&Node>, Scope<'_>) -> Option<Vec<Option<Node>>>,
{
    process_with_config(markdown, options, handler, &Config::compiled_default())
}

/// [`process`] with custom config.
///
/// # Errors
///
/// Returns an error if the test is not valid regex syntax.
pub fn process_with_config<O, F>(
    markdown: &str,
    options: O,
    handler: F,
    config: &Config,
) -> Result<String>
where
    O: Into<Options>,
    F: FnOnce(&Node, &[Node], Option<&Node>, Scope<'_>) -> Option<Vec<Option<Node>>>,
{
    let mut tree = parse(markdown, &config.parse);
    heading_range(&mut tree, options, handler)?;
    Ok(render(&tree, &config.render))
}
