//! Heading tests and their normalization into a single predicate.
//!
//! A test arrives as text, a compiled [`Regex`], or a function, optionally
//! wrapped in [`Options`]. Before a search begins it is turned into one
//! [`Predicate`] of shape `(plain_text, heading) -> bool`.
//!
//! Tests read from configuration arrive untyped, as JSON. [`Options::from_value`]
//! applies the same normalization to them and is where a malformed test (a
//! `null`, a missing `test` field, a number) is rejected with
//! [`Error::InvalidTest`].

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::node::Node;

/// A boxed heading test: plain text of the heading, then the heading itself.
pub type TestFn = Box<dyn Fn(&str, &Node) -> bool>;

/// A test for the heading that opens a section.
pub enum Test {
    /// Matched case-insensitively against the whole heading text.
    ///
    /// The text is used verbatim as regex syntax inside `^(...)$`, so `foo+`
    /// matches `Fooooo` and `(draft` is not a valid test. Use [`Test::literal`]
    /// to match text exactly.
    Text(String),
    /// Matched with [`Regex::is_match`] against the heading text, unanchored.
    Pattern(Regex),
    /// Called with the heading text and the heading node.
    Function(TestFn),
}

impl Test {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&str, &Node) -> bool + 'static,
    {
        Test::Function(Box::new(f))
    }

    /// A text test with regex metacharacters escaped.
    pub fn literal(text: &str) -> Self {
        Test::Text(regex::escape(text))
    }
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Test::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Test::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Test::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<&str> for Test {
    fn from(text: &str) -> Self {
        Test::Text(text.to_string())
    }
}

impl From<String> for Test {
    fn from(text: String) -> Self {
        Test::Text(text)
    }
}

impl From<Regex> for Test {
    fn from(re: Regex) -> Self {
        Test::Pattern(re)
    }
}

/// A heading test plus the trailing-definitions policy.
#[derive(Debug)]
pub struct Options {
    pub test: Test,
    /// Leave definitions at the end of a section out of what the handler sees.
    pub ignore_final_definitions: bool,
}

impl Options {
    pub fn new(test: impl Into<Test>) -> Self {
        Self {
            test: test.into(),
            ignore_final_definitions: false,
        }
    }

    pub fn ignore_final_definitions(mut self, ignore: bool) -> Self {
        self.ignore_final_definitions = ignore;
        self
    }

    /// Read options from an untyped value.
    ///
    /// A string is a text test. An object with a `pattern` key (and optional
    /// `flags`, e.g. `"i"`) is a regex test. Any other object is an options
    /// record whose `test` field holds the test and whose
    /// `ignoreFinalDefinitions` enables trimming only when it is `true`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTest`] when the test is not a string or a pattern
    /// object, naming the value (`null`, `undefined` for a missing field);
    /// [`Error::Pattern`] when a pattern does not compile.
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut spec = Some(value);
        let mut ignore_final_definitions = false;

        if let Value::Object(object) = value {
            if !is_pattern_object(object) {
                ignore_final_definitions = object
                    .get("ignoreFinalDefinitions")
                    .or_else(|| object.get("ignore_final_definitions"))
                    .is_some_and(|flag| *flag == Value::Bool(true));
                spec = object.get("test");
            }
        }

        let test = match spec {
            Some(Value::String(text)) => Test::Text(text.clone()),
            Some(Value::Object(object)) if is_pattern_object(object) => pattern_from_object(object)?,
            Some(other) => return Err(Error::InvalidTest(describe(other))),
            None => return Err(Error::InvalidTest("undefined".to_string())),
        };

        Ok(Self {
            test,
            ignore_final_definitions,
        })
    }

    /// Normalize into the predicate and the definitions flag used by the search.
    ///
    /// # Errors
    ///
    /// [`Error::Pattern`] when a text test is not valid regex syntax.
    pub fn compile(self) -> Result<(Predicate, bool)> {
        Ok((Predicate::new(self.test)?, self.ignore_final_definitions))
    }
}

impl From<Test> for Options {
    fn from(test: Test) -> Self {
        Options::new(test)
    }
}

impl From<&str> for Options {
    fn from(text: &str) -> Self {
        Options::new(text)
    }
}

impl From<String> for Options {
    fn from(text: String) -> Self {
        Options::new(text)
    }
}

impl From<Regex> for Options {
    fn from(re: Regex) -> Self {
        Options::new(re)
    }
}

impl TryFrom<Value> for Options {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Options::from_value(&value)
    }
}

impl TryFrom<&Value> for Options {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        Options::from_value(value)
    }
}

/// The canonical heading test.
pub struct Predicate {
    check: TestFn,
}

impl Predicate {
    /// # Errors
    ///
    /// [`Error::Pattern`] when a text test is not valid regex syntax.
    pub fn new(test: Test) -> Result<Self> {
        let check = match test {
            Test::Text(text) => wrap_expression(anchored(&text)?),
            Test::Pattern(re) => wrap_expression(re),
            Test::Function(f) => f,
        };
        Ok(Self { check })
    }

    pub fn matches(&self, text: &str, node: &Node) -> bool {
        (self.check)(text, node)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

fn anchored(text: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(&format!("^({text})$"))
        .case_insensitive(true)
        .build()?)
}

fn wrap_expression(re: Regex) -> TestFn {
    Box::new(move |text: &str, _node: &Node| re.is_match(text))
}

fn is_pattern_object(object: &Map<String, Value>) -> bool {
    object.contains_key("pattern")
}

fn pattern_from_object(object: &Map<String, Value>) -> Result<Test> {
    let Some(Value::String(source)) = object.get("pattern") else {
        return Err(Error::InvalidTest(Value::Object(object.clone()).to_string()));
    };

    let mut builder = RegexBuilder::new(source);
    if let Some(Value::String(flags)) = object.get("flags") {
        for flag in flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                other => tracing::warn!(flag = %other, "ignoring unsupported pattern flag"),
            }
        }
    }

    Ok(Test::Pattern(builder.build()?))
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
