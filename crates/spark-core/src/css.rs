//! CSS text helpers.
//!
//! The engine treats CSS values as opaque text. This module covers the few
//! places where it has to touch CSS syntax:
//!
//! - normalizing authored property names (`backgroundColor` → `background-color`)
//! - escaping generated identifiers when they are written out as selectors
//! - splitting selector lists and scoping them under an ancestor selector
//! - reading declaration blocks authored as CSS text
//!
//! Declaration text is tokenized with `cssparser`, so comments, strings and
//! nested functions (`calc(…)`, `var(…)`) are handled the way a browser would.
//! Values are kept verbatim; nothing here validates property names or values.

use std::fmt::Write as _;

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
};

use crate::error::{Result, SparkError};
use crate::tree::Declarations;

/// Normalizes an authored property name to its CSS form.
///
/// ```rust
/// use spark_core::css::normalize_property;
///
/// assert_eq!(normalize_property("backgroundColor"), "background-color");
/// assert_eq!(normalize_property("WebkitTransition"), "-webkit-transition");
/// assert_eq!(normalize_property("msTransform"), "-ms-transform");
/// assert_eq!(normalize_property("--spark-gap"), "--spark-gap");
/// assert_eq!(normalize_property("border-top"), "border-top");
/// ```
pub fn normalize_property(name: &str) -> String {
    if name.starts_with("--") || !name.chars().any(|c| c.is_ascii_uppercase()) {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len() + 4);
    let vendor_ms = name.starts_with("ms")
        && name[2..].chars().next().is_some_and(|c| c.is_ascii_uppercase());
    if vendor_ms {
        out.push('-');
    }
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Writes `.class` with the class name escaped as a CSS identifier.
pub fn write_class<W: std::fmt::Write>(dest: &mut W, class: &str) -> std::fmt::Result {
    dest.write_char('.')?;
    cssparser::serialize_identifier(class, dest)
}

/// Returns `.class` with the class name escaped as a CSS identifier.
///
/// ```rust
/// use spark_core::css::class_selector;
///
/// assert_eq!(class_selector("spark-card"), ".spark-card");
/// assert_eq!(class_selector("2col"), ".\\32 col");
/// ```
pub fn class_selector(class: &str) -> String {
    let mut out = String::with_capacity(class.len() + 1);
    // Writing into a String cannot fail.
    let _ = write_class(&mut out, class);
    out
}

/// Returns a custom property name escaped as a CSS identifier.
pub fn property_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let _ = cssparser::serialize_identifier(name, &mut out);
    out
}

/// Splits a selector list on top-level commas.
///
/// Commas inside parentheses, brackets or quotes do not split.
pub fn split_selector_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(list[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(list[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Places `scope` as an ancestor of every selector in `list`.
///
/// The scope is wrapped in `:where()` so a scoped rule has the same
/// specificity as the unscoped one and source order decides between them.
///
/// ```rust
/// use spark_core::css::scope_selector;
///
/// assert_eq!(
///     scope_selector("[data-spark-mode=\"dark\"]", ".a, .b:hover"),
///     ":where([data-spark-mode=\"dark\"]) .a, :where([data-spark-mode=\"dark\"]) .b:hover"
/// );
/// ```
pub fn scope_selector(scope: &str, list: &str) -> String {
    let mut out = String::new();
    for (i, selector) in split_selector_list(list).into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, ":where({}) {}", scope, selector);
    }
    out
}

/// Parses a declaration block written as CSS text.
///
/// ```rust
/// use spark_core::css::parse_declarations;
///
/// let decls = parse_declarations("padding: 4px 8px; color: var(--x-fg, red)").unwrap();
/// assert_eq!(decls.get("padding").unwrap().to_string(), "4px 8px");
/// assert_eq!(decls.get("color").unwrap().to_string(), "var(--x-fg, red)");
/// ```
pub fn parse_declarations(css: &str) -> Result<Declarations> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut decl_parser = RawDeclarationParser;
    let body = RuleBodyParser::new(&mut parser, &mut decl_parser);

    let mut decls = Declarations::new();
    for item in body {
        match item {
            Ok((name, value)) => decls.set(&name, value),
            Err((err, slice)) => {
                return Err(SparkError::parse(format!(
                    "invalid declaration '{}': {:?}",
                    slice.trim(),
                    err.kind
                )));
            }
        }
    }
    Ok(decls)
}

/// Collects each declaration's value as the raw source text.
struct RawDeclarationParser;

impl<'i> DeclarationParser<'i> for RawDeclarationParser {
    type Declaration = (String, String);
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        let raw = input.slice_from(start).trim();
        if raw.is_empty() {
            return Err(input.new_custom_error::<(), ()>(()));
        }
        Ok((name.as_ref().to_string(), raw.to_string()))
    }
}

impl<'i> AtRuleParser<'i> for RawDeclarationParser {
    type Prelude = ();
    type AtRule = (String, String);
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for RawDeclarationParser {
    type Prelude = ();
    type QualifiedRule = (String, String);
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, (String, String), ()> for RawDeclarationParser {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}
