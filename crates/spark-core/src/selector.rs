//! Selector templates.
//!
//! Nested rules of a style node are keyed by a [`Selector`]: a small typed
//! combinator language over the classes of the same build. References to other
//! nodes stay symbolic ([`ClassRef::Path`]) until the component's identifier
//! table is complete, then [`Selector::render`] turns the template into CSS.
//!
//! # Text form
//!
//! | Text          | Meaning                                           |
//! |---------------|---------------------------------------------------|
//! | `&`           | the node the rule is nested in                    |
//! | `$(a.b)`      | class of node `a.b` of the same build             |
//! | `.$(a.b)`     | same as `$(a.b)`                                  |
//! | `$()`         | class of the component root                       |
//! | ` ` `>` `+` `~` | descendant, child, next-sibling, subsequent-sibling |
//! | `,`           | separates selectors                               |
//! | `:not(…)` `:is(…)` `:where(…)` `:has(…)` | pseudo-class over a nested template |
//! | anything else | raw CSS (pseudo-classes, attributes, elements)    |
//!
//! A selector without `&` applies to descendants of the node, as in CSS
//! nesting: `$(avatar)` means `& $(avatar)`. A selector starting with a
//! combinator (`> span`) is relative to `&`. Templates nested in a
//! selector-list pseudo-class are not anchored: `&:not(.$(x))` is
//! `.card:not(.card-x)`. A `$(…)` anywhere else inside brackets is an error.
//!
//! ```rust
//! use spark_core::{ClassRef, Selector};
//!
//! let built = Selector::parent().and_class(ClassRef::node("active"));
//! let parsed = Selector::parse("&.$(active)").unwrap();
//! assert_eq!(built, parsed);
//!
//! let css = parsed
//!     .render("card-base", |path| Some(format!("card-{}", path)))
//!     .unwrap();
//! assert_eq!(css, ".card-base.card-active");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::css::{split_selector_list, write_class};
use crate::error::{Result, SparkError};
use crate::path::KeyPath;

/// A class referenced from a selector template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassRef {
    /// A node of the build the template belongs to, resolved late.
    Path(KeyPath),
    /// A class name that is already known, such as another component's `$`.
    Resolved(String),
}

impl ClassRef {
    /// References the node at `path` of the same build.
    pub fn node(path: impl Into<KeyPath>) -> Self {
        ClassRef::Path(path.into())
    }

    /// References the root of the same build.
    pub fn root() -> Self {
        ClassRef::Path(KeyPath::root())
    }

    /// Wraps an already-resolved class name.
    pub fn resolved(class: impl Into<String>) -> Self {
        ClassRef::Resolved(class.into())
    }
}

impl From<KeyPath> for ClassRef {
    fn from(path: KeyPath) -> Self {
        ClassRef::Path(path)
    }
}

/// How two compound selectors relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::Descendant => " ",
            Combinator::Child => " > ",
            Combinator::NextSibling => " + ",
            Combinator::SubsequentSibling => " ~ ",
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '>' => Some(Combinator::Child),
            '+' => Some(Combinator::NextSibling),
            '~' => Some(Combinator::SubsequentSibling),
            _ => None,
        }
    }
}

/// One piece of a compound selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectorAtom {
    /// `&`
    Parent,
    Class(ClassRef),
    /// A pseudo-class taking a selector list, such as `:not(.$(disabled))`.
    /// `name` keeps its leading colon.
    Pseudo { name: String, args: Selector },
    /// Verbatim CSS: `:hover`, `[data-open]`, `span`, `.external`.
    Raw(String),
}

/// Pseudo-classes whose argument is a selector list.
const SELECTOR_PSEUDOS: [&str; 4] = ["not", "is", "where", "has"];

/// Atoms that must all match the same element (`&.$(active):hover`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Compound(Vec<SelectorAtom>);

impl Compound {
    pub fn atoms(&self) -> &[SelectorAtom] {
        &self.0
    }

    fn has_parent(&self) -> bool {
        self.0.iter().any(|atom| match atom {
            SelectorAtom::Parent => true,
            SelectorAtom::Pseudo { args, .. } => args.has_parent(),
            _ => false,
        })
    }
}

impl From<SelectorAtom> for Compound {
    fn from(atom: SelectorAtom) -> Self {
        Compound(vec![atom])
    }
}

impl From<ClassRef> for Compound {
    fn from(class: ClassRef) -> Self {
        Compound(vec![SelectorAtom::Class(class)])
    }
}

impl From<&str> for Compound {
    fn from(raw: &str) -> Self {
        Compound(vec![SelectorAtom::Raw(raw.to_string())])
    }
}

/// Compounds joined by combinators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComplexSelector {
    head: Compound,
    tail: Vec<(Combinator, Compound)>,
}

impl ComplexSelector {
    fn new(head: Compound) -> Self {
        Self {
            head,
            tail: Vec::new(),
        }
    }

    fn last_mut(&mut self) -> &mut Compound {
        match self.tail.last_mut() {
            Some((_, compound)) => compound,
            None => &mut self.head,
        }
    }

    fn compounds(&self) -> impl Iterator<Item = &Compound> {
        std::iter::once(&self.head).chain(self.tail.iter().map(|(_, c)| c))
    }

    fn has_parent(&self) -> bool {
        self.compounds().any(Compound::has_parent)
    }

    /// Makes the selector relative to `&` when it does not mention it.
    fn anchored(self) -> Self {
        if self.has_parent() {
            return self;
        }
        let mut tail = Vec::with_capacity(self.tail.len() + 1);
        tail.push((Combinator::Descendant, self.head));
        tail.extend(self.tail);
        Self {
            head: Compound::from(SelectorAtom::Parent),
            tail,
        }
    }
}

/// A selector template: one or more complex selectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector(Vec<ComplexSelector>);

impl Selector {
    fn single(head: Compound) -> Self {
        Selector(vec![ComplexSelector::new(head)])
    }

    /// `&`
    pub fn parent() -> Self {
        Self::single(SelectorAtom::Parent.into())
    }

    /// `$(path)`: a node of the same build.
    pub fn node(path: impl Into<KeyPath>) -> Self {
        Self::single(ClassRef::node(path).into())
    }

    /// A class, typically another component's resolved `$`.
    pub fn class(class: impl Into<ClassRef>) -> Self {
        let class: ClassRef = class.into();
        Self::single(class.into())
    }

    /// Verbatim CSS as the first compound.
    pub fn raw(text: impl Into<String>) -> Self {
        Self::single(SelectorAtom::Raw(text.into()).into())
    }

    fn last_complex(&mut self) -> &mut ComplexSelector {
        let at = self.0.len() - 1;
        &mut self.0[at]
    }

    fn push_atom(mut self, atom: SelectorAtom) -> Self {
        self.last_complex().last_mut().0.push(atom);
        self
    }

    fn combine(mut self, combinator: Combinator, next: Compound) -> Self {
        self.last_complex().tail.push((combinator, next));
        self
    }

    /// Adds a class to the current compound (`&.x`).
    pub fn and_class(self, class: impl Into<ClassRef>) -> Self {
        self.push_atom(SelectorAtom::Class(class.into()))
    }

    /// Adds a node of the same build to the current compound (`&.$(path)`).
    pub fn and_node(self, path: impl Into<KeyPath>) -> Self {
        self.push_atom(SelectorAtom::Class(ClassRef::node(path)))
    }

    /// Adds raw text such as `:hover` or `[disabled]` to the current compound.
    pub fn pseudo(self, text: impl Into<String>) -> Self {
        self.push_atom(SelectorAtom::Raw(text.into()))
    }

    /// Adds a selector-list pseudo-class (`:not`, `:is`, `:where`, `:has`)
    /// whose argument is another template of the same build.
    pub fn pseudo_with(self, name: impl Into<String>, args: Selector) -> Self {
        let mut name = name.into();
        if !name.starts_with(':') {
            name.insert(0, ':');
        }
        self.push_atom(SelectorAtom::Pseudo { name, args })
    }

    pub fn descendant(self, next: impl Into<Compound>) -> Self {
        self.combine(Combinator::Descendant, next.into())
    }

    pub fn child(self, next: impl Into<Compound>) -> Self {
        self.combine(Combinator::Child, next.into())
    }

    pub fn next_sibling(self, next: impl Into<Compound>) -> Self {
        self.combine(Combinator::NextSibling, next.into())
    }

    pub fn subsequent_sibling(self, next: impl Into<Compound>) -> Self {
        self.combine(Combinator::SubsequentSibling, next.into())
    }

    /// Selector list: `self, other`.
    pub fn or(mut self, other: Selector) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Parses the text form of a template.
    pub fn parse(template: &str) -> Result<Self> {
        parse_list(template, false).map_err(|message| SparkError::InvalidSelector {
            template: template.to_string(),
            message,
        })
    }

    fn has_parent(&self) -> bool {
        self.0.iter().any(ComplexSelector::has_parent)
    }

    /// Every node path the template references, including those nested in
    /// pseudo-class arguments.
    pub fn references(&self) -> Vec<&KeyPath> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a KeyPath>) {
        let atoms = self
            .0
            .iter()
            .flat_map(|complex| complex.compounds())
            .flat_map(|c| c.0.iter());
        for atom in atoms {
            match atom {
                SelectorAtom::Class(ClassRef::Path(path)) => refs.push(path),
                SelectorAtom::Pseudo { args, .. } => args.collect_references(refs),
                _ => {}
            }
        }
    }

    /// Renders the template to CSS.
    ///
    /// `parent` is the class `&` stands for; `lookup` resolves node paths of
    /// the same build. Selectors without `&` are rendered as descendants of
    /// the parent. An unresolved path is [`SparkError::UnknownSelector`].
    pub fn render<F>(&self, parent: &str, lookup: F) -> Result<String>
    where
        F: Fn(&KeyPath) -> Option<String>,
    {
        let mut out = String::new();
        self.render_into(true, parent, &lookup, self, &mut out)?;
        Ok(out)
    }

    /// Writes the list to `out`. Nested argument lists are not anchored.
    /// `template` is the outermost selector, for error context.
    fn render_into<F>(
        &self,
        anchor: bool,
        parent: &str,
        lookup: &F,
        template: &Selector,
        out: &mut String,
    ) -> Result<()>
    where
        F: Fn(&KeyPath) -> Option<String>,
    {
        for (i, complex) in self.0.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let complex = if anchor {
                complex.clone().anchored()
            } else {
                complex.clone()
            };
            render_compound(&complex.head, parent, lookup, template, out)?;
            let mut relative = complex.head.0.is_empty();
            for (combinator, compound) in &complex.tail {
                out.push_str(combinator_text(*combinator, relative));
                relative = false;
                render_compound(compound, parent, lookup, template, out)?;
            }
        }
        Ok(())
    }
}

/// A leading combinator of a relative selector (`:has(> img)`) has no space
/// before it.
fn combinator_text(combinator: Combinator, leading: bool) -> &'static str {
    if leading {
        combinator.as_str().trim_start()
    } else {
        combinator.as_str()
    }
}

fn render_compound<F>(
    compound: &Compound,
    parent: &str,
    lookup: &F,
    template: &Selector,
    out: &mut String,
) -> Result<()>
where
    F: Fn(&KeyPath) -> Option<String>,
{
    for atom in &compound.0 {
        match atom {
            SelectorAtom::Parent => {
                let _ = write_class(out, parent);
            }
            SelectorAtom::Class(ClassRef::Resolved(class)) => {
                let _ = write_class(out, class);
            }
            SelectorAtom::Class(ClassRef::Path(path)) => {
                let class = lookup(path).ok_or_else(|| SparkError::UnknownSelector {
                    reference: path.clone(),
                    context: format!("selector '{}'", template),
                })?;
                let _ = write_class(out, &class);
            }
            SelectorAtom::Pseudo { name, args } => {
                out.push_str(name);
                out.push('(');
                args.render_into(false, parent, lookup, template, out)?;
                out.push(')');
            }
            SelectorAtom::Raw(text) => out.push_str(text),
        }
    }
    Ok(())
}

impl FromStr for Selector {
    type Err = SparkError;

    fn from_str(s: &str) -> Result<Self> {
        Selector::parse(s)
    }
}

impl fmt::Display for SelectorAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorAtom::Parent => f.write_str("&"),
            SelectorAtom::Class(ClassRef::Path(path)) => write!(f, ".$({})", path),
            SelectorAtom::Class(ClassRef::Resolved(class)) => write!(f, ".{}", class),
            SelectorAtom::Pseudo { name, args } => write!(f, "{}({})", name, args),
            SelectorAtom::Raw(text) => f.write_str(text),
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|atom| write!(f, "{}", atom))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, complex) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", complex.head)?;
            let mut relative = complex.head.0.is_empty();
            for (combinator, compound) in &complex.tail {
                write!(f, "{}{}", combinator_text(*combinator, relative), compound)?;
                relative = false;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Text parsing
// =============================================================================

/// Accumulates compounds while scanning one complex selector.
#[derive(Default)]
struct ComplexBuilder {
    /// Inside a pseudo-class argument: no implicit `&`.
    nested: bool,
    head: Option<Compound>,
    tail: Vec<(Combinator, Compound)>,
    current: Vec<SelectorAtom>,
    pending: Option<Combinator>,
}

impl ComplexBuilder {
    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let compound = Compound(std::mem::take(&mut self.current));
        match self.head {
            None => self.head = Some(compound),
            Some(_) => {
                let combinator = self.pending.take().unwrap_or(Combinator::Descendant);
                self.tail.push((combinator, compound));
            }
        }
    }

    fn combinator(&mut self, combinator: Combinator) -> std::result::Result<(), String> {
        if self.pending.is_some() && self.current.is_empty() {
            return Err(format!("unexpected '{}'", combinator.as_str().trim()));
        }
        self.flush();
        if self.head.is_none() {
            self.head = Some(if self.nested {
                Compound(Vec::new())
            } else {
                SelectorAtom::Parent.into()
            });
        }
        self.pending = Some(combinator);
        Ok(())
    }

    fn finish(mut self) -> std::result::Result<ComplexSelector, String> {
        if self.current.is_empty() && self.pending.is_some() {
            return Err("selector ends with a combinator".to_string());
        }
        self.flush();
        let head = self.head.ok_or_else(|| "empty selector".to_string())?;
        let complex = ComplexSelector {
            head,
            tail: self.tail,
        };
        Ok(if self.nested { complex } else { complex.anchored() })
    }
}

fn parse_list(text: &str, nested: bool) -> std::result::Result<Selector, String> {
    let complexes = split_selector_list(text)
        .into_iter()
        .map(|part| parse_complex(part, nested))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if complexes.is_empty() {
        return Err("empty selector".to_string());
    }
    Ok(Selector(complexes))
}

fn parse_complex(text: &str, nested: bool) -> std::result::Result<ComplexSelector, String> {
    let mut builder = ComplexBuilder {
        nested,
        ..ComplexBuilder::default()
    };
    let mut rest = text;
    let mut gap = false;

    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
            gap = true;
            continue;
        }
        if let Some(combinator) = Combinator::from_char(c) {
            builder.combinator(combinator)?;
            rest = &rest[1..];
            gap = false;
            continue;
        }
        if gap {
            builder.flush();
            gap = false;
        }
        let (atom, remaining) = read_atom(rest)?;
        builder.current.push(atom);
        rest = remaining;
    }
    builder.finish()
}

/// Splits `:not(rest` into `(":not", "rest")` for selector-list pseudo-classes.
fn selector_pseudo(text: &str) -> Option<(&str, &str)> {
    let after = text.strip_prefix(':').filter(|t| !t.starts_with(':'))?;
    let len = after
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(after.len());
    let name = &after[..len];
    let args = after[len..].strip_prefix('(')?;
    SELECTOR_PSEUDOS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(name))
        .then_some((&text[..len + 1], args))
}

/// Byte offset of the `)` closing an already-open parenthesis.
fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return (c == ')').then_some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn read_atom(text: &str) -> std::result::Result<(SelectorAtom, &str), String> {
    if let Some(rest) = text.strip_prefix('&') {
        return Ok((SelectorAtom::Parent, rest));
    }
    if let Some((name, rest)) = selector_pseudo(text) {
        let close = closing_paren(rest).ok_or_else(|| format!("unclosed '{}('", name))?;
        let args = parse_list(&rest[..close], true)?;
        let atom = SelectorAtom::Pseudo {
            name: name.to_string(),
            args,
        };
        return Ok((atom, &rest[close + 1..]));
    }
    if let Some(rest) = text.strip_prefix(".$(").or_else(|| text.strip_prefix("$(")) {
        let close = rest
            .find(')')
            .ok_or_else(|| "unclosed '$(' reference".to_string())?;
        let path = KeyPath::parse(&rest[..close]);
        return Ok((SelectorAtom::Class(ClassRef::Path(path)), &rest[close + 1..]));
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut end = text.len();
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth > 0 || i == 0 => {}
            '&' | '>' | '+' | '~' => {
                end = i;
                break;
            }
            c if c.is_whitespace() => {
                end = i;
                break;
            }
            '$' | '.' if text[i..].starts_with("$(") || text[i..].starts_with(".$(") => {
                end = i;
                break;
            }
            ':' if selector_pseudo(&text[i..]).is_some() => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    if quote.is_some() || depth > 0 {
        return Err(format!("unbalanced brackets or quotes in '{}'", text));
    }
    let raw = &text[..end];
    if raw.contains("$(") {
        return Err(format!(
            "'$(' in '{}' is only resolved inside :not(), :is(), :where() and :has()",
            raw
        ));
    }
    Ok((SelectorAtom::Raw(raw.to_string()), &text[end..]))
}

/// Replaces every `$(path)` in a declaration value with the class name of that
/// node (without the leading dot).
///
/// ```rust
/// use spark_core::selector::interpolate_classes;
///
/// let out = interpolate_classes("url(#$(icon))", |p| Some(format!("x-{}", p))).unwrap();
/// assert_eq!(out, "url(#x-icon)");
/// ```
pub fn interpolate_classes<F>(text: &str, lookup: F) -> Result<String>
where
    F: Fn(&KeyPath) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("$(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let close = after.find(')').ok_or_else(|| SparkError::InvalidSelector {
            template: text.to_string(),
            message: "unclosed '$(' reference".to_string(),
        })?;
        let path = KeyPath::parse(&after[..close]);
        let class = lookup(&path).ok_or_else(|| SparkError::UnknownSelector {
            reference: path.clone(),
            context: format!("value '{}'", text),
        })?;
        out.push_str(&class);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(path: &KeyPath) -> Option<String> {
        match path.to_string().as_str() {
            "" => Some("card".to_string()),
            "active" => Some("card-active".to_string()),
            "vertical.avatar" => Some("card-vertical-avatar".to_string()),
            _ => None,
        }
    }

    fn render(template: &str) -> String {
        Selector::parse(template)
            .unwrap()
            .render("card-base", lookup)
            .unwrap()
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn test_parse_parent_pseudo() {
        let sel = Selector::parse("&:hover").unwrap();
        assert_eq!(sel, Selector::parent().pseudo(":hover"));
    }

    #[test]
    fn test_parse_compound_class() {
        let sel = Selector::parse("&.$(active):focus").unwrap();
        assert_eq!(sel, Selector::parent().and_node("active").pseudo(":focus"));
        assert_eq!(Selector::parse("&$(active)").unwrap(), Selector::parent().and_node("active"));
    }

    #[test]
    fn test_parse_descendant_and_child() {
        let sel = Selector::parse("& $(vertical.avatar) > span").unwrap();
        let built = Selector::parent()
            .descendant(ClassRef::node("vertical.avatar"))
            .child("span");
        assert_eq!(sel, built);
    }

    #[test]
    fn test_parse_implicit_parent() {
        assert_eq!(
            Selector::parse("$(active)").unwrap(),
            Selector::parent().descendant(ClassRef::node("active"))
        );
        assert_eq!(Selector::parse("> span").unwrap(), Selector::parent().child("span"));
    }

    #[test]
    fn test_parse_parent_later_in_selector() {
        let sel = Selector::parse("[dir=rtl] &").unwrap();
        assert_eq!(sel, Selector::raw("[dir=rtl]").descendant(SelectorAtom::Parent));
    }

    #[test]
    fn test_parse_raw_keeps_nested_syntax() {
        let sel = Selector::parse("&:nth-child(2n + 1)").unwrap();
        assert_eq!(sel, Selector::parent().pseudo(":nth-child(2n + 1)"));
        let sel = Selector::parse("&[data-x=\"a > b\"]").unwrap();
        assert_eq!(sel, Selector::parent().pseudo("[data-x=\"a > b\"]"));
    }

    #[test]
    fn test_parse_selector_pseudo_arguments() {
        let sel = Selector::parse("&:not(.$(active)):hover").unwrap();
        let built = Selector::parent()
            .pseudo_with("not", Selector::single(ClassRef::node("active").into()))
            .pseudo(":hover");
        assert_eq!(sel, built);

        let sel = Selector::parse("&:is($(active), [open])").unwrap();
        let args = Selector::node("active").or(Selector::raw("[open]"));
        assert_eq!(sel, Selector::parent().pseudo_with(":is", args));
    }

    #[test]
    fn test_parse_relative_has() {
        let sel = Selector::parse("&:has(> $(active))").unwrap();
        assert_eq!(sel.to_string(), "&:has(> .$(active))");
        assert_eq!(render("&:has(> $(active))"), ".card-base:has(> .card-active)");
    }

    #[test]
    fn test_reference_outside_selector_pseudo_is_rejected() {
        for bad in ["&:nth-child(2n of .$(active))", "&[data-x=\"$(active)\"]", "&:not(.$(active)"] {
            assert!(
                matches!(Selector::parse(bad), Err(SparkError::InvalidSelector { .. })),
                "expected error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_list() {
        let sel = Selector::parse("&:hover, &:focus-within").unwrap();
        assert_eq!(
            sel,
            Selector::parent().pseudo(":hover").or(Selector::parent().pseudo(":focus-within"))
        );
    }

    #[test]
    fn test_parse_sibling_combinators() {
        let sel = Selector::parse("& + & ~ $(active)").unwrap();
        let built = Selector::parent()
            .next_sibling(SelectorAtom::Parent)
            .subsequent_sibling(ClassRef::node("active"));
        assert_eq!(sel, built);
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "  ", "& > > span", "& >", "&.$(active", "&[open"] {
            assert!(
                matches!(Selector::parse(bad), Err(SparkError::InvalidSelector { .. })),
                "expected error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_display_round_trips_text() {
        let text = "&.$(active):hover > span, & + .$(vertical.avatar):not(.$(active), [open])";
        let sel = Selector::parse(text).unwrap();
        assert_eq!(sel.to_string(), text);
        assert_eq!(Selector::parse(&sel.to_string()).unwrap(), sel);
    }

    #[test]
    fn test_references() {
        let sel = Selector::parse("&.$(active) $(vertical.avatar)").unwrap();
        let refs: Vec<String> = sel.references().iter().map(|p| p.to_string()).collect();
        assert_eq!(refs, ["active", "vertical.avatar"]);

        let sel = Selector::parse("&:not(.$(active)):has($(vertical.avatar))").unwrap();
        let refs: Vec<String> = sel.references().iter().map(|p| p.to_string()).collect();
        assert_eq!(refs, ["active", "vertical.avatar"]);
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn test_render_parent_forms() {
        assert_eq!(render("&:hover"), ".card-base:hover");
        assert_eq!(render("&.$(active)"), ".card-base.card-active");
        assert_eq!(render("$(active) &"), ".card-active .card-base");
    }

    #[test]
    fn test_render_selector_pseudo_arguments() {
        assert_eq!(render("&:not(.$(active)):hover"), ".card-base:not(.card-active):hover");
        assert_eq!(
            render("&:where($(), $(vertical.avatar)) span"),
            ".card-base:where(.card, .card-vertical-avatar) span"
        );
        assert_eq!(render(":is(&:hover) > span"), ":is(.card-base:hover) > span");
        assert_eq!(render("&:nth-child(2n + 1)"), ".card-base:nth-child(2n + 1)");
    }

    #[test]
    fn test_render_unknown_reference_in_pseudo() {
        let err = Selector::parse("&:has($(ghost))")
            .unwrap()
            .render("card", lookup)
            .unwrap_err();
        assert_eq!(
            err,
            SparkError::UnknownSelector {
                reference: KeyPath::parse("ghost"),
                context: "selector '&:has(.$(ghost))'".to_string(),
            }
        );
    }

    #[test]
    fn test_render_implicit_descendant() {
        assert_eq!(render("$(vertical.avatar)"), ".card-base .card-vertical-avatar");
        assert_eq!(render("> span"), ".card-base > span");
    }

    #[test]
    fn test_render_root_reference() {
        assert_eq!(render("$():hover &"), ".card:hover .card-base");
    }

    #[test]
    fn test_render_resolved_class() {
        let sel = Selector::parent().descendant(ClassRef::resolved("other-icon"));
        assert_eq!(sel.render("card", lookup).unwrap(), ".card .other-icon");
    }

    #[test]
    fn test_render_escapes_classes() {
        let sel = Selector::parent();
        assert_eq!(sel.render("2col", lookup).unwrap(), ".\\32 col");
    }

    #[test]
    fn test_render_unknown_reference() {
        let err = Selector::parse("&.$(missing)")
            .unwrap()
            .render("card", lookup)
            .unwrap_err();
        assert_eq!(
            err,
            SparkError::UnknownSelector {
                reference: KeyPath::parse("missing"),
                context: "selector '&.$(missing)'".to_string(),
            }
        );
    }

    // =========================================================================
    // Value interpolation
    // =========================================================================

    #[test]
    fn test_interpolate_classes() {
        assert_eq!(
            interpolate_classes("$(active) and $()", lookup).unwrap(),
            "card-active and card"
        );
        assert_eq!(interpolate_classes("plain", lookup).unwrap(), "plain");
    }

    #[test]
    fn test_interpolate_unknown() {
        assert!(matches!(
            interpolate_classes("$(nope)", lookup),
            Err(SparkError::UnknownSelector { .. })
        ));
        assert!(matches!(
            interpolate_classes("$(open", lookup),
            Err(SparkError::InvalidSelector { .. })
        ));
    }
}
