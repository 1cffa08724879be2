//! Compiled stylesheets and CSS output.
//!
//! A [`Stylesheet`] is an ordered list of [`SheetItem`]s assembled by
//! [`StyleRegistry::stylesheet`](crate::StyleRegistry::stylesheet):
//!
//! 1. one custom-property block per scope, in first-registration order
//! 2. global rules, component rules and conditional blocks, in registration order
//!
//! Writing it out is a separate step so the same sheet can be emitted pretty
//! for development and minified for bundles.

use std::fmt;

use indexmap::IndexMap;

use crate::blocks::ConditionalBlock;
use crate::config::EmitOptions;
use crate::css::{property_name, scope_selector, split_selector_list};
use crate::tree::{Declarations, Value};

/// One CSS rule: a rendered selector list and its declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    selector: String,
    declarations: Declarations,
    scope: Option<String>,
}

impl Rule {
    pub fn new(selector: impl Into<String>, declarations: Declarations) -> Self {
        Self {
            selector: selector.into(),
            declarations,
            scope: None,
        }
    }

    /// Places the rule under an ancestor selector such as a mode attribute.
    pub fn scoped(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    /// The selector as emitted, with the scope applied.
    pub fn selector(&self) -> String {
        match &self.scope {
            Some(scope) => scope_selector(scope, &self.selector),
            None => self.selector.clone(),
        }
    }

    /// The selector without its scope.
    pub fn base_selector(&self) -> &str {
        &self.selector
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn declarations(&self) -> &Declarations {
        &self.declarations
    }
}

/// A top-level entry of a stylesheet.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetItem {
    /// Custom properties declared under one scope selector.
    Properties {
        scope: String,
        properties: IndexMap<String, Value>,
    },
    Rule(Rule),
    Conditional(ConditionalBlock),
}

/// A compiled stylesheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    items: Vec<SheetItem>,
}

impl Stylesheet {
    pub(crate) fn new(items: Vec<SheetItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[SheetItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The custom properties declared under `scope`, if any.
    pub fn custom_properties(&self, scope: &str) -> Option<&IndexMap<String, Value>> {
        self.items.iter().find_map(|item| match item {
            SheetItem::Properties { scope: s, properties } if s == scope => Some(properties),
            _ => None,
        })
    }

    /// All top-level rules in emission order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.items.iter().filter_map(|item| match item {
            SheetItem::Rule(rule) => Some(rule),
            _ => None,
        })
    }

    /// Writes the sheet as CSS text.
    ///
    /// ```rust
    /// use spark_core::{EmitOptions, StyleNode, StyleRegistry, ComponentOptions};
    ///
    /// let mut registry = StyleRegistry::new();
    /// registry
    ///     .component(&StyleNode::new().decl("color", "red"), ComponentOptions::new("card"))
    ///     .unwrap();
    /// let sheet = registry.stylesheet();
    ///
    /// assert_eq!(sheet.to_css(&EmitOptions::default()), ".card {\n  color: red;\n}\n");
    /// let minified = EmitOptions { minify: true, ..EmitOptions::default() };
    /// assert_eq!(sheet.to_css(&minified), ".card{color:red}");
    /// ```
    pub fn to_css(&self, options: &EmitOptions) -> String {
        let mut writer = CssWriter::new(options);
        if let Some(header) = &options.header {
            writer.comment(header);
        }
        for item in &self.items {
            match item {
                SheetItem::Properties { scope, properties } => {
                    if properties.is_empty() {
                        continue;
                    }
                    let decls: Vec<(String, String)> = properties
                        .iter()
                        .map(|(name, value)| (property_name(name), value.to_string()))
                        .collect();
                    writer.block(scope, &decls, 0);
                }
                SheetItem::Rule(rule) => writer.rule(rule, 0),
                SheetItem::Conditional(block) => {
                    if block.rules.iter().all(|r| r.declarations().is_empty()) {
                        continue;
                    }
                    writer.open(&block.at_rule, 0);
                    for rule in &block.rules {
                        writer.rule(rule, 1);
                    }
                    writer.close(0);
                }
            }
        }
        writer.finish()
    }
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css(&EmitOptions::default()))
    }
}

struct CssWriter<'a> {
    out: String,
    options: &'a EmitOptions,
}

impl<'a> CssWriter<'a> {
    fn new(options: &'a EmitOptions) -> Self {
        Self {
            out: String::new(),
            options,
        }
    }

    fn pad(&mut self, depth: usize) {
        if !self.options.minify {
            self.out.push_str(&" ".repeat(self.options.indent * depth));
        }
    }

    fn separate(&mut self, depth: usize) {
        if !self.options.minify && depth == 0 && !self.out.is_empty() {
            self.out.push('\n');
        }
    }

    fn comment(&mut self, text: &str) {
        let text = text.replace("*/", "* /");
        if self.options.minify {
            self.out.push_str(&format!("/*{}*/", text));
        } else {
            self.out.push_str(&format!("/* {} */\n", text));
        }
    }

    fn open(&mut self, prelude: &str, depth: usize) {
        self.separate(depth);
        self.pad(depth);
        if self.options.minify {
            self.out.push_str(&split_selector_list(prelude).join(","));
            self.out.push('{');
        } else {
            self.out.push_str(prelude);
            self.out.push_str(" {\n");
        }
    }

    fn close(&mut self, depth: usize) {
        self.pad(depth);
        self.out.push('}');
        if !self.options.minify {
            self.out.push('\n');
        }
    }

    fn block(&mut self, prelude: &str, decls: &[(String, String)], depth: usize) {
        self.open(prelude, depth);
        for (i, (name, value)) in decls.iter().enumerate() {
            if self.options.minify {
                if i > 0 {
                    self.out.push(';');
                }
                self.out.push_str(&format!("{}:{}", name, value));
            } else {
                self.pad(depth + 1);
                self.out.push_str(&format!("{}: {};\n", name, value));
            }
        }
        self.close(depth);
    }

    fn rule(&mut self, rule: &Rule, depth: usize) {
        if rule.declarations().is_empty() {
            return;
        }
        let decls: Vec<(String, String)> = rule
            .declarations()
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        self.block(&rule.selector(), &decls, depth);
    }

    fn finish(self) -> String {
        self.out
    }
}
