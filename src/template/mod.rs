//! Template System - Mustache-style Expansion
//!
//! Templates are parsed once and rendered many times. Supported tags:
//!
//! ```text
//! {{name}}  {{{name}}}  {{&name}}    raw substitution, dotted names allowed
//! {{#name}}...{{/name}}              section (lambda, list, object or truthy value)
//! {{^name}}...{{/name}}              inverted section
//! {{! comment }}
//! ```
//!
//! Substitution is never HTML-escaped, `{{name}}` included. The output is SVG
//! markup written by a trusted template author, but record fields come from
//! upstream account data and land in the markup verbatim. That is the trust
//! boundary of this crate.

mod parser;

use parser::Node;

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },
}

impl TemplateError {
    fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax { offset, message: message.into() }
    }

    pub fn offset(&self) -> usize {
        match self {
            Self::Syntax { offset, .. } => *offset,
        }
    }
}

/// A section lambda: receives the section's raw inner text and a render step
/// that expands text against the current scope.
pub type Lambda = dyn Fn(&str, &dyn Fn(&str) -> String) -> String + Send + Sync;

/// Named values visible to a template
#[derive(Clone, Default)]
pub struct Context {
    values: Value,
    lambdas: HashMap<String, Arc<Lambda>>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            values: Value::Object(Map::new()),
            lambdas: HashMap::new(),
        }
    }

    /// Use a JSON value as the root scope
    pub fn from_value(values: Value) -> Self {
        Self {
            values,
            lambdas: HashMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn with_lambda<F>(mut self, name: impl Into<String>, lambda: F) -> Self
    where
        F: Fn(&str, &dyn Fn(&str) -> String) -> String + Send + Sync + 'static,
    {
        self.lambdas.insert(name.into(), Arc::new(lambda));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        if !self.values.is_object() {
            self.values = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.values {
            map.insert(name.into(), value.into());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lambdas: Vec<_> = self.lambdas.keys().collect();
        lambdas.sort();
        f.debug_struct("Context")
            .field("values", &self.values)
            .field("lambdas", &lambdas)
            .finish()
    }
}

/// A parsed template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse and validate template source
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            source: source.to_string(),
            nodes: parser::parse(source)?,
        })
    }

    pub fn render(&self, context: &Context) -> String {
        let renderer = Renderer { context };
        let mut stack = vec![&context.values];
        let mut out = String::with_capacity(self.source.len());
        renderer.render_nodes(&self.nodes, &mut stack, &mut out);
        out
    }
}

/// Parse and render in one step
pub fn render_str(source: &str, context: &Context) -> Result<String, TemplateError> {
    Ok(Template::parse(source)?.render(context))
}

enum Resolved<'a> {
    Value(&'a Value),
    Lambda(&'a Arc<Lambda>),
}

struct Renderer<'a> {
    context: &'a Context,
}

impl<'a> Renderer<'a> {
    fn render_nodes(&self, nodes: &[Node], stack: &mut Vec<&'a Value>, out: &mut String) {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Variable(name) => match self.resolve(name, stack) {
                    Some(Resolved::Value(value)) => write_value(value, out),
                    Some(Resolved::Lambda(lambda)) => {
                        out.push_str(&self.call(lambda, "", stack));
                    }
                    None => {}
                },
                Node::Section { name, inverted, children, raw } => {
                    let resolved = self.resolve(name, stack);
                    if *inverted {
                        let truthy = match resolved {
                            Some(Resolved::Value(value)) => is_truthy(value),
                            Some(Resolved::Lambda(_)) => true,
                            None => false,
                        };
                        if !truthy {
                            self.render_nodes(children, stack, out);
                        }
                        continue;
                    }
                    match resolved {
                        Some(Resolved::Lambda(lambda)) => {
                            out.push_str(&self.call(lambda, raw, stack));
                        }
                        Some(Resolved::Value(Value::Array(items))) => {
                            for item in items {
                                stack.push(item);
                                self.render_nodes(children, stack, out);
                                stack.pop();
                            }
                        }
                        Some(Resolved::Value(value)) if is_truthy(value) => {
                            stack.push(value);
                            self.render_nodes(children, stack, out);
                            stack.pop();
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn call(&self, lambda: &Arc<Lambda>, raw: &str, stack: &[&'a Value]) -> String {
        let snapshot = stack.to_vec();
        let render = |text: &str| -> String {
            match parser::parse(text) {
                Ok(nodes) => {
                    let mut scope = snapshot.clone();
                    let mut out = String::new();
                    self.render_nodes(&nodes, &mut scope, &mut out);
                    out
                }
                Err(_) => text.to_string(),
            }
        };
        (**lambda)(raw, &render)
    }

    fn resolve(&self, name: &str, stack: &[&'a Value]) -> Option<Resolved<'a>> {
        if name == "." {
            return stack.last().map(|value| Resolved::Value(*value));
        }

        let mut segments = name.split('.');
        let head = segments.next()?;

        let found = stack.iter().rev().copied().find_map(|scope| scope.get(head));
        let mut value = match found {
            Some(value) => value,
            None => return self.context.lambdas.get(head).map(Resolved::Lambda),
        };

        for segment in segments {
            value = value.get(segment)?;
        }
        Some(Resolved::Value(value))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null | Value::Object(_) => {}
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&format_json_number(n)),
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
        }
    }
}

fn format_json_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(format_number).unwrap_or_default()
    }
}

/// Stringify a number the way template authors expect: `20`, not `20.0`
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_variables_are_not_escaped() {
        let ctx = Context::new().with("name", "<b>&amp;</b>");
        assert_eq!(render_str("{{name}}|{{{name}}}", &ctx).unwrap(), "<b>&amp;</b>|<b>&amp;</b>");
    }

    #[test]
    fn test_missing_renders_empty() {
        let ctx = Context::new().with("login", "a");
        assert_eq!(render_str("[{{login}}{{name}}]", &ctx).unwrap(), "[a]");
    }

    #[test]
    fn test_numbers_render_without_fraction() {
        let ctx = Context::new().with("h", 20.0).with("w", 12.5).with("n", 7);
        assert_eq!(render_str("{{h}} {{w}} {{n}}", &ctx).unwrap(), "20 12.5 7");
    }

    #[test]
    fn test_dotted_lookup() {
        let ctx = Context::from_value(json!({"owner": {"login": "octo"}}));
        assert_eq!(render_str("{{owner.login}}{{owner.missing}}", &ctx).unwrap(), "octo");
    }

    #[test]
    fn test_sections_and_inverted() {
        let ctx = Context::from_value(json!({
            "bots": [{"login": "a"}, {"login": "b"}],
            "empty": [],
            "flag": true,
        }));
        let out = render_str(
            "{{#bots}}<{{login}}>{{/bots}}{{^empty}}none{{/empty}}{{#flag}}!{{/flag}}{{#empty}}x{{/empty}}",
            &ctx,
        )
        .unwrap();
        assert_eq!(out, "<a><b>none!");
    }

    #[test]
    fn test_lambda_gets_raw_text_and_render_step() {
        let ctx = Context::new()
            .with("who", "world")
            .with_lambda("shout", |text, render| render(text).to_uppercase());
        assert_eq!(render_str("{{#shout}}hi {{who}}{{/shout}}", &ctx).unwrap(), "HI WORLD");
    }

    #[test]
    fn test_lambda_is_truthy_for_inverted() {
        let ctx = Context::new().with_lambda("f", |text, _| text.to_string());
        assert_eq!(render_str("{{^f}}no{{/f}}", &ctx).unwrap(), "");
    }

    #[test]
    fn test_render_is_repeatable() {
        let template = Template::parse("<r>{{login}}</r>").unwrap();
        let ctx = Context::new().with("login", "a");
        assert_eq!(template.render(&ctx), template.render(&ctx));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(15.0), "15");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
    }
}
