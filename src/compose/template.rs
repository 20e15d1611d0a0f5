//! Minimal template engine for script fragments.
//!
//! Supported syntax:
//! - `{{ path }}` interpolates a bound scalar; `path` is `ident(.ident)*`
//! - `{% for item in path %} ... {% endfor %}` iterates a bound sequence
//! - `{# ... #}` is a comment
//!
//! Nothing else is accepted. A newline directly after a `{% ... %}` tag is
//! dropped, so block tags on their own line leave no blank lines behind.
//! This is Jinja's `trim_blocks` behaviour, which Jinja itself leaves off by
//! default. Catalog templates written against plain Jinja render here
//! without the blank line each block tag would otherwise leave.
//! Leading whitespace before a tag is kept (no `lstrip_blocks`).

use std::collections::BTreeMap;

use crate::compose::errors::TemplateError;

/// A value that can be bound to a template variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    Sequence(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a sequence of scalars.
    pub fn scalars<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Sequence(items.into_iter().map(|s| Value::Scalar(s.into())).collect())
    }

    /// Build a map of scalars.
    pub fn scalar_map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), Value::Scalar(v.into())))
                .collect(),
        )
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

/// Top-level variable bindings for one render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    vars: BTreeMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Builder form of [`Bindings::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Expr {
        path: Vec<String>,
    },
    For {
        var: String,
        source: Vec<String>,
        body: Vec<Node>,
    },
}

#[derive(Debug)]
enum Token<'s> {
    Text(&'s str),
    Expr(&'s str, usize),
    Tag(&'s str, usize),
}

/// A parsed template, ready to render any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    origin: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse template text.
    ///
    /// `origin` names the template in error messages, e.g. ``module `python` (base `theia`)``.
    pub fn parse(origin: impl Into<String>, text: &str) -> Result<Self, TemplateError> {
        let origin = origin.into();
        let tokens = tokenize(&origin, text)?;
        let nodes = build_tree(&origin, tokens)?;
        Ok(Template { origin, nodes })
    }

    /// The name used for this template in error messages.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// How many times the root binding `name` is referenced outside of a
    /// loop that shadows it.
    pub fn reference_count(&self, name: &str) -> usize {
        let mut refs = Vec::new();
        collect_free(&self.nodes, &mut Vec::new(), &mut refs);
        refs.iter().filter(|r| r.as_str() == name).count()
    }

    /// Render with the given bindings.
    pub fn render(&self, bindings: &Bindings) -> Result<String, TemplateError> {
        let mut out = String::new();
        let mut locals = Vec::new();
        self.render_nodes(&self.nodes, bindings, &mut locals, &mut out)?;
        Ok(out)
    }

    fn render_nodes<'a>(
        &'a self,
        nodes: &'a [Node],
        globals: &'a Bindings,
        locals: &mut Vec<(&'a str, &'a Value)>,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Expr { path } => match self.lookup(path, globals, locals)? {
                    Value::Scalar(s) => out.push_str(s),
                    _ => {
                        return Err(TemplateError::NotScalar {
                            origin: self.origin.clone(),
                            name: path.join("."),
                        })
                    }
                },
                Node::For { var, source, body } => {
                    let items = match self.lookup(source, globals, locals)? {
                        Value::Sequence(items) => items,
                        _ => {
                            return Err(TemplateError::NotSequence {
                                origin: self.origin.clone(),
                                name: source.join("."),
                            })
                        }
                    };
                    for item in items {
                        locals.push((var.as_str(), item));
                        let result = self.render_nodes(body, globals, locals, out);
                        locals.pop();
                        result?;
                    }
                }
            }
        }
        Ok(())
    }

    fn lookup<'a>(
        &self,
        path: &[String],
        globals: &'a Bindings,
        locals: &[(&'a str, &'a Value)],
    ) -> Result<&'a Value, TemplateError> {
        let unresolved = || TemplateError::Unresolved {
            origin: self.origin.clone(),
            name: path.join("."),
        };

        let (root, rest) = path.split_first().ok_or_else(unresolved)?;
        let mut current = locals
            .iter()
            .rev()
            .find(|(name, _)| *name == root.as_str())
            .map(|(_, value)| *value)
            .or_else(|| globals.get(root))
            .ok_or_else(unresolved)?;

        for segment in rest {
            current = match current {
                Value::Map(map) => map.get(segment).ok_or_else(unresolved)?,
                _ => return Err(unresolved()),
            };
        }

        Ok(current)
    }
}

/// Parse and render in one step.
pub fn render(origin: &str, text: &str, bindings: &Bindings) -> Result<String, TemplateError> {
    Template::parse(origin, text)?.render(bindings)
}

fn malformed(origin: &str, line: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::Malformed {
        origin: origin.to_string(),
        line,
        message: message.into(),
    }
}

fn tokenize<'s>(origin: &str, text: &'s str) -> Result<Vec<Token<'s>>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = text;
    let mut line = 1;

    while let Some((start, open)) = find_open(rest) {
        let (literal, tail) = rest.split_at(start);
        if !literal.is_empty() {
            tokens.push(Token::Text(literal));
        }
        line += literal.matches('\n').count();

        let close = match open {
            b'{' => "}}",
            b'%' => "%}",
            _ => "#}",
        };
        let body = &tail[2..];
        let end = body.find(close).ok_or_else(|| {
            malformed(
                origin,
                line,
                format!("unclosed `{{{}`", open as char),
            )
        })?;
        let inner = &body[..end];

        match open {
            b'{' => tokens.push(Token::Expr(inner.trim(), line)),
            b'%' => tokens.push(Token::Tag(inner.trim(), line)),
            _ => {}
        }

        line += inner.matches('\n').count();
        rest = &body[end + 2..];

        if open == b'%' {
            if let Some(stripped) = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) {
                rest = stripped;
                line += 1;
            }
        }
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }

    Ok(tokens)
}

/// Find the next `{{`, `{%` or `{#`.
fn find_open(s: &str) -> Option<(usize, u8)> {
    let bytes = s.as_bytes();
    s.match_indices('{').find_map(|(i, _)| match bytes.get(i + 1) {
        Some(&c @ (b'{' | b'%' | b'#')) => Some((i, c)),
        _ => None,
    })
}

struct Frame {
    var: String,
    source: Vec<String>,
    line: usize,
    body: Vec<Node>,
}

fn build_tree(origin: &str, tokens: Vec<Token<'_>>) -> Result<Vec<Node>, TemplateError> {
    let mut root = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for token in tokens {
        let node = match token {
            Token::Text(text) => Node::Text(text.to_string()),
            Token::Expr(expr, line) => Node::Expr {
                path: parse_path(origin, line, expr)?,
            },
            Token::Tag(tag, line) => {
                let words: Vec<&str> = tag.split_whitespace().collect();
                match words.as_slice() {
                    ["for", var, "in", source] => {
                        if !is_ident(var) {
                            return Err(malformed(
                                origin,
                                line,
                                format!("invalid loop variable `{}`", var),
                            ));
                        }
                        stack.push(Frame {
                            var: var.to_string(),
                            source: parse_path(origin, line, source)?,
                            line,
                            body: Vec::new(),
                        });
                        continue;
                    }
                    ["endfor"] => {
                        let frame = stack.pop().ok_or_else(|| {
                            malformed(origin, line, "`endfor` without a matching `for`")
                        })?;
                        Node::For {
                            var: frame.var,
                            source: frame.source,
                            body: frame.body,
                        }
                    }
                    [keyword, ..] => {
                        return Err(malformed(
                            origin,
                            line,
                            format!("unsupported tag `{}`", keyword),
                        ))
                    }
                    [] => return Err(malformed(origin, line, "empty tag")),
                }
            }
        };

        match stack.last_mut() {
            Some(frame) => frame.body.push(node),
            None => root.push(node),
        }
    }

    if let Some(frame) = stack.last() {
        return Err(malformed(
            origin,
            frame.line,
            format!("`for {}` is never closed with `endfor`", frame.var),
        ));
    }

    Ok(root)
}

fn parse_path(origin: &str, line: usize, expr: &str) -> Result<Vec<String>, TemplateError> {
    if expr.is_empty() {
        return Err(malformed(origin, line, "empty expression"));
    }

    let segments: Vec<String> = expr.split('.').map(str::to_string).collect();
    if segments.iter().all(|s| is_ident(s)) {
        Ok(segments)
    } else {
        Err(malformed(
            origin,
            line,
            format!("`{}` is not a variable path", expr),
        ))
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn collect_free(nodes: &[Node], bound: &mut Vec<String>, refs: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Expr { path } => {
                if !bound.contains(&path[0]) {
                    refs.push(path[0].clone());
                }
            }
            Node::For { var, source, body } => {
                if !bound.contains(&source[0]) {
                    refs.push(source[0].clone());
                }
                bound.push(var.clone());
                collect_free(body, bound, refs);
                bound.pop();
            }
        }
    }
}
