//! Scopes a resolved style body under its class selector.
//!
//! The output follows the compact shape stylis produces for
//! `.className { body }`: declarations of a rule are grouped into one block
//! ahead of any nested rules, `&` refers to the enclosing selector and
//! conditional group at-rules wrap the scoped rules they contain.

use regex::Regex;

lazy_static::lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// At-rules whose block holds ordinary rules that still need the scope.
const SCOPED_AT_RULES: &[&str] = &["media", "supports", "container", "layer", "document"];

#[derive(Debug, PartialEq)]
enum Node {
    Declaration(String),
    Statement(String),
    Block { prelude: String, children: Vec<Node> },
}

/// Collapses whitespace runs to single spaces and trims.
pub fn normalize(css: &str) -> String {
    WHITESPACE_RE.replace_all(css, " ").trim().to_string()
}

pub fn compile_rule(body: &str, class_name: &str) -> String {
    let chars: Vec<char> = body.chars().collect();
    let mut pos = 0;
    let nodes = parse_block(&chars, &mut pos);

    let selector = format!(".{}", class_name);
    let mut out = String::new();
    for node in &nodes {
        if let Node::Statement(text) = node {
            out.push_str(text);
            out.push(';');
        }
    }
    out.push_str(&emit_scoped(&[selector], &nodes));
    out
}

fn parse_block(chars: &[char], pos: &mut usize) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut buffer = String::new();
    let mut quote: Option<char> = None;
    let mut parens = 0i32;

    while *pos < chars.len() {
        let ch = chars[*pos];
        *pos += 1;

        if let Some(q) = quote {
            buffer.push(ch);
            if ch == '\\' {
                if let Some(&next) = chars.get(*pos) {
                    buffer.push(next);
                    *pos += 1;
                }
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '/' if parens <= 0 && chars.get(*pos) == Some(&'*') => skip_comment(chars, pos),
            '"' | '\'' => {
                quote = Some(ch);
                buffer.push(ch);
            }
            '(' => {
                parens += 1;
                buffer.push(ch);
            }
            ')' => {
                parens -= 1;
                buffer.push(ch);
            }
            ';' if parens <= 0 => push_flat(&mut nodes, &mut buffer),
            '{' if parens <= 0 => {
                let prelude = normalize(&buffer);
                buffer.clear();
                let children = parse_block(chars, pos);
                nodes.push(Node::Block { prelude, children });
            }
            '}' if parens <= 0 => {
                push_flat(&mut nodes, &mut buffer);
                return nodes;
            }
            _ => buffer.push(ch),
        }
    }
    push_flat(&mut nodes, &mut buffer);
    nodes
}

/// Moves `pos` past the `*/` closing a comment whose `/` was just read.
fn skip_comment(chars: &[char], pos: &mut usize) {
    *pos += 1;
    while *pos < chars.len() {
        if chars[*pos] == '*' && chars.get(*pos + 1) == Some(&'/') {
            *pos += 2;
            return;
        }
        *pos += 1;
    }
}

fn push_flat(nodes: &mut Vec<Node>, buffer: &mut String) {
    let text = normalize(buffer);
    buffer.clear();
    if text.is_empty() {
        return;
    }
    if text.starts_with('@') {
        nodes.push(Node::Statement(text));
    } else if let Some((property, value)) = text.split_once(':') {
        let (property, value) = (property.trim(), value.trim());
        if !property.is_empty() && !value.is_empty() {
            nodes.push(Node::Declaration(format!("{}:{};", property, value)));
        }
    }
}

fn emit_scoped(selectors: &[String], nodes: &[Node]) -> String {
    let declarations: String = nodes
        .iter()
        .filter_map(|node| match node {
            Node::Declaration(decl) => Some(decl.as_str()),
            _ => None,
        })
        .collect();

    let mut out = String::new();
    if !declarations.is_empty() {
        out.push_str(&selectors.join(","));
        out.push('{');
        out.push_str(&declarations);
        out.push('}');
    }

    for node in nodes {
        let Node::Block { prelude, children } = node else { continue };
        if let Some(name) = at_rule_name(prelude) {
            let inner = if SCOPED_AT_RULES.contains(&name) {
                emit_scoped(selectors, children)
            } else {
                emit_unscoped(children)
            };
            if !inner.is_empty() {
                out.push_str(prelude);
                out.push('{');
                out.push_str(&inner);
                out.push('}');
            }
        } else {
            let nested = resolve_selectors(selectors, prelude);
            out.push_str(&emit_scoped(&nested, children));
        }
    }
    out
}

/// Keyframes, font faces and the like keep their own selectors.
fn emit_unscoped(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Declaration(decl) => out.push_str(decl),
            Node::Statement(text) => {
                out.push_str(text);
                out.push(';');
            }
            Node::Block { prelude, children } => {
                out.push_str(prelude);
                out.push('{');
                out.push_str(&emit_unscoped(children));
                out.push('}');
            }
        }
    }
    out
}

fn at_rule_name(prelude: &str) -> Option<&str> {
    let rest = prelude.strip_prefix('@')?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

fn resolve_selectors(parents: &[String], prelude: &str) -> Vec<String> {
    let children = split_on_top_level_commas(prelude);
    let mut resolved = Vec::with_capacity(parents.len() * children.len());
    for parent in parents {
        for child in &children {
            if child.contains('&') {
                resolved.push(child.replace('&', parent));
            } else {
                resolved.push(format!("{} {}", parent, child));
            }
        }
    }
    resolved
}

fn split_on_top_level_commas(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                result.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    result.push(current.trim().to_string());
    result.retain(|selector| !selector.is_empty());
    result
}
