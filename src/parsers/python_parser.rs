//! Filepath: src/parsers/python_parser.rs
//! ------------------------------------------------------------------
//! Python scope builder built on Tree-sitter 0.25.x.
//! Goals:
//!   - Use broad, stable queries (no fragile field predicates).
//!   - Report every def/class as a flat line interval, nested
//!     ones included; nesting is recovered later by span.
//!   - Treat any ERROR/MISSING node as a failed parse so a
//!     partial snapshot never yields half a scope tree.
//!   - Render formal parameters the way they read in source,
//!     whitespace-normalized, for signature construction.
//!
//! Notes:
//!   - Line numbers are 1-based; a def starts on its `def`
//!     line (decorators excluded) and ends on its last body line.
//!   - Comments after the last body statement are not part of
//!     the span, even when indented at body level.
//!   - `async def` is a function_definition in the grammar and
//!     is therefore reported as a Function scope. This departs
//!     from catalogues built from `ast.FunctionDef` alone: lines
//!     in coroutines resolve to the coroutine, not an enclosing
//!     sync def, so async-heavy projects yield more methods.
//! ------------------------------------------------------------------

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Parser, Point, Query, QueryCursor, StreamingIterator};

use crate::core::error::{CorpusError, CorpusResult};
use crate::core::scope::{FileScopes, ScopeInterval};
use crate::core::source::ScopeParser;

/// Builds function/class scope intervals from Python source.
pub struct PythonScopeParser
{
    /// Python language handle for Tree-sitter.
    language: Language,
    /// Query capturing defs and class defs with their names.
    query: Query,
}

impl PythonScopeParser
{
    /// Construct a parser with a compiled def/class query.
    pub fn new() -> Result<Self>
    {
        let language = tree_sitter_python::LANGUAGE.into();

        let query_src = r#"
            (function_definition
              name: (identifier) @name) @function

            (class_definition
              name: (identifier) @name) @class
        "#;

        let query = Query::new(&language, query_src).context("create Python scope query")?;

        Ok(Self { language, query })
    }
}

impl ScopeParser for PythonScopeParser
{
    fn parse_scopes(
        &self,
        path: &str,
        content: &str,
    ) -> CorpusResult<FileScopes>
    {
        let fail = |reason: String| CorpusError::Parse { path: path.to_string(), reason };

        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| fail(format!("set Python language: {e}")))?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| fail("parser produced no tree".to_string()))?;

        let root = tree.root_node();
        if root.has_error()
        {
            let line = first_error_line(root).unwrap_or(1);
            return Err(fail(format!("syntax error near line {line}")));
        }

        // Same byte slice for every utf8_text call.
        let bytes = content.as_bytes();

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.query, root, bytes);
        let cap_names: Vec<&str> = self
            .query
            .capture_names()
            .to_vec();

        let mut scopes = FileScopes::default();

        while let Some(m) = matches.next()
        {
            let mut item: Option<(Node, &str)> = None;
            let mut name: Option<&str> = None;

            for cap in m.captures
            {
                match cap_names[cap.index as usize]
                {
                    "name" => name = cap.node.utf8_text(bytes).ok(),
                    kind @ ("function" | "class") => item = Some((cap.node, kind)),
                    _ => {}
                }
            }

            let (Some((node, kind)), Some(name)) = (item, name)
            else
            {
                continue;
            };

            let (start_line, end_line) = line_span(node);
            if kind == "function"
            {
                let params = render_parameters(node, bytes);
                scopes
                    .functions
                    .push(ScopeInterval::function(name, start_line, end_line, params));
            }
            else
            {
                scopes
                    .classes
                    .push(ScopeInterval::class(name, start_line, end_line));
            }
        }

        Ok(scopes)
    }
}

/// 1-based inclusive line span of a def/class, ending on its last statement.
/// A node whose end sits at column 0 ended on the previous line's newline.
fn line_span(node: Node) -> (usize, usize)
{
    let start = node.start_position();
    let end = code_end(node);

    let end_line = if end.column == 0 && end.row > start.row
    {
        end.row
    }
    else
    {
        end.row + 1
    };

    (start.row + 1, end_line)
}

/// End of `node` with trailing comments dropped.
///
/// Comments indented at body level after the last statement belong to the
/// enclosing `block`, so the walk descends through blocks and compound
/// statements until it reaches the last real statement.
fn code_end(node: Node) -> Point
{
    let mut cursor = node.walk();
    let last = node
        .children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .last();

    match last
    {
        Some(child) if ends_in_block(child) => code_end(child),
        Some(child) => child.end_position(),
        None => node.end_position(),
    }
}

fn ends_in_block(node: Node) -> bool
{
    let kind = node.kind();
    kind == "block"
        || kind.ends_with("_statement")
        || kind.ends_with("_clause")
        || kind.ends_with("_definition")
}

/// Line of the first ERROR or MISSING node, depth-first.
fn first_error_line(node: Node) -> Option<usize>
{
    if node.is_error() || node.is_missing()
    {
        return Some(node.start_position().row + 1);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor)
    {
        if child.has_error() || child.is_missing()
        {
            if let Some(line) = first_error_line(child)
            {
                return Some(line);
            }
        }
    }
    None
}

/// Render a def's parameter list: `self, x: int, y=1, *args, **kw`.
fn render_parameters(
    function: Node,
    bytes: &[u8],
) -> String
{
    let Some(params) = function.child_by_field_name("parameters")
    else
    {
        return String::new();
    };

    let mut cursor = params.walk();
    params
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .map(|c| render_parameter(c, bytes))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_parameter(
    node: Node,
    bytes: &[u8],
) -> String
{
    match node.kind()
    {
        "default_parameter" => format!(
            "{}={}",
            field_text(node, "name", bytes),
            field_text(node, "value", bytes)
        ),
        "typed_default_parameter" => format!(
            "{}: {}={}",
            field_text(node, "name", bytes),
            field_text(node, "type", bytes),
            field_text(node, "value", bytes)
        ),
        "typed_parameter" =>
        {
            // First named child is the target (identifier or splat pattern).
            let target = node
                .named_child(0)
                .map(|t| collapsed_text(t, bytes))
                .unwrap_or_default();
            format!("{}: {}", target, field_text(node, "type", bytes))
        }
        // identifier, *args, **kwargs, bare `*`, `/`
        _ => collapsed_text(node, bytes),
    }
}

fn field_text(
    node: Node,
    field: &str,
    bytes: &[u8],
) -> String
{
    node.child_by_field_name(field)
        .map(|n| collapsed_text(n, bytes))
        .unwrap_or_default()
}

/// Node text with whitespace runs (including newlines) folded to one space.
fn collapsed_text(
    node: Node,
    bytes: &[u8],
) -> String
{
    node.utf8_text(bytes)
        .unwrap_or("")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
