//! Scope intervals and line-to-scope resolution.
//!
//! A parsed file is reduced to two flat interval lists (functions and
//! classes). Resolution picks the innermost enclosing interval of each kind
//! by smallest span; proper nesting in the host language guarantees the
//! answer is unambiguous.

use serde::{Deserialize, Serialize};

/// Kind of a scope interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind
{
    /// `def` / `async def`
    Function,
    /// `class`
    Class,
}

/// One function or class definition's line range (1-based, inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeInterval
{
    pub kind: ScopeKind,

    /// Declared name
    pub name: String,

    /// Definition line (the `def`/`class` keyword line)
    pub start_line: usize,

    /// Last line of the body
    pub end_line: usize,

    /// Rendered formal parameters, empty for classes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub params: String,
}

impl ScopeInterval
{
    pub fn function(
        name: impl Into<String>,
        start_line: usize,
        end_line: usize,
        params: impl Into<String>,
    ) -> Self
    {
        Self {
            kind: ScopeKind::Function,
            name: name.into(),
            start_line,
            end_line,
            params: params.into(),
        }
    }

    pub fn class(
        name: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self
    {
        Self {
            kind: ScopeKind::Class,
            name: name.into(),
            start_line,
            end_line,
            params: String::new(),
        }
    }

    /// Width used for innermost selection
    pub fn span(&self) -> usize
    {
        self.end_line
            .saturating_sub(self.start_line)
    }

    pub fn contains(
        &self,
        line: usize,
    ) -> bool
    {
        self.start_line <= line && line <= self.end_line
    }
}

/// All scopes of one source file. Order carries no meaning beyond
/// deterministic tie-breaking (first encountered wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileScopes
{
    pub functions: Vec<ScopeInterval>,
    pub classes: Vec<ScopeInterval>,
}

/// Result of resolving one line: innermost function plus innermost class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a>
{
    pub function: &'a ScopeInterval,
    pub class: Option<&'a ScopeInterval>,
}

impl Resolution<'_>
{
    /// Innermost class name, or "" for module-level functions
    pub fn class_name(&self) -> &str
    {
        self.class
            .map(|c| c.name.as_str())
            .unwrap_or("")
    }
}

impl FileScopes
{
    pub fn is_empty(&self) -> bool
    {
        self.functions
            .is_empty()
            && self
                .classes
                .is_empty()
    }

    /// Resolve `line` to its innermost enclosing function and class.
    ///
    /// Returns `None` when no function encloses the line (module-level
    /// statements, class bodies outside methods, blank tails).
    pub fn resolve(
        &self,
        line: usize,
    ) -> Option<Resolution<'_>>
    {
        let function = innermost(&self.functions, line)?;
        let class = innermost(&self.classes, line);
        Some(Resolution { function, class })
    }
}

/// Smallest-span interval containing `line`; ties keep the earliest entry.
fn innermost(
    scopes: &[ScopeInterval],
    line: usize,
) -> Option<&ScopeInterval>
{
    let mut best: Option<&ScopeInterval> = None;
    for scope in scopes
        .iter()
        .filter(|s| s.contains(line))
    {
        match best
        {
            Some(b) if b.span() <= scope.span() => {}
            _ => best = Some(scope),
        }
    }
    best
}
