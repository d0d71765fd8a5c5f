//! Snapshot source files, parsed once per defect.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::error::{CorpusError, CorpusResult};
use crate::core::scope::FileScopes;
use crate::infra::io::read_source;

/// Turns source text into flat scope intervals.
pub trait ScopeParser: Send + Sync
{
    /// Parse `content` (reported as `path` in errors) into its scopes
    fn parse_scopes(
        &self,
        path: &str,
        content: &str,
    ) -> CorpusResult<FileScopes>;
}

/// One parsed snapshot file.
#[derive(Debug, Clone)]
pub struct SourceFile
{
    /// Repository-relative path
    pub path: String,
    pub text: String,
    pub scopes: FileScopes,
}

impl SourceFile
{
    /// Lines `begin..=end` (1-based) joined with `\n`, without a trailing newline
    pub fn snippet(
        &self,
        begin: usize,
        end: usize,
    ) -> String
    {
        if begin == 0 || end < begin
        {
            return String::new();
        }
        self.text
            .split('\n')
            .skip(begin - 1)
            .take(end - begin + 1)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of `\n`-separated lines, counting a trailing empty one
    pub fn line_count(&self) -> usize
    {
        self.text
            .split('\n')
            .count()
    }
}

/// Lazily loads and parses files under one snapshot root.
pub struct SourceCache<'p>
{
    root: PathBuf,
    parser: &'p dyn ScopeParser,
    files: HashMap<String, SourceFile>,
}

impl<'p> SourceCache<'p>
{
    pub fn new(
        root: impl Into<PathBuf>,
        parser: &'p dyn ScopeParser,
    ) -> Self
    {
        Self { root: root.into(), parser, files: HashMap::new() }
    }

    pub fn root(&self) -> &Path
    {
        &self.root
    }

    /// Load `rel`, parsing on first access.
    ///
    /// Failures are not cached; a file that failed once fails again
    /// on the next call with the same error kind.
    pub fn load(
        &mut self,
        rel: &str,
    ) -> CorpusResult<&SourceFile>
    {
        if !self
            .files
            .contains_key(rel)
        {
            let full = self
                .root
                .join(rel);
            if !full.is_file()
            {
                return Err(CorpusError::MissingFile { path: full });
            }

            let text = read_source(&full, rel)?;
            let scopes = self
                .parser
                .parse_scopes(rel, &text)?;

            tracing::trace!(
                file = rel,
                functions = scopes.functions.len(),
                classes = scopes.classes.len(),
                "parsed"
            );

            self.files.insert(
                rel.to_string(),
                SourceFile { path: rel.to_string(), text, scopes },
            );
        }

        self.files
            .get(rel)
            .ok_or_else(|| CorpusError::MissingFile {
                path: self
                    .root
                    .join(rel),
            })
    }

    pub fn len(&self) -> usize
    {
        self.files
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.files
            .is_empty()
    }
}
