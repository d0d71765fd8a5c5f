//! Fix-location oracle: which lines of which files the fix touched.
//!
//! The diff-backed set keeps one representative line per hunk,
//! `old_start + hunk_offset`, so that the marker lands inside the hunk body
//! rather than on its leading context.

use std::collections::{BTreeMap, BTreeSet};

/// Default offset from a hunk's old-side start line to its marker line
pub const DEFAULT_HUNK_OFFSET: i64 = 3;

/// Read-only view of fix-relevant lines per canonical file path.
pub trait FixLocationOracle
{
    /// Lines considered changed by the fix in `file_path` (empty if none)
    fn changed_lines(
        &self,
        file_path: &str,
    ) -> Option<&BTreeSet<usize>>;

    /// True iff any fix line of `file_path` lies in `begin..=end`
    fn intersects(
        &self,
        file_path: &str,
        begin: usize,
        end: usize,
    ) -> bool
    {
        self.changed_lines(file_path)
            .is_some_and(|lines| {
                lines
                    .range(begin..=end)
                    .next()
                    .is_some()
            })
    }
}

/// Fix lines grouped by file, built once per defect from its patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixLocationSet
{
    by_file: BTreeMap<String, BTreeSet<usize>>,
}

impl FixLocationSet
{
    /// Parse a unified diff.
    ///
    /// `--- a/<path>` opens a file group; any other `--- ` header (for
    /// example `/dev/null` on created files) closes it so stray hunks are not
    /// attributed to the previous file. Each `@@ -<start>[,<n>] ...` header
    /// contributes `start + hunk_offset`, clamped to line 1.
    pub fn from_diff(
        diff: &str,
        hunk_offset: i64,
    ) -> Self
    {
        let mut by_file: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
        let mut current: Option<String> = None;

        for line in diff.lines()
        {
            if let Some(path) = line.strip_prefix("--- a/")
            {
                let path = path
                    .trim()
                    .to_string();
                // Make sure a file with only unparseable hunks still shows up
                by_file
                    .entry(path.clone())
                    .or_default();
                current = Some(path);
                continue;
            }

            if line.starts_with("--- ")
            {
                current = None;
                continue;
            }

            if let Some(rest) = line.strip_prefix("@@ -")
            {
                let Some(file) = current.as_ref()
                else
                {
                    continue;
                };
                if let Some(start) = hunk_old_start(rest)
                {
                    let marked = (start as i64 + hunk_offset).max(1) as usize;
                    by_file
                        .entry(file.clone())
                        .or_default()
                        .insert(marked);
                }
            }
        }

        Self { by_file }
    }

    pub fn files(&self) -> impl Iterator<Item = &str>
    {
        self.by_file
            .keys()
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool
    {
        self.by_file
            .values()
            .all(BTreeSet::is_empty)
    }
}

impl FixLocationOracle for FixLocationSet
{
    fn changed_lines(
        &self,
        file_path: &str,
    ) -> Option<&BTreeSet<usize>>
    {
        self.by_file
            .get(file_path)
    }
}

/// Leading decimal of `"<start>[,<count>] +..."`
fn hunk_old_start(rest: &str) -> Option<usize>
{
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end]
        .parse()
        .ok()
}
