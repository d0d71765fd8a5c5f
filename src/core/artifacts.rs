//! Loaders for the raw per-defect instrumentation artifacts.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::core::aggregate::SuspVector;
use crate::core::error::{CorpusError, CorpusResult};
use crate::infra::io::read_artifact;

/// coverage.py JSON report (only the fields used here)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverageReport
{
    #[serde(default)]
    pub files: IndexMap<String, FileCoverage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileCoverage
{
    #[serde(default)]
    pub executed_lines: Vec<usize>,

    #[serde(default)]
    pub summary: CoverageSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverageSummary
{
    #[serde(default)]
    pub num_statements: usize,
}

impl FileCoverage
{
    /// Files without statements are not instrumentable
    pub fn is_instrumentable(&self) -> bool
    {
        self.summary
            .num_statements
            > 0
    }

    /// Executed lines, ascending and unique
    pub fn sorted_lines(&self) -> Vec<usize>
    {
        let mut lines = self
            .executed_lines
            .clone();
        lines.sort_unstable();
        lines.dedup();
        lines
    }
}

/// `{path: {"<line>": {metric: score}}}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SuspiciousnessReport
{
    pub files: IndexMap<String, IndexMap<String, SuspVector>>,
}

impl SuspiciousnessReport
{
    /// Scored lines of one file, ascending; keys that are not line numbers are dropped
    pub fn lines_of(
        &self,
        path: &str,
    ) -> Vec<(usize, SuspVector)>
    {
        let Some(lines) = self
            .files
            .get(path)
        else
        {
            return Vec::new();
        };

        let mut out: Vec<(usize, SuspVector)> = lines
            .iter()
            .filter_map(|(key, vector)| match key.trim().parse::<usize>()
            {
                Ok(line) => Some((line, vector.clone())),
                Err(_) =>
                {
                    tracing::debug!(file = path, key = %key, "ignoring non-numeric line key");
                    None
                }
            })
            .collect();
        out.sort_by_key(|(line, _)| *line);
        out
    }
}

pub fn load_coverage(path: &Path) -> CorpusResult<CoverageReport>
{
    load_json(path, "coverage report")
}

pub fn load_suspiciousness(path: &Path) -> CorpusResult<SuspiciousnessReport>
{
    load_json(path, "suspiciousness report")
}

/// Parse a JSON artifact; absent files are `MissingArtifact`
pub fn load_json<T: DeserializeOwned>(
    path: &Path,
    what: &'static str,
) -> CorpusResult<T>
{
    let text = read_artifact(path, what)?;
    serde_json::from_str(&text).map_err(|source| CorpusError::Json {
        path: path.to_path_buf(),
        source,
    })
}
