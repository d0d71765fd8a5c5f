//! Error taxonomy for corpus assembly.
//!
//! Every variant is recoverable: file-level errors skip one source file,
//! defect-level errors skip one defect. Nothing here aborts a batch.

use std::path::PathBuf;

/// How far a failure propagates before the batch carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity
{
    /// Skip the offending file, keep processing the defect.
    File,
    /// Skip the whole defect, keep processing the batch.
    Defect,
}

/// Domain errors raised while building one defect's corpus.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError
{
    /// Source text is not valid Python (syntax error, truncation, bad encoding)
    #[error("{path} could not be parsed: {reason}")]
    Parse
    {
        path: String,
        reason: String,
    },

    /// Normalized path is not present in the defect snapshot
    #[error("{} does not exist", .path.display())]
    MissingFile
    {
        path: PathBuf,
    },

    /// A required upstream artifact (patch, log, coverage, catalogue) is absent
    #[error("missing {what}: {}", .path.display())]
    MissingArtifact
    {
        what: &'static str,
        path: PathBuf,
    },

    /// No method could be resolved from any source
    #[error("{defect} missing coverage info")]
    EmptyCoverage
    {
        defect: String,
    },

    /// Catalogued methods without a suspiciousness entry after aggregation
    #[error("{defect}: {} catalogued signature(s) have no suspiciousness entry (first: {})",
        .signatures.len(),
        .signatures.first().map(String::as_str).unwrap_or("-"))]
    UnresolvedSignature
    {
        defect: String,
        signatures: Vec<String>,
    },

    /// Unexpected I/O while reading an artifact or writing outputs
    #[error("I/O error on {}: {source}", .path.display())]
    Io
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON artifact
    #[error("malformed JSON in {}: {source}", .path.display())]
    Json
    {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CorpusError
{
    /// Granularity at which the assembler recovers from this error.
    pub fn granularity(&self) -> Granularity
    {
        match self
        {
            CorpusError::Parse { .. } | CorpusError::MissingFile { .. } => Granularity::File,
            _ => Granularity::Defect,
        }
    }

    /// Short stable label used in run summaries.
    pub fn kind(&self) -> &'static str
    {
        match self
        {
            CorpusError::Parse { .. } => "parse",
            CorpusError::MissingFile { .. } => "missing-file",
            CorpusError::MissingArtifact { .. } => "missing-artifact",
            CorpusError::EmptyCoverage { .. } => "empty-coverage",
            CorpusError::UnresolvedSignature { .. } => "unresolved-signature",
            CorpusError::Io { .. } => "io",
            CorpusError::Json { .. } => "json",
        }
    }

    pub(crate) fn io(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self
    {
        CorpusError::Io { path: path.into(), source }
    }
}

pub type CorpusResult<T> = Result<T, CorpusError>;
