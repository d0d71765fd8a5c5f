//! **faultline** - method-level corpus builder for fault-localization research
//!
//! Resolves line-level coverage and suspiciousness observations of buggy
//! Python snapshots to their enclosing methods, labels each method against the
//! fix patch, and emits de-duplicated snippet catalogues per defect.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core pipeline - scopes, identities, aggregation and corpus assembly
pub mod core {
    /// Typed error taxonomy with file/defect recovery granularity
    pub mod error;
    pub use error::{CorpusError, CorpusResult, Granularity};

    /// Scope intervals and innermost line resolution
    pub mod scope;
    pub use scope::{FileScopes, Resolution, ScopeInterval, ScopeKind};

    /// Method identities and cross-source signatures
    pub mod identity;
    pub use identity::{MethodIdentity, Signature};

    /// Fix-location oracle backed by unified diffs
    pub mod fixloc;
    pub use fixloc::{FixLocationOracle, FixLocationSet};

    /// Per-project-family path rewrite rules
    pub mod normalize;
    pub use normalize::{PathNormalizer, RewriteRule};

    /// Snapshot sources parsed once per defect
    pub mod source;
    pub use source::{ScopeParser, SourceCache, SourceFile};

    /// Observation aggregation, dedup and suspiciousness merging
    pub mod aggregate;
    pub use aggregate::{Aggregator, MergePolicy, MethodRecord, Observation, Payload};

    /// Raw coverage / suspiciousness artifact loaders
    pub mod artifacts;

    /// Test-run log parsing and test-file discovery
    pub mod testlog;

    /// Per-defect corpus assembly
    pub mod corpus;
    pub use corpus::{CorpusAssembler, DefectId, DefectLayout, DefectReport, Mode};

    /// Corpus JSON writers
    pub mod emit;

    /// Batch driver over all defect snapshots (rayon + indicatif)
    pub mod batch;
    pub use batch::run as batch_run;

    /// Single-line resolution for `fln resolve`
    pub mod probe;
    pub use probe::run as resolve_run;
}

/// Language processing - Tree-sitter scope extraction
pub mod parsers {
    /// Python function/class scopes with rendered parameter lists
    pub mod python_parser;
    pub use python_parser::PythonScopeParser;

    // Re-export the common parser interface
    pub use crate::core::source::ScopeParser;
}

/// Infrastructure - configuration and file I/O
pub mod infra {
    /// Layered configuration (file, environment) with TOML init
    pub mod config;
    pub use self::config::{Config, init as config_init, load_config};

    /// Memory-mapped file I/O for large files (>1MB threshold)
    pub mod io;
    pub use self::io::{FileContent, read_file_smart};
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use crate::core::{batch_run, resolve_run};
pub use infra::{Config, load_config};
pub use parsers::{PythonScopeParser, ScopeParser};

// Core types for external consumers
pub use crate::core::{MethodIdentity, MethodRecord, Signature};
