//! Observation aggregation: line-level observations in, method records out.
//!
//! Coverage observations are deduplicated by method identity (first one wins,
//! later ones are no-ops). Suspiciousness observations are keyed by
//! signature and folded with a [`MergePolicy`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::error::CorpusResult;
use crate::core::fixloc::FixLocationOracle;
use crate::core::identity::{MethodIdentity, Signature};
use crate::core::normalize::PathNormalizer;
use crate::core::source::SourceCache;
use crate::infra::config::Config;

/// Metric keys containing this marker are combinable by default
pub const DEFAULT_COMBINABLE_MARKER: &str = "pseudo";

/// Metric name -> score, in artifact order
pub type SuspVector = IndexMap<String, f64>;

/// What a single observation carries
#[derive(Debug, Clone, PartialEq)]
pub enum Payload
{
    /// Line was executed; presence only
    Covered,
    /// Line was scored by a fault-localization tool
    Suspiciousness(SuspVector),
}

/// One raw `(file, line, payload)` observation, path as recorded
#[derive(Debug, Clone, PartialEq)]
pub struct Observation
{
    pub path: String,
    pub line: usize,
    pub payload: Payload,
}

/// Decides which metrics fold across observations of one signature and how.
pub trait MergePolicy: Send + Sync
{
    fn is_combinable(
        &self,
        metric: &str,
    ) -> bool;

    fn combine(
        &self,
        stored: f64,
        incoming: f64,
    ) -> f64
    {
        stored.max(incoming)
    }
}

/// Keys containing `marker` are combinable and combine by max.
#[derive(Debug, Clone)]
pub struct MarkerPolicy
{
    marker: String,
}

impl MarkerPolicy
{
    pub fn new(marker: impl Into<String>) -> Self
    {
        Self { marker: marker.into() }
    }
}

impl Default for MarkerPolicy
{
    fn default() -> Self
    {
        Self::new(DEFAULT_COMBINABLE_MARKER)
    }
}

impl MergePolicy for MarkerPolicy
{
    fn is_combinable(
        &self,
        metric: &str,
    ) -> bool
    {
        !self
            .marker
            .is_empty()
            && metric.contains(&self.marker)
    }
}

/// Fold `incoming` into `stored`. Only keys already stored are touched;
/// non-combinable keys keep their first-seen value.
pub fn merge_vectors(
    stored: &mut SuspVector,
    incoming: &SuspVector,
    policy: &dyn MergePolicy,
)
{
    for (metric, value) in stored.iter_mut()
    {
        if !policy.is_combinable(metric)
        {
            continue;
        }
        if let Some(&new) = incoming.get(metric)
        {
            *value = policy.combine(*value, new);
        }
    }
}

/// One catalogued method, in its persisted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRecord
{
    /// Identity string `<pseudo class path>.<func>#<def line>`
    #[serde(rename = "name")]
    pub identity: String,

    pub src_path: String,

    /// Pseudo class path: dotted file path plus the innermost class, if any
    pub class_name: String,

    pub signature: Signature,

    #[serde(rename = "snippet")]
    pub snippet_text: String,

    pub begin_line: usize,
    pub end_line: usize,

    #[serde(default)]
    pub comment: String,

    pub is_bug: bool,

    #[serde(rename = "susp", default, skip_serializing_if = "Option::is_none")]
    pub suspiciousness: Option<SuspVector>,
}

/// Which collection a method belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRole
{
    Production,
    Test,
}

/// Path-substring test-code classifier
#[derive(Debug, Clone)]
pub struct RoleClassifier
{
    markers: Vec<String>,
}

impl RoleClassifier
{
    pub fn new(markers: Vec<String>) -> Self
    {
        Self { markers }
    }

    pub fn classify(
        &self,
        path: &str,
    ) -> CodeRole
    {
        if self
            .markers
            .iter()
            .any(|m| path.contains(m.as_str()))
        {
            CodeRole::Test
        }
        else
        {
            CodeRole::Production
        }
    }
}

impl Default for RoleClassifier
{
    fn default() -> Self
    {
        Self::new(vec!["test/".to_string(), "tests/".to_string()])
    }
}

/// Coverage-pass catalogue keyed by identity, in creation order.
#[derive(Debug, Default)]
pub struct MethodCatalog
{
    records: IndexMap<String, (CodeRole, MethodRecord)>,
}

impl MethodCatalog
{
    pub fn contains(
        &self,
        identity: &str,
    ) -> bool
    {
        self.records
            .contains_key(identity)
    }

    /// Insert unless the identity is already present; returns whether it was new
    pub fn insert(
        &mut self,
        role: CodeRole,
        record: MethodRecord,
    ) -> bool
    {
        if self.contains(&record.identity)
        {
            return false;
        }
        self.records
            .insert(record.identity.clone(), (role, record));
        true
    }

    pub fn len(&self) -> usize
    {
        self.records
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.records
            .is_empty()
    }

    pub fn production(&self) -> impl Iterator<Item = &MethodRecord>
    {
        self.by_role(CodeRole::Production)
    }

    pub fn tests(&self) -> impl Iterator<Item = &MethodRecord>
    {
        self.by_role(CodeRole::Test)
    }

    fn by_role(
        &self,
        role: CodeRole,
    ) -> impl Iterator<Item = &MethodRecord>
    {
        self.records
            .values()
            .filter(move |(r, _)| *r == role)
            .map(|(_, rec)| rec)
    }

    /// Split into (production, test) collections
    pub fn into_collections(self) -> (Vec<MethodRecord>, Vec<MethodRecord>)
    {
        let mut production = Vec::new();
        let mut tests = Vec::new();
        for (_, (role, record)) in self.records
        {
            match role
            {
                CodeRole::Production => production.push(record),
                CodeRole::Test => tests.push(record),
            }
        }
        (production, tests)
    }
}

/// How a suspiciousness vector landed in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folded
{
    Inserted,
    Merged,
}

/// Suspiciousness-pass table keyed by signature.
#[derive(Debug, Default)]
pub struct SuspicionTable
{
    by_signature: IndexMap<Signature, SuspVector>,
}

impl SuspicionTable
{
    pub fn fold(
        &mut self,
        signature: Signature,
        incoming: SuspVector,
        policy: &dyn MergePolicy,
    ) -> Folded
    {
        match self
            .by_signature
            .get_mut(&signature)
        {
            Some(stored) =>
            {
                merge_vectors(stored, &incoming, policy);
                Folded::Merged
            }
            None =>
            {
                self.by_signature
                    .insert(signature, incoming);
                Folded::Inserted
            }
        }
    }

    pub fn get(
        &self,
        signature: &Signature,
    ) -> Option<&SuspVector>
    {
        self.by_signature
            .get(signature)
    }

    pub fn len(&self) -> usize
    {
        self.by_signature
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.by_signature
            .is_empty()
    }
}

/// Batch-wide aggregation settings, shared read-only across defects.
pub struct AggregateSettings
{
    pub normalizer: PathNormalizer,
    pub policy: Box<dyn MergePolicy>,
    pub roles: RoleClassifier,
}

impl AggregateSettings
{
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self>
    {
        Ok(Self {
            normalizer: PathNormalizer::from_config(&cfg.rewrite)?,
            policy: Box::new(MarkerPolicy::new(
                cfg.aggregate
                    .combinable_marker
                    .clone(),
            )),
            roles: RoleClassifier::new(
                cfg.aggregate
                    .test_markers
                    .clone(),
            ),
        })
    }
}

impl Default for AggregateSettings
{
    fn default() -> Self
    {
        Self {
            normalizer: PathNormalizer::builtin(),
            policy: Box::new(MarkerPolicy::default()),
            roles: RoleClassifier::default(),
        }
    }
}

/// Everything one defect's aggregation reads and writes. Owned by the
/// assembler, dropped when the defect is done.
pub struct DefectContext<'p>
{
    pub project: String,
    pub sources: SourceCache<'p>,
    pub oracle: Box<dyn FixLocationOracle>,
    pub catalog: MethodCatalog,
    pub suspicion: SuspicionTable,
}

impl<'p> DefectContext<'p>
{
    pub fn new(
        project: impl Into<String>,
        sources: SourceCache<'p>,
        oracle: Box<dyn FixLocationOracle>,
    ) -> Self
    {
        Self {
            project: project.into(),
            sources,
            oracle,
            catalog: MethodCatalog::default(),
            suspicion: SuspicionTable::default(),
        }
    }
}

/// Result of folding one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome
{
    /// Line lies outside every function
    Unresolved,
    /// New catalogue record
    Created,
    /// Identity already catalogued
    Duplicate,
    /// New signature in the suspicion table
    Inserted,
    /// Existing signature folded
    Merged,
}

/// Per-file counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTally
{
    pub observed: usize,
    pub unresolved: usize,
    pub created: usize,
    pub duplicates: usize,
    pub inserted: usize,
    pub merged: usize,
}

impl FileTally
{
    fn record(
        &mut self,
        outcome: Outcome,
    )
    {
        self.observed += 1;
        match outcome
        {
            Outcome::Unresolved => self.unresolved += 1,
            Outcome::Created => self.created += 1,
            Outcome::Duplicate => self.duplicates += 1,
            Outcome::Inserted => self.inserted += 1,
            Outcome::Merged => self.merged += 1,
        }
    }
}

/// Folds observations into a [`DefectContext`].
pub struct Aggregator<'a, 'p>
{
    settings: &'a AggregateSettings,
    ctx: &'a mut DefectContext<'p>,
}

impl<'a, 'p> Aggregator<'a, 'p>
{
    pub fn new(
        settings: &'a AggregateSettings,
        ctx: &'a mut DefectContext<'p>,
    ) -> Self
    {
        Self { settings, ctx }
    }

    /// Canonical repository-relative path for a recorded one
    pub fn normalize(
        &self,
        raw_path: &str,
    ) -> String
    {
        self.settings
            .normalizer
            .normalize(&self.ctx.project, raw_path)
    }

    /// Fold a single observation.
    ///
    /// Missing or unparseable files are returned as errors; the caller
    /// decides whether to skip the file.
    pub fn observe(
        &mut self,
        observation: &Observation,
    ) -> CorpusResult<Outcome>
    {
        let path = self.normalize(&observation.path);
        match &observation.payload
        {
            Payload::Covered => self.cover_line(&path, observation.line),
            Payload::Suspiciousness(vector) =>
            {
                self.score_line(&path, observation.line, vector.clone())
            }
        }
    }

    /// Coverage observations for the given lines of one file
    pub fn observe_coverage<I>(
        &mut self,
        raw_path: &str,
        lines: I,
    ) -> CorpusResult<FileTally>
    where
        I: IntoIterator<Item = usize>,
    {
        let path = self.normalize(raw_path);
        self.ctx
            .sources
            .load(&path)?;

        let mut tally = FileTally::default();
        for line in lines
        {
            tally.record(self.cover_line(&path, line)?);
        }
        Ok(tally)
    }

    /// Coverage observations for every line of one file
    pub fn observe_whole_file(
        &mut self,
        raw_path: &str,
    ) -> CorpusResult<FileTally>
    {
        let path = self.normalize(raw_path);
        let line_count = self
            .ctx
            .sources
            .load(&path)?
            .line_count();
        self.observe_coverage(&path, 1..=line_count)
    }

    /// Suspiciousness observations for one file
    pub fn observe_suspiciousness<I>(
        &mut self,
        raw_path: &str,
        lines: I,
    ) -> CorpusResult<FileTally>
    where
        I: IntoIterator<Item = (usize, SuspVector)>,
    {
        let path = self.normalize(raw_path);
        self.ctx
            .sources
            .load(&path)?;

        let mut tally = FileTally::default();
        for (line, vector) in lines
        {
            tally.record(self.score_line(&path, line, vector)?);
        }
        Ok(tally)
    }

    fn cover_line(
        &mut self,
        path: &str,
        line: usize,
    ) -> CorpusResult<Outcome>
    {
        let ctx = &mut *self.ctx;
        let source = ctx
            .sources
            .load(path)?;

        let Some(resolution) = source
            .scopes
            .resolve(line)
        else
        {
            return Ok(Outcome::Unresolved);
        };

        let identity = MethodIdentity::from_resolution(path, &resolution);
        let key = identity.to_string();
        if ctx
            .catalog
            .contains(&key)
        {
            return Ok(Outcome::Duplicate);
        }

        let function = resolution.function;
        let (begin, end) = (function.start_line, function.end_line);
        let record = MethodRecord {
            identity: key,
            src_path: path.to_string(),
            class_name: identity
                .pseudo_class_path
                .clone(),
            signature: identity.signature(&function.params),
            snippet_text: source.snippet(begin, end),
            begin_line: begin,
            end_line: end,
            comment: String::new(),
            is_bug: ctx
                .oracle
                .intersects(path, begin, end),
            suspiciousness: None,
        };

        let role = self
            .settings
            .roles
            .classify(path);
        ctx.catalog
            .insert(role, record);
        Ok(Outcome::Created)
    }

    fn score_line(
        &mut self,
        path: &str,
        line: usize,
        vector: SuspVector,
    ) -> CorpusResult<Outcome>
    {
        let ctx = &mut *self.ctx;
        let source = ctx
            .sources
            .load(path)?;

        let Some(resolution) = source
            .scopes
            .resolve(line)
        else
        {
            return Ok(Outcome::Unresolved);
        };

        let identity = MethodIdentity::from_resolution(path, &resolution);
        let signature = identity.signature(&resolution.function.params);

        let folded = ctx.suspicion.fold(
            signature,
            vector,
            self.settings
                .policy
                .as_ref(),
        );
        Ok(match folded
        {
            Folded::Inserted => Outcome::Inserted,
            Folded::Merged => Outcome::Merged,
        })
    }
}
