//! Corpus assembly for one defect.
//!
//! Pipeline per defect: fix locations from the patch, then the coverage
//! pass (method catalogue), then the suspiciousness pass joined back onto the
//! catalogue by signature. Each pass can run on its own (`catalog`,
//! `attach`) or both in one process sharing the parsed sources (`run`).

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::core::aggregate::{AggregateSettings, Aggregator, DefectContext, FileTally, MethodRecord};
use crate::core::artifacts::{load_coverage, load_suspiciousness};
use crate::core::emit::CorpusWriter;
use crate::core::error::{CorpusError, CorpusResult, Granularity};
use crate::core::fixloc::FixLocationSet;
use crate::core::source::{ScopeParser, SourceCache};
use crate::core::testlog::TestRunLog;
use crate::infra::config::LayoutConfig;
use crate::infra::io::read_artifact;

/// `<project>_<bug id>`, split at the last underscore
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefectId
{
    pub project: String,
    pub bug_id: String,
}

impl DefectId
{
    pub fn parse(name: &str) -> Option<Self>
    {
        let (project, bug_id) = name.rsplit_once('_')?;
        if project.is_empty() || bug_id.is_empty()
        {
            return None;
        }
        Some(Self { project: project.to_string(), bug_id: bug_id.to_string() })
    }

    pub fn name(&self) -> String
    {
        self.to_string()
    }
}

impl fmt::Display for DefectId
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        write!(f, "{}_{}", self.project, self.bug_id)
    }
}

/// Resolved on-disk locations of every per-defect artifact.
#[derive(Debug, Clone)]
pub struct DefectLayout
{
    bench_dir: PathBuf,
    snapshot_dir: PathBuf,
    coverage_dir: PathBuf,
    suspiciousness_dir: PathBuf,
    output_dir: PathBuf,
    test_log_name: String,
    patch_name: String,
}

impl DefectLayout
{
    pub fn from_config(cfg: &LayoutConfig) -> Self
    {
        Self {
            bench_dir: cfg
                .bench_dir
                .clone()
                .into_std_path_buf(),
            snapshot_dir: cfg
                .snapshot_dir
                .clone()
                .into_std_path_buf(),
            coverage_dir: cfg
                .coverage_dir
                .clone()
                .into_std_path_buf(),
            suspiciousness_dir: cfg
                .suspiciousness_dir
                .clone()
                .into_std_path_buf(),
            output_dir: cfg
                .output_dir
                .clone()
                .into_std_path_buf(),
            test_log_name: cfg
                .test_log_name
                .clone(),
            patch_name: cfg
                .patch_name
                .clone(),
        }
    }

    pub fn snapshot_root(&self) -> &Path
    {
        &self.snapshot_dir
    }

    pub fn patch(
        &self,
        defect: &DefectId,
    ) -> PathBuf
    {
        self.bench_dir
            .join("projects")
            .join(&defect.project)
            .join("bugs")
            .join(&defect.bug_id)
            .join(&self.patch_name)
    }

    pub fn snapshot(
        &self,
        defect: &DefectId,
    ) -> PathBuf
    {
        self.snapshot_dir
            .join(defect.name())
    }

    pub fn test_log(
        &self,
        defect: &DefectId,
    ) -> PathBuf
    {
        self.snapshot(defect)
            .join(&self.test_log_name)
    }

    pub fn coverage(
        &self,
        defect: &DefectId,
    ) -> PathBuf
    {
        self.coverage_dir
            .join(format!("{defect}_coverage.json"))
    }

    pub fn suspiciousness(
        &self,
        defect: &DefectId,
    ) -> PathBuf
    {
        self.suspiciousness_dir
            .join(format!("{defect}_scores.json"))
    }

    pub fn output(
        &self,
        defect: &DefectId,
    ) -> PathBuf
    {
        self.output_dir
            .join(defect.name())
    }
}

/// Which passes to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode
{
    /// Coverage pass only
    Catalog,
    /// Suspiciousness pass onto an existing catalogue
    Attach,
    /// Both passes
    Run,
}

impl Mode
{
    fn catalogs(self) -> bool
    {
        matches!(self, Mode::Catalog | Mode::Run)
    }

    fn attaches(self) -> bool
    {
        matches!(self, Mode::Attach | Mode::Run)
    }
}

/// What one processed defect produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefectReport
{
    pub defect: String,
    pub production: usize,
    pub tests: usize,
    pub attached: usize,
    pub skipped_files: usize,
    pub warnings: Vec<String>,
}

/// Runs the passes of one defect. Holds only batch-wide read-only state.
pub struct CorpusAssembler<'a>
{
    layout: &'a DefectLayout,
    parser: &'a dyn ScopeParser,
    settings: &'a AggregateSettings,
    hunk_offset: i64,
    dry_run: bool,
}

impl<'a> CorpusAssembler<'a>
{
    pub fn new(
        layout: &'a DefectLayout,
        parser: &'a dyn ScopeParser,
        settings: &'a AggregateSettings,
        hunk_offset: i64,
    ) -> Self
    {
        Self { layout, parser, settings, hunk_offset, dry_run: false }
    }

    /// Compute everything but write nothing
    pub fn dry_run(
        mut self,
        dry_run: bool,
    ) -> Self
    {
        self.dry_run = dry_run;
        self
    }

    #[instrument(level = "info", skip_all, fields(defect = %defect))]
    pub fn process(
        &self,
        defect: &DefectId,
        mode: Mode,
    ) -> CorpusResult<DefectReport>
    {
        let fix = self.fix_locations(defect)?;
        debug!(
            families = ?self
                .settings
                .normalizer
                .family_keys_for(&defect.project)
                .collect::<Vec<_>>(),
            "path rewrite families"
        );
        let sources = SourceCache::new(self.layout.snapshot(defect), self.parser);
        let mut ctx = DefectContext::new(defect.project.clone(), sources, Box::new(fix));
        let writer = CorpusWriter::new(self.layout.output(defect));

        let mut report = DefectReport { defect: defect.name(), ..DefectReport::default() };

        let catalogued = if mode.catalogs()
        {
            Some(self.catalog_pass(defect, &mut ctx, &writer, &mut report)?)
        }
        else
        {
            None
        };

        if mode.attaches()
        {
            let records = match catalogued
            {
                Some(records) => records,
                None => writer.read_snippets()?,
            };
            self.attach_pass(defect, &mut ctx, &writer, records, &mut report)?;
        }

        info!(
            production = report.production,
            tests = report.tests,
            attached = report.attached,
            parsed_files = ctx.sources.len(),
            "defect done"
        );
        Ok(report)
    }

    fn fix_locations(
        &self,
        defect: &DefectId,
    ) -> CorpusResult<FixLocationSet>
    {
        let patch = read_artifact(&self.layout.patch(defect), "fix patch")?;
        let set = FixLocationSet::from_diff(&patch, self.hunk_offset);
        debug!(files = set.files().count(), "fix locations");
        Ok(set)
    }

    /// Coverage pass; returns the production records
    fn catalog_pass(
        &self,
        defect: &DefectId,
        ctx: &mut DefectContext<'_>,
        writer: &CorpusWriter,
        report: &mut DefectReport,
    ) -> CorpusResult<Vec<MethodRecord>>
    {
        let log = TestRunLog::parse(&read_artifact(&self.layout.test_log(defect), "test-run log")?);
        let test_files = log.discover_test_files(
            ctx.sources
                .root(),
        );
        if test_files.is_empty()
        {
            warn!("no test file detected in the test-run log");
            report
                .warnings
                .push("no test file detected in the test-run log".to_string());
        }

        let coverage = load_coverage(&self.layout.coverage(defect))?;

        // Recorded files plus discovered test files, in path order
        let mut files: BTreeSet<&str> = coverage
            .files
            .keys()
            .map(String::as_str)
            .collect();
        files.extend(
            test_files
                .iter()
                .map(String::as_str),
        );

        let mut agg = Aggregator::new(self.settings, ctx);
        for file in files
        {
            let result = match coverage
                .files
                .get(file)
            {
                Some(entry) if !entry.is_instrumentable() =>
                {
                    debug!(file, "no statements, skipping");
                    continue;
                }
                Some(entry) => agg.observe_coverage(file, entry.sorted_lines()),
                None => agg.observe_whole_file(file),
            };
            absorb_file(result, file, report)?;
        }

        if ctx
            .catalog
            .is_empty()
        {
            return Err(CorpusError::EmptyCoverage { defect: defect.name() });
        }

        let (production, tests) = std::mem::take(&mut ctx.catalog).into_collections();
        report.production = production.len();
        report.tests = tests.len();

        if self.dry_run
        {
            info!(dir = %writer.dir().display(), "dry run, catalogue not written");
        }
        else
        {
            writer.write_catalog(&production, &tests, &log.failing_tests)?;
        }

        Ok(production)
    }

    /// Suspiciousness pass joined onto `records` by signature
    fn attach_pass(
        &self,
        defect: &DefectId,
        ctx: &mut DefectContext<'_>,
        writer: &CorpusWriter,
        records: Vec<MethodRecord>,
        report: &mut DefectReport,
    ) -> CorpusResult<()>
    {
        let scores = load_suspiciousness(&self.layout.suspiciousness(defect))?;

        let mut files: Vec<&String> = scores
            .files
            .keys()
            .collect();
        files.sort();

        let mut agg = Aggregator::new(self.settings, ctx);
        for file in files
        {
            let result = agg.observe_suspiciousness(file, scores.lines_of(file));
            absorb_file(result, file, report)?;
        }

        if ctx
            .suspicion
            .is_empty()
        {
            return Err(CorpusError::EmptyCoverage { defect: defect.name() });
        }

        let mut unresolved = Vec::new();
        let mut attached = Vec::with_capacity(records.len());
        for mut record in records
        {
            match ctx
                .suspicion
                .get(&record.signature)
            {
                Some(vector) => record.suspiciousness = Some(vector.clone()),
                None => unresolved.push(
                    record
                        .signature
                        .to_string(),
                ),
            }
            attached.push(record);
        }

        if !unresolved.is_empty()
        {
            return Err(CorpusError::UnresolvedSignature { defect: defect.name(), signatures: unresolved });
        }

        report.attached = attached.len();
        if self.dry_run
        {
            info!(dir = %writer.dir().display(), "dry run, suspiciousness not written");
            return Ok(());
        }
        writer.write_snippets(&attached)
    }
}

/// File-level failures are logged and counted; anything else ends the defect
fn absorb_file(
    result: CorpusResult<FileTally>,
    file: &str,
    report: &mut DefectReport,
) -> CorpusResult<()>
{
    match result
    {
        Ok(tally) =>
        {
            debug!(
                file,
                observed = tally.observed,
                unresolved = tally.unresolved,
                created = tally.created,
                merged = tally.merged,
                "file folded"
            );
            Ok(())
        }
        Err(err) if err.granularity() == Granularity::File =>
        {
            warn!(file, kind = err.kind(), "skipping file: {err}");
            report.skipped_files += 1;
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn defect_names_split_at_last_underscore()
    {
        let d = DefectId::parse("youtube-dl_12").unwrap();
        assert_eq!((d.project.as_str(), d.bug_id.as_str()), ("youtube-dl", "12"));

        let d = DefectId::parse("scikit_learn_3").unwrap();
        assert_eq!((d.project.as_str(), d.bug_id.as_str()), ("scikit_learn", "3"));
        assert_eq!(d.to_string(), "scikit_learn_3");

        assert!(DefectId::parse("nounderscore").is_none());
        assert!(DefectId::parse("trailing_").is_none());
    }

    #[test]
    fn layout_paths_follow_the_benchmark_tree()
    {
        let layout = DefectLayout::from_config(&LayoutConfig::default());
        let d = DefectId::parse("ansible_4").unwrap();
        assert_eq!(layout.patch(&d), Path::new("./projects/ansible/bugs/4/bug_patch.txt"));
        assert_eq!(layout.test_log(&d), Path::new("backup/projects/ansible_4/coverage_bugsinpy.txt"));
        assert_eq!(layout.coverage(&d), Path::new("authoritative_coverage/ansible_4_coverage.json"));
        assert_eq!(
            layout.suspiciousness(&d),
            Path::new("authoritative_suspiciousness/ansible_4_scores.json")
        );
        assert_eq!(layout.output(&d), Path::new("xfl_auth_data/ansible_4"));
    }

    #[test]
    fn modes_select_passes()
    {
        assert!(Mode::Catalog.catalogs() && !Mode::Catalog.attaches());
        assert!(!Mode::Attach.catalogs() && Mode::Attach.attaches());
        assert!(Mode::Run.catalogs() && Mode::Run.attaches());
    }
}
