//! Batch driver: every defect snapshot under the snapshot root, in name order.

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use rayon::prelude::*;
use tracing::warn;

use crate::cli::{AppContext, BatchArgs};
use crate::core::aggregate::AggregateSettings;
use crate::core::corpus::{CorpusAssembler, DefectId, DefectLayout, DefectReport, Mode};
use crate::core::error::CorpusResult;
use crate::infra::config::load_config;
use crate::parsers::python_parser::PythonScopeParser;

/// Result of one defect
#[derive(Debug)]
pub struct DefectOutcome
{
    pub defect: String,
    pub result: CorpusResult<DefectReport>,
}

/// Snapshot sub-directories that look like `<project>_<id>`, sorted by name.
/// A non-empty `only` keeps just the named defects.
pub fn discover_defects(
    snapshot_root: &Path,
    only: &[String],
) -> Result<Vec<DefectId>>
{
    let entries = std::fs::read_dir(snapshot_root)
        .with_context(|| format!("Failed to list snapshots in {}", snapshot_root.display()))?;

    let mut names: Vec<String> = Vec::new();
    for entry in entries
    {
        let entry = entry.with_context(|| format!("Failed to read {}", snapshot_root.display()))?;
        if !entry
            .file_type()
            .is_ok_and(|t| t.is_dir())
        {
            continue;
        }
        if let Some(name) = entry
            .file_name()
            .to_str()
        {
            names.push(name.to_string());
        }
    }
    names.sort();

    for wanted in only
    {
        if !names.contains(wanted)
        {
            warn!(defect = %wanted, "requested defect has no snapshot");
        }
    }

    Ok(names
        .into_iter()
        .filter(|n| only.is_empty() || only.contains(n))
        .filter_map(|n| {
            let parsed = DefectId::parse(&n);
            if parsed.is_none()
            {
                warn!(dir = %n, "not a <project>_<id> snapshot, ignoring");
            }
            parsed
        })
        .collect())
}

/// Process `defects` on up to `jobs` threads; outcomes come back in input order
pub fn run_defects(
    assembler: &CorpusAssembler<'_>,
    defects: &[DefectId],
    mode: Mode,
    jobs: usize,
    pb: &ProgressBar,
) -> Vec<DefectOutcome>
{
    if defects.is_empty()
    {
        return vec![];
    }

    let work = |defect: &DefectId| {
        pb.set_message(defect.name());
        let result = assembler.process(defect, mode);
        if let Err(err) = &result
        {
            warn!(defect = %defect, kind = err.kind(), "skipping defect: {err}");
        }
        pb.inc(1);
        DefectOutcome { defect: defect.name(), result }
    };

    if jobs <= 1
    {
        return defects
            .iter()
            .map(work)
            .collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build();

    match pool
    {
        Ok(pool) => pool.install(|| {
            defects
                .par_iter()
                .map(work)
                .collect()
        }),
        Err(err) =>
        {
            warn!("thread pool unavailable ({err}), running sequentially");
            defects
                .iter()
                .map(work)
                .collect()
        }
    }
}

/// CLI entry for `catalog`, `attach` and `run`
pub fn run(
    args: BatchArgs,
    mode: Mode,
    config_path: Option<&Path>,
    ctx: &AppContext,
) -> Result<()>
{
    let cfg = load_config(config_path)?;
    let layout = DefectLayout::from_config(&cfg.layout);
    let settings = AggregateSettings::from_config(&cfg).context("Invalid [[rewrite]] configuration")?;
    let parser = PythonScopeParser::new()?;

    let assembler =
        CorpusAssembler::new(&layout, &parser, &settings, cfg.fix.hunk_offset).dry_run(ctx.dry_run);

    let defects = discover_defects(layout.snapshot_root(), &args.defects)?;

    // Configure progress UI (hidden in --quiet mode)
    let pb = if ctx.quiet
    {
        ProgressBar::hidden()
    }
    else
    {
        let pb = ProgressBar::new(defects.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    };

    let outcomes = run_defects(&assembler, &defects, mode, args.jobs, &pb);
    pb.finish_and_clear();

    if !ctx.quiet
    {
        print_summary(&outcomes, ctx);
    }

    // Per-defect skips never fail the batch
    Ok(())
}

fn print_summary(
    outcomes: &[DefectOutcome],
    ctx: &AppContext,
)
{
    let mut emitted = 0usize;
    for outcome in outcomes
    {
        match &outcome.result
        {
            Ok(report) =>
            {
                emitted += 1;
                let tag = if ctx.no_color { "ok".to_string() } else { "ok".green().to_string() };
                println!(
                    "{tag:>7} {}: {} production, {} test, {} with susp{}",
                    outcome.defect,
                    report.production,
                    report.tests,
                    report.attached,
                    if report.skipped_files > 0
                    {
                        format!(" ({} file(s) skipped)", report.skipped_files)
                    }
                    else
                    {
                        String::new()
                    }
                );
            }
            Err(err) =>
            {
                let tag =
                    if ctx.no_color { "skipped".to_string() } else { "skipped".yellow().to_string() };
                println!("{tag:>7} {}: [{}] {err}", outcome.defect, err.kind());
            }
        }
    }

    let total = outcomes.len();
    let line = format!("{emitted}/{total} defect(s) emitted, {} skipped", total - emitted);
    if ctx.no_color
    {
        println!("{line}");
    }
    else
    {
        println!("{}", line.bold());
    }
}
