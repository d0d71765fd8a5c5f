use std::path::Path;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::aggregate::DEFAULT_COMBINABLE_MARKER;
use crate::core::fixloc::DEFAULT_HUNK_OFFSET;

/// Config files probed in the working directory, first match wins
const CONFIG_CANDIDATES: [&str; 4] =
    ["faultline.toml", "faultline.yaml", "faultline.json", ".faultline.toml"];

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Where inputs live and where outputs go
    pub layout: LayoutConfig,

    /// Fix-location oracle settings
    pub fix: FixConfig,

    /// Observation aggregation settings
    pub aggregate: AggregateConfig,

    /// Extra path rewrite rules, appended to the built-in families
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rewrite: Vec<RewriteConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig
{
    /// Benchmark checkout holding `projects/<project>/bugs/<id>/`
    pub bench_dir: Utf8PathBuf,

    /// One checked-out snapshot directory per defect
    pub snapshot_dir: Utf8PathBuf,

    /// `<defect>_coverage.json` files
    pub coverage_dir: Utf8PathBuf,

    /// `<defect>_scores.json` files
    pub suspiciousness_dir: Utf8PathBuf,

    /// Corpus output root, one directory per defect
    pub output_dir: Utf8PathBuf,

    /// Test-run log file name inside each snapshot
    pub test_log_name: String,

    /// Fix patch file name inside each bug directory
    pub patch_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FixConfig
{
    /// Offset from a hunk's old start line to its marker line
    pub hunk_offset: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig
{
    /// Metric keys containing this marker combine by max on re-observation
    pub combinable_marker: String,

    /// Path substrings that classify a file as test code
    pub test_markers: Vec<String>,
}

/// One user-supplied `[[rewrite]]` rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteConfig
{
    /// Project family key, matched as a prefix of the project name
    pub family: String,

    /// Regex applied to recorded paths
    pub pattern: String,

    /// Replacement text (`$1` style groups allowed)
    #[serde(default)]
    pub replacement: String,
}

impl Default for LayoutConfig
{
    fn default() -> Self
    {
        Self {
            bench_dir: Utf8PathBuf::from("."),
            snapshot_dir: Utf8PathBuf::from("backup/projects"),
            coverage_dir: Utf8PathBuf::from("authoritative_coverage"),
            suspiciousness_dir: Utf8PathBuf::from("authoritative_suspiciousness"),
            output_dir: Utf8PathBuf::from("xfl_auth_data"),
            test_log_name: "coverage_bugsinpy.txt".to_string(),
            patch_name: "bug_patch.txt".to_string(),
        }
    }
}

impl Default for FixConfig
{
    fn default() -> Self
    {
        Self { hunk_offset: DEFAULT_HUNK_OFFSET }
    }
}

impl Default for AggregateConfig
{
    fn default() -> Self
    {
        Self {
            combinable_marker: DEFAULT_COMBINABLE_MARKER.to_string(),
            test_markers: vec!["test/".to_string(), "tests/".to_string()],
        }
    }
}

impl LayoutConfig
{
    /// Expand `~` and `$VAR` in every directory setting
    fn expand(&mut self) -> Result<()>
    {
        for dir in [
            &mut self.bench_dir,
            &mut self.snapshot_dir,
            &mut self.coverage_dir,
            &mut self.suspiciousness_dir,
            &mut self.output_dir,
        ]
        {
            let expanded = shellexpand::full(dir.as_str())
                .with_context(|| format!("Failed to expand path {dir}"))?
                .into_owned();
            *dir = Utf8PathBuf::from(expanded);
        }
        Ok(())
    }
}

/// Load configuration: explicit file (or first discovered one), then
/// `FAULTLINE__SECTION__KEY` environment overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<Config>
{
    let mut builder = config::Config::builder();

    match explicit
    {
        Some(path) =>
        {
            if !path.exists()
            {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            builder = builder.add_source(config::File::from(path));
        }
        None =>
        {
            if let Some(path) = CONFIG_CANDIDATES
                .iter()
                .find(|p| Path::new(p).exists())
            {
                tracing::debug!(config = %path, "using discovered config file");
                builder = builder.add_source(config::File::with_name(path));
            }
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("FAULTLINE")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let mut parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    parsed
        .layout
        .expand()?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join("faultline.toml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        println!("Would create config file at {}", config_path.display());
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn defaults_match_the_benchmark_layout()
    {
        let cfg = Config::default();
        assert_eq!(cfg.layout.snapshot_dir, "backup/projects");
        assert_eq!(cfg.layout.test_log_name, "coverage_bugsinpy.txt");
        assert_eq!(cfg.fix.hunk_offset, 3);
        assert_eq!(cfg.aggregate.combinable_marker, "pseudo");
        assert_eq!(cfg.aggregate.test_markers, vec!["test/", "tests/"]);
    }

    #[test]
    fn explicit_file_overrides_sections_and_keeps_defaults()
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir
            .path()
            .join("custom.toml");
        std::fs::write(
            &path,
            r#"
[layout]
output_dir = "out"

[fix]
hunk_offset = 1

[[rewrite]]
family = "pandas"
pattern = "^build/"
"#,
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.layout.output_dir, "out");
        assert_eq!(cfg.layout.coverage_dir, "authoritative_coverage");
        assert_eq!(cfg.fix.hunk_offset, 1);
        assert_eq!(cfg.rewrite.len(), 1);
        assert_eq!(cfg.rewrite[0].replacement, "");
    }

    #[test]
    fn missing_explicit_file_is_an_error()
    {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn default_config_serializes_to_loadable_toml()
    {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.layout.output_dir, "xfl_auth_data");
        assert!(back.rewrite.is_empty());
    }
}
