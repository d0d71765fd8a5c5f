//! Path normalization for instrumentation-recorded paths.
//!
//! Coverage and fault-localization tools record paths as seen by the
//! instrumented interpreter (installed packages, build trees, nested
//! checkouts). Each project family owns a set of rewrite rules that map such
//! paths back to repository-relative ones. Rules are pure and total; a path
//! no rule matches passes through unchanged.

use std::borrow::Cow;

use anyhow::{Context, Result};
use regex::Regex;

use crate::infra::config::RewriteConfig;

/// A single pure `path -> path` rewrite.
pub trait RewriteRule: Send + Sync
{
    /// Rewrite `path`; return it unchanged when the rule does not apply
    fn apply<'a>(
        &self,
        path: &'a str,
    ) -> Cow<'a, str>;
}

/// Replace every occurrence of a literal substring.
pub struct LiteralRule
{
    from: String,
    to: String,
}

impl LiteralRule
{
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self
    {
        Self { from: from.into(), to: to.into() }
    }
}

impl RewriteRule for LiteralRule
{
    fn apply<'a>(
        &self,
        path: &'a str,
    ) -> Cow<'a, str>
    {
        if self.from.is_empty() || !path.contains(&self.from)
        {
            return Cow::Borrowed(path);
        }
        Cow::Owned(path.replace(&self.from, &self.to))
    }
}

/// Replace every regex match.
pub struct RegexRule
{
    pattern: Regex,
    replacement: String,
}

impl RegexRule
{
    pub fn new(
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self>
    {
        let pattern =
            Regex::new(pattern).with_context(|| format!("invalid rewrite pattern `{pattern}`"))?;
        Ok(Self { pattern, replacement: replacement.into() })
    }
}

impl RewriteRule for RegexRule
{
    fn apply<'a>(
        &self,
        path: &'a str,
    ) -> Cow<'a, str>
    {
        self.pattern
            .replace_all(path, self.replacement.as_str())
    }
}

/// Rules registered for one project family
struct Family
{
    key: String,
    rules: Vec<Box<dyn RewriteRule>>,
}

/// Strategy table: project family -> ordered rewrite rules.
pub struct PathNormalizer
{
    families: Vec<Family>,
}

impl PathNormalizer
{
    /// Table with no rules (identity on every project)
    pub fn empty() -> Self
    {
        Self { families: Vec::new() }
    }

    /// Built-in families for the BugsInPy-style projects
    pub fn builtin() -> Self
    {
        let mut table = Self::empty();

        table.register("ansible", Box::new(LiteralRule::new("build/lib/", "lib/")));

        // Installed matplotlib under a nested or flat virtualenv
        for pattern in [
            r"matplotlib/env/lib/python3\.\d+/site-packages/",
            r"env/lib/python3\.\d+/site-packages/",
        ]
        {
            if let Ok(rule) = RegexRule::new(pattern, "lib/")
            {
                table.register("matplotlib", Box::new(rule));
            }
        }

        table.register("youtube", Box::new(LiteralRule::new("youtube-dl/youtube_dl/", "youtube_dl/")));

        table
    }

    /// Built-ins plus user rules from configuration
    pub fn from_config(extra: &[RewriteConfig]) -> Result<Self>
    {
        let mut table = Self::builtin();
        for rule in extra
        {
            let compiled = RegexRule::new(&rule.pattern, rule.replacement.clone())
                .with_context(|| format!("rewrite rule for family `{}`", rule.family))?;
            table.register(&rule.family, Box::new(compiled));
        }
        Ok(table)
    }

    /// Append `rule` to `family`, creating the family on first use
    pub fn register(
        &mut self,
        family: &str,
        rule: Box<dyn RewriteRule>,
    )
    {
        match self
            .families
            .iter_mut()
            .find(|f| f.key == family)
        {
            Some(f) => f
                .rules
                .push(rule),
            None => self
                .families
                .push(Family { key: family.to_string(), rules: vec![rule] }),
        }
    }

    /// Families whose key prefixes `project` (e.g. `youtube` for `youtube-dl`)
    pub fn family_keys_for<'a>(
        &'a self,
        project: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a
    {
        self.families
            .iter()
            .filter(move |f| project.starts_with(&f.key))
            .map(|f| f.key.as_str())
    }

    /// Normalize a recorded path for `project`.
    pub fn normalize(
        &self,
        project: &str,
        path: &str,
    ) -> String
    {
        let mut current = path.to_string();
        for family in self
            .families
            .iter()
            .filter(|f| project.starts_with(&f.key))
        {
            for rule in &family.rules
            {
                let rewritten = match rule.apply(&current)
                {
                    Cow::Borrowed(_) => None,
                    Cow::Owned(s) => Some(s),
                };
                if let Some(s) = rewritten
                {
                    current = s;
                }
            }
        }
        current
    }
}

impl Default for PathNormalizer
{
    fn default() -> Self
    {
        Self::builtin()
    }
}
