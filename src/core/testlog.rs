//! Test-run log parsing.
//!
//! A test-run log is the console output of running each failing test under
//! `coverage run`. From it we recover the failing-test command text and the
//! test files whose methods should be harvested even when no coverage record
//! names them.

use std::path::Path;

use tracing::debug;

/// Splitter for runs in the log
const RUN_MARKER: &str = "coverage run";

/// Report banner that ends the useful part of a run
const REPORT_BANNER: &str = "\nCoverage Report\n";

/// Parsed test-run log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRunLog
{
    /// `coverage run ...` fragments (report tails removed), newline-joined
    pub failing_tests: String,
}

impl TestRunLog
{
    pub fn parse(raw: &str) -> Self
    {
        let failing_tests = raw
            .split(RUN_MARKER)
            .skip(1)
            .map(|fragment| {
                let body = fragment
                    .split(REPORT_BANNER)
                    .next()
                    .unwrap_or(fragment);
                format!("{RUN_MARKER}{body}")
            })
            .collect::<Vec<_>>()
            .join("\n");

        Self { failing_tests }
    }

    /// Candidate test files named by the run commands, in log order
    /// (may contain duplicates and paths that do not exist)
    pub fn candidate_test_files(&self) -> Vec<String>
    {
        let parsers: [&dyn TestCommandParser; 2] = [&PytestCommand, &UnittestCommand];

        let mut out = Vec::new();
        for line in self
            .failing_tests
            .lines()
            .filter(|l| l.contains(RUN_MARKER))
        {
            // First runner that claims the line wins
            if let Some(parser) = parsers
                .iter()
                .find(|p| p.matches(line))
            {
                let found = parser.candidates(line);
                debug!(runner = parser.runner(), candidates = ?found, "test command");
                out.extend(found);
            }
        }
        out
    }

    /// Candidates that exist under `snapshot`, deduplicated, log order kept
    pub fn discover_test_files(
        &self,
        snapshot: &Path,
    ) -> Vec<String>
    {
        let mut found: Vec<String> = Vec::new();
        for candidate in self.candidate_test_files()
        {
            if found.contains(&candidate)
            {
                continue;
            }
            if snapshot
                .join(&candidate)
                .is_file()
            {
                found.push(candidate);
            }
        }
        found
    }
}

/// Extracts test file candidates from one `coverage run` command line
pub trait TestCommandParser
{
    /// Runner name, for logs
    fn runner(&self) -> &'static str;

    fn matches(
        &self,
        line: &str,
    ) -> bool;

    fn candidates(
        &self,
        line: &str,
    ) -> Vec<String>;
}

/// `coverage run -m pytest tests/test_x.py::TestA::test_b`
pub struct PytestCommand;

impl TestCommandParser for PytestCommand
{
    fn runner(&self) -> &'static str
    {
        "pytest"
    }

    fn matches(
        &self,
        line: &str,
    ) -> bool
    {
        line.contains("pytest")
    }

    fn candidates(
        &self,
        line: &str,
    ) -> Vec<String>
    {
        last_token(line)
            .and_then(|t| t.split("::").next())
            .filter(|f| !f.is_empty())
            .map(|f| vec![f.to_string()])
            .unwrap_or_default()
    }
}

/// `coverage run -m unittest -q pkg.tests.test_x.TestA.test_b`
///
/// A dotted test id is ambiguous, so both `pkg/tests/test_x.py` (class and
/// method dropped) and `pkg/tests/test_x/TestA.py` (method dropped) are
/// proposed; existence in the snapshot decides.
pub struct UnittestCommand;

impl TestCommandParser for UnittestCommand
{
    fn runner(&self) -> &'static str
    {
        "unittest"
    }

    fn matches(
        &self,
        line: &str,
    ) -> bool
    {
        line.contains("unittest")
    }

    fn candidates(
        &self,
        line: &str,
    ) -> Vec<String>
    {
        let Some(token) = last_token(line)
        else
        {
            return Vec::new();
        };
        let parts: Vec<&str> = token
            .split('.')
            .collect();

        [2usize, 1]
            .iter()
            .filter(|&&drop| parts.len() > drop)
            .map(|&drop| format!("{}.py", parts[..parts.len() - drop].join("/")))
            .collect()
    }
}

fn last_token(line: &str) -> Option<&str>
{
    line.split_whitespace()
        .last()
}
