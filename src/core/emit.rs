//! Corpus persistence: one output directory per defect.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::core::aggregate::MethodRecord;
use crate::core::artifacts::load_json;
use crate::core::error::{CorpusError, CorpusResult};

pub const SNIPPET_FILE: &str = "snippet.json";
pub const TEST_SNIPPET_FILE: &str = "test_snippet.json";
pub const FIELD_SNIPPET_FILE: &str = "field_snippet.json";
pub const FAILING_TESTS_FILE: &str = "failing_tests";

/// Writes and reads back the artifacts of one defect directory.
pub struct CorpusWriter
{
    dir: PathBuf,
}

impl CorpusWriter
{
    pub fn new(dir: impl Into<PathBuf>) -> Self
    {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path
    {
        &self.dir
    }

    pub fn snippet_path(&self) -> PathBuf
    {
        self.dir
            .join(SNIPPET_FILE)
    }

    /// Coverage-pass outputs: both collections, the empty field catalogue and
    /// the failing-test text
    pub fn write_catalog(
        &self,
        production: &[MethodRecord],
        tests: &[MethodRecord],
        failing_tests: &str,
    ) -> CorpusResult<()>
    {
        std::fs::create_dir_all(&self.dir).map_err(|e| CorpusError::io(&self.dir, e))?;

        write_pretty_json(&self.snippet_path(), &production)?;
        write_pretty_json(
            &self
                .dir
                .join(FIELD_SNIPPET_FILE),
            &serde_json::Map::new(),
        )?;
        write_pretty_json(
            &self
                .dir
                .join(TEST_SNIPPET_FILE),
            &tests,
        )?;

        let failing = self
            .dir
            .join(FAILING_TESTS_FILE);
        std::fs::write(&failing, failing_tests).map_err(|e| CorpusError::io(&failing, e))
    }

    /// Previously written production catalogue
    pub fn read_snippets(&self) -> CorpusResult<Vec<MethodRecord>>
    {
        load_json(&self.snippet_path(), "snippet catalogue")
    }

    /// Replace the production catalogue
    pub fn write_snippets(
        &self,
        records: &[MethodRecord],
    ) -> CorpusResult<()>
    {
        write_pretty_json(&self.snippet_path(), &records)
    }
}

/// Serialize `value` with four-space indentation
pub fn write_pretty_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> CorpusResult<()>
{
    let file = File::create(path).map_err(|e| CorpusError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value
        .serialize(&mut ser)
        .map_err(|source| CorpusError::Json { path: path.to_path_buf(), source })?;

    writer
        .flush()
        .map_err(|e| CorpusError::io(path, e))
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::core::identity::Signature;

    fn record(name: &str) -> MethodRecord
    {
        MethodRecord {
            identity: format!("a.C.{name}#3"),
            src_path: "a.py".into(),
            class_name: "a.C".into(),
            signature: Signature::from(format!("a.C.{name}(x)")),
            snippet_text: "    def foo(x):\n        return x".into(),
            begin_line: 3,
            end_line: 4,
            comment: String::new(),
            is_bug: true,
            suspiciousness: None,
        }
    }

    #[test]
    fn catalog_files_use_on_disk_names()
    {
        let dir = tempfile::tempdir().unwrap();
        let writer = CorpusWriter::new(
            dir.path()
                .join("demo_1"),
        );
        writer
            .write_catalog(&[record("foo")], &[], "coverage run -m pytest t.py")
            .unwrap();

        let snippet = std::fs::read_to_string(writer.snippet_path()).unwrap();
        assert!(snippet.starts_with("[\n    {\n        \"name\": \"a.C.foo#3\""));
        assert!(snippet.contains("\"comment\": \"\""));
        assert!(!snippet.contains("\"susp\""));

        let field = std::fs::read_to_string(writer.dir().join(FIELD_SNIPPET_FILE)).unwrap();
        assert_eq!(field, "{}");
        let tests = std::fs::read_to_string(writer.dir().join(TEST_SNIPPET_FILE)).unwrap();
        assert_eq!(tests, "[]");
        let failing = std::fs::read_to_string(writer.dir().join(FAILING_TESTS_FILE)).unwrap();
        assert_eq!(failing, "coverage run -m pytest t.py");

        assert_eq!(writer.read_snippets().unwrap(), vec![record("foo")]);
    }

    #[test]
    fn rewritten_snippets_carry_susp()
    {
        let dir = tempfile::tempdir().unwrap();
        let writer = CorpusWriter::new(dir.path());

        let mut rec = record("foo");
        rec.suspiciousness = Some([("pseudo_ochiai".to_string(), 0.5)].into_iter().collect());
        writer
            .write_snippets(std::slice::from_ref(&rec))
            .unwrap();

        let back = writer
            .read_snippets()
            .unwrap();
        assert_eq!(back[0].suspiciousness, rec.suspiciousness);
    }
}
