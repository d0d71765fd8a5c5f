use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

use crate::core::error::{CorpusError, CorpusResult};

const MMAP_THRESHOLD: u64 = 1024 * 1024; // 1 MiB

pub enum FileContent {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl FileContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Mapped(mmap) => &mmap[..],
            FileContent::Buffered(buf) => buf.as_slice(),
        }
    }
}

/// Read a file, memory-mapping anything above the threshold.
pub fn read_file_smart<P: AsRef<Path>>(path: P) -> std::io::Result<FileContent> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)?;

    if metadata.len() > MMAP_THRESHOLD {
        let file = File::open(path)?;

        // Safety: read-only mapping; snapshots are not modified during a run
        let mmap = unsafe { Mmap::map(&file) }?;

        Ok(FileContent::Mapped(mmap))
    } else {
        Ok(FileContent::Buffered(std::fs::read(path)?))
    }
}

/// Read `path` as UTF-8 source text.
///
/// `label` is the repository-relative path used in error reports. Unreadable
/// or non-UTF-8 files are reported as parse failures of that file.
pub fn read_source(path: &Path, label: &str) -> CorpusResult<String> {
    let content = read_file_smart(path).map_err(|e| CorpusError::Parse {
        path: label.to_string(),
        reason: format!("unreadable: {e}"),
    })?;

    std::str::from_utf8(content.as_bytes())
        .map(str::to_owned)
        .map_err(|e| CorpusError::Parse {
            path: label.to_string(),
            reason: format!("invalid UTF-8: {e}"),
        })
}

/// Read a whole artifact as text; absent files are `MissingArtifact`.
pub fn read_artifact(path: &Path, what: &'static str) -> CorpusResult<String> {
    if !path.is_file() {
        return Err(CorpusError::MissingArtifact {
            what,
            path: path.to_path_buf(),
        });
    }

    let content = read_file_smart(path).map_err(|e| CorpusError::io(path, e))?;

    // Logs and patches may carry stray bytes; keep what decodes
    Ok(String::from_utf8_lossy(content.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn utf8_sources_round_trip() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "def f():\n    return 'é'\n").unwrap();
        let text = read_source(f.path(), "f.py").unwrap();
        assert!(text.contains('é'));
    }

    #[test]
    fn invalid_utf8_is_a_parse_failure() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"def f():\n    return '\xff\xfe'\n").unwrap();
        match read_source(f.path(), "bad.py") {
            Err(CorpusError::Parse { path, reason }) => {
                assert_eq!(path, "bad.py");
                assert!(reason.contains("UTF-8"));
            }
            other => panic!("expected parse error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn missing_artifact_is_reported_with_its_role() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_artifact(&dir.path().join("bug_patch.txt"), "fix patch").unwrap_err();
        assert_eq!(err.kind(), "missing-artifact");
        assert!(err.to_string().contains("missing fix patch"));
    }

    #[test]
    fn large_files_are_mapped() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let line = "x = 1\n".repeat(200_000);
        f.write_all(line.as_bytes()).unwrap();
        let content = read_file_smart(f.path()).unwrap();
        assert!(matches!(content, FileContent::Mapped(_)));
        assert_eq!(content.as_bytes().len(), line.len());
    }
}
