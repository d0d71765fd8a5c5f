//! Shared test utilities for integration tests
//!
//! Builds a miniature benchmark tree in the default layout so the
//! binary can run from the fixture root without a config file.

#![allow(dead_code)]

use assert_fs::prelude::*;

pub const A_PY: &str = "\
class C:
    x = 1
    def foo(x):
        y = x
        z = y
        return z


    attr = 2
    label = 'c'

def helper(a, b=2):
    return a + b
";

pub const TEST_A_PY: &str = "\
import unittest

class TestA(unittest.TestCase):
    def test_one(self):
        self.assertEqual(1, 1)
";

pub const PATCH: &str = "\
diff --git a/pkg/a.py b/pkg/a.py
--- a/pkg/a.py
+++ b/pkg/a.py
@@ -2,4 +2,5 @@ class C:
     x = 1
     def foo(x):
-        y = x
+        y = x + 1
";

pub const TEST_LOG: &str = "\
running failing tests
coverage run -m pytest tests/test_a.py::TestA::test_one
F
Coverage Report
Name  Stmts  Miss
";

pub const COVERAGE: &str = r#"{
    "meta": {"version": "7.2.7"},
    "files": {
        "pkg/a.py": {"executed_lines": [5, 4, 13], "summary": {"num_statements": 9}},
        "pkg/__init__.py": {"executed_lines": [], "summary": {"num_statements": 0}},
        "pkg/broken.py": {"executed_lines": [1], "summary": {"num_statements": 1}},
        "pkg/gone.py": {"executed_lines": [1], "summary": {"num_statements": 1}}
    }
}"#;

pub const SCORES: &str = r#"{
    "pkg/a.py": {
        "6": {"pseudo_ochiai": 0.4, "rank": 2.0},
        "4": {"pseudo_ochiai": 0.9, "rank": 7.0},
        "13": {"pseudo_ochiai": 0.1, "rank": 1.0}
    }
}"#;

/// Bench with three defects:
/// - `demo_1`: complete
/// - `demo_2`: no coverage artifact
/// - `demo_3`: coverage only on module-level lines
pub fn make_bench() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    // demo_1
    write(&tmp, "projects/demo/bugs/1/bug_patch.txt", PATCH);
    write(&tmp, "backup/projects/demo_1/pkg/a.py", A_PY);
    write(&tmp, "backup/projects/demo_1/pkg/__init__.py", "");
    write(&tmp, "backup/projects/demo_1/pkg/broken.py", "def f(:\n");
    write(&tmp, "backup/projects/demo_1/tests/test_a.py", TEST_A_PY);
    write(&tmp, "backup/projects/demo_1/coverage_bugsinpy.txt", TEST_LOG);
    write(&tmp, "authoritative_coverage/demo_1_coverage.json", COVERAGE);
    write(&tmp, "authoritative_suspiciousness/demo_1_scores.json", SCORES);

    // demo_2
    write(&tmp, "projects/demo/bugs/2/bug_patch.txt", PATCH);
    write(&tmp, "backup/projects/demo_2/pkg/a.py", A_PY);
    write(&tmp, "backup/projects/demo_2/coverage_bugsinpy.txt", TEST_LOG);

    // demo_3
    write(&tmp, "projects/demo/bugs/3/bug_patch.txt", PATCH);
    write(&tmp, "backup/projects/demo_3/pkg/a.py", A_PY);
    write(&tmp, "backup/projects/demo_3/coverage_bugsinpy.txt", "no runs\n");
    write(
        &tmp,
        "authoritative_coverage/demo_3_coverage.json",
        r#"{"files": {"pkg/a.py": {"executed_lines": [2, 8, 11], "summary": {"num_statements": 9}}}}"#,
    );

    tmp
}

pub fn write(
    tmp: &assert_fs::TempDir,
    rel: &str,
    content: &str,
)
{
    tmp.child(rel)
        .write_str(content)
        .expect("write fixture");
}

pub fn read_json(
    tmp: &assert_fs::TempDir,
    rel: &str,
) -> serde_json::Value
{
    let text = std::fs::read_to_string(tmp.path().join(rel)).expect("read output");
    serde_json::from_str(&text).expect("valid JSON")
}
