// End-to-end runs of the fln binary over a miniature benchmark tree.
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod util;
use util::{make_bench, read_json, write};

fn fln(tmp: &assert_fs::TempDir) -> Command
{
    let mut cmd = Command::cargo_bin("fln").expect("bin");
    cmd.current_dir(tmp.path())
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

#[test]
fn run_emits_labeled_catalogue_with_susp()
{
    let tmp = make_bench();

    fln(&tmp)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("demo_1: 2 production, 1 test, 2 with susp (2 file(s) skipped)"))
        .stdout(predicate::str::contains("1/3 defect(s) emitted, 2 skipped"));

    let snippets = read_json(&tmp, "xfl_auth_data/demo_1/snippet.json");
    let records = snippets
        .as_array()
        .expect("array");
    assert_eq!(records.len(), 2);

    let foo = &records[0];
    assert_eq!(foo["name"], "pkg.a.C.foo#3");
    assert_eq!(foo["src_path"], "pkg/a.py");
    assert_eq!(foo["class_name"], "pkg.a.C");
    assert_eq!(foo["signature"], "pkg.a.C.foo(x)");
    assert_eq!(foo["begin_line"], 3);
    assert_eq!(foo["end_line"], 6);
    assert_eq!(foo["comment"], "");
    assert_eq!(foo["is_bug"], true);
    assert_eq!(foo["snippet"], "    def foo(x):\n        y = x\n        z = y\n        return z");
    // Combinable metric takes the max, the other keeps its first value
    assert_eq!(foo["susp"]["pseudo_ochiai"], 0.9);
    assert_eq!(foo["susp"]["rank"], 7.0);

    let helper = &records[1];
    assert_eq!(helper["name"], "pkg.a.helper#12");
    assert_eq!(helper["signature"], "pkg.a.helper(a, b=2)");
    assert_eq!(helper["class_name"], "pkg.a");
    assert_eq!(helper["is_bug"], false);

    let tests = read_json(&tmp, "xfl_auth_data/demo_1/test_snippet.json");
    assert_eq!(tests[0]["name"], "tests.test_a.TestA.test_one#4");
    assert_eq!(tests[0]["is_bug"], false);
    assert!(tests[0].get("susp").is_none());

    assert_eq!(read_json(&tmp, "xfl_auth_data/demo_1/field_snippet.json"), serde_json::json!({}));
    let failing = std::fs::read_to_string(tmp.path().join("xfl_auth_data/demo_1/failing_tests")).unwrap();
    assert_eq!(failing, "coverage run -m pytest tests/test_a.py::TestA::test_one\nF");

    // Skipped defects leave no output behind
    assert!(!tmp.path().join("xfl_auth_data/demo_2").exists());
    assert!(!tmp.path().join("xfl_auth_data/demo_3").exists());
}

#[test]
fn skip_reasons_are_reported()
{
    let tmp = make_bench();

    fln(&tmp)
        .arg("catalog")
        .assert()
        .success()
        .stdout(predicate::str::contains("demo_2: [missing-artifact] missing coverage report"))
        .stdout(predicate::str::contains("demo_3: [empty-coverage] demo_3 missing coverage info"));
}

#[test]
fn catalog_then_attach_matches_run()
{
    let split = make_bench();
    fln(&split)
        .args(["catalog", "--defect", "demo_1"])
        .assert()
        .success();

    let catalogued = read_json(&split, "xfl_auth_data/demo_1/snippet.json");
    assert!(catalogued[0].get("susp").is_none());

    fln(&split)
        .args(["attach", "--defect", "demo_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1/1 defect(s) emitted"));

    let joined = make_bench();
    fln(&joined)
        .args(["run", "--defect", "demo_1"])
        .assert()
        .success();

    assert_eq!(
        read_json(&split, "xfl_auth_data/demo_1/snippet.json"),
        read_json(&joined, "xfl_auth_data/demo_1/snippet.json")
    );
}

#[test]
fn attach_without_catalogue_skips_defect()
{
    let tmp = make_bench();

    fln(&tmp)
        .args(["attach", "--defect", "demo_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("missing snippet catalogue"));
}

#[test]
fn unresolved_signatures_leave_catalogue_untouched()
{
    let tmp = make_bench();
    fln(&tmp)
        .args(["catalog", "--defect", "demo_1"])
        .assert()
        .success();
    let before = std::fs::read_to_string(tmp.path().join("xfl_auth_data/demo_1/snippet.json")).unwrap();

    // Scores only for foo; helper has no entry
    write(
        &tmp,
        "authoritative_suspiciousness/demo_1_scores.json",
        r#"{"pkg/a.py": {"5": {"pseudo_ochiai": 0.3}}}"#,
    );

    fln(&tmp)
        .args(["attach", "--defect", "demo_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[unresolved-signature]"))
        .stdout(predicate::str::contains("first: pkg.a.helper(a, b=2)"));

    let after = std::fs::read_to_string(tmp.path().join("xfl_auth_data/demo_1/snippet.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn parallel_jobs_produce_same_corpus()
{
    let serial = make_bench();
    let parallel = make_bench();

    fln(&serial)
        .arg("run")
        .assert()
        .success();
    fln(&parallel)
        .args(["run", "--jobs", "3"])
        .assert()
        .success();

    for file in ["snippet.json", "test_snippet.json"]
    {
        let rel = format!("xfl_auth_data/demo_1/{file}");
        assert_eq!(read_json(&serial, &rel), read_json(&parallel, &rel));
    }
}

#[test]
fn dry_run_writes_nothing()
{
    let tmp = make_bench();

    fln(&tmp)
        .args(["--dry-run", "run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo_1: 2 production"));

    assert!(!tmp.path().join("xfl_auth_data").exists());
}

#[test]
fn config_file_moves_output_and_offset()
{
    let tmp = make_bench();
    write(
        &tmp,
        "custom.toml",
        "[layout]\noutput_dir = \"corpus\"\n\n[fix]\nhunk_offset = 0\n",
    );

    fln(&tmp)
        .args(["--config", "custom.toml", "catalog", "--defect", "demo_1"])
        .assert()
        .success();

    // Offset 0 puts the marker on line 2, outside foo (3..6)
    let snippets = read_json(&tmp, "corpus/demo_1/snippet.json");
    assert_eq!(snippets[0]["name"], "pkg.a.C.foo#3");
    assert_eq!(snippets[0]["is_bug"], false);
}

#[test]
fn quiet_suppresses_summary()
{
    let tmp = make_bench();

    fln(&tmp)
        .args(["--quiet", "catalog"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn missing_snapshot_root_is_fatal()
{
    let tmp = assert_fs::TempDir::new().unwrap();

    fln(&tmp)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to list snapshots"));
}
