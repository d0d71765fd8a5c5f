use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use clap::Parser;
use faultline::cli::{Cli, Commands};
use predicates::prelude::*;
use std::process::Command;

mod util;

#[test]
fn global_flags_reach_every_subcommand() {
    // Given
    let argv = vec!["fln", "attach", "--quiet", "--no-color", "--defect", "ansible_1"];

    // When
    let cli = Cli::parse_from(argv);

    // Then
    assert!(cli.quiet && cli.no_color);
    match cli.command {
        Commands::Attach(args) => {
            assert_eq!(args.defects, vec!["ansible_1"]);
            assert_eq!(args.jobs, 1);
        }
        _ => panic!("expected Attach command"),
    }
}

#[test]
fn resolve_prints_method_json() {
    let tmp = assert_fs::TempDir::new().unwrap();
    util::write(&tmp, "snap/pkg/a.py", util::A_PY);

    let out = Command::cargo_bin("fln")
        .unwrap()
        .current_dir(tmp.path())
        .args(["resolve", "snap/pkg/a.py", "5", "--root", "snap"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["name"], "pkg.a.C.foo#3");
    assert_eq!(v["signature"], "pkg.a.C.foo(x)");
    assert_eq!(v["function"], "foo");
    assert_eq!(v["begin_line"], 3);
}

#[test]
fn resolve_outside_functions_prints_null() {
    let tmp = assert_fs::TempDir::new().unwrap();
    util::write(&tmp, "a.py", util::A_PY);

    Command::cargo_bin("fln")
        .unwrap()
        .current_dir(tmp.path())
        .args(["resolve", "a.py", "9"])
        .assert()
        .success()
        .stdout(predicate::str::diff("null\n"));
}

#[test]
fn resolve_reports_syntax_errors() {
    let tmp = assert_fs::TempDir::new().unwrap();
    util::write(&tmp, "bad.py", "def f(:\n");

    Command::cargo_bin("fln")
        .unwrap()
        .current_dir(tmp.path())
        .args(["resolve", "bad.py", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.py could not be parsed"));
}

#[test]
fn init_writes_default_config_once() {
    let tmp = assert_fs::TempDir::new().unwrap();

    Command::cargo_bin("fln")
        .unwrap()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));

    tmp.child("faultline.toml")
        .assert(predicate::str::contains("[layout]").and(predicate::str::contains("hunk_offset = 3")));

    Command::cargo_bin("fln")
        .unwrap()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    Command::cargo_bin("fln")
        .unwrap()
        .current_dir(tmp.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn completions_to_stdout() {
    Command::cargo_bin("fln")
        .unwrap()
        .args(["completions", "bash", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fln"));
}
