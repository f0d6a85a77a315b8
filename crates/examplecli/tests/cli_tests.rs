use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn examplecli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("examplecli"))
}

fn scratch_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("hello.txt"), "hi").unwrap();
    dir
}

#[test]
fn test_ls_lists_directory() {
    let dir = scratch_dir();
    examplecli()
        .arg("ls")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("hello.txt"));
}

#[test]
fn test_ls_long_listing() {
    let dir = scratch_dir();
    examplecli()
        .args(["ls", "-l"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("hello.txt"))
        .stdout(predicate::str::contains("total"));
}

#[test]
fn test_fail_flag_overrides_status() {
    let dir = scratch_dir();
    examplecli()
        .args(["-fail", "3", "ls"])
        .arg(dir.path())
        .assert()
        .code(3);
}

#[test]
fn test_fail_flag_out_of_range() {
    let dir = scratch_dir();
    for fail in ["256", "4294967296", "-1"] {
        examplecli()
            .args(["-fail", fail, "ls"])
            .arg(dir.path())
            .assert()
            .code(1);
    }
}

#[test]
fn test_fail_flag_keeps_ls_failure() {
    let dir = scratch_dir();
    examplecli()
        .args(["-fail", "3", "ls"])
        .arg(dir.path().join("does-not-exist"))
        .assert()
        .failure()
        .code(predicate::ne(3));
}

#[test]
fn test_ls_missing_directory_fails() {
    let dir = scratch_dir();
    examplecli()
        .arg("ls")
        .arg(dir.path().join("does-not-exist"))
        .assert()
        .failure();
}

#[test]
fn test_version() {
    examplecli()
        .arg("--version")
        .assert()
        .success()
        .stdout(format!("{}\n", env!("CARGO_PKG_VERSION")))
        .stderr("");
}

#[test]
fn test_missing_subcommand() {
    examplecli()
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::starts_with(
            "please provide a subcommand\n\nUsage:\n\texamplecli [flags...] <subcmd>\n",
        ));
}

#[test]
fn test_unknown_subcommand() {
    examplecli()
        .arg("lsx")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown subcommand: \"lsx\""))
        .stderr(predicate::str::contains("Version: "))
        .stderr(predicate::str::contains("my awesome description."))
        .stderr(predicate::str::contains(
            "Subcommands:\n  ls    [flags...] <dir>    my super awesome desc.\n",
        ));
}

#[test]
fn test_ls_without_argument() {
    examplecli()
        .arg("ls")
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with(
            "you must provide a single argument\n\nUsage:\n\texamplecli ls [flags...] <dir>\n",
        ));
}

#[test]
fn test_undefined_flag() {
    examplecli()
        .args(["ls", "-x", "."])
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with(
            "flag provided but not defined: -x\n",
        ));
}
