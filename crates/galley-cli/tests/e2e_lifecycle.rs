//! End-to-end CLI lifecycle tests.
//!
//! Each test runs the `galley` binary as a subprocess in an isolated temp
//! directory with its own store file and config.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

const ADMIN: &str = "admin@journal.org";
const EDITOR: &str = "ed@journal.org";
const REVIEWER: &str = "rev@lab.org";
const COPY_EDITOR: &str = "ce@journal.org";
const AUTHOR: &str = "ada@uni.edu";

/// Build a Command targeting the galley binary, rooted in `dir`.
fn galley(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("galley"));
    cmd.current_dir(dir);
    cmd.env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd.env_remove("GALLEY_ACTOR");
    cmd.env_remove("GALLEY_DB");
    cmd.env("GALLEY_LOG", "error");
    cmd
}

/// Run as `actor` with `--json` and return parsed stdout.
fn run_json(dir: &Path, actor: &str, args: &[&str]) -> Value {
    let output = galley(dir)
        .args(args)
        .args(["--as", actor, "--json"])
        .output()
        .expect("galley should not crash");
    assert!(
        output.status.success(),
        "galley {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("--json should produce valid JSON")
}

/// Run as `actor` expecting failure; return the JSON error object.
fn run_err(dir: &Path, actor: &str, args: &[&str]) -> Value {
    let output = galley(dir)
        .args(args)
        .args(["--as", actor, "--json"])
        .output()
        .expect("galley should not crash");
    assert!(!output.status.success(), "galley {args:?} unexpectedly succeeded");
    let stderr = String::from_utf8_lossy(&output.stderr);
    let start = stderr.find('{').expect("JSON error on stderr");
    let end = stderr.rfind('}').expect("JSON error on stderr");
    let value: Value = serde_json::from_str(&stderr[start..=end]).expect("valid JSON error");
    value["error"].clone()
}

/// Initialize a store with an admin plus editor, reviewer, copy editor and author.
fn setup() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    galley(dir.path())
        .args(["init", "--admin-email", ADMIN])
        .assert()
        .success();
    for (email, name, roles) in [
        (EDITOR, "Ed", "editor"),
        (REVIEWER, "Rev", "reviewer"),
        (COPY_EDITOR, "Cee", "copy-editor"),
        (AUTHOR, "Ada", "author"),
    ] {
        run_json(
            dir.path(),
            ADMIN,
            &["account", "add", "--email", email, "--name", name, "--roles", roles],
        );
    }
    dir
}

fn submit(dir: &Path, country: &str) -> String {
    let out = run_json(
        dir,
        AUTHOR,
        &[
            "submit",
            "--title",
            "Tidal energy in fjords",
            "--abstract",
            "We measure tides.",
            "--keywords",
            "energy,oceanography",
            "--country",
            country,
            "--author",
            "Ada Lovelace <ada@uni.edu>; Analytical Society",
            "--file",
            "draft.pdf=s3://galley/draft.pdf",
        ],
    );
    assert_eq!(out["status"], "submitted");
    assert_eq!(out["revision"], 1);
    out["id"].as_str().expect("id").to_string()
}

/// Submit, assign, review and accept. Returns the manuscript id.
fn accepted(dir: &Path, country: &str) -> String {
    let ms = submit(dir, country);
    run_json(dir, EDITOR, &["assign", "editor", &ms, EDITOR]);
    let review = run_json(dir, EDITOR, &["assign", "reviewer", &ms, REVIEWER]);
    let review_id = review["id"].as_str().expect("review id").to_string();
    run_json(
        dir,
        REVIEWER,
        &[
            "review", "submit", &review_id, "--recommendation", "accept",
            "--originality", "4", "--methodology", "4", "--clarity", "5",
            "--significance", "4", "--comments", "Well argued.",
        ],
    );
    run_json(dir, EDITOR, &["review", "conclude", &ms]);
    let out = run_json(dir, EDITOR, &["decide", &ms, "accept", "--comments", "Congratulations"]);
    assert_eq!(out["status"], "accepted");
    ms
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn init_writes_store_and_config() {
    let dir = TempDir::new().unwrap();
    galley(dir.path())
        .args(["init", "--admin-email", ADMIN])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized galley store"));
    assert!(dir.path().join("galley.db").exists());
    assert!(dir.path().join("galley.toml").exists());

    galley(dir.path())
        .args(["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn commands_need_an_initialized_store() {
    let dir = TempDir::new().unwrap();
    galley(dir.path())
        .args(["list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("galley init"));
}

#[test]
fn mutations_need_an_identity() {
    let dir = setup();
    let err = galley(dir.path())
        .args(["review", "conclude", "ms-missing", "--json"])
        .output()
        .unwrap();
    assert!(!err.status.success());
    assert!(String::from_utf8_lossy(&err.stderr).contains("missing_actor"));
}

#[test]
fn full_lifecycle_to_publication() {
    let dir = setup();
    let d = dir.path();
    let ms = accepted(d, "Norway");

    // Payment gate: the fee is unpaid.
    let err = run_err(d, EDITOR, &["assign", "copy-editor", &ms, COPY_EDITOR]);
    assert_eq!(err["error_code"], "E2003");

    let payments = run_json(d, EDITOR, &["payment", "list", &ms]);
    let payment = payments[0]["id"].as_str().unwrap().to_string();
    assert_eq!(payments[0]["status"], "pending");
    run_json(d, ADMIN, &["payment", "record", &payment, "completed", "--note", "wire 4411"]);

    let out = run_json(d, EDITOR, &["assign", "copy-editor", &ms, COPY_EDITOR]);
    assert_eq!(out["status"], "accepted");
    assert_eq!(out["copy_edit_stage"], "in-copy-editing");

    run_json(d, COPY_EDITOR, &["copyedit", "draft-ready", &ms, "--notes", "house style"]);
    let out = run_json(
        d,
        AUTHOR,
        &["copyedit", "review", &ms, "--approval", "needs-changes", "--comments", "Fix Table 2"],
    );
    assert_eq!(out["copy_edit_stage"], "revision");
    run_json(d, COPY_EDITOR, &["copyedit", "resume", &ms]);
    run_json(d, COPY_EDITOR, &["copyedit", "draft-ready", &ms]);
    run_json(
        d,
        AUTHOR,
        &["copyedit", "review", &ms, "--approval", "approved", "--file", "final.pdf=s3://galley/final.pdf"],
    );
    run_json(d, COPY_EDITOR, &["copyedit", "proof", &ms, "--file", "proof.pdf=s3://galley/proof.pdf"]);
    let out = run_json(d, COPY_EDITOR, &["copyedit", "confirm", &ms]);
    assert_eq!(out["copy_edit_stage"], "ready-for-publication");

    let out = run_json(
        d,
        EDITOR,
        &["publish", &ms, "--volume", "12", "--issue", "3", "--pages", "101-118", "--date", "2026-09-01"],
    );
    assert_eq!(out["status"], "published");

    let shown = run_json(d, EDITOR, &["show", &ms]);
    assert_eq!(shown["publication"]["volume"], 12);
    assert!(shown.get("assigned_copy_editor").is_none());
    assert_eq!(shown["latest_manuscript_files"][0]["name"], "final.pdf");

    let reviews = run_json(d, EDITOR, &["timeline", &ms, "--author-reviews"]);
    assert_eq!(reviews.as_array().unwrap().len(), 2);
    assert_eq!(reviews[0]["approval"], "needs_changes");
    assert_eq!(reviews[1]["approval"], "approved");

    galley(d)
        .args(["verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 broken"));
}

#[test]
fn waived_fee_skips_payment() {
    let dir = setup();
    let d = dir.path();
    std::fs::write(
        d.join("galley.toml"),
        "[fees]\nwaived_countries = [\"Nepal\"]\n",
    )
    .unwrap();
    let ms = accepted(d, "Nepal");

    let payments = run_json(d, EDITOR, &["payment", "list", &ms]);
    assert!(payments.as_array().unwrap().is_empty());
    let out = run_json(d, EDITOR, &["assign", "copy-editor", &ms, COPY_EDITOR]);
    assert_eq!(out["status"], "accepted");
}

#[test]
fn errors_keep_their_taxonomy() {
    let dir = setup();
    let d = dir.path();
    let ms = submit(d, "Norway");

    // Authors may not decide.
    let err = run_err(d, AUTHOR, &["decide", &ms, "accept"]);
    assert_eq!(err["kind"], "authorization");

    // Unknown decision values are validation errors.
    run_json(d, EDITOR, &["assign", "editor", &ms, EDITOR]);
    run_json(d, EDITOR, &["assign", "reviewer", &ms, REVIEWER]);
    let err = run_err(d, EDITOR, &["decide", &ms, "maybe"]);
    assert_eq!(err["error_code"], "E2002");

    // A stale pinned revision is a state conflict.
    let err = run_err(d, EDITOR, &["decide", &ms, "reject", "--revision", "1"]);
    assert_eq!(err["kind"], "state-conflict");
    assert_eq!(err["error_code"], "E3002");

    let err = run_err(d, EDITOR, &["show", "ms-nothere"]);
    assert_eq!(err["kind"], "not-found");
}

#[test]
fn rejection_is_terminal() {
    let dir = setup();
    let d = dir.path();
    let ms = submit(d, "Norway");
    run_json(d, EDITOR, &["assign", "editor", &ms, EDITOR]);
    let review = run_json(d, EDITOR, &["assign", "reviewer", &ms, REVIEWER]);
    run_json(
        d,
        REVIEWER,
        &[
            "review", "submit", review["id"].as_str().unwrap(), "--recommendation", "reject",
            "--originality", "2", "--methodology", "1", "--clarity", "3",
            "--significance", "2", "--comments", "Flawed design.",
        ],
    );
    let out = run_json(d, EDITOR, &["decide", &ms, "reject"]);
    assert_eq!(out["status"], "rejected");

    let err = run_err(d, EDITOR, &["decide", &ms, "accept"]);
    assert_eq!(err["kind"], "state-conflict");
    let err = run_err(
        d,
        EDITOR,
        &["publish", &ms, "--volume", "1", "--issue", "1", "--pages", "1-2"],
    );
    assert_eq!(err["kind"], "state-conflict");

    let list = run_json(d, EDITOR, &["list", "--status", "rejected"]);
    assert_eq!(list.as_array().unwrap().len(), 1);
}
