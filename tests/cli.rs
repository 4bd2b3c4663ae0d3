//! CLI integration tests for the vibecoder admin and offline commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use vibecoder::config::FileConfig;
use vibecoder::editor::{Snapshot, compose};
use vibecoder::store::{SqliteStore, Store};
use vibecoder::types::{CodeState, Role};

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("vibecoder").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--invite-code",
                "klas-2026",
                "--non-interactive",
            ])
            .assert()
    }

    fn seed(&self, count: &str, prefix: &str) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "seed-students",
                "--data-dir",
                &self.data_dir_str(),
                "--count",
                count,
                "--prefix",
                prefix,
            ])
            .assert()
    }

    fn users_json(&self) -> Vec<Value> {
        let output = self
            .cmd()
            .args(["admin", "users", "--data-dir", &self.data_dir_str(), "--json"])
            .output()
            .expect("failed to run command");

        serde_json::from_slice(&output.stdout).expect("failed to parse JSON")
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("vibecoder.db")).expect("open db")
    }
}

#[test]
fn test_init_writes_config_and_database() {
    let ctx = TestContext::new();
    ctx.init()
        .success()
        .stdout(predicate::str::contains("Invite code: klas-2026"));

    assert!(ctx.data_dir().join("vibecoder.db").exists());
    let config = FileConfig::load(ctx.data_dir()).expect("config written");
    assert_eq!(config.invite_code, "klas-2026");
    assert_eq!(config.session_ttl_days, 7);
}

#[test]
fn test_init_twice_fails() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_init_generates_invite_code() {
    let ctx = TestContext::new();
    ctx.cmd()
        .args([
            "admin",
            "init",
            "--data-dir",
            &ctx.data_dir_str(),
            "--non-interactive",
        ])
        .assert()
        .success();

    let config = FileConfig::load(ctx.data_dir()).expect("config written");
    assert_eq!(config.invite_code.len(), 8);
}

#[test]
fn test_commands_require_init() {
    let ctx = TestContext::new();
    ctx.seed("2", "leerling")
        .failure()
        .stderr(predicate::str::contains("vibecoder admin init"));

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Server not initialized"));
}

#[test]
fn test_seed_students_creates_first_login_accounts() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.seed("3", "leerling")
        .success()
        .stdout(predicate::str::contains("Created 3 student account(s)"));

    let users = ctx.users_json();
    assert_eq!(users.len(), 3);
    for user in &users {
        assert_eq!(user["role"], "student");
        assert_eq!(user["first_login"], true);
    }

    let store = ctx.store();
    let user = store
        .get_user_by_username("leerling2")
        .unwrap()
        .expect("seeded user");
    assert!(user.first_login);
    assert_eq!(user.role, Role::Student);
    assert!(user.password_hash.starts_with("$argon2id$"));
}

#[test]
fn test_seed_students_skips_existing() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.seed("2", "groep").success();
    ctx.seed("4", "groep")
        .success()
        .stdout(predicate::str::contains("Created 2 student account(s)"))
        .stdout(predicate::str::contains("Skipped 2 existing: groep1, groep2"));

    assert_eq!(ctx.users_json().len(), 4);
}

#[test]
fn test_seed_students_rejects_bad_prefix() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.seed("1", "bad prefix").failure();
    assert!(ctx.users_json().is_empty());
}

#[test]
fn test_users_lists_pending_setup() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.seed("1", "leerling").success();

    ctx.cmd()
        .args(["admin", "users", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("leerling1"))
        .stdout(predicate::str::contains("(setup pending)"));
}

#[test]
fn test_preview_from_snapshot() {
    let ctx = TestContext::new();
    let code = CodeState::new("<h1>Hoi</h1>", "h1 { color: red; }", "console.log('x');");
    let snapshot = ctx.temp_dir.child("project.json");
    snapshot
        .write_str(&Snapshot::new("Test", code.clone()).to_json().unwrap())
        .unwrap();

    ctx.cmd()
        .args(["preview", &snapshot.path().to_string_lossy()])
        .assert()
        .success()
        .stdout(compose(&code));
}

#[test]
fn test_preview_from_directory_to_file() {
    let ctx = TestContext::new();
    let dir = ctx.temp_dir.child("site");
    dir.create_dir_all().unwrap();
    dir.child("index.html").write_str("<p>kaart</p>").unwrap();
    dir.child("style.css").write_str("p { margin: 0; }").unwrap();
    let out = ctx.temp_dir.child("out.html");

    ctx.cmd()
        .args([
            "preview",
            &dir.path().to_string_lossy(),
            "-o",
            &out.path().to_string_lossy(),
        ])
        .assert()
        .success();

    let expected = compose(&CodeState::new("<p>kaart</p>", "p { margin: 0; }", ""));
    out.assert(expected);
}

#[test]
fn test_preview_rejects_snapshot_without_code() {
    let ctx = TestContext::new();
    let snapshot = ctx.temp_dir.child("broken.json");
    snapshot.write_str("{\"name\": \"Leeg\"}").unwrap();

    ctx.cmd()
        .args(["preview", &snapshot.path().to_string_lossy()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("code"));
}
