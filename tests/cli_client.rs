//! CLI client tests against a live server. The router runs on a real port
//! inside the test process so the tutor can be scripted; the CLI binary
//! talks to it over HTTP with its own config directory.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

mod common;

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use common::{ScriptedBackend, TestApp};
use predicates::prelude::*;
use vibecoder::ai::CONNECTION_FALLBACK;
use vibecoder::editor::{Snapshot, starter_code};
use vibecoder::store::Store;

fn cli_cmd(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vibecoder").expect("failed to find binary");
    cmd.env("NO_COLOR", "1");
    cmd.env("HOME", config_dir.path());
    cmd.env("XDG_CONFIG_HOME", config_dir.path());
    cmd.env_remove("VIBECODER_PASSWORD");
    cmd.env_remove("VIBECODER_NEW_PASSWORD");
    cmd
}

fn login(
    config_dir: &TempDir,
    server: &str,
    username: &str,
    password: Option<&str>,
) -> assert_cmd::assert::Assert {
    let mut cmd = cli_cmd(config_dir);
    cmd.args([
        "auth",
        "login",
        "--server",
        server,
        "--username",
        username,
        "--non-interactive",
    ]);
    if let Some(password) = password {
        cmd.args(["--password", password]);
    }
    cmd.assert()
}

fn project_id(app: &TestApp, username: &str) -> String {
    let user = app
        .store
        .get_user_by_username(username)
        .expect("lookup user")
        .expect("user exists");
    let projects = app.store.list_projects(&user.id).expect("list projects");
    assert_eq!(projects.len(), 1);
    projects[0].id.clone()
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).expect("read workspace file")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn first_login_setup_and_project_flow() {
    let app = TestApp::with_backend(ScriptedBackend::answering([
        "Zo laat je een melding zien:\n```js\nalert('klaar');\n```\n",
    ]));
    app.seed_student("leerling1");
    let server = app.serve().await;
    let config_dir = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();

    // A first-login account needs no password.
    login(&config_dir, &server, "leerling1", None)
        .success()
        .stdout(predicate::str::contains("Logged in to"))
        .stdout(predicate::str::contains("vibecoder auth setup"));

    cli_cmd(&config_dir)
        .args([
            "auth",
            "setup",
            "--display-name",
            "Jan",
            "--password",
            "test",
            "--non-interactive",
        ])
        .assert()
        .success();

    // After setup the password is required, and it works.
    login(&config_dir, &server, "leerling1", None)
        .failure()
        .stderr(predicate::str::contains("--password is required"));
    login(&config_dir, &server, "leerling1", Some("test")).success();

    cli_cmd(&config_dir)
        .args(["project", "create", "Mijn site"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created project 'Mijn site'"));
    let id = project_id(&app, "leerling1");

    site.child("index.html").write_str("<h1>Hoi</h1>").unwrap();
    site.child("style.css").write_str("h1 { color: red; }").unwrap();
    site.child("script.js").write_str("").unwrap();

    cli_cmd(&config_dir)
        .args(["project", "push", &id])
        .arg(site.path())
        .arg("--save-version")
        .assert()
        .success()
        .stdout(predicate::str::contains("(version kept)"));

    let user = app.store.get_user_by_username("leerling1").unwrap().unwrap();
    let versions = app.store.list_project_versions(&user.id, &id).unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].code, starter_code());

    cli_cmd(&config_dir)
        .args(["project", "versions", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains(versions[0].id.as_str()));

    let snapshot_path = site.child("pulled.json");
    cli_cmd(&config_dir)
        .args(["project", "pull", &id, "-o"])
        .arg(snapshot_path.path())
        .assert()
        .success();
    let pulled = Snapshot::from_json(&read(snapshot_path.path())).unwrap();
    assert_eq!(pulled.code.markup, "<h1>Hoi</h1>");

    cli_cmd(&config_dir)
        .args(["chat", "Hoe laat ik een melding zien?", "--snapshot"])
        .arg(site.path())
        .arg("--apply")
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied 1 block(s)"));
    assert_eq!(read(&site.path().join("script.js")), "alert('klaar');");
    assert_eq!(read(&site.path().join("index.html")), "<h1>Hoi</h1>");

    cli_cmd(&config_dir)
        .args(["project", "delete", &id, "--yes"])
        .assert()
        .success();
    assert!(app.store.list_projects(&user.id).unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn image_prints_url() {
    let app = TestApp::new();
    app.register("sem", "geheim").await;
    let server = app.serve().await;
    let config_dir = TempDir::new().unwrap();

    login(&config_dir, &server, "niemand", Some("geheim"))
        .failure()
        .stderr(predicate::str::contains("Unknown username 'niemand'"));
    login(&config_dir, &server, "sem", Some("geheim")).success();

    cli_cmd(&config_dir)
        .args(["image", "rode draak", "--asset-type", "character"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("https://placehold.co/"));
}

#[test]
fn commands_require_login() {
    let config_dir = TempDir::new().unwrap();
    cli_cmd(&config_dir)
        .args(["project", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[cfg(target_os = "linux")]
#[test]
fn chat_falls_back_when_server_is_unreachable() {
    let config_dir = TempDir::new().unwrap();
    config_dir.child("vibecoder").create_dir_all().unwrap();
    config_dir
        .child("vibecoder/credentials.toml")
        .write_str(
            "[default]\nserver_url = \"http://127.0.0.1:9\"\nusername = \"jan\"\ntoken = \"vibe_aaaaaaaa_bbbbbbbbbbbbbbbbbbbbbbbb\"\n",
        )
        .unwrap();
    let site = TempDir::new().unwrap();
    site.child("script.js").write_str("let x = 1;").unwrap();

    cli_cmd(&config_dir)
        .args(["chat", "Waarom werkt dit niet?", "--snapshot"])
        .arg(site.path())
        .arg("--apply")
        .assert()
        .success()
        .stdout(predicate::str::contains(CONNECTION_FALLBACK));
    assert_eq!(read(&site.path().join("script.js")), "let x = 1;");
}
