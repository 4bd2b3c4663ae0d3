use std::fs;
use std::path::PathBuf;

use anyhow::bail;
use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Serialize;
use uuid::Uuid;

use super::init_store;
use crate::auth::{MIN_PASSWORD_LEN, PasswordHasher};
use crate::config::{CONFIG_FILE_NAME, DB_FILE_NAME, FileConfig};
use crate::server::validation::validate_username;
use crate::store::{SqliteStore, Store};
use crate::types::{Role, User};

const INVITE_CODE_LEN: usize = 8;
/// Seeded accounts log in by username only until setup, so this secret is
/// never handed out.
const PLACEHOLDER_SECRET_LEN: usize = 32;

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn run_admin_init(
    data_dir: String,
    invite_code: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let data_path = PathBuf::from(data_dir);
    let config_path = data_path.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        bail!("Server already initialized. Config exists at: {}", config_path.display());
    }

    fs::create_dir_all(&data_path)?;
    let store = SqliteStore::new(data_path.join(DB_FILE_NAME))?;
    store.initialize()?;

    let invite_code = match invite_code {
        Some(code) => code,
        None if non_interactive => random_string(INVITE_CODE_LEN).to_lowercase(),
        None => inquire::Text::new("Invite code for student registration:")
            .with_default(&random_string(INVITE_CODE_LEN).to_lowercase())
            .prompt()?,
    };

    let config = FileConfig::new(invite_code.trim());
    config.save(&data_path)?;

    println!();
    println!("========================================");
    println!("Server initialized in {}", data_path.display());
    println!();
    println!("  Invite code: {}", config.invite_code);
    println!();
    println!("Settings written to: {}", config_path.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_teacher_prompt(&store)?;
    }

    Ok(())
}

fn create_teacher_prompt(store: &SqliteStore) -> anyhow::Result<()> {
    let create = inquire::Confirm::new("Would you like to create a teacher account?")
        .with_default(false)
        .prompt()?;

    if !create {
        return Ok(());
    }

    let username = inquire::Text::new("Username:")
        .with_validator(|input: &str| match validate_username(input.trim()) {
            Ok(()) => Ok(inquire::validator::Validation::Valid),
            Err(message) => Ok(inquire::validator::Validation::Invalid(message.into())),
        })
        .prompt()?;
    let display_name = inquire::Text::new("Display name:").prompt()?;
    let password = inquire::Password::new("Password:")
        .with_validator(|input: &str| {
            if input.chars().count() < MIN_PASSWORD_LEN {
                Ok(inquire::validator::Validation::Invalid(
                    format!("Use at least {MIN_PASSWORD_LEN} characters").into(),
                ))
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    let now = Utc::now();
    let display_name = display_name.trim();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.trim().to_string(),
        display_name: (!display_name.is_empty()).then(|| display_name.to_string()),
        password_hash: PasswordHasher::new().hash(&password)?,
        role: Role::Teacher,
        first_login: false,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user)?;

    println!();
    println!("Created teacher account '{}'.", user.username);
    println!();

    Ok(())
}

/// Creates `count` student accounts named `{prefix}1`, `{prefix}2`, ...
/// Students log in with the bare username once and pick their own
/// password during setup. Existing usernames are left alone.
pub fn run_admin_seed_students(
    data_dir: String,
    count: u32,
    prefix: String,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let hasher = PasswordHasher::new();

    let mut created = Vec::new();
    let mut skipped = Vec::new();

    for n in 1..=count {
        let username = format!("{prefix}{n}");
        validate_username(&username).map_err(|e| anyhow::anyhow!("{username}: {e}"))?;

        if store.get_user_by_username(&username)?.is_some() {
            skipped.push(username);
            continue;
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.clone(),
            display_name: None,
            password_hash: hasher.hash(&random_string(PLACEHOLDER_SECRET_LEN))?,
            role: Role::Student,
            first_login: true,
            created_at: now,
            updated_at: now,
        };
        store.create_user(&user)?;
        created.push(username);
    }

    println!();
    println!("Created {} student account(s).", created.len());
    for username in &created {
        println!("  {username}");
    }
    if !skipped.is_empty() {
        println!("Skipped {} existing: {}", skipped.len(), skipped.join(", "));
    }
    println!();

    Ok(())
}

#[derive(Serialize)]
struct UserListOutput {
    username: String,
    display_name: Option<String>,
    role: &'static str,
    first_login: bool,
    created_at: String,
}

pub fn run_admin_users(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let users = store.list_users()?;

    if json {
        let output: Vec<UserListOutput> = users
            .iter()
            .map(|u| UserListOutput {
                username: u.username.clone(),
                display_name: u.display_name.clone(),
                role: u.role.as_str(),
                first_login: u.first_login,
                created_at: u.created_at.to_rfc3339(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!();
    for user in &users {
        let status = if user.first_login { "  (setup pending)" } else { "" };
        println!(
            "  {:<20} {:<8} {}{status}",
            user.username,
            user.role.as_str(),
            user.display_name.as_deref().unwrap_or("-"),
        );
    }
    println!();

    Ok(())
}
