use inquire::{Password, PasswordDisplayMode, Text};
use serde_json::json;

use super::credentials::{Credentials, delete_credentials, load_credentials, save_credentials};
use super::http_client::ApiClient;
use crate::auth::MIN_PASSWORD_LEN;
use crate::server::dto::{CheckUsernameResponse, SessionResponse};

pub(crate) fn normalize_server_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');

    // Strip a trailing API path; the client appends its own.
    let url = url.trim_end_matches("/api").trim_end_matches('/');

    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }

    if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
        format!("http://{url}")
    } else {
        format!("https://{url}")
    }
}

fn required_text(
    prompt: &str,
    value: Option<String>,
    non_interactive: bool,
    flag: &str,
) -> anyhow::Result<String> {
    match value {
        Some(v) if v.trim().is_empty() => anyhow::bail!("{flag} cannot be empty"),
        Some(v) => Ok(v),
        None if non_interactive => anyhow::bail!("{flag} is required in non-interactive mode"),
        None => Ok(Text::new(prompt)
            .with_validator(|input: &str| {
                if input.trim().is_empty() {
                    Ok(inquire::validator::Validation::Invalid("A value is required".into()))
                } else {
                    Ok(inquire::validator::Validation::Valid)
                }
            })
            .prompt()?),
    }
}

pub async fn run_auth_login(
    server: Option<String>,
    username: Option<String>,
    password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let server = required_text("Server URL:", server, non_interactive, "--server")?;
    let server_url = normalize_server_url(&server);
    let username = required_text("Username:", username, non_interactive, "--username")?;
    let username = username.trim().to_string();

    let client = ApiClient::anonymous(&server_url)?;
    let probe: CheckUsernameResponse = client
        .post("/auth/check-username", &json!({ "username": username }))
        .await?;

    if !probe.exists {
        anyhow::bail!("Unknown username '{username}'");
    }

    let password = if probe.first_login {
        None
    } else if let Some(p) = password {
        Some(p)
    } else if non_interactive {
        anyhow::bail!("--password is required in non-interactive mode");
    } else {
        Some(
            Password::new("Password:")
                .with_display_mode(PasswordDisplayMode::Masked)
                .without_confirmation()
                .prompt()?,
        )
    };

    let session: SessionResponse = client
        .post(
            "/auth/login",
            &json!({ "username": username, "password": password }),
        )
        .await?;

    save_credentials(&Credentials {
        server_url: server_url.clone(),
        username: session.user.username.clone(),
        token: session.token,
    })?;

    println!();
    println!("Logged in to {server_url} as {}", session.user.username);
    if session.user.first_login {
        println!("Finish your profile with 'vibecoder auth setup'.");
    }
    println!();

    Ok(())
}

/// Completes profile setup. The server revokes every session of the
/// account, so the stored token is replaced with the fresh one.
pub async fn run_auth_setup(
    display_name: Option<String>,
    password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let creds = load_credentials()?;
    let client = ApiClient::new(&creds)?;

    let display_name =
        required_text("Your name:", display_name, non_interactive, "--display-name")?;
    let password = match password {
        Some(p) => p,
        None if non_interactive => {
            anyhow::bail!("--password is required in non-interactive mode")
        }
        None => Password::new("New password:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .with_validator(|input: &str| {
                if input.chars().count() < MIN_PASSWORD_LEN {
                    Ok(inquire::validator::Validation::Invalid(
                        format!("Use at least {MIN_PASSWORD_LEN} characters").into(),
                    ))
                } else {
                    Ok(inquire::validator::Validation::Valid)
                }
            })
            .prompt()?,
    };

    let session: SessionResponse = client
        .post(
            "/user/update-profile",
            &json!({ "displayName": display_name, "newPassword": password }),
        )
        .await?;

    save_credentials(&Credentials {
        token: session.token,
        ..creds
    })?;

    println!();
    println!(
        "Profile saved. Welcome, {}!",
        session.user.display_name.as_deref().unwrap_or(&session.user.username)
    );
    println!();

    Ok(())
}

pub async fn run_auth_logout() -> anyhow::Result<()> {
    if let Ok(creds) = load_credentials() {
        let client = ApiClient::new(&creds)?;
        if let Err(e) = client
            .send_empty(reqwest::Method::POST, "/auth/logout")
            .await
        {
            tracing::warn!("Could not end the session on the server: {e}");
        }
    }

    if delete_credentials()? {
        println!();
        println!("Logged out successfully.");
        println!();
    } else {
        println!();
        println!("No credentials found.");
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_server_url() {
        assert_eq!(normalize_server_url("localhost:8080"), "http://localhost:8080");
        assert_eq!(normalize_server_url("127.0.0.1:3000/"), "http://127.0.0.1:3000");
        assert_eq!(normalize_server_url("school.example.com"), "https://school.example.com");
        assert_eq!(
            normalize_server_url("https://school.example.com/api/"),
            "https://school.example.com"
        );
        assert_eq!(normalize_server_url("  http://lab:8080  "), "http://lab:8080");
    }
}
