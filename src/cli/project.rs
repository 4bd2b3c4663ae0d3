use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::credentials::load_credentials;
use super::http_client::{ApiClient, HttpProjectSink};
use super::workspace::{self, Workspace};
use crate::editor::{
    CodeStore, DEFAULT_AUTOSAVE_DELAY, SaveCoordinator, SaveOutcome, SaveTrigger, SharedCodeStore, Snapshot,
    spawn_autosave, starter_code,
};
use crate::server::dto::EditorSettings;
use crate::store::MAX_PROJECTS_PER_OWNER;
use crate::types::{CodeState, Language, Project, ProjectVersion};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn client() -> anyhow::Result<ApiClient> {
    let creds = load_credentials()?;
    ApiClient::new(&creds)
}

fn confirm_action(message: &str, yes: bool, non_interactive: bool) -> anyhow::Result<bool> {
    if yes {
        Ok(true)
    } else if non_interactive {
        anyhow::bail!("--yes is required for destructive operations in non-interactive mode");
    } else {
        Ok(inquire::Confirm::new(message)
            .with_default(false)
            .prompt()?)
    }
}

pub async fn run_project_list(json: bool) -> anyhow::Result<()> {
    let projects: Vec<Project> = client()?.get("/projects").await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects yet. Create one with 'vibecoder project create'.");
        return Ok(());
    }

    println!();
    println!("Projects ({}/{MAX_PROJECTS_PER_OWNER}):", projects.len());
    for project in &projects {
        println!(
            "  {}  {:<30} {}",
            project.id,
            project.title,
            project.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!();
    Ok(())
}

/// Creates a project from a workspace, or from the starter template.
pub async fn run_project_create(title: String, from: Option<PathBuf>) -> anyhow::Result<()> {
    let code = match from {
        Some(path) => Workspace::open(&path).await?.code().await?,
        None => starter_code(),
    };

    let project: Project = client()?
        .post(
            "/projects",
            &json!({
                "title": title,
                "html": code.markup,
                "css": code.style,
                "javascript": code.script,
            }),
        )
        .await?;

    println!();
    println!("Created project '{}' ({})", project.title, project.id);
    println!();
    Ok(())
}

/// Downloads a project as a snapshot file, or to stdout.
pub async fn run_project_pull(id: String, output: Option<PathBuf>) -> anyhow::Result<()> {
    let project: Project = client()?.get(&format!("/projects/{id}")).await?;
    let json = Snapshot::new(project.title.clone(), project.code).to_json()?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, json).await?;
            println!("Saved '{}' to {}", project.title, path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub async fn run_project_push(
    id: String,
    file: PathBuf,
    save_version: bool,
) -> anyhow::Result<()> {
    let code = Workspace::open(&file).await?.code().await?;
    let project: Project = client()?
        .put(
            &format!("/projects/{id}"),
            &json!({
                "html": code.markup,
                "css": code.style,
                "javascript": code.script,
                "saveVersion": save_version,
            }),
        )
        .await?;

    let suffix = if save_version { " (version kept)" } else { "" };
    println!("Saved '{}'{suffix}", project.title);
    Ok(())
}

pub async fn run_project_delete(
    id: String,
    yes: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let client = client()?;
    let project: Project = client.get(&format!("/projects/{id}")).await?;

    if !confirm_action(
        &format!("Delete project '{}' and all its versions?", project.title),
        yes,
        non_interactive,
    )? {
        println!("Cancelled.");
        return Ok(());
    }

    client
        .send_empty(reqwest::Method::DELETE, &format!("/projects/{id}"))
        .await?;
    println!("Deleted project '{}'", project.title);
    Ok(())
}

pub async fn run_project_versions(id: String) -> anyhow::Result<()> {
    let versions: Vec<ProjectVersion> = client()?
        .get(&format!("/projects/{id}/versions"))
        .await?;

    if versions.is_empty() {
        println!("No saved versions.");
        return Ok(());
    }

    println!();
    for version in &versions {
        println!(
            "  {}  {}",
            version.created_at.format("%Y-%m-%d %H:%M:%S"),
            version.id
        );
    }
    println!();
    Ok(())
}

/// Where `edit` keeps the checked-out buffers.
enum EditTarget {
    /// A snapshot JSON file; rewritten as a whole.
    Snapshot(PathBuf),
    /// A directory with one file per buffer.
    Dir(PathBuf),
}

impl EditTarget {
    fn new(path: PathBuf) -> Self {
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
            Self::Snapshot(path)
        } else {
            Self::Dir(path)
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Snapshot(path) | Self::Dir(path) => path,
        }
    }

    async fn write(&self, title: &str, code: &CodeState) -> anyhow::Result<()> {
        match self {
            Self::Snapshot(path) => {
                let json = Snapshot::new(title, code.clone()).to_json()?;
                tokio::fs::write(path, json).await?;
                Ok(())
            }
            Self::Dir(dir) => workspace::write_dir(dir, code).await,
        }
    }

    /// Reads the buffers back and hands changes to the store. A snapshot
    /// that does not parse is skipped as a whole.
    async fn sync(&self, store: &SharedCodeStore) {
        match self {
            Self::Snapshot(path) => {
                let parsed = match tokio::fs::read_to_string(path).await {
                    Ok(content) => Snapshot::from_json(&content),
                    Err(e) => {
                        debug!("Skipping {}: {e}", path.display());
                        return;
                    }
                };
                match parsed {
                    Ok(snapshot) => {
                        let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
                        for language in Language::ALL {
                            store.set(language, snapshot.code.get(language));
                        }
                    }
                    Err(e) => debug!("Ignoring {}: {e}", path.display()),
                }
            }
            Self::Dir(dir) => {
                for language in Language::ALL {
                    let path = workspace::buffer_path(dir, language);
                    match tokio::fs::read_to_string(&path).await {
                        Ok(text) => store
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .set(language, text),
                        Err(e) => debug!("Skipping {}: {e}", path.display()),
                    }
                }
            }
        }
    }
}

/// Checks a project out into `path` (a snapshot file, or a directory when
/// the path does not end in `.json`) and keeps it in sync: edits are
/// autosaved after `delay` of quiet, and Ctrl-C performs a final save
/// before exiting.
/// The autosave delay configured on the server, or the built-in default
/// when the server can't say.
async fn server_autosave_delay(client: &ApiClient) -> Duration {
    match client.get::<EditorSettings>("/user/settings").await {
        Ok(settings) => Duration::from_secs(settings.autosave_secs.max(1)),
        Err(e) => {
            warn!("Could not read editor settings, using the default delay: {e}");
            DEFAULT_AUTOSAVE_DELAY
        }
    }
}

pub async fn run_project_edit(
    id: String,
    path: PathBuf,
    delay: Option<Duration>,
    version_on_exit: bool,
) -> anyhow::Result<()> {
    let client = client()?;
    let project: Project = client.get(&format!("/projects/{id}")).await?;
    let delay = match delay {
        Some(delay) => delay,
        None => server_autosave_delay(&client).await,
    };

    let store = CodeStore::new(CodeState::default()).shared();
    store
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .load_from(&project);
    let target = EditTarget::new(path);
    target.write(&project.title, &project.code).await?;

    let coordinator = Arc::new(SaveCoordinator::new(
        store.clone(),
        Arc::new(HttpProjectSink::new(client)),
    ));
    let cancel = CancellationToken::new();
    let autosave = spawn_autosave(coordinator.clone(), delay, cancel.clone());

    println!();
    println!("Editing '{}' in {}", project.title, target.path().display());
    println!(
        "Changes are saved {}s after you stop typing. Press Ctrl-C to stop.",
        delay.as_secs()
    );
    println!();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {e}");
                }
                break;
            }
            _ = ticker.tick() => target.sync(&store).await,
        }
    }

    cancel.cancel();
    if let Err(e) = autosave.await {
        warn!("Autosave task ended abnormally: {e}");
    }

    target.sync(&store).await;
    let dirty = store
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .is_dirty();

    if dirty || version_on_exit {
        let outcome = coordinator
            .save(SaveTrigger::Explicit {
                save_version: version_on_exit,
            })
            .await?;
        if outcome == SaveOutcome::Saved {
            println!("Saved '{}'.", project.title);
        }
    } else {
        println!("No unsaved changes.");
    }

    Ok(())
}
