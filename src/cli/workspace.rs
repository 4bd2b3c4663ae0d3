//! Buffers on disk: either a directory with one file per language or a
//! snapshot JSON file.

use std::path::{Path, PathBuf};

use crate::editor::Snapshot;
use crate::types::{CodeState, Language};

#[must_use]
pub fn file_name(language: Language) -> &'static str {
    match language {
        Language::Markup => "index.html",
        Language::Style => "style.css",
        Language::Script => "script.js",
    }
}

#[must_use]
pub fn buffer_path(dir: &Path, language: Language) -> PathBuf {
    dir.join(file_name(language))
}

pub async fn write_dir(dir: &Path, code: &CodeState) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    for language in Language::ALL {
        tokio::fs::write(buffer_path(dir, language), code.get(language)).await?;
    }
    Ok(())
}

/// Missing files read as empty buffers.
pub async fn read_dir(dir: &Path) -> anyhow::Result<CodeState> {
    let mut code = CodeState::default();
    for language in Language::ALL {
        match tokio::fs::read_to_string(buffer_path(dir, language)).await {
            Ok(text) => code.set(language, text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(code)
}

/// A workspace directory or a snapshot file.
#[derive(Debug)]
pub enum Workspace {
    Dir(PathBuf),
    Snapshot { path: PathBuf, snapshot: Snapshot },
}

impl Workspace {
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if tokio::fs::metadata(path).await?.is_dir() {
            return Ok(Self::Dir(path.to_path_buf()));
        }
        let content = tokio::fs::read_to_string(path).await?;
        let snapshot = Snapshot::from_json(&content)?;
        Ok(Self::Snapshot {
            path: path.to_path_buf(),
            snapshot,
        })
    }

    pub async fn code(&self) -> anyhow::Result<CodeState> {
        match self {
            Self::Dir(dir) => read_dir(dir).await,
            Self::Snapshot { snapshot, .. } => Ok(snapshot.code.clone()),
        }
    }

    /// Writes `code` back where it came from. Snapshots keep their name and
    /// get a new timestamp.
    pub async fn save(&self, code: &CodeState) -> anyhow::Result<()> {
        match self {
            Self::Dir(dir) => write_dir(dir, code).await,
            Self::Snapshot { path, snapshot } => {
                let updated = Snapshot::new(snapshot.name.clone(), code.clone());
                tokio::fs::write(path, updated.to_json()?).await?;
                Ok(())
            }
        }
    }
}
