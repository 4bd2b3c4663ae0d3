use std::path::PathBuf;

use super::workspace::Workspace;
use crate::editor::compose;

/// Composes the preview document locally. No server involved.
pub async fn run_preview(path: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let code = Workspace::open(&path).await?.code().await?;
    let document = compose(&code);

    match output {
        Some(out) => {
            tokio::fs::write(&out, document).await?;
            println!("Preview written to {}", out.display());
        }
        None => print!("{document}"),
    }
    Ok(())
}
