use std::path::PathBuf;

use serde_json::json;
use tracing::warn;

use super::credentials::load_credentials;
use super::http_client::ApiClient;
use super::workspace::Workspace;
use crate::ai::{AssetType, CONNECTION_FALLBACK, GeneratedImage};
use crate::editor::{CodeBlock, CodeStore, EditorSession};
use crate::server::dto::ChatResponse;

fn print_blocks(blocks: &[CodeBlock]) {
    for (n, block) in blocks.iter().enumerate() {
        match block.target() {
            Some(language) => println!("  [{}] {} block", n + 1, language.label()),
            None => println!(
                "  [{}] {} block (cannot be applied)",
                n + 1,
                block.tag.as_deref().unwrap_or("untagged")
            ),
        }
    }
}

/// Asks the tutor about the code in `path`. Without `message` this becomes
/// a conversation that ends on an empty line. With `apply`, every code
/// block the tutor sends is written into the workspace.
pub async fn run_chat(
    path: PathBuf,
    message: Option<String>,
    apply: bool,
) -> anyhow::Result<()> {
    let creds = load_credentials()?;
    let client = ApiClient::new(&creds)?;
    let workspace = Workspace::open(&path).await?;

    let mut session = EditorSession::new(CodeStore::new(workspace.code().await?).shared());
    let single_shot = message.is_some();
    let mut pending = message;

    loop {
        let question = match pending.take() {
            Some(q) => q,
            None if single_shot => break,
            None => {
                let q = inquire::Text::new("You:")
                    .with_help_message("Empty line to stop")
                    .prompt()?;
                if q.trim().is_empty() {
                    break;
                }
                q
            }
        };

        let turn = session.record_user_message(question);
        let history: Vec<_> = turn
            .history
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();

        let request = json!({
            "message": turn.message.content,
            "code": session.code(),
            "history": history,
        });
        let answer = match client.post::<ChatResponse, _>("/chat", &request).await {
            Ok(response) => response.message.content,
            Err(e) => {
                warn!("Chat request failed: {e}");
                CONNECTION_FALLBACK.to_string()
            }
        };

        let (_, blocks) = session.record_assistant_message(answer.clone());
        println!();
        println!("{answer}");
        println!();

        if blocks.is_empty() {
            continue;
        }
        print_blocks(&blocks);

        if apply {
            let mut applied = 0;
            for block in blocks.iter().filter(|b| b.is_applicable()) {
                session.apply_block(block)?;
                applied += 1;
            }
            if applied > 0 {
                workspace.save(&session.code()).await?;
                println!("Applied {applied} block(s) to {}", path.display());
            }
        }
        println!();
    }

    Ok(())
}

pub async fn run_image(prompt: String, asset_type: Option<AssetType>) -> anyhow::Result<()> {
    let creds = load_credentials()?;
    let client = ApiClient::new(&creds)?;

    let image: GeneratedImage = client
        .post(
            "/generate-image",
            &json!({ "prompt": prompt, "assetType": asset_type }),
        )
        .await?;

    println!("{}", image.url);
    Ok(())
}
