//! Image assets for student projects. URLs are ephemeral; nothing is stored.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

const PLACEHOLDER_BASE: &str = "https://placehold.co/512x512/667eea/white";
const PLACEHOLDER_TEXT_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Character,
    Background,
    Item,
    Icon,
}

impl AssetType {
    #[must_use]
    pub fn style_suffix(self) -> &'static str {
        match self {
            AssetType::Character => {
                "game character sprite, front view, transparent background, pixel art style"
            }
            AssetType::Background => "game background, seamless, vibrant colors, landscape",
            AssetType::Item => "game item icon, centered, clean background, collectible",
            AssetType::Icon => "simple icon, flat design, centered, minimalist",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub id: String,
    pub prompt: String,
    pub url: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Turns a prompt into an image URL.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn render(&self, prompt: &str) -> Result<String>;
}

/// Labelled placeholder images from placehold.co.
pub struct PlaceholderImageBackend;

#[async_trait]
impl ImageBackend for PlaceholderImageBackend {
    async fn render(&self, prompt: &str) -> Result<String> {
        Ok(placeholder_url(prompt))
    }
}

#[must_use]
pub fn placeholder_url(prompt: &str) -> String {
    let label: String = prompt.chars().take(PLACEHOLDER_TEXT_CHARS).collect();
    format!("{PLACEHOLDER_BASE}?text={}", urlencoding::encode(&label))
}

#[derive(Clone)]
pub struct ImageService {
    backend: Arc<dyn ImageBackend>,
}

impl Default for ImageService {
    fn default() -> Self {
        Self::new(Arc::new(PlaceholderImageBackend))
    }
}

impl ImageService {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self { backend }
    }

    /// Generates an image for `prompt`. An asset type appends its style
    /// description to the prompt first.
    pub async fn generate(&self, prompt: &str, asset: Option<AssetType>) -> Result<GeneratedImage> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::BadRequest("Prompt is required".to_string()));
        }

        let full_prompt = match asset {
            Some(asset) => format!("{prompt}, {}", asset.style_suffix()),
            None => prompt.to_string(),
        };
        let url = self.backend.render(&full_prompt).await?;

        Ok(GeneratedImage {
            id: Uuid::new_v4().to_string(),
            prompt: full_prompt,
            url,
            timestamp: Utc::now().timestamp_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_url_truncates_and_encodes() {
        assert_eq!(
            placeholder_url("blauwe draak met vleugels"),
            "https://placehold.co/512x512/667eea/white?text=blauwe%20draak%20met%20vle"
        );
    }

    #[tokio::test]
    async fn test_generate_plain() {
        let image = ImageService::default().generate("kat", None).await.unwrap();
        assert_eq!(image.prompt, "kat");
        assert!(image.url.ends_with("?text=kat"));
    }

    #[tokio::test]
    async fn test_generate_with_asset_type() {
        let image = ImageService::default()
            .generate("ridder", Some(AssetType::Character))
            .await
            .unwrap();
        assert_eq!(
            image.prompt,
            "ridder, game character sprite, front view, transparent background, pixel art style"
        );
        assert!(image.url.contains("?text=ridder%2C%20game%20chara"));
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected() {
        let err = ImageService::default().generate("   ", None).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn test_asset_type_wire_names() {
        let asset: AssetType = serde_json::from_str("\"background\"").unwrap();
        assert_eq!(asset, AssetType::Background);
    }
}
