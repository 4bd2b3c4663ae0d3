//! AI-backed services: the chat tutor and image assets.

mod client;
mod image;
mod tutor;

pub use client::{ChatBackend, OpenAiCompatClient, PromptMessage, PromptRole};
pub use image::{
    AssetType, GeneratedImage, ImageBackend, ImageService, PlaceholderImageBackend, placeholder_url,
};
pub use tutor::{
    CONNECTION_FALLBACK, EMPTY_ANSWER_FALLBACK, SYSTEM_PROMPT, TutorService, build_prompt,
    context_block, debug_question, explain_question,
};
