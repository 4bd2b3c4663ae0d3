//! # Vibe Coder
//!
//! A small coding playground for students: three editable buffers (HTML,
//! CSS and JavaScript) with a sandboxed live preview, an AI tutor whose code
//! suggestions can be applied with one click, and up to three saved
//! projects per student. Usable both as a standalone binary and as a
//! library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! vibecoder = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vibecoder::ai::TutorService;
//! use vibecoder::config::AiConfig;
//! use vibecoder::server::{AppState, create_router};
//! use vibecoder::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/vibecoder.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(
//!     AppState::new(Arc::new(store), "class-2026")
//!         .with_tutor(TutorService::from_config(&AiConfig::from_env())),
//! );
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod ai;
pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod editor;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
