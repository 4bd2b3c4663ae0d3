mod assist;
mod auth;
pub mod dto;
mod pages;
mod projects;
pub mod response;
mod router;
pub mod validation;

pub use router::{AppState, create_router};
