// src/config/mod.rs
pub mod app;
pub mod prompts;

pub use app::AppConfig;
pub use prompts::Prompts;
