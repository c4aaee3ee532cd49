// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod generate;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod parse;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod signature;

pub use crate::api::router;
pub use crate::config::AppConfig;
pub use crate::model::{DialogueLine, Metadata, PipelineRun, RunState, Stage};
pub use crate::pipeline::{PipelineError, PipelineOrchestrator};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "daily_econ_shorts=info,warn";

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter; `LOG_FORMAT=json` switches to JSON lines. Safe to call twice.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
