//! Tolerant parsers for generated text.

pub mod metadata;
pub mod script;

pub use metadata::{MetadataParser, Section};
pub use script::ScriptParser;
