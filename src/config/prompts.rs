// src/config/prompts.rs
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const EMBEDDED: &str = include_str!("../../config/prompts.toml");

/// Prompt templates, one per generation step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prompts {
    pub news_search: String,
    pub script: String,
    pub metadata: String,
}

impl Prompts {
    /// Templates compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_toml_str(EMBEDDED).context("parsing embedded prompts")
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("prompts file not found: {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    /// File when given, embedded templates otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Self::embedded(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut p: Prompts = toml::from_str(s)?;
        for t in [&mut p.news_search, &mut p.script, &mut p.metadata] {
            *t = t.trim().to_string();
        }
        Ok(p)
    }
}
