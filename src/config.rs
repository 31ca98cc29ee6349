use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::llm::LLMConfig;

pub const DEFAULT_COLLECTION: &str = "rag_collection_demo_1";
pub const DEFAULT_SEARCH_RESULTS: usize = 5;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub collection: String,
    pub search_results: usize,
    pub wordcloud_dir: PathBuf,
    pub llm: LLMConfig,
}

impl AppConfig {
    /// Reads settings from the environment (and `.env`, if loaded by the caller).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = lookup("RAG_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let search_results = match lookup("RAG_SEARCH_RESULTS") {
            Some(value) => value
                .parse::<usize>()
                .with_context(|| format!("RAG_SEARCH_RESULTS must be a number, got {value:?}"))?,
            None => DEFAULT_SEARCH_RESULTS,
        };

        let wordcloud_dir = lookup("RAG_WORDCLOUD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("wordclouds"));

        let defaults = LLMConfig::default();
        let llm = LLMConfig {
            host: lookup("OLLAMA_HOST").unwrap_or(defaults.host),
            model: lookup("OLLAMA_MODEL").unwrap_or(defaults.model),
            ..defaults
        };

        Ok(AppConfig {
            collection: lookup("RAG_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            data_dir,
            search_results,
            wordcloud_dir,
            llm,
        })
    }

    pub fn collection_dir(&self) -> PathBuf {
        self.data_dir.join("chroma_db")
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("query_history.json")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("ollama-rag"))
        .unwrap_or_else(|| PathBuf::from("."))
}
