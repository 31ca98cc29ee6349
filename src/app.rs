use anyhow::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::extract;
use crate::history::HistoryLog;
use crate::llm::AnswerGenerator;
use crate::retriever::{Retriever, Route};
use crate::search::WebSearch;
use crate::utils::ensure_dir;
use crate::vector_db::DocumentStore;
use crate::wordcloud::WordCloud;

pub const HOME_TEXT: &str = "\
Welcome to the RAG System with Ollama

This application uses Retrieval-Augmented Generation (RAG) and Ollama to
answer questions from your own documents, falling back to a web search when
nothing stored matches.

What you can do:
  ask       Ask a question. Stored documents are searched first, then the web.
  upload    Add PDF or TXT files to the document collection.
  docs      View the documents saved in the collection.
  wordcloud Generate a word cloud for each stored document.
";

const WEB_FALLBACK_NOTICE: &str = "No relevant documents found in the collection, searching the web...";

/// The five screens of the application, each backed by one handler.
pub struct App<G, S> {
    retriever: Retriever<G, S>,
    history: HistoryLog,
    wordcloud: WordCloud,
    wordcloud_dir: PathBuf,
}

impl<G: AnswerGenerator, S: WebSearch> App<G, S> {
    pub fn new(retriever: Retriever<G, S>, history: HistoryLog, wordcloud_dir: PathBuf) -> Self {
        App {
            retriever,
            history,
            wordcloud: WordCloud::default(),
            wordcloud_dir,
        }
    }

    pub fn home(&self) {
        println!("{HOME_TEXT}");
    }

    /// Extracts and stores each file. Returns the ids of the stored documents.
    pub fn upload(&self, store: &mut DocumentStore, files: &[PathBuf]) -> Vec<String> {
        let mut ids = Vec::new();
        for file in files {
            match self.upload_one(store, file) {
                Ok(id) => {
                    println!("Document added with ID {id} ({})", file.display());
                    ids.push(id);
                }
                Err(e) => eprintln!("Error: {}: {e:#}", file.display()),
            }
        }
        ids
    }

    fn upload_one(&self, store: &mut DocumentStore, file: &Path) -> Result<String> {
        let text = extract(file)?;
        store.add(text)
    }

    /// Answers `query` and prints the result. Returns the answer text, if any.
    pub async fn ask(&self, store: &mut DocumentStore, query: &str) -> Result<Option<String>> {
        if let Some(notice) = self.web_fallback_notice(store, query) {
            println!("{notice}");
        }
        let Some(answer) = self.retriever.respond(store, &self.history, query).await? else {
            println!("No relevant information found in DuckDuckGo.");
            return Ok(None);
        };

        match &answer.route {
            Route::Documents { matched } => {
                println!("Response from Ollama (document-based, {matched} matching documents):");
            }
            Route::Web { sources, doc_id } => {
                println!("\nSearch results from DuckDuckGo:\n{sources}\n");
                println!("(results saved as {doc_id})");
                println!("Response from Ollama:");
            }
        }
        println!("{}", answer.text);
        Ok(Some(answer.text))
    }

    /// Shown before the web is searched, when no stored document matches.
    fn web_fallback_notice(&self, store: &DocumentStore, query: &str) -> Option<&'static str> {
        self.retriever
            .retrieve(store, query)
            .is_empty()
            .then_some(WEB_FALLBACK_NOTICE)
    }

    pub fn view_documents(&self, store: &DocumentStore) {
        if store.is_empty() {
            println!("No documents found in the database.");
            return;
        }

        println!("Saved documents ({}):", store.len());
        for (idx, doc) in store.list().iter().enumerate() {
            println!("\n--- Document {} ---\n{doc}", idx + 1);
        }
    }

    /// Writes one SVG word cloud per stored document.
    pub fn show_word_clouds(&self, store: &DocumentStore) -> Result<Vec<PathBuf>> {
        if store.is_empty() {
            warn!("No documents available to generate word clouds.");
            println!("No documents available to generate word clouds.");
            return Ok(Vec::new());
        }

        ensure_dir(&self.wordcloud_dir)?;
        let mut written = Vec::new();
        for (idx, doc) in store.documents().iter().enumerate() {
            let path = self.wordcloud_dir.join(format!("wordcloud_{}.svg", doc.id));
            let svg = self.wordcloud.to_svg(&doc.document);
            fs::write(&path, svg).with_context(|| format!("Failed to write {path:?}"))?;
            println!("Word cloud for Document {}: {}", idx + 1, path.display());
            written.push(path);
        }
        info!("Wrote {} word clouds to {:?}", written.len(), self.wordcloud_dir);
        Ok(written)
    }
}
