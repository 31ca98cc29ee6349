use anyhow::Result;
use log::{error, info};

use crate::history::HistoryLog;
use crate::llm::{AnswerGenerator, construct_prompt, construct_search_prompt};
use crate::search::{SearchResult, WebSearch, flatten_results};
use crate::vector_db::DocumentStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Answered from stored documents.
    Documents { matched: usize },
    /// Answered from a web search whose results were stored as `doc_id`.
    Web { sources: String, doc_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub route: Route,
}

/// Chooses between stored documents and a web search for each query.
pub struct Retriever<G, S> {
    generator: G,
    search: S,
}

impl<G: AnswerGenerator, S: WebSearch> Retriever<G, S> {
    pub fn new(generator: G, search: S) -> Self {
        Retriever { generator, search }
    }

    /// Stored texts containing `query`, ignoring case, in storage order.
    ///
    /// An empty query is a substring of every document and matches them all.
    pub fn retrieve<'a>(&self, store: &'a DocumentStore, query: &str) -> Vec<&'a str> {
        let needle = query.to_lowercase();
        store
            .list()
            .into_iter()
            .filter(|doc| doc.to_lowercase().contains(&needle))
            .collect()
    }

    /// Answers `query`, or returns `None` when neither the store nor the web
    /// has anything on it.
    pub async fn respond(
        &self,
        store: &mut DocumentStore,
        history: &HistoryLog,
        query: &str,
    ) -> Result<Option<Answer>> {
        let relevant = self.retrieve(store, query);

        if !relevant.is_empty() {
            let matched = relevant.len();
            let prompt = construct_prompt(query, &relevant);
            let text = self.generator.generate(&prompt).await?;
            history.append(query, &text)?;
            return Ok(Some(Answer {
                text,
                route: Route::Documents { matched },
            }));
        }

        info!("No relevant documents found for {query:?}, searching the web");
        let results = self.search_web(query).await;
        if results.is_empty() {
            return Ok(None);
        }

        let sources = flatten_results(&results);
        let text = self
            .generator
            .generate(&construct_search_prompt(query, &sources))
            .await?;
        let doc_id = store.add(format!("Query: {query}\nResults: {sources}"))?;
        history.append(query, &text)?;

        Ok(Some(Answer {
            text,
            route: Route::Web { sources, doc_id },
        }))
    }

    async fn search_web(&self, query: &str) -> Vec<SearchResult> {
        match self.search.search(query).await {
            Ok(results) => results,
            Err(e) => {
                error!("Web search failed: {e:#}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::{TempDir, tempdir};

    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl<'a> AnswerGenerator for &'a RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(format!("answer #{}", self.prompts.lock().unwrap().len()))
        }
    }

    enum FakeSearch {
        Results(Vec<SearchResult>),
        Failing,
        Unreachable,
    }

    #[async_trait]
    impl WebSearch for FakeSearch {
        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>> {
            match self {
                FakeSearch::Results(results) => Ok(results.clone()),
                FakeSearch::Failing => Err(anyhow!("connection reset")),
                FakeSearch::Unreachable => panic!("web search should not be called"),
            }
        }
    }

    fn result(title: &str, url: &str, description: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            url: url.to_string(),
            description: description.to_string(),
        }
    }

    fn fixture() -> (TempDir, DocumentStore, HistoryLog) {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("chroma_db"), "test").unwrap();
        let history = HistoryLog::new(dir.path().join("query_history.json"));
        (dir, store, history)
    }

    #[tokio::test]
    async fn test_substring_query_uses_documents() {
        let (_dir, mut store, history) = fixture();
        store.add("Ferris is the Rust mascot.".to_string()).unwrap();
        store.add("Unrelated notes about gardening.".to_string()).unwrap();
        store.add("RUST crabs love the sea".to_string()).unwrap();

        let generator = RecordingGenerator::default();
        let retriever = Retriever::new(&generator, FakeSearch::Unreachable);
        let answer = retriever
            .respond(&mut store, &history, "rust")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(answer.route, Route::Documents { matched: 2 });
        assert_eq!(answer.text, "answer #1");
        assert_eq!(
            generator.prompts.lock().unwrap()[0],
            "rust Context: Ferris is the Rust mascot. RUST crabs love the sea"
        );
        assert_eq!(store.len(), 3);

        let entries = history.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].query, "rust");
        assert_eq!(entries[0].answer, "answer #1");
    }

    #[tokio::test]
    async fn test_every_substring_of_upload_routes_to_documents() {
        let (_dir, mut store, history) = fixture();
        let text = "Borrowing Rules";
        store.add(text.to_string()).unwrap();

        let generator = RecordingGenerator::default();
        let retriever = Retriever::new(&generator, FakeSearch::Unreachable);
        for start in 0..text.len() {
            for end in start + 1..=text.len() {
                let query = text[start..end].to_uppercase();
                let answer = retriever
                    .respond(&mut store, &history, &query)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(answer.route, Route::Documents { matched: 1 });
            }
        }
    }

    #[tokio::test]
    async fn test_empty_query_matches_everything() {
        let (_dir, mut store, _history) = fixture();
        store.add("one".to_string()).unwrap();
        store.add("two".to_string()).unwrap();

        let generator = RecordingGenerator::default();
        let retriever = Retriever::new(&generator, FakeSearch::Unreachable);
        assert_eq!(retriever.retrieve(&store, ""), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_miss_falls_back_to_web_and_persists() {
        let (_dir, mut store, history) = fixture();
        store.add("Notes on tokio".to_string()).unwrap();

        let generator = RecordingGenerator::default();
        let search = FakeSearch::Results(vec![
            result("Axum", "https://docs.rs/axum", "Web framework"),
            result("Hyper", "https://hyper.rs", "HTTP library"),
        ]);
        let retriever = Retriever::new(&generator, search);
        let answer = retriever
            .respond(&mut store, &history, "axum")
            .await
            .unwrap()
            .unwrap();

        let sources = "Axum (https://docs.rs/axum): Web framework\nHyper (https://hyper.rs): HTTP library";
        assert_eq!(
            answer.route,
            Route::Web {
                sources: sources.to_string(),
                doc_id: "doc2".to_string(),
            }
        );
        assert_eq!(generator.prompts.lock().unwrap()[0], format!("axum {sources}"));
        assert_eq!(store.list()[1], format!("Query: axum\nResults: {sources}"));
        assert_eq!(history.entries().len(), 1);

        // The stored lookup now answers the same query from documents.
        let retriever = Retriever::new(&generator, FakeSearch::Unreachable);
        let again = retriever
            .respond(&mut store, &history, "AXUM")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.route, Route::Documents { matched: 1 });
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_no_results_returns_none_without_side_effects() {
        let (_dir, mut store, history) = fixture();

        let generator = RecordingGenerator::default();
        let retriever = Retriever::new(&generator, FakeSearch::Results(Vec::new()));
        let answer = retriever.respond(&mut store, &history, "anything").await.unwrap();

        assert!(answer.is_none());
        assert!(store.is_empty());
        assert!(history.entries().is_empty());
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_degrades_to_none() {
        let (_dir, mut store, history) = fixture();

        let generator = RecordingGenerator::default();
        let retriever = Retriever::new(&generator, FakeSearch::Failing);
        let answer = retriever.respond(&mut store, &history, "offline").await.unwrap();

        assert!(answer.is_none());
        assert!(store.is_empty());
    }
}
