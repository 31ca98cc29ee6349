use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::ensure_dir;

pub const COLLECTION_DESCRIPTION: &str = "A collection for RAG with Ollama - Demo1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub document: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CollectionData {
    name: String,
    description: String,
    next_id: u64,
    documents: Vec<Document>,
}

/// A named, persistent document collection.
///
/// The whole collection is held in memory and rewritten to
/// `<dir>/<name>.json` on every insert. Ids come from a counter owned by the
/// store rather than from the current document count.
pub struct DocumentStore {
    path: PathBuf,
    name: String,
    description: String,
    next_id: u64,
    documents: Vec<Document>,
}

impl DocumentStore {
    /// Opens the collection, creating it if it does not exist yet.
    pub fn open(dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        ensure_dir(dir)?;
        let path = dir.join(format!("{name}.json"));

        let store = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read collection {path:?}"))?;
            let data: CollectionData = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse collection {path:?}"))?;
            let next_id = data.next_id.max(data.documents.len() as u64 + 1);
            debug!("Opened collection '{name}' with {} documents", data.documents.len());
            DocumentStore {
                path,
                name: data.name,
                description: data.description,
                next_id,
                documents: data.documents,
            }
        } else {
            info!("Creating collection '{name}' at {path:?}");
            let store = DocumentStore {
                path,
                name: name.to_string(),
                description: COLLECTION_DESCRIPTION.to_string(),
                next_id: 1,
                documents: Vec::new(),
            };
            store.save()?;
            store
        };

        Ok(store)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stores `text` as a new document and returns its id.
    pub fn add(&mut self, text: String) -> Result<String> {
        let id = format!("doc{}", self.next_id);
        self.documents.push(Document {
            id: id.clone(),
            document: text,
        });
        self.next_id += 1;

        if let Err(e) = self.save() {
            self.documents.pop();
            self.next_id -= 1;
            return Err(e);
        }

        info!("Document added to collection '{}' with ID {id}", self.name);
        Ok(id)
    }

    /// Document texts in insertion order.
    pub fn list(&self) -> Vec<&str> {
        self.documents.iter().map(|doc| doc.document.as_str()).collect()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Flushes the collection and releases the handle.
    pub fn close(self) -> Result<()> {
        self.save()?;
        debug!("Closed collection '{}'", self.name);
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let data = CollectionData {
            name: self.name.clone(),
            description: self.description.clone(),
            next_id: self.next_id,
            documents: self.documents.clone(),
        };
        let content = serde_json::to_string_pretty(&data)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write collection {:?}", self.path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ids_follow_collection_size() -> Result<()> {
        let dir = tempdir()?;
        let mut store = DocumentStore::open(dir.path(), "test")?;

        assert_eq!(store.add("first".to_string())?, "doc1");
        assert_eq!(store.add("second".to_string())?, "doc2");
        assert_eq!(store.add("third".to_string())?, "doc3");
        assert_eq!(store.len(), 3);
        Ok(())
    }

    #[test]
    fn test_list_preserves_insertion_order() -> Result<()> {
        let dir = tempdir()?;
        let mut store = DocumentStore::open(dir.path(), "test")?;
        store.add("zebra".to_string())?;
        store.add("apple".to_string())?;

        assert_eq!(store.list(), vec!["zebra", "apple"]);
        Ok(())
    }

    #[test]
    fn test_reopen_keeps_documents_and_counter() -> Result<()> {
        let dir = tempdir()?;
        {
            let mut store = DocumentStore::open(dir.path(), "persisted")?;
            store.add("kept across restarts".to_string())?;
            store.close()?;
        }

        let mut store = DocumentStore::open(dir.path(), "persisted")?;
        assert_eq!(store.list(), vec!["kept across restarts"]);
        assert_eq!(store.description(), COLLECTION_DESCRIPTION);
        assert_eq!(store.add("next".to_string())?, "doc2");
        Ok(())
    }

    #[test]
    fn test_collections_are_separate() -> Result<()> {
        let dir = tempdir()?;
        let mut a = DocumentStore::open(dir.path(), "a")?;
        let b = DocumentStore::open(dir.path(), "b")?;
        a.add("only in a".to_string())?;

        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
        Ok(())
    }

    #[test]
    fn test_corrupt_collection_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("broken.json"), "{ not json")?;
        assert!(DocumentStore::open(dir.path(), "broken").is_err());
        Ok(())
    }
}
