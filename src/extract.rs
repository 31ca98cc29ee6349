use std::fs;
use std::panic;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("The uploaded file is empty or contains no extractable text.")]
    EmptyContent,

    #[error("Unsupported file type: {0} (expected PDF or TXT)")]
    Unsupported(String),

    #[error("The uploaded text file is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Failed to read PDF: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    /// Decides by extension, falling back to the `%PDF` magic bytes.
    pub fn detect(path: &Path, bytes: &[u8]) -> Result<Self, ExtractError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => Ok(FileKind::Pdf),
            Some("txt") => Ok(FileKind::Text),
            _ if bytes.starts_with(b"%PDF") => Ok(FileKind::Pdf),
            Some(other) => Err(ExtractError::Unsupported(other.to_string())),
            None => Ok(FileKind::Text),
        }
    }
}

/// Reads `path` and returns its text content.
pub fn extract(path: &Path) -> Result<String, ExtractError> {
    let bytes = fs::read(path)?;
    let kind = FileKind::detect(path, &bytes)?;
    extract_bytes(bytes, kind)
}

pub fn extract_bytes(bytes: Vec<u8>, kind: FileKind) -> Result<String, ExtractError> {
    let text = match kind {
        FileKind::Pdf => extract_pdf_text(&bytes)?,
        FileKind::Text => String::from_utf8(bytes)?.trim().to_string(),
    };

    if text.trim().is_empty() {
        return Err(ExtractError::EmptyContent);
    }
    Ok(text)
}

/// pdf-extract panics on some malformed documents (missing fonts, unknown
/// encodings), so the panic is turned into an ordinary extraction error.
fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|payload| ExtractError::Pdf(panic_message(payload.as_ref())))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.concat())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "malformed PDF".to_string()
    }
}
