//! Document loaders
//!
//! Extension-dispatched text extraction for the ingestion path. Source files
//! are never modified.

use crate::error::{Result, VetDxError};
use std::path::Path;

/// Extensions accepted by [`load_document`]
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// One extracted page of text. Plain-text formats produce a single page
/// without a number.
#[derive(Debug, Clone)]
pub struct DocumentPage {
    pub text: String,
    pub page: Option<u32>,
}

/// Extract text from a source file, dispatching on extension
pub fn load_document(path: &Path) -> Result<Vec<DocumentPage>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => load_pdf(path),
        "txt" | "md" => {
            let text = std::fs::read_to_string(path)?;
            Ok(vec![DocumentPage { text, page: None }])
        }
        other => Err(VetDxError::UnsupportedExtension(format!(".{}", other))),
    }
}

/// Extract PDF text, split per page on the form-feed markers emitted by the
/// extractor
fn load_pdf(path: &Path) -> Result<Vec<DocumentPage>> {
    let bytes = std::fs::read(path)?;

    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
        VetDxError::Parse(format!("Failed to extract text from PDF {:?}: {}", path, e))
    })?;

    if text.trim().is_empty() {
        return Err(VetDxError::Parse(format!(
            "PDF file {:?} contains no extractable text (may be image-based)",
            path
        )));
    }

    let pages: Vec<DocumentPage> = text
        .split('\u{c}')
        .enumerate()
        .filter(|(_, page_text)| !page_text.trim().is_empty())
        .map(|(i, page_text)| DocumentPage {
            text: page_text.to_string(),
            page: Some(i as u32 + 1),
        })
        .collect();

    Ok(pages)
}
