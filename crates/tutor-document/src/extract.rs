//! Document extraction collaborator.
//!
//! The engine only needs a raw page-to-chunks mapping; how text is pulled out
//! of a file is hidden behind [`DocumentExtractor`]. [`PdfTextExtractor`]
//! reads embedded text with `pdf-extract`; scanned PDFs without a text layer
//! come back empty and degrade to a single empty page.

use std::path::Path;

use tracing::{info, warn};

use tutor_core::error::{Result, TutorError};

use crate::model::{Document, PageKey, RawPages};
use crate::text::{clean_text, split_into_chunks};

/// Turns a file into a raw page-to-chunks mapping.
pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<RawPages>;
}

/// Native-text PDF extractor.
pub struct PdfTextExtractor {
    chunk_size: usize,
}

impl PdfTextExtractor {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Extract from in-memory PDF bytes.
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<RawPages> {
        let raw_text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
            let msg = e.to_string();
            let lower = msg.to_lowercase();
            if lower.contains("encrypted") || lower.contains("password") {
                TutorError::InvalidInput("PDF is password protected".into())
            } else {
                TutorError::InvalidInput(format!("could not read PDF: {}", msg))
            }
        })?;
        Ok(paginate(&raw_text, self.chunk_size))
    }
}

impl DocumentExtractor for PdfTextExtractor {
    fn extract(&self, path: &Path) -> Result<RawPages> {
        let bytes = std::fs::read(path)?;
        self.extract_bytes(&bytes)
    }
}

/// Split extracted text into pages on form feeds, then chunk each page.
///
/// A trailing form feed does not produce an extra page.
pub fn paginate(raw_text: &str, chunk_size: usize) -> RawPages {
    let mut pages: Vec<&str> = raw_text.split('\x0C').collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }

    pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| {
            let cleaned = clean_text(page);
            let mut chunks = split_into_chunks(&cleaned, chunk_size);
            if chunks.is_empty() {
                chunks.push(String::new());
            }
            (PageKey::Index(i), chunks)
        })
        .collect()
}

/// Reject anything that is not a `.pdf` file name.
pub fn ensure_pdf(path: &Path) -> Result<()> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        Ok(())
    } else {
        Err(TutorError::InvalidInput(format!(
            "unsupported file type: {}",
            path.display()
        )))
    }
}

/// Extract and build a [`Document`] from a PDF on disk.
pub fn load_document(
    extractor: &dyn DocumentExtractor,
    path: &Path,
    chunk_size: usize,
) -> Result<Document> {
    ensure_pdf(path)?;
    if !path.exists() {
        return Err(TutorError::NotFound(format!("{} does not exist", path.display())));
    }

    let raw = extractor.extract(path)?;
    let doc = Document::from_raw(raw, chunk_size)?;
    if doc.has_text() {
        info!(
            path = %path.display(),
            pages = doc.page_count(),
            "Document loaded"
        );
    } else {
        warn!(path = %path.display(), "Document has no extractable text");
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FixedExtractor(RawPages);

    impl DocumentExtractor for FixedExtractor {
        fn extract(&self, _path: &Path) -> Result<RawPages> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_paginate_splits_on_form_feed() {
        let pages = paginate("Page one text\x0CPage   two\ntext\x0C", 800);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], (PageKey::Index(0), vec!["Page one text".to_string()]));
        assert_eq!(pages[1].1, vec!["Page two text".to_string()]);
    }

    #[test]
    fn test_paginate_blank_page_gets_empty_chunk() {
        let pages = paginate("intro\x0C   \x0Coutro", 800);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].1, vec![String::new()]);
    }

    #[test]
    fn test_paginate_chunks_long_pages() {
        let text = "word ".repeat(400);
        let pages = paginate(&text, 100);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].1.len() > 1);
        assert!(pages[0].1.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn test_ensure_pdf() {
        assert!(ensure_pdf(Path::new("book.pdf")).is_ok());
        assert!(ensure_pdf(Path::new("BOOK.PDF")).is_ok());
        assert!(matches!(
            ensure_pdf(Path::new("book.txt")),
            Err(TutorError::InvalidInput(_))
        ));
        assert!(ensure_pdf(Path::new("book")).is_err());
    }

    #[test]
    fn test_load_document_rejects_wrong_extension() {
        let extractor = FixedExtractor(vec![]);
        let err = load_document(&extractor, Path::new("notes.docx"), 800).unwrap_err();
        assert!(matches!(err, TutorError::InvalidInput(_)));
    }

    #[test]
    fn test_load_document_missing_file_is_not_found() {
        let extractor = FixedExtractor(vec![]);
        let err =
            load_document(&extractor, &PathBuf::from("/nonexistent/notes.pdf"), 800).unwrap_err();
        assert!(matches!(err, TutorError::NotFound(_)));
    }

    #[test]
    fn test_load_document_builds_from_extractor_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lesson.pdf");
        std::fs::write(&path, b"%PDF-1.4 placeholder").unwrap();

        let extractor = FixedExtractor(vec![
            (PageKey::Index(0), vec!["Photosynthesis basics".into()]),
            (PageKey::Index(1), vec!["Light reactions".into()]),
        ]);
        let doc = load_document(&extractor, &path, 800).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.chunk_at(1, 0).unwrap(), "Light reactions");
    }

    #[test]
    fn test_load_document_empty_extraction_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let err = load_document(&FixedExtractor(vec![]), &path, 800).unwrap_err();
        assert!(matches!(err, TutorError::InvalidInput(_)));
    }
}
