//! The segmented document and the read cursor that walks it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tutor_core::error::{Result, TutorError};

use crate::text::{split_into_chunks, truncate_chars};

/// A page key as produced by an extractor or read back from storage.
///
/// Serialized forms round-trip integer keys as strings, so both shapes are
/// accepted and normalized once in [`Document::from_raw`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageKey {
    Index(usize),
    Label(String),
}

impl PageKey {
    fn to_index(&self) -> Result<usize> {
        match self {
            PageKey::Index(i) => Ok(*i),
            PageKey::Label(s) => s.trim().parse::<usize>().map_err(|_| {
                TutorError::InvalidInput(format!("page key '{}' is not a page number", s))
            }),
        }
    }
}

impl From<usize> for PageKey {
    fn from(i: usize) -> Self {
        PageKey::Index(i)
    }
}

impl From<&str> for PageKey {
    fn from(s: &str) -> Self {
        PageKey::Label(s.to_string())
    }
}

impl From<String> for PageKey {
    fn from(s: String) -> Self {
        PageKey::Label(s)
    }
}

/// Raw page-to-chunks mapping produced by an extractor.
pub type RawPages = Vec<(PageKey, Vec<String>)>;

/// Immutable segmented text keyed by 0-indexed page.
///
/// Every page holds at least one chunk (possibly empty) and no chunk is
/// longer than `max_chunk_chars` characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pages: Vec<Vec<String>>,
    max_chunk_chars: usize,
}

impl Document {
    /// Build a document from an extractor's raw mapping.
    ///
    /// Fails with `InvalidInput` when the mapping is empty, a key is not a
    /// page number, a page appears twice, or page numbers are not contiguous
    /// from 0. When no page carries any text the result is a single empty
    /// page.
    pub fn from_raw<I, K>(pages: I, max_chunk_chars: usize) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: Into<PageKey>,
    {
        if max_chunk_chars == 0 {
            return Err(TutorError::InvalidInput(
                "chunk size must be greater than zero".into(),
            ));
        }

        let mut by_index: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (key, chunks) in pages {
            let key = key.into();
            let index = key.to_index()?;
            if by_index.insert(index, chunks).is_some() {
                return Err(TutorError::InvalidInput(format!(
                    "page {} appears more than once",
                    index
                )));
            }
        }

        if by_index.is_empty() {
            return Err(TutorError::InvalidInput("document has no pages".into()));
        }

        if let Some((expected, found)) = by_index
            .keys()
            .enumerate()
            .find(|(expected, found)| expected != *found)
        {
            return Err(TutorError::InvalidInput(format!(
                "page numbers must be contiguous from 0: expected {}, found {}",
                expected, found
            )));
        }

        let has_text = by_index
            .values()
            .any(|chunks| chunks.iter().any(|c| !c.trim().is_empty()));
        if !has_text {
            tracing::warn!("Document has no extractable text; using a single empty page");
            return Ok(Self::empty(max_chunk_chars));
        }

        let pages = by_index
            .into_values()
            .map(|chunks| normalize_page(chunks, max_chunk_chars))
            .collect();

        Ok(Self {
            pages,
            max_chunk_chars,
        })
    }

    /// A document with one page holding one empty chunk.
    pub fn empty(max_chunk_chars: usize) -> Self {
        Self {
            pages: vec![vec![String::new()]],
            max_chunk_chars,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn chunk_count(&self, page: usize) -> Option<usize> {
        self.pages.get(page).map(Vec::len)
    }

    pub fn max_chunk_chars(&self) -> usize {
        self.max_chunk_chars
    }

    /// Bounds-checked chunk lookup.
    pub fn chunk_at(&self, page: usize, chunk: usize) -> Result<&str> {
        self.pages
            .get(page)
            .ok_or_else(|| TutorError::NotFound(format!("page {} does not exist", page)))?
            .get(chunk)
            .map(String::as_str)
            .ok_or_else(|| {
                TutorError::NotFound(format!("chunk {} does not exist on page {}", chunk, page))
            })
    }

    /// All chunks of a page joined by a single space.
    pub fn page_text(&self, page: usize) -> Option<String> {
        self.pages.get(page).map(|chunks| chunks.join(" "))
    }

    /// `Page N: ...` excerpts of the first `max_pages` non-empty pages, each
    /// cut to `chars_per_page` characters.
    pub fn excerpts(&self, max_pages: usize, chars_per_page: usize) -> String {
        self.pages
            .iter()
            .enumerate()
            .take(max_pages)
            .filter_map(|(i, chunks)| {
                let text = chunks.join(" ");
                let text = text.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(format!("Page {}: {}", i + 1, truncate_chars(text, chars_per_page)))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True when at least one chunk carries non-whitespace text.
    pub fn has_text(&self) -> bool {
        self.pages
            .iter()
            .any(|chunks| chunks.iter().any(|c| !c.trim().is_empty()))
    }

    /// String-keyed form used for persistence.
    pub fn to_raw(&self) -> BTreeMap<String, Vec<String>> {
        self.pages
            .iter()
            .enumerate()
            .map(|(i, chunks)| (i.to_string(), chunks.clone()))
            .collect()
    }
}

fn normalize_page(chunks: Vec<String>, max_chunk_chars: usize) -> Vec<String> {
    let mut out = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.chars().count() <= max_chunk_chars {
            out.push(chunk);
        } else {
            out.extend(split_into_chunks(&chunk, max_chunk_chars));
        }
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

/// Active read position inside a document.
///
/// Movement methods take the document they are bounded by and return `None`
/// instead of leaving it; the chunk resets to 0 whenever the page changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub page: usize,
    pub chunk: usize,
}

impl Cursor {
    pub fn origin() -> Self {
        Self::default()
    }

    pub fn next_page(&self, doc: &Document) -> Option<Cursor> {
        self.go_to_page(doc, self.page.checked_add(1)?)
    }

    pub fn prev_page(&self, doc: &Document) -> Option<Cursor> {
        self.go_to_page(doc, self.page.checked_sub(1)?)
    }

    pub fn go_to_page(&self, doc: &Document, page: usize) -> Option<Cursor> {
        (page < doc.page_count()).then_some(Cursor { page, chunk: 0 })
    }

    pub fn go_to_chunk(&self, doc: &Document, chunk: usize) -> Option<Cursor> {
        let count = doc.chunk_count(self.page)?;
        (chunk < count).then_some(Cursor {
            page: self.page,
            chunk,
        })
    }

    /// Text under the cursor, if the cursor is inside `doc`.
    pub fn current<'a>(&self, doc: &'a Document) -> Option<&'a str> {
        doc.chunk_at(self.page, self.chunk).ok()
    }
}
