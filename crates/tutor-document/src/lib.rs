//! Document segmentation model for the tutor.
//!
//! A [`Document`] is immutable text split into pages and bounded chunks; a
//! [`Cursor`] tracks the active read position. Extraction from files sits
//! behind the [`DocumentExtractor`] trait.

pub mod extract;
pub mod model;
pub mod text;

pub use extract::{load_document, DocumentExtractor, PdfTextExtractor};
pub use model::{Cursor, Document, PageKey, RawPages};
pub use text::{clean_text, split_into_chunks};
