//! Document screening and PDF text extraction
//!
//! Extraction only walks the page tree and decodes content-stream text
//! operators; nothing embedded in the document is executed.

use lopdf::Document;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::debug;

use super::inflate::{check_document_streams, check_raw_streams};
use crate::types::{CheckFailure, ExtractedText, ReceiptDocument};

/// Media types accepted as PDF (compared case-insensitively, parameters ignored)
pub const PDF_MEDIA_TYPES: [&str; 2] = ["application/pdf", "application/x-pdf"];

/// PDF header magic
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Readers tolerate junk before the header within the first kilobyte
const MAGIC_SEARCH_WINDOW: usize = 1024;

/// Resource ceilings applied to every verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierLimits {
    /// Largest accepted document in bytes
    pub max_document_bytes: usize,
    /// Largest accepted page count
    pub max_pages: usize,
    /// Wall-clock budget for text extraction, checked between pages
    pub parse_budget: Duration,
    /// Largest amount of extracted text, in characters
    pub max_text_chars: usize,
    /// Largest total size of inflated stream data, in bytes
    pub max_decompressed_bytes: usize,
}

impl Default for VerifierLimits {
    fn default() -> Self {
        Self {
            max_document_bytes: 10 * 1024 * 1024,
            max_pages: 20,
            parse_budget: Duration::from_secs(5),
            max_text_chars: 1024 * 1024,
            max_decompressed_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Reasons text could not be pulled out of a document
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("malformed document: {0}")]
    Malformed(#[from] lopdf::Error),
    #[error("document is encrypted and cannot be opened without a password")]
    Encrypted,
    #[error("stream filter {0} is not supported")]
    UnsupportedFilter(String),
    #[error("decompressed streams exceed {0} bytes")]
    DecompressionLimitExceeded(usize),
    #[error("document has {pages} pages, limit is {max}")]
    TooManyPages { pages: usize, max: usize },
    #[error("document has no pages")]
    NoPages,
    #[error("parse budget of {0:?} exceeded")]
    BudgetExceeded(Duration),
    #[error("extracted text exceeds {0} characters")]
    TextLimitExceeded(usize),
    #[error("document contains no extractable text")]
    NoText,
    #[error("parser failure")]
    ParserPanic,
}

/// Reject documents that must never reach the parser
///
/// Size is checked first, then the declared media type and the magic bytes.
pub fn screen_document(document: &ReceiptDocument, limits: &VerifierLimits) -> Result<(), CheckFailure> {
    if document.size() == 0 {
        return Err(CheckFailure::UnreadableDocument {
            reason: "document is empty".to_string(),
        });
    }

    if document.size() > limits.max_document_bytes {
        return Err(CheckFailure::OversizedDocument {
            size: document.size(),
            max: limits.max_document_bytes,
        });
    }

    if !is_pdf_media_type(document.content_type()) || !has_pdf_magic(document.bytes()) {
        return Err(CheckFailure::UnsupportedMediaType {
            declared: document.content_type().to_string(),
        });
    }

    Ok(())
}

/// Whether a declared content type names a PDF
pub fn is_pdf_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    PDF_MEDIA_TYPES.contains(&essence.as_str())
}

/// Whether the bytes carry the PDF header near the start
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(MAGIC_SEARCH_WINDOW)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

/// Parse a PDF and return its normalized text
pub fn extract_text(bytes: &[u8], limits: &VerifierLimits) -> Result<ExtractedText, ExtractionError> {
    // lopdf can panic on hostile input
    panic::catch_unwind(AssertUnwindSafe(|| extract_text_inner(bytes, limits)))
        .unwrap_or(Err(ExtractionError::ParserPanic))
}

fn extract_text_inner(bytes: &[u8], limits: &VerifierLimits) -> Result<ExtractedText, ExtractionError> {
    let started = Instant::now();
    check_raw_streams(bytes, limits.max_decompressed_bytes)?;
    let mut document = Document::load_mem(bytes)?;

    if document.is_encrypted() {
        // permission-only encryption opens with an empty user password
        document.decrypt("").map_err(|_| ExtractionError::Encrypted)?;
        check_document_streams(&document, limits.max_decompressed_bytes)?;
        debug!("opened encrypted receipt with the empty user password");
    }

    let pages = document.get_pages();
    if pages.is_empty() {
        return Err(ExtractionError::NoPages);
    }
    if pages.len() > limits.max_pages {
        return Err(ExtractionError::TooManyPages {
            pages: pages.len(),
            max: limits.max_pages,
        });
    }

    let mut raw = String::new();
    for page_number in pages.keys() {
        if started.elapsed() > limits.parse_budget {
            return Err(ExtractionError::BudgetExceeded(limits.parse_budget));
        }

        let page_text = document.extract_text(&[*page_number])?;
        raw.push_str(&page_text);
        raw.push('\n');

        if raw.chars().count() > limits.max_text_chars {
            return Err(ExtractionError::TextLimitExceeded(limits.max_text_chars));
        }
    }

    if started.elapsed() > limits.parse_budget {
        return Err(ExtractionError::BudgetExceeded(limits.parse_budget));
    }

    let text = ExtractedText::from_raw(&raw);
    if text.is_empty() {
        return Err(ExtractionError::NoText);
    }

    debug!(
        pages = pages.len(),
        chars = text.as_str().len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "extracted receipt text"
    );
    Ok(text)
}
