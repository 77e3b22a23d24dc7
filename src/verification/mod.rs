//! Receipt verification: screening, PDF text extraction and fact checks

pub mod amount;
pub mod extract;
pub mod inflate;
pub mod normalize;
pub mod verifier;

pub use amount::{find_amount, parse_amount, scan_amounts, AmountToken};
pub use extract::{extract_text, screen_document, ExtractionError, VerifierLimits};
pub use normalize::normalize_text;
pub use verifier::{verify_text, PdfReceiptVerifier};
