//! # Registration Core
//!
//! Conference registration backend core: registration intake, bank receipt
//! verification, and receipt storage for the admin dashboard.
//!
//! ## Features
//!
//! - **Receipt verification**: PDF text extraction with resource ceilings and
//!   exhaustive checks of amount, recipient, tax ID and bank
//! - **Structured failures**: every failed check is reported as a typed
//!   [`CheckFailure`], serializable as a JSON array
//! - **Registration desk**: intake validation, payment completion with
//!   bounded blocking verification, admin stats and receipt download
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use registration_core::{ExtractedText, ExpectedPaymentFacts, verify_text};
//! use bigdecimal::BigDecimal;
//!
//! let expected = ExpectedPaymentFacts::new(
//!     BigDecimal::from(500),
//!     ["церковь слово жизни"],
//!     "6453041398",
//!     ["сбербанк"],
//! )
//! .unwrap();
//!
//! let text = ExtractedText::from_raw("400 руб Церковь Слово Жизни ИНН 6453041398 ПАО СБЕРБАНК");
//! let result = verify_text(&text, &expected);
//! assert_eq!(result.messages(), vec!["amount mismatch".to_string()]);
//! ```

pub mod config;
pub mod registration;
pub mod traits;
pub mod types;
pub mod utils;
pub mod verification;

// Re-export commonly used types
pub use config::*;
pub use registration::*;
pub use traits::*;
pub use types::*;
pub use verification::{verify_text, PdfReceiptVerifier, VerifierLimits};
