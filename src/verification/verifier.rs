//! Receipt verifier: screening, extraction and the four fact checks

use tracing::{debug, info, warn};

use crate::traits::ReceiptVerifier;
use crate::types::*;
use crate::verification::amount::{find_amount, scan_amounts};
use crate::verification::extract::{extract_text, screen_document, VerifierLimits};
use crate::verification::normalize::{contains_any_variant, contains_digit_run};

/// Number of found amounts echoed back in an amount mismatch
const REPORTED_AMOUNTS: usize = 10;

/// Default verifier for PDF bank receipts
#[derive(Debug, Clone, Default)]
pub struct PdfReceiptVerifier {
    limits: VerifierLimits,
}

impl PdfReceiptVerifier {
    /// Create a verifier with the given resource ceilings
    pub fn new(limits: VerifierLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &VerifierLimits {
        &self.limits
    }
}

impl ReceiptVerifier for PdfReceiptVerifier {
    fn verify(&self, document: &ReceiptDocument, expected: &ExpectedPaymentFacts) -> VerificationResult {
        if let Err(failure) = screen_document(document, &self.limits) {
            warn!(
                file = document.file_name(),
                size = document.size(),
                content_type = document.content_type(),
                failure = %failure,
                "receipt rejected before extraction"
            );
            return VerificationResult::rejected(failure);
        }

        let text = match extract_text(document.bytes(), &self.limits) {
            Ok(text) => text,
            Err(e) => {
                warn!(file = document.file_name(), error = %e, "receipt text extraction failed");
                return VerificationResult::rejected(CheckFailure::UnreadableDocument {
                    reason: e.to_string(),
                });
            }
        };

        let result = verify_text(&text, expected);
        if result.passed() {
            info!(file = document.file_name(), "receipt passed verification");
        } else {
            warn!(
                file = document.file_name(),
                failures = ?result.messages(),
                "receipt failed verification"
            );
        }
        result
    }
}

/// Run every fact check against extracted text
///
/// All four checks always run so the caller sees every problem at once.
/// Failures are reported in the order amount, recipient name, tax ID, bank.
pub fn verify_text(text: &ExtractedText, expected: &ExpectedPaymentFacts) -> VerificationResult {
    let failures: Vec<CheckFailure> = [
        check_amount(text, expected),
        check_recipient_name(text, expected),
        check_tax_id(text, expected),
        check_bank(text, expected),
    ]
    .into_iter()
    .flatten()
    .collect();

    VerificationResult::from_failures(failures)
}

fn check_amount(text: &ExtractedText, expected: &ExpectedPaymentFacts) -> Option<CheckFailure> {
    let tokens = scan_amounts(text.as_str());
    if let Some(token) = find_amount(&tokens, expected.amount()) {
        debug!(amount = %token.raw, "found expected amount");
        return None;
    }

    let mut found: Vec<String> = Vec::new();
    for token in &tokens {
        if found.len() == REPORTED_AMOUNTS {
            break;
        }
        if !found.contains(&token.raw) {
            found.push(token.raw.clone());
        }
    }
    Some(CheckFailure::AmountMismatch { found })
}

fn check_recipient_name(text: &ExtractedText, expected: &ExpectedPaymentFacts) -> Option<CheckFailure> {
    match contains_any_variant(text.as_str(), expected.recipient_name_variants()) {
        Some(variant) => {
            debug!(variant, "found recipient name");
            None
        }
        None => Some(CheckFailure::RecipientNameMismatch),
    }
}

fn check_tax_id(text: &ExtractedText, expected: &ExpectedPaymentFacts) -> Option<CheckFailure> {
    if contains_digit_run(text.as_str(), expected.recipient_tax_id()) {
        debug!(tax_id = expected.recipient_tax_id(), "found recipient tax ID");
        None
    } else {
        Some(CheckFailure::TaxIdMismatch)
    }
}

fn check_bank(text: &ExtractedText, expected: &ExpectedPaymentFacts) -> Option<CheckFailure> {
    match contains_any_variant(text.as_str(), expected.recipient_bank_variants()) {
        Some(variant) => {
            debug!(variant, "found recipient bank");
            None
        }
        None => Some(CheckFailure::BankMismatch),
    }
}
