//! Core types and data structures for registration and receipt verification

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::verification::normalize::normalize_text;

/// Payment facts a receipt must prove before a registration is completed
///
/// Built once from configuration and shared for the lifetime of the
/// application. Variants are matched case- and whitespace-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpectedPaymentFacts {
    amount: BigDecimal,
    recipient_name_variants: BTreeSet<String>,
    recipient_tax_id: String,
    recipient_bank_variants: BTreeSet<String>,
}

impl ExpectedPaymentFacts {
    /// Create a new set of expected facts, rejecting anything that could
    /// make a check vacuous (empty variants, blank strings, non-digit tax IDs)
    pub fn new<N, B>(
        amount: BigDecimal,
        recipient_name_variants: N,
        recipient_tax_id: impl Into<String>,
        recipient_bank_variants: B,
    ) -> RegistrationResult<Self>
    where
        N: IntoIterator,
        N::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        if amount <= BigDecimal::from(0) {
            return Err(RegistrationError::Config(
                "Expected payment amount must be positive".to_string(),
            ));
        }

        let recipient_name_variants = collect_variants("recipient name", recipient_name_variants)?;
        let recipient_bank_variants = collect_variants("recipient bank", recipient_bank_variants)?;

        let recipient_tax_id = recipient_tax_id.into().trim().to_string();
        if recipient_tax_id.is_empty() || !recipient_tax_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(RegistrationError::Config(format!(
                "Recipient tax ID must be a non-empty digit string, got '{}'",
                recipient_tax_id
            )));
        }

        Ok(Self {
            amount,
            recipient_name_variants,
            recipient_tax_id,
            recipient_bank_variants,
        })
    }

    /// Expected donation amount
    pub fn amount(&self) -> &BigDecimal {
        &self.amount
    }

    /// Acceptable spellings of the recipient's name
    pub fn recipient_name_variants(&self) -> &BTreeSet<String> {
        &self.recipient_name_variants
    }

    /// Recipient tax ID (INN) as a digit string
    pub fn recipient_tax_id(&self) -> &str {
        &self.recipient_tax_id
    }

    /// Acceptable spellings of the recipient's bank
    pub fn recipient_bank_variants(&self) -> &BTreeSet<String> {
        &self.recipient_bank_variants
    }
}

fn collect_variants<I>(label: &str, variants: I) -> RegistrationResult<BTreeSet<String>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut collected = BTreeSet::new();
    for variant in variants {
        let variant: String = variant.into();
        if normalize_text(&variant).is_empty() {
            return Err(RegistrationError::Config(format!(
                "Blank {} variant",
                label
            )));
        }
        collected.insert(variant.trim().to_string());
    }

    if collected.is_empty() {
        return Err(RegistrationError::Config(format!(
            "At least one {} variant is required",
            label
        )));
    }

    Ok(collected)
}

/// An uploaded payment receipt, held only for the duration of one verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptDocument {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl ReceiptDocument {
    /// Wrap uploaded bytes together with the client-declared metadata
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Original file name as supplied by the client
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Declared media type as supplied by the client
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Raw document bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Document size in bytes
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Take ownership of the raw bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Normalized text pulled out of a receipt
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedText(String);

impl ExtractedText {
    /// Normalize raw extracted text (lowercase, folded punctuation, collapsed whitespace)
    pub fn from_raw(raw: &str) -> Self {
        Self(normalize_text(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single reason a receipt was not accepted
///
/// Serialized as `{"code": ..., "message": ..., <details>}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckFailure {
    /// The document could not be parsed or yielded no text
    UnreadableDocument { reason: String },
    /// No numeric token equal to the expected amount was found
    AmountMismatch { found: Vec<String> },
    /// None of the recipient name variants appear in the text
    RecipientNameMismatch,
    /// The recipient tax ID does not appear in the text
    TaxIdMismatch,
    /// None of the bank name variants appear in the text
    BankMismatch,
    /// The document exceeds the size ceiling
    OversizedDocument { size: usize, max: usize },
    /// Declared media type or magic bytes are not PDF
    UnsupportedMediaType { declared: String },
}

impl CheckFailure {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            CheckFailure::UnreadableDocument { .. } => "unreadable_document",
            CheckFailure::AmountMismatch { .. } => "amount_mismatch",
            CheckFailure::RecipientNameMismatch => "recipient_name_mismatch",
            CheckFailure::TaxIdMismatch => "tax_id_mismatch",
            CheckFailure::BankMismatch => "bank_mismatch",
            CheckFailure::OversizedDocument { .. } => "oversized_document",
            CheckFailure::UnsupportedMediaType { .. } => "unsupported_media_type",
        }
    }

    /// Human-readable description
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl Serialize for CheckFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("code", self.code())?;
        map.serialize_entry("message", &self.message())?;
        match self {
            CheckFailure::UnreadableDocument { reason } => map.serialize_entry("reason", reason)?,
            CheckFailure::AmountMismatch { found } => map.serialize_entry("found", found)?,
            CheckFailure::OversizedDocument { size, max } => {
                map.serialize_entry("size", size)?;
                map.serialize_entry("max", max)?;
            }
            CheckFailure::UnsupportedMediaType { declared } => map.serialize_entry("declared", declared)?,
            CheckFailure::RecipientNameMismatch | CheckFailure::TaxIdMismatch | CheckFailure::BankMismatch => {}
        }
        map.end()
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckFailure::UnreadableDocument { .. } => write!(f, "unreadable document"),
            CheckFailure::AmountMismatch { .. } => write!(f, "amount mismatch"),
            CheckFailure::RecipientNameMismatch => write!(f, "recipient name not found"),
            CheckFailure::TaxIdMismatch => write!(f, "recipient tax ID not found"),
            CheckFailure::BankMismatch => write!(f, "recipient bank not found"),
            CheckFailure::OversizedDocument { .. } => write!(f, "oversized document"),
            CheckFailure::UnsupportedMediaType { .. } => write!(f, "unsupported media type"),
        }
    }
}

/// Outcome of verifying one receipt
///
/// `passed` is true exactly when `failed_checks` is empty; the fields are
/// only reachable through [`VerificationResult::from_failures`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    passed: bool,
    failed_checks: Vec<CheckFailure>,
}

impl VerificationResult {
    /// Build a result from the collected failures
    pub fn from_failures(failed_checks: Vec<CheckFailure>) -> Self {
        Self {
            passed: failed_checks.is_empty(),
            failed_checks,
        }
    }

    /// A result consisting of a single short-circuiting failure
    pub fn rejected(failure: CheckFailure) -> Self {
        Self::from_failures(vec![failure])
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn failed_checks(&self) -> &[CheckFailure] {
        &self.failed_checks
    }

    /// Failure descriptions in check order
    pub fn messages(&self) -> Vec<String> {
        self.failed_checks.iter().map(CheckFailure::message).collect()
    }
}

/// Participant role at the conference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Teen participant ("подросток")
    Teen,
    /// Minister / volunteer ("служитель")
    Minister,
}

impl Role {
    /// Parse the role as submitted by the registration form
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "подросток" | "teen" => Some(Role::Teen),
            "служитель" | "minister" => Some(Role::Minister),
            _ => None,
        }
    }
}

/// Registration form payload as received from the client
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Birth date in `dd/mm/yyyy` form
    pub birth_date: String,
    pub phone: String,
    pub telegram: String,
    pub city: String,
    pub need_accommodation: bool,
    pub church: Option<String>,
    pub role: String,
    pub parent_full_name: Option<String>,
    pub parent_phone: Option<String>,
    pub was_before: bool,
    pub consent_under_14: bool,
    pub consent_donation: bool,
    pub consent_personal_data: bool,
}

/// A conference registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub phone: String,
    pub telegram: String,
    pub city: String,
    pub need_accommodation: bool,
    pub church: Option<String>,
    pub role: Role,
    pub parent_full_name: Option<String>,
    pub parent_phone: Option<String>,
    pub was_before: bool,
    pub consent_under_14: bool,
    pub consent_donation: bool,
    pub consent_personal_data: bool,
    /// When the registration was created
    pub created_at: NaiveDateTime,
    /// When payment was verified; `None` while pending
    pub completed_at: Option<NaiveDateTime>,
}

impl Registration {
    /// Build a registration from an already validated request
    pub fn new(request: RegistrationRequest, birth_date: NaiveDate, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email: request.email.trim().to_string(),
            birth_date,
            phone: request.phone.trim().to_string(),
            telegram: request.telegram.trim().to_string(),
            city: request.city.trim().to_string(),
            need_accommodation: request.need_accommodation,
            church: request.church,
            role,
            parent_full_name: request.parent_full_name,
            parent_phone: request.parent_phone,
            was_before: request.was_before,
            consent_under_14: request.consent_under_14,
            consent_donation: request.consent_donation,
            consent_personal_data: request.consent_personal_data,
            created_at: chrono::Utc::now().naive_utc(),
            completed_at: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Mark the registration as paid
    pub fn complete(&mut self) {
        self.completed_at = Some(chrono::Utc::now().naive_utc());
    }
}

/// Metadata of a verified and stored payment receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub donation_amount: BigDecimal,
    /// File name as uploaded
    pub file_name: String,
    /// Name the receipt is stored under
    pub stored_name: String,
    pub content_type: String,
    pub file_size: usize,
    pub verified: bool,
    pub paid: bool,
    pub created_at: NaiveDateTime,
}

/// Registration counts for the admin dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistrationStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

/// One page of registrations for the admin dashboard, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationPage {
    pub registrations: Vec<Registration>,
    /// Registrations across all pages
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Errors that can occur in the registration system
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Registration not found: {0}")]
    RegistrationNotFound(Uuid),
    #[error("Receipt not found for registration: {0}")]
    ReceiptNotFound(Uuid),
    #[error("Registration already completed: {0}")]
    AlreadyCompleted(Uuid),
    #[error("Invalid registration: {} problem(s)", .0.len())]
    InvalidRegistration(Vec<String>),
    #[error("Receipt rejected: {} failed check(s)", .0.failed_checks().len())]
    ReceiptRejected(VerificationResult),
    #[error("Receipt verification timed out")]
    VerificationTimedOut,
    #[error("Receipt verification aborted: {0}")]
    VerificationAborted(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Notification error: {0}")]
    Notification(String),
}

/// Result type for registration operations
pub type RegistrationResult<T> = Result<T, RegistrationError>;
