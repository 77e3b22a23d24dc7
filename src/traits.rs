//! Traits for storage, verification, validation and notification seams

use async_trait::async_trait;
use uuid::Uuid;

use crate::types::*;
use crate::utils::validation::validate_registration_request;

/// Storage abstraction for registrations and receipts
///
/// This trait allows the registration core to work with any storage backend
/// (PostgreSQL, SQLite, in-memory, etc.) by implementing these methods.
#[async_trait]
pub trait RegistrationStorage: Send + Sync {
    /// Save a new registration
    async fn save_registration(&mut self, registration: &Registration) -> RegistrationResult<()>;

    /// Get a registration by ID
    async fn get_registration(&self, id: Uuid) -> RegistrationResult<Option<Registration>>;

    /// List all registrations
    async fn list_registrations(&self) -> RegistrationResult<Vec<Registration>>;

    /// Update an existing registration
    async fn update_registration(&mut self, registration: &Registration) -> RegistrationResult<()>;

    /// Save a verified receipt together with its bytes
    async fn save_receipt(&mut self, receipt: &PaymentReceipt, content: Vec<u8>) -> RegistrationResult<()>;

    /// Remove a stored receipt and its bytes; removing an unknown receipt is
    /// not an error
    async fn delete_receipt(&mut self, receipt_id: Uuid) -> RegistrationResult<()>;

    /// Get the receipt attached to a registration
    async fn get_receipt(&self, registration_id: Uuid) -> RegistrationResult<Option<PaymentReceipt>>;

    /// Get the stored bytes of a receipt
    async fn get_receipt_content(&self, receipt_id: Uuid) -> RegistrationResult<Option<Vec<u8>>>;

    /// Count registrations by completion state
    async fn registration_stats(&self) -> RegistrationResult<RegistrationStats>;
}

/// Decides whether an uploaded receipt proves the expected payment
///
/// Implementations must be pure: the same document and facts always give the
/// same result. Calls may block on CPU-bound parsing.
pub trait ReceiptVerifier: Send + Sync {
    fn verify(&self, document: &ReceiptDocument, expected: &ExpectedPaymentFacts) -> VerificationResult;
}

/// Trait for implementing custom registration validation rules
pub trait RegistrationValidator: Send + Sync {
    /// Validate a registration request before it is stored, reporting every
    /// violation at once
    fn validate_request(&self, request: &RegistrationRequest) -> RegistrationResult<()>;
}

/// Default registration validator with the conference intake rules
pub struct DefaultRegistrationValidator;

impl RegistrationValidator for DefaultRegistrationValidator {
    fn validate_request(&self, request: &RegistrationRequest) -> RegistrationResult<()> {
        let today = chrono::Utc::now().date_naive();
        let problems = validate_registration_request(request, today);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(RegistrationError::InvalidRegistration(problems))
        }
    }
}

/// Outbound notifications (confirmation emails)
#[async_trait]
pub trait PaymentNotifier: Send + Sync {
    /// Sent once a registration is stored
    async fn send_registration_confirmation(&self, registration: &Registration) -> RegistrationResult<()>;

    /// Sent once a receipt is verified and the registration completed
    async fn send_payment_confirmation(
        &self,
        registration: &Registration,
        receipt: &PaymentReceipt,
    ) -> RegistrationResult<()>;
}

/// Notifier that sends nothing
pub struct NoopNotifier;

#[async_trait]
impl PaymentNotifier for NoopNotifier {
    async fn send_registration_confirmation(&self, _registration: &Registration) -> RegistrationResult<()> {
        Ok(())
    }

    async fn send_payment_confirmation(
        &self,
        _registration: &Registration,
        _receipt: &PaymentReceipt,
    ) -> RegistrationResult<()> {
        Ok(())
    }
}
