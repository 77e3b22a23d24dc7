//! Registration desk: intake, payment completion and admin queries

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, DeskLimits};
use crate::registration::receipt::stored_receipt_name;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::parse_birth_date;
use crate::verification::PdfReceiptVerifier;

/// Main registration system that coordinates storage, verification and
/// notification
pub struct RegistrationDesk<S: RegistrationStorage> {
    storage: S,
    expected: Arc<ExpectedPaymentFacts>,
    verifier: Arc<dyn ReceiptVerifier>,
    validator: Arc<dyn RegistrationValidator>,
    notifier: Arc<dyn PaymentNotifier>,
    verification_slots: Arc<Semaphore>,
    limits: DeskLimits,
}

/// Clones share the verification slots, so the concurrency bound holds
/// across every handle of the same desk
impl<S: RegistrationStorage + Clone> Clone for RegistrationDesk<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            expected: Arc::clone(&self.expected),
            verifier: Arc::clone(&self.verifier),
            validator: Arc::clone(&self.validator),
            notifier: Arc::clone(&self.notifier),
            verification_slots: Arc::clone(&self.verification_slots),
            limits: self.limits.clone(),
        }
    }
}

impl<S: RegistrationStorage> RegistrationDesk<S> {
    /// Create a desk with the default PDF verifier, validator and no notifications
    pub fn new(storage: S, config: AppConfig) -> Self {
        Self::with_components(
            storage,
            config.expected_facts,
            config.desk_limits,
            Arc::new(PdfReceiptVerifier::new(config.verifier_limits)),
            Arc::new(DefaultRegistrationValidator),
            Arc::new(NoopNotifier),
        )
    }

    /// Create a desk with custom collaborators
    pub fn with_components(
        storage: S,
        expected: ExpectedPaymentFacts,
        limits: DeskLimits,
        verifier: Arc<dyn ReceiptVerifier>,
        validator: Arc<dyn RegistrationValidator>,
        notifier: Arc<dyn PaymentNotifier>,
    ) -> Self {
        Self {
            storage,
            expected: Arc::new(expected),
            verifier,
            validator,
            notifier,
            verification_slots: Arc::new(Semaphore::new(limits.max_concurrent_verifications.max(1))),
            limits,
        }
    }

    /// Replace the notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn PaymentNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Facts every receipt is checked against
    pub fn expected_facts(&self) -> &ExpectedPaymentFacts {
        &self.expected
    }

    // Intake
    /// Validate and store a new registration, then send the confirmation
    pub async fn create_registration(&mut self, request: RegistrationRequest) -> RegistrationResult<Registration> {
        self.validator.validate_request(&request)?;

        let birth_date = parse_birth_date(&request.birth_date).ok_or_else(|| {
            RegistrationError::InvalidRegistration(vec!["Birth date must be in dd/mm/yyyy format".to_string()])
        })?;
        let role = Role::parse(&request.role).ok_or_else(|| {
            RegistrationError::InvalidRegistration(vec![format!("Unknown role '{}'", request.role)])
        })?;

        let registration = Registration::new(request, birth_date, role);
        self.storage.save_registration(&registration).await?;
        info!(registration_id = %registration.id, "registration created");

        if let Err(e) = self.notifier.send_registration_confirmation(&registration).await {
            error!(
                registration_id = %registration.id,
                error = %e,
                "registration confirmation not sent, registration kept"
            );
        }

        Ok(registration)
    }

    // Payment completion
    /// Verify an uploaded receipt and, if it passes, store it and complete the
    /// registration
    ///
    /// A rejected receipt is returned as [`RegistrationError::ReceiptRejected`]
    /// with every failed check; nothing is stored in that case.
    pub async fn complete_payment(
        &mut self,
        registration_id: Uuid,
        document: ReceiptDocument,
    ) -> RegistrationResult<PaymentReceipt> {
        let mut registration = self.get_registration_required(registration_id).await?;
        if registration.is_completed() {
            return Err(RegistrationError::AlreadyCompleted(registration_id));
        }

        info!(
            %registration_id,
            file = document.file_name(),
            size = document.size(),
            "verifying payment receipt"
        );
        let (result, document) = self.run_verification(document).await?;
        if !result.passed() {
            warn!(
                %registration_id,
                failures = ?result.messages(),
                "payment receipt rejected"
            );
            return Err(RegistrationError::ReceiptRejected(result));
        }

        let now = chrono::Utc::now().naive_utc();
        let receipt = PaymentReceipt {
            id: Uuid::new_v4(),
            registration_id,
            donation_amount: self.expected.amount().clone(),
            file_name: document.file_name().to_string(),
            stored_name: stored_receipt_name(&registration, document.file_name(), now),
            content_type: document.content_type().to_string(),
            file_size: document.size(),
            verified: true,
            paid: true,
            created_at: now,
        };

        self.storage.save_receipt(&receipt, document.into_bytes()).await?;
        registration.complete();
        if let Err(e) = self.storage.update_registration(&registration).await {
            // a stored receipt on a pending registration would block every retry
            if let Err(rollback) = self.storage.delete_receipt(receipt.id).await {
                error!(
                    %registration_id,
                    receipt_id = %receipt.id,
                    error = %rollback,
                    "receipt left behind after failed completion"
                );
            }
            return Err(e);
        }
        info!(%registration_id, receipt_id = %receipt.id, "registration completed");

        if let Err(e) = self.notifier.send_payment_confirmation(&registration, &receipt).await {
            error!(
                %registration_id,
                error = %e,
                "payment confirmation not sent, registration stays completed"
            );
        }

        Ok(receipt)
    }

    /// Run the blocking verifier on the blocking pool, bounded by the
    /// verification slots and the host-level timeout
    async fn run_verification(
        &self,
        document: ReceiptDocument,
    ) -> RegistrationResult<(VerificationResult, ReceiptDocument)> {
        let permit = self
            .verification_slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| RegistrationError::VerificationAborted(e.to_string()))?;

        let verifier = Arc::clone(&self.verifier);
        let expected = Arc::clone(&self.expected);
        // the slot is held until the parse actually finishes, even after a timeout
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let result = verifier.verify(&document, &expected);
            (result, document)
        });

        match tokio::time::timeout(self.limits.verification_timeout, task).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => Err(RegistrationError::VerificationAborted(e.to_string())),
            Err(_) => {
                warn!(
                    timeout_ms = self.limits.verification_timeout.as_millis() as u64,
                    "receipt verification timed out"
                );
                Err(RegistrationError::VerificationTimedOut)
            }
        }
    }

    // Admin queries
    /// Get a registration by ID
    pub async fn get_registration(&self, id: Uuid) -> RegistrationResult<Option<Registration>> {
        self.storage.get_registration(id).await
    }

    /// Get a registration by ID, returning an error if not found
    pub async fn get_registration_required(&self, id: Uuid) -> RegistrationResult<Registration> {
        self.storage
            .get_registration(id)
            .await?
            .ok_or(RegistrationError::RegistrationNotFound(id))
    }

    /// List registrations, newest first
    pub async fn list_registrations(&self) -> RegistrationResult<Vec<Registration>> {
        let mut registrations = self.storage.list_registrations().await?;
        registrations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(registrations)
    }

    /// A window of at most `limit` registrations starting at `offset`,
    /// newest first
    pub async fn list_registrations_page(&self, offset: usize, limit: usize) -> RegistrationResult<RegistrationPage> {
        let registrations = self.list_registrations().await?;
        let total = registrations.len();
        Ok(RegistrationPage {
            registrations: registrations.into_iter().skip(offset).take(limit).collect(),
            total,
            offset,
            limit,
        })
    }

    /// Total, completed and pending registration counts
    pub async fn registration_stats(&self) -> RegistrationResult<RegistrationStats> {
        self.storage.registration_stats().await
    }

    /// Receipt metadata and bytes for download
    pub async fn receipt_for_registration(
        &self,
        registration_id: Uuid,
    ) -> RegistrationResult<(PaymentReceipt, Vec<u8>)> {
        let receipt = self
            .storage
            .get_receipt(registration_id)
            .await?
            .ok_or(RegistrationError::ReceiptNotFound(registration_id))?;
        let content = self
            .storage
            .get_receipt_content(receipt.id)
            .await?
            .ok_or(RegistrationError::ReceiptNotFound(registration_id))?;
        Ok((receipt, content))
    }
}
