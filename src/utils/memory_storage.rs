//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementation for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    registrations: Arc<RwLock<HashMap<Uuid, Registration>>>,
    receipts: Arc<RwLock<HashMap<Uuid, PaymentReceipt>>>,
    contents: Arc<RwLock<HashMap<Uuid, Vec<u8>>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> RegistrationResult<()> {
        write(&self.registrations)?.clear();
        write(&self.receipts)?.clear();
        write(&self.contents)?.clear();
        Ok(())
    }

    /// Number of stored receipts
    pub fn receipt_count(&self) -> RegistrationResult<usize> {
        Ok(read(&self.receipts)?.len())
    }
}

fn read<T>(lock: &RwLock<T>) -> RegistrationResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| RegistrationError::Storage("lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> RegistrationResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| RegistrationError::Storage("lock poisoned".to_string()))
}

#[async_trait]
impl RegistrationStorage for MemoryStorage {
    async fn save_registration(&mut self, registration: &Registration) -> RegistrationResult<()> {
        write(&self.registrations)?.insert(registration.id, registration.clone());
        Ok(())
    }

    async fn get_registration(&self, id: Uuid) -> RegistrationResult<Option<Registration>> {
        Ok(read(&self.registrations)?.get(&id).cloned())
    }

    async fn list_registrations(&self) -> RegistrationResult<Vec<Registration>> {
        Ok(read(&self.registrations)?.values().cloned().collect())
    }

    async fn update_registration(&mut self, registration: &Registration) -> RegistrationResult<()> {
        let mut registrations = write(&self.registrations)?;
        match registrations.get_mut(&registration.id) {
            Some(existing) => {
                *existing = registration.clone();
                Ok(())
            }
            None => Err(RegistrationError::RegistrationNotFound(registration.id)),
        }
    }

    async fn save_receipt(&mut self, receipt: &PaymentReceipt, content: Vec<u8>) -> RegistrationResult<()> {
        if !read(&self.registrations)?.contains_key(&receipt.registration_id) {
            return Err(RegistrationError::RegistrationNotFound(receipt.registration_id));
        }

        let mut receipts = write(&self.receipts)?;
        if receipts
            .values()
            .any(|existing| existing.registration_id == receipt.registration_id)
        {
            return Err(RegistrationError::Storage(format!(
                "Registration {} already has a receipt",
                receipt.registration_id
            )));
        }

        receipts.insert(receipt.id, receipt.clone());
        write(&self.contents)?.insert(receipt.id, content);
        Ok(())
    }

    async fn delete_receipt(&mut self, receipt_id: Uuid) -> RegistrationResult<()> {
        write(&self.receipts)?.remove(&receipt_id);
        write(&self.contents)?.remove(&receipt_id);
        Ok(())
    }

    async fn get_receipt(&self, registration_id: Uuid) -> RegistrationResult<Option<PaymentReceipt>> {
        Ok(read(&self.receipts)?
            .values()
            .find(|receipt| receipt.registration_id == registration_id)
            .cloned())
    }

    async fn get_receipt_content(&self, receipt_id: Uuid) -> RegistrationResult<Option<Vec<u8>>> {
        Ok(read(&self.contents)?.get(&receipt_id).cloned())
    }

    async fn registration_stats(&self) -> RegistrationResult<RegistrationStats> {
        let registrations = read(&self.registrations)?;
        let completed = registrations.values().filter(|r| r.is_completed()).count();

        Ok(RegistrationStats {
            total: registrations.len(),
            completed,
            pending: registrations.len() - completed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn registration() -> Registration {
        let request = RegistrationRequest {
            first_name: "Анна".to_string(),
            last_name: "Смирнова".to_string(),
            ..RegistrationRequest::default()
        };
        Registration::new(request, NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(), Role::Minister)
    }

    fn receipt_for(registration: &Registration) -> PaymentReceipt {
        PaymentReceipt {
            id: Uuid::new_v4(),
            registration_id: registration.id,
            donation_amount: BigDecimal::from(500),
            file_name: "check.pdf".to_string(),
            stored_name: "stored.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            file_size: 3,
            verified: true,
            paid: true,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[tokio::test]
    async fn test_registration_round_trip_and_stats() {
        let mut storage = MemoryStorage::new();
        let mut registration = registration();
        storage.save_registration(&registration).await.unwrap();

        let stats = storage.registration_stats().await.unwrap();
        assert_eq!(stats, RegistrationStats { total: 1, completed: 0, pending: 1 });

        registration.complete();
        storage.update_registration(&registration).await.unwrap();

        let stored = storage.get_registration(registration.id).await.unwrap().unwrap();
        assert!(stored.is_completed());
        assert_eq!(storage.registration_stats().await.unwrap().completed, 1);
    }

    #[tokio::test]
    async fn test_update_unknown_registration_fails() {
        let mut storage = MemoryStorage::new();
        let result = storage.update_registration(&registration()).await;
        assert!(matches!(result, Err(RegistrationError::RegistrationNotFound(_))));
    }

    #[tokio::test]
    async fn test_receipt_storage() {
        let mut storage = MemoryStorage::new();
        let registration = registration();
        storage.save_registration(&registration).await.unwrap();

        let receipt = receipt_for(&registration);
        storage.save_receipt(&receipt, b"pdf".to_vec()).await.unwrap();

        let found = storage.get_receipt(registration.id).await.unwrap().unwrap();
        assert_eq!(found.id, receipt.id);
        assert_eq!(
            storage.get_receipt_content(receipt.id).await.unwrap(),
            Some(b"pdf".to_vec())
        );

        // one receipt per registration
        let second = receipt_for(&registration);
        assert!(storage.save_receipt(&second, b"pdf".to_vec()).await.is_err());

        // a deleted receipt frees the slot
        storage.delete_receipt(receipt.id).await.unwrap();
        assert!(storage.get_receipt(registration.id).await.unwrap().is_none());
        assert_eq!(storage.get_receipt_content(receipt.id).await.unwrap(), None);
        storage.save_receipt(&second, b"pdf".to_vec()).await.unwrap();
        storage.delete_receipt(Uuid::new_v4()).await.unwrap();

        storage.clear().unwrap();
        assert_eq!(storage.receipt_count().unwrap(), 0);
    }
}
