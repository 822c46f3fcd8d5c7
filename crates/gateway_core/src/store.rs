//! Durable mapping between provider-side identities (customers, profiles)
//! and the host platform. Provider ids are the natural keys; rows carry a
//! local surrogate id so customers can reference their profile row.

use commerce_types::Mode;
use error_stack::report;

use crate::errors::{CustomResult, StorageError};

pub mod memory;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomerRow {
    pub local_id: i64,
    pub provider_id: String,
    pub profile_local_id: Option<i64>,
    pub mode: Mode,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCustomer {
    pub provider_id: String,
    pub profile_local_id: Option<i64>,
    pub mode: Mode,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileRow {
    pub local_id: i64,
    pub provider_id: String,
    pub mode: Mode,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewProfile {
    pub provider_id: String,
    pub mode: Mode,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Denormalized provider customer previously seen for a host user, most
/// recently linked first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkedCustomer {
    pub provider_id: String,
    pub mode: Mode,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Storage contract for identity rows. `insert_*` must reject an empty
/// provider id and must surface a duplicate provider id as
/// [`StorageError::UniqueViolation`]; the provided `get_or_insert_*` and
/// `save_*` methods rely on both to stay race-safe.
#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get_customer(&self, provider_id: &str)
        -> CustomResult<Option<CustomerRow>, StorageError>;
    async fn insert_customer(&self, new: &NewCustomer) -> CustomResult<i64, StorageError>;
    async fn update_customer(&self, new: &NewCustomer) -> CustomResult<(), StorageError>;
    /// Records that a host user owns a provider customer. Idempotent.
    async fn connect_customer_to_user(
        &self,
        customer_local_id: i64,
        user_id: u64,
    ) -> CustomResult<(), StorageError>;
    async fn customers_for_user(
        &self,
        user_id: u64,
    ) -> CustomResult<Vec<LinkedCustomer>, StorageError>;

    async fn get_profile(&self, provider_id: &str)
        -> CustomResult<Option<ProfileRow>, StorageError>;
    async fn insert_profile(&self, new: &NewProfile) -> CustomResult<i64, StorageError>;
    async fn update_profile(&self, new: &NewProfile) -> CustomResult<(), StorageError>;

    /// Returns the existing row's local id or inserts a fresh one. A unique
    /// violation from a concurrent insert resolves to the winner's row.
    async fn get_or_insert_customer(&self, new: &NewCustomer) -> CustomResult<i64, StorageError> {
        if new.provider_id.trim().is_empty() {
            return Err(report!(StorageError::MissingRequiredField {
                field_name: "customer.provider_id",
            }));
        }
        if let Some(row) = self.get_customer(&new.provider_id).await? {
            return Ok(row.local_id);
        }
        match self.insert_customer(new).await {
            Ok(local_id) => Ok(local_id),
            Err(error)
                if matches!(error.current_context(), StorageError::UniqueViolation { .. }) =>
            {
                self.get_customer(&new.provider_id)
                    .await?
                    .map(|row| row.local_id)
                    .ok_or_else(|| report!(StorageError::NotFound))
            }
            Err(error) => Err(error),
        }
    }

    /// Upserts: inserts when absent, otherwise refreshes the mutable columns.
    async fn save_customer(&self, new: &NewCustomer) -> CustomResult<i64, StorageError> {
        let local_id = self.get_or_insert_customer(new).await?;
        self.update_customer(new).await?;
        Ok(local_id)
    }

    async fn get_or_insert_profile(&self, new: &NewProfile) -> CustomResult<i64, StorageError> {
        if new.provider_id.trim().is_empty() {
            return Err(report!(StorageError::MissingRequiredField {
                field_name: "profile.provider_id",
            }));
        }
        if let Some(row) = self.get_profile(&new.provider_id).await? {
            return Ok(row.local_id);
        }
        match self.insert_profile(new).await {
            Ok(local_id) => Ok(local_id),
            Err(error)
                if matches!(error.current_context(), StorageError::UniqueViolation { .. }) =>
            {
                self.get_profile(&new.provider_id)
                    .await?
                    .map(|row| row.local_id)
                    .ok_or_else(|| report!(StorageError::NotFound))
            }
            Err(error) => Err(error),
        }
    }

    async fn save_profile(&self, new: &NewProfile) -> CustomResult<i64, StorageError> {
        let local_id = self.get_or_insert_profile(new).await?;
        self.update_profile(new).await?;
        Ok(local_id)
    }
}
