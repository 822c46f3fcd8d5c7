//! In-memory [`IdentityStore`] used by tests and single-process tooling.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use error_stack::report;

use super::{CustomerRow, IdentityStore, LinkedCustomer, NewCustomer, NewProfile, ProfileRow};
use crate::errors::{CustomResult, StorageError};

#[derive(Debug, Default)]
struct Inner {
    customers: HashMap<String, CustomerRow>,
    profiles: HashMap<String, ProfileRow>,
    /// user id -> customer local ids, in link order.
    user_links: HashMap<u64, Vec<i64>>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    inner: Mutex<Inner>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Lock poisoning only happens after a panic in another test thread.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get_customer(
        &self,
        provider_id: &str,
    ) -> CustomResult<Option<CustomerRow>, StorageError> {
        Ok(self.lock().customers.get(provider_id).cloned())
    }

    async fn insert_customer(&self, new: &NewCustomer) -> CustomResult<i64, StorageError> {
        if new.provider_id.trim().is_empty() {
            return Err(report!(StorageError::MissingRequiredField {
                field_name: "customer.provider_id",
            }));
        }
        let mut inner = self.lock();
        if inner.customers.contains_key(&new.provider_id) {
            return Err(report!(StorageError::UniqueViolation { entity: "customer" }));
        }
        let local_id = inner.next_id();
        inner.customers.insert(
            new.provider_id.clone(),
            CustomerRow {
                local_id,
                provider_id: new.provider_id.clone(),
                profile_local_id: new.profile_local_id,
                mode: new.mode,
                name: new.name.clone(),
                email: new.email.clone(),
            },
        );
        Ok(local_id)
    }

    async fn update_customer(&self, new: &NewCustomer) -> CustomResult<(), StorageError> {
        let mut inner = self.lock();
        let row = inner
            .customers
            .get_mut(&new.provider_id)
            .ok_or_else(|| report!(StorageError::NotFound))?;
        row.profile_local_id = new.profile_local_id.or(row.profile_local_id);
        row.mode = new.mode;
        row.name = new.name.clone().or_else(|| row.name.take());
        row.email = new.email.clone().or_else(|| row.email.take());
        Ok(())
    }

    async fn connect_customer_to_user(
        &self,
        customer_local_id: i64,
        user_id: u64,
    ) -> CustomResult<(), StorageError> {
        let mut inner = self.lock();
        let links = inner.user_links.entry(user_id).or_default();
        if !links.contains(&customer_local_id) {
            links.push(customer_local_id);
        }
        Ok(())
    }

    async fn customers_for_user(
        &self,
        user_id: u64,
    ) -> CustomResult<Vec<LinkedCustomer>, StorageError> {
        let inner = self.lock();
        let Some(links) = inner.user_links.get(&user_id) else {
            return Ok(Vec::new());
        };
        let mut linked = Vec::new();
        // Most recently linked first.
        for local_id in links.iter().rev() {
            if let Some(row) = inner.customers.values().find(|row| row.local_id == *local_id) {
                linked.push(LinkedCustomer {
                    provider_id: row.provider_id.clone(),
                    mode: row.mode,
                    name: row.name.clone(),
                    email: row.email.clone(),
                });
            }
        }
        Ok(linked)
    }

    async fn get_profile(
        &self,
        provider_id: &str,
    ) -> CustomResult<Option<ProfileRow>, StorageError> {
        Ok(self.lock().profiles.get(provider_id).cloned())
    }

    async fn insert_profile(&self, new: &NewProfile) -> CustomResult<i64, StorageError> {
        if new.provider_id.trim().is_empty() {
            return Err(report!(StorageError::MissingRequiredField {
                field_name: "profile.provider_id",
            }));
        }
        let mut inner = self.lock();
        if inner.profiles.contains_key(&new.provider_id) {
            return Err(report!(StorageError::UniqueViolation { entity: "profile" }));
        }
        let local_id = inner.next_id();
        inner.profiles.insert(
            new.provider_id.clone(),
            ProfileRow {
                local_id,
                provider_id: new.provider_id.clone(),
                mode: new.mode,
                name: new.name.clone(),
                email: new.email.clone(),
            },
        );
        Ok(local_id)
    }

    async fn update_profile(&self, new: &NewProfile) -> CustomResult<(), StorageError> {
        let mut inner = self.lock();
        let row = inner
            .profiles
            .get_mut(&new.provider_id)
            .ok_or_else(|| report!(StorageError::NotFound))?;
        row.mode = new.mode;
        row.name = new.name.clone().or_else(|| row.name.take());
        row.email = new.email.clone().or_else(|| row.email.take());
        Ok(())
    }
}
