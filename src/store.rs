//! Secret store backends.
//!
//! Entries are opaque byte blobs addressed by `(service, account)`. The OS keyring
//! is the only production backend.

use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("secret store {operation} failed for {service}/{account}: {source}")]
pub struct StoreError {
    pub operation: &'static str,
    pub service: String,
    pub account: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl StoreError {
    fn new(
        operation: &'static str,
        service: &str,
        account: &str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation,
            service: service.to_string(),
            account: account.to_string(),
            source: source.into(),
        }
    }
}

pub trait SecretStore {
    /// Inserts or replaces the entry.
    fn put(&self, service: &str, account: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Returns `None` when no entry exists.
    fn get(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Removes the entry. Removing a missing entry succeeds.
    fn delete(&self, service: &str, account: &str) -> Result<(), StoreError>;
}

/// macOS Keychain, Windows Credential Manager or the Linux kernel keyring,
/// depending on the platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringStore;

impl KeyringStore {
    fn entry(
        operation: &'static str,
        service: &str,
        account: &str,
    ) -> Result<keyring::Entry, StoreError> {
        keyring::Entry::new(service, account)
            .map_err(|e| StoreError::new(operation, service, account, e))
    }
}

impl SecretStore for KeyringStore {
    fn put(&self, service: &str, account: &str, data: &[u8]) -> Result<(), StoreError> {
        Self::entry("put", service, account)?
            .set_secret(data)
            .map_err(|e| StoreError::new("put", service, account, e))
    }

    fn get(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match Self::entry("get", service, account)?.get_secret() {
            Ok(data) => Ok(Some(data)),
            Err(keyring::Error::NoEntry) => {
                debug!("No keyring entry for {service}/{account}");
                Ok(None)
            }
            Err(e) => Err(StoreError::new("get", service, account, e)),
        }
    }

    fn delete(&self, service: &str, account: &str) -> Result<(), StoreError> {
        match Self::entry("delete", service, account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::new("delete", service, account, e)),
        }
    }
}

#[cfg(test)]
pub use memory::MemoryStore;

#[cfg(test)]
mod memory {
    use std::{
        cell::{Cell, RefCell},
        collections::HashMap,
    };

    use super::{SecretStore, StoreError};

    /// In-memory store with failure injection.
    #[derive(Default)]
    pub struct MemoryStore {
        entries: RefCell<HashMap<(String, String), Vec<u8>>>,
        pub fail_put: Cell<bool>,
        pub fail_get: Cell<bool>,
        pub fail_delete: Cell<bool>,
        pub deletes: RefCell<Vec<String>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert_raw(&self, service: &str, account: &str, data: &[u8]) {
            self.entries
                .borrow_mut()
                .insert((service.to_string(), account.to_string()), data.to_vec());
        }

        pub fn raw(&self, service: &str, account: &str) -> Option<Vec<u8>> {
            self.entries
                .borrow()
                .get(&(service.to_string(), account.to_string()))
                .cloned()
        }

        pub fn len(&self) -> usize {
            self.entries.borrow().len()
        }

        fn injected(operation: &'static str, service: &str, account: &str) -> StoreError {
            StoreError::new(operation, service, account, "injected failure")
        }
    }

    impl SecretStore for MemoryStore {
        fn put(&self, service: &str, account: &str, data: &[u8]) -> Result<(), StoreError> {
            if self.fail_put.get() {
                return Err(Self::injected("put", service, account));
            }
            self.insert_raw(service, account, data);
            Ok(())
        }

        fn get(&self, service: &str, account: &str) -> Result<Option<Vec<u8>>, StoreError> {
            if self.fail_get.get() {
                return Err(Self::injected("get", service, account));
            }
            Ok(self.raw(service, account))
        }

        fn delete(&self, service: &str, account: &str) -> Result<(), StoreError> {
            if self.fail_delete.get() {
                return Err(Self::injected("delete", service, account));
            }
            self.deletes.borrow_mut().push(account.to_string());
            self.entries
                .borrow_mut()
                .remove(&(service.to_string(), account.to_string()));
            Ok(())
        }
    }
}
