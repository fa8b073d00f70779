//! Typed credential cache on top of a [`SecretStore`].
//!
//! Records are stored as JSON under the fixed `aws-mfa` service. Accounts are
//! named after their position in the credential chain: [`LONG_TERM_ACCOUNT`] for
//! the long-term record and the MFA serial for the session record derived from it.

use log::debug;
use thiserror::Error;

use crate::{
    credentials::CredentialRecord,
    store::{SecretStore, StoreError},
};

pub const SERVICE: &str = "aws-mfa";
pub const LONG_TERM_ACCOUNT: &str = "long-term";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no cached credentials for {0}")]
    NotFound(String),

    /// An entry exists but is not a usable record.
    #[error("cached credentials for {account} are unreadable: {reason}")]
    Corrupt {
        account: String,
        #[source]
        reason: CorruptReason,
    },

    #[error("failed to serialize credentials: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum CorruptReason {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0} is empty")]
    EmptyField(&'static str),
}

pub struct CredentialCache<S> {
    store: S,
}

impl<S: SecretStore> CredentialCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Upserts `record` under `account`. Does nothing when `record` is `None`.
    pub fn store(&self, account: &str, record: Option<&CredentialRecord>) -> Result<(), CacheError> {
        let Some(record) = record else {
            return Ok(());
        };
        let data = serde_json::to_vec(record).map_err(CacheError::Encode)?;
        self.store.put(SERVICE, account, &data)?;
        debug!("Cached credentials for {account}");
        Ok(())
    }

    pub fn load(&self, account: &str) -> Result<CredentialRecord, CacheError> {
        let data = self
            .store
            .get(SERVICE, account)?
            .ok_or_else(|| CacheError::NotFound(account.to_string()))?;
        serde_json::from_slice::<CredentialRecord>(&data)
            .map_err(CorruptReason::from)
            .and_then(|record| check_complete(account, record))
            .map_err(|reason| CacheError::Corrupt {
                account: account.to_string(),
                reason,
            })
    }

    /// Idempotent: deleting a missing entry succeeds.
    pub fn delete(&self, account: &str) -> Result<(), CacheError> {
        self.store.delete(SERVICE, account)?;
        debug!("Removed cached credentials for {account}");
        Ok(())
    }

    #[cfg(test)]
    pub fn store_backend(&self) -> &S {
        &self.store
    }
}

/// Every record needs its key pair; the long-term record also needs the MFA serial
/// that names its session entry.
fn check_complete(account: &str, record: CredentialRecord) -> Result<CredentialRecord, CorruptReason> {
    if record.access_key_id.is_empty() {
        return Err(CorruptReason::EmptyField("AccessKeyID"));
    }
    if record.secret_access_key.is_empty() {
        return Err(CorruptReason::EmptyField("SecretAccessKey"));
    }
    if account == LONG_TERM_ACCOUNT && record.mfa_serial.is_empty() {
        return Err(CorruptReason::EmptyField("MfaSerial"));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::store::MemoryStore;

    fn cache() -> CredentialCache<MemoryStore> {
        CredentialCache::new(MemoryStore::new())
    }

    fn session_record() -> CredentialRecord {
        CredentialRecord::session(
            "ASIASESSION".to_string(),
            "session-secret".to_string(),
            "session-token".to_string(),
            Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
        )
    }

    #[test]
    fn test_store_then_load_returns_equal_record() {
        let cache = cache();
        let long_term = CredentialRecord::long_term(
            "AKIALONG".to_string(),
            "long-secret".to_string(),
            "arn:aws:iam::123456789012:mfa/dev".to_string(),
        );
        cache.store(LONG_TERM_ACCOUNT, Some(&long_term)).unwrap();
        cache.store("arn:aws:iam::123456789012:mfa/dev", Some(&session_record())).unwrap();

        assert_eq!(cache.load(LONG_TERM_ACCOUNT).unwrap(), long_term);
        assert_eq!(
            cache.load("arn:aws:iam::123456789012:mfa/dev").unwrap(),
            session_record()
        );
    }

    #[test]
    fn test_store_none_is_noop() {
        let cache = cache();
        cache.store(LONG_TERM_ACCOUNT, None).unwrap();
        assert_eq!(cache.store_backend().len(), 0);
    }

    #[test]
    fn test_store_overwrites_existing_entry() {
        let cache = cache();
        let mut record = session_record();
        cache.store("serial", Some(&record)).unwrap();
        record.session_token = "rotated".to_string();
        cache.store("serial", Some(&record)).unwrap();
        assert_eq!(cache.load("serial").unwrap().session_token, "rotated");
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let err = cache().load(LONG_TERM_ACCOUNT).unwrap_err();
        assert!(matches!(err, CacheError::NotFound(account) if account == LONG_TERM_ACCOUNT));
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let cache = cache();
        cache
            .store_backend()
            .insert_raw(SERVICE, LONG_TERM_ACCOUNT, b"not json at all");
        let err = cache.load(LONG_TERM_ACCOUNT).unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }

    #[test]
    fn test_load_empty_object_is_corrupt() {
        let cache = cache();
        cache.store_backend().insert_raw(SERVICE, LONG_TERM_ACCOUNT, b"{}");
        assert!(matches!(
            cache.load(LONG_TERM_ACCOUNT).unwrap_err(),
            CacheError::Corrupt { reason: CorruptReason::Json(_), .. }
        ));
    }

    #[test]
    fn test_load_empty_key_pair_is_corrupt() {
        let cache = cache();
        cache.store_backend().insert_raw(
            SERVICE,
            "serial",
            br#"{"AccessKeyID": "", "SecretAccessKey": "s", "SessionToken": "t"}"#,
        );
        assert!(matches!(
            cache.load("serial").unwrap_err(),
            CacheError::Corrupt { reason: CorruptReason::EmptyField("AccessKeyID"), .. }
        ));
    }

    #[test]
    fn test_load_long_term_without_serial_is_corrupt() {
        let cache = cache();
        cache.store_backend().insert_raw(
            SERVICE,
            LONG_TERM_ACCOUNT,
            br#"{"AccessKeyID": "AKIA", "SecretAccessKey": "s", "MfaSerial": ""}"#,
        );
        let err = cache.load(LONG_TERM_ACCOUNT).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cached credentials for long-term are unreadable: MfaSerial is empty"
        );
    }

    #[test]
    fn test_load_backend_failure_is_store_error() {
        let cache = cache();
        cache.store_backend().fail_get.set(true);
        assert!(matches!(
            cache.load(LONG_TERM_ACCOUNT).unwrap_err(),
            CacheError::Store(_)
        ));
    }

    #[test]
    fn test_delete_twice_succeeds() {
        let cache = cache();
        cache.store("serial", Some(&session_record())).unwrap();
        cache.delete("serial").unwrap();
        cache.delete("serial").unwrap();
        assert!(matches!(cache.load("serial"), Err(CacheError::NotFound(_))));
    }
}
