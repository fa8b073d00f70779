//! Credential records shared by every tier of the credential chain.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Environment variables exported to the wrapped command.
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// A single set of AWS credentials.
///
/// The same shape is used for all three tiers:
/// - long-term: access key, secret key and MFA serial, no token, no expiration
/// - session: access key, secret key, token and a hard expiration
/// - role: access key, secret key and token, never persisted
///
/// Field names on the wire match the records written by earlier releases so that
/// entries already sitting in the keychain keep loading. The key pair is required;
/// the tier-specific fields may be absent.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(rename = "AccessKeyID")]
    pub access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    pub secret_access_key: String,
    #[serde(rename = "MfaSerial", default)]
    pub mfa_serial: String,
    #[serde(rename = "SessionToken", default)]
    pub session_token: String,
    #[serde(rename = "Expiration", default)]
    pub expiration: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    pub fn long_term(access_key_id: String, secret_access_key: String, mfa_serial: String) -> Self {
        Self {
            access_key_id,
            secret_access_key,
            mfa_serial,
            ..Self::default()
        }
    }

    pub fn session(
        access_key_id: String,
        secret_access_key: String,
        session_token: String,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            access_key_id,
            secret_access_key,
            session_token,
            expiration: Some(expiration),
            ..Self::default()
        }
    }

    pub fn role(access_key_id: String, secret_access_key: String, session_token: String) -> Self {
        Self {
            access_key_id,
            secret_access_key,
            session_token,
            ..Self::default()
        }
    }

    /// Whether a cached session record may still be used at `now`.
    ///
    /// The expiration must be strictly in the future. A session record without an
    /// expiration is malformed and is never reused.
    pub fn is_session_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|expiration| expiration > now)
    }

    /// Variables injected into the child process environment.
    pub fn env_vars(&self) -> [(&'static str, &str); 3] {
        [
            (ENV_ACCESS_KEY_ID, self.access_key_id.as_str()),
            (ENV_SECRET_ACCESS_KEY, self.secret_access_key.as_str()),
            (ENV_SESSION_TOKEN, self.session_token.as_str()),
        ]
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("mfa_serial", &self.mfa_serial)
            .field(
                "session_token",
                &if self.session_token.is_empty() { "" } else { "<redacted>" },
            )
            .field("expiration", &self.expiration)
            .finish()
    }
}
