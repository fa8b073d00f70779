//! Credential chain orchestration.
//!
//! Credentials are resolved in three phases, each depending on the previous one:
//!
//! 1. **Long-term**: loaded from the cache under `long-term`, or collected from the
//!    environment / operator and cached. Never expires.
//! 2. **Session**: loaded from the cache under the long-term MFA serial while its
//!    expiration is in the future; otherwise the stale entry is removed, an MFA code
//!    is requested and a new session is obtained from STS and cached.
//! 3. **Role** (optional): derived from the session for this invocation only and
//!    never cached.
//!
//! Cache write failures are logged and ignored so that a locked or unavailable
//! keychain still yields working credentials for the current run.

use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};

use crate::{
    cache::{CacheError, CredentialCache, LONG_TERM_ACCOUNT},
    credentials::{CredentialRecord, ENV_ACCESS_KEY_ID, ENV_SECRET_ACCESS_KEY},
    prompt::{Input, Prompt},
    store::SecretStore,
    sts::TokenExchange,
};

/// Override consulted for the MFA serial when no long-term record is cached.
pub const ENV_MFA_SERIAL: &str = "AWS_MFA_ID";

pub struct ChainOptions {
    /// Requested session lifetime in seconds.
    pub duration: u32,
    pub role: Option<String>,
    pub role_session_name: String,
}

pub struct CredentialOrchestrator<S, P, X> {
    cache: CredentialCache<S>,
    input: Input<P>,
    exchange: X,
    options: ChainOptions,
}

impl<S, P, X> CredentialOrchestrator<S, P, X>
where
    S: SecretStore,
    P: Prompt,
    X: TokenExchange,
{
    pub fn new(
        cache: CredentialCache<S>,
        input: Input<P>,
        exchange: X,
        options: ChainOptions,
    ) -> Self {
        Self {
            cache,
            input,
            exchange,
            options,
        }
    }

    /// Walks the credential chain and returns the credentials to hand to the
    /// wrapped command.
    pub async fn resolve(&mut self) -> Result<CredentialRecord> {
        let long_term = self.long_term()?;
        let session = self.session(&long_term).await?;

        match self.options.role.as_deref().filter(|role| !role.is_empty()) {
            Some(role_arn) => {
                let role = self
                    .exchange
                    .assume_role(&session, role_arn, &self.options.role_session_name)
                    .await?;
                info!("Using credentials for role {role_arn}");
                Ok(role)
            }
            None => Ok(session),
        }
    }

    fn long_term(&mut self) -> Result<CredentialRecord> {
        match self.cache.load(LONG_TERM_ACCOUNT) {
            Ok(record) => {
                debug!("Using cached long-term credentials");
                return Ok(record);
            }
            Err(CacheError::NotFound(_)) => info!("No cached long-term credentials"),
            Err(e @ CacheError::Corrupt { .. }) => {
                warn!("{e}; discarding cached entry");
                self.discard(LONG_TERM_ACCOUNT);
            }
            Err(e) => warn!("Could not read cached long-term credentials: {e}"),
        }

        let access_key_id = self
            .input
            .env_or_prompt(ENV_ACCESS_KEY_ID, "Enter AWS Access Key ID: ")?;
        let secret_access_key = self
            .input
            .env_or_prompt_secret(ENV_SECRET_ACCESS_KEY, "Enter AWS Secret Access Key: ")?;
        let mfa_serial = self.input.env_or_prompt(ENV_MFA_SERIAL, "Enter MFA serial: ")?;

        let record = CredentialRecord::long_term(access_key_id, secret_access_key, mfa_serial);
        self.persist(LONG_TERM_ACCOUNT, &record);
        Ok(record)
    }

    async fn session(&mut self, long_term: &CredentialRecord) -> Result<CredentialRecord> {
        let account = long_term.mfa_serial.as_str();

        match self.cache.load(account) {
            Ok(record) if record.is_session_valid_at(Utc::now()) => {
                if let Some(expiration) = record.expiration {
                    info!("Using cached session credentials, valid until {expiration}");
                }
                return Ok(record);
            }
            Ok(record) => {
                match record.expiration {
                    Some(expiration) => info!("Cached session credentials expired at {expiration}"),
                    None => warn!("Cached session credentials for {account} have no expiration"),
                }
                self.discard(account);
            }
            Err(CacheError::NotFound(_)) => debug!("No cached session credentials for {account}"),
            Err(e @ CacheError::Corrupt { .. }) => {
                warn!("{e}; discarding cached entry");
                self.discard(account);
            }
            Err(e) => warn!("Could not read cached session credentials: {e}"),
        }

        let code = self.input.prompt("AWS MFA code: ")?;
        let session = self
            .exchange
            .session_token(long_term, &code, self.options.duration)
            .await?;
        if let Some(expiration) = session.expiration {
            info!("Obtained session credentials, valid until {expiration}");
        }

        self.persist(account, &session);
        Ok(session)
    }

    fn persist(&self, account: &str, record: &CredentialRecord) {
        if let Err(e) = self.cache.store(account, Some(record)) {
            warn!("Failed to cache credentials for {account}: {e}");
        }
    }

    fn discard(&self, account: &str) {
        if let Err(e) = self.cache.delete(account) {
            warn!("Failed to remove cached credentials for {account}: {e}");
        }
    }

    #[cfg(test)]
    fn parts(&self) -> (&CredentialCache<S>, &Input<P>, &X) {
        (&self.cache, &self.input, &self.exchange)
    }
}
