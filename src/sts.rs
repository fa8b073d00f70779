//! Remote token exchange with AWS STS.

use anyhow::{Context, Result};
use aws_config::{Region, SdkConfig};
use aws_sdk_sts::{Client, config::Credentials, types};
use chrono::{DateTime, Utc};
use log::info;

use crate::credentials::CredentialRecord;

/// The two exchanges the credential chain depends on.
pub trait TokenExchange {
    /// Trades long-term credentials plus an MFA code for a time-bounded session.
    async fn session_token(
        &self,
        long_term: &CredentialRecord,
        code: &str,
        duration: u32,
    ) -> Result<CredentialRecord>;

    /// Trades session credentials for credentials scoped to `role_arn`.
    async fn assume_role(
        &self,
        session: &CredentialRecord,
        role_arn: &str,
        session_name: &str,
    ) -> Result<CredentialRecord>;
}

pub struct StsExchange {
    region: String,
}

impl StsExchange {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    async fn client(&self, record: &CredentialRecord) -> Client {
        let session_token = (!record.session_token.is_empty()).then(|| record.session_token.clone());
        let credentials = Credentials::new(
            &record.access_key_id,
            &record.secret_access_key,
            session_token,
            None,
            "aws-mfa",
        );
        let config: SdkConfig = aws_config::from_env()
            .region(Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;
        Client::new(&config)
    }
}

impl TokenExchange for StsExchange {
    async fn session_token(
        &self,
        long_term: &CredentialRecord,
        code: &str,
        duration: u32,
    ) -> Result<CredentialRecord> {
        info!(
            "Requesting session token - Device: {}, Duration: {duration}s",
            long_term.mfa_serial
        );
        let duration = i32::try_from(duration).context("Session duration out of range")?;

        let output = self
            .client(long_term)
            .await
            .get_session_token()
            .duration_seconds(duration)
            .serial_number(&long_term.mfa_serial)
            .token_code(code)
            .send()
            .await
            .context("Failed to get session token")?;
        let credentials = output.credentials().context("No credentials returned")?;

        Ok(CredentialRecord::session(
            credentials.access_key_id().to_string(),
            credentials.secret_access_key().to_string(),
            credentials.session_token().to_string(),
            expiration(credentials)?,
        ))
    }

    async fn assume_role(
        &self,
        session: &CredentialRecord,
        role_arn: &str,
        session_name: &str,
    ) -> Result<CredentialRecord> {
        info!("Assuming role {role_arn} as {session_name}");

        let output = self
            .client(session)
            .await
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .send()
            .await
            .with_context(|| format!("Failed to assume role {role_arn}"))?;
        let credentials = output.credentials().context("No credentials returned")?;

        Ok(CredentialRecord::role(
            credentials.access_key_id().to_string(),
            credentials.secret_access_key().to_string(),
            credentials.session_token().to_string(),
        ))
    }
}

fn expiration(credentials: &types::Credentials) -> Result<DateTime<Utc>> {
    to_utc(credentials.expiration())
}

fn to_utc(value: &aws_smithy_types::DateTime) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
        .context("Session expiration out of range")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_smithy_datetime_converts_to_utc() {
        let value = aws_smithy_types::DateTime::from_secs_and_nanos(1_700_000_000, 250);
        let converted = to_utc(&value).unwrap();
        assert_eq!(converted.timestamp(), 1_700_000_000);
        assert_eq!(converted.timestamp_subsec_nanos(), 250);
    }

    #[test]
    fn test_smithy_datetime_epoch() {
        let value = aws_smithy_types::DateTime::from_secs(0);
        assert_eq!(to_utc(&value).unwrap(), Utc.timestamp_opt(0, 0).unwrap());
    }
}
