//! SMS delivery of fraud alerts through the Twilio REST API.
//!
//! Best effort only: one attempt per alert, no retry, no queueing. Missing
//! credentials disable delivery without failing the pipeline.

use crate::config::AlertingConfig;
use crate::types::alert::FraudAlert;
use crate::types::transaction::ScoredTransaction;
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

/// Environment variables the dispatcher needs, in lookup order
pub const CREDENTIAL_VARS: [&str; 4] = [
    "TWILIO_ACCOUNT_SID",
    "TWILIO_AUTH_TOKEN",
    "TWILIO_PHONE_NUMBER",
    "RECIPIENT_PHONE_NUMBER",
];

const TWILIO_API_BASE: &str = "https://api.twilio.com";

const UA: &str = concat!("fraud-stream/", env!("CARGO_PKG_VERSION"));

/// SMS body for a flagged transaction
pub fn format_alert(tx: &ScoredTransaction) -> String {
    FraudAlert::from_scored(tx).message()
}

/// Account credentials and phone numbers
#[derive(Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
}

impl std::fmt::Debug for TwilioCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"***")
            .field("from_number", &self.from_number)
            .field("to_number", &self.to_number)
            .finish()
    }
}

impl TwilioCredentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from any key lookup; `None` if a value is missing or blank
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Some(Self {
            account_sid: get(CREDENTIAL_VARS[0])?,
            auth_token: get(CREDENTIAL_VARS[1])?,
            from_number: get(CREDENTIAL_VARS[2])?,
            to_number: get(CREDENTIAL_VARS[3])?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

/// Sends alert messages as SMS
pub struct AlertDispatcher {
    client: reqwest::Client,
    credentials: Option<TwilioCredentials>,
    api_base: String,
}

impl AlertDispatcher {
    pub fn new(credentials: Option<TwilioCredentials>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(UA)
            .build()?;

        Ok(Self {
            client,
            credentials,
            api_base: TWILIO_API_BASE.to_string(),
        })
    }

    /// Dispatcher using environment credentials
    pub fn from_config(config: &AlertingConfig) -> Result<Self> {
        let credentials = TwilioCredentials::from_env();
        if credentials.is_none() {
            warn!(
                variables = ?CREDENTIAL_VARS,
                "Twilio credentials not configured, SMS alerts will be skipped"
            );
        }
        Self::new(credentials, Duration::from_secs(config.timeout_secs))
    }

    /// Point the dispatcher at another API host
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Send an alert for a flagged transaction
    pub async fn dispatch(&self, alert: &FraudAlert) -> bool {
        self.send(&alert.message()).await
    }

    /// Send a free-text message. Returns whether delivery was accepted.
    pub async fn send(&self, message: &str) -> bool {
        let Some(creds) = &self.credentials else {
            warn!(
                "Twilio credentials not configured. Skipping SMS alert. Set {}",
                CREDENTIAL_VARS.join(", ")
            );
            return false;
        };

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, creds.account_sid
        );
        let form = [
            ("To", creds.to_number.as_str()),
            ("From", creds.from_number.as_str()),
            ("Body", message),
        ];

        let response = match self
            .client
            .post(&url)
            .basic_auth(&creds.account_sid, Some(&creds.auth_token))
            .form(&form[..])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Failed to send SMS alert");
                return false;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "SMS alert rejected");
            return false;
        }

        match response.json::<MessageResponse>().await {
            Ok(msg) => {
                info!(sid = %msg.sid, "SMS alert sent successfully");
                true
            }
            Err(e) => {
                // accepted by the API but the body was unexpected
                warn!(error = %e, "SMS alert sent, could not read message SID");
                true
            }
        }
    }
}
