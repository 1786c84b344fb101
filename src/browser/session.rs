//! Browser session acquisition with fixed backoff

use std::sync::Arc;
use tracing::{info, warn};

use super::{Connector, Session};
use crate::config::Config;
use crate::utils::error::{BrowserError, SessionError};
use crate::utils::retry::{with_retry, RetryPolicy};

/// Acquires sessions from the remote automation service
///
/// The endpoint is fixed at construction: the development endpoint in
/// development mode, the well-known production endpoint otherwise.
#[derive(Clone)]
pub struct SessionManager {
    connector: Arc<dyn Connector>,
    endpoint: String,
    policy: RetryPolicy,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("endpoint", &self.endpoint)
            .field("policy", &self.policy)
            .finish()
    }
}

impl SessionManager {
    pub fn new(
        connector: Arc<dyn Connector>,
        endpoint: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            connector,
            endpoint: endpoint.into(),
            policy,
        }
    }

    /// Build from configuration, selecting the endpoint for the run mode
    pub fn from_config(
        connector: Arc<dyn Connector>,
        config: &Config,
    ) -> Result<Self, SessionError> {
        let endpoint = config
            .browser
            .endpoint(config.mode)
            .ok_or(SessionError::MissingEndpoint)?;

        info!(mode = ?config.mode, endpoint, "Using browser endpoint");
        Ok(Self::new(connector, endpoint, config.browser.connect_policy()))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Connect, retrying with a fixed delay up to the attempt budget
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Connection` carrying the endpoint and the
    /// number of attempts once every attempt has failed.
    pub async fn acquire(&self) -> Result<Box<dyn Session>, SessionError> {
        let attempts = self.policy.attempts();

        let result = with_retry(&self.policy, |attempt| {
            let connector = Arc::clone(&self.connector);
            let endpoint = self.endpoint.clone();
            async move {
                info!(attempt, endpoint = %endpoint, "Connecting to browser service");
                match connector.connect(&endpoint).await {
                    Ok(session) => {
                        info!(attempt, "Connected to browser service");
                        Ok(session)
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, "Connection attempt failed");
                        Err(e)
                    }
                }
            }
        })
        .await;

        result.map_err(|last: BrowserError| SessionError::Connection {
            endpoint: self.endpoint.clone(),
            attempts,
            last,
        })
    }
}
