// Session establishment
//
// Turns resolved settings into a ready client: builds the transport, picks
// the authentication mode and, when only challenge-response credentials
// are configured, mints an access token. A failed mint either degrades
// the session to challenge-response only or aborts, per `TokenPolicy`.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::auth::{AuthMode, BearerToken, ChallengeCredentials};
use crate::client::IisClient;
use crate::error::Error;
use crate::retry::RetryPolicy;
use crate::token::TokenEndpoint;
use crate::transport::TransportConfig;

/// What to do when the session has to mint its own token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenPolicy {
    /// Try; on failure continue with challenge-response only.
    #[default]
    BestEffort,
    /// Try; on failure abort session establishment.
    Required,
    /// Never mint a token.
    Never,
}

/// Everything needed to establish a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub base_url: Url,
    pub challenge: Option<ChallengeCredentials>,
    /// A pre-issued access token. Skips acquisition when set.
    pub access_key: Option<SecretString>,
    pub transport: TransportConfig,
    pub retry: RetryPolicy,
    pub token: TokenEndpoint,
    pub token_policy: TokenPolicy,
    pub call_timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl SessionConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            challenge: None,
            access_key: None,
            transport: TransportConfig::default(),
            retry: RetryPolicy::default(),
            token: TokenEndpoint::default(),
            token_policy: TokenPolicy::default(),
            call_timeout: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl IisClient {
    /// Build a client for `config`, minting an access token if needed.
    pub async fn establish(config: &SessionConfig) -> Result<Self, Error> {
        let bearer = config
            .access_key
            .as_ref()
            .map(BearerToken::new)
            .transpose()?;
        let auth = AuthMode::from_parts(config.challenge.clone(), bearer);

        let mut client = Self::new(config.base_url.clone(), auth, &config.transport)?
            .with_retry_policy(config.retry)
            .with_cancellation(config.cancel.clone());
        if let Some(timeout) = config.call_timeout {
            client = client.with_call_timeout(timeout);
        }

        let challenge = match client.auth_mode() {
            AuthMode::None => {
                warn!(host = %config.base_url, "no credentials configured; requests are unauthenticated");
                return Ok(client);
            }
            AuthMode::ChallengeResponse(challenge) if config.token_policy != TokenPolicy::Never => {
                challenge.clone()
            }
            mode => {
                info!(auth = mode.label(), "session established");
                return Ok(client);
            }
        };

        match client.acquire_token(&challenge, &config.token).await {
            Ok(issued) => {
                info!(
                    principal = %challenge.principal(),
                    token_len = issued.len(),
                    "access token acquired"
                );
                Ok(client.with_bearer_token(issued.bearer()?))
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) if config.token_policy == TokenPolicy::Required => {
                warn!(error = %e, "token acquisition failed; aborting");
                Err(e)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "token acquisition failed; continuing with challenge-response only"
                );
                Ok(client)
            }
        }
    }
}
