// Transport authentication
//
// Attaches challenge-response credentials and/or the minted access token
// to one outgoing request. No network I/O happens here; the executor calls
// `AuthMode::apply` on every freshly built attempt, and `ntlm` takes over
// when the server asks for the NTLM exchange.

use reqwest::RequestBuilder;
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Header the IIS Administration API reads the bearer token from.
pub const ACCESS_TOKEN_HEADER: &str = "Access-Token";

/// Windows-style identity used for the challenge-response layer.
///
/// Sent as HTTP Basic credentials on the first request. When the server
/// answers `401` with an NTLM or Negotiate challenge, the executor replays
/// the request through the NTLM exchange with the same identity.
#[derive(Debug, Clone)]
pub struct ChallengeCredentials {
    identity: String,
    secret: SecretString,
    realm: Option<String>,
}

impl ChallengeCredentials {
    pub fn new(identity: impl Into<String>, secret: SecretString) -> Self {
        Self {
            identity: identity.into(),
            secret,
            realm: None,
        }
    }

    /// Attach a domain. Empty strings are treated as "no domain".
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        let realm = realm.into();
        self.realm = (!realm.is_empty()).then_some(realm);
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    /// `DOMAIN\user` when a realm is configured, otherwise the bare identity.
    pub fn principal(&self) -> String {
        match &self.realm {
            Some(realm) => format!("{realm}\\{}", self.identity),
            None => self.identity.clone(),
        }
    }

    pub(crate) fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub(crate) fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(self.principal(), Some(self.secret.expose_secret()))
    }
}

/// A minted access token, pre-encoded as a sensitive header value.
///
/// Built once when the session is constructed; every attempt reuses the
/// same header value instead of re-formatting the secret.
#[derive(Debug, Clone)]
pub struct BearerToken {
    header: HeaderValue,
}

impl BearerToken {
    pub fn new(token: &SecretString) -> Result<Self, Error> {
        let mut header = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| Error::InvalidHeader {
                header: ACCESS_TOKEN_HEADER,
            })?;
        header.set_sensitive(true);
        Ok(Self { header })
    }

    fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(ACCESS_TOKEN_HEADER, self.header.clone())
    }
}

/// How every request of a session authenticates.
///
/// Fixed at session construction. Both layers may be active at once: the
/// IIS Administration API authenticates the caller with challenge-response
/// and authorizes the call with the access token.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// No credentials at all (only useful against open test servers).
    None,
    /// Access token only.
    Bearer(BearerToken),
    /// Challenge-response only -- the degraded mode when token acquisition fails.
    ChallengeResponse(ChallengeCredentials),
    /// Challenge-response for identity plus access token for authorization.
    Both {
        challenge: ChallengeCredentials,
        bearer: BearerToken,
    },
}

impl AuthMode {
    /// Pick the variant from whichever credentials are present.
    pub fn from_parts(challenge: Option<ChallengeCredentials>, bearer: Option<BearerToken>) -> Self {
        match (challenge, bearer) {
            (None, None) => Self::None,
            (None, Some(bearer)) => Self::Bearer(bearer),
            (Some(challenge), None) => Self::ChallengeResponse(challenge),
            (Some(challenge), Some(bearer)) => Self::Both { challenge, bearer },
        }
    }

    /// Upgrade with a freshly minted token, keeping any challenge credentials.
    pub fn with_bearer(self, bearer: BearerToken) -> Self {
        Self::from_parts(self.into_challenge(), Some(bearer))
    }

    pub fn challenge(&self) -> Option<&ChallengeCredentials> {
        match self {
            Self::ChallengeResponse(challenge) | Self::Both { challenge, .. } => Some(challenge),
            Self::None | Self::Bearer(_) => None,
        }
    }

    pub fn has_bearer(&self) -> bool {
        matches!(self, Self::Bearer(_) | Self::Both { .. })
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bearer(_) => "bearer",
            Self::ChallengeResponse(_) => "challenge-response",
            Self::Both { .. } => "challenge-response+bearer",
        }
    }

    /// Set the authentication headers on one materialized request.
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Self::None => builder,
            Self::Bearer(bearer) => bearer.apply(builder),
            Self::ChallengeResponse(challenge) => challenge.apply(builder),
            Self::Both { challenge, bearer } => bearer.apply(challenge.apply(builder)),
        }
    }

    /// Only the access token; used while an NTLM exchange owns `Authorization`.
    pub(crate) fn apply_bearer(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(bearer) | Self::Both { bearer, .. } => bearer.apply(builder),
            Self::None | Self::ChallengeResponse(_) => builder,
        }
    }

    fn into_challenge(self) -> Option<ChallengeCredentials> {
        match self {
            Self::ChallengeResponse(challenge) | Self::Both { challenge, .. } => Some(challenge),
            Self::None | Self::Bearer(_) => None,
        }
    }
}
