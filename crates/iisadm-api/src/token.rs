// Access token acquisition
//
// Two-step handshake against the security endpoint: a challenge-response
// GET yields an anti-forgery header and session cookies, then a POST
// carrying both mints the access token. Either step may run the NTLM
// exchange. Neither step is retried here.

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::auth::{BearerToken, ChallengeCredentials};
use crate::client::IisClient;
use crate::error::Error;
use crate::ntlm;

/// Where and how tokens are minted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEndpoint {
    pub path: String,
    /// Response header carrying the anti-forgery value; echoed on the POST.
    pub anti_forgery_header: String,
    /// Exact length every issued token must have.
    pub token_length: usize,
    /// Expiry to request. `None` asks for a token that never expires.
    pub expires_on: Option<String>,
}

impl Default for TokenEndpoint {
    fn default() -> Self {
        Self {
            path: "/security/api-keys".into(),
            anti_forgery_header: "XSRF-TOKEN".into(),
            token_length: 54,
            expires_on: None,
        }
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    expires_on: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    expires_on: Option<String>,
}

/// A token issued by the security endpoint.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: SecretString,
    pub id: String,
    pub expires_on: Option<String>,
}

impl IssuedToken {
    /// Encode as the header value every subsequent request carries.
    pub fn bearer(&self) -> Result<BearerToken, Error> {
        BearerToken::new(&self.access_token)
    }

    /// Length of the secret, for logs that must not show the value.
    pub fn len(&self) -> usize {
        self.access_token.expose_secret().chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.expose_secret().is_empty()
    }
}

impl IisClient {
    /// Exchange challenge-response credentials for an access token.
    ///
    /// Observes the client's cancellation token; a cancelled call reports
    /// the step that was in flight. Failures are reported as protocol
    /// errors and never retried.
    pub async fn acquire_token(
        &self,
        credentials: &ChallengeCredentials,
        endpoint: &TokenEndpoint,
    ) -> Result<IssuedToken, Error> {
        let url = self.url(&endpoint.path)?;

        // Step 1: anti-forgery value and session cookies
        let (anti_forgery, cookies) = self
            .until_cancelled(Method::GET, &url, self.anti_forgery(credentials, endpoint, &url))
            .await?;

        // Step 2: mint the token
        let mint = self.mint(credentials, endpoint, &url, &anti_forgery, cookies.as_ref());
        self.until_cancelled(Method::POST, &url, mint).await
    }

    async fn until_cancelled<T>(
        &self,
        method: Method,
        url: &Url,
        step: impl Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        tokio::select! {
            biased;
            () = self.cancellation_token().cancelled() => {
                debug!(%method, %url, "token handshake cancelled");
                Err(Error::Cancelled { method, url: url.to_string() })
            }
            result = step => result,
        }
    }

    async fn anti_forgery(
        &self,
        credentials: &ChallengeCredentials,
        endpoint: &TokenEndpoint,
        url: &Url,
    ) -> Result<(HeaderValue, Option<HeaderValue>), Error> {
        debug!(%url, "requesting anti-forgery token");
        let resp = ntlm::send(Some(credentials), |authorization| {
            self.authenticated(credentials, Method::GET, url, authorization)
        })
        .await
        .map_err(|source| transport(Method::GET, url, source))?;

        if resp.status() != StatusCode::OK {
            let (status, body) = drain(resp).await;
            return Err(Error::HandshakeRequestFailed { status, body });
        }

        let anti_forgery = resp
            .headers()
            .get(endpoint.anti_forgery_header.as_str())
            .filter(|value| !value.is_empty())
            .cloned()
            .ok_or_else(|| Error::MissingAntiForgeryToken {
                header: endpoint.anti_forgery_header.clone(),
            })?;
        Ok((anti_forgery, cookie_header(&resp)))
    }

    async fn mint(
        &self,
        credentials: &ChallengeCredentials,
        endpoint: &TokenEndpoint,
        url: &Url,
        anti_forgery: &HeaderValue,
        cookies: Option<&HeaderValue>,
    ) -> Result<IssuedToken, Error> {
        let body = Bytes::from(
            serde_json::to_vec(&TokenRequest {
                expires_on: endpoint.expires_on.as_deref().unwrap_or_default(),
            })
            .map_err(Error::Encode)?,
        );

        debug!(%url, "requesting access token");
        let resp = ntlm::send(Some(credentials), |authorization| {
            let mut request = self
                .authenticated(credentials, Method::POST, url, authorization)
                .header(CONTENT_TYPE, "application/json")
                .header(endpoint.anti_forgery_header.as_str(), anti_forgery.clone())
                .body(body.clone());
            if let Some(cookies) = cookies {
                request = request.header(COOKIE, cookies.clone());
            }
            request
        })
        .await
        .map_err(|source| transport(Method::POST, url, source))?;

        let status = resp.status();
        if !matches!(status, StatusCode::OK | StatusCode::CREATED) {
            let (status, body) = drain(resp).await;
            return Err(Error::TokenIssuanceFailed { status, body });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|source| transport(Method::POST, url, source))?;
        let issued: TokenResponse = crate::client::decode(&bytes)?;

        let actual = issued.access_token.chars().count();
        if actual != endpoint.token_length {
            return Err(Error::InvalidTokenFormat {
                expected: endpoint.token_length,
                actual,
            });
        }

        debug!(id = %issued.id, "access token issued");
        Ok(IssuedToken {
            access_token: SecretString::from(issued.access_token),
            id: issued.id,
            expires_on: issued.expires_on.filter(|s| !s.is_empty()),
        })
    }

    /// Handshake request with Basic credentials, or the NTLM leg in flight.
    fn authenticated(
        &self,
        credentials: &ChallengeCredentials,
        method: Method,
        url: &Url,
        authorization: Option<HeaderValue>,
    ) -> RequestBuilder {
        let builder = self.base_request(method, url.clone());
        match authorization {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => credentials.apply(builder),
        }
    }
}

/// Cookies set by `resp`, as one `Cookie` request header value.
fn cookie_header(resp: &Response) -> Option<HeaderValue> {
    let pairs: Vec<String> = resp
        .cookies()
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect();
    if pairs.is_empty() {
        return None;
    }
    let mut value = HeaderValue::from_str(&pairs.join("; ")).ok()?;
    value.set_sensitive(true);
    Some(value)
}

async fn drain(resp: Response) -> (StatusCode, String) {
    let status = resp.status();
    (status, resp.text().await.unwrap_or_default())
}

fn transport(method: Method, url: &Url, source: reqwest::Error) -> Error {
    Error::Transport {
        method,
        url: url.to_string(),
        attempts: 1,
        source,
    }
}
