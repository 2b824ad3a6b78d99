// NTLM negotiation
//
// A request carrying challenge credentials goes out with Basic auth first.
// When the server answers `401` with `WWW-Authenticate: NTLM` (or
// `Negotiate`), the same request is replayed through the negotiate /
// challenge / authenticate exchange. Message encoding and the NTLMv2
// response come from `ntlmclient`.

use base64::prelude::*;
use reqwest::header::{HeaderMap, HeaderValue, WWW_AUTHENTICATE};
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use crate::auth::ChallengeCredentials;

/// Authentication scheme a server offered in `WWW-Authenticate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scheme {
    Ntlm,
    Negotiate,
}

impl Scheme {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ntlm => "NTLM",
            Self::Negotiate => "Negotiate",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum NtlmError {
    #[error("could not encode NTLM {0} message")]
    Encode(&'static str),
    #[error("server sent a malformed NTLM challenge")]
    MalformedChallenge,
}

/// Send one request, answering an NTLM challenge with `credentials`.
///
/// `build` materializes the request; `Some(authorization)` replaces the
/// Basic credentials with a negotiation header. The last response of the
/// exchange is returned as is, so a refused negotiation surfaces as the
/// server's own `401`.
pub(crate) async fn send<F>(
    credentials: Option<&ChallengeCredentials>,
    build: F,
) -> Result<Response, reqwest::Error>
where
    F: Fn(Option<HeaderValue>) -> RequestBuilder + Send,
{
    let resp = build(None).send().await?;
    let Some(credentials) = credentials else {
        return Ok(resp);
    };
    if resp.status() != StatusCode::UNAUTHORIZED {
        return Ok(resp);
    }
    let Some((scheme, _)) = offered(resp.headers()) else {
        return Ok(resp);
    };

    debug!(scheme = scheme.as_str(), principal = %credentials.principal(), "negotiating");
    let negotiate = match negotiate_header(scheme, credentials) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "NTLM negotiation skipped");
            return Ok(resp);
        }
    };
    discard(resp).await;

    let resp = build(Some(negotiate)).send().await?;
    if resp.status() != StatusCode::UNAUTHORIZED {
        return Ok(resp);
    }
    let Some((scheme, Some(challenge))) = offered(resp.headers()) else {
        return Ok(resp);
    };
    let authenticate = match authenticate_header(scheme, credentials, &challenge) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "NTLM negotiation abandoned");
            return Ok(resp);
        }
    };
    discard(resp).await;

    build(Some(authenticate)).send().await
}

/// First NTLM-capable scheme in `WWW-Authenticate`, with its decoded token.
pub(crate) fn offered(headers: &HeaderMap) -> Option<(Scheme, Option<Vec<u8>>)> {
    headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(parse_challenge)
}

fn parse_challenge(value: &str) -> Option<(Scheme, Option<Vec<u8>>)> {
    let value = value.trim();
    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
    let scheme = if scheme.eq_ignore_ascii_case("NTLM") {
        Scheme::Ntlm
    } else if scheme.eq_ignore_ascii_case("Negotiate") {
        Scheme::Negotiate
    } else {
        return None;
    };
    let token = Some(token.trim())
        .filter(|t| !t.is_empty())
        .and_then(|t| BASE64_STANDARD.decode(t).ok());
    Some((scheme, token))
}

/// Type 1: announce the domain and the capabilities this client supports.
#[allow(clippy::default_trait_access)]
pub(crate) fn negotiate_header(
    scheme: Scheme,
    credentials: &ChallengeCredentials,
) -> Result<HeaderValue, NtlmError> {
    let message = ntlmclient::Message::Negotiate(ntlmclient::NegotiateMessage {
        flags: ntlmclient::Flags::NEGOTIATE_UNICODE
            | ntlmclient::Flags::REQUEST_TARGET
            | ntlmclient::Flags::NEGOTIATE_NTLM,
        supplied_domain: credentials.realm().unwrap_or_default().to_owned(),
        supplied_workstation: String::new(),
        os_version: Default::default(),
    });
    let bytes = message
        .to_bytes()
        .map_err(|_| NtlmError::Encode("negotiate"))?;
    header(scheme, &bytes, "negotiate")
}

/// Type 3: answer the server's Type 2 challenge with an NTLMv2 response.
pub(crate) fn authenticate_header(
    scheme: Scheme,
    credentials: &ChallengeCredentials,
    challenge: &[u8],
) -> Result<HeaderValue, NtlmError> {
    let Ok(ntlmclient::Message::Challenge(challenge)) = ntlmclient::Message::try_from(challenge)
    else {
        return Err(NtlmError::MalformedChallenge);
    };

    let mut target_info = Vec::new();
    for entry in &challenge.target_information {
        target_info.extend(entry.to_bytes());
    }

    let creds = ntlmclient::Credentials {
        username: credentials.identity().to_owned(),
        password: credentials.secret().expose_secret().to_owned(),
        domain: credentials.realm().unwrap_or_default().to_owned(),
    };
    let response = ntlmclient::respond_challenge_ntlm_v2(
        challenge.challenge,
        &target_info,
        ntlmclient::get_ntlm_time(),
        &creds,
    );
    let message = response.to_message(
        &creds,
        "",
        ntlmclient::Flags::NEGOTIATE_UNICODE | ntlmclient::Flags::NEGOTIATE_NTLM,
    );
    let bytes = message
        .to_bytes()
        .map_err(|_| NtlmError::Encode("authenticate"))?;
    header(scheme, &bytes, "authenticate")
}

fn header(scheme: Scheme, message: &[u8], kind: &'static str) -> Result<HeaderValue, NtlmError> {
    let encoded = format!("{} {}", scheme.as_str(), BASE64_STANDARD.encode(message));
    let mut value = HeaderValue::from_str(&encoded).map_err(|_| NtlmError::Encode(kind))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Read the rest of an intermediate response so its connection can carry
/// the next leg of the exchange.
async fn discard(resp: Response) {
    let _ = resp.bytes().await;
}
