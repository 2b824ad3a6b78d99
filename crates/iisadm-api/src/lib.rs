// iisadm-api: Resilient async client for the IIS Administration API
//
// Dual authentication (challenge-response plus access token), bounded
// retries with backoff, token acquisition and create-or-adopt for named
// resources.

pub mod auth;
pub mod client;
pub mod error;
mod ntlm;
pub mod reconcile;
pub mod resources;
pub mod retry;
pub mod session;
pub mod token;
pub mod transport;

pub use auth::{AuthMode, BearerToken, ChallengeCredentials};
pub use client::IisClient;
pub use error::{Error, ErrorKind};
pub use reconcile::{KeyMatch, NamedResource, ResourceKind, create_or_adopt, create_or_adopt_with};
pub use retry::RetryPolicy;
pub use session::{SessionConfig, TokenPolicy};
pub use token::{IssuedToken, TokenEndpoint};
pub use transport::{TlsMode, TransportConfig};

pub use reqwest::{Method, StatusCode};
