//! CLI error types with miette diagnostics.
//!
//! Maps `iisadm_api::Error` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use iisadm_api::{ErrorKind, ResourceKind};
use iisadm_config::ConfigError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    /// 128 + SIGINT, as shells report an interrupted process.
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the management API at {url}")]
    #[diagnostic(
        code(iisadm::connection_failed),
        help(
            "Check that the IIS Administration service is running and reachable.\n\
             The default port is 55539. Try: iisadm pools list --insecure"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: iisadm_api::Error,
    },

    #[error("TLS setup failed: {message}")]
    #[diagnostic(
        code(iisadm::tls_error),
        help(
            "The management API usually serves a self-signed certificate.\n\
             Use --insecure (-k) to accept it, or configure ca_cert in your profile."
        )
    )]
    TlsError { message: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed ({status}) for {url}")]
    #[diagnostic(
        code(iisadm::auth_failed),
        help(
            "Verify the access token, or the Windows account and its domain.\n\
             The account must be allowed by the API's security configuration."
        )
    )]
    AuthFailed { status: String, url: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(iisadm::no_credentials),
        help(
            "Set IISADM_ACCESS_KEY, or a username with IISADM_PASSWORD.\n\
             Secrets can also live in the OS keyring under service 'iisadm'."
        )
    )]
    NoCredentials { profile: String },

    #[error("Access token could not be minted")]
    #[diagnostic(
        code(iisadm::token_failed),
        help("The Windows account was rejected or the security endpoint is disabled.")
    )]
    TokenFailed {
        #[source]
        source: iisadm_api::Error,
    },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(iisadm::not_found),
        help("Run: iisadm {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Conflict from {url}: {body}")]
    #[diagnostic(code(iisadm::conflict))]
    Conflict { url: String, body: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API request failed")]
    #[diagnostic(code(iisadm::api_error))]
    Api {
        #[source]
        source: iisadm_api::Error,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(iisadm::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(iisadm::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No configuration and no --host given")]
    #[diagnostic(
        code(iisadm::no_config),
        help(
            "Pass --host and credentials, or create a profile.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(iisadm::config))]
    Config(Box<ConfigError>),

    // ── Interruption ─────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(iisadm::timeout),
        help("Increase the per-attempt timeout with --timeout or check server load.")
    )]
    Timeout { seconds: u64 },

    #[error("Interrupted")]
    #[diagnostic(code(iisadm::cancelled))]
    Cancelled,

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } | Self::TokenFailed { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Cancelled => exit_code::CANCELLED,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

fn list_command(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::AppPool => "pools list",
        ResourceKind::Website | ResourceKind::Application => "sites list",
        ResourceKind::File => "files list",
        ResourceKind::Certificate => "certs list",
    }
}

// ── iisadm_api::Error → CliError mapping ─────────────────────────────

impl From<iisadm_api::Error> for CliError {
    fn from(err: iisadm_api::Error) -> Self {
        use iisadm_api::Error as Api;

        match err {
            Api::NotFound { kind, key } => CliError::NotFound {
                resource_type: kind.to_string(),
                identifier: key,
                list_command: list_command(kind).into(),
            },
            Api::Timeout { timeout_secs, .. } => CliError::Timeout {
                seconds: timeout_secs,
            },
            Api::Tls(message) => CliError::TlsError { message },
            Api::Api {
                url, status, body, ..
            } if status.as_u16() == 409 => CliError::Conflict { url, body },
            Api::Api { url, status, .. } if status.as_u16() == 404 => CliError::NotFound {
                resource_type: "resource".into(),
                identifier: url,
                list_command: "--help".into(),
            },
            Api::Api { url, status, .. } if matches!(status.as_u16(), 401 | 403) => {
                CliError::AuthFailed {
                    status: status.to_string(),
                    url,
                }
            }
            other => match other.kind() {
                ErrorKind::Cancelled => CliError::Cancelled,
                ErrorKind::Network => CliError::ConnectionFailed {
                    url: match &other {
                        Api::Transport { url, .. } => url.clone(),
                        _ => String::new(),
                    },
                    source: other,
                },
                ErrorKind::Protocol => CliError::TokenFailed { source: other },
                _ => CliError::Api { source: other },
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            other => CliError::Config(Box::new(other)),
        }
    }
}
