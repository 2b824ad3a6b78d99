//! Configuration for the iisadm CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! validation, and translation to `iisadm_api::SessionConfig`. The CLI
//! applies its flag overrides to a `Profile` before calling in here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use iisadm_api::retry::retryable_status_strict;
use iisadm_api::{
    ChallengeCredentials, RetryPolicy, SessionConfig, TlsMode, TokenEndpoint, TokenPolicy,
    TransportConfig,
};

const KEYRING_SERVICE: &str = "iisadm";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error(
        "no credentials configured for profile '{profile}': set an access key or a username and password"
    )]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }

    /// Copy with every plaintext secret replaced, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for profile in copy.profiles.values_mut() {
            for secret in [&mut profile.access_key, &mut profile.password] {
                if secret.is_some() {
                    *secret = Some("********".into());
                }
            }
        }
        copy
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default)]
    pub insecure: bool,

    /// Per-attempt request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout: default_timeout(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    5
}
fn default_base_delay_ms() -> u64 {
    1000
}

/// A named IIS server profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Management API base URL (e.g., "https://iis01.corp.local:55539").
    #[serde(default)]
    pub host: String,

    pub proxy_url: Option<String>,

    /// Accept self-signed certificates.
    pub insecure: Option<bool>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override the per-attempt timeout (seconds).
    pub timeout: Option<u64>,

    /// Access token (plaintext; prefer keyring or env var).
    pub access_key: Option<String>,

    /// Environment variable name containing the access token.
    pub access_key_env: Option<String>,

    /// Windows account for challenge-response authentication.
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or `IISADM_PASSWORD`).
    pub password: Option<String>,

    pub domain: Option<String>,

    /// What to do when a token has to be minted from the Windows account.
    pub token_policy: Option<TokenPolicy>,

    /// Expiry requested for minted tokens. Empty or unset: never expires.
    pub token_expires_on: Option<String>,

    pub max_attempts: Option<u32>,

    pub base_delay_ms: Option<u64>,

    /// Retry 403 responses (NTLM negotiation hiccups). Defaults to true.
    pub retry_on_forbidden: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "iisadm", "iisadm").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("iisadm");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path` (if present), then `IISADM_*`
/// variables with `__` separating nested keys
/// (e.g. `IISADM_PROFILES__PROD__HOST`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("IISADM_").split("__"));

    Ok(figment.extract()?)
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_secret(profile_name: &str, kind: &str) -> Option<SecretString> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{kind}")).ok()?;
    entry.get_password().ok().map(SecretString::from)
}

fn env_secret(name: &str) -> Option<SecretString> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

/// Resolve the access token: `IISADM_ACCESS_KEY`, the profile's
/// `access_key_env`, the keyring, then the plaintext field.
pub fn resolve_access_key(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    env_secret("IISADM_ACCESS_KEY")
        .or_else(|| profile.access_key_env.as_deref().and_then(env_secret))
        .or_else(|| keyring_secret(profile_name, "access-key"))
        .or_else(|| {
            profile
                .access_key
                .clone()
                .filter(|k| !k.is_empty())
                .map(SecretString::from)
        })
}

/// Resolve the Windows account password: `IISADM_PASSWORD`, the keyring,
/// then the plaintext field.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    env_secret("IISADM_PASSWORD")
        .or_else(|| keyring_secret(profile_name, "password"))
        .or_else(|| {
            profile
                .password
                .clone()
                .filter(|p| !p.is_empty())
                .map(SecretString::from)
        })
}

/// Username from the profile, falling back to `IISADM_USERNAME`.
pub fn resolve_username(profile: &Profile) -> Option<String> {
    profile
        .username
        .clone()
        .filter(|u| !u.is_empty())
        .or_else(|| std::env::var("IISADM_USERNAME").ok().filter(|u| !u.is_empty()))
}

/// Credentials a profile resolves to.
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub challenge: Option<ChallengeCredentials>,
    pub access_key: Option<SecretString>,
}

/// Walk the credential chain and require at least one usable method.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<ResolvedCredentials, ConfigError> {
    let access_key = resolve_access_key(profile, profile_name);
    let challenge = match (resolve_username(profile), resolve_password(profile, profile_name)) {
        (Some(user), Some(password)) => Some(
            ChallengeCredentials::new(user, password)
                .with_realm(profile.domain.clone().unwrap_or_default()),
        ),
        _ => None,
    };

    if access_key.is_none() && challenge.is_none() {
        return Err(ConfigError::NoCredentials {
            profile: profile_name.into(),
        });
    }
    Ok(ResolvedCredentials {
        challenge,
        access_key,
    })
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_host(host: &str) -> Result<url::Url, ConfigError> {
    if host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: "must be set".into(),
        });
    }
    let url: url::Url = host.parse().map_err(|_| ConfigError::Validation {
        field: "host".into(),
        reason: format!("invalid URL: {host}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("expected http or https, got '{}'", url.scheme()),
        });
    }
    Ok(url)
}

fn transport_config(profile: &Profile, defaults: &Defaults) -> Result<TransportConfig, ConfigError> {
    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    let proxy = profile
        .proxy_url
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<url::Url>().map_err(|_| ConfigError::Validation {
                field: "proxy_url".into(),
                reason: format!("invalid URL: {p}"),
            })
        })
        .transpose()?;

    Ok(TransportConfig {
        tls,
        attempt_timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        proxy,
        ..TransportConfig::default()
    })
}

fn retry_policy(profile: &Profile, defaults: &Defaults) -> RetryPolicy {
    let policy = RetryPolicy::default()
        .with_max_attempts(profile.max_attempts.unwrap_or(defaults.max_attempts))
        .with_base_delay(Duration::from_millis(
            profile.base_delay_ms.unwrap_or(defaults.base_delay_ms),
        ));
    if profile.retry_on_forbidden.unwrap_or(true) {
        policy
    } else {
        policy.with_retryable_status(retryable_status_strict)
    }
}

/// Validate a profile and build a `SessionConfig` from it.
pub fn profile_to_session_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let base_url = parse_host(&profile.host)?;
    let credentials = resolve_credentials(profile, profile_name)?;

    let mut session = SessionConfig::new(base_url);
    session.challenge = credentials.challenge;
    session.access_key = credentials.access_key;
    session.transport = transport_config(profile, defaults)?;
    session.retry = retry_policy(profile, defaults);
    session.token = TokenEndpoint {
        expires_on: profile.token_expires_on.clone().filter(|e| !e.is_empty()),
        ..TokenEndpoint::default()
    };
    session.token_policy = profile.token_policy.unwrap_or_default();
    Ok(session)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    fn profile(host: &str) -> Profile {
        Profile {
            host: host.into(),
            username: Some("svc-deploy".into()),
            password: Some("plain".into()),
            domain: Some("CORP".into()),
            ..Profile::default()
        }
    }

    #[test]
    fn loads_profiles_from_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                default_profile = "prod"

                [defaults]
                timeout = 45

                [profiles.prod]
                host = "https://iis01.corp.local:55539"
                username = "svc-deploy"
                domain = "CORP"
                token_policy = "required"
                max_attempts = 3
                "#,
            )?;

            let config = load_config_from(Path::new("config.toml")).unwrap();
            assert_eq!(config.default_profile.as_deref(), Some("prod"));
            assert_eq!(config.defaults.timeout, 45);
            assert_eq!(config.defaults.max_attempts, 5);

            let prod = config.profile("prod").unwrap();
            assert_eq!(prod.token_policy, Some(TokenPolicy::Required));
            assert_eq!(prod.max_attempts, Some(3));
            assert!(matches!(
                config.profile("staging"),
                Err(ConfigError::UnknownProfile { .. })
            ));
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [profiles.prod]
                host = "https://iis01:55539"
                "#,
            )?;
            jail.set_env("IISADM_DEFAULTS__TIMEOUT", "90");
            jail.set_env("IISADM_PROFILES__PROD__HOST", "https://iis02:55539");

            let config = load_config_from(Path::new("config.toml")).unwrap();
            assert_eq!(config.defaults.timeout, 90);
            assert_eq!(config.profile("prod").unwrap().host, "https://iis02:55539");
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_| {
            let config = load_config_from(Path::new("absent.toml")).unwrap();
            assert_eq!(config.default_profile.as_deref(), Some("default"));
            assert!(config.profiles.is_empty());
            Ok(())
        });
    }

    #[test]
    fn env_password_beats_plaintext() {
        Jail::expect_with(|jail| {
            jail.set_env("IISADM_PASSWORD", "from-env");
            let secret = resolve_password(&profile("https://iis01"), "jail-test").unwrap();
            assert_eq!(secrecy::ExposeSecret::expose_secret(&secret), "from-env");
            Ok(())
        });
    }

    #[test]
    fn access_key_env_indirection() {
        Jail::expect_with(|jail| {
            jail.set_env("DEPLOY_IIS_TOKEN", "tok-from-env");
            let p = Profile {
                access_key_env: Some("DEPLOY_IIS_TOKEN".into()),
                access_key: Some("plaintext".into()),
                ..Profile::default()
            };
            let key = resolve_access_key(&p, "jail-test").unwrap();
            assert_eq!(secrecy::ExposeSecret::expose_secret(&key), "tok-from-env");
            Ok(())
        });
    }

    #[test]
    fn builds_session_config() {
        let mut p = profile("https://iis01.corp.local:55539");
        p.insecure = Some(true);
        p.retry_on_forbidden = Some(false);
        p.token_expires_on = Some(String::new());

        let session = profile_to_session_config(&p, "jail-test", &Defaults::default()).unwrap();
        assert_eq!(session.base_url.as_str(), "https://iis01.corp.local:55539/");
        assert_eq!(
            session.challenge.as_ref().map(ChallengeCredentials::principal),
            Some("CORP\\svc-deploy".to_owned())
        );
        assert!(matches!(session.transport.tls, TlsMode::DangerAcceptInvalid));
        assert_eq!(session.transport.attempt_timeout, Duration::from_secs(30));
        assert_eq!(session.retry.max_attempts, 5);
        assert_eq!(session.token.expires_on, None);
        assert_eq!(session.token_policy, TokenPolicy::BestEffort);
        assert!(!(session.retry.retryable_status)(
            iisadm_api::StatusCode::FORBIDDEN
        ));
    }

    #[test]
    fn host_is_required() {
        let err = profile_to_session_config(&profile(""), "jail-test", &Defaults::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "host"));

        let err = profile_to_session_config(&profile("ftp://iis01"), "jail-test", &Defaults::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn credentials_are_required() {
        Jail::expect_with(|_| {
            let p = Profile {
                host: "https://iis01".into(),
                username: Some("svc".into()),
                ..Profile::default()
            };
            let err = profile_to_session_config(&p, "jail-test", &Defaults::default()).unwrap_err();
            assert!(matches!(err, ConfigError::NoCredentials { .. }));
            Ok(())
        });
    }

    #[test]
    fn redaction_hides_plaintext_secrets() {
        let mut config = Config::default();
        config.profiles.insert("prod".into(), profile("https://iis01"));
        let shown = config.redacted().to_toml_string().unwrap();
        assert!(!shown.contains("plain"), "{shown}");
        assert!(shown.contains("********"));
    }
}
