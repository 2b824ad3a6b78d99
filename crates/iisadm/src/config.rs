//! CLI configuration -- thin wrapper around `iisadm_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--host, --access-key, --username, ...).

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use iisadm_api::SessionConfig;
use iisadm_config::{Config, Profile};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use iisadm_config::{config_path, load_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Copy `profile` with every flag the user passed laid over it.
pub fn apply_overrides(profile: &Profile, global: &GlobalOpts) -> Profile {
    let mut profile = profile.clone();
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(ref key) = global.access_key {
        profile.access_key = Some(key.clone());
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if let Some(ref domain) = global.domain {
        profile.domain = Some(domain.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}

/// Build a `SessionConfig` from the config file, profile, and CLI overrides.
///
/// Without a matching profile, `--host` plus credentials from flags or the
/// environment are enough.
pub fn build_session_config(
    global: &GlobalOpts,
    cancel: CancellationToken,
) -> Result<SessionConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let base = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.host.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            names.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    let profile = apply_overrides(&base, global);
    let mut session =
        iisadm_config::profile_to_session_config(&profile, &profile_name, &cfg.defaults)?;

    // The flag outranks IISADM_ACCESS_KEY and the keyring.
    if let Some(ref key) = global.access_key {
        session.access_key = Some(SecretString::from(key.clone()));
    }
    session.cancel = cancel;
    Ok(session)
}
