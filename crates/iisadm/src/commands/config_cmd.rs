//! Config subcommand handlers.

use serde::Serialize;
use tabled::Tabled;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct ProfileSummary {
    name: String,
    host: String,
    auth: &'static str,
    default: bool,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Auth")]
    auth: &'static str,
    #[tabled(rename = "Default")]
    default: &'static str,
}

impl From<&ProfileSummary> for ProfileRow {
    fn from(p: &ProfileSummary) -> Self {
        Self {
            name: p.name.clone(),
            host: p.host.clone(),
            auth: p.auth,
            default: if p.default { "*" } else { "" },
        }
    }
}

/// Which credential kinds a profile names, without resolving secrets.
fn auth_label(profile: &iisadm_config::Profile) -> &'static str {
    let key = profile.access_key.is_some() || profile.access_key_env.is_some();
    let account = profile.username.is_some();
    match (key, account) {
        (true, true) => "both",
        (true, false) => "access-key",
        (false, true) => "windows",
        (false, false) => "env/keyring",
    }
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?.redacted();
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => cfg.to_toml_string()?,
                OutputFormat::Json => serde_json::to_string_pretty(&cfg)?,
                OutputFormat::JsonCompact => serde_json::to_string(&cfg)?,
                OutputFormat::Yaml => serde_yaml::to_string(&cfg)?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let active = config::active_profile_name(global, &cfg);
            let mut profiles: Vec<ProfileSummary> = cfg
                .profiles
                .iter()
                .map(|(name, p)| ProfileSummary {
                    name: name.clone(),
                    host: p.host.clone(),
                    auth: auth_label(p),
                    default: *name == active,
                })
                .collect();
            profiles.sort_by(|a, b| a.name.cmp(&b.name));

            let out = output::render_list(
                &global.output,
                &profiles,
                |p| ProfileRow::from(p),
                |p| p.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
