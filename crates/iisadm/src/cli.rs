//! Clap derive structures for the `iisadm` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use iisadm_api::resources::{Binding, Reference};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// iisadm -- manage IIS through the IIS Administration API
#[derive(Debug, Parser)]
#[command(
    name = "iisadm",
    version,
    about = "Manage IIS servers through the IIS Administration API",
    long_about = "Administer IIS application pools, websites, files and certificates.\n\n\
        Authenticates with an access token, a Windows account, or both. When only\n\
        a Windows account is configured, an access token is minted on connect.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "IISADM_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Management API URL (overrides profile)
    #[arg(long, env = "IISADM_HOST", global = true)]
    pub host: Option<String>,

    /// Access token for the management API
    #[arg(long, env = "IISADM_ACCESS_KEY", global = true, hide_env = true)]
    pub access_key: Option<String>,

    /// Windows account for challenge-response authentication
    #[arg(long, short = 'u', env = "IISADM_USERNAME", global = true)]
    pub username: Option<String>,

    /// Windows domain of the account
    #[arg(long, env = "IISADM_DOMAIN", global = true)]
    pub domain: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "IISADM_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "IISADM_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-attempt request timeout in seconds (overrides profile)
    #[arg(long, env = "IISADM_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mint access tokens from a Windows account
    Token(TokenArgs),

    /// Manage application pools
    #[command(alias = "pool")]
    Pools(PoolsArgs),

    /// Manage websites
    #[command(alias = "site")]
    Sites(SitesArgs),

    /// Browse and manage files under website roots
    #[command(alias = "fs")]
    Files(FilesArgs),

    /// List server certificates
    #[command(alias = "cert")]
    Certs(CertsArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Token ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Mint a new access token
    Create {
        /// Expiry timestamp; omit for a token that never expires
        #[arg(long)]
        expires_on: Option<String>,
    },
}

// ── Application pools ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PoolsArgs {
    #[command(subcommand)]
    pub command: PoolsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PoolsCommand {
    /// List application pools
    #[command(alias = "ls")]
    List,

    /// Show one application pool by id, or by name with --by-name
    Get {
        id: String,
        #[arg(long)]
        by_name: bool,
    },

    /// Create a pool, adopting an existing one with the same name
    Create {
        name: String,
        /// Managed runtime version (e.g. v4.0); empty for no managed code
        #[arg(long)]
        runtime: Option<String>,
    },

    /// Start a stopped pool
    Start { id: String },

    /// Stop a running pool
    Stop { id: String },

    /// Delete an application pool
    #[command(alias = "rm")]
    Delete { id: String },
}

// ── Websites ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SitesArgs {
    #[command(subcommand)]
    pub command: SitesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SitesCommand {
    /// List websites
    #[command(alias = "ls")]
    List,

    /// Show one website by id, or by name with --by-name
    Get {
        id: String,
        #[arg(long)]
        by_name: bool,
    },

    /// Create a website, adopting an existing one with the same name
    Create {
        name: String,
        /// Physical path of the site root
        #[arg(long)]
        path: String,
        /// Application pool id
        #[arg(long)]
        pool: Option<String>,
        /// Binding as protocol:ip:port[:hostname[:certificate-id]] (repeatable)
        #[arg(long = "binding", value_parser = parse_binding, required = true)]
        bindings: Vec<Binding>,
    },

    /// Change a website's physical path
    SetPath { id: String, path: String },

    /// Delete a website
    #[command(alias = "rm")]
    Delete { id: String },
}

/// Parse `protocol:ip:port[:hostname[:certificate-id]]`.
pub fn parse_binding(raw: &str) -> Result<Binding, String> {
    let mut parts = raw.splitn(5, ':');
    let protocol = parts.next().filter(|p| !p.is_empty());
    let ip_address = parts.next();
    let port = parts.next();
    let (Some(protocol), Some(ip_address), Some(port)) = (protocol, ip_address, port) else {
        return Err(format!(
            "expected protocol:ip:port[:hostname[:certificate-id]], got '{raw}'"
        ));
    };
    let port: u16 = port
        .parse()
        .map_err(|_| format!("invalid port '{port}' in binding '{raw}'"))?;
    let hostname = parts.next().unwrap_or_default().to_owned();
    let certificate = parts.next().filter(|c| !c.is_empty()).map(Reference::id);

    Ok(Binding {
        protocol: protocol.to_owned(),
        ip_address: ip_address.to_owned(),
        port,
        hostname,
        certificate,
    })
}

// ── Files ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FilesArgs {
    #[command(subcommand)]
    pub command: FilesCommand,
}

#[derive(Debug, Subcommand)]
pub enum FilesCommand {
    /// List the children of a directory (or the roots)
    #[command(alias = "ls")]
    List {
        /// Parent directory id
        #[arg(long, conflicts_with = "website")]
        parent: Option<String>,
        /// List through the web server view, scoped to a website id
        #[arg(long)]
        website: Option<String>,
    },

    /// Show one file or directory
    Get { id: String },

    /// Create a directory, adopting an existing one at the same path
    Mkdir {
        name: String,
        /// Parent directory id
        #[arg(long)]
        parent: String,
    },

    /// Find a file or directory by physical path
    Find {
        path: String,
        /// Directory id to search under (defaults to the roots)
        #[arg(long)]
        root: Option<String>,
    },

    /// Copy a file or directory into another directory
    #[command(alias = "cp")]
    Copy {
        id: String,
        /// Destination directory id
        #[arg(long)]
        to: String,
        /// Name at the destination
        #[arg(long)]
        name: Option<String>,
    },

    /// Move a file or directory into another directory
    #[command(alias = "mv")]
    Move {
        id: String,
        /// Destination directory id
        #[arg(long)]
        to: String,
        /// Name at the destination
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a file or directory
    #[command(alias = "rm")]
    Delete { id: String },
}

// ── Certificates ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CertsArgs {
    #[command(subcommand)]
    pub command: CertsCommand,
}

#[derive(Debug, Subcommand)]
pub enum CertsCommand {
    /// List certificates in the server's stores
    #[command(alias = "ls")]
    List,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the loaded configuration with secrets masked
    Show,

    /// List configured profiles
    Profiles,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
