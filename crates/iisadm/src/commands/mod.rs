//! Command dispatch: bridges CLI args -> client calls -> output formatting.

pub mod certs;
pub mod config_cmd;
pub mod files;
pub mod pools;
pub mod sites;
pub mod token;

use iisadm_api::IisClient;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: &IisClient,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Pools(args) => pools::handle(client, args, global).await,
        Command::Sites(args) => sites::handle(client, args, global).await,
        Command::Files(args) => files::handle(client, args, global).await,
        Command::Certs(args) => certs::handle(client, args, global).await,
        // Token, Config and Completions are handled before dispatch
        Command::Token(_) | Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
