mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use iisadm_api::IisClient;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_interrupt(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received; cancelling");
            token.cancel();
        }
    });
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a server
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "iisadm", &mut std::io::stdout());
            Ok(())
        }

        // Minting talks to the security endpoint directly
        Command::Token(args) => {
            let cancel = CancellationToken::new();
            cancel_on_interrupt(&cancel);
            let session = config::build_session_config(&cli.global, cancel)?;
            commands::token::handle(&session, args, &cli.global).await
        }

        cmd => {
            let cancel = CancellationToken::new();
            cancel_on_interrupt(&cancel);
            let session = config::build_session_config(&cli.global, cancel)?;
            let client = IisClient::establish(&session).await?;

            tracing::debug!(command = ?cmd, auth = client.auth_mode().label(), "dispatching command");
            commands::dispatch(cmd, &client, &cli.global).await
        }
    }
}
