//! Token command handlers.

use secrecy::ExposeSecret;
use serde::Serialize;

use iisadm_api::{AuthMode, IisClient, SessionConfig, TokenEndpoint};

use crate::cli::{GlobalOpts, TokenArgs, TokenCommand};
use crate::error::CliError;
use crate::output;

/// What `token create` prints. The secret is the whole point of the
/// command, so it is exposed here and nowhere else.
#[derive(Serialize)]
struct MintedToken<'a> {
    id: &'a str,
    access_token: &'a str,
    expires_on: Option<&'a str>,
}

fn detail(t: &MintedToken<'_>) -> String {
    output::detail(&[
        ("ID", t.id.to_owned()),
        ("Token", t.access_token.to_owned()),
        ("Expires", t.expires_on.unwrap_or("never").to_owned()),
    ])
}

pub async fn handle(
    session: &SessionConfig,
    args: TokenArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        TokenCommand::Create { expires_on } => {
            let challenge = session.challenge.clone().ok_or_else(|| CliError::Validation {
                field: "username".into(),
                reason: "minting a token needs a Windows account and password".into(),
            })?;

            let endpoint = TokenEndpoint {
                expires_on: expires_on
                    .filter(|e| !e.is_empty())
                    .or_else(|| session.token.expires_on.clone()),
                ..session.token.clone()
            };

            let client = IisClient::new(
                session.base_url.clone(),
                AuthMode::ChallengeResponse(challenge.clone()),
                &session.transport,
            )?
            .with_cancellation(session.cancel.clone());

            let issued = client.acquire_token(&challenge, &endpoint).await?;
            let shown = MintedToken {
                id: &issued.id,
                access_token: issued.access_token.expose_secret(),
                expires_on: issued.expires_on.as_deref(),
            };
            let out = output::render_single(&global.output, &shown, detail, |t| {
                t.access_token.to_owned()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
