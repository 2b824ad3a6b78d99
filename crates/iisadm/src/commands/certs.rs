//! Certificate command handlers.

use tabled::Tabled;

use iisadm_api::IisClient;
use iisadm_api::resources::Certificate;

use crate::cli::{CertsArgs, CertsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct CertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Issued By")]
    issued_by: String,
    #[tabled(rename = "Thumbprint")]
    thumbprint: String,
}

impl From<&Certificate> for CertRow {
    fn from(c: &Certificate) -> Self {
        Self {
            id: c.id.clone(),
            alias: c.alias.clone(),
            subject: c.subject.clone(),
            issued_by: c.issued_by.clone(),
            thumbprint: c.thumbprint.clone(),
        }
    }
}

pub async fn handle(
    client: &IisClient,
    args: CertsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        CertsCommand::List => {
            let certs = client.list_certificates().await?;
            let out = output::render_list(
                &global.output,
                &certs,
                |c| CertRow::from(c),
                |c| c.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
