//! Website command handlers.

use tabled::Tabled;

use iisadm_api::IisClient;
use iisadm_api::resources::{
    Binding, CreateWebsiteRequest, Reference, UpdateWebsiteRequest, Website,
};

use crate::cli::{GlobalOpts, SitesArgs, SitesCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Bindings")]
    bindings: String,
    #[tabled(rename = "Path")]
    path: String,
}

impl SiteRow {
    fn new(s: &Website, color: bool) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            status: output::status_cell(&s.status, color),
            bindings: format_bindings(&s.bindings, ", "),
            path: s.physical_path.clone(),
        }
    }
}

fn format_binding(b: &Binding) -> String {
    if b.hostname.is_empty() {
        format!("{}://{}:{}", b.protocol, b.ip_address, b.port)
    } else {
        format!("{}://{}:{} ({})", b.protocol, b.ip_address, b.port, b.hostname)
    }
}

fn format_bindings(bindings: &[Binding], sep: &str) -> String {
    bindings
        .iter()
        .map(format_binding)
        .collect::<Vec<_>>()
        .join(sep)
}

fn detail(s: &Website) -> String {
    let pool = s
        .application_pool
        .as_ref()
        .map(|p| p.name.clone().unwrap_or_else(|| p.id.clone()))
        .unwrap_or_default();
    output::detail(&[
        ("ID", s.id.clone()),
        ("Name", s.name.clone()),
        ("Status", s.status.clone()),
        ("Path", s.physical_path.clone()),
        ("Pool", pool),
        ("Bindings", format_bindings(&s.bindings, "\n          ")),
    ])
}

fn print_site(site: &Website, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, site, detail, |s| s.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &IisClient,
    args: SitesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SitesCommand::List => {
            let sites = client.list_websites().await?;
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &sites,
                |s| SiteRow::new(s, color),
                |s| s.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SitesCommand::Get { id, by_name } => {
            let site = if by_name {
                client.find_website_by_name(&id).await?
            } else {
                client.get_website(&id).await?
            };
            print_site(&site, global)
        }

        SitesCommand::Create {
            name,
            path,
            pool,
            bindings,
        } => {
            let request = CreateWebsiteRequest {
                name,
                physical_path: path,
                bindings,
                application_pool: pool.map(Reference::id),
            };
            let site = client.create_website(&request).await?;
            print_site(&site, global)
        }

        SitesCommand::SetPath { id, path } => {
            let update = UpdateWebsiteRequest {
                physical_path: Some(path),
                ..UpdateWebsiteRequest::default()
            };
            let site = client.update_website(&id, &update).await?;
            print_site(&site, global)
        }

        SitesCommand::Delete { id } => {
            client.delete_website(&id).await?;
            output::notice(&format!("Website {id} deleted"), global.quiet);
            Ok(())
        }
    }
}
