//! Application pool command handlers.

use tabled::Tabled;

use iisadm_api::IisClient;
use iisadm_api::resources::{ApplicationPool, UpdateAppPoolRequest};

use crate::cli::{GlobalOpts, PoolsArgs, PoolsCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PoolRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Runtime")]
    runtime: String,
}

impl PoolRow {
    fn new(p: &ApplicationPool, color: bool) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            status: output::status_cell(&p.status, color),
            runtime: p.managed_runtime_version.clone(),
        }
    }
}

fn detail(p: &ApplicationPool) -> String {
    output::detail(&[
        ("ID", p.id.clone()),
        ("Name", p.name.clone()),
        ("Status", p.status.clone()),
        ("Runtime", p.managed_runtime_version.clone()),
    ])
}

fn print_pool(pool: &ApplicationPool, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, pool, detail, |p| p.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &IisClient,
    args: PoolsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        PoolsCommand::List => {
            let pools = client.list_app_pools().await?;
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &pools,
                |p| PoolRow::new(p, color),
                |p| p.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PoolsCommand::Get { id, by_name } => {
            let pool = if by_name {
                client.find_app_pool_by_name(&id).await?
            } else {
                client.get_app_pool(&id).await?
            };
            print_pool(&pool, global)
        }

        PoolsCommand::Create { name, runtime } => {
            let pool = client.create_app_pool(&name, runtime.as_deref()).await?;
            print_pool(&pool, global)
        }

        PoolsCommand::Start { id } => set_status(client, &id, "started", global).await,

        PoolsCommand::Stop { id } => set_status(client, &id, "stopped", global).await,

        PoolsCommand::Delete { id } => {
            client.delete_app_pool(&id).await?;
            output::notice(&format!("Application pool {id} deleted"), global.quiet);
            Ok(())
        }
    }
}

async fn set_status(
    client: &IisClient,
    id: &str,
    status: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let update = UpdateAppPoolRequest {
        status: Some(status.into()),
        ..UpdateAppPoolRequest::default()
    };
    let pool = client.update_app_pool(id, &update).await?;
    print_pool(&pool, global)
}
