//! File command handlers.

use tabled::Tabled;

use iisadm_api::IisClient;
use iisadm_api::resources::{CopyMoveRequest, File, FileRef};

use crate::cli::{FilesArgs, FilesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Path")]
    path: String,
}

impl From<&File> for FileRow {
    fn from(f: &File) -> Self {
        Self {
            id: f.id.clone(),
            name: f.name.clone(),
            kind: kind_label(f),
            size: f.size.map(|s| s.to_string()).unwrap_or_default(),
            path: f.physical_path.clone(),
        }
    }
}

fn kind_label(f: &File) -> &'static str {
    if f.is_directory() { "dir" } else { "file" }
}

fn detail(f: &File) -> String {
    let mut pairs = vec![
        ("ID", f.id.clone()),
        ("Name", f.name.clone()),
        ("Type", kind_label(f).to_owned()),
        ("Path", f.physical_path.clone()),
        ("Exists", f.exists.to_string()),
    ];
    if let Some(size) = f.size {
        pairs.push(("Size", size.to_string()));
    }
    if let Some(total) = f.total_files {
        pairs.push(("Files", total.to_string()));
    }
    if let Some(ref modified) = f.last_modified {
        pairs.push(("Modified", modified.clone()));
    }
    if let Some(ref parent) = f.parent {
        pairs.push(("Parent", parent.id.clone()));
    }
    output::detail(&pairs)
}

fn print_file(file: &File, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, file, detail, |f| f.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn print_files(files: &[File], global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_list(
        &global.output,
        files,
        |f| FileRow::from(f),
        |f| f.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn copy_move_request(id: String, to: String, name: Option<String>) -> CopyMoveRequest {
    CopyMoveRequest {
        name,
        file: FileRef::id(id),
        parent: FileRef::id(to),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &IisClient,
    args: FilesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        FilesCommand::List { parent, website } => {
            let files = if website.is_some() {
                client.list_webserver_files(website.as_deref()).await?
            } else {
                client.list_files(parent.as_deref()).await?
            };
            print_files(&files, global)
        }

        FilesCommand::Get { id } => {
            let file = client.get_file(&id).await?;
            print_file(&file, global)
        }

        FilesCommand::Mkdir { name, parent } => {
            let dir = client
                .create_directory(&name, Some(&FileRef::id(parent)))
                .await?;
            print_file(&dir, global)
        }

        FilesCommand::Find { path, root } => {
            let file = client
                .find_file_by_physical_path(&path, root.as_deref())
                .await?;
            print_file(&file, global)
        }

        FilesCommand::Copy { id, to, name } => {
            let file = client.copy_file(&copy_move_request(id, to, name)).await?;
            print_file(&file, global)
        }

        FilesCommand::Move { id, to, name } => {
            let file = client.move_file(&copy_move_request(id, to, name)).await?;
            print_file(&file, global)
        }

        FilesCommand::Delete { id } => {
            client.delete_file(&id).await?;
            output::notice(&format!("File {id} deleted"), global.quiet);
            Ok(())
        }
    }
}
