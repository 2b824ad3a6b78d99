// File and directory endpoints
//
// `/api/files` addresses the server's file system through the
// directories the management API is allowed to see. Files have no
// unique name, so create-or-adopt keys on the full physical path.

use tracing::debug;

use crate::client::{IisClient, escape};
use crate::error::Error;
use crate::reconcile::{ResourceKind, create_or_adopt_with, find_by_key, normalize_path};
use crate::resources::models::{CopyMoveRequest, CreateFileRequest, File, FileList, FileRef, FileType};

const FILES: &str = "/api/files";
const WEBSERVER_FILES: &str = "/api/webserver/files";

impl IisClient {
    // ── Create ───────────────────────────────────────────────────────

    /// Create a file or directory under `parent`.
    ///
    /// With a parent, a conflict adopts the sibling whose physical path
    /// matches `parent\name`. Without one there is nothing to scan and the
    /// conflict is returned as is.
    ///
    /// `POST /api/files`
    pub async fn create_file(
        &self,
        name: &str,
        parent: Option<&FileRef>,
        file_type: FileType,
    ) -> Result<File, Error> {
        let body = CreateFileRequest {
            name: name.to_owned(),
            parent: parent.map(|p| FileRef::id(p.id.clone())),
            file_type,
        };
        debug!(name, ?file_type, parent = parent.map(|p| p.id.as_str()), "creating file");

        let Some(parent) = parent else {
            return self.post_json(FILES, &body).await;
        };

        create_or_adopt_with(
            ResourceKind::File,
            name,
            || self.post_json(FILES, &body),
            || self.find_child(parent, name),
        )
        .await
    }

    pub async fn create_directory(&self, name: &str, parent: Option<&FileRef>) -> Result<File, Error> {
        self.create_file(name, parent, FileType::Directory).await
    }

    /// The child of `parent` at `parent\name`. Looks the parent up first
    /// when the reference doesn't carry its physical path.
    async fn find_child(&self, parent: &FileRef, name: &str) -> Result<Option<File>, Error> {
        let parent_path = if parent.physical_path.is_empty() {
            self.get_file(&parent.id).await?.physical_path
        } else {
            parent.physical_path.clone()
        };
        let key = join_path(&parent_path, name);
        let children = self.list_files(Some(&parent.id)).await?;
        Ok(find_by_key(ResourceKind::File, children, &key))
    }

    // ── Read ─────────────────────────────────────────────────────────

    /// `GET /api/files/{id}`
    pub async fn get_file(&self, id: &str) -> Result<File, Error> {
        self.get_json(&format!("{FILES}/{}", escape(id))).await
    }

    /// Children of `parent_id`, or the top-level roots without one.
    ///
    /// `GET /api/files[?parent.id={id}]`
    pub async fn list_files(&self, parent_id: Option<&str>) -> Result<Vec<File>, Error> {
        let path = match parent_id {
            Some(id) => format!("{FILES}?parent.id={}", escape(id)),
            None => FILES.to_owned(),
        };
        let list: FileList = self.get_json(&path).await?;
        Ok(list.files)
    }

    /// Find a file by physical path with a depth-first walk from `root`
    /// (or from the top-level roots). Only directories on the way to the
    /// target are listed.
    pub async fn find_file_by_physical_path(
        &self,
        physical_path: &str,
        root: Option<&str>,
    ) -> Result<File, Error> {
        let target = normalize_path(physical_path);
        let mut pending: Vec<Option<String>> = vec![root.map(str::to_owned)];

        while let Some(dir) = pending.pop() {
            for file in self.list_files(dir.as_deref()).await? {
                let candidate = normalize_path(&file.physical_path);
                if candidate == target {
                    return Ok(file);
                }
                if file.is_directory() && is_ancestor(&candidate, &target) {
                    pending.push(Some(file.id));
                }
            }
        }

        Err(Error::NotFound {
            kind: ResourceKind::File,
            key: physical_path.to_owned(),
        })
    }

    /// `GET /api/webserver/files[?website.id={id}]`
    pub async fn list_webserver_files(&self, website_id: Option<&str>) -> Result<Vec<File>, Error> {
        let path = match website_id {
            Some(id) => format!("{WEBSERVER_FILES}?website.id={}", escape(id)),
            None => WEBSERVER_FILES.to_owned(),
        };
        let list: FileList = self.get_json(&path).await?;
        Ok(list.files)
    }

    /// `GET /api/webserver/files/{id}`
    pub async fn get_webserver_file(&self, id: &str) -> Result<File, Error> {
        self.get_json(&format!("{WEBSERVER_FILES}/{}", escape(id))).await
    }

    // ── Copy / move / delete ─────────────────────────────────────────

    /// `POST /api/files/copy`
    pub async fn copy_file(&self, request: &CopyMoveRequest) -> Result<File, Error> {
        debug!(file = %request.file.id, parent = %request.parent.id, "copying file");
        self.post_json(&format!("{FILES}/copy"), request).await
    }

    /// `POST /api/files/move`
    pub async fn move_file(&self, request: &CopyMoveRequest) -> Result<File, Error> {
        debug!(file = %request.file.id, parent = %request.parent.id, "moving file");
        self.post_json(&format!("{FILES}/move"), request).await
    }

    /// `DELETE /api/files/{id}`
    pub async fn delete_file(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting file");
        self.delete(&format!("{FILES}/{}", escape(id))).await
    }
}

fn join_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches(['\\', '/']);
    format!("{parent}\\{name}")
}

/// Whether normalized `dir` is a proper ancestor of normalized `target`.
fn is_ancestor(dir: &str, target: &str) -> bool {
    target
        .strip_prefix(dir)
        .is_some_and(|rest| rest.starts_with('\\'))
}
