// IIS Administration API resource types
//
// Representations returned by the `/api/webserver/*`, `/api/files` and
// `/api/certificates` collections. Fields use `#[serde(default)]` because
// the server omits whatever a `fields=` filter did not ask for.

use serde::{Deserialize, Serialize};

use crate::reconcile::NamedResource;

// ── References ───────────────────────────────────────────────────────

/// A link to another resource by id, as embedded in representations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Reference {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

// ── Application pools ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationPool {
    pub id: String,
    pub name: String,
    /// `started` or `stopped`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub managed_runtime_version: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NamedResource for ApplicationPool {
    fn natural_key(&self) -> &str {
        &self.name
    }

    fn remote_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppPoolList {
    #[serde(default)]
    pub app_pools: Vec<ApplicationPool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAppPoolRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed_runtime_version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateAppPoolRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed_runtime_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

// ── Websites ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub protocol: String,
    #[serde(default)]
    pub ip_address: String,
    pub port: u16,
    #[serde(default)]
    pub hostname: String,
    /// Only meaningful for `https` bindings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Website {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub physical_path: String,
    #[serde(default)]
    pub bindings: Vec<Binding>,
    #[serde(default)]
    pub application_pool: Option<Reference>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NamedResource for Website {
    fn natural_key(&self) -> &str {
        &self.name
    }

    fn remote_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebsiteList {
    #[serde(default)]
    pub websites: Vec<Website>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateWebsiteRequest {
    pub name: String,
    pub physical_path: String,
    pub bindings: Vec<Binding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_pool: Option<Reference>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateWebsiteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_path: Option<String>,
    /// Omitted unless set, so an update never blanks a running site's status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bindings: Option<Vec<Binding>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_pool: Option<Reference>,
}

// ── Applications ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub physical_path: String,
    #[serde(default)]
    pub application_pool: Option<Reference>,
    #[serde(default)]
    pub website: Option<Reference>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateApplicationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_pool: Option<Reference>,
}

// ── Files ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    File,
    Directory,
}

/// Trimmed file representation embedded as `parent` and in copy/move bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub physical_path: String,
}

impl FileRef {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub file_type: FileType,
    #[serde(default)]
    pub physical_path: String,
    #[serde(default)]
    pub exists: bool,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub e_tag: Option<String>,
    #[serde(default)]
    pub parent: Option<FileRef>,
    /// Directories only.
    #[serde(default)]
    pub total_files: Option<u64>,
    #[serde(default)]
    pub claims: Vec<String>,
}

impl File {
    pub fn is_directory(&self) -> bool {
        self.file_type == FileType::Directory
    }

    pub fn to_ref(&self) -> FileRef {
        FileRef {
            id: self.id.clone(),
            name: self.name.clone(),
            file_type: Some(self.file_type),
            physical_path: self.physical_path.clone(),
        }
    }
}

impl NamedResource for File {
    fn natural_key(&self) -> &str {
        &self.physical_path
    }

    fn remote_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileList {
    #[serde(default)]
    pub files: Vec<File>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateFileRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<FileRef>,
    #[serde(rename = "type")]
    pub file_type: FileType,
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyMoveRequest {
    /// New name at the destination. Keeps the source name when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub file: FileRef,
    pub parent: FileRef,
}

// ── Certificates ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub issued_by: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub thumbprint: String,
}

impl NamedResource for Certificate {
    fn natural_key(&self) -> &str {
        &self.alias
    }

    fn remote_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CertificateList {
    #[serde(default)]
    pub certificates: Vec<Certificate>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn pool_keeps_unknown_fields() {
        let pool: ApplicationPool = serde_json::from_str(
            r#"{"id":"p1","name":"Pool1","status":"started","pipeline_mode":"integrated"}"#,
        )
        .unwrap();
        assert_eq!(pool.natural_key(), "Pool1");
        assert_eq!(pool.extra["pipeline_mode"], "integrated");
    }

    #[test]
    fn create_file_body() {
        let req = CreateFileRequest {
            name: "logs".into(),
            parent: Some(FileRef::id("d1")),
            file_type: FileType::Directory,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"name": "logs", "parent": {"id": "d1"}, "type": "directory"})
        );
    }

    #[test]
    fn file_type_defaults_to_file() {
        let file: File = serde_json::from_str(r#"{"id":"f1","name":"a.txt"}"#).unwrap();
        assert_eq!(file.file_type, FileType::File);
        assert!(!file.is_directory());
    }

    #[test]
    fn website_update_omits_unset_fields() {
        let req = UpdateWebsiteRequest {
            physical_path: Some(r"C:\sites\a".into()),
            ..UpdateWebsiteRequest::default()
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"physical_path": r"C:\sites\a"})
        );
    }
}
