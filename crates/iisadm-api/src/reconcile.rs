// Create-or-adopt reconciliation
//
// The management API has no upsert. A create that hits 409 Conflict is
// answered by asking the server what it already holds under the same
// natural key, and adopting that resource as the create's outcome.

use std::fmt;
use std::future::Future;

use tracing::{debug, info, warn};

use crate::error::Error;

/// Kinds of named resources the reconciler knows how to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    AppPool,
    Website,
    Application,
    File,
    Certificate,
}

impl ResourceKind {
    /// How natural keys of this kind are compared.
    pub fn key_match(self) -> KeyMatch {
        match self {
            Self::File => KeyMatch::NormalizedPath,
            Self::AppPool | Self::Website | Self::Application | Self::Certificate => {
                KeyMatch::Exact
            }
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AppPool => "application pool",
            Self::Website => "website",
            Self::Application => "application",
            Self::File => "file",
            Self::Certificate => "certificate",
        })
    }
}

/// Key comparison strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
    /// Byte-for-byte name equality.
    Exact,
    /// Windows physical paths: case-insensitive, `/` and `\` alike,
    /// trailing separators ignored.
    NormalizedPath,
}

impl KeyMatch {
    pub fn matches(self, candidate: &str, key: &str) -> bool {
        match self {
            Self::Exact => candidate == key,
            Self::NormalizedPath => normalize_path(candidate) == normalize_path(key),
        }
    }
}

/// Canonical form of a Windows physical path for comparison.
pub fn normalize_path(path: &str) -> String {
    let normalized = path.replace('/', "\\").to_lowercase();
    normalized.trim_end_matches('\\').to_owned()
}

/// A server representation that can be matched by natural key.
pub trait NamedResource {
    /// Name, or physical path for files.
    fn natural_key(&self) -> &str;

    /// Server-assigned identifier.
    fn remote_id(&self) -> &str;
}

/// First item in list order whose natural key matches `key`.
pub fn find_by_key<T: NamedResource>(kind: ResourceKind, items: Vec<T>, key: &str) -> Option<T> {
    let strategy = kind.key_match();
    items
        .into_iter()
        .find(|item| strategy.matches(item.natural_key(), key))
}

/// Create a named resource, adopting an existing one on conflict.
///
/// `create` runs once. Only a 409 triggers `lookup`; a match in its list is
/// returned as if the create had succeeded. No match, or a failed lookup,
/// surfaces the original conflict. Every other error passes through
/// untouched.
pub async fn create_or_adopt<T, C, CF, L, LF>(
    kind: ResourceKind,
    key: &str,
    create: C,
    lookup: L,
) -> Result<T, Error>
where
    T: NamedResource,
    C: FnOnce() -> CF,
    CF: Future<Output = Result<T, Error>>,
    L: FnOnce() -> LF,
    LF: Future<Output = Result<Vec<T>, Error>>,
{
    create_or_adopt_with(kind, key, create, || async move {
        lookup().await.map(|items| find_by_key(kind, items, key))
    })
    .await
}

/// [`create_or_adopt`] for resources whose match needs more than one list
/// call. `find` runs only after a 409 and does its own matching; whatever
/// it needs to fetch is fetched then, never before the create.
pub async fn create_or_adopt_with<T, C, CF, F, FF>(
    kind: ResourceKind,
    key: &str,
    create: C,
    find: F,
) -> Result<T, Error>
where
    T: NamedResource,
    C: FnOnce() -> CF,
    CF: Future<Output = Result<T, Error>>,
    F: FnOnce() -> FF,
    FF: Future<Output = Result<Option<T>, Error>>,
{
    let conflict = match create().await {
        Ok(created) => {
            debug!(%kind, key, id = created.remote_id(), "created");
            return Ok(created);
        }
        Err(e) if e.is_conflict() => e,
        Err(e) => return Err(e),
    };

    match find().await {
        Ok(Some(existing)) => {
            info!(%kind, key, id = existing.remote_id(), "adopted existing resource");
            return Ok(existing);
        }
        Ok(None) => debug!(%kind, key, "conflict but no matching resource listed"),
        Err(e) => warn!(%kind, key, error = %e, "lookup after conflict failed"),
    }
    Err(conflict)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: &'static str,
        key: &'static str,
    }

    impl NamedResource for Item {
        fn natural_key(&self) -> &str {
            self.key
        }
        fn remote_id(&self) -> &str {
            self.id
        }
    }

    #[test]
    fn path_normalization() {
        assert_eq!(normalize_path(r"C:\inetpub\WWWRoot\"), r"c:\inetpub\wwwroot");
        assert_eq!(normalize_path("C:/inetpub/wwwroot//"), r"c:\inetpub\wwwroot");
        assert!(KeyMatch::NormalizedPath.matches(r"C:\Sites\App", "c:/sites/app/"));
        assert!(!KeyMatch::NormalizedPath.matches(r"C:\Sites\App", r"C:\Sites\App2"));
    }

    #[test]
    fn exact_names_are_case_sensitive() {
        assert!(KeyMatch::Exact.matches("Pool1", "Pool1"));
        assert!(!KeyMatch::Exact.matches("pool1", "Pool1"));
    }

    #[test]
    fn key_strategy_per_kind() {
        assert_eq!(ResourceKind::File.key_match(), KeyMatch::NormalizedPath);
        assert_eq!(ResourceKind::AppPool.key_match(), KeyMatch::Exact);
        assert_eq!(ResourceKind::Website.key_match(), KeyMatch::Exact);
    }

    #[test]
    fn first_match_wins() {
        let items = vec![
            Item { id: "a", key: "other" },
            Item { id: "b", key: "Pool1" },
            Item { id: "c", key: "Pool1" },
        ];
        let found = find_by_key(ResourceKind::AppPool, items, "Pool1").unwrap();
        assert_eq!(found.id, "b");
    }

    #[test]
    fn kinds_read_as_prose() {
        assert_eq!(ResourceKind::AppPool.to_string(), "application pool");
        assert_eq!(ResourceKind::File.to_string(), "file");
    }
}
