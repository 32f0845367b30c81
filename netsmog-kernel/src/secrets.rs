use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("cannot read secrets file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid secrets file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Secrets partagés des workers (`worker = "secret"`).
#[derive(Clone, Default)]
pub struct SecretStore {
    secrets: HashMap<String, String>,
}

impl SecretStore {
    pub fn parse(txt: &str, path: &Path) -> Result<Self, SecretsError> {
        let secrets = toml::from_str(txt).map_err(|source| SecretsError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { secrets })
    }

    pub async fn load(path: &Path) -> Result<Self, SecretsError> {
        let txt = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SecretsError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&txt, path)
    }

    pub fn lookup(&self, worker: &str) -> Option<String> {
        self.secrets.get(worker).cloned()
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl FromIterator<(String, String)> for SecretStore {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { secrets: iter.into_iter().collect() }
    }
}

// pas de secrets dans les logs
impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut workers: Vec<_> = self.secrets.keys().collect();
        workers.sort();
        f.debug_struct("SecretStore").field("workers", &workers).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_lookup() {
        let store = SecretStore::parse("w1 = \"hunter2\"\n\"paris-01\" = \"s3cr3t\"\n", Path::new("s.toml")).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup("w1").as_deref(), Some("hunter2"));
        assert_eq!(store.lookup("paris-01").as_deref(), Some("s3cr3t"));
        assert!(store.lookup("w2").is_none());
    }

    #[test]
    fn test_rejects_non_string_secret() {
        assert!(matches!(
            SecretStore::parse("w1 = 42\n", Path::new("s.toml")),
            Err(SecretsError::Toml { .. })
        ));
    }

    #[test]
    fn test_debug_hides_values() {
        let store: SecretStore = [("w1".to_string(), "hunter2".to_string())].into_iter().collect();
        let dbg = format!("{store:?}");
        assert!(dbg.contains("w1"));
        assert!(!dbg.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        assert!(matches!(
            SecretStore::load(Path::new("/nonexistent/secrets.toml")).await,
            Err(SecretsError::Io { .. })
        ));
    }
}
