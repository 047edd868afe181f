use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DiffError, DiffResult};

/// Tunables for [`DiffRepository`](crate::DiffRepository).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffRepositoryConfig {
    /// Maximum number of peer hops followed from a requested node when
    /// building a node-id projection.
    pub max_depth_search_hierarchy: usize,
    /// Page size used by `get` when the request sets no limit.
    pub default_limit: Option<usize>,
}

impl Default for DiffRepositoryConfig {
    fn default() -> Self {
        Self {
            max_depth_search_hierarchy: 10,
            default_limit: None,
        }
    }
}

impl DiffRepositoryConfig {
    pub fn from_toml_str(input: &str) -> DiffResult<Self> {
        toml::from_str(input).map_err(|e| DiffError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> DiffResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| DiffError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&input)
    }

    pub fn to_toml_string(&self) -> DiffResult<String> {
        toml::to_string(self).map_err(|e| DiffError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = DiffRepositoryConfig::default();
        assert_eq!(c.max_depth_search_hierarchy, 10);
        assert!(c.default_limit.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = DiffRepositoryConfig::from_toml_str("default_limit = 25\n").unwrap();
        assert_eq!(c.default_limit, Some(25));
        assert_eq!(c.max_depth_search_hierarchy, 10);
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = DiffRepositoryConfig::from_toml_str("max_depth_search_hierarchy = \"deep\"").unwrap_err();
        assert!(matches!(err, DiffError::Config(_)));
    }

    #[test]
    fn from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_depth_search_hierarchy = 3").unwrap();
        let c = DiffRepositoryConfig::from_file(file.path()).unwrap();
        assert_eq!(c.max_depth_search_hierarchy, 3);
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DiffRepositoryConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, DiffError::Config(msg) if msg.contains("absent.toml")));
    }

    #[test]
    fn toml_roundtrip() {
        let c = DiffRepositoryConfig {
            max_depth_search_hierarchy: 4,
            default_limit: Some(50),
        };
        let text = c.to_toml_string().unwrap();
        assert_eq!(DiffRepositoryConfig::from_toml_str(&text).unwrap(), c);
    }
}
