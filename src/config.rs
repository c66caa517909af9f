use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::maven::Repository;

/// Server configuration: which storages exist and which repositories each
/// one holds. Provisioning is out of scope - the configuration file is the
/// source of truth.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: String,
    pub storages: HashMap<String, Storage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub repositories: HashMap<String, Repository>,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let file = File::open(path)
            .with_context(|| format!("cannot open configuration file {}", path.display()))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    pub fn repository(&self, storage_id: &str, repository_id: &str) -> Option<&Repository> {
        self.storages.get(storage_id)?.repositories.get(repository_id)
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use crate::maven::RepositoryPolicy;

    use super::*;

    #[test]
    fn test_load_and_lookup() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "bind": "0.0.0.0:8080",
                "storages": {{
                    "storage0": {{
                        "repositories": {{
                            "snapshots": {{
                                "basedir": "/var/shelf/storage0/snapshots",
                                "policy": "snapshot"
                            }},
                            "releases": {{
                                "basedir": "/var/shelf/storage0/releases",
                                "policy": "release",
                                "plugin_aggregation": true
                            }}
                        }}
                    }}
                }}
            }}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.bind, "0.0.0.0:8080");
        let snapshots = config.repository("storage0", "snapshots").unwrap();
        assert_eq!(snapshots.policy, RepositoryPolicy::Snapshot);
        assert!(!snapshots.plugin_aggregation);

        let releases = config.repository("storage0", "releases").unwrap();
        assert_eq!(releases.policy, RepositoryPolicy::Release);
        assert!(releases.plugin_aggregation);

        assert!(config.repository("storage0", "nope").is_none());
    }
}
