use serde::Deserialize;

/// The `maven-metadata.xml` document, as described at
/// https://maven.apache.org/ref/3.9.5/maven-repository-metadata/repository-metadata.html
///
/// This is the only durable output of the metadata engine: one document per
/// artifact root (version listing) and one per snapshot version directory
/// (timestamped instance bookkeeping).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename = "metadata")]
pub struct Metadata {
    #[serde(rename = "groupId")]
    pub group_id: String,
    #[serde(rename = "artifactId")]
    pub artifact_id: String,
    /// Set on version-level documents only, to the base version (`2.1-SNAPSHOT`).
    #[serde(default)]
    pub version: Option<String>,
    pub versioning: Versioning,
    #[serde(default)]
    pub plugins: Option<Plugins>,
}

impl Metadata {
    pub fn parse(document: &str) -> Result<Metadata, serde_xml_rs::Error> {
        serde_xml_rs::from_str(document)
    }

    /// Parsing is serde-driven; the writer side is spelled out by hand since
    /// the document nests element lists two levels deep, which the serde
    /// XML writer cannot emit.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(512);
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<metadata>\n");
        text_element(&mut out, 1, "groupId", &self.group_id);
        text_element(&mut out, 1, "artifactId", &self.artifact_id);
        if let Some(version) = &self.version {
            text_element(&mut out, 1, "version", version);
        }
        self.versioning.write_xml(&mut out);
        if let Some(plugins) = &self.plugins {
            open(&mut out, 1, "plugins");
            for plugin in &plugins.plugin {
                open(&mut out, 2, "plugin");
                if let Some(name) = &plugin.name {
                    text_element(&mut out, 3, "name", name);
                }
                text_element(&mut out, 3, "prefix", &plugin.prefix);
                text_element(&mut out, 3, "artifactId", &plugin.artifact_id);
                close(&mut out, 2, "plugin");
            }
            close(&mut out, 1, "plugins");
        }
        out.push_str("</metadata>\n");
        out
    }

    /// True if the given version string occurs anywhere in the document -
    /// in the version listing or as a resolved snapshot version.
    pub fn contains_version(&self, version: &str) -> bool {
        if let Some(versions) = &self.versioning.versions {
            if versions.version.iter().any(|v| v == version) {
                return true;
            }
        }
        if let Some(snapshot_versions) = &self.versioning.snapshot_versions {
            if snapshot_versions.snapshot_version.iter().any(|sv| sv.value == version) {
                return true;
            }
        }
        false
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Versioning {
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub versions: Option<Versions>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
    #[serde(default)]
    pub snapshot: Option<Snapshot>,
    #[serde(rename = "snapshotVersions", default)]
    pub snapshot_versions: Option<SnapshotVersions>,
}

impl Versioning {
    fn write_xml(&self, out: &mut String) {
        open(out, 1, "versioning");
        if let Some(latest) = &self.latest {
            text_element(out, 2, "latest", latest);
        }
        if let Some(release) = &self.release {
            text_element(out, 2, "release", release);
        }
        if let Some(snapshot) = &self.snapshot {
            open(out, 2, "snapshot");
            text_element(out, 3, "timestamp", &snapshot.timestamp);
            text_element(out, 3, "buildNumber", &snapshot.build_number.to_string());
            close(out, 2, "snapshot");
        }
        if let Some(versions) = &self.versions {
            open(out, 2, "versions");
            for version in &versions.version {
                text_element(out, 3, "version", version);
            }
            close(out, 2, "versions");
        }
        text_element(out, 2, "lastUpdated", &self.last_updated);
        if let Some(snapshot_versions) = &self.snapshot_versions {
            open(out, 2, "snapshotVersions");
            for sv in &snapshot_versions.snapshot_version {
                open(out, 3, "snapshotVersion");
                if let Some(classifier) = &sv.classifier {
                    text_element(out, 4, "classifier", classifier);
                }
                text_element(out, 4, "extension", &sv.extension);
                text_element(out, 4, "value", &sv.value);
                text_element(out, 4, "updated", &sv.updated);
                close(out, 3, "snapshotVersion");
            }
            close(out, 2, "snapshotVersions");
        }
        close(out, 1, "versioning");
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn open(out: &mut String, depth: usize, name: &str) {
    indent(out, depth);
    out.push('<');
    out.push_str(name);
    out.push_str(">\n");
}

fn close(out: &mut String, depth: usize, name: &str) {
    indent(out, depth);
    out.push_str("</");
    out.push_str(name);
    out.push_str(">\n");
}

fn text_element(out: &mut String, depth: usize, name: &str, value: &str) {
    indent(out, depth);
    out.push('<');
    out.push_str(name);
    out.push('>');
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out.push_str("</");
    out.push_str(name);
    out.push_str(">\n");
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Versions {
    #[serde(default)]
    pub version: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Snapshot {
    pub timestamp: String,
    #[serde(rename = "buildNumber")]
    pub build_number: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SnapshotVersions {
    #[serde(rename = "snapshotVersion", default)]
    pub snapshot_version: Vec<SnapshotVersion>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SnapshotVersion {
    #[serde(default)]
    pub classifier: Option<String>,
    pub extension: String,
    /// The resolved timestamped version, e.g. `2.1-20231005.115330-5`.
    pub value: String,
    pub updated: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Plugins {
    #[serde(default)]
    pub plugin: Vec<Plugin>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Plugin {
    #[serde(default)]
    pub name: Option<String>,
    pub prefix: String,
    #[serde(rename = "artifactId")]
    pub artifact_id: String,
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Metadata {
        Metadata {
            group_id: "com.example.metadata".to_string(),
            artifact_id: "shelf-metadata".to_string(),
            version: None,
            versioning: Versioning {
                latest: Some("3.2".to_string()),
                release: Some("3.2".to_string()),
                versions: Some(Versions {
                    version: vec!["3.1".to_string(), "3.2".to_string()],
                }),
                last_updated: "20231005115330".to_string(),
                snapshot: None,
                snapshot_versions: None,
            },
            plugins: None,
        }
    }

    #[test]
    fn test_artifact_root_round_trip() {
        let metadata = sample();
        let xml = metadata.to_xml();

        assert!(xml.contains("<groupId>com.example.metadata</groupId>"));
        assert!(xml.contains("<latest>3.2</latest>"));
        assert!(!xml.contains("<snapshot>"));

        let parsed = Metadata::parse(&xml).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn test_version_level_round_trip() {
        let metadata = Metadata {
            group_id: "org.example".to_string(),
            artifact_id: "foo".to_string(),
            version: Some("2.1-SNAPSHOT".to_string()),
            versioning: Versioning {
                latest: None,
                release: None,
                versions: None,
                last_updated: "20231005115330".to_string(),
                snapshot: Some(Snapshot {
                    timestamp: "20231005.115330".to_string(),
                    build_number: 5,
                }),
                snapshot_versions: Some(SnapshotVersions {
                    snapshot_version: vec![
                        SnapshotVersion {
                            classifier: None,
                            extension: "jar".to_string(),
                            value: "2.1-20231005.115330-5".to_string(),
                            updated: "20231005115330".to_string(),
                        },
                        SnapshotVersion {
                            classifier: Some("sources".to_string()),
                            extension: "jar".to_string(),
                            value: "2.1-20231005.115330-5".to_string(),
                            updated: "20231005115330".to_string(),
                        },
                    ],
                }),
            },
            plugins: None,
        };

        let parsed = Metadata::parse(&metadata.to_xml()).unwrap();
        assert_eq!(parsed, metadata);
        assert!(parsed.contains_version("2.1-20231005.115330-5"));
        assert!(!parsed.contains_version("2.1-20231005.115330-4"));
    }

    #[test]
    fn test_plugin_block_round_trip() {
        let mut metadata = sample();
        metadata.plugins = Some(Plugins {
            plugin: vec![Plugin {
                name: None,
                prefix: "shelf".to_string(),
                artifact_id: "shelf-maven-plugin".to_string(),
            }],
        });

        let xml = metadata.to_xml();
        assert!(xml.contains("<prefix>shelf</prefix>"));

        let parsed = Metadata::parse(&xml).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn test_single_declaration_and_escaping() {
        let mut metadata = sample();
        metadata.artifact_id = "odd<&>name".to_string();

        let xml = metadata.to_xml();
        assert_eq!(xml.matches("<?xml").count(), 1);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<metadata>"));
        assert!(xml.contains("<artifactId>odd&lt;&amp;&gt;name</artifactId>"));

        assert_eq!(Metadata::parse(&xml).unwrap(), metadata);
    }

    #[test]
    fn test_contains_version() {
        let metadata = sample();
        assert!(metadata.contains_version("3.1"));
        assert!(!metadata.contains_version("3.3"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Metadata::parse("not xml at all").is_err());
    }
}
