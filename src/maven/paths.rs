use std::path::Path;

use anyhow::anyhow;
use lazy_static::lazy_static;
use regex::Regex;

use crate::maven::coordinates::*;

lazy_static! {
    static ref TIMESTAMP_REGEX: Regex = Regex::new(r"-\d{8}\.\d{6}").unwrap();
    static ref RESOLVED_SNAPSHOT_REGEX: Regex =
        Regex::new(r"^(?P<base>.+)-(?P<timestamp>\d{8}\.\d{6})-(?P<build>\d+)$").unwrap();
}

/// One timestamped upload of a snapshot base version, as decoded from a
/// stored file name.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct SnapshotInstance {
    pub timestamp: String, // yyyyMMdd.HHmmss
    pub build_number: u32, // starts at 1, increases with each upload
    pub classifier: MavenClassifier,
    pub extension: String, // without leading '.', e.g. "jar"
}

impl SnapshotInstance {
    /// `2.1-SNAPSHOT` uploaded at `20231005.115330` as build 5 resolves to
    /// `2.1-20231005.115330-5` - the version string a consumer pins to.
    pub fn resolved_version(&self, base: &ArtifactVersion) -> String {
        format!("{}-{}-{}", base.unqualified(), self.timestamp, self.build_number)
    }

    /// Recency order: the build number is authoritative, the timestamp breaks
    /// ties between files claiming the same build.
    pub fn ordinal(&self) -> (u32, &str) {
        (self.build_number, &self.timestamp)
    }
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum VersionDirEntry {
    Release {
        classifier: MavenClassifier,
        extension: String,
    },
    Snapshot(SnapshotInstance),
}

/// Decodes a file name stored in a version directory.
///
/// Release layout:  `<artifactId>-<version>[-<classifier>].<extension>`
/// Snapshot layout: `<artifactId>-<version>[-<classifier>]-<timestamp>-<buildNumber>.<extension>`
///
/// The version directory name decides which layout applies. File names that
/// do not belong to the artifact fail to parse and are skipped by the caller.
pub fn parse_version_dir_entry(
    file_name: &str,
    artifact_id: &str,
    version: &ArtifactVersion,
) -> anyhow::Result<VersionDirEntry> {
    let full_file_name = file_name;
    let version_string = version.as_str();

    if file_name.len() < artifact_id.len() + version_string.len() + 2 {
        return Err(anyhow!("not a valid artifact file name: {}", full_file_name));
    }

    if !file_name.starts_with(artifact_id) {
        return Err(anyhow!(
            "{} is not a valid artifact file name: expected to start with artifact id {}",
            full_file_name,
            artifact_id
        ));
    }
    let file_name = &file_name[artifact_id.len() + 1..];

    if !file_name.starts_with(version_string) {
        return Err(anyhow!(
            "{} is not a valid artifact file name: expected version string {}",
            full_file_name,
            version_string
        ));
    }
    let file_name = &file_name[version_string.len()..];

    let (file_name, extension) = match file_name.rfind('.') {
        Some(last_dot) => (&file_name[..last_dot], &file_name[last_dot + 1..]),
        None => (file_name, ""),
    };

    if version.is_snapshot() {
        // NB: the classifier is optional and can contain any number of '-' characters

        let last_dash = file_name
            .rfind('-')
            .ok_or_else(|| anyhow!("snapshot file name without build number: {}", full_file_name))?;
        let build_number = file_name[last_dash + 1..]
            .parse::<u32>()
            .map_err(|_| anyhow!("snapshot file name without build number: {}", full_file_name))?;
        if build_number == 0 {
            return Err(anyhow!("snapshot build numbers start at 1: {}", full_file_name));
        }

        let (classifier, timestamp) =
            parse_classifier_and_timestamp(&file_name[..last_dash], full_file_name)?;

        Ok(VersionDirEntry::Snapshot(SnapshotInstance {
            timestamp: timestamp.to_string(),
            build_number,
            classifier: MavenClassifier::from_option(classifier),
            extension: extension.to_string(),
        }))
    } else {
        let classifier = if file_name.is_empty() {
            None
        } else if let Some(stripped) = file_name.strip_prefix('-') {
            Some(stripped)
        } else {
            return Err(anyhow!(
                "not a valid artifact file name - invalid classifier format: {}",
                full_file_name
            ));
        };

        Ok(VersionDirEntry::Release {
            classifier: MavenClassifier::from_option(classifier),
            extension: extension.to_string(),
        })
    }
}

fn parse_classifier_and_timestamp<'a>(
    file_name: &'a str,
    full_file_name: &str,
) -> anyhow::Result<(Option<&'a str>, &'a str)> {
    if file_name.len() < 16 || !TIMESTAMP_REGEX.is_match(&file_name[file_name.len() - 16..]) {
        return Err(anyhow!("snapshot without timestamp: {}", full_file_name));
    }

    let raw_classifier = &file_name[..file_name.len() - 16];
    let timestamp = &file_name[file_name.len() - 15..];

    let classifier = match raw_classifier.strip_prefix('-') {
        Some(c) => Some(c),
        None if raw_classifier.is_empty() => None,
        None => {
            return Err(anyhow!("snapshot without timestamp: {}", full_file_name));
        }
    };

    Ok((classifier, timestamp))
}

/// The inverse of [`SnapshotInstance::resolved_version`]: splits
/// `2.1-20231005.115330-5` into its base version, timestamp and build number.
pub fn parse_resolved_snapshot(value: &str) -> Option<(String, String, u32)> {
    let captures = RESOLVED_SNAPSHOT_REGEX.captures(value)?;
    let build = captures.name("build")?.as_str().parse::<u32>().ok()?;
    if build == 0 {
        return None;
    }
    Some((
        captures.name("base")?.as_str().to_string(),
        captures.name("timestamp")?.as_str().to_string(),
        build,
    ))
}

/// Derives the Maven coordinates of an artifact root from its path relative
/// to the repository root: the last segment is the artifact id, everything
/// above it is the dotted group id.
pub fn coordinates_of(rel_path: &Path) -> Option<(MavenGroupId, MavenArtifactId)> {
    let segments: Vec<&str> = rel_path.iter().map(|s| s.to_str().unwrap_or("")).collect();
    if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    let artifact_id = segments[segments.len() - 1].to_string();
    let group_id = segments[..segments.len() - 1].join(".");

    Some((MavenGroupId(group_id), MavenArtifactId(artifact_id)))
}
