use std::cmp::Ordering;
use std::fmt;

pub const SNAPSHOT_QUALIFIER: &str = "SNAPSHOT";

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct MavenGroupId(pub String);

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct MavenArtifactId(pub String);

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub enum MavenClassifier {
    Unclassified,
    Classified(String),
}
impl MavenClassifier {
    pub fn from_option(classifier: Option<&str>) -> MavenClassifier {
        match classifier {
            None => MavenClassifier::Unclassified,
            Some(c) => MavenClassifier::Classified(c.to_string()),
        }
    }

    pub fn as_option(&self) -> Option<&str> {
        match self {
            MavenClassifier::Unclassified => None,
            MavenClassifier::Classified(c) => Some(c),
        }
    }
}

/// A version string parsed into its comparable parts.
///
/// Maven orders versions by their numeric components, and a qualified version
/// (e.g. `1.0-SNAPSHOT`) sorts strictly below the corresponding unqualified
/// release (`1.0`). Anything that does not start with dot-separated numeric
/// components is not a version at all - directory names like that are skipped
/// by the scanner rather than force-fitted into an ordering.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArtifactVersion {
    raw: String,
    numbers: Vec<u64>,
    qualifier: Option<String>,
}

impl ArtifactVersion {
    pub fn parse(raw: &str) -> Option<ArtifactVersion> {
        let (numeric, qualifier) = match raw.find('-') {
            Some(idx) => (&raw[..idx], Some(&raw[idx + 1..])),
            None => (raw, None),
        };

        if numeric.is_empty() {
            return None;
        }
        if let Some(q) = qualifier {
            if q.is_empty() {
                return None;
            }
        }

        let mut numbers = Vec::new();
        for component in numeric.split('.') {
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            numbers.push(component.parse().ok()?);
        }

        Some(ArtifactVersion {
            raw: raw.to_string(),
            numbers,
            qualifier: qualifier.map(str::to_string),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_snapshot(&self) -> bool {
        self.qualifier.as_deref() == Some(SNAPSHOT_QUALIFIER)
    }

    /// For `2.1-SNAPSHOT` this is `2.1` - the part a timestamped file name
    /// substitutes its timestamp and build number for.
    pub fn unqualified(&self) -> &str {
        match self.raw.find('-') {
            Some(idx) => &self.raw[..idx],
            None => &self.raw,
        }
    }
}

impl Ord for ArtifactVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let components = self.numbers.len().max(other.numbers.len());
        for i in 0..components {
            let a = self.numbers.get(i).copied().unwrap_or(0);
            let b = other.numbers.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }

        match (&self.qualifier, &other.qualifier) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for ArtifactVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
