//! Dependency version declarations and their ordering.
//!
//! A conflicted line is only mergeable when it is recognisably a single
//! dependency declaration: either a package element carrying a `Version`
//! attribute, or a one-property JSON pair whose value is a version string.
//! [`extract_version`] tries each form in order and returns the first hit.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::{BuildMetadata, Prerelease};
use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};

use super::markup;

/// Element names that declare a package dependency.
pub const PACKAGE_ELEMENTS: &[&str] = &["PackageReference", "PackageVersion", "GlobalPackageReference"];

/// Attribute carrying the version on a package element.
pub const VERSION_ATTRIBUTE: &str = "Version";

/// Single-character range operators stripped before parsing a JSON value.
pub const RANGE_PREFIXES: &[char] = &['^', '~', '='];

// ---------------------------------------------------------------------------
// PackageVersion
// ---------------------------------------------------------------------------

/// A dependency version with up to four numeric components.
///
/// `1.2` equals `1.2.0` equals `1.2.0.0`. Pre-release identifiers order by
/// semantic-version precedence and rank below the release; build metadata is
/// kept for display but ignored when comparing.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: u64,
    pub pre: Prerelease,
    pub build: BuildMetadata,
    original: String,
}

impl PackageVersion {
    fn release(&self) -> [u64; 4] {
        [self.major, self.minor, self.patch, self.revision]
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

/// Error returned when a string is not a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidVersion(pub String);

impl fmt::Display for InvalidVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version '{}'", self.0)
    }
}

impl std::error::Error for InvalidVersion {}

impl FromStr for PackageVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidVersion(s.to_string());

        let (rest, build) = match s.split_once('+') {
            Some((_, "")) => return Err(invalid()),
            Some((rest, build)) => (rest, BuildMetadata::new(build).map_err(|_| invalid())?),
            None => (s, BuildMetadata::EMPTY),
        };
        let (numbers, pre) = match rest.split_once('-') {
            Some((_, "")) => return Err(invalid()),
            Some((numbers, pre)) => (numbers, Prerelease::new(pre).map_err(|_| invalid())?),
            None => (rest, Prerelease::EMPTY),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(invalid());
        }
        let mut release = [0u64; 4];
        for (slot, part) in release.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Ok(Self {
            major: release[0],
            minor: release[1],
            patch: release[2],
            revision: release[3],
            pre,
            build,
            original: s.to_string(),
        })
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release()
            .cmp(&other.release())
            .then_with(|| self.pre.cmp(&other.pre))
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

// ---------------------------------------------------------------------------
// VersionToken
// ---------------------------------------------------------------------------

/// Where a version was found on the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// A package element, e.g. `<PackageReference Version="1.0.0" />`.
    Element { name: String },
    /// A JSON property, e.g. `"pkg": "^1.0.0"`.
    Property { key: String },
}

/// A version extracted from one conflicted line.
#[derive(Debug, Clone)]
pub struct VersionToken {
    /// The line exactly as it appears in the file.
    pub raw: String,
    /// The version text as declared, including any range prefix.
    pub declared: String,
    /// Range operator stripped before parsing, if any.
    pub range_prefix: Option<char>,
    pub version: PackageVersion,
    pub declaration: Declaration,
}

type Extractor = fn(&str) -> Option<VersionToken>;

const EXTRACTORS: &[Extractor] = &[from_package_element, from_json_property];

/// Try each known declaration form in turn; the first match wins.
pub fn extract_version(line: &str) -> Option<VersionToken> {
    EXTRACTORS.iter().find_map(|extract| extract(line))
}

fn from_package_element(line: &str) -> Option<VersionToken> {
    let element = markup::parse_element(line)?;
    if !PACKAGE_ELEMENTS.contains(&element.name.as_str()) {
        return None;
    }
    let declared = element.attribute(VERSION_ATTRIBUTE)?;
    let version = declared.parse().ok()?;

    Some(VersionToken {
        raw: line.to_string(),
        declared: declared.to_string(),
        range_prefix: None,
        version,
        declaration: Declaration::Element { name: element.name },
    })
}

fn from_json_property(line: &str) -> Option<VersionToken> {
    let trimmed = line.trim();
    let body = trimmed.strip_suffix(',').unwrap_or(trimmed);
    let SingleProperty { key, value: declared } =
        serde_json::from_str(&format!("{{{}}}", body)).ok()?;

    let (range_prefix, bare) = match declared.chars().next() {
        Some(c) if RANGE_PREFIXES.contains(&c) => (Some(c), &declared[c.len_utf8()..]),
        _ => (None, declared.as_str()),
    };
    let version = bare.parse().ok()?;

    Some(VersionToken {
        raw: line.to_string(),
        declared,
        range_prefix,
        version,
        declaration: Declaration::Property { key },
    })
}

/// A JSON object with exactly one string-valued property.
///
/// A second entry is an error, even when it repeats the first key.
struct SingleProperty {
    key: String,
    value: String,
}

impl<'de> Deserialize<'de> for SingleProperty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SinglePropertyVisitor;

        impl<'de> Visitor<'de> for SinglePropertyVisitor {
            type Value = SingleProperty;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object with one string property")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let (key, value) = map
                    .next_entry::<String, String>()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                if map.next_key::<IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(2, &self));
                }
                Ok(SingleProperty { key, value })
            }
        }

        deserializer.deserialize_map(SinglePropertyVisitor)
    }
}
