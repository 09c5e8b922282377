// src/model.rs

//! Data model for traced packages and their repository origins
//!
//! These types make up the result contract of an attribution run. The core
//! never persists them; callers serialize the returned [`TraceResult`]
//! however they see fit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key used to look up a package in the local database: a name with an
/// optional architecture qualifier (`zlib1g:amd64`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageIdentifier {
    pub name: String,
    pub architecture: Option<String>,
}

impl PackageIdentifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            architecture: None,
        }
    }

    pub fn with_architecture(name: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            architecture: Some(architecture.into()),
        }
    }
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.architecture {
            Some(arch) => write!(f, "{}:{}", self.name, arch),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Checksums of the package archive as recorded by the repository index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksums {
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
}

/// An installed Debian package together with the input files attributed to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebPackage {
    pub name: String,
    pub architecture: Option<String>,
    pub version: String,
    /// Version APT would pick today, which may differ from `version`
    pub candidate_version: Option<String>,
    pub size: Option<u64>,
    pub checksums: Checksums,
    pub source_name: Option<String>,
    pub source_version: Option<String>,
    /// UTC ISO-8601 timestamp of the installation, when known
    pub install_date: Option<String>,
    /// Input files owned by this package, in first-seen order
    pub files: Vec<String>,
    pub version_table: Vec<VersionEntry>,
}

/// One version known to the package database and the origins it is
/// available from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    pub origins: Vec<OriginRef>,
}

/// An origin attached to a version entry. Records start out inline;
/// canonicalization rewrites each one to the name of its registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OriginRef {
    Named(String),
    Inline(Box<AptOrigin>),
}

/// Descriptive fields of an APT repository origin, as read from the
/// package database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AptOrigin {
    pub component: Option<String>,
    pub archive: Option<String>,
    pub codename: Option<String>,
    pub architecture: Option<String>,
    pub origin: Option<String>,
    pub label: Option<String>,
    pub site: Option<String>,
    pub archive_uri: Option<String>,
    pub date: Option<String>,
}

impl AptOrigin {
    /// Identity for deduplication. Two origins reachable through different
    /// mirrors denote the same logical repository, so `archive_uri` and
    /// `date` stay out of the key, as does the redundant `codename`.
    pub fn identity_key(&self) -> OriginKey {
        OriginKey {
            component: self.component.clone(),
            archive: self.archive.clone(),
            architecture: self.architecture.clone(),
            origin: self.origin.clone(),
            label: self.label.clone(),
            site: self.site.clone(),
        }
    }
}

/// Ordered identity tuple for origin deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OriginKey {
    pub component: Option<String>,
    pub archive: Option<String>,
    pub architecture: Option<String>,
    pub origin: Option<String>,
    pub label: Option<String>,
    pub site: Option<String>,
}

/// A canonicalized origin: the full descriptive record kept once, under an
/// assigned name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedOrigin {
    pub name: String,
    #[serde(flatten)]
    pub origin: AptOrigin,
}

/// Result of one attribution run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceResult {
    pub packages: Vec<DebPackage>,
    pub origins: Vec<NamedOrigin>,
    /// Input paths no resolved package claims
    pub unknown_files: Vec<String>,
}
