// src/apt/cache.rs

//! Installed-package views over the local dpkg and APT databases
//!
//! `SystemAptCache` stitches three sources into one picture per package:
//! the installed state from dpkg's status file, the per-version records in
//! the downloaded `*_Packages` repository indexes (which carry the archive
//! checksums and sizes), and the descriptive origin fields of each index's
//! Release file. Missing or unreadable files degrade to an empty view
//! rather than failing construction.

use super::release;
use crate::model::PackageIdentifier;
use crate::version::DebVersion;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Installed state of a package as recorded by dpkg
#[derive(Debug, Clone)]
pub struct InstalledInfo {
    pub version: String,
    pub architecture: Option<String>,
    pub source_name: Option<String>,
    pub source_version: Option<String>,
    /// Archive size and checksums, present when some repository index
    /// lists the installed version
    pub size: Option<u64>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub sha256: Option<String>,
}

/// One repository index a version was seen in, with the descriptive origin
/// fields of its Release file
#[derive(Debug, Clone, Default)]
pub struct IndexOrigin {
    pub component: Option<String>,
    pub archive: Option<String>,
    pub codename: Option<String>,
    pub architecture: Option<String>,
    pub origin: Option<String>,
    pub label: Option<String>,
    pub site: Option<String>,
    pub archive_uri: Option<String>,
    /// Path of the index file itself, for release-date resolution
    pub index_path: Option<PathBuf>,
}

/// One version of a package known to the repository indexes
#[derive(Debug, Clone)]
pub struct CachedVersion {
    pub version: String,
    pub origins: Vec<IndexOrigin>,
}

/// Everything the local database knows about one package
#[derive(Debug, Clone)]
pub struct CachedPackage {
    pub name: String,
    pub installed: InstalledInfo,
    pub candidate_version: Option<String>,
    /// Known versions, newest first
    pub versions: Vec<CachedVersion>,
}

/// Read-only view of the local package database
pub trait AptCache {
    /// Look up a package by name, or name plus architecture. `None` when
    /// the database has never heard of it.
    fn find(&self, id: &PackageIdentifier) -> Option<CachedPackage>;
}

#[derive(Debug, Deserialize)]
struct StatusParagraph {
    #[serde(rename = "Package")]
    package: String,
    #[serde(rename = "Status")]
    status: Option<String>,
    #[serde(rename = "Version")]
    version: Option<String>,
    #[serde(rename = "Architecture")]
    architecture: Option<String>,
    #[serde(rename = "Source")]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PackagesParagraph {
    #[serde(rename = "Package")]
    package: String,
    #[serde(rename = "Version")]
    version: Option<String>,
    #[serde(rename = "Architecture")]
    architecture: Option<String>,
    #[serde(rename = "Size")]
    size: Option<String>,
    #[serde(rename = "MD5sum")]
    md5: Option<String>,
    #[serde(rename = "SHA1")]
    sha1: Option<String>,
    #[serde(rename = "SHA256")]
    sha256: Option<String>,
}

#[derive(Debug)]
struct StatusRecord {
    version: String,
    architecture: Option<String>,
    source_name: Option<String>,
    source_version: Option<String>,
}

#[derive(Debug)]
struct IndexEntry {
    version: String,
    architecture: Option<String>,
    size: Option<u64>,
    md5: Option<String>,
    sha1: Option<String>,
    sha256: Option<String>,
    /// Position in `SystemAptCache::indexes`
    index: usize,
}

/// Local database view built from dpkg's status file and the downloaded
/// repository indexes
pub struct SystemAptCache {
    installed: HashMap<String, Vec<StatusRecord>>,
    index_entries: HashMap<String, Vec<IndexEntry>>,
    indexes: Vec<IndexOrigin>,
}

impl SystemAptCache {
    pub const DEFAULT_DPKG_ROOT: &'static str = "/var/lib/dpkg";
    pub const DEFAULT_LISTS_DIR: &'static str = "/var/lib/apt/lists";

    /// View over the running system's databases
    pub fn system() -> Self {
        Self::at(Self::DEFAULT_DPKG_ROOT, Self::DEFAULT_LISTS_DIR)
    }

    /// View over databases rooted elsewhere (tests, mounted images)
    pub fn at(dpkg_root: impl AsRef<Path>, lists_dir: impl AsRef<Path>) -> Self {
        let mut cache = Self {
            installed: HashMap::new(),
            index_entries: HashMap::new(),
            indexes: Vec::new(),
        };
        cache.load_status(&dpkg_root.as_ref().join("status"));
        cache.load_indexes(lists_dir.as_ref());
        cache
    }

    fn load_status(&mut self, path: &Path) {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                warn!("No dpkg status database at {}: {}", path.display(), err);
                return;
            }
        };
        for paragraph in paragraphs(&text) {
            let record: StatusParagraph = match rfc822_like::from_str(paragraph) {
                Ok(record) => record,
                Err(err) => {
                    debug!("Skipping unparsable status paragraph: {}", err);
                    continue;
                }
            };
            // Status reads e.g. "install ok installed"; anything else is a
            // removed or half-configured package
            if !record
                .status
                .as_deref()
                .is_some_and(|s| s.ends_with(" installed"))
            {
                continue;
            }
            let Some(version) = record.version else {
                continue;
            };
            let (source_name, source_version) =
                split_source(record.source.as_deref(), &version);
            self.installed
                .entry(record.package)
                .or_default()
                .push(StatusRecord {
                    version,
                    architecture: record.architecture,
                    source_name,
                    source_version,
                });
        }
        debug!("Loaded {} installed packages", self.installed.len());
    }

    fn load_indexes(&mut self, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("No APT lists directory at {}: {}", dir.display(), err);
                return;
            }
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with("_Packages"))
            })
            .collect();
        // Deterministic scan order keeps version tables stable across runs
        files.sort();
        for file in files {
            self.load_index(&file);
        }
    }

    fn load_index(&mut self, path: &Path) {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                warn!("Unreadable repository index {}: {}", path.display(), err);
                return;
            }
        };
        let index = self.indexes.len();
        self.indexes.push(describe_index(path));
        for paragraph in paragraphs(&text) {
            let record: PackagesParagraph = match rfc822_like::from_str(paragraph) {
                Ok(record) => record,
                Err(err) => {
                    debug!(
                        "Skipping unparsable paragraph in {}: {}",
                        path.display(),
                        err
                    );
                    continue;
                }
            };
            let Some(version) = record.version else {
                continue;
            };
            self.index_entries
                .entry(record.package)
                .or_default()
                .push(IndexEntry {
                    version,
                    architecture: record.architecture,
                    size: record.size.as_deref().and_then(|s| s.parse().ok()),
                    md5: record.md5,
                    sha1: record.sha1,
                    sha256: record.sha256,
                    index,
                });
        }
    }

    /// True when an index entry is usable for a package of `arch`:
    /// matching architecture, `all`, or an index that declares none.
    fn arch_matches(entry: &IndexEntry, arch: Option<&str>) -> bool {
        match (arch, entry.architecture.as_deref()) {
            (None, _) | (_, None) => true,
            (Some(_), Some("all")) => true,
            (Some(wanted), Some(actual)) => wanted == actual,
        }
    }
}

impl AptCache for SystemAptCache {
    fn find(&self, id: &PackageIdentifier) -> Option<CachedPackage> {
        let records = self.installed.get(&id.name)?;
        // A name:arch lookup picks that architecture's record when present;
        // otherwise the first installed record stands in and the caller
        // decides how loudly to complain about the mismatch
        let record = match id.architecture.as_deref() {
            Some(arch) => records
                .iter()
                .find(|r| r.architecture.as_deref() == Some(arch))
                .or_else(|| records.first())?,
            None => records.first()?,
        };
        let arch = record.architecture.as_deref();

        let entries: Vec<&IndexEntry> = self
            .index_entries
            .get(&id.name)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter(|entry| Self::arch_matches(entry, arch))
            .collect();

        // The installed checksums come from the index record carrying the
        // exact installed version
        let installed_entry = entries.iter().find(|entry| entry.version == record.version);

        let mut versions: Vec<CachedVersion> = Vec::new();
        for entry in &entries {
            let origin = self.indexes[entry.index].clone();
            match versions.iter_mut().find(|v| v.version == entry.version) {
                Some(version) => version.origins.push(origin),
                None => versions.push(CachedVersion {
                    version: entry.version.clone(),
                    origins: vec![origin],
                }),
            }
        }
        // The installed version may be absent from every index, e.g. a
        // locally installed .deb
        if !versions.iter().any(|v| v.version == record.version) {
            versions.push(CachedVersion {
                version: record.version.clone(),
                origins: Vec::new(),
            });
        }
        versions.sort_by(|a, b| DebVersion::parse(&b.version).cmp(&DebVersion::parse(&a.version)));
        let candidate_version = versions.first().map(|v| v.version.clone());

        Some(CachedPackage {
            name: id.name.clone(),
            installed: InstalledInfo {
                version: record.version.clone(),
                architecture: record.architecture.clone(),
                source_name: record.source_name.clone(),
                source_version: record.source_version.clone(),
                size: installed_entry.and_then(|e| e.size),
                md5: installed_entry.and_then(|e| e.md5.clone()),
                sha1: installed_entry.and_then(|e| e.sha1.clone()),
                sha256: installed_entry.and_then(|e| e.sha256.clone()),
            },
            candidate_version,
            versions,
        })
    }
}

/// Split RFC 822 text into its blank-line separated paragraphs
fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split("\n\n").map(str::trim).filter(|p| !p.is_empty())
}

/// Split a `Source:` field into name and version. The version defaults to
/// the binary package's own version unless overridden in parentheses:
/// `Source: glibc (2.36-9)`.
fn split_source(
    source: Option<&str>,
    package_version: &str,
) -> (Option<String>, Option<String>) {
    let Some(source) = source else {
        return (None, None);
    };
    match source.split_once('(') {
        Some((name, rest)) => (
            Some(name.trim().to_string()),
            Some(rest.trim_end_matches(')').trim().to_string()),
        ),
        None => (
            Some(source.trim().to_string()),
            Some(package_version.to_string()),
        ),
    }
}

/// Derive the descriptive origin fields of one index file: component and
/// architecture from the underscore-encoded filename, origin, label, suite
/// and codename from the Release file, and the archive URI from the
/// filename prefix before `dists`. APT drops the URI scheme when naming
/// list files, so the reconstruction assumes plain http.
fn describe_index(path: &Path) -> IndexOrigin {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let parts: Vec<&str> = name.split('_').collect();
    let mut desc = IndexOrigin {
        index_path: Some(path.to_path_buf()),
        ..Default::default()
    };
    desc.site = parts
        .first()
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string());
    if let Some(dists) = parts.iter().position(|part| *part == "dists") {
        desc.archive_uri = Some(format!("http://{}/", parts[..dists].join("/")));
        desc.archive = parts.get(dists + 1).map(|part| part.to_string());
        if let Some(component) = parts
            .get(dists + 2)
            .filter(|part| !part.starts_with("binary-"))
        {
            desc.component = Some(component.to_string());
        }
        desc.architecture = parts
            .iter()
            .find_map(|part| part.strip_prefix("binary-"))
            .map(|arch| arch.to_string());
    }
    if let Some(fields) = release::find_release_file(path)
        .and_then(|release_path| release::read_release_fields(&release_path))
    {
        desc.origin = fields.origin;
        desc.label = fields.label;
        desc.codename = fields.codename;
        if fields.suite.is_some() {
            desc.archive = fields.suite;
        }
    }
    desc
}
