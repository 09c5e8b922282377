// src/resolve.rs

//! Package metadata resolution
//!
//! Turns an identifier discovered by the ownership query into a full
//! [`DebPackage`] record: installed metadata, installation date, and the
//! per-version origin table with release dates attached.

use crate::apt::cache::{AptCache, IndexOrigin};
use crate::apt::release;
use crate::model::{
    AptOrigin, Checksums, DebPackage, OriginRef, PackageIdentifier, VersionEntry,
};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Directory holding dpkg's per-package installed-file manifests
const DEFAULT_INFO_DIR: &str = "/var/lib/dpkg/info";

/// Resolves identifiers against the local package database
pub struct MetadataResolver<C> {
    cache: C,
    info_dir: PathBuf,
}

impl<C: AptCache> MetadataResolver<C> {
    pub fn new(cache: C) -> Self {
        Self {
            cache,
            info_dir: PathBuf::from(DEFAULT_INFO_DIR),
        }
    }

    /// Resolver reading installed-file manifests from a different dpkg info
    /// directory (tests, mounted images)
    pub fn with_info_dir(cache: C, info_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache,
            info_dir: info_dir.into(),
        }
    }

    /// Resolve one identifier. `None` means the database does not know the
    /// package; the caller keeps its files as unknown.
    pub fn resolve(&self, id: &PackageIdentifier) -> Option<DebPackage> {
        let Some(cached) = self.cache.find(id) else {
            warn!("Package {} was not found in the local database", id);
            return None;
        };
        let installed = &cached.installed;
        if let (Some(requested), Some(actual)) =
            (id.architecture.as_deref(), installed.architecture.as_deref())
            && requested != actual
        {
            warn!(
                "Package {} is installed as {} rather than the requested {}; using installed metadata",
                id.name, actual, requested
            );
        }

        let install_date = self.install_date(&cached.name, installed.architecture.as_deref());
        let version_table = cached
            .versions
            .iter()
            .map(|version| VersionEntry {
                version: version.version.clone(),
                origins: version
                    .origins
                    .iter()
                    .map(|origin| OriginRef::Inline(Box::new(build_origin(origin))))
                    .collect(),
            })
            .collect();

        debug!("Resolved package {} {}", cached.name, installed.version);
        Some(DebPackage {
            name: cached.name.clone(),
            architecture: installed.architecture.clone(),
            version: installed.version.clone(),
            candidate_version: cached.candidate_version.clone(),
            size: installed.size,
            checksums: Checksums {
                md5: installed.md5.clone(),
                sha1: installed.sha1.clone(),
                sha256: installed.sha256.clone(),
            },
            source_name: installed.source_name.clone(),
            source_version: installed.source_version.clone(),
            install_date,
            files: Vec::new(),
            version_table,
        })
    }

    /// Installation time, taken from the mtime of the package's
    /// installed-file manifest. Multiarch packages register the manifest
    /// under `name:arch`, so both spellings are probed. A missing manifest
    /// just leaves the field empty.
    fn install_date(&self, name: &str, architecture: Option<&str>) -> Option<String> {
        let mut candidates = vec![self.info_dir.join(format!("{name}.list"))];
        if let Some(arch) = architecture {
            candidates.push(self.info_dir.join(format!("{name}:{arch}.list")));
        }
        for path in candidates {
            if let Ok(metadata) = std::fs::metadata(&path)
                && let Ok(mtime) = metadata.modified()
            {
                let stamp: DateTime<Utc> = mtime.into();
                return Some(stamp.to_rfc3339_opts(SecondsFormat::Secs, true));
            }
        }
        None
    }
}

/// Flesh out one index origin into the record shape the canonicalizer
/// works on, attaching the release date of the index's repository
fn build_origin(index: &IndexOrigin) -> AptOrigin {
    let date = index
        .index_path
        .as_deref()
        .and_then(release::find_release_file)
        .and_then(|release_path| release::release_date(&release_path));
    AptOrigin {
        component: index.component.clone(),
        archive: index.archive.clone(),
        codename: index.codename.clone(),
        architecture: index.architecture.clone(),
        origin: index.origin.clone(),
        label: index.label.clone(),
        site: index.site.clone(),
        archive_uri: index.archive_uri.clone(),
        date,
    }
}
