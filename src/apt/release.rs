// src/apt/release.rs

//! Release file discovery and date extraction
//!
//! APT names each downloaded index after the URI it came from, with path
//! separators flattened to underscores. The Release (or InRelease) file for
//! an index therefore shares one of the index filename's underscore-delimited
//! prefixes, which is what the discovery walk exploits.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Descriptive fields of a Release/InRelease paragraph
#[derive(Debug, Default, Deserialize)]
pub struct ReleaseFields {
    #[serde(rename = "Origin")]
    pub origin: Option<String>,
    #[serde(rename = "Label")]
    pub label: Option<String>,
    #[serde(rename = "Suite")]
    pub suite: Option<String>,
    #[serde(rename = "Codename")]
    pub codename: Option<String>,
    #[serde(rename = "Date")]
    pub date: Option<String>,
}

/// Walk an index filename's underscore-delimited prefixes from most to
/// least specific, returning the first `_InRelease` or `_Release` sibling
/// that exists. The input must be absolute; APT's lists directory always
/// is.
pub fn find_release_file(index_path: &Path) -> Option<PathBuf> {
    if !index_path.is_absolute() {
        warn!("Index path {} is not absolute", index_path.display());
        return None;
    }
    let mut prefix = index_path.to_string_lossy().into_owned();
    while let Some(pos) = prefix.rfind('_') {
        prefix.truncate(pos);
        for suffix in ["_InRelease", "_Release"] {
            let candidate = PathBuf::from(format!("{prefix}{suffix}"));
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Read the leading paragraph of a Release file. Missing or unparsable
/// files simply yield nothing; the origin record goes out without the
/// affected fields.
pub fn read_release_fields(path: &Path) -> Option<ReleaseFields> {
    let text = std::fs::read_to_string(path).ok()?;
    let body = strip_clearsign(&text);
    let paragraph = body.split("\n\n").find(|p| !p.trim().is_empty())?;
    match rfc822_like::from_str(paragraph) {
        Ok(fields) => Some(fields),
        Err(err) => {
            debug!("Unparsable release file {}: {}", path.display(), err);
            None
        }
    }
}

/// Extract the declared date of a release file as a UTC ISO-8601 string
pub fn release_date(release_path: &Path) -> Option<String> {
    let fields = read_release_fields(release_path)?;
    fields.date.as_deref().and_then(parse_release_date)
}

/// InRelease files are clearsigned: drop the PGP header block and the
/// trailing signature, keeping the payload in between.
fn strip_clearsign(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("-----BEGIN PGP SIGNED MESSAGE-----") else {
        return text;
    };
    let body = match rest.split_once("\n\n") {
        Some((_, body)) => body,
        None => rest,
    };
    match body.split_once("-----BEGIN PGP SIGNATURE-----") {
        Some((content, _)) => content,
        None => body,
    }
}

/// APT writes RFC 2822 dates with a literal `UTC` zone name, which the
/// strict parser rejects.
fn parse_release_date(raw: &str) -> Option<String> {
    let normalized = raw.trim().replace(" UTC", " +0000");
    let parsed = DateTime::parse_from_rfc2822(&normalized).ok()?;
    Some(
        parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}
