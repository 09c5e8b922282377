// src/dpkg.rs

//! File-ownership queries against the dpkg database
//!
//! Wraps `dpkg-query -S`, which reports the owning package for each path
//! given on its command line. Output lines follow the grammar
//! `name[:architecture]: path`; `diversion …` lines describe dpkg-divert
//! state and carry no attribution.

use crate::error::{Error, Result};
use crate::model::PackageIdentifier;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::sync::LazyLock;
use tracing::debug;

/// Grammar of one `dpkg-query -S` output line. The split is at `": "`
/// rather than the first colon because the package field may itself carry
/// an architecture qualifier (`zlib1g:amd64`).
static QUERY_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[^:]+)(:(?P<architecture>[^:]+))?: (?P<path>.*)$").unwrap()
});

/// stderr signature of a lookup where some patterns matched nothing; the
/// stdout produced so far is still usable.
const NO_PATH_FOUND: &str = "no path found matching pattern";

/// Maps file paths to the packages that own them
pub trait FileOwnerQuery {
    /// Query one batch of absolute paths, returning an entry for every path
    /// some package claims. Paths nobody claims are simply absent.
    fn lookup(&self, paths: &[String]) -> Result<HashMap<String, PackageIdentifier>>;

    /// Command-line length consumed by the invocation itself, before any
    /// path argument is appended.
    fn command_overhead(&self) -> usize;
}

/// Production backend invoking `dpkg-query -S`
#[derive(Debug)]
pub struct DpkgQuery {
    command: PathBuf,
}

impl DpkgQuery {
    pub fn new() -> Self {
        Self {
            command: PathBuf::from("dpkg-query"),
        }
    }

    /// Point at a different query binary (tests, chroots)
    pub fn with_command(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn command_line(&self) -> String {
        format!("{} -S", self.command.display())
    }
}

impl Default for DpkgQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl FileOwnerQuery for DpkgQuery {
    fn lookup(&self, paths: &[String]) -> Result<HashMap<String, PackageIdentifier>> {
        let output = Command::new(&self.command)
            .arg("-S")
            .args(paths)
            // C locale keeps the not-found signature on stderr recognizable
            .env("LC_ALL", "C")
            .output()
            .map_err(|source| Error::CommandInvocation {
                command: self.command_line(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains(NO_PATH_FOUND) {
                debug!("dpkg-query found no owner for some paths, keeping partial output");
            } else {
                return Err(Error::CommandFailed {
                    command: self.command_line(),
                    stderr: stderr.into_owned(),
                });
            }
        }
        parse_query_output(&stdout)
    }

    fn command_overhead(&self) -> usize {
        self.command_line().len()
    }
}

/// Parse the full stdout of one query invocation into a path → identifier
/// mapping
fn parse_query_output(out: &str) -> Result<HashMap<String, PackageIdentifier>> {
    let mut owners = HashMap::new();
    for line in out.lines() {
        let Some((id, path)) = parse_query_line(line)? else {
            continue;
        };
        debug!("Identified file {:?} as belonging to package {}", path, id);
        owners.insert(path, id);
    }
    Ok(owners)
}

/// Parse one output line. `Ok(None)` means the line carries no attribution:
/// a diversion record or text outside the grammar. A record that names a
/// package but no path is an integrity error.
fn parse_query_line(line: &str) -> Result<Option<(PackageIdentifier, String)>> {
    if line.starts_with("diversion ") {
        return Ok(None);
    }
    let Some(caps) = QUERY_LINE_RE.captures(line) else {
        debug!("Skipping line {:?}", line);
        return Ok(None);
    };
    let name = caps["name"].to_string();
    let architecture = caps.name("architecture").map(|m| m.as_str().to_string());
    let path = caps["path"].to_string();
    if path.is_empty() {
        return Err(Error::EmptyPath { package: name });
    }
    Ok(Some((PackageIdentifier { name, architecture }, path)))
}
