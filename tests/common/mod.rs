// tests/common/mod.rs

//! Shared fixtures: scripted ownership queries and an in-memory package
//! database.

use debtrace::{
    AptCache, CachedPackage, CachedVersion, FileOwnerQuery, IndexOrigin, InstalledInfo,
    PackageIdentifier, Result,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Route pipeline tracing through the test harness; `RUST_LOG` selects
/// the detail level
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Ownership backend answering from a fixed table, counting invocations
pub struct ScriptedQuery {
    owners: HashMap<String, PackageIdentifier>,
    calls: Rc<RefCell<usize>>,
}

impl ScriptedQuery {
    /// Entries are `(path, "name")` or `(path, "name:arch")`
    pub fn new(entries: &[(&str, &str)]) -> Self {
        let owners = entries
            .iter()
            .map(|(path, owner)| {
                let id = match owner.split_once(':') {
                    Some((name, arch)) => PackageIdentifier::with_architecture(name, arch),
                    None => PackageIdentifier::new(*owner),
                };
                (path.to_string(), id)
            })
            .collect();
        Self {
            owners,
            calls: Rc::new(RefCell::new(0)),
        }
    }

    /// Handle onto the invocation counter, usable after the query moves
    /// into a tracer
    pub fn call_counter(&self) -> Rc<RefCell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl FileOwnerQuery for ScriptedQuery {
    fn lookup(&self, paths: &[String]) -> Result<HashMap<String, PackageIdentifier>> {
        *self.calls.borrow_mut() += 1;
        Ok(paths
            .iter()
            .filter_map(|path| self.owners.get(path).map(|id| (path.clone(), id.clone())))
            .collect())
    }

    fn command_overhead(&self) -> usize {
        "dpkg-query -S".len()
    }
}

/// In-memory package database keyed by name
#[derive(Default)]
pub struct MemoryCache {
    packages: HashMap<String, CachedPackage>,
}

impl MemoryCache {
    pub fn with(mut self, package: CachedPackage) -> Self {
        self.packages.insert(package.name.clone(), package);
        self
    }
}

impl AptCache for MemoryCache {
    fn find(&self, id: &PackageIdentifier) -> Option<CachedPackage> {
        self.packages.get(&id.name).cloned()
    }
}

/// A minimal installed package with one version available from one origin
pub fn cached_package(name: &str, version: &str, arch: &str) -> CachedPackage {
    CachedPackage {
        name: name.to_string(),
        installed: InstalledInfo {
            version: version.to_string(),
            architecture: Some(arch.to_string()),
            source_name: None,
            source_version: None,
            size: Some(100_000),
            md5: Some(format!("{name}-md5")),
            sha1: Some(format!("{name}-sha1")),
            sha256: Some(format!("{name}-sha256")),
        },
        candidate_version: Some(version.to_string()),
        versions: vec![CachedVersion {
            version: version.to_string(),
            origins: vec![debian_origin("main", "stable")],
        }],
    }
}

pub fn debian_origin(component: &str, archive: &str) -> IndexOrigin {
    IndexOrigin {
        component: Some(component.to_string()),
        archive: Some(archive.to_string()),
        codename: Some("bookworm".to_string()),
        architecture: Some("amd64".to_string()),
        origin: Some("Debian".to_string()),
        label: Some("Debian".to_string()),
        site: Some("deb.debian.org".to_string()),
        archive_uri: Some("http://deb.debian.org/debian/".to_string()),
        index_path: None,
    }
}
