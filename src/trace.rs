// src/trace.rs

//! The attribution pipeline
//!
//! [`Tracer`] wires the pieces together: batch the input paths, query the
//! ownership backend per batch, resolve metadata for every discovered
//! package, canonicalize origins, and partition the inputs into owned and
//! unknown files. Nothing survives between invocations; each call owns its
//! own registries.

use crate::apt::cache::{AptCache, SystemAptCache};
use crate::batch::{batch_paths, max_cmdline};
use crate::dpkg::{DpkgQuery, FileOwnerQuery};
use crate::error::Result;
use crate::model::{DebPackage, PackageIdentifier, TraceResult};
use crate::origins;
use crate::resolve::MetadataResolver;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Composes the query backend and metadata resolver into the single entry
/// point of the crate
pub struct Tracer<Q, C> {
    query: Q,
    resolver: MetadataResolver<C>,
    max_cmd_len: usize,
}

impl Tracer<DpkgQuery, SystemAptCache> {
    /// Tracer over the running system's dpkg and APT databases
    pub fn for_system() -> Self {
        Self::new(DpkgQuery::new(), MetadataResolver::new(SystemAptCache::system()))
    }
}

impl<Q: FileOwnerQuery, C: AptCache> Tracer<Q, C> {
    pub fn new(query: Q, resolver: MetadataResolver<C>) -> Self {
        Self {
            query,
            resolver,
            max_cmd_len: max_cmdline(),
        }
    }

    /// Override the probed command-length budget (tests, constrained hosts)
    pub fn with_max_cmd_len(mut self, max_cmd_len: usize) -> Self {
        self.max_cmd_len = max_cmd_len;
        self
    }

    /// Attribute `files` to the packages that installed them.
    ///
    /// Every input path lands in exactly one place: the `files` list of one
    /// returned package, or `unknown_files`. Repeated input paths collapse
    /// to their first occurrence.
    pub fn identify_packages(&self, files: &[String]) -> Result<TraceResult> {
        let owners = self.lookup_owners(files)?;

        // Partition in input order so file lists come out first-seen
        let mut unknown_files = Vec::new();
        let mut grouped: Vec<(PackageIdentifier, Vec<String>)> = Vec::new();
        let mut positions: HashMap<PackageIdentifier, usize> = HashMap::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for file in files {
            if !seen.insert(file.as_str()) {
                continue;
            }
            match owners.get(file) {
                None => unknown_files.push(file.clone()),
                Some(id) => {
                    let position = *positions.entry(id.clone()).or_insert_with(|| {
                        grouped.push((id.clone(), Vec::new()));
                        grouped.len() - 1
                    });
                    grouped[position].1.push(file.clone());
                }
            }
        }

        // Resolve each discovered package once; unresolvable identifiers
        // surrender their files to the unknown set
        let mut packages: Vec<DebPackage> = Vec::new();
        for (id, group) in grouped {
            match self.resolver.resolve(&id) {
                Some(mut package) => {
                    package.files = group;
                    packages.push(package);
                }
                None => unknown_files.extend(group),
            }
        }

        let origins = origins::canonicalize(&mut packages)?;

        info!(
            "{} packages with {} files, and {} other files",
            packages.len(),
            packages.iter().map(|p| p.files.len()).sum::<usize>(),
            unknown_files.len()
        );

        Ok(TraceResult {
            packages,
            origins,
            unknown_files,
        })
    }

    fn lookup_owners(&self, files: &[String]) -> Result<HashMap<String, PackageIdentifier>> {
        let mut owners = HashMap::new();
        for group in batch_paths(files, self.max_cmd_len, self.query.command_overhead()) {
            owners.extend(self.query.lookup(group)?);
        }
        Ok(owners)
    }
}

/// Attribute `files` on the running system. Convenience wrapper over
/// [`Tracer::for_system`].
pub fn identify_packages(files: &[String]) -> Result<TraceResult> {
    Tracer::for_system().identify_packages(files)
}
