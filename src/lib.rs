// src/lib.rs

//! debtrace
//!
//! Reconstructs which installed Debian packages own a given set of file
//! paths, producing structured provenance (package identity, version,
//! checksums, repository origin) for environment-capture and
//! reproducibility tooling.
//!
//! # Architecture
//!
//! - Batched ownership queries: `dpkg-query -S` invoked under a
//!   command-length budget, tolerant of partial not-found results
//! - Database-backed metadata: installed state and version history read
//!   from dpkg's status file and the downloaded APT repository indexes
//! - Origin canonicalization: repository descriptors deduplicated across
//!   the package set and registered under deterministic names
//! - In-memory results: the `(packages, origins, unknown_files)` triple is
//!   returned to the caller, which owns persistence

pub mod apt;
pub mod batch;
pub mod dpkg;
mod error;
pub mod model;
pub mod origins;
pub mod resolve;
pub mod trace;
pub mod version;

pub use apt::cache::{
    AptCache, CachedPackage, CachedVersion, IndexOrigin, InstalledInfo, SystemAptCache,
};
pub use dpkg::{DpkgQuery, FileOwnerQuery};
pub use error::{Error, Result};
pub use model::{
    AptOrigin, Checksums, DebPackage, NamedOrigin, OriginKey, OriginRef, PackageIdentifier,
    TraceResult, VersionEntry,
};
pub use resolve::MetadataResolver;
pub use trace::{identify_packages, Tracer};
pub use version::DebVersion;
