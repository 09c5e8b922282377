// src/apt/mod.rs

//! Local APT database access
//!
//! Read-only views over dpkg's status file, the downloaded repository
//! indexes under the APT lists directory, and their Release files.

pub mod cache;
pub mod release;

pub use cache::{
    AptCache, CachedPackage, CachedVersion, IndexOrigin, InstalledInfo, SystemAptCache,
};
