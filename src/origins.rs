// src/origins.rs

//! Origin canonicalization
//!
//! Version tables come out of resolution with a full origin record inline
//! at every version that references a repository. Across a package set
//! those records repeat heavily, so this pass deduplicates them into a
//! named registry and rewrites each inline record to its assigned name.
//!
//! Identity is the descriptive tuple `(component, archive, architecture,
//! origin, label, site)`; `archive_uri` and `date` vary per mirror while
//! denoting the same logical repository and are deliberately excluded.

use crate::error::{Error, Result};
use crate::model::{AptOrigin, DebPackage, NamedOrigin, OriginKey, OriginRef};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Attempts per name template before declaring the input corrupt
const NAME_RETRY_CAP: usize = 10_000;

/// Deduplicate the origins referenced by `packages`, rewriting every inline
/// record to its canonical name. Returns the registry of distinct origins,
/// sorted by name. Names are unique within one call; the first sighting of
/// a key keeps its full descriptive record.
pub fn canonicalize(packages: &mut [DebPackage]) -> Result<Vec<NamedOrigin>> {
    let mut used_names: HashSet<String> = HashSet::new();
    let mut named: HashMap<OriginKey, NamedOrigin> = HashMap::new();

    for package in packages.iter_mut() {
        for entry in &mut package.version_table {
            for origin_ref in &mut entry.origins {
                let OriginRef::Inline(origin) = origin_ref else {
                    continue;
                };
                let key = origin.identity_key();
                let name = match named.get(&key) {
                    Some(existing) => existing.name.clone(),
                    None => {
                        let name = assign_name(origin, &mut used_names)?;
                        debug!("Registered origin {}", name);
                        named.insert(
                            key,
                            NamedOrigin {
                                name: name.clone(),
                                origin: (**origin).clone(),
                            },
                        );
                        name
                    }
                };
                *origin_ref = OriginRef::Named(name);
            }
        }
    }

    let mut registry: Vec<NamedOrigin> = named.into_values().collect();
    registry.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(registry)
}

/// Render `apt_{origin}_{archive}_{component}_{n}` with the first free `n`.
/// Distinct keys can render identical prefixes (absent fields all print as
/// `none`), so the counter disambiguates them.
fn assign_name(origin: &AptOrigin, used_names: &mut HashSet<String>) -> Result<String> {
    let prefix = format!(
        "apt_{}_{}_{}",
        origin.origin.as_deref().unwrap_or("none"),
        origin.archive.as_deref().unwrap_or("none"),
        origin.component.as_deref().unwrap_or("none"),
    );
    for n in 0..NAME_RETRY_CAP {
        let candidate = format!("{prefix}_{n}");
        if used_names.insert(candidate.clone()) {
            return Ok(candidate);
        }
    }
    Err(Error::OriginNames {
        template: format!("{prefix}_{{n}}"),
    })
}
