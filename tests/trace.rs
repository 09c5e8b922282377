// tests/trace.rs

//! Attribution pipeline tests: partitioning, batching, origin
//! canonicalization, and the dpkg-query failure modes.

mod common;

use common::{cached_package, debian_origin, MemoryCache, ScriptedQuery};
use debtrace::{
    CachedPackage, CachedVersion, DpkgQuery, Error, FileOwnerQuery, InstalledInfo,
    MetadataResolver, OriginRef, Tracer,
};
use std::collections::HashSet;

fn paths(entries: &[&str]) -> Vec<String> {
    entries.iter().map(|s| s.to_string()).collect()
}

fn tracer(query: ScriptedQuery, cache: MemoryCache) -> Tracer<ScriptedQuery, MemoryCache> {
    common::init_logging();
    Tracer::new(query, MetadataResolver::with_info_dir(cache, "/nonexistent/info"))
}

#[test]
fn partial_lookup_sends_missing_files_to_unknown() {
    // Scenario: the backend knows /bin/ls but nothing owns /usr/bin/ghost
    let query = ScriptedQuery::new(&[("/bin/ls", "coreutils")]);
    let cache = MemoryCache::default().with(cached_package("coreutils", "8.32-4.1", "amd64"));
    let result = tracer(query, cache)
        .identify_packages(&paths(&["/bin/ls", "/usr/bin/ghost"]))
        .unwrap();

    assert_eq!(result.packages.len(), 1);
    assert_eq!(result.packages[0].name, "coreutils");
    assert_eq!(result.packages[0].files, paths(&["/bin/ls"]));
    assert_eq!(result.unknown_files, paths(&["/usr/bin/ghost"]));
}

#[test]
fn unresolvable_package_surrenders_all_its_files() {
    // The backend attributes three files to a package the database has
    // never heard of
    let query = ScriptedQuery::new(&[
        ("/opt/x/a", "phantom"),
        ("/opt/x/b", "phantom"),
        ("/opt/x/c", "phantom"),
    ]);
    let result = tracer(query, MemoryCache::default())
        .identify_packages(&paths(&["/opt/x/a", "/opt/x/b", "/opt/x/c"]))
        .unwrap();

    assert!(result.packages.is_empty());
    assert_eq!(result.unknown_files, paths(&["/opt/x/a", "/opt/x/b", "/opt/x/c"]));
}

#[test]
fn every_input_lands_in_exactly_one_place() {
    let query = ScriptedQuery::new(&[
        ("/bin/ls", "coreutils"),
        ("/bin/cat", "coreutils"),
        ("/usr/lib/libz.so.1", "zlib1g:amd64"),
        ("/opt/ghost/bin", "phantom"),
    ]);
    let cache = MemoryCache::default()
        .with(cached_package("coreutils", "8.32-4.1", "amd64"))
        .with(cached_package("zlib1g", "1:1.2.13-1", "amd64"));
    let input = paths(&[
        "/bin/ls",
        "/home/user/notes.txt",
        "/usr/lib/libz.so.1",
        "/bin/cat",
        "/opt/ghost/bin",
    ]);
    let result = tracer(query, cache).identify_packages(&input).unwrap();

    let mut covered: Vec<String> = result
        .packages
        .iter()
        .flat_map(|p| p.files.iter().cloned())
        .chain(result.unknown_files.iter().cloned())
        .collect();
    assert_eq!(covered.len(), input.len(), "partition must be exact");
    covered.sort();
    let mut expected = input.clone();
    expected.sort();
    assert_eq!(covered, expected);

    let owned: HashSet<&String> = result
        .packages
        .iter()
        .flat_map(|p| p.files.iter())
        .collect();
    assert!(
        result.unknown_files.iter().all(|f| !owned.contains(f)),
        "owned and unknown sets must be disjoint"
    );
}

#[test]
fn files_keep_first_seen_order() {
    let query = ScriptedQuery::new(&[
        ("/bin/ls", "coreutils"),
        ("/bin/cat", "coreutils"),
        ("/bin/rm", "coreutils"),
    ]);
    let cache = MemoryCache::default().with(cached_package("coreutils", "8.32-4.1", "amd64"));
    let result = tracer(query, cache)
        .identify_packages(&paths(&["/bin/rm", "/bin/ls", "/bin/cat"]))
        .unwrap();

    assert_eq!(result.packages[0].files, paths(&["/bin/rm", "/bin/ls", "/bin/cat"]));
}

#[test]
fn small_command_budget_splits_lookups_without_losses() {
    let query = ScriptedQuery::new(&[
        ("/bin/ls", "coreutils"),
        ("/bin/cat", "coreutils"),
        ("/bin/rm", "coreutils"),
        ("/bin/mv", "coreutils"),
    ]);
    let cache = MemoryCache::default().with(cached_package("coreutils", "8.32-4.1", "amd64"));
    let input = paths(&["/bin/ls", "/bin/cat", "/bin/rm", "/bin/mv"]);
    // Budget fits one path per invocation
    let result = tracer(query, cache)
        .with_max_cmd_len("dpkg-query -S".len() + 9)
        .identify_packages(&input)
        .unwrap();

    assert_eq!(result.packages[0].files, input);
    assert!(result.unknown_files.is_empty());
}

#[test]
fn batches_reach_the_backend_separately() {
    let query = ScriptedQuery::new(&[("/bin/ls", "coreutils"), ("/bin/cat", "coreutils")]);
    let calls = query.call_counter();
    let cache = MemoryCache::default().with(cached_package("coreutils", "8.32-4.1", "amd64"));
    let tracer = tracer(query, cache).with_max_cmd_len("dpkg-query -S".len() + 9);
    let result = tracer
        .identify_packages(&paths(&["/bin/ls", "/bin/cat"]))
        .unwrap();

    assert_eq!(result.packages[0].files.len(), 2);
    assert_eq!(*calls.borrow(), 2, "one invocation per batch");
}

#[test]
fn duplicate_input_paths_collapse() {
    let query = ScriptedQuery::new(&[("/bin/ls", "coreutils")]);
    let cache = MemoryCache::default().with(cached_package("coreutils", "8.32-4.1", "amd64"));
    let result = tracer(query, cache)
        .identify_packages(&paths(&["/bin/ls", "/bin/ls", "/tmp/x", "/tmp/x"]))
        .unwrap();

    assert_eq!(result.packages[0].files, paths(&["/bin/ls"]));
    assert_eq!(result.unknown_files, paths(&["/tmp/x"]));
}

#[test]
fn origins_reached_via_different_mirrors_share_one_name() {
    // Two versions of the same package, same logical repository, reached
    // through two mirrors
    let mut primary = debian_origin("main", "stable");
    primary.architecture = None;
    let mut mirror = primary.clone();
    mirror.archive_uri = Some("http://ftp.us.debian.org/debian/".to_string());
    let package = CachedPackage {
        name: "coreutils".to_string(),
        installed: InstalledInfo {
            version: "8.32-4.1".to_string(),
            architecture: Some("amd64".to_string()),
            source_name: None,
            source_version: None,
            size: None,
            md5: None,
            sha1: None,
            sha256: None,
        },
        candidate_version: Some("8.32-4.1".to_string()),
        versions: vec![
            CachedVersion {
                version: "8.32-4.1".to_string(),
                origins: vec![primary],
            },
            CachedVersion {
                version: "8.30-3".to_string(),
                origins: vec![mirror],
            },
        ],
    };
    let query = ScriptedQuery::new(&[("/bin/ls", "coreutils")]);
    let cache = MemoryCache::default().with(package);
    let result = tracer(query, cache)
        .identify_packages(&paths(&["/bin/ls"]))
        .unwrap();

    assert_eq!(result.origins.len(), 1);
    let name = &result.origins[0].name;
    assert_eq!(name, "apt_Debian_stable_main_0");
    for entry in &result.packages[0].version_table {
        for origin in &entry.origins {
            assert!(matches!(origin, OriginRef::Named(n) if n == name));
        }
    }
}

#[test]
fn repeated_runs_yield_identical_results() {
    let build = || {
        let query = ScriptedQuery::new(&[
            ("/bin/ls", "coreutils"),
            ("/usr/lib/libz.so.1", "zlib1g:amd64"),
        ]);
        let cache = MemoryCache::default()
            .with(cached_package("coreutils", "8.32-4.1", "amd64"))
            .with(cached_package("zlib1g", "1:1.2.13-1", "amd64"));
        tracer(query, cache)
            .identify_packages(&paths(&["/bin/ls", "/usr/lib/libz.so.1", "/tmp/x"]))
            .unwrap()
    };
    let first = build();
    let second = build();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn result_serializes_with_named_origin_references() {
    let query = ScriptedQuery::new(&[("/bin/ls", "coreutils")]);
    let cache = MemoryCache::default().with(cached_package("coreutils", "8.32-4.1", "amd64"));
    let result = tracer(query, cache)
        .identify_packages(&paths(&["/bin/ls"]))
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    let origins = &json["packages"][0]["version_table"][0]["origins"];
    assert_eq!(origins[0], serde_json::json!("apt_Debian_stable_main_0"));
    assert_eq!(json["origins"][0]["name"], serde_json::json!("apt_Debian_stable_main_0"));
}

// The remaining tests drive the production dpkg-query backend against
// stand-in scripts, covering the stderr contract without requiring a dpkg
// database on the test host.

#[cfg(unix)]
mod backend {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("fake-dpkg-query");
        fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn partial_not_found_recovers_with_partial_stdout() {
        let dir = TempDir::new().unwrap();
        let path = script(
            &dir,
            "echo 'coreutils: /bin/ls'\n\
             echo 'dpkg-query: no path found matching pattern /usr/bin/ghost' >&2\n\
             exit 1\n",
        );
        let owners = DpkgQuery::with_command(&path)
            .lookup(&paths(&["/bin/ls", "/usr/bin/ghost"]))
            .unwrap();

        assert_eq!(owners.len(), 1);
        assert_eq!(owners["/bin/ls"].name, "coreutils");
    }

    #[test]
    fn unrecognized_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = script(
            &dir,
            "echo 'dpkg-query: cannot access the package database' >&2\nexit 2\n",
        );
        let err = DpkgQuery::with_command(&path)
            .lookup(&paths(&["/bin/ls"]))
            .unwrap_err();

        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[test]
    fn diversion_lines_carry_no_attribution() {
        let dir = TempDir::new().unwrap();
        let path = script(
            &dir,
            "echo 'diversion by dash from: /bin/sh'\n\
             echo 'diversion by dash to: /bin/sh.distrib'\n\
             echo 'dash: /bin/dash'\n",
        );
        let owners = DpkgQuery::with_command(&path)
            .lookup(&paths(&["/bin/sh", "/bin/dash"]))
            .unwrap();

        assert_eq!(owners.len(), 1);
        assert_eq!(owners["/bin/dash"].name, "dash");
    }

    #[test]
    fn empty_path_in_record_is_an_integrity_error() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "echo 'coreutils: '\n");
        let err = DpkgQuery::with_command(&path)
            .lookup(&paths(&["/bin/ls"]))
            .unwrap_err();

        assert!(matches!(err, Error::EmptyPath { package } if package == "coreutils"));
    }

    #[test]
    fn missing_tool_is_fatal() {
        let err = DpkgQuery::with_command("/nonexistent/dpkg-query")
            .lookup(&paths(&["/bin/ls"]))
            .unwrap_err();

        assert!(matches!(err, Error::CommandInvocation { .. }));
    }
}
