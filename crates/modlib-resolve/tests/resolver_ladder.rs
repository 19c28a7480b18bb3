//! Integration tests for the local resolution ladder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use modlib_core::{
    EngineState, ImportError, ModuleKey, ModuleType, ModuleVersion, VersionConstraint, ANY_VERSION,
};
use modlib_resolve::{LoadContext, LocalResolver, Resolved};

fn write_manifest(dir: &Path, name: &str, version: &str) -> PathBuf {
    let path = dir.join(format!("{name}.psd1"));
    std::fs::write(&path, format!("@{{ ModuleVersion = '{version}' }}")).unwrap();
    path
}

fn constraint_max(text: &str) -> VersionConstraint {
    let max: ModuleVersion = text.parse().unwrap();
    VersionConstraint::between("test", None, Some(max)).unwrap()
}

fn resolve(
    resolver: &LocalResolver,
    state: &mut EngineState,
    input: &str,
    constraint: &VersionConstraint,
) -> Result<Option<Resolved>, ImportError> {
    resolver.resolve(state, input, constraint, false, &LoadContext::local())
}

#[test]
fn bare_name_resolves_through_the_search_path() {
    let root = tempfile::tempdir().unwrap();
    let module_dir = root.path().join("Disk");
    std::fs::create_dir_all(&module_dir).unwrap();
    let manifest = write_manifest(&module_dir, "Disk", "1.2");

    let resolver = LocalResolver::new(vec![root.path().to_path_buf()]);
    let mut state = EngineState::new();

    let resolved = resolve(&resolver, &mut state, "Disk", &ANY_VERSION)
        .unwrap()
        .expect("should resolve");
    assert_eq!(resolved.record().key, ModuleKey::Path(manifest));
    assert_eq!(resolved.record().version, Some("1.2".parse().unwrap()));
}

#[test]
fn search_path_order_is_precedence() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    for root in [&first, &second] {
        let dir = root.path().join("Disk");
        std::fs::create_dir_all(&dir).unwrap();
        write_manifest(&dir, "Disk", "1.0");
    }

    let resolver = LocalResolver::new(vec![
        first.path().to_path_buf(),
        second.path().to_path_buf(),
    ]);
    let mut state = EngineState::new();

    let resolved = resolve(&resolver, &mut state, "Disk", &ANY_VERSION)
        .unwrap()
        .unwrap();
    let path = resolved.record().path.clone().unwrap();
    assert!(path.starts_with(first.path()));
}

#[test]
fn manifest_is_preferred_over_loose_script() {
    let root = tempfile::tempdir().unwrap();
    let module_dir = root.path().join("Disk");
    std::fs::create_dir_all(&module_dir).unwrap();
    std::fs::write(module_dir.join("Disk.psm1"), "function Get-Disk {}").unwrap();
    write_manifest(&module_dir, "Disk", "1.0");

    let resolver = LocalResolver::new(vec![root.path().to_path_buf()]);
    let mut state = EngineState::new();

    let resolved = resolve(&resolver, &mut state, "Disk", &ANY_VERSION)
        .unwrap()
        .unwrap();
    assert_eq!(resolved.record().module_type, ModuleType::Manifest);
}

#[test]
fn rooted_directory_with_trailing_separator_yields_the_manifest() {
    let root = tempfile::tempdir().unwrap();
    let module_dir = root.path().join("foo");
    std::fs::create_dir_all(&module_dir).unwrap();
    write_manifest(&module_dir, "foo", "1.0");

    let resolver = LocalResolver::new(Vec::new());
    let mut state = EngineState::new();

    let input = format!("{}/", module_dir.display());
    let resolved = resolve(&resolver, &mut state, &input, &ANY_VERSION)
        .unwrap()
        .expect("directory input should resolve to its default member");
    assert_eq!(resolved.record().module_type, ModuleType::Manifest);
}

#[test]
fn version_segmented_layout_highest_wins() {
    let root = tempfile::tempdir().unwrap();
    let module_dir = root.path().join("mod");
    for version in ["1.0", "2.0"] {
        let versioned = module_dir.join(version);
        std::fs::create_dir_all(&versioned).unwrap();
        write_manifest(&versioned, "mod", version);
    }
    // A non-version subdirectory must be skipped, not treated as an error.
    std::fs::create_dir_all(module_dir.join("docs")).unwrap();

    let resolver = LocalResolver::new(vec![root.path().to_path_buf()]);
    let mut state = EngineState::new();

    let resolved = resolve(&resolver, &mut state, "mod", &ANY_VERSION)
        .unwrap()
        .unwrap();
    assert_eq!(resolved.record().version, Some("2.0".parse().unwrap()));

    let constrained = resolve(&resolver, &mut state, "mod", &constraint_max("1.5"))
        .unwrap()
        .unwrap();
    assert_eq!(constrained.record().version, Some("1.0".parse().unwrap()));
}

#[test]
fn rooted_path_without_extension_probes_in_order() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("Disk.psm1"), "function Get-Disk {}").unwrap();

    let resolver = LocalResolver::new(Vec::new());
    let mut state = EngineState::new();

    let input = root.path().join("Disk").display().to_string();
    let resolved = resolve(&resolver, &mut state, &input, &ANY_VERSION)
        .unwrap()
        .unwrap();
    assert_eq!(resolved.record().module_type, ModuleType::Script);
}

#[test]
fn missing_module_is_a_miss_not_an_error() {
    let root = tempfile::tempdir().unwrap();
    let resolver = LocalResolver::new(vec![root.path().to_path_buf()]);
    let mut state = EngineState::new();

    assert!(resolve(&resolver, &mut state, "Nonexistent", &ANY_VERSION)
        .unwrap()
        .is_none());
}

#[test]
fn second_resolution_hits_the_cache_and_table() {
    let root = tempfile::tempdir().unwrap();
    let module_dir = root.path().join("Disk");
    std::fs::create_dir_all(&module_dir).unwrap();
    write_manifest(&module_dir, "Disk", "1.0");

    let resolver = LocalResolver::new(vec![root.path().to_path_buf()]);
    let mut state = EngineState::new();

    let first = resolve(&resolver, &mut state, "Disk", &ANY_VERSION)
        .unwrap()
        .unwrap();
    let Resolved::Loaded(record) = first else {
        panic!("first resolution must load fresh");
    };
    let key = record.key.clone();
    state.register(Arc::new(record), Vec::new());

    // Second resolution must come back from the table with the same key,
    // via the cache, without re-walking the search path.
    let second = resolve(&resolver, &mut state, "Disk", &ANY_VERSION)
        .unwrap()
        .unwrap();
    let Resolved::AlreadyLoaded(existing) = second else {
        panic!("second resolution must be the idempotent fast path");
    };
    assert_eq!(existing.key, key);
}

#[test]
fn stale_cache_entry_forces_full_resolution() {
    let root = tempfile::tempdir().unwrap();
    let module_dir = root.path().join("Disk");
    std::fs::create_dir_all(&module_dir).unwrap();
    let manifest = write_manifest(&module_dir, "Disk", "1.0");

    let resolver = LocalResolver::new(vec![root.path().to_path_buf()]);
    let mut state = EngineState::new();

    resolve(&resolver, &mut state, "Disk", &ANY_VERSION)
        .unwrap()
        .unwrap();

    // Delete the resolved artifact out-of-band; the stale cache entry must
    // not be returned, and resolution must re-run (and now miss).
    std::fs::remove_file(&manifest).unwrap();
    assert!(resolve(&resolver, &mut state, "Disk", &ANY_VERSION)
        .unwrap()
        .is_none());
}

#[test]
fn constrained_lookup_bypasses_the_cache() {
    let root = tempfile::tempdir().unwrap();
    let module_dir = root.path().join("mod");
    for version in ["1.0", "2.0"] {
        let versioned = module_dir.join(version);
        std::fs::create_dir_all(&versioned).unwrap();
        write_manifest(&versioned, "mod", version);
    }

    let resolver = LocalResolver::new(vec![root.path().to_path_buf()]);
    let mut state = EngineState::new();

    // Unconstrained resolution caches the 2.0 path.
    resolve(&resolver, &mut state, "mod", &ANY_VERSION)
        .unwrap()
        .unwrap();

    // A constrained lookup must not be served from that cache entry.
    let constrained = resolve(&resolver, &mut state, "mod", &constraint_max("1.5"))
        .unwrap()
        .unwrap();
    assert_eq!(constrained.record().version, Some("1.0".parse().unwrap()));
}

#[test]
fn already_loaded_check_runs_before_the_cache() {
    let root = tempfile::tempdir().unwrap();
    let manifest = write_manifest(root.path(), "Disk", "1.0");

    let resolver = LocalResolver::new(Vec::new());
    let mut state = EngineState::new();
    let input = manifest.display().to_string();

    let first = resolve(&resolver, &mut state, &input, &ANY_VERSION)
        .unwrap()
        .unwrap();
    let Resolved::Loaded(record) = first else {
        panic!("first resolution must load fresh");
    };
    state.register(Arc::new(record), Vec::new());

    // With a constraint the loaded 1.0 entry cannot satisfy, the ladder
    // must fall past the table and re-resolve rather than serving a stale
    // answer from the cache.
    let exact: ModuleVersion = "9.9".parse().unwrap();
    let miss = resolve(
        &resolver,
        &mut state,
        &input,
        &VersionConstraint::exact(exact),
    )
    .unwrap();
    assert!(miss.is_none());

    // Unconstrained, the table entry wins.
    let hit = resolve(&resolver, &mut state, &input, &ANY_VERSION)
        .unwrap()
        .unwrap();
    assert!(matches!(hit, Resolved::AlreadyLoaded(_)));
}

#[test]
fn force_reload_skips_table_and_cache() {
    let root = tempfile::tempdir().unwrap();
    let manifest = write_manifest(root.path(), "Disk", "1.0");

    let resolver = LocalResolver::new(Vec::new());
    let mut state = EngineState::new();
    let input = manifest.display().to_string();

    let first = resolve(&resolver, &mut state, &input, &ANY_VERSION)
        .unwrap()
        .unwrap();
    let Resolved::Loaded(record) = first else {
        panic!();
    };
    state.register(Arc::new(record), Vec::new());

    let forced = resolver
        .resolve(&mut state, &input, &ANY_VERSION, true, &LoadContext::local())
        .unwrap()
        .unwrap();
    assert!(matches!(forced, Resolved::Loaded(_)));
}
