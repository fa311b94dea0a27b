//! Manifest (package.json) store.
//!
//! The core only ever reads the `dependencies` map and, for `add`,
//! writes one entry back; every other manifest field passes through
//! untouched.

use super::error::PkgError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Manifest file name.
pub const MANIFEST_NAME: &str = "package.json";

/// Read the declared top-level dependencies from a manifest file.
///
/// A manifest without a `dependencies` section yields an empty map.
/// Entries whose specifier is not a string are skipped with a warning.
///
/// # Errors
/// `PKG_MANIFEST_NOT_FOUND` if the file is missing,
/// `PKG_MANIFEST_INVALID` if it cannot be parsed or is not an object.
pub fn read_dependencies(manifest_path: &Path) -> Result<BTreeMap<String, String>, PkgError> {
    if !manifest_path.exists() {
        return Err(PkgError::manifest_not_found(manifest_path));
    }

    let content = fs::read_to_string(manifest_path)
        .map_err(|e| PkgError::manifest_invalid(format!("Failed to read: {e}")))?;
    let manifest: Value = serde_json::from_str(&content)
        .map_err(|e| PkgError::manifest_invalid(format!("Invalid JSON: {e}")))?;

    let root = manifest
        .as_object()
        .ok_or_else(|| PkgError::manifest_invalid("package.json must be a JSON object"))?;

    let Some(section) = root.get("dependencies") else {
        return Ok(BTreeMap::new());
    };
    let Some(section) = section.as_object() else {
        return Err(PkgError::manifest_invalid(
            "'dependencies' must be an object",
        ));
    };

    let mut deps = BTreeMap::new();
    for (name, specifier) in section {
        if let Some(specifier) = specifier.as_str() {
            deps.insert(name.clone(), specifier.to_string());
        } else {
            warn!(name = %name, "Skipping dependency with non-string specifier");
        }
    }

    Ok(deps)
}

/// Record one dependency entry in a manifest file, preserving all other
/// fields, and write it back pretty-printed.
///
/// # Errors
/// `PKG_MANIFEST_NOT_FOUND` / `PKG_MANIFEST_INVALID` as for reads, and
/// `PKG_MANIFEST_INVALID` if the rewrite fails.
pub fn record_dependency(
    manifest_path: &Path,
    name: &str,
    version: &str,
) -> Result<(), PkgError> {
    if !manifest_path.exists() {
        return Err(PkgError::manifest_not_found(manifest_path));
    }

    let content = fs::read_to_string(manifest_path)
        .map_err(|e| PkgError::manifest_invalid(format!("Failed to read: {e}")))?;
    let mut manifest: Value = serde_json::from_str(&content)
        .map_err(|e| PkgError::manifest_invalid(format!("Invalid JSON: {e}")))?;

    let root = manifest
        .as_object_mut()
        .ok_or_else(|| PkgError::manifest_invalid("package.json must be a JSON object"))?;

    let section = root
        .entry("dependencies")
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    let Some(section) = section.as_object_mut() else {
        return Err(PkgError::manifest_invalid(
            "'dependencies' must be an object",
        ));
    };

    section.insert(name.to_string(), Value::String(version.to_string()));

    let mut formatted = serde_json::to_string_pretty(&manifest)
        .map_err(|e| PkgError::manifest_invalid(format!("Failed to serialize: {e}")))?;
    formatted.push('\n');

    fs::write(manifest_path, formatted)
        .map_err(|e| PkgError::manifest_invalid(format!("Failed to write: {e}")))?;

    Ok(())
}

/// Read the exact version recorded by an installed package's own
/// manifest. `None` on any failure; the installer treats an unreadable
/// install as already satisfied rather than clobbering it.
#[must_use]
pub fn installed_version(install_path: &Path) -> Option<String> {
    let content = fs::read_to_string(install_path.join(MANIFEST_NAME)).ok()?;
    let manifest: Value = serde_json::from_str(&content).ok()?;
    manifest
        .get("version")
        .and_then(|v| v.as_str())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_manifest(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join(MANIFEST_NAME);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_dependencies() {
        let dir = tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            r#"{
                "name": "app",
                "dependencies": {
                    "b": "2.0.0",
                    "a": "^1.0.0"
                }
            }"#,
        );

        let deps = read_dependencies(&path).unwrap();
        let pairs: Vec<_> = deps.iter().collect();
        assert_eq!(pairs.len(), 2);
        // BTreeMap iterates in name order.
        assert_eq!(pairs[0], (&"a".to_string(), &"^1.0.0".to_string()));
        assert_eq!(pairs[1], (&"b".to_string(), &"2.0.0".to_string()));
    }

    #[test]
    fn test_read_no_dependencies_section() {
        let dir = tempdir().unwrap();
        let path = write_manifest(dir.path(), r#"{"name": "app"}"#);

        assert!(read_dependencies(&path).unwrap().is_empty());
    }

    #[test]
    fn test_read_skips_non_string_specifiers() {
        let dir = tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            r#"{"dependencies": {"good": "^1.0.0", "bad": 42}}"#,
        );

        let deps = read_dependencies(&path).unwrap();
        assert_eq!(deps.len(), 1);
        assert!(deps.contains_key("good"));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_dependencies(&dir.path().join(MANIFEST_NAME)).unwrap_err();
        assert_eq!(err.code(), super::super::error::codes::PKG_MANIFEST_NOT_FOUND);
    }

    #[test]
    fn test_read_invalid_json() {
        let dir = tempdir().unwrap();
        let path = write_manifest(dir.path(), "not json {{{");
        let err = read_dependencies(&path).unwrap_err();
        assert_eq!(err.code(), super::super::error::codes::PKG_MANIFEST_INVALID);
    }

    #[test]
    fn test_read_non_object_section() {
        let dir = tempdir().unwrap();
        let path = write_manifest(dir.path(), r#"{"dependencies": "nope"}"#);
        assert!(read_dependencies(&path).is_err());
    }

    #[test]
    fn test_record_dependency_preserves_fields() {
        let dir = tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            r#"{"name": "app", "version": "0.1.0", "dependencies": {"a": "^1.0.0"}}"#,
        );

        record_dependency(&path, "left-pad", "1.3.0").unwrap();

        let deps = read_dependencies(&path).unwrap();
        assert_eq!(deps.get("a"), Some(&"^1.0.0".to_string()));
        assert_eq!(deps.get("left-pad"), Some(&"1.3.0".to_string()));

        let manifest: Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(manifest.get("name").unwrap(), "app");
        assert_eq!(manifest.get("version").unwrap(), "0.1.0");
    }

    #[test]
    fn test_record_dependency_creates_section() {
        let dir = tempdir().unwrap();
        let path = write_manifest(dir.path(), r#"{"name": "app"}"#);

        record_dependency(&path, "left-pad", "1.3.0").unwrap();

        let deps = read_dependencies(&path).unwrap();
        assert_eq!(deps.get("left-pad"), Some(&"1.3.0".to_string()));
    }

    #[test]
    fn test_installed_version() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), r#"{"name": "demo", "version": "1.2.3"}"#);

        assert_eq!(installed_version(dir.path()), Some("1.2.3".to_string()));
    }

    #[test]
    fn test_installed_version_unreadable() {
        let dir = tempdir().unwrap();
        // No manifest at all.
        assert_eq!(installed_version(dir.path()), None);

        // Unparseable manifest.
        write_manifest(dir.path(), "garbage");
        assert_eq!(installed_version(dir.path()), None);
    }
}
