//! Structural validation of installed packages.

use super::manifest::MANIFEST_NAME;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Default entry file when a manifest declares no `main` field.
const DEFAULT_ENTRY: &str = "index.js";

/// Outcome of validating one installed package.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the install is structurally sound. A missing entry point
    /// is a warning, not a failure: data-only and type-only packages
    /// ship no runnable entry.
    pub valid: bool,
    /// Human-readable verdict.
    pub message: String,
}

impl ValidationResult {
    fn ok(message: String) -> Self {
        Self {
            valid: true,
            message,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            valid: false,
            message,
        }
    }
}

/// Inspect an installed package's on-disk layout.
///
/// Checks, in order: the package directory exists, its manifest exists
/// and parses, and the entry file (`main` field, else `index.js`) is
/// present.
#[must_use]
pub fn validate_installation(name: &str, version: &str, install_path: &Path) -> ValidationResult {
    if !install_path.exists() {
        return ValidationResult::failed(format!(
            "Validation failed: directory for {name}@{version} does not exist"
        ));
    }

    let manifest_path = install_path.join(MANIFEST_NAME);
    if !manifest_path.exists() {
        return ValidationResult::failed(format!(
            "Validation failed: package.json for {name}@{version} is missing"
        ));
    }

    let manifest: Value = match fs::read_to_string(&manifest_path)
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
    {
        Some(m) => m,
        None => {
            return ValidationResult::failed(format!(
                "Validation failed: package.json for {name}@{version} could not be parsed"
            ));
        }
    };

    let declared_main = manifest.get("main").and_then(|v| v.as_str());
    let entry = declared_main.unwrap_or(DEFAULT_ENTRY);

    if install_path.join(entry).exists() {
        ValidationResult::ok(format!("Entry point {entry} for {name}@{version} found"))
    } else if declared_main.is_some() {
        ValidationResult::ok(format!(
            "Warning: entry point {entry} for {name}@{version} is missing"
        ))
    } else {
        ValidationResult::ok(format!(
            "Warning: no entry point declared for {name}@{version} and fallback {DEFAULT_ENTRY} is missing"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_missing_directory() {
        let dir = tempdir().unwrap();
        let result = validate_installation("demo", "1.0.0", &dir.path().join("demo"));
        assert!(!result.valid);
        assert!(result.message.contains("demo@1.0.0"));
        assert!(result.message.contains("does not exist"));
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempdir().unwrap();
        let result = validate_installation("demo", "1.0.0", dir.path());
        assert!(!result.valid);
        assert!(result.message.contains("package.json"));
    }

    #[test]
    fn test_entry_point_found() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name":"demo","version":"1.0.0","main":"lib/main.js"}"#,
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/main.js"), "ok").unwrap();

        let result = validate_installation("demo", "1.0.0", dir.path());
        assert!(result.valid);
        assert!(result.message.contains("lib/main.js"));
        assert!(!result.message.starts_with("Warning"));
    }

    #[test]
    fn test_default_entry_found() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name":"demo","version":"1.0.0"}"#,
        )
        .unwrap();
        fs::write(dir.path().join("index.js"), "ok").unwrap();

        let result = validate_installation("demo", "1.0.0", dir.path());
        assert!(result.valid);
        assert!(result.message.contains("index.js"));
    }

    #[test]
    fn test_declared_entry_missing_is_soft_warning() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name":"demo","version":"1.0.0","main":"gone.js"}"#,
        )
        .unwrap();

        let result = validate_installation("demo", "1.0.0", dir.path());
        assert!(result.valid);
        assert!(result.message.contains("Warning"));
        assert!(result.message.contains("gone.js"));
    }

    #[test]
    fn test_no_entry_at_all_is_soft_warning() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name":"demo","version":"1.0.0"}"#,
        )
        .unwrap();

        let result = validate_installation("demo", "1.0.0", dir.path());
        assert!(result.valid, "a missing entry point must not invalidate");
        assert!(result.message.contains("Warning"));
        assert!(result.message.contains("index.js"));
    }

    #[test]
    fn test_unparseable_manifest() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "not json").unwrap();

        let result = validate_installation("demo", "1.0.0", dir.path());
        assert!(!result.valid);
        assert!(result.message.contains("could not be parsed"));
    }
}
