//! Flat-tree package installation.

use super::error::PkgError;
use super::manifest::installed_version;
use super::registry::RegistryClient;
use super::validate::validate_installation;
use super::version::version_satisfies;
use std::path::Path;
use tracing::{debug, info, warn};

/// Install `name@version` under the flat install root.
///
/// The layout is one directory per package name (`<root>/<name>`), so
/// only a single version of a name can exist on disk; whatever was
/// installed first wins and is never overwritten.
///
/// Idempotent: an existing install whose recorded version satisfies the
/// request is left alone without a download. An existing install that
/// does *not* satisfy is logged and also left alone. Every path ends
/// with the validator's verdict logged.
///
/// Scoped (`@scope/name`) packages are not supported and are skipped
/// with a warning before any fetch or write.
///
/// # Errors
/// Propagates download/extraction failures (`PkgError::is_fetch`); the
/// walker treats those as a per-branch abort.
pub async fn install_package(
    registry: &RegistryClient,
    name: &str,
    version: &str,
    install_root: &Path,
) -> Result<(), PkgError> {
    if name.starts_with('@') {
        warn!(
            package = %name,
            version = %version,
            "Skipping installation for scoped package"
        );
        return Ok(());
    }

    let install_path = install_root.join(name);

    if install_path.exists() {
        match installed_version(&install_path) {
            Some(present) if !version_satisfies(&present, version) => {
                warn!(
                    package = %name,
                    installed = %present,
                    requested = %version,
                    "Version mismatch for installed package; keeping what is on disk"
                );
            }
            present => {
                debug!(
                    package = %name,
                    installed = ?present,
                    requested = %version,
                    "Already installed and satisfies the requested version"
                );
            }
        }
    } else {
        info!(package = %name, version = %version, "Installing");
        registry.download_tarball(name, version, &install_path).await?;
    }

    let verdict = validate_installation(name, version, &install_path);
    if verdict.valid {
        info!(package = %name, version = %version, "{}", verdict.message);
    } else {
        warn!(package = %name, version = %version, "{}", verdict.message);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn stub_registry() -> RegistryClient {
        // Points nowhere routable; tests below never hit the network.
        RegistryClient::new("http://127.0.0.1:1/").unwrap()
    }

    fn plant_package(root: &Path, name: &str, version: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("package.json"),
            format!(r#"{{"name":"{name}","version":"{version}","main":"index.js"}}"#),
        )
        .unwrap();
        fs::write(dir.join("index.js"), "module.exports = 0;").unwrap();
    }

    #[tokio::test]
    async fn test_scoped_package_skipped() {
        let root = tempdir().unwrap();
        // No registry reachable; if the skip did not fire this would error.
        install_package(&stub_registry(), "@types/node", "20.0.0", root.path())
            .await
            .unwrap();
        assert!(!root.path().join("@types/node").exists());
    }

    #[tokio::test]
    async fn test_existing_satisfying_install_is_noop() {
        let root = tempdir().unwrap();
        plant_package(root.path(), "demo", "1.2.3");

        install_package(&stub_registry(), "demo", "1.2.3", root.path())
            .await
            .unwrap();

        // Still the planted version.
        assert_eq!(
            super::super::manifest::installed_version(&root.path().join("demo")),
            Some("1.2.3".to_string())
        );
    }

    #[tokio::test]
    async fn test_mismatched_install_left_alone() {
        let root = tempdir().unwrap();
        plant_package(root.path(), "demo", "1.0.0");

        // Requesting 2.0.0 must neither download nor modify the tree.
        install_package(&stub_registry(), "demo", "2.0.0", root.path())
            .await
            .unwrap();

        assert_eq!(
            super::super::manifest::installed_version(&root.path().join("demo")),
            Some("1.0.0".to_string())
        );
    }

    #[tokio::test]
    async fn test_unreadable_install_treated_as_satisfied() {
        let root = tempdir().unwrap();
        let dir = root.path().join("demo");
        fs::create_dir_all(&dir).unwrap();
        // Directory exists but has no readable manifest.

        install_package(&stub_registry(), "demo", "1.0.0", root.path())
            .await
            .unwrap();

        // No download was attempted and nothing was written.
        assert!(!dir.join("package.json").exists());
    }

    #[tokio::test]
    async fn test_missing_install_propagates_fetch_error() {
        let root = tempdir().unwrap();

        let err = install_package(&stub_registry(), "demo", "1.0.0", root.path())
            .await
            .unwrap_err();
        assert!(err.is_fetch());
    }
}
