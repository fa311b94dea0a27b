//! npm-compatible registry client.

use super::error::PkgError;
use super::tarball::{self, MAX_TARBALL_SIZE};
use reqwest::Client;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Environment variable to override the registry URL.
pub const REGISTRY_ENV: &str = "QUAY_REGISTRY";

/// Full registry metadata document ("packument") for one package:
/// dist-tags plus every published version with its dependency map.
#[derive(Debug, Clone)]
pub struct Packument(serde_json::Value);

impl Packument {
    #[must_use]
    pub fn new(doc: serde_json::Value) -> Self {
        Self(doc)
    }

    /// Package name as recorded by the registry.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.get("name").and_then(|v| v.as_str()).unwrap_or("unknown")
    }

    /// The `dist-tags.latest` version, if present.
    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.0.get("dist-tags")?.get("latest")?.as_str()
    }

    /// All published version strings.
    #[must_use]
    pub fn versions(&self) -> Vec<&str> {
        self.0
            .get("versions")
            .and_then(|v| v.as_object())
            .map(|obj| obj.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether an exact version is published.
    #[must_use]
    pub fn has_version(&self, version: &str) -> bool {
        self.0
            .get("versions")
            .and_then(|v| v.get(version))
            .is_some()
    }

    /// Dependency map declared by one published version.
    ///
    /// Returns `None` when the version itself is unknown; a version with
    /// no `dependencies` field yields an empty map.
    #[must_use]
    pub fn dependencies_of(&self, version: &str) -> Option<BTreeMap<String, String>> {
        let entry = self.0.get("versions")?.get(version)?;
        let deps = entry
            .get("dependencies")
            .and_then(|d| d.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        Some(deps)
    }
}

/// Registry client for metadata lookups and tarball downloads.
///
/// Constructed once per run and passed by reference into the walker and
/// installer; tests substitute a local mock registry via the base URL.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: Client,
}

impl RegistryClient {
    /// Create a new registry client with the given base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot
    /// be created.
    pub fn new(base_url: &str) -> Result<Self, PkgError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PkgError::registry(format!("Invalid registry URL '{base_url}': {e}")))?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("quay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PkgError::registry(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Create a client using the registry URL from the environment or
    /// the default.
    pub fn from_env() -> Result<Self, PkgError> {
        let url = std::env::var(REGISTRY_ENV).unwrap_or_else(|_| DEFAULT_REGISTRY.to_string());
        Self::new(&url)
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the packument for a package.
    ///
    /// # Errors
    /// `PKG_NOT_FOUND` for an unknown package, `PKG_REGISTRY_ERROR` for
    /// any other failure.
    pub async fn packument(&self, name: &str) -> Result<Packument, PkgError> {
        // Scoped names keep their @ but encode the slash.
        let encoded = if name.starts_with('@') {
            name.replace('/', "%2F")
        } else {
            name.to_string()
        };

        let url = self
            .base_url
            .join(&encoded)
            .map_err(|e| PkgError::registry(format!("Failed to build URL for '{name}': {e}")))?;

        let response = self.http.get(url.as_str()).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PkgError::not_found(name));
        }
        if !response.status().is_success() {
            return Err(PkgError::registry(format!(
                "Registry returned status {} for '{name}'",
                response.status()
            )));
        }

        let doc: serde_json::Value = response.json().await?;
        Ok(Packument::new(doc))
    }

    /// Download the tarball for `name@version` and extract it into
    /// `dest`.
    ///
    /// The artifact lives at the conventional registry path
    /// `<name>/-/<basename>-<version>.tgz`.
    ///
    /// # Errors
    /// `PKG_DOWNLOAD_FAILED` on network/HTTP failure, `PKG_EXTRACT_FAILED`
    /// if the archive is malformed or unsafe.
    pub async fn download_tarball(
        &self,
        name: &str,
        version: &str,
        dest: &Path,
    ) -> Result<(), PkgError> {
        let basename = name.rsplit('/').next().unwrap_or(name);
        let url = self
            .base_url
            .join(&format!("{name}/-/{basename}-{version}.tgz"))
            .map_err(|e| {
                PkgError::download_failed(format!("Failed to build tarball URL for '{name}': {e}"))
            })?;

        let bytes = tarball::fetch_bytes(&self.http, url.as_str(), MAX_TARBALL_SIZE).await?;
        tarball::extract_tarball(&bytes, dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packument() -> Packument {
        Packument::new(serde_json::json!({
            "name": "demo",
            "dist-tags": { "latest": "2.0.0", "next": "3.0.0-rc.1" },
            "versions": {
                "1.0.0": {
                    "dependencies": { "left-pad": "^1.0.0" }
                },
                "2.0.0": {}
            }
        }))
    }

    #[test]
    fn test_latest_tag() {
        assert_eq!(sample_packument().latest(), Some("2.0.0"));
    }

    #[test]
    fn test_versions_list() {
        let p = sample_packument();
        let versions = p.versions();
        assert_eq!(versions.len(), 2);
        assert!(versions.contains(&"1.0.0"));
        assert!(versions.contains(&"2.0.0"));
        assert!(p.has_version("1.0.0"));
        assert!(!p.has_version("9.9.9"));
    }

    #[test]
    fn test_dependencies_of() {
        let p = sample_packument();

        let deps = p.dependencies_of("1.0.0").unwrap();
        assert_eq!(deps.get("left-pad"), Some(&"^1.0.0".to_string()));

        // Version with no dependencies field still resolves to an empty map.
        assert!(p.dependencies_of("2.0.0").unwrap().is_empty());

        // Unknown version is distinguishable from an empty map.
        assert!(p.dependencies_of("9.9.9").is_none());
    }

    #[test]
    fn test_client_creation() {
        assert!(RegistryClient::new(DEFAULT_REGISTRY).is_ok());
        assert!(RegistryClient::new("not-a-url").is_err());
    }
}
