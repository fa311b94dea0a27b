//! Package manager functionality.
//!
//! Provides:
//! - Parsing package specifications (`name@specifier`)
//! - Fetching package metadata from an npm-compatible registry
//! - Resolving version specifiers to the minimum satisfying version
//! - Downloading and extracting tarballs into a flat install tree
//! - Walking the dependency graph with cycle and conflict detection
//! - Validating the on-disk layout of installed packages

pub mod error;
pub mod install;
pub mod manifest;
pub mod registry;
pub mod spec;
pub mod tarball;
pub mod validate;
pub mod version;
pub mod walk;

pub use error::{codes as pkg_codes, PkgError};
pub use install::install_package;
pub use manifest::{
    installed_version, read_dependencies, record_dependency, MANIFEST_NAME,
};
pub use registry::{Packument, RegistryClient, DEFAULT_REGISTRY, REGISTRY_ENV};
pub use spec::PackageSpec;
pub use tarball::{extract_tarball, fetch_bytes, MAX_TARBALL_SIZE};
pub use validate::{validate_installation, ValidationResult};
pub use version::{normalize_partial_version, resolve_version, version_satisfies};
pub use walk::{GraphState, WalkReport, Walker};
