//! Tarball download and extraction.

use super::error::PkgError;
use bytes::Bytes;
use flate2::read::GzDecoder;
use reqwest::Client;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tar::Archive;

/// Maximum tarball size (200 MB).
pub const MAX_TARBALL_SIZE: u64 = 200 * 1024 * 1024;

/// Download a tarball into memory.
///
/// # Errors
/// Returns `PKG_DOWNLOAD_FAILED` if the request fails, the server
/// answers with a non-success status, or the body exceeds `max_bytes`.
pub async fn fetch_bytes(client: &Client, url: &str, max_bytes: u64) -> Result<Bytes, PkgError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PkgError::download_failed(format!("Failed to download '{url}': {e}")))?;

    if !response.status().is_success() {
        return Err(PkgError::download_failed(format!(
            "Download failed with status {} for '{url}'",
            response.status()
        )));
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(PkgError::download_failed(format!(
                "Tarball too large: {len} bytes (max: {max_bytes})"
            )));
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PkgError::download_failed(format!("Failed to read response body: {e}")))?;

    if bytes.len() as u64 > max_bytes {
        return Err(PkgError::download_failed(format!(
            "Tarball too large: {} bytes (max: {max_bytes})",
            bytes.len()
        )));
    }

    Ok(bytes)
}

/// Extract a gzipped package tarball into `dest`.
///
/// Registry tarballs wrap their contents in a single top-level directory
/// (usually `package/`). Extraction goes to a temp directory next to
/// `dest` first, then that inner directory is renamed into place, so a
/// half-written package never appears under the install root.
///
/// # Errors
/// Returns `PKG_EXTRACT_FAILED` if the archive is malformed or contains
/// unsafe paths.
pub fn extract_tarball(bytes: &[u8], dest: &Path) -> Result<(), PkgError> {
    let parent = dest
        .parent()
        .ok_or_else(|| PkgError::extract_failed("Destination has no parent directory"))?;
    fs::create_dir_all(parent)?;

    if dest.exists() {
        return Ok(());
    }

    let temp_dir = parent.join(format!(".quay-tmp-{}-{}", std::process::id(), temp_nonce()));
    if temp_dir.exists() {
        let _ = fs::remove_dir_all(&temp_dir);
    }
    fs::create_dir_all(&temp_dir)?;

    if let Err(e) = unpack_into(bytes, &temp_dir) {
        let _ = fs::remove_dir_all(&temp_dir);
        return Err(e);
    }

    let inner = match find_package_root(&temp_dir) {
        Ok(p) => p,
        Err(e) => {
            let _ = fs::remove_dir_all(&temp_dir);
            return Err(e);
        }
    };

    match fs::rename(&inner, dest) {
        Ok(()) => {
            let _ = fs::remove_dir_all(&temp_dir);
            Ok(())
        }
        Err(rename_err) => {
            // Lost a race with another writer, or crossed a filesystem
            // boundary; fall back to a copy.
            if dest.exists() {
                let _ = fs::remove_dir_all(&temp_dir);
                return Ok(());
            }
            let copied = copy_dir_all(&inner, dest);
            let _ = fs::remove_dir_all(&temp_dir);
            copied.map_err(|copy_err| {
                PkgError::extract_failed(format!(
                    "Failed to move or copy extracted package: rename={rename_err}, copy={copy_err}"
                ))
            })
        }
    }
}

/// Locate the single wrapping directory of an extracted tarball.
///
/// `package/` is the common case; some publishers use the bare package
/// name instead, so any lone top-level directory is accepted.
fn find_package_root(temp_dir: &Path) -> Result<PathBuf, PkgError> {
    let conventional = temp_dir.join("package");
    if conventional.is_dir() {
        return Ok(conventional);
    }

    let dirs: Vec<PathBuf> = fs::read_dir(temp_dir)
        .map_err(|e| PkgError::extract_failed(format!("Failed to read extracted dir: {e}")))?
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_type().map(|ft| ft.is_dir()).unwrap_or(false)
                && !e.file_name().to_string_lossy().starts_with('.')
        })
        .map(|e| e.path())
        .collect();

    match dirs.as_slice() {
        [only] => Ok(only.clone()),
        [] => Err(PkgError::extract_failed(
            "Tarball does not contain a top-level directory",
        )),
        many => Err(PkgError::extract_failed(format!(
            "Tarball contains {} top-level directories, expected 1",
            many.len()
        ))),
    }
}

fn unpack_into(bytes: &[u8], dest: &Path) -> Result<(), PkgError> {
    let gz = GzDecoder::new(bytes);
    let mut archive = Archive::new(gz);

    for entry in archive
        .entries()
        .map_err(|e| PkgError::extract_failed(format!("Failed to read tarball entries: {e}")))?
    {
        let mut entry = entry
            .map_err(|e| PkgError::extract_failed(format!("Failed to read tarball entry: {e}")))?;

        let path = entry
            .path()
            .map_err(|e| PkgError::extract_failed(format!("Failed to read entry path: {e}")))?
            .into_owned();

        if path.is_absolute() {
            return Err(PkgError::extract_failed(format!(
                "Tarball contains absolute path: {}",
                path.display()
            )));
        }
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(PkgError::extract_failed(format!(
                "Tarball contains path traversal: {}",
                path.display()
            )));
        }

        let entry_dest = dest.join(&path);
        if !entry_dest.starts_with(dest) {
            return Err(PkgError::extract_failed(format!(
                "Tarball entry escapes destination: {}",
                path.display()
            )));
        }

        if let Some(parent) = entry_dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let kind = entry.header().entry_type();
        if kind.is_dir() {
            fs::create_dir_all(&entry_dest)?;
        } else if kind.is_file() {
            let mut file = File::create(&entry_dest)?;
            io::copy(&mut entry, &mut file)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(mode) = entry.header().mode() {
                    let _ = fs::set_permissions(&entry_dest, fs::Permissions::from_mode(mode));
                }
            }
        }
        // Symlinks and special entries are skipped.
    }

    Ok(())
}

fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let from = entry.path();
        let to = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&from, &to)?;
        } else if ty.is_file() {
            fs::copy(&from, &to)?;
        }
    }

    Ok(())
}

/// Cheap uniqueness for temp directory names.
#[allow(clippy::cast_possible_truncation)]
fn temp_nonce() -> u32 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0),
    );
    hasher.finish() as u32
}
