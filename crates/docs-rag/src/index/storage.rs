//! Directory persistence for [`VectorIndex`]
//!
//! Layout: `manifest.json` (JSON) and `entries.bin` (bincode). A new index is
//! written to a sibling staging directory and swapped into place, so readers
//! see either the previous index or the new one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::manifest::{checksum, IndexManifest, ENTRIES_FILE, FORMAT_VERSION, MANIFEST_FILE};
use super::{IndexEntry, VectorIndex};
use crate::error::{Error, Result};

impl VectorIndex {
    /// Persist the index to `location`, replacing any index already there
    pub fn persist(&self, location: &Path) -> Result<()> {
        let payload = bincode::serde::encode_to_vec(&self.entries, bincode::config::standard())
            .map_err(|e| Error::internal(format!("Failed to encode index entries: {}", e)))?;

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            info: self.info.clone(),
            entry_count: self.entries.len(),
            checksum: checksum(&payload),
        };

        let staging = sibling(location, "staging")?;
        if let Err(e) = write_directory(&staging, &manifest, &payload) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        swap_into_place(&staging, location)?;

        tracing::info!(
            "Persisted {} entries to '{}'",
            manifest.entry_count,
            location.display()
        );
        Ok(())
    }

    /// Load an index persisted with [`VectorIndex::persist`]
    pub fn load(location: &Path) -> Result<Self> {
        let shown = location.display().to_string();
        let manifest_path = location.join(MANIFEST_FILE);

        if !manifest_path.is_file() {
            return Err(Error::IndexNotFound(shown));
        }

        let raw = fs::read(&manifest_path)?;
        let manifest: IndexManifest = serde_json::from_slice(&raw)
            .map_err(|e| Error::index_corrupt(&shown, format!("unreadable manifest: {}", e)))?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(Error::index_corrupt(
                &shown,
                format!(
                    "unsupported format version {} (expected {})",
                    manifest.format_version, FORMAT_VERSION
                ),
            ));
        }

        let payload = fs::read(location.join(ENTRIES_FILE)).map_err(|e| {
            Error::index_corrupt(&shown, format!("cannot read {}: {}", ENTRIES_FILE, e))
        })?;

        if checksum(&payload) != manifest.checksum {
            return Err(Error::index_corrupt(&shown, "checksum mismatch"));
        }

        let (entries, _): (Vec<IndexEntry>, usize) =
            bincode::serde::decode_from_slice(&payload, bincode::config::standard())
                .map_err(|e| Error::index_corrupt(&shown, format!("undecodable entries: {}", e)))?;

        if entries.len() != manifest.entry_count {
            return Err(Error::index_corrupt(
                &shown,
                format!(
                    "manifest lists {} entries, found {}",
                    manifest.entry_count,
                    entries.len()
                ),
            ));
        }

        if let Some(entry) = entries
            .iter()
            .find(|e| e.embedding.len() != manifest.info.dimensions)
        {
            return Err(Error::index_corrupt(
                &shown,
                format!(
                    "entry {} has {} dimensions, manifest says {}",
                    entry.id,
                    entry.embedding.len(),
                    manifest.info.dimensions
                ),
            ));
        }

        tracing::info!(
            "Loaded {} entries from '{}' (model {}, {} dimensions)",
            entries.len(),
            shown,
            manifest.info.embedding_model,
            manifest.info.dimensions
        );

        Ok(Self {
            entries,
            info: manifest.info,
        })
    }
}

/// Hidden sibling path `<parent>/.<name>.<tag>-<uuid>`
fn sibling(location: &Path, tag: &str) -> Result<PathBuf> {
    let name = location
        .file_name()
        .ok_or_else(|| Error::config(format!("Invalid index location '{}'", location.display())))?
        .to_string_lossy();
    let parent = match location.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok(parent.join(format!(".{}.{}-{}", name, tag, Uuid::new_v4())))
}

fn write_directory(dir: &Path, manifest: &IndexManifest, payload: &[u8]) -> Result<()> {
    fs::create_dir_all(dir)?;
    write_synced(&dir.join(ENTRIES_FILE), payload)?;
    write_synced(&dir.join(MANIFEST_FILE), &serde_json::to_vec_pretty(manifest)?)?;
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Replace `location` with `staging`; the old directory is restored if the
/// final rename fails
fn swap_into_place(staging: &Path, location: &Path) -> Result<()> {
    if let Some(parent) = location.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    if !location.exists() {
        return fs::rename(staging, location).map_err(|e| {
            let _ = fs::remove_dir_all(staging);
            Error::Io(e)
        });
    }

    let retired = sibling(location, "old")?;
    if let Err(e) = fs::rename(location, &retired) {
        let _ = fs::remove_dir_all(staging);
        return Err(Error::Io(e));
    }

    if let Err(e) = fs::rename(staging, location) {
        let _ = fs::rename(&retired, location);
        let _ = fs::remove_dir_all(staging);
        return Err(Error::Io(e));
    }

    if let Err(e) = fs::remove_dir_all(&retired) {
        tracing::warn!("Failed to remove previous index '{}': {}", retired.display(), e);
    }
    Ok(())
}
