//! On-disk cache tier

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

use crate::cache::PngCompression;
use crate::error::{CacheError, Result};

/// Distinguishes temp files of concurrent writers within one process; the
/// process id in the temp name covers writers from other processes.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Disk tier: one extensionless PNG file per storage key, flat inside the
/// cache directory. File presence is the source of truth for membership; no
/// manifest is kept.
pub(crate) struct DiskStore {
    dir: PathBuf,
    compression: PngCompression,
}

impl DiskStore {
    /// Open the store, creating the cache directory if needed.
    pub fn new(dir: &Path, compression: PngCompression) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| CacheError::DirectoryCreation {
                path: dir.to_path_buf(),
                source: e,
            })?;
            debug!("created cache directory: {}", dir.display());
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            compression,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, storage_key: &str) -> PathBuf {
        self.dir.join(storage_key)
    }

    /// Whether a regular file for this key exists.
    pub fn contains(&self, storage_key: &str) -> Result<bool> {
        match fs::metadata(self.entry_path(storage_key)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Read and decode the entry for this key, `Ok(None)` when no file
    /// exists. A file that fails to decode is an error and is left in place.
    pub fn read(&self, storage_key: &str) -> Result<Option<DynamicImage>> {
        let path = self.entry_path(storage_key);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("disk miss for key: {}", storage_key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        // Entries carry no extension, so the format hint is explicit.
        let image = image::load(BufReader::new(file), ImageFormat::Png)?;
        debug!("disk hit for key: {}", storage_key);
        Ok(Some(image))
    }

    /// Encode `image` to the entry file unless one already exists.
    ///
    /// Returns whether a file was written. The encode goes to a temporary
    /// name in the same directory and is renamed into place, so a partial
    /// write is never visible at the canonical path.
    pub fn write_if_absent(&self, storage_key: &str, image: &DynamicImage) -> Result<bool> {
        let path = self.entry_path(storage_key);
        if path.exists() {
            debug!("key already on disk: {}", storage_key);
            return Ok(false);
        }

        let tmp = self.dir.join(format!(
            ".{}.tmp.{}.{}",
            storage_key,
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = self.encode_to(&tmp, image) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!("added key to disk cache: {}", storage_key);
        Ok(true)
    }

    fn encode_to(&self, path: &Path, image: &DynamicImage) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        let encoder = PngEncoder::new_with_quality(
            &mut writer,
            self.compression.into(),
            FilterType::Adaptive,
        );
        image.write_with_encoder(encoder)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Delete the entry file for this key. Returns whether a file was
    /// actually deleted.
    pub fn remove(&self, storage_key: &str) -> Result<bool> {
        match fs::remove_file(self.entry_path(storage_key)) {
            Ok(()) => {
                debug!("deleted key from disk cache: {}", storage_key);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("key not on disk, nothing to delete: {}", storage_key);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every regular file in the cache directory.
    ///
    /// Non-recursive; subdirectories are left alone. Per-entry failures are
    /// logged and the sweep continues.
    pub fn clear(&self) -> Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable cache directory entry: {}", e);
                    continue;
                }
            };

            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Err(e) = fs::remove_file(entry.path()) {
                warn!("failed to delete {}: {}", entry.path().display(), e);
            }
        }
        Ok(())
    }
}

impl From<PngCompression> for CompressionType {
    fn from(compression: PngCompression) -> Self {
        match compression {
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Balanced => CompressionType::Default,
            PngCompression::Best => CompressionType::Best,
        }
    }
}
