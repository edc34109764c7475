//! Media storage manager.
//!
//! Owns the app-managed directory tree (`photos/` for primaries,
//! `photos/thumbnails/` for derived thumbnails) and the lifecycle of the
//! files inside it. Independent of the database layer; the call sites
//! that save a file here also write the matching photo row.

pub mod fs_ops;
pub mod image_ops;

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::error::StoreError;
pub use fs_ops::{FileInfo, FileOps, LocalFileOps};
pub use image_ops::{exif_taken_at, ImageCrateOps, ImageOps};

#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub generate_thumbnail: bool,
    pub thumbnail_max_size: u32,
    /// JPEG quality 0-100, thumbnails only.
    pub quality: u8,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            generate_thumbnail: true,
            thumbnail_max_size: 200,
            quality: 90,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SavedImage {
    pub id: String,
    pub file_uri: PathBuf,
    pub thumbnail_uri: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Per-file outcome of [`MediaStore::delete_image`]. Neither deletion
/// blocks the other, and failures are reported here instead of raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub photo_deleted: bool,
    /// `None` when no thumbnail was given.
    pub thumbnail_deleted: Option<bool>,
}

pub struct MediaStore<F = LocalFileOps, I = ImageCrateOps> {
    photos_dir: PathBuf,
    thumbs_dir: PathBuf,
    files: F,
    images: I,
}

impl MediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self::with_ops(config, LocalFileOps, ImageCrateOps)
    }
}

impl<F: FileOps, I: ImageOps> MediaStore<F, I> {
    pub fn with_ops(config: &MediaConfig, files: F, images: I) -> Self {
        Self {
            photos_dir: config.photos_dir.clone(),
            thumbs_dir: config.photos_dir.join("thumbnails"),
            files,
            images,
        }
    }

    /// Best-effort: a creation failure here surfaces later as a file
    /// operation failure with better context.
    fn ensure_directories(&self) {
        for dir in [&self.photos_dir, &self.thumbs_dir] {
            if !self.files.get_info(dir).exists {
                if let Err(err) = self.files.make_dir_all(dir) {
                    debug!(dir = %dir.display(), error = %err, "could not create media directory");
                }
            }
        }
    }

    /// Copy a source image into managed storage under a fresh id,
    /// deriving a thumbnail and probing dimensions. The primary file
    /// write is the only fatal step; thumbnail and dimension failures
    /// degrade to `None` fields.
    pub fn save_image(&self, source: &Path, options: &SaveOptions) -> anyhow::Result<SavedImage> {
        self.ensure_directories();

        let id = Uuid::new_v4().to_string();
        let ext = extract_extension(source);
        let dest = self.photos_dir.join(format!("{id}.{ext}"));

        // Copy first so the source stays intact; fall back to a move.
        if let Err(copy_error) = self.files.copy(source, &dest) {
            if let Err(move_error) = self.files.move_file(source, &dest) {
                return Err(StoreError::StorageWriteFailed {
                    from: source.to_path_buf(),
                    to: dest,
                    copy_error,
                    move_error,
                }
                .into());
            }
        }

        let thumbnail_uri = if options.generate_thumbnail {
            self.derive_thumbnail(&dest, &id, options)
        } else {
            None
        };

        let (width, height) = match self.images.dimensions(&dest) {
            Ok((w, h)) => (Some(w), Some(h)),
            Err(err) => {
                debug!(file = %dest.display(), error = %err, "dimension probe failed");
                (None, None)
            }
        };

        Ok(SavedImage {
            id,
            file_uri: dest,
            thumbnail_uri,
            width,
            height,
        })
    }

    /// Render a thumbnail to a temp location and bring it into the
    /// managed tree: move, else copy plus best-effort temp cleanup,
    /// else leave the temp path as the result. Never fatal.
    fn derive_thumbnail(&self, source: &Path, id: &str, options: &SaveOptions) -> Option<PathBuf> {
        let dest = self.thumbs_dir.join(format!("{id}_thumb.jpg"));

        let rendered = match self.images.thumbnail_to_temp(
            source,
            options.thumbnail_max_size,
            options.quality,
        ) {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(file = %source.display(), error = %err, "thumbnail generation failed");
                return None;
            }
        };

        match self.files.move_file(&rendered.path, &dest) {
            Ok(()) => Some(dest),
            Err(_) => match self.files.copy(&rendered.path, &dest) {
                Ok(()) => {
                    let _ = self.files.delete(&rendered.path, true);
                    Some(dest)
                }
                Err(err) => {
                    warn!(
                        file = %rendered.path.display(),
                        error = %err,
                        "thumbnail stuck in temp location"
                    );
                    Some(rendered.path)
                }
            },
        }
    }

    /// Generate a thumbnail for an existing file independent of a save.
    /// Unlike the thumbnail step inside `save_image`, a render failure
    /// here is the whole point of the call and is returned as an error.
    pub fn generate_thumbnail(
        &self,
        source: &Path,
        options: &SaveOptions,
    ) -> anyhow::Result<PathBuf> {
        self.ensure_directories();

        let id = Uuid::new_v4().to_string();
        let dest = self.thumbs_dir.join(format!("{id}_thumb.jpg"));
        let rendered =
            self.images
                .thumbnail_to_temp(source, options.thumbnail_max_size, options.quality)?;

        match self.files.move_file(&rendered.path, &dest) {
            Ok(()) => Ok(dest),
            Err(_) => match self.files.copy(&rendered.path, &dest) {
                Ok(()) => {
                    let _ = self.files.delete(&rendered.path, true);
                    Ok(dest)
                }
                Err(_) => Ok(rendered.path),
            },
        }
    }

    /// Copy a file into the managed tree without thumbnailing.
    pub fn import_file(&self, source: &Path) -> anyhow::Result<PathBuf> {
        self.ensure_directories();

        let id = Uuid::new_v4().to_string();
        let ext = extract_extension(source);
        let dest = self.photos_dir.join(format!("{id}.{ext}"));

        if let Err(copy_error) = self.files.copy(source, &dest) {
            if let Err(move_error) = self.files.move_file(source, &dest) {
                return Err(StoreError::StorageWriteFailed {
                    from: source.to_path_buf(),
                    to: dest,
                    copy_error,
                    move_error,
                }
                .into());
            }
        }
        Ok(dest)
    }

    /// Delete the primary file and, independently, the thumbnail.
    /// Failures are reported per file and never raised.
    pub fn delete_image(&self, photo_uri: &Path, thumbnail_uri: Option<&Path>) -> DeleteOutcome {
        let photo_deleted = match self.files.delete(photo_uri, true) {
            Ok(()) => true,
            Err(err) => {
                warn!(file = %photo_uri.display(), error = %err, "failed to delete photo file");
                false
            }
        };

        let thumbnail_deleted = thumbnail_uri.map(|thumb| match self.files.delete(thumb, true) {
            Ok(()) => true,
            Err(err) => {
                warn!(file = %thumb.display(), error = %err, "failed to delete thumbnail file");
                false
            }
        });

        DeleteOutcome {
            photo_deleted,
            thumbnail_deleted,
        }
    }

    pub fn photos_dir(&self) -> &Path {
        &self.photos_dir
    }
}

/// Normalized extension of a source path: lowercase, 1-5 alphanumeric
/// characters, with any query or fragment suffix stripped; `jpg` when
/// absent or invalid.
fn extract_extension(source: &Path) -> String {
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .and_then(|e| e.split(['?', '#']).next())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        ext
    } else {
        "jpg".to_string()
    }
}
