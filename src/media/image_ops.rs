//! Image-manipulation capability consumed by the media storage manager.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Result of a thumbnail render: where the temporary file landed and the
/// dimensions it came out at.
#[derive(Debug, Clone)]
pub struct RenderedThumbnail {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

pub trait ImageOps {
    /// Resize `source` to fit within `max_dim` and write it as JPEG at
    /// the given quality (0-100) to a temporary location. The caller
    /// moves the file into managed storage.
    fn thumbnail_to_temp(&self, source: &Path, max_dim: u32, quality: u8)
        -> Result<RenderedThumbnail>;

    /// Image dimensions without a full decode where possible.
    fn dimensions(&self, source: &Path) -> Result<(u32, u32)>;
}

/// Implementation backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateOps;

impl ImageOps for ImageCrateOps {
    fn thumbnail_to_temp(
        &self,
        source: &Path,
        max_dim: u32,
        quality: u8,
    ) -> Result<RenderedThumbnail> {
        let img = image::open(source)
            .with_context(|| format!("failed to open image {}", source.display()))?;
        let thumb = img.thumbnail(max_dim, max_dim);

        let path = std::env::temp_dir().join(format!("photolog-{}.jpg", Uuid::new_v4()));
        let mut out = File::create(&path)
            .with_context(|| format!("failed to create temp thumbnail {}", path.display()))?;
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
        thumb
            .to_rgb8()
            .write_with_encoder(encoder)
            .with_context(|| format!("failed to encode thumbnail for {}", source.display()))?;

        Ok(RenderedThumbnail {
            path,
            width: thumb.width(),
            height: thumb.height(),
        })
    }

    fn dimensions(&self, source: &Path) -> Result<(u32, u32)> {
        image::image_dimensions(source)
            .with_context(|| format!("failed to read dimensions of {}", source.display()))
    }
}

/// Best-effort EXIF capture timestamp (DateTimeOriginal). Used to fill
/// `taken_at` on import; any read problem simply yields `None`.
pub fn exif_taken_at(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;
    let field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    Some(field.display_value().to_string())
}
