//! File-level entry points: the surface a viewer or editor embeds.
//!
//! ```no_run
//! use drcblob::session::{open_blob, replace_bitmap, save_blob, ReplaceOptions};
//!
//! let mut blob = open_blob("drc_fw.bin", 0x1000)?;
//! let image = image::open("logo.png")?;
//! replace_bitmap(&mut blob, 0, &image, &ReplaceOptions::default())?;
//! save_blob(&mut blob, "resources.bin")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The caller owns the [`ResourceBlob`] and passes it by reference; there is
//! no module-level resource list.

use image::imageops::FilterType;
use image::DynamicImage;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::blob::{Resource, ResourceBlob};
use crate::descriptor::{ResourceType, TypeInfo};
use crate::error::BlobError;
use crate::sound::AudioBuffer;

// ── ReplaceOptions ────────────────────────────────────────────────────────────

/// Configuration for [`replace_bitmap`].
#[derive(Debug, Clone)]
pub struct ReplaceOptions {
    /// Resampling filter used to fit the new image to the bitmap's size.
    pub filter: FilterType,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self { filter: FilterType::Triangle }
    }
}

/// Parse a filter name as accepted on the command line.
pub fn filter_from_name(s: &str) -> Option<FilterType> {
    match s.to_lowercase().as_str() {
        "nearest"    => Some(FilterType::Nearest),
        "triangle"   => Some(FilterType::Triangle),
        "catmullrom" => Some(FilterType::CatmullRom),
        "gaussian"   => Some(FilterType::Gaussian),
        "lanczos3"   => Some(FilterType::Lanczos3),
        _            => None,
    }
}

/// Parse a byte offset written in decimal or with a `0x` prefix.
pub fn parse_offset(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None      => s.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid offset '{s}': {e}"))
}

// ── ResourceInfo ──────────────────────────────────────────────────────────────

/// Lightweight summary returned by [`list`].
#[derive(Debug, Clone, Serialize)]
pub struct ResourceInfo {
    pub index:         usize,
    pub resource_type: ResourceType,
    pub id:            u16,
    pub offset:        u32,
    pub size:          u32,
    pub type_info:     TypeInfo,
}

impl ResourceInfo {
    pub fn new(index: usize, resource: &Resource) -> Self {
        let d = resource.descriptor();
        Self {
            index,
            resource_type: d.resource_type(),
            id:            d.id,
            offset:        d.offset,
            size:          d.size,
            type_info:     d.info,
        }
    }
}

pub fn list(blob: &ResourceBlob) -> Vec<ResourceInfo> {
    blob.iter()
        .enumerate()
        .map(|(i, r)| ResourceInfo::new(i, r))
        .collect()
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Decode the blob found `offset` bytes into the file at `path`.
pub fn open_blob<P: AsRef<Path>>(path: P, offset: u64) -> Result<ResourceBlob, BlobError> {
    let path = path.as_ref();
    let blob = ResourceBlob::read(BufReader::new(File::open(path)?), offset)?;
    tracing::info!(
        path = %path.display(),
        offset,
        resources = blob.len(),
        payload_bytes = blob.payload_bytes(),
        "opened resource blob"
    );
    Ok(blob)
}

/// Re-encode `blob` and write it as a standalone file.  Descriptor offsets
/// and sizes in `blob` are updated to match what was written.
pub fn save_blob<P: AsRef<Path>>(blob: &mut ResourceBlob, path: P) -> Result<(), BlobError> {
    let path = path.as_ref();
    let bytes = blob.encode()?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    tracing::info!(
        path = %path.display(),
        resources = blob.len(),
        bytes = bytes.len(),
        "saved resource blob"
    );
    Ok(())
}

pub fn replace_bitmap(
    blob:  &mut ResourceBlob,
    index: usize,
    image: &DynamicImage,
    opts:  &ReplaceOptions,
) -> Result<(), BlobError> {
    blob.replace_bitmap(index, image, opts.filter)
}

pub fn replace_sound(blob: &mut ResourceBlob, index: usize, audio: &AudioBuffer) -> Result<(), BlobError> {
    blob.replace_sound(index, audio)
}

/// File name used by [`extract_all`] for resource `index`.
pub fn export_name(index: usize, resource: &Resource) -> String {
    let ext = match resource {
        Resource::Bitmap(_) => "png",
        Resource::Sound(_)  => "wav",
    };
    format!("{:03}_0x{:04x}.{}", index, resource.id(), ext)
}

/// Write every bitmap as PNG and every sound as WAV into `dest`, creating it
/// if necessary.  Returns the written paths in table order.
pub fn extract_all<P: AsRef<Path>>(blob: &ResourceBlob, dest: P) -> Result<Vec<PathBuf>, BlobError> {
    let dest = dest.as_ref();
    std::fs::create_dir_all(dest)?;

    let mut written = Vec::with_capacity(blob.len());
    for (i, resource) in blob.iter().enumerate() {
        let path = dest.join(export_name(i, resource));
        match resource {
            Resource::Bitmap(b) => b.image().to_rgba_image().save(&path)?,
            Resource::Sound(s)  => s.write_wav(BufWriter::new(File::create(&path)?))?,
        }
        tracing::debug!(path = %path.display(), "extracted resource");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_in_both_bases() {
        assert_eq!(parse_offset("0"), Ok(0));
        assert_eq!(parse_offset("4096"), Ok(4096));
        assert_eq!(parse_offset("0x1000"), Ok(4096));
        assert_eq!(parse_offset("0XfF"), Ok(255));
        assert!(parse_offset("0xZZ").is_err());
        assert!(parse_offset("-1").is_err());
    }

    #[test]
    fn filter_names() {
        assert!(matches!(filter_from_name("Lanczos3"), Some(FilterType::Lanczos3)));
        assert!(matches!(filter_from_name("nearest"), Some(FilterType::Nearest)));
        assert!(filter_from_name("bicubic").is_none());
    }

    #[test]
    fn default_filter_is_triangle() {
        assert!(matches!(ReplaceOptions::default().filter, FilterType::Triangle));
    }
}
