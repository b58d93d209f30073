//! Palette-indexed bitmap resources.
//!
//! # Payload layout
//!
//! ```text
//! [ palette: 256 × (blue, green, red, alpha) ][ indices: width × height u8 ]
//! ```
//!
//! Indices are row-major, top row first.  Decoding tolerates trailing bytes
//! after the index block (they are dropped); encoding always emits exactly
//! `1024 + width * height` bytes.

pub mod quantize;

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use std::fmt;

use crate::descriptor::{BitmapInfo, ResourceDescriptor, ResourceType, TypeInfo};
use crate::error::BlobError;

/// Number of palette entries in every bitmap payload.
pub const PALETTE_ENTRIES: usize = 256;
/// Byte length of the palette block.
pub const PALETTE_SIZE:    usize = PALETTE_ENTRIES * 4;

// ── Palette ──────────────────────────────────────────────────────────────────

/// One palette slot, stored on disk as blue, green, red, alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PaletteEntry {
    pub blue:  u8,
    pub green: u8,
    pub red:   u8,
    pub alpha: u8,
}

impl PaletteEntry {
    pub fn from_bgra(b: [u8; 4]) -> Self {
        Self { blue: b[0], green: b[1], red: b[2], alpha: b[3] }
    }

    pub fn from_rgba(c: [u8; 4]) -> Self {
        Self { red: c[0], green: c[1], blue: c[2], alpha: c[3] }
    }

    pub fn to_bgra(self) -> [u8; 4] {
        [self.blue, self.green, self.red, self.alpha]
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    /// `#rrggbbaa`
    pub fn hex_rgba(self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.red, self.green, self.blue, self.alpha)
    }
}

// ── IndexedImage ─────────────────────────────────────────────────────────────

/// A 256-colour palette plus one index per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    width:   u32,
    height:  u32,
    palette: [PaletteEntry; PALETTE_ENTRIES],
    indices: Vec<u8>,
}

impl IndexedImage {
    /// Build an image from parts.  `indices` must hold exactly
    /// `width * height` entries.
    pub fn new(
        width:   u32,
        height:  u32,
        palette: [PaletteEntry; PALETTE_ENTRIES],
        indices: Vec<u8>,
    ) -> Result<Self, BlobError> {
        if indices.len() as u64 != width as u64 * height as u64 {
            return Err(BlobError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height, palette, indices })
    }

    pub fn width(&self)  -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn palette(&self) -> &[PaletteEntry; PALETTE_ENTRIES] { &self.palette }
    pub fn indices(&self) -> &[u8] { &self.indices }

    /// Palette entry at pixel (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> Option<PaletteEntry> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.width as usize + x as usize;
        Some(self.palette[self.indices[i] as usize])
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let i = y as usize * self.width as usize + x as usize;
            Rgba(self.palette[self.indices[i] as usize].to_rgba())
        })
    }
}

// ── BitmapResource ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BitmapResource {
    id:     u16,
    offset: u32,
    size:   u32,
    info:   BitmapInfo,
    image:  IndexedImage,
}

impl BitmapResource {
    /// Decode a bitmap payload described by `descriptor`.
    pub fn decode(descriptor: &ResourceDescriptor, payload: &[u8]) -> Result<Self, BlobError> {
        let info = match descriptor.info {
            TypeInfo::Bitmap(b) => b,
            other => return Err(BlobError::WrongResourceKind {
                expected: ResourceType::Bitmap,
                found:    other.resource_type(),
            }),
        };

        let pixel_count = info.width as usize * info.height as usize;
        let needed = PALETTE_SIZE + pixel_count;
        if payload.len() < needed {
            return Err(BlobError::PayloadTooShort { needed, actual: payload.len() });
        }
        if payload.len() > needed {
            tracing::warn!(
                id = descriptor.id,
                slack = payload.len() - needed,
                "bitmap payload has trailing bytes; they will not be re-encoded"
            );
        }

        let mut palette = [PaletteEntry::default(); PALETTE_ENTRIES];
        for (entry, bgra) in palette.iter_mut().zip(payload[..PALETTE_SIZE].chunks_exact(4)) {
            *entry = PaletteEntry::from_bgra([bgra[0], bgra[1], bgra[2], bgra[3]]);
        }
        let indices = payload[PALETTE_SIZE..needed].to_vec();

        Ok(Self {
            id:     descriptor.id,
            offset: descriptor.offset,
            size:   descriptor.size,
            info,
            image:  IndexedImage { width: info.width, height: info.height, palette, indices },
        })
    }

    /// Palette block followed by the index block; always `1024 + w*h` bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PALETTE_SIZE + self.image.indices.len());
        for entry in &self.image.palette {
            out.extend_from_slice(&entry.to_bgra());
        }
        out.extend_from_slice(&self.image.indices);
        out
    }

    /// Replace the pixels with `source`, resized to this bitmap's fixed
    /// dimensions and quantized to at most 256 colours.  The descriptor's
    /// `unknown`, `width` and `height` are left as they were.  Nothing is
    /// modified if validation fails.
    pub fn replace(&mut self, source: &DynamicImage, filter: FilterType) -> Result<(), BlobError> {
        let (width, height) = (self.info.width, self.info.height);
        if width == 0 || height == 0 {
            return Err(BlobError::InvalidDimensions { width, height });
        }
        if source.width() == 0 || source.height() == 0 {
            return Err(BlobError::InvalidDimensions {
                width:  source.width(),
                height: source.height(),
            });
        }

        let rgba = source.to_rgba8();
        let resized = if rgba.dimensions() == (width, height) {
            rgba
        } else {
            imageops::resize(&rgba, width, height, filter)
        };

        let pixels: Vec<[u8; 4]> = resized.pixels().map(|p| p.0).collect();
        let q = quantize::median_cut(&pixels, quantize::MAX_COLORS);

        let mut palette = [PaletteEntry::default(); PALETTE_ENTRIES];
        for (entry, rgba) in palette.iter_mut().zip(&q.palette) {
            *entry = PaletteEntry::from_rgba(*rgba);
        }

        self.image = IndexedImage::new(width, height, palette, q.indices)?;
        tracing::debug!(id = self.id, width, height, colors = q.palette.len(), "bitmap replaced");
        Ok(())
    }

    pub fn id(&self) -> u16 { self.id }
    pub fn info(&self) -> &BitmapInfo { &self.info }
    pub fn image(&self) -> &IndexedImage { &self.image }

    pub fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            id:     self.id,
            offset: self.offset,
            size:   self.size,
            info:   TypeInfo::Bitmap(self.info),
        }
    }

    pub(crate) fn set_location(&mut self, offset: u32, size: u32) {
        self.offset = offset;
        self.size = size;
    }

    /// Fit the bitmap inside `width`×`height` (shrinking only, aspect kept)
    /// and centre it on a white background.
    pub fn preview(&self, width: u32, height: u32) -> RgbImage {
        let rgba = self.image.to_rgba_image();
        let (tw, th) = fit_within(rgba.dimensions(), (width, height));
        let thumb = if (tw, th) == rgba.dimensions() {
            rgba
        } else {
            imageops::resize(&rgba, tw, th, FilterType::Triangle)
        };
        let thumb = DynamicImage::ImageRgba8(thumb).to_rgb8();

        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        let x = (width.saturating_sub(tw) / 2) as i64;
        let y = (height.saturating_sub(th) / 2) as i64;
        imageops::overlay(&mut canvas, &thumb, x, y);
        canvas
    }

    /// One `0xNN: #rrggbbaa` line per palette entry.
    pub fn palette_listing(&self) -> String {
        self.image
            .palette
            .iter()
            .enumerate()
            .map(|(i, e)| format!("0x{:02x}: {}\n", i, e.hex_rgba()))
            .collect()
    }
}

impl fmt::Display for BitmapResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BitmapResource:")?;
        writeln!(f, "    ID: 0x{:04x}", self.id)?;
        writeln!(f, "    Unknown: {}", self.info.unknown)?;
        write!(f, "    Resolution: {}x{}", self.info.width, self.info.height)
    }
}

/// Largest size no bigger than `bounds` that keeps the aspect ratio of
/// `size`.  Sizes already inside the bounds are returned unchanged.
pub(crate) fn fit_within(size: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (w, h) = size;
    let (bw, bh) = bounds;
    if w <= bw && h <= bh {
        return (w, h);
    }
    let scale = (bw as f64 / w as f64).min(bh as f64 / h as f64);
    (
        ((w as f64 * scale).round() as u32).max(1),
        ((h as f64 * scale).round() as u32).max(1),
    )
}
