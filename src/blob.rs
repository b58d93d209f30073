//! Whole-blob container: descriptor table plus payload region.
//!
//! # Layout (little-endian)
//!
//! ```text
//! base + 0            u32 descriptor_count
//! base + 4            descriptor_count × 24-byte descriptors
//! base + 4 + 24*n     payload region
//! ```
//!
//! Every descriptor's `offset` is relative to the start of the payload
//! region, so decoding tracks `payload_base` separately and encoding
//! recomputes every offset from the re-encoded payload lengths.  Payloads
//! are packed back to back with no padding.
//!
//! An unknown resource type anywhere in the table aborts the whole decode:
//! the format offers no way to skip a record it cannot interpret.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use crate::bitmap::BitmapResource;
use crate::descriptor::{RawDescriptor, ResourceDescriptor, ResourceType, TypeInfo, DESCRIPTOR_SIZE};
use crate::error::BlobError;
use crate::sound::{AudioBuffer, SoundResource};

/// Byte length of the leading descriptor count.
pub const COUNT_SIZE: usize = 4;

// ── Resource ─────────────────────────────────────────────────────────────────

/// One decoded entry of the blob, in table order.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Bitmap(BitmapResource),
    Sound(SoundResource),
}

impl Resource {
    /// Dispatch `payload` to the codec named by the descriptor's type.
    pub fn decode(descriptor: &ResourceDescriptor, payload: &[u8]) -> Result<Self, BlobError> {
        Ok(match descriptor.info {
            TypeInfo::Bitmap(_) => Resource::Bitmap(BitmapResource::decode(descriptor, payload)?),
            TypeInfo::Sound(_)  => Resource::Sound(SoundResource::decode(descriptor, payload)?),
        })
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            Resource::Bitmap(_) => ResourceType::Bitmap,
            Resource::Sound(_)  => ResourceType::Sound,
        }
    }

    pub fn descriptor(&self) -> ResourceDescriptor {
        match self {
            Resource::Bitmap(b) => b.descriptor(),
            Resource::Sound(s)  => s.descriptor(),
        }
    }

    pub fn id(&self) -> u16 {
        match self {
            Resource::Bitmap(b) => b.id(),
            Resource::Sound(s)  => s.id(),
        }
    }

    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            Resource::Bitmap(b) => b.encode(),
            Resource::Sound(s)  => s.encode(),
        }
    }

    pub fn preview(&self, width: u32, height: u32) -> RgbImage {
        match self {
            Resource::Bitmap(b) => b.preview(width, height),
            Resource::Sound(s)  => s.preview(width, height),
        }
    }

    /// Human-readable property block.
    pub fn properties(&self) -> String {
        match self {
            Resource::Bitmap(b) => b.to_string(),
            Resource::Sound(s)  => s.to_string(),
        }
    }

    pub fn as_bitmap(&self) -> Option<&BitmapResource> {
        match self {
            Resource::Bitmap(b) => Some(b),
            Resource::Sound(_)  => None,
        }
    }

    pub fn as_sound(&self) -> Option<&SoundResource> {
        match self {
            Resource::Sound(s)  => Some(s),
            Resource::Bitmap(_) => None,
        }
    }

    fn set_location(&mut self, offset: u32, size: u32) {
        match self {
            Resource::Bitmap(b) => b.set_location(offset, size),
            Resource::Sound(s)  => s.set_location(offset, size),
        }
    }
}

// ── ResourceBlob ─────────────────────────────────────────────────────────────

/// An ordered, exclusively owned list of resources.
///
/// Resources can be replaced in place but never added or removed; table
/// order is preserved through encode.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceBlob {
    resources: Vec<Resource>,
}

/// Read exactly `len` bytes, reporting a short read as `TruncatedInput`.
/// Reads through `take` so a bogus length cannot force a huge allocation
/// up front.
fn read_block<R: Read>(reader: &mut R, len: u64, what: &'static str) -> Result<Vec<u8>, BlobError> {
    let mut buf = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Err(BlobError::TruncatedInput {
            what,
            needed:    usize::try_from(len).unwrap_or(usize::MAX),
            available: buf.len(),
        });
    }
    Ok(buf)
}

impl ResourceBlob {
    /// Byte position of the payload region for a table of `count` entries,
    /// relative to the start of the blob.
    pub fn payload_base(count: usize) -> u64 {
        (COUNT_SIZE + count * DESCRIPTOR_SIZE) as u64
    }

    /// Read the descriptor table at `base_offset` without interpreting the
    /// type-info unions.  Works on blobs whose full decode would fail.
    pub fn read_descriptor_table<R: Read + Seek>(
        reader:      &mut R,
        base_offset: u64,
    ) -> Result<Vec<RawDescriptor>, BlobError> {
        reader.seek(SeekFrom::Start(base_offset))?;
        let count_bytes = read_block(reader, COUNT_SIZE as u64, "descriptor count")?;
        let count = (&count_bytes[..]).read_u32::<LittleEndian>()? as u64;

        let table = read_block(reader, count * DESCRIPTOR_SIZE as u64, "descriptor table")?;
        table
            .chunks_exact(DESCRIPTOR_SIZE)
            .map(RawDescriptor::decode)
            .collect()
    }

    /// Decode a blob that starts `base_offset` bytes into `reader`.
    pub fn read<R: Read + Seek>(mut reader: R, base_offset: u64) -> Result<Self, BlobError> {
        let raws = Self::read_descriptor_table(&mut reader, base_offset)?;

        // Resolve every type before touching payloads; one unknown type fails the lot.
        let descriptors = raws
            .iter()
            .enumerate()
            .map(|(i, raw)| raw.interpret(i))
            .collect::<Result<Vec<_>, _>>()?;

        let payload_base = base_offset + Self::payload_base(raws.len());
        let mut resources = Vec::with_capacity(descriptors.len());
        for (i, desc) in descriptors.iter().enumerate() {
            tracing::debug!(
                index = i,
                kind = %desc.resource_type(),
                id = desc.id,
                offset = desc.offset,
                size = desc.size,
                "decoding resource"
            );
            reader.seek(SeekFrom::Start(payload_base + desc.offset as u64))?;
            let payload = read_block(&mut reader, desc.size as u64, "resource payload")?;
            resources.push(Resource::decode(desc, &payload)?);
        }

        Ok(Self { resources })
    }

    /// Decode a blob held in memory.
    pub fn from_bytes(bytes: &[u8], base_offset: u64) -> Result<Self, BlobError> {
        Self::read(Cursor::new(bytes), base_offset)
    }

    /// Re-encode every payload, rewrite each descriptor's `offset` and
    /// `size`, and return the complete blob.  Descriptors are only updated
    /// once the whole layout is known to fit the 32-bit fields.
    pub fn encode(&mut self) -> Result<Vec<u8>, BlobError> {
        let count = u32::try_from(self.resources.len()).map_err(|_| BlobError::PayloadRegionOverflow)?;
        let payloads: Vec<Vec<u8>> = self.resources.iter().map(Resource::encode_payload).collect();

        let mut locations = Vec::with_capacity(payloads.len());
        let mut offset: u64 = 0;
        for p in &payloads {
            let size = u32::try_from(p.len()).map_err(|_| BlobError::PayloadRegionOverflow)?;
            let start = u32::try_from(offset).map_err(|_| BlobError::PayloadRegionOverflow)?;
            locations.push((start, size));
            offset += p.len() as u64;
        }

        for (resource, (start, size)) in self.resources.iter_mut().zip(&locations) {
            resource.set_location(*start, *size);
        }

        let total = Self::payload_base(self.resources.len()) as usize + offset as usize;
        let mut out = Vec::with_capacity(total);
        out.write_u32::<LittleEndian>(count)?;
        for resource in &self.resources {
            resource.descriptor().to_raw().write(&mut out)?;
        }
        for p in &payloads {
            out.extend_from_slice(p);
        }
        Ok(out)
    }

    /// Encode and write the blob to `writer`.
    pub fn write<W: Write>(&mut self, mut writer: W) -> Result<(), BlobError> {
        let bytes = self.encode()?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Sum of the payload sizes recorded in the descriptors.
    pub fn payload_bytes(&self) -> u64 {
        self.resources.iter().map(|r| r.descriptor().size as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.resources.iter()
    }

    pub fn get(&self, index: usize) -> Result<&Resource, BlobError> {
        self.resources
            .get(index)
            .ok_or(BlobError::IndexOutOfRange { index, count: self.resources.len() })
    }

    /// Replace the image of bitmap `index`.
    pub fn replace_bitmap(
        &mut self,
        index:  usize,
        image:  &DynamicImage,
        filter: FilterType,
    ) -> Result<(), BlobError> {
        let count = self.resources.len();
        match self.resources.get_mut(index) {
            Some(Resource::Bitmap(b)) => b.replace(image, filter),
            Some(other) => Err(BlobError::WrongResourceKind {
                expected: ResourceType::Bitmap,
                found:    other.resource_type(),
            }),
            None => Err(BlobError::IndexOutOfRange { index, count }),
        }
    }

    /// Replace the clip of sound `index`.
    pub fn replace_sound(&mut self, index: usize, audio: &AudioBuffer) -> Result<(), BlobError> {
        let count = self.resources.len();
        match self.resources.get_mut(index) {
            Some(Resource::Sound(s)) => s.replace(audio),
            Some(other) => Err(BlobError::WrongResourceKind {
                expected: ResourceType::Sound,
                found:    other.resource_type(),
            }),
            None => Err(BlobError::IndexOutOfRange { index, count }),
        }
    }
}

impl<'a> IntoIterator for &'a ResourceBlob {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}
