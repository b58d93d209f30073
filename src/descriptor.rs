//! Fixed 24-byte resource descriptor records.
//!
//! # On-disk layout (little-endian)
//!
//! | Offset | Size | Field       |
//! |--------|------|-------------|
//! | 0      | 2    | `type`      |
//! | 2      | 2    | `id`        |
//! | 4      | 4    | `offset`    |
//! | 8      | 4    | `size`      |
//! | 12     | 12   | `type_info` |
//!
//! `offset` is relative to the end of the descriptor table, not to the start
//! of the file.  The 12 type-info bytes are kept raw in [`RawDescriptor`]
//! and only interpreted once the caller turns the record into a
//! [`ResourceDescriptor`], at which point the `type` field selects the
//! [`TypeInfo`] variant.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::fmt;
use std::io::{self, Read, Write};

use crate::error::BlobError;

/// Size of one descriptor record on disk.
pub const DESCRIPTOR_SIZE: usize = 24;
/// Size of the type-specific union at the end of every descriptor.
pub const TYPE_INFO_SIZE:  usize = 12;

// ── ResourceType ─────────────────────────────────────────────────────────────

/// Declared payload kind of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceType {
    Bitmap,
    Sound,
    /// Any value outside the known set (2 and above).
    Unknown(u16),
}

impl ResourceType {
    pub const BITMAP: u16 = 0x0;
    pub const SOUND:  u16 = 0x1;

    pub fn raw(self) -> u16 {
        match self {
            ResourceType::Bitmap     => Self::BITMAP,
            ResourceType::Sound      => Self::SOUND,
            ResourceType::Unknown(v) => v,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResourceType::Bitmap     => "bitmap",
            ResourceType::Sound      => "sound",
            ResourceType::Unknown(_) => "unknown",
        }
    }
}

impl From<u16> for ResourceType {
    fn from(v: u16) -> Self {
        match v {
            Self::BITMAP => ResourceType::Bitmap,
            Self::SOUND  => ResourceType::Sound,
            other        => ResourceType::Unknown(other),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Unknown(v) => write!(f, "unknown({v})"),
            known                    => f.write_str(known.name()),
        }
    }
}

// ── Type-specific info ───────────────────────────────────────────────────────

/// Bitmap view of the type-info union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BitmapInfo {
    /// Semantics unknown; carried through untouched.
    pub unknown: u32,
    pub width:   u32,
    pub height:  u32,
}

/// Sound view of the type-info union.
///
/// `unknown0` has only ever been seen as 0, `unknown1` as 0x10 and
/// `unknown2` as 1.  They look like format, bit depth and channel count but
/// nothing confirms it, so they are stored opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SoundInfo {
    pub unknown0:  u16,
    pub unknown1:  u16,
    pub unknown2:  u32,
    /// PCM sample rate in Hz.
    pub frequency: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeInfo {
    Bitmap(BitmapInfo),
    Sound(SoundInfo),
}

impl TypeInfo {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            TypeInfo::Bitmap(_) => ResourceType::Bitmap,
            TypeInfo::Sound(_)  => ResourceType::Sound,
        }
    }

    /// Interpret the raw union bytes according to `resource_type`.
    /// Returns `None` for types outside the known set.
    pub fn from_bytes(resource_type: ResourceType, bytes: &[u8; TYPE_INFO_SIZE]) -> Option<Self> {
        match resource_type {
            ResourceType::Bitmap => Some(TypeInfo::Bitmap(BitmapInfo {
                unknown: LittleEndian::read_u32(&bytes[0..4]),
                width:   LittleEndian::read_u32(&bytes[4..8]),
                height:  LittleEndian::read_u32(&bytes[8..12]),
            })),
            ResourceType::Sound => Some(TypeInfo::Sound(SoundInfo {
                unknown0:  LittleEndian::read_u16(&bytes[0..2]),
                unknown1:  LittleEndian::read_u16(&bytes[2..4]),
                unknown2:  LittleEndian::read_u32(&bytes[4..8]),
                frequency: LittleEndian::read_u32(&bytes[8..12]),
            })),
            ResourceType::Unknown(_) => None,
        }
    }

    /// Serialise into the 12-byte union; bytes a variant does not use stay zero.
    pub fn to_bytes(&self) -> [u8; TYPE_INFO_SIZE] {
        let mut out = [0u8; TYPE_INFO_SIZE];
        match self {
            TypeInfo::Bitmap(b) => {
                LittleEndian::write_u32(&mut out[0..4], b.unknown);
                LittleEndian::write_u32(&mut out[4..8], b.width);
                LittleEndian::write_u32(&mut out[8..12], b.height);
            }
            TypeInfo::Sound(s) => {
                LittleEndian::write_u16(&mut out[0..2], s.unknown0);
                LittleEndian::write_u16(&mut out[2..4], s.unknown1);
                LittleEndian::write_u32(&mut out[4..8], s.unknown2);
                LittleEndian::write_u32(&mut out[8..12], s.frequency);
            }
        }
        out
    }
}

// ── RawDescriptor ────────────────────────────────────────────────────────────

/// A descriptor exactly as stored, with the type-info union left uninterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDescriptor {
    pub resource_type: u16,
    pub id:            u16,
    pub offset:        u32,
    pub size:          u32,
    pub type_info:     [u8; TYPE_INFO_SIZE],
}

impl RawDescriptor {
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let resource_type = reader.read_u16::<LittleEndian>()?;
        let id            = reader.read_u16::<LittleEndian>()?;
        let offset        = reader.read_u32::<LittleEndian>()?;
        let size          = reader.read_u32::<LittleEndian>()?;
        let mut type_info = [0u8; TYPE_INFO_SIZE];
        reader.read_exact(&mut type_info)?;
        Ok(Self { resource_type, id, offset, size, type_info })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.resource_type)?;
        writer.write_u16::<LittleEndian>(self.id)?;
        writer.write_u32::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        writer.write_all(&self.type_info)?;
        Ok(())
    }

    /// Decode one record from the front of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, BlobError> {
        if bytes.len() < DESCRIPTOR_SIZE {
            return Err(BlobError::TruncatedInput {
                what:      "resource descriptor",
                needed:    DESCRIPTOR_SIZE,
                available: bytes.len(),
            });
        }
        Ok(Self::read(&bytes[..DESCRIPTOR_SIZE])?)
    }

    pub fn encode(&self) -> [u8; DESCRIPTOR_SIZE] {
        let mut out = [0u8; DESCRIPTOR_SIZE];
        out[0..2].copy_from_slice(&self.resource_type.to_le_bytes());
        out[2..4].copy_from_slice(&self.id.to_le_bytes());
        out[4..8].copy_from_slice(&self.offset.to_le_bytes());
        out[8..12].copy_from_slice(&self.size.to_le_bytes());
        out[12..].copy_from_slice(&self.type_info);
        out
    }

    pub fn kind(&self) -> ResourceType {
        ResourceType::from(self.resource_type)
    }

    /// Resolve the union now that the type is known.  `index` is the
    /// record's position in the table, reported on failure.
    pub fn interpret(&self, index: usize) -> Result<ResourceDescriptor, BlobError> {
        let info = TypeInfo::from_bytes(self.kind(), &self.type_info).ok_or(
            BlobError::UnsupportedResourceType { resource_type: self.resource_type, index },
        )?;
        Ok(ResourceDescriptor {
            id:     self.id,
            offset: self.offset,
            size:   self.size,
            info,
        })
    }
}

// ── ResourceDescriptor ───────────────────────────────────────────────────────

/// A descriptor whose type-info union has been resolved to a tagged variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    /// Not required to be unique within a blob.
    pub id:     u16,
    pub offset: u32,
    pub size:   u32,
    pub info:   TypeInfo,
}

impl ResourceDescriptor {
    pub fn resource_type(&self) -> ResourceType {
        self.info.resource_type()
    }

    pub fn to_raw(&self) -> RawDescriptor {
        RawDescriptor {
            resource_type: self.resource_type().raw(),
            id:            self.id,
            offset:        self.offset,
            size:          self.size,
            type_info:     self.info.to_bytes(),
        }
    }

    pub fn encode(&self) -> [u8; DESCRIPTOR_SIZE] {
        self.to_raw().encode()
    }

    pub fn bitmap_info(&self) -> Option<&BitmapInfo> {
        match &self.info {
            TypeInfo::Bitmap(b) => Some(b),
            TypeInfo::Sound(_)  => None,
        }
    }

    pub fn sound_info(&self) -> Option<&SoundInfo> {
        match &self.info {
            TypeInfo::Sound(s)  => Some(s),
            TypeInfo::Bitmap(_) => None,
        }
    }
}
