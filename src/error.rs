//! Error taxonomy shared by every layer of the codec.
//!
//! Decode-time structural errors abort the whole blob load; there is no
//! partial result.  Replace operations report the same enum but never leave
//! a resource half-written.

use std::io;
use thiserror::Error;

use crate::descriptor::ResourceType;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Truncated input while reading {what}: need {needed} bytes, {available} available")]
    TruncatedInput {
        what:      &'static str,
        needed:    usize,
        available: usize,
    },
    #[error("Unsupported resource type {resource_type} in descriptor #{index}")]
    UnsupportedResourceType { resource_type: u16, index: usize },
    #[error("Bitmap payload too short: need {needed} bytes, got {actual}")]
    PayloadTooShort { needed: usize, actual: usize },
    #[error("Sound payload length {0} is not a whole number of 16-bit samples")]
    OddPayloadLength(usize),
    #[error("Invalid bitmap dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),
    #[error("Resource index {index} out of range ({count} resources)")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("Wrong resource kind: expected {expected}, found {found}")]
    WrongResourceKind { expected: ResourceType, found: ResourceType },
    #[error("Payload region exceeds the 32-bit offset range")]
    PayloadRegionOverflow,
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
