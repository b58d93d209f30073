pub mod error;
pub mod descriptor;
pub mod bitmap;
pub mod sound;
pub mod blob;
pub mod session;

pub use error::BlobError;
pub use descriptor::{RawDescriptor, ResourceDescriptor, ResourceType, TypeInfo, BitmapInfo, SoundInfo};
pub use bitmap::{BitmapResource, IndexedImage, PaletteEntry};
pub use sound::{AudioBuffer, Samples, SoundResource};
pub use blob::{Resource, ResourceBlob};
pub use session::{open_blob, save_blob, replace_bitmap, replace_sound, ReplaceOptions};
