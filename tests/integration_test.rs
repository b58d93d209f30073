use drcblob::bitmap::PALETTE_SIZE;
use drcblob::descriptor::{BitmapInfo, RawDescriptor, SoundInfo, TypeInfo};
use drcblob::session::{self, ReplaceOptions};
use drcblob::{AudioBuffer, BlobError, ResourceBlob, ResourceType};
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use std::fs::File;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

// ── fixtures ─────────────────────────────────────────────────────────────────

fn descriptor(kind: u16, id: u16, offset: u32, size: u32, info: [u8; 12]) -> [u8; 24] {
    RawDescriptor { resource_type: kind, id, offset, size, type_info: info }.encode()
}

/// A 2×2 bitmap (id 0x0100) followed by a 4-sample sound at 16 kHz (id 0x0200).
fn fixture_blob() -> Vec<u8> {
    let bitmap_info = TypeInfo::Bitmap(BitmapInfo { unknown: 3, width: 2, height: 2 }).to_bytes();
    let sound_info = TypeInfo::Sound(SoundInfo {
        unknown0:  0x11,
        unknown1:  0x22,
        unknown2:  0x3333,
        frequency: 16_000,
    })
    .to_bytes();

    let mut bitmap = vec![0u8; PALETTE_SIZE];
    bitmap[0..4].copy_from_slice(&[255, 0, 0, 255]);
    bitmap[4..8].copy_from_slice(&[0, 255, 0, 255]);
    bitmap.extend_from_slice(&[0, 1, 1, 0]);
    let sound: Vec<u8> = [100i16, -100, 200, -200].iter().flat_map(|s| s.to_le_bytes()).collect();

    let mut out = Vec::new();
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&descriptor(0, 0x0100, 0, bitmap.len() as u32, bitmap_info));
    out.extend_from_slice(&descriptor(1, 0x0200, bitmap.len() as u32, sound.len() as u32, sound_info));
    out.extend(bitmap);
    out.extend(sound);
    out
}

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

// ── tests ────────────────────────────────────────────────────────────────────

#[test]
fn test_open_embedded_and_save_standalone() {
    let mut host = vec![0xEEu8; 0x40];
    host.extend(fixture_blob());
    host.extend_from_slice(b"trailing firmware bytes");
    let input = write_temp(&host);

    let mut blob = session::open_blob(input.path(), 0x40).unwrap();
    assert_eq!(blob.len(), 2);

    let output = NamedTempFile::new().unwrap();
    session::save_blob(&mut blob, output.path()).unwrap();

    let saved = std::fs::read(output.path()).unwrap();
    assert_eq!(saved, fixture_blob());
    assert_eq!(session::open_blob(output.path(), 0).unwrap(), blob);
}

#[test]
fn test_list_reports_descriptors() {
    let blob = ResourceBlob::from_bytes(&fixture_blob(), 0).unwrap();
    let infos = session::list(&blob);

    assert_eq!(infos.len(), 2);
    assert_eq!(infos[0].resource_type, ResourceType::Bitmap);
    assert_eq!((infos[0].id, infos[0].offset, infos[0].size), (0x0100, 0, 1028));
    assert_eq!(infos[1].resource_type, ResourceType::Sound);
    assert_eq!((infos[1].id, infos[1].offset, infos[1].size), (0x0200, 1028, 8));

    let json = serde_json::to_value(&infos).unwrap();
    assert_eq!(json[0]["type_info"]["kind"], "bitmap");
    assert_eq!(json[1]["type_info"]["frequency"], 16_000);
}

#[test]
fn test_replace_bitmap_from_png() {
    let dir = tempdir().unwrap();
    let png = dir.path().join("red.png");
    RgbaImage::from_pixel(6, 4, Rgba([255, 0, 0, 255])).save(&png).unwrap();

    let mut blob = ResourceBlob::from_bytes(&fixture_blob(), 0).unwrap();
    let source = image::open(&png).unwrap();
    let opts = ReplaceOptions { filter: FilterType::Nearest };
    session::replace_bitmap(&mut blob, 0, &source, &opts).unwrap();

    let encoded = blob.encode().unwrap();
    let reread = ResourceBlob::from_bytes(&encoded, 0).unwrap();
    let bmp = reread.get(0).unwrap().as_bitmap().unwrap();

    assert_eq!((bmp.info().width, bmp.info().height), (2, 2));
    assert_eq!(bmp.info().unknown, 3);
    assert_eq!(bmp.encode().len(), PALETTE_SIZE + 4);
    for y in 0..2 {
        for x in 0..2 {
            assert_eq!(bmp.image().pixel(x, y).unwrap().to_rgba(), [255, 0, 0, 255]);
        }
    }
    // Bitmap payload length is fixed by its dimensions.
    assert_eq!(reread.get(1).unwrap().descriptor().offset, 1028);
}

#[test]
fn test_replace_sound_from_wav() {
    let dir = tempdir().unwrap();
    let wav_path = dir.path().join("stereo.wav");
    {
        let spec = hound::WavSpec {
            channels:        2,
            sample_rate:     8_000,
            bits_per_sample: 16,
            sample_format:   hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(&wav_path, spec).unwrap();
        for _ in 0..100 {
            w.write_sample(1000i16).unwrap();
            w.write_sample(3000i16).unwrap();
        }
        w.finalize().unwrap();
    }

    let mut blob = ResourceBlob::from_bytes(&fixture_blob(), 0).unwrap();
    let audio = AudioBuffer::from_wav_file(&wav_path).unwrap();
    session::replace_sound(&mut blob, 1, &audio).unwrap();

    let sound = blob.get(1).unwrap().as_sound().unwrap();
    assert_eq!(sound.frequency(), 16_000);
    assert_eq!(sound.samples().len(), 200);
    assert!(sound.samples().iter().all(|s| *s == 2000));
    assert_eq!((sound.info().unknown0, sound.info().unknown1, sound.info().unknown2), (0x11, 0x22, 0x3333));

    let encoded = blob.encode().unwrap();
    let desc = blob.get(1).unwrap().descriptor();
    assert_eq!((desc.offset, desc.size), (1028, 400));
    assert_eq!(encoded.len(), 4 + 2 * 24 + 1028 + 400);
}

#[test]
fn test_extract_all_writes_png_and_wav() {
    let blob = ResourceBlob::from_bytes(&fixture_blob(), 0).unwrap();
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");

    let written = session::extract_all(&blob, &out).unwrap();
    assert_eq!(written.len(), 2);
    assert!(written[0].ends_with("000_0x0100.png"));
    assert!(written[1].ends_with("001_0x0200.wav"));

    let png = image::open(&written[0]).unwrap().to_rgba8();
    assert_eq!(png.dimensions(), (2, 2));
    // Palette entry 0 is stored B,G,R,A = 255,0,0,255.
    assert_eq!(png.get_pixel(0, 0).0, [0, 0, 255, 255]);
    assert_eq!(png.get_pixel(1, 0).0, [0, 255, 0, 255]);

    let wav = AudioBuffer::from_wav(File::open(&written[1]).unwrap()).unwrap();
    assert_eq!((wav.sample_rate, wav.channels), (16_000, 1));
    assert_eq!(wav.samples, drcblob::Samples::I16(vec![100, -100, 200, -200]));
}

#[test]
fn test_extract_into_existing_dir_twice() {
    let blob = ResourceBlob::from_bytes(&fixture_blob(), 0).unwrap();
    let dir = tempdir().unwrap();

    let first = session::extract_all(&blob, dir.path()).unwrap();
    let second = session::extract_all(&blob, dir.path()).unwrap();
    assert_eq!(first, second);
    assert!(second.iter().all(|p| p.is_file()));
}

#[test]
fn test_unsupported_type_fails_whole_open() {
    let mut bytes = fixture_blob();
    // Rewrite the second descriptor's type field.
    bytes[4 + 24..4 + 24 + 2].copy_from_slice(&5u16.to_le_bytes());
    let input = write_temp(&bytes);

    match session::open_blob(input.path(), 0) {
        Err(BlobError::UnsupportedResourceType { resource_type: 5, index: 1 }) => {}
        other => panic!("expected UnsupportedResourceType, got {other:?}"),
    }

    let mut file = File::open(input.path()).unwrap();
    let table = ResourceBlob::read_descriptor_table(&mut file, 0).unwrap();
    assert_eq!(table[1].kind(), ResourceType::Unknown(5));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        session::open_blob(dir.path().join("absent.bin"), 0),
        Err(BlobError::Io(_))
    ));
}

#[test]
fn test_offset_past_end_is_truncated() {
    let input = write_temp(&fixture_blob());
    assert!(matches!(
        session::open_blob(input.path(), 10_000),
        Err(BlobError::TruncatedInput { what: "descriptor count", .. })
    ));
}

#[test]
fn test_previews_have_requested_size() {
    let blob = ResourceBlob::from_bytes(&fixture_blob(), 0).unwrap();
    for resource in &blob {
        assert_eq!(resource.preview(150, 150).dimensions(), (150, 150));
    }
    let empty = DynamicImage::new_rgba8(0, 0);
    let mut blob = blob;
    assert!(blob.replace_bitmap(0, &empty, FilterType::Nearest).is_err());
}
