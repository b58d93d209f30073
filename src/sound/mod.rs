//! Raw PCM sound resources.
//!
//! A sound payload has no header: it is a run of signed 16-bit little-endian
//! mono samples played at the descriptor's `frequency`.  Replacement audio of
//! any rate, width and channel count is coerced to that shape; the opaque
//! `unknown0..2` descriptor fields are never touched.

use byteorder::{ByteOrder, LittleEndian};
use image::{Rgb, RgbImage};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use crate::descriptor::{ResourceDescriptor, ResourceType, SoundInfo, TypeInfo};
use crate::error::BlobError;

/// Bytes per stored sample.
pub const SAMPLE_SIZE: usize = 2;

// ── AudioBuffer ──────────────────────────────────────────────────────────────

/// Interleaved sample storage of an incoming [`AudioBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    I8(Vec<i8>),
    I16(Vec<i16>),
    /// 17- to 32-bit integer samples, right-aligned in an `i32`.
    I32 { samples: Vec<i32>, bits_per_sample: u16 },
    /// Nominal range `-1.0..=1.0`.
    F32(Vec<f32>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::I8(s)               => s.len(),
            Samples::I16(s)              => s.len(),
            Samples::I32 { samples, .. } => samples.len(),
            Samples::F32(s)              => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert every sample to signed 16-bit.
    fn to_i16(&self) -> Vec<i16> {
        match self {
            Samples::I8(s)  => s.iter().map(|v| (*v as i16) << 8).collect(),
            Samples::I16(s) => s.clone(),
            Samples::I32 { samples, bits_per_sample } => {
                let shift = bits_per_sample.saturating_sub(16) as u32;
                samples.iter().map(|v| (*v >> shift) as i16).collect()
            }
            Samples::F32(s) => s
                .iter()
                .map(|v| (v.clamp(-1.0, 1.0) * 32767.0) as i16)
                .collect(),
        }
    }
}

/// Arbitrary PCM audio handed in for replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels:    u16,
    pub samples:     Samples,
}

impl AudioBuffer {
    pub fn from_wav<R: Read>(reader: R) -> Result<Self, BlobError> {
        let mut wav = hound::WavReader::new(reader)?;
        let spec = wav.spec();
        let samples = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 8) => {
                Samples::I8(wav.samples::<i8>().collect::<Result<_, _>>()?)
            }
            (hound::SampleFormat::Int, 16) => {
                Samples::I16(wav.samples::<i16>().collect::<Result<_, _>>()?)
            }
            (hound::SampleFormat::Int, bits @ 17..=32) => Samples::I32 {
                samples:         wav.samples::<i32>().collect::<Result<_, _>>()?,
                bits_per_sample: bits,
            },
            (hound::SampleFormat::Float, 32) => {
                Samples::F32(wav.samples::<f32>().collect::<Result<_, _>>()?)
            }
            (format, bits) => {
                return Err(BlobError::InvalidAudio(format!(
                    "unsupported WAV sample format {format:?} at {bits} bits"
                )))
            }
        };
        Ok(Self { sample_rate: spec.sample_rate, channels: spec.channels, samples })
    }

    pub fn from_wav_file<P: AsRef<Path>>(path: P) -> Result<Self, BlobError> {
        Self::from_wav(BufReader::new(File::open(path)?))
    }

    fn validate(&self) -> Result<(), BlobError> {
        if self.channels == 0 {
            return Err(BlobError::InvalidAudio("zero channels".into()));
        }
        if self.sample_rate == 0 {
            return Err(BlobError::InvalidAudio("zero sample rate".into()));
        }
        if self.samples.len() % self.channels as usize != 0 {
            return Err(BlobError::InvalidAudio(format!(
                "{} samples do not divide into {} channels",
                self.samples.len(),
                self.channels
            )));
        }
        if let Samples::I32 { bits_per_sample, .. } = self.samples {
            if !(17..=32).contains(&bits_per_sample) {
                return Err(BlobError::InvalidAudio(format!(
                    "unsupported integer width {bits_per_sample}"
                )));
            }
        }
        Ok(())
    }
}

/// Average all channels of each frame into one sample.
fn downmix(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|s| *s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Linear-interpolation resampler.  The output length is rounded up, so a
/// non-empty clip never resamples to nothing.
fn resample(samples: &[i16], src_rate: u32, dst_rate: u32) -> Vec<i16> {
    if src_rate == dst_rate || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = src_rate as f64 / dst_rate as f64;
    let (src, dst) = (src_rate as u64, dst_rate as u64);
    let output_len = ((samples.len() as u64 * dst + src - 1) / src) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos as usize;
        let frac = src_pos - src_idx as f64;

        let sample = if src_idx + 1 < samples.len() {
            let a = samples[src_idx] as f64;
            let b = samples[src_idx + 1] as f64;
            (a + (b - a) * frac).round() as i16
        } else {
            samples[src_idx.min(samples.len() - 1)]
        };
        output.push(sample);
    }
    output
}

// ── SoundResource ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundResource {
    id:      u16,
    offset:  u32,
    size:    u32,
    info:    SoundInfo,
    samples: Vec<i16>,
}

impl SoundResource {
    pub fn decode(descriptor: &ResourceDescriptor, payload: &[u8]) -> Result<Self, BlobError> {
        let info = match descriptor.info {
            TypeInfo::Sound(s) => s,
            other => return Err(BlobError::WrongResourceKind {
                expected: ResourceType::Sound,
                found:    other.resource_type(),
            }),
        };
        if payload.len() % SAMPLE_SIZE != 0 {
            return Err(BlobError::OddPayloadLength(payload.len()));
        }

        let mut samples = vec![0i16; payload.len() / SAMPLE_SIZE];
        LittleEndian::read_i16_into(payload, &mut samples);

        Ok(Self {
            id:     descriptor.id,
            offset: descriptor.offset,
            size:   descriptor.size,
            info,
            samples,
        })
    }

    /// Samples as little-endian bytes; `2 * sample_count` long.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.samples.len() * SAMPLE_SIZE];
        LittleEndian::write_i16_into(&self.samples, &mut out);
        out
    }

    /// Replace the clip with `audio`, converted to 16-bit mono at this
    /// resource's frequency.  Nothing is modified if validation fails.
    pub fn replace(&mut self, audio: &AudioBuffer) -> Result<(), BlobError> {
        audio.validate()?;
        if self.info.frequency == 0 {
            return Err(BlobError::InvalidAudio("descriptor frequency is zero".into()));
        }

        let wide = audio.samples.to_i16();
        let mono = downmix(&wide, audio.channels);
        let samples = resample(&mono, audio.sample_rate, self.info.frequency);

        if samples.len() as u64 * SAMPLE_SIZE as u64 > u32::MAX as u64 {
            return Err(BlobError::InvalidAudio(format!(
                "{} samples exceed the 32-bit payload size",
                samples.len()
            )));
        }

        tracing::debug!(
            id = self.id,
            from_rate = audio.sample_rate,
            to_rate = self.info.frequency,
            channels = audio.channels,
            samples = samples.len(),
            "sound replaced"
        );
        self.samples = samples;
        Ok(())
    }

    pub fn id(&self) -> u16 { self.id }
    pub fn info(&self) -> &SoundInfo { &self.info }
    pub fn samples(&self) -> &[i16] { &self.samples }
    pub fn frequency(&self) -> u32 { self.info.frequency }

    pub fn duration_secs(&self) -> f64 {
        if self.info.frequency == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.info.frequency as f64
    }

    pub fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            id:     self.id,
            offset: self.offset,
            size:   self.size,
            info:   TypeInfo::Sound(self.info),
        }
    }

    pub(crate) fn set_location(&mut self, offset: u32, size: u32) {
        self.offset = offset;
        self.size = size;
    }

    pub fn to_audio_buffer(&self) -> AudioBuffer {
        AudioBuffer {
            sample_rate: self.info.frequency,
            channels:    1,
            samples:     Samples::I16(self.samples.clone()),
        }
    }

    /// Write the clip as a 16-bit mono WAV file.
    pub fn write_wav<W: Write + Seek>(&self, writer: W) -> Result<(), BlobError> {
        let spec = hound::WavSpec {
            channels:        1,
            sample_rate:     self.info.frequency,
            bits_per_sample: 16,
            sample_format:   hound::SampleFormat::Int,
        };
        let mut wav = hound::WavWriter::new(writer, spec)?;
        for s in &self.samples {
            wav.write_sample(*s)?;
        }
        wav.finalize()?;
        Ok(())
    }

    /// Min/max waveform on a white background.
    pub fn preview(&self, width: u32, height: u32) -> RgbImage {
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        if width == 0 || height == 0 {
            return canvas;
        }
        let mid = height / 2;
        for x in 0..width {
            canvas.put_pixel(x, mid, Rgb([200, 200, 200]));
        }
        if self.samples.is_empty() {
            return canvas;
        }

        let to_y = |s: i16| -> u32 {
            let norm = (s as f64 + 32768.0) / 65535.0;
            let y = ((1.0 - norm) * (height - 1) as f64).round() as u32;
            y.min(height - 1)
        };

        let n = self.samples.len();
        for x in 0..width {
            let start = x as usize * n / width as usize;
            let end = ((x as usize + 1) * n / width as usize).max(start + 1).min(n);
            if start >= n {
                break;
            }
            let bucket = &self.samples[start..end];
            let lo = bucket.iter().copied().min().unwrap_or(0);
            let hi = bucket.iter().copied().max().unwrap_or(0);
            for y in to_y(hi)..=to_y(lo) {
                canvas.put_pixel(x, y, Rgb([48, 48, 48]));
            }
        }
        canvas
    }
}

impl fmt::Display for SoundResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SoundResource:")?;
        writeln!(f, "    ID: 0x{:04x}", self.id)?;
        writeln!(f, "    Unknown0: {}", self.info.unknown0)?;
        writeln!(f, "    Unknown1: {}", self.info.unknown1)?;
        writeln!(f, "    Unknown2: {}", self.info.unknown2)?;
        write!(f, "    Frequency: {}", self.info.frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn descriptor(frequency: u32, size: u32) -> ResourceDescriptor {
        ResourceDescriptor {
            id:     0x0007,
            offset: 0,
            size,
            info:   TypeInfo::Sound(SoundInfo {
                unknown0: 0,
                unknown1: 0x10,
                unknown2: 1,
                frequency,
            }),
        }
    }

    #[test]
    fn decode_even_payload() {
        let payload = [0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80];
        let snd = SoundResource::decode(&descriptor(48000, 6), &payload).unwrap();
        assert_eq!(snd.samples(), &[1, -1, i16::MIN]);
        assert_eq!(snd.encode(), payload);
    }

    #[test]
    fn odd_payload_is_rejected() {
        let err = SoundResource::decode(&descriptor(48000, 3), &[0, 0, 0]);
        assert!(matches!(err, Err(BlobError::OddPayloadLength(3))));
    }

    #[test]
    fn empty_payload_has_no_samples() {
        let snd = SoundResource::decode(&descriptor(48000, 0), &[]).unwrap();
        assert!(snd.samples().is_empty());
        assert!(snd.encode().is_empty());
    }

    #[test]
    fn replace_downmixes_and_resamples() {
        let mut snd = SoundResource::decode(&descriptor(8000, 4), &[0, 0, 0, 0]).unwrap();
        // One second of stereo at 16 kHz: left = 1000, right = 3000.
        let frames = 16000;
        let mut interleaved = Vec::with_capacity(frames * 2);
        for _ in 0..frames {
            interleaved.push(1000i16);
            interleaved.push(3000i16);
        }
        let audio = AudioBuffer {
            sample_rate: 16000,
            channels:    2,
            samples:     Samples::I16(interleaved),
        };
        snd.replace(&audio).unwrap();

        assert_eq!(snd.frequency(), 8000);
        assert_eq!(snd.samples().len(), 8000);
        assert!(snd.samples().iter().all(|s| *s == 2000));
        assert_eq!(snd.info(), &SoundInfo { unknown0: 0, unknown1: 0x10, unknown2: 1, frequency: 8000 });
        assert_eq!(snd.encode().len(), 16000);
    }

    #[test]
    fn replace_converts_sample_width() {
        let mut snd = SoundResource::decode(&descriptor(100, 0), &[]).unwrap();
        snd.replace(&AudioBuffer {
            sample_rate: 100,
            channels:    1,
            samples:     Samples::I8(vec![1, -1, 127]),
        }).unwrap();
        assert_eq!(snd.samples(), &[256, -256, 127 << 8]);

        snd.replace(&AudioBuffer {
            sample_rate: 100,
            channels:    1,
            samples:     Samples::I32 { samples: vec![0x0012_3400, -0x0080_0000], bits_per_sample: 24 },
        }).unwrap();
        assert_eq!(snd.samples(), &[0x1234, i16::MIN]);

        snd.replace(&AudioBuffer {
            sample_rate: 100,
            channels:    1,
            samples:     Samples::F32(vec![1.0, -1.0, 0.0, 2.0]),
        }).unwrap();
        assert_eq!(snd.samples(), &[32767, -32767, 0, 32767]);
    }

    #[test]
    fn invalid_audio_leaves_clip_untouched() {
        let payload = [0x10, 0x00, 0x20, 0x00];
        let mut snd = SoundResource::decode(&descriptor(8000, 4), &payload).unwrap();
        let before = snd.clone();

        let ragged = AudioBuffer { sample_rate: 8000, channels: 2, samples: Samples::I16(vec![1, 2, 3]) };
        assert!(matches!(snd.replace(&ragged), Err(BlobError::InvalidAudio(_))));
        let silent = AudioBuffer { sample_rate: 0, channels: 1, samples: Samples::I16(vec![1]) };
        assert!(matches!(snd.replace(&silent), Err(BlobError::InvalidAudio(_))));
        let no_channels = AudioBuffer { sample_rate: 8000, channels: 0, samples: Samples::I16(vec![]) };
        assert!(matches!(snd.replace(&no_channels), Err(BlobError::InvalidAudio(_))));

        assert_eq!(snd, before);
    }

    #[test]
    fn wav_export_import() {
        let payload: Vec<u8> = [100i16, -200, 300, -400]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let snd = SoundResource::decode(&descriptor(22050, 8), &payload).unwrap();

        let mut cursor = Cursor::new(Vec::new());
        snd.write_wav(&mut cursor).unwrap();
        cursor.set_position(0);

        let audio = AudioBuffer::from_wav(cursor).unwrap();
        assert_eq!(audio, snd.to_audio_buffer());
    }

    #[test]
    fn properties_text() {
        let snd = SoundResource::decode(&descriptor(48000, 0), &[]).unwrap();
        let text = snd.to_string();
        assert!(text.starts_with("SoundResource:"));
        assert!(text.contains("ID: 0x0007"));
        assert!(text.contains("Unknown1: 16"));
        assert!(text.contains("Frequency: 48000"));
    }

    #[test]
    fn waveform_preview() {
        let payload: Vec<u8> = [i16::MAX, i16::MIN]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let snd = SoundResource::decode(&descriptor(8000, 4), &payload).unwrap();
        let img = snd.preview(2, 9);
        assert_eq!(img.dimensions(), (2, 9));
        assert_eq!(img.get_pixel(0, 0).0, [48, 48, 48]);
        assert_eq!(img.get_pixel(1, 8).0, [48, 48, 48]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn resample_halves_length() {
        let src: Vec<i16> = (0..100).collect();
        let out = resample(&src, 2000, 1000);
        assert_eq!(out.len(), 50);
        assert_eq!(out[10], 20);
    }

    #[test]
    fn resample_rounds_length_up() {
        let src: Vec<i16> = (0..101).collect();
        let out = resample(&src, 2000, 1000);
        assert_eq!(out.len(), 51);
        assert_eq!(out[50], 100);
    }

    #[test]
    fn short_clip_survives_downsampling() {
        let mut snd = SoundResource::decode(&descriptor(8000, 4), &[0, 0, 0, 0]).unwrap();
        let audio = AudioBuffer {
            sample_rate: 48000,
            channels:    1,
            samples:     Samples::I16(vec![700, 800, 900, 1000, 1100]),
        };
        snd.replace(&audio).unwrap();
        assert_eq!(snd.samples(), &[700]);
        assert_eq!(snd.encode().len(), 2);
    }
}
