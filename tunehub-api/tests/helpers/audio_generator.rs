//! Audio Test Fixture Generator
//!
//! Synthesised WAV files, optionally carrying embedded tags, plus small
//! in-memory images for artwork uploads.

use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::tag::{Tag, TagType};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency: f32,
    pub amplitude: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 3.0,
            sample_rate: 22050,
            channels: 1,
            frequency: 440.0,
            amplitude: 0.3,
        }
    }
}

fn write_wav<W: std::io::Write + std::io::Seek>(
    writer: W,
    config: &AudioConfig,
) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::new(writer, spec)?;
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;

    for i in 0..total_samples {
        let t = i as f32 / config.sample_rate as f32;
        let value = config.amplitude * (2.0 * std::f32::consts::PI * config.frequency * t).sin();
        let sample = (value * i16::MAX as f32) as i16;
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Generate a test WAV file with specified configuration
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_wav(file, config)?;
    Ok(path.to_path_buf())
}

/// WAV bytes for upload bodies
pub fn wav_bytes(config: &AudioConfig) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    write_wav(&mut buffer, config).expect("generate wav");
    buffer.into_inner()
}

/// WAV bytes carrying an ID3v2 tag with the given title and artist
pub fn tagged_wav_bytes(config: &AudioConfig, title: &str, artist: &str) -> Vec<u8> {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = generate_test_wav(&dir.path().join("tagged.wav"), config).expect("generate wav");

    let mut tag = Tag::new(TagType::Id3v2);
    tag.set_title(title.to_string());
    tag.set_artist(artist.to_string());
    tag.save_to_path(&path, WriteOptions::default())
        .expect("write tag");

    std::fs::read(&path).expect("read tagged wav")
}

/// A small non-square image encoded in `format`
pub fn image_bytes(format: image::ImageFormat) -> Vec<u8> {
    sized_image_bytes(format, 64, 32)
}

/// A gradient image of the given size encoded in `format`
pub fn sized_image_bytes(format: image::ImageFormat, width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    }));
    let img = match format {
        // the JPEG encoder has no alpha channel
        image::ImageFormat::Jpeg => image::DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    };

    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format).expect("encode image");
    buffer.into_inner()
}
