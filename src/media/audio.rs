//! Модуль для работы с аудио
//!
//! Этот модуль содержит аудиосегмент одного субтитра: декодирование файла,
//! производные длительности и добавление паузы в конце.
//!
//! WAV декодируется через hound, остальные форматы через symphonia.
//! Семплы хранятся как f32, многоканальное аудио остаётся чередованным.

use std::fs::File;
use std::path::{Path, PathBuf};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use crate::error::{CaptionSyncError, Result};

/// Декодированный аудиосегмент
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    silence_gap_seconds: f64,
    source: Option<PathBuf>,
}

impl AudioSegment {
    /// Создать сегмент из готовых семплов
    pub fn from_samples(
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
        silence_gap_seconds: f64,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(CaptionSyncError::InvalidInput(
                "sample rate must be greater than zero".to_string(),
            ));
        }
        if channels == 0 {
            return Err(CaptionSyncError::InvalidInput(
                "channel count must be greater than zero".to_string(),
            ));
        }
        if !silence_gap_seconds.is_finite() || silence_gap_seconds < 0.0 {
            return Err(CaptionSyncError::InvalidInput(format!(
                "silence gap must be a non-negative number, got {}",
                silence_gap_seconds
            )));
        }
        if samples.len() % channels as usize != 0 {
            return Err(CaptionSyncError::InvalidInput(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
            silence_gap_seconds,
            source: None,
        })
    }

    /// Декодировать аудиофайл
    pub fn load<P: AsRef<Path>>(path: P, silence_gap_seconds: f64) -> Result<Self> {
        let path = path.as_ref();
        let is_wav = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);

        let (samples, sample_rate, channels) = if is_wav {
            decode_wav(path)?
        } else {
            decode_with_symphonia(path)?
        };

        log::debug!(
            "Decoded {} samples ({} Hz, {} ch) from {}",
            samples.len(),
            sample_rate,
            channels,
            path.display()
        );

        let mut segment = Self::from_samples(samples, sample_rate, channels, silence_gap_seconds)
            .map_err(|e| CaptionSyncError::audio_decode(path, e))?;
        segment.source = Some(path.to_path_buf());
        Ok(segment)
    }

    /// Семплы (чередованные для многоканального аудио)
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Частота дискретизации
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Количество каналов
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Пауза после сегмента в секундах
    pub fn silence_gap_seconds(&self) -> f64 {
        self.silence_gap_seconds
    }

    /// Исходный файл, если сегмент был загружен с диска
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Количество аудиокадров (семплов на канал)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Количество аудиокадров паузы
    pub fn silence_frames(&self) -> usize {
        (self.silence_gap_seconds * self.sample_rate as f64).round() as usize
    }

    /// Длительность воспроизведения без паузы
    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Время показа кадра: звук плюс пауза, с точностью до семпла
    pub fn hold_seconds(&self) -> f64 {
        (self.frames() + self.silence_frames()) as f64 / self.sample_rate as f64
    }

    /// Семплы с добавленной тишиной в конце
    pub fn with_trailing_silence(&self) -> Vec<f32> {
        let silence = self.silence_frames() * self.channels as usize;
        let mut out = Vec::with_capacity(self.samples.len() + silence);
        out.extend_from_slice(&self.samples);
        out.resize(self.samples.len() + silence, 0.0);
        out
    }
}

/// Декодирует WAV-файл через hound
fn decode_wav(path: &Path) -> Result<(Vec<f32>, u32, u16)> {
    let mut reader = WavReader::open(path).map_err(|e| CaptionSyncError::audio_decode(path, e))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<Vec<f32>, hound::Error>>(),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<Vec<f32>, hound::Error>>(),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect::<std::result::Result<Vec<f32>, hound::Error>>(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0))
            .collect::<std::result::Result<Vec<f32>, hound::Error>>(),
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, hound::Error>>(),
        _ => {
            return Err(CaptionSyncError::audio_decode(
                path,
                format!(
                    "unsupported WAV format: {:?}, {} bits",
                    spec.sample_format, spec.bits_per_sample
                ),
            ));
        }
    }
    .map_err(|e| CaptionSyncError::audio_decode(path, e))?;

    Ok((samples, spec.sample_rate, spec.channels))
}

/// Декодирует остальные форматы через symphonia
fn decode_with_symphonia(path: &Path) -> Result<(Vec<f32>, u32, u16)> {
    let file = File::open(path).map_err(|e| CaptionSyncError::audio_decode(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| CaptionSyncError::audio_decode(path, format!("unsupported format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| CaptionSyncError::audio_decode(path, "no audio track found"))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| CaptionSyncError::audio_decode(path, format!("failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(CaptionSyncError::audio_decode(path, e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| CaptionSyncError::audio_decode(path, e))?;
        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        channels.get_or_insert(spec.channels.count() as u16);

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    let sample_rate = sample_rate
        .ok_or_else(|| CaptionSyncError::audio_decode(path, "unknown sample rate"))?;
    let channels = channels
        .ok_or_else(|| CaptionSyncError::audio_decode(path, "unknown channel layout"))?;

    Ok((samples, sample_rate, channels))
}

/// Записать семплы в WAV (32 бит, с плавающей точкой)
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()> {
    let path = path.as_ref();
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let to_err = |e: hound::Error| {
        CaptionSyncError::Encode(format!("failed to write WAV {}: {}", path.display(), e))
    };

    let mut writer = WavWriter::create(path, spec).map_err(to_err)?;
    for &sample in samples {
        writer.write_sample(sample).map_err(to_err)?;
    }
    writer.finalize().map_err(to_err)?;
    Ok(())
}
