//! Модуль для работы с фоном кадра
//!
//! Фон либо заливается одним цветом, либо декодируется из изображения.
//! Размер изображения обязан совпадать с размером кадра: масштабирование
//! не выполняется.

use std::path::Path;
use crate::config::{CaptionSyncConfig, Rgb};
use crate::error::{CaptionSyncError, Result};
use crate::utils::ffmpeg;

/// Неизменяемый фон кадра в формате RGB24
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Background {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Background {
    /// Фон, залитый одним цветом
    pub fn solid(width: u32, height: u32, color: Rgb) -> Self {
        let pixel = color.channels();
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 3);
        for _ in 0..count {
            pixels.extend_from_slice(&pixel);
        }
        Self { width, height, pixels }
    }

    /// Фон из готового буфера RGB24
    ///
    /// `expected` — размер кадра проекта. Несовпадение размеров является
    /// ошибкой ресурса.
    pub fn from_rgb(
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        expected: (u32, u32),
    ) -> Result<Self> {
        if (width, height) != expected {
            return Err(CaptionSyncError::InvalidAsset(format!(
                "background image is {}x{}, canvas is {}x{}",
                width, height, expected.0, expected.1
            )));
        }
        let expected_len = width as usize * height as usize * 3;
        if pixels.len() != expected_len {
            return Err(CaptionSyncError::InvalidAsset(format!(
                "background buffer has {} bytes, expected {}",
                pixels.len(),
                expected_len
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// Декодировать фоновое изображение с помощью ffprobe/ffmpeg
    pub fn load_image<P: AsRef<Path>>(path: P, expected: (u32, u32)) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CaptionSyncError::InvalidAsset(format!(
                "background image not found: {}",
                path.display()
            )));
        }
        let path_str = path.to_string_lossy().into_owned();

        let probe = ffmpeg::run_ffprobe_command(&[
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height",
            "-of", "csv=s=x:p=0",
            path_str.as_str(),
        ])
        .map_err(|e| {
            CaptionSyncError::InvalidAsset(format!(
                "failed to probe background image {}: {}",
                path.display(),
                e
            ))
        })?;

        let (width, height) = parse_resolution(&probe).ok_or_else(|| {
            CaptionSyncError::InvalidAsset(format!(
                "failed to parse background image resolution: {}",
                probe.trim()
            ))
        })?;

        // Размер проверяем до декодирования
        if (width, height) != expected {
            return Err(CaptionSyncError::InvalidAsset(format!(
                "background image {} is {}x{}, canvas is {}x{}",
                path.display(),
                width,
                height,
                expected.0,
                expected.1
            )));
        }

        let pixels = ffmpeg::run_ffmpeg_capture(&[
            "-v", "error",
            "-i", path_str.as_str(),
            "-frames:v", "1",
            "-f", "rawvideo",
            "-pix_fmt", "rgb24",
            "-",
        ])
        .map_err(|e| {
            CaptionSyncError::InvalidAsset(format!(
                "failed to decode background image {}: {}",
                path.display(),
                e
            ))
        })?;

        log::debug!("Loaded background image {} ({}x{})", path.display(), width, height);
        Self::from_rgb(width, height, pixels, expected)
    }

    /// Фон согласно конфигурации проекта
    pub fn from_config(config: &CaptionSyncConfig) -> Result<Self> {
        let size = (config.canvas_width, config.canvas_height);
        match &config.background_image {
            Some(path) => Self::load_image(path, size),
            None => Ok(Self::solid(size.0, size.1, config.background_color)),
        }
    }

    /// Ширина в пикселях
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Высота в пикселях
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Пиксели в формате RGB24
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Разбор вывода ffprobe вида `WIDTHxHEIGHT`
fn parse_resolution(raw: &str) -> Option<(u32, u32)> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (w, h) = line.split_once('x')?;
    let width = w.trim().parse::<u32>().ok()?;
    let height = h.trim().trim_end_matches('x').parse::<u32>().ok()?;
    Some((width, height))
}
