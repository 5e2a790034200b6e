//! Модуль конфигурации библиотеки caption-sync
//!
//! Этот модуль содержит единую структуру настроек проекта. Настройки
//! проверяются один раз при запуске через [`CaptionSyncConfig::validate`].

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{CaptionSyncError, Result};

/// Цвет в формате RGB (8 бит на канал)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// Цвет в виде массива каналов
    pub fn channels(self) -> [u8; 3] {
        [self.0, self.1, self.2]
    }
}

/// Конфигурация проекта
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSyncConfig {
    /// Ширина кадра в пикселях
    pub canvas_width: u32,
    /// Высота кадра в пикселях
    pub canvas_height: u32,
    /// Цвет фона, если фоновое изображение не задано
    pub background_color: Rgb,
    /// Путь к фоновому изображению (опционально)
    pub background_image: Option<PathBuf>,
    /// Размер шрифта в пунктах
    pub font_size: f32,
    /// Цвет текста
    pub font_color: Rgb,
    /// Максимальное количество символов в строке субтитра
    pub wrap_width: usize,
    /// Частота кадров выходного видео
    pub fps: u32,
    /// Пауза после каждого сегмента в секундах
    pub silence_gap_seconds: f64,
    /// Имя выходного файла
    pub output_file_name: String,
    /// Видеокодек ffmpeg
    pub video_codec: String,
    /// Аудиокодек ffmpeg
    pub audio_codec: String,
    /// Исполняемый файл ffmpeg (имя в PATH или путь)
    pub ffmpeg_program: String,
    /// Не удалять временные файлы после завершения
    pub keep_temp_files: bool,
}

impl Default for CaptionSyncConfig {
    fn default() -> Self {
        Self {
            canvas_width: 720,
            canvas_height: 480,
            background_color: Rgb(255, 255, 222),
            background_image: None,
            font_size: 24.0,
            font_color: Rgb::BLACK,
            wrap_width: 25,
            fps: 24,
            silence_gap_seconds: 0.3,
            output_file_name: "yomiage.mp4".to_string(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            ffmpeg_program: "ffmpeg".to_string(),
            keep_temp_files: false,
        }
    }
}

impl CaptionSyncConfig {
    /// Загрузить конфигурацию из JSON-файла
    ///
    /// Отсутствующие поля заполняются значениями по умолчанию.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CaptionSyncError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Проверить корректность настроек
    pub fn validate(&self) -> Result<()> {
        if self.wrap_width == 0 {
            return Err(CaptionSyncError::InvalidInput(
                "wrap width must be greater than zero".to_string(),
            ));
        }
        if self.fps == 0 {
            return Err(CaptionSyncError::Configuration(
                "frame rate must be greater than zero".to_string(),
            ));
        }
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(CaptionSyncError::Configuration(format!(
                "canvas size must be non-zero, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        // yuv420p требует чётных размеров
        if self.canvas_width % 2 != 0 || self.canvas_height % 2 != 0 {
            return Err(CaptionSyncError::Configuration(format!(
                "canvas size must be even in both dimensions, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(CaptionSyncError::Configuration(format!(
                "font size must be a positive number, got {}",
                self.font_size
            )));
        }
        if !self.silence_gap_seconds.is_finite() || self.silence_gap_seconds < 0.0 {
            return Err(CaptionSyncError::Configuration(format!(
                "silence gap must be a non-negative number, got {}",
                self.silence_gap_seconds
            )));
        }
        if self.output_file_name.trim().is_empty() {
            return Err(CaptionSyncError::Configuration(
                "output file name must not be empty".to_string(),
            ));
        }
        if self.ffmpeg_program.trim().is_empty() {
            return Err(CaptionSyncError::Configuration(
                "ffmpeg program must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
