//! Модуль обработки ошибок библиотеки caption-sync
//!
//! Этот модуль содержит типы ошибок, которые могут возникнуть при сборке видео.
//! Все ошибки фатальны: конвейер не делает повторных попыток.

use std::path::PathBuf;
use thiserror::Error;

/// Ошибки библиотеки caption-sync
#[derive(Debug, Error)]
pub enum CaptionSyncError {
    /// Некорректные входные данные (нулевая ширина строки, пустой список субтитров)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Количество субтитров не совпадает с количеством аудиофайлов
    #[error("Length mismatch: {captions} captions but {audio} audio files")]
    LengthMismatch {
        captions: usize,
        audio: usize,
    },

    /// Ошибка декодирования аудио
    #[error("Audio decode error in {path}: {message}")]
    AudioDecode {
        path: PathBuf,
        message: String,
    },

    /// Частота дискретизации сегмента отличается от остальных
    #[error("Sample rate mismatch at segment {index}: expected {expected} Hz, found {found} Hz")]
    SampleRateMismatch {
        index: usize,
        expected: u32,
        found: u32,
    },

    /// Количество каналов сегмента отличается от остальных
    #[error("Channel count mismatch at segment {index}: expected {expected}, found {found}")]
    ChannelMismatch {
        index: usize,
        expected: u16,
        found: u16,
    },

    /// Некорректный ресурс (шрифт, фоновое изображение)
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// Ошибка отрисовки кадра
    #[error("Render error at segment {index}: {message}")]
    Render {
        index: usize,
        message: String,
    },

    /// Ошибка кодирования видео
    #[error("Encode error: {0}")]
    Encode(String),

    /// Ошибка записи контейнера
    #[error("Mux error: {0}")]
    Mux(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CaptionSyncError {
    /// Создать ошибку декодирования для указанного файла
    pub fn audio_decode(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::AudioDecode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Индекс сегмента, к которому относится ошибка, если он известен
    pub fn segment_index(&self) -> Option<usize> {
        match self {
            Self::SampleRateMismatch { index, .. }
            | Self::ChannelMismatch { index, .. }
            | Self::Render { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Тип Result для библиотеки caption-sync
pub type Result<T> = std::result::Result<T, CaptionSyncError>;
