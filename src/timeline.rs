//! Построение временной шкалы проекта
//!
//! Временная шкала — упорядоченный список пар (субтитр, аудиосегмент).
//! Порядок пар является единственным источником порядка воспроизведения.

use std::path::{Path, PathBuf};
use rayon::prelude::*;
use walkdir::WalkDir;
use crate::caption::Caption;
use crate::config::CaptionSyncConfig;
use crate::error::{CaptionSyncError, Result};
use crate::media::audio::AudioSegment;

/// Один сегмент временной шкалы
#[derive(Debug, Clone)]
pub struct TimelineSegment {
    /// Порядковый номер сегмента
    pub index: usize,
    /// Субтитр, показываемый на кадре
    pub caption: Caption,
    /// Озвучка субтитра
    pub audio: AudioSegment,
}

impl TimelineSegment {
    /// Время показа кадра
    pub fn hold_seconds(&self) -> f64 {
        self.audio.hold_seconds()
    }
}

/// Упорядоченная временная шкала
#[derive(Debug, Clone)]
pub struct Timeline {
    segments: Vec<TimelineSegment>,
    sample_rate: u32,
    channels: u16,
}

impl Timeline {
    /// Собрать временную шкалу из готовых пар
    ///
    /// Проверяет, что список не пуст и что все сегменты имеют одинаковую
    /// частоту дискретизации и количество каналов.
    pub fn new(pairs: Vec<(Caption, AudioSegment)>) -> Result<Self> {
        let (sample_rate, channels) = match pairs.first() {
            Some((_, audio)) => (audio.sample_rate(), audio.channels()),
            None => {
                return Err(CaptionSyncError::InvalidInput(
                    "timeline must contain at least one segment".to_string(),
                ))
            }
        };

        for (index, (_, audio)) in pairs.iter().enumerate() {
            if audio.sample_rate() != sample_rate {
                return Err(CaptionSyncError::SampleRateMismatch {
                    index,
                    expected: sample_rate,
                    found: audio.sample_rate(),
                });
            }
            if audio.channels() != channels {
                return Err(CaptionSyncError::ChannelMismatch {
                    index,
                    expected: channels,
                    found: audio.channels(),
                });
            }
        }

        let segments = pairs
            .into_iter()
            .enumerate()
            .map(|(index, (caption, audio))| TimelineSegment { index, caption, audio })
            .collect();

        Ok(Self {
            segments,
            sample_rate,
            channels,
        })
    }

    pub fn segments(&self) -> &[TimelineSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Общая частота дискретизации
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Общее количество каналов
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Суммарное время показа всех кадров
    pub fn total_hold_seconds(&self) -> f64 {
        self.total_hold_frames() as f64 / self.sample_rate as f64
    }

    /// Суммарная длина дорожки в аудиокадрах
    pub fn total_hold_frames(&self) -> usize {
        self.segments
            .iter()
            .map(|s| s.audio.frames() + s.audio.silence_frames())
            .sum()
    }

    /// Границы сегментов: накопленное время показа в секундах
    ///
    /// Первый элемент 0.0, последний равен общей длительности.
    pub fn segment_boundaries(&self) -> Vec<f64> {
        let mut boundaries = Vec::with_capacity(self.segments.len() + 1);
        let mut cursor = 0usize;
        boundaries.push(0.0);
        for segment in &self.segments {
            cursor += segment.audio.frames() + segment.audio.silence_frames();
            boundaries.push(cursor as f64 / self.sample_rate as f64);
        }
        boundaries
    }
}

/// Построитель временной шкалы
pub struct TimelineBuilder {
    silence_gap_seconds: f64,
}

impl TimelineBuilder {
    /// Создать построитель с настройками проекта
    pub fn new(config: &CaptionSyncConfig) -> Self {
        Self {
            silence_gap_seconds: config.silence_gap_seconds,
        }
    }

    /// Создать построитель с заданной паузой
    pub fn with_silence_gap(silence_gap_seconds: f64) -> Self {
        Self { silence_gap_seconds }
    }

    /// Сопоставить субтитры с аудиофайлами по порядку
    ///
    /// Аудиофайлы сортируются по имени. Количество проверяется до
    /// декодирования: при несовпадении ничего не читается с диска.
    pub fn build(&self, captions: Vec<Caption>, mut audio_paths: Vec<PathBuf>) -> Result<Timeline> {
        if captions.is_empty() {
            return Err(CaptionSyncError::InvalidInput(
                "caption list is empty".to_string(),
            ));
        }
        if captions.len() != audio_paths.len() {
            log::error!(
                "Caption count {} does not match audio file count {}",
                captions.len(),
                audio_paths.len()
            );
            return Err(CaptionSyncError::LengthMismatch {
                captions: captions.len(),
                audio: audio_paths.len(),
            });
        }

        sort_by_file_name(&mut audio_paths);

        log::info!("Decoding {} audio segments", audio_paths.len());
        let gap = self.silence_gap_seconds;
        let decoded: Vec<Result<AudioSegment>> = audio_paths
            .par_iter()
            .map(|path| AudioSegment::load(path, gap))
            .collect();

        // Ошибку сообщаем для первого по порядку сегмента
        let mut pairs = Vec::with_capacity(captions.len());
        for (index, (caption, audio)) in captions.into_iter().zip(decoded).enumerate() {
            let audio = audio.map_err(|e| match e {
                CaptionSyncError::AudioDecode { path, message } => CaptionSyncError::AudioDecode {
                    path,
                    message: format!("segment {}: {}", index, message),
                },
                other => other,
            })?;
            log::debug!(
                "Segment {}: {:.3}s audio + {:.3}s gap, {:?}",
                index,
                audio.duration_seconds(),
                audio.silence_gap_seconds(),
                caption.text
            );
            pairs.push((caption, audio));
        }

        let timeline = Timeline::new(pairs)?;
        log::info!(
            "Timeline built: {} segments, {:.3}s total",
            timeline.len(),
            timeline.total_hold_seconds()
        );
        Ok(timeline)
    }
}

/// Отсортировать пути по имени файла, при равенстве по полному пути
pub fn sort_by_file_name(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
}

/// Найти WAV-файлы в директории (без рекурсии), отсортированные по имени
pub fn collect_audio_paths<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(CaptionSyncError::InvalidInput(format!(
            "audio directory not found: {}",
            dir.display()
        )));
    }

    let mut paths = Vec::new();
    // Символьные ссылки на WAV тоже учитываются
    for entry in WalkDir::new(dir).follow_links(true).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_wav = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);
        if is_wav {
            paths.push(entry.into_path());
        }
    }

    sort_by_file_name(&mut paths);
    log::debug!("Found {} audio files in {}", paths.len(), dir.display());
    Ok(paths)
}
