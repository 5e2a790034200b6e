//! Основной файл библиотеки caption-sync
//!
//! Библиотека собирает видео из набора озвученных реплик: каждая реплика
//! показывается неподвижным кадром с субтитром, пока звучит её аудио и
//! следующая за ним пауза. Кадры и аудио склеиваются и мультиплексируются
//! в один файл.
//!
//! ```no_run
//! use caption_sync::{CaptionSync, CaptionSyncConfig};
//!
//! let sync = CaptionSync::new(CaptionSyncConfig::default())?;
//! let summary = sync.process("lines.txt", "wav/", "font.ttf", "artifacts/video/yomiage.mp4")?;
//! println!("{} frames", summary.total_frames);
//! # Ok::<(), caption_sync::CaptionSyncError>(())
//! ```

pub mod caption;
pub mod config;
pub mod error;
pub mod media;
pub mod notification;
pub mod progress;
pub mod timeline;
pub mod utils;

#[cfg(test)]
mod tests;

use std::path::Path;

pub use crate::caption::renderer::{CaptionFont, CaptionRenderer, RenderedFrame};
pub use crate::caption::Caption;
pub use crate::config::{CaptionSyncConfig, Rgb};
pub use crate::error::{CaptionSyncError, Result};
pub use crate::media::audio::AudioSegment;
pub use crate::media::background::Background;
pub use crate::media::compositor::{CompositionSummary, Compositor};
pub use crate::timeline::{Timeline, TimelineBuilder, TimelineSegment};

use crate::progress::{ProcessStep, ProgressObserver, ProgressTracker};

/// Основная структура для работы с библиотекой
pub struct CaptionSync {
    /// Конфигурация проекта
    config: CaptionSyncConfig,
    /// Трекер прогресса
    tracker: ProgressTracker,
}

impl CaptionSync {
    /// Создать новый экземпляр CaptionSync с указанной конфигурацией
    ///
    /// Конфигурация проверяется сразу.
    pub fn new(config: CaptionSyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tracker: ProgressTracker::new(),
        })
    }

    /// Добавить наблюдателя прогресса
    pub fn add_observer(&self, observer: Box<dyn ProgressObserver>) -> usize {
        self.tracker.add_observer(observer)
    }

    /// Прочитать субтитры и сопоставить их с аудиофайлами директории
    pub fn build_timeline<P: AsRef<Path>, Q: AsRef<Path>>(&self, text_path: P, audio_dir: Q) -> Result<Timeline> {
        self.tracker.set_step(ProcessStep::CaptionLoading);
        let lines = caption::segmenter::read_caption_lines(text_path)?;
        let captions = caption::captions_from_lines(lines, self.config.wrap_width);
        let audio_paths = timeline::collect_audio_paths(audio_dir)?;
        self.tracker.update_step_progress(
            100.0,
            Some(format!("{} captions, {} audio files", captions.len(), audio_paths.len())),
        );

        self.tracker.set_step(ProcessStep::AudioDecoding);
        TimelineBuilder::new(&self.config).build(captions, audio_paths)
    }

    /// Основной метод: собрать видео из файла субтитров и директории WAV
    pub fn process<P, Q, F, O>(&self, text_path: P, audio_dir: Q, font_path: F, output_path: O) -> Result<CompositionSummary>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        F: AsRef<Path>,
        O: AsRef<Path>,
    {
        log::info!("Starting caption composition");
        self.tracker.reset();

        // Ресурсы проверяем до декодирования аудио
        let renderer = CaptionRenderer::from_config(&self.config, font_path)?;
        let timeline = self.build_timeline(text_path, audio_dir)?;

        Compositor::new(&self.config, &renderer)
            .with_progress(&self.tracker)
            .compose(&timeline, output_path)
    }
}

/// Публичный API для удобного использования с настройками по умолчанию
pub fn compose_video<P, Q, F, O>(text_path: P, audio_dir: Q, font_path: F, output_path: O) -> Result<CompositionSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    F: AsRef<Path>,
    O: AsRef<Path>,
{
    CaptionSync::new(CaptionSyncConfig::default())?.process(text_path, audio_dir, font_path, output_path)
}
