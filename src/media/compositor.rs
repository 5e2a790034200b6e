//! Модуль сборки итогового видео
//!
//! Каждый кадр рисуется один раз и удерживается нужное число видеокадров,
//! аудиосегменты с паузами склеиваются в одну дорожку, после чего оба
//! потока передаются ffmpeg. Кадры рисуются пачками по числу потоков rayon
//! и сразу уходят в кодировщик, так что в памяти держится только пачка.
//! Результат появляется по целевому пути только после успешного
//! завершения кодировщика.

use std::path::{Path, PathBuf};
use rayon::prelude::*;
use crate::caption::renderer::{CaptionRenderer, RenderedFrame};
use crate::config::CaptionSyncConfig;
use crate::error::{CaptionSyncError, Result};
use crate::media::audio::write_wav;
use crate::progress::{ProcessStep, ProgressTracker};
use crate::timeline::{Timeline, TimelineSegment};
use crate::utils::ffmpeg::{EncoderSettings, FfmpegFrameWriter};
use crate::utils::temp::TempFileManager;

/// Итог сборки видео
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionSummary {
    /// Путь к готовому файлу
    pub output_path: PathBuf,
    /// Количество сегментов
    pub segments: usize,
    /// Количество видеокадров по сегментам
    pub frame_holds: Vec<u64>,
    /// Общее количество видеокадров
    pub total_frames: u64,
    /// Общее количество аудиосемплов (все каналы)
    pub total_samples: usize,
    /// Длительность видеодорожки в секундах
    pub video_seconds: f64,
    /// Длительность аудиодорожки в секундах
    pub audio_seconds: f64,
}

/// Количество видеокадров для каждого сегмента
///
/// Считается по накопленным границам сегментов:
/// `round(end * fps) - round(start * fps)`, минимум один кадр. Так ошибка
/// округления не накапливается, и длина видео отличается от длины аудио
/// не более чем на половину кадра (если ни один сегмент не короче кадра).
pub fn plan_frame_holds(timeline: &Timeline, fps: u32) -> Vec<u64> {
    let boundaries = timeline.segment_boundaries();
    let fps = fps as f64;
    let mut holds = Vec::with_capacity(timeline.len());
    let mut emitted = 0u64;

    for end in boundaries.iter().skip(1) {
        let target_end = (end * fps).round() as u64;
        let frames = target_end.saturating_sub(emitted).max(1);
        emitted += frames;
        holds.push(frames);
    }
    holds
}

/// Склеить аудиосегменты с паузами в одну дорожку
pub fn concat_narration(timeline: &Timeline) -> Vec<f32> {
    let total = timeline.total_hold_frames() * timeline.channels() as usize;
    let mut out = Vec::with_capacity(total);
    for segment in timeline.segments() {
        out.extend(segment.audio.with_trailing_silence());
    }
    out
}

/// Сборщик видео
pub struct Compositor<'a> {
    config: &'a CaptionSyncConfig,
    renderer: &'a CaptionRenderer,
    tracker: Option<&'a ProgressTracker>,
}

impl<'a> Compositor<'a> {
    /// Создать сборщик
    pub fn new(config: &'a CaptionSyncConfig, renderer: &'a CaptionRenderer) -> Self {
        Self {
            config,
            renderer,
            tracker: None,
        }
    }

    /// Подключить трекер прогресса
    pub fn with_progress(mut self, tracker: &'a ProgressTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Отрисовать кадры всех сегментов
    ///
    /// Кадры рисуются параллельно, результат в порядке временной шкалы.
    pub fn render_frames(&self, timeline: &Timeline) -> Result<Vec<RenderedFrame>> {
        self.step(ProcessStep::FrameRendering, "rendering frames".to_string());
        let frames = self.render_segments(timeline.segments())?;
        log::debug!("Rendered {} frames", frames.len());
        Ok(frames)
    }

    fn render_segments(&self, segments: &[TimelineSegment]) -> Result<Vec<RenderedFrame>> {
        let rendered: Vec<Result<RenderedFrame>> = segments
            .par_iter()
            .map(|segment| {
                self.renderer
                    .render(&segment.caption)
                    .map_err(|e| CaptionSyncError::Render {
                        index: segment.index,
                        message: e.to_string(),
                    })
            })
            .collect();

        rendered.into_iter().collect()
    }

    /// Собрать видео и записать его в `output_path`
    ///
    /// Либо по пути появляется полный файл, либо ничего не появляется.
    pub fn compose<P: AsRef<Path>>(&self, timeline: &Timeline, output_path: P) -> Result<CompositionSummary> {
        let output_path = output_path.as_ref();
        if timeline.is_empty() {
            return Err(CaptionSyncError::InvalidInput(
                "timeline has no segments".to_string(),
            ));
        }
        let fps = self.config.fps;
        if fps == 0 {
            return Err(CaptionSyncError::Configuration(
                "frame rate must be greater than zero".to_string(),
            ));
        }

        log::info!(
            "Composing {} segments into {} at {} fps",
            timeline.len(),
            output_path.display(),
            fps
        );

        let frame_holds = plan_frame_holds(timeline, fps);
        let total_frames: u64 = frame_holds.iter().sum();

        self.step(ProcessStep::AudioConcatenation, "concatenating narration".to_string());
        let narration = concat_narration(timeline);
        let audio_seconds = timeline.total_hold_seconds();
        let video_seconds = total_frames as f64 / fps as f64;
        log::debug!(
            "Narration: {} samples ({:.3}s), video: {} frames ({:.3}s)",
            narration.len(),
            audio_seconds,
            total_frames,
            video_seconds
        );

        let temp = TempFileManager::new(self.config.keep_temp_files)?;
        let narration_path = temp.temp_file_path("narration", "wav");
        write_wav(&narration_path, &narration, timeline.sample_rate(), timeline.channels())?;

        let staging = stage_output(output_path)?;

        self.step(ProcessStep::Encoding, format!("rendering and encoding {} frames", total_frames));
        let settings = EncoderSettings {
            program: self.config.ffmpeg_program.clone(),
            width: self.renderer.width(),
            height: self.renderer.height(),
            fps,
            video_codec: self.config.video_codec.clone(),
            audio_codec: self.config.audio_codec.clone(),
        };
        let mut writer = FfmpegFrameWriter::spawn(&settings, &narration_path, &staging)?;

        let batch = rayon::current_num_threads().max(1);
        let mut written = 0u64;
        for chunk in timeline.segments().chunks(batch) {
            let frames = self.render_segments(chunk)?;
            for (segment, frame) in chunk.iter().zip(&frames) {
                let hold = frame_holds[segment.index];
                for _ in 0..hold {
                    writer.write_frame(&frame.pixels)?;
                }
                written += hold;
                if let Some(tracker) = self.tracker {
                    tracker.update_step_progress(
                        written as f32 / total_frames as f32 * 100.0,
                        Some(format!("segment {}/{}", segment.index + 1, timeline.len())),
                    );
                }
            }
        }
        writer.finish()?;

        staging.persist(output_path).map_err(|e| {
            CaptionSyncError::Mux(format!(
                "failed to move output into place at {}: {}",
                output_path.display(),
                e.error
            ))
        })?;

        if let Some(tracker) = self.tracker {
            tracker.complete();
        }
        log::info!(
            "Wrote {} ({:.3}s video, {:.3}s audio)",
            output_path.display(),
            video_seconds,
            audio_seconds
        );

        Ok(CompositionSummary {
            output_path: output_path.to_path_buf(),
            segments: timeline.len(),
            frame_holds,
            total_frames,
            total_samples: narration.len(),
            video_seconds,
            audio_seconds,
        })
    }

    fn step(&self, step: ProcessStep, details: String) {
        if let Some(tracker) = self.tracker {
            tracker.set_step(step);
            tracker.update_step_progress(0.0, Some(details));
        }
    }
}

/// Временный файл рядом с целевым путём
///
/// Расширение сохраняется, чтобы ffmpeg выбрал тот же контейнер.
/// Файл удаляется при уничтожении, если не был перемещён.
fn stage_output(output_path: &Path) -> Result<tempfile::TempPath> {
    let parent = match output_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let suffix = output_path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let file = tempfile::Builder::new()
        .prefix(".caption-sync-")
        .suffix(&suffix)
        .tempfile_in(&parent)?;
    Ok(file.into_temp_path())
}
