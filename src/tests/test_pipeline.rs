use std::path::{Path, PathBuf};
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::caption::renderer::{CaptionFont, CaptionRenderer};
use crate::caption::Caption;
use crate::config::{CaptionSyncConfig, Rgb};
use crate::error::CaptionSyncError;
use crate::media::background::Background;
use crate::media::audio::AudioSegment;
use crate::media::compositor::{concat_narration, plan_frame_holds, CompositionSummary, Compositor};
use crate::notification::MemoryProgressObserver;
use crate::utils::ffmpeg;
use crate::timeline::Timeline;
use crate::CaptionSync;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

fn system_font_path() -> Option<PathBuf> {
    FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// Создает моно WAV с синусоидой заданной длительности
fn write_tone(path: &Path, sample_rate: u32, seconds: f32) {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    let count = (seconds * sample_rate as f32).round() as usize;
    for i in 0..count {
        let t = i as f32 / sample_rate as f32;
        let value = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.4;
        writer.write_sample((value * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Проект во временной директории: файл субтитров и директория WAV
fn project(lines: &[&str], clips: &[(&str, u32, f32)]) -> (tempfile::TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let text_path = dir.path().join("lines.txt");
    let mut text = lines.join("\n");
    text.push('\n');
    std::fs::write(&text_path, text).unwrap();

    let audio_dir = dir.path().join("wav");
    std::fs::create_dir(&audio_dir).unwrap();
    for (name, rate, seconds) in clips {
        write_tone(&audio_dir.join(name), *rate, *seconds);
    }
    (dir, text_path, audio_dir)
}

fn stream_duration(path: &Path, stream: &str) -> f64 {
    let out = ffmpeg::run_ffprobe_command(&[
        "-v", "error",
        "-select_streams", stream,
        "-show_entries", "stream=duration",
        "-of", "default=noprint_wrappers=1:nokey=1",
        path.to_str().unwrap(),
    ])
    .unwrap();
    out.trim().parse().unwrap()
}

#[test]
fn two_clips_produce_2_6_second_timeline() {
    let (_dir, text, audio) = project(
        &["hello", "world"],
        &[("001.wav", 24000, 1.0), ("002.wav", 24000, 1.0)],
    );
    let sync = CaptionSync::new(CaptionSyncConfig::default()).unwrap();
    let timeline = sync.build_timeline(&text, &audio).unwrap();

    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline.segments()[0].caption.text, "hello");
    assert_eq!(timeline.segments()[1].caption.text, "world");
    assert!((timeline.total_hold_seconds() - 2.6).abs() < 1e-9);

    let holds = plan_frame_holds(&timeline, 24);
    let video = holds.iter().sum::<u64>() as f64 / 24.0;
    assert!((video - 2.6).abs() <= 1.0 / 24.0);
    assert_eq!(concat_narration(&timeline).len(), 62400);
}

#[test]
fn audio_pairs_by_sorted_file_name() {
    let (_dir, text, audio) = project(
        &["first", "second", "third"],
        &[("10.wav", 8000, 0.3), ("02.wav", 8000, 0.1), ("01.wav", 8000, 0.2)],
    );
    let sync = CaptionSync::new(CaptionSyncConfig::default()).unwrap();
    let timeline = sync.build_timeline(&text, &audio).unwrap();

    let sources: Vec<String> = timeline
        .segments()
        .iter()
        .map(|s| s.audio.source().unwrap().file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(sources, vec!["01.wav", "02.wav", "10.wav"]);
    assert_eq!(timeline.segments()[0].caption.text, "first");
    assert!((timeline.segments()[0].audio.duration_seconds() - 0.2).abs() < 1e-9);
}

#[test]
fn missing_audio_file_is_length_mismatch() {
    let (dir, text, audio) = project(
        &["one", "two", "three"],
        &[("001.wav", 24000, 0.5), ("002.wav", 24000, 0.5)],
    );
    let sync = CaptionSync::new(CaptionSyncConfig::default()).unwrap();
    let result = sync.build_timeline(&text, &audio);

    assert!(matches!(
        result,
        Err(CaptionSyncError::LengthMismatch { captions: 3, audio: 2 })
    ));
    assert!(!dir.path().join("video").exists());
}

#[test]
fn length_mismatch_leaves_no_output() {
    let Some(font) = system_font_path() else {
        eprintln!("no system font found, skipping");
        return;
    };
    let (dir, text, audio) = project(&["one", "two", "three"], &[("001.wav", 24000, 0.5)]);
    let output = dir.path().join("video").join("yomiage.mp4");

    let sync = CaptionSync::new(CaptionSyncConfig::default()).unwrap();
    let result = sync.process(&text, &audio, &font, &output);

    assert!(matches!(result, Err(CaptionSyncError::LengthMismatch { .. })));
    assert!(!output.exists());
}

#[test]
fn mixed_sample_rates_fail_before_output() {
    let (dir, text, audio) = project(
        &["one", "two"],
        &[("001.wav", 24000, 0.5), ("002.wav", 44100, 0.5)],
    );
    let sync = CaptionSync::new(CaptionSyncConfig::default()).unwrap();
    let result = sync.build_timeline(&text, &audio);

    match result {
        Err(CaptionSyncError::SampleRateMismatch { index, expected, found }) => {
            assert_eq!((index, expected, found), (1, 24000, 44100));
        }
        other => panic!("expected sample rate mismatch, got {:?}", other.map(|t| t.len())),
    }
    assert!(!dir.path().join("video").exists());
}

#[test]
fn corrupt_clip_reports_segment_index() {
    let (_dir, text, audio) = project(&["one", "two"], &[("001.wav", 24000, 0.5)]);
    std::fs::write(audio.join("002.wav"), b"definitely not audio").unwrap();

    let sync = CaptionSync::new(CaptionSyncConfig::default()).unwrap();
    match sync.build_timeline(&text, &audio) {
        Err(CaptionSyncError::AudioDecode { path, message }) => {
            assert!(path.ends_with("002.wav"));
            assert!(message.starts_with("segment 1"), "{}", message);
        }
        other => panic!("expected decode error, got {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn wrong_background_resolution_is_invalid_asset() {
    let Some(font) = system_font_path() else {
        eprintln!("no system font found, skipping");
        return;
    };
    let font = CaptionFont::load(font, 24.0, Rgb::BLACK).unwrap();
    let wrong = Background::from_rgb(640, 360, vec![0u8; 640 * 360 * 3], (720, 480));
    assert!(matches!(wrong, Err(CaptionSyncError::InvalidAsset(_))));

    let ok = Background::from_rgb(720, 480, vec![0u8; 720 * 480 * 3], (720, 480)).unwrap();
    let renderer = CaptionRenderer::new(ok, font);
    assert_eq!((renderer.width(), renderer.height()), (720, 480));
}

#[test]
fn empty_caption_is_held_for_audio_and_gap() {
    let Some(font) = system_font_path() else {
        eprintln!("no system font found, skipping");
        return;
    };
    let (_dir, text, audio) = project(&[""], &[("001.wav", 24000, 1.0)]);
    let config = CaptionSyncConfig::default();
    let sync = CaptionSync::new(config.clone()).unwrap();
    let timeline = sync.build_timeline(&text, &audio).unwrap();
    assert_eq!(timeline.segments()[0].caption, Caption::new("", 25));

    let renderer = CaptionRenderer::from_config(&config, font).unwrap();
    let frames = Compositor::new(&config, &renderer).render_frames(&timeline).unwrap();
    assert!(frames[0].pixels.chunks(3).all(|p| p == [255, 255, 222]));
    assert_eq!(plan_frame_holds(&timeline, 24), vec![31]);
}

#[test]
fn composes_synchronized_video() {
    let Some(font) = system_font_path() else {
        eprintln!("no system font found, skipping");
        return;
    };
    if !ffmpeg::is_available() {
        eprintln!("ffmpeg not available, skipping");
        return;
    }
    let (dir, text, audio) = project(
        &["hello", "world"],
        &[("001.wav", 24000, 1.0), ("002.wav", 24000, 1.0)],
    );
    let output = dir.path().join("out").join("video").join("yomiage.mp4");

    let sync = CaptionSync::new(CaptionSyncConfig::default()).unwrap();
    let observer = MemoryProgressObserver::new();
    sync.add_observer(Box::new(observer.clone()));

    let summary = sync.process(&text, &audio, &font, &output).unwrap();
    assert!(output.is_file());
    assert_eq!(summary.segments, 2);
    assert_eq!(summary.frame_holds, vec![31, 31]);
    assert!((summary.audio_seconds - 2.6).abs() < 1e-9);

    let period = 1.0 / 24.0;
    let video = stream_duration(&output, "v:0");
    let audio_duration = stream_duration(&output, "a:0");
    assert!((video - 2.6).abs() <= period + 0.01, "video {}", video);
    assert!((audio_duration - 2.6).abs() <= period + 0.05, "audio {}", audio_duration);

    let history = observer.history();
    assert_eq!(history.last().map(|p| p.total_progress), Some(100.0));

    // Рядом с результатом не остаётся временных файлов
    let leftovers: Vec<_> = std::fs::read_dir(output.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".caption-sync-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn encoder_failure_leaves_no_output() {
    let Some(font) = system_font_path() else {
        eprintln!("no system font found, skipping");
        return;
    };
    if !ffmpeg::is_available() {
        eprintln!("ffmpeg not available, skipping");
        return;
    }
    let (dir, text, audio) = project(&["hello"], &[("001.wav", 24000, 0.5)]);
    let output = dir.path().join("video").join("broken.mp4");
    let config = CaptionSyncConfig {
        video_codec: "no-such-codec".to_string(),
        ..CaptionSyncConfig::default()
    };

    let sync = CaptionSync::new(config).unwrap();
    let result = sync.process(&text, &audio, &font, &output);

    // Сообщение содержит жалобу самого ffmpeg, а не только EPIPE
    match result {
        Err(CaptionSyncError::Encode(message)) => {
            assert!(message.contains("no-such-codec"), "{}", message);
        }
        other => panic!("expected encode error, got {:?}", other.map(|s| s.total_frames)),
    }
    assert!(!output.exists());
    let remaining = std::fs::read_dir(output.parent().unwrap()).unwrap().count();
    assert_eq!(remaining, 0);
}

/// Временная шкала в памяти: сегменты по `frames` семплов при 8 кГц
fn memory_timeline(frames: &[usize]) -> Timeline {
    let pairs = frames
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            (
                Caption::new(format!("line {}", i), 25),
                AudioSegment::from_samples(vec![0.1; n], 8000, 1, 0.3).unwrap(),
            )
        })
        .collect();
    Timeline::new(pairs).unwrap()
}

/// Запуск compose с заданной программой вместо ffmpeg
fn compose_with_encoder(program: &str) -> (tempfile::TempDir, PathBuf, crate::Result<CompositionSummary>) {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out").join("video").join("yomiage.mp4");
    let Some(font) = system_font_path() else {
        return (dir, output, Err(CaptionSyncError::InvalidAsset("no system font".to_string())));
    };
    let config = CaptionSyncConfig {
        ffmpeg_program: program.to_string(),
        ..CaptionSyncConfig::default()
    };
    let renderer = CaptionRenderer::from_config(&config, font).unwrap();
    let timeline = memory_timeline(&[8000, 4000, 2000]);
    let result = Compositor::new(&config, &renderer).compose(&timeline, &output);
    (dir, output, result)
}

fn assert_nothing_published(output: &Path) {
    assert!(!output.exists());
    let leftovers: Vec<_> = std::fs::read_dir(output.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert!(leftovers.is_empty(), "left behind: {:?}", leftovers);
}

#[test]
fn missing_encoder_leaves_no_output() {
    if system_font_path().is_none() {
        eprintln!("no system font found, skipping");
        return;
    }
    let (_dir, output, result) = compose_with_encoder("/nonexistent/caption-sync-ffmpeg");

    match result {
        Err(CaptionSyncError::Encode(message)) => {
            assert!(message.contains("was not found"), "{}", message);
        }
        other => panic!("expected encode error, got {:?}", other.map(|s| s.total_frames)),
    }
    assert_nothing_published(&output);
}

#[cfg(unix)]
#[test]
fn encoder_exiting_early_leaves_no_output() {
    if system_font_path().is_none() {
        eprintln!("no system font found, skipping");
        return;
    }
    // `false` завершается сразу, не читая кадры
    let (_dir, output, result) = compose_with_encoder("false");

    match result {
        Err(CaptionSyncError::Encode(message)) => {
            assert!(message.contains("stopped accepting frames"), "{}", message);
        }
        other => panic!("expected encode error, got {:?}", other.map(|s| s.total_frames)),
    }
    assert_nothing_published(&output);
}

#[test]
fn process_starts_with_fresh_progress() {
    let dir = tempfile::tempdir().unwrap();
    let text = dir.path().join("lines.txt");
    std::fs::write(&text, "hello\n").unwrap();
    let audio = dir.path().join("wav");
    std::fs::create_dir(&audio).unwrap();

    let sync = CaptionSync::new(CaptionSyncConfig::default()).unwrap();
    let _ = sync.build_timeline(&text, &audio);
    assert!(sync.tracker.total_progress() > 0.0);

    // Шрифта нет: процесс падает сразу после сброса прогресса
    let result = sync.process(&text, &audio, dir.path().join("missing.ttf"), dir.path().join("out.mp4"));
    assert!(matches!(result, Err(CaptionSyncError::InvalidAsset(_))));
    assert_eq!(sync.tracker.total_progress(), 0.0);
}

/// Скрипт-заменитель ffmpeg: читает все кадры и завершается с кодом `exit_code`
#[cfg(unix)]
fn stand_in_encoder(dir: &Path, exit_code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(format!("encoder-{}.sh", exit_code));
    let script = format!(
        "#!/bin/sh\ncat > /dev/null\necho 'stand-in encoder exit {}' >&2\nexit {}\n",
        exit_code, exit_code
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Повторяет запуск, если свежий скрипт ещё занят параллельным fork (ETXTBSY)
#[cfg(unix)]
fn compose_with_script(script: &Path) -> (tempfile::TempDir, PathBuf, crate::Result<CompositionSummary>) {
    let program = script.to_str().unwrap();
    for _ in 0..5 {
        let attempt = compose_with_encoder(program);
        match &attempt.2 {
            Err(CaptionSyncError::Encode(message)) if message.contains("os error 26") => {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            _ => return attempt,
        }
    }
    compose_with_encoder(program)
}

#[cfg(unix)]
#[test]
fn successful_encoder_publishes_output() {
    if system_font_path().is_none() {
        eprintln!("no system font found, skipping");
        return;
    }
    let scripts = tempfile::tempdir().unwrap();
    let script = stand_in_encoder(scripts.path(), 0);
    let (_dir, output, result) = compose_with_script(&script);

    let summary = result.unwrap();
    assert_eq!(summary.frame_holds, vec![31, 19, 14]);
    assert_eq!(summary.total_frames, 64);
    assert_eq!(summary.output_path, output);
    assert!(output.is_file());

    let entries: Vec<String> = std::fs::read_dir(output.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(entries, vec!["yomiage.mp4"]);
}

#[cfg(unix)]
#[test]
fn failing_encoder_is_mux_error_with_its_stderr() {
    if system_font_path().is_none() {
        eprintln!("no system font found, skipping");
        return;
    }
    let scripts = tempfile::tempdir().unwrap();
    let script = stand_in_encoder(scripts.path(), 3);
    let (_dir, output, result) = compose_with_script(&script);

    match result {
        Err(CaptionSyncError::Mux(message)) => {
            assert!(message.contains("stand-in encoder exit 3"), "{}", message);
        }
        other => panic!("expected mux error, got {:?}", other.map(|s| s.total_frames)),
    }
    assert_nothing_published(&output);
}
