use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Parser;
use caption_sync::notification::LogProgressObserver;
use caption_sync::utils::{ffmpeg, logger};
use caption_sync::{CaptionSync, CaptionSyncConfig};

/// Сборка видео из субтитров и озвучки
#[derive(Debug, Parser)]
#[command(name = "caption-sync", version, about = "Compose captioned frames and narration clips into one video")]
struct Cli {
    /// Text file with one caption per line
    text_path: PathBuf,

    /// Directory with one .wav file per caption (paired by sorted file name)
    audio_dir: PathBuf,

    /// TrueType/OpenType font used for captions
    #[arg(long, default_value = "./src/inputs/MPLUS1-Bold.ttf")]
    font_path: PathBuf,

    /// Output directory; the video is written to <output_dir>/video/
    #[arg(long, default_value = "artifacts")]
    output_dir: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Background image (must match the canvas size)
    #[arg(long)]
    background: Option<PathBuf>,

    /// Output file name inside <output_dir>/video/
    #[arg(long)]
    output_name: Option<String>,

    /// Frame rate of the output video
    #[arg(long)]
    fps: Option<u32>,

    /// Caption font size in points
    #[arg(long)]
    font_size: Option<f32>,

    /// Maximum characters per caption line
    #[arg(long)]
    wrap_width: Option<usize>,

    /// Silence appended after each clip, in seconds
    #[arg(long)]
    silence_gap: Option<f64>,

    /// Keep intermediate files
    #[arg(long)]
    keep_temp: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Конфигурация: файл, затем флаги командной строки
    fn resolve_config(&self) -> Result<CaptionSyncConfig> {
        let mut config = match &self.config {
            Some(path) => CaptionSyncConfig::from_json_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => CaptionSyncConfig::default(),
        };

        if let Some(background) = &self.background {
            config.background_image = Some(background.clone());
        }
        if let Some(name) = &self.output_name {
            config.output_file_name = name.clone();
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(size) = self.font_size {
            config.font_size = size;
        }
        if let Some(width) = self.wrap_width {
            config.wrap_width = width;
        }
        if let Some(gap) = self.silence_gap {
            config.silence_gap_seconds = gap;
        }
        if self.keep_temp {
            config.keep_temp_files = true;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_logger(cli.verbose);

    match ffmpeg::get_ffmpeg_version() {
        Ok(version) => log::debug!("Using {}", version),
        Err(e) => log::warn!("ffmpeg is not available: {}", e),
    }

    let config = cli.resolve_config()?;
    let output_path = cli.output_dir.join("video").join(&config.output_file_name);

    let sync = CaptionSync::new(config).context("invalid configuration")?;
    sync.add_observer(Box::new(LogProgressObserver::new()));

    let summary = sync
        .process(&cli.text_path, &cli.audio_dir, &cli.font_path, &output_path)
        .map_err(|e| {
            if let Some(index) = e.segment_index() {
                log::error!("Composition failed at segment {} ({})", index, cli.text_path.display());
            }
            e
        })
        .with_context(|| format!("failed to compose {}", output_path.display()))?;

    log::info!(
        "{} segments, {} frames, {:.2}s",
        summary.segments,
        summary.total_frames,
        summary.audio_seconds
    );
    println!("{}", summary.output_path.display());
    Ok(())
}
