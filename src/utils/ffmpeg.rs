//! Модуль для работы с FFmpeg
//!
//! Этот модуль содержит функции запуска ffmpeg/ffprobe и процесс-кодировщик,
//! принимающий сырые кадры RGB24 через stdin.

use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;
use crate::error::{CaptionSyncError, Result};

/// Проверка наличия FFmpeg
pub fn check_ffmpeg_installed() -> Result<bool> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()?;

    Ok(output.status.success())
}

/// FFmpeg и FFprobe доступны в PATH
pub fn is_available() -> bool {
    let ffprobe = Command::new("ffprobe")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    ffprobe && check_ffmpeg_installed().unwrap_or(false)
}

/// Получение версии FFmpeg
pub fn get_ffmpeg_version() -> Result<String> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()?;

    if !output.status.success() {
        return Err(CaptionSyncError::Encode("Failed to get FFmpeg version".to_string()));
    }

    let version_str = String::from_utf8_lossy(&output.stdout);
    let first_line = version_str.lines().next().unwrap_or("");

    Ok(first_line.to_string())
}

/// Запуск команды FFmpeg с захватом stdout
pub fn run_ffmpeg_capture(args: &[&str]) -> Result<Vec<u8>> {
    let output = Command::new("ffmpeg")
        .args(args)
        .output()?;

    if !output.status.success() {
        return Err(CaptionSyncError::Encode(format!(
            "FFmpeg command failed with status {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(output.stdout)
}

/// Запуск команды FFprobe
pub fn run_ffprobe_command(args: &[&str]) -> Result<String> {
    let output = Command::new("ffprobe")
        .args(args)
        .output()?;

    if !output.status.success() {
        return Err(CaptionSyncError::Encode(format!(
            "FFprobe command failed with status: {}",
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Параметры процесса-кодировщика
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    /// Исполняемый файл ffmpeg
    pub program: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
}

/// Процесс ffmpeg, кодирующий поток кадров и мультиплексирующий его с аудио
///
/// Кадры пишутся в stdin в формате rawvideo/rgb24, аудио подаётся вторым
/// входом из WAV-файла. Процесс завершается либо через [`finish`](Self::finish),
/// либо принудительно при уничтожении объекта.
pub struct FfmpegFrameWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    frame_size: usize,
    frames_written: u64,
}

impl FfmpegFrameWriter {
    /// Запустить ffmpeg
    pub fn spawn(settings: &EncoderSettings, audio_path: &Path, output_path: &Path) -> Result<Self> {
        let frame_size = (settings.width as usize)
            .checked_mul(settings.height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(|| CaptionSyncError::Encode("frame size overflow".to_string()))?;

        let mut command = Command::new(&settings.program);
        command
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-s:v")
            .arg(format!("{}x{}", settings.width, settings.height))
            .arg("-r")
            .arg(settings.fps.to_string())
            .arg("-i")
            .arg("-")
            .arg("-i")
            .arg(audio_path)
            .arg("-map")
            .arg("0:v:0")
            .arg("-map")
            .arg("1:a:0")
            .arg("-c:v")
            .arg(&settings.video_codec)
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg("-r")
            .arg(settings.fps.to_string())
            .arg("-c:a")
            .arg(&settings.audio_codec)
            .arg("-movflags")
            .arg("+faststart")
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        log::debug!("Spawning encoder: {:?}", command);

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                CaptionSyncError::Encode(format!(
                    "{} was not found; install ffmpeg and verify `ffmpeg -version` works",
                    settings.program
                ))
            } else {
                CaptionSyncError::Encode(format!("failed to spawn {}: {}", settings.program, e))
            }
        })?;

        let stdin = child.stdin.take();
        if stdin.is_none() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CaptionSyncError::Encode("failed to capture ffmpeg stdin".to_string()));
        }

        // stderr читаем в отдельном потоке, иначе ffmpeg может заблокироваться
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            })
        });

        Ok(Self {
            child,
            stdin,
            stderr,
            frame_size,
            frames_written: 0,
        })
    }

    /// Записать один кадр
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        if frame.len() != self.frame_size {
            return Err(CaptionSyncError::Encode(format!(
                "frame size mismatch: expected {} bytes, got {}",
                self.frame_size,
                frame.len()
            )));
        }
        let written = match self.stdin.as_mut() {
            Some(stdin) => stdin.write_all(frame),
            None => return Err(CaptionSyncError::Encode("ffmpeg stdin already closed".to_string())),
        };

        // ffmpeg закрыл вход: причина только в его stderr
        if let Err(e) = written {
            let (status, stderr) = self.reap();
            return Err(CaptionSyncError::Encode(format!(
                "ffmpeg stopped accepting frames at frame {} ({}, {}): {}",
                self.frames_written,
                e,
                status,
                stderr_tail(&stderr, 10)
            )));
        }
        self.frames_written += 1;
        Ok(())
    }

    /// Закрыть stdin, дождаться процесса и забрать его stderr
    fn reap(&mut self) -> (String, String) {
        drop(self.stdin.take());
        let status = match self.child.wait() {
            Ok(status) => status.to_string(),
            Err(e) => format!("wait failed: {}", e),
        };
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        (status, stderr)
    }

    /// Закрыть stdin и дождаться завершения ffmpeg
    pub fn finish(mut self) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin
                .flush()
                .map_err(|e| CaptionSyncError::Encode(format!("failed to flush ffmpeg stdin: {}", e)))?;
        }

        let status = self
            .child
            .wait()
            .map_err(|e| CaptionSyncError::Mux(format!("failed waiting for ffmpeg: {}", e)))?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(CaptionSyncError::Mux(format!(
                "ffmpeg failed with status {}: {}",
                status,
                stderr_tail(&stderr, 10)
            )));
        }
        if !stderr.trim().is_empty() {
            log::warn!("ffmpeg reported: {}", stderr_tail(&stderr, 10));
        }
        Ok(())
    }
}

impl Drop for FfmpegFrameWriter {
    fn drop(&mut self) {
        // Процесс не завершён через finish: останавливаем его
        if self.stdin.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
            if let Some(handle) = self.stderr.take() {
                let _ = handle.join();
            }
        }
    }
}

/// Последние `lines` строк вывода ffmpeg
fn stderr_tail(stderr: &str, lines: usize) -> String {
    let all: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
