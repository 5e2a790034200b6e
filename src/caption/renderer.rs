//! Отрисовка кадра с субтитром
//!
//! Кадр = фон + блок перенесённых строк, отцентрованный по обеим осям.
//! Строки рисуются выровненными по левому краю от общей точки привязки.
//! Отрисовка детерминирована: одинаковые входные данные дают побайтно
//! одинаковый результат.

use std::path::Path;
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};
use crate::caption::Caption;
use crate::config::{CaptionSyncConfig, Rgb};
use crate::error::{CaptionSyncError, Result};
use crate::media::background::Background;

/// Шрифт субтитров: гарнитура, размер и цвет
pub struct CaptionFont {
    font: Font,
    size: f32,
    color: Rgb,
}

impl CaptionFont {
    /// Загрузить шрифт из файла
    pub fn load<P: AsRef<Path>>(path: P, size: f32, color: Rgb) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            CaptionSyncError::InvalidAsset(format!("failed to read font {}: {}", path.display(), e))
        })?;
        Self::from_bytes(bytes, size, color).map_err(|e| match e {
            CaptionSyncError::InvalidAsset(msg) => {
                CaptionSyncError::InvalidAsset(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Разобрать шрифт из байтов TTF/OTF
    pub fn from_bytes(bytes: Vec<u8>, size: f32, color: Rgb) -> Result<Self> {
        if !size.is_finite() || size <= 0.0 {
            return Err(CaptionSyncError::InvalidAsset(format!("invalid font size {}", size)));
        }
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| CaptionSyncError::InvalidAsset(format!("failed to parse font: {}", e)))?;
        Ok(Self { font, size, color })
    }

    /// Высота строки в пикселях
    pub fn line_height(&self) -> u32 {
        self.font
            .horizontal_line_metrics(self.size)
            .map(|m| m.new_line_size)
            .unwrap_or(self.size * 1.2)
            .ceil()
            .max(1.0) as u32
    }

    /// Ширина строки в пикселях
    ///
    /// Измеряется той же раскладкой, что и при отрисовке (с кернингом):
    /// правый край самого правого видимого глифа.
    pub fn line_width(&self, line: &str) -> u32 {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        self.layout_line(&mut layout, line, 0.0, 0.0);
        layout
            .glyphs()
            .iter()
            .filter(|g| g.width > 0 && g.height > 0)
            .map(|g| g.x.round() as i64 + g.width as i64)
            .max()
            .unwrap_or(0)
            .max(0) as u32
    }

    fn layout_line(&self, layout: &mut Layout, line: &str, x: f32, y: f32) {
        layout.reset(&LayoutSettings {
            x,
            y,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(line, self.size, 0));
    }
}

/// Готовый кадр в формате RGB24 (ширина × высота × 3 байта)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Размеры и положение блока текста на кадре
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub x: i64,
    pub y: i64,
    pub line_height: u32,
}

/// Отрисовщик кадров; фон и шрифт общие для всех кадров проекта
pub struct CaptionRenderer {
    background: Background,
    font: CaptionFont,
}

impl CaptionRenderer {
    /// Создать отрисовщик
    pub fn new(background: Background, font: CaptionFont) -> Self {
        Self { background, font }
    }

    /// Создать отрисовщик по конфигурации проекта
    pub fn from_config<P: AsRef<Path>>(config: &CaptionSyncConfig, font_path: P) -> Result<Self> {
        let font = CaptionFont::load(font_path, config.font_size, config.font_color)?;
        let background = Background::from_config(config)?;
        Ok(Self::new(background, font))
    }

    pub fn width(&self) -> u32 {
        self.background.width()
    }

    pub fn height(&self) -> u32 {
        self.background.height()
    }

    /// Рассчитать блок текста субтитра
    pub fn layout(&self, caption: &Caption) -> Result<TextBlock> {
        let lines = caption.wrapped_lines()?;
        let line_height = self.font.line_height();
        let width = lines.iter().map(|l| self.font.line_width(l)).max().unwrap_or(0);
        let height = line_height * lines.len() as u32;
        let (x, y) = center_anchor(self.width(), self.height(), width, height);

        Ok(TextBlock {
            lines,
            width,
            height,
            x,
            y,
            line_height,
        })
    }

    /// Отрисовать кадр
    pub fn render(&self, caption: &Caption) -> Result<RenderedFrame> {
        let block = self.layout(caption)?;
        let mut pixels = self.background.pixels().to_vec();

        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        for (i, line) in block.lines.iter().enumerate() {
            let top = block.y + (i as i64) * block.line_height as i64;
            self.font.layout_line(&mut layout, line, block.x as f32, top as f32);

            for glyph in layout.glyphs() {
                if glyph.width == 0 || glyph.height == 0 {
                    continue;
                }
                let (_, bitmap) = self.font.font.rasterize_config(glyph.key);
                blend_glyph(
                    &mut pixels,
                    self.width(),
                    self.height(),
                    glyph.x.round() as i64,
                    glyph.y.round() as i64,
                    glyph.width,
                    glyph.height,
                    &bitmap,
                    self.font.color,
                );
            }
        }

        Ok(RenderedFrame {
            width: self.width(),
            height: self.height(),
            pixels,
        })
    }
}

/// Точка привязки блока: `floor((W - w) / 2)`, `floor((H - h) / 2)`
///
/// Для блока больше кадра координаты отрицательны.
pub fn center_anchor(canvas_width: u32, canvas_height: u32, block_width: u32, block_height: u32) -> (i64, i64) {
    let x = (canvas_width as i64 - block_width as i64).div_euclid(2);
    let y = (canvas_height as i64 - block_height as i64).div_euclid(2);
    (x, y)
}

#[allow(clippy::too_many_arguments)]
fn blend_glyph(
    frame: &mut [u8],
    frame_width: u32,
    frame_height: u32,
    x: i64,
    y: i64,
    glyph_width: usize,
    glyph_height: usize,
    bitmap: &[u8],
    color: Rgb,
) {
    let color = color.channels();
    for row in 0..glyph_height {
        let py = y + row as i64;
        if py < 0 || py >= frame_height as i64 {
            continue;
        }
        for col in 0..glyph_width {
            let px = x + col as i64;
            if px < 0 || px >= frame_width as i64 {
                continue;
            }
            let coverage = u16::from(bitmap[row * glyph_width + col]);
            if coverage == 0 {
                continue;
            }
            let inverse = 255 - coverage;
            let idx = ((py as usize) * frame_width as usize + px as usize) * 3;
            for channel in 0..3 {
                let dst = u16::from(frame[idx + channel]);
                let src = u16::from(color[channel]);
                frame[idx + channel] = ((src * coverage + dst * inverse + 127) / 255) as u8;
            }
        }
    }
}
