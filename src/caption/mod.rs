//! Модуль для работы с субтитрами
//!
//! Содержит модель субтитра, перенос строк и отрисовку кадров.

pub mod renderer;
pub mod segmenter;

use crate::error::Result;

/// Один субтитр, привязанный к одному аудиосегменту
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    /// Текст субтитра
    pub text: String,
    /// Максимальное количество символов в строке
    pub wrap_width: usize,
}

impl Caption {
    /// Создать новый экземпляр Caption
    pub fn new(text: impl Into<String>, wrap_width: usize) -> Self {
        Self {
            text: text.into(),
            wrap_width,
        }
    }

    /// Строки субтитра после переноса
    pub fn wrapped_lines(&self) -> Result<Vec<String>> {
        segmenter::wrap(&self.text, self.wrap_width)
    }
}

/// Создать субтитры из списка строк с общей шириной переноса
pub fn captions_from_lines<I, S>(lines: I, wrap_width: usize) -> Vec<Caption>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    lines
        .into_iter()
        .map(|line| Caption::new(line, wrap_width))
        .collect()
}
