//! Модуль для работы с медиа: аудиосегменты, фон кадра и сборка видео

pub mod audio;
pub mod background;
pub mod compositor;
