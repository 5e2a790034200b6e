//! Модуль для работы с временными файлами
//!
//! Временные файлы живут в уникальной директории одного запуска и удаляются
//! вместе с ней при уничтожении менеджера.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use crate::error::Result;

/// Менеджер временных файлов
pub struct TempFileManager {
    /// Временная директория
    temp_dir: Option<TempDir>,
    /// Нужно ли сохранить файлы после завершения
    keep: bool,
}

impl TempFileManager {
    /// Создать новый экземпляр TempFileManager
    pub fn new(keep: bool) -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("caption-sync-")
            .tempdir()?;

        Ok(Self {
            temp_dir: Some(temp_dir),
            keep,
        })
    }

    /// Получить уникальный путь для временного файла
    ///
    /// Файл не создаётся: путь передаётся внешнему процессу или писателю.
    pub fn temp_file_path(&self, prefix: &str, extension: &str) -> PathBuf {
        let file_name = format!("{}_{}.{}", prefix, uuid::Uuid::new_v4(), extension);
        self.temp_dir_path().join(file_name)
    }

    /// Получить путь к временной директории
    pub fn temp_dir_path(&self) -> &Path {
        match &self.temp_dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }
}

impl Drop for TempFileManager {
    fn drop(&mut self) {
        if let Some(dir) = self.temp_dir.take() {
            if self.keep {
                let path = dir.into_path();
                log::info!("Keeping temporary files in {}", path.display());
            } else if let Err(e) = dir.close() {
                log::warn!("Failed to remove temporary directory: {}", e);
            }
        }
    }
}
