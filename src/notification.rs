//! Модуль для реализации системы уведомлений
//!
//! Конкретные наблюдатели для системы прогресса.

use std::sync::{Arc, Mutex, PoisonError};
use crate::progress::{ProgressInfo, ProgressObserver};

/// Наблюдатель, выводящий прогресс через log
pub struct LogProgressObserver;

impl LogProgressObserver {
    /// Создать новый экземпляр LogProgressObserver
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for LogProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        let details = progress.details.as_deref().unwrap_or("");

        log::info!(
            "[{}] step {:.1}%, total {:.1}%{}",
            progress.step,
            progress.step_progress,
            progress.total_progress,
            if details.is_empty() { String::new() } else { format!(" ({})", details) }
        );
    }
}

/// Наблюдатель, сохраняющий информацию о прогрессе в памяти
#[derive(Clone, Default)]
pub struct MemoryProgressObserver {
    /// История обновлений прогресса
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl MemoryProgressObserver {
    /// Создать новый экземпляр MemoryProgressObserver
    pub fn new() -> Self {
        Self::default()
    }

    /// Получить историю обновлений прогресса
    pub fn history(&self) -> Vec<ProgressInfo> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Очистить историю обновлений прогресса
    pub fn clear_history(&self) {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl ProgressObserver for MemoryProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(progress);
    }
}
