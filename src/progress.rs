//! Модуль для отслеживания прогресса выполнения операций
//!
//! Реализация паттерна Observer: трекер рассылает обновления всем
//! зарегистрированным наблюдателям. Трекер можно использовать из нескольких
//! потоков (кадры рисуются параллельно).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use serde::{Deserialize, Serialize};

/// Информация о прогрессе выполнения операции
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Текущий этап операции
    pub step: String,
    /// Процент выполнения текущего этапа (0.0 - 100.0)
    pub step_progress: f32,
    /// Общий процент выполнения всей операции (0.0 - 100.0)
    pub total_progress: f32,
    /// Дополнительная информация о текущем этапе
    pub details: Option<String>,
}

impl ProgressInfo {
    /// Создает новый экземпляр ProgressInfo
    pub fn new(step: impl Into<String>, step_progress: f32, total_progress: f32, details: Option<String>) -> Self {
        Self {
            step: step.into(),
            step_progress: step_progress.clamp(0.0, 100.0),
            total_progress: total_progress.clamp(0.0, 100.0),
            details,
        }
    }
}

/// Трейт для наблюдателя, получающего уведомления о прогрессе
pub trait ProgressObserver: Send + Sync {
    /// Метод, вызываемый при обновлении прогресса
    fn on_progress_update(&self, progress: ProgressInfo);
}

/// Этапы сборки видео
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessStep {
    /// Чтение субтитров и поиск аудиофайлов
    CaptionLoading,
    /// Декодирование аудио
    AudioDecoding,
    /// Отрисовка кадров
    FrameRendering,
    /// Склейка аудиодорожки
    AudioConcatenation,
    /// Отрисовка пачками, кодирование и мультиплексирование
    Encoding,
}

impl ProcessStep {
    /// Получить название этапа в виде строки
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaptionLoading => "caption loading",
            Self::AudioDecoding => "audio decoding",
            Self::FrameRendering => "frame rendering",
            Self::AudioConcatenation => "audio concatenation",
            Self::Encoding => "encoding",
        }
    }

    /// Получить весовой коэффициент этапа (в процентах от общего процесса)
    pub fn weight(&self) -> f32 {
        match self {
            Self::CaptionLoading => 5.0,
            Self::AudioDecoding => 15.0,
            Self::FrameRendering => 20.0,
            Self::AudioConcatenation => 5.0,
            Self::Encoding => 55.0,
        }
    }
}

struct TrackerState {
    current_step: ProcessStep,
    step_progress: f32,
    completed_steps: HashMap<ProcessStep, f32>,
}

impl TrackerState {
    fn initial() -> Self {
        Self {
            current_step: ProcessStep::CaptionLoading,
            step_progress: 0.0,
            completed_steps: HashMap::new(),
        }
    }
}

/// Трекер прогресса для отслеживания выполнения процесса
pub struct ProgressTracker {
    observers: Mutex<HashMap<usize, Box<dyn ProgressObserver>>>,
    next_id: AtomicUsize,
    state: Mutex<TrackerState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProgressTracker {
    /// Создать новый экземпляр ProgressTracker
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
            state: Mutex::new(TrackerState::initial()),
        }
    }

    /// Сбросить прогресс к началу процесса
    ///
    /// Наблюдатели сохраняются.
    pub fn reset(&self) {
        *lock(&self.state) = TrackerState::initial();
    }

    /// Добавить наблюдателя
    ///
    /// Возвращает идентификатор, по которому наблюдателя можно удалить.
    pub fn add_observer(&self, observer: Box<dyn ProgressObserver>) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.observers).insert(id, observer);
        id
    }

    /// Удалить наблюдателя по идентификатору
    pub fn remove_observer(&self, id: usize) -> Option<Box<dyn ProgressObserver>> {
        lock(&self.observers).remove(&id)
    }

    /// Установить текущий этап
    ///
    /// Предыдущий этап считается завершённым на 100%.
    pub fn set_step(&self, step: ProcessStep) {
        let info = {
            let mut state = lock(&self.state);
            if state.current_step == step {
                return;
            }
            let previous = state.current_step;
            state.completed_steps.insert(previous, 100.0);
            state.current_step = step;
            state.step_progress = 0.0;
            Self::snapshot(&state, None)
        };
        self.notify(info);
    }

    /// Обновить прогресс текущего этапа
    pub fn update_step_progress(&self, progress: f32, details: Option<String>) {
        let info = {
            let mut state = lock(&self.state);
            state.step_progress = progress.clamp(0.0, 100.0);
            Self::snapshot(&state, details)
        };
        self.notify(info);
    }

    /// Отметить завершение всего процесса
    pub fn complete(&self) {
        let info = {
            let mut state = lock(&self.state);
            let current = state.current_step;
            state.completed_steps.insert(current, 100.0);
            state.step_progress = 100.0;
            ProgressInfo::new(current.as_str(), 100.0, 100.0, Some("done".to_string()))
        };
        self.notify(info);
    }

    /// Текущий общий прогресс (0.0 - 100.0)
    pub fn total_progress(&self) -> f32 {
        Self::total(&lock(&self.state))
    }

    fn total(state: &TrackerState) -> f32 {
        let mut total = 0.0;
        let mut total_weight = 0.0;
        for (step, progress) in &state.completed_steps {
            if *step != state.current_step {
                total += step.weight() * progress / 100.0;
                total_weight += step.weight();
            }
        }
        total += state.current_step.weight() * state.step_progress / 100.0;
        total_weight += state.current_step.weight();
        (total / total_weight * 100.0).clamp(0.0, 100.0)
    }

    fn snapshot(state: &TrackerState, details: Option<String>) -> ProgressInfo {
        ProgressInfo::new(
            state.current_step.as_str(),
            state.step_progress,
            Self::total(state),
            details,
        )
    }

    fn notify(&self, info: ProgressInfo) {
        let observers = lock(&self.observers);
        for observer in observers.values() {
            observer.on_progress_update(info.clone());
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
