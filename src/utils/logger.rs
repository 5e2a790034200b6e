use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

const DEFAULT_FILTER: &str = "warn,caption_sync=info";

/// Инициализация логгера для бинарного файла
///
/// Фильтр по умолчанию переопределяется переменной окружения RUST_LOG.
pub fn init_logger(verbose: bool) {
    let env = Env::default().filter_or("RUST_LOG", DEFAULT_FILTER);
    let mut builder = Builder::from_env(env);

    if verbose {
        builder.filter_module("caption_sync", LevelFilter::Debug);
    }

    builder
        // Декодеры symphonia слишком разговорчивы
        .filter_module("symphonia_core", LevelFilter::Warn)
        .filter_module("symphonia_bundle_mp3", LevelFilter::Warn)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();
}
