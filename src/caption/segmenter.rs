//! Разбиение текста субтитров на строки
//!
//! Перенос выполняется жёстко по количеству символов, без учёта границ слов.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use crate::error::{CaptionSyncError, Result};

/// Разбить текст на последовательные фрагменты длиной `width` символов
///
/// Последний фрагмент может быть короче. Пробелы не обрезаются и не
/// схлопываются. Пустой текст даёт пустой список строк.
pub fn wrap(text: &str, width: usize) -> Result<Vec<String>> {
    if width == 0 {
        return Err(CaptionSyncError::InvalidInput(
            "wrap width must be greater than zero".to_string(),
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    Ok(chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect())
}

/// Прочитать файл субтитров: одна запись на строку, порядок сохраняется
///
/// Пустые строки остаются пустыми субтитрами.
pub fn read_caption_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        log::error!("Failed to open caption file {}: {}", path.display(), e);
        e
    })?;

    let lines = BufReader::new(file)
        .lines()
        .map(|line| line.map(|l| l.trim_end_matches('\r').to_string()))
        .collect::<std::io::Result<Vec<String>>>()?;

    log::debug!("Read {} caption lines from {}", lines.len(), path.display());
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_chars_split_into_three_lines() {
        let text = "a".repeat(60);
        let lines = wrap(&text, 25).unwrap();
        let lengths: Vec<usize> = lines.iter().map(|l| l.chars().count()).collect();
        assert_eq!(lengths, vec![25, 25, 10]);
    }

    #[test]
    fn short_text_is_single_line() {
        assert_eq!(wrap("hello", 25).unwrap(), vec!["hello".to_string()]);
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert!(wrap("", 25).unwrap().is_empty());
    }

    #[test]
    fn zero_width_is_rejected() {
        assert!(matches!(wrap("abc", 0), Err(CaptionSyncError::InvalidInput(_))));
    }

    #[test]
    fn chunks_concatenate_back_to_input() {
        let samples = [
            "",
            " leading and trailing ",
            "こんにちは、世界。今日はいい天気ですね。",
            "mixed ascii и кириллица with emoji 🎬🎬",
            "exactly-ten",
        ];
        for text in samples {
            for width in 1..=12 {
                let lines = wrap(text, width).unwrap();
                assert_eq!(lines.concat(), text, "width {}", width);
                if let Some((last, rest)) = lines.split_last() {
                    assert!(rest.iter().all(|l| l.chars().count() == width));
                    assert!(last.chars().count() <= width && !last.is_empty());
                }
            }
        }
    }

    #[test]
    fn wrapping_counts_characters_not_bytes() {
        let lines = wrap("あいうえおかきくけこ", 4).unwrap();
        assert_eq!(lines, vec!["あいうえ", "おかきく", "けこ"]);
    }

    #[test]
    fn caption_file_keeps_order_and_blank_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.txt");
        std::fs::write(&path, "first\r\n\nthird\n").unwrap();

        let lines = read_caption_lines(&path).unwrap();
        assert_eq!(lines, vec!["first", "", "third"]);
    }

    #[test]
    fn missing_caption_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_caption_lines(dir.path().join("absent.txt"));
        assert!(matches!(result, Err(CaptionSyncError::Io(_))));
    }
}
