//! String and filesystem helpers shared by the stages.
//!
//! - Character-safe truncation for logs and API field limits
//! - Slugs and artifact file stems
//! - Output directory validation

use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Cuts on a character boundary, so multi-byte text (Korean headlines, for
/// instance) never panics, and appends `"…(+N bytes)"` with the dropped size.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Keep at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Convert a title to a filesystem and URL friendly slug.
///
/// Lowercases the text, removes anything that is neither alphanumeric, a
/// space nor a hyphen, and replaces spaces with hyphens. Non-Latin letters
/// are alphanumeric and survive.
///
/// ```ignore
/// assert_eq!(slugify_title("Hello World"), "hello-world");
/// assert_eq!(slugify_title("Test-Article!"), "test-article");
/// ```
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .replace(' ', "-")
}

/// File stem shared by every artifact of one article run:
/// `<YYYYmmdd_HHMMSS>_<index>_<slug>`, slug capped at 40 characters.
pub fn artifact_stem(at: DateTime<Utc>, index: usize, title: &str) -> String {
    let slug = truncate_chars(&slugify_title(title), 40);
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        format!("{}_{index:02}", at.format("%Y%m%d_%H%M%S"))
    } else {
        format!("{}_{index:02}_{slug}", at.format("%Y%m%d_%H%M%S"))
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a scratch file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path).await?;
    let scratch = path.join("..__write_check__");
    fs::write(&scratch, b"").await?;
    let _ = fs::remove_file(&scratch).await;
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte_boundary() {
        // each syllable is three bytes; 4 is not a boundary
        let result = truncate_for_log("삼성전자", 4);
        assert!(result.starts_with("삼…"));
        assert!(result.contains("(+9 bytes)"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("삼성전자 반도체", 4), "삼성전자");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_slugify_title() {
        assert_eq!(slugify_title("Hello World"), "hello-world");
        assert_eq!(slugify_title("Test-Article!"), "test-article");
        assert_eq!(slugify_title("Multiple   Spaces"), "multiple---spaces");
        assert_eq!(slugify_title("Special@#$Characters"), "specialcharacters");
        assert_eq!(slugify_title("쿠팡, 새벽배송 확대"), "쿠팡-새벽배송-확대");
    }

    #[test]
    fn test_artifact_stem() {
        let at = Utc.with_ymd_and_hms(2025, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(artifact_stem(at, 1, "Chip Plant!"), "20250506_070809_01_chip-plant");
        assert_eq!(artifact_stem(at, 2, "!!!"), "20250506_070809_02");
        let long = artifact_stem(at, 3, &"x".repeat(100));
        assert_eq!(long.len(), "20250506_070809_03_".len() + 40);
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__write_check__").exists());
    }
}
