//! Small helpers shared across the pipeline.
//!
//! - Whitespace normalization for extracted text
//! - Truncation of long strings for logging
//! - Selector parsing with crate errors
//! - Offloading CPU-bound parsing off the async scheduler
//! - Output directory validation

use crate::error::{HarvestError, Result};
use itertools::Itertools;
use scraper::Selector;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().join(" ")
}

/// Parse a CSS selector, reporting failures as [`HarvestError::Parse`].
pub fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| HarvestError::parse(format!("selector {css:?}"), e))
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` bytes (backing off to a character boundary)
/// with an ellipsis and byte count appended.
///
/// # Examples
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

/// Run blocking parse work on the blocking pool and wait for it.
///
/// A panic inside `work` surfaces as [`HarvestError::Task`].
pub async fn offload<T, W>(work: W) -> Result<T>
where
    T: Send + 'static,
    W: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(HarvestError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Hello,\n\t world  "), "Hello, world");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_parse_selector() {
        assert!(parse_selector("div.story > a[href]").is_ok());
        assert_eq!(parse_selector("div[").unwrap_err().kind(), "parse");
    }

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
    fn test_truncate_for_log_respects_char_boundary() {
        let s = "é".repeat(10);
        let result = truncate_for_log(&s, 3);
        assert!(result.starts_with('é'));
        assert!(result.contains("…(+18 bytes)"));
    }

    #[tokio::test]
    async fn test_offload_surfaces_errors() {
        let ok = offload(|| Ok(2 + 2)).await.unwrap();
        assert_eq!(ok, 4);
        let err = offload::<(), _>(|| Err(HarvestError::parse("x", "boom"))).await.unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }
}
