//! Description cleaning for video titles and captions.
//!
//! Social captions are noisy: hashtag walls, chapter timestamps, share
//! links. Cleaned text goes into the extraction prompt, so both variants
//! must be idempotent and never leave consecutive spaces behind.

use std::sync::LazyLock;

use regex::Regex;

static HASHTAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[^\s#]+").expect("Invalid hashtag regex"));

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("Invalid URL regex"));

/// Chapter markers like `0:45` or `12:03`, optionally with hours.
static TIMESTAMP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}:\d{2}(:\d{2})?\b").expect("Invalid timestamp regex"));

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Strip hashtags and collapse whitespace.
pub fn clean_caption(text: &str) -> String {
    let without_tags = HASHTAG_REGEX.replace_all(text, " ");
    collapse(&without_tags)
}

/// Strip hashtags, URLs and chapter timestamps, then collapse whitespace.
/// Used for platforms whose descriptions carry chapter lists and links.
pub fn clean_description(text: &str) -> String {
    let without_urls = URL_REGEX.replace_all(text, " ");
    let without_timestamps = TIMESTAMP_REGEX.replace_all(&without_urls, " ");
    let without_tags = HASHTAG_REGEX.replace_all(&without_timestamps, " ");
    collapse(&without_tags)
}

fn collapse(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_caption_strips_hashtags() {
        let cleaned = clean_caption("Crispy gnocchi #foodtok #easyrecipe #fyp");
        assert_eq!(cleaned, "Crispy gnocchi");
    }

    #[test]
    fn test_clean_caption_collapses_whitespace() {
        let cleaned = clean_caption("One   pot \t pasta\n\nrecipe");
        assert_eq!(cleaned, "One pot pasta recipe");
        assert!(!cleaned.contains("  "));
    }

    #[test]
    fn test_clean_caption_is_idempotent() {
        let once = clean_caption("Best #ramen   ever #noodles");
        assert_eq!(clean_caption(&once), once);
    }

    #[test]
    fn test_clean_description_strips_urls_and_timestamps() {
        let cleaned = clean_description(
            "Full recipe: https://example.com/x 0:00 intro 1:23 sauce #cooking",
        );
        assert_eq!(cleaned, "Full recipe: intro sauce");
    }

    #[test]
    fn test_clean_description_is_idempotent() {
        let raw = "Watch 10:05 https://a.b/c #tag  text";
        let once = clean_description(raw);
        assert_eq!(clean_description(&once), once);
    }

    #[test]
    fn test_clean_handles_empty_input() {
        assert_eq!(clean_caption(""), "");
        assert_eq!(clean_description("#only #tags"), "");
    }
}
