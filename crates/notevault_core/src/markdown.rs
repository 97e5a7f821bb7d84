//! Plain-text previews for note list rendering.
//!
//! Markdown notes have their syntax stripped; plain notes only get their
//! whitespace collapsed. Full Markdown rendering belongs to the UI.

use once_cell::sync::Lazy;
use regex::Regex;

const PREVIEW_MAX_CHARS: usize = 100;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*]\(([^)]+)\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\*_`#>~\-\[\]\(\)!]+"#).expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Derives a preview of at most 100 chars, or `None` for blank content.
pub fn derive_preview(content: &str, markdown: bool) -> Option<String> {
    let normalized = if markdown {
        let without_images = MARKDOWN_IMAGE_RE.replace_all(content, " ");
        let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
        let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, " ");
        WHITESPACE_RE.replace_all(&without_symbols, " ").into_owned()
    } else {
        WHITESPACE_RE.replace_all(content, " ").into_owned()
    };

    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(PREVIEW_MAX_CHARS).collect())
    }
}

/// Returns the first Markdown image target in `content`.
pub fn first_image(content: &str) -> Option<String> {
    MARKDOWN_IMAGE_RE
        .captures(content)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{derive_preview, first_image};

    #[test]
    fn markdown_preview_strips_symbols_and_limits_length() {
        let source = "# title\n\n- [link](https://example.com)\n**bold** `code`";
        let text = derive_preview(source, true).expect("preview should exist");
        assert!(!text.contains('#'));
        assert!(!text.contains('*'));
        assert!(text.contains("link"));
        assert!(text.chars().count() <= 100);
    }

    #[test]
    fn plain_preview_keeps_symbols() {
        let text = derive_preview("# not a heading\n\nx", false).unwrap();
        assert_eq!(text, "# not a heading x");
    }

    #[test]
    fn blank_content_has_no_preview() {
        assert!(derive_preview("  \n ", true).is_none());
    }

    #[test]
    fn first_image_returns_first_target() {
        let content = "x ![a](one.png) y ![b](two.png)";
        assert_eq!(first_image(content).as_deref(), Some("one.png"));
    }
}
