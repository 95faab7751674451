//! Terminal rendering of search results.

use serde::Serialize;

use crate::config::DisplayConfig;
use crate::semantic::SearchResult;

#[derive(Serialize)]
struct JsonOutput<'a> {
    query: &'a str,
    results: &'a [SearchResult],
}

/// Renders results with fixed display settings.
pub struct Renderer {
    config: DisplayConfig,
}

impl Renderer {
    pub fn new(config: DisplayConfig) -> Self {
        Self { config }
    }

    pub fn format_json(&self, query: &str, results: &[SearchResult]) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&JsonOutput { query, results })
    }

    pub fn format_human(&self, query: &str, results: &[SearchResult]) -> String {
        if results.is_empty() {
            return format!("No results found for \"{}\"", query);
        }

        let mut output = String::new();
        for (i, result) in results.iter().enumerate() {
            output.push_str(&format!("{:>2}. {}\n", i + 1, self.label(result)));
            output.push_str(&format!("    {}\n", result.path.display()));
        }

        output.trim_end().to_string()
    }

    /// One-line summary: score and caption.
    pub fn label(&self, result: &SearchResult) -> String {
        format!(
            "[{:.*}] {}",
            self.config.score_precision,
            result.score,
            truncate_text(&result.raw_text, self.config.caption_width)
        )
    }
}

/// Cut `text` to `max_chars` characters, adding an ellipsis if needed.
fn truncate_text(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn result(raw_text: &str, score: f32) -> SearchResult {
        SearchResult {
            score,
            text: raw_text.to_string(),
            path: PathBuf::from(format!("/pict/{raw_text}.png")),
            raw_text: raw_text.to_string(),
        }
    }

    #[test]
    fn test_format_human_empty() {
        let renderer = Renderer::new(DisplayConfig::default());
        assert!(renderer.format_human("你好", &[]).contains("No results found"));
    }

    #[test]
    fn test_format_human_lists_score_caption_and_path() {
        let renderer = Renderer::new(DisplayConfig::default());
        let output = renderer.format_human("你好", &[result("你好世界", 0.8731), result("再见", 0.1)]);

        assert!(output.contains(" 1. [0.87] 你好世界"));
        assert!(output.contains("/pict/你好世界.png"));
        assert!(output.contains(" 2. [0.10] 再见"));
    }

    #[test]
    fn test_score_precision() {
        let renderer = Renderer::new(DisplayConfig {
            score_precision: 4,
            ..DisplayConfig::default()
        });
        assert_eq!(renderer.label(&result("a", 0.5)), "[0.5000] a");
    }

    #[test]
    fn test_long_caption_truncated_by_chars() {
        let renderer = Renderer::new(DisplayConfig {
            caption_width: 3,
            ..DisplayConfig::default()
        });
        assert_eq!(renderer.label(&result("为什么要演奏春日影", 1.0)), "[1.00] 为什么...");
    }

    #[test]
    fn test_format_json() {
        let renderer = Renderer::new(DisplayConfig::default());
        let output = renderer.format_json("q", &[result("再见", 0.5)]).unwrap();
        assert!(output.contains("\"query\": \"q\""));
        assert!(output.contains("\"raw_text\": \"再见\""));
        assert!(output.contains("\"score\": 0.5"));
    }
}
