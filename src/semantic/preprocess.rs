//! Caption normalization for embedding input.
//!
//! Prepares an extracted caption for embedding:
//! 1. Convert script variant (traditional -> simplified by default)
//! 2. Collapse runs of `_` / `-` into a single space
//! 3. Trim whitespace
//!
//! An empty result means the entry is skipped.

use once_cell::sync::Lazy;
use regex::Regex;
use zhconv::{zhconv, Variant};

static SEPARATOR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[_\-]+").expect("separator pattern is valid"));

/// Script variant name that disables conversion.
pub const NO_CONVERSION: &str = "none";

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Unknown script variant: {0}")]
    UnknownVariant(String),

    #[error("Script conversion failed: {0}")]
    Failed(String),
}

/// Converts text between script variants of the same language.
pub trait ScriptConverter: Send + Sync {
    fn convert(&self, text: &str) -> Result<String, ConversionError>;
}

/// Chinese script conversion backed by zhconv.
pub struct ZhConverter {
    target: Variant,
}

impl ZhConverter {
    /// Create a converter for a target variant name such as `zh-cn`.
    pub fn new(target: &str) -> Result<Self, ConversionError> {
        let target = match target.trim().to_lowercase().as_str() {
            "zh-cn" => Variant::ZhCN,
            "zh-hans" => Variant::ZhHans,
            "zh-sg" => Variant::ZhSG,
            "zh-my" => Variant::ZhMY,
            "zh-tw" => Variant::ZhTW,
            "zh-hant" => Variant::ZhHant,
            "zh-hk" => Variant::ZhHK,
            "zh-mo" => Variant::ZhMO,
            _ => return Err(ConversionError::UnknownVariant(target.to_string())),
        };
        Ok(Self { target })
    }
}

impl ScriptConverter for ZhConverter {
    fn convert(&self, text: &str) -> Result<String, ConversionError> {
        Ok(zhconv(text, self.target))
    }
}

/// Leaves text untouched.
pub struct Passthrough;

impl ScriptConverter for Passthrough {
    fn convert(&self, text: &str) -> Result<String, ConversionError> {
        Ok(text.to_string())
    }
}

/// Build the converter for a configured script variant.
pub fn converter_for(variant: &str) -> Result<Box<dyn ScriptConverter>, ConversionError> {
    if variant.trim().eq_ignore_ascii_case(NO_CONVERSION) {
        return Ok(Box::new(Passthrough));
    }
    Ok(Box::new(ZhConverter::new(variant)?))
}

/// Caption normalizer shared by the index builder and the searcher so that
/// captions and queries go through identical preprocessing.
pub struct TextNormalizer {
    converter: Box<dyn ScriptConverter>,
}

impl TextNormalizer {
    pub fn new(converter: Box<dyn ScriptConverter>) -> Self {
        Self { converter }
    }

    /// Normalizer for a configured script variant name.
    pub fn for_variant(variant: &str) -> Result<Self, ConversionError> {
        Ok(Self::new(converter_for(variant)?))
    }

    /// Normalize raw caption text. Never fails: conversion errors fall back
    /// to the unconverted text.
    pub fn normalize(&self, raw: &str) -> String {
        let converted = match self.converter.convert(raw) {
            Ok(converted) => converted,
            Err(e) => {
                log::warn!("script conversion failed for {:?}: {}", raw, e);
                raw.to_string()
            }
        };

        collapse_separators(&converted)
    }
}

/// Replace every run of `_` / `-` with one space and trim.
pub fn collapse_separators(text: &str) -> String {
    SEPARATOR_RUN.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingConverter;

    impl ScriptConverter for FailingConverter {
        fn convert(&self, _text: &str) -> Result<String, ConversionError> {
            Err(ConversionError::Failed("converter unavailable".to_string()))
        }
    }

    #[test]
    fn test_collapse_separators() {
        assert_eq!(collapse_separators("a_b--c"), "a b c");
        assert_eq!(collapse_separators("__lead and trail-_"), "lead and trail");
        assert_eq!(collapse_separators("plain"), "plain");
    }

    #[test]
    fn test_only_separators_becomes_empty() {
        let normalizer = TextNormalizer::new(Box::new(Passthrough));
        assert_eq!(normalizer.normalize("_-_"), "");
        assert_eq!(normalizer.normalize("   "), "");
    }

    #[test]
    fn test_failed_conversion_falls_back_to_input() {
        let normalizer = TextNormalizer::new(Box::new(FailingConverter));
        assert_eq!(normalizer.normalize("這是測試"), "這是測試");
        assert_eq!(normalizer.normalize("a_b"), "a b");
    }

    #[test]
    fn test_traditional_to_simplified() {
        let normalizer = TextNormalizer::for_variant("zh-cn").unwrap();
        assert_eq!(normalizer.normalize("為什麼"), "为什么");
    }

    #[test]
    fn test_simplified_input_unchanged() {
        let normalizer = TextNormalizer::for_variant("zh-cn").unwrap();
        assert_eq!(normalizer.normalize("你好世界"), "你好世界");
    }

    #[test]
    fn test_none_variant_disables_conversion() {
        let normalizer = TextNormalizer::for_variant("none").unwrap();
        assert_eq!(normalizer.normalize("為什麼"), "為什麼");
    }

    #[test]
    fn test_unknown_variant_rejected() {
        assert!(matches!(
            converter_for("klingon"),
            Err(ConversionError::UnknownVariant(_))
        ));
    }
}
