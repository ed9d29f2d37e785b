use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{DropReason, PipelineError, Result};
use crate::normalize::token_count;

// sentences that flip polarity mid-way make noisy sentiment labels
static CONTRAST_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(but|however|although|though|whereas|yet)\b").expect("static pattern")
});

/// Acceptance thresholds as written in a dataset descriptor. All bounds inclusive.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default)]
    pub min_chars: Option<usize>,
    #[serde(default)]
    pub max_chars: Option<usize>,
    #[serde(default)]
    pub min_tokens: Option<usize>,
    #[serde(default)]
    pub max_tokens: Option<usize>,
    #[serde(default)]
    pub exclude_contrast: bool,
    #[serde(default)]
    pub exclude_pattern: Option<String>,
    #[serde(default)]
    pub require_label: bool,
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        if let (Some(lo), Some(hi)) = (self.min_chars, self.max_chars) {
            if lo > hi {
                return Err(PipelineError::Config(format!(
                    "min_chars ({lo}) exceeds max_chars ({hi})"
                )));
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_tokens, self.max_tokens) {
            if lo > hi {
                return Err(PipelineError::Config(format!(
                    "min_tokens ({lo}) exceeds max_tokens ({hi})"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct RecordFilter {
    min_chars: Option<usize>,
    max_chars: Option<usize>,
    min_tokens: Option<usize>,
    max_tokens: Option<usize>,
    exclude: Vec<Regex>,
    require_label: bool,
}

impl RecordFilter {
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        config.validate()?;
        let mut exclude = Vec::new();
        if config.exclude_contrast {
            exclude.push(CONTRAST_MARKERS.clone());
        }
        if let Some(pattern) = &config.exclude_pattern {
            let re = Regex::new(pattern).map_err(|e| {
                PipelineError::Config(format!("bad exclude_pattern {pattern:?}: {e}"))
            })?;
            exclude.push(re);
        }
        Ok(Self {
            min_chars: config.min_chars,
            max_chars: config.max_chars,
            min_tokens: config.min_tokens,
            max_tokens: config.max_tokens,
            exclude,
            require_label: config.require_label,
        })
    }

    /// `text` must already be normalized.
    pub fn check(&self, text: &str, raw_label: Option<&Value>) -> std::result::Result<(), DropReason> {
        if text.is_empty() {
            return Err(DropReason::MissingRequiredField);
        }
        if self.require_label && raw_label.is_none() {
            return Err(DropReason::MissingLabel);
        }

        let chars = text.chars().count();
        if self.min_chars.is_some_and(|min| chars < min) {
            return Err(DropReason::TooShort);
        }
        if self.max_chars.is_some_and(|max| chars > max) {
            return Err(DropReason::TooLong);
        }

        if self.min_tokens.is_some() || self.max_tokens.is_some() {
            let tokens = token_count(text);
            if self.min_tokens.is_some_and(|min| tokens < min) {
                return Err(DropReason::TooShort);
            }
            if self.max_tokens.is_some_and(|max| tokens > max) {
                return Err(DropReason::TooLong);
            }
        }

        if self.exclude.iter().any(|re| re.is_match(text)) {
            return Err(DropReason::Excluded);
        }
        Ok(())
    }
}
