//! Configuration snapshot types
//!
//! PromptVeil receives its configuration as an immutable snapshot built by
//! the embedding server. File parsing and environment resolution happen
//! outside the engine; these types are the interface.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Global dispatch policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Outbound traffic is scrubbed and forwarded to the remote provider.
    #[default]
    Mask,
    /// Presence of PII diverts the request to an on-premise model,
    /// unscrubbed; clean requests go out unmodified.
    Route,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProxyConfig {
    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub pii_detection: PiiDetectionConfig,

    #[serde(default)]
    pub masking: MaskingConfig,

    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiDetectionConfig {
    /// When false, the analyzer is never called; secrets are still masked.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Analyzer base URL.
    #[serde(default = "default_presidio_url")]
    pub presidio_url: String,

    /// Categories requested from the analyzer.
    #[serde(default = "default_entities")]
    pub entities: Vec<String>,

    /// Minimum confidence accepted from the analyzer.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,

    /// Exact substrings that are never masked.
    #[serde(default)]
    pub whitelist: Vec<String>,

    /// Detector language hints (ISO codes); the first entry is used.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

impl Default for PiiDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            presidio_url: default_presidio_url(),
            entities: default_entities(),
            score_threshold: default_score_threshold(),
            whitelist: Vec::new(),
            languages: default_languages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskingConfig {
    /// Annotate restored values instead of restoring them silently.
    #[serde(default)]
    pub show_markers: bool,

    /// Annotation prefix used when show_markers is set.
    #[serde(default = "default_marker_text")]
    pub marker_text: String,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            show_markers: false,
            marker_text: default_marker_text(),
        }
    }
}

/// Forwarding target for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_presidio_url() -> String {
    "http://localhost:5002".to_string()
}

fn default_entities() -> Vec<String> {
    [
        "PERSON",
        "EMAIL_ADDRESS",
        "PHONE_NUMBER",
        "CREDIT_CARD",
        "US_SSN",
        "IP_ADDRESS",
        "LOCATION",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_score_threshold() -> f32 {
    0.5
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_marker_text() -> String {
    "[protected]".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.mode, Mode::Mask);
        assert!(config.pii_detection.enabled);
        assert_eq!(config.pii_detection.score_threshold, 0.5);
        assert_eq!(config.pii_detection.languages, vec!["en"]);
        assert!(!config.masking.show_markers);
        assert_eq!(config.masking.marker_text, "[protected]");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ProxyConfig = serde_json::from_str(
            r#"{
                "mode": "route",
                "pii_detection": { "score_threshold": 0.8, "whitelist": ["Claude Code"] },
                "providers": { "openai": { "base_url": "https://api.openai.com/v1" } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.mode, Mode::Route);
        assert_eq!(config.pii_detection.score_threshold, 0.8);
        assert_eq!(config.pii_detection.whitelist, vec!["Claude Code"]);
        // Untouched sections keep their defaults
        assert!(config.pii_detection.enabled);
        assert!(config.providers["openai"].enabled);
        assert!(config.providers["openai"].api_key.is_none());
    }
}
