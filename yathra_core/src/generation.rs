//! Generation parameters and content-safety policy sent with every exchange.

use serde::{Deserialize, Serialize};

/// Sampling and length limits for a model reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    #[serde(default = "GenerationConfig::default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "GenerationConfig::default_temperature")]
    pub temperature: f32,
    #[serde(default = "GenerationConfig::default_top_p")]
    pub top_p: f32,
    #[serde(default = "GenerationConfig::default_top_k")]
    pub top_k: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: Self::default_max_output_tokens(),
            temperature: Self::default_temperature(),
            top_p: Self::default_top_p(),
            top_k: Self::default_top_k(),
        }
    }
}

impl GenerationConfig {
    const fn default_max_output_tokens() -> u32 {
        1000
    }

    const fn default_temperature() -> f32 {
        0.9
    }

    const fn default_top_p() -> f32 {
        0.95
    }

    const fn default_top_k() -> u32 {
        40
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

/// One category→threshold pair of the safety policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: BlockThreshold,
}

impl SafetySetting {
    /// Harassment and hate speech blocked at medium severity and above.
    #[must_use]
    pub fn default_policy() -> Vec<Self> {
        vec![
            Self {
                category: HarmCategory::Harassment,
                threshold: BlockThreshold::BlockMediumAndAbove,
            },
            Self {
                category: HarmCategory::HateSpeech,
                threshold: BlockThreshold::BlockMediumAndAbove,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_blocks_harassment_and_hate_speech() {
        let policy = SafetySetting::default_policy();
        assert_eq!(policy.len(), 2);
        assert!(
            policy
                .iter()
                .all(|s| s.threshold == BlockThreshold::BlockMediumAndAbove)
        );
        assert_eq!(policy[0].category, HarmCategory::Harassment);
        assert_eq!(policy[1].category, HarmCategory::HateSpeech);
    }

    #[test]
    fn safety_setting_uses_wire_names() {
        let json = serde_json::to_value(SafetySetting::default_policy()[1]).unwrap_or_default();
        assert_eq!(json["category"], "HARM_CATEGORY_HATE_SPEECH");
        assert_eq!(json["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn partial_generation_config_fills_defaults() {
        let config: GenerationConfig =
            serde_json::from_str(r#"{"temperature": 0.2}"#).unwrap_or_default();
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.max_output_tokens, 1000);
        assert_eq!(config.top_k, 40);
    }
}
