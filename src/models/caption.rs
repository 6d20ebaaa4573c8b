//! Caption domain types.
//!
//! These are the values exchanged between the orchestrator and its callers:
//! generation options coming in, tags and captions going out. JSON field
//! names are camelCase so the same shapes can be handed to a browser UI.

// Author: kelexine (https://github.com/kelexine)

use serde::{Deserialize, Serialize};

/// How captions are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Use only the tags detected in the image.
    #[default]
    Auto,
    /// Add location, extra context, tone and seed tags to the prompt.
    Custom,
}

/// Preset tone for custom-mode captions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Tone {
    Sarcastic,
    Deadpan,
    #[default]
    Original,
    Unexpected,
    DarkHumor,
}

impl Tone {
    /// Human-readable label used inside prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Tone::Sarcastic => "sarcastic",
            Tone::Deadpan => "deadpan",
            Tone::Original => "original",
            Tone::Unexpected => "unexpected",
            Tone::DarkHumor => "dark humor",
        }
    }
}

impl std::str::FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "sarcastic" => Ok(Tone::Sarcastic),
            "deadpan" => Ok(Tone::Deadpan),
            "original" => Ok(Tone::Original),
            "unexpected" => Ok(Tone::Unexpected),
            "darkhumor" => Ok(Tone::DarkHumor),
            other => Err(format!("unknown tone: {}", other)),
        }
    }
}

/// Options for one `generate` call. Field order is part of the cache
/// fingerprint, so do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    #[serde(default)]
    pub mode: GenerationMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default)]
    pub tone: Tone,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,

    /// Caller-supplied labels seeding a custom-mode prompt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl GenerationOptions {
    pub fn auto() -> Self {
        Self::default()
    }

    pub fn custom() -> Self {
        Self {
            mode: GenerationMode::Custom,
            ..Self::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_additional_info(mut self, info: impl Into<String>) -> Self {
        self.additional_info = Some(info.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// One detected semantic element of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
}

impl Tag {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

/// A creative caption variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionIdea {
    pub caption: String,
    pub concept: Option<String>,
    pub hashtag: Option<String>,
}

/// Normalized result of the caption-generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionResult {
    pub main_caption: String,
    pub caption_ideas: Vec<CaptionIdea>,
}

/// What a successful `generate` call returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionOutcome {
    pub tags: Vec<Tag>,
    pub captions: CaptionResult,
}

/// Durable cache value: the last known good analysis for an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub captions: Option<CaptionResult>,
}

impl From<CaptionOutcome> for CacheEntry {
    fn from(outcome: CaptionOutcome) -> Self {
        Self {
            tags: outcome.tags,
            captions: Some(outcome.captions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_json_shape() {
        let options = GenerationOptions::custom()
            .with_location("Lisbon")
            .with_tone(Tone::DarkHumor)
            .with_additional_info("birthday trip");
        let json = serde_json::to_value(&options).unwrap();

        assert_eq!(json["mode"], "custom");
        assert_eq!(json["tone"], "darkHumor");
        assert_eq!(json["additionalInfo"], "birthday trip");
        assert!(json.get("tags").is_none());
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: GenerationOptions = serde_json::from_str(r#"{"mode": "auto"}"#).unwrap();
        assert_eq!(options, GenerationOptions::auto());
        assert_eq!(options.tone, Tone::Original);
    }

    #[test]
    fn test_tone_from_str() {
        assert_eq!("darkHumor".parse::<Tone>().unwrap(), Tone::DarkHumor);
        assert_eq!("dark-humor".parse::<Tone>().unwrap(), Tone::DarkHumor);
        assert_eq!("Deadpan".parse::<Tone>().unwrap(), Tone::Deadpan);
        assert!("wholesome".parse::<Tone>().is_err());
    }

    #[test]
    fn test_caption_result_camel_case() {
        let result = CaptionResult {
            main_caption: "Sunset".to_string(),
            caption_ideas: vec![],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["mainCaption"], "Sunset");
        assert!(json["captionIdeas"].is_array());
    }

    #[test]
    fn test_cache_entry_tolerates_missing_captions() {
        let entry: CacheEntry =
            serde_json::from_str(r#"{"tags": [{"label": "Beach"}]}"#).unwrap();
        assert_eq!(entry.tags, vec![Tag::new("Beach")]);
        assert!(entry.captions.is_none());
    }
}
