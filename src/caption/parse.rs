// Parsing of remote responses into tags and caption results
// Author: kelexine (https://github.com/kelexine)

use super::prompts::CAPTION_IDEA_COUNT;
use crate::error::{CaptionError, Result};
use crate::models::{CaptionIdea, CaptionResult, Tag};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

// "-", "•" or a single "*" followed by whitespace (so "**Setting**" survives)
static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-•]|\*\s)\s*").expect("valid bullet pattern"));

// "1. " / "12) " enumeration; "4.5 stars" and "2024. A year" are content
static ENUMERATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}[.)](?:\s+|$)").expect("valid enumeration pattern"));

// Observation labels requested by the analysis prompt, optionally in markdown bold
static LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\**\s*(?:setting|activity|subject|people|visual effects|summary)\s*\**\s*:\s*\**\s*",
    )
    .expect("valid label pattern")
});

/// Split the free-text analysis into ordered tags.
///
/// Each non-blank line loses its bullet marker, enumeration and observation
/// label; lines that are empty afterwards are dropped.
pub fn parse_tags(analysis: &str) -> Vec<Tag> {
    analysis
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let line = BULLET.replace(line, "");
            let line = ENUMERATION.replace(&line, "");
            let line = LABEL.replace(&line, "");
            let label = line.trim().trim_end_matches("**").trim();

            if label.is_empty() {
                None
            } else {
                Some(Tag::new(label))
            }
        })
        .collect()
}

/// Caption idea as returned by the model: either a bare string or an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCaptionIdea {
    Text(String),
    Structured {
        caption: String,
        #[serde(default)]
        concept: Option<String>,
        #[serde(default)]
        hashtag: Option<String>,
    },
}

impl From<RawCaptionIdea> for CaptionIdea {
    fn from(raw: RawCaptionIdea) -> Self {
        match raw {
            RawCaptionIdea::Text(caption) => CaptionIdea {
                caption: caption.trim().to_string(),
                concept: None,
                hashtag: None,
            },
            RawCaptionIdea::Structured {
                caption,
                concept,
                hashtag,
            } => CaptionIdea {
                caption: caption.trim().to_string(),
                concept: trimmed(concept),
                hashtag: trimmed(hashtag),
            },
        }
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptionResponse {
    #[serde(default)]
    main_caption: Option<String>,
    #[serde(default)]
    caption_ideas: Option<Vec<RawCaptionIdea>>,
}

/// Parse and normalize the JSON returned by the caption-generation call.
pub fn parse_caption_response(content: &str) -> Result<CaptionResult> {
    let raw: RawCaptionResponse = serde_json::from_str(content.trim()).map_err(|e| {
        CaptionError::MalformedResponse(format!("Failed to parse caption response: {}", e))
    })?;

    let main_caption = raw
        .main_caption
        .map(|caption| caption.trim().to_string())
        .filter(|caption| !caption.is_empty())
        .ok_or_else(|| CaptionError::MalformedResponse("missing mainCaption".to_string()))?;

    let caption_ideas: Vec<CaptionIdea> = raw
        .caption_ideas
        .ok_or_else(|| CaptionError::MalformedResponse("missing captionIdeas".to_string()))?
        .into_iter()
        .map(CaptionIdea::from)
        .collect();

    if caption_ideas.len() != CAPTION_IDEA_COUNT {
        debug!(
            "Model returned {} caption ideas (asked for {})",
            caption_ideas.len(),
            CAPTION_IDEA_COUNT
        );
    }

    Ok(CaptionResult {
        main_caption,
        caption_ideas,
    })
}
