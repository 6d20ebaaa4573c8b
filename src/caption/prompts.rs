// Prompt text for the analysis and caption-generation calls
// Author: kelexine (https://github.com/kelexine)

use crate::models::{GenerationMode, GenerationOptions, Tag};

/// Structured observation request sent with the image.
pub const ANALYSIS_PROMPT: &str = "Analyze this image and provide ONLY the following in a structured format:
1. Setting: Where was this taken?
2. Activity: What's happening in the foreground?
3. Subject: Main subject or focus
4. People: Number and description if any
5. Visual Effects: Lighting, filters, or notable visual elements
6. Summary: 50-char or less overview of the photo

Keep each response brief and focused.";

/// Default instruction for a free-form detailed description.
pub const DESCRIPTION_PROMPT: &str = "Analyze this image in detail and describe what you see.";

/// System persona for caption generation.
pub const CAPTION_SYSTEM_PROMPT: &str = "You are a highly creative caption generator who excels at wordplay, cultural references, and unexpected connections. Think outside the box and create surprising but relevant captions that go beyond the obvious.";

/// Number of creative caption ideas requested.
pub const CAPTION_IDEA_COUNT: usize = 5;

const CAPTION_INSTRUCTIONS: &str = r#"As a creative caption generator, think deeply and generate:
1. A concise, natural caption describing what's likely in the image
2. 5 unique and creative caption ideas that:
   - Play with words and concepts
   - Make unexpected connections
   - Reference pop culture, games, or trends
   - Think about deeper meanings and metaphors
   - Create surprising but relevant analogies
   - Each caption should have its own unique angle or concept
3. For each caption, generate a matching creative hashtag that:
   - Captures the specific theme or concept of that caption
   - Is clever and memorable
   - Combines relevant words in unexpected ways

Format the response as JSON with the following structure:
{
  "mainCaption": "primary description",
  "captionIdeas": [
    {
      "caption": "creative caption text",
      "concept": "brief explanation of the creative concept/reference",
      "hashtag": "matching creative hashtag"
    }
  ]
}"#;

/// Build the caption-generation prompt from detected tags and options.
///
/// In custom mode the caller's seed tags follow the detected ones, then the
/// location, additional context and tone directives are appended.
pub fn build_caption_prompt(tags: &[Tag], options: &GenerationOptions) -> String {
    let custom = options.mode == GenerationMode::Custom;

    let mut labels: Vec<&str> = tags.iter().map(|tag| tag.label.as_str()).collect();
    if custom {
        labels.extend(
            options
                .tags
                .iter()
                .map(|tag| tag.trim())
                .filter(|tag| !tag.is_empty()),
        );
    }

    let mut prompt = format!(
        "Based on the following elements detected in an image: {}",
        labels.join(", ")
    );

    if custom {
        if let Some(location) = non_blank(&options.location) {
            prompt.push_str(&format!("\nThe photo was taken at: {}", location));
        }
        if let Some(info) = non_blank(&options.additional_info) {
            prompt.push_str(&format!("\nAdditional context: {}", info));
        }
        let tone = options.tone.label();
        let article = if tone.starts_with(['a', 'e', 'i', 'o', 'u']) { "an" } else { "a" };
        prompt.push_str(&format!(
            "\nPlease generate the captions in {} {} tone.",
            article, tone
        ));
    }

    prompt.push_str("\n\n");
    prompt.push_str(CAPTION_INSTRUCTIONS);
    prompt
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
