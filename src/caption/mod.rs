// Caption generation module
// Author: kelexine (https://github.com/kelexine)

pub mod backend;
pub mod orchestrator;
pub mod parse;
pub mod prompts;

pub use backend::CaptionBackend;
pub use orchestrator::{CaptionOrchestrator, GenerationState, RateLimitStatus};
pub use parse::{parse_caption_response, parse_tags};
