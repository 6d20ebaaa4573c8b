//! Data models for captionmaption.
//!
//! - `caption`: Domain values exchanged with callers (options, tags, captions,
//!   cache entries).
//! - `openai`: Wire types for the OpenAI Chat Completions API.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod caption;
pub mod openai;

pub use caption::{
    CacheEntry, CaptionIdea, CaptionOutcome, CaptionResult, GenerationMode, GenerationOptions,
    Tag, Tone,
};
