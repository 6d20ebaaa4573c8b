// Shared test doubles for integration tests
// Author: kelexine (https://github.com/kelexine)

#![allow(dead_code)]

use async_trait::async_trait;
use captionmaption::cache::KeyValueStore;
use captionmaption::caption::CaptionBackend;
use captionmaption::error::{CaptionError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub const ANALYSIS: &str = "1. Setting: Beach\n2. Activity: Swimming\n- Subject: dog";

pub const CAPTIONS: &str = r##"{
    "mainCaption": "A dog enjoying the surf",
    "captionIdeas": [
        {"caption": "Paws and waves", "concept": "alliteration", "hashtag": "#PawsAndWaves"},
        "Sea-riously good boy",
        {"caption": "Fetch me the ocean", "concept": "", "hashtag": "#OceanFetch"},
        {"caption": "Sandy paws, happy cause", "hashtag": "#SandyPaws"},
        {"caption": "Dogpaddle champion", "concept": "sports reference", "hashtag": "#DogpaddleChamp"}
    ]
}"##;

pub const DESCRIPTION: &str = "  A dog leaps through shallow surf at sunset.\n";

/// 1x1 PNG, base64
pub const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

/// Backend answering from queued responses, falling back to canned ones.
#[derive(Default)]
pub struct ScriptedBackend {
    analyses: Mutex<VecDeque<Result<String>>>,
    captions: Mutex<VecDeque<Result<String>>>,
    descriptions: Mutex<VecDeque<Result<String>>>,
    describe_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    caption_calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
    last_image_url: Mutex<Option<String>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `describe_image` waits for `gate` to be notified before answering.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn push_analysis(&self, response: Result<String>) {
        self.analyses.lock().push_back(response);
    }

    pub fn push_captions(&self, response: Result<String>) {
        self.captions.lock().push_back(response);
    }

    pub fn push_description(&self, response: Result<String>) {
        self.descriptions.lock().push_back(response);
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn caption_calls(&self) -> usize {
        self.caption_calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().clone()
    }

    pub fn last_image_url(&self) -> Option<String> {
        self.last_image_url.lock().clone()
    }
}

#[async_trait]
impl CaptionBackend for ScriptedBackend {
    async fn describe_image(&self, image_url: &str, _prompt: &str) -> Result<String> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_image_url.lock() = Some(image_url.to_string());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let queued = self.analyses.lock().pop_front();
        queued.unwrap_or_else(|| Ok(ANALYSIS.to_string()))
    }

    async fn describe_in_detail(&self, image_url: &str, prompt: &str) -> Result<String> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_image_url.lock() = Some(image_url.to_string());
        *self.last_prompt.lock() = Some(prompt.to_string());

        let queued = self.descriptions.lock().pop_front();
        queued.unwrap_or_else(|| Ok(DESCRIPTION.to_string()))
    }

    async fn generate_captions(&self, _system_prompt: &str, prompt: &str) -> Result<String> {
        self.caption_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock() = Some(prompt.to_string());

        let queued = self.captions.lock().pop_front();
        queued.unwrap_or_else(|| Ok(CAPTIONS.to_string()))
    }
}

/// Durable store whose every operation fails.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(CaptionError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read denied",
        )))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(CaptionError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "write denied",
        )))
    }
}

pub fn throttled() -> Result<String> {
    Err(CaptionError::RemoteThrottled("Rate limit reached".to_string()))
}
