// Caption orchestrator - cache, throttle, analyze, generate
// Author: kelexine (https://github.com/kelexine)

use super::backend::CaptionBackend;
use super::parse::{parse_caption_response, parse_tags};
use super::prompts::{
    build_caption_prompt, ANALYSIS_PROMPT, CAPTION_SYSTEM_PROMPT, DESCRIPTION_PROMPT,
};
use crate::cache::{CacheStats, KeyValueStore, ResponseCache};
use crate::config::AppConfig;
use crate::error::{CaptionError, Result};
use crate::models::{CacheEntry, CaptionOutcome, GenerationOptions};
use crate::utils::{RateLimiter, RetryPolicy};
use crate::vision::{to_data_url, ImagePayload};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Where the current (or most recent) `generate` call is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    CacheCheck,
    RateLimit,
    Analyzing,
    Generating,
    Done,
    Failed,
}

impl GenerationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationState::Idle => "idle",
            GenerationState::CacheCheck => "cache_check",
            GenerationState::RateLimit => "rate_limit",
            GenerationState::Analyzing => "analyzing",
            GenerationState::Generating => "generating",
            GenerationState::Done => "done",
            GenerationState::Failed => "failed",
        }
    }
}

/// Snapshot of the local throttle.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitStatus {
    pub requests_in_window: u32,
    pub last_request: Option<Instant>,
}

/// Caption generation for one client session.
///
/// Owns the rate limiter, the volatile cache tier and the in-flight flag, so
/// two orchestrators never share throttling or cache state. Create one per
/// session and drop it when the session ends; the durable store outlives it.
pub struct CaptionOrchestrator {
    backend: Arc<dyn CaptionBackend>,
    cache: ResponseCache,
    limiter: Mutex<RateLimiter>,
    retry: RetryPolicy,
    state: Mutex<GenerationState>,
    in_flight: AtomicBool,
}

/// Releases the in-flight flag on every exit path.
///
/// A call that never reaches [`InFlightGuard::finish`] (its future was
/// dropped mid-request) leaves the state at `Failed` rather than wherever it
/// was suspended.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
    state: &'a Mutex<GenerationState>,
    finished: bool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, state: &'a Mutex<GenerationState>) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CaptionError::AlreadyInProgress)?;
        Ok(Self {
            flag,
            state,
            finished: false,
        })
    }

    fn finish(&mut self, outcome: GenerationState) {
        self.finished = true;
        set_state(self.state, outcome);
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Request abandoned before completion");
            set_state(self.state, GenerationState::Failed);
            crate::metrics::record_generation("cancelled");
        }
        self.flag.store(false, Ordering::Release);
    }
}

fn set_state(state: &Mutex<GenerationState>, next: GenerationState) {
    let mut state = state.lock();
    debug!("Generation state: {} -> {}", state.as_str(), next.as_str());
    *state = next;
}

impl CaptionOrchestrator {
    pub fn new(
        backend: Arc<dyn CaptionBackend>,
        durable: Arc<dyn KeyValueStore>,
        limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            cache: ResponseCache::new(durable),
            limiter: Mutex::new(limiter),
            retry,
            state: Mutex::new(GenerationState::Idle),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Build an orchestrator with limits taken from configuration.
    pub fn from_config(
        config: &AppConfig,
        backend: Arc<dyn CaptionBackend>,
        durable: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self::new(
            backend,
            durable,
            RateLimiter::new(&config.rate_limit),
            RetryPolicy::new(&config.retry),
        )
    }

    /// Analyze an image and generate captions for it.
    ///
    /// A repeated call with the same `image_id` and options is answered from
    /// the volatile cache without throttling or remote calls. Without an
    /// `image_id` nothing is looked up or cached.
    pub async fn generate(
        &self,
        image: &ImagePayload,
        options: &GenerationOptions,
        image_id: Option<&str>,
    ) -> Result<CaptionOutcome> {
        let mut guard = self.begin()?;

        self.transition(GenerationState::CacheCheck);
        if let Some(id) = image_id {
            if let Some(cached) = self.cache.get_by_fingerprint(id, options) {
                info!("Using cached response for image: {}", id);
                guard.finish(GenerationState::Done);
                crate::metrics::record_generation("cached");
                return Ok(cached);
            }
        }

        match self.run(image, options).await {
            Ok(outcome) => {
                if let Some(id) = image_id {
                    self.cache.put(id, options, &outcome);
                }
                guard.finish(GenerationState::Done);
                crate::metrics::record_generation("success");
                Ok(outcome)
            }
            Err(e) => {
                warn!("Caption generation failed: {}", e);
                guard.finish(GenerationState::Failed);
                crate::metrics::record_generation(e.kind());
                Err(e)
            }
        }
    }

    /// Free-form detailed description of an image.
    ///
    /// Shares the in-flight rule and the rate limiter with [`generate`](Self::generate)
    /// but bypasses both cache tiers and the retry policy: provider throttling
    /// surfaces directly as [`CaptionError::RemoteThrottled`]. `prompt`
    /// defaults to a generic "describe in detail" instruction.
    pub async fn describe(&self, image: &ImagePayload, prompt: Option<&str>) -> Result<String> {
        let mut guard = self.begin()?;

        let result = self.run_description(image, prompt.unwrap_or(DESCRIPTION_PROMPT)).await;
        match result {
            Ok(description) => {
                guard.finish(GenerationState::Done);
                crate::metrics::record_generation("described");
                Ok(description)
            }
            Err(e) => {
                warn!("Image description failed: {}", e);
                guard.finish(GenerationState::Failed);
                crate::metrics::record_generation(e.kind());
                Err(e)
            }
        }
    }

    fn begin(&self) -> Result<InFlightGuard<'_>> {
        InFlightGuard::acquire(&self.in_flight, &self.state).map_err(|e| {
            debug!("Rejecting request: another request is in flight");
            crate::metrics::record_generation(e.kind());
            e
        })
    }

    async fn run_description(&self, image: &ImagePayload, prompt: &str) -> Result<String> {
        let image_url = to_data_url(image)?;

        self.transition(GenerationState::RateLimit);
        self.limiter.lock().check_and_record()?;

        self.transition(GenerationState::Analyzing);
        let description = self.backend.describe_in_detail(&image_url, prompt).await?;
        Ok(description.trim().to_string())
    }

    async fn run(&self, image: &ImagePayload, options: &GenerationOptions) -> Result<CaptionOutcome> {
        // Reject unusable input before it costs a rate-limit slot
        let image_url = to_data_url(image)?;

        self.transition(GenerationState::RateLimit);
        self.limiter.lock().check_and_record()?;

        self.transition(GenerationState::Analyzing);
        let analysis = self
            .retry
            .execute("Image Analysis", || {
                self.backend.describe_image(&image_url, ANALYSIS_PROMPT)
            })
            .await?;

        let tags = parse_tags(&analysis);
        if tags.is_empty() {
            return Err(CaptionError::NoTagsDetected);
        }
        debug!("Detected {} tags", tags.len());

        self.transition(GenerationState::Generating);
        let prompt = build_caption_prompt(&tags, options);
        let content = self
            .retry
            .execute("Caption Generation", || {
                self.backend.generate_captions(CAPTION_SYSTEM_PROMPT, &prompt)
            })
            .await?;

        let captions = parse_caption_response(&content)?;
        Ok(CaptionOutcome { tags, captions })
    }

    fn transition(&self, next: GenerationState) {
        set_state(&self.state, next);
    }

    /// State of the current or most recent call.
    pub fn state(&self) -> GenerationState {
        *self.state.lock()
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Last known good analysis for an image, regardless of the options used.
    pub fn cached_analysis(&self, image_id: &str) -> Option<CacheEntry> {
        self.cache.get_by_image(image_id)
    }

    /// Forget volatile cache entries; durable entries are kept.
    pub fn clear_cache(&self) {
        self.cache.clear_volatile();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn rate_limit_status(&self) -> RateLimitStatus {
        let limiter = self.limiter.lock();
        RateLimitStatus {
            requests_in_window: limiter.requests_in_window(),
            last_request: limiter.last_request(),
        }
    }
}
