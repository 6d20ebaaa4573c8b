// Caption orchestrator tests
// Author: kelexine (https://github.com/kelexine)

mod common;

use captionmaption::cache::{KeyValueStore, MemoryStore};
use captionmaption::caption::prompts::DESCRIPTION_PROMPT;
use captionmaption::caption::{CaptionOrchestrator, GenerationState};
use captionmaption::error::{CaptionError, RateLimitRule};
use captionmaption::models::{GenerationOptions, Tone};
use captionmaption::utils::{RateLimiter, RetryPolicy};
use captionmaption::vision::ImagePayload;
use common::{throttled, FailingStore, ScriptedBackend, PNG_1X1};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

fn orchestrator(backend: Arc<ScriptedBackend>, store: Arc<dyn KeyValueStore>) -> CaptionOrchestrator {
    CaptionOrchestrator::new(backend, store, RateLimiter::default(), RetryPolicy::default())
}

fn image() -> ImagePayload {
    ImagePayload::from_base64(PNG_1X1)
}

#[tokio::test(start_paused = true)]
async fn test_generate_returns_tags_and_normalized_captions() {
    let backend = Arc::new(ScriptedBackend::new());
    let orch = orchestrator(backend.clone(), Arc::new(MemoryStore::new()));
    assert_eq!(orch.state(), GenerationState::Idle);

    let outcome = orch
        .generate(&image(), &GenerationOptions::auto(), Some("img-1"))
        .await
        .unwrap();

    let labels: Vec<&str> = outcome.tags.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(labels, vec!["Beach", "Swimming", "dog"]);
    assert_eq!(outcome.captions.main_caption, "A dog enjoying the surf");
    assert_eq!(outcome.captions.caption_ideas.len(), 5);
    assert_eq!(outcome.captions.caption_ideas[1].caption, "Sea-riously good boy");
    assert_eq!(outcome.captions.caption_ideas[1].hashtag, None);
    assert_eq!(outcome.captions.caption_ideas[2].concept, None);

    assert_eq!(orch.state(), GenerationState::Done);
    assert!(!orch.is_generating());
    assert_eq!(
        backend.last_image_url().unwrap(),
        format!("data:image/png;base64,{}", PNG_1X1)
    );
}

#[tokio::test(start_paused = true)]
async fn test_repeat_request_served_from_cache_without_limiter() {
    let backend = Arc::new(ScriptedBackend::new());
    let orch = orchestrator(backend.clone(), Arc::new(MemoryStore::new()));
    let options = GenerationOptions::auto();

    let first = orch.generate(&image(), &options, Some("img-1")).await.unwrap();
    // Immediately again: the spacing rule would reject this if it were consulted
    let second = orch.generate(&image(), &options, Some("img-1")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.describe_calls(), 1);
    assert_eq!(backend.caption_calls(), 1);
    assert_eq!(orch.rate_limit_status().requests_in_window, 1);
    assert_eq!(orch.cache_stats().hits, 1);
}

#[tokio::test(start_paused = true)]
async fn test_different_options_miss_the_cache() {
    let backend = Arc::new(ScriptedBackend::new());
    let orch = orchestrator(backend.clone(), Arc::new(MemoryStore::new()));

    orch.generate(&image(), &GenerationOptions::auto(), Some("img-1"))
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(1)).await;

    let custom = GenerationOptions::custom().with_tone(Tone::Deadpan);
    orch.generate(&image(), &custom, Some("img-1")).await.unwrap();

    assert_eq!(backend.describe_calls(), 2);
    assert!(backend
        .last_prompt()
        .unwrap()
        .contains("in a deadpan tone."));
}

#[tokio::test(start_paused = true)]
async fn test_without_image_id_nothing_is_cached() {
    let backend = Arc::new(ScriptedBackend::new());
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(backend.clone(), store.clone());
    let options = GenerationOptions::auto();

    orch.generate(&image(), &options, None).await.unwrap();
    tokio::time::advance(Duration::from_secs(1)).await;
    orch.generate(&image(), &options, None).await.unwrap();

    assert_eq!(backend.describe_calls(), 2);
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_custom_mode_prompt_carries_directives_and_seed_tags() {
    let backend = Arc::new(ScriptedBackend::new());
    let orch = orchestrator(backend.clone(), Arc::new(MemoryStore::new()));
    let options = GenerationOptions::custom()
        .with_location("Lisbon")
        .with_additional_info("first swim of the year")
        .with_tone(Tone::DarkHumor)
        .with_tags(["labrador"]);

    orch.generate(&image(), &options, Some("img-1")).await.unwrap();

    let prompt = backend.last_prompt().unwrap();
    assert!(prompt.contains("Beach, Swimming, dog, labrador"));
    assert!(prompt.contains("The photo was taken at: Lisbon"));
    assert!(prompt.contains("Additional context: first swim of the year"));
    assert!(prompt.contains("in a dark humor tone."));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_response_caches_nothing() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_captions(Ok(r#"{"captionIdeas": []}"#.to_string()));
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(backend.clone(), store.clone());
    let options = GenerationOptions::auto();

    let err = orch
        .generate(&image(), &options, Some("img-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, CaptionError::MalformedResponse(_)));
    assert_eq!(orch.state(), GenerationState::Failed);
    assert!(store.is_empty());
    assert!(orch.cached_analysis("img-1").is_none());

    // The failure released the in-flight flag and cached nothing, so a retry
    // goes back to the backend
    tokio::time::advance(Duration::from_secs(1)).await;
    orch.generate(&image(), &options, Some("img-1")).await.unwrap();
    assert_eq!(backend.describe_calls(), 2);
    assert_eq!(orch.state(), GenerationState::Done);
}

#[tokio::test(start_paused = true)]
async fn test_no_tags_detected_skips_caption_call() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_analysis(Ok("  \n1. Setting:\n\n".to_string()));
    let orch = orchestrator(backend.clone(), Arc::new(MemoryStore::new()));

    let err = orch
        .generate(&image(), &GenerationOptions::auto(), Some("img-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, CaptionError::NoTagsDetected));
    assert_eq!(backend.caption_calls(), 0);
    assert_eq!(orch.state(), GenerationState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_local_rate_limit_rejects_before_remote_call() {
    let backend = Arc::new(ScriptedBackend::new());
    let orch = orchestrator(backend.clone(), Arc::new(MemoryStore::new()));
    let options = GenerationOptions::auto();

    orch.generate(&image(), &options, Some("a")).await.unwrap();
    let err = orch.generate(&image(), &options, Some("b")).await.unwrap_err();

    match err {
        CaptionError::RateLimitExceeded { rule, .. } => {
            assert_eq!(rule, RateLimitRule::MinimumSpacing)
        }
        other => panic!("expected RateLimitExceeded, got {:?}", other),
    }
    assert_eq!(backend.describe_calls(), 1);
    assert_eq!(orch.state(), GenerationState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_window_quota_rejects_fourth_request() {
    let backend = Arc::new(ScriptedBackend::new());
    let orch = orchestrator(backend.clone(), Arc::new(MemoryStore::new()));
    let options = GenerationOptions::auto();

    for id in ["a", "b", "c"] {
        orch.generate(&image(), &options, Some(id)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
    }

    let err = orch.generate(&image(), &options, Some("d")).await.unwrap_err();
    assert!(matches!(
        err,
        CaptionError::RateLimitExceeded {
            rule: RateLimitRule::WindowQuota,
            ..
        }
    ));
    assert_eq!(backend.describe_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_remote_throttle_is_retried_with_backoff() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_analysis(throttled());
    backend.push_captions(throttled());
    backend.push_captions(throttled());
    let orch = orchestrator(backend.clone(), Arc::new(MemoryStore::new()));

    let start = Instant::now();
    orch.generate(&image(), &GenerationOptions::auto(), Some("img-1"))
        .await
        .unwrap();

    // 1s after the throttled analysis, 1s + 2s after the throttled generations
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(4), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(5), "elapsed {:?}", elapsed);
    assert_eq!(backend.describe_calls(), 2);
    assert_eq!(backend.caption_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_throttle_exhausts_retries() {
    let backend = Arc::new(ScriptedBackend::new());
    for _ in 0..5 {
        backend.push_analysis(throttled());
    }
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(backend.clone(), store.clone());

    let err = orch
        .generate(&image(), &GenerationOptions::auto(), Some("img-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, CaptionError::RetriesExhausted { attempts: 5, .. }));
    assert_eq!(backend.describe_calls(), 5);
    assert_eq!(backend.caption_calls(), 0);
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_generate_rejected_then_accepted() {
    let gate = Arc::new(Notify::new());
    let backend = Arc::new(ScriptedBackend::gated(gate.clone()));
    let orch = Arc::new(orchestrator(backend.clone(), Arc::new(MemoryStore::new())));

    let first = {
        let orch = orch.clone();
        tokio::spawn(async move {
            orch.generate(&image(), &GenerationOptions::auto(), Some("a"))
                .await
        })
    };

    while backend.describe_calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(orch.is_generating());
    assert_eq!(orch.state(), GenerationState::Analyzing);

    let err = orch
        .generate(&image(), &GenerationOptions::auto(), Some("b"))
        .await
        .unwrap_err();
    assert!(matches!(err, CaptionError::AlreadyInProgress));

    gate.notify_one();
    first.await.unwrap().unwrap();
    assert!(!orch.is_generating());

    tokio::time::advance(Duration::from_secs(1)).await;
    gate.notify_one();
    orch.generate(&image(), &GenerationOptions::auto(), Some("b"))
        .await
        .unwrap();
    assert_eq!(backend.describe_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_durable_tier_outlives_session() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(ScriptedBackend::new());

    let first_session = orchestrator(backend.clone(), store.clone());
    first_session
        .generate(&image(), &GenerationOptions::auto(), Some("img-1"))
        .await
        .unwrap();
    drop(first_session);

    let second_session = orchestrator(backend.clone(), store.clone());
    let entry = second_session.cached_analysis("img-1").unwrap();
    assert_eq!(entry.tags.len(), 3);
    assert_eq!(
        entry.captions.unwrap().main_caption,
        "A dog enjoying the surf"
    );

    // The volatile tier is per session
    second_session
        .generate(&image(), &GenerationOptions::auto(), Some("img-1"))
        .await
        .unwrap();
    assert_eq!(backend.describe_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_clear_cache_keeps_durable_tier() {
    let backend = Arc::new(ScriptedBackend::new());
    let orch = orchestrator(backend.clone(), Arc::new(MemoryStore::new()));
    let options = GenerationOptions::auto();

    orch.generate(&image(), &options, Some("img-1")).await.unwrap();
    orch.clear_cache();

    assert!(orch.cached_analysis("img-1").is_some());

    tokio::time::advance(Duration::from_secs(1)).await;
    orch.generate(&image(), &options, Some("img-1")).await.unwrap();
    assert_eq!(backend.describe_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_durable_failures_are_absorbed() {
    let backend = Arc::new(ScriptedBackend::new());
    let orch = orchestrator(backend.clone(), Arc::new(FailingStore));

    let outcome = orch
        .generate(&image(), &GenerationOptions::auto(), Some("img-1"))
        .await
        .unwrap();

    assert_eq!(outcome.captions.main_caption, "A dog enjoying the surf");
    assert!(orch.cached_analysis("img-1").is_none());
    assert_eq!(orch.cache_stats().durable_errors, 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_image_fails_without_remote_call() {
    let backend = Arc::new(ScriptedBackend::new());
    let orch = orchestrator(backend.clone(), Arc::new(MemoryStore::new()));

    let err = orch
        .generate(&ImagePayload::from_base64(""), &GenerationOptions::auto(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, CaptionError::InvalidImage(_)));
    assert_eq!(backend.describe_calls(), 0);
    assert_eq!(orch.rate_limit_status().requests_in_window, 0);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_generate_settles_in_failed_state() {
    let gate = Arc::new(Notify::new());
    let backend = Arc::new(ScriptedBackend::gated(gate.clone()));
    let orch = Arc::new(orchestrator(backend.clone(), Arc::new(MemoryStore::new())));

    let task = {
        let orch = orch.clone();
        tokio::spawn(async move {
            orch.generate(&image(), &GenerationOptions::auto(), Some("a"))
                .await
        })
    };

    while backend.describe_calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(orch.state(), GenerationState::Analyzing);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    assert_eq!(orch.state(), GenerationState::Failed);
    assert!(!orch.is_generating());
    // The slot was spent on a request that may have reached the provider
    assert_eq!(orch.rate_limit_status().requests_in_window, 1);
    assert!(orch.cached_analysis("a").is_none());

    tokio::time::advance(Duration::from_secs(1)).await;
    gate.notify_one();
    orch.generate(&image(), &GenerationOptions::auto(), Some("a"))
        .await
        .unwrap();
    assert_eq!(orch.state(), GenerationState::Done);
}

#[tokio::test(start_paused = true)]
async fn test_describe_returns_trimmed_text() {
    let backend = Arc::new(ScriptedBackend::new());
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(backend.clone(), store.clone());

    let text = orch.describe(&image(), None).await.unwrap();

    assert_eq!(text, "A dog leaps through shallow surf at sunset.");
    assert_eq!(backend.last_prompt().unwrap(), DESCRIPTION_PROMPT);
    assert_eq!(
        backend.last_image_url().unwrap(),
        format!("data:image/png;base64,{}", PNG_1X1)
    );
    assert_eq!(backend.detail_calls(), 1);
    assert_eq!(backend.describe_calls(), 0);
    assert_eq!(orch.state(), GenerationState::Done);
    assert!(store.is_empty());

    tokio::time::advance(Duration::from_secs(1)).await;
    orch.describe(&image(), Some("Count the dogs")).await.unwrap();
    assert_eq!(backend.last_prompt().unwrap(), "Count the dogs");
}

#[tokio::test(start_paused = true)]
async fn test_describe_shares_rate_limiter_with_generate() {
    let backend = Arc::new(ScriptedBackend::new());
    let orch = orchestrator(backend.clone(), Arc::new(MemoryStore::new()));

    orch.generate(&image(), &GenerationOptions::auto(), Some("a"))
        .await
        .unwrap();
    let err = orch.describe(&image(), None).await.unwrap_err();

    assert!(matches!(
        err,
        CaptionError::RateLimitExceeded {
            rule: RateLimitRule::MinimumSpacing,
            ..
        }
    ));
    assert_eq!(backend.detail_calls(), 0);
    assert_eq!(orch.state(), GenerationState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_describe_rejected_while_generate_in_flight() {
    let gate = Arc::new(Notify::new());
    let backend = Arc::new(ScriptedBackend::gated(gate.clone()));
    let orch = Arc::new(orchestrator(backend.clone(), Arc::new(MemoryStore::new())));

    let first = {
        let orch = orch.clone();
        tokio::spawn(async move {
            orch.generate(&image(), &GenerationOptions::auto(), Some("a"))
                .await
        })
    };
    while backend.describe_calls() == 0 {
        tokio::task::yield_now().await;
    }

    let err = orch.describe(&image(), None).await.unwrap_err();
    assert!(matches!(err, CaptionError::AlreadyInProgress));
    assert_eq!(orch.state(), GenerationState::Analyzing);

    gate.notify_one();
    first.await.unwrap().unwrap();
    assert_eq!(backend.detail_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_describe_surfaces_remote_throttle_without_retry() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_description(throttled());
    let orch = orchestrator(backend.clone(), Arc::new(MemoryStore::new()));

    let start = Instant::now();
    let err = orch.describe(&image(), None).await.unwrap_err();

    assert!(matches!(err, CaptionError::RemoteThrottled(_)));
    assert_eq!(backend.detail_calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert!(!orch.is_generating());
}
