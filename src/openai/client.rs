// OpenAI Chat Completions client
// Author: kelexine (https://github.com/kelexine)

use crate::caption::CaptionBackend;
use crate::config::OpenAiConfig;
use crate::error::{CaptionError, Result};
use crate::models::openai::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ContentPart, ErrorResponse,
    ImageUrl, ResponseFormat,
};
use crate::utils::logging::{preview, sanitize};
use crate::utils::retry::is_throttle_status;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Client for the OpenAI Chat Completions API.
///
/// Both remote capabilities go through `/chat/completions`:
/// - image analysis with the vision model and an inline data URL
/// - caption generation with the chat model in JSON mode
///
/// No retries happen here; throttling surfaces as
/// [`CaptionError::RemoteThrottled`] for the caller's retry policy.
pub struct OpenAiClient {
    http_client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a client with a pooled HTTP connection.
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .build()
            .map_err(|e| CaptionError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created OpenAI HTTP client for {}", config.api_base_url);

        Ok(Self {
            http_client,
            config: config.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.config.api_base_url.trim_end_matches('/')
    }

    /// POST a chat completion and return the text of the first choice.
    ///
    /// `capability` only labels logs and metrics.
    pub async fn post_chat(
        &self,
        capability: &str,
        request: &ChatCompletionRequest,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url());
        debug!("Calling {} with model {}", capability, request.model);

        let started = Instant::now();
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                crate::metrics::record_remote_call(capability, 0, started.elapsed().as_secs_f64());
                CaptionError::NetworkOrServiceError(sanitize(&format!("HTTP error: {}", e)))
            })?;

        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();
        crate::metrics::record_remote_call(
            capability,
            status.as_u16(),
            started.elapsed().as_secs_f64(),
        );

        if !status.is_success() {
            let message = Self::extract_error_message(&response_text)
                .unwrap_or_else(|| preview(&response_text, 200));
            let message = sanitize(&message);

            if is_throttle_status(status.as_u16()) {
                debug!("{} throttled by provider: {}", capability, message);
                return Err(CaptionError::RemoteThrottled(message));
            }

            error!("OpenAI API error: HTTP {} - {}", status, message);
            return Err(CaptionError::NetworkOrServiceError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| {
                error!("Failed to parse OpenAI response: {}", e);
                CaptionError::NetworkOrServiceError(format!("Response parsing error: {}", e))
            })?;

        if let Some(usage) = &completion.usage {
            debug!(
                "{} used {} tokens ({} prompt, {} completion)",
                capability, usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
            );
        }

        completion
            .first_content()
            .map(str::to_string)
            .ok_or_else(|| {
                CaptionError::NetworkOrServiceError(format!("{}: response had no choices", capability))
            })
    }

    /// Extract error message from API response JSON
    fn extract_error_message(response_text: &str) -> Option<String> {
        serde_json::from_str::<ErrorResponse>(response_text)
            .ok()
            .and_then(|resp| resp.error)
            .and_then(|detail| detail.message)
            .filter(|message| !message.is_empty())
    }
}

#[async_trait]
impl CaptionBackend for OpenAiClient {
    async fn describe_image(&self, image_url: &str, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.config.analysis_model.clone(),
            messages: vec![ChatMessage::user_parts(vec![
                ContentPart::Text {
                    text: prompt.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.to_string(),
                        detail: Some(self.config.image_detail.clone()),
                    },
                },
            ])],
            max_tokens: Some(self.config.analysis_max_tokens),
            temperature: None,
            response_format: None,
        };

        self.post_chat("image_analysis", &request).await
    }

    async fn describe_in_detail(&self, image_url: &str, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.config.description_model.clone(),
            messages: vec![ChatMessage::user_parts(vec![
                ContentPart::Text {
                    text: prompt.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.to_string(),
                        detail: None,
                    },
                },
            ])],
            max_tokens: Some(self.config.description_max_tokens),
            temperature: None,
            response_format: None,
        };

        self.post_chat("image_description", &request).await
    }

    async fn generate_captions(&self, system_prompt: &str, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.config.caption_model.clone(),
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(prompt)],
            max_tokens: Some(self.config.caption_max_tokens),
            temperature: Some(self.config.temperature),
            response_format: Some(ResponseFormat::json_object()),
        };

        self.post_chat("caption_generation", &request).await
    }
}
