use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use semantic::resilience::{execute_with_retry_async, RetryResult};

use crate::format::{clean_sentence, parse_multiline};
use crate::prompts::{self, Prompt};
use crate::{LlmConfig, LlmError};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

const FAST_IDEAS: [&str; 8] = [
    "Rephrase it as a question",
    "Make the tone more formal",
    "Shorten it to a single clause",
    "Add a concrete example",
    "Change the point of view",
    "Make it sound more casual",
    "Turn it into a command",
    "Add a sense of urgency",
];

/// OpenAI-compatible chat-completion client with the steering prompt set.
///
/// `"fast"` mode answers every call locally and deterministically.
#[derive(Debug)]
pub struct LlmClient {
    cfg: LlmConfig,
    http: reqwest::Client,
    auth: Option<String>,
}

impl LlmClient {
    /// Builds the client, reading the API key from `cfg.api_key_env` in api mode.
    pub fn new(cfg: LlmConfig) -> Result<Self, LlmError> {
        cfg.validate()?;
        let auth = match (cfg.mode.as_str(), cfg.api_key_env.as_deref()) {
            ("api", Some(var)) => match std::env::var(var) {
                Ok(key) if !key.trim().is_empty() => Some(format!("Bearer {}", key.trim())),
                _ => return Err(LlmError::MissingApiKey(var.to_string())),
            },
            _ => None,
        };
        Self::with_auth(cfg, auth)
    }

    /// Builds the client with an explicit authorization header value.
    pub fn with_auth(cfg: LlmConfig, auth: Option<String>) -> Result<Self, LlmError> {
        cfg.validate()?;
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { cfg, http, auth })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.cfg
    }

    /// Rewrite an inverted `draft` into a grammatical sentence modeled on `example`.
    pub async fn correct(&self, draft: &str, example: &str) -> Result<String, LlmError> {
        if self.is_fast() {
            return Ok(fast_correct(draft));
        }
        let prompt = prompts::correction(draft, example);
        let raw = self.complete(&prompt, self.cfg.temperatures.correction).await?;
        Ok(clean_sentence(&raw))
    }

    /// Up to `count` variations of `sentence`, optionally shaped by `instruction`.
    ///
    /// The model may return fewer lines than asked for; the result is never padded.
    pub async fn vary(
        &self,
        sentence: &str,
        count: usize,
        instruction: Option<&str>,
    ) -> Result<Vec<String>, LlmError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if self.is_fast() {
            return Ok(fast_variations(sentence, count, instruction));
        }
        let prompt = match instruction {
            Some(instruction) => prompts::instructed_variation(sentence, count, instruction),
            None => prompts::variation(sentence, count),
        };
        let raw = self.complete(&prompt, self.cfg.temperatures.variation).await?;
        Ok(parse_multiline(&raw))
    }

    /// Repair interpolated drafts so they read as an A-to-B blend, order preserved.
    pub async fn correct_batch(
        &self,
        drafts: &[String],
        anchor_a: &str,
        anchor_b: &str,
    ) -> Result<Vec<String>, LlmError> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        if self.is_fast() {
            return Ok(drafts.iter().map(|d| fast_correct(d)).collect());
        }
        let prompt = prompts::batch_correction(drafts, anchor_a, anchor_b);
        let raw = self
            .complete(&prompt, self.cfg.temperatures.batch_correction)
            .await?;
        Ok(parse_multiline(&raw))
    }

    /// `count` short instructions a user could apply to `sentence`.
    pub async fn prompt_ideas(&self, sentence: &str, count: usize) -> Result<Vec<String>, LlmError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if self.is_fast() {
            return Ok(FAST_IDEAS
                .iter()
                .cycle()
                .take(count)
                .map(|s| s.to_string())
                .collect());
        }
        let prompt = prompts::prompt_ideas(sentence, count);
        let raw = self.complete(&prompt, self.cfg.temperatures.prompt_ideas).await?;
        Ok(parse_multiline(&raw))
    }

    /// Send one chat completion and return `choices[0].message.content`.
    pub async fn complete(&self, prompt: &Prompt, temperature: f32) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.cfg.model,
            temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
        };
        let payload = serde_json::to_value(&request)
            .map_err(|e| LlmError::InvalidConfig(format!("unserializable request: {e}")))?;

        let started = Instant::now();
        let retry_cfg = self.cfg.retry_config.unwrap_or_default();
        let result: RetryResult<Value> = execute_with_retry_async(&retry_cfg, "llm", |_attempt| {
            let payload = &payload;
            async move {
                self.send(payload).await.map_err(|e| match e {
                    LlmError::Http(msg) => msg,
                    other => other.to_string(),
                })
            }
        })
        .await;
        if result.attempts > 1 {
            warn!(attempts = result.attempts, succeeded = result.succeeded, "llm call needed retries");
        }
        let body = result.into_result().map_err(LlmError::Http)?;
        let content = extract_content(body)?;
        debug!(
            temperature,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat completion finished"
        );
        Ok(content)
    }

    fn is_fast(&self) -> bool {
        self.cfg.mode == "fast"
    }

    async fn send(&self, payload: &Value) -> Result<Value, LlmError> {
        let mut request = self
            .http
            .post(&self.cfg.api_url)
            .timeout(Duration::from_secs(self.cfg.timeout_secs))
            .json(payload);
        if let Some(auth) = &self.auth {
            request = request.header("Authorization", auth);
        }
        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Http(format!("request failed: {e}")))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http(format!("HTTP error {status}: {body}")));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("body is not JSON: {e}")))
    }
}

fn extract_content(body: Value) -> Result<String, LlmError> {
    let parsed: ChatResponse = serde_json::from_value(body)
        .map_err(|e| LlmError::InvalidResponse(format!("unexpected completion shape: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LlmError::InvalidResponse("completion has no message content".into()))
}

fn fast_correct(draft: &str) -> String {
    let cleaned = clean_sentence(draft);
    let cleaned = cleaned.trim_end_matches(',').trim_end();
    if cleaned.is_empty() || cleaned.ends_with(['.', '?', '!', '"']) {
        cleaned.to_string()
    } else {
        format!("{cleaned}.")
    }
}

fn fast_variations(sentence: &str, count: usize, instruction: Option<&str>) -> Vec<String> {
    let base = fast_correct(sentence);
    (1..=count)
        .map(|i| match instruction {
            Some(instruction) => format!("{base} ({instruction}, take {i})"),
            None => format!("{base} (variation {i})"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_first_choice_content() {
        let body = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "First."}},
                {"message": {"role": "assistant", "content": "Second."}}
            ]
        });
        assert_eq!(extract_content(body).unwrap(), "First.");
    }

    #[test]
    fn missing_content_is_invalid_response() {
        let err = extract_content(json!({"choices": []})).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
        let err = extract_content(json!({"choices": [{"message": {"content": null}}]})).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn fast_correct_terminates_sentences() {
        assert_eq!(fast_correct("the cat sat,"), "the cat sat.");
        assert_eq!(fast_correct("\"Is it?\""), "Is it?");
        assert_eq!(fast_correct(""), "");
    }

    #[tokio::test]
    async fn fast_mode_is_deterministic() {
        let client = LlmClient::new(LlmConfig::default()).unwrap();
        let a = client.vary("Hello [name]", 3, None).await.unwrap();
        let b = client.vary("Hello [name]", 3, None).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert!(a.iter().all(|s| s.contains("[name]")));

        let ideas = client.prompt_ideas("Hello.", 10).await.unwrap();
        assert_eq!(ideas.len(), 10);
        assert_eq!(ideas[0], ideas[8]);

        assert!(client.vary("x", 0, None).await.unwrap().is_empty());
    }

    #[test]
    fn api_mode_requires_key_variable() {
        let cfg = LlmConfig {
            mode: "api".into(),
            api_key_env: Some("STEER_LLM_TEST_KEY_THAT_IS_NEVER_SET".into()),
            ..Default::default()
        };
        let err = LlmClient::new(cfg).unwrap_err();
        assert_eq!(
            err,
            LlmError::MissingApiKey("STEER_LLM_TEST_KEY_THAT_IS_NEVER_SET".into())
        );
    }
}
