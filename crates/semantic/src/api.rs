use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::resilience::{
    execute_with_retry_async, CircuitBreakerManager, CircuitState, RetryResult,
};
use crate::stub::{make_stub_embedding, make_stub_sentence};
use crate::{l2_normalize_in_place, SemanticConfig, SemanticError};

const EMBED_ENDPOINT: &str = "embed";
const INVERT_ENDPOINT: &str = "invert";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ApiProviderKind {
    HuggingFace,
    OpenAI,
    Custom,
}

/// Client for the sentence-embedding and embedding-inversion endpoints.
///
/// In `"fast"` mode either side answers from a deterministic local stub.
/// Remote calls go through a per-endpoint circuit breaker and retry with
/// backoff unless resilience is disabled.
#[derive(Debug)]
pub struct SemanticClient {
    cfg: SemanticConfig,
    http: reqwest::Client,
    breakers: CircuitBreakerManager,
}

impl SemanticClient {
    pub fn new(cfg: SemanticConfig) -> Result<Self, SemanticError> {
        cfg.validate()?;
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| SemanticError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        let breakers = CircuitBreakerManager::new(cfg.circuit_breaker_config.unwrap_or_default());
        Ok(Self {
            cfg,
            http,
            breakers,
        })
    }

    pub fn config(&self) -> &SemanticConfig {
        &self.cfg
    }

    /// Embed one sentence.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(SemanticError::CountMismatch {
            endpoint: EMBED_ENDPOINT,
            expected: 1,
            actual: 0,
        })
    }

    /// Embed sentences in order, one vector per input.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if self.cfg.mode == "fast" {
            return Ok(texts
                .iter()
                .map(|t| make_stub_embedding(t, self.cfg.stub_dim, self.cfg.normalize))
                .collect());
        }

        let url = self
            .cfg
            .api_url
            .as_deref()
            .ok_or_else(|| SemanticError::InvalidConfig("api_url is required for api mode".into()))?;
        let payload = build_api_payload(api_provider_kind(&self.cfg), texts, &self.cfg);
        let timeout = self.cfg.api_timeout_secs.map(Duration::from_secs);

        let started = Instant::now();
        let response = self
            .post_json(EMBED_ENDPOINT, url, self.cfg.api_auth_header.as_deref(), timeout, payload)
            .await?;
        let mut vectors = parse_embeddings_from_value(response)?;
        if vectors.len() != texts.len() {
            return Err(SemanticError::CountMismatch {
                endpoint: EMBED_ENDPOINT,
                expected: texts.len(),
                actual: vectors.len(),
            });
        }
        if self.cfg.normalize {
            for v in vectors.iter_mut() {
                l2_normalize_in_place(v);
            }
        }
        debug!(
            count = texts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "embedded batch"
        );
        Ok(vectors)
    }

    /// Invert embeddings back to text, one sentence per embedding, in order.
    pub async fn invert_batch(&self, embeddings: &[Vec<f32>]) -> Result<Vec<String>, SemanticError> {
        if embeddings.is_empty() {
            return Ok(Vec::new());
        }
        let inversion = &self.cfg.inversion;
        if inversion.mode == "fast" {
            return Ok(embeddings.iter().map(|e| make_stub_sentence(e)).collect());
        }

        let url = inversion.api_url.as_deref().ok_or_else(|| {
            SemanticError::InvalidConfig("inversion.api_url is required for api mode".into())
        })?;
        let payload = json!({ "embeddings": embeddings, "num_steps": inversion.num_steps });
        let timeout = inversion.timeout_secs.map(Duration::from_secs);

        let started = Instant::now();
        let response = self
            .post_json(INVERT_ENDPOINT, url, inversion.api_auth_header.as_deref(), timeout, payload)
            .await?;
        let sentences = parse_sentences_from_value(response)?;
        if sentences.len() != embeddings.len() {
            return Err(SemanticError::CountMismatch {
                endpoint: INVERT_ENDPOINT,
                expected: embeddings.len(),
                actual: sentences.len(),
            });
        }
        debug!(
            count = embeddings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "inverted batch"
        );
        Ok(sentences)
    }

    /// `(endpoint, state, total failures)` per endpoint called so far.
    pub fn breaker_stats(&self) -> Vec<(String, CircuitState, u64)> {
        self.breakers.get_all_stats()
    }

    /// POST `payload`, guarded by the endpoint's breaker and the retry policy.
    async fn post_json(
        &self,
        endpoint: &'static str,
        url: &str,
        auth: Option<&str>,
        timeout: Option<Duration>,
        payload: Value,
    ) -> Result<Value, SemanticError> {
        if !self.cfg.enable_resilience {
            return send_api_request(&self.http, url, auth, timeout, &payload).await;
        }

        let breaker = self.breakers.get_or_create(endpoint);
        if !breaker.allow_request() {
            return Err(SemanticError::CircuitOpen(endpoint.to_string()));
        }

        let retry_cfg = self.cfg.retry_config.unwrap_or_default();
        let result: RetryResult<Value> = execute_with_retry_async(&retry_cfg, endpoint, |_attempt| {
            let payload = &payload;
            async move {
                send_api_request(&self.http, url, auth, timeout, payload)
                    .await
                    .map_err(|e| match e {
                        SemanticError::Http(msg) => msg,
                        other => other.to_string(),
                    })
            }
        })
        .await;

        if result.succeeded {
            breaker.record_success();
        } else {
            breaker.record_failure();
        }
        result.into_result().map_err(SemanticError::Http)
    }
}

fn api_provider_kind(cfg: &SemanticConfig) -> ApiProviderKind {
    let provider = cfg
        .api_provider
        .as_deref()
        .unwrap_or("custom")
        .to_ascii_lowercase();
    match provider.as_str() {
        "hf" | "huggingface" => ApiProviderKind::HuggingFace,
        "openai" | "gpt" => ApiProviderKind::OpenAI,
        _ => ApiProviderKind::Custom,
    }
}

fn build_api_payload(provider: ApiProviderKind, texts: &[String], cfg: &SemanticConfig) -> Value {
    match provider {
        ApiProviderKind::HuggingFace => json!({ "inputs": texts }),
        ApiProviderKind::OpenAI => json!({ "input": texts, "model": cfg.model_name }),
        ApiProviderKind::Custom => json!({ "texts": texts }),
    }
}

async fn send_api_request(
    http: &reqwest::Client,
    url: &str,
    auth: Option<&str>,
    timeout: Option<Duration>,
    payload: &Value,
) -> Result<Value, SemanticError> {
    let mut request = http.post(url).header("Content-Type", "application/json");
    if let Some(header) = auth {
        request = request.header("Authorization", header);
    }
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    let response = request
        .json(payload)
        .send()
        .await
        .map_err(|e| SemanticError::Http(format!("request failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(SemanticError::Http(format!("HTTP error {status}: {body}")));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| SemanticError::InvalidResponse(format!("body is not JSON: {e}")))
}

fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                return items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(mut obj) => match obj.remove("embedding") {
                            Some(embedding) => parse_embedding_vector(embedding),
                            None => Err(SemanticError::InvalidResponse(
                                "missing `embedding` field in data item".into(),
                            )),
                        },
                        _ => Err(SemanticError::InvalidResponse(
                            "unexpected entry inside `data` array".into(),
                        )),
                    })
                    .collect();
            }

            Err(SemanticError::InvalidResponse(
                "unsupported embedding response shape".into(),
            ))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, SemanticError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num.as_f64().map(|f| f as f32).ok_or_else(|| {
                    SemanticError::InvalidResponse("non-finite embedding value".into())
                }),
                other => Err(SemanticError::InvalidResponse(format!(
                    "embedding entries must be numbers, got {other}"
                ))),
            })
            .collect(),
        other => Err(SemanticError::InvalidResponse(format!(
            "embedding vector must be an array, got {other}"
        ))),
    }
}

/// Accepts `{"sentences": [...]}` or a bare array of strings.
fn parse_sentences_from_value(value: Value) -> Result<Vec<String>, SemanticError> {
    let items = match value {
        Value::Object(mut map) => match map.remove("sentences") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(SemanticError::InvalidResponse(
                    "missing `sentences` array in inversion response".into(),
                ))
            }
        },
        Value::Array(items) => items,
        other => {
            return Err(SemanticError::InvalidResponse(format!(
                "unsupported inversion response: {other}"
            )))
        }
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(SemanticError::InvalidResponse(format!(
                "inverted sentence must be a string, got {other}"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_from_config() {
        let mut cfg = SemanticConfig::default();
        assert_eq!(api_provider_kind(&cfg), ApiProviderKind::Custom);
        cfg.api_provider = Some("HuggingFace".into());
        assert_eq!(api_provider_kind(&cfg), ApiProviderKind::HuggingFace);
        cfg.api_provider = Some("openai".into());
        assert_eq!(api_provider_kind(&cfg), ApiProviderKind::OpenAI);
    }

    #[test]
    fn payload_shapes_per_provider() {
        let cfg = SemanticConfig::default();
        let texts = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            build_api_payload(ApiProviderKind::HuggingFace, &texts, &cfg),
            json!({"inputs": ["a", "b"]})
        );
        assert_eq!(
            build_api_payload(ApiProviderKind::OpenAI, &texts, &cfg),
            json!({"input": ["a", "b"], "model": "gtr-t5-base"})
        );
        assert_eq!(
            build_api_payload(ApiProviderKind::Custom, &texts, &cfg),
            json!({"texts": ["a", "b"]})
        );
    }

    #[test]
    fn parse_embedding_collection_various_formats() {
        let nested = parse_embedding_collection(json!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]])).unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0], vec![1.0, 2.0, 3.0]);

        let single = parse_embedding_collection(json!([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(single, vec![vec![1.0, 2.0, 3.0]]);

        assert!(parse_embedding_collection(json!([])).unwrap().is_empty());
    }

    #[test]
    fn parse_openai_and_keyed_responses() {
        let openai = json!({"data": [{"embedding": [0.5, 0.25]}, {"embedding": [1.0, 0.0]}]});
        assert_eq!(
            parse_embeddings_from_value(openai).unwrap(),
            vec![vec![0.5, 0.25], vec![1.0, 0.0]]
        );

        let keyed = json!({"embeddings": [[0.1, 0.2]]});
        assert_eq!(parse_embeddings_from_value(keyed).unwrap(), vec![vec![0.1, 0.2]]);

        let bad = json!({"vectors": []});
        assert!(matches!(
            parse_embeddings_from_value(bad),
            Err(SemanticError::InvalidResponse(_))
        ));
    }

    #[test]
    fn parse_sentences_both_shapes() {
        assert_eq!(
            parse_sentences_from_value(json!({"sentences": ["one.", "two."]})).unwrap(),
            vec!["one.".to_string(), "two.".to_string()]
        );
        assert_eq!(
            parse_sentences_from_value(json!(["solo."])).unwrap(),
            vec!["solo.".to_string()]
        );
        assert!(parse_sentences_from_value(json!({"text": "x"})).is_err());
        assert!(parse_sentences_from_value(json!([1, 2])).is_err());
    }

    #[tokio::test]
    async fn fast_mode_embeds_and_inverts_locally() {
        let client = SemanticClient::new(SemanticConfig {
            stub_dim: 16,
            ..Default::default()
        })
        .unwrap();
        let vectors = client
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 16);
        assert_eq!(client.embed("a").await.unwrap(), vectors[0]);

        let sentences = client.invert_batch(&vectors).await.unwrap();
        assert_eq!(sentences.len(), 2);
        assert!(client.breaker_stats().is_empty());
    }

    #[tokio::test]
    async fn empty_batches_short_circuit() {
        let client = SemanticClient::new(SemanticConfig::default()).unwrap();
        assert!(client.embed_batch(&[]).await.unwrap().is_empty());
        assert!(client.invert_batch(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let err = SemanticClient::new(SemanticConfig {
            mode: "api".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, SemanticError::InvalidConfig(_)));
    }
}
