use std::time::{Duration, Instant};

use async_trait::async_trait;
use ndarray::{Array2, ArrayView2};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use semantic::resilience::{execute_with_retry_async, RetryConfig, RetryResult};

use crate::reducer::Reducer;
use crate::{ProjectionConfig, ProjectionError, ProjectionResult};

#[derive(Debug, Deserialize)]
struct FitResponse {
    model_id: String,
    points: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct TransformResponse {
    points: Vec<Vec<f32>>,
}

/// UMAP hosted behind HTTP.
///
/// `POST {base}/fit` takes the rows and hyperparameters and answers with a
/// `model_id` plus the fitted coordinates; `POST {base}/transform` places new
/// rows with a previously fitted `model_id`.
#[derive(Debug, Clone)]
pub struct RemoteReducer {
    cfg: ProjectionConfig,
    base_url: String,
    http: reqwest::Client,
    fitted: Option<FittedModel>,
}

#[derive(Debug, Clone)]
struct FittedModel {
    model_id: String,
    dim: usize,
}

impl RemoteReducer {
    pub fn new(cfg: ProjectionConfig) -> ProjectionResult<Self> {
        cfg.validate()?;
        let base_url = cfg
            .api_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .ok_or_else(|| ProjectionError::InvalidConfig("projection.api_url is required".into()))?;
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProjectionError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            cfg,
            base_url,
            http,
            fitted: None,
        })
    }

    async fn post(&self, path: &'static str, payload: Value) -> ProjectionResult<Value> {
        let url = format!("{}/{path}", self.base_url);
        let timeout = Duration::from_secs(self.cfg.timeout_secs);
        let retry_cfg: RetryConfig = self.cfg.retry_config.unwrap_or_default();
        let result: RetryResult<Value> = execute_with_retry_async(&retry_cfg, path, |_| {
            let (url, payload) = (&url, &payload);
            async move {
                let response = self
                    .http
                    .post(url)
                    .timeout(timeout)
                    .json(payload)
                    .send()
                    .await
                    .map_err(|e| format!("request failed: {e}"))?;
                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(format!("HTTP error {status}: {body}"));
                }
                response
                    .json::<Value>()
                    .await
                    .map_err(|e| format!("invalid body: {e}"))
            }
        })
        .await;
        result.into_result().map_err(ProjectionError::Http)
    }

    fn to_matrix(&self, points: Vec<Vec<f32>>, expected_rows: usize) -> ProjectionResult<Array2<f32>> {
        if points.len() != expected_rows {
            return Err(ProjectionError::InvalidResponse(format!(
                "expected {expected_rows} points, got {}",
                points.len()
            )));
        }
        let cols = self.cfg.n_components;
        if let Some(bad) = points.iter().find(|p| p.len() != cols) {
            return Err(ProjectionError::InvalidResponse(format!(
                "expected {cols} coordinates per point, got {}",
                bad.len()
            )));
        }
        let flat: Vec<f32> = points.into_iter().flatten().collect();
        Array2::from_shape_vec((expected_rows, cols), flat)
            .map_err(|e| ProjectionError::InvalidResponse(e.to_string()))
    }
}

fn rows(data: ArrayView2<'_, f32>) -> Vec<Vec<f32>> {
    data.outer_iter().map(|row| row.to_vec()).collect()
}

#[async_trait]
impl Reducer for RemoteReducer {
    fn name(&self) -> &'static str {
        "umap"
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    async fn fit(&mut self, data: ArrayView2<'_, f32>) -> ProjectionResult<Array2<f32>> {
        if data.nrows() == 0 {
            return Err(ProjectionError::EmptyInput);
        }
        let started = Instant::now();
        let payload = json!({
            "embeddings": rows(data),
            "n_neighbors": self.cfg.n_neighbors,
            "min_dist": self.cfg.min_dist,
            "n_components": self.cfg.n_components,
            "metric": self.cfg.metric,
            "random_state": self.cfg.seed,
        });
        let body = self.post("fit", payload).await?;
        let parsed: FitResponse = serde_json::from_value(body)
            .map_err(|e| ProjectionError::InvalidResponse(format!("unexpected fit shape: {e}")))?;
        let coords = self.to_matrix(parsed.points, data.nrows())?;
        self.fitted = Some(FittedModel {
            model_id: parsed.model_id,
            dim: data.ncols(),
        });
        debug!(
            rows = data.nrows(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "remote projector fitted"
        );
        Ok(coords)
    }

    async fn transform(&self, data: ArrayView2<'_, f32>) -> ProjectionResult<Array2<f32>> {
        let fitted = self.fitted.as_ref().ok_or(ProjectionError::NotFitted)?;
        if data.ncols() != fitted.dim {
            return Err(ProjectionError::DimensionMismatch {
                expected: fitted.dim,
                actual: data.ncols(),
            });
        }
        if data.nrows() == 0 {
            return Ok(Array2::zeros((0, self.cfg.n_components)));
        }
        let payload = json!({ "model_id": fitted.model_id, "embeddings": rows(data) });
        let body = self.post("transform", payload).await?;
        let parsed: TransformResponse = serde_json::from_value(body).map_err(|e| {
            ProjectionError::InvalidResponse(format!("unexpected transform shape: {e}"))
        })?;
        self.to_matrix(parsed.points, data.nrows())
    }

    fn fresh(&self) -> Box<dyn Reducer> {
        Box::new(Self {
            cfg: self.cfg.clone(),
            base_url: self.base_url.clone(),
            http: self.http.clone(),
            fitted: None,
        })
    }
}
