use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use ndarray::array;
use projection::{ProjectionAdapter, ProjectionConfig, ProjectionError, RemoteReducer};
use semantic::resilience::RetryConfig;
use serde_json::{json, Value};
use tokio::net::TcpListener;

type Log = Arc<Mutex<Vec<(String, Value)>>>;

async fn spawn(log: Log) -> String {
    let router = Router::new()
        .route(
            "/fit",
            post(|State(log): State<Log>, Json(body): Json<Value>| async move {
                let n = body["embeddings"].as_array().map(Vec::len).unwrap_or(0);
                log.lock().unwrap().push(("fit".into(), body));
                let points: Vec<[f32; 2]> = (0..n).map(|i| [i as f32, -(i as f32)]).collect();
                Json(json!({ "model_id": "m-1", "points": points }))
            }),
        )
        .route(
            "/transform",
            post(|State(log): State<Log>, Json(body): Json<Value>| async move {
                let n = body["embeddings"].as_array().map(Vec::len).unwrap_or(0);
                log.lock().unwrap().push(("transform".into(), body));
                let points: Vec<[f32; 2]> = (0..n).map(|_| [0.5, 0.25]).collect();
                Json(json!({ "points": points }))
            }),
        )
        .with_state(log);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/")
}

fn config(base: String) -> ProjectionConfig {
    ProjectionConfig {
        mode: "api".into(),
        api_url: Some(base),
        retry_config: Some(
            RetryConfig::default()
                .with_max_retries(1)
                .with_base_delay(Duration::from_millis(1))
                .with_jitter(false),
        ),
        ..Default::default()
    }
}

#[tokio::test]
async fn fit_sends_hyperparameters_and_transform_reuses_model() {
    let log: Log = Arc::default();
    let base = spawn(log.clone()).await;
    let mut adapter = ProjectionAdapter::from_config(&config(base)).unwrap();
    assert_eq!(adapter.reducer_name(), "umap");

    let data = array![[1.0_f32, 0.0], [0.0, 1.0], [0.7, 0.7]];
    let fitted = adapter.fit(data.view()).await.unwrap();
    assert_eq!(fitted.len(), 3);
    assert_eq!(fitted[2].x, 2.0);
    assert_eq!(fitted[2].y, -2.0);

    let one = adapter.project_one(data.row(0)).await.unwrap();
    assert_eq!((one.x, one.y), (0.5, 0.25));

    let log = log.lock().unwrap();
    let (kind, fit_body) = &log[0];
    assert_eq!(kind, "fit");
    assert_eq!(fit_body["n_neighbors"], 100);
    assert_eq!(fit_body["n_components"], 2);
    assert_eq!(fit_body["metric"], "cosine");
    let (kind, transform_body) = &log[1];
    assert_eq!(kind, "transform");
    assert_eq!(transform_body["model_id"], "m-1");
    assert_eq!(transform_body["embeddings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn dimension_is_checked_before_any_call() {
    let log: Log = Arc::default();
    let base = spawn(log.clone()).await;
    let mut adapter = ProjectionAdapter::from_config(&config(base)).unwrap();
    adapter.fit(array![[1.0_f32, 0.0]].view()).await.unwrap();

    let err = adapter
        .project(array![[1.0_f32, 0.0, 0.0]].view())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ProjectionError::DimensionMismatch {
            expected: 2,
            actual: 3
        }
    );
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn remote_reducer_requires_url() {
    let cfg = ProjectionConfig {
        mode: "api".into(),
        ..Default::default()
    };
    assert!(matches!(
        RemoteReducer::new(cfg),
        Err(ProjectionError::InvalidConfig(_))
    ));
}
