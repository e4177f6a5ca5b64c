use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use dataset_services::config::Config;
use dataset_services::{routes, AppState};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

const BOUNDARY: &str = "dataset-services-test-boundary";

pub struct TestApp {
    app: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let state = AppState::from_config(config).expect("state");
        Self {
            app: routes::app(Arc::new(state)),
        }
    }

    async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(TestResponse {
            status,
            headers,
            body: String::from_utf8(body.to_vec())?,
        })
    }

    pub async fn get(&self, path: &str) -> Result<TestResponse> {
        let request = Request::builder().method("GET").uri(path).body(Body::empty())?;
        self.send(request).await
    }

    pub async fn delete(&self, path: &str) -> Result<TestResponse> {
        let request = Request::builder().method("DELETE").uri(path).body(Body::empty())?;
        self.send(request).await
    }

    /// CORS preflight from a browser on another origin.
    pub async fn preflight(&self, path: &str, method: &str) -> Result<TestResponse> {
        let request = Request::builder()
            .method("OPTIONS")
            .uri(path)
            .header("origin", "http://dashboard.example")
            .header("access-control-request-method", method)
            .body(Body::empty())?;
        self.send(request).await
    }

    pub async fn post_json(&self, path: &str, json: Value) -> Result<TestResponse> {
        self.send_json("POST", path, json).await
    }

    pub async fn put_json(&self, path: &str, json: Value) -> Result<TestResponse> {
        self.send_json("PUT", path, json).await
    }

    async fn send_json(&self, method: &str, path: &str, json: Value) -> Result<TestResponse> {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))?;
        self.send(request).await
    }

    /// Uploads `content` as a multipart `file` field named `file_name`.
    pub async fn upload(&self, file_name: &str, content: &str) -> Result<TestResponse> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/datasets")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))?;
        self.send(request).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(self.status, expected, "unexpected status, body: {}", self.body);
    }

    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}
