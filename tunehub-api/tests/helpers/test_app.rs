//! Test application: temp root, file-backed SQLite, real router

use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tunehub_api::services::WorkerPool;
use tunehub_api::storage::ContentStore;
use tunehub_api::{build_router, AppState};
use tunehub_common::config::UploadConfig;

pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_limits(UploadConfig::default()).await
    }

    pub async fn with_limits(uploads: UploadConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = tunehub_api::db::init_database_pool(&dir.path().join("tunehub.db"))
            .await
            .unwrap();
        let store = ContentStore::new(dir.path().join("content"));
        let workers = WorkerPool::new(2, Some(Duration::from_secs(120)));

        let state = AppState::new(db, store, uploads, workers)
            .with_cors_origins(vec!["http://localhost:3000".to_string()]);

        Self { dir, state }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub fn content_root(&self) -> PathBuf {
        self.dir.path().join("content")
    }

    /// Files currently stored under `content/<kind>`
    pub fn blob_count(&self, kind: &str) -> usize {
        std::fs::read_dir(self.content_root().join(kind))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub async fn track_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM tracks")
            .fetch_one(&self.state.db)
            .await
            .unwrap()
    }
}

/// Hand-built multipart/form-data body
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "tunehub-test-boundary-7MA4YWxkTrZu0gW".to_string(),
            body: Vec::new(),
        }
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, filename, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    /// Upload request, with `X-User-Id` when `user_id` is set
    pub fn into_request(mut self, user_id: Option<i64>) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/songs/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            );
        if let Some(id) = user_id {
            builder = builder.header("x-user-id", id.to_string());
        }
        builder.body(Body::from(self.body)).unwrap()
    }
}
